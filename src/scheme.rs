//! Grading scheme of a class: its type and ordered components.

use rusqlite::Connection;
use serde::Deserialize;
use serde_json::json;

use crate::error::{CoreError, CoreResult};
use crate::hierarchy::{optional_text, require_class, required};
use crate::model::{GradeComponent, GradingScheme, GradingType};
use crate::store;

pub const MIN_WEIGHT: f64 = 0.0;
pub const MAX_WEIGHT: f64 = 10.0;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewComponent {
    pub name: String,
    pub nickname: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub weight: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentPatch {
    pub name: Option<String>,
    pub nickname: Option<String>,
    pub description: Option<String>,
    pub weight: Option<f64>,
}

fn check_weight(weight: f64) -> CoreResult<f64> {
    if !weight.is_finite() || !(MIN_WEIGHT..=MAX_WEIGHT).contains(&weight) {
        return Err(
            CoreError::validation(format!("weight must be between {MIN_WEIGHT} and {MAX_WEIGHT}"))
                .with_details(json!({ "weight": weight })),
        );
    }
    Ok(weight)
}

fn require_scheme_type(conn: &Connection, class_id: &str) -> CoreResult<GradingType> {
    let class = require_class(conn, class_id)?;
    class
        .grading_type
        .ok_or_else(|| CoreError::not_found("class has no grading scheme yet"))
}

fn require_component(conn: &Connection, class_id: &str, component_id: &str) -> CoreResult<GradeComponent> {
    match store::get_component(conn, component_id)? {
        Some(c) if c.class_id == class_id => Ok(c),
        _ => Err(CoreError::not_found("component not found")
            .with_details(json!({ "componentId": component_id }))),
    }
}

pub fn get_scheme(conn: &Connection, class_id: &str) -> CoreResult<GradingScheme> {
    let grading_type = require_scheme_type(conn, class_id)?;
    Ok(GradingScheme {
        class_id: class_id.to_string(),
        grading_type,
        components: store::list_components(conn, class_id)?,
    })
}

pub fn create_scheme(conn: &Connection, class_id: &str, t: GradingType) -> CoreResult<GradingScheme> {
    let class = require_class(conn, class_id)?;
    if class.grading_type.is_some() {
        return Err(CoreError::validation(
            "class already has a grading scheme; change its type instead",
        ));
    }
    store::set_class_grading_type(conn, class_id, t)?;
    tracing::info!(class_id, grading_type = t.as_str(), "grading scheme created");
    get_scheme(conn, class_id)
}

/// Switching keeps every component and score. Moving to Weighted gives weightless
/// components a weight of 0; moving to Arithmetic leaves weights stored but unused.
pub fn change_type(conn: &Connection, class_id: &str, t: GradingType) -> CoreResult<GradingScheme> {
    let current = require_scheme_type(conn, class_id)?;
    if current == t {
        return get_scheme(conn, class_id);
    }

    let tx = conn.unchecked_transaction()?;
    store::set_class_grading_type(&tx, class_id, t)?;
    if t == GradingType::Weighted {
        store::fill_missing_weights(&tx, class_id)?;
    }
    tx.commit()?;

    tracing::info!(
        class_id,
        from = current.as_str(),
        to = t.as_str(),
        "grading type changed"
    );
    get_scheme(conn, class_id)
}

pub fn add_component(conn: &Connection, class_id: &str, new: NewComponent) -> CoreResult<GradeComponent> {
    let grading_type = require_scheme_type(conn, class_id)?;
    let name = required("name", &new.name)?;
    let nickname = required("nickname", &new.nickname)?;
    let weight = match grading_type {
        GradingType::Weighted => {
            let w = new.weight.ok_or_else(|| {
                CoreError::validation("weight is required for a weighted scheme")
                    .with_details(json!({ "field": "weight" }))
            })?;
            Some(check_weight(w)?)
        }
        GradingType::Arithmetic => None,
    };

    let tx = conn.unchecked_transaction()?;
    let component = GradeComponent {
        id: store::new_id(),
        class_id: class_id.to_string(),
        position: store::next_component_position(&tx, class_id)?,
        name,
        nickname,
        description: optional_text(new.description.as_deref()),
        weight,
    };
    store::insert_component(&tx, &component)?;
    tx.commit()?;

    tracing::info!(class_id, component_id = %component.id, "component added");
    Ok(component)
}

pub fn edit_component(
    conn: &Connection,
    class_id: &str,
    component_id: &str,
    patch: ComponentPatch,
) -> CoreResult<GradeComponent> {
    let grading_type = require_scheme_type(conn, class_id)?;
    let mut component = require_component(conn, class_id, component_id)?;

    if let Some(name) = patch.name.as_deref() {
        component.name = required("name", name)?;
    }
    if let Some(nickname) = patch.nickname.as_deref() {
        component.nickname = required("nickname", nickname)?;
    }
    if let Some(description) = patch.description.as_deref() {
        component.description = optional_text(Some(description));
    }
    if let Some(weight) = patch.weight {
        let weight = check_weight(weight)?;
        if grading_type == GradingType::Weighted {
            component.weight = Some(weight);
        } else {
            tracing::debug!(class_id, component_id, weight, "weight ignored under arithmetic");
        }
    }

    store::update_component(conn, &component)?;
    Ok(component)
}

/// Removes the component and every score recorded against it, atomically.
pub fn remove_component(conn: &Connection, class_id: &str, component_id: &str) -> CoreResult<usize> {
    let tx = conn.unchecked_transaction()?;
    let component = require_component(&tx, class_id, component_id)?;
    let scores_removed = store::delete_component_rows(&tx, &component)?;
    tx.commit()?;

    tracing::info!(class_id, component_id, scores_removed, "component removed");
    Ok(scores_removed)
}
