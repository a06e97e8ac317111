use rusqlite::Connection;
use serde::Serialize;
use serde_json::json;
use std::collections::HashMap;

use crate::error::{CoreError, CoreResult};
use crate::model::{Average, GradeComponent, GradingType};
use crate::scheme;
use crate::store;

pub const WEIGHT_SUM_TARGET: f64 = 10.0;
pub const WEIGHT_SUM_TOLERANCE: f64 = 0.01;

/// Two-decimal rounding, halves away from zero.
pub fn round_2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

pub fn weight_sum(components: &[GradeComponent]) -> f64 {
    components.iter().map(|c| c.weight.unwrap_or(0.0)).sum()
}

pub fn check_weights(components: &[GradeComponent]) -> CoreResult<()> {
    let sum = weight_sum(components);
    if (sum - WEIGHT_SUM_TARGET).abs() > WEIGHT_SUM_TOLERANCE {
        return Err(CoreError::validation(format!(
            "weights must add up to exactly {WEIGHT_SUM_TARGET}; current sum is {}",
            round_2(sum)
        ))
        .with_details(json!({ "weightSum": sum })));
    }
    Ok(())
}

/// Average of one student. `scores` maps component id to the stored value.
///
/// Arithmetic averages only the graded components (none graded gives 0).
/// Weighted counts an ungraded component as 0: `sum(score * weight) / 10`.
pub fn student_average(
    grading_type: GradingType,
    components: &[GradeComponent],
    scores: &HashMap<&str, f64>,
) -> f64 {
    let raw = match grading_type {
        GradingType::Arithmetic => {
            let present: Vec<f64> = components
                .iter()
                .filter_map(|c| scores.get(c.id.as_str()).copied())
                .collect();
            if present.is_empty() {
                0.0
            } else {
                present.iter().sum::<f64>() / present.len() as f64
            }
        }
        GradingType::Weighted => {
            let weighted: f64 = components
                .iter()
                .map(|c| {
                    let score = scores.get(c.id.as_str()).copied().unwrap_or(0.0);
                    score * c.weight.unwrap_or(0.0)
                })
                .sum();
            weighted / WEIGHT_SUM_TARGET
        }
    };
    round_2(raw)
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComputedAverages {
    pub class_id: String,
    pub grading_type: GradingType,
    pub computed_at: String,
    pub averages: Vec<StudentAverage>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentAverage {
    pub student_id: String,
    pub value: f64,
}

/// Recomputes and persists the average of every student in the class, all or nothing.
pub fn compute_averages(conn: &Connection, class_id: &str) -> CoreResult<ComputedAverages> {
    // Reads and the batch write share one transaction so a concurrent component
    // removal is either fully visible or not at all.
    let tx = conn.unchecked_transaction()?;
    let scheme = scheme::get_scheme(&tx, class_id)?;
    if scheme.components.is_empty() {
        return Err(CoreError::validation("no components"));
    }
    if scheme.grading_type == GradingType::Weighted {
        check_weights(&scheme.components)?;
    }

    let students = store::list_students(&tx, class_id)?;
    let stored = store::list_class_scores(&tx, class_id)?;
    let mut by_student: HashMap<&str, HashMap<&str, f64>> = HashMap::new();
    for s in &stored {
        by_student
            .entry(s.student_id.as_str())
            .or_default()
            .insert(s.component_id.as_str(), s.value);
    }

    let empty = HashMap::new();
    let averages: Vec<StudentAverage> = students
        .iter()
        .map(|st| StudentAverage {
            student_id: st.id.clone(),
            value: student_average(
                scheme.grading_type,
                &scheme.components,
                by_student.get(st.id.as_str()).unwrap_or(&empty),
            ),
        })
        .collect();

    let pairs: Vec<(String, f64)> = averages
        .iter()
        .map(|a| (a.student_id.clone(), a.value))
        .collect();
    let computed_at = store::replace_class_averages(&tx, class_id, scheme.grading_type, &pairs)?;
    tx.commit()?;

    tracing::info!(
        class_id,
        grading_type = scheme.grading_type.as_str(),
        students = averages.len(),
        "averages computed"
    );

    Ok(ComputedAverages {
        class_id: class_id.to_string(),
        grading_type: scheme.grading_type,
        computed_at,
        averages,
    })
}

pub fn list_averages(conn: &Connection, class_id: &str) -> CoreResult<Vec<Average>> {
    if !store::class_exists(conn, class_id)? {
        return Err(CoreError::not_found("class not found"));
    }
    store::list_class_averages(conn, class_id)
}
