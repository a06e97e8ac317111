//! Stateless traversal of the institution tree.
//!
//! A path holds up to four ids (institution, course, subject, class). Its length decides
//! which level is listed: the empty path lists the owner's institutions, a full path
//! lists the students of the class.

use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::{CoreError, CoreResult};
use crate::hierarchy::{require_class, require_course, require_institution, require_subject};
use crate::model::{Class, Course, Institution, Student, Subject};
use crate::store;

pub const MAX_DEPTH: usize = 4;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NavPath(Vec<String>);

impl NavPath {
    pub fn root() -> Self {
        NavPath(Vec::new())
    }

    pub fn ids(&self) -> &[String] {
        &self.0
    }

    pub fn depth(&self) -> usize {
        self.0.len()
    }

    fn with(&self, id: &str) -> Self {
        let mut ids = self.0.clone();
        ids.push(id.to_string());
        NavPath(ids)
    }
}

impl From<Vec<String>> for NavPath {
    fn from(ids: Vec<String>) -> Self {
        NavPath(ids)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Level {
    Institutions,
    Courses,
    Subjects,
    Classes,
    Students,
}

impl Level {
    pub fn as_str(self) -> &'static str {
        match self {
            Level::Institutions => "institutions",
            Level::Courses => "courses",
            Level::Subjects => "subjects",
            Level::Classes => "classes",
            Level::Students => "students",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "level", content = "items", rename_all = "camelCase")]
pub enum Listing {
    Institutions(Vec<Institution>),
    Courses(Vec<Course>),
    Subjects(Vec<Subject>),
    Classes(Vec<Class>),
    Students(Vec<Student>),
}

impl Listing {
    pub fn level(&self) -> Level {
        match self {
            Listing::Institutions(_) => Level::Institutions,
            Listing::Courses(_) => Level::Courses,
            Listing::Subjects(_) => Level::Subjects,
            Listing::Classes(_) => Level::Classes,
            Listing::Students(_) => Level::Students,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Listing::Institutions(v) => v.len(),
            Listing::Courses(v) => v.len(),
            Listing::Subjects(v) => v.len(),
            Listing::Classes(v) => v.len(),
            Listing::Students(v) => v.len(),
        }
    }

    fn contains(&self, id: &str) -> bool {
        match self {
            Listing::Institutions(v) => v.iter().any(|x| x.id == id),
            Listing::Courses(v) => v.iter().any(|x| x.id == id),
            Listing::Subjects(v) => v.iter().any(|x| x.id == id),
            Listing::Classes(v) => v.iter().any(|x| x.id == id),
            Listing::Students(v) => v.iter().any(|x| x.id == id),
        }
    }
}

pub fn current_level(path: &NavPath) -> CoreResult<Level> {
    match path.depth() {
        0 => Ok(Level::Institutions),
        1 => Ok(Level::Courses),
        2 => Ok(Level::Subjects),
        3 => Ok(Level::Classes),
        4 => Ok(Level::Students),
        n => Err(CoreError::validation(format!(
            "path is too deep ({n} ids, at most {MAX_DEPTH})"
        ))),
    }
}

fn broken_path(depth: usize, id: &str) -> CoreError {
    CoreError::not_found("path does not resolve").with_details(json!({ "depth": depth, "id": id }))
}

/// Every element must be a child of the one before it; the first must belong to `owner`.
fn resolve(conn: &Connection, owner_id: &str, path: &NavPath) -> CoreResult<()> {
    current_level(path)?;
    let ids = path.ids();
    for (depth, id) in ids.iter().enumerate() {
        let parent_ok = match depth {
            0 => require_institution(conn, id)
                .map(|i| i.owner_id == owner_id)
                .map_err(|_| broken_path(depth, id))?,
            1 => require_course(conn, id)
                .map(|c| c.institution_id == ids[0])
                .map_err(|_| broken_path(depth, id))?,
            2 => require_subject(conn, id)
                .map(|s| s.course_id == ids[1])
                .map_err(|_| broken_path(depth, id))?,
            _ => require_class(conn, id)
                .map(|c| c.subject_id == ids[2])
                .map_err(|_| broken_path(depth, id))?,
        };
        if !parent_ok {
            return Err(broken_path(depth, id));
        }
    }
    Ok(())
}

/// Children of the last path element, or the owner's institutions at the root.
pub fn list(conn: &Connection, owner_id: &str, path: &NavPath) -> CoreResult<Listing> {
    resolve(conn, owner_id, path)?;
    let ids = path.ids();
    Ok(match current_level(path)? {
        Level::Institutions => Listing::Institutions(store::list_institutions(conn, owner_id)?),
        Level::Courses => Listing::Courses(store::list_courses(conn, &ids[0])?),
        Level::Subjects => Listing::Subjects(store::list_subjects(conn, &ids[1])?),
        Level::Classes => Listing::Classes(store::list_classes(conn, &ids[2])?),
        Level::Students => Listing::Students(store::list_students(conn, &ids[3])?),
    })
}

pub fn descend(
    conn: &Connection,
    owner_id: &str,
    path: &NavPath,
    level: Level,
    id: &str,
) -> CoreResult<NavPath> {
    let current = current_level(path)?;
    if level != current {
        return Err(CoreError::validation(format!(
            "path is at {}, not {}",
            current.as_str(),
            level.as_str()
        ))
        .with_details(json!({ "expected": current.as_str(), "got": level.as_str() })));
    }
    if current == Level::Students {
        return Err(CoreError::validation("students are the deepest level"));
    }
    let listing = list(conn, owner_id, path)?;
    if !listing.contains(id) {
        return Err(CoreError::not_found(format!("no such entry among {}", current.as_str()))
            .with_details(json!({ "id": id })));
    }
    Ok(path.with(id))
}

pub fn ascend(path: &NavPath) -> NavPath {
    let mut ids = path.ids().to_vec();
    ids.pop();
    NavPath(ids)
}
