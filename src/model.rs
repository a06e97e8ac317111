use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GradingType {
    #[serde(alias = "Aritmética", alias = "Aritmetica", alias = "arithmetic")]
    Arithmetic,
    #[serde(alias = "Ponderada", alias = "weighted")]
    Weighted,
}

impl GradingType {
    pub fn as_str(self) -> &'static str {
        match self {
            GradingType::Arithmetic => "arithmetic",
            GradingType::Weighted => "weighted",
        }
    }

    /// Accepts the stored form as well as the wire names.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "arithmetic" | "Arithmetic" | "Aritmética" | "Aritmetica" => {
                Some(GradingType::Arithmetic)
            }
            "weighted" | "Weighted" | "Ponderada" => Some(GradingType::Weighted),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Weekday {
    #[serde(alias = "Segunda", alias = "monday")]
    Monday,
    #[serde(alias = "Terça", alias = "Terca", alias = "tuesday")]
    Tuesday,
    #[serde(alias = "Quarta", alias = "wednesday")]
    Wednesday,
    #[serde(alias = "Quinta", alias = "thursday")]
    Thursday,
    #[serde(alias = "Sexta", alias = "friday")]
    Friday,
    #[serde(alias = "Sábado", alias = "Sabado", alias = "saturday")]
    Saturday,
    #[serde(alias = "Domingo", alias = "sunday")]
    Sunday,
}

impl Weekday {
    pub fn as_str(self) -> &'static str {
        match self {
            Weekday::Monday => "Monday",
            Weekday::Tuesday => "Tuesday",
            Weekday::Wednesday => "Wednesday",
            Weekday::Thursday => "Thursday",
            Weekday::Friday => "Friday",
            Weekday::Saturday => "Saturday",
            Weekday::Sunday => "Sunday",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        serde_json::from_value(serde_json::Value::String(s.trim().to_string())).ok()
    }
}

/// One weekly meeting of a class. Times are `HH:MM`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleSlot {
    pub day: Weekday,
    pub start: String,
    pub end: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Institution {
    pub id: String,
    pub owner_id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: String,
    pub institution_id: String,
    pub name: String,
    pub period: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    pub id: String,
    pub course_id: String,
    pub name: String,
    pub code: String,
    pub period: i64,
    pub nickname: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Class {
    pub id: String,
    pub subject_id: String,
    pub number: String,
    pub nickname: Option<String>,
    pub location: String,
    pub schedule: Vec<ScheduleSlot>,
    pub grading_type: Option<GradingType>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: String,
    pub class_id: String,
    pub name: String,
    pub ra: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeComponent {
    pub id: String,
    pub class_id: String,
    pub position: i64,
    pub name: String,
    pub nickname: String,
    pub description: Option<String>,
    pub weight: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradingScheme {
    pub class_id: String,
    #[serde(rename = "type")]
    pub grading_type: GradingType,
    pub components: Vec<GradeComponent>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredScore {
    pub student_id: String,
    pub component_id: String,
    pub value: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Average {
    pub student_id: String,
    pub class_id: String,
    pub value: f64,
    pub grading_type: GradingType,
    pub computed_at: String,
}
