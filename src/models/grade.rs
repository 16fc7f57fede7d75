use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

use super::Ref;

pub const MIN_GRADE: f64 = 0.0;
pub const MAX_GRADE: f64 = 20.0;

/// A grade on the 0-20 scale. Construction rejects anything outside it.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct GradeValue(f64);

impl GradeValue {
    pub fn new(value: f64) -> Option<Self> {
        if value.is_finite() && (MIN_GRADE..=MAX_GRADE).contains(&value) {
            Some(Self(value))
        } else {
            None
        }
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl<'de> Deserialize<'de> for GradeValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // Decimal fields arrive as strings ("17.50") from the backend.
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(f64),
            Text(String),
        }

        let value = match Raw::deserialize(deserializer)? {
            Raw::Number(n) => n,
            Raw::Text(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|e| serde::de::Error::custom(format!("invalid grade {:?}: {}", s, e)))?,
        };

        GradeValue::new(value)
            .ok_or_else(|| serde::de::Error::custom(format!("grade {} is outside 0-20", value)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum GradeType {
    Test1,
    Test2,
    Test3,
    Other(String),
}

impl From<String> for GradeType {
    fn from(label: String) -> Self {
        match label.as_str() {
            "Test1" => GradeType::Test1,
            "Test2" => GradeType::Test2,
            "Test3" => GradeType::Test3,
            _ => GradeType::Other(label),
        }
    }
}

impl From<GradeType> for String {
    fn from(kind: GradeType) -> Self {
        kind.to_string()
    }
}

impl fmt::Display for GradeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GradeType::Test1 => f.write_str("Test1"),
            GradeType::Test2 => f.write_str("Test2"),
            GradeType::Test3 => f.write_str("Test3"),
            GradeType::Other(label) => f.write_str(label),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeRecord {
    pub id: i64,
    #[serde(default)]
    pub student: Ref,
    #[serde(default)]
    pub subject: Ref,
    pub grade: GradeValue,
    #[serde(default)]
    pub grade_type: Option<GradeType>,
    #[serde(default)]
    pub date_g: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewGradeRequest {
    pub student: i64,
    pub subject: i64,
    pub grade: f64,
    pub grade_type: GradeType,
    pub level: Option<i64>,
    pub date_g: NaiveDate,
}
