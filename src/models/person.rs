use serde::{Deserialize, Serialize};

use super::Ref;

/// A student or teacher as listed by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
    pub id: i64,
    #[serde(rename = "nom", default)]
    pub last_name: String,
    #[serde(rename = "prenom", default)]
    pub first_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub level: Ref,
    #[serde(default)]
    pub subject: Ref,
}
