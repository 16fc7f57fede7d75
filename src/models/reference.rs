use serde::{Deserialize, Serialize};

/// A reference to another backend record.
///
/// The backend sends relations either as a bare id (`5` or `"5"`), as the
/// nested object (`{"id": 5, "nom": "..."}`), or as `null`. `Ref::id` is the
/// only place that shape is interpreted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Ref {
    Id(i64),
    Text(String),
    Nested { id: Option<i64> },
    #[default]
    Missing,
}

impl Ref {
    pub fn id(&self) -> Option<i64> {
        match self {
            Ref::Id(id) => Some(*id),
            Ref::Text(text) => text.trim().parse().ok(),
            Ref::Nested { id } => *id,
            Ref::Missing => None,
        }
    }
}

impl From<i64> for Ref {
    fn from(id: i64) -> Self {
        Ref::Id(id)
    }
}

impl From<Option<i64>> for Ref {
    fn from(id: Option<i64>) -> Self {
        id.map(Ref::Id).unwrap_or(Ref::Missing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_every_shape() {
        let bare: Ref = serde_json::from_str("5").unwrap();
        let text: Ref = serde_json::from_str("\"7\"").unwrap();
        let nested: Ref = serde_json::from_str(r#"{"id": 9, "nom": "Maths"}"#).unwrap();
        let null: Ref = serde_json::from_str("null").unwrap();

        assert_eq!(bare.id(), Some(5));
        assert_eq!(text.id(), Some(7));
        assert_eq!(nested.id(), Some(9));
        assert_eq!(null.id(), None);
    }

    #[test]
    fn garbage_text_has_no_id() {
        assert_eq!(Ref::Text("abc".to_string()).id(), None);
        assert_eq!(Ref::Nested { id: None }.id(), None);
    }
}
