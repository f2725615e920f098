//! Typed shapes of the CLI's `--json` output
//!
//! Only the fields the harness asserts on are modelled. Unknown fields are
//! ignored so the CLI can grow its output without breaking the tests.

use serde::Deserialize;

/// Any single entity returned by a create, get or update command
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Entity {
    pub id: String,
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// One page of a list command
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Listing {
    pub items: Vec<Entity>,
}

impl Listing {
    /// Whether an item with this id is on the page
    pub fn contains_id(&self, id: &str) -> bool {
        self.items.iter().any(|item| item.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_ignores_extra_fields() {
        let entity: Entity = serde_json::from_str(
            r#"{"id":"bafyobj","name":"Note","layout":"basic","properties":[]}"#,
        )
        .unwrap();

        assert_eq!(entity.id, "bafyobj");
        assert_eq!(entity.name.as_deref(), Some("Note"));
        assert_eq!(entity.key, None);
    }

    #[test]
    fn test_entity_requires_id() {
        let err = serde_json::from_str::<Entity>(r#"{"name":"Note"}"#).unwrap_err();
        assert!(err.to_string().contains("missing field `id`"));
    }

    #[test]
    fn test_listing_membership() {
        let listing: Listing = serde_json::from_str(
            r#"{"items":[{"id":"a"},{"id":"b","key":"page"}],"pagination":{"total":2}}"#,
        )
        .unwrap();

        assert!(listing.contains_id("b"));
        assert!(!listing.contains_id("c"));
    }
}
