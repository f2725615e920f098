//! Create, read, update and list scenario over types, properties, tags and
//! objects
//!
//! Each resource is re-read through both of its addressing modes (stable key
//! and generated id) and must keep its id across updates. Everything created
//! is deleted again through a [`CleanupStack`], object first and type last.

use crate::cleanup::CleanupStack;
use crate::harness::{E2eHarness, E2eResult};
use crate::output::{Entity, Listing};
use chrono::Utc;
use tracing::info;

/// Page size for the object listings
pub const OBJECT_LIST_LIMIT: &str = "200";

/// Built-in type whose templates are listed as a smoke check
pub const TEMPLATE_SMOKE_TYPE: &str = "page";

/// Names and keys of the resources one scenario run creates.
///
/// All of them carry the same suffix so repeated or concurrent runs against a
/// shared space never collide.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fixtures {
    pub suffix: String,
    pub type_key: String,
    pub type_name: String,
    pub property_key: String,
    pub property_name: String,
    /// Text property declared on the created type
    pub type_property_key: String,
    pub object_name: String,
    pub tag_key: String,
}

impl Fixtures {
    pub fn new(suffix: &str) -> Self {
        Self {
            suffix: suffix.to_string(),
            type_key: format!("cli_test_type_{}", suffix),
            type_name: format!("CLI Test Type {}", suffix),
            property_key: format!("cli_test_status_{}", suffix),
            property_name: format!("CLI Test Status {}", suffix),
            type_property_key: format!("note_{}", suffix),
            object_name: format!("CLI Test Object {}", suffix),
            tag_key: format!("doing_{}", suffix),
        }
    }

    /// Fixtures suffixed with the current time in milliseconds
    pub fn generate() -> Self {
        Self::new(&Utc::now().timestamp_millis().to_string())
    }

    pub fn updated_object_name(&self) -> String {
        format!("{} Updated", self.object_name)
    }

    fn type_property_spec(&self) -> String {
        format!("{}:text:Note", self.type_property_key)
    }

    fn type_property_value(&self, value: &str) -> String {
        format!("{}={}", self.type_property_key, value)
    }
}

/// Ids of everything the scenario created
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedIds {
    pub type_id: String,
    pub property_id: String,
    pub tag_id: String,
    pub object_id: String,
}

fn created_id(entity: Entity, what: &str) -> String {
    assert!(!entity.id.is_empty(), "{} create missing id", what);
    entity.id
}

fn assert_same_id(entity: &Entity, expected: &str, what: &str) {
    assert_eq!(entity.id, expected, "{} mismatch", what);
}

/// Run the whole scenario against `space_id`.
///
/// The first failing step aborts the rest; the cleanup stack still deletes
/// whatever was created so far before the failure propagates.
pub async fn run_resource_lifecycle(
    harness: &E2eHarness,
    space_id: &str,
    fixtures: &Fixtures,
) -> E2eResult<CreatedIds> {
    let f = fixtures;
    let mut cleanup = CleanupStack::new(harness);

    // Type
    info!("creating type {}", f.type_key);
    let typ: Entity = harness
        .run_json(&[
            "type",
            "create",
            space_id,
            &f.type_key,
            &f.type_name,
            "-p",
            &f.type_property_spec(),
        ])
        .await?;
    let type_id = created_id(typ, "type");
    cleanup.defer(
        format!("type {}", f.type_key),
        &["type", "delete", space_id, &f.type_key],
    );

    let by_key: Entity = harness.run_json(&["type", "get", space_id, &f.type_key]).await?;
    assert_same_id(&by_key, &type_id, "type get by key");

    let by_id: Entity = harness.run_json(&["type", "get", space_id, &type_id]).await?;
    assert_same_id(&by_id, &type_id, "type get by id");

    let updated: Entity = harness
        .run_json(&[
            "type",
            "update",
            space_id,
            &f.type_key,
            "--name",
            &format!("{} Updated", f.type_name),
        ])
        .await?;
    assert_same_id(&updated, &type_id, "type update by key");

    // Select property with one tag option
    info!("creating property {}", f.property_key);
    let prop: Entity = harness
        .run_json(&[
            "property",
            "create",
            space_id,
            &f.property_name,
            "select",
            "--key",
            &f.property_key,
            "--tag",
            "Todo:blue",
        ])
        .await?;
    let property_id = created_id(prop, "property");
    cleanup.defer(
        format!("property {}", f.property_key),
        &["property", "delete", space_id, &f.property_key],
    );

    let by_key: Entity = harness
        .run_json(&["property", "get", space_id, &f.property_key])
        .await?;
    assert_same_id(&by_key, &property_id, "property get by key");

    let by_id: Entity = harness
        .run_json(&["property", "get", space_id, &property_id])
        .await?;
    assert_same_id(&by_id, &property_id, "property get by id");

    let updated: Entity = harness
        .run_json(&[
            "property",
            "update",
            space_id,
            &f.property_key,
            "--name",
            &format!("{} Updated", f.property_name),
        ])
        .await?;
    assert_same_id(&updated, &property_id, "property update by key");

    // Tag under the property
    info!("creating tag {}", f.tag_key);
    let tag: Entity = harness
        .run_json(&[
            "tag",
            "create",
            space_id,
            &f.property_key,
            "Doing",
            "yellow",
            "--key",
            &f.tag_key,
        ])
        .await?;
    let tag_id = created_id(tag, "tag");
    cleanup.defer(
        format!("tag {}", f.tag_key),
        &["tag", "delete", space_id, &f.property_key, &f.tag_key],
    );

    let by_key: Entity = harness
        .run_json(&["tag", "get", space_id, &f.property_key, &f.tag_key])
        .await?;
    assert_same_id(&by_key, &tag_id, "tag get by key");

    let updated: Entity = harness
        .run_json(&[
            "tag",
            "update",
            space_id,
            &f.property_key,
            &f.tag_key,
            "--name",
            "Done",
        ])
        .await?;
    assert_same_id(&updated, &tag_id, "tag update by key");

    // Object of the created type
    info!("creating object {:?}", f.object_name);
    let obj: Entity = harness
        .run_json(&[
            "object",
            "create",
            space_id,
            &f.type_key,
            "--name",
            &f.object_name,
            &f.type_property_value("hello"),
        ])
        .await?;
    let object_id = created_id(obj, "object");
    cleanup.defer(
        format!("object {}", object_id),
        &["object", "delete", space_id, &object_id],
    );

    let updated: Entity = harness
        .run_json(&[
            "object",
            "update",
            space_id,
            &object_id,
            "--name",
            &f.updated_object_name(),
            &f.type_property_value("world"),
        ])
        .await?;
    assert_same_id(&updated, &object_id, "object update");

    let by_id: Entity = harness
        .run_json(&["object", "get", space_id, &object_id])
        .await?;
    assert_same_id(&by_id, &object_id, "object get by id");

    // Type filter must match through both addressing modes
    info!("listing objects of type {}", f.type_key);
    let by_type_key: Listing = harness
        .run_json(&[
            "object",
            "list",
            space_id,
            "--type",
            &f.type_key,
            "--limit",
            OBJECT_LIST_LIMIT,
        ])
        .await?;
    assert!(
        by_type_key.contains_id(&object_id),
        "object list by type key missing created object {}",
        object_id
    );

    let by_type_id: Listing = harness
        .run_json(&[
            "object",
            "list",
            space_id,
            "--type",
            &type_id,
            "--limit",
            OBJECT_LIST_LIMIT,
        ])
        .await?;
    assert!(
        by_type_id.contains_id(&object_id),
        "object list by type id missing created object {}",
        object_id
    );

    let _: serde_json::Value = harness
        .run_json(&["template", "list", space_id, TEMPLATE_SMOKE_TYPE])
        .await?;

    info!("scenario finished, {} resources to clean up", cleanup.len());
    Ok(CreatedIds {
        type_id,
        property_id,
        tag_id,
        object_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_names() {
        let f = Fixtures::new("1700000000000");

        assert_eq!(f.type_key, "cli_test_type_1700000000000");
        assert_eq!(f.type_name, "CLI Test Type 1700000000000");
        assert_eq!(f.property_key, "cli_test_status_1700000000000");
        assert_eq!(f.type_property_key, "note_1700000000000");
        assert_eq!(f.tag_key, "doing_1700000000000");
        assert_eq!(f.updated_object_name(), "CLI Test Object 1700000000000 Updated");
        assert_eq!(f.type_property_spec(), "note_1700000000000:text:Note");
        assert_eq!(f.type_property_value("hello"), "note_1700000000000=hello");
    }

    #[test]
    fn test_generated_suffix_is_millis() {
        let before = Utc::now().timestamp_millis();
        let f = Fixtures::generate();
        let suffix: i64 = f.suffix.parse().unwrap();

        assert!(suffix >= before);
        assert!(f.type_key.ends_with(&f.suffix));
    }
}
