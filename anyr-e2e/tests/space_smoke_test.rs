//! E2E smoke checks of read-only commands against the target space

use anyr_e2e::{E2eHarness, E2eResult, Entity, Listing};

/// The configured space resolves to itself
#[tokio::test]
async fn test_space_get_returns_target_space() -> E2eResult<()> {
    let Some(harness) = E2eHarness::try_from_env("test_space_get_returns_target_space")? else {
        return Ok(());
    };
    let Some(space_id) = harness.require_space_id("test_space_get_returns_target_space") else {
        return Ok(());
    };

    let space: Entity = harness.run_json(&["space", "get", space_id]).await?;
    assert_eq!(space.id, space_id, "space get returned a different space");
    Ok(())
}

/// Built-in types are listed with ids
#[tokio::test]
async fn test_type_list_has_items() -> E2eResult<()> {
    let Some(harness) = E2eHarness::try_from_env("test_type_list_has_items")? else {
        return Ok(());
    };
    let Some(space_id) = harness.require_space_id("test_type_list_has_items") else {
        return Ok(());
    };

    let types: Listing = harness
        .run_json(&["type", "list", space_id, "--limit", "50"])
        .await?;
    assert!(!types.items.is_empty(), "type list returned no types");
    assert!(
        types.items.iter().all(|t| !t.id.is_empty()),
        "type list returned an item without id: {:?}",
        types.items
    );
    Ok(())
}
