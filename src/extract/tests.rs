//! Tests for item extraction

use super::*;
use pretty_assertions::assert_eq;
use serde_json::json;
use test_case::test_case;

fn ids_of(body: &serde_json::Value) -> Vec<String> {
    ItemExtractor::new()
        .extract(body)
        .into_iter()
        .map(|item| item.id)
        .collect()
}

#[test]
fn test_extract_items_field_ids_are_stable() {
    let body = json!({"items": [{"id": 1}, {"id": 2}]});

    let first = ids_of(&body);
    let second = ids_of(&body);

    assert_eq!(first, vec!["1".to_string(), "2".to_string()]);
    assert_eq!(first, second);
}

#[test_case(json!([{"id": "a"}, {"id": "b"}]), 2 ; "top level list")]
#[test_case(json!({"data": [{"id": 1}], "items": [{"id": 2}, {"id": 3}]}), 1 ; "data before items")]
#[test_case(json!({"items": [{"id": 1}, {"id": 2}, {"id": 3}]}), 3 ; "items")]
#[test_case(json!({"orders": [{"order_id": 9}]}), 1 ; "orders")]
#[test_case(json!({"data": "not a list", "name": "single"}), 1 ; "single object fallback")]
#[test_case(json!({"data": []}), 0 ; "empty data list")]
#[test_case(json!([]), 0 ; "empty list")]
#[test_case(json!(null), 0 ; "null body")]
fn test_raw_item_containers(body: serde_json::Value, expected: usize) {
    assert_eq!(ItemExtractor::new().raw_items(&body).len(), expected);
}

#[test]
fn test_data_wins_over_items() {
    let body = json!({"data": [{"id": "d1"}], "items": [{"id": "i1"}]});
    assert_eq!(ids_of(&body), vec!["d1".to_string()]);
}

#[test_case(json!({"id": 7, "Id": "x"}), "7" ; "id first")]
#[test_case(json!({"Id": "upper"}), "upper" ; "Id")]
#[test_case(json!({"ID": 12.5}), "12.5" ; "ID float")]
#[test_case(json!({"_id": "mongo"}), "mongo" ; "underscore id")]
#[test_case(json!({"pin_id": "p", "board_id": "b"}), "p" ; "pin before board")]
#[test_case(json!({"board_id": "b"}), "b" ; "board")]
#[test_case(json!({"order_id": 450789469}), "450789469" ; "order id")]
#[test_case(json!({"product_id": "sku"}), "sku" ; "product id")]
#[test_case(json!({"id": null, "_id": "fallback"}), "fallback" ; "null skipped")]
#[test_case(json!({"id": "", "ID": "next"}), "next" ; "empty string skipped")]
fn test_identifier_resolution_order(item: serde_json::Value, expected: &str) {
    assert_eq!(ItemExtractor::new().resolve_id(&item, 0), expected);
}

#[test]
fn test_generated_identifier_is_deterministic() {
    let extractor = ItemExtractor::new();
    let item = json!({"name": "no id here"});

    let first = extractor.resolve_id(&item, 3);
    let second = extractor.resolve_id(&item, 3);
    let other_position = extractor.resolve_id(&item, 4);

    assert!(first.starts_with("generated_"));
    assert_eq!(first, second);
    assert_ne!(first, other_position);
}

#[test]
fn test_scalar_items_get_generated_ids() {
    let ids = ids_of(&json!(["a", "b"]));
    assert_eq!(ids.len(), 2);
    assert!(ids.iter().all(|id| id.starts_with("generated_")));
    assert_ne!(ids[0], ids[1]);
}

#[test]
fn test_custom_id_fields() {
    let extractor = ItemExtractor::with_id_fields(["sku", "id"]);
    assert_eq!(extractor.id_fields(), &["sku".to_string(), "id".to_string()]);
    assert_eq!(extractor.resolve_id(&json!({"id": 1, "sku": "S-1"}), 0), "S-1");
}

#[test]
fn test_extract_strips_transport_fields() {
    let body = json!({
        "items": [{"id": 5, "title": "pin", "bookmark": "b", "url": "https://x"}],
        "bookmark": "next"
    });

    let items = ItemExtractor::new().extract(&body);

    assert_eq!(items.len(), 1);
    assert_eq!(items[0].id, "5");
    assert_eq!(items[0].original_id, Some(json!(5)));
    assert_eq!(items[0].payload, json!({"id": 5, "title": "pin"}));
}

#[test]
fn test_strip_transport_fields_leaves_scalars() {
    assert_eq!(strip_transport_fields(json!("x")), json!("x"));
}
