//! Payload normalization and coercion against a category schema

use std::collections::BTreeMap;

use serde_json::Value;

use super::errors::{CatalogError, CatalogResult};
use super::requests::AttributePayload;
use crate::schema::{coerce, AttributeRef, CategorySchema};
use crate::storage::AttributeId;

/// Maps a payload to `attribute_id -> raw value`.
///
/// Every reference must resolve to an attribute bound to the category.
/// A repeated reference keeps the last value.
pub fn normalize(
    schema: &CategorySchema,
    payload: &AttributePayload,
) -> CatalogResult<BTreeMap<AttributeId, Value>> {
    let mut normalized = BTreeMap::new();

    match payload {
        AttributePayload::Keyed(map) => {
            for (name, value) in map {
                let id = resolve_ref(schema, &AttributeRef::ByName(name.clone()))?;
                normalized.insert(id, value.clone());
            }
        }
        AttributePayload::Items(items) => {
            for item in items {
                let reference = item.reference().ok_or_else(|| {
                    CatalogError::validation("Each attribute item needs attribute_id or name")
                })?;
                let id = resolve_ref(schema, &reference)?;
                normalized.insert(id, item.value.clone());
            }
        }
    }

    Ok(normalized)
}

fn resolve_ref(schema: &CategorySchema, reference: &AttributeRef) -> CatalogResult<AttributeId> {
    match schema.lookup(reference) {
        Some(entry) => Ok(entry.attribute.id),
        None => Err(match reference {
            AttributeRef::ByName(name) => {
                CatalogError::validation(format!("Unknown attribute '{}' for this category", name))
            }
            AttributeRef::ById(id) => CatalogError::validation(format!(
                "Attribute id {} not mapped to this category",
                id
            )),
        }),
    }
}

/// Coerces every normalized value under its attribute's definition.
pub fn coerce_all(
    schema: &CategorySchema,
    raw: BTreeMap<AttributeId, Value>,
) -> CatalogResult<BTreeMap<AttributeId, Value>> {
    raw.into_iter()
        .map(|(id, value)| {
            let entry = schema.by_id(id).ok_or_else(|| {
                CatalogError::validation(format!("Attribute id {} not mapped to this category", id))
            })?;
            Ok((id, coerce(&entry.attribute, &value)?))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::testing::{dresses_schema, payload};
    use serde_json::json;

    #[test]
    fn test_keyed_payload() {
        let schema = dresses_schema();
        let keyed = payload(json!({"Size": "M", "Color": "Red"}));
        let normalized = normalize(&schema, &keyed).unwrap();

        let size = schema.by_name("Size").unwrap().attribute.id;
        assert_eq!(normalized.get(&size), Some(&json!("M")));
        assert_eq!(normalized.len(), 2);
    }

    #[test]
    fn test_item_payload_last_value_wins() {
        let schema = dresses_schema();
        let color = schema.by_name("Color").unwrap().attribute.id;
        let items = payload(json!([
            {"name": "Color", "value": "Red"},
            {"attribute_id": color, "value": "Blue"}
        ]));

        let normalized = normalize(&schema, &items).unwrap();
        assert_eq!(normalized.get(&color), Some(&json!("Blue")));
    }

    #[test]
    fn test_unknown_references_rejected() {
        let schema = dresses_schema();

        let err = normalize(&schema, &payload(json!({"Heel": "High"}))).unwrap_err();
        assert_eq!(err.to_string(), "Unknown attribute 'Heel' for this category");

        let err = normalize(&schema, &payload(json!([{"attribute_id": 999, "value": 1}])))
            .unwrap_err();
        assert_eq!(err.to_string(), "Attribute id 999 not mapped to this category");

        let err = normalize(&schema, &payload(json!([{"value": 1}]))).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_missing_item_value_fails_coercion() {
        let schema = dresses_schema();
        let raw = normalize(&schema, &payload(json!([{"name": "Color"}]))).unwrap();
        assert!(coerce_all(&schema, raw).unwrap_err().is_validation());
    }
}
