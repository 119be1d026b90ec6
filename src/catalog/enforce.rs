//! Required and unique binding rules
//!
//! Both passes walk the category's full binding set and stop at the first
//! violation.

use std::collections::BTreeMap;

use serde_json::Value;

use super::errors::{CatalogError, CatalogResult};
use crate::schema::{coerce, encode_value, CategorySchema};
use crate::storage::{AttributeId, ProductId, Tables};

/// Enforces required and unique bindings over `values`.
///
/// Missing required attributes receive their binding default, coerced under
/// the attribute's type. Returns the ids of injected defaults.
/// `product_id` is the product being written, excluded from the unique check.
pub fn enforce(
    tables: &Tables,
    schema: &CategorySchema,
    product_id: Option<ProductId>,
    values: &mut BTreeMap<AttributeId, Value>,
) -> CatalogResult<Vec<AttributeId>> {
    let mut injected = Vec::new();

    for entry in schema.entries() {
        let attribute = &entry.attribute;
        if !entry.binding.is_required || values.contains_key(&attribute.id) {
            continue;
        }
        match entry.binding.default_value.as_ref().filter(|v| !v.is_null()) {
            Some(default) => {
                let value = coerce(attribute, default).map_err(|e| {
                    CatalogError::validation(format!(
                        "Default for required attribute '{}' is invalid: {}",
                        attribute.name, e
                    ))
                })?;
                values.insert(attribute.id, value);
                injected.push(attribute.id);
            }
            None => {
                return Err(CatalogError::validation(format!(
                    "Missing required attribute '{}'",
                    attribute.name
                )))
            }
        }
    }

    for entry in schema.entries() {
        if !entry.binding.is_unique {
            continue;
        }
        let attribute = &entry.attribute;
        let Some(value) = values.get(&attribute.id) else {
            continue;
        };
        let text = encode_value(attribute.data_type, value);
        if tables
            .find_value_owner(schema.category.id, attribute.id, &text, product_id)
            .is_some()
        {
            return Err(CatalogError::conflict(format!(
                "Value for unique attribute '{}' already exists on another product",
                attribute.name
            )));
        }
    }

    Ok(injected)
}
