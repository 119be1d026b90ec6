//! Attribute definition operations

use std::collections::HashMap;

use chrono::Utc;
use serde_json::Value;
use tracing::info;

use super::errors::{CatalogError, CatalogResult};
use super::requests::{AttributePatch, NewAttribute};
use super::views::Deleted;
use super::{require_name, Catalog};
use crate::observability::Event;
use crate::schema::{coerce, compile_pattern, decode_value, encode_value, AttributeRef, DataType};
use crate::storage::{Attribute, AttributeId, Binding, Mutation, StoredValue};

impl Catalog {
    pub fn define_attribute(&mut self, input: NewAttribute) -> CatalogResult<Attribute> {
        let id = self.tables().next_attribute_id();
        let attribute = self.prepare_attribute(input, id)?;

        let mut txn = self.store.begin();
        txn.apply(Mutation::PutAttribute {
            attribute: attribute.clone(),
        })?;
        txn.commit()?;

        Ok(attribute)
    }

    /// Validates a new definition and builds its row without writing it.
    pub(super) fn prepare_attribute(
        &self,
        input: NewAttribute,
        id: AttributeId,
    ) -> CatalogResult<Attribute> {
        let name = require_name("Attribute", &input.name)?;
        let allowed_values = normalize_allowed(input.data_type, input.allowed_values);
        let validation_regex = input.validation_regex.filter(|p| !p.is_empty());
        check_definition(
            &name,
            input.data_type,
            allowed_values.as_deref(),
            validation_regex.as_deref(),
        )?;

        if self.tables().attribute_by_name(&name).is_some() {
            return Err(CatalogError::conflict(format!(
                "Attribute with name '{}' already exists",
                name
            )));
        }

        let now = Utc::now();
        Ok(Attribute {
            id,
            name,
            data_type: input.data_type,
            allowed_values,
            validation_regex,
            is_active: input.is_active,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn get_attribute(&self, reference: &AttributeRef) -> CatalogResult<Attribute> {
        let found = match reference {
            AttributeRef::ById(id) => self.tables().attribute(*id),
            AttributeRef::ByName(name) => self.tables().attribute_by_name(name),
        };
        found
            .cloned()
            .ok_or_else(|| CatalogError::not_found("Attribute not found"))
    }

    /// Lists attributes ordered by name.
    pub fn list_attributes(&self, active_only: bool) -> Vec<Attribute> {
        let mut attributes: Vec<Attribute> = self
            .tables()
            .attributes()
            .filter(|a| !active_only || a.is_active)
            .cloned()
            .collect();
        attributes.sort_by(|a, b| a.name.cmp(&b.name));
        attributes
    }

    /// Updates a definition.
    ///
    /// A change of type, enum domain or pattern migrates every stored value
    /// and binding default to the new definition in the same transaction.
    /// If any of them no longer conforms the update is rejected.
    pub fn update_attribute(
        &mut self,
        id: AttributeId,
        patch: AttributePatch,
    ) -> CatalogResult<Attribute> {
        let current = self.require_attribute(id)?.clone();
        let mut next = current.clone();

        if let Some(name) = patch.name {
            next.name = require_name("Attribute", &name)?;
        }
        if let Some(data_type) = patch.data_type {
            next.data_type = data_type;
        }
        next.allowed_values = match patch.allowed_values {
            Some(values) => normalize_allowed(next.data_type, values),
            None if next.data_type != DataType::Enum => None,
            None => next.allowed_values,
        };
        if let Some(pattern) = patch.validation_regex {
            next.validation_regex = pattern.filter(|p| !p.is_empty());
        }
        if let Some(is_active) = patch.is_active {
            next.is_active = is_active;
        }

        check_definition(
            &next.name,
            next.data_type,
            next.allowed_values.as_deref(),
            next.validation_regex.as_deref(),
        )?;

        if let Some(owner) = self.tables().attribute_by_name(&next.name) {
            if owner.id != id {
                return Err(CatalogError::conflict(format!(
                    "Attribute with name '{}' already exists",
                    next.name
                )));
            }
        }

        let now = Utc::now();
        next.updated_at = now;

        let (binding_writes, value_writes) = if definition_changed(&current, &next) {
            (
                self.migrate_defaults(&next, now)?,
                self.migrate_values(&current, &next, now)?,
            )
        } else {
            (Vec::new(), Vec::new())
        };
        let migrated = value_writes.len();

        let mut txn = self.store.begin();
        txn.apply(Mutation::PutAttribute {
            attribute: next.clone(),
        })?;
        for binding in binding_writes {
            txn.apply(Mutation::PutBinding { binding })?;
        }
        for value in value_writes {
            txn.apply(Mutation::PutValue { value })?;
        }
        txn.commit()?;

        if migrated > 0 {
            info!(
                event = %Event::ValuesMigrated,
                attribute_id = id,
                data_type = %next.data_type,
                migrated,
                "stored values migrated to new attribute definition"
            );
        }

        Ok(next)
    }

    /// Re-coerces binding defaults under the new definition.
    fn migrate_defaults(
        &self,
        next: &Attribute,
        now: chrono::DateTime<Utc>,
    ) -> CatalogResult<Vec<Binding>> {
        let mut writes = Vec::new();
        for binding in self.tables().bindings_for_attribute(next.id) {
            let Some(default) = binding.default_value.as_ref() else {
                continue;
            };
            let coerced = coerce(next, default).map_err(|e| {
                CatalogError::conflict(format!(
                    "Cannot change attribute '{}': default for category {} is incompatible: {}",
                    next.name, binding.category_id, e
                ))
            })?;
            if &coerced != default {
                let mut updated = binding.clone();
                updated.default_value = Some(coerced);
                updated.updated_at = now;
                writes.push(updated);
            }
        }
        Ok(writes)
    }

    /// Re-coerces stored values under the new definition and re-checks
    /// unique bindings against the migrated texts.
    fn migrate_values(
        &self,
        current: &Attribute,
        next: &Attribute,
        now: chrono::DateTime<Utc>,
    ) -> CatalogResult<Vec<StoredValue>> {
        let tables = self.tables();
        let mut writes = Vec::new();
        let mut final_texts: HashMap<_, String> = HashMap::new();

        for stored in tables.values_for_attribute(current.id) {
            let decoded = decode_value(current.data_type, &stored.value_text);
            let coerced = coerce(next, &decoded).map_err(|e| {
                CatalogError::conflict(format!(
                    "Cannot change attribute '{}': value stored for product {} is incompatible: {}",
                    next.name, stored.product_id, e
                ))
            })?;
            let text = encode_value(next.data_type, &coerced);
            if text != stored.value_text {
                writes.push(StoredValue {
                    value_text: text.clone(),
                    updated_at: now,
                    ..stored.clone()
                });
            }
            final_texts.insert(stored.product_id, text);
        }

        for binding in tables.bindings_for_attribute(current.id).filter(|b| b.is_unique) {
            let mut seen = HashMap::new();
            for stored in tables.category_values_for_attribute(binding.category_id, current.id) {
                let Some(text) = final_texts.get(&stored.product_id) else {
                    continue;
                };
                if seen.insert(text.as_str(), stored.product_id).is_some() {
                    return Err(CatalogError::conflict(format!(
                        "Cannot change attribute '{}': migrated values collide under the unique binding in category {}",
                        next.name, binding.category_id
                    )));
                }
            }
        }

        Ok(writes)
    }

    /// Deletes an attribute that no binding or value references.
    pub fn delete_attribute(&mut self, id: AttributeId) -> CatalogResult<Deleted> {
        self.require_attribute(id)?;

        if self.tables().attribute_is_bound(id) {
            return Err(CatalogError::conflict(
                "Cannot delete attribute that is mapped to a category. Unmap first.",
            ));
        }
        if self.tables().attribute_has_values(id) {
            return Err(CatalogError::conflict(
                "Cannot delete attribute that has product values. Remove values first.",
            ));
        }

        let mut txn = self.store.begin();
        txn.apply(Mutation::DeleteAttribute { id })?;
        txn.commit()?;

        Ok(Deleted { deleted: true })
    }
}

/// Drops an empty domain from non-ENUM definitions.
fn normalize_allowed(data_type: DataType, allowed: Option<Vec<Value>>) -> Option<Vec<Value>> {
    match allowed {
        Some(values) if values.is_empty() && data_type != DataType::Enum => None,
        other => other,
    }
}

fn definition_changed(current: &Attribute, next: &Attribute) -> bool {
    current.data_type != next.data_type
        || current.allowed_values != next.allowed_values
        || current.validation_regex != next.validation_regex
}

fn check_definition(
    name: &str,
    data_type: DataType,
    allowed_values: Option<&[Value]>,
    validation_regex: Option<&str>,
) -> CatalogResult<()> {
    match (data_type, allowed_values) {
        (DataType::Enum, None) | (DataType::Enum, Some([])) => {
            return Err(CatalogError::validation(format!(
                "ENUM attribute '{}' requires a non-empty allowed_values list",
                name
            )))
        }
        (DataType::Enum, Some(values)) => {
            if values
                .iter()
                .any(|v| !(v.is_string() || v.is_number() || v.is_boolean()))
            {
                return Err(CatalogError::validation(format!(
                    "allowed_values of attribute '{}' must be strings, numbers or booleans",
                    name
                )));
            }
        }
        (_, Some(_)) => {
            return Err(CatalogError::validation(format!(
                "allowed_values only apply to ENUM attributes, '{}' is {}",
                name, data_type
            )))
        }
        (_, None) => {}
    }

    if let Some(pattern) = validation_regex {
        compile_pattern(pattern).map_err(|e| {
            CatalogError::validation(format!(
                "Invalid validation_regex for attribute '{}': {}",
                name, e
            ))
        })?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::testing::{open_catalog, payload};
    use crate::catalog::{BindAttribute, NewCategory, NewProduct};
    use serde_json::json;

    #[test]
    fn test_define_and_lookup() {
        let (_dir, mut catalog) = open_catalog();
        let color = catalog
            .define_attribute(NewAttribute::new("Color", DataType::Text))
            .unwrap();

        assert_eq!(color.id, 1);
        assert_eq!(
            catalog.get_attribute(&AttributeRef::ByName("Color".into())).unwrap(),
            color
        );
        assert!(catalog
            .get_attribute(&AttributeRef::ById(42))
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn test_duplicate_name_conflicts() {
        let (_dir, mut catalog) = open_catalog();
        catalog.define_attribute(NewAttribute::new("Color", DataType::Text)).unwrap();
        let err = catalog
            .define_attribute(NewAttribute::new("Color", DataType::Number))
            .unwrap_err();
        assert!(err.is_conflict());
    }

    #[test]
    fn test_enum_requires_domain() {
        let (_dir, mut catalog) = open_catalog();
        assert!(catalog
            .define_attribute(NewAttribute::new("Size", DataType::Enum))
            .unwrap_err()
            .is_validation());
        assert!(catalog
            .define_attribute(NewAttribute::new("Size", DataType::Enum).with_allowed_values(vec![]))
            .unwrap_err()
            .is_validation());
        assert!(catalog
            .define_attribute(
                NewAttribute::new("Color", DataType::Text).with_allowed_values(vec![json!("Red")])
            )
            .unwrap_err()
            .is_validation());
    }

    #[test]
    fn test_invalid_pattern_rejected() {
        let (_dir, mut catalog) = open_catalog();
        let err = catalog
            .define_attribute(NewAttribute::new("Code", DataType::Text).with_validation_regex("(["))
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_list_is_sorted_and_filtered() {
        let (_dir, mut catalog) = open_catalog();
        catalog.define_attribute(NewAttribute::new("Material", DataType::Text)).unwrap();
        let mut hidden = NewAttribute::new("Color", DataType::Text);
        hidden.is_active = false;
        catalog.define_attribute(hidden).unwrap();

        let names: Vec<String> = catalog.list_attributes(false).into_iter().map(|a| a.name).collect();
        assert_eq!(names, vec!["Color", "Material"]);
        assert_eq!(catalog.list_attributes(true).len(), 1);
    }

    #[test]
    fn test_type_change_migrates_values() {
        let (_dir, mut catalog) = open_catalog();
        let category = catalog.define_category(NewCategory::new("Shoes")).unwrap();
        let size = catalog.define_attribute(NewAttribute::new("Shoe Size", DataType::Text)).unwrap();
        catalog
            .bind_attribute(category.id, BindAttribute::existing(size.id))
            .unwrap();
        let product = catalog
            .create_product(
                NewProduct::new(category.id, "SHO-1", "Runner").with_attributes(payload(json!({"Shoe Size": "9"}))),
            )
            .unwrap();
        assert_eq!(product.attribute("Shoe Size"), Some(&json!("9")));

        catalog
            .update_attribute(
                size.id,
                AttributePatch {
                    data_type: Some(DataType::Number),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(
            catalog.get_product(product.product.id).unwrap().attribute("Shoe Size"),
            Some(&json!(9))
        );
    }

    #[test]
    fn test_incompatible_migration_is_rejected() {
        let (_dir, mut catalog) = open_catalog();
        let category = catalog.define_category(NewCategory::new("Dresses")).unwrap();
        let color = catalog.define_attribute(NewAttribute::new("Color", DataType::Text)).unwrap();
        catalog
            .bind_attribute(category.id, BindAttribute::existing(color.id))
            .unwrap();
        catalog
            .create_product(NewProduct::new(category.id, "DRS-1", "Dress").with_attributes(payload(json!({"Color": "Red"}))))
            .unwrap();

        let err = catalog
            .update_attribute(
                color.id,
                AttributePatch {
                    data_type: Some(DataType::Number),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(
            catalog.get_attribute(&AttributeRef::ById(color.id)).unwrap().data_type,
            DataType::Text
        );
    }

    #[test]
    fn test_leaving_enum_clears_domain() {
        let (_dir, mut catalog) = open_catalog();
        let size = catalog
            .define_attribute(
                NewAttribute::new("Size", DataType::Enum).with_allowed_values(vec![json!("S"), json!("M")]),
            )
            .unwrap();
        let updated = catalog
            .update_attribute(
                size.id,
                AttributePatch {
                    data_type: Some(DataType::Text),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.allowed_values, None);
    }

    #[test]
    fn test_guarded_delete() {
        let (_dir, mut catalog) = open_catalog();
        let category = catalog.define_category(NewCategory::new("Dresses")).unwrap();
        let color = catalog.define_attribute(NewAttribute::new("Color", DataType::Text)).unwrap();
        catalog
            .bind_attribute(category.id, BindAttribute::existing(color.id))
            .unwrap();

        assert!(catalog.delete_attribute(color.id).unwrap_err().is_conflict());

        catalog.unbind_attribute(category.id, color.id, false).unwrap();
        assert!(catalog.delete_attribute(color.id).unwrap().deleted);
        assert!(catalog.delete_attribute(color.id).unwrap_err().is_not_found());
    }
}
