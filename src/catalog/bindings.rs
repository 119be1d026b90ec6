//! Category-attribute binding operations

use std::collections::HashSet;

use chrono::Utc;
use serde_json::Value;
use tracing::info;

use super::errors::{CatalogError, CatalogResult};
use super::requests::{BindAttribute, BindingPatch};
use super::views::{BindingView, Unbound};
use super::Catalog;
use crate::observability::Event;
use crate::schema::coerce;
use crate::storage::{Attribute, AttributeId, Binding, CategoryId, Mutation};

impl Catalog {
    /// Binds an attribute to a category.
    ///
    /// An inline attribute definition is created and bound in one
    /// transaction. Returns the category's bindings.
    pub fn bind_attribute(
        &mut self,
        category_id: CategoryId,
        input: BindAttribute,
    ) -> CatalogResult<Vec<BindingView>> {
        self.require_category(category_id)?;

        let (attribute, created) = match (input.attribute_id, input.attribute) {
            (Some(id), _) => (self.require_attribute(id)?.clone(), false),
            (None, Some(definition)) => {
                let id = self.tables().next_attribute_id();
                (self.prepare_attribute(definition, id)?, true)
            }
            (None, None) => {
                return Err(CatalogError::validation("attribute_id or attribute required"))
            }
        };

        if self.tables().binding(category_id, attribute.id).is_some() {
            return Err(CatalogError::conflict(
                "Attribute already mapped to this category",
            ));
        }

        let default_value = coerce_default(&attribute, input.default_value)?;
        let now = Utc::now();
        let binding = Binding {
            category_id,
            attribute_id: attribute.id,
            is_required: input.is_required,
            is_unique: input.is_unique,
            default_value,
            position: input.position,
            created_at: now,
            updated_at: now,
        };

        let mut txn = self.store.begin();
        if created {
            txn.apply(Mutation::PutAttribute { attribute })?;
        }
        txn.apply(Mutation::PutBinding { binding })?;
        txn.commit()?;

        self.list_bindings(category_id)
    }

    /// Bindings of a category ordered by position, then attribute name.
    pub fn list_bindings(&self, category_id: CategoryId) -> CatalogResult<Vec<BindingView>> {
        self.require_category(category_id)?;
        Ok(self.binding_views(category_id))
    }

    /// Merges `patch` into an existing binding.
    pub fn update_binding(
        &mut self,
        category_id: CategoryId,
        attribute_id: AttributeId,
        patch: BindingPatch,
    ) -> CatalogResult<Vec<BindingView>> {
        let current = self
            .tables()
            .binding(category_id, attribute_id)
            .cloned()
            .ok_or_else(|| CatalogError::not_found("Mapping not found"))?;
        let attribute = self.require_attribute(attribute_id)?.clone();

        let mut next = current.clone();
        if let Some(is_required) = patch.is_required {
            next.is_required = is_required;
        }
        if let Some(is_unique) = patch.is_unique {
            next.is_unique = is_unique;
        }
        if let Some(default_value) = patch.default_value {
            next.default_value = coerce_default(&attribute, default_value)?;
        }
        if let Some(position) = patch.position {
            next.position = position;
        }
        next.updated_at = Utc::now();

        if next.is_unique && !current.is_unique {
            self.check_no_duplicates(category_id, &attribute)?;
        }

        let mut txn = self.store.begin();
        txn.apply(Mutation::PutBinding { binding: next })?;
        txn.commit()?;

        self.list_bindings(category_id)
    }

    /// Removes a binding.
    ///
    /// Products of the category holding a value for the attribute block the
    /// removal unless `force` is set, in which case those values are deleted
    /// with the binding.
    pub fn unbind_attribute(
        &mut self,
        category_id: CategoryId,
        attribute_id: AttributeId,
        force: bool,
    ) -> CatalogResult<Unbound> {
        if self.tables().binding(category_id, attribute_id).is_none() {
            return Err(CatalogError::not_found("Mapping not found"));
        }

        let held: Vec<_> = self
            .tables()
            .category_values_for_attribute(category_id, attribute_id)
            .map(|v| v.product_id)
            .collect();

        if !held.is_empty() && !force {
            return Err(CatalogError::conflict(
                "Attribute has product values. Use force=true to remove along with values.",
            ));
        }

        let mut txn = self.store.begin();
        for &product_id in &held {
            txn.apply(Mutation::DeleteValue {
                product_id,
                attribute_id,
            })?;
        }
        txn.apply(Mutation::DeleteBinding {
            category_id,
            attribute_id,
        })?;
        txn.commit()?;

        if !held.is_empty() {
            info!(
                event = %Event::ForcedUnbind,
                category_id,
                attribute_id,
                removed_values = held.len(),
                "binding removed with its values"
            );
        }

        Ok(Unbound {
            unmapped: true,
            removed_values: held.len(),
        })
    }

    fn check_no_duplicates(
        &self,
        category_id: CategoryId,
        attribute: &Attribute,
    ) -> CatalogResult<()> {
        let mut seen = HashSet::new();
        for stored in self
            .tables()
            .category_values_for_attribute(category_id, attribute.id)
        {
            if !seen.insert(stored.value_text.as_str()) {
                return Err(CatalogError::conflict(format!(
                    "Cannot make attribute '{}' unique: products in this category share the value '{}'",
                    attribute.name, stored.value_text
                )));
            }
        }
        Ok(())
    }
}

/// Validates a binding default under the attribute's type.
fn coerce_default(attribute: &Attribute, value: Option<Value>) -> CatalogResult<Option<Value>> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(value) => coerce(attribute, &value).map(Some).map_err(|e| {
            CatalogError::validation(format!(
                "Invalid default_value for attribute '{}': {}",
                attribute.name, e
            ))
        }),
    }
}
