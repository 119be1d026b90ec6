//! Category operations

use chrono::Utc;

use super::errors::{CatalogError, CatalogResult};
use super::requests::{CategoryPatch, NewCategory};
use super::views::{BindingView, CategoryView};
use super::{require_name, Catalog};
use crate::storage::{Category, CategoryId, Mutation};

impl Catalog {
    pub fn define_category(&mut self, input: NewCategory) -> CatalogResult<Category> {
        let name = require_name("Category", &input.name)?;
        self.check_category_name(&name, None)?;

        let now = Utc::now();
        let category = Category {
            id: self.tables().next_category_id(),
            name,
            description: input.description,
            is_active: input.is_active,
            created_at: now,
            updated_at: now,
        };

        let mut txn = self.store.begin();
        txn.apply(Mutation::PutCategory {
            category: category.clone(),
        })?;
        txn.commit()?;

        Ok(category)
    }

    pub fn get_category(&self, id: CategoryId) -> CatalogResult<Category> {
        self.require_category(id).cloned()
    }

    /// Lists categories ordered by name, optionally with their bindings.
    pub fn list_categories(&self, include_attributes: bool) -> Vec<CategoryView> {
        let mut categories: Vec<&Category> = self.tables().categories().collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name));

        categories
            .into_iter()
            .map(|category| CategoryView {
                category: category.clone(),
                attributes: include_attributes.then(|| self.binding_views(category.id)),
            })
            .collect()
    }

    pub fn update_category(
        &mut self,
        id: CategoryId,
        patch: CategoryPatch,
    ) -> CatalogResult<Category> {
        let mut next = self.require_category(id)?.clone();

        if let Some(name) = patch.name {
            next.name = require_name("Category", &name)?;
            self.check_category_name(&next.name, Some(id))?;
        }
        if let Some(description) = patch.description {
            next.description = description;
        }
        if let Some(is_active) = patch.is_active {
            next.is_active = is_active;
        }
        next.updated_at = Utc::now();

        self.put_category(next)
    }

    /// Soft delete: the category stays, inactive.
    pub fn deactivate_category(&mut self, id: CategoryId) -> CatalogResult<Category> {
        let mut next = self.require_category(id)?.clone();
        next.is_active = false;
        next.updated_at = Utc::now();

        self.put_category(next)
    }

    fn put_category(&mut self, category: Category) -> CatalogResult<Category> {
        let mut txn = self.store.begin();
        txn.apply(Mutation::PutCategory {
            category: category.clone(),
        })?;
        txn.commit()?;
        Ok(category)
    }

    fn check_category_name(&self, name: &str, own_id: Option<CategoryId>) -> CatalogResult<()> {
        match self.tables().category_by_name(name) {
            Some(existing) if Some(existing.id) != own_id => Err(CatalogError::conflict(format!(
                "Category '{}' already exists",
                name
            ))),
            _ => Ok(()),
        }
    }

    /// Binding views of a category in schema order
    pub(super) fn binding_views(&self, category_id: CategoryId) -> Vec<BindingView> {
        self.resolve_schema(category_id)
            .map(|schema| {
                schema
                    .entries()
                    .iter()
                    .map(|e| BindingView::new(&e.binding, &e.attribute))
                    .collect()
            })
            .unwrap_or_default()
    }
}
