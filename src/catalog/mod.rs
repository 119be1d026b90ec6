//! Catalog engine
//!
//! Attributes, categories, category-attribute bindings and products, with
//! every product write validated against its category's live schema.
//!
//! Each operation validates completely before it touches the store, then
//! writes through a single store transaction.

mod attributes;
mod bindings;
mod categories;
mod enforce;
mod errors;
mod normalize;
mod products;
mod requests;
mod seed;
mod views;

#[cfg(test)]
pub(crate) mod testing;

use std::path::Path;

pub use enforce::enforce;
pub use errors::{CatalogError, CatalogResult};
pub use normalize::{coerce_all, normalize};
pub use requests::{
    AttributeItem, AttributePatch, AttributePayload, BindAttribute, BindingPatch, CategoryPatch,
    NewAttribute, NewCategory, NewProduct, ProductFilter, ProductPatch,
};
pub use seed::{seed_demo, SeedReport};
pub use views::{BindingView, CategoryView, Compacted, Deleted, Page, ProductView, Unbound};

use crate::schema::{resolve, CategorySchema};
use crate::storage::{
    Attribute, AttributeId, Category, CategoryId, CatalogStore, Product, ProductId, Tables,
};

/// Engine defaults taken from configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogSettings {
    pub default_currency: String,
    pub default_page_size: u32,
    pub max_page_size: u32,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            default_currency: "INR".to_string(),
            default_page_size: 25,
            max_page_size: 100,
        }
    }
}

#[derive(Debug)]
pub struct Catalog {
    store: CatalogStore,
    settings: CatalogSettings,
}

impl Catalog {
    /// Opens the store in `data_dir` and recovers its state.
    pub fn open(data_dir: &Path, settings: CatalogSettings) -> CatalogResult<Self> {
        let store = CatalogStore::open(data_dir)?;
        Ok(Self::with_store(store, settings))
    }

    pub fn with_store(store: CatalogStore, settings: CatalogSettings) -> Self {
        Self { store, settings }
    }

    pub fn settings(&self) -> &CatalogSettings {
        &self.settings
    }

    pub fn store(&self) -> &CatalogStore {
        &self.store
    }

    /// True once a fatal WAL failure has closed the store to writes.
    pub fn is_halted(&self) -> bool {
        self.store.is_halted()
    }

    pub(crate) fn tables(&self) -> &Tables {
        self.store.tables()
    }

    /// Resolves the live schema of a category.
    pub fn resolve_schema(&self, category_id: CategoryId) -> CatalogResult<CategorySchema> {
        resolve(self.tables(), category_id)
            .ok_or_else(|| CatalogError::not_found("Category not found"))
    }

    /// Snapshots the store and truncates its WAL.
    pub fn compact(&mut self) -> CatalogResult<Compacted> {
        let last_sequence = self.store.compact()?;
        Ok(Compacted { last_sequence })
    }

    fn require_attribute(&self, id: AttributeId) -> CatalogResult<&Attribute> {
        self.tables()
            .attribute(id)
            .ok_or_else(|| CatalogError::not_found("Attribute not found"))
    }

    fn require_category(&self, id: CategoryId) -> CatalogResult<&Category> {
        self.tables()
            .category(id)
            .ok_or_else(|| CatalogError::not_found("Category not found"))
    }

    fn require_product(&self, id: ProductId) -> CatalogResult<&Product> {
        self.tables()
            .product(id)
            .ok_or_else(|| CatalogError::not_found("Product not found"))
    }
}

/// Rejects empty or blank names.
fn require_name(kind: &str, name: &str) -> CatalogResult<String> {
    if name.trim().is_empty() {
        return Err(CatalogError::validation(format!("{} name must not be empty", kind)));
    }
    Ok(name.to_string())
}
