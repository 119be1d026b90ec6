//! Product operations
//!
//! Writes follow one path: resolve the category schema, normalize and
//! coerce the supplied values, enforce required and unique bindings over the
//! complete value set, then persist the product row and its values in one
//! transaction.

use std::collections::BTreeMap;

use chrono::Utc;
use serde_json::Value;

use super::enforce::enforce;
use super::errors::{CatalogError, CatalogResult};
use super::normalize::{coerce_all, normalize};
use super::requests::{NewProduct, ProductFilter, ProductPatch};
use super::views::{Page, ProductView};
use super::Catalog;
use crate::schema::{decode_value, encode_value, CategorySchema, DataType};
use crate::storage::{
    AttributeId, CategoryId, Mutation, Product, ProductId, ProductStatus, StoredValue, Timestamp,
};

impl Catalog {
    pub fn create_product(&mut self, input: NewProduct) -> CatalogResult<ProductView> {
        self.require_active_category(input.category_id)?;

        let now = Utc::now();
        let product = Product {
            id: self.tables().next_product_id(),
            category_id: input.category_id,
            sku: input.sku,
            name: input.name,
            description: input.description,
            price: input.price.unwrap_or(0.0),
            currency: input
                .currency
                .unwrap_or_else(|| self.settings.default_currency.clone()),
            status: input.status.unwrap_or_default(),
            created_at: now,
            updated_at: now,
        };
        check_product_fields(&product)?;

        let schema = self.resolve_schema(product.category_id)?;
        let raw = match input.attributes {
            Some(payload) => normalize(&schema, &payload)?,
            None => BTreeMap::new(),
        };
        let mut values = coerce_all(&schema, raw)?;
        enforce(self.tables(), &schema, None, &mut values)?;

        self.check_sku(&product.sku, None)?;

        let value_rows = stored_rows(&schema_types(&schema), product.id, &values, now);

        let mut txn = self.store.begin();
        txn.apply(Mutation::PutProduct {
            product: product.clone(),
        })?;
        for value in value_rows {
            txn.apply(Mutation::PutValue { value })?;
        }
        txn.commit()?;

        Ok(ProductView::build(self.tables(), &product))
    }

    pub fn get_product(&self, id: ProductId) -> CatalogResult<ProductView> {
        let product = self.require_product(id)?;
        Ok(ProductView::build(self.tables(), product))
    }

    /// Lists products, newest update first.
    pub fn list_products(&self, filter: &ProductFilter) -> Page<ProductView> {
        let needle = filter
            .q
            .as_deref()
            .filter(|q| !q.is_empty())
            .map(str::to_lowercase);

        let mut matches: Vec<&Product> = self
            .tables()
            .products()
            .filter(|p| filter.category_id.map_or(true, |id| p.category_id == id))
            .filter(|p| filter.status.map_or(true, |s| p.status == s))
            .filter(|p| {
                needle.as_deref().map_or(true, |q| {
                    p.name.to_lowercase().contains(q) || p.sku.to_lowercase().contains(q)
                })
            })
            .collect();
        matches.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then(b.id.cmp(&a.id)));

        let page = filter.page.unwrap_or(1).max(1);
        let page_size = filter
            .page_size
            .unwrap_or(self.settings.default_page_size)
            .clamp(1, self.settings.max_page_size.max(1));
        let offset = (page as usize - 1).saturating_mul(page_size as usize);

        let items = matches
            .iter()
            .skip(offset)
            .take(page_size as usize)
            .map(|p| ProductView::build(self.tables(), p))
            .collect();

        Page {
            page,
            page_size,
            total: matches.len(),
            items,
        }
    }

    /// Updates scalar fields and merges attribute values.
    ///
    /// Supplied values are overlaid on the product's stored values and the
    /// merged set is enforced against the (possibly new) category. Values
    /// not named in the payload are left as stored.
    pub fn update_product(
        &mut self,
        id: ProductId,
        patch: ProductPatch,
    ) -> CatalogResult<ProductView> {
        let current = self.require_product(id)?.clone();
        let mut next = current.clone();

        if let Some(category_id) = patch.category_id {
            if category_id != current.category_id {
                self.require_active_category(category_id)?;
            }
            next.category_id = category_id;
        }
        if let Some(sku) = patch.sku {
            next.sku = sku;
        }
        if let Some(name) = patch.name {
            next.name = name;
        }
        if let Some(description) = patch.description {
            next.description = description;
        }
        if let Some(price) = patch.price {
            next.price = price;
        }
        if let Some(currency) = patch.currency {
            next.currency = currency;
        }
        if let Some(status) = patch.status {
            next.status = status;
        }
        let now = Utc::now();
        next.updated_at = now;
        check_product_fields(&next)?;

        let value_rows = match patch.attributes {
            Some(payload) => {
                let schema = self.resolve_schema(next.category_id)?;
                let supplied = coerce_all(&schema, normalize(&schema, &payload)?)?;

                let mut merged: BTreeMap<AttributeId, Value> = self
                    .tables()
                    .values_for_product(id)
                    .filter_map(|stored| {
                        self.tables().attribute(stored.attribute_id).map(|attribute| {
                            (
                                stored.attribute_id,
                                decode_value(attribute.data_type, &stored.value_text),
                            )
                        })
                    })
                    .collect();
                merged.extend(supplied.iter().map(|(k, v)| (*k, v.clone())));

                let injected = enforce(self.tables(), &schema, Some(id), &mut merged)?;

                let mut writes = supplied;
                for attribute_id in injected {
                    if let Some(value) = merged.remove(&attribute_id) {
                        writes.insert(attribute_id, value);
                    }
                }
                stored_rows(&schema_types(&schema), id, &writes, now)
            }
            None => Vec::new(),
        };

        self.check_sku(&next.sku, Some(id))?;

        let mut txn = self.store.begin();
        txn.apply(Mutation::PutProduct {
            product: next.clone(),
        })?;
        for value in value_rows {
            txn.apply(Mutation::PutValue { value })?;
        }
        txn.commit()?;

        Ok(ProductView::build(self.tables(), &next))
    }

    /// Soft delete: status becomes INACTIVE.
    pub fn deactivate_product(&mut self, id: ProductId) -> CatalogResult<ProductView> {
        let mut next = self.require_product(id)?.clone();
        next.status = ProductStatus::Inactive;
        next.updated_at = Utc::now();

        let mut txn = self.store.begin();
        txn.apply(Mutation::PutProduct {
            product: next.clone(),
        })?;
        txn.commit()?;

        Ok(ProductView::build(self.tables(), &next))
    }

    fn require_active_category(&self, category_id: CategoryId) -> CatalogResult<()> {
        match self.tables().category(category_id) {
            Some(category) if category.is_active => Ok(()),
            _ => Err(CatalogError::validation("Invalid or inactive category")),
        }
    }

    fn check_sku(&self, sku: &str, own_id: Option<ProductId>) -> CatalogResult<()> {
        match self.tables().product_by_sku(sku) {
            Some(existing) if Some(existing.id) != own_id => Err(CatalogError::conflict(format!(
                "SKU '{}' already exists",
                sku
            ))),
            _ => Ok(()),
        }
    }
}

fn check_product_fields(product: &Product) -> CatalogResult<()> {
    if product.sku.trim().is_empty() {
        return Err(CatalogError::validation("Product sku must not be empty"));
    }
    if product.name.trim().is_empty() {
        return Err(CatalogError::validation("Product name must not be empty"));
    }
    if !product.price.is_finite() || product.price < 0.0 {
        return Err(CatalogError::validation(
            "Product price must be a non-negative number",
        ));
    }
    if product.currency.len() != 3 || !product.currency.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(CatalogError::validation(format!(
            "Currency '{}' must be a 3-letter code",
            product.currency
        )));
    }
    Ok(())
}

fn schema_types(schema: &CategorySchema) -> BTreeMap<AttributeId, DataType> {
    schema
        .entries()
        .iter()
        .map(|e| (e.attribute.id, e.attribute.data_type))
        .collect()
}

fn stored_rows(
    types: &BTreeMap<AttributeId, DataType>,
    product_id: ProductId,
    values: &BTreeMap<AttributeId, Value>,
    now: Timestamp,
) -> Vec<StoredValue> {
    values
        .iter()
        .filter_map(|(attribute_id, value)| {
            types.get(attribute_id).map(|data_type| StoredValue {
                product_id,
                attribute_id: *attribute_id,
                value_text: encode_value(*data_type, value),
                updated_at: now,
            })
        })
        .collect()
}
