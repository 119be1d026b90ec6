//! In-memory relational tables
//!
//! Rows live in ordered maps keyed by primary key. Name and SKU indexes back
//! the unique constraints. Every applied mutation yields an [`Undo`] entry
//! that restores the previous row image.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use super::errors::{StorageError, StorageResult};
use super::mutation::Mutation;
use super::records::{
    Attribute, AttributeId, Binding, Category, CategoryId, Product, ProductId, StoredValue,
};

/// Previous row image for one applied mutation
#[derive(Debug, Clone)]
pub(crate) enum Undo {
    Attribute(AttributeId, Option<Attribute>),
    Category(CategoryId, Option<Category>),
    Binding((CategoryId, AttributeId), Option<Binding>),
    Product(ProductId, Option<Product>),
    Value((ProductId, AttributeId), Option<StoredValue>),
}

/// Flat row lists, used for snapshots
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableImage {
    pub attributes: Vec<Attribute>,
    pub categories: Vec<Category>,
    pub bindings: Vec<Binding>,
    pub products: Vec<Product>,
    pub values: Vec<StoredValue>,
}

#[derive(Debug, Clone, Default)]
pub struct Tables {
    attributes: BTreeMap<AttributeId, Attribute>,
    categories: BTreeMap<CategoryId, Category>,
    bindings: BTreeMap<(CategoryId, AttributeId), Binding>,
    products: BTreeMap<ProductId, Product>,
    values: BTreeMap<(ProductId, AttributeId), StoredValue>,

    attribute_names: HashMap<String, AttributeId>,
    category_names: HashMap<String, CategoryId>,
    product_skus: HashMap<String, ProductId>,
}

impl Tables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds tables from a snapshot image, re-checking every constraint.
    pub fn from_image(image: TableImage) -> StorageResult<Self> {
        let mut tables = Tables::new();
        let puts = image
            .attributes
            .into_iter()
            .map(|attribute| Mutation::PutAttribute { attribute })
            .chain(image.categories.into_iter().map(|category| Mutation::PutCategory { category }))
            .chain(image.bindings.into_iter().map(|binding| Mutation::PutBinding { binding }))
            .chain(image.products.into_iter().map(|product| Mutation::PutProduct { product }))
            .chain(image.values.into_iter().map(|value| Mutation::PutValue { value }));

        for mutation in puts {
            tables
                .apply(&mutation)
                .map_err(|e| StorageError::Corrupt(format!("snapshot rejected: {}", e)))?;
        }
        Ok(tables)
    }

    pub fn to_image(&self) -> TableImage {
        TableImage {
            attributes: self.attributes.values().cloned().collect(),
            categories: self.categories.values().cloned().collect(),
            bindings: self.bindings.values().cloned().collect(),
            products: self.products.values().cloned().collect(),
            values: self.values.values().cloned().collect(),
        }
    }

    // ==================
    // Mutation
    // ==================

    /// Checks storage constraints and applies one mutation.
    ///
    /// On error nothing has changed.
    pub(crate) fn apply(&mut self, mutation: &Mutation) -> StorageResult<Undo> {
        match mutation {
            Mutation::PutAttribute { attribute } => {
                if let Some(&owner) = self.attribute_names.get(&attribute.name) {
                    if owner != attribute.id {
                        return Err(StorageError::unique("attributes.name", &attribute.name));
                    }
                }
                let previous = self.set_attribute(attribute.id, Some(attribute.clone()));
                Ok(Undo::Attribute(attribute.id, previous))
            }
            Mutation::DeleteAttribute { id } => {
                if !self.attributes.contains_key(id) {
                    return Err(StorageError::not_found("attributes", id));
                }
                if self.attribute_is_bound(*id) {
                    return Err(StorageError::Restricted {
                        table: "attributes",
                        key: id.to_string(),
                        referenced_by: "category_attributes",
                    });
                }
                if self.attribute_has_values(*id) {
                    return Err(StorageError::Restricted {
                        table: "attributes",
                        key: id.to_string(),
                        referenced_by: "product_attribute_values",
                    });
                }
                let previous = self.set_attribute(*id, None);
                Ok(Undo::Attribute(*id, previous))
            }
            Mutation::PutCategory { category } => {
                if let Some(&owner) = self.category_names.get(&category.name) {
                    if owner != category.id {
                        return Err(StorageError::unique("categories.name", &category.name));
                    }
                }
                let previous = self.set_category(category.id, Some(category.clone()));
                Ok(Undo::Category(category.id, previous))
            }
            Mutation::PutBinding { binding } => {
                if !self.categories.contains_key(&binding.category_id) {
                    return Err(StorageError::foreign_key(
                        "category_attributes.category_id",
                        binding.category_id,
                    ));
                }
                if !self.attributes.contains_key(&binding.attribute_id) {
                    return Err(StorageError::foreign_key(
                        "category_attributes.attribute_id",
                        binding.attribute_id,
                    ));
                }
                let previous = self.bindings.insert(binding.key(), binding.clone());
                Ok(Undo::Binding(binding.key(), previous))
            }
            Mutation::DeleteBinding {
                category_id,
                attribute_id,
            } => {
                let key = (*category_id, *attribute_id);
                match self.bindings.remove(&key) {
                    Some(previous) => Ok(Undo::Binding(key, Some(previous))),
                    None => Err(StorageError::not_found(
                        "category_attributes",
                        format!("({}, {})", category_id, attribute_id),
                    )),
                }
            }
            Mutation::PutProduct { product } => {
                if !self.categories.contains_key(&product.category_id) {
                    return Err(StorageError::foreign_key(
                        "products.category_id",
                        product.category_id,
                    ));
                }
                if let Some(&owner) = self.product_skus.get(&product.sku) {
                    if owner != product.id {
                        return Err(StorageError::unique("products.sku", &product.sku));
                    }
                }
                let previous = self.set_product(product.id, Some(product.clone()));
                Ok(Undo::Product(product.id, previous))
            }
            Mutation::PutValue { value } => {
                if !self.products.contains_key(&value.product_id) {
                    return Err(StorageError::foreign_key(
                        "product_attribute_values.product_id",
                        value.product_id,
                    ));
                }
                if !self.attributes.contains_key(&value.attribute_id) {
                    return Err(StorageError::foreign_key(
                        "product_attribute_values.attribute_id",
                        value.attribute_id,
                    ));
                }
                let previous = self.values.insert(value.key(), value.clone());
                Ok(Undo::Value(value.key(), previous))
            }
            Mutation::DeleteValue {
                product_id,
                attribute_id,
            } => {
                let key = (*product_id, *attribute_id);
                match self.values.remove(&key) {
                    Some(previous) => Ok(Undo::Value(key, Some(previous))),
                    None => Err(StorageError::not_found(
                        "product_attribute_values",
                        format!("({}, {})", product_id, attribute_id),
                    )),
                }
            }
        }
    }

    /// Restores the row image captured by `apply`.
    pub(crate) fn revert(&mut self, undo: Undo) {
        match undo {
            Undo::Attribute(id, previous) => {
                self.set_attribute(id, previous);
            }
            Undo::Category(id, previous) => {
                self.set_category(id, previous);
            }
            Undo::Binding(key, previous) => match previous {
                Some(row) => {
                    self.bindings.insert(key, row);
                }
                None => {
                    self.bindings.remove(&key);
                }
            },
            Undo::Product(id, previous) => {
                self.set_product(id, previous);
            }
            Undo::Value(key, previous) => match previous {
                Some(row) => {
                    self.values.insert(key, row);
                }
                None => {
                    self.values.remove(&key);
                }
            },
        }
    }

    fn set_attribute(&mut self, id: AttributeId, row: Option<Attribute>) -> Option<Attribute> {
        let previous = match row {
            Some(row) => {
                self.attribute_names.insert(row.name.clone(), id);
                self.attributes.insert(id, row)
            }
            None => self.attributes.remove(&id),
        };
        if let Some(ref old) = previous {
            if self.attributes.get(&id).map(|a| &a.name) != Some(&old.name) {
                self.attribute_names.remove(&old.name);
            }
        }
        previous
    }

    fn set_category(&mut self, id: CategoryId, row: Option<Category>) -> Option<Category> {
        let previous = match row {
            Some(row) => {
                self.category_names.insert(row.name.clone(), id);
                self.categories.insert(id, row)
            }
            None => self.categories.remove(&id),
        };
        if let Some(ref old) = previous {
            if self.categories.get(&id).map(|c| &c.name) != Some(&old.name) {
                self.category_names.remove(&old.name);
            }
        }
        previous
    }

    fn set_product(&mut self, id: ProductId, row: Option<Product>) -> Option<Product> {
        let previous = match row {
            Some(row) => {
                self.product_skus.insert(row.sku.clone(), id);
                self.products.insert(id, row)
            }
            None => self.products.remove(&id),
        };
        if let Some(ref old) = previous {
            if self.products.get(&id).map(|p| &p.sku) != Some(&old.sku) {
                self.product_skus.remove(&old.sku);
            }
        }
        previous
    }

    // ==================
    // Identity
    // ==================

    pub fn next_attribute_id(&self) -> AttributeId {
        self.attributes.keys().next_back().map_or(1, |id| id + 1)
    }

    pub fn next_category_id(&self) -> CategoryId {
        self.categories.keys().next_back().map_or(1, |id| id + 1)
    }

    pub fn next_product_id(&self) -> ProductId {
        self.products.keys().next_back().map_or(1, |id| id + 1)
    }

    // ==================
    // Queries
    // ==================

    pub fn attribute(&self, id: AttributeId) -> Option<&Attribute> {
        self.attributes.get(&id)
    }

    pub fn attribute_by_name(&self, name: &str) -> Option<&Attribute> {
        self.attribute_names
            .get(name)
            .and_then(|id| self.attributes.get(id))
    }

    /// All attributes in id order
    pub fn attributes(&self) -> impl Iterator<Item = &Attribute> {
        self.attributes.values()
    }

    pub fn category(&self, id: CategoryId) -> Option<&Category> {
        self.categories.get(&id)
    }

    pub fn category_by_name(&self, name: &str) -> Option<&Category> {
        self.category_names
            .get(name)
            .and_then(|id| self.categories.get(id))
    }

    pub fn categories(&self) -> impl Iterator<Item = &Category> {
        self.categories.values()
    }

    pub fn binding(&self, category_id: CategoryId, attribute_id: AttributeId) -> Option<&Binding> {
        self.bindings.get(&(category_id, attribute_id))
    }

    /// Bindings of one category in attribute id order
    pub fn bindings_for_category(&self, category_id: CategoryId) -> impl Iterator<Item = &Binding> {
        self.bindings
            .range((category_id, AttributeId::MIN)..=(category_id, AttributeId::MAX))
            .map(|(_, binding)| binding)
    }

    /// Bindings of one attribute across all categories
    pub fn bindings_for_attribute(
        &self,
        attribute_id: AttributeId,
    ) -> impl Iterator<Item = &Binding> {
        self.bindings
            .values()
            .filter(move |b| b.attribute_id == attribute_id)
    }

    pub fn attribute_is_bound(&self, attribute_id: AttributeId) -> bool {
        self.bindings_for_attribute(attribute_id).next().is_some()
    }

    pub fn product(&self, id: ProductId) -> Option<&Product> {
        self.products.get(&id)
    }

    pub fn product_by_sku(&self, sku: &str) -> Option<&Product> {
        self.product_skus.get(sku).and_then(|id| self.products.get(id))
    }

    pub fn products(&self) -> impl Iterator<Item = &Product> {
        self.products.values()
    }

    pub fn value(&self, product_id: ProductId, attribute_id: AttributeId) -> Option<&StoredValue> {
        self.values.get(&(product_id, attribute_id))
    }

    /// Values of one product in attribute id order
    pub fn values_for_product(&self, product_id: ProductId) -> impl Iterator<Item = &StoredValue> {
        self.values
            .range((product_id, AttributeId::MIN)..=(product_id, AttributeId::MAX))
            .map(|(_, value)| value)
    }

    pub fn values_for_attribute(
        &self,
        attribute_id: AttributeId,
    ) -> impl Iterator<Item = &StoredValue> {
        self.values
            .values()
            .filter(move |v| v.attribute_id == attribute_id)
    }

    pub fn attribute_has_values(&self, attribute_id: AttributeId) -> bool {
        self.values_for_attribute(attribute_id).next().is_some()
    }

    /// Values for an attribute held by products of one category
    pub fn category_values_for_attribute(
        &self,
        category_id: CategoryId,
        attribute_id: AttributeId,
    ) -> impl Iterator<Item = &StoredValue> {
        self.values_for_attribute(attribute_id).filter(move |v| {
            self.products
                .get(&v.product_id)
                .map_or(false, |p| p.category_id == category_id)
        })
    }

    /// Finds a product in the category, other than `exclude`, storing exactly `value_text`.
    pub fn find_value_owner(
        &self,
        category_id: CategoryId,
        attribute_id: AttributeId,
        value_text: &str,
        exclude: Option<ProductId>,
    ) -> Option<ProductId> {
        self.category_values_for_attribute(category_id, attribute_id)
            .find(|v| v.value_text == value_text && Some(v.product_id) != exclude)
            .map(|v| v.product_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::DataType;
    use chrono::Utc;

    fn attribute(id: AttributeId, name: &str) -> Attribute {
        let now = Utc::now();
        Attribute {
            id,
            name: name.to_string(),
            data_type: DataType::Text,
            allowed_values: None,
            validation_regex: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn category(id: CategoryId, name: &str) -> Category {
        let now = Utc::now();
        Category {
            id,
            name: name.to_string(),
            description: String::new(),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn binding(category_id: CategoryId, attribute_id: AttributeId) -> Binding {
        let now = Utc::now();
        Binding {
            category_id,
            attribute_id,
            is_required: false,
            is_unique: false,
            default_value: None,
            position: 0,
            created_at: now,
            updated_at: now,
        }
    }

    fn product(id: ProductId, category_id: CategoryId, sku: &str) -> Product {
        let now = Utc::now();
        Product {
            id,
            category_id,
            sku: sku.to_string(),
            name: sku.to_string(),
            description: String::new(),
            price: 0.0,
            currency: "INR".to_string(),
            status: Default::default(),
            created_at: now,
            updated_at: now,
        }
    }

    fn value(product_id: ProductId, attribute_id: AttributeId, text: &str) -> StoredValue {
        StoredValue {
            product_id,
            attribute_id,
            value_text: text.to_string(),
            updated_at: Utc::now(),
        }
    }

    fn seeded() -> Tables {
        let mut tables = Tables::new();
        tables.apply(&Mutation::PutAttribute { attribute: attribute(1, "Color") }).unwrap();
        tables.apply(&Mutation::PutCategory { category: category(1, "Dresses") }).unwrap();
        tables.apply(&Mutation::PutBinding { binding: binding(1, 1) }).unwrap();
        tables.apply(&Mutation::PutProduct { product: product(1, 1, "DRS-1") }).unwrap();
        tables.apply(&Mutation::PutValue { value: value(1, 1, "Red") }).unwrap();
        tables
    }

    #[test]
    fn test_attribute_name_is_unique() {
        let mut tables = seeded();
        let err = tables
            .apply(&Mutation::PutAttribute { attribute: attribute(2, "Color") })
            .unwrap_err();
        assert!(matches!(err, StorageError::UniqueViolation { constraint: "attributes.name", .. }));
        assert!(tables.attribute(2).is_none());
    }

    #[test]
    fn test_rename_frees_old_name() {
        let mut tables = seeded();
        tables.apply(&Mutation::PutAttribute { attribute: attribute(1, "Colour") }).unwrap();
        assert!(tables.attribute_by_name("Color").is_none());
        assert_eq!(tables.attribute_by_name("Colour").unwrap().id, 1);

        tables.apply(&Mutation::PutAttribute { attribute: attribute(2, "Color") }).unwrap();
    }

    #[test]
    fn test_sku_is_unique() {
        let mut tables = seeded();
        let err = tables
            .apply(&Mutation::PutProduct { product: product(2, 1, "DRS-1") })
            .unwrap_err();
        assert!(matches!(err, StorageError::UniqueViolation { constraint: "products.sku", .. }));
    }

    #[test]
    fn test_foreign_keys_enforced() {
        let mut tables = seeded();
        assert!(matches!(
            tables.apply(&Mutation::PutBinding { binding: binding(9, 1) }),
            Err(StorageError::ForeignKeyViolation { .. })
        ));
        assert!(matches!(
            tables.apply(&Mutation::PutProduct { product: product(2, 9, "X") }),
            Err(StorageError::ForeignKeyViolation { .. })
        ));
        assert!(matches!(
            tables.apply(&Mutation::PutValue { value: value(9, 1, "x") }),
            Err(StorageError::ForeignKeyViolation { .. })
        ));
    }

    #[test]
    fn test_attribute_delete_restricted() {
        let mut tables = seeded();
        assert!(matches!(
            tables.apply(&Mutation::DeleteAttribute { id: 1 }),
            Err(StorageError::Restricted { referenced_by: "category_attributes", .. })
        ));

        tables.apply(&Mutation::DeleteBinding { category_id: 1, attribute_id: 1 }).unwrap();
        assert!(matches!(
            tables.apply(&Mutation::DeleteAttribute { id: 1 }),
            Err(StorageError::Restricted { referenced_by: "product_attribute_values", .. })
        ));

        tables.apply(&Mutation::DeleteValue { product_id: 1, attribute_id: 1 }).unwrap();
        tables.apply(&Mutation::DeleteAttribute { id: 1 }).unwrap();
        assert!(tables.attribute_by_name("Color").is_none());
    }

    #[test]
    fn test_revert_restores_previous_rows() {
        let mut tables = seeded();
        let undo_put = tables
            .apply(&Mutation::PutValue { value: value(1, 1, "Blue") })
            .unwrap();
        let undo_rename = tables
            .apply(&Mutation::PutAttribute { attribute: attribute(1, "Shade") })
            .unwrap();

        tables.revert(undo_rename);
        tables.revert(undo_put);

        assert_eq!(tables.value(1, 1).unwrap().value_text, "Red");
        assert_eq!(tables.attribute_by_name("Color").unwrap().id, 1);
        assert!(tables.attribute_by_name("Shade").is_none());
    }

    #[test]
    fn test_value_owner_scoped_to_category() {
        let mut tables = seeded();
        tables.apply(&Mutation::PutCategory { category: category(2, "Shoes") }).unwrap();
        tables.apply(&Mutation::PutProduct { product: product(2, 2, "SHO-1") }).unwrap();
        tables.apply(&Mutation::PutValue { value: value(2, 1, "Red") }).unwrap();

        assert_eq!(tables.find_value_owner(1, 1, "Red", None), Some(1));
        assert_eq!(tables.find_value_owner(1, 1, "Red", Some(1)), None);
        assert_eq!(tables.find_value_owner(2, 1, "Red", Some(1)), Some(2));
    }

    #[test]
    fn test_image_rebuild() {
        let tables = seeded();
        let rebuilt = Tables::from_image(tables.to_image()).unwrap();
        assert_eq!(rebuilt.to_image(), tables.to_image());
        assert_eq!(rebuilt.product_by_sku("DRS-1").unwrap().id, 1);
        assert_eq!(rebuilt.next_product_id(), 2);
    }

    #[test]
    fn test_image_with_dangling_rows_is_corrupt() {
        let mut image = seeded().to_image();
        image.categories.clear();
        assert!(matches!(Tables::from_image(image), Err(StorageError::Corrupt(_))));
    }
}
