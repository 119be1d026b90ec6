//! Engine operation outputs

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::schema::decode_value;
use crate::storage::{Attribute, Binding, Category, CategoryId, Product, Tables};

/// A binding joined with its attribute definition
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BindingView {
    pub category_id: CategoryId,
    pub attribute: Attribute,
    pub is_required: bool,
    pub is_unique: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,
    pub position: u32,
}

impl BindingView {
    pub fn new(binding: &Binding, attribute: &Attribute) -> Self {
        Self {
            category_id: binding.category_id,
            attribute: attribute.clone(),
            is_required: binding.is_required,
            is_unique: binding.is_unique,
            default_value: binding.default_value.clone(),
            position: binding.position,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryView {
    #[serde(flatten)]
    pub category: Category,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Vec<BindingView>>,
}

/// A product with its attribute values decoded and keyed by attribute name
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductView {
    #[serde(flatten)]
    pub product: Product,
    pub attributes: BTreeMap<String, Value>,
}

impl ProductView {
    pub(crate) fn build(tables: &Tables, product: &Product) -> Self {
        let attributes = tables
            .values_for_product(product.id)
            .filter_map(|stored| {
                tables.attribute(stored.attribute_id).map(|attribute| {
                    (
                        attribute.name.clone(),
                        decode_value(attribute.data_type, &stored.value_text),
                    )
                })
            })
            .collect();

        Self {
            product: product.clone(),
            attributes,
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub page: u32,
    pub page_size: u32,
    pub total: usize,
    pub items: Vec<T>,
}

/// Result of removing a binding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Unbound {
    pub unmapped: bool,
    pub removed_values: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Deleted {
    pub deleted: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Compacted {
    pub last_sequence: u64,
}
