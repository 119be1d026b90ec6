//! Engine operation inputs
//!
//! Patches use `Option` per field: an absent field keeps the stored value.
//! Clearable fields use `Option<Option<_>>`, where an explicit `null`
//! clears the stored value.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use super::errors::{CatalogError, CatalogResult};
use crate::schema::{AttributeRef, DataType};
use crate::storage::{AttributeId, CategoryId, ProductStatus};

fn default_true() -> bool {
    true
}

fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAttribute {
    pub name: String,
    pub data_type: DataType,
    #[serde(default)]
    pub allowed_values: Option<Vec<Value>>,
    #[serde(default)]
    pub validation_regex: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl NewAttribute {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            allowed_values: None,
            validation_regex: None,
            is_active: true,
        }
    }

    pub fn with_allowed_values(mut self, values: Vec<Value>) -> Self {
        self.allowed_values = Some(values);
        self
    }

    pub fn with_validation_regex(mut self, pattern: impl Into<String>) -> Self {
        self.validation_regex = Some(pattern.into());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttributePatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub data_type: Option<DataType>,
    #[serde(default, deserialize_with = "double_option")]
    pub allowed_values: Option<Option<Vec<Value>>>,
    #[serde(default, deserialize_with = "double_option")]
    pub validation_regex: Option<Option<String>>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewCategory {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl NewCategory {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            is_active: true,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

/// Binds an existing attribute, or defines one inline and binds it.
///
/// `attribute_id` wins when both are given.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BindAttribute {
    #[serde(default)]
    pub attribute_id: Option<AttributeId>,
    #[serde(default)]
    pub attribute: Option<NewAttribute>,
    #[serde(default)]
    pub is_required: bool,
    #[serde(default)]
    pub is_unique: bool,
    #[serde(default)]
    pub default_value: Option<Value>,
    #[serde(default)]
    pub position: u32,
}

impl BindAttribute {
    pub fn existing(attribute_id: AttributeId) -> Self {
        Self {
            attribute_id: Some(attribute_id),
            ..Default::default()
        }
    }

    pub fn inline(attribute: NewAttribute) -> Self {
        Self {
            attribute: Some(attribute),
            ..Default::default()
        }
    }

    pub fn required(mut self) -> Self {
        self.is_required = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.is_unique = true;
        self
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default_value = Some(value);
        self
    }

    pub fn at(mut self, position: u32) -> Self {
        self.position = position;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BindingPatch {
    #[serde(default)]
    pub is_required: Option<bool>,
    #[serde(default)]
    pub is_unique: Option<bool>,
    #[serde(default, deserialize_with = "double_option")]
    pub default_value: Option<Option<Value>>,
    #[serde(default)]
    pub position: Option<u32>,
}

/// One `{attribute_id?, name?, value}` item of a list payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeItem {
    #[serde(default)]
    pub attribute_id: Option<AttributeId>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub value: Value,
}

impl AttributeItem {
    /// The id wins over the name.
    pub fn reference(&self) -> Option<AttributeRef> {
        match (self.attribute_id, &self.name) {
            (Some(id), _) => Some(AttributeRef::ById(id)),
            (None, Some(name)) => Some(AttributeRef::ByName(name.clone())),
            (None, None) => None,
        }
    }
}

/// Attribute values as supplied by a caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributePayload {
    Items(Vec<AttributeItem>),
    /// Attribute name → value
    Keyed(Map<String, Value>),
}

impl Default for AttributePayload {
    fn default() -> Self {
        AttributePayload::Keyed(Map::new())
    }
}

impl From<Map<String, Value>> for AttributePayload {
    fn from(map: Map<String, Value>) -> Self {
        AttributePayload::Keyed(map)
    }
}

impl From<Vec<AttributeItem>> for AttributePayload {
    fn from(items: Vec<AttributeItem>) -> Self {
        AttributePayload::Items(items)
    }
}

impl TryFrom<Value> for AttributePayload {
    type Error = CatalogError;

    /// Objects become keyed payloads and arrays item lists. Any other shape,
    /// or an array holding something other than item objects, is rejected.
    fn try_from(value: Value) -> CatalogResult<Self> {
        match value {
            Value::Object(map) => Ok(AttributePayload::Keyed(map)),
            Value::Array(_) => serde_json::from_value::<Vec<AttributeItem>>(value)
                .map(AttributePayload::Items)
                .map_err(|e| CatalogError::validation(format!("Invalid attribute item: {}", e))),
            other => Err(CatalogError::validation(format!(
                "Attributes must be an object or a list of items, got {}",
                json_kind(&other)
            ))),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewProduct {
    pub category_id: CategoryId,
    pub sku: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub status: Option<ProductStatus>,
    #[serde(default)]
    pub attributes: Option<AttributePayload>,
}

impl NewProduct {
    pub fn new(category_id: CategoryId, sku: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            category_id,
            sku: sku.into(),
            name: name.into(),
            description: String::new(),
            price: None,
            currency: None,
            status: None,
            attributes: None,
        }
    }

    pub fn with_price(mut self, price: f64) -> Self {
        self.price = Some(price);
        self
    }

    pub fn with_attributes(mut self, attributes: AttributePayload) -> Self {
        self.attributes = Some(attributes);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductPatch {
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub status: Option<ProductStatus>,
    #[serde(default)]
    pub attributes: Option<AttributePayload>,
}

impl ProductPatch {
    pub fn attributes(attributes: AttributePayload) -> Self {
        Self {
            attributes: Some(attributes),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductFilter {
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    #[serde(default)]
    pub status: Option<ProductStatus>,
    /// Case-insensitive substring of name or SKU
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub page_size: Option<u32>,
}
