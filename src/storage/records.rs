//! Row types held by the catalog store

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::schema::DataType;

pub type AttributeId = i64;
pub type CategoryId = i64;
pub type ProductId = i64;
pub type Timestamp = DateTime<Utc>;

/// A typed attribute definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    pub id: AttributeId,
    pub name: String,
    pub data_type: DataType,
    /// Enum domain; present iff `data_type` is ENUM
    #[serde(default)]
    pub allowed_values: Option<Vec<Value>>,
    #[serde(default)]
    pub validation_regex: Option<String>,
    pub is_active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub is_active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Binds an attribute to a category with per-category rules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Binding {
    pub category_id: CategoryId,
    pub attribute_id: AttributeId,
    pub is_required: bool,
    pub is_unique: bool,
    #[serde(default)]
    pub default_value: Option<Value>,
    pub position: u32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Binding {
    pub fn key(&self) -> (CategoryId, AttributeId) {
        (self.category_id, self.attribute_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProductStatus {
    Active,
    Inactive,
    Draft,
}

impl ProductStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductStatus::Active => "ACTIVE",
            ProductStatus::Inactive => "INACTIVE",
            ProductStatus::Draft => "DRAFT",
        }
    }
}

impl Default for ProductStatus {
    fn default() -> Self {
        ProductStatus::Active
    }
}

impl fmt::Display for ProductStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub category_id: CategoryId,
    pub sku: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
    pub currency: String,
    pub status: ProductStatus,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// One attribute value of one product, in canonical text form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredValue {
    pub product_id: ProductId,
    pub attribute_id: AttributeId,
    pub value_text: String,
    pub updated_at: Timestamp,
}

impl StoredValue {
    pub fn key(&self) -> (ProductId, AttributeId) {
        (self.product_id, self.attribute_id)
    }
}
