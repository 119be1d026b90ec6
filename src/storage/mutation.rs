//! Store mutations
//!
//! A transaction is a batch of mutations. The batch is the WAL payload, so
//! every variant must replay to the same state it produced live.

use serde::{Deserialize, Serialize};

use super::records::{
    Attribute, AttributeId, Binding, Category, CategoryId, Product, ProductId, StoredValue,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Mutation {
    /// Insert or replace an attribute definition
    PutAttribute { attribute: Attribute },
    DeleteAttribute { id: AttributeId },
    /// Insert or replace a category (soft delete is a put with is_active = false)
    PutCategory { category: Category },
    /// Insert or replace a binding
    PutBinding { binding: Binding },
    DeleteBinding {
        category_id: CategoryId,
        attribute_id: AttributeId,
    },
    PutProduct { product: Product },
    /// Upsert a product attribute value
    PutValue { value: StoredValue },
    DeleteValue {
        product_id: ProductId,
        attribute_id: AttributeId,
    },
}

impl Mutation {
    /// Name used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            Mutation::PutAttribute { .. } => "put_attribute",
            Mutation::DeleteAttribute { .. } => "delete_attribute",
            Mutation::PutCategory { .. } => "put_category",
            Mutation::PutBinding { .. } => "put_binding",
            Mutation::DeleteBinding { .. } => "delete_binding",
            Mutation::PutProduct { .. } => "put_product",
            Mutation::PutValue { .. } => "put_value",
            Mutation::DeleteValue { .. } => "delete_value",
        }
    }
}

/// Encodes a batch as a WAL payload.
pub fn encode_batch(batch: &[Mutation]) -> serde_json::Result<Vec<u8>> {
    serde_json::to_vec(batch)
}

/// Decodes a WAL payload into its batch.
pub fn decode_batch(payload: &[u8]) -> serde_json::Result<Vec<Mutation>> {
    serde_json::from_slice(payload)
}
