//! Request parsing
//!
//! One JSON object per request. `op` selects the operation; the remaining
//! fields are its arguments. Identifiers sit beside the payload fields:
//!
//! ```json
//! {"op": "update_binding", "category_id": 1, "attribute_id": 4, "is_required": true}
//! ```

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use super::errors::{ApiError, ApiResult};
use crate::catalog::{
    AttributePatch, BindAttribute, BindingPatch, CategoryPatch, NewAttribute, NewCategory,
    NewProduct, ProductFilter, ProductPatch,
};
use crate::schema::AttributeRef;
use crate::storage::{AttributeId, CategoryId, ProductId};

#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    DefineAttribute(NewAttribute),
    GetAttribute(AttributeRef),
    ListAttributes {
        active_only: bool,
    },
    UpdateAttribute {
        id: AttributeId,
        patch: AttributePatch,
    },
    DeleteAttribute {
        id: AttributeId,
    },

    DefineCategory(NewCategory),
    GetCategory {
        id: CategoryId,
    },
    ListCategories {
        include_attributes: bool,
    },
    UpdateCategory {
        id: CategoryId,
        patch: CategoryPatch,
    },
    DeactivateCategory {
        id: CategoryId,
    },

    BindAttribute {
        category_id: CategoryId,
        binding: BindAttribute,
    },
    ListBindings {
        category_id: CategoryId,
    },
    UpdateBinding {
        category_id: CategoryId,
        attribute_id: AttributeId,
        patch: BindingPatch,
    },
    UnbindAttribute {
        category_id: CategoryId,
        attribute_id: AttributeId,
        force: bool,
    },

    CreateProduct(NewProduct),
    GetProduct {
        id: ProductId,
    },
    ListProducts(ProductFilter),
    UpdateProduct {
        id: ProductId,
        patch: ProductPatch,
    },
    DeactivateProduct {
        id: ProductId,
    },

    Compact,
}

impl Request {
    /// Parses a request from a JSON string.
    pub fn parse(json: &str) -> ApiResult<Self> {
        let value: Value = serde_json::from_str(json)
            .map_err(|e| ApiError::invalid_request(format!("Invalid JSON: {}", e)))?;

        let mut args = match value {
            Value::Object(map) => map,
            _ => return Err(ApiError::invalid_request("Request must be a JSON object")),
        };

        let op = match args.remove("op") {
            Some(Value::String(op)) => op,
            Some(_) => return Err(ApiError::invalid_request("Field 'op' must be a string")),
            None => return Err(ApiError::invalid_request("Missing op")),
        };

        let request = match op.as_str() {
            "define_attribute" => Request::DefineAttribute(body(args)?),
            "get_attribute" => {
                let id: Option<AttributeId> = optional(&mut args, "id")?;
                let name: Option<String> = optional(&mut args, "name")?;
                match (id, name) {
                    (Some(id), _) => Request::GetAttribute(AttributeRef::ById(id)),
                    (None, Some(name)) => Request::GetAttribute(AttributeRef::ByName(name)),
                    (None, None) => return Err(ApiError::invalid_request("Missing id or name")),
                }
            }
            "list_attributes" => Request::ListAttributes {
                active_only: flag(&mut args, "active_only")?,
            },
            "update_attribute" => Request::UpdateAttribute {
                id: field(&mut args, "id")?,
                patch: body(args)?,
            },
            "delete_attribute" => Request::DeleteAttribute {
                id: field(&mut args, "id")?,
            },

            "define_category" => Request::DefineCategory(body(args)?),
            "get_category" => Request::GetCategory {
                id: field(&mut args, "id")?,
            },
            "list_categories" => Request::ListCategories {
                include_attributes: flag(&mut args, "include_attributes")?,
            },
            "update_category" => Request::UpdateCategory {
                id: field(&mut args, "id")?,
                patch: body(args)?,
            },
            "deactivate_category" => Request::DeactivateCategory {
                id: field(&mut args, "id")?,
            },

            "bind_attribute" => {
                let category_id = field(&mut args, "category_id")?;
                let binding: BindAttribute = body(args)?;
                if binding.attribute_id.is_none() && binding.attribute.is_none() {
                    return Err(ApiError::invalid_request("Missing attribute_id or attribute"));
                }
                Request::BindAttribute {
                    category_id,
                    binding,
                }
            }
            "list_bindings" => Request::ListBindings {
                category_id: field(&mut args, "category_id")?,
            },
            "update_binding" => Request::UpdateBinding {
                category_id: field(&mut args, "category_id")?,
                attribute_id: field(&mut args, "attribute_id")?,
                patch: body(args)?,
            },
            "unbind_attribute" => Request::UnbindAttribute {
                category_id: field(&mut args, "category_id")?,
                attribute_id: field(&mut args, "attribute_id")?,
                force: flag(&mut args, "force")?,
            },

            "create_product" => Request::CreateProduct(body(args)?),
            "get_product" => Request::GetProduct {
                id: field(&mut args, "id")?,
            },
            "list_products" => Request::ListProducts(body(args)?),
            "update_product" => Request::UpdateProduct {
                id: field(&mut args, "id")?,
                patch: body(args)?,
            },
            "deactivate_product" => Request::DeactivateProduct {
                id: field(&mut args, "id")?,
            },

            "compact" => Request::Compact,

            other => return Err(ApiError::unknown_operation(other)),
        };

        Ok(request)
    }

    /// Operation name as it appears in `op`
    pub fn op(&self) -> &'static str {
        match self {
            Request::DefineAttribute(_) => "define_attribute",
            Request::GetAttribute(_) => "get_attribute",
            Request::ListAttributes { .. } => "list_attributes",
            Request::UpdateAttribute { .. } => "update_attribute",
            Request::DeleteAttribute { .. } => "delete_attribute",
            Request::DefineCategory(_) => "define_category",
            Request::GetCategory { .. } => "get_category",
            Request::ListCategories { .. } => "list_categories",
            Request::UpdateCategory { .. } => "update_category",
            Request::DeactivateCategory { .. } => "deactivate_category",
            Request::BindAttribute { .. } => "bind_attribute",
            Request::ListBindings { .. } => "list_bindings",
            Request::UpdateBinding { .. } => "update_binding",
            Request::UnbindAttribute { .. } => "unbind_attribute",
            Request::CreateProduct(_) => "create_product",
            Request::GetProduct { .. } => "get_product",
            Request::ListProducts(_) => "list_products",
            Request::UpdateProduct { .. } => "update_product",
            Request::DeactivateProduct { .. } => "deactivate_product",
            Request::Compact => "compact",
        }
    }
}

/// Removes a required argument.
fn field<T: DeserializeOwned>(args: &mut Map<String, Value>, key: &str) -> ApiResult<T> {
    optional(args, key)?.ok_or_else(|| ApiError::invalid_request(format!("Missing {}", key)))
}

/// Removes an optional argument; `null` counts as absent.
fn optional<T: DeserializeOwned>(args: &mut Map<String, Value>, key: &str) -> ApiResult<Option<T>> {
    match args.remove(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => serde_json::from_value(value)
            .map(Some)
            .map_err(|e| ApiError::invalid_request(format!("Invalid {}: {}", key, e))),
    }
}

fn flag(args: &mut Map<String, Value>, key: &str) -> ApiResult<bool> {
    Ok(optional(args, key)?.unwrap_or(false))
}

/// Deserializes the remaining arguments as the operation payload.
fn body<T: DeserializeOwned>(args: Map<String, Value>) -> ApiResult<T> {
    serde_json::from_value(Value::Object(args))
        .map_err(|e| ApiError::invalid_request(format!("Invalid request body: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::DataType;
    use serde_json::json;

    fn parse(value: Value) -> ApiResult<Request> {
        Request::parse(&value.to_string())
    }

    #[test]
    fn test_parse_define_attribute() {
        let req = parse(json!({
            "op": "define_attribute",
            "name": "Gender",
            "data_type": "ENUM",
            "allowed_values": ["Men", "Women"]
        }))
        .unwrap();

        match req {
            Request::DefineAttribute(attr) => {
                assert_eq!(attr.name, "Gender");
                assert_eq!(attr.data_type, DataType::Enum);
                assert_eq!(attr.allowed_values.unwrap().len(), 2);
            }
            other => panic!("Expected DefineAttribute, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_get_attribute_by_name() {
        let req = parse(json!({"op": "get_attribute", "name": "Size"})).unwrap();
        assert_eq!(req, Request::GetAttribute(AttributeRef::ByName("Size".into())));

        let req = parse(json!({"op": "get_attribute", "id": 3, "name": "Size"})).unwrap();
        assert_eq!(req, Request::GetAttribute(AttributeRef::ById(3)));
    }

    #[test]
    fn test_parse_update_binding_splits_ids_from_patch() {
        let req = parse(json!({
            "op": "update_binding",
            "category_id": 1,
            "attribute_id": 4,
            "default_value": null
        }))
        .unwrap();

        match req {
            Request::UpdateBinding {
                category_id,
                attribute_id,
                patch,
            } => {
                assert_eq!((category_id, attribute_id), (1, 4));
                assert_eq!(patch.default_value, Some(None));
                assert_eq!(patch.is_required, None);
            }
            other => panic!("Expected UpdateBinding, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_flags_default_false() {
        let req = parse(json!({"op": "unbind_attribute", "category_id": 1, "attribute_id": 2}))
            .unwrap();
        assert_eq!(
            req,
            Request::UnbindAttribute {
                category_id: 1,
                attribute_id: 2,
                force: false
            }
        );
    }

    #[test]
    fn test_parse_list_products_filter() {
        let req = parse(json!({"op": "list_products", "q": "dress", "page": 2})).unwrap();
        match req {
            Request::ListProducts(filter) => {
                assert_eq!(filter.q.as_deref(), Some("dress"));
                assert_eq!(filter.page, Some(2));
                assert_eq!(filter.page_size, None);
            }
            other => panic!("Expected ListProducts, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_unknown_op() {
        let err = parse(json!({"op": "drop_catalog"})).unwrap_err();
        assert_eq!(err.code(), "CATALOG_UNKNOWN_OPERATION");
    }

    #[test]
    fn test_parse_malformed_envelopes() {
        assert_eq!(
            Request::parse("{not json").unwrap_err().code(),
            "CATALOG_INVALID_REQUEST"
        );
        assert!(parse(json!([1, 2])).is_err());
        assert!(parse(json!({"name": "x"})).unwrap_err().message().contains("Missing op"));
        assert!(parse(json!({"op": 7})).is_err());
    }

    #[test]
    fn test_parse_missing_and_mistyped_fields() {
        let err = parse(json!({"op": "get_product"})).unwrap_err();
        assert_eq!(err.message(), "Missing id");

        let err = parse(json!({"op": "get_product", "id": "seven"})).unwrap_err();
        assert!(err.message().starts_with("Invalid id"));

        let err = parse(json!({"op": "bind_attribute", "category_id": 1})).unwrap_err();
        assert!(err.message().contains("attribute_id or attribute"));
    }
}
