//! Fixtures shared by the engine's unit tests

use chrono::Utc;
use serde_json::json;
use tempfile::TempDir;

use super::{AttributePayload, Catalog, CatalogSettings};
use crate::schema::{resolve, CategorySchema, DataType};
use crate::storage::{Attribute, AttributeId, Binding, Category, Mutation, Tables};

pub(crate) fn open_catalog() -> (TempDir, Catalog) {
    let temp_dir = TempDir::new().unwrap();
    let catalog = Catalog::open(temp_dir.path(), CatalogSettings::default()).unwrap();
    (temp_dir, catalog)
}

pub(crate) fn payload(value: serde_json::Value) -> AttributePayload {
    AttributePayload::try_from(value).unwrap()
}

/// Closes the catalog's store to writes, as a fatal WAL failure would.
pub(crate) fn halt_writes(catalog: &mut Catalog) {
    catalog.store.halt_writes();
}

fn attribute(id: AttributeId, name: &str, data_type: DataType) -> Attribute {
    let now = Utc::now();
    Attribute {
        id,
        name: name.to_string(),
        data_type,
        allowed_values: None,
        validation_regex: None,
        is_active: true,
        created_at: now,
        updated_at: now,
    }
}

fn binding(attribute_id: AttributeId, is_required: bool, position: u32) -> Binding {
    let now = Utc::now();
    Binding {
        category_id: 1,
        attribute_id,
        is_required,
        is_unique: false,
        default_value: None,
        position,
        created_at: now,
        updated_at: now,
    }
}

/// Dresses: Size (ENUM, required), Color (TEXT, required), Fabric (TEXT)
pub(crate) fn dresses_tables() -> Tables {
    let now = Utc::now();
    let mut tables = Tables::new();

    let mut size = attribute(1, "Size", DataType::Enum);
    size.allowed_values = Some(vec![json!("XS"), json!("S"), json!("M"), json!("L"), json!("XL")]);

    let mutations = vec![
        Mutation::PutCategory {
            category: Category {
                id: 1,
                name: "Dresses".into(),
                description: "Women dresses".into(),
                is_active: true,
                created_at: now,
                updated_at: now,
            },
        },
        Mutation::PutAttribute { attribute: size },
        Mutation::PutAttribute { attribute: attribute(2, "Color", DataType::Text) },
        Mutation::PutAttribute { attribute: attribute(3, "Fabric", DataType::Text) },
        Mutation::PutBinding { binding: binding(1, true, 1) },
        Mutation::PutBinding { binding: binding(2, true, 2) },
        Mutation::PutBinding { binding: binding(3, false, 3) },
    ];
    for mutation in &mutations {
        tables.apply(mutation).unwrap();
    }
    tables
}

pub(crate) fn dresses_schema() -> CategorySchema {
    resolve(&dresses_tables(), 1).unwrap()
}
