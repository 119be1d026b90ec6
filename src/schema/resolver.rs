//! Category schema resolution
//!
//! A category's schema is its bindings joined with their attribute
//! definitions. It is rebuilt from the tables on every call.

use std::collections::HashMap;

use crate::storage::{Attribute, AttributeId, Binding, Category, CategoryId, Tables};

/// One bound attribute
#[derive(Debug, Clone)]
pub struct SchemaEntry {
    pub binding: Binding,
    pub attribute: Attribute,
}

/// Reference to an attribute in a caller payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeRef {
    ById(AttributeId),
    ByName(String),
}

#[derive(Debug, Clone)]
pub struct CategorySchema {
    pub category: Category,
    entries: Vec<SchemaEntry>,
    by_id: HashMap<AttributeId, usize>,
    by_name: HashMap<String, usize>,
}

impl CategorySchema {
    /// Entries ordered by position, then attribute name
    pub fn entries(&self) -> &[SchemaEntry] {
        &self.entries
    }

    pub fn by_id(&self, id: AttributeId) -> Option<&SchemaEntry> {
        self.by_id.get(&id).map(|&i| &self.entries[i])
    }

    pub fn by_name(&self, name: &str) -> Option<&SchemaEntry> {
        self.by_name.get(name).map(|&i| &self.entries[i])
    }

    pub fn lookup(&self, reference: &AttributeRef) -> Option<&SchemaEntry> {
        match reference {
            AttributeRef::ById(id) => self.by_id(*id),
            AttributeRef::ByName(name) => self.by_name(name),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Resolves the schema of `category_id`, or `None` if the category does not exist.
pub fn resolve(tables: &Tables, category_id: CategoryId) -> Option<CategorySchema> {
    let category = tables.category(category_id)?.clone();

    let mut entries: Vec<SchemaEntry> = tables
        .bindings_for_category(category_id)
        .filter_map(|binding| {
            tables.attribute(binding.attribute_id).map(|attribute| SchemaEntry {
                binding: binding.clone(),
                attribute: attribute.clone(),
            })
        })
        .collect();

    entries.sort_by(|a, b| {
        a.binding
            .position
            .cmp(&b.binding.position)
            .then_with(|| a.attribute.name.cmp(&b.attribute.name))
    });

    let by_id = entries
        .iter()
        .enumerate()
        .map(|(i, e)| (e.attribute.id, i))
        .collect();
    let by_name = entries
        .iter()
        .enumerate()
        .map(|(i, e)| (e.attribute.name.clone(), i))
        .collect();

    Some(CategorySchema {
        category,
        entries,
        by_id,
        by_name,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::DataType;
    use crate::storage::Mutation;
    use chrono::Utc;

    fn tables_with_bindings(bindings: &[(AttributeId, &str, u32)]) -> Tables {
        let now = Utc::now();
        let mut tables = Tables::new();
        tables
            .apply(&Mutation::PutCategory {
                category: Category {
                    id: 1,
                    name: "Dresses".into(),
                    description: String::new(),
                    is_active: true,
                    created_at: now,
                    updated_at: now,
                },
            })
            .unwrap();
        for &(id, name, position) in bindings {
            tables
                .apply(&Mutation::PutAttribute {
                    attribute: Attribute {
                        id,
                        name: name.into(),
                        data_type: DataType::Text,
                        allowed_values: None,
                        validation_regex: None,
                        is_active: true,
                        created_at: now,
                        updated_at: now,
                    },
                })
                .unwrap();
            tables
                .apply(&Mutation::PutBinding {
                    binding: Binding {
                        category_id: 1,
                        attribute_id: id,
                        is_required: false,
                        is_unique: false,
                        default_value: None,
                        position,
                        created_at: now,
                        updated_at: now,
                    },
                })
                .unwrap();
        }
        tables
    }

    #[test]
    fn test_ordered_by_position_then_name() {
        let tables = tables_with_bindings(&[(1, "Fabric", 3), (2, "Size", 1), (3, "Color", 1)]);
        let schema = resolve(&tables, 1).unwrap();
        let names: Vec<&str> = schema.entries().iter().map(|e| e.attribute.name.as_str()).collect();
        assert_eq!(names, vec!["Color", "Size", "Fabric"]);
    }

    #[test]
    fn test_dual_index() {
        let tables = tables_with_bindings(&[(1, "Fabric", 0), (2, "Size", 1)]);
        let schema = resolve(&tables, 1).unwrap();
        assert_eq!(schema.by_id(2).unwrap().attribute.name, "Size");
        assert_eq!(schema.by_name("Fabric").unwrap().attribute.id, 1);
        assert!(schema.lookup(&AttributeRef::ByName("fabric".into())).is_none());
        assert!(schema.lookup(&AttributeRef::ById(9)).is_none());
    }

    #[test]
    fn test_missing_category() {
        assert!(resolve(&Tables::new(), 7).is_none());
    }
}
