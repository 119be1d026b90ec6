//! Demo catalog
//!
//! Dresses and Shoes with their attributes and one product each. Loading is
//! idempotent: anything already present (by name or SKU) is left alone.

use serde::Serialize;
use serde_json::{json, Value};
use tracing::info;

use super::errors::CatalogResult;
use super::requests::{AttributePayload, BindAttribute, NewAttribute, NewCategory, NewProduct};
use super::Catalog;
use crate::observability::Event;
use crate::schema::DataType;
use crate::storage::{AttributeId, CategoryId};

/// What a seed run created
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SeedReport {
    pub categories: usize,
    pub attributes: usize,
    pub bindings: usize,
    pub products: usize,
}

impl SeedReport {
    pub fn is_empty(&self) -> bool {
        *self == SeedReport::default()
    }
}

struct SeedBinding {
    attribute: &'static str,
    data_type: DataType,
    allowed: &'static [&'static str],
    required: bool,
    position: u32,
}

const fn bound(
    attribute: &'static str,
    data_type: DataType,
    allowed: &'static [&'static str],
    required: bool,
    position: u32,
) -> SeedBinding {
    SeedBinding {
        attribute,
        data_type,
        allowed,
        required,
        position,
    }
}

const SIZES: &[&str] = &["XS", "S", "M", "L", "XL"];
const GENDERS: &[&str] = &["Men", "Women", "Unisex"];

const DRESSES: &[SeedBinding] = &[
    bound("Size", DataType::Enum, SIZES, true, 1),
    bound("Color", DataType::Text, &[], true, 2),
    bound("Fabric", DataType::Text, &[], false, 3),
];

const SHOES: &[SeedBinding] = &[
    bound("Shoe Size", DataType::Number, &[], true, 1),
    bound("Material", DataType::Text, &[], false, 2),
    bound("Gender", DataType::Enum, GENDERS, true, 3),
];

/// Loads the demo catalog.
pub fn seed_demo(catalog: &mut Catalog) -> CatalogResult<SeedReport> {
    let mut report = SeedReport::default();

    let dresses = ensure_category(catalog, "Dresses", "Women dresses", &mut report)?;
    let shoes = ensure_category(catalog, "Shoes", "Footwear", &mut report)?;

    for (category_id, bindings) in [(dresses, DRESSES), (shoes, SHOES)] {
        for entry in bindings {
            let attribute_id = ensure_attribute(catalog, entry, &mut report)?;
            if catalog.tables().binding(category_id, attribute_id).is_none() {
                let mut bind = BindAttribute::existing(attribute_id).at(entry.position);
                bind.is_required = entry.required;
                catalog.bind_attribute(category_id, bind)?;
                report.bindings += 1;
            }
        }
    }

    ensure_product(
        catalog,
        NewProduct::new(dresses, "DRS-1001", "Red Summer Dress")
            .with_price(1299.0)
            .with_attributes(AttributePayload::try_from(json!({
                "Size": "M",
                "Color": "Red",
                "Fabric": "Cotton"
            }))?),
        &mut report,
    )?;
    ensure_product(
        catalog,
        NewProduct::new(shoes, "SHO-2001", "Running Shoe")
            .with_price(2499.0)
            .with_attributes(AttributePayload::try_from(json!({
                "Shoe Size": 9,
                "Material": "Mesh",
                "Gender": "Men"
            }))?),
        &mut report,
    )?;

    info!(
        event = %Event::SeedComplete,
        categories = report.categories,
        attributes = report.attributes,
        bindings = report.bindings,
        products = report.products,
        "demo catalog loaded"
    );

    Ok(report)
}

fn ensure_category(
    catalog: &mut Catalog,
    name: &str,
    description: &str,
    report: &mut SeedReport,
) -> CatalogResult<CategoryId> {
    if let Some(existing) = catalog.tables().category_by_name(name) {
        return Ok(existing.id);
    }
    let category =
        catalog.define_category(NewCategory::new(name).with_description(description))?;
    report.categories += 1;
    Ok(category.id)
}

fn ensure_attribute(
    catalog: &mut Catalog,
    entry: &SeedBinding,
    report: &mut SeedReport,
) -> CatalogResult<AttributeId> {
    if let Some(existing) = catalog.tables().attribute_by_name(entry.attribute) {
        return Ok(existing.id);
    }
    let mut definition = NewAttribute::new(entry.attribute, entry.data_type);
    if !entry.allowed.is_empty() {
        definition = definition
            .with_allowed_values(entry.allowed.iter().map(|v| Value::from(*v)).collect());
    }
    let attribute = catalog.define_attribute(definition)?;
    report.attributes += 1;
    Ok(attribute.id)
}

fn ensure_product(
    catalog: &mut Catalog,
    product: NewProduct,
    report: &mut SeedReport,
) -> CatalogResult<()> {
    if catalog.tables().product_by_sku(&product.sku).is_some() {
        return Ok(());
    }
    catalog.create_product(product)?;
    report.products += 1;
    Ok(())
}
