use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::line_item::Sku;

/// Reference product record, normalized from whatever shape the catalog
/// service returned.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub sku: Sku,
    pub name: String,
    pub unit_price: Decimal,
    pub brand: Option<String>,
    pub thumbnail: Option<String>,
    pub short_description: Option<String>,
    pub description: Option<String>,
}

impl CatalogEntry {
    pub fn new(sku: impl Into<String>, name: impl Into<String>, unit_price: Decimal) -> Self {
        Self {
            sku: Sku(sku.into()),
            name: name.into(),
            unit_price,
            brand: None,
            thumbnail: None,
            short_description: None,
            description: None,
        }
    }

    pub fn with_brand(mut self, brand: impl Into<String>) -> Self {
        self.brand = Some(brand.into());
        self
    }
}
