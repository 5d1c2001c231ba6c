use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::catalog::CatalogEntry;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Sku(pub String);

impl Sku {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Sku {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Sku {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Descriptive fields carried by a line item. Display-only and never edited
/// after the item enters a quotation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductInfo {
    pub name: String,
    pub brand: Option<String>,
    pub thumbnail: Option<String>,
    pub short_description: Option<String>,
    pub description: Option<String>,
}

/// A product about to be added to a quotation, typically picked from the
/// catalog search.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProductCandidate {
    pub sku: Sku,
    pub info: ProductInfo,
    pub unit_price: Decimal,
}

impl From<&CatalogEntry> for ProductCandidate {
    fn from(entry: &CatalogEntry) -> Self {
        Self {
            sku: entry.sku.clone(),
            info: ProductInfo {
                name: entry.name.clone(),
                brand: entry.brand.clone(),
                thumbnail: entry.thumbnail.clone(),
                short_description: entry.short_description.clone(),
                description: entry.description.clone(),
            },
            unit_price: entry.unit_price,
        }
    }
}

/// One priced row of a quotation.
///
/// Quantity and unit price are only reachable through clamping setters, and
/// the line total is derived on every read, so `line_total() == quantity *
/// unit_price` holds for every observable value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LineItem {
    sku: Sku,
    info: ProductInfo,
    quantity: u32,
    unit_price: Decimal,
}

impl LineItem {
    pub fn new(sku: Sku, info: ProductInfo, quantity: i64, unit_price: Decimal) -> Self {
        Self { sku, info, quantity: clamp_quantity(quantity), unit_price: clamp_price(unit_price) }
    }

    pub fn from_candidate(candidate: ProductCandidate) -> Self {
        Self::new(candidate.sku, candidate.info, 1, candidate.unit_price)
    }

    pub fn sku(&self) -> &Sku {
        &self.sku
    }

    pub fn info(&self) -> &ProductInfo {
        &self.info
    }

    pub fn name(&self) -> &str {
        &self.info.name
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub fn unit_price(&self) -> Decimal {
        self.unit_price
    }

    /// Saturates at `Decimal::MAX` rather than overflowing.
    pub fn line_total(&self) -> Decimal {
        self.unit_price.saturating_mul(Decimal::from(self.quantity))
    }

    pub(crate) fn set_quantity(&mut self, quantity: i64) {
        self.quantity = clamp_quantity(quantity);
    }

    pub(crate) fn add_quantity(&mut self, extra: u32) {
        self.quantity = self.quantity.saturating_add(extra);
    }

    pub(crate) fn set_unit_price(&mut self, price: Decimal) {
        self.unit_price = clamp_price(price);
    }
}

pub fn clamp_quantity(quantity: i64) -> u32 {
    u32::try_from(quantity.max(1)).unwrap_or(u32::MAX)
}

pub fn clamp_price(price: Decimal) -> Decimal {
    price.max(Decimal::ZERO)
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{LineItem, ProductInfo, Sku};

    fn item(quantity: i64, price: Decimal) -> LineItem {
        LineItem::new(
            Sku::from("CAM-1"),
            ProductInfo { name: "Camera".to_string(), ..ProductInfo::default() },
            quantity,
            price,
        )
    }

    #[test]
    fn line_total_tracks_quantity_and_price() {
        let mut line = item(3, Decimal::new(1250, 2));
        assert_eq!(line.line_total(), Decimal::new(3750, 2));

        line.set_quantity(4);
        assert_eq!(line.line_total(), Decimal::new(5000, 2));

        line.set_unit_price(Decimal::new(10, 0));
        assert_eq!(line.line_total(), Decimal::new(40, 0));
    }

    #[test]
    fn construction_clamps_invalid_numbers() {
        let line = item(-7, Decimal::new(-5, 0));
        assert_eq!(line.quantity(), 1);
        assert_eq!(line.unit_price(), Decimal::ZERO);
        assert_eq!(line.line_total(), Decimal::ZERO);
    }

    #[test]
    fn oversized_quantity_saturates() {
        let line = item(i64::MAX, Decimal::ONE);
        assert_eq!(line.quantity(), u32::MAX);
    }

    #[test]
    fn line_total_saturates_instead_of_overflowing() {
        let mut line = item(1, Decimal::MAX);
        line.set_quantity(2);
        assert_eq!(line.line_total(), Decimal::MAX);
    }
}
