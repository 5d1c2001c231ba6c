use rust_decimal::Decimal;

use crate::builder::pricing::{compute_totals, QuotationTotals};
use crate::domain::line_item::{LineItem, ProductCandidate, Sku};

/// Ordered, SKU-unique line items of one quotation in progress.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LineItemStore {
    items: Vec<LineItem>,
}

impl LineItemStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub fn get(&self, sku: &str) -> Option<&LineItem> {
        self.items.iter().find(|item| item.sku().as_str() == sku)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Installs `items` in place of the current contents. A SKU that appears
    /// more than once keeps its first position and price, and absorbs the
    /// quantities of the later occurrences.
    pub fn bulk_replace(&mut self, items: Vec<LineItem>) {
        let mut merged: Vec<LineItem> = Vec::with_capacity(items.len());
        for item in items {
            match merged.iter_mut().find(|existing| existing.sku() == item.sku()) {
                Some(existing) => existing.add_quantity(item.quantity()),
                None => merged.push(item),
            }
        }
        self.items = merged;
    }

    pub fn upsert(&mut self, candidate: ProductCandidate) -> &LineItem {
        let position = match self.position(candidate.sku.as_str()) {
            Some(index) => {
                self.items[index].add_quantity(1);
                index
            }
            None => {
                self.items.push(LineItem::from_candidate(candidate));
                self.items.len() - 1
            }
        };
        &self.items[position]
    }

    /// Returns `false` when no item has `sku`.
    pub fn set_quantity(&mut self, sku: &str, quantity: i64) -> bool {
        let Some(item) = self.item_mut(sku) else {
            return false;
        };
        item.set_quantity(quantity);
        true
    }

    /// Returns `false` when no item has `sku`.
    pub fn set_unit_price(&mut self, sku: &str, price: Decimal) -> bool {
        let Some(item) = self.item_mut(sku) else {
            return false;
        };
        item.set_unit_price(price);
        true
    }

    pub fn remove(&mut self, sku: &str) -> Option<LineItem> {
        self.position(sku).map(|index| self.items.remove(index))
    }

    pub fn compute_totals(&self, discount_rate: Decimal, tax_rate: Decimal) -> QuotationTotals {
        compute_totals(&self.items, discount_rate, tax_rate)
    }

    pub fn skus(&self) -> impl Iterator<Item = &Sku> {
        self.items.iter().map(LineItem::sku)
    }

    fn position(&self, sku: &str) -> Option<usize> {
        self.items.iter().position(|item| item.sku().as_str() == sku)
    }

    fn item_mut(&mut self, sku: &str) -> Option<&mut LineItem> {
        self.items.iter_mut().find(|item| item.sku().as_str() == sku)
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use crate::domain::catalog::CatalogEntry;
    use crate::domain::line_item::{LineItem, ProductCandidate, ProductInfo, Sku};

    use super::LineItemStore;

    fn candidate(sku: &str, name: &str, price: i64) -> ProductCandidate {
        ProductCandidate::from(&CatalogEntry::new(sku, name, Decimal::from(price)))
    }

    fn line(sku: &str, quantity: i64, price: i64) -> LineItem {
        LineItem::new(
            Sku::from(sku),
            ProductInfo { name: format!("Product {sku}"), ..ProductInfo::default() },
            quantity,
            Decimal::from(price),
        )
    }

    #[test]
    fn repeated_upsert_merges_into_one_line() {
        let mut store = LineItemStore::new();
        store.upsert(candidate("A1", "Camera", 100));
        store.upsert(candidate("A1", "Camera", 100));

        assert_eq!(store.len(), 1);
        let item = store.get("A1").expect("camera line");
        assert_eq!(item.quantity(), 2);
        assert_eq!(item.unit_price(), Decimal::from(100));
        assert_eq!(item.line_total(), Decimal::from(200));
    }

    #[test]
    fn upsert_count_equals_quantity() {
        let mut store = LineItemStore::new();
        for calls in 1..=25u32 {
            let item = store.upsert(candidate("TRIPOD", "Tripod", 35));
            assert_eq!(item.quantity(), calls);
            assert_eq!(item.line_total(), Decimal::from(35) * Decimal::from(calls));
        }
    }

    #[test]
    fn upsert_appends_new_skus_in_order() {
        let mut store = LineItemStore::new();
        store.upsert(candidate("B", "Bag", 20));
        store.upsert(candidate("A", "Lens", 300));
        store.upsert(candidate("B", "Bag", 20));

        let skus: Vec<&str> = store.skus().map(Sku::as_str).collect();
        assert_eq!(skus, vec!["B", "A"]);
        assert_eq!(store.get("A").map(LineItem::line_total), Some(Decimal::from(300)));
    }

    #[test]
    fn set_quantity_clamps_to_one() {
        let mut store = LineItemStore::new();
        store.upsert(candidate("X", "Cable", 5));

        for requested in [0, -1, -400, i64::MIN] {
            assert!(store.set_quantity("X", requested));
            let item = store.get("X").expect("cable line");
            assert_eq!(item.quantity(), 1);
            assert_eq!(item.line_total(), Decimal::from(5));
        }

        assert!(store.set_quantity("X", 8));
        assert_eq!(store.get("X").map(LineItem::line_total), Some(Decimal::from(40)));
    }

    #[test]
    fn set_unit_price_clamps_to_zero() {
        let mut store = LineItemStore::new();
        store.upsert(candidate("X", "Cable", 5));
        store.set_quantity("X", 3);

        assert!(store.set_unit_price("X", Decimal::new(-125, 2)));
        let item = store.get("X").expect("cable line");
        assert_eq!(item.unit_price(), Decimal::ZERO);
        assert_eq!(item.line_total(), Decimal::ZERO);

        store.set_unit_price("X", Decimal::new(1999, 2));
        assert_eq!(store.get("X").map(LineItem::line_total), Some(Decimal::new(5997, 2)));
    }

    #[test]
    fn mutations_on_unknown_sku_are_noops() {
        let mut store = LineItemStore::new();
        store.upsert(candidate("X", "Cable", 5));
        let before = store.clone();

        assert!(!store.set_quantity("missing", 4));
        assert!(!store.set_unit_price("missing", Decimal::ONE));
        assert!(store.remove("missing").is_none());
        assert_eq!(store, before);
    }

    #[test]
    fn remove_drops_only_the_target() {
        let mut store = LineItemStore::new();
        store.upsert(candidate("A", "Lens", 300));
        store.upsert(candidate("B", "Bag", 20));

        let removed = store.remove("A").expect("lens removed");
        assert_eq!(removed.sku().as_str(), "A");
        assert_eq!(store.len(), 1);
        assert!(store.get("B").is_some());
    }

    #[test]
    fn bulk_replace_round_trips_unique_items() {
        let mut store = LineItemStore::new();
        store.upsert(candidate("OLD", "Old", 1));

        let items = vec![line("X", 2, 50), line("Y", 1, 10), line("Z", 4, 3)];
        store.bulk_replace(items.clone());

        assert_eq!(store.items(), items.as_slice());
        let expected: Decimal = items.iter().map(LineItem::line_total).sum();
        assert_eq!(store.compute_totals(Decimal::ZERO, Decimal::ZERO).subtotal, expected);
        assert!(store.get("OLD").is_none());
    }

    #[test]
    fn bulk_replace_merges_duplicate_skus_into_first_occurrence() {
        let mut store = LineItemStore::new();
        store.bulk_replace(vec![line("X", 2, 50), line("Y", 1, 10), line("X", 3, 70)]);

        assert_eq!(store.len(), 2);
        let x = store.get("X").expect("merged line");
        assert_eq!(x.quantity(), 5);
        assert_eq!(x.unit_price(), Decimal::from(50));
        assert_eq!(x.line_total(), Decimal::from(250));
        assert_eq!(store.items()[0].sku().as_str(), "X");
    }

    #[test]
    fn bulk_replace_with_empty_list_clears_store() {
        let mut store = LineItemStore::new();
        store.upsert(candidate("A", "Lens", 300));
        store.bulk_replace(Vec::new());
        assert!(store.is_empty());
    }
}
