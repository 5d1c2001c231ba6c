use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::line_item::LineItem;

/// Largest gap tolerated between a backend-reported grand total and the one
/// derived locally.
pub const REPORTED_TOTAL_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

const ONE_HUNDRED: Decimal = Decimal::ONE_HUNDRED;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TotalsRow {
    pub stage: String,
    pub detail: String,
    pub amount: Decimal,
}

/// Money summary of a quotation. Never stored; always rebuilt from the line
/// items and the two rates.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotationTotals {
    pub subtotal: Decimal,
    pub discount_rate: Decimal,
    pub discount_amount: Decimal,
    pub taxable_amount: Decimal,
    pub tax_rate: Decimal,
    pub tax_amount: Decimal,
    pub grand_total: Decimal,
}

impl QuotationTotals {
    pub fn breakdown(&self) -> Vec<TotalsRow> {
        vec![
            TotalsRow {
                stage: "subtotal".to_string(),
                detail: "sum(unit_price * quantity)".to_string(),
                amount: self.subtotal,
            },
            TotalsRow {
                stage: "discount".to_string(),
                detail: format!("subtotal * {}%", self.discount_rate.normalize()),
                amount: self.discount_amount,
            },
            TotalsRow {
                stage: "taxable".to_string(),
                detail: "subtotal - discount".to_string(),
                amount: self.taxable_amount,
            },
            TotalsRow {
                stage: "tax".to_string(),
                detail: format!("taxable * {}%", self.tax_rate.normalize()),
                amount: self.tax_amount,
            },
            TotalsRow {
                stage: "grand_total".to_string(),
                detail: "taxable + tax".to_string(),
                amount: self.grand_total,
            },
        ]
    }

    pub fn matches_reported(&self, reported: Decimal) -> bool {
        self.grand_total
            .checked_sub(reported)
            .is_some_and(|gap| gap.abs() <= REPORTED_TOTAL_TOLERANCE)
    }
}

/// Negative rates count as zero. A discount above 100% is applied as given.
/// Every step saturates at the `Decimal` bounds instead of overflowing.
pub fn compute_totals(
    items: &[LineItem],
    discount_rate: Decimal,
    tax_rate: Decimal,
) -> QuotationTotals {
    let discount_rate = discount_rate.max(Decimal::ZERO);
    let tax_rate = tax_rate.max(Decimal::ZERO);

    let subtotal =
        items.iter().map(LineItem::line_total).fold(Decimal::ZERO, Decimal::saturating_add);
    let discount_amount = percent_of(subtotal, discount_rate);
    let taxable_amount = subtotal.saturating_sub(discount_amount);
    let tax_amount = percent_of(taxable_amount, tax_rate);
    let grand_total = taxable_amount.saturating_add(tax_amount);

    QuotationTotals {
        subtotal,
        discount_rate,
        discount_amount,
        taxable_amount,
        tax_rate,
        tax_amount,
        grand_total,
    }
}

fn percent_of(amount: Decimal, rate: Decimal) -> Decimal {
    match amount.checked_mul(rate) {
        Some(product) => product / ONE_HUNDRED,
        None => amount.saturating_mul(rate / ONE_HUNDRED),
    }
}
