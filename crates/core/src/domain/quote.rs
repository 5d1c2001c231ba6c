use chrono::{Days, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub const DEFAULT_CUSTOMER_NAME: &str = "Valued Customer";
pub const DEFAULT_VALIDITY_DAYS: u32 = 30;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InvoiceNumber(pub String);

impl std::fmt::Display for InvoiceNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Header fields of a quotation in progress, everything except the line
/// items themselves.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QuoteDetails {
    pub customer_name: String,
    invoice_date: NaiveDate,
    valid_until: NaiveDate,
    validity_pinned: bool,
    validity_days: u32,
    pub discount_rate: Decimal,
    pub tax_rate: Decimal,
}

impl QuoteDetails {
    pub fn new(invoice_date: NaiveDate, validity_days: u32) -> Self {
        Self {
            customer_name: String::new(),
            invoice_date,
            valid_until: offset(invoice_date, validity_days),
            validity_pinned: false,
            validity_days,
            discount_rate: Decimal::ZERO,
            tax_rate: Decimal::ZERO,
        }
    }

    pub fn invoice_date(&self) -> NaiveDate {
        self.invoice_date
    }

    pub fn valid_until(&self) -> NaiveDate {
        self.valid_until
    }

    /// Moving the invoice date drags the validity date along unless the
    /// caller pinned it with [`QuoteDetails::set_valid_until`].
    pub fn set_invoice_date(&mut self, date: NaiveDate) {
        self.invoice_date = date;
        if !self.validity_pinned {
            self.valid_until = offset(date, self.validity_days);
        }
    }

    pub fn set_valid_until(&mut self, date: NaiveDate) {
        self.valid_until = date;
        self.validity_pinned = true;
    }

    /// Customer name sent to the finalize service; blank becomes the generic
    /// salutation.
    pub fn billed_customer(&self) -> &str {
        let trimmed = self.customer_name.trim();
        if trimmed.is_empty() {
            DEFAULT_CUSTOMER_NAME
        } else {
            trimmed
        }
    }
}

fn offset(date: NaiveDate, days: u32) -> NaiveDate {
    date.checked_add_days(Days::new(u64::from(days))).unwrap_or(date)
}
