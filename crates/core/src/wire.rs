//! JSON shapes exchanged with the quotation backend, and the normalization
//! that turns loosely typed upstream payloads into domain values.
//!
//! Upstream product records are not consistent: the price may arrive as
//! `unit_price` or `price`, as a number or a numeric string, or not at all.
//! Everything here is lenient on the way in and strict on the way out.

use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::catalog::CatalogEntry;
use crate::domain::line_item::{clamp_price, LineItem, ProductInfo, Sku};
use crate::errors::ServiceError;
use crate::ports::{AnalysisResult, FinalizeRequest, FinalizeResult};

pub const UNKNOWN_PRODUCT_NAME: &str = "Unknown Product";
pub const MISSING_SKU: &str = "NO-SKU";

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawProduct {
    pub sku: Option<Value>,
    pub name: Option<Value>,
    pub unit_price: Option<Value>,
    pub price: Option<Value>,
    pub quantity: Option<Value>,
    pub line_total: Option<Value>,
    pub brand: Option<Value>,
    pub thumbnail: Option<Value>,
    pub short_description: Option<Value>,
    pub description: Option<Value>,
}

impl RawProduct {
    fn from_value(value: Value) -> Self {
        serde_json::from_value(value).unwrap_or_default()
    }

    /// First non-zero of `unit_price` then `price`.
    fn listed_price(&self) -> Option<Decimal> {
        [&self.unit_price, &self.price]
            .into_iter()
            .filter_map(|field| field.as_ref().and_then(coerce_decimal))
            .find(|price| !price.is_zero())
    }

    fn info(&self) -> ProductInfo {
        ProductInfo {
            name: coerce_label(self.name.as_ref()).unwrap_or_else(|| UNKNOWN_PRODUCT_NAME.to_string()),
            brand: text(self.brand.as_ref()),
            thumbnail: text(self.thumbnail.as_ref()),
            short_description: text(self.short_description.as_ref()),
            description: text(self.description.as_ref()),
        }
    }

    fn sku(&self) -> Sku {
        Sku(coerce_label(self.sku.as_ref()).unwrap_or_else(|| MISSING_SKU.to_string()))
    }

    pub fn into_catalog_entry(self) -> CatalogEntry {
        let ProductInfo { name, brand, thumbnail, short_description, description } = self.info();
        CatalogEntry {
            sku: self.sku(),
            name,
            unit_price: clamp_price(self.listed_price().unwrap_or(Decimal::ZERO)),
            brand,
            thumbnail,
            short_description,
            description,
        }
    }

    /// A supplied `line_total` is never kept as-is. It only stands in for a
    /// missing unit price, divided back by the quantity.
    pub fn into_line_item(self) -> LineItem {
        let quantity = self.quantity.as_ref().and_then(coerce_integer).unwrap_or(1).max(1);
        let unit_price = self.listed_price().or_else(|| {
            self.line_total
                .as_ref()
                .and_then(coerce_decimal)
                .and_then(|total| total.checked_div(Decimal::from(quantity)))
        });

        LineItem::new(self.sku(), self.info(), quantity, unit_price.unwrap_or(Decimal::ZERO))
    }
}

/// Accepts either a bare array of products or `{ "products": [...] }`. Any
/// other shape is treated as an empty catalog.
pub fn parse_catalog(payload: Value) -> Vec<CatalogEntry> {
    let items = match payload {
        Value::Array(items) => items,
        Value::Object(mut object) => match object.remove("products") {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    };

    items.into_iter().map(RawProduct::from_value).map(RawProduct::into_catalog_entry).collect()
}

#[derive(Clone, Debug, Serialize)]
pub struct AnalyzeRequestBody<'a> {
    pub prompt: &'a str,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct AnalyzeResponseBody {
    pub success: bool,
    pub products: Vec<Value>,
    pub suggested_customer: Option<String>,
    pub error: Option<String>,
    pub detail: Option<Value>,
}

impl AnalyzeResponseBody {
    pub fn into_result(self) -> Result<AnalysisResult, ServiceError> {
        if !self.success {
            return Err(rejection(self.error, self.detail, "analysis did not succeed"));
        }

        Ok(AnalysisResult {
            items: self
                .products
                .into_iter()
                .map(RawProduct::from_value)
                .map(RawProduct::into_line_item)
                .collect(),
            suggested_customer: self
                .suggested_customer
                .map(|name| name.trim().to_string())
                .filter(|name| !name.is_empty()),
        })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct WireLineItem {
    pub sku: String,
    pub name: String,
    pub description: String,
    pub short_description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    pub quantity: u32,
    pub unit_price: f64,
    pub line_total: f64,
}

impl From<&LineItem> for WireLineItem {
    fn from(item: &LineItem) -> Self {
        let info = item.info();
        Self {
            sku: item.sku().0.clone(),
            name: info.name.clone(),
            description: info.description.clone().unwrap_or_default(),
            short_description: info.short_description.clone().unwrap_or_default(),
            thumbnail: info.thumbnail.clone(),
            brand: info.brand.clone(),
            quantity: item.quantity(),
            unit_price: to_wire_number(item.unit_price()),
            line_total: to_wire_number(item.line_total()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FinalizeRequestBody {
    pub customer_name: String,
    pub invoice_date: NaiveDate,
    pub valid_until: NaiveDate,
    pub discount_rate: f64,
    pub tax_rate: f64,
    pub products: Vec<WireLineItem>,
}

impl From<&FinalizeRequest> for FinalizeRequestBody {
    fn from(request: &FinalizeRequest) -> Self {
        Self {
            customer_name: request.customer_name.clone(),
            invoice_date: request.invoice_date,
            valid_until: request.valid_until,
            discount_rate: to_wire_number(request.totals.discount_rate),
            tax_rate: to_wire_number(request.totals.tax_rate),
            products: request.items.iter().map(WireLineItem::from).collect(),
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct FinalizeResponseBody {
    pub success: bool,
    pub invoice_no: Option<String>,
    pub pdf_url: Option<String>,
    pub filename: Option<String>,
    pub grand_total: Option<Value>,
    pub error: Option<String>,
    pub detail: Option<Value>,
}

impl FinalizeResponseBody {
    pub fn into_result(self) -> Result<FinalizeResult, ServiceError> {
        if !self.success {
            return Err(rejection(self.error, self.detail, "finalize did not succeed"));
        }

        let invoice_no = self
            .invoice_no
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| ServiceError::Decode("finalize response is missing invoice_no".into()))?;
        let pdf_url = self
            .pdf_url
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| ServiceError::Decode("finalize response is missing pdf_url".into()))?;

        Ok(FinalizeResult {
            invoice_no,
            pdf_url,
            filename: self.filename,
            reported_grand_total: self.grand_total.as_ref().and_then(coerce_decimal),
        })
    }
}

/// Pulls a human-readable reason out of an error body. FastAPI puts it under
/// `detail` (string or validation list); the proxy layer uses `error`.
pub fn error_detail(body: &Value) -> Option<String> {
    let detail = body.get("detail").and_then(|detail| match detail {
        Value::String(text) => Some(text.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    });
    detail.or_else(|| body.get("error").and_then(Value::as_str).map(str::to_string))
}

fn rejection(error: Option<String>, detail: Option<Value>, fallback: &str) -> ServiceError {
    let mut body = serde_json::Map::new();
    if let Some(error) = error {
        body.insert("error".to_string(), Value::String(error));
    }
    if let Some(detail) = detail {
        body.insert("detail".to_string(), detail);
    }
    let detail = error_detail(&Value::Object(body)).unwrap_or_else(|| fallback.to_string());
    ServiceError::rejected(detail)
}

pub fn coerce_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(number) => {
            let literal = number.to_string();
            Decimal::from_str(&literal)
                .or_else(|_| Decimal::from_scientific(&literal))
                .ok()
                .or_else(|| number.as_f64().and_then(Decimal::from_f64))
        }
        Value::String(text) => {
            let trimmed = text.trim();
            Decimal::from_str(trimmed).or_else(|_| Decimal::from_scientific(trimmed)).ok()
        }
        _ => None,
    }
}

fn coerce_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number.as_i64().or_else(|| number.as_f64().map(|float| float as i64)),
        Value::String(text) => text.trim().parse::<i64>().ok(),
        _ => None,
    }
}

/// Non-empty string, or a number rendered as text.
fn coerce_label(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(text) if !text.is_empty() => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

fn text(value: Option<&Value>) -> Option<String> {
    value.and_then(Value::as_str).map(str::to_string)
}

pub fn to_wire_number(amount: Decimal) -> f64 {
    amount.to_f64().unwrap_or_default()
}
