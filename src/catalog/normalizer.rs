//! Catalog Normalizer.
//!
//! Turns one raw, loosely-typed catalog record into a [`ProductRecord`]
//! plus the canonical text that gets embedded. Field names from both the
//! scraper output (`SKU_number`, `LB_price`, ...) and the flattened row
//! export (`SKU`, `UPC`, ...) are accepted.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

use super::record::{Category, ProductRecord};
use crate::core::errors::ValidationError;

/// Number of related product names included in the embedding text.
pub const RELATED_PRODUCTS_IN_TEXT: usize = 5;

static LEADING_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?\d+(?:\.\d+)?").expect("number regex is valid"));

const NAME_KEYS: &[&str] = &["name"];
const CATEGORY_KEYS: &[&str] = &["category", "Category"];
const PRICE_KEYS: &[&str] = &["price"];
const LB_PRICE_KEYS: &[&str] = &["LB_price", "lb_price", "price_per_lb"];
const CASE_SIZE_KEYS: &[&str] = &["case_size"];
const CASE_PRICE_KEYS: &[&str] = &["case_price"];
const SKU_KEYS: &[&str] = &["SKU_number", "SKU", "sku"];
const UPC_KEYS: &[&str] = &["UPC_number", "UPC", "upc"];
const BRAND_KEYS: &[&str] = &["brand"];
const WEIGHT_KEYS: &[&str] = &["weight"];
const PRODUCT_URL_KEYS: &[&str] = &["product_url"];
const IMAGE_URL_KEYS: &[&str] = &["image_url"];
const RELATED_KEYS: &[&str] = &["related_products"];

/// A normalized record together with its embedding text.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedProduct {
    pub record: ProductRecord,
    pub text: String,
}

/// Normalizes the record found at `position` in the catalog document.
pub fn normalize(raw: &Value, position: usize) -> Result<NormalizedProduct, ValidationError> {
    let fields = raw
        .as_object()
        .ok_or(ValidationError::NotAnObject { position })?;

    let name = text_field(fields, NAME_KEYS).ok_or(ValidationError::MissingName { position })?;
    let raw_category = text_field(fields, CATEGORY_KEYS);
    let category = raw_category
        .as_deref()
        .map(Category::parse)
        .unwrap_or(Category::Unknown);
    let price = amount_field(fields, PRICE_KEYS);
    let lb_price = amount_field(fields, LB_PRICE_KEYS);
    let case_size = text_field(fields, CASE_SIZE_KEYS);
    let case_price = amount_field(fields, CASE_PRICE_KEYS);
    let sku = text_field(fields, SKU_KEYS);
    let upc = text_field(fields, UPC_KEYS);
    let brand = text_field(fields, BRAND_KEYS);
    let weight = amount_field(fields, WEIGHT_KEYS);
    let product_url = text_field(fields, PRODUCT_URL_KEYS);
    let image_url = text_field(fields, IMAGE_URL_KEYS);
    let related = list_field(fields, RELATED_KEYS);

    // Positional ids get their own prefix so they can never collide with a SKU.
    let id = match &sku {
        Some(sku) => format!("product_{}", sku),
        None => format!("product_pos_{}", position),
    };

    let mut parts: Vec<String> = vec![format!("Product: {}", name)];
    if raw_category.is_some() {
        parts.push(format!("Category: {}", category.label()));
    }
    if let Some(price) = price.filter(|p| *p != 0.0) {
        parts.push(format!("Price: ${}", format_amount(price)));
    }
    if let Some(lb_price) = lb_price.filter(|p| *p != 0.0) {
        parts.push(format!("Price per pound: ${}/lb", format_amount(lb_price)));
    }
    if let Some(case_size) = &case_size {
        parts.push(format!("Case size: {}", case_size));
    }
    if let Some(case_price) = case_price.filter(|p| *p != 0.0) {
        parts.push(format!("Price per case: ${}/case", format_amount(case_price)));
    }
    if let Some(sku) = &sku {
        parts.push(format!("SKU: {}", sku));
    }
    if let Some(upc) = &upc {
        parts.push(format!("UPC: {}", upc));
    }
    if let Some(brand) = &brand {
        parts.push(format!("brand: {}", brand));
    }
    if let Some(weight) = weight.filter(|w| *w != 0.0) {
        parts.push(format!("weight: {}", weight));
    }
    if let Some(url) = &product_url {
        parts.push(format!("Product URL: {}", url));
    }
    if !related.is_empty() {
        let shown: Vec<&str> = related
            .iter()
            .take(RELATED_PRODUCTS_IN_TEXT)
            .map(String::as_str)
            .collect();
        parts.push(format!("Related products: {}", shown.join(", ")));
    }

    let record = ProductRecord {
        id,
        name,
        category,
        price: price.unwrap_or(0.0),
        price_per_weight_unit: lb_price,
        case_size,
        case_price,
        brand: brand.unwrap_or_default(),
        weight: weight.unwrap_or(0.0),
        upc: upc.unwrap_or_default(),
        sku: sku.unwrap_or_default(),
        product_url: product_url.unwrap_or_default(),
        image_url: image_url.unwrap_or_default(),
        related_product_names: related,
    };

    Ok(NormalizedProduct {
        record,
        text: parts.join(" "),
    })
}

/// Two decimal places, the way prices are shown everywhere else.
pub fn format_amount(value: f64) -> String {
    format!("{:.2}", value)
}

fn first_present<'a>(fields: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| fields.get(*key))
        .find(|value| !value.is_null())
}

fn text_field(fields: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    let text = match first_present(fields, keys)? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

fn amount_field(fields: &Map<String, Value>, keys: &[&str]) -> Option<f64> {
    match first_present(fields, keys)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_amount(s),
        _ => None,
    }
}

/// Parses the leading number of strings like `"$12.50"`, `"1,299.00"` or `"5 lb"`.
pub fn parse_amount(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .trim()
        .trim_start_matches('$')
        .chars()
        .filter(|c| *c != ',')
        .collect();
    LEADING_NUMBER
        .find(cleaned.trim_start())
        .and_then(|m| m.as_str().parse::<f64>().ok())
}

fn list_field(fields: &Map<String, Value>, keys: &[&str]) -> Vec<String> {
    match first_present(fields, keys) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.trim().to_string()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .filter(|s| !s.is_empty())
            .collect(),
        Some(Value::String(s)) => s
            .split(',')
            .map(|part| part.trim().to_string())
            .filter(|part| !part.is_empty())
            .collect(),
        _ => Vec::new(),
    }
}
