use serde::Serialize;
use serde_json::Value;

use crate::catalog::format_amount;
use crate::index::QueryMatch;
use crate::sql::QueryRow;

/// Marker handed to the synthesizer when neither path found anything.
pub const NO_INFORMATION: &str = "No relevant product information was found.";

/// The single piece of retrieved information used to ground an answer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "source", content = "items", rename_all = "snake_case")]
pub enum GroundingContext {
    Rows(Vec<QueryRow>),
    Matches(Vec<QueryMatch>),
    NoInformation,
}

impl GroundingContext {
    pub fn is_empty(&self) -> bool {
        matches!(self, GroundingContext::NoInformation)
    }

    pub fn len(&self) -> usize {
        match self {
            GroundingContext::Rows(rows) => rows.len(),
            GroundingContext::Matches(matches) => matches.len(),
            GroundingContext::NoInformation => 0,
        }
    }

    pub fn render(&self) -> String {
        match self {
            GroundingContext::Rows(rows) => rows
                .iter()
                .map(render_row)
                .collect::<Vec<_>>()
                .join("\n"),
            GroundingContext::Matches(matches) => matches
                .iter()
                .map(render_match)
                .collect::<Vec<_>>()
                .join("\n"),
            GroundingContext::NoInformation => NO_INFORMATION.to_string(),
        }
    }
}

fn render_row(row: &QueryRow) -> String {
    let mut info = String::new();
    for (column, value) in &row.columns {
        let text = value_text(value);
        match column.to_ascii_lowercase().as_str() {
            "name" => info.push_str(&format!("Product: {}\n", text)),
            "category" => info.push_str(&format!("Category: {}\n", text)),
            "price" => info.push_str(&format!("Price: ${}\n", money(value, &text))),
            "lb_price" => {
                if value.as_f64().is_some_and(|v| v > 0.0) {
                    info.push_str(&format!("Price per pound: ${}/lb\n", money(value, &text)));
                }
            }
            "brand" => info.push_str(&format!("Brand: {}\n", text)),
            "upc" => info.push_str(&format!("UPC: {}\n", text)),
            "sku" => info.push_str(&format!("SKU: {}\n", text)),
            "weight" => info.push_str(&format!("Weight: {}\n", text)),
            "product_url" => info.push_str(&format!("Product URL: {}\n", text)),
            "image_url" => info.push_str(&format!("Image URL: {}\n", text)),
            _ => info.push_str(&format!("{}: {}\n", column, text)),
        }
    }
    info
}

fn render_match(hit: &QueryMatch) -> String {
    let meta = &hit.metadata;
    let mut info = format!("Product: {}\n", or_na(&meta.name));
    info.push_str(&format!("Category: {}\n", or_na(&meta.category)));
    info.push_str(&format!("Price: ${}\n", format_amount(meta.price)));
    if meta.lb_price > 0.0 {
        info.push_str(&format!(
            "Price per pound: ${}/lb\n",
            format_amount(meta.lb_price)
        ));
    }
    info.push_str(&format!("Brand: {}\n", or_na(&meta.brand)));
    info.push_str(&format!("Similarity Score: {:.2}\n", hit.score));
    info.push_str(&format!("Product URL: {}\n", or_na(&meta.product_url)));
    info.push_str(&format!("Image URL: {}\n", or_na(&meta.image_url)));
    info.push_str(&format!("UPC: {}\n", or_na(&meta.upc)));
    info.push_str(&format!("SKU: {}\n", or_na(&meta.sku)));
    if !meta.related_products.is_empty() {
        info.push_str(&format!(
            "Related Products: {}\n",
            meta.related_products.join(", ")
        ));
    }
    info
}

fn value_text(value: &Value) -> String {
    match value {
        Value::Null => "N/A".to_string(),
        Value::String(s) if s.is_empty() => "N/A".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn money(value: &Value, fallback: &str) -> String {
    value
        .as_f64()
        .map(format_amount)
        .unwrap_or_else(|| fallback.to_string())
}

fn or_na(text: &str) -> &str {
    if text.is_empty() {
        "N/A"
    } else {
        text
    }
}
