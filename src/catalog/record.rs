//! Canonical product types shared by ingestion, the row store and the vector index.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Closed set of catalog categories. Anything else maps to [`Category::Unknown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "Cheese Wheel")]
    CheeseWheel,
    #[serde(rename = "Cream Cheese")]
    CreamCheese,
    #[serde(rename = "Crumbled, Cubed, Grated, Shaved")]
    CrumbledCubedGratedShaved,
    #[serde(rename = "Sliced Cheese")]
    SlicedCheese,
    #[serde(rename = "Shredded Cheese")]
    ShreddedCheese,
    #[serde(rename = "Cottage Cheese")]
    CottageCheese,
    #[serde(rename = "Cheese Loaf")]
    CheeseLoaf,
    #[serde(rename = "unknown")]
    Unknown,
}

impl Category {
    /// Every known category, in the order the schema description lists them.
    pub const KNOWN: [Category; 7] = [
        Category::CheeseWheel,
        Category::CreamCheese,
        Category::CrumbledCubedGratedShaved,
        Category::SlicedCheese,
        Category::ShreddedCheese,
        Category::CottageCheese,
        Category::CheeseLoaf,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Category::CheeseWheel => "Cheese Wheel",
            Category::CreamCheese => "Cream Cheese",
            Category::CrumbledCubedGratedShaved => "Crumbled, Cubed, Grated, Shaved",
            Category::SlicedCheese => "Sliced Cheese",
            Category::ShreddedCheese => "Shredded Cheese",
            Category::CottageCheese => "Cottage Cheese",
            Category::CheeseLoaf => "Cheese Loaf",
            Category::Unknown => "unknown",
        }
    }

    /// Case- and whitespace-insensitive lookup by label.
    pub fn parse(raw: &str) -> Category {
        let wanted = normalize_label(raw);
        Category::KNOWN
            .into_iter()
            .find(|category| normalize_label(category.label()) == wanted)
            .unwrap_or(Category::Unknown)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

fn normalize_label(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// One catalog item after normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    /// `product_<sku>`, or `product_<position>` when the record has no SKU.
    pub id: String,
    pub name: String,
    pub category: Category,
    pub price: f64,
    pub price_per_weight_unit: Option<f64>,
    pub case_size: Option<String>,
    pub case_price: Option<f64>,
    pub brand: String,
    pub weight: f64,
    pub upc: String,
    pub sku: String,
    pub product_url: String,
    pub image_url: String,
    pub related_product_names: Vec<String>,
}

impl ProductRecord {
    /// Denormalized copy of the display fields stored next to the vector.
    pub fn metadata(&self) -> ProductMetadata {
        ProductMetadata {
            name: self.name.clone(),
            category: self.category.label().to_string(),
            price: self.price,
            lb_price: self.price_per_weight_unit.unwrap_or(0.0),
            sku: self.sku.clone(),
            upc: self.upc.clone(),
            brand: self.brand.clone(),
            weight: self.weight,
            product_url: self.product_url.clone(),
            image_url: self.image_url.clone(),
            related_products: self.related_product_names.clone(),
        }
    }
}

/// Snapshot of a product's display fields taken at ingestion time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductMetadata {
    pub name: String,
    pub category: String,
    pub price: f64,
    pub lb_price: f64,
    pub sku: String,
    pub upc: String,
    pub brand: String,
    pub weight: f64,
    pub product_url: String,
    pub image_url: String,
    pub related_products: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_parse_is_lenient_about_case_and_spacing() {
        assert_eq!(Category::parse("cheese  wheel"), Category::CheeseWheel);
        assert_eq!(
            Category::parse("Crumbled, Cubed, Grated, Shaved"),
            Category::CrumbledCubedGratedShaved
        );
        assert_eq!(Category::parse("Blue Cheese"), Category::Unknown);
    }

    #[test]
    fn category_serializes_as_label() {
        let json = serde_json::to_string(&Category::SlicedCheese).unwrap();
        assert_eq!(json, "\"Sliced Cheese\"");
    }

    #[test]
    fn metadata_defaults_missing_weight_price() {
        let record = ProductRecord {
            id: "product_0".to_string(),
            name: "Brie".to_string(),
            category: Category::Unknown,
            price: 0.0,
            price_per_weight_unit: None,
            case_size: None,
            case_price: None,
            brand: String::new(),
            weight: 0.0,
            upc: String::new(),
            sku: String::new(),
            product_url: String::new(),
            image_url: String::new(),
            related_product_names: Vec::new(),
        };

        let metadata = record.metadata();
        assert_eq!(metadata.category, "unknown");
        assert_eq!(metadata.lb_price, 0.0);
    }
}
