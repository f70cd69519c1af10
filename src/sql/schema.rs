use crate::catalog::Category;

/// Columns of the `products` table, in declaration order.
pub const PRODUCT_COLUMNS: [&str; 10] = [
    "name",
    "category",
    "price",
    "lb_price",
    "brand",
    "upc",
    "sku",
    "weight",
    "product_url",
    "image_url",
];

pub(crate) const CREATE_PRODUCTS_TABLE: &str = "CREATE TABLE IF NOT EXISTS products (
    name TEXT NOT NULL,
    category TEXT,
    price REAL,
    lb_price REAL,
    brand TEXT,
    upc TEXT,
    sku TEXT,
    weight REAL,
    product_url TEXT,
    image_url TEXT
)";

/// Enumeration of the row store handed verbatim to the query generator.
pub fn schema_description() -> String {
    let categories = Category::KNOWN
        .iter()
        .map(|category| format!("'{}'", category.label()))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "The database has a 'products' table with columns: {}.\n\
         The category column is one of: {}.",
        PRODUCT_COLUMNS.join(", "),
        categories
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn description_lists_every_column_and_category() {
        let description = schema_description();
        for column in PRODUCT_COLUMNS {
            assert!(description.contains(column), "missing {}", column);
        }
        for category in Category::KNOWN {
            assert!(description.contains(&format!("'{}'", category.label())));
        }
        assert!(!description.contains("'unknown'"));
    }

    #[test]
    fn create_statement_matches_column_list() {
        for column in PRODUCT_COLUMNS {
            assert!(CREATE_PRODUCTS_TABLE.contains(&format!("    {} ", column)));
        }
    }
}
