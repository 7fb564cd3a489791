use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(pub i64);

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub title: String,
    pub brand: String,
    pub category: String,
    pub price: Decimal,
    pub description: String,
}

impl Product {
    /// Case-insensitive category match.
    pub fn in_category(&self, category: &str) -> bool {
        self.category.to_lowercase() == category.to_lowercase()
    }

    /// Price rendered with exactly two decimal places.
    pub fn display_price(&self) -> String {
        format!("{:.2}", self.price)
    }

    /// Text embedded into the vector store for every event on this product.
    pub fn document(&self) -> String {
        format!("{} {}", self.title, self.description)
    }
}
