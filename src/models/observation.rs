use serde::{Deserialize, Serialize};

/// Name used when neither the page markup nor its structured data carries one.
pub const UNNAMED_PRODUCT: &str = "Produto sem nome";

/// One successful read of a product page.
///
/// `price` is always positive. `original_price` and `discount_percent` are 0
/// when the page does not show them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedObservation {
    pub price: f64,
    pub original_price: f64,
    pub discount_percent: f64,
    pub name: String,
}

impl ExtractedObservation {
    pub fn new(price: f64) -> Self {
        Self {
            price,
            original_price: 0.0,
            discount_percent: 0.0,
            name: UNNAMED_PRODUCT.to_string(),
        }
    }

    pub fn with_original_price(mut self, original_price: f64) -> Self {
        self.original_price = original_price;
        self
    }

    pub fn with_discount(mut self, discount_percent: f64) -> Self {
        self.discount_percent = discount_percent;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Whether the page advertised a promotion (discount badge or struck-through price).
    pub fn has_promotion_signals(&self) -> bool {
        self.discount_percent > 0.0 || self.original_price > 0.0
    }
}
