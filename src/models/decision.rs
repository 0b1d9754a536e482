use serde::{Deserialize, Serialize};

use super::{ExtractedObservation, TrackedProduct, format_brl};

/// Outcome of comparing a fresh observation with the stored state of a product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PromotionDecision {
    NoChange,
    TargetPriceReached {
        effective_price: f64,
        target: f64,
        /// Drop relative to the previous stored price, 0 on the first observation.
        implied_discount: f64,
    },
    TargetDiscountReached {
        effective_discount: f64,
        target: f64,
        original_price: Option<f64>,
    },
}

impl PromotionDecision {
    pub fn should_notify(&self) -> bool {
        !matches!(self, PromotionDecision::NoChange)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            PromotionDecision::NoChange => "no_change",
            PromotionDecision::TargetPriceReached { .. } => "target_price_reached",
            PromotionDecision::TargetDiscountReached { .. } => "target_discount_reached",
        }
    }

    /// Alert text for the notification channel, `None` for `NoChange`.
    pub fn render_message(
        &self,
        product: &TrackedProduct,
        observation: &ExtractedObservation,
    ) -> Option<String> {
        let mut message = match self {
            PromotionDecision::NoChange => return None,
            PromotionDecision::TargetPriceReached {
                effective_price,
                target,
                implied_discount,
            } => {
                let mut message = format!(
                    "🎉 PROMOTION DETECTED!\n\nProduct: {}\nCurrent price: {}\nTarget price: {}\n",
                    product.name,
                    format_brl(*effective_price),
                    format_brl(*target),
                );
                if *implied_discount > 0.0 {
                    message.push_str(&format!("Discount: {:.1}%\n", implied_discount));
                }
                message
            }
            PromotionDecision::TargetDiscountReached {
                effective_discount,
                target,
                original_price,
            } => {
                let mut message = format!(
                    "🎉 PROMOTION DETECTED!\n\nProduct: {}\nCurrent price: {}\nDiscount: {:.1}% (target: {:.1}%)\n",
                    product.name,
                    format_brl(observation.price),
                    effective_discount,
                    target,
                );
                if let Some(original) = original_price {
                    message.push_str(&format!("Original price: {}\n", format_brl(*original)));
                }
                message
            }
        };

        message.push_str(&format!("\nLink: {}", product.url));
        Some(message)
    }
}
