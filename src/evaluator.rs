//! Decides whether a fresh observation is worth an alert.
//!
//! The evaluator compares the stored snapshot (state before this check) with the
//! new observation. Repeated checks at an unchanged price or discount stay silent.

use crate::models::{ExtractedObservation, PromotionDecision, TrackedProduct, percent_below};

#[derive(Debug, Clone, Copy, Default)]
pub struct PromotionEvaluator;

impl PromotionEvaluator {
    pub fn new() -> Self {
        Self
    }

    /// Discount to compare against the goal.
    ///
    /// The site's own figure wins. Without it, a drop relative to the previous
    /// stored price counts, then the gap to the listed original price.
    pub fn effective_discount(&self, prior: &TrackedProduct, observation: &ExtractedObservation) -> f64 {
        if observation.discount_percent > 0.0 {
            observation.discount_percent
        } else if prior.current_price > 0.0 && observation.price < prior.current_price {
            percent_below(prior.current_price, observation.price)
        } else if observation.original_price > observation.price {
            percent_below(observation.original_price, observation.price)
        } else {
            0.0
        }
    }

    pub fn decide(&self, prior: &TrackedProduct, observation: &ExtractedObservation) -> PromotionDecision {
        let price_decision = self.check_target_price(prior, observation);
        let discount_decision = self.check_target_discount(prior, observation);

        // one alert per check; the discount alert carries more context
        discount_decision
            .or(price_decision)
            .unwrap_or(PromotionDecision::NoChange)
    }

    fn check_target_price(
        &self,
        prior: &TrackedProduct,
        observation: &ExtractedObservation,
    ) -> Option<PromotionDecision> {
        if !prior.has_price_target() || observation.price > prior.target_price {
            return None;
        }

        let first_observation = prior.current_price == 0.0;
        if !first_observation && observation.price >= prior.current_price {
            return None;
        }

        Some(PromotionDecision::TargetPriceReached {
            effective_price: observation.price,
            target: prior.target_price,
            implied_discount: percent_below(prior.current_price, observation.price),
        })
    }

    fn check_target_discount(
        &self,
        prior: &TrackedProduct,
        observation: &ExtractedObservation,
    ) -> Option<PromotionDecision> {
        if !prior.has_discount_target() {
            return None;
        }

        let effective = self.effective_discount(prior, observation);
        if effective < prior.target_discount_percent {
            return None;
        }

        // a discount the site keeps showing unchanged was already reported
        if prior.discount_percent != 0.0 && observation.discount_percent == prior.discount_percent {
            return None;
        }

        Some(PromotionDecision::TargetDiscountReached {
            effective_discount: effective,
            target: prior.target_discount_percent,
            original_price: (observation.original_price > 0.0).then_some(observation.original_price),
        })
    }
}
