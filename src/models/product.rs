use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::utils::error::AppError;

/// A monitored marketplace listing as stored in the `products` table.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct TrackedProduct {
    pub id: i64,
    pub url: String,
    pub name: String,

    // Last observation, zero means "never observed" / "not known"
    pub current_price: f64,
    pub original_price: f64,
    #[sqlx(rename = "discount")]
    pub discount_percent: f64,

    // Goals, zero means "not set"
    pub target_price: f64,
    #[sqlx(rename = "target_discount")]
    pub target_discount_percent: f64,

    #[sqlx(rename = "last_checked")]
    pub last_checked_at: Option<DateTime<Utc>>,
    #[sqlx(rename = "active")]
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl TrackedProduct {
    pub fn has_been_checked(&self) -> bool {
        self.current_price > 0.0
    }

    pub fn has_price_target(&self) -> bool {
        self.target_price > 0.0
    }

    pub fn has_discount_target(&self) -> bool {
        self.target_discount_percent > 0.0
    }

    /// Discount to show for the stored state: the site's figure, else derived from
    /// the stored original price.
    pub fn displayed_discount(&self) -> f64 {
        if self.discount_percent > 0.0 {
            self.discount_percent
        } else {
            crate::models::percent_below(self.original_price, self.current_price)
        }
    }

    pub fn target_price_met(&self) -> bool {
        self.has_price_target() && self.has_been_checked() && self.current_price <= self.target_price
    }
}

/// Goals attached to a tracking request. Either, both or neither may be set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct TargetSpec {
    #[validate(range(min = 0.0))]
    pub target_price: f64,
    #[validate(range(min = 0.0, max = 100.0))]
    pub target_discount_percent: f64,
}

impl TargetSpec {
    pub fn price(target_price: f64) -> Self {
        Self { target_price, target_discount_percent: 0.0 }
    }

    pub fn discount(target_discount_percent: f64) -> Self {
        Self { target_price: 0.0, target_discount_percent }
    }

    /// Parses a single user token: `3000` is a price goal, `15%` a discount goal.
    pub fn parse_token(token: &str) -> Result<Self, AppError> {
        let token = token.trim();
        if let Some(percent) = token.strip_suffix('%') {
            let value: f64 = percent.trim().replace(',', ".").parse().map_err(|_| {
                AppError::Validation(format!("Invalid discount '{}'. Use a value between 0 and 100.", token))
            })?;
            if !(value > 0.0 && value <= 100.0) {
                return Err(AppError::Validation(format!(
                    "Invalid discount '{}'. Use a value between 0 and 100.",
                    token
                )));
            }
            Ok(Self::discount(value))
        } else {
            let value: f64 = token.replace(',', ".").parse().map_err(|_| {
                AppError::Validation(format!("Invalid price '{}'. Use a positive number.", token))
            })?;
            if !(value > 0.0 && value.is_finite()) {
                return Err(AppError::Validation(format!(
                    "Invalid price '{}'. Use a positive number.",
                    token
                )));
            }
            Ok(Self::price(value))
        }
    }

    /// Combines several tokens, later goals of the same kind replace earlier ones.
    pub fn parse_tokens<'a, I>(tokens: I) -> Result<Self, AppError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut targets = TargetSpec::default();
        for token in tokens {
            let parsed = Self::parse_token(token)?;
            if parsed.target_price > 0.0 {
                targets.target_price = parsed.target_price;
            }
            if parsed.target_discount_percent > 0.0 {
                targets.target_discount_percent = parsed.target_discount_percent;
            }
        }
        Ok(targets)
    }
}

#[cfg(test)]
pub(crate) fn sample_product() -> TrackedProduct {
    TrackedProduct {
        id: 1,
        url: "https://produto.mercadolivre.com.br/MLB-123-notebook".to_string(),
        name: "Notebook Gamer".to_string(),
        current_price: 0.0,
        original_price: 0.0,
        discount_percent: 0.0,
        target_price: 0.0,
        target_discount_percent: 0.0,
        last_checked_at: None,
        is_active: true,
        created_at: Utc::now(),
    }
}
