pub mod decision;
pub mod observation;
pub mod product;

// Re-exports for convenience
pub use decision::*;
pub use observation::*;
pub use product::*;

/// Formats an amount the way the marketplace shows it in messages.
pub fn format_brl(amount: f64) -> String {
    format!("R$ {:.2}", amount)
}

/// Percentage drop from `reference` to `price`, 0 when there is no drop.
pub fn percent_below(reference: f64, price: f64) -> f64 {
    if reference > 0.0 && price < reference {
        (reference - price) / reference * 100.0
    } else {
        0.0
    }
}
