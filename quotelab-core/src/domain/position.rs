//! Signed position in a single product.

use serde::{Deserialize, Serialize};

/// Position tracking. Quantity is signed: positive long, negative short.
///
/// Owned exclusively by the portfolio that created it; strategies only see
/// it through read-only accessors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub product_id: String,
    pub quantity: f64,
    pub avg_entry_price: f64,
}

impl Position {
    pub fn new(product_id: impl Into<String>) -> Self {
        Self {
            product_id: product_id.into(),
            quantity: 0.0,
            avg_entry_price: 0.0,
        }
    }

    pub fn is_long(&self) -> bool {
        self.quantity > 0.0
    }

    pub fn is_short(&self) -> bool {
        self.quantity < 0.0
    }

    pub fn is_flat(&self) -> bool {
        self.quantity == 0.0
    }

    /// Signed marked-to-market value.
    pub fn market_value(&self, price: f64) -> f64 {
        self.quantity * price
    }

    /// Unsigned contribution to gross exposure.
    pub fn exposure(&self, price: f64) -> f64 {
        self.quantity.abs() * price
    }

    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        self.quantity * (price - self.avg_entry_price)
    }

    /// Apply a signed fill at `price`.
    ///
    /// Increasing the position on the same side blends the entry price as a
    /// quantity-weighted average; reducing keeps it; crossing through zero
    /// restarts the remaining lot at the fill price.
    pub(crate) fn apply(&mut self, quantity: f64, price: f64) {
        let new_quantity = self.quantity + quantity;
        if self.quantity == 0.0 {
            self.avg_entry_price = price;
        } else if self.quantity.signum() == quantity.signum() {
            let total = self.quantity.abs() + quantity.abs();
            self.avg_entry_price =
                (self.avg_entry_price * self.quantity.abs() + price * quantity.abs()) / total;
        } else if new_quantity != 0.0 && new_quantity.signum() != self.quantity.signum() {
            self.avg_entry_price = price;
        }
        self.quantity = new_quantity;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_side_increase_blends_entry_price() {
        let mut pos = Position::new("AAPL");
        pos.apply(100.0, 10.0);
        pos.apply(100.0, 20.0);
        assert_eq!(pos.quantity, 200.0);
        assert_eq!(pos.avg_entry_price, 15.0);
    }

    #[test]
    fn reduction_keeps_entry_price() {
        let mut pos = Position::new("AAPL");
        pos.apply(100.0, 10.0);
        pos.apply(-40.0, 25.0);
        assert_eq!(pos.quantity, 60.0);
        assert_eq!(pos.avg_entry_price, 10.0);
    }

    #[test]
    fn crossing_zero_restarts_entry_price() {
        let mut pos = Position::new("AAPL");
        pos.apply(100.0, 10.0);
        pos.apply(-150.0, 12.0);
        assert_eq!(pos.quantity, -50.0);
        assert_eq!(pos.avg_entry_price, 12.0);
        assert!(pos.is_short());
    }

    #[test]
    fn pnl_follows_sign() {
        let mut long = Position::new("AAPL");
        long.apply(10.0, 100.0);
        assert_eq!(long.unrealized_pnl(110.0), 100.0);

        let mut short = Position::new("AAPL");
        short.apply(-10.0, 100.0);
        assert_eq!(short.unrealized_pnl(110.0), -100.0);
    }
}
