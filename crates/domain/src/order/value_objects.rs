//! Value objects for the order domain.

use serde::{Deserialize, Serialize};

/// Signed stock adjustment for a single operation.
///
/// Positive values consume stock (a reservation), negative values return it
/// (a release). Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StockDelta(i64);

impl StockDelta {
    /// Creates a delta from a signed amount.
    pub fn new(amount: i64) -> Self {
        Self(amount)
    }

    /// Delta that consumes `quantity` units.
    pub fn reserve(quantity: u32) -> Self {
        Self(i64::from(quantity))
    }

    /// Delta that returns `quantity` units.
    pub fn release(quantity: u32) -> Self {
        Self(-i64::from(quantity))
    }

    /// Delta needed to move an order from `current` to `target` units.
    pub fn between(current: u32, target: u32) -> Self {
        Self(i64::from(target) - i64::from(current))
    }

    /// Returns the signed amount.
    pub fn amount(&self) -> i64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Units to reserve, if this delta consumes stock.
    pub fn reserved(&self) -> Option<u32> {
        (self.0 > 0).then(|| u32::try_from(self.0).unwrap_or(u32::MAX))
    }

    /// Units to release, if this delta returns stock.
    pub fn released(&self) -> Option<u32> {
        (self.0 < 0).then(|| u32::try_from(self.0.unsigned_abs()).unwrap_or(u32::MAX))
    }
}

impl std::fmt::Display for StockDelta {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:+}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn between_computes_signed_difference() {
        assert_eq!(StockDelta::between(3, 5).amount(), 2);
        assert_eq!(StockDelta::between(5, 1).amount(), -4);
        assert!(StockDelta::between(4, 4).is_zero());
    }

    #[test]
    fn reserved_and_released_split_by_sign() {
        let up = StockDelta::between(3, 5);
        assert_eq!(up.reserved(), Some(2));
        assert_eq!(up.released(), None);

        let down = StockDelta::between(5, 1);
        assert_eq!(down.reserved(), None);
        assert_eq!(down.released(), Some(4));

        let zero = StockDelta::new(0);
        assert_eq!(zero.reserved(), None);
        assert_eq!(zero.released(), None);
    }

    #[test]
    fn constructors_match_between() {
        assert_eq!(StockDelta::reserve(7), StockDelta::between(0, 7));
        assert_eq!(StockDelta::release(7), StockDelta::between(7, 0));
    }

    #[test]
    fn display_is_signed() {
        assert_eq!(StockDelta::new(2).to_string(), "+2");
        assert_eq!(StockDelta::new(-4).to_string(), "-4");
    }
}
