//! Bundle tiers and the arithmetic applied to them.
//!
//! A "bundle" product exposes a single option axis named `Bundle` with the
//! values `1x`, `2x` and `3x`. Tier prices and quantities are always derived
//! from the base (un-bundled) variant on demand; nothing derived is stored.

use rust_decimal::{Decimal, RoundingStrategy};
use thiserror::Error;

/// The option axis name that marks a product as a bundle.
pub const BUNDLE_OPTION_NAME: &str = "Bundle";

/// One of the 1x/2x/3x bundle multiples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize)]
#[serde(into = "u32")]
pub enum BundleTier {
    /// Single unit (the base tier).
    Single,
    /// Two-pack.
    Double,
    /// Three-pack.
    Triple,
}

/// Error returned when a string is not a recognized tier option value.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("not a bundle tier value: {0}")]
pub struct TierParseError(String);

impl BundleTier {
    /// All tiers, ordered by ascending multiplier.
    pub const ALL: [Self; 3] = [Self::Single, Self::Double, Self::Triple];

    /// The quantity multiplier for this tier.
    #[must_use]
    pub const fn multiplier(self) -> u32 {
        match self {
            Self::Single => 1,
            Self::Double => 2,
            Self::Triple => 3,
        }
    }

    /// The option value string used on the platform ("1x", "2x", "3x").
    #[must_use]
    pub const fn option_value(self) -> &'static str {
        match self {
            Self::Single => "1x",
            Self::Double => "2x",
            Self::Triple => "3x",
        }
    }

    /// Parse a platform option value into a tier.
    ///
    /// Matching is case-insensitive and ignores surrounding whitespace, so
    /// `"2X "` parses as [`Self::Double`].
    ///
    /// # Errors
    ///
    /// Returns [`TierParseError`] for any other string.
    pub fn parse(value: &str) -> Result<Self, TierParseError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "1x" => Ok(Self::Single),
            "2x" => Ok(Self::Double),
            "3x" => Ok(Self::Triple),
            other => Err(TierParseError(other.to_string())),
        }
    }

    /// Whether the given option value names any tier.
    #[must_use]
    pub fn is_tier_value(value: &str) -> bool {
        Self::parse(value).is_ok()
    }
}

impl From<BundleTier> for u32 {
    fn from(tier: BundleTier) -> Self {
        tier.multiplier()
    }
}

/// Compute the price of a tier variant.
///
/// `price = round(base * multiplier * (1 - discount/100), 2)` with midpoint
/// rounding away from zero. A discount of zero reduces to
/// `round(base * multiplier, 2)`.
#[must_use]
pub fn tier_price(base: Decimal, tier: BundleTier, discount_percent: Decimal) -> Decimal {
    let factor = (Decimal::ONE_HUNDRED - discount_percent) / Decimal::ONE_HUNDRED;
    (base * Decimal::from(tier.multiplier()) * factor)
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Compute the available quantity for a tier variant.
///
/// `quantity = floor(base_available / multiplier)`, never negative.
#[must_use]
pub fn tier_quantity(base_available: i64, tier: BundleTier) -> i64 {
    if base_available <= 0 {
        return 0;
    }
    base_available / i64::from(tier.multiplier())
}

/// Format a price as the 2-decimal string the platform expects on write.
#[must_use]
pub fn format_price(price: Decimal) -> String {
    format!(
        "{:.2}",
        price.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    )
}

/// Visitor-to-purchase conversion ratio in percent.
///
/// Returns `0.0` when no visits have been recorded.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn conversion_rate(units_sold: i64, visitors: i64) -> f64 {
    if visitors <= 0 {
        return 0.0;
    }
    units_sold as f64 / visitors as f64 * 100.0
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_multipliers_and_values() {
        assert_eq!(BundleTier::Single.multiplier(), 1);
        assert_eq!(BundleTier::Double.multiplier(), 2);
        assert_eq!(BundleTier::Triple.multiplier(), 3);
        assert_eq!(BundleTier::Double.option_value(), "2x");
    }

    #[test]
    fn test_all_is_ordered_ascending() {
        let multipliers: Vec<u32> = BundleTier::ALL.iter().map(|t| t.multiplier()).collect();
        assert_eq!(multipliers, vec![1, 2, 3]);
    }

    #[test]
    fn test_parse_case_and_whitespace() {
        assert_eq!(BundleTier::parse("1x").unwrap(), BundleTier::Single);
        assert_eq!(BundleTier::parse(" 2X ").unwrap(), BundleTier::Double);
        assert_eq!(BundleTier::parse("3x").unwrap(), BundleTier::Triple);
        assert!(BundleTier::parse("4x").is_err());
        assert!(BundleTier::parse("Title").is_err());
    }

    #[test]
    fn test_is_tier_value() {
        assert!(BundleTier::is_tier_value("1x"));
        assert!(!BundleTier::is_tier_value("Default Title"));
    }

    #[test]
    fn test_tier_price_no_discount() {
        let price = tier_price(dec!(10.00), BundleTier::Double, Decimal::ZERO);
        assert_eq!(price, dec!(20.00));
    }

    #[test]
    fn test_tier_price_with_discount() {
        // The documented scenario: base 10.00, d2=10, d3=20.
        assert_eq!(
            tier_price(dec!(10.00), BundleTier::Single, Decimal::ZERO),
            dec!(10.00)
        );
        assert_eq!(
            tier_price(dec!(10.00), BundleTier::Double, dec!(10)),
            dec!(18.00)
        );
        assert_eq!(
            tier_price(dec!(10.00), BundleTier::Triple, dec!(20)),
            dec!(24.00)
        );
    }

    #[test]
    fn test_tier_price_rounds_to_two_decimals() {
        // 9.99 * 3 * 0.85 = 25.4745 -> 25.47
        assert_eq!(
            tier_price(dec!(9.99), BundleTier::Triple, dec!(15)),
            dec!(25.47)
        );
        // Midpoint rounds away from zero: 10.05 * 1 * 0.5 = 5.025 -> 5.03
        assert_eq!(
            tier_price(dec!(10.05), BundleTier::Single, dec!(50)),
            dec!(5.03)
        );
    }

    #[test]
    fn test_tier_price_full_discount() {
        assert_eq!(
            tier_price(dec!(10.00), BundleTier::Double, dec!(100)),
            dec!(0.00)
        );
    }

    #[test]
    fn test_tier_quantity_floor_division() {
        assert_eq!(tier_quantity(37, BundleTier::Single), 37);
        assert_eq!(tier_quantity(37, BundleTier::Double), 18);
        assert_eq!(tier_quantity(37, BundleTier::Triple), 12);
    }

    #[test]
    fn test_tier_quantity_clamps_to_zero() {
        assert_eq!(tier_quantity(0, BundleTier::Triple), 0);
        assert_eq!(tier_quantity(-5, BundleTier::Single), 0);
        assert_eq!(tier_quantity(2, BundleTier::Triple), 0);
    }

    #[test]
    fn test_format_price_two_fraction_digits() {
        assert_eq!(format_price(dec!(10)), "10.00");
        assert_eq!(format_price(dec!(18.5)), "18.50");
        assert_eq!(format_price(dec!(25.4745)), "25.47");
    }

    #[test]
    fn test_conversion_rate() {
        assert!((conversion_rate(5, 100) - 5.0).abs() < f64::EPSILON);
        assert!((conversion_rate(3, 4) - 75.0).abs() < f64::EPSILON);
        assert!((conversion_rate(10, 0) - 0.0).abs() < f64::EPSILON);
    }
}
