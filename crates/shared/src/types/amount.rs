//! Native value amounts in the smallest unit (wei).
//!
//! CRITICAL: all pool accounting is integer arithmetic on `Wei`.
//! `Decimal` only appears at the ether boundary (display, fixtures).

use num_bigint::BigUint;
use rust_decimal::Decimal;
use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};

/// Decimal places between wei and ether.
pub const ETHER_DECIMALS: u32 = 18;

/// Wei per ether.
const WEI_PER_ETHER: u64 = 1_000_000_000_000_000_000;

/// An amount of native value, in wei.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Wei(pub u128);

impl Wei {
    /// Zero wei.
    pub const ZERO: Self = Self(0);

    /// Creates an amount from a raw wei count.
    #[must_use]
    pub const fn new(wei: u128) -> Self {
        Self(wei)
    }

    /// Returns the raw wei count.
    #[must_use]
    pub const fn get(self) -> u128 {
        self.0
    }

    /// Returns true if the amount is zero.
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Checked addition. Returns `None` on overflow.
    #[must_use]
    pub const fn checked_add(self, rhs: Self) -> Option<Self> {
        match self.0.checked_add(rhs.0) {
            Some(v) => Some(Self(v)),
            None => None,
        }
    }

    /// Checked subtraction. Returns `None` on underflow.
    #[must_use]
    pub const fn checked_sub(self, rhs: Self) -> Option<Self> {
        match self.0.checked_sub(rhs.0) {
            Some(v) => Some(Self(v)),
            None => None,
        }
    }

    /// Saturating addition.
    #[must_use]
    pub const fn saturating_add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }

    /// Saturating subtraction, clamped at zero.
    #[must_use]
    pub const fn saturating_sub(self, rhs: Self) -> Self {
        Self(self.0.saturating_sub(rhs.0))
    }

    /// Computes `floor(self * numerator / denominator)`.
    ///
    /// The intermediate product is never truncated: when it does not fit in
    /// `u128` the division is carried out on a `BigUint`.
    ///
    /// Returns `None` if `denominator` is zero or the quotient does not fit.
    #[must_use]
    pub fn mul_div_floor(self, numerator: Self, denominator: Self) -> Option<Self> {
        if denominator.is_zero() {
            return None;
        }
        if let Some(product) = self.0.checked_mul(numerator.0) {
            return Some(Self(product / denominator.0));
        }

        let wide = BigUint::from(self.0) * BigUint::from(numerator.0) / BigUint::from(denominator.0);
        u128::try_from(wide).ok().map(Self)
    }

    /// Converts to ether.
    ///
    /// Returns `None` if the amount exceeds what `Decimal` can represent
    /// at 18 decimal places.
    #[must_use]
    pub fn to_ether(self) -> Option<Decimal> {
        let raw = i128::try_from(self.0).ok()?;
        Decimal::try_from_i128_with_scale(raw, ETHER_DECIMALS)
            .ok()
            .map(|d| d.normalize())
    }

    /// Parses an ether amount into wei.
    ///
    /// Rejects negative amounts and amounts finer than one wei.
    #[must_use]
    pub fn from_ether(ether: Decimal) -> Option<Self> {
        if ether.is_sign_negative() && !ether.is_zero() {
            return None;
        }
        let scaled = ether.checked_mul(Decimal::from(WEI_PER_ETHER))?;
        if !scaled.fract().is_zero() {
            return None;
        }
        scaled.trunc().to_u128().map(Self)
    }
}

impl From<u128> for Wei {
    fn from(wei: u128) -> Self {
        Self(wei)
    }
}

impl std::fmt::Display for Wei {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} wei", self.0)
    }
}
