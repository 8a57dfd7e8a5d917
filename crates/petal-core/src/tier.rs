//! # Delivery Cost Tiers
//!
//! Tiered distance bands mapping a delivery distance to a flat fee, and
//! the pricer that owns the tier-matching algorithm and out-of-area
//! policy. Tier data is immutable reference data loaded from
//! `config/tiers.toml`; the table trusts the source's ascending order
//! and never re-sorts.

use crate::error::{OrderError, OrderResult};
use crate::money::{Currency, Price};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// A contiguous distance band with a fixed delivery fee
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryCostTier {
    /// Lower bound in kilometers, inclusive
    pub min_distance: f64,
    /// Upper bound in kilometers, inclusive
    pub max_distance: f64,
    /// Flat fee charged for distances in this band
    pub cost: Price,
}

impl DeliveryCostTier {
    /// Create a tier from decimal distances and a decimal cost
    pub fn new(min_distance: f64, max_distance: f64, cost: f64, currency: Currency) -> Self {
        Self {
            min_distance,
            max_distance,
            cost: Price::new(cost, currency),
        }
    }
}

/// Ordered set of delivery tiers, ascending by `max_distance`.
///
/// The table depends on its source delivering tiers pre-sorted; the
/// constructor validates that contract instead of silently re-sorting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierTable {
    tiers: Vec<DeliveryCostTier>,
}

impl TierTable {
    /// Build a table from pre-sorted tiers.
    ///
    /// Fails with a configuration error when the list is empty or not
    /// ascending by `max_distance`.
    pub fn new(tiers: Vec<DeliveryCostTier>) -> OrderResult<Self> {
        if tiers.is_empty() {
            return Err(OrderError::Configuration(
                "tier table must contain at least one tier".to_string(),
            ));
        }
        let sorted = tiers
            .windows(2)
            .all(|pair| pair[0].max_distance <= pair[1].max_distance);
        if !sorted {
            return Err(OrderError::Configuration(
                "tiers must be sorted ascending by max_distance".to_string(),
            ));
        }
        Ok(Self { tiers })
    }

    /// The tiers in ascending order
    pub fn tiers(&self) -> &[DeliveryCostTier] {
        &self.tiers
    }

    /// Largest `max_distance` across all tiers; beyond it is out of area
    pub fn max_distance(&self) -> f64 {
        self.tiers
            .iter()
            .map(|t| t.max_distance)
            .fold(0.0, f64::max)
    }
}

/// TOML shape of `config/tiers.toml`
#[derive(Debug, Clone, Deserialize)]
pub struct TierTableConfig {
    /// Currency the tier costs are denominated in
    #[serde(default)]
    pub currency: Currency,
    /// Tier rows, sorted ascending by `max_distance` in the file
    pub tiers: Vec<TierRow>,
}

/// One tier row in the config file, cost in decimal currency units
#[derive(Debug, Clone, Deserialize)]
pub struct TierRow {
    pub min_distance: f64,
    pub max_distance: f64,
    pub cost: f64,
}

impl TierTableConfig {
    /// Parse a tier table from a TOML string
    pub fn from_toml(toml_str: &str) -> OrderResult<Self> {
        toml::from_str(toml_str).map_err(|e| OrderError::Configuration(e.to_string()))
    }

    /// Convert config rows into a validated table
    pub fn into_table(self) -> OrderResult<TierTable> {
        let currency = self.currency;
        TierTable::new(
            self.tiers
                .into_iter()
                .map(|row| DeliveryCostTier::new(row.min_distance, row.max_distance, row.cost, currency))
                .collect(),
        )
    }
}

/// Maps a resolved distance to a delivery fee.
///
/// Pure over the tier table and the input distance; the only side effect
/// is a warning when the gap fallback fires.
#[derive(Debug, Clone)]
pub struct DeliveryPricer {
    table: TierTable,
}

impl DeliveryPricer {
    pub fn new(table: TierTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &TierTable {
        &self.table
    }

    /// Price a delivery distance.
    ///
    /// Selects the first tier (ascending) containing the distance; a
    /// distance falling in a gap between two tiers is attributed to the
    /// lower tier. Distances past the largest tier bound are out of
    /// area. Zero distances never reach here; the resolver rejects them
    /// upstream.
    pub fn price(&self, distance_km: f64) -> OrderResult<Price> {
        if !distance_km.is_finite() || distance_km < 0.0 {
            return Err(OrderError::InvalidRequest(format!(
                "distance must be a non-negative number, got {distance_km}"
            )));
        }

        if distance_km > self.table.max_distance() {
            return Err(OrderError::OutOfArea { distance_km });
        }

        let tiers = self.table.tiers();
        for (i, tier) in tiers.iter().enumerate() {
            let in_band = distance_km <= tier.max_distance;
            let in_gap_below_next = tiers
                .get(i + 1)
                .is_some_and(|next| distance_km < next.min_distance);
            if distance_km >= tier.min_distance && (in_band || in_gap_below_next) {
                return Ok(tier.cost);
            }
        }

        // Unreachable with a well-formed table; a distance below every
        // tier's min_distance lands here. Charge the first tier rather
        // than refuse the order, but make the misconfiguration visible.
        warn!(
            distance_km,
            "no tier matched distance; falling back to first tier"
        );
        self.table
            .tiers()
            .first()
            .map(|t| t.cost)
            .ok_or_else(|| OrderError::Internal("empty tier table".to_string()))
    }
}
