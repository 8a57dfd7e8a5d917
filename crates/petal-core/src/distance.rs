//! # Distance Resolution
//!
//! Turns a free-text destination address into a delivery distance via an
//! external distance-matrix collaborator. The resolver owns the lossy
//! postal-code normalization and the zero-distance rejection policy; the
//! actual HTTP client lives behind the [`DistanceClient`] trait.

use crate::error::{OrderError, OrderResult};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Per-element status reported by the distance collaborator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DistanceStatus {
    /// Distance computed
    Ok,
    /// Destination could not be geocoded
    NotFound,
    /// No route between origin and destination
    ZeroResults,
    /// Anything else the provider reports
    Other(String),
}

impl DistanceStatus {
    pub fn is_ok(&self) -> bool {
        matches!(self, DistanceStatus::Ok)
    }

    pub fn describe(&self) -> String {
        match self {
            DistanceStatus::Ok => "OK".to_string(),
            DistanceStatus::NotFound => "NOT_FOUND".to_string(),
            DistanceStatus::ZeroResults => "ZERO_RESULTS".to_string(),
            DistanceStatus::Other(s) => s.clone(),
        }
    }
}

/// Raw result of one distance query
#[derive(Debug, Clone)]
pub struct DistanceReport {
    /// Collaborator's per-element status
    pub status: DistanceStatus,
    /// Driving distance in meters, when the status is ok
    pub distance_meters: Option<u64>,
}

/// External distance-matrix collaborator (single origin, single
/// destination). Transport failures are the implementation's to map to
/// `ServiceUnavailable`/`GatewayTimeout`; status policy is the
/// resolver's.
#[async_trait]
pub trait DistanceClient: Send + Sync {
    async fn query_distance(&self, origin: &str, destination: &str)
        -> OrderResult<DistanceReport>;

    /// Provider name, for logging
    fn provider_name(&self) -> &'static str;
}

/// Type alias for a shared distance client handle
pub type BoxedDistanceClient = Arc<dyn DistanceClient>;

/// Resolves raw addresses to kilometers.
pub struct DistanceResolver {
    client: BoxedDistanceClient,
    origin: String,
    region: String,
}

impl DistanceResolver {
    /// `origin` is the shop's own address; `region` is the fixed
    /// qualifier appended to every normalized destination (e.g. "BC").
    pub fn new(client: BoxedDistanceClient, origin: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            client,
            origin: origin.into(),
            region: region.into(),
        }
    }

    /// Normalize a free-text address into a distance query term.
    ///
    /// Extracts the first postal-code-shaped substring (3 alphanumerics,
    /// optional single space, 3 alphanumerics); a contiguous match gets
    /// a space inserted between the triplets. When nothing matches, the
    /// raw input is used as-is. The region qualifier is appended either
    /// way. Lossy for addresses without a recognizable code; the
    /// collaborator's own matching is the authority on those.
    pub fn normalize_destination(&self, raw: &str) -> String {
        let term = extract_postal_code(raw).unwrap_or_else(|| raw.to_string());
        format!("{}, {}", term, self.region)
    }

    /// Resolve a raw address to a distance in kilometers.
    ///
    /// An exactly-zero distance is rejected: a valid zero-distance
    /// result is indistinguishable from a malformed query.
    pub async fn resolve(&self, raw_address: &str) -> OrderResult<f64> {
        if raw_address.trim().is_empty() {
            return Err(OrderError::MissingDestination);
        }

        let destination = self.normalize_destination(raw_address);
        debug!(
            provider = self.client.provider_name(),
            %destination,
            "querying distance"
        );

        let report = self.client.query_distance(&self.origin, &destination).await?;

        if !report.status.is_ok() {
            return Err(OrderError::InvalidDestination {
                details: report.status.describe(),
            });
        }

        let meters = report.distance_meters.ok_or_else(|| OrderError::InvalidDestination {
            details: "no distance returned".to_string(),
        })?;

        if meters == 0 {
            return Err(OrderError::InvalidDestination {
                details: "distance returned as zero".to_string(),
            });
        }

        Ok(meters as f64 / 1000.0)
    }
}

/// First postal-code-shaped substring of `raw`: three alphanumerics, an
/// optional single space, three alphanumerics. A contiguous six-character
/// match is reformatted with a space between the triplets.
fn extract_postal_code(raw: &str) -> Option<String> {
    let chars: Vec<char> = raw.chars().collect();
    let alnum = |c: &char| c.is_ascii_alphanumeric();

    for start in 0..chars.len() {
        let triplet = |from: usize| {
            chars
                .get(from..from + 3)
                .is_some_and(|s| s.iter().all(alnum))
        };

        // Spaced form first: "V2M 1V8" kept verbatim
        if triplet(start)
            && chars.get(start + 3).is_some_and(|c| *c == ' ')
            && triplet(start + 4)
        {
            return Some(chars[start..start + 7].iter().collect());
        }

        // Contiguous form: "V2M1V8" → "V2M 1V8"
        if triplet(start) && triplet(start + 3) {
            let head: String = chars[start..start + 3].iter().collect();
            let tail: String = chars[start + 3..start + 6].iter().collect();
            return Some(format!("{head} {tail}"));
        }
    }

    None
}
