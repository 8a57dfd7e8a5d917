//! # Google Distance Matrix Client
//!
//! Implements the `DistanceClient` trait over the Distance Matrix JSON
//! API (single origin, single destination). Transport failures map to
//! `ServiceUnavailable`/`GatewayTimeout`; per-element statuses are
//! passed through for the resolver to judge.

use crate::config::DistanceConfig;
use async_trait::async_trait;
use petal_core::{
    DistanceClient, DistanceReport, DistanceStatus, OrderError, OrderResult,
};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, error, instrument};

/// Bounded timeout for distance queries
const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Distance Matrix API client
pub struct DistanceMatrixClient {
    config: DistanceConfig,
    client: Client,
}

impl DistanceMatrixClient {
    /// Create a new client
    pub fn new(config: DistanceConfig) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to create HTTP client");

        Self { config, client }
    }

    /// Create from environment variables
    pub fn from_env() -> OrderResult<Self> {
        let config = DistanceConfig::from_env()?;
        Ok(Self::new(config))
    }

    /// The configured shop origin address
    pub fn origin(&self) -> &str {
        &self.config.origin
    }

    /// The configured region qualifier
    pub fn region(&self) -> &str {
        &self.config.region
    }

    fn map_transport_error(e: reqwest::Error) -> OrderError {
        if e.is_timeout() {
            OrderError::GatewayTimeout {
                service: "distance-matrix".to_string(),
            }
        } else {
            OrderError::ServiceUnavailable {
                service: "distance-matrix".to_string(),
                message: e.to_string(),
            }
        }
    }
}

#[async_trait]
impl DistanceClient for DistanceMatrixClient {
    #[instrument(skip(self), fields(destination = %destination))]
    async fn query_distance(
        &self,
        origin: &str,
        destination: &str,
    ) -> OrderResult<DistanceReport> {
        let url = format!("{}/maps/api/distancematrix/json", self.config.api_base_url);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("origins", origin),
                ("destinations", destination),
                ("key", self.config.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(Self::map_transport_error)?;

        let status = response.status();
        let body = response.text().await.map_err(Self::map_transport_error)?;

        if !status.is_success() {
            error!("Distance Matrix HTTP error: status={}, body={}", status, body);
            return Err(OrderError::ProviderError {
                provider: "distance-matrix".to_string(),
                message: format!("HTTP {status}"),
            });
        }

        let matrix: MatrixResponse = serde_json::from_str(&body).map_err(|e| {
            OrderError::Serialization(format!("Failed to parse Distance Matrix response: {e}"))
        })?;

        if matrix.status != "OK" {
            debug!("Distance Matrix top-level status: {}", matrix.status);
            return Ok(DistanceReport {
                status: parse_status(&matrix.status),
                distance_meters: None,
            });
        }

        let element = matrix
            .rows
            .first()
            .and_then(|row| row.elements.first())
            .ok_or_else(|| OrderError::ProviderError {
                provider: "distance-matrix".to_string(),
                message: "response contained no elements".to_string(),
            })?;

        let report = DistanceReport {
            status: parse_status(&element.status),
            distance_meters: element.distance.as_ref().map(|d| d.value),
        };
        debug!(
            element_status = %element.status,
            distance_meters = ?report.distance_meters,
            "distance query complete"
        );
        Ok(report)
    }

    fn provider_name(&self) -> &'static str {
        "distance-matrix"
    }
}

fn parse_status(status: &str) -> DistanceStatus {
    match status {
        "OK" => DistanceStatus::Ok,
        "NOT_FOUND" => DistanceStatus::NotFound,
        "ZERO_RESULTS" => DistanceStatus::ZeroResults,
        other => DistanceStatus::Other(other.to_string()),
    }
}

// =============================================================================
// Distance Matrix API Types
// =============================================================================

#[derive(Debug, Deserialize)]
struct MatrixResponse {
    status: String,
    #[serde(default)]
    rows: Vec<MatrixRow>,
}

#[derive(Debug, Deserialize)]
struct MatrixRow {
    #[serde(default)]
    elements: Vec<MatrixElement>,
}

#[derive(Debug, Deserialize)]
struct MatrixElement {
    status: String,
    #[serde(default)]
    distance: Option<MatrixDistance>,
}

#[derive(Debug, Deserialize)]
struct MatrixDistance {
    value: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> DistanceMatrixClient {
        DistanceMatrixClient::new(
            DistanceConfig::new("test-key").with_api_base_url(server.uri()),
        )
    }

    #[test]
    fn test_parse_status() {
        assert_eq!(parse_status("OK"), DistanceStatus::Ok);
        assert_eq!(parse_status("NOT_FOUND"), DistanceStatus::NotFound);
        assert_eq!(parse_status("ZERO_RESULTS"), DistanceStatus::ZeroResults);
        assert_eq!(
            parse_status("MAX_ELEMENTS_EXCEEDED"),
            DistanceStatus::Other("MAX_ELEMENTS_EXCEEDED".to_string())
        );
    }

    #[tokio::test]
    async fn test_query_distance_ok() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/maps/api/distancematrix/json"))
            .and(query_param("destinations", "V2M 1V8, BC"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "OK",
                "rows": [{
                    "elements": [{
                        "status": "OK",
                        "distance": { "text": "7.3 km", "value": 7250 },
                        "duration": { "text": "12 mins", "value": 720 }
                    }]
                }]
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let report = client
            .query_distance("4190 15th Ave", "V2M 1V8, BC")
            .await
            .unwrap();
        assert!(report.status.is_ok());
        assert_eq!(report.distance_meters, Some(7250));
    }

    #[tokio::test]
    async fn test_query_distance_element_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/maps/api/distancematrix/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "OK",
                "rows": [{ "elements": [{ "status": "NOT_FOUND" }] }]
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let report = client.query_distance("origin", "nowhere").await.unwrap();
        assert_eq!(report.status, DistanceStatus::NotFound);
        assert_eq!(report.distance_meters, None);
    }

    #[tokio::test]
    async fn test_query_distance_top_level_denied() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/maps/api/distancematrix/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "REQUEST_DENIED",
                "rows": []
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let report = client.query_distance("origin", "dest").await.unwrap();
        assert_eq!(
            report.status,
            DistanceStatus::Other("REQUEST_DENIED".to_string())
        );
    }

    #[tokio::test]
    async fn test_query_distance_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/maps/api/distancematrix/json"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client.query_distance("origin", "dest").await.unwrap_err();
        assert!(matches!(err, OrderError::ProviderError { .. }));
    }
}
