//! Google Geocoding API client.
//!
//! `GET {base}/maps/api/geocode/json?address=...&key=...`
//!
//! The API reports lookup outcomes in the body's `status` field rather than
//! through HTTP status codes: `OK` carries results, `ZERO_RESULTS` means the
//! address is unknown, and anything else is a failure.
//!
//! See <https://developers.google.com/maps/documentation/geocoding/requests-geocoding>

use async_trait::async_trait;
use retail_sync_models::GeoPoint;

use crate::{GeocodeError, Geocoder};

/// Default API host.
pub const DEFAULT_BASE_URL: &str = "https://maps.googleapis.com";

/// Google Geocoding API client.
#[derive(Clone)]
pub struct GoogleGeocoder {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl std::fmt::Debug for GoogleGeocoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleGeocoder")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl GoogleGeocoder {
    /// Creates a client authenticated with `api_key`.
    #[must_use]
    pub fn new(client: reqwest::Client, api_key: &str) -> Self {
        Self {
            client,
            api_key: api_key.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Points the client at a different API host.
    #[must_use]
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl Geocoder for GoogleGeocoder {
    async fn geocode(&self, address: &str) -> Result<Option<GeoPoint>, GeocodeError> {
        let url = format!("{}/maps/api/geocode/json", self.base_url);
        log::debug!("Geocoding address: {address}");

        let resp = self
            .client
            .get(&url)
            .query(&[("address", address), ("key", self.api_key.as_str())])
            .send()
            .await?;

        if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(GeocodeError::RateLimited);
        }

        if !resp.status().is_success() {
            return Err(GeocodeError::Status {
                status: resp.status().as_u16().to_string(),
                message: resp.text().await.unwrap_or_default(),
            });
        }

        let body: serde_json::Value = resp.json().await?;
        parse_response(&body)
    }
}

/// Parses a geocoding response body.
fn parse_response(body: &serde_json::Value) -> Result<Option<GeoPoint>, GeocodeError> {
    let status = body["status"].as_str().ok_or_else(|| GeocodeError::Parse {
        message: "Missing status in geocoding response".to_string(),
    })?;

    match status {
        "OK" => {}
        "ZERO_RESULTS" => return Ok(None),
        "OVER_QUERY_LIMIT" | "OVER_DAILY_LIMIT" => return Err(GeocodeError::RateLimited),
        other => {
            return Err(GeocodeError::Status {
                status: other.to_string(),
                message: body["error_message"].as_str().unwrap_or_default().to_string(),
            });
        }
    }

    let Some(first) = body["results"].as_array().and_then(|r| r.first()) else {
        return Ok(None);
    };

    let location = &first["geometry"]["location"];

    let lat = location["lat"].as_f64().ok_or_else(|| GeocodeError::Parse {
        message: "Missing lat in geocoding response".to_string(),
    })?;
    let lng = location["lng"].as_f64().ok_or_else(|| GeocodeError::Parse {
        message: "Missing lng in geocoding response".to_string(),
    })?;

    Ok(Some(GeoPoint::new(lat, lng)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn debug_output_hides_api_key() {
        let geocoder = GoogleGeocoder::new(reqwest::Client::new(), "maps-secret");
        let debug = format!("{geocoder:?}");
        assert!(debug.contains(DEFAULT_BASE_URL));
        assert!(!debug.contains("maps-secret"));
    }

    #[test]
    fn parses_first_result() {
        let body = json!({
            "status": "OK",
            "results": [
                { "geometry": { "location": { "lat": 39.7392, "lng": -104.9903 } } },
                { "geometry": { "location": { "lat": 0.0, "lng": 0.0 } } }
            ]
        });
        let point = parse_response(&body).unwrap().unwrap();
        assert!((point.lat - 39.7392).abs() < 1e-6);
        assert!((point.lng - -104.9903).abs() < 1e-6);
    }

    #[test]
    fn zero_results_is_no_match() {
        let body = json!({ "status": "ZERO_RESULTS", "results": [] });
        assert!(parse_response(&body).unwrap().is_none());
    }

    #[test]
    fn denied_request_is_an_error() {
        let body = json!({
            "status": "REQUEST_DENIED",
            "error_message": "The provided API key is invalid.",
            "results": []
        });
        match parse_response(&body).unwrap_err() {
            GeocodeError::Status { status, message } => {
                assert_eq!(status, "REQUEST_DENIED");
                assert!(message.contains("invalid"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn quota_exhaustion_is_rate_limited() {
        let body = json!({ "status": "OVER_QUERY_LIMIT", "results": [] });
        assert!(matches!(
            parse_response(&body).unwrap_err(),
            GeocodeError::RateLimited
        ));
    }

    #[test]
    fn missing_location_is_a_parse_error() {
        let body = json!({ "status": "OK", "results": [{ "geometry": {} }] });
        assert!(matches!(
            parse_response(&body).unwrap_err(),
            GeocodeError::Parse { .. }
        ));
    }

    #[tokio::test]
    async fn sends_address_and_key() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/maps/api/geocode/json"))
            .and(query_param("address", "1600 Pennsylvania Ave NW, Washington, DC"))
            .and(query_param("key", "gkey"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "OK",
                "results": [{ "geometry": { "location": { "lat": 38.8977, "lng": -77.0365 } } }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let geocoder =
            GoogleGeocoder::new(reqwest::Client::new(), "gkey").with_base_url(&server.uri());
        let point = geocoder
            .geocode("1600 Pennsylvania Ave NW, Washington, DC")
            .await
            .unwrap()
            .unwrap();

        assert!((point.lat - 38.8977).abs() < 1e-6);
    }

    #[tokio::test]
    async fn http_failure_is_a_status_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let geocoder =
            GoogleGeocoder::new(reqwest::Client::new(), "gkey").with_base_url(&server.uri());
        let err = geocoder.geocode("anywhere").await.unwrap_err();

        assert!(matches!(err, GeocodeError::Status { ref status, .. } if status == "503"));
    }
}
