//! HTTP client wrapper with request signing.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use reqwest::{Client, Method, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;

use super::api_types::BinanceErrorResponse;
use super::config::BinanceConfig;
use super::error::BinanceError;
use super::signer;

/// HTTP client for the Binance REST API.
///
/// One request per call; failures are classified and returned, never retried.
#[derive(Debug, Clone)]
pub struct BinanceHttpClient {
    client: Client,
    api_key: String,
    api_secret: SecretString,
    base_url: String,
    recv_window_ms: u128,
    time_offset_ms: Arc<AtomicI64>,
}

impl BinanceHttpClient {
    /// Create a new HTTP client from config.
    pub fn new(config: &BinanceConfig) -> Result<Self, BinanceError> {
        if config.api_key.is_empty() || config.api_secret.expose_secret().is_empty() {
            return Err(BinanceError::MissingCredentials);
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| BinanceError::Network(e.to_string()))?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            api_secret: config.api_secret.clone(),
            base_url: config.base_url().to_string(),
            recv_window_ms: config.recv_window.as_millis(),
            time_offset_ms: Arc::new(AtomicI64::new(0)),
        })
    }

    /// Unsigned GET.
    pub async fn get_public<T: DeserializeOwned>(&self, path: &str) -> Result<T, BinanceError> {
        self.request(Method::GET, path, &[], false).await
    }

    /// Signed GET.
    pub async fn get_signed<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, BinanceError> {
        self.request(Method::GET, path, params, true).await
    }

    /// Signed POST, parameters in the query string.
    pub async fn post_signed<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, BinanceError> {
        self.request(Method::POST, path, params, true).await
    }

    /// Signed DELETE.
    pub async fn delete_signed<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, BinanceError> {
        self.request(Method::DELETE, path, params, true).await
    }

    /// Record the venue clock so signed timestamps follow it.
    pub fn set_time_offset(&self, offset_ms: i64) {
        self.time_offset_ms.store(offset_ms, Ordering::Relaxed);
    }

    /// Current offset between the venue clock and ours.
    pub fn time_offset_ms(&self) -> i64 {
        self.time_offset_ms.load(Ordering::Relaxed)
    }

    fn timestamp_ms(&self) -> i64 {
        chrono::Utc::now().timestamp_millis() + self.time_offset_ms()
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        params: &[(&str, String)],
        signed: bool,
    ) -> Result<T, BinanceError> {
        let query = if signed {
            let mut all: Vec<(&str, String)> = params.to_vec();
            all.push(("recvWindow", self.recv_window_ms.to_string()));
            signer::signed_query(&self.api_secret, &all, self.timestamp_ms())?
        } else {
            signer::encode_query(params)
        };

        let url = if query.is_empty() {
            format!("{}{path}", self.base_url)
        } else {
            format!("{}{path}?{query}", self.base_url)
        };

        tracing::debug!(
            method = %method,
            path = %path,
            params = %signer::redact(&query),
            "Binance request"
        );

        let mut request = self.client.request(method, &url);
        if signed {
            request = request.header("X-MBX-APIKEY", &self.api_key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| BinanceError::Network(e.to_string()))?;

        let status = response.status();
        let retry_after = response
            .headers()
            .get("Retry-After")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok());

        let body = response
            .text()
            .await
            .map_err(|e| BinanceError::Network(e.to_string()))?;

        if status.is_success() {
            return serde_json::from_str(&body).map_err(|e| BinanceError::JsonParse(e.to_string()));
        }

        tracing::debug!(status = status.as_u16(), body = %body, "Binance error response");

        let order_id = params
            .iter()
            .find(|(k, _)| *k == "orderId")
            .map(|(_, v)| v.as_str());

        Err(classify(status, retry_after, &body, order_id))
    }
}

/// Map a failed response onto an adapter error.
fn classify(
    status: StatusCode,
    retry_after: Option<u64>,
    body: &str,
    order_id: Option<&str>,
) -> BinanceError {
    match status.as_u16() {
        429 | 418 => {
            return BinanceError::RateLimited {
                retry_after_secs: retry_after,
            };
        }
        401 | 403 => return BinanceError::AuthenticationFailed(body.to_string()),
        _ => {}
    }

    match serde_json::from_str::<BinanceErrorResponse>(body) {
        Ok(err) => BinanceError::from_code(err.code, err.msg, order_id),
        Err(_) => BinanceError::Http {
            status: status.as_u16(),
            body: body.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_rate_limits() {
        assert_eq!(
            classify(StatusCode::TOO_MANY_REQUESTS, Some(7), "", None),
            BinanceError::RateLimited {
                retry_after_secs: Some(7)
            }
        );
        assert!(matches!(
            classify(StatusCode::IM_A_TEAPOT, None, "", None),
            BinanceError::RateLimited { .. }
        ));
    }

    #[test]
    fn classify_auth() {
        assert!(matches!(
            classify(StatusCode::UNAUTHORIZED, None, "", None),
            BinanceError::AuthenticationFailed(_)
        ));
    }

    #[test]
    fn classify_exchange_codes() {
        let body = r#"{"code":-2011,"msg":"Unknown order sent."}"#;
        assert_eq!(
            classify(StatusCode::BAD_REQUEST, None, body, Some("42")),
            BinanceError::OrderNotFound {
                order_id: "42".to_string()
            }
        );

        let body = r#"{"code":-1013,"msg":"Filter failure: PRICE_FILTER"}"#;
        assert_eq!(
            classify(StatusCode::BAD_REQUEST, None, body, None),
            BinanceError::Api {
                code: -1013,
                message: "Filter failure: PRICE_FILTER".to_string()
            }
        );
    }

    #[test]
    fn classify_unparseable_body() {
        assert_eq!(
            classify(StatusCode::BAD_GATEWAY, None, "<html>", None),
            BinanceError::Http {
                status: 502,
                body: "<html>".to_string()
            }
        );
    }

    #[test]
    fn missing_key_is_refused() {
        let config = BinanceConfig::new(
            "",
            "secret",
            super::super::config::BinanceEnvironment::Testnet,
        );
        assert_eq!(
            BinanceHttpClient::new(&config).unwrap_err(),
            BinanceError::MissingCredentials
        );
    }
}
