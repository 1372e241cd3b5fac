//! Binance REST API request/response types.

use serde::Deserialize;

/// Response to `POST /api/v3/order` (ACK shape, extra fields ignored).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrderResponse {
    pub symbol: String,
    pub order_id: i64,
    pub client_order_id: String,
    #[serde(default)]
    pub transact_time: Option<i64>,
    #[serde(default)]
    pub status: Option<String>,
}

/// Response to `DELETE /api/v3/order`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelOrderResponse {
    pub symbol: String,
    pub order_id: i64,
    #[serde(default)]
    pub status: Option<String>,
}

/// Response to `GET /api/v3/order` (extra fields ignored).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryOrderResponse {
    pub symbol: String,
    pub order_id: i64,
    pub client_order_id: String,
    pub status: String,
}

impl QueryOrderResponse {
    /// Whether the order still rests on the book.
    pub fn is_open(&self) -> bool {
        matches!(
            self.status.as_str(),
            "NEW" | "PARTIALLY_FILLED" | "PENDING_NEW"
        )
    }
}

/// Response to `GET /api/v3/time`.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerTimeResponse {
    pub server_time: i64,
}

/// Exchange error body, `{"code": -2011, "msg": "Unknown order sent."}`.
#[derive(Debug, Clone, Deserialize)]
pub struct BinanceErrorResponse {
    pub code: i64,
    pub msg: String,
}
