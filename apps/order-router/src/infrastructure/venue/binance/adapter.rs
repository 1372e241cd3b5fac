//! Binance venue adapter implementing VenuePort.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::application::ports::{CancelOrderRequest, PlaceOrderRequest, VenueError, VenuePort};
use crate::domain::shared::{ClientOrderId, VenueOrderId};

use super::api_types::{
    CancelOrderResponse, NewOrderResponse, QueryOrderResponse, ServerTimeResponse,
};
use super::config::{BinanceConfig, BinanceEnvironment, TimeInForce};
use super::error::BinanceError;
use super::http_client::BinanceHttpClient;

const ORDER_PATH: &str = "/api/v3/order";

/// Binance Spot venue adapter.
#[derive(Debug, Clone)]
pub struct BinanceVenueAdapter {
    client: BinanceHttpClient,
    environment: BinanceEnvironment,
    time_in_force: TimeInForce,
}

impl BinanceVenueAdapter {
    /// Create a new Binance adapter.
    pub fn new(config: BinanceConfig) -> Result<Self, BinanceError> {
        let client = BinanceHttpClient::new(&config)?;
        Ok(Self {
            client,
            environment: config.environment,
            time_in_force: config.time_in_force,
        })
    }

    /// Target environment.
    #[must_use]
    pub const fn environment(&self) -> BinanceEnvironment {
        self.environment
    }

    /// Offset of the venue clock observed by the last `server_time` call.
    #[must_use]
    pub fn clock_skew_ms(&self) -> i64 {
        self.client.time_offset_ms()
    }

    fn place_params(&self, request: &PlaceOrderRequest) -> Vec<(&'static str, String)> {
        vec![
            ("symbol", request.symbol.clone()),
            ("side", request.side.as_venue_str().to_string()),
            ("type", "LIMIT".to_string()),
            ("timeInForce", self.time_in_force.as_str().to_string()),
            ("quantity", request.quantity.normalize().to_string()),
            ("price", request.price.normalize().to_string()),
            ("newClientOrderId", request.client_order_id.as_str().to_string()),
        ]
    }
}

#[async_trait]
impl VenuePort for BinanceVenueAdapter {
    fn name(&self) -> &'static str {
        "binance"
    }

    async fn place_order(&self, request: PlaceOrderRequest) -> Result<VenueOrderId, VenueError> {
        tracing::info!(
            symbol = %request.symbol,
            side = %request.side,
            quantity = %request.quantity,
            price = %request.price,
            client_order_id = %request.client_order_id,
            "Placing order"
        );

        let params = self.place_params(&request);
        let response: NewOrderResponse = self
            .client
            .post_signed(ORDER_PATH, &params)
            .await
            .map_err(VenueError::from)?;

        tracing::info!(
            symbol = %response.symbol,
            venue_order_id = response.order_id,
            client_order_id = %response.client_order_id,
            status = response.status.as_deref().unwrap_or("-"),
            transact_time = response.transact_time,
            "Order placed"
        );

        Ok(VenueOrderId::new(response.order_id))
    }

    async fn cancel_order(&self, request: CancelOrderRequest) -> Result<(), VenueError> {
        tracing::info!(
            symbol = %request.symbol,
            venue_order_id = %request.venue_order_id,
            "Cancelling order"
        );

        let params = [
            ("symbol", request.symbol.clone()),
            ("orderId", request.venue_order_id.to_string()),
        ];
        let response: CancelOrderResponse = self
            .client
            .delete_signed(ORDER_PATH, &params)
            .await
            .map_err(VenueError::from)?;

        tracing::info!(
            symbol = %response.symbol,
            venue_order_id = response.order_id,
            status = response.status.as_deref().unwrap_or("-"),
            "Order cancelled"
        );

        Ok(())
    }

    async fn find_open_order(
        &self,
        symbol: &str,
        client_order_id: &ClientOrderId,
    ) -> Result<Option<VenueOrderId>, VenueError> {
        let params = [
            ("symbol", symbol.to_string()),
            ("origClientOrderId", client_order_id.as_str().to_string()),
        ];
        let response: QueryOrderResponse = match self.client.get_signed(ORDER_PATH, &params).await {
            Ok(response) => response,
            Err(BinanceError::OrderNotFound { .. }) => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        tracing::debug!(
            symbol = %response.symbol,
            venue_order_id = response.order_id,
            client_order_id = %response.client_order_id,
            status = %response.status,
            "Order looked up"
        );

        Ok(response
            .is_open()
            .then(|| VenueOrderId::new(response.order_id)))
    }

    async fn ping(&self) -> Result<(), VenueError> {
        let _: serde_json::Value = self
            .client
            .get_public("/api/v3/ping")
            .await
            .map_err(VenueError::from)?;
        Ok(())
    }

    async fn server_time(&self) -> Result<DateTime<Utc>, VenueError> {
        let response: ServerTimeResponse = self
            .client
            .get_public("/api/v3/time")
            .await
            .map_err(VenueError::from)?;

        let offset = response.server_time - Utc::now().timestamp_millis();
        self.client.set_time_offset(offset);

        DateTime::from_timestamp_millis(response.server_time).ok_or_else(|| VenueError::Unknown {
            message: format!("invalid server time: {}", response.server_time),
        })
    }
}
