use reqwest::Client;
use thiserror::Error;

use super::types::ApiPosition;

const DATA_API_BASE: &str = "https://data-api.polymarket.com";

#[derive(Debug, Error)]
pub enum DataClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected response: {0}")]
    Unexpected(String),
}

/// Read-only client for the Polymarket Data API.
#[derive(Debug, Clone)]
pub struct DataClient {
    http: Client,
    base_url: String,
}

impl DataClient {
    pub fn new(http: Client) -> Self {
        Self {
            http,
            base_url: DATA_API_BASE.into(),
        }
    }

    #[cfg(test)]
    pub fn with_base_url(http: Client, base_url: String) -> Self {
        Self { http, base_url }
    }

    /// Fetch all open positions for a wallet address.
    pub async fn get_positions(&self, address: &str) -> Result<Vec<ApiPosition>, DataClientError> {
        let url = format!("{}/positions", self.base_url);
        let resp = self
            .http
            .get(&url)
            .query(&[("user", address)])
            .send()
            .await?
            .error_for_status()?;

        let positions: Vec<ApiPosition> = resp.json().await?;
        Ok(positions)
    }

    /// Fetch the follower's position in a single token, if any.
    pub async fn get_position(
        &self,
        address: &str,
        asset_id: &str,
    ) -> Result<Option<ApiPosition>, DataClientError> {
        let positions = self.get_positions(address).await?;
        Ok(positions.into_iter().find(|p| p.asset == asset_id))
    }
}
