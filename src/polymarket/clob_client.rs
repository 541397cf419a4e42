use reqwest::{Client, RequestBuilder};
use serde_json::Value;
use thiserror::Error;

use super::auth::PolymarketAuth;
use super::types::{ApiOrderBook, OrderSubmitOutcome};

const CLOB_API_BASE: &str = "https://clob.polymarket.com";

/// Order type for submission. FAK (fill-and-kill) is Polymarket's
/// immediate-or-cancel: fill whatever crosses, cancel the rest.
pub const ORDER_TYPE_FAK: &str = "FAK";

#[derive(Debug, Error)]
pub enum ClobClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("authentication error: {0}")]
    Auth(#[from] super::auth::AuthError),

    #[error("unexpected response: {0}")]
    Unexpected(String),
}

/// Authenticated client for the Polymarket CLOB API: order-book reads and
/// order submission.
#[derive(Debug, Clone)]
pub struct ClobClient {
    http: Client,
    auth: PolymarketAuth,
    base_url: String,
}

impl ClobClient {
    pub fn new(http: Client, auth: PolymarketAuth) -> Self {
        Self {
            http,
            auth,
            base_url: CLOB_API_BASE.into(),
        }
    }

    /// Build an authenticated GET request with HMAC signature headers.
    fn authenticated_get(&self, path: &str) -> Result<RequestBuilder, ClobClientError> {
        let timestamp = chrono::Utc::now().timestamp().to_string();
        let signature = self.auth.sign(&timestamp, "GET", path, "")?;

        let url = format!("{}{}", self.base_url, path);
        let req = self
            .http
            .get(&url)
            .header("POLY-API-KEY", &self.auth.api_key)
            .header("POLY-SIGNATURE", signature)
            .header("POLY-TIMESTAMP", &timestamp)
            .header("POLY-PASSPHRASE", &self.auth.passphrase);

        Ok(req)
    }

    /// Build an authenticated POST request; the body is part of the signature.
    fn authenticated_post(&self, path: &str, body: &str) -> Result<RequestBuilder, ClobClientError> {
        let timestamp = chrono::Utc::now().timestamp().to_string();
        let signature = self.auth.sign(&timestamp, "POST", path, body)?;

        let url = format!("{}{}", self.base_url, path);
        let req = self
            .http
            .post(&url)
            .header("POLY-API-KEY", &self.auth.api_key)
            .header("POLY-SIGNATURE", signature)
            .header("POLY-TIMESTAMP", &timestamp)
            .header("POLY-PASSPHRASE", &self.auth.passphrase)
            .header("Content-Type", "application/json")
            .body(body.to_string());

        Ok(req)
    }

    /// Fetch the current order book for a token. Fetched fresh per execution
    /// attempt and discarded after use.
    pub async fn get_order_book(&self, token_id: &str) -> Result<ApiOrderBook, ClobClientError> {
        let path = format!("/book?token_id={token_id}");
        let resp = self
            .authenticated_get(&path)?
            .send()
            .await?
            .error_for_status()?;

        let book: ApiOrderBook = resp.json().await?;
        Ok(book)
    }

    /// Submit a signed order immediate-or-cancel.
    ///
    /// A non-2xx status or a `success: false` body are both reported through
    /// [`OrderSubmitOutcome`] with the raw error payload attached, so the
    /// executor can classify the failure.
    pub async fn post_order(
        &self,
        signed_order: &Value,
        order_type: &str,
    ) -> Result<OrderSubmitOutcome, ClobClientError> {
        let body = serde_json::json!({
            "order": signed_order,
            "owner": self.auth.api_key,
            "orderType": order_type,
        })
        .to_string();

        let resp = self.authenticated_post("/order", &body)?.send().await?;
        let status = resp.status();
        let payload: Value = resp
            .json()
            .await
            .unwrap_or_else(|_| Value::String(format!("HTTP {status}")));

        let success = status.is_success()
            && payload
                .get("success")
                .and_then(Value::as_bool)
                .unwrap_or(status.is_success());

        if success {
            let order_id = payload
                .get("orderID")
                .or_else(|| payload.get("orderId"))
                .and_then(Value::as_str)
                .map(str::to_string);
            Ok(OrderSubmitOutcome {
                success: true,
                order_id,
                error: None,
            })
        } else {
            Ok(OrderSubmitOutcome {
                success: false,
                order_id: None,
                error: Some(payload),
            })
        }
    }
}

// ---------------------------------------------------------------------------
// Error payload handling
// ---------------------------------------------------------------------------

/// Extract a best-effort message from a CLOB error payload.
///
/// The API returns several shapes; each is tried in order:
/// 1. bare string
/// 2. nested object under `error` with `error` / `message` fields
/// 3. flat `errorMsg` / `error` / `message` fields
pub fn extract_error_message(payload: &Value) -> Option<String> {
    if let Some(s) = payload.as_str() {
        return Some(s.to_string());
    }

    if let Some(inner) = payload.get("error").filter(|v| v.is_object()) {
        if let Some(s) = inner
            .get("error")
            .or_else(|| inner.get("message"))
            .and_then(Value::as_str)
        {
            return Some(s.to_string());
        }
    }

    for key in ["errorMsg", "error", "message"] {
        if let Some(s) = payload.get(key).and_then(Value::as_str) {
            return Some(s.to_string());
        }
    }

    None
}

/// True when a submission failure means the wallet cannot fund any further
/// attempt: retrying would only repeat the same rejection.
pub fn is_terminal_fund_error(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("not enough balance") || lower.contains("allowance")
}
