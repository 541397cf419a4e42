use reqwest::Client;
use rust_decimal::Decimal;

/// Queries the follower wallet's USDC and CTF token balances via the public
/// CLOB endpoints. Balances are never cached; every pre-flight check
/// re-fetches.
#[derive(Debug, Clone)]
pub struct BalanceChecker {
    http: Client,
    address: String,
}

impl BalanceChecker {
    pub fn new(http: Client, address: String) -> Self {
        Self { http, address }
    }

    /// Return the wallet address.
    pub fn wallet_address(&self) -> &str {
        &self.address
    }

    /// Available USDC balance for the follower wallet.
    pub async fn get_usdc_balance(&self) -> anyhow::Result<Decimal> {
        let url = format!(
            "https://clob.polymarket.com/balance?address={}",
            self.address
        );

        let resp: serde_json::Value = self.http.get(&url).send().await?.json().await?;

        // The response may vary; try common field names
        let balance = resp
            .get("balance")
            .or_else(|| resp.get("available"))
            .and_then(parse_decimal_field)
            .unwrap_or(Decimal::ZERO);

        Ok(balance)
    }

    /// Balance of a specific CTF token, in tokens.
    pub async fn get_token_balance(&self, token_id: &str) -> anyhow::Result<Decimal> {
        let url = format!(
            "https://clob.polymarket.com/positions?address={}&asset_id={}",
            self.address, token_id
        );

        let resp: serde_json::Value = self.http.get(&url).send().await?.json().await?;

        let balance = resp
            .get("size")
            .or_else(|| {
                resp.as_array()
                    .and_then(|arr| arr.first())
                    .and_then(|p| p.get("size"))
            })
            .and_then(parse_decimal_field)
            .unwrap_or(Decimal::ZERO);

        Ok(balance)
    }
}

fn parse_decimal_field(v: &serde_json::Value) -> Option<Decimal> {
    v.as_str()
        .and_then(|s| s.parse::<Decimal>().ok())
        .or_else(|| v.as_f64().and_then(|f| Decimal::try_from(f).ok()))
}
