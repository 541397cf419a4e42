use std::sync::Arc;

use polymarket_client_sdk::clob::types::Side as SdkSide;
use polymarket_client_sdk::types::U256;
use rust_decimal::Decimal;
use serde_json::Value;

use crate::models::Side;

use super::wallet::PolymarketWallet;

/// Builds and EIP-712-signs CLOB orders via the Polymarket SDK.
///
/// Submission goes through [`super::ClobClient::post_order`] instead of the
/// SDK so the raw response payload stays visible for error classification.
pub struct OrderSigner {
    wallet: Arc<PolymarketWallet>,
}

impl OrderSigner {
    pub fn new(wallet: Arc<PolymarketWallet>) -> Self {
        Self { wallet }
    }

    /// Build and sign a limit order, returning its wire representation.
    ///
    /// * `token_id` — CTF token ID (decimal string from asset_id).
    /// * `size` — number of shares.
    /// * `price` — price per share (0..1).
    pub async fn build_signed_order(
        &self,
        token_id: &str,
        side: Side,
        size: Decimal,
        price: Decimal,
    ) -> anyhow::Result<Value> {
        let sdk_side = match side {
            Side::Buy => SdkSide::Buy,
            Side::Sell => SdkSide::Sell,
        };

        let token_id_u256 = U256::from_str_radix(token_id, 10).or_else(|_| {
            // Try hex if decimal parse fails
            token_id
                .strip_prefix("0x")
                .map(|hex| U256::from_str_radix(hex, 16))
                .unwrap_or_else(|| U256::from_str_radix(token_id, 16))
        })?;

        let client = self.wallet.client();
        let signer = self.wallet.signer();

        let signable_order = client
            .limit_order()
            .token_id(token_id_u256)
            .side(sdk_side)
            .price(price)
            .size(size)
            .build()
            .await?;

        let signed_order = client.sign(signer, signable_order).await?;

        Ok(serde_json::to_value(&signed_order)?)
    }
}
