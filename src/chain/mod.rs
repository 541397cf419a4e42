use alloy::network::EthereumWallet;
use alloy::primitives::{Address, B256, U256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::signers::local::PrivateKeySigner;
use alloy::sol;
use thiserror::Error;
use tracing::{info, warn};

/// Gnosis ConditionalTokens contract on Polygon.
pub const CONDITIONAL_TOKENS: &str = "0x4d97dcd97ec945f40cf65f87097ace5ea0476045";

/// USDC (bridged) on Polygon — the collateral token behind Polymarket markets.
pub const USDC_POLYGON: &str = "0x2791bca1f2de4661ed88a30c99a7a9449aa84174";

sol! {
    #[sol(rpc)]
    contract ConditionalTokens {
        function redeemPositions(
            address collateralToken,
            bytes32 parentCollectionId,
            bytes32 conditionId,
            uint256[] indexSets
        ) external;
    }
}

#[derive(Debug, Error)]
pub enum ChainClientError {
    #[error("invalid condition id {0}")]
    BadConditionId(String),

    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("redemption reverted in tx {tx_hash}")]
    Reverted { tx_hash: String },
}

/// Submits ConditionalTokens redemptions for settled markets.
///
/// Redemption settles every outcome of a condition atomically, so one call
/// per condition id covers both binary outcome rows.
pub struct CtfRedeemer {
    provider: DynProvider,
    contract: Address,
    collateral: Address,
}

impl CtfRedeemer {
    pub fn new(rpc_url: &str, signer: PrivateKeySigner) -> anyhow::Result<Self> {
        let wallet = EthereumWallet::from(signer);
        let provider = ProviderBuilder::new()
            .wallet(wallet)
            .connect_http(rpc_url.parse()?)
            .erased();

        Ok(Self {
            provider,
            contract: CONDITIONAL_TOKENS.parse()?,
            collateral: USDC_POLYGON.parse()?,
        })
    }

    /// Redeem both outcomes of a condition and wait for the receipt.
    ///
    /// Gas price is the node's current estimate scaled by 1.2x to improve
    /// inclusion odds. A reverted transaction is an error; the caller leaves
    /// the position for the next scan.
    pub async fn redeem(&self, condition_id: &str) -> Result<String, ChainClientError> {
        let condition: B256 = condition_id
            .parse()
            .map_err(|_| ChainClientError::BadConditionId(condition_id.to_string()))?;

        let gas_price = self
            .provider
            .get_gas_price()
            .await
            .map_err(|e| ChainClientError::Rpc(e.to_string()))?;
        let boosted = gas_price.saturating_mul(12) / 10;

        info!(
            condition_id,
            gas_price = boosted,
            "Submitting redeemPositions"
        );

        let contract = ConditionalTokens::new(self.contract, self.provider.clone());
        let pending = contract
            .redeemPositions(
                self.collateral,
                B256::ZERO,
                condition,
                // Index sets [1, 2] cover both binary outcomes.
                vec![U256::from(1u8), U256::from(2u8)],
            )
            .gas_price(boosted)
            .send()
            .await
            .map_err(|e| ChainClientError::Rpc(e.to_string()))?;

        let receipt = pending
            .get_receipt()
            .await
            .map_err(|e| ChainClientError::Rpc(e.to_string()))?;

        let tx_hash = format!("{:#x}", receipt.transaction_hash);

        if !receipt.status() {
            warn!(condition_id, %tx_hash, "Redemption reverted");
            return Err(ChainClientError::Reverted { tx_hash });
        }

        info!(condition_id, %tx_hash, "Redemption confirmed");
        Ok(tx_hash)
    }
}
