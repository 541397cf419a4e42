use std::str::FromStr;

use alloy::signers::local::PrivateKeySigner;
use polymarket_client_sdk::auth::Signer;
use polymarket_client_sdk::clob::client::{Client, Config};
use polymarket_client_sdk::POLYGON;
use tracing::instrument::WithSubscriber;
use tracing::Level;

/// Wraps the authenticated Polymarket SDK client and signer.
///
/// The private key is used once during construction and never stored as a
/// string.
pub struct PolymarketWallet {
    signer: PrivateKeySigner,
    client: Client<
        polymarket_client_sdk::auth::state::Authenticated<polymarket_client_sdk::auth::Normal>,
    >,
}

impl PolymarketWallet {
    /// Create a new wallet from a hex-encoded private key (with or without
    /// a `0x` prefix).
    ///
    /// This authenticates against the CLOB API, deriving or creating an API
    /// key as needed. Credential derivation is chatty at INFO, so the call
    /// runs under a locally scoped WARN-level subscriber rather than touching
    /// the global one.
    pub async fn new(private_key: &str) -> anyhow::Result<Self> {
        let signer = PrivateKeySigner::from_str(private_key)?.with_chain_id(Some(POLYGON));

        let config = Config::default();
        let unauthenticated = Client::new("https://clob.polymarket.com", config)?;

        let quiet = tracing_subscriber::fmt()
            .with_max_level(Level::WARN)
            .finish();

        let client = unauthenticated
            .authentication_builder(&signer)
            .authenticate()
            .with_subscriber(quiet)
            .await?;

        Ok(Self { signer, client })
    }

    /// Return the wallet's Ethereum address as a checksummed hex string.
    pub fn wallet_address(&self) -> String {
        format!("{}", self.client.address())
    }

    /// Borrow the authenticated SDK client.
    pub fn client(
        &self,
    ) -> &Client<
        polymarket_client_sdk::auth::state::Authenticated<polymarket_client_sdk::auth::Normal>,
    > {
        &self.client
    }

    /// Borrow the local signer (needed for order signing).
    pub fn signer(&self) -> &PrivateKeySigner {
        &self.signer
    }
}
