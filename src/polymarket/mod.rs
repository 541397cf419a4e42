pub mod auth;
pub mod balance;
pub mod clob_client;
pub mod data_client;
pub mod trading;
pub mod types;
pub mod wallet;

pub use auth::PolymarketAuth;
pub use balance::BalanceChecker;
pub use clob_client::ClobClient;
pub use data_client::DataClient;
pub use trading::OrderSigner;
pub use types::{ApiOrderBook, ApiOrderBookLevel, ApiPosition, OrderSubmitOutcome};
pub use wallet::PolymarketWallet;
