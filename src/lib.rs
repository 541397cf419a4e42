pub mod chain;
pub mod config;
pub mod db;
pub mod execution;
pub mod models;
pub mod polymarket;
pub mod services;
