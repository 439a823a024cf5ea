// src/scoring/mod.rs
pub mod arbitrage;
pub mod entity;

pub use arbitrage::{ArbitrageOpportunity, MarginOutcome, PriceQuote};
pub use entity::{BuyerProfile, EntityScore, Rubric, SupplierProfile};
