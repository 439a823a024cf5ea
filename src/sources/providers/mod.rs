// src/sources/providers/mod.rs
pub mod census;
pub mod commodity;
pub mod fx;
pub mod news;

pub use census::CensusTradeAdapter;
pub use commodity::CommodityPriceAdapter;
pub use fx::ExchangeRateAdapter;
pub use news::TradeNewsAdapter;
