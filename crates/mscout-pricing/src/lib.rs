//! Profit and pricing engine: shipping rate tables, JPY→KRW conversion,
//! and the forward/inverse profit calculations.

mod error;
mod exchange;
mod profit;
mod rate_store;
mod rates;

pub use error::PricingError;
pub use exchange::{ExchangeRateCache, ExchangeRateClient};
pub use profit::{calculate, recommend_price, ProfitBreakdown, ProfitInput, Recommendation};
pub use rate_store::RateStore;
pub use rates::{default_rate_book, RateBook, RateSchedule};
