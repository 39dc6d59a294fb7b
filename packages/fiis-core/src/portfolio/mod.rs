//! Portfolio management module.
//!
//! Provides fund tracking with JSON persistence and dashboard aggregation.

mod summary;
mod tracker;

pub use summary::{summarize_fund, summarize_portfolio, FundSummary, PortfolioSummary};
pub use tracker::FundsTracker;

pub(crate) use tracker::round_cents;
