//! FIIs Core - Dividend tracking and income projection for Brazilian real-estate funds.
//!
//! This crate provides the engine behind the FIIs tracker:
//!
//! - **Data model**: funds (FIIs) with one validated entry per calendar month
//! - **Aggregation**: position size, invested capital, average price, dividend yield
//! - **Projection**: forward monthly income under a contribution plan
//! - **Persistence**: the `{"fiis": [...]}` JSON document and its mutation path
//!
//! # Example
//!
//! ```rust
//! use fiis_core::{project_fund, summarize_fund, ContributionPlan, Entry, Fund, Month};
//!
//! let mut fund = Fund::new("knri11", "Kinea Renda", "Logistica");
//! let january: Month = "2024-01".parse().unwrap();
//! fund.add_entry(Entry::new(january, 10.0, 100.0, 1.0).unwrap()).unwrap();
//!
//! let summary = summarize_fund(&fund);
//! assert_eq!(summary.total_cotas, 10.0);
//!
//! let plan = ContributionPlan::new(200.0, 100.0, 1.2);
//! let points: Vec<_> = project_fund(&fund, 3, &plan).unwrap().collect();
//! assert_eq!(points.len(), 3);
//! ```

pub mod config;
pub mod month;
pub mod portfolio;
pub mod projection;
pub mod types;

// Re-export commonly used types
pub use config::Config;
pub use month::Month;
pub use types::{ApiResponse, Entry, Fund, Portfolio};

// Re-export main functionality
pub use portfolio::{summarize_fund, summarize_portfolio, FundSummary, FundsTracker, PortfolioSummary};
pub use projection::{
    project_fund, project_portfolio, project_with_reinvestment, ContributionPlan,
    PortfolioProjection, Projection, ProjectionPoint, ReinvestmentPoint,
};

/// Error types for fiis-core operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("No position held in {0}")]
    NoPosition(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Month {month} already registered for {ticker}")]
    DuplicateMonth { ticker: String, month: Month },

    #[error("Fund already registered: {0}")]
    DuplicateTicker(String),

    #[error("Fund not found: {0}")]
    FundNotFound(String),

    #[error("Month {month} not found for {ticker}")]
    MonthNotFound { ticker: String, month: Month },

    #[error("Invalid month '{0}', expected YYYY-MM")]
    InvalidMonth(String),

    #[error("Invalid entry: {0}")]
    InvalidEntry(String),
}

/// Result type for fiis-core operations.
pub type Result<T> = std::result::Result<T, Error>;
