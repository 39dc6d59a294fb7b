//! Dashboard aggregation over a portfolio snapshot.

use crate::month::Month;
use crate::types::{Fund, Portfolio};
use serde::{Deserialize, Serialize};

/// Derived metrics for a single fund.
///
/// Ratios that need a position are `None` when no cotas are held.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FundSummary {
    /// Fund ticker
    pub ticker: String,
    /// Fund name
    pub name: String,
    /// Fund sector
    pub sector: String,
    /// Total cotas held
    pub total_cotas: f64,
    /// Capital spent buying cotas
    pub invested: f64,
    /// Average price per cota
    pub average_price: Option<f64>,
    /// Dividend per cota of the latest month
    pub last_dividend: Option<f64>,
    /// Annualized dividend yield as a fraction (0.12 = 12% a year)
    pub current_yield: Option<f64>,
    /// Sum of dividends received
    pub total_dividends_received: f64,
    /// Income at the current position and latest payout rate
    pub monthly_income: f64,
    /// Number of recorded months
    pub entry_count: usize,
    /// Latest recorded month
    pub last_month: Option<Month>,
}

/// Portfolio-wide dashboard metrics.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PortfolioSummary {
    /// Sum of `last_dividend * total_cotas` over funds
    pub monthly_income: f64,
    /// Mean yield over funds with a position, `None` when no fund has one
    pub average_dy: Option<f64>,
    /// Sum of dividends received over funds
    pub total_dividends_received: f64,
    /// Capital spent over funds
    pub total_invested: f64,
    /// Cotas held over funds
    pub total_cotas: f64,
    /// Number of funds
    pub fund_count: usize,
    /// Per-fund breakdown, sorted by ticker
    pub funds: Vec<FundSummary>,
}

/// Summarize a single fund.
pub fn summarize_fund(fund: &Fund) -> FundSummary {
    let total_cotas = fund.total_cotas();
    let last_dividend = fund.last_dividend();

    FundSummary {
        ticker: fund.ticker().to_string(),
        name: fund.name.clone(),
        sector: fund.sector.clone(),
        total_cotas,
        invested: fund.total_invested(),
        average_price: fund.average_price().ok(),
        last_dividend,
        current_yield: fund.current_yield().ok(),
        total_dividends_received: fund.total_dividends_received(),
        monthly_income: last_dividend.unwrap_or(0.0) * total_cotas,
        entry_count: fund.entries().len(),
        last_month: fund.last_entry().map(|e| e.month),
    }
}

/// Summarize the whole portfolio.
pub fn summarize_portfolio(portfolio: &Portfolio) -> PortfolioSummary {
    let funds: Vec<FundSummary> = portfolio.funds().iter().map(summarize_fund).collect();

    let yields: Vec<f64> = funds.iter().filter_map(|f| f.current_yield).collect();
    let average_dy = if yields.is_empty() {
        None
    } else {
        Some(yields.iter().sum::<f64>() / yields.len() as f64)
    };

    PortfolioSummary {
        monthly_income: funds.iter().map(|f| f.monthly_income).sum(),
        average_dy,
        total_dividends_received: funds.iter().map(|f| f.total_dividends_received).sum(),
        total_invested: funds.iter().map(|f| f.invested).sum(),
        total_cotas: funds.iter().map(|f| f.total_cotas).sum(),
        fund_count: funds.len(),
        funds,
    }
}
