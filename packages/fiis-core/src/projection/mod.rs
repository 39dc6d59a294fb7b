//! Forward projections of monthly dividend income.
//!
//! - **Contribution projection**: a fixed amount of money invested every month
//!   at an assumed price, earning an assumed dividend per cota
//! - **Portfolio projection**: one contribution plan per fund, summed by month
//! - **Reinvestment projection**: a fixed number of cotas bought every month,
//!   with dividends reinvested into whole cotas

mod contribution;
mod reinvest;

pub use contribution::{project_fund, project_portfolio, PortfolioProjection, Projection};
pub use reinvest::{project_with_reinvestment, ReinvestmentPoint};

use crate::month::Month;
use crate::types::Fund;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Assumptions for projecting one fund.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContributionPlan {
    /// Money invested each month
    pub monthly_contribution: f64,
    /// Assumed price paid per cota
    pub price_per_cota: f64,
    /// Assumed dividend per cota each month
    pub dividend_per_cota: f64,
}

impl ContributionPlan {
    pub fn new(monthly_contribution: f64, price_per_cota: f64, dividend_per_cota: f64) -> Self {
        Self {
            monthly_contribution,
            price_per_cota,
            dividend_per_cota,
        }
    }

    /// Derive a plan from a fund's history.
    ///
    /// Buys `monthly_cotas` per month at the fund's average price and assumes the
    /// average of its recent payouts (see [`Fund::average_dividend_per_cota`]).
    /// Fails with [`Error::NoPosition`] when the fund holds no cotas.
    pub fn from_history(fund: &Fund, monthly_cotas: f64, window: Option<usize>) -> Result<Self> {
        if !monthly_cotas.is_finite() || monthly_cotas < 0.0 {
            return Err(Error::InvalidInput(format!(
                "monthly cotas must be a non-negative number, got {}",
                monthly_cotas
            )));
        }
        let price = fund.average_price()?;
        Ok(Self::new(
            monthly_cotas * price,
            price,
            fund.average_dividend_per_cota(window),
        ))
    }

    /// Cotas bought each month.
    pub fn monthly_cotas(&self) -> f64 {
        self.monthly_contribution / self.price_per_cota
    }

    pub(crate) fn validate(&self, ticker: &str) -> Result<()> {
        if !self.price_per_cota.is_finite() || self.price_per_cota <= 0.0 {
            return Err(Error::InvalidInput(format!(
                "assumed price per cota for {} must be positive, got {}",
                ticker, self.price_per_cota
            )));
        }
        if !self.monthly_contribution.is_finite() || self.monthly_contribution < 0.0 {
            return Err(Error::InvalidInput(format!(
                "monthly contribution for {} must be a non-negative number, got {}",
                ticker, self.monthly_contribution
            )));
        }
        if !self.dividend_per_cota.is_finite() || self.dividend_per_cota < 0.0 {
            return Err(Error::InvalidInput(format!(
                "assumed dividend per cota for {} must be a non-negative number, got {}",
                ticker, self.dividend_per_cota
            )));
        }
        Ok(())
    }
}

/// One month of a projection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProjectionPoint {
    /// 1-based month number within the projection
    pub month_index: usize,
    /// Calendar month, counted from the latest recorded month
    #[serde(skip_serializing_if = "Option::is_none")]
    pub month: Option<Month>,
    /// Cotas held after this month's purchase
    pub cumulative_cotas: f64,
    /// Income paid this month
    pub projected_income: f64,
    /// Income paid from month 1 through this month
    pub cumulative_income: f64,
}

fn validate_months(months: usize) -> Result<()> {
    if months == 0 {
        return Err(Error::InvalidInput(
            "projection needs at least one month".to_string(),
        ));
    }
    Ok(())
}
