//! Contribution-based income projection for a fund or a whole portfolio.

use super::{validate_months, ContributionPlan, ProjectionPoint};
use crate::month::Month;
use crate::types::{normalize_ticker, Fund, Portfolio};
use crate::{Error, Result};
use std::collections::HashMap;
use std::iter::FusedIterator;

/// Lazy month-by-month projection of a single fund.
///
/// Cloning yields an independent copy that replays the remaining months.
#[derive(Debug, Clone)]
pub struct Projection {
    months: usize,
    step: usize,
    start_month: Option<Month>,
    cotas: f64,
    new_cotas: f64,
    dividend_per_cota: f64,
    cumulative_income: f64,
}

impl Projection {
    fn new(
        starting_cotas: f64,
        new_cotas: f64,
        dividend_per_cota: f64,
        months: usize,
        start_month: Option<Month>,
    ) -> Self {
        Self {
            months,
            step: 0,
            start_month,
            cotas: starting_cotas,
            new_cotas,
            dividend_per_cota,
            cumulative_income: 0.0,
        }
    }

    /// Total number of months projected.
    pub fn months(&self) -> usize {
        self.months
    }
}

impl Iterator for Projection {
    type Item = ProjectionPoint;

    fn next(&mut self) -> Option<ProjectionPoint> {
        if self.step >= self.months {
            return None;
        }
        self.step += 1;

        self.cotas += self.new_cotas;
        let projected_income = self.cotas * self.dividend_per_cota;
        self.cumulative_income += projected_income;

        Some(ProjectionPoint {
            month_index: self.step,
            month: self.start_month.and_then(|m| m.offset(self.step)),
            cumulative_cotas: self.cotas,
            projected_income,
            cumulative_income: self.cumulative_income,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.months - self.step;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Projection {}

impl FusedIterator for Projection {}

/// Project a fund's monthly income under a contribution plan.
///
/// Each month buys `monthly_contribution / price_per_cota` cotas on top of the
/// fund's current position and earns `dividend_per_cota` on every cota held.
///
/// # Arguments
///
/// * `fund` - Fund whose current position is the starting point
/// * `months` - Number of months to project (at least 1)
/// * `plan` - Contribution, price and dividend assumptions
///
/// # Returns
///
/// A lazy iterator of `months` points, or [`Error::InvalidInput`] for a zero
/// horizon or out-of-domain assumptions.
///
/// # Example
///
/// ```rust
/// use fiis_core::{project_fund, ContributionPlan, Entry, Fund};
///
/// let mut fund = Fund::new("HGLG11", "CSHG Logistica", "Logistica");
/// fund.add_entry(Entry::new("2024-01".parse().unwrap(), 10.0, 100.0, 1.0).unwrap()).unwrap();
///
/// let plan = ContributionPlan::new(100.0, 100.0, 1.0);
/// let last = project_fund(&fund, 12, &plan).unwrap().last().unwrap();
///
/// // One cota a month for a year
/// assert_eq!(last.cumulative_cotas, 22.0);
/// assert_eq!(last.month.unwrap().to_string(), "2025-01");
/// ```
pub fn project_fund(fund: &Fund, months: usize, plan: &ContributionPlan) -> Result<Projection> {
    validate_months(months)?;
    plan.validate(fund.ticker())?;

    Ok(Projection::new(
        fund.total_cotas(),
        plan.monthly_cotas(),
        plan.dividend_per_cota,
        months,
        fund.last_entry().map(|e| e.month),
    ))
}

/// Lazy month-by-month projection of a whole portfolio.
///
/// Each point sums the per-fund points for the same month index.
#[derive(Debug, Clone)]
pub struct PortfolioProjection {
    months: usize,
    step: usize,
    start_month: Option<Month>,
    legs: Vec<(String, Projection)>,
}

impl PortfolioProjection {
    /// Total number of months projected.
    pub fn months(&self) -> usize {
        self.months
    }

    /// Remaining points of each fund's own projection, by ticker.
    pub fn per_fund(&self) -> Vec<(String, Vec<ProjectionPoint>)> {
        self.legs
            .iter()
            .map(|(ticker, leg)| (ticker.clone(), leg.clone().collect()))
            .collect()
    }
}

impl Iterator for PortfolioProjection {
    type Item = ProjectionPoint;

    fn next(&mut self) -> Option<ProjectionPoint> {
        if self.step >= self.months {
            return None;
        }
        self.step += 1;

        let mut point = ProjectionPoint {
            month_index: self.step,
            month: self.start_month.and_then(|m| m.offset(self.step)),
            cumulative_cotas: 0.0,
            projected_income: 0.0,
            cumulative_income: 0.0,
        };

        for (_, leg) in &mut self.legs {
            if let Some(leg_point) = leg.next() {
                point.cumulative_cotas += leg_point.cumulative_cotas;
                point.projected_income += leg_point.projected_income;
                point.cumulative_income += leg_point.cumulative_income;
            }
        }

        Some(point)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.months - self.step;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for PortfolioProjection {}

impl FusedIterator for PortfolioProjection {}

/// Project the whole portfolio's monthly income.
///
/// `plans` maps tickers (case insensitive) to contribution plans. Funds without
/// a plan keep their current position, earning their last known dividend per cota.
///
/// Fails with [`Error::InvalidInput`] for a zero horizon, an invalid plan, or a
/// plan for a ticker that is not in the portfolio.
pub fn project_portfolio(
    portfolio: &Portfolio,
    months: usize,
    plans: &HashMap<String, ContributionPlan>,
) -> Result<PortfolioProjection> {
    validate_months(months)?;

    let mut normalized: HashMap<String, &ContributionPlan> = HashMap::with_capacity(plans.len());
    for (ticker, plan) in plans {
        let ticker = normalize_ticker(ticker);
        if portfolio.fund(&ticker).is_none() {
            return Err(Error::InvalidInput(format!(
                "plan references unknown fund {}",
                ticker
            )));
        }
        plan.validate(&ticker)?;
        if normalized.insert(ticker.clone(), plan).is_some() {
            return Err(Error::InvalidInput(format!(
                "more than one plan for fund {}",
                ticker
            )));
        }
    }

    let legs = portfolio
        .funds()
        .iter()
        .map(|fund| {
            let (new_cotas, dividend_per_cota) = match normalized.get(fund.ticker()) {
                Some(plan) => (plan.monthly_cotas(), plan.dividend_per_cota),
                None => (0.0, fund.last_dividend().unwrap_or(0.0)),
            };
            let leg = Projection::new(fund.total_cotas(), new_cotas, dividend_per_cota, months, None);
            (fund.ticker().to_string(), leg)
        })
        .collect();

    Ok(PortfolioProjection {
        months,
        step: 0,
        start_month: portfolio.last_month(),
        legs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Entry;
    use approx::assert_relative_eq;

    fn month(value: &str) -> Month {
        value.parse().unwrap()
    }

    fn knri() -> Fund {
        let mut fund = Fund::new("KNRI11", "Kinea Renda Imobiliaria", "Hibrido");
        fund.add_entry(
            Entry::new(month("2024-01"), 10.0, 100.0, 1.0)
                .unwrap()
                .with_dividend_total(0.0),
        )
        .unwrap();
        fund.add_entry(
            Entry::new(month("2024-02"), 0.0, 0.0, 1.2)
                .unwrap()
                .with_dividend_total(12.0),
        )
        .unwrap();
        fund
    }

    fn hglg() -> Fund {
        let mut fund = Fund::new("HGLG11", "CSHG Logistica", "Logistica");
        fund.add_entry(Entry::new(month("2024-03"), 5.0, 160.0, 1.1).unwrap())
            .unwrap();
        fund
    }

    #[test]
    fn test_project_fund_scenario() {
        let plan = ContributionPlan::new(200.0, 100.0, 1.2);
        let points: Vec<ProjectionPoint> = project_fund(&knri(), 3, &plan).unwrap().collect();

        assert_eq!(points.len(), 3);
        let expected = [(12.0, 14.4, 14.4), (14.0, 16.8, 31.2), (16.0, 19.2, 50.4)];
        for (point, (cotas, income, cumulative)) in points.iter().zip(expected) {
            assert_relative_eq!(point.cumulative_cotas, cotas, epsilon = 1e-9);
            assert_relative_eq!(point.projected_income, income, epsilon = 1e-9);
            assert_relative_eq!(point.cumulative_income, cumulative, epsilon = 1e-9);
        }

        assert_eq!(points[0].month_index, 1);
        assert_eq!(points[0].month, Some(month("2024-03")));
        assert_eq!(points[2].month, Some(month("2024-05")));
    }

    #[test]
    fn test_project_fund_zero_months() {
        let plan = ContributionPlan::new(200.0, 100.0, 1.2);
        let result = project_fund(&knri(), 0, &plan);
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_project_fund_invalid_price() {
        for price in [0.0, -10.0, f64::NAN] {
            let plan = ContributionPlan::new(200.0, price, 1.2);
            let result = project_fund(&knri(), 3, &plan);
            assert!(matches!(result, Err(Error::InvalidInput(_))));
        }
    }

    #[test]
    fn test_project_fund_negative_contribution() {
        let plan = ContributionPlan::new(-1.0, 100.0, 1.2);
        assert!(matches!(
            project_fund(&knri(), 3, &plan),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_project_fund_invalid_dividend() {
        for dividend in [-1.0, f64::INFINITY, f64::NAN] {
            let plan = ContributionPlan::new(200.0, 100.0, dividend);
            assert!(matches!(
                project_fund(&knri(), 3, &plan),
                Err(Error::InvalidInput(_))
            ));
        }
    }

    #[test]
    fn test_project_fund_non_finite_contribution() {
        for contribution in [f64::NAN, f64::INFINITY] {
            let plan = ContributionPlan::new(contribution, 100.0, 1.2);
            assert!(matches!(
                project_fund(&knri(), 3, &plan),
                Err(Error::InvalidInput(_))
            ));
        }
    }

    #[test]
    fn test_long_projection_labels_stop_at_year_9999() {
        let plan = ContributionPlan::new(0.0, 100.0, 1.0);
        // 2024-02 plus 95710 months is 9999-12
        let mut projection = project_fund(&knri(), 100_000, &plan).unwrap();

        let last_labeled = projection.nth(95_709).unwrap();
        assert_eq!(last_labeled.month, Some(month("9999-12")));
        assert_eq!(projection.next().unwrap().month, None);

        let last = projection.last().unwrap();
        assert_eq!(last.month_index, 100_000);
        assert_eq!(last.month, None);

        let json = serde_json::to_string(&last).unwrap();
        let parsed: ProjectionPoint = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, last);
    }

    #[test]
    fn test_zero_contribution_keeps_position_flat() {
        let plan = ContributionPlan::new(0.0, 100.0, 1.2);
        let points: Vec<ProjectionPoint> = project_fund(&knri(), 6, &plan).unwrap().collect();

        assert_eq!(points.len(), 6);
        for (i, point) in points.iter().enumerate() {
            assert_eq!(point.cumulative_cotas, 10.0);
            assert_relative_eq!(point.projected_income, 12.0, epsilon = 1e-9);
            assert_relative_eq!(point.cumulative_income, 12.0 * (i + 1) as f64, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_projection_is_restartable() {
        let plan = ContributionPlan::new(200.0, 100.0, 1.2);
        let projection = project_fund(&knri(), 4, &plan).unwrap();
        assert_eq!(projection.len(), 4);

        let first: Vec<ProjectionPoint> = projection.clone().collect();
        let second: Vec<ProjectionPoint> = projection.collect();
        assert_eq!(first, second);

        let regenerated: Vec<ProjectionPoint> =
            project_fund(&knri(), 2, &plan).unwrap().collect();
        assert_eq!(&first[..2], &regenerated[..]);
    }

    #[test]
    fn test_project_empty_fund() {
        let fund = Fund::new("MXRF11", "Maxi Renda", "Papel");
        let plan = ContributionPlan::new(100.0, 10.0, 0.1);
        let points: Vec<ProjectionPoint> = project_fund(&fund, 2, &plan).unwrap().collect();

        assert_eq!(points[0].month, None);
        assert_eq!(points[1].cumulative_cotas, 20.0);
        assert_relative_eq!(points[1].projected_income, 2.0, epsilon = 1e-9);
    }

    #[test]
    fn test_plan_from_history() {
        let plan = ContributionPlan::from_history(&knri(), 2.0, None).unwrap();
        assert_eq!(plan.price_per_cota, 100.0);
        assert_eq!(plan.monthly_contribution, 200.0);
        assert_relative_eq!(plan.dividend_per_cota, 1.1, epsilon = 1e-12);

        let windowed = ContributionPlan::from_history(&knri(), 2.0, Some(1)).unwrap();
        assert_eq!(windowed.dividend_per_cota, 1.2);

        let empty = Fund::new("MXRF11", "Maxi Renda", "Papel");
        assert!(matches!(
            ContributionPlan::from_history(&empty, 1.0, None),
            Err(Error::NoPosition(_))
        ));
    }

    #[test]
    fn test_project_portfolio_sums_funds() {
        let portfolio = Portfolio::from_funds(vec![knri(), hglg()]).unwrap();
        let mut plans = HashMap::new();
        plans.insert("knri11".to_string(), ContributionPlan::new(200.0, 100.0, 1.2));

        let points: Vec<ProjectionPoint> =
            project_portfolio(&portfolio, 3, &plans).unwrap().collect();
        assert_eq!(points.len(), 3);

        // HGLG11 has no plan: 5 cotas at its last dividend of 1.1
        let expected = [(17.0, 19.9, 19.9), (19.0, 22.3, 42.2), (21.0, 24.7, 66.9)];
        for (point, (cotas, income, cumulative)) in points.iter().zip(expected) {
            assert_relative_eq!(point.cumulative_cotas, cotas, epsilon = 1e-9);
            assert_relative_eq!(point.projected_income, income, epsilon = 1e-9);
            assert_relative_eq!(point.cumulative_income, cumulative, epsilon = 1e-9);
        }

        // Labels start after the latest month across funds
        assert_eq!(points[0].month, Some(month("2024-04")));
    }

    #[test]
    fn test_project_portfolio_per_fund() {
        let portfolio = Portfolio::from_funds(vec![knri(), hglg()]).unwrap();
        let projection = project_portfolio(&portfolio, 2, &HashMap::new()).unwrap();

        let per_fund = projection.per_fund();
        assert_eq!(per_fund.len(), 2);
        assert_eq!(per_fund[0].0, "HGLG11");
        assert_eq!(per_fund[1].1.len(), 2);
        assert_relative_eq!(per_fund[1].1[1].cumulative_income, 24.0, epsilon = 1e-9);
    }

    #[test]
    fn test_project_portfolio_unknown_fund() {
        let portfolio = Portfolio::from_funds(vec![knri()]).unwrap();
        let mut plans = HashMap::new();
        plans.insert("XPML11".to_string(), ContributionPlan::new(100.0, 100.0, 1.0));

        let result = project_portfolio(&portfolio, 3, &plans);
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_project_portfolio_invalid_inputs() {
        let portfolio = Portfolio::from_funds(vec![knri()]).unwrap();
        assert!(matches!(
            project_portfolio(&portfolio, 0, &HashMap::new()),
            Err(Error::InvalidInput(_))
        ));

        let mut plans = HashMap::new();
        plans.insert("KNRI11".to_string(), ContributionPlan::new(100.0, 0.0, 1.0));
        assert!(matches!(
            project_portfolio(&portfolio, 3, &plans),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_project_portfolio_duplicate_plan_keys() {
        let portfolio = Portfolio::from_funds(vec![knri()]).unwrap();
        let mut plans = HashMap::new();
        plans.insert("knri11".to_string(), ContributionPlan::new(100.0, 100.0, 1.0));
        plans.insert("KNRI11".to_string(), ContributionPlan::new(200.0, 100.0, 1.0));

        let result = project_portfolio(&portfolio, 3, &plans);
        assert!(matches!(result, Err(Error::InvalidInput(message)) if message.contains("KNRI11")));
    }

    #[test]
    fn test_project_empty_portfolio() {
        let points: Vec<ProjectionPoint> = project_portfolio(&Portfolio::new(), 2, &HashMap::new())
            .unwrap()
            .collect();
        assert_eq!(points.len(), 2);
        assert_eq!(points[1].cumulative_income, 0.0);
        assert_eq!(points[1].month, None);
    }
}
