//! Projection with dividends reinvested into whole cotas.

use super::validate_months;
use crate::month::Month;
use crate::portfolio::round_cents;
use crate::types::Fund;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// One month of a reinvestment projection. Money values are rounded to cents.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReinvestmentPoint {
    /// 1-based month number within the projection
    pub month_index: usize,
    /// Calendar month, counted from the fund's latest recorded month
    #[serde(skip_serializing_if = "Option::is_none")]
    pub month: Option<Month>,
    /// Cotas held after the planned purchase, before reinvesting
    pub projected_cotas: f64,
    /// Income paid this month on `projected_cotas`
    pub projected_income: f64,
    /// Income paid from month 1 through this month
    pub cumulative_income: f64,
    /// Cotas bought with dividends so far
    pub reinvested_cotas: f64,
    /// Cotas held after reinvesting
    pub combined_cotas: f64,
    /// Income that `combined_cotas` would pay
    pub combined_income: f64,
}

/// Project a fund buying `monthly_cotas` every month and reinvesting its income.
///
/// Income is the fund's average dividend per cota over the last `window`
/// payouts. Income accrues as cash, and every month the cash buys as many whole
/// cotas as it affords at the fund's average price (1.0 when nothing is held yet).
pub fn project_with_reinvestment(
    fund: &Fund,
    months: usize,
    monthly_cotas: f64,
    window: Option<usize>,
) -> Result<Vec<ReinvestmentPoint>> {
    validate_months(months)?;
    if !monthly_cotas.is_finite() || monthly_cotas < 0.0 {
        return Err(Error::InvalidInput(format!(
            "monthly cotas must be a non-negative number, got {}",
            monthly_cotas
        )));
    }

    let dividend = fund.average_dividend_per_cota(window);
    let price = fund.average_price().unwrap_or(1.0);
    let start_month = fund.last_entry().map(|e| e.month);

    let mut cotas = fund.total_cotas();
    let mut cumulative_income = 0.0;
    let mut cash = 0.0;
    let mut reinvested_cotas = 0.0;
    let mut points = Vec::with_capacity(months);

    for month_index in 1..=months {
        cotas += monthly_cotas;
        let projected_cotas = cotas;
        let projected_income = round_cents(projected_cotas * dividend);
        cumulative_income = round_cents(cumulative_income + projected_income);
        cash = round_cents(cash + projected_income);

        let purchasable = (cash / price).floor();
        if purchasable >= 1.0 {
            reinvested_cotas += purchasable;
            cotas += purchasable;
            cash = round_cents(cash - purchasable * price);
        }

        points.push(ReinvestmentPoint {
            month_index,
            month: start_month.and_then(|m| m.offset(month_index)),
            projected_cotas,
            projected_income,
            cumulative_income,
            reinvested_cotas,
            combined_cotas: cotas,
            combined_income: round_cents(cotas * dividend),
        });
    }

    Ok(points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Entry;
    use approx::assert_relative_eq;

    fn month(value: &str) -> Month {
        value.parse().unwrap()
    }

    fn mxrf() -> Fund {
        let mut fund = Fund::new("MXRF11", "Maxi Renda", "Papel");
        fund.add_entry(Entry::new(month("2024-06"), 100.0, 10.0, 0.1).unwrap())
            .unwrap();
        fund
    }

    #[test]
    fn test_reinvests_whole_cotas() {
        let points = project_with_reinvestment(&mxrf(), 2, 0.0, None).unwrap();

        // Month 1: 100 cotas pay 10.00, enough for one cota at 10.00
        assert_eq!(points[0].month, Some(month("2024-07")));
        assert_eq!(points[0].projected_cotas, 100.0);
        assert_relative_eq!(points[0].projected_income, 10.0);
        assert_eq!(points[0].reinvested_cotas, 1.0);
        assert_eq!(points[0].combined_cotas, 101.0);
        assert_relative_eq!(points[0].combined_income, 10.1);

        // Month 2: 101 cotas pay 10.10, one more cota and 0.10 left over
        assert_eq!(points[1].projected_cotas, 101.0);
        assert_relative_eq!(points[1].projected_income, 10.1);
        assert_relative_eq!(points[1].cumulative_income, 20.1);
        assert_eq!(points[1].reinvested_cotas, 2.0);
        assert_eq!(points[1].combined_cotas, 102.0);
    }

    #[test]
    fn test_monthly_purchases_accumulate() {
        let points = project_with_reinvestment(&mxrf(), 3, 10.0, None).unwrap();
        assert_eq!(points.len(), 3);
        assert_eq!(points[0].projected_cotas, 110.0);
        // 110 + 1 reinvested + 10 bought
        assert_eq!(points[1].projected_cotas, 121.0);
    }

    #[test]
    fn test_small_income_is_not_reinvested() {
        let mut fund = Fund::new("KNRI11", "Kinea", "Hibrido");
        fund.add_entry(Entry::new(month("2024-01"), 1.0, 150.0, 1.0).unwrap())
            .unwrap();

        let points = project_with_reinvestment(&fund, 3, 0.0, None).unwrap();
        assert!(points.iter().all(|p| p.reinvested_cotas == 0.0));
        assert_relative_eq!(points[2].cumulative_income, 3.0);
    }

    #[test]
    fn test_labels_end_at_year_9999() {
        let mut fund = Fund::new("MXRF11", "Maxi Renda", "Papel");
        fund.add_entry(Entry::new(month("9999-11"), 100.0, 10.0, 0.1).unwrap())
            .unwrap();

        let points = project_with_reinvestment(&fund, 2, 0.0, None).unwrap();
        assert_eq!(points[0].month, Some(month("9999-12")));
        assert_eq!(points[1].month, None);
        assert_eq!(points[1].month_index, 2);
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(matches!(
            project_with_reinvestment(&mxrf(), 0, 1.0, None),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            project_with_reinvestment(&mxrf(), 3, -1.0, None),
            Err(Error::InvalidInput(_))
        ));
    }
}
