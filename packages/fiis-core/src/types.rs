//! Core data types for the FIIs tracker.

use crate::month::Month;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Normalize a ticker to its canonical form (trimmed, uppercase).
pub fn normalize_ticker(ticker: &str) -> String {
    ticker.trim().to_uppercase()
}

/// One fund's activity in one calendar month: a purchase and a dividend payout.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(try_from = "EntryRecord")]
pub struct Entry {
    /// Month this entry belongs to (unique within its fund)
    pub month: Month,
    /// Cotas acquired during the month
    pub cotas_added: f64,
    /// Price paid per cota
    pub price_per_cota: f64,
    /// Dividend paid per held cota
    pub dividend_per_cota: f64,
    /// Total dividend received, if recorded
    pub dividend_total: Option<f64>,
    /// Free-form notes, empty when absent
    pub notes: String,
}

impl Entry {
    /// Create a validated entry with no recorded dividend total.
    pub fn new(
        month: Month,
        cotas_added: f64,
        price_per_cota: f64,
        dividend_per_cota: f64,
    ) -> Result<Self> {
        let entry = Self {
            month,
            cotas_added,
            price_per_cota,
            dividend_per_cota,
            dividend_total: None,
            notes: String::new(),
        };
        entry.validate()?;
        Ok(entry)
    }

    /// Set the total dividend received in the month.
    pub fn with_dividend_total(mut self, dividend_total: f64) -> Self {
        self.dividend_total = Some(dividend_total);
        self
    }

    /// Attach notes, trimmed.
    pub fn with_notes(mut self, notes: &str) -> Self {
        self.notes = notes.trim().to_string();
        self
    }

    /// Capital spent on cotas this month.
    pub fn invested(&self) -> f64 {
        self.cotas_added * self.price_per_cota
    }

    /// Check every numeric field against its domain.
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("cotas_added", self.cotas_added),
            ("price_per_cota", self.price_per_cota),
            ("dividend_per_cota", self.dividend_per_cota),
        ];
        for (name, value) in fields {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::InvalidEntry(format!(
                    "{} for {} must be a non-negative number, got {}",
                    name, self.month, value
                )));
            }
        }

        if self.cotas_added > 0.0 && self.price_per_cota <= 0.0 {
            return Err(Error::InvalidEntry(format!(
                "price_per_cota for {} must be positive when cotas are added",
                self.month
            )));
        }

        if let Some(total) = self.dividend_total {
            if !total.is_finite() || total < 0.0 {
                return Err(Error::InvalidEntry(format!(
                    "dividend_total for {} must be a non-negative number, got {}",
                    self.month, total
                )));
            }
        }

        Ok(())
    }
}

/// Wire form of an entry, before validation.
#[derive(Deserialize)]
struct EntryRecord {
    month: Month,
    #[serde(default)]
    cotas_added: f64,
    #[serde(default)]
    price_per_cota: f64,
    #[serde(default)]
    dividend_per_cota: f64,
    #[serde(default)]
    dividend_total: Option<f64>,
    #[serde(default)]
    notes: Option<String>,
}

impl TryFrom<EntryRecord> for Entry {
    type Error = Error;

    fn try_from(record: EntryRecord) -> Result<Self> {
        let entry = Entry {
            month: record.month,
            cotas_added: record.cotas_added,
            price_per_cota: record.price_per_cota,
            dividend_per_cota: record.dividend_per_cota,
            dividend_total: record.dividend_total,
            notes: String::new(),
        }
        .with_notes(record.notes.as_deref().unwrap_or_default());
        entry.validate()?;
        Ok(entry)
    }
}

/// A real-estate fund and its monthly history.
///
/// Entries are kept sorted by month and months are unique.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(try_from = "FundRecord")]
pub struct Fund {
    ticker: String,
    /// Display name
    pub name: String,
    /// Sector (logistics, offices, paper, ...)
    pub sector: String,
    entries: Vec<Entry>,
}

impl Fund {
    /// Create a fund with no entries. The ticker is normalized to uppercase.
    pub fn new(ticker: &str, name: &str, sector: &str) -> Self {
        Self {
            ticker: normalize_ticker(ticker),
            name: name.trim().to_string(),
            sector: sector.trim().to_string(),
            entries: Vec::new(),
        }
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    /// Entries in chronological order.
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Find the entry for a month.
    pub fn entry(&self, month: Month) -> Option<&Entry> {
        self.entries.iter().find(|e| e.month == month)
    }

    /// The most recent entry.
    pub fn last_entry(&self) -> Option<&Entry> {
        self.entries.iter().max_by_key(|e| e.month)
    }

    /// Add an entry, rejecting a month that is already registered.
    pub fn add_entry(&mut self, entry: Entry) -> Result<()> {
        entry.validate()?;
        if self.entry(entry.month).is_some() {
            return Err(Error::DuplicateMonth {
                ticker: self.ticker.clone(),
                month: entry.month,
            });
        }
        self.entries.push(entry);
        self.entries.sort_by_key(|e| e.month);
        Ok(())
    }

    /// Replace the entry at `original_month`, returning the previous entry.
    ///
    /// The replacement may move to a different month as long as that month is free.
    pub fn replace_entry(&mut self, original_month: Month, entry: Entry) -> Result<Entry> {
        entry.validate()?;
        let idx = self
            .entries
            .iter()
            .position(|e| e.month == original_month)
            .ok_or_else(|| Error::MonthNotFound {
                ticker: self.ticker.clone(),
                month: original_month,
            })?;

        if entry.month != original_month && self.entry(entry.month).is_some() {
            return Err(Error::DuplicateMonth {
                ticker: self.ticker.clone(),
                month: entry.month,
            });
        }

        let previous = std::mem::replace(&mut self.entries[idx], entry);
        self.entries.sort_by_key(|e| e.month);
        Ok(previous)
    }

    /// Remove the entry for a month.
    pub fn remove_entry(&mut self, month: Month) -> Result<Entry> {
        let idx = self
            .entries
            .iter()
            .position(|e| e.month == month)
            .ok_or_else(|| Error::MonthNotFound {
                ticker: self.ticker.clone(),
                month,
            })?;
        Ok(self.entries.remove(idx))
    }

    /// Total cotas held.
    pub fn total_cotas(&self) -> f64 {
        self.entries.iter().map(|e| e.cotas_added).sum()
    }

    /// Total capital spent buying cotas.
    pub fn total_invested(&self) -> f64 {
        self.entries.iter().map(Entry::invested).sum()
    }

    /// Average price paid per cota.
    ///
    /// Fails with [`Error::NoPosition`] when no cotas are held.
    pub fn average_price(&self) -> Result<f64> {
        let cotas = self.total_cotas();
        if cotas <= 0.0 {
            return Err(Error::NoPosition(self.ticker.clone()));
        }
        Ok(self.total_invested() / cotas)
    }

    /// Dividend per cota of the most recent entry.
    pub fn last_dividend(&self) -> Option<f64> {
        self.last_entry().map(|e| e.dividend_per_cota)
    }

    /// Annualized dividend yield: `last_dividend * 12 / average_price`.
    pub fn current_yield(&self) -> Result<f64> {
        let average_price = self.average_price()?;
        let last_dividend = self.last_dividend().unwrap_or(0.0);
        Ok(last_dividend * 12.0 / average_price)
    }

    /// Sum of dividends received across the whole history.
    ///
    /// Months without a recorded total count as `dividend_per_cota` times the
    /// cotas held at that point.
    pub fn total_dividends_received(&self) -> f64 {
        let mut held = 0.0;
        let mut total = 0.0;
        for entry in &self.entries {
            held += entry.cotas_added;
            total += entry
                .dividend_total
                .unwrap_or(entry.dividend_per_cota * held);
        }
        total
    }

    /// Mean of the positive dividends per cota, optionally over the last `window` payouts only.
    pub fn average_dividend_per_cota(&self, window: Option<usize>) -> f64 {
        let dividends: Vec<f64> = self
            .entries
            .iter()
            .map(|e| e.dividend_per_cota)
            .filter(|&d| d > 0.0)
            .collect();

        let recent = match window {
            Some(window) if window > 0 && window < dividends.len() => {
                &dividends[dividends.len() - window..]
            }
            _ => &dividends[..],
        };

        if recent.is_empty() {
            return 0.0;
        }
        recent.iter().sum::<f64>() / recent.len() as f64
    }

    /// Check ticker and entries; months must be unique.
    pub fn validate(&self) -> Result<()> {
        if self.ticker.is_empty() {
            return Err(Error::InvalidInput("fund ticker must not be empty".to_string()));
        }
        for entry in &self.entries {
            entry.validate()?;
        }
        for pair in self.entries.windows(2) {
            if pair[0].month == pair[1].month {
                return Err(Error::DuplicateMonth {
                    ticker: self.ticker.clone(),
                    month: pair[0].month,
                });
            }
        }
        Ok(())
    }
}

/// Wire form of a fund, before normalization.
#[derive(Deserialize)]
struct FundRecord {
    ticker: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    sector: Option<String>,
    #[serde(default)]
    entries: Vec<Entry>,
}

impl TryFrom<FundRecord> for Fund {
    type Error = Error;

    fn try_from(record: FundRecord) -> Result<Self> {
        let mut fund = Fund::new(
            &record.ticker,
            &record.name,
            record.sector.as_deref().unwrap_or_default(),
        );
        fund.entries = record.entries;
        fund.entries.sort_by_key(|e| e.month);
        fund.validate()?;
        Ok(fund)
    }
}

/// The full collection of funds, keyed by ticker.
///
/// Serialized as `{"fiis": [...]}`.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(try_from = "PortfolioRecord")]
pub struct Portfolio {
    #[serde(rename = "fiis")]
    funds: Vec<Fund>,
    /// When the portfolio was last saved
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Portfolio {
    /// Create a new empty portfolio.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a portfolio from funds, rejecting duplicate tickers.
    pub fn from_funds(funds: impl IntoIterator<Item = Fund>) -> Result<Self> {
        let mut portfolio = Self::new();
        for fund in funds {
            portfolio.add_fund(fund)?;
        }
        Ok(portfolio)
    }

    /// Funds sorted by ticker.
    pub fn funds(&self) -> &[Fund] {
        &self.funds
    }

    /// Find a fund by ticker (case insensitive).
    pub fn fund(&self, ticker: &str) -> Option<&Fund> {
        let ticker = normalize_ticker(ticker);
        self.funds.iter().find(|f| f.ticker == ticker)
    }

    /// Find a mutable fund by ticker (case insensitive).
    pub fn fund_mut(&mut self, ticker: &str) -> Option<&mut Fund> {
        let ticker = normalize_ticker(ticker);
        self.funds.iter_mut().find(|f| f.ticker == ticker)
    }

    /// Add a fund, rejecting a ticker that is already registered.
    pub fn add_fund(&mut self, fund: Fund) -> Result<()> {
        fund.validate()?;
        if self.fund(&fund.ticker).is_some() {
            return Err(Error::DuplicateTicker(fund.ticker));
        }
        self.funds.push(fund);
        self.funds.sort_by(|a, b| a.ticker.cmp(&b.ticker));
        Ok(())
    }

    /// Remove a fund and its history.
    pub fn remove_fund(&mut self, ticker: &str) -> Result<Fund> {
        let ticker = normalize_ticker(ticker);
        match self.funds.iter().position(|f| f.ticker == ticker) {
            Some(idx) => Ok(self.funds.remove(idx)),
            None => Err(Error::FundNotFound(ticker)),
        }
    }

    /// Get the number of funds.
    pub fn fund_count(&self) -> usize {
        self.funds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.funds.is_empty()
    }

    /// Most recent month recorded across all funds.
    pub fn last_month(&self) -> Option<Month> {
        self.funds
            .iter()
            .filter_map(|f| f.last_entry().map(|e| e.month))
            .max()
    }
}

/// Wire form of a portfolio, before ticker uniqueness is checked.
#[derive(Deserialize)]
struct PortfolioRecord {
    #[serde(default)]
    fiis: Vec<Fund>,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
}

impl TryFrom<PortfolioRecord> for Portfolio {
    type Error = Error;

    fn try_from(record: PortfolioRecord) -> Result<Self> {
        let mut portfolio = Portfolio::from_funds(record.fiis)?;
        portfolio.updated_at = record.updated_at;
        Ok(portfolio)
    }
}

/// API response wrapper used by the command line front end.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    /// Create a successful response.
    pub fn ok(data: T) -> Self {
        Self {
            ok: true,
            data: Some(data),
            error: None,
        }
    }

    /// Create an error response.
    pub fn err(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(error.into()),
        }
    }
}
