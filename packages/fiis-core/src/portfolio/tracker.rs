//! Fund tracking and persistence of the `{"fiis": [...]}` document.

use crate::config::Config;
use crate::month::Month;
use crate::types::{normalize_ticker, Entry, Fund, Portfolio};
use crate::{Error, Result};
use chrono::{DateTime, Local, Utc};
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Tracker that owns the in-memory portfolio and persists it to JSON.
///
/// Mutations only touch memory; call [`FundsTracker::save`] to write them back.
#[derive(Debug)]
pub struct FundsTracker {
    /// Path to the data file
    path: PathBuf,
    /// In-memory portfolio state
    portfolio: Portfolio,
}

impl FundsTracker {
    /// Create a tracker with the default path.
    ///
    /// An unreadable data file is logged and replaced by an empty portfolio.
    pub fn new() -> Self {
        let path = Self::default_path();
        let portfolio = Self::load_from_path(&path).unwrap_or_else(|e| {
            tracing::warn!("Could not load {}: {}", path.display(), e);
            Portfolio::default()
        });
        Self { path, portfolio }
    }

    /// Create a tracker with a custom path.
    ///
    /// A missing file starts an empty portfolio; an invalid file is an error.
    pub fn with_path(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let portfolio = Self::load_from_path(&path)?;
        Ok(Self { path, portfolio })
    }

    /// Create an in-memory tracker (no persistence).
    pub fn in_memory() -> Self {
        Self {
            path: PathBuf::new(),
            portfolio: Portfolio::default(),
        }
    }

    /// Get the default data file path.
    ///
    /// Resolved from the config file, `FIIS_DATA_FILE`, or the platform data directory.
    pub fn default_path() -> PathBuf {
        match Config::load() {
            Ok(config) => config.data_path(),
            Err(e) => {
                tracing::warn!("Ignoring unreadable config: {}", e);
                Config::default().data_path()
            }
        }
    }

    /// Get the current path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load_from_path(path: &Path) -> Result<Portfolio> {
        if !path.exists() {
            tracing::debug!("No data file at {}, starting empty", path.display());
            return Ok(Portfolio::default());
        }

        let content = fs::read_to_string(path)?;
        if content.trim().is_empty() {
            return Ok(Portfolio::default());
        }

        let portfolio: Portfolio = serde_json::from_str(&content)?;
        tracing::debug!(
            "Loaded {} funds from {}",
            portfolio.fund_count(),
            path.display()
        );
        Ok(portfolio)
    }

    fn write_to_path(portfolio: &Portfolio, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(portfolio)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Save the current portfolio to disk.
    pub fn save(&mut self) -> Result<()> {
        if self.path.as_os_str().is_empty() {
            return Ok(());
        }

        self.portfolio.updated_at = Some(Utc::now());
        Self::write_to_path(&self.portfolio, &self.path)?;
        tracing::debug!(
            "Saved {} funds to {}",
            self.portfolio.fund_count(),
            self.path.display()
        );
        Ok(())
    }

    /// Reload the portfolio from disk, discarding unsaved changes.
    pub fn reload(&mut self) -> Result<()> {
        if self.path.as_os_str().is_empty() {
            return Ok(());
        }
        self.portfolio = Self::load_from_path(&self.path)?;
        Ok(())
    }

    /// Copy the saved data file to `fiis_backup_<timestamp>.json` next to it.
    ///
    /// Backups taken within the same second get a `-1`, `-2`, ... suffix; an
    /// existing backup is never overwritten.
    pub fn create_backup(&self) -> Result<PathBuf> {
        if self.path.as_os_str().is_empty() {
            return Err(Error::InvalidInput(
                "in-memory tracker has no data file to back up".to_string(),
            ));
        }

        let saved = Self::load_from_path(&self.path)?;
        let content = serde_json::to_string_pretty(&saved)?;
        let timestamp = Local::now().format("%Y%m%d-%H%M%S").to_string();

        for attempt in 0u32.. {
            let name = match attempt {
                0 => format!("fiis_backup_{}.json", timestamp),
                n => format!("fiis_backup_{}-{}.json", timestamp, n),
            };
            let backup_path = self.path.with_file_name(name);

            let mut file = match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&backup_path)
            {
                Ok(file) => file,
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e.into()),
            };
            file.write_all(content.as_bytes())?;
            tracing::info!("Backup written to {}", backup_path.display());
            return Ok(backup_path);
        }

        Err(Error::InvalidInput(format!(
            "no free backup name for {}",
            self.path.display()
        )))
    }

    /// When the data file was last modified, if it exists.
    pub fn last_updated_at(&self) -> Option<DateTime<Local>> {
        let modified = fs::metadata(&self.path).and_then(|m| m.modified()).ok()?;
        Some(DateTime::<Local>::from(modified))
    }

    /// Get a reference to the current portfolio.
    pub fn get(&self) -> &Portfolio {
        &self.portfolio
    }

    /// Take an owned copy of the portfolio for computations that outlive a borrow.
    pub fn snapshot(&self) -> Portfolio {
        self.portfolio.clone()
    }

    /// Get all funds.
    pub fn funds(&self) -> &[Fund] {
        self.portfolio.funds()
    }

    /// Find a fund by ticker.
    pub fn find_fund(&self, ticker: &str) -> Option<&Fund> {
        self.portfolio.fund(ticker)
    }

    fn fund_mut(&mut self, ticker: &str) -> Result<&mut Fund> {
        self.portfolio
            .fund_mut(ticker)
            .ok_or_else(|| Error::FundNotFound(normalize_ticker(ticker)))
    }

    /// Register a fund or update its metadata.
    ///
    /// Blank `name` or `sector` keep the existing values.
    /// Returns the fund and whether it was an update (true) or add (false).
    pub fn add_or_update_fund(&mut self, ticker: &str, name: &str, sector: &str) -> Result<(Fund, bool)> {
        if let Some(fund) = self.portfolio.fund_mut(ticker) {
            if !name.trim().is_empty() {
                fund.name = name.trim().to_string();
            }
            if !sector.trim().is_empty() {
                fund.sector = sector.trim().to_string();
            }
            return Ok((fund.clone(), true));
        }

        if name.trim().is_empty() {
            return Err(Error::InvalidInput("fund name must not be empty".to_string()));
        }

        let fund = Fund::new(ticker, name, sector);
        self.portfolio.add_fund(fund.clone())?;
        Ok((fund, false))
    }

    /// Remove a fund and its history.
    pub fn remove_fund(&mut self, ticker: &str) -> Result<Fund> {
        self.portfolio.remove_fund(ticker)
    }

    /// Register a month for a fund.
    ///
    /// A missing `dividend_total` is filled with `dividend_per_cota` times the
    /// cotas held after this entry, rounded to cents.
    pub fn register_month(&mut self, ticker: &str, mut entry: Entry) -> Result<Entry> {
        let fund = self.fund_mut(ticker)?;

        if entry.dividend_total.is_none() && entry.dividend_per_cota > 0.0 {
            let held_after = fund
                .entries()
                .iter()
                .filter(|e| e.month <= entry.month)
                .map(|e| e.cotas_added)
                .sum::<f64>()
                + entry.cotas_added;
            entry.dividend_total = Some(round_cents(entry.dividend_per_cota * held_after));
        }

        fund.add_entry(entry.clone())?;
        Ok(entry)
    }

    /// Replace the entry recorded at `original_month`.
    pub fn update_month(&mut self, ticker: &str, original_month: Month, entry: Entry) -> Result<Entry> {
        let fund = self.fund_mut(ticker)?;
        fund.replace_entry(original_month, entry.clone())?;
        Ok(entry)
    }

    /// Remove the entry recorded at `month`.
    pub fn remove_month(&mut self, ticker: &str, month: Month) -> Result<Entry> {
        self.fund_mut(ticker)?.remove_entry(month)
    }
}

impl Default for FundsTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Round a monetary amount to two decimal places.
pub(crate) fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
