//! FIIs CLI - Command line interface for the FIIs tracker.
//!
//! Every command prints an `ApiResponse` JSON document on stdout; logs go to stderr.

use clap::{Parser, Subcommand};
use fiis_core::{
    project_fund, project_portfolio, project_with_reinvestment, summarize_fund,
    summarize_portfolio, ApiResponse, Config, ContributionPlan, Entry, FundsTracker, Month,
    ProjectionPoint,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "fiis")]
#[command(about = "FIIs tracker CLI - dividends, dashboards and income projections")]
#[command(version)]
struct Cli {
    /// Data file (overrides config and FIIS_DATA_FILE)
    #[arg(long, global = true)]
    data_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fund registration commands
    Fund {
        #[command(subcommand)]
        action: FundAction,
    },
    /// Monthly entry commands
    Entry {
        #[command(subcommand)]
        action: EntryAction,
    },
    /// Portfolio dashboard
    Summary,
    /// Project one fund's income under a contribution plan
    Project {
        /// Fund ticker
        #[arg(short, long)]
        ticker: String,
        /// Months to project (default from config)
        #[arg(short, long)]
        months: Option<usize>,
        /// Money invested per month
        #[arg(short, long)]
        contribution: f64,
        /// Assumed price per cota (default: average price)
        #[arg(short, long)]
        price: Option<f64>,
        /// Assumed dividend per cota (default: last dividend)
        #[arg(short, long)]
        dividend: Option<f64>,
    },
    /// Project the whole portfolio's income
    ProjectPortfolio {
        /// Months to project (default from config)
        #[arg(short, long)]
        months: Option<usize>,
        /// Explicit plan, TICKER=CONTRIBUTION:PRICE:DIVIDEND (repeatable)
        #[arg(long = "plan", value_parser = parse_plan)]
        plans: Vec<(String, ContributionPlan)>,
        /// Plan derived from history, TICKER=COTAS_PER_MONTH (repeatable)
        #[arg(long = "cotas", value_parser = parse_cotas)]
        cotas: Vec<(String, f64)>,
    },
    /// Project one fund with dividends reinvested into whole cotas
    Reinvest {
        /// Fund ticker
        #[arg(short, long)]
        ticker: String,
        /// Months to project (default from config)
        #[arg(short, long)]
        months: Option<usize>,
        /// Cotas bought per month (default from config)
        #[arg(short, long)]
        cotas: Option<f64>,
        /// Recent payouts to average (default from config, 0 = all)
        #[arg(short, long)]
        window: Option<usize>,
    },
    /// Copy the data file to a timestamped backup
    Backup,
}

#[derive(Subcommand)]
enum FundAction {
    /// Register a fund or update its name and sector
    Add {
        /// Fund ticker
        #[arg(short, long)]
        ticker: String,
        /// Fund name
        #[arg(short, long, default_value = "")]
        name: String,
        /// Fund sector
        #[arg(short, long, default_value = "")]
        sector: String,
    },
    /// List funds
    List,
    /// Show a fund's summary and history
    Show {
        /// Fund ticker
        #[arg(short, long)]
        ticker: String,
    },
    /// Remove a fund and its history
    Remove {
        /// Fund ticker
        #[arg(short, long)]
        ticker: String,
    },
}

#[derive(Subcommand)]
enum EntryAction {
    /// Register a month
    Add {
        #[command(flatten)]
        entry: EntryArgs,
    },
    /// Replace a registered month
    Edit {
        /// Month being replaced (YYYY-MM)
        #[arg(long)]
        original: Month,
        #[command(flatten)]
        entry: EntryArgs,
    },
    /// Remove a registered month
    Remove {
        /// Fund ticker
        #[arg(short, long)]
        ticker: String,
        /// Month (YYYY-MM)
        #[arg(short, long)]
        month: Month,
    },
}

#[derive(clap::Args)]
struct EntryArgs {
    /// Fund ticker
    #[arg(short, long)]
    ticker: String,
    /// Month (YYYY-MM)
    #[arg(short, long)]
    month: Month,
    /// Cotas bought
    #[arg(short = 'n', long, default_value = "0")]
    cotas: f64,
    /// Price per cota
    #[arg(short, long, default_value = "0")]
    price: f64,
    /// Dividend per cota
    #[arg(short, long, default_value = "0")]
    dividend: f64,
    /// Total dividend received (default: dividend x cotas held)
    #[arg(long)]
    total: Option<f64>,
    /// Notes
    #[arg(long, default_value = "")]
    notes: String,
}

impl EntryArgs {
    fn to_entry(&self) -> fiis_core::Result<Entry> {
        let mut entry = Entry::new(self.month, self.cotas, self.price, self.dividend)?
            .with_notes(&self.notes);
        if let Some(total) = self.total {
            entry = entry.with_dividend_total(total);
        }
        Ok(entry)
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = Config::load();
    let log_level = config
        .as_ref()
        .map(|c| c.log_level.clone())
        .unwrap_or_else(|_| Config::default().log_level);

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = config.unwrap_or_else(|e| {
        tracing::warn!("Ignoring unreadable config: {}", e);
        Config::default()
    });

    let response = match execute(cli, &config) {
        Ok(data) => ApiResponse::ok(data),
        Err(e) => {
            tracing::debug!("Command failed: {}", e);
            ApiResponse::err(e.to_string())
        }
    };

    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

fn execute(cli: Cli, config: &Config) -> fiis_core::Result<Value> {
    let path = cli.data_file.unwrap_or_else(|| config.data_path());
    let mut tracker = FundsTracker::with_path(path)?;

    match cli.command {
        Commands::Fund { action } => handle_fund(action, &mut tracker),
        Commands::Entry { action } => handle_entry(action, &mut tracker),
        Commands::Summary => {
            let summary = summarize_portfolio(tracker.get());
            Ok(json!({
                "summary": summary,
                "data_file": tracker.path(),
                "last_updated_at": tracker.last_updated_at(),
            }))
        }
        Commands::Project {
            ticker,
            months,
            contribution,
            price,
            dividend,
        } => {
            let fund = tracker
                .find_fund(&ticker)
                .ok_or_else(|| fiis_core::Error::InvalidInput(format!("unknown fund {}", ticker)))?;
            let plan = ContributionPlan::new(
                contribution,
                match price {
                    Some(price) => price,
                    None => fund.average_price()?,
                },
                dividend.or_else(|| fund.last_dividend()).unwrap_or(0.0),
            );
            let months = months.unwrap_or(config.projection_months);
            let points: Vec<ProjectionPoint> = project_fund(fund, months, &plan)?.collect();
            Ok(json!({
                "ticker": fund.ticker(),
                "plan": plan,
                "points": points,
            }))
        }
        Commands::ProjectPortfolio {
            months,
            plans,
            cotas,
        } => {
            let mut plan_map: HashMap<String, ContributionPlan> = HashMap::new();
            for (ticker, plan) in plans {
                insert_plan(&mut plan_map, ticker, plan)?;
            }
            for (ticker, monthly_cotas) in cotas {
                let fund = tracker.find_fund(&ticker).ok_or_else(|| {
                    fiis_core::Error::InvalidInput(format!("plan references unknown fund {}", ticker))
                })?;
                let plan = ContributionPlan::from_history(fund, monthly_cotas, config.dividend_window)?;
                insert_plan(&mut plan_map, ticker, plan)?;
            }

            let months = months.unwrap_or(config.projection_months);
            let projection = project_portfolio(tracker.get(), months, &plan_map)?;
            let per_fund: HashMap<String, Vec<ProjectionPoint>> =
                projection.per_fund().into_iter().collect();
            let points: Vec<ProjectionPoint> = projection.collect();
            Ok(json!({
                "plans": plan_map,
                "points": points,
                "per_fund": per_fund,
            }))
        }
        Commands::Reinvest {
            ticker,
            months,
            cotas,
            window,
        } => {
            let fund = tracker
                .find_fund(&ticker)
                .ok_or_else(|| fiis_core::Error::InvalidInput(format!("unknown fund {}", ticker)))?;
            let months = months.unwrap_or(config.projection_months);
            let cotas = cotas.unwrap_or(config.monthly_cotas);
            let window = window.or(config.dividend_window);
            let points = project_with_reinvestment(fund, months, cotas, window)?;
            Ok(json!({
                "ticker": fund.ticker(),
                "points": points,
            }))
        }
        Commands::Backup => {
            let backup = tracker.create_backup()?;
            Ok(json!({ "backup": backup }))
        }
    }
}

fn handle_fund(action: FundAction, tracker: &mut FundsTracker) -> fiis_core::Result<Value> {
    match action {
        FundAction::Add {
            ticker,
            name,
            sector,
        } => {
            let (fund, was_update) = tracker.add_or_update_fund(&ticker, &name, &sector)?;
            tracker.save()?;
            Ok(json!({
                "fund": summarize_fund(&fund),
                "action": if was_update { "updated" } else { "added" },
            }))
        }
        FundAction::List => {
            let funds: Vec<Value> = tracker
                .funds()
                .iter()
                .map(|f| {
                    json!({
                        "ticker": f.ticker(),
                        "name": f.name,
                        "sector": f.sector,
                        "entries": f.entries().len(),
                    })
                })
                .collect();
            Ok(json!({ "funds": funds }))
        }
        FundAction::Show { ticker } => {
            let fund = tracker
                .find_fund(&ticker)
                .ok_or_else(|| fiis_core::Error::FundNotFound(ticker.to_uppercase()))?;
            Ok(json!({
                "summary": summarize_fund(fund),
                "entries": fund.entries(),
            }))
        }
        FundAction::Remove { ticker } => {
            let removed = tracker.remove_fund(&ticker)?;
            tracker.save()?;
            Ok(json!({ "removed": removed.ticker() }))
        }
    }
}

fn handle_entry(action: EntryAction, tracker: &mut FundsTracker) -> fiis_core::Result<Value> {
    match action {
        EntryAction::Add { entry } => {
            let stored = tracker.register_month(&entry.ticker, entry.to_entry()?)?;
            tracker.save()?;
            Ok(json!({ "entry": stored }))
        }
        EntryAction::Edit { original, entry } => {
            let stored = tracker.update_month(&entry.ticker, original, entry.to_entry()?)?;
            tracker.save()?;
            Ok(json!({ "entry": stored }))
        }
        EntryAction::Remove { ticker, month } => {
            let removed = tracker.remove_month(&ticker, month)?;
            tracker.save()?;
            Ok(json!({ "removed": removed }))
        }
    }
}

fn insert_plan(
    plans: &mut HashMap<String, ContributionPlan>,
    ticker: String,
    plan: ContributionPlan,
) -> fiis_core::Result<()> {
    if plans.contains_key(&ticker) {
        return Err(fiis_core::Error::InvalidInput(format!(
            "more than one plan for fund {}",
            ticker
        )));
    }
    plans.insert(ticker, plan);
    Ok(())
}

fn parse_plan(value: &str) -> Result<(String, ContributionPlan), String> {
    let (ticker, rest) = value
        .split_once('=')
        .ok_or_else(|| format!("expected TICKER=CONTRIBUTION:PRICE:DIVIDEND, got '{}'", value))?;

    let numbers = rest
        .split(':')
        .map(|part| part.trim().replace(',', ".").parse::<f64>())
        .collect::<Result<Vec<f64>, _>>()
        .map_err(|e| format!("invalid number in '{}': {}", value, e))?;

    match numbers.as_slice() {
        [contribution, price, dividend] => Ok((
            ticker.trim().to_uppercase(),
            ContributionPlan::new(*contribution, *price, *dividend),
        )),
        _ => Err(format!(
            "expected TICKER=CONTRIBUTION:PRICE:DIVIDEND, got '{}'",
            value
        )),
    }
}

fn parse_cotas(value: &str) -> Result<(String, f64), String> {
    let (ticker, cotas) = value
        .split_once('=')
        .ok_or_else(|| format!("expected TICKER=COTAS, got '{}'", value))?;
    let cotas = cotas
        .trim()
        .replace(',', ".")
        .parse::<f64>()
        .map_err(|e| format!("invalid cotas in '{}': {}", value, e))?;
    Ok((ticker.trim().to_uppercase(), cotas))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plan() {
        let (ticker, plan) = parse_plan("knri11=200:100,5:1.2").unwrap();
        assert_eq!(ticker, "KNRI11");
        assert_eq!(plan.price_per_cota, 100.5);
        assert!(parse_plan("KNRI11=200:100").is_err());
        assert!(parse_plan("KNRI11").is_err());
    }

    #[test]
    fn test_second_plan_for_fund_is_rejected() {
        let mut plans = HashMap::new();
        insert_plan(&mut plans, "KNRI11".to_string(), ContributionPlan::new(200.0, 100.0, 1.2))
            .unwrap();

        let result = insert_plan(&mut plans, "KNRI11".to_string(), ContributionPlan::new(0.0, 1.0, 0.0));
        assert!(matches!(result, Err(fiis_core::Error::InvalidInput(_))));
        assert_eq!(plans["KNRI11"].monthly_contribution, 200.0);
    }

    #[test]
    fn test_cotas_and_plan_for_same_fund_conflict() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fiis_data.json");

        let mut tracker = FundsTracker::with_path(&path).unwrap();
        tracker.add_or_update_fund("KNRI11", "Kinea", "Hibrido").unwrap();
        let january: Month = "2024-01".parse().unwrap();
        tracker
            .register_month("KNRI11", Entry::new(january, 10.0, 100.0, 1.0).unwrap())
            .unwrap();
        tracker.save().unwrap();

        let data_file = path.to_string_lossy().to_string();
        let cli = Cli::try_parse_from([
            "fiis",
            "--data-file",
            data_file.as_str(),
            "project-portfolio",
            "--plan",
            "KNRI11=200:100:1.2",
            "--cotas",
            "knri11=2",
        ])
        .unwrap();

        let result = execute(cli, &Config::default());
        assert!(matches!(result, Err(fiis_core::Error::InvalidInput(_))));
    }
}
