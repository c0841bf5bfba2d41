use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};

use centime_classify::{
    OverrideStore, SmartCategorizer, TrainingExample, categorize_with_details,
};
use centime_core::{AccountType, category_breakdown, monthly_summary, rows_in_month};
use centime_ingest::{StatementFormat, parse_statement};

mod home;
mod pipeline;

#[derive(Parser, Debug)]
#[command(name = "centime", version, about = "Statement ingestion and classification pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FormatArg {
    Csv,
    Pdf,
}

impl From<FormatArg> for StatementFormat {
    fn from(format: FormatArg) -> StatementFormat {
        match format {
            FormatArg::Csv => StatementFormat::Csv,
            FormatArg::Pdf => StatementFormat::Pdf,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse a statement export and print categorized transactions
    Parse {
        /// CSV or PDF statement file
        file: PathBuf,

        /// Override the format guessed from the file extension
        #[arg(long)]
        format: Option<FormatArg>,

        /// Account type the statement belongs to
        #[arg(long, default_value = "chequing")]
        account_type: String,

        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Parse a statement and print monthly totals and the expense breakdown
    Summary {
        /// CSV or PDF statement file
        file: PathBuf,

        #[arg(long)]
        format: Option<FormatArg>,

        #[arg(long, default_value = "chequing")]
        account_type: String,

        /// Restrict to one calendar month (both required together)
        #[arg(long)]
        year: Option<i32>,

        #[arg(long)]
        month: Option<u32>,
    },

    /// Predict a category for one description
    Predict {
        description: String,

        #[arg(long)]
        amount: Option<f64>,

        /// Transaction date (YYYY-MM-DD)
        #[arg(long)]
        date: Option<NaiveDate>,

        #[arg(long)]
        account_type: Option<String>,
    },

    /// Retrain the categorizer from a labeled CSV
    /// (description, amount, date, account_type, category)
    Train {
        samples: PathBuf,
    },

    /// Show categorizer metadata
    Status,

    /// Inspect or edit category overrides
    Override {
        #[command(subcommand)]
        command: OverrideCommand,
    },
}

#[derive(Subcommand, Debug)]
enum OverrideCommand {
    /// Record a corrected category for a description
    Set { description: String, category: String },
    /// Look up the override for a description
    Get { description: String },
    /// Remove the override for a description
    Clear { description: String },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Parse {
            file,
            format,
            account_type,
            json,
        } => parse_cmd(&file, format, &account_type, json),
        Command::Summary {
            file,
            format,
            account_type,
            year,
            month,
        } => summary_cmd(&file, format, &account_type, year, month),
        Command::Predict {
            description,
            amount,
            date,
            account_type,
        } => predict_cmd(&description, amount, date, account_type.as_deref()),
        Command::Train { samples } => train_cmd(&samples),
        Command::Status => status_cmd(),
        Command::Override { command } => override_cmd(command),
    }
}

fn open_categorizer() -> Result<SmartCategorizer> {
    SmartCategorizer::open(home::model_path()?)
}

fn open_overrides() -> Result<OverrideStore> {
    Ok(OverrideStore::new(home::overrides_path()?))
}

fn parse_file(file: &Path, format: Option<FormatArg>) -> Result<Vec<centime_ingest::RawTransaction>> {
    if !file.exists() {
        bail!("statement not found: {}", file.display());
    }
    let bytes = std::fs::read(file).with_context(|| format!("read {}", file.display()))?;
    let format = format
        .map(StatementFormat::from)
        .unwrap_or_else(|| StatementFormat::from_path(file));
    Ok(parse_statement(&bytes, format)?)
}

fn parse_cmd(file: &Path, format: Option<FormatArg>, account_type: &str, json: bool) -> Result<()> {
    let account_type = AccountType::parse(account_type);
    let rows = parse_file(file, format)?;
    let categorizer = open_categorizer()?;
    let overrides = open_overrides()?;
    let (transactions, last_balance) =
        pipeline::build_transactions(&rows, account_type, &categorizer, Some(&overrides));

    if json {
        println!("{}", serde_json::to_string_pretty(&transactions)?);
        return Ok(());
    }

    println!(
        "{} transactions from {} ({})",
        transactions.len(),
        file.display(),
        account_type.as_str()
    );
    for txn in &transactions {
        println!(
            "{}  {:>10.2}  {:<18}  {}",
            txn.date,
            txn.amount,
            txn.category.as_deref().unwrap_or("Uncategorized"),
            txn.description
        );
    }
    if let Some(balance) = last_balance {
        println!("latest balance: {balance:.2}");
    }
    Ok(())
}

fn summary_cmd(
    file: &Path,
    format: Option<FormatArg>,
    account_type: &str,
    year: Option<i32>,
    month: Option<u32>,
) -> Result<()> {
    let account_type = AccountType::parse(account_type);
    let rows = parse_file(file, format)?;
    let categorizer = open_categorizer()?;
    let overrides = open_overrides()?;
    let (transactions, _) =
        pipeline::build_transactions(&rows, account_type, &categorizer, Some(&overrides));
    let rows: Vec<_> = transactions
        .into_iter()
        .map(|txn| (txn, account_type))
        .collect();

    let (summary, breakdown) = match (year, month) {
        (Some(year), Some(month)) => {
            let summary = monthly_summary(rows_in_month(&rows, year, month));
            let breakdown = category_breakdown(rows_in_month(&rows, year, month));
            println!("summary for {year}-{month:02}");
            (summary, breakdown)
        }
        (None, None) => (
            monthly_summary(rows.iter().map(|(t, a)| (t, *a))),
            category_breakdown(rows.iter().map(|(t, a)| (t, *a))),
        ),
        _ => bail!("--year and --month must be passed together"),
    };

    println!("income:    {:>12.2}", summary.total_income);
    println!("expenses:  {:>12.2}", summary.total_expenses);
    println!("invested:  {:>12.2}", summary.total_invested);
    println!("net flow:  {:>12.2}", summary.net_flow);
    println!("savings rate: {:.1}%", summary.savings_rate * 100.0);
    if !breakdown.is_empty() {
        println!("\nexpenses by category:");
        for entry in &breakdown {
            println!("  {:<20} {:>12.2}", entry.category, entry.total);
        }
    }
    Ok(())
}

fn predict_cmd(
    description: &str,
    amount: Option<f64>,
    date: Option<NaiveDate>,
    account_type: Option<&str>,
) -> Result<()> {
    let categorizer = open_categorizer()?;
    let overrides = open_overrides()?;
    let prediction = categorize_with_details(
        &categorizer,
        Some(&overrides),
        description,
        amount,
        date,
        account_type,
    );
    println!(
        "category:   {}",
        prediction.category.as_deref().unwrap_or("(none)")
    );
    println!("source:     {}", prediction.source.as_str());
    if let Some(confidence) = prediction.confidence {
        println!("confidence: {confidence:.3}");
    }
    println!("normalized: {}", prediction.normalized_description);
    if !prediction.top_categories.is_empty() {
        println!("top candidates:");
        for (label, probability) in &prediction.top_categories {
            println!("  {label:<20} {probability:.3}");
        }
    }
    Ok(())
}

fn load_training_samples(path: &Path) -> Result<Vec<TrainingExample>> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("open {}", path.display()))?;
    let mut samples = Vec::new();
    for record in rdr.deserialize() {
        let sample: TrainingExample = match record {
            Ok(sample) => sample,
            Err(err) => {
                tracing::warn!(%err, "skipping bad training row");
                continue;
            }
        };
        if sample.category.trim().is_empty() {
            continue;
        }
        samples.push(sample);
    }
    Ok(samples)
}

fn train_cmd(samples: &Path) -> Result<()> {
    if !samples.exists() {
        bail!("training CSV not found: {}", samples.display());
    }
    let examples = load_training_samples(samples)?;
    let mut categorizer = open_categorizer()?;
    let report = categorizer.train(&examples)?;
    if !report.trained {
        println!("training skipped: no labeled samples");
        return Ok(());
    }
    println!("trained on {} samples", report.samples);
    println!("labels: {}", report.labels.join(", "));
    if let Some(accuracy) = report.accuracy {
        println!(
            "holdout accuracy: {:.3} (macro-F1 {:.3}, {} held out)",
            accuracy,
            report.macro_f1.unwrap_or_default(),
            report.heldout_samples
        );
    }
    if let Some(saved_to) = &report.saved_to {
        println!("saved to {}", saved_to.display());
    }
    Ok(())
}

fn status_cmd() -> Result<()> {
    let categorizer = open_categorizer()?;
    let status = categorizer.status();
    if !status.trained {
        println!("categorizer: untrained ({})", status.model_path.display());
        return Ok(());
    }
    println!("categorizer: trained");
    if let Some(trained_at) = status.trained_at {
        println!("trained at:  {trained_at}");
    }
    println!("labels:      {}", status.labels.join(", "));
    println!("model path:  {}", status.model_path.display());
    Ok(())
}

fn override_cmd(command: OverrideCommand) -> Result<()> {
    let store = open_overrides()?;
    match command {
        OverrideCommand::Set {
            description,
            category,
        } => {
            store.record(&description, Some(&category))?;
            println!("override recorded");
        }
        OverrideCommand::Get { description } => match store.lookup(&description) {
            Some(category) => println!("{category}"),
            None => println!("(no override)"),
        },
        OverrideCommand::Clear { description } => {
            store.record(&description, None)?;
            println!("override cleared");
        }
    }
    Ok(())
}
