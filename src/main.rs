use clap::{builder::RangedI64ValueParser, Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tabled::{settings::Style, Table, Tabled};

use loanbook::amortization::{
    aggregate, amortize, compare_payoff, solve_payoff_months, AggregateTotals,
    AmortizationResult, LoanTerms, PaymentScheduleEntry, MAX_TERM_MONTHS,
};
use loanbook::config::{
    config_dir, load_config, load_config_or_default, load_state, save_state, Config,
    DisplaySettings, Loan, LoanDraft, LoanUpdate, CONFIG_TEMPLATE,
};
use loanbook::error::{LoanError, Result};

#[derive(Parser)]
#[command(name = "loanbook")]
#[command(version, about = "Loan amortization and debt tracking", long_about = None)]
struct Cli {
    /// Path to config directory (default: ~/.loanbook or XDG config)
    #[arg(short = 'C', long, global = true)]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize config directory with a template config.toml
    Init,

    /// Calculate the payment and amortization schedule for a loan
    Calc {
        /// Amount borrowed
        #[arg(short, long)]
        principal: f64,

        /// Annual interest rate in percent (e.g. 6.5)
        #[arg(short, long, allow_negative_numbers = true)]
        rate: f64,

        /// Term in months
        #[arg(short, long, value_parser = term_parser())]
        term: u32,

        /// Show every month instead of the preview
        #[arg(long)]
        full: bool,

        /// Print the full result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Find how long a custom monthly payment takes to retire a loan
    Payoff {
        /// Amount borrowed
        #[arg(short, long)]
        principal: f64,

        /// Annual interest rate in percent
        #[arg(short, long, allow_negative_numbers = true)]
        rate: f64,

        /// Monthly payment amount
        #[arg(short = 'a', long = "payment", allow_negative_numbers = true)]
        payment: f64,

        /// Standard term in months, to report interest and time saved
        #[arg(short, long, value_parser = term_parser())]
        term: Option<u32>,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Calculate and save a loan
    Add {
        /// Loan name (default: "Loan N")
        #[arg(short, long, default_value = "")]
        name: String,

        #[arg(short, long)]
        principal: f64,

        /// Annual interest rate in percent
        #[arg(short, long, allow_negative_numbers = true)]
        rate: f64,

        /// Term in months
        #[arg(short, long, value_parser = term_parser())]
        term: u32,

        #[arg(long)]
        notes: Option<String>,
    },

    /// Edit a saved loan and recalculate it
    Edit {
        /// Loan id or index from 'list' (e.g., 1 or LOAN-0001)
        loan: String,

        #[arg(short, long)]
        name: Option<String>,

        #[arg(short, long)]
        principal: Option<f64>,

        #[arg(short, long, allow_negative_numbers = true)]
        rate: Option<f64>,

        #[arg(short, long, value_parser = term_parser())]
        term: Option<u32>,

        /// New notes (pass "" to clear)
        #[arg(long)]
        notes: Option<String>,
    },

    /// Remove a saved loan
    Remove {
        /// Loan id or index from 'list' (e.g., 1 or LOAN-0001)
        loan: String,
    },

    /// List saved loans with portfolio totals
    List {
        /// Number of loans to show (default: all)
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Show the amortization schedule of a saved loan
    Schedule {
        /// Loan id or index from 'list' (e.g., 1 or LOAN-0001)
        loan: String,

        /// Show every month instead of the preview
        #[arg(long)]
        full: bool,

        /// Print the full result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show totals across all saved loans
    Totals {
        /// Print the totals as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show config location and loan count
    Status,
}

/// Terms past the maximum are refused before any schedule is built
fn term_parser() -> RangedI64ValueParser<u32> {
    clap::value_parser!(u32).range(..=i64::from(MAX_TERM_MONTHS))
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    // Determine config directory
    let cfg_dir = match cli.config_dir {
        Some(p) => p,
        None => config_dir()?,
    };

    match cli.command {
        Commands::Init => cmd_init(&cfg_dir),
        Commands::Calc {
            principal,
            rate,
            term,
            full,
            json,
        } => cmd_calc(&cfg_dir, principal, rate, term, full, json),
        Commands::Payoff {
            principal,
            rate,
            payment,
            term,
            json,
        } => cmd_payoff(&cfg_dir, principal, rate, payment, term, json),
        Commands::Add {
            name,
            principal,
            rate,
            term,
            notes,
        } => cmd_add(
            &cfg_dir,
            LoanDraft {
                name,
                principal,
                interest_rate: rate,
                loan_term: term,
                notes,
            },
        ),
        Commands::Edit {
            loan,
            name,
            principal,
            rate,
            term,
            notes,
        } => cmd_edit(
            &cfg_dir,
            &loan,
            LoanUpdate {
                name,
                principal,
                interest_rate: rate,
                loan_term: term,
                notes,
            },
        ),
        Commands::Remove { loan } => cmd_remove(&cfg_dir, &loan),
        Commands::List { limit } => cmd_list(&cfg_dir, limit),
        Commands::Schedule { loan, full, json } => cmd_schedule(&cfg_dir, &loan, full, json),
        Commands::Totals { json } => cmd_totals(&cfg_dir, json),
        Commands::Status => cmd_status(&cfg_dir),
    }
}

/// Initialize config directory with template files
fn cmd_init(cfg_dir: &Path) -> Result<()> {
    use std::fs;

    if cfg_dir.exists() {
        return Err(LoanError::AlreadyInitialized(cfg_dir.to_path_buf()));
    }

    fs::create_dir_all(cfg_dir)?;
    fs::write(cfg_dir.join("config.toml"), CONFIG_TEMPLATE)?;

    println!("Initialized loanbook config at: {}", cfg_dir.display());
    println!();
    println!("Next steps:");
    println!(
        "  1. Set your owner name and currency:  $EDITOR {}/config.toml",
        cfg_dir.display()
    );
    println!("  2. Save your first loan:");
    println!("       loanbook add --name Car --principal 18000 --rate 5.9 --term 60");

    Ok(())
}

/// Config for a command that reads or writes saved loans
fn require_config(cfg_dir: &Path) -> Result<Config> {
    if !cfg_dir.exists() {
        return Err(LoanError::ConfigNotFound(cfg_dir.to_path_buf()));
    }
    load_config(cfg_dir)
}

// Table row structs for tabled
#[derive(Tabled)]
struct ScheduleRow {
    #[tabled(rename = "MONTH")]
    month: u32,
    #[tabled(rename = "PAYMENT")]
    payment: String,
    #[tabled(rename = "PRINCIPAL")]
    principal: String,
    #[tabled(rename = "INTEREST")]
    interest: String,
    #[tabled(rename = "BALANCE")]
    balance: String,
}

#[derive(Tabled)]
struct LoanRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "NAME")]
    name: String,
    #[tabled(rename = "PRINCIPAL")]
    principal: String,
    #[tabled(rename = "RATE")]
    rate: String,
    #[tabled(rename = "TERM")]
    term: String,
    #[tabled(rename = "MONTHLY")]
    monthly: String,
    #[tabled(rename = "INTEREST")]
    interest: String,
}

/// Insert thousands separators into a string of digits
fn group_digits(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);

    for (i, ch) in digits.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }

    out.chars().rev().collect()
}

/// Format a money amount with two decimal places and thousands separators
fn format_money(value: f64, currency_symbol: &str) -> String {
    let rounded = format!("{:.2}", value.abs());
    let (whole, frac) = rounded.split_once('.').unwrap_or((rounded.as_str(), "00"));
    let grouped = group_digits(whole);

    // "-0.00" is not worth a sign
    let sign = if value < 0.0 && rounded != "0.00" { "-" } else { "" };
    format!("{sign}{currency_symbol}{grouped}.{frac}")
}

fn schedule_rows(entries: &[PaymentScheduleEntry], symbol: &str) -> Vec<ScheduleRow> {
    entries
        .iter()
        .map(|e| ScheduleRow {
            month: e.month,
            payment: format_money(e.payment, symbol),
            principal: format_money(e.principal_portion, symbol),
            interest: format_money(e.interest_portion, symbol),
            balance: format_money(e.remaining_balance, symbol),
        })
        .collect()
}

fn print_result_summary(terms: &LoanTerms, result: &AmortizationResult, symbol: &str) {
    println!("Principal:        {}", format_money(terms.principal, symbol));
    println!("Interest rate:    {:.2}%", terms.annual_rate_percent);
    println!("Term:             {} months", terms.term_months);
    println!(
        "Monthly payment:  {}",
        format_money(result.monthly_payment, symbol)
    );
    println!(
        "Total paid:       {}",
        format_money(result.total_amount_paid, symbol)
    );
    println!(
        "Total interest:   {}",
        format_money(result.total_interest, symbol)
    );
    println!(
        "Daily interest:   {}",
        format_money(result.daily_interest, symbol)
    );
    println!(
        "Weekly interest:  {}",
        format_money(result.weekly_interest, symbol)
    );
}

fn print_schedule(result: &AmortizationResult, display: &DisplaySettings, full: bool) {
    let shown = if full {
        &result.schedule[..]
    } else {
        result.schedule_preview(display.schedule_preview)
    };

    let rows = schedule_rows(shown, &display.currency_symbol);
    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{table}");

    if shown.len() < result.schedule.len() {
        println!(
            "Showing first {} of {} months. Use --full to see the whole schedule.",
            shown.len(),
            result.schedule.len()
        );
    }
}

fn print_totals(totals: &AggregateTotals, symbol: &str) {
    println!(
        "Total monthly payments: {}",
        format_money(totals.total_monthly_payments, symbol)
    );
    println!(
        "Total principal:        {}",
        format_money(totals.total_principal, symbol)
    );
    println!(
        "Total interest:         {}",
        format_money(totals.total_interest_all_loans, symbol)
    );
    println!(
        "Total amount to pay:    {}",
        format_money(totals.total_amount_all_loans, symbol)
    );
    println!(
        "Total daily interest:   {}",
        format_money(totals.total_daily_interest, symbol)
    );
    println!(
        "Total weekly interest:  {}",
        format_money(totals.total_weekly_interest, symbol)
    );
}

#[derive(Serialize)]
struct CalculationOutput<'a> {
    terms: &'a LoanTerms,
    #[serde(flatten)]
    result: &'a AmortizationResult,
}

/// Calculate a loan without saving it
fn cmd_calc(
    cfg_dir: &Path,
    principal: f64,
    rate: f64,
    term: u32,
    full: bool,
    json: bool,
) -> Result<()> {
    let terms = LoanTerms::new(principal, rate, term)?;
    let result = amortize(&terms)?;

    if json {
        let output = CalculationOutput {
            terms: &terms,
            result: &result,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    let config = load_config_or_default(cfg_dir)?;

    println!("Loan Calculation");
    println!("{}", "-".repeat(50));
    print_result_summary(&terms, &result, &config.display.currency_symbol);
    println!();
    print_schedule(&result, &config.display, full);

    Ok(())
}

/// Solve payoff time for a custom payment
fn cmd_payoff(
    cfg_dir: &Path,
    principal: f64,
    rate: f64,
    payment: f64,
    term: Option<u32>,
    json: bool,
) -> Result<()> {
    let config = load_config_or_default(cfg_dir)?;
    let symbol = &config.display.currency_symbol;

    match term {
        Some(term) => {
            let terms = LoanTerms::new(principal, rate, term)?;
            let comparison = compare_payoff(&terms, payment)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&comparison)?);
                return Ok(());
            }

            println!("Payoff with {}/month", format_money(payment, symbol));
            println!("  Months to payoff:  {}", comparison.months);
            println!(
                "  Total interest:    {}",
                format_money(comparison.total_interest, symbol)
            );
            println!(
                "  Standard payment:  {} over {} months",
                format_money(comparison.standard_payment, symbol),
                term
            );
            println!(
                "  Interest saved:    {}",
                format_money(comparison.interest_saved, symbol)
            );
            println!("  Time saved:        {} months", comparison.months_saved);
        }
        None => {
            let payoff = solve_payoff_months(principal, rate, payment)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&payoff)?);
                return Ok(());
            }

            println!("Payoff with {}/month", format_money(payment, symbol));
            println!("  Months to payoff:  {}", payoff.months);
            println!(
                "  Total interest:    {}",
                format_money(payoff.total_interest, symbol)
            );
        }
    }

    Ok(())
}

/// Resolve a loan reference to a loan id.
/// Accepts either an index (1-based) from 'list' or the loan id.
fn resolve_loan_id(cfg_dir: &Path, owner: &str, reference: &str) -> Result<String> {
    let state = load_state(cfg_dir)?;

    // Try to parse as an index first
    if let Ok(idx) = reference.parse::<usize>() {
        let loans = state.list_by_owner(owner);
        if idx == 0 || idx > loans.len() {
            return Err(LoanError::InvalidLoanIndex(reference.to_string()));
        }
        return Ok(loans[idx - 1].id.clone());
    }

    // Otherwise, treat as loan id - verify it exists
    Ok(state.find(owner, reference)?.id.clone())
}

/// Calculate and save a new loan
fn cmd_add(cfg_dir: &Path, draft: LoanDraft) -> Result<()> {
    let config = require_config(cfg_dir)?;
    let symbol = &config.display.currency_symbol;
    let mut state = load_state(cfg_dir)?;

    let loan = state.create(&config.profile.owner, draft, chrono::Utc::now())?;
    save_state(cfg_dir, &state)?;

    println!("Added {} ({})", loan.id, loan.name);
    print_loan_snapshot(&loan, symbol);

    Ok(())
}

fn print_loan_snapshot(loan: &Loan, symbol: &str) {
    println!(
        "  Terms:            {} at {:.2}% for {} months",
        format_money(loan.principal, symbol),
        loan.interest_rate,
        loan.loan_term
    );
    println!(
        "  Monthly payment:  {}",
        format_money(loan.monthly_payment, symbol)
    );
    println!(
        "  Total interest:   {}",
        format_money(loan.total_interest, symbol)
    );
    println!(
        "  Total paid:       {}",
        format_money(loan.total_amount_paid, symbol)
    );
}

/// Edit a saved loan
fn cmd_edit(cfg_dir: &Path, loan_ref: &str, update: LoanUpdate) -> Result<()> {
    let config = require_config(cfg_dir)?;
    let owner = &config.profile.owner;

    if update.is_empty() {
        return Err(LoanError::NothingToUpdate);
    }

    let loan_id = resolve_loan_id(cfg_dir, owner, loan_ref)?;
    let mut state = load_state(cfg_dir)?;
    let loan = state.update(owner, &loan_id, update, chrono::Utc::now())?;
    save_state(cfg_dir, &state)?;

    println!("Updated {} ({})", loan.id, loan.name);
    print_loan_snapshot(&loan, &config.display.currency_symbol);

    Ok(())
}

/// Remove a saved loan
fn cmd_remove(cfg_dir: &Path, loan_ref: &str) -> Result<()> {
    let config = require_config(cfg_dir)?;
    let owner = &config.profile.owner;

    let loan_id = resolve_loan_id(cfg_dir, owner, loan_ref)?;
    let mut state = load_state(cfg_dir)?;
    let removed = state.delete(owner, &loan_id)?;
    save_state(cfg_dir, &state)?;

    println!("Removed {} ({})", removed.id, removed.name);

    Ok(())
}

/// List saved loans, newest first
fn cmd_list(cfg_dir: &Path, limit: Option<usize>) -> Result<()> {
    let config = require_config(cfg_dir)?;
    let symbol = &config.display.currency_symbol;
    let state = load_state(cfg_dir)?;

    let loans = state.list_by_owner(&config.profile.owner);
    if loans.is_empty() {
        println!("No loans yet. Use 'loanbook add' to track a loan and see totals.");
        return Ok(());
    }

    let shown = match limit {
        Some(n) => &loans[..n.min(loans.len())],
        None => &loans[..],
    };

    let rows: Vec<LoanRow> = shown
        .iter()
        .enumerate()
        .map(|(idx, loan)| LoanRow {
            index: idx + 1,
            id: loan.id.clone(),
            name: loan.name.clone(),
            principal: format_money(loan.principal, symbol),
            rate: format!("{:.2}%", loan.interest_rate),
            term: format!("{} mo", loan.loan_term),
            monthly: format_money(loan.monthly_payment, symbol),
            interest: format_money(loan.total_interest, symbol),
        })
        .collect();

    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{table}");

    // Totals cover the loans shown
    println!();
    print_totals(&aggregate(shown.iter().copied()), symbol);

    println!();
    println!("Total: {} loans", loans.len());
    println!("Use index number with edit/remove/schedule (e.g., 'loanbook schedule 1')");

    Ok(())
}

/// Regenerate and show a saved loan's schedule
fn cmd_schedule(cfg_dir: &Path, loan_ref: &str, full: bool, json: bool) -> Result<()> {
    let config = require_config(cfg_dir)?;
    let owner = &config.profile.owner;

    let loan_id = resolve_loan_id(cfg_dir, owner, loan_ref)?;
    let state = load_state(cfg_dir)?;
    let loan = state.find(owner, &loan_id)?;
    let terms = loan.terms()?;
    let result = loan.schedule()?;

    if json {
        let output = CalculationOutput {
            terms: &terms,
            result: &result,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("{} ({})", loan.name, loan.id);
    println!("{}", "-".repeat(50));
    print_result_summary(&terms, &result, &config.display.currency_symbol);
    if let Some(notes) = &loan.notes {
        println!("Notes:            {notes}");
    }
    println!();
    print_schedule(&result, &config.display, full);

    Ok(())
}

/// Show totals across all saved loans
fn cmd_totals(cfg_dir: &Path, json: bool) -> Result<()> {
    let config = require_config(cfg_dir)?;
    let state = load_state(cfg_dir)?;
    let totals = aggregate(state.list_by_owner(&config.profile.owner));

    if json {
        println!("{}", serde_json::to_string_pretty(&totals)?);
        return Ok(());
    }

    println!("Loan Totals ({} loans)", totals.loan_count);
    println!("{}", "-".repeat(50));
    print_totals(&totals, &config.display.currency_symbol);

    Ok(())
}

/// Show config location and loan count
fn cmd_status(cfg_dir: &Path) -> Result<()> {
    let config = require_config(cfg_dir)?;
    let state = load_state(cfg_dir)?;
    let loans = state.list_by_owner(&config.profile.owner);
    let totals = aggregate(loans.iter().copied());

    println!("Loanbook Status");
    println!("{}", "-".repeat(50));
    println!("Config directory: {}", cfg_dir.display());
    println!("Owner:            {}", config.profile.owner);
    println!("Loans:            {}", loans.len());
    println!(
        "Monthly payments: {}",
        format_money(totals.total_monthly_payments, &config.display.currency_symbol)
    );

    if !loans.is_empty() {
        println!();
        println!("Recent loans:");
        for loan in loans.iter().take(5) {
            println!(
                "  {} - {} - {}/month",
                loan.id,
                loan.name,
                format_money(loan.monthly_payment, &config.display.currency_symbol)
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_money_groups_thousands() {
        assert_eq!(format_money(1_234_567.891, "$"), "$1,234,567.89");
        assert_eq!(format_money(193.328, "$"), "$193.33");
        assert_eq!(format_money(0.0, "€"), "€0.00");
        assert_eq!(format_money(-1_500.5, "$"), "-$1,500.50");
        assert_eq!(format_money(-0.001, "$"), "$0.00");
    }

    #[test]
    fn test_format_money_beyond_i64_range() {
        assert_eq!(format_money(1e19, "$"), "$10,000,000,000,000,000,000.00");
        assert_eq!(format_money(-2.5e19, "$"), "-$25,000,000,000,000,000,000.00");
    }
}
