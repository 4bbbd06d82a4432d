use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{LoanError, Result};

/// Longest term accepted, in months (100 years)
pub const MAX_TERM_MONTHS: u32 = 1200;

/// Raw payoff month counts this close to a whole number are not rounded up
const MONTHS_EPSILON: f64 = 1e-9;

/// Raw loan terms supplied by the caller
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoanTerms {
    pub principal: f64,
    /// Annual percentage rate, e.g. 6.0 for 6%
    pub annual_rate_percent: f64,
    pub term_months: u32,
}

impl LoanTerms {
    pub fn new(principal: f64, annual_rate_percent: f64, term_months: u32) -> Result<Self> {
        let terms = Self {
            principal,
            annual_rate_percent,
            term_months,
        };
        terms.validate()?;
        Ok(terms)
    }

    pub fn validate(&self) -> Result<()> {
        validate_principal(self.principal)?;
        validate_rate(self.annual_rate_percent)?;
        if self.term_months < 1 {
            return Err(LoanError::invalid("term must be at least 1 month"));
        }
        if self.term_months > MAX_TERM_MONTHS {
            return Err(LoanError::invalid(format!(
                "term must be at most {MAX_TERM_MONTHS} months (got {})",
                self.term_months
            )));
        }
        Ok(())
    }

    pub fn monthly_rate(&self) -> f64 {
        monthly_rate(self.annual_rate_percent)
    }
}

/// One month of an amortization schedule
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PaymentScheduleEntry {
    pub month: u32,
    pub payment: f64,
    pub principal_portion: f64,
    pub interest_portion: f64,
    pub remaining_balance: f64,
}

/// Fixed payment, totals and the full month-by-month schedule for a loan
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AmortizationResult {
    pub monthly_payment: f64,
    pub total_amount_paid: f64,
    pub total_interest: f64,
    pub daily_interest: f64,
    pub weekly_interest: f64,
    pub schedule: Vec<PaymentScheduleEntry>,
}

impl AmortizationResult {
    /// First `months` entries of the schedule (all of them if the schedule is shorter)
    pub fn schedule_preview(&self, months: usize) -> &[PaymentScheduleEntry] {
        &self.schedule[..months.min(self.schedule.len())]
    }
}

/// Months and interest needed to retire a loan with a custom payment
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PayoffResult {
    pub months: u32,
    pub total_interest: f64,
}

/// Custom payment measured against the standard payment for the same terms
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PayoffComparison {
    pub custom_payment: f64,
    pub standard_payment: f64,
    pub months: u32,
    pub total_interest: f64,
    pub interest_saved: f64,
    /// Negative when the custom payment is below the standard one
    pub months_saved: i64,
}

fn validate_principal(principal: f64) -> Result<()> {
    if !principal.is_finite() || principal <= 0.0 {
        return Err(LoanError::invalid(format!(
            "principal must be greater than 0 (got {principal})"
        )));
    }
    Ok(())
}

fn validate_rate(annual_rate_percent: f64) -> Result<()> {
    if !annual_rate_percent.is_finite() || annual_rate_percent < 0.0 {
        return Err(LoanError::invalid(format!(
            "interest rate must be 0 or greater (got {annual_rate_percent})"
        )));
    }
    Ok(())
}

/// Convert an annual percentage rate into a monthly decimal rate
pub fn monthly_rate(annual_rate_percent: f64) -> f64 {
    annual_rate_percent / 100.0 / 12.0
}

/// Simple daily interest on the original principal
pub fn daily_interest(principal: f64, annual_rate_percent: f64) -> f64 {
    principal * (annual_rate_percent / 100.0) / 365.0
}

/// Simple weekly interest on the original principal
pub fn weekly_interest(principal: f64, annual_rate_percent: f64) -> f64 {
    principal * (annual_rate_percent / 100.0) / 52.0
}

fn level_payment(principal: f64, rate: f64, term_months: u32) -> f64 {
    if rate == 0.0 {
        return principal / term_months as f64;
    }

    let growth = (1.0 + rate).powf(term_months as f64);
    if growth <= 1.0 {
        // Rate too small to register in (1 + r)^n
        return principal / term_months as f64;
    }
    principal * rate * growth / (growth - 1.0)
}

/// Calculate payment, totals and schedule from raw terms
pub fn calculate_schedule(
    principal: f64,
    annual_rate_percent: f64,
    term_months: u32,
) -> Result<AmortizationResult> {
    let terms = LoanTerms::new(principal, annual_rate_percent, term_months)?;
    amortize(&terms)
}

/// Calculate payment, totals and schedule for validated terms
pub fn amortize(terms: &LoanTerms) -> Result<AmortizationResult> {
    terms.validate()?;

    let rate = terms.monthly_rate();
    let months = terms.term_months;
    let monthly_payment = level_payment(terms.principal, rate, months);

    if !monthly_payment.is_finite() {
        return Err(LoanError::invalid(
            "terms produce a payment that cannot be represented",
        ));
    }

    let total_amount_paid = monthly_payment * months as f64;
    let total_interest = total_amount_paid - terms.principal;

    let mut schedule = Vec::with_capacity(months as usize);
    let mut balance = terms.principal;

    for month in 1..=months {
        let interest_portion = balance * rate;
        let principal_portion = monthly_payment - interest_portion;
        // The level payment retires the loan in the final month
        balance = if month == months {
            0.0
        } else {
            (balance - principal_portion).max(0.0)
        };

        schedule.push(PaymentScheduleEntry {
            month,
            payment: monthly_payment,
            principal_portion,
            interest_portion,
            remaining_balance: balance,
        });
    }

    debug!(
        "amortized {:.2} at {}% over {} months: payment {:.4}",
        terms.principal, terms.annual_rate_percent, months, monthly_payment
    );

    Ok(AmortizationResult {
        monthly_payment,
        total_amount_paid,
        total_interest,
        daily_interest: daily_interest(terms.principal, terms.annual_rate_percent),
        weekly_interest: weekly_interest(terms.principal, terms.annual_rate_percent),
        schedule,
    })
}

fn whole_months(raw: f64) -> Result<u32> {
    let nearest = raw.round();
    let months = if (raw - nearest).abs() < MONTHS_EPSILON {
        nearest
    } else {
        raw.ceil()
    };

    if !months.is_finite() || months > u32::MAX as f64 {
        return Err(LoanError::invalid(
            "payment is too small to retire the loan in a representable number of months",
        ));
    }
    Ok(months.max(1.0) as u32)
}

/// Solve how many months a custom monthly payment needs to retire a loan
pub fn solve_payoff_months(
    principal: f64,
    annual_rate_percent: f64,
    custom_monthly_payment: f64,
) -> Result<PayoffResult> {
    validate_principal(principal)?;
    validate_rate(annual_rate_percent)?;
    if !custom_monthly_payment.is_finite() || custom_monthly_payment <= 0.0 {
        return Err(LoanError::invalid(format!(
            "monthly payment must be greater than 0 (got {custom_monthly_payment})"
        )));
    }

    let rate = monthly_rate(annual_rate_percent);

    if rate == 0.0 {
        let months = whole_months(principal / custom_monthly_payment)?;
        return Ok(PayoffResult {
            months,
            total_interest: 0.0,
        });
    }

    let accrued = principal * rate;
    if custom_monthly_payment <= accrued {
        return Err(LoanError::PaymentTooLowForInterest {
            payment: custom_monthly_payment,
            interest: accrued,
        });
    }

    // n = -ln(1 - P*r/A) / ln(1 + r)
    let raw = -(-accrued / custom_monthly_payment).ln_1p() / rate.ln_1p();
    let months = whole_months(raw)?;
    let total_interest = custom_monthly_payment * months as f64 - principal;

    debug!(
        "payoff of {:.2} at {}% with {:.2}/month: {:.4} -> {} months",
        principal, annual_rate_percent, custom_monthly_payment, raw, months
    );

    Ok(PayoffResult {
        months,
        total_interest,
    })
}

/// Compare a custom payment against the standard schedule for the same terms
pub fn compare_payoff(terms: &LoanTerms, custom_monthly_payment: f64) -> Result<PayoffComparison> {
    let standard = amortize(terms)?;
    let custom = solve_payoff_months(
        terms.principal,
        terms.annual_rate_percent,
        custom_monthly_payment,
    )?;

    Ok(PayoffComparison {
        custom_payment: custom_monthly_payment,
        standard_payment: standard.monthly_payment,
        months: custom.months,
        total_interest: custom.total_interest,
        interest_saved: standard.total_interest - custom.total_interest,
        months_saved: i64::from(terms.term_months) - i64::from(custom.months),
    })
}
