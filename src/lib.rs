pub mod amortization;
pub mod config;
pub mod error;

pub use amortization::{
    aggregate, amortize, calculate_schedule, compare_payoff, solve_payoff_months,
    AggregateTotals, AmortizationResult, LoanTerms, PaymentScheduleEntry, PayoffComparison,
    PayoffResult,
};
pub use config::{Config, Loan, LoanDraft, LoanUpdate, State};
pub use error::{LoanError, Result};
