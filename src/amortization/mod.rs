mod aggregate;
mod calculator;

pub use aggregate::{aggregate, AggregateTotals};
pub use calculator::{
    amortize, calculate_schedule, compare_payoff, daily_interest, monthly_rate,
    solve_payoff_months, weekly_interest, AmortizationResult, LoanTerms, PaymentScheduleEntry,
    PayoffComparison, PayoffResult, MAX_TERM_MONTHS,
};
