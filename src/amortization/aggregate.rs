use serde::Serialize;

use crate::config::Loan;

/// Portfolio-wide totals across a collection of loans
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct AggregateTotals {
    pub loan_count: usize,
    pub total_monthly_payments: f64,
    pub total_principal: f64,
    pub total_interest_all_loans: f64,
    /// Always `total_principal + total_interest_all_loans`
    pub total_amount_all_loans: f64,
    pub total_daily_interest: f64,
    pub total_weekly_interest: f64,
}

/// Sum loan-level figures into portfolio totals. An empty collection yields all zeros.
pub fn aggregate<'a, I>(loans: I) -> AggregateTotals
where
    I: IntoIterator<Item = &'a Loan>,
{
    let mut totals = loans
        .into_iter()
        .fold(AggregateTotals::default(), |mut acc, loan| {
            acc.loan_count += 1;
            acc.total_monthly_payments += loan.monthly_payment;
            acc.total_principal += loan.principal;
            acc.total_interest_all_loans += loan.total_interest;
            // Recomputed from stored terms rather than read from a snapshot
            acc.total_daily_interest += loan.daily_interest();
            acc.total_weekly_interest += loan.weekly_interest();
            acc
        });

    totals.total_amount_all_loans = totals.total_principal + totals.total_interest_all_loans;
    totals
}
