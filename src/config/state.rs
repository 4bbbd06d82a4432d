use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};

use crate::amortization::{self, amortize, AmortizationResult, LoanTerms};
use crate::error::{LoanError, Result};

/// Contents of loans.toml
#[derive(Debug, Deserialize, Serialize, Default)]
pub struct State {
    #[serde(default)]
    pub counter: Counter,
    #[serde(default)]
    pub loans: Vec<Loan>,
}

#[derive(Debug, Deserialize, Serialize, Default)]
pub struct Counter {
    /// Ids are never reused, even after a loan is removed
    pub last_id: u32,
}

/// A saved loan with the calculation snapshot taken when its terms were last set
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Loan {
    pub id: String,
    pub owner: String,
    pub name: String,
    pub principal: f64,
    /// Annual percentage rate
    pub interest_rate: f64,
    /// Months
    pub loan_term: u32,
    pub monthly_payment: f64,
    pub total_amount_paid: f64,
    pub total_interest: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Loan {
    pub fn terms(&self) -> Result<LoanTerms> {
        LoanTerms::new(self.principal, self.interest_rate, self.loan_term)
    }

    /// Regenerate the full schedule from the stored terms
    pub fn schedule(&self) -> Result<AmortizationResult> {
        amortize(&self.terms()?)
    }

    pub fn daily_interest(&self) -> f64 {
        amortization::daily_interest(self.principal, self.interest_rate)
    }

    pub fn weekly_interest(&self) -> f64 {
        amortization::weekly_interest(self.principal, self.interest_rate)
    }
}

/// Input for a new loan
#[derive(Debug, Clone)]
pub struct LoanDraft {
    /// Blank names become "Loan N"
    pub name: String,
    pub principal: f64,
    pub interest_rate: f64,
    pub loan_term: u32,
    pub notes: Option<String>,
}

/// Partial edit of a loan. Any term change triggers a full recalculation.
#[derive(Debug, Clone, Default)]
pub struct LoanUpdate {
    pub name: Option<String>,
    pub principal: Option<f64>,
    pub interest_rate: Option<f64>,
    pub loan_term: Option<u32>,
    /// Some("") clears the notes
    pub notes: Option<String>,
}

impl LoanUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.principal.is_none()
            && self.interest_rate.is_none()
            && self.loan_term.is_none()
            && self.notes.is_none()
    }
}

/// Format a loan id from its sequence number
pub fn format_loan_id(seq: u32) -> String {
    format!("LOAN-{:04}", seq)
}

fn clean_notes(notes: Option<&str>) -> Option<String> {
    notes
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string)
}

impl State {
    fn position(&self, owner: &str, id: &str) -> Result<usize> {
        self.loans
            .iter()
            .position(|l| l.owner == owner && l.id == id)
            .ok_or_else(|| LoanError::LoanNotFound(id.to_string()))
    }

    /// Number of loans held by an owner
    pub fn count_for(&self, owner: &str) -> usize {
        self.loans.iter().filter(|l| l.owner == owner).count()
    }

    /// An owner's loans, newest first
    pub fn list_by_owner(&self, owner: &str) -> Vec<&Loan> {
        // Reversed so loans created in the same instant still list newest first
        let mut loans: Vec<&Loan> = self
            .loans
            .iter()
            .rev()
            .filter(|l| l.owner == owner)
            .collect();
        loans.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        loans
    }

    pub fn find(&self, owner: &str, id: &str) -> Result<&Loan> {
        let idx = self.position(owner, id)?;
        Ok(&self.loans[idx])
    }

    /// Calculate and store a new loan
    pub fn create(&mut self, owner: &str, draft: LoanDraft, now: DateTime<Utc>) -> Result<Loan> {
        let terms = LoanTerms::new(draft.principal, draft.interest_rate, draft.loan_term)?;
        let result = amortize(&terms)?;

        let name = match draft.name.trim() {
            "" => format!("Loan {}", self.count_for(owner) + 1),
            trimmed => trimmed.to_string(),
        };

        let seq = self
            .counter
            .last_id
            .checked_add(1)
            .ok_or(LoanError::LoanIdsExhausted(self.counter.last_id))?;
        let loan = Loan {
            id: format_loan_id(seq),
            owner: owner.to_string(),
            name,
            principal: terms.principal,
            interest_rate: terms.annual_rate_percent,
            loan_term: terms.term_months,
            monthly_payment: result.monthly_payment,
            total_amount_paid: result.total_amount_paid,
            total_interest: result.total_interest,
            notes: clean_notes(draft.notes.as_deref()),
            created_at: now,
            updated_at: now,
        };

        self.counter.last_id = seq;
        self.loans.push(loan.clone());
        info!("created {} ({}) for {}", loan.id, loan.name, owner);

        Ok(loan)
    }

    /// Apply an edit. The snapshot is recomputed before anything is written,
    /// so a failed edit leaves the stored loan as it was.
    pub fn update(
        &mut self,
        owner: &str,
        id: &str,
        update: LoanUpdate,
        now: DateTime<Utc>,
    ) -> Result<Loan> {
        if update.is_empty() {
            return Err(LoanError::NothingToUpdate);
        }

        let idx = self.position(owner, id)?;
        let current = &self.loans[idx];

        let terms = LoanTerms::new(
            update.principal.unwrap_or(current.principal),
            update.interest_rate.unwrap_or(current.interest_rate),
            update.loan_term.unwrap_or(current.loan_term),
        )?;
        let result = amortize(&terms)?;

        let name = match update.name.as_deref().map(str::trim) {
            Some(n) if !n.is_empty() => n.to_string(),
            _ => current.name.clone(),
        };
        let notes = match update.notes.as_deref() {
            Some(n) => clean_notes(Some(n)),
            None => current.notes.clone(),
        };

        let updated = Loan {
            id: current.id.clone(),
            owner: current.owner.clone(),
            name,
            principal: terms.principal,
            interest_rate: terms.annual_rate_percent,
            loan_term: terms.term_months,
            monthly_payment: result.monthly_payment,
            total_amount_paid: result.total_amount_paid,
            total_interest: result.total_interest,
            notes,
            created_at: current.created_at,
            updated_at: now,
        };

        self.loans[idx] = updated.clone();
        info!("updated {} for {}", id, owner);

        Ok(updated)
    }

    /// Remove a loan and return it
    pub fn delete(&mut self, owner: &str, id: &str) -> Result<Loan> {
        let idx = self.position(owner, id)?;
        let removed = self.loans.remove(idx);
        info!("deleted {} for {}", id, owner);
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 10, 12, 0, 0).unwrap()
    }

    fn draft(name: &str, principal: f64, rate: f64, term: u32) -> LoanDraft {
        LoanDraft {
            name: name.to_string(),
            principal,
            interest_rate: rate,
            loan_term: term,
            notes: None,
        }
    }

    #[test]
    fn test_create_stores_calculation_snapshot() {
        let mut state = State::default();
        let loan = state
            .create("me", draft("  Car  ", 10_000.0, 6.0, 60), t0())
            .unwrap();

        assert_eq!(loan.id, "LOAN-0001");
        assert_eq!(loan.name, "Car");
        assert_abs_diff_eq!(loan.monthly_payment, 193.33, epsilon = 0.005);
        assert_abs_diff_eq!(loan.total_interest, 1599.68, epsilon = 0.01);
        assert_abs_diff_eq!(
            loan.total_amount_paid,
            loan.principal + loan.total_interest,
            epsilon = 1e-9
        );
        assert_eq!(loan.created_at, loan.updated_at);
        assert_eq!(state.counter.last_id, 1);
        assert_eq!(state.loans.len(), 1);
    }

    #[test]
    fn test_create_defaults_blank_name_and_notes() {
        let mut state = State::default();
        state
            .create("me", draft("Car", 1_000.0, 5.0, 12), t0())
            .unwrap();
        state
            .create("someone-else", draft("Boat", 1_000.0, 5.0, 12), t0())
            .unwrap();

        let mut blank = draft("   ", 2_000.0, 3.0, 24);
        blank.notes = Some("   ".to_string());
        let loan = state.create("me", blank, t0()).unwrap();

        assert_eq!(loan.name, "Loan 2");
        assert_eq!(loan.notes, None);
    }

    #[test]
    fn test_create_rejects_invalid_terms_without_side_effects() {
        let mut state = State::default();
        let err = state.create("me", draft("Bad", 0.0, 5.0, 12), t0()).unwrap_err();

        assert!(matches!(err, LoanError::InvalidArgument(_)));
        assert!(state.loans.is_empty());
        assert_eq!(state.counter.last_id, 0);
    }

    #[test]
    fn test_update_recomputes_snapshot() {
        let mut state = State::default();
        let original = state
            .create("me", draft("Car", 10_000.0, 6.0, 60), t0())
            .unwrap();

        let later = t0() + Duration::days(3);
        let update = LoanUpdate {
            interest_rate: Some(0.0),
            ..Default::default()
        };
        let updated = state.update("me", &original.id, update, later).unwrap();

        assert_eq!(updated.monthly_payment, 10_000.0 / 60.0);
        assert_abs_diff_eq!(updated.total_interest, 0.0, epsilon = 1e-9);
        assert_eq!(updated.interest_rate, 0.0);
        assert_eq!(updated.name, "Car");
        assert_eq!(updated.created_at, original.created_at);
        assert_eq!(updated.updated_at, later);
        assert_eq!(state.loans[0], updated);
    }

    #[test]
    fn test_update_matches_fresh_calculation() {
        let mut state = State::default();
        let loan = state
            .create("me", draft("Home", 300_000.0, 6.5, 360), t0())
            .unwrap();

        let update = LoanUpdate {
            principal: Some(280_000.0),
            loan_term: Some(240),
            ..Default::default()
        };
        let updated = state.update("me", &loan.id, update, t0()).unwrap();
        let fresh = amortization::calculate_schedule(280_000.0, 6.5, 240).unwrap();

        assert_eq!(updated.monthly_payment, fresh.monthly_payment);
        assert_eq!(updated.total_amount_paid, fresh.total_amount_paid);
        assert_eq!(updated.total_interest, fresh.total_interest);
    }

    #[test]
    fn test_failed_update_leaves_loan_untouched() {
        let mut state = State::default();
        let loan = state
            .create("me", draft("Car", 10_000.0, 6.0, 60), t0())
            .unwrap();

        let update = LoanUpdate {
            name: Some("Renamed".to_string()),
            interest_rate: Some(-1.0),
            ..Default::default()
        };
        let err = state.update("me", &loan.id, update, t0()).unwrap_err();

        assert!(matches!(err, LoanError::InvalidArgument(_)));
        assert_eq!(state.loans[0], loan);
    }

    #[test]
    fn test_update_notes_and_empty_update() {
        let mut state = State::default();
        let mut with_notes = draft("Car", 10_000.0, 6.0, 60);
        with_notes.notes = Some("dealer financing".to_string());
        let loan = state
            .create("me", with_notes, t0())
            .unwrap();
        assert_eq!(loan.notes.as_deref(), Some("dealer financing"));

        assert!(matches!(
            state.update("me", &loan.id, LoanUpdate::default(), t0()),
            Err(LoanError::NothingToUpdate)
        ));

        let clear = LoanUpdate {
            notes: Some(String::new()),
            ..Default::default()
        };
        let updated = state.update("me", &loan.id, clear, t0()).unwrap();
        assert_eq!(updated.notes, None);
        assert_eq!(updated.monthly_payment, loan.monthly_payment);
    }

    #[test]
    fn test_loans_are_owner_scoped() {
        let mut state = State::default();
        let mine = state
            .create("me", draft("Car", 1_000.0, 5.0, 12), t0())
            .unwrap();

        assert!(matches!(state.find("you", &mine.id), Err(LoanError::LoanNotFound(_))));
        assert!(matches!(state.delete("you", &mine.id), Err(LoanError::LoanNotFound(_))));
        assert!(state.list_by_owner("you").is_empty());
        assert_eq!(state.list_by_owner("me").len(), 1);
    }

    #[test]
    fn test_list_is_newest_first() {
        let mut state = State::default();
        state
            .create("me", draft("Old", 1_000.0, 5.0, 12), t0())
            .unwrap();
        state
            .create("me", draft("New", 1_000.0, 5.0, 12), t0() + Duration::days(1))
            .unwrap();
        state
            .create("me", draft("Same instant", 1_000.0, 5.0, 12), t0())
            .unwrap();

        let names: Vec<&str> = state
            .list_by_owner("me")
            .iter()
            .map(|l| l.name.as_str())
            .collect();
        assert_eq!(names, vec!["New", "Same instant", "Old"]);
    }

    #[test]
    fn test_deleted_ids_are_not_reused() {
        let mut state = State::default();
        state
            .create("me", draft("A", 1_000.0, 5.0, 12), t0())
            .unwrap();
        let b = state
            .create("me", draft("B", 1_000.0, 5.0, 12), t0())
            .unwrap();

        let removed = state.delete("me", &b.id).unwrap();
        assert_eq!(removed.name, "B");

        let c = state
            .create("me", draft("C", 1_000.0, 5.0, 12), t0())
            .unwrap();
        assert_eq!(c.id, "LOAN-0003");
    }

    #[test]
    fn test_create_fails_when_ids_are_exhausted() {
        let mut state = State::default();
        state.counter.last_id = u32::MAX;

        let err = state.create("me", draft("Car", 1_000.0, 5.0, 12), t0()).unwrap_err();

        assert!(matches!(err, LoanError::LoanIdsExhausted(u32::MAX)));
        assert!(state.loans.is_empty());
        assert_eq!(state.counter.last_id, u32::MAX);
    }

    #[test]
    fn test_schedule_regenerates_from_stored_terms() {
        let mut state = State::default();
        let loan = state
            .create("me", draft("Car", 10_000.0, 6.0, 60), t0())
            .unwrap();

        let result = loan.schedule().unwrap();
        assert_eq!(result.schedule.len(), 60);
        assert_eq!(result.monthly_payment, loan.monthly_payment);
    }

    #[test]
    fn test_state_round_trips_through_toml() {
        let mut state = State::default();
        let mut with_notes = draft("Car", 10_000.0, 6.0, 60);
        with_notes.notes = Some("note".to_string());
        state.create("me", with_notes, t0()).unwrap();
        state
            .create("me", draft("Card", 2_500.0, 19.0, 18), t0())
            .unwrap();

        let text = toml::to_string_pretty(&state).unwrap();
        let parsed: State = toml::from_str(&text).unwrap();

        assert_eq!(parsed.counter.last_id, 2);
        assert_eq!(parsed.loans, state.loans);
    }
}
