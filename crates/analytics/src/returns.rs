//! Return-risk prediction for active loans.
//!
//! One prediction per unreturned loan: a base probability shaded by the
//! borrower's on-time history and by how close the due date is, clamped to
//! [0, 1].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stacksense_core::{BookId, LibrarySnapshot, Loan, LoanId, UserId};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnOutlook {
    LikelyOnTime,
    PossiblyDelayed,
    LikelyOverdue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnPrediction {
    pub loan_id: LoanId,
    pub book_id: BookId,
    pub book_title: String,
    pub user_id: UserId,
    pub due_at: DateTime<Utc>,
    /// Always clamped to [0, 1].
    pub return_probability: f64,
    pub predicted_status: ReturnOutlook,
}

const BASE_PROBABILITY: f64 = 0.8;

/// One prediction per active loan, in snapshot order.
pub fn return_predictions(snapshot: &LibrarySnapshot, now: DateTime<Utc>) -> Vec<ReturnPrediction> {
    snapshot
        .loans()
        .iter()
        .filter(|loan| loan.is_active())
        .map(|loan| predict(snapshot, loan, now))
        .collect()
}

fn predict(snapshot: &LibrarySnapshot, loan: &Loan, now: DateTime<Utc>) -> ReturnPrediction {
    let probability = return_probability(snapshot, loan, now);
    ReturnPrediction {
        loan_id: loan.id,
        book_id: loan.book_id,
        book_title: snapshot
            .book(loan.book_id)
            .map_or_else(|| "(unknown title)".to_string(), |b| b.title.clone()),
        user_id: loan.user_id,
        due_at: loan.due_at,
        return_probability: probability,
        predicted_status: predicted_status(probability),
    }
}

/// Base 0.8, scaled by the borrower's on-time rate, then by due-date
/// proximity (x0.5 overdue, x0.9 due within 3 days), clamped to [0, 1].
fn return_probability(snapshot: &LibrarySnapshot, loan: &Loan, now: DateTime<Utc>) -> f64 {
    let mut probability = BASE_PROBABILITY * on_time_rate(snapshot, loan.user_id);

    let days_until_due = (loan.due_at - now).num_days();
    if days_until_due < 0 {
        probability *= 0.5;
    } else if days_until_due < 3 {
        probability *= 0.9;
    }

    probability.clamp(0.0, 1.0)
}

/// On-time returns over the user's completed loans; 1.0 for users with no
/// completed loan history (open loans carry no evidence either way).
fn on_time_rate(snapshot: &LibrarySnapshot, user_id: UserId) -> f64 {
    let mut on_time = 0u64;
    let mut completed = 0u64;
    for loan in snapshot.loans_for_user(user_id) {
        if loan.is_returned() {
            completed += 1;
            if loan.returned_on_time() {
                on_time += 1;
            }
        }
    }
    if completed == 0 {
        1.0
    } else {
        on_time as f64 / completed as f64
    }
}

fn predicted_status(probability: f64) -> ReturnOutlook {
    if probability > 0.8 {
        ReturnOutlook::LikelyOnTime
    } else if probability > 0.5 {
        ReturnOutlook::PossiblyDelayed
    } else {
        ReturnOutlook::LikelyOverdue
    }
}
