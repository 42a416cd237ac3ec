//! Catalog entities.
//!
//! Plain read-only facts: the derivation layer never creates, mutates or
//! deletes them. References between entities are id-keyed (looked up in the
//! snapshot arenas), never embedded back-references.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AnalyticsError, AnalyticsResult};
use crate::id::{AuthorId, BookId, LoanId, ReviewId, UserId};

/// A catalog entry with one or more physical copies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub id: BookId,
    pub title: String,
    pub genre: String,
    pub total_copies: u32,
    pub available_copies: u32,
    pub authors: BTreeSet<AuthorId>,
}

impl Book {
    /// Validate copy-count consistency: 0 <= available <= total.
    pub fn new(
        id: BookId,
        title: impl Into<String>,
        genre: impl Into<String>,
        total_copies: u32,
        available_copies: u32,
        authors: BTreeSet<AuthorId>,
    ) -> AnalyticsResult<Self> {
        if available_copies > total_copies {
            return Err(AnalyticsError::validation(format!(
                "available_copies ({available_copies}) exceeds total_copies ({total_copies})"
            )));
        }
        Ok(Self {
            id,
            title: title.into(),
            genre: genre.into(),
            total_copies,
            available_copies,
            authors,
        })
    }

    /// True when the two books share at least one author.
    pub fn shares_author(&self, other: &Book) -> bool {
        self.authors.iter().any(|a| other.authors.contains(a))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub id: AuthorId,
    pub name: String,
}

/// A library member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
}

/// Lifecycle of a loan, derived from `returned_at` and the due date.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoanStatus {
    Borrowed,
    Returned,
    Overdue,
}

/// One copy of a book borrowed by a user until returned.
///
/// Append-only history: once `returned_at` is set it is never cleared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Loan {
    pub id: LoanId,
    pub book_id: BookId,
    pub user_id: UserId,
    pub borrowed_at: DateTime<Utc>,
    pub due_at: DateTime<Utc>,
    pub returned_at: Option<DateTime<Utc>>,
}

impl Loan {
    pub fn is_returned(&self) -> bool {
        self.returned_at.is_some()
    }

    /// Unreturned, regardless of due date.
    pub fn is_active(&self) -> bool {
        self.returned_at.is_none()
    }

    /// Unreturned and past due as of `now`.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.returned_at.is_none() && self.due_at < now
    }

    /// Returned at or before the due date.
    pub fn returned_on_time(&self) -> bool {
        matches!(self.returned_at, Some(returned) if returned <= self.due_at)
    }

    /// Returned after the due date.
    pub fn returned_late(&self) -> bool {
        matches!(self.returned_at, Some(returned) if returned > self.due_at)
    }

    /// Status consistent with `returned_at` and the due date as of `now`.
    pub fn status(&self, now: DateTime<Utc>) -> LoanStatus {
        if self.is_returned() {
            LoanStatus::Returned
        } else if self.due_at < now {
            LoanStatus::Overdue
        } else {
            LoanStatus::Borrowed
        }
    }
}

/// A member's rating of a book.
///
/// Only approved reviews contribute to rating aggregates exposed outside the
/// owning user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub id: ReviewId,
    pub book_id: BookId,
    pub user_id: UserId,
    pub rating: u8,
    pub created_at: DateTime<Utc>,
    pub approved: bool,
}

impl Review {
    /// Validate the rating range [1, 5].
    pub fn new(
        id: ReviewId,
        book_id: BookId,
        user_id: UserId,
        rating: u8,
        created_at: DateTime<Utc>,
        approved: bool,
    ) -> AnalyticsResult<Self> {
        if !(1..=5).contains(&rating) {
            return Err(AnalyticsError::validation(format!(
                "rating must be in [1, 5], got {rating}"
            )));
        }
        Ok(Self {
            id,
            book_id,
            user_id,
            rating,
            created_at,
            approved,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn ts(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, day, hour, 0, 0).unwrap()
    }

    #[test]
    fn book_rejects_more_available_than_total() {
        let err = Book::new(
            BookId::new(),
            "Dune",
            "Science Fiction",
            2,
            3,
            BTreeSet::new(),
        )
        .unwrap_err();
        assert!(matches!(err, AnalyticsError::Validation(_)));
    }

    #[test]
    fn review_rejects_out_of_range_rating() {
        for rating in [0u8, 6] {
            let err = Review::new(
                ReviewId::new(),
                BookId::new(),
                UserId::new(),
                rating,
                ts(1, 9),
                true,
            )
            .unwrap_err();
            assert!(matches!(err, AnalyticsError::Validation(_)));
        }
    }

    #[test]
    fn loan_status_tracks_return_and_due_date() {
        let mut loan = Loan {
            id: LoanId::new(),
            book_id: BookId::new(),
            user_id: UserId::new(),
            borrowed_at: ts(1, 10),
            due_at: ts(10, 10),
            returned_at: None,
        };

        assert_eq!(loan.status(ts(5, 0)), LoanStatus::Borrowed);
        assert_eq!(loan.status(ts(11, 0)), LoanStatus::Overdue);
        assert!(loan.is_overdue(ts(11, 0)));

        loan.returned_at = Some(ts(9, 12));
        assert_eq!(loan.status(ts(11, 0)), LoanStatus::Returned);
        assert!(loan.returned_on_time());
        assert!(!loan.returned_late());

        loan.returned_at = Some(ts(12, 0));
        assert!(loan.returned_late());
    }

    proptest! {
        /// `status` agrees with the predicate helpers for every combination
        /// of due date, return date and observation instant.
        #[test]
        fn loan_status_agrees_with_predicates(
            due_day in 2u32..28,
            now_day in 1u32..28,
            returned_day in proptest::option::of(2u32..28),
        ) {
            let loan = Loan {
                id: LoanId::new(),
                book_id: BookId::new(),
                user_id: UserId::new(),
                borrowed_at: ts(1, 9),
                due_at: ts(due_day, 9),
                returned_at: returned_day.map(|d| ts(d, 9)),
            };
            let now = ts(now_day, 9);

            match loan.status(now) {
                LoanStatus::Returned => prop_assert!(loan.is_returned()),
                LoanStatus::Overdue => {
                    prop_assert!(loan.is_active());
                    prop_assert!(loan.is_overdue(now));
                }
                LoanStatus::Borrowed => {
                    prop_assert!(loan.is_active());
                    prop_assert!(!loan.is_overdue(now));
                }
            }
            if loan.is_returned() {
                prop_assert!(loan.returned_on_time() != loan.returned_late());
            }
        }
    }
}
