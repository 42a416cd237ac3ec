//! Aggregate catalog statistics.
//!
//! Counts, top-10 rankings and histograms over the whole snapshot. No error
//! conditions: an empty snapshot yields all-zero/empty outputs.

use std::collections::BTreeMap;

use chrono::{DateTime, Months, Utc};
use serde::{Deserialize, Serialize};

use stacksense_core::{BookId, LibrarySnapshot, UserId};

/// One entry of the most-borrowed ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopBook {
    pub book_id: BookId,
    pub title: String,
    pub loan_count: u64,
}

/// One entry of the most-active-members ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopUser {
    pub user_id: UserId,
    pub username: String,
    pub loan_count: u64,
}

/// One entry of the highest-rated ranking (approved reviews only).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopRatedBook {
    pub book_id: BookId,
    pub title: String,
    pub average_rating: f64,
}

/// Aggregate statistics for the whole catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LibraryStats {
    pub total_books: u64,
    pub total_members: u64,
    pub total_authors: u64,
    /// Loans with no return date.
    pub active_lendings: u64,
    /// Unreturned loans past their due date.
    pub overdue_books: u64,
    /// Mean rating of all approved reviews; 0 if there are none.
    pub average_rating: f64,
    pub most_borrowed_books: Vec<TopBook>,
    pub most_active_members: Vec<TopUser>,
    pub highest_rated_books: Vec<TopRatedBook>,
    /// Catalog entries per genre.
    pub books_by_genre: BTreeMap<String, u64>,
    /// Loans borrowed in the trailing 12 months, keyed by "YYYY-MM".
    pub lendings_by_month: BTreeMap<String, u64>,
}

const TOP_N: usize = 10;

/// Compute the aggregate statistics for one snapshot.
pub fn library_stats(snapshot: &LibrarySnapshot, now: DateTime<Utc>) -> LibraryStats {
    let active_lendings = snapshot.loans().iter().filter(|l| l.is_active()).count() as u64;
    let overdue_books = snapshot
        .loans()
        .iter()
        .filter(|l| l.is_overdue(now))
        .count() as u64;

    let approved: Vec<u8> = snapshot
        .reviews()
        .iter()
        .filter(|r| r.approved)
        .map(|r| r.rating)
        .collect();
    let average_rating = if approved.is_empty() {
        0.0
    } else {
        approved.iter().map(|&r| f64::from(r)).sum::<f64>() / approved.len() as f64
    };

    // Top-10 most borrowed: count desc, then title, then id.
    let mut most_borrowed: Vec<TopBook> = snapshot
        .books()
        .filter_map(|book| {
            let count = snapshot.loan_count_for_book(book.id) as u64;
            (count > 0).then(|| TopBook {
                book_id: book.id,
                title: book.title.clone(),
                loan_count: count,
            })
        })
        .collect();
    most_borrowed.sort_by(|a, b| {
        b.loan_count
            .cmp(&a.loan_count)
            .then_with(|| a.title.cmp(&b.title))
            .then_with(|| a.book_id.cmp(&b.book_id))
    });
    most_borrowed.truncate(TOP_N);

    // Top-10 most active members: count desc, then username, then id.
    let mut most_active: Vec<TopUser> = snapshot
        .users()
        .filter_map(|user| {
            let count = snapshot.loans_for_user(user.id).count() as u64;
            (count > 0).then(|| TopUser {
                user_id: user.id,
                username: user.username.clone(),
                loan_count: count,
            })
        })
        .collect();
    most_active.sort_by(|a, b| {
        b.loan_count
            .cmp(&a.loan_count)
            .then_with(|| a.username.cmp(&b.username))
            .then_with(|| a.user_id.cmp(&b.user_id))
    });
    most_active.truncate(TOP_N);

    // Top-10 highest rated among books with at least one approved review.
    let mut highest_rated: Vec<TopRatedBook> = snapshot
        .books()
        .filter_map(|book| {
            snapshot.mean_approved_rating(book.id).map(|rating| TopRatedBook {
                book_id: book.id,
                title: book.title.clone(),
                average_rating: rating,
            })
        })
        .collect();
    highest_rated.sort_by(|a, b| {
        b.average_rating
            .total_cmp(&a.average_rating)
            .then_with(|| a.title.cmp(&b.title))
            .then_with(|| a.book_id.cmp(&b.book_id))
    });
    highest_rated.truncate(TOP_N);

    let mut books_by_genre: BTreeMap<String, u64> = BTreeMap::new();
    for book in snapshot.books() {
        *books_by_genre.entry(book.genre.clone()).or_default() += 1;
    }

    let twelve_months_ago = now
        .checked_sub_months(Months::new(12))
        .unwrap_or(DateTime::<Utc>::MIN_UTC);
    let mut lendings_by_month: BTreeMap<String, u64> = BTreeMap::new();
    for loan in snapshot.loans() {
        if loan.borrowed_at > twelve_months_ago {
            let key = loan.borrowed_at.format("%Y-%m").to_string();
            *lendings_by_month.entry(key).or_default() += 1;
        }
    }

    LibraryStats {
        total_books: snapshot.book_count() as u64,
        total_members: snapshot.user_count() as u64,
        total_authors: snapshot.author_count() as u64,
        active_lendings,
        overdue_books,
        average_rating,
        most_borrowed_books: most_borrowed,
        most_active_members: most_active,
        highest_rated_books: highest_rated,
        books_by_genre,
        lendings_by_month,
    }
}
