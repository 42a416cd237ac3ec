//! Popularity scoring and trend classification.
//!
//! Per-book popularity combines recent borrow volume with recent approved
//! ratings; the trend compares the trailing 30-day window against the 30 days
//! before it. Genre trends average the per-book numbers across a genre.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use stacksense_core::{Book, BookId, LibrarySnapshot};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Rising,
    Stable,
    Falling,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationStrength {
    Strong,
    Moderate,
    Weak,
}

/// Popularity and trend of one book over the trailing 30-day window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookTrend {
    pub book_id: BookId,
    pub title: String,
    pub recent_lendings: u64,
    /// Mean approved rating of reviews created in the window; 0 if none.
    pub recent_rating: f64,
    /// In [0, 1].
    pub popularity_score: f64,
    pub trend: TrendDirection,
}

/// Aggregated trend for one genre.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenreTrend {
    pub genre: String,
    pub popularity_score: f64,
    pub trend: TrendDirection,
    pub recommendation_strength: RecommendationStrength,
}

const WINDOW: Duration = Duration::days(30);
const BOOK_CHANGE_THRESHOLD: f64 = 20.0;
const GENRE_CHANGE_THRESHOLD: f64 = 15.0;

/// Per-book popularity trends, ranked best-first (score desc, then title).
pub fn popularity_trends(snapshot: &LibrarySnapshot, now: DateTime<Utc>) -> Vec<BookTrend> {
    let mut trends: Vec<BookTrend> = snapshot
        .books()
        .map(|book| book_trend(snapshot, book, now))
        .collect();
    trends.sort_by(|a, b| {
        b.popularity_score
            .total_cmp(&a.popularity_score)
            .then_with(|| a.title.cmp(&b.title))
            .then_with(|| a.book_id.cmp(&b.book_id))
    });
    trends
}

/// Per-genre trends, ranked by popularity score descending.
pub fn genre_trends(snapshot: &LibrarySnapshot, now: DateTime<Utc>) -> Vec<GenreTrend> {
    let mut by_genre: BTreeMap<&str, Vec<&Book>> = BTreeMap::new();
    for book in snapshot.books() {
        by_genre.entry(book.genre.as_str()).or_default().push(book);
    }

    let mut trends: Vec<GenreTrend> = by_genre
        .into_iter()
        .map(|(genre, books)| {
            let n = books.len() as f64;
            let mut score_sum = 0.0;
            let mut change_sum = 0.0;
            for book in &books {
                let (recent, previous) = window_counts(snapshot, book.id, now);
                let rating = recent_rating(snapshot, book.id, now);
                score_sum += popularity_score(recent, rating);
                change_sum += change_percent(recent, previous);
            }
            let popularity = score_sum / n;
            let trend = classify(change_sum / n, GENRE_CHANGE_THRESHOLD);
            GenreTrend {
                genre: genre.to_string(),
                popularity_score: popularity,
                trend,
                recommendation_strength: recommendation_strength(popularity, trend),
            }
        })
        .collect();

    trends.sort_by(|a, b| {
        b.popularity_score
            .total_cmp(&a.popularity_score)
            .then_with(|| a.genre.cmp(&b.genre))
    });
    trends
}

fn book_trend(snapshot: &LibrarySnapshot, book: &Book, now: DateTime<Utc>) -> BookTrend {
    let (recent, previous) = window_counts(snapshot, book.id, now);
    let rating = recent_rating(snapshot, book.id, now);
    BookTrend {
        book_id: book.id,
        title: book.title.clone(),
        recent_lendings: recent,
        recent_rating: rating,
        popularity_score: popularity_score(recent, rating),
        trend: classify(change_percent(recent, previous), BOOK_CHANGE_THRESHOLD),
    }
}

/// Loan counts in [now-30d, now] and [now-60d, now-30d).
fn window_counts(snapshot: &LibrarySnapshot, book_id: BookId, now: DateTime<Utc>) -> (u64, u64) {
    let window_start = now - WINDOW;
    let previous_start = now - WINDOW - WINDOW;
    let mut recent = 0;
    let mut previous = 0;
    for loan in snapshot.loans_for_book(book_id) {
        if loan.borrowed_at > window_start {
            recent += 1;
        } else if loan.borrowed_at > previous_start {
            previous += 1;
        }
    }
    (recent, previous)
}

/// Mean approved rating of reviews created inside the trailing window.
fn recent_rating(snapshot: &LibrarySnapshot, book_id: BookId, now: DateTime<Utc>) -> f64 {
    let window_start = now - WINDOW;
    let mut sum = 0u32;
    let mut count = 0u32;
    for review in snapshot.approved_reviews_for_book(book_id) {
        if review.created_at > window_start {
            sum += u32::from(review.rating);
            count += 1;
        }
    }
    if count == 0 {
        0.0
    } else {
        f64::from(sum) / f64::from(count)
    }
}

/// Weighted combination of normalized lendings (0.6) and rating (0.4),
/// clamped to [0, 1].
pub fn popularity_score(lendings: u64, rating: f64) -> f64 {
    let normalized_lendings = (lendings as f64 / 10.0).min(1.0);
    let normalized_rating = rating / 5.0;
    (normalized_lendings * 0.6 + normalized_rating * 0.4).clamp(0.0, 1.0)
}

/// Relative change of the recent window over the previous one, in percent.
fn change_percent(recent: u64, previous: u64) -> f64 {
    (recent as f64 - previous as f64) / (previous.max(1) as f64) * 100.0
}

fn classify(change: f64, threshold: f64) -> TrendDirection {
    if change > threshold {
        TrendDirection::Rising
    } else if change < -threshold {
        TrendDirection::Falling
    } else {
        TrendDirection::Stable
    }
}

fn recommendation_strength(score: f64, trend: TrendDirection) -> RecommendationStrength {
    if score > 0.7 && trend == TrendDirection::Rising {
        RecommendationStrength::Strong
    } else if score > 0.5 || trend == TrendDirection::Rising {
        RecommendationStrength::Moderate
    } else {
        RecommendationStrength::Weak
    }
}
