//! User segmentation, reading patterns and retention risk.
//!
//! Segments are evaluated in strict precedence order: a heavy reader with a
//! pile of overdue books is still a power user, not at-risk. Pattern mining
//! (peak hours, top genres) runs over the whole loan history; retention
//! scoring combines activity recency with overdue history.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Months, Timelike, Utc};
use serde::{Deserialize, Serialize};

use stacksense_core::{LibrarySnapshot, User, UserId};

/// Segment precedence: first matching rule wins, top to bottom.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserSegment {
    PowerUser,
    Regular,
    AtRisk,
    NewUser,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskFactor {
    /// Terminal: the user has never borrowed anything.
    NoActivity,
    /// More than 60 days since the last loan.
    Inactive,
    /// More than 30% of loans returned late.
    HighOverdueRate,
    /// Fewer than 2 loans in the trailing 3 months.
    LowRecentActivity,
}

/// Per-user activity counters backing the segment decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserActivity {
    pub total_books_read: u64,
    pub active_book_count: u64,
    pub overdue_count: u64,
    /// Mean of the user's own review ratings, any approval state; 0 if none.
    pub average_rating: f64,
    pub review_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSegmentEntry {
    pub user_id: UserId,
    pub username: String,
    pub segment: UserSegment,
    pub activity: UserActivity,
}

/// Global borrowing habits mined from the full loan history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadingPatterns {
    /// Hour(s) of day with the maximum loan count, ascending. Ties yield
    /// multiple hours; empty history yields an empty list.
    pub peak_hours: Vec<u32>,
    /// The 3 most-borrowed genres, by volume desc then name.
    pub popular_genres: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetentionRisk {
    pub user_id: UserId,
    pub username: String,
    pub retention_score: f64,
    pub risk_level: RiskLevel,
    pub risk_factors: Vec<RiskFactor>,
}

/// Up to 5 quick genre-matched picks per user, for the behavior report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecommendations {
    pub user_id: UserId,
    pub username: String,
    pub titles: Vec<String>,
}

const QUICK_RECOMMENDATION_LIMIT: usize = 5;
const TOP_GENRES: usize = 3;

/// Classify every user, in id order.
pub fn user_segments(snapshot: &LibrarySnapshot, now: DateTime<Utc>) -> Vec<UserSegmentEntry> {
    snapshot
        .users()
        .map(|user| {
            let activity = activity(snapshot, user.id, now);
            UserSegmentEntry {
                user_id: user.id,
                username: user.username.clone(),
                segment: segment(&activity),
                activity,
            }
        })
        .collect()
}

fn activity(snapshot: &LibrarySnapshot, user_id: UserId, now: DateTime<Utc>) -> UserActivity {
    let mut total = 0u64;
    let mut active = 0u64;
    let mut overdue = 0u64;
    for loan in snapshot.loans_for_user(user_id) {
        total += 1;
        if loan.is_active() {
            active += 1;
            if loan.is_overdue(now) {
                overdue += 1;
            }
        }
    }

    let mut rating_sum = 0u32;
    let mut review_count = 0u64;
    for review in snapshot.reviews_for_user(user_id) {
        rating_sum += u32::from(review.rating);
        review_count += 1;
    }
    let average_rating = if review_count == 0 {
        0.0
    } else {
        f64::from(rating_sum) / review_count as f64
    };

    UserActivity {
        total_books_read: total,
        active_book_count: active,
        overdue_count: overdue,
        average_rating,
        review_count,
    }
}

fn segment(activity: &UserActivity) -> UserSegment {
    if activity.total_books_read >= 20 && activity.average_rating >= 4.0 {
        UserSegment::PowerUser
    } else if activity.total_books_read >= 10 {
        UserSegment::Regular
    } else if activity.overdue_count > 2 {
        UserSegment::AtRisk
    } else {
        UserSegment::NewUser
    }
}

/// Mine peak borrowing hours and the most popular genres.
pub fn reading_patterns(snapshot: &LibrarySnapshot) -> ReadingPatterns {
    let mut hourly: BTreeMap<u32, u64> = BTreeMap::new();
    for loan in snapshot.loans() {
        *hourly.entry(loan.borrowed_at.hour()).or_default() += 1;
    }
    let peak_hours = match hourly.values().max().copied() {
        None => Vec::new(),
        Some(max) => hourly
            .iter()
            .filter(|&(_, &count)| count == max)
            .map(|(&hour, _)| hour)
            .collect(),
    };

    let mut genre_counts: BTreeMap<String, u64> = BTreeMap::new();
    for loan in snapshot.loans() {
        if let Some(book) = snapshot.book(loan.book_id) {
            *genre_counts.entry(book.genre.clone()).or_default() += 1;
        }
    }
    let mut ranked: Vec<(String, u64)> = genre_counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    let popular_genres = ranked
        .into_iter()
        .take(TOP_GENRES)
        .map(|(genre, _)| genre)
        .collect();

    ReadingPatterns {
        peak_hours,
        popular_genres,
    }
}

/// Score every user's retention risk, in id order.
pub fn retention_risk(snapshot: &LibrarySnapshot, now: DateTime<Utc>) -> Vec<RetentionRisk> {
    snapshot
        .users()
        .map(|user| score_user(snapshot, user, now))
        .collect()
}

fn score_user(snapshot: &LibrarySnapshot, user: &User, now: DateTime<Utc>) -> RetentionRisk {
    let loans: Vec<_> = snapshot.loans_for_user(user.id).collect();

    if loans.is_empty() {
        return RetentionRisk {
            user_id: user.id,
            username: user.username.clone(),
            retention_score: 0.0,
            risk_level: RiskLevel::High,
            risk_factors: vec![RiskFactor::NoActivity],
        };
    }

    let last_borrowed = loans
        .iter()
        .map(|l| l.borrowed_at)
        .max()
        .unwrap_or(now);
    let days_since_last = (now - last_borrowed).num_days();
    let activity_score = (1.0 - days_since_last as f64 / 90.0).max(0.0);

    let late = loans.iter().filter(|l| l.returned_late()).count();
    let overdue_ratio = late as f64 / loans.len() as f64;

    let retention_score = 0.7 * activity_score + 0.3 * (1.0 - 0.5 * overdue_ratio);

    let mut risk_factors = Vec::new();
    if days_since_last > 60 {
        risk_factors.push(RiskFactor::Inactive);
    }
    if overdue_ratio > 0.3 {
        risk_factors.push(RiskFactor::HighOverdueRate);
    }
    let three_months_ago = now
        .checked_sub_months(Months::new(3))
        .unwrap_or(now - Duration::days(90));
    let recent = loans
        .iter()
        .filter(|l| l.borrowed_at > three_months_ago)
        .count();
    if recent < 2 {
        risk_factors.push(RiskFactor::LowRecentActivity);
    }

    RetentionRisk {
        user_id: user.id,
        username: user.username.clone(),
        retention_score,
        risk_level: risk_level(retention_score),
        risk_factors,
    }
}

fn risk_level(score: f64) -> RiskLevel {
    if score >= 0.8 {
        RiskLevel::Low
    } else if score >= 0.5 {
        RiskLevel::Medium
    } else {
        RiskLevel::High
    }
}

/// Per-user quick picks: unborrowed books in genres the user has borrowed
/// before, title-ordered, capped at 5.
pub fn quick_recommendations(snapshot: &LibrarySnapshot) -> Vec<UserRecommendations> {
    snapshot
        .users()
        .map(|user| {
            let mut seen_genres: Vec<&str> = Vec::new();
            let mut borrowed: Vec<_> = Vec::new();
            for loan in snapshot.loans_for_user(user.id) {
                borrowed.push(loan.book_id);
                if let Some(book) = snapshot.book(loan.book_id) {
                    if !seen_genres.contains(&book.genre.as_str()) {
                        seen_genres.push(&book.genre);
                    }
                }
            }

            let mut titles: Vec<String> = snapshot
                .books()
                .filter(|book| seen_genres.contains(&book.genre.as_str()))
                .filter(|book| !borrowed.contains(&book.id))
                .map(|book| book.title.clone())
                .collect();
            titles.sort();
            titles.truncate(QUICK_RECOMMENDATION_LIMIT);

            UserRecommendations {
                user_id: user.id,
                username: user.username.clone(),
                titles,
            }
        })
        .collect()
}
