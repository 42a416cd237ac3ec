//! Inventory health, demand outlook, acquisition and maintenance advice.
//!
//! All per-book numbers come from the snapshot's loan index; urgency sorts
//! use the enum ordinals, so `Urgent` really outranks `High` (sorting the
//! label text would put "HIGH" before "MEDIUM" before "URGENT").

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Duration, Utc};
use serde::{Deserialize, Serialize};

use stacksense_core::{Book, BookId, LibrarySnapshot, Loan};

/// Physical condition, estimated from lifetime circulation.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookCondition {
    Good,
    Moderate,
    Worn,
    NeedsReplacement,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaintenanceType {
    None,
    MinorRepair,
    MajorRepair,
    Replacement,
}

/// Acquisition urgency; ordinal order is the sort order.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AcquisitionPriority {
    Low,
    Medium,
    High,
}

/// Maintenance urgency; ordinal order is the sort order.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaintenancePriority {
    Low,
    Medium,
    High,
    Urgent,
}

/// Why an acquisition is recommended; first matching rule wins.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AcquisitionReason {
    ReplacementNeeded,
    HighUtilization,
    IncreasingDemand,
    NormalReplenishment,
}

/// Per-book utilization and wear metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryHealth {
    pub book_id: BookId,
    pub title: String,
    pub total_copies: u32,
    pub available_copies: u32,
    /// Fraction of copies currently on loan; 0.0 when there are no copies.
    pub utilization: f64,
    /// Loans per day over the trailing 30 days.
    pub turnover_rate: f64,
    pub condition: BookCondition,
}

/// Per-book demand rates over short, medium and long horizons.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemandOutlook {
    pub book_id: BookId,
    pub title: String,
    /// Trailing-7-day loans per day.
    pub current_demand: f64,
    /// Seasonally adjusted projections, loans per day.
    pub short_term: f64,
    pub medium_term: f64,
    pub long_term: f64,
    /// Lifetime loan count per calendar month name.
    pub seasonality: BTreeMap<String, u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcquisitionRecommendation {
    pub book_id: BookId,
    pub title: String,
    /// Additional copies to acquire; entries with 0 are filtered out.
    pub recommended_copies: u32,
    pub priority: AcquisitionPriority,
    pub reason: AcquisitionReason,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaintenanceNeed {
    pub book_id: BookId,
    pub title: String,
    pub condition: BookCondition,
    pub maintenance_type: MaintenanceType,
    pub priority: MaintenancePriority,
    pub estimated_cost: f64,
}

/// Utilization, turnover and condition for every book, in catalog order.
pub fn inventory_health(snapshot: &LibrarySnapshot, now: DateTime<Utc>) -> Vec<InventoryHealth> {
    snapshot
        .books()
        .map(|book| InventoryHealth {
            book_id: book.id,
            title: book.title.clone(),
            total_copies: book.total_copies,
            available_copies: book.available_copies,
            utilization: utilization(snapshot, book),
            turnover_rate: loans_in_trailing_days(snapshot, book.id, now, 30) as f64 / 30.0,
            condition: condition(snapshot.loan_count_for_book(book.id)),
        })
        .collect()
}

/// Demand rates and seasonality for every book, in catalog order.
pub fn demand_outlooks(snapshot: &LibrarySnapshot, now: DateTime<Utc>) -> Vec<DemandOutlook> {
    snapshot
        .books()
        .map(|book| {
            let mut seasonality: BTreeMap<String, u64> = BTreeMap::new();
            for loan in snapshot.loans_for_book(book.id) {
                let key = loan.borrowed_at.format("%B").to_string();
                *seasonality.entry(key).or_default() += 1;
            }
            DemandOutlook {
                book_id: book.id,
                title: book.title.clone(),
                current_demand: loans_in_trailing_days(snapshot, book.id, now, 7) as f64 / 7.0,
                short_term: projection(snapshot, book.id, now, 7),
                medium_term: projection(snapshot, book.id, now, 30),
                long_term: projection(snapshot, book.id, now, 90),
                seasonality,
            }
        })
        .collect()
}

/// Books worth acquiring more copies of, most urgent first.
pub fn acquisition_recommendations(
    snapshot: &LibrarySnapshot,
    now: DateTime<Utc>,
) -> Vec<AcquisitionRecommendation> {
    let mut recommendations: Vec<AcquisitionRecommendation> = snapshot
        .books()
        .filter_map(|book| {
            let projected = projection(snapshot, book.id, now, 30);
            let recommended = ((projected * 1.5).ceil() as i64 - i64::from(book.total_copies))
                .max(0) as u32;
            if recommended == 0 {
                return None;
            }
            let util = utilization(snapshot, book);
            let trend = demand_trend(snapshot, book.id, now);
            Some(AcquisitionRecommendation {
                book_id: book.id,
                title: book.title.clone(),
                recommended_copies: recommended,
                priority: acquisition_priority(util, trend),
                reason: acquisition_reason(snapshot, book, util, trend),
            })
        })
        .collect();

    recommendations.sort_by(|a, b| {
        b.priority
            .cmp(&a.priority)
            .then_with(|| a.title.cmp(&b.title))
            .then_with(|| a.book_id.cmp(&b.book_id))
    });
    recommendations
}

/// Books needing repair or replacement, most urgent first.
pub fn maintenance_needs(snapshot: &LibrarySnapshot) -> Vec<MaintenanceNeed> {
    let mut needs: Vec<MaintenanceNeed> = snapshot
        .books()
        .filter_map(|book| {
            let lifetime = snapshot.loan_count_for_book(book.id);
            let maintenance_type = maintenance_type(lifetime);
            if maintenance_type == MaintenanceType::None {
                return None;
            }
            let cond = condition(lifetime);
            let util = utilization(snapshot, book);
            Some(MaintenanceNeed {
                book_id: book.id,
                title: book.title.clone(),
                condition: cond,
                maintenance_type,
                priority: maintenance_priority(cond, util),
                estimated_cost: estimated_cost(maintenance_type),
            })
        })
        .collect();

    needs.sort_by(|a, b| {
        b.priority
            .cmp(&a.priority)
            .then_with(|| a.title.cmp(&b.title))
            .then_with(|| a.book_id.cmp(&b.book_id))
    });
    needs
}

/// Active loans over total copies; defined as 0.0 for zero-copy entries.
fn utilization(snapshot: &LibrarySnapshot, book: &Book) -> f64 {
    if book.total_copies == 0 {
        return 0.0;
    }
    let active = snapshot
        .loans_for_book(book.id)
        .filter(|l| l.is_active())
        .count();
    active as f64 / f64::from(book.total_copies)
}

fn loans_in_trailing_days(
    snapshot: &LibrarySnapshot,
    book_id: BookId,
    now: DateTime<Utc>,
    days: i64,
) -> u64 {
    let start = now - Duration::days(days);
    snapshot
        .loans_for_book(book_id)
        .filter(|l| l.borrowed_at > start)
        .count() as u64
}

/// Trailing-rate projection scaled by the current month's seasonal factor.
fn projection(snapshot: &LibrarySnapshot, book_id: BookId, now: DateTime<Utc>, days: i64) -> f64 {
    let base = loans_in_trailing_days(snapshot, book_id, now, days) as f64 / days as f64;
    base * monthly_seasonal_factor(snapshot.loans_for_book(book_id), now)
}

/// Current month's historical mean loan count over the overall monthly mean;
/// 1.0 with no history or when the month was never observed.
fn monthly_seasonal_factor<'a>(
    loans: impl Iterator<Item = &'a Loan>,
    now: DateTime<Utc>,
) -> f64 {
    let mut monthly: BTreeMap<u32, u64> = BTreeMap::new();
    for loan in loans {
        *monthly.entry(loan.borrowed_at.month()).or_default() += 1;
    }
    if monthly.is_empty() {
        return 1.0;
    }
    let average = monthly.values().map(|&c| c as f64).sum::<f64>() / monthly.len() as f64;
    if average == 0.0 {
        return 1.0;
    }
    monthly
        .get(&now.month())
        .map_or(1.0, |&count| count as f64 / average)
}

/// Last 30 days over the 30 days before; 1.0 when the prior period is empty.
fn demand_trend(snapshot: &LibrarySnapshot, book_id: BookId, now: DateTime<Utc>) -> f64 {
    let thirty_days_ago = now - Duration::days(30);
    let sixty_days_ago = now - Duration::days(60);
    let mut recent = 0u64;
    let mut previous = 0u64;
    for loan in snapshot.loans_for_book(book_id) {
        if loan.borrowed_at > thirty_days_ago {
            recent += 1;
        } else if loan.borrowed_at > sixty_days_ago {
            previous += 1;
        }
    }
    if previous == 0 {
        1.0
    } else {
        recent as f64 / previous as f64
    }
}

fn condition(lifetime_loans: usize) -> BookCondition {
    if lifetime_loans > 100 {
        BookCondition::NeedsReplacement
    } else if lifetime_loans > 50 {
        BookCondition::Worn
    } else if lifetime_loans > 20 {
        BookCondition::Moderate
    } else {
        BookCondition::Good
    }
}

fn maintenance_type(lifetime_loans: usize) -> MaintenanceType {
    if lifetime_loans > 100 {
        MaintenanceType::Replacement
    } else if lifetime_loans > 50 {
        MaintenanceType::MajorRepair
    } else if lifetime_loans > 20 {
        MaintenanceType::MinorRepair
    } else {
        MaintenanceType::None
    }
}

fn acquisition_priority(utilization: f64, demand_trend: f64) -> AcquisitionPriority {
    if utilization > 0.9 && demand_trend > 1.5 {
        AcquisitionPriority::High
    } else if utilization > 0.7 || demand_trend > 1.2 {
        AcquisitionPriority::Medium
    } else {
        AcquisitionPriority::Low
    }
}

fn acquisition_reason(
    snapshot: &LibrarySnapshot,
    book: &Book,
    utilization: f64,
    demand_trend: f64,
) -> AcquisitionReason {
    if condition(snapshot.loan_count_for_book(book.id)) == BookCondition::NeedsReplacement {
        AcquisitionReason::ReplacementNeeded
    } else if utilization > 0.9 {
        AcquisitionReason::HighUtilization
    } else if demand_trend > 1.5 {
        AcquisitionReason::IncreasingDemand
    } else {
        AcquisitionReason::NormalReplenishment
    }
}

fn maintenance_priority(condition: BookCondition, utilization: f64) -> MaintenancePriority {
    if condition == BookCondition::NeedsReplacement && utilization > 0.7 {
        MaintenancePriority::Urgent
    } else if condition == BookCondition::Worn && utilization > 0.5 {
        MaintenancePriority::High
    } else if condition == BookCondition::Moderate && utilization > 0.7 {
        MaintenancePriority::Medium
    } else {
        MaintenancePriority::Low
    }
}

fn estimated_cost(maintenance_type: MaintenanceType) -> f64 {
    match maintenance_type {
        MaintenanceType::Replacement => 50.0,
        MaintenanceType::MajorRepair => 25.0,
        MaintenanceType::MinorRepair => 10.0,
        MaintenanceType::None => 0.0,
    }
}
