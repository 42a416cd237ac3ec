//! `stacksense-reports` — report orchestration.
//!
//! Fetches one snapshot per report from the [`EntityStore`] (the single
//! fatal failure point), fans out to the analytic components, and assembles
//! their outputs into the report structures the presentation layer consumes.
//! A malformed catalog entry never aborts a batch: the item is skipped and
//! reported as a diagnostic.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use stacksense_analytics::demand::{self, DemandPoint, DEFAULT_HORIZON_DAYS};
use stacksense_analytics::inventory::{
    self, AcquisitionRecommendation, DemandOutlook, InventoryHealth, MaintenanceNeed,
};
use stacksense_analytics::metrics::{self, LibraryStats};
use stacksense_analytics::recommend;
use stacksense_analytics::returns::{self, ReturnPrediction};
use stacksense_analytics::segments::{
    self, ReadingPatterns, RetentionRisk, UserRecommendations, UserSegmentEntry,
};
use stacksense_analytics::trends::{self, BookTrend, GenreTrend};
use stacksense_core::{
    AnalyticsError, AnalyticsResult, Book, BookId, Clock, LibrarySnapshot, Loan, SnapshotBuilder,
    UserId,
};
use stacksense_store::EntityStore;

/// A per-item computation problem that was isolated instead of aborting the
/// batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportDiagnostic {
    pub book_id: BookId,
    pub detail: String,
}

/// Output of [`ReportService::inventory_analysis`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryAnalysis {
    pub inventory_health: Vec<InventoryHealth>,
    pub demand_predictions: Vec<DemandOutlook>,
    pub acquisition_recommendations: Vec<AcquisitionRecommendation>,
    pub maintenance_needs: Vec<MaintenanceNeed>,
    pub diagnostics: Vec<ReportDiagnostic>,
}

/// Output of [`ReportService::predictions`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Predictions {
    pub demand_forecast: Vec<DemandPoint>,
    pub popularity_trends: Vec<BookTrend>,
    pub return_predictions: Vec<ReturnPrediction>,
    pub genre_trends: Vec<GenreTrend>,
}

/// Output of [`ReportService::user_behavior`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserBehaviorAnalysis {
    pub user_segments: Vec<UserSegmentEntry>,
    pub reading_patterns: ReadingPatterns,
    pub user_recommendations: Vec<UserRecommendations>,
    pub retention_risk: Vec<RetentionRisk>,
}

/// Report orchestrator over an entity store and a clock.
///
/// Every operation fetches a fresh snapshot; nothing is cached between
/// calls, so components always agree on one point-in-time view.
pub struct ReportService<S, C> {
    store: S,
    clock: C,
}

impl<S: EntityStore, C: Clock> ReportService<S, C> {
    pub fn new(store: S, clock: C) -> Self {
        Self { store, clock }
    }

    fn snapshot(&self) -> AnalyticsResult<LibrarySnapshot> {
        self.store
            .fetch_snapshot()
            .map_err(|e| AnalyticsError::store_unavailable(e.to_string()))
    }

    /// Aggregate catalog statistics.
    pub fn library_stats(&self) -> AnalyticsResult<LibraryStats> {
        let snapshot = self.snapshot()?;
        let now = self.clock.now();
        debug!(books = snapshot.book_count(), loans = snapshot.loans().len(), "computing library stats");
        Ok(metrics::library_stats(&snapshot, now))
    }

    /// Inventory health, demand outlook, acquisition and maintenance advice.
    ///
    /// Malformed catalog entries are skipped and surfaced as diagnostics
    /// rather than aborting the whole analysis.
    pub fn inventory_analysis(&self) -> AnalyticsResult<InventoryAnalysis> {
        let snapshot = self.snapshot()?;
        let now = self.clock.now();
        let (snapshot, diagnostics) = sanitize(snapshot);
        if !diagnostics.is_empty() {
            info!(skipped = diagnostics.len(), "inventory analysis skipped malformed entries");
        }

        Ok(InventoryAnalysis {
            inventory_health: inventory::inventory_health(&snapshot, now),
            demand_predictions: inventory::demand_outlooks(&snapshot, now),
            acquisition_recommendations: inventory::acquisition_recommendations(&snapshot, now),
            maintenance_needs: inventory::maintenance_needs(&snapshot),
            diagnostics,
        })
    }

    /// Demand forecast, popularity/genre trends and return predictions.
    pub fn predictions(&self) -> AnalyticsResult<Predictions> {
        let snapshot = self.snapshot()?;
        let now = self.clock.now();
        Ok(Predictions {
            demand_forecast: demand::forecast(snapshot.loans(), now, DEFAULT_HORIZON_DAYS),
            popularity_trends: trends::popularity_trends(&snapshot, now),
            return_predictions: returns::return_predictions(&snapshot, now),
            genre_trends: trends::genre_trends(&snapshot, now),
        })
    }

    /// Personalized recommendations for one user; `NotFound` for unknown ids.
    pub fn personalized_recommendations(&self, user_id: UserId) -> AnalyticsResult<Vec<Book>> {
        let snapshot = self.snapshot()?;
        recommend::personalized(&snapshot, user_id)
    }

    /// Books similar to the given one; `NotFound` for unknown ids.
    pub fn similar_books(&self, book_id: BookId) -> AnalyticsResult<Vec<Book>> {
        let snapshot = self.snapshot()?;
        recommend::similar(&snapshot, book_id)
    }

    /// User segmentation, reading patterns, quick picks and retention risk.
    pub fn user_behavior(&self) -> AnalyticsResult<UserBehaviorAnalysis> {
        let snapshot = self.snapshot()?;
        let now = self.clock.now();
        Ok(UserBehaviorAnalysis {
            user_segments: segments::user_segments(&snapshot, now),
            reading_patterns: segments::reading_patterns(&snapshot),
            user_recommendations: segments::quick_recommendations(&snapshot),
            retention_risk: segments::retention_risk(&snapshot, now),
        })
    }

    /// Unreturned loans past their due date, soonest-due first.
    ///
    /// Feed for the external overdue-notification scheduler.
    pub fn overdue_loans(&self) -> AnalyticsResult<Vec<Loan>> {
        let snapshot = self.snapshot()?;
        let now = self.clock.now();
        let mut loans: Vec<Loan> = snapshot
            .loans()
            .iter()
            .filter(|l| l.is_overdue(now))
            .cloned()
            .collect();
        loans.sort_by(|a, b| a.due_at.cmp(&b.due_at).then_with(|| a.id.cmp(&b.id)));
        Ok(loans)
    }

    /// Unreturned loans due between tomorrow and the day after, soonest first.
    ///
    /// Feed for the external due-date-reminder scheduler.
    pub fn due_soon_loans(&self) -> AnalyticsResult<Vec<Loan>> {
        let snapshot = self.snapshot()?;
        let now = self.clock.now();
        let from = now + Duration::days(1);
        let to = now + Duration::days(2);
        let mut loans: Vec<Loan> = snapshot
            .loans()
            .iter()
            .filter(|l| l.is_active() && l.due_at > from && l.due_at < to)
            .cloned()
            .collect();
        loans.sort_by(|a, b| a.due_at.cmp(&b.due_at).then_with(|| a.id.cmp(&b.id)));
        Ok(loans)
    }

    /// The instant reports generated by this service are relative to.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }
}

/// Split malformed catalog entries out of the snapshot.
///
/// `Book::new` validates copy counts, but snapshots can be assembled from
/// raw store rows; an entry with more available than total copies would
/// poison every ratio downstream.
fn sanitize(snapshot: LibrarySnapshot) -> (LibrarySnapshot, Vec<ReportDiagnostic>) {
    let mut diagnostics = Vec::new();
    for book in snapshot.books() {
        if book.available_copies > book.total_copies {
            warn!(book_id = %book.id, title = %book.title, "skipping malformed catalog entry");
            diagnostics.push(ReportDiagnostic {
                book_id: book.id,
                detail: format!(
                    "available_copies ({}) exceeds total_copies ({})",
                    book.available_copies, book.total_copies
                ),
            });
        }
    }

    if diagnostics.is_empty() {
        return (snapshot, diagnostics);
    }

    let skipped: Vec<BookId> = diagnostics.iter().map(|d| d.book_id).collect();
    let mut builder = SnapshotBuilder::new();
    for book in snapshot.books() {
        if !skipped.contains(&book.id) {
            builder = builder.book(book.clone());
        }
    }
    for author in snapshot.authors() {
        builder = builder.author(author.clone());
    }
    for user in snapshot.users() {
        builder = builder.user(user.clone());
    }
    for loan in snapshot.loans() {
        builder = builder.loan(loan.clone());
    }
    for review in snapshot.reviews() {
        builder = builder.review(review.clone());
    }
    (builder.build(), diagnostics)
}
