//! `stacksense-analytics` — the derivation layer.
//!
//! Seven pure, stateless components, each a set of functions over one
//! immutable [`stacksense_core::LibrarySnapshot`] plus "now":
//!
//! - [`metrics`]: counts, top-N rankings, histograms.
//! - [`demand`]: day-of-week-seasonal demand forecast.
//! - [`trends`]: per-book and per-genre popularity trends.
//! - [`inventory`]: utilization, acquisition and maintenance advice.
//! - [`returns`]: per-active-loan return predictions.
//! - [`recommend`]: personalized and similarity-based recommendations.
//! - [`segments`]: user segmentation, reading patterns, retention risk.
//!
//! Nothing here mutates the snapshot or keeps state between calls; the
//! components may run concurrently over the same snapshot. Every ranked
//! output carries an explicit tie-break so results never depend on hash-map
//! iteration order.

pub mod demand;
pub mod inventory;
pub mod metrics;
pub mod recommend;
pub mod returns;
pub mod segments;
pub mod trends;
