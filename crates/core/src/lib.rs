//! `stacksense-core` — catalog domain foundation.
//!
//! Pure data: strongly-typed ids, the five catalog entities, the immutable
//! snapshot the analytic components read from, and the clock abstraction.
//! No storage or transport concerns live here.

pub mod clock;
pub mod error;
pub mod id;
pub mod model;
pub mod snapshot;

pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{AnalyticsError, AnalyticsResult};
pub use id::{AuthorId, BookId, LoanId, ReviewId, UserId};
pub use model::{Author, Book, Loan, LoanStatus, Review, User};
pub use snapshot::{LibrarySnapshot, SnapshotBuilder};
