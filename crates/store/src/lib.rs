//! `stacksense-store` — entity store boundary.
//!
//! The derivation layer reads everything it needs in one bulk fetch per
//! report. Persistence technology lives behind [`EntityStore`]; this crate
//! ships only the trait and an in-memory implementation for tests/dev.

use std::sync::{PoisonError, RwLock};

use thiserror::Error;

use stacksense_core::{Author, Book, LibrarySnapshot, Loan, Review, SnapshotBuilder, User};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The backing store could not be reached or read.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Bulk, read-only access to the catalog entities.
///
/// One `fetch_snapshot` call per report generation; implementations must
/// return a consistent point-in-time view, never a partial one.
pub trait EntityStore: Send + Sync {
    fn fetch_snapshot(&self) -> Result<LibrarySnapshot, StoreError>;
}

/// In-memory entity store.
///
/// Intended for tests/dev. Not optimized for performance.
#[derive(Debug, Default)]
pub struct InMemoryEntityStore {
    inner: RwLock<StoreContents>,
}

#[derive(Debug, Default)]
struct StoreContents {
    books: Vec<Book>,
    authors: Vec<Author>,
    users: Vec<User>,
    loans: Vec<Loan>,
    reviews: Vec<Review>,
}

impl InMemoryEntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every critical section here is a lone `Vec::push` or a read-only
    /// clone, so a panic in another holder cannot leave the contents torn;
    /// recover the guard instead of dropping the operation.
    fn write(&self) -> std::sync::RwLockWriteGuard<'_, StoreContents> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn insert_book(&self, book: Book) {
        self.write().books.push(book);
    }

    pub fn insert_author(&self, author: Author) {
        self.write().authors.push(author);
    }

    pub fn insert_user(&self, user: User) {
        self.write().users.push(user);
    }

    pub fn insert_loan(&self, loan: Loan) {
        self.write().loans.push(loan);
    }

    pub fn insert_review(&self, review: Review) {
        self.write().reviews.push(review);
    }
}

impl EntityStore for InMemoryEntityStore {
    fn fetch_snapshot(&self) -> Result<LibrarySnapshot, StoreError> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);

        let mut builder = SnapshotBuilder::new();
        for book in &inner.books {
            builder = builder.book(book.clone());
        }
        for author in &inner.authors {
            builder = builder.author(author.clone());
        }
        for user in &inner.users {
            builder = builder.user(user.clone());
        }
        for loan in &inner.loans {
            builder = builder.loan(loan.clone());
        }
        for review in &inner.reviews {
            builder = builder.review(review.clone());
        }
        Ok(builder.build())
    }
}

/// Store that always fails, for exercising the fatal path in tests.
#[derive(Debug, Default)]
pub struct UnavailableStore;

impl EntityStore for UnavailableStore {
    fn fetch_snapshot(&self) -> Result<LibrarySnapshot, StoreError> {
        Err(StoreError::Unavailable("store offline".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use stacksense_core::{BookId, LoanId, UserId};
    use std::collections::BTreeSet;

    #[test]
    fn fetch_snapshot_returns_all_inserted_entities() {
        let store = InMemoryEntityStore::new();
        let book = Book::new(BookId::new(), "Dune", "Science Fiction", 4, 2, BTreeSet::new())
            .unwrap();
        let user = User {
            id: UserId::new(),
            username: "avid_reader".to_string(),
            email: "avid@example.com".to_string(),
        };
        let borrowed = Utc.with_ymd_and_hms(2026, 2, 1, 11, 0, 0).unwrap();
        store.insert_book(book.clone());
        store.insert_user(user.clone());
        store.insert_loan(Loan {
            id: LoanId::new(),
            book_id: book.id,
            user_id: user.id,
            borrowed_at: borrowed,
            due_at: borrowed + Duration::days(14),
            returned_at: None,
        });

        let snapshot = store.fetch_snapshot().unwrap();
        assert_eq!(snapshot.book_count(), 1);
        assert_eq!(snapshot.user_count(), 1);
        assert_eq!(snapshot.loans().len(), 1);
        assert_eq!(snapshot.loan_count_for_book(book.id), 1);
    }

    #[test]
    fn inserts_survive_a_poisoned_lock() {
        let store = std::sync::Arc::new(InMemoryEntityStore::new());

        let poisoner = std::sync::Arc::clone(&store);
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.inner.write().unwrap();
            panic!("poison the lock");
        })
        .join();

        let book = Book::new(BookId::new(), "Dune", "Science Fiction", 2, 2, BTreeSet::new())
            .unwrap();
        store.insert_book(book);

        let snapshot = store.fetch_snapshot().unwrap();
        assert_eq!(snapshot.book_count(), 1);
    }

    #[test]
    fn unavailable_store_surfaces_the_error() {
        let err = UnavailableStore.fetch_snapshot().unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
    }
}
