//! Immutable point-in-time view of the catalog.
//!
//! A snapshot is fetched once per report generation (bulk read) and indexed
//! up front, so no component re-queries per book or per user. Entity arenas
//! are `BTreeMap`s: iteration order is the id order, never hash order.

use std::collections::{BTreeMap, HashMap};

use crate::id::{AuthorId, BookId, UserId};
use crate::model::{Author, Book, Loan, Review, User};

/// All entities needed for one computation, with in-memory group indexes.
#[derive(Debug, Clone, Default)]
pub struct LibrarySnapshot {
    books: BTreeMap<BookId, Book>,
    authors: BTreeMap<AuthorId, Author>,
    users: BTreeMap<UserId, User>,
    loans: Vec<Loan>,
    reviews: Vec<Review>,
    loans_by_book: HashMap<BookId, Vec<usize>>,
    loans_by_user: HashMap<UserId, Vec<usize>>,
    reviews_by_book: HashMap<BookId, Vec<usize>>,
    reviews_by_user: HashMap<UserId, Vec<usize>>,
}

impl LibrarySnapshot {
    /// Assemble a snapshot and build its indexes.
    pub fn new(
        books: impl IntoIterator<Item = Book>,
        authors: impl IntoIterator<Item = Author>,
        users: impl IntoIterator<Item = User>,
        loans: Vec<Loan>,
        reviews: Vec<Review>,
    ) -> Self {
        let books: BTreeMap<BookId, Book> = books.into_iter().map(|b| (b.id, b)).collect();
        let authors: BTreeMap<AuthorId, Author> =
            authors.into_iter().map(|a| (a.id, a)).collect();
        let users: BTreeMap<UserId, User> = users.into_iter().map(|u| (u.id, u)).collect();

        let mut loans_by_book: HashMap<BookId, Vec<usize>> = HashMap::new();
        let mut loans_by_user: HashMap<UserId, Vec<usize>> = HashMap::new();
        for (idx, loan) in loans.iter().enumerate() {
            loans_by_book.entry(loan.book_id).or_default().push(idx);
            loans_by_user.entry(loan.user_id).or_default().push(idx);
        }

        let mut reviews_by_book: HashMap<BookId, Vec<usize>> = HashMap::new();
        let mut reviews_by_user: HashMap<UserId, Vec<usize>> = HashMap::new();
        for (idx, review) in reviews.iter().enumerate() {
            reviews_by_book.entry(review.book_id).or_default().push(idx);
            reviews_by_user.entry(review.user_id).or_default().push(idx);
        }

        Self {
            books,
            authors,
            users,
            loans,
            reviews,
            loans_by_book,
            loans_by_user,
            reviews_by_book,
            reviews_by_user,
        }
    }

    pub fn book(&self, id: BookId) -> Option<&Book> {
        self.books.get(&id)
    }

    pub fn user(&self, id: UserId) -> Option<&User> {
        self.users.get(&id)
    }

    pub fn author(&self, id: AuthorId) -> Option<&Author> {
        self.authors.get(&id)
    }

    /// Books in id order.
    pub fn books(&self) -> impl Iterator<Item = &Book> {
        self.books.values()
    }

    /// Users in id order.
    pub fn users(&self) -> impl Iterator<Item = &User> {
        self.users.values()
    }

    /// Authors in id order.
    pub fn authors(&self) -> impl Iterator<Item = &Author> {
        self.authors.values()
    }

    pub fn book_count(&self) -> usize {
        self.books.len()
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    pub fn author_count(&self) -> usize {
        self.authors.len()
    }

    pub fn loans(&self) -> &[Loan] {
        &self.loans
    }

    pub fn reviews(&self) -> &[Review] {
        &self.reviews
    }

    /// All loans of one book, in snapshot order.
    pub fn loans_for_book(&self, id: BookId) -> impl Iterator<Item = &Loan> {
        self.loans_by_book
            .get(&id)
            .into_iter()
            .flatten()
            .map(|&idx| &self.loans[idx])
    }

    /// All loans of one user, in snapshot order.
    pub fn loans_for_user(&self, id: UserId) -> impl Iterator<Item = &Loan> {
        self.loans_by_user
            .get(&id)
            .into_iter()
            .flatten()
            .map(|&idx| &self.loans[idx])
    }

    pub fn loan_count_for_book(&self, id: BookId) -> usize {
        self.loans_by_book.get(&id).map_or(0, Vec::len)
    }

    /// Approved reviews of one book.
    pub fn approved_reviews_for_book(&self, id: BookId) -> impl Iterator<Item = &Review> {
        self.reviews_by_book
            .get(&id)
            .into_iter()
            .flatten()
            .map(|&idx| &self.reviews[idx])
            .filter(|r| r.approved)
    }

    /// All reviews written by one user, regardless of approval state.
    pub fn reviews_for_user(&self, id: UserId) -> impl Iterator<Item = &Review> {
        self.reviews_by_user
            .get(&id)
            .into_iter()
            .flatten()
            .map(|&idx| &self.reviews[idx])
    }

    /// Mean approved rating of a book; `None` without approved reviews.
    pub fn mean_approved_rating(&self, id: BookId) -> Option<f64> {
        let mut sum = 0u32;
        let mut count = 0u32;
        for review in self.approved_reviews_for_book(id) {
            sum += u32::from(review.rating);
            count += 1;
        }
        (count > 0).then(|| f64::from(sum) / f64::from(count))
    }
}

/// Incremental snapshot construction, for stores, tests and demos.
#[derive(Debug, Default)]
pub struct SnapshotBuilder {
    books: Vec<Book>,
    authors: Vec<Author>,
    users: Vec<User>,
    loans: Vec<Loan>,
    reviews: Vec<Review>,
}

impl SnapshotBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn book(mut self, book: Book) -> Self {
        self.books.push(book);
        self
    }

    pub fn author(mut self, author: Author) -> Self {
        self.authors.push(author);
        self
    }

    pub fn user(mut self, user: User) -> Self {
        self.users.push(user);
        self
    }

    pub fn loan(mut self, loan: Loan) -> Self {
        self.loans.push(loan);
        self
    }

    pub fn review(mut self, review: Review) -> Self {
        self.reviews.push(review);
        self
    }

    pub fn build(self) -> LibrarySnapshot {
        LibrarySnapshot::new(self.books, self.authors, self.users, self.loans, self.reviews)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::{LoanId, ReviewId};
    use chrono::{TimeZone, Utc};
    use std::collections::BTreeSet;

    fn book(title: &str) -> Book {
        Book::new(BookId::new(), title, "Fantasy", 3, 3, BTreeSet::new()).unwrap()
    }

    fn loan(book_id: BookId, user_id: UserId) -> Loan {
        let borrowed = Utc.with_ymd_and_hms(2026, 1, 5, 14, 0, 0).unwrap();
        Loan {
            id: LoanId::new(),
            book_id,
            user_id,
            borrowed_at: borrowed,
            due_at: borrowed + chrono::Duration::days(14),
            returned_at: None,
        }
    }

    #[test]
    fn indexes_group_loans_by_book_and_user() {
        let a = book("A");
        let b = book("B");
        let user_id = UserId::new();
        let snapshot = SnapshotBuilder::new()
            .book(a.clone())
            .book(b.clone())
            .loan(loan(a.id, user_id))
            .loan(loan(a.id, user_id))
            .loan(loan(b.id, user_id))
            .build();

        assert_eq!(snapshot.loan_count_for_book(a.id), 2);
        assert_eq!(snapshot.loan_count_for_book(b.id), 1);
        assert_eq!(snapshot.loans_for_user(user_id).count(), 3);
        assert_eq!(snapshot.loans_for_book(BookId::new()).count(), 0);
    }

    #[test]
    fn mean_approved_rating_ignores_unapproved_reviews() {
        let b = book("A");
        let reviewer = UserId::new();
        let at = Utc.with_ymd_and_hms(2026, 1, 5, 9, 0, 0).unwrap();
        let snapshot = SnapshotBuilder::new()
            .book(b.clone())
            .review(Review::new(ReviewId::new(), b.id, reviewer, 4, at, true).unwrap())
            .review(Review::new(ReviewId::new(), b.id, reviewer, 2, at, true).unwrap())
            .review(Review::new(ReviewId::new(), b.id, reviewer, 1, at, false).unwrap())
            .build();

        assert_eq!(snapshot.mean_approved_rating(b.id), Some(3.0));
        assert_eq!(snapshot.mean_approved_rating(BookId::new()), None);
    }
}
