//! Personalized recommendations and book similarity.
//!
//! Genre preferences are mined from the user's loan history (+1 per borrow)
//! and their own reviews (+2 per rating >= 4, regardless of approval state;
//! a reader's taste signal does not need moderation). Rankings are
//! best-first with explicit tie-breaks.

use std::collections::{BTreeMap, HashSet};

use stacksense_core::{AnalyticsError, AnalyticsResult, Book, BookId, LibrarySnapshot, UserId};

const PREFERRED_GENRES: usize = 3;
const PERSONALIZED_LIMIT: usize = 10;
const SIMILAR_LIMIT: usize = 5;

/// A ranked candidate with its score, used internally before the final cut.
#[derive(Debug, Clone, PartialEq)]
struct ScoredBook {
    book: Book,
    score: f64,
}

/// Up to 10 unread books from the user's three favourite genres, best-first.
///
/// Fails with `NotFound` for an unknown user id. Never returns a book the
/// user has already borrowed.
pub fn personalized(snapshot: &LibrarySnapshot, user_id: UserId) -> AnalyticsResult<Vec<Book>> {
    if snapshot.user(user_id).is_none() {
        return Err(AnalyticsError::NotFound);
    }

    let mut genre_weights: BTreeMap<String, u32> = BTreeMap::new();
    let mut read_books: HashSet<BookId> = HashSet::new();

    for loan in snapshot.loans_for_user(user_id) {
        read_books.insert(loan.book_id);
        if let Some(book) = snapshot.book(loan.book_id) {
            *genre_weights.entry(book.genre.clone()).or_default() += 1;
        }
    }
    for review in snapshot.reviews_for_user(user_id) {
        if review.rating >= 4 {
            if let Some(book) = snapshot.book(review.book_id) {
                *genre_weights.entry(book.genre.clone()).or_default() += 2;
            }
        }
    }

    // Top 3 genres: weight desc, then genre name asc (deterministic).
    let mut ranked_genres: Vec<(&String, &u32)> = genre_weights.iter().collect();
    ranked_genres.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
    let preferred: Vec<&String> = ranked_genres
        .into_iter()
        .take(PREFERRED_GENRES)
        .map(|(genre, _)| genre)
        .collect();

    let mut candidates: Vec<ScoredBook> = snapshot
        .books()
        .filter(|book| !read_books.contains(&book.id))
        .filter_map(|book| {
            let genre_rank = preferred.iter().position(|g| *g == &book.genre)?;
            Some(ScoredBook {
                score: candidate_score(snapshot, book, genre_rank),
                book: book.clone(),
            })
        })
        .collect();

    Ok(take_best(candidates.as_mut_slice(), PERSONALIZED_LIMIT))
}

/// Up to 5 same-genre books ranked by similarity to the source, best-first.
///
/// Fails with `NotFound` for an unknown book id; never includes the source.
pub fn similar(snapshot: &LibrarySnapshot, book_id: BookId) -> AnalyticsResult<Vec<Book>> {
    let source = snapshot.book(book_id).ok_or(AnalyticsError::NotFound)?;

    let mut candidates: Vec<ScoredBook> = snapshot
        .books()
        .filter(|book| book.id != source.id && book.genre == source.genre)
        .map(|book| ScoredBook {
            score: similarity(snapshot, source, book),
            book: book.clone(),
        })
        .collect();

    Ok(take_best(candidates.as_mut_slice(), SIMILAR_LIMIT))
}

/// Genre preference (0.4 weight), mean approved rating (0.3) and normalized
/// popularity (0.3). The rating term is 0 without approved reviews.
fn candidate_score(snapshot: &LibrarySnapshot, book: &Book, genre_rank: usize) -> f64 {
    let mut score = (PREFERRED_GENRES - genre_rank) as f64 * 0.4;
    if let Some(rating) = snapshot.mean_approved_rating(book.id) {
        score += rating * 0.3;
    }
    let loan_count = snapshot.loan_count_for_book(book.id) as f64;
    score += (loan_count / 10.0).min(1.0) * 0.3;
    score
}

/// 0.4 for the (always shared) genre, up to 0.3 for rating closeness when
/// both sides have an approved average, 0.3 for a shared author.
fn similarity(snapshot: &LibrarySnapshot, a: &Book, b: &Book) -> f64 {
    let mut similarity = 0.4;
    if let (Some(rating_a), Some(rating_b)) = (
        snapshot.mean_approved_rating(a.id),
        snapshot.mean_approved_rating(b.id),
    ) {
        similarity += (1.0 - (rating_a - rating_b).abs() / 5.0) * 0.3;
    }
    if a.shares_author(b) {
        similarity += 0.3;
    }
    similarity
}

/// Sort best-first (score desc, title asc, id asc) and keep the head.
fn take_best(candidates: &mut [ScoredBook], limit: usize) -> Vec<Book> {
    candidates.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.book.title.cmp(&b.book.title))
            .then_with(|| a.book.id.cmp(&b.book.id))
    });
    candidates
        .iter()
        .take(limit)
        .map(|scored| scored.book.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{closed_loan, review, ts, user};
    use proptest::prelude::*;
    use stacksense_core::{AuthorId, SnapshotBuilder};
    use std::collections::BTreeSet;

    fn book_by(title: &str, genre: &str, authors: &[AuthorId]) -> Book {
        Book::new(
            BookId::new(),
            title,
            genre,
            3,
            3,
            authors.iter().copied().collect::<BTreeSet<_>>(),
        )
        .unwrap()
    }

    #[test]
    fn unknown_user_fails_with_not_found() {
        let snapshot = SnapshotBuilder::new().build();
        assert_eq!(
            personalized(&snapshot, UserId::new()).unwrap_err(),
            AnalyticsError::NotFound
        );
    }

    #[test]
    fn unknown_book_fails_with_not_found() {
        let snapshot = SnapshotBuilder::new().build();
        assert_eq!(
            similar(&snapshot, BookId::new()).unwrap_err(),
            AnalyticsError::NotFound
        );
    }

    #[test]
    fn personalized_never_returns_previously_borrowed_books() {
        let read = book_by("Read already", "Fantasy", &[]);
        let unread = book_by("Unread", "Fantasy", &[]);
        let u = user("reader");
        let snapshot = SnapshotBuilder::new()
            .book(read.clone())
            .book(unread.clone())
            .user(u.clone())
            .loan(closed_loan(read.id, u.id, ts(3, 1, 10), 7))
            .build();

        let recommendations = personalized(&snapshot, u.id).unwrap();
        assert_eq!(recommendations.len(), 1);
        assert_eq!(recommendations[0].id, unread.id);
    }

    #[test]
    fn review_weighting_counts_unapproved_high_ratings() {
        // The user borrowed one Fantasy book but left a 5-star (unapproved)
        // review on a Mystery book: Mystery outweighs Fantasy 2 to 1.
        let fantasy_read = book_by("Fantasy read", "Fantasy", &[]);
        let mystery_rated = book_by("Mystery rated", "Mystery", &[]);
        let fantasy_new = book_by("Fantasy new", "Fantasy", &[]);
        let mystery_new = book_by("Mystery new", "Mystery", &[]);
        let u = user("reader");
        let snapshot = SnapshotBuilder::new()
            .book(fantasy_read.clone())
            .book(mystery_rated.clone())
            .book(fantasy_new.clone())
            .book(mystery_new.clone())
            .user(u.clone())
            .loan(closed_loan(fantasy_read.id, u.id, ts(3, 1, 10), 7))
            .review(review(mystery_rated.id, u.id, 5, ts(3, 5, 9), false))
            .build();

        let recommendations = personalized(&snapshot, u.id).unwrap();
        // Mystery is rank 0, Fantasy rank 1; the unborrowed Mystery books
        // (including the rated one, never borrowed) come first.
        assert_eq!(recommendations[0].genre, "Mystery");
        assert!(recommendations.iter().any(|b| b.id == fantasy_new.id));
    }

    #[test]
    fn similar_books_share_genre_and_prefer_shared_authors() {
        let author = AuthorId::new();
        let source = book_by("Source", "Science Fiction", &[author]);
        let same_author = book_by("Same author", "Science Fiction", &[author]);
        let same_genre = book_by("Same genre", "Science Fiction", &[]);
        let other_genre = book_by("Other genre", "Romance", &[author]);
        let snapshot = SnapshotBuilder::new()
            .book(source.clone())
            .book(same_author.clone())
            .book(same_genre.clone())
            .book(other_genre.clone())
            .build();

        let similars = similar(&snapshot, source.id).unwrap();
        assert_eq!(similars.len(), 2);
        assert_eq!(similars[0].id, same_author.id);
        assert_eq!(similars[1].id, same_genre.id);
        assert!(similars.iter().all(|b| b.genre == "Science Fiction"));
        assert!(similars.iter().all(|b| b.id != source.id));
    }

    #[test]
    fn similar_output_is_capped_at_five() {
        let source = book_by("Source", "Mystery", &[]);
        let mut builder = SnapshotBuilder::new().book(source.clone());
        for i in 0..8 {
            builder = builder.book(book_by(&format!("Candidate {i}"), "Mystery", &[]));
        }

        let similars = similar(&builder.build(), source.id).unwrap();
        assert_eq!(similars.len(), 5);
        assert!(similars.iter().all(|b| b.id != source.id));
        // All scores tie, so the head of the title order survives the cut.
        let titles: Vec<&str> = similars.iter().map(|b| b.title.as_str()).collect();
        assert_eq!(
            titles,
            ["Candidate 0", "Candidate 1", "Candidate 2", "Candidate 3", "Candidate 4"]
        );
    }

    #[test]
    fn rating_closeness_breaks_similarity_ties() {
        let reviewer = user("reviewer");
        let source = book_by("Source", "Fantasy", &[]);
        let close = book_by("Close rating", "Fantasy", &[]);
        let far = book_by("Far rating", "Fantasy", &[]);
        let snapshot = SnapshotBuilder::new()
            .book(source.clone())
            .book(close.clone())
            .book(far.clone())
            .user(reviewer.clone())
            .review(review(source.id, reviewer.id, 4, ts(3, 1, 9), true))
            .review(review(close.id, reviewer.id, 4, ts(3, 2, 9), true))
            .review(review(far.id, reviewer.id, 1, ts(3, 3, 9), true))
            .build();

        let similars = similar(&snapshot, source.id).unwrap();
        assert_eq!(similars[0].id, close.id);
        assert_eq!(similars[1].id, far.id);
    }

    proptest! {
        /// Personalized output is capped at 10 and excludes borrowed books
        /// for arbitrary catalog/loan shapes.
        #[test]
        fn personalized_caps_results_and_excludes_history(
            catalog_size in 0usize..30,
            borrowed in 0usize..10,
        ) {
            let u = user("reader");
            let mut builder = SnapshotBuilder::new().user(u.clone());
            let mut ids = Vec::new();
            for i in 0..catalog_size {
                let b = book_by(&format!("Book {i:02}"), "Fantasy", &[]);
                ids.push(b.id);
                builder = builder.book(b);
            }
            let borrowed_ids: Vec<BookId> =
                ids.iter().take(borrowed.min(catalog_size)).copied().collect();
            for &id in &borrowed_ids {
                builder = builder.loan(closed_loan(id, u.id, ts(3, 1, 10), 7));
            }

            let recommendations = personalized(&builder.build(), u.id).unwrap();
            prop_assert!(recommendations.len() <= 10);
            for rec in &recommendations {
                prop_assert!(!borrowed_ids.contains(&rec.id));
            }
        }
    }
}
