//! Seed an in-memory store with a small catalog and print every report as
//! JSON. Run with `cargo run -p stacksense-reports --example generate_reports`.

use std::collections::BTreeSet;

use anyhow::Result;
use chrono::{Duration, Utc};

use stacksense_core::{
    Author, AuthorId, Book, BookId, Loan, LoanId, Review, ReviewId, SystemClock, User, UserId,
};
use stacksense_reports::ReportService;
use stacksense_store::InMemoryEntityStore;

fn main() -> Result<()> {
    stacksense_observability::init();

    let store = seed_store()?;
    let service = ReportService::new(store, SystemClock);

    println!("{}", serde_json::to_string_pretty(&service.library_stats()?)?);
    println!("{}", serde_json::to_string_pretty(&service.inventory_analysis()?)?);
    println!("{}", serde_json::to_string_pretty(&service.predictions()?)?);
    println!("{}", serde_json::to_string_pretty(&service.user_behavior()?)?);

    Ok(())
}

fn seed_store() -> Result<InMemoryEntityStore> {
    let store = InMemoryEntityStore::new();
    let now = Utc::now();

    let author = Author {
        id: AuthorId::new(),
        name: "N. K. Jemisin".to_string(),
    };
    store.insert_author(author.clone());

    let titles = [
        ("The Fifth Season", "Fantasy", 4u32),
        ("The Obelisk Gate", "Fantasy", 3),
        ("The Stone Sky", "Fantasy", 3),
        ("The City We Became", "Urban Fantasy", 2),
    ];
    let mut books = Vec::new();
    for (title, genre, copies) in titles {
        let book = Book::new(
            BookId::new(),
            title,
            genre,
            copies,
            copies,
            BTreeSet::from([author.id]),
        )?;
        store.insert_book(book.clone());
        books.push(book);
    }

    let reader = User {
        id: UserId::new(),
        username: "essun".to_string(),
        email: "essun@example.com".to_string(),
    };
    store.insert_user(reader.clone());

    for (i, book) in books.iter().take(3).enumerate() {
        let borrowed = now - Duration::days(40 - 12 * i as i64);
        store.insert_loan(Loan {
            id: LoanId::new(),
            book_id: book.id,
            user_id: reader.id,
            borrowed_at: borrowed,
            due_at: borrowed + Duration::days(14),
            returned_at: (i < 2).then(|| borrowed + Duration::days(10)),
        });
    }

    store.insert_review(Review::new(
        ReviewId::new(),
        books[0].id,
        reader.id,
        5,
        now - Duration::days(20),
        true,
    )?);

    Ok(store)
}
