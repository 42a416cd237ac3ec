use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use chrono::Duration;
use std::collections::BTreeSet;

use stacksense_core::{
    Book, BookId, FixedClock, Loan, LoanId, Review, ReviewId, User, UserId,
};
use stacksense_reports::ReportService;
use stacksense_store::InMemoryEntityStore;

/// Deterministic synthetic catalog: `books` titles across 8 genres, 20
/// users, and `loans_per_book` loans spread over the trailing year.
fn seed_store(books: usize, loans_per_book: usize) -> InMemoryEntityStore {
    let genres = [
        "Fantasy",
        "Science Fiction",
        "Mystery",
        "Romance",
        "History",
        "Biography",
        "Thriller",
        "Poetry",
    ];
    let clock = FixedClock::at(2026, 6, 1, 12, 0, 0);
    let now = clock.0;
    let store = InMemoryEntityStore::new();

    let users: Vec<User> = (0..20)
        .map(|i| User {
            id: UserId::new(),
            username: format!("user{i:02}"),
            email: format!("user{i:02}@example.com"),
        })
        .collect();
    for user in &users {
        store.insert_user(user.clone());
    }

    for b in 0..books {
        let book = Book::new(
            BookId::new(),
            format!("Book {b:04}"),
            genres[b % genres.len()],
            3,
            1,
            BTreeSet::new(),
        )
        .unwrap();
        store.insert_book(book.clone());

        for l in 0..loans_per_book {
            let user = &users[(b + l) % users.len()];
            let borrowed = now - Duration::days(((b * 7 + l * 13) % 360) as i64 + 1);
            let returned = (l % 4 != 0).then(|| borrowed + Duration::days(10));
            store.insert_loan(Loan {
                id: LoanId::new(),
                book_id: book.id,
                user_id: user.id,
                borrowed_at: borrowed,
                due_at: borrowed + Duration::days(14),
                returned_at: returned,
            });
        }

        if b % 3 == 0 {
            let reviewer = &users[b % users.len()];
            store.insert_review(
                Review::new(
                    ReviewId::new(),
                    book.id,
                    reviewer.id,
                    (b % 5 + 1) as u8,
                    now - Duration::days((b % 90) as i64),
                    b % 5 != 0,
                )
                .unwrap(),
            );
        }
    }

    store
}

fn bench_full_report_pass(c: &mut Criterion) {
    let mut group = c.benchmark_group("full_report_pass");

    for &books in &[100usize, 1_000] {
        let loans_per_book = 10;
        let service = ReportService::new(
            seed_store(books, loans_per_book),
            FixedClock::at(2026, 6, 1, 12, 0, 0),
        );
        group.throughput(Throughput::Elements((books * loans_per_book) as u64));
        group.bench_with_input(BenchmarkId::new("predictions", books), &service, |b, svc| {
            b.iter(|| black_box(svc.predictions().unwrap()))
        });
        group.bench_with_input(
            BenchmarkId::new("inventory_analysis", books),
            &service,
            |b, svc| b.iter(|| black_box(svc.inventory_analysis().unwrap())),
        );
        group.bench_with_input(
            BenchmarkId::new("user_behavior", books),
            &service,
            |b, svc| b.iter(|| black_box(svc.user_behavior().unwrap())),
        );
    }

    group.finish();
}

criterion_group!(benches, bench_full_report_pass);
criterion_main!(benches);
