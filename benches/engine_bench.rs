use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rust_decimal::Decimal;
use time::{Date, Month};

use bukukas::engine::LedgerEngine;
use bukukas_core::{CheckoutLine, PaymentMethod, TransactionKind};
use bukukas_memory::InMemoryStorage;

fn engine() -> LedgerEngine {
    LedgerEngine::new(Arc::new(InMemoryStorage::new()))
}

fn date() -> Date {
    Date::from_calendar_date(2024, Month::March, 1).unwrap()
}

fn sale(item: &str) -> CheckoutLine {
    CheckoutLine {
        item: item.to_string(),
        quantity: Decimal::from(2),
        unit_price: Decimal::from(25_000),
        payment_method: PaymentMethod::Cash,
        unit: None,
    }
}

fn seed(engine: &LedgerEngine, sales: usize) {
    engine
        .record_transaction(
            date(),
            TransactionKind::Purchase,
            CheckoutLine {
                item: "Keripik Kenikir".to_string(),
                quantity: Decimal::from(10_000),
                unit_price: Decimal::from(20_000),
                payment_method: PaymentMethod::Cash,
                unit: Some("bungkus".to_string()),
            },
            None,
        )
        .unwrap();
    for _ in 0..sales {
        engine
            .record_transaction(date(), TransactionKind::Sale, sale("Keripik Kenikir"), None)
            .unwrap();
    }
}

fn bench_record(c: &mut Criterion) {
    let engine = engine();
    seed(&engine, 100);

    c.bench_function("record_cash_sale", |b| {
        b.iter(|| {
            engine
                .record_transaction(
                    date(),
                    TransactionKind::Sale,
                    black_box(sale("Keripik Kenikir")),
                    None,
                )
                .unwrap()
        })
    });

    c.bench_function("record_mixed_checkout", |b| {
        b.iter(|| {
            engine
                .record_checkout(
                    date(),
                    TransactionKind::Sale,
                    black_box(vec![
                        sale("Keripik Kenikir"),
                        CheckoutLine {
                            payment_method: PaymentMethod::Credit,
                            ..sale("Rempeyek")
                        },
                    ]),
                    None,
                )
                .unwrap()
        })
    });
}

fn bench_reports(c: &mut Criterion) {
    let engine = engine();
    seed(&engine, 1_000);

    c.bench_function("trial_balance_1k_sales", |b| {
        b.iter(|| engine.compute_trial_balance().unwrap())
    });

    c.bench_function("income_statement_1k_sales", |b| {
        let from = Date::from_calendar_date(2024, Month::January, 1).unwrap();
        let to = Date::from_calendar_date(2024, Month::December, 31).unwrap();
        b.iter(|| engine.compute_income_statement(from, to).unwrap())
    });
}

criterion_group!(benches, bench_record, bench_reports);
criterion_main!(benches);
