//! Fee and ledger benchmarks.
//!
//! Measures the fixed-point fee computation on its own and the cost of a
//! full deposit/withdraw round through the ledger.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use digital_safe::core::asset::Asset;
use digital_safe::core::config::LedgerConfig;
use digital_safe::core::fees::accrued_fee;
use digital_safe::core::record::BalanceRecord;
use digital_safe::ledger::bank::InMemoryBank;
use digital_safe::ledger::state_machine::Ledger;
use digital_safe::utils::constants::{DEFAULT_FEE_PER_SECOND, FEE_SCALE};
use digital_safe::utils::crypto::Address;

fn bench_accrued_fee(c: &mut Criterion) {
    let mut group = c.benchmark_group("accrued_fee");

    for principal in [1_000u128, FEE_SCALE, 1_000_000 * FEE_SCALE] {
        group.bench_with_input(
            BenchmarkId::from_parameter(principal),
            &principal,
            |b, &principal| {
                b.iter(|| {
                    accrued_fee(
                        black_box(principal),
                        black_box(86_401),
                        black_box(DEFAULT_FEE_PER_SECOND),
                    )
                })
            },
        );
    }

    group.finish();
}

fn bench_record_transitions(c: &mut Criterion) {
    let record = BalanceRecord {
        amount: 50 * FEE_SCALE,
        fee: 0,
        timestamp: 1_672_301_776,
    };
    let now = record.timestamp + 30 * 86_400;

    c.bench_function("record_deposit", |b| {
        b.iter(|| black_box(record).deposit(black_box(FEE_SCALE), now, DEFAULT_FEE_PER_SECOND))
    });
    c.bench_function("record_collect", |b| {
        b.iter(|| black_box(record).collect(now, DEFAULT_FEE_PER_SECOND))
    });
}

fn bench_ledger_round_trip(c: &mut Criterion) {
    let owner = Address::from_low_u64(1);
    let alice = Address::from_low_u64(10);
    let config = LedgerConfig::new(owner);
    let mut bank = InMemoryBank::new(config.custody);
    let mut ledger = match Ledger::new(config) {
        Ok(ledger) => ledger,
        Err(e) => panic!("ledger config rejected: {}", e),
    };
    if let Err(e) = bank.mint(Asset::Native, alice, u64::MAX as u128) {
        panic!("mint failed: {}", e);
    }

    let mut height = 0u64;
    c.bench_function("ledger_deposit_withdraw", |b| {
        b.iter(|| {
            height += 1;
            let _ = ledger.begin_block(height, 1_672_301_776 + height);
            let _ = ledger.deposit(alice, Asset::Native, 1_000, 1_000, &mut bank);
            let _ = ledger.withdraw(alice, Asset::Native, 500, &mut bank);
            let _ = ledger.end_block();
        })
    });
}

criterion_group!(
    benches,
    bench_accrued_fee,
    bench_record_transitions,
    bench_ledger_round_trip
);
criterion_main!(benches);
