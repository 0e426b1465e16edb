//! # Rx-Intake Benchmarks
//!
//! | Area | Operation |
//! |------|-----------|
//! | Gateway | Signature verification, payload parsing |
//! | Intake | Receipt allocation, text event handling |
//! | Rendering | Single-page PDF for one prescription photo |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rx_gateway::{parse_events, sign, verify_signature};
use rx_intake::adapters::pdf::render_pdf;
use rx_intake::test_utils::{sample_jpeg, test_day, TestHarness};
use rx_intake::{DocumentHeader, PageLayout, ReceiptCounter};
use rx_tests::fixtures::{payload, text_event};
use std::time::Duration;

// ============================================================================
// Gateway
// ============================================================================

fn bench_signature(c: &mut Criterion) {
    let mut group = c.benchmark_group("gateway-signature");
    let secret = b"bench-secret";

    for events in [1usize, 10, 100] {
        let body = payload(
            &(0..events)
                .map(|i| text_event("U1", &format!("rt{i}"), "6月14日 15時"))
                .collect::<Vec<_>>(),
        );
        let signature = sign(body.as_bytes(), secret);

        group.throughput(Throughput::Bytes(body.len() as u64));
        group.bench_with_input(BenchmarkId::new("verify", events), &body, |b, body| {
            b.iter(|| black_box(verify_signature(body.as_bytes(), &signature, secret)))
        });
        group.bench_with_input(BenchmarkId::new("parse", events), &body, |b, body| {
            b.iter(|| black_box(parse_events(body.as_bytes()).map(|e| e.len())))
        });
    }
    group.finish();
}

// ============================================================================
// Intake
// ============================================================================

fn bench_receipts(c: &mut Criterion) {
    let day = test_day();
    c.bench_function("receipt-allocate", |b| {
        let counter = ReceiptCounter::new();
        b.iter(|| black_box(counter.next(day)))
    });
}

fn bench_text_events(c: &mut Criterion) {
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => panic!("tokio runtime: {e}"),
    };
    let harness = TestHarness::new();
    runtime.block_on(harness.text("U1", "同意"));

    // Text before any image keeps the state unchanged
    c.bench_function("intake-text-event", |b| {
        b.iter(|| runtime.block_on(harness.text("U1", "まだです")))
    });
}

// ============================================================================
// Rendering
// ============================================================================

fn bench_pdf(c: &mut Criterion) {
    let mut group = c.benchmark_group("render-pdf");
    group.measurement_time(Duration::from_secs(5));
    let header = DocumentHeader {
        lines: vec![
            "受付番号: 202406140001".into(),
            "電話番号: 09012345678".into(),
            "受取日時: 6月14日 15時".into(),
        ],
    };
    let layout = PageLayout::a4();

    for (w, h) in [(600u16, 800u16), (3024, 4032)] {
        let jpeg = sample_jpeg(w, h);
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{w}x{h}")),
            &jpeg,
            |b, jpeg| b.iter(|| black_box(render_pdf(jpeg, &header, &layout).map(|p| p.len()))),
        );
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_signature,
    bench_receipts,
    bench_text_events,
    bench_pdf
);
criterion_main!(benches);
