use booking_contract_harness::booking::BookingListEntry;
use booking_contract_harness::contract::{expect_array, expect_exact_json, expect_status};
use booking_contract_harness::{ApiResponse, Expected};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::{seq::SliceRandom, thread_rng};
use serde_json::json;
use std::time::Duration;

// Builds a GET /booking body with `count` entries in random order
fn list_response(count: u64) -> ApiResponse {
    let mut ids: Vec<u64> = (1..=count).collect();
    ids.shuffle(&mut thread_rng());
    let body = serde_json::to_string(
        &ids.iter()
            .map(|id| json!({ "bookingid": id }))
            .collect::<Vec<_>>(),
    )
    .unwrap();

    ApiResponse {
        status: 200,
        body,
        elapsed: Duration::from_millis(120),
    }
}

pub fn list_contract_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("list_contract");

    // The live collection holds a few thousand bookings on a busy day
    for count in [10u64, 1_000, 10_000].iter() {
        let response = list_response(*count);
        group.bench_with_input(BenchmarkId::from_parameter(count), &response, |b, response| {
            b.iter(|| {
                expect_status("list", response, Expected::Exactly(200)).unwrap();
                let ids = expect_array("list", response)
                    .unwrap()
                    .into_iter()
                    .map(|item| serde_json::from_value::<BookingListEntry>(item).unwrap().id())
                    .collect::<Vec<_>>();
                black_box(ids)
            });
        });
    }

    group.finish();
}

pub fn rejection_payload_benchmark(c: &mut Criterion) {
    let response = ApiResponse {
        status: 200,
        body: r#"{"reason":"Bad credentials"}"#.to_string(),
        elapsed: Duration::from_millis(80),
    };
    let expected = json!({ "reason": "Bad credentials" });

    c.bench_function("auth_rejection_shape", |b| {
        b.iter(|| black_box(expect_exact_json("authenticate", &response, &expected).is_ok()))
    });
}

criterion_group!(benches, list_contract_benchmark, rejection_payload_benchmark);
criterion_main!(benches);
