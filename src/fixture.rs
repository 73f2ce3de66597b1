// Scoped booking acquisition: create, run the body, always delete

use crate::booking::{BookingId, BookingRecord, SessionToken};
use crate::harness::ContractHarness;
use anyhow::Context;
use futures::FutureExt;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use tracing::debug;

/// Creates `record`, hands its id to `body`, then deletes the booking.
///
/// The delete runs on every exit path of `body`: normal return, error and
/// panic. A panic is re-raised once cleanup has been attempted. Cleanup
/// itself is best effort and never changes the result.
pub async fn with_booking<F, Fut, T>(
    harness: &ContractHarness,
    token: &SessionToken,
    record: &BookingRecord,
    body: F,
) -> anyhow::Result<T>
where
    F: FnOnce(BookingId) -> Fut,
    Fut: Future<Output = anyhow::Result<T>>,
{
    let id = harness
        .create(record)
        .await
        .context("creating fixture booking")?;
    debug!(booking_id = %id, "fixture booking created");

    // Calling `body` inside the future keeps a panic in the closure itself catchable
    let outcome = AssertUnwindSafe(async { body(id).await })
        .catch_unwind()
        .await;

    harness.cleanup(id, token).await;
    debug!(booking_id = %id, "fixture booking released");

    match outcome {
        Ok(result) => result,
        Err(payload) => panic::resume_unwind(payload),
    }
}
