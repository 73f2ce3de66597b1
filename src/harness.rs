// Typed booking operations that assert the remote's documented behavior
//
// Each method sends one raw call through `BookingApi` and turns a response
// that breaks the contract into a `ContractViolation`.

use crate::booking::{
    AuthOutcome, BookingId, BookingListEntry, BookingRecord, CreatedBooking, Credentials,
    SessionToken,
};
use crate::client::{ApiResponse, BookingApi};
use crate::contract::{expect_array, expect_status, ContractViolation, Expected};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tracing::warn;

pub const BAD_CREDENTIALS: &str = "Bad credentials";

#[derive(Clone)]
pub struct ContractHarness {
    api: Arc<dyn BookingApi>,
}

fn decode<T: DeserializeOwned>(
    operation: &'static str,
    response: &ApiResponse,
) -> Result<T, ContractViolation> {
    response
        .json::<T>()
        .map_err(|e| ContractViolation::ShapeMismatch {
            operation,
            detail: e.to_string(),
        })
}

impl ContractHarness {
    pub fn new(api: impl BookingApi + 'static) -> Self {
        Self { api: Arc::new(api) }
    }

    /// Raw transport, for cases that inspect responses outside the happy path.
    pub fn api(&self) -> &dyn BookingApi {
        self.api.as_ref()
    }

    pub async fn ping(&self) -> Result<(), ContractViolation> {
        let response = self.api.ping().await?;
        expect_status("ping", &response, Expected::Exactly(201))
    }

    /// Status 200 is expected whether or not the credentials are accepted.
    pub async fn auth_outcome(
        &self,
        credentials: &Credentials,
    ) -> Result<AuthOutcome, ContractViolation> {
        let response = self.api.authenticate(credentials).await?;
        expect_status("authenticate", &response, Expected::Exactly(200))?;
        decode("authenticate", &response)
    }

    pub async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<SessionToken, ContractViolation> {
        match self
            .auth_outcome(&Credentials::new(username, password))
            .await?
        {
            AuthOutcome::Granted { token } => Ok(SessionToken::new(token)),
            AuthOutcome::Rejected { reason } => Err(ContractViolation::ShapeMismatch {
                operation: "authenticate",
                detail: format!("credentials rejected: {}", reason),
            }),
        }
    }

    pub async fn create(&self, record: &BookingRecord) -> Result<BookingId, ContractViolation> {
        Ok(self.create_full(record).await?.bookingid)
    }

    pub async fn create_full(
        &self,
        record: &BookingRecord,
    ) -> Result<CreatedBooking, ContractViolation> {
        let response = self.api.create_booking(&record.to_payload()).await?;
        expect_status("create", &response, Expected::Exactly(200))?;
        decode("create", &response)
    }

    pub async fn fetch(&self, id: BookingId) -> Result<BookingRecord, ContractViolation> {
        let response = self.api.get_booking(id).await?;
        expect_status("fetch", &response, Expected::Exactly(200))?;
        decode("fetch", &response)
    }

    pub async fn expect_absent(&self, id: BookingId) -> Result<(), ContractViolation> {
        let response = self.api.get_booking(id).await?;
        expect_status("fetch", &response, Expected::Exactly(404))
    }

    pub async fn update(
        &self,
        id: BookingId,
        record: &BookingRecord,
        token: &SessionToken,
    ) -> Result<BookingRecord, ContractViolation> {
        let response = self
            .api
            .update_booking(id, &record.to_payload(), Some(token))
            .await?;
        expect_status("update", &response, Expected::Exactly(200))?;
        decode("update", &response)
    }

    /// Deleted bookings must no longer be fetchable.
    pub async fn delete(&self, id: BookingId, token: &SessionToken) -> Result<(), ContractViolation> {
        let response = self.api.delete_booking(id, Some(token)).await?;
        expect_status("delete", &response, Expected::DELETED)?;
        self.expect_absent(id).await
    }

    pub async fn list(&self) -> Result<Vec<BookingId>, ContractViolation> {
        let response = self.api.list_bookings().await?;
        expect_status("list", &response, Expected::Exactly(200))?;
        expect_array("list", &response)?
            .into_iter()
            .map(|item| {
                serde_json::from_value::<BookingListEntry>(item)
                    .map(|entry| entry.id())
                    .map_err(|e| ContractViolation::ShapeMismatch {
                        operation: "list",
                        detail: e.to_string(),
                    })
            })
            .collect()
    }

    /// Best-effort removal; failures are logged, never returned.
    pub async fn cleanup(&self, id: BookingId, token: &SessionToken) {
        match self.api.delete_booking(id, Some(token)).await {
            Ok(response) if Expected::DELETED.matches(response.status) => {}
            Ok(response) => {
                warn!(booking_id = %id, status = response.status, "cleanup delete not accepted")
            }
            Err(e) => warn!(booking_id = %id, error = %e, "cleanup delete failed"),
        }
    }

    /// Deletes whatever a raw create left behind, if it created anything.
    pub async fn discard_created(&self, response: &ApiResponse, token: &SessionToken) {
        if response.status != 200 {
            return;
        }
        let id = response
            .json_value()
            .ok()
            .and_then(|body| body.get("bookingid").cloned())
            .and_then(|id| serde_json::from_value::<BookingId>(id).ok());
        match id {
            Some(id) => self.cleanup(id, token).await,
            None => warn!("accepted create without a bookingid, nothing to clean up"),
        }
    }

    pub async fn create_raw(&self, payload: &Value) -> Result<ApiResponse, ContractViolation> {
        Ok(self.api.create_booking(payload).await?)
    }
}
