// Contract test harness for the restful-booker hotel booking API

pub mod booking;
pub mod client;
pub mod contract;
pub mod fixture;
pub mod harness;
pub mod session;
pub mod suite;

#[cfg(test)]
mod mock_server;

// Re-export key types for convenience
pub use booking::{
    AuthOutcome, BookingDates, BookingId, BookingRecord, CreatedBooking, Credentials,
    SessionToken,
};
pub use client::{
    ApiError, ApiResponse, BookingApi, ClientConfig, ClientError, RestfulBookerClient,
    DEFAULT_BASE_URL,
};
pub use contract::{ContractViolation, Expected};
pub use fixture::with_booking;
pub use harness::ContractHarness;
pub use session::Session;
pub use suite::{CaseOutcome, CaseResult, ContractSuite, Expectation, SuiteReport};
