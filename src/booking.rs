// Wire data model for the restful-booker API

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

// Date format the remote documents for booking dates
pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl Default for Credentials {
    // Public demo account of restful-booker
    fn default() -> Self {
        Self::new("admin", "password123")
    }
}

/// Opaque session credential returned by `POST /auth`.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Value of the `Cookie` header that authorizes mutating calls.
    pub fn cookie_header(&self) -> String {
        format!("token={}", self.0)
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionToken(<redacted>)")
    }
}

/// Body of a `POST /auth` response. The remote answers 200 either way.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum AuthOutcome {
    Granted { token: String },
    Rejected { reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookingId(pub u64);

impl fmt::Display for BookingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BookingDates {
    pub checkin: String,
    pub checkout: String,
}

impl BookingDates {
    pub fn new(checkin: impl Into<String>, checkout: impl Into<String>) -> Self {
        Self {
            checkin: checkin.into(),
            checkout: checkout.into(),
        }
    }

    pub fn from_dates(checkin: NaiveDate, checkout: NaiveDate) -> Self {
        Self::new(
            checkin.format(DATE_FORMAT).to_string(),
            checkout.format(DATE_FORMAT).to_string(),
        )
    }

    // None when either side is not a YYYY-MM-DD date
    pub fn parse(&self) -> Option<(NaiveDate, NaiveDate)> {
        let checkin = NaiveDate::parse_from_str(&self.checkin, DATE_FORMAT).ok()?;
        let checkout = NaiveDate::parse_from_str(&self.checkout, DATE_FORMAT).ok()?;
        Some((checkin, checkout))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BookingRecord {
    pub firstname: String,
    pub lastname: String,
    pub totalprice: i64,
    pub depositpaid: bool,
    pub bookingdates: BookingDates,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additionalneeds: Option<String>,
}

impl BookingRecord {
    /// The booking every scoped fixture creates: John Doe, 150, June 2025.
    pub fn sample() -> Self {
        Self {
            firstname: "John".to_string(),
            lastname: "Doe".to_string(),
            totalprice: 150,
            depositpaid: true,
            bookingdates: BookingDates::new("2025-06-01", "2025-06-10"),
            additionalneeds: Some("Breakfast".to_string()),
        }
    }

    pub fn to_payload(&self) -> serde_json::Value {
        // Plain data struct, serialization cannot fail
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// Body of a successful `POST /booking`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct CreatedBooking {
    pub bookingid: BookingId,
    pub booking: BookingRecord,
}

/// One element of the `GET /booking` collection.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum BookingListEntry {
    Object { bookingid: BookingId },
    Bare(BookingId),
}

impl BookingListEntry {
    pub fn id(&self) -> BookingId {
        match *self {
            BookingListEntry::Object { bookingid } => bookingid,
            BookingListEntry::Bare(id) => id,
        }
    }
}
