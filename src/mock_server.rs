// In-process stand-in for restful-booker, used to test the harness offline.
// Mirrors the remote's observed quirks: 200 on bad credentials, 500 on missing
// fields, 403 without a token, 201 on delete, and permissive validation.

use crate::booking::DATE_FORMAT;
use crate::client::{ClientConfig, RestfulBookerClient};
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use dashmap::DashMap;
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

const REQUIRED_FIELDS: [&str; 4] = ["firstname", "lastname", "totalprice", "depositpaid"];

// Knobs for the places where the real remote is inconsistent or permissive
#[derive(Debug, Clone)]
pub struct StubBehavior {
    pub strict_validation: bool,
    pub unauthorized_status: u16,
    pub delete_status: u16,
    pub list_delay: Duration,
}

impl Default for StubBehavior {
    fn default() -> Self {
        Self {
            strict_validation: false,
            unauthorized_status: 403,
            delete_status: 201,
            list_delay: Duration::ZERO,
        }
    }
}

#[derive(Clone)]
struct StubState {
    behavior: Arc<StubBehavior>,
    bookings: Arc<DashMap<u64, Value>>,
    tokens: Arc<DashMap<String, ()>>,
    next_id: Arc<AtomicU64>,
    delete_calls: Arc<AtomicUsize>,
}

pub struct MockServer {
    base_url: String,
    state: StubState,
    task: JoinHandle<()>,
}

impl MockServer {
    pub async fn start() -> Self {
        Self::start_with(StubBehavior::default()).await
    }

    pub async fn start_with(behavior: StubBehavior) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("stub bind failed");
        let addr = listener.local_addr().expect("stub local addr failed");

        let state = StubState {
            behavior: Arc::new(behavior),
            bookings: Arc::new(DashMap::new()),
            tokens: Arc::new(DashMap::new()),
            next_id: Arc::new(AtomicU64::new(1)),
            delete_calls: Arc::new(AtomicUsize::new(0)),
        };

        let app = Router::new()
            .route("/ping", get(ping))
            .route("/auth", post(auth))
            .route("/booking", get(list).post(create))
            .route("/booking/:id", get(fetch).put(update).delete(remove))
            .with_state(state.clone());

        let task = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            base_url: format!("http://{}", addr),
            state,
            task,
        }
    }

    pub fn client(&self) -> RestfulBookerClient {
        RestfulBookerClient::new(ClientConfig::with_base_url(self.base_url.clone()))
            .expect("stub client config is valid")
    }

    pub fn booking_count(&self) -> usize {
        self.state.bookings.len()
    }

    pub fn contains(&self, id: u64) -> bool {
        self.state.bookings.contains_key(&id)
    }

    pub fn delete_calls(&self) -> usize {
        self.state.delete_calls.load(Ordering::SeqCst)
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn status(code: u16) -> StatusCode {
    StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

fn text(code: u16) -> Response {
    let code = status(code);
    (code, code.canonical_reason().unwrap_or("")).into_response()
}

fn authorized(state: &StubState, headers: &HeaderMap) -> bool {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().strip_prefix("token="))
        .any(|token| state.tokens.contains_key(token))
}

fn has_required_fields(payload: &Value) -> bool {
    REQUIRED_FIELDS.iter().all(|field| payload.get(field).is_some())
        && payload["bookingdates"].get("checkin").is_some()
        && payload["bookingdates"].get("checkout").is_some()
}

fn is_iso_date(value: &Value) -> bool {
    value
        .as_str()
        .map(|s| chrono::NaiveDate::parse_from_str(s, DATE_FORMAT).is_ok())
        .unwrap_or(false)
}

fn is_plain_name(value: &Value) -> bool {
    value
        .as_str()
        .map(|s| !s.contains(['{', '}', '$']))
        .unwrap_or(false)
}

fn is_well_typed(payload: &Value) -> bool {
    is_plain_name(&payload["firstname"])
        && is_plain_name(&payload["lastname"])
        && payload["totalprice"].is_i64()
        && payload["depositpaid"].is_boolean()
        && is_iso_date(&payload["bookingdates"]["checkin"])
        && is_iso_date(&payload["bookingdates"]["checkout"])
}

// The remote only keeps the fields it knows about
fn stored_booking(payload: &Value) -> Value {
    let mut booking = json!({
        "firstname": payload["firstname"],
        "lastname": payload["lastname"],
        "totalprice": payload["totalprice"],
        "depositpaid": payload["depositpaid"],
        "bookingdates": {
            "checkin": payload["bookingdates"]["checkin"],
            "checkout": payload["bookingdates"]["checkout"],
        },
    });
    if let Some(needs) = payload.get("additionalneeds") {
        booking["additionalneeds"] = needs.clone();
    }
    booking
}

fn validate(state: &StubState, body: &Bytes, missing_status: u16) -> Result<Value, Response> {
    let payload: Value = serde_json::from_slice(body).map_err(|_| text(400))?;
    if !has_required_fields(&payload) {
        return Err(text(missing_status));
    }
    if state.behavior.strict_validation && !is_well_typed(&payload) {
        return Err(text(400));
    }
    Ok(stored_booking(&payload))
}

async fn ping() -> Response {
    text(201)
}

async fn auth(State(state): State<StubState>, body: Bytes) -> Response {
    let payload: Value = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(_) => return text(400),
    };

    if payload["username"] == "admin" && payload["password"] == "password123" {
        let token: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(15)
            .map(char::from)
            .collect();
        state.tokens.insert(token.clone(), ());
        Json(json!({ "token": token })).into_response()
    } else {
        Json(json!({ "reason": "Bad credentials" })).into_response()
    }
}

async fn list(State(state): State<StubState>) -> Response {
    if !state.behavior.list_delay.is_zero() {
        tokio::time::sleep(state.behavior.list_delay).await;
    }
    let ids: Vec<Value> = state
        .bookings
        .iter()
        .map(|entry| json!({ "bookingid": *entry.key() }))
        .collect();
    Json(Value::Array(ids)).into_response()
}

async fn create(State(state): State<StubState>, body: Bytes) -> Response {
    let booking = match validate(&state, &body, 500) {
        Ok(booking) => booking,
        Err(response) => return response,
    };
    let id = state.next_id.fetch_add(1, Ordering::SeqCst);
    state.bookings.insert(id, booking.clone());
    Json(json!({ "bookingid": id, "booking": booking })).into_response()
}

async fn fetch(State(state): State<StubState>, Path(id): Path<u64>) -> Response {
    match state.bookings.get(&id) {
        Some(booking) => Json(booking.value().clone()).into_response(),
        None => text(404),
    }
}

async fn update(
    State(state): State<StubState>,
    Path(id): Path<u64>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if !authorized(&state, &headers) {
        return text(state.behavior.unauthorized_status);
    }
    if !state.bookings.contains_key(&id) {
        return text(405);
    }
    let booking = match validate(&state, &body, 400) {
        Ok(booking) => booking,
        Err(response) => return response,
    };
    state.bookings.insert(id, booking.clone());
    Json(booking).into_response()
}

async fn remove(
    State(state): State<StubState>,
    Path(id): Path<u64>,
    headers: HeaderMap,
) -> Response {
    state.delete_calls.fetch_add(1, Ordering::SeqCst);
    if !authorized(&state, &headers) {
        return text(state.behavior.unauthorized_status);
    }
    match state.bookings.remove(&id) {
        Some(_) => text(state.behavior.delete_status),
        None => text(405),
    }
}
