// HTTP transport for the restful-booker API
// Every call returns the raw status, body and elapsed time; asserting on them is the harness's job

use crate::booking::{BookingId, Credentials, SessionToken};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, COOKIE};
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "https://restful-booker.herokuapp.com";

// Transport-level failures; remote status codes are never turned into errors here
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Request timeout after {0}ms")]
    Timeout(u64),

    #[error("Undecodable body (status {status}): {message}")]
    DecodeError { status: u16, message: String },
}

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Initialization error: {0}")]
    InitError(String),
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout_ms: u64,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_ms: 10_000,
            user_agent: concat!("booking-contract-harness/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl ClientConfig {
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
    /// Time from sending the request until the response head arrived.
    pub elapsed: Duration,
}

impl ApiResponse {
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        serde_json::from_str(&self.body).map_err(|e| ApiError::DecodeError {
            status: self.status,
            message: e.to_string(),
        })
    }

    pub fn json_value(&self) -> Result<Value, ApiError> {
        self.json::<Value>()
    }
}

/// Raw operations of the booking API.
///
/// Implementations must not interpret status codes: a 404 or a 500 is a
/// successful call from the transport's point of view.
#[async_trait]
pub trait BookingApi: Send + Sync {
    async fn ping(&self) -> Result<ApiResponse, ApiError>;

    async fn authenticate(&self, credentials: &Credentials) -> Result<ApiResponse, ApiError>;

    async fn create_booking(&self, payload: &Value) -> Result<ApiResponse, ApiError>;

    async fn list_bookings(&self) -> Result<ApiResponse, ApiError>;

    async fn get_booking(&self, id: BookingId) -> Result<ApiResponse, ApiError>;

    async fn update_booking(
        &self,
        id: BookingId,
        payload: &Value,
        token: Option<&SessionToken>,
    ) -> Result<ApiResponse, ApiError>;

    async fn delete_booking(
        &self,
        id: BookingId,
        token: Option<&SessionToken>,
    ) -> Result<ApiResponse, ApiError>;
}

pub struct RestfulBookerClient {
    http: reqwest::Client,
    base_url: String,
    timeout_ms: u64,
}

impl RestfulBookerClient {
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let base_url = config.base_url.trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(ClientError::ConfigError("base_url is empty".to_string()));
        }
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ClientError::ConfigError(format!(
                "base_url must be an http(s) URL, got {}",
                base_url
            )));
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .user_agent(config.user_agent)
            .build()
            .map_err(|e| ClientError::InitError(e.to_string()))?;

        Ok(Self {
            http,
            base_url,
            timeout_ms: config.timeout_ms,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}{}", self.base_url, path))
            .header(ACCEPT, "application/json")
    }

    fn with_token(request: RequestBuilder, token: Option<&SessionToken>) -> RequestBuilder {
        match token {
            Some(token) => request.header(COOKIE, token.cookie_header()),
            None => request,
        }
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        request: RequestBuilder,
    ) -> Result<ApiResponse, ApiError> {
        let started = Instant::now();
        let response = request.send().await.map_err(|e| self.map_transport(e))?;
        // Latency is time to the response head; the body read is not counted
        let elapsed = started.elapsed();
        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| self.map_transport(e))?;

        debug!(
            method = %method,
            path,
            status,
            elapsed_ms = elapsed.as_millis() as u64,
            "booking api call"
        );

        Ok(ApiResponse {
            status,
            body,
            elapsed,
        })
    }

    fn map_transport(&self, error: reqwest::Error) -> ApiError {
        if error.is_timeout() {
            ApiError::Timeout(self.timeout_ms)
        } else {
            ApiError::NetworkError(error.to_string())
        }
    }
}

#[async_trait]
impl BookingApi for RestfulBookerClient {
    async fn ping(&self) -> Result<ApiResponse, ApiError> {
        let request = self.request(Method::GET, "/ping");
        self.send(Method::GET, "/ping", request).await
    }

    async fn authenticate(&self, credentials: &Credentials) -> Result<ApiResponse, ApiError> {
        let request = self.request(Method::POST, "/auth").json(credentials);
        self.send(Method::POST, "/auth", request).await
    }

    async fn create_booking(&self, payload: &Value) -> Result<ApiResponse, ApiError> {
        let request = self.request(Method::POST, "/booking").json(payload);
        self.send(Method::POST, "/booking", request).await
    }

    async fn list_bookings(&self) -> Result<ApiResponse, ApiError> {
        let request = self.request(Method::GET, "/booking");
        self.send(Method::GET, "/booking", request).await
    }

    async fn get_booking(&self, id: BookingId) -> Result<ApiResponse, ApiError> {
        let path = format!("/booking/{}", id);
        let request = self.request(Method::GET, &path);
        self.send(Method::GET, &path, request).await
    }

    async fn update_booking(
        &self,
        id: BookingId,
        payload: &Value,
        token: Option<&SessionToken>,
    ) -> Result<ApiResponse, ApiError> {
        let path = format!("/booking/{}", id);
        let request = Self::with_token(self.request(Method::PUT, &path).json(payload), token);
        self.send(Method::PUT, &path, request).await
    }

    async fn delete_booking(
        &self,
        id: BookingId,
        token: Option<&SessionToken>,
    ) -> Result<ApiResponse, ApiError> {
        let path = format!("/booking/{}", id);
        let request = Self::with_token(self.request(Method::DELETE, &path), token);
        self.send(Method::DELETE, &path, request).await
    }
}
