//! Time-synced NiceHash API client.
//!
//! Holds the offset between server and local clocks. Every authenticated
//! call stamps `X-Time` with local time plus that offset; until the first
//! successful [`NiceHashClient::sync_time`] all authenticated calls fail
//! with [`ApiError::NotSynced`]. No retries: a failed call is returned to
//! the caller.

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use autopilot_core::telemetry::RigDetails;
use reqwest::Method;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};
use url::Url;

use super::algorithms::{AlgorithmEntry, parse_algorithms};
use super::commands::{PowerMode, RigStatusRequest};
use super::rig_details::RigDetailsWire;
use super::signing::{QueryParams, SignableRequest, generate_nonce, sign};
use crate::config::ApiConfig;
use crate::error::ApiError;

pub const TIME_PATH: &str = "/api/v2/time";
pub const RIG_DETAILS_PATH: &str = "/main/api/v2/mining/rig2";
pub const RIG_STATUS_PATH: &str = "/main/api/v2/mining/rigs/status2";
pub const ALGORITHMS_PATH: &str = "/main/api/v2/mining/algorithms";

pub const CONTENT_TYPE_JSON: &str = "application/json; charset=UTF-8";

/// Per-call options.
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    /// Explicit query parameters; win over keys embedded in the path.
    pub query: Option<QueryParams>,
    pub body: Option<Value>,
    /// Local epoch ms to sign with instead of the wall clock.
    pub time_override_ms: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServerTime {
    server_time: i64,
}

pub fn local_now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Split `path?query` and overlay `explicit` onto the embedded parameters.
pub fn split_and_merge_query(
    path: &str,
    explicit: Option<&QueryParams>,
) -> (String, QueryParams) {
    let (path_only, mut query) = match path.split_once('?') {
        Some((p, q)) => (p.to_string(), QueryParams::parse(q)),
        None => (path.to_string(), QueryParams::new()),
    };
    if let Some(explicit) = explicit {
        query.merge(explicit);
    }
    (path_only, query)
}

/// Headers of an authenticated request, in send order.
pub fn build_headers(
    time_ms: u64,
    nonce: &str,
    org_id: &str,
    locale: &str,
    auth: &str,
) -> Vec<(&'static str, String)> {
    vec![
        ("X-Time", time_ms.to_string()),
        ("X-Nonce", nonce.to_string()),
        ("X-Request-Id", nonce.to_string()),
        ("X-Organization-Id", org_id.to_string()),
        ("X-User-Lang", locale.to_string()),
        ("X-Auth", auth.to_string()),
        ("Content-Type", CONTENT_TYPE_JSON.to_string()),
    ]
}

pub struct NiceHashClient {
    http: reqwest::Client,
    base_url: Url,
    api_key: String,
    api_secret: String,
    org_id: String,
    locale: String,
    offset_ms: AtomicI64,
    synced: AtomicBool,
}

impl NiceHashClient {
    pub fn new(api: &ApiConfig, timeout: Duration) -> Result<Self, ApiError> {
        let base_url = Url::parse(&api.base_url)
            .map_err(|e| ApiError::InvalidRequest(format!("base url {:?}: {e}", api.base_url)))?;
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url,
            api_key: api.api_key.clone(),
            api_secret: api.api_secret.clone(),
            org_id: api.org_id.clone(),
            locale: api.locale.clone(),
            offset_ms: AtomicI64::new(0),
            synced: AtomicBool::new(false),
        })
    }

    /// Server minus local clock, `None` before the first sync.
    pub fn offset_ms(&self) -> Option<i64> {
        self.synced
            .load(Ordering::Acquire)
            .then(|| self.offset_ms.load(Ordering::Relaxed))
    }

    pub fn is_synced(&self) -> bool {
        self.synced.load(Ordering::Acquire)
    }

    /// Record the offset from a server reading taken at `local_ms`.
    pub fn set_server_time(&self, server_ms: i64, local_ms: u64) -> i64 {
        let offset = server_ms - local_ms as i64;
        self.offset_ms.store(offset, Ordering::Relaxed);
        self.synced.store(true, Ordering::Release);
        offset
    }

    /// Fetch server time and store the clock offset.
    pub async fn sync_time(&self) -> Result<i64, ApiError> {
        let url = self.url_for(TIME_PATH, &QueryParams::new())?;
        let resp = self.http.get(url).send().await?;
        let status = resp.status();
        let text = resp.text().await?;
        if !status.is_success() {
            return Err(ApiError::RequestFailed {
                status: Some(status.as_u16()),
                body: text,
            });
        }
        let server: ServerTime = serde_json::from_str(&text)?;
        let offset = self.set_server_time(server.server_time, local_now_ms());
        info!(offset_ms = offset, "api time synced");
        Ok(offset)
    }

    /// Issue one signed call and return the decoded JSON response
    /// (`Value::Null` for an empty body).
    pub async fn call(
        &self,
        method: Method,
        path: &str,
        options: CallOptions,
    ) -> Result<Value, ApiError> {
        let offset = self.offset_ms().ok_or(ApiError::NotSynced)?;
        let (path_only, query) = split_and_merge_query(path, options.query.as_ref());
        let local_ms = options.time_override_ms.unwrap_or_else(local_now_ms);
        let time_ms = (local_ms as i64).saturating_add(offset).max(0) as u64;
        let url = self.url_for(&path_only, &query)?;
        let nonce = generate_nonce();
        let body = options
            .body
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let auth = sign(
            &self.api_key,
            &self.api_secret,
            time_ms,
            &nonce,
            &self.org_id,
            &SignableRequest {
                method: method.as_str(),
                path: url.path(),
                query: Some(url.query().unwrap_or("")),
                body: body.as_deref(),
            },
        )?;

        debug!(%method, path = %path_only, "api call");
        let mut req = self.http.request(method, url);
        for (name, value) in build_headers(time_ms, &nonce, &self.org_id, &self.locale, &auth) {
            req = req.header(name, value);
        }
        if let Some(body) = body {
            req = req.body(body);
        }

        let resp = req.send().await?;
        let status = resp.status();
        let text = resp.text().await?;
        if !status.is_success() {
            return Err(ApiError::RequestFailed {
                status: Some(status.as_u16()),
                body: text,
            });
        }
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }

    /// Resolve `path` against the base URL. The path and query must come
    /// out byte-for-byte as given; anything the URL parser would rewrite
    /// (percent-encoding, dot segments) is refused.
    fn url_for(&self, path: &str, query: &QueryParams) -> Result<Url, ApiError> {
        let mut url = self
            .base_url
            .join(path)
            .map_err(|e| ApiError::InvalidRequest(format!("path {path:?}: {e}")))?;
        if url.path() != path {
            return Err(ApiError::InvalidRequest(format!(
                "path {path:?} would be sent as {:?}",
                url.path()
            )));
        }
        if !query.is_empty() {
            let encoded = query.encode();
            url.set_query(Some(&encoded));
            if url.query() != Some(encoded.as_str()) {
                return Err(ApiError::InvalidRequest(format!(
                    "query {encoded:?} would be sent as {:?}",
                    url.query()
                )));
            }
        }
        Ok(url)
    }

    pub async fn get_rig_details(&self, rig_id: &str) -> Result<RigDetails, ApiError> {
        let path = format!("{RIG_DETAILS_PATH}/{}", path_segment(rig_id)?);
        let value = self.call(Method::GET, &path, CallOptions::default()).await?;
        Ok(RigDetailsWire::from_value(value)?.into_details())
    }

    pub async fn set_rig_status(&self, rig_id: &str, on: bool) -> Result<(), ApiError> {
        self.post_status(RigStatusRequest::status(rig_id, on)).await
    }

    pub async fn set_rig_power_mode(&self, rig_id: &str, mode: PowerMode) -> Result<(), ApiError> {
        self.post_status(RigStatusRequest::power_mode(rig_id, mode))
            .await
    }

    pub async fn get_algorithms(&self) -> Result<Vec<AlgorithmEntry>, ApiError> {
        let value = self
            .call(Method::GET, ALGORITHMS_PATH, CallOptions::default())
            .await?;
        Ok(parse_algorithms(value)?)
    }

    async fn post_status(&self, request: RigStatusRequest) -> Result<(), ApiError> {
        let body = serde_json::to_value(&request)?;
        let options = CallOptions {
            body: Some(body),
            ..CallOptions::default()
        };
        self.call(Method::POST, RIG_STATUS_PATH, options).await?;
        Ok(())
    }
}

/// Rig ids are opaque; refuse anything that would change the path shape.
fn path_segment(rig_id: &str) -> Result<&str, ApiError> {
    if rig_id.is_empty() || rig_id.contains(['/', '?', '#', '%']) {
        return Err(ApiError::InvalidRequest(format!("rig id {rig_id:?}")));
    }
    Ok(rig_id)
}
