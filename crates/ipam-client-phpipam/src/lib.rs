// # phpIPAM Resource Store
//
// This crate provides the phpIPAM REST implementation of the
// `ResourceStore` trait from `ipam-core`.
//
// ## Scope
//
// - One HTTP request per store operation (plus a one-time token login)
// - Full error propagation to the caller (no retry, no backoff)
// - HTTP timeout configured (30 seconds)
// - Specific error handling for HTTP status codes (401/403, 404, 5xx)
// - Optional TLS certificate validation bypass for lab installations
// - NO caching of records (idempotence is owned by the reconcile engine)
//
// ## API Reference
//
// - phpIPAM API: https://phpipam.net/api/api_documentation/
// - Authentication: POST `/api/{app_id}/user/` with HTTP Basic credentials,
//   returns a session token sent as the `token` header afterwards
// - Responses are wrapped in `{"code": .., "success": .., "data": ..}`;
//   an empty lookup is reported as 404 / `success: false`, not as an error
//   payload

use async_trait::async_trait;
use ipam_core::config::ServerConfig;
use ipam_core::kinds::{self, KindSpec, UpdateAddressing};
use ipam_core::payload::{Fields, value_to_string};
use ipam_core::resource::{RemoteResource, ResourceKind};
use ipam_core::traits::{LookupQuery, ResourceStore};
use ipam_core::{Error, Result};
use reqwest::{Method, StatusCode};
use serde_json::Value;
use std::time::Duration;

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// User agent sent with every request
const USER_AGENT: &str = concat!("ipam-reconcile/", env!("CARGO_PKG_VERSION"));

/// phpIPAM REST store
///
/// Holds the connection parameters and a lazily acquired session token.
/// All coordination (ordering, failure policy) is owned by the caller; this
/// type only translates store operations into single HTTP calls.
///
/// # Security
///
/// The Debug implementation intentionally exposes neither the password nor
/// the session token.
pub struct PhpipamClient {
    /// Base URL without trailing slash
    base_url: String,

    /// API application id
    app_id: String,

    /// API username
    username: String,

    /// API password
    /// ⚠️ NEVER log this value
    password: String,

    /// HTTP client for API requests
    client: reqwest::Client,

    /// Session token, acquired on first use
    token: tokio::sync::Mutex<Option<String>>,
}

impl std::fmt::Debug for PhpipamClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhpipamClient")
            .field("base_url", &self.base_url)
            .field("app_id", &self.app_id)
            .field("username", &self.username)
            .field("password", &"<REDACTED>")
            .field("token", &"<REDACTED>")
            .finish()
    }
}

impl PhpipamClient {
    /// Create a new phpIPAM store from connection parameters
    ///
    /// With `validate_certs` disabled the underlying HTTP client accepts
    /// invalid TLS certificates — intended for lab installations with
    /// self-signed certificates only.
    pub fn new(config: &ServerConfig) -> Result<Self> {
        config.validate()?;

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .user_agent(USER_AGENT)
            .danger_accept_invalid_certs(!config.validate_certs)
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {}", e)))?;

        if !config.validate_certs {
            tracing::warn!("TLS certificate validation is disabled");
        }

        Ok(Self {
            base_url: config.url.trim_end_matches('/').to_string(),
            app_id: config.app_id.clone(),
            username: config.username.clone(),
            password: config.password.clone(),
            client,
            token: tokio::sync::Mutex::new(None),
        })
    }

    /// Root URL of a controller: `{base}/api/{app_id}/{controller}/`
    fn controller_url(&self, controller: &str) -> String {
        format!("{}/api/{}/{}/", self.base_url, self.app_id, controller)
    }

    /// Get the session token, logging in on first use
    ///
    /// ```http
    /// POST /api/{app_id}/user/
    /// Authorization: Basic <username:password>
    /// ```
    async fn token(&self) -> Result<String> {
        let mut token = self.token.lock().await;
        if let Some(ref token) = *token {
            return Ok(token.clone());
        }

        tracing::debug!("Acquiring phpIPAM session token");

        let url = self.controller_url("user");
        let response = self
            .client
            .post(&url)
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .await
            .map_err(|e| Error::http(format!("Login request failed: {}", e)))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(Error::auth(format!(
                "Invalid credentials or app id. Status: {}",
                status
            )));
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(Error::auth(format!("Login failed: {} - {}", status, text)));
        }

        let json: Value = response
            .json()
            .await
            .map_err(|e| Error::auth(format!("Failed to parse login response: {}", e)))?;

        let fresh = json["data"]["token"]
            .as_str()
            .ok_or_else(|| Error::auth("Login response carries no token"))?
            .to_string();

        *token = Some(fresh.clone());
        Ok(fresh)
    }

    /// Send one authenticated request
    async fn send(
        &self,
        method: Method,
        url: &str,
        body: Option<&Fields>,
    ) -> Result<reqwest::Response> {
        let token = self.token().await?;

        let mut request = self
            .client
            .request(method, url)
            .header("token", token)
            .header("Content-Type", "application/json");
        if let Some(body) = body {
            request = request.json(body);
        }

        request
            .send()
            .await
            .map_err(|e| Error::http(format!("HTTP request failed: {}", e)))
    }

    /// Execute a lookup request; "nothing matched" is `Ok(None)`
    async fn request_optional(&self, controller: &str, url: &str) -> Result<Option<Value>> {
        let response = self.send(Method::GET, url, None).await?;
        let status = response.status();

        // phpIPAM reports an empty lookup as 404, not as an empty list.
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(status_error(controller, status, &text));
        }

        let json: Value = response
            .json()
            .await
            .map_err(|e| Error::api(controller, format!("Failed to parse response: {}", e)))?;

        if json["success"].as_bool() == Some(false) {
            // Some installations wrap no-result lookups in a 200 envelope.
            return Ok(None);
        }

        match json.get("data") {
            Some(Value::Null) | None => Ok(None),
            Some(data) => Ok(Some(data.clone())),
        }
    }

    /// Execute a mutating request; any failure is an error
    async fn request_mutation(
        &self,
        controller: &str,
        method: Method,
        url: &str,
        body: Option<&Fields>,
    ) -> Result<()> {
        let response = self.send(method, url, body).await?;
        let status = response.status();

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(status_error(controller, status, &text));
        }

        let json: Value = response
            .json()
            .await
            .map_err(|e| Error::api(controller, format!("Failed to parse response: {}", e)))?;

        if json["success"].as_bool() == Some(false) {
            let message = json["message"].as_str().unwrap_or("request not successful");
            return Err(Error::api(controller, message));
        }

        Ok(())
    }
}

/// Map a non-success HTTP status to the error taxonomy
fn status_error(controller: &str, status: StatusCode, text: &str) -> Error {
    match status.as_u16() {
        401 | 403 => Error::auth(format!(
            "Invalid token or insufficient permissions. Status: {}",
            status
        )),
        404 => Error::not_found(format!("{}: {}", controller, server_message(text))),
        500..=599 => Error::api(
            controller,
            format!("Server error (transient): {} - {}", status, server_message(text)),
        ),
        _ => Error::api(
            controller,
            format!("{} - {}", status, server_message(text)),
        ),
    }
}

/// Pull the `message` field out of an error envelope, falling back to the
/// raw body
fn server_message(text: &str) -> String {
    serde_json::from_str::<Value>(text)
        .ok()
        .and_then(|v| v["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| text.to_string())
}

/// Convert an API record object into a [`RemoteResource`]
///
/// The id field varies by kind (`id` for most controllers, `vlanId` for
/// VLANs) and may arrive as a number or a string.
fn to_remote(spec: &KindSpec, value: &Value) -> Result<RemoteResource> {
    let Some(map) = value.as_object() else {
        return Err(Error::api(
            spec.controller,
            "Invalid response format: record is not an object",
        ));
    };

    let id = map
        .get(spec.id_field)
        .map(value_to_string)
        .ok_or_else(|| {
            Error::api(
                spec.controller,
                format!("Invalid response format: record has no '{}' field", spec.id_field),
            )
        })?;

    Ok(RemoteResource {
        id,
        fields: map.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
    })
}

/// Compare a record field against an expected value, tolerating the API's
/// mix of string and numeric scalars
fn field_matches(actual: Option<&Value>, expected: &str) -> bool {
    actual.is_some_and(|v| value_to_string(v) == expected)
}

/// Pick the matching record out of a lookup response
///
/// Filter lookups return lists; path lookups may return a single object.
/// Client-side filters narrow list results where the API cannot (subnet by
/// section, VLAN by number).
fn select_record(
    spec: &KindSpec,
    data: &Value,
    query: &LookupQuery,
) -> Result<Option<RemoteResource>> {
    let filter = |record: &&Value| match query {
        LookupQuery::ByCidr { section_id, .. } => {
            field_matches(record.get("sectionId"), section_id)
        }
        LookupQuery::ByNumber { number, .. } => field_matches(record.get("number"), number),
        _ => true,
    };

    match data {
        Value::Array(records) => records
            .iter()
            .find(filter)
            .map(|record| to_remote(spec, record))
            .transpose(),
        object => Ok(Some(to_remote(spec, object)?)),
    }
}

#[async_trait]
impl ResourceStore for PhpipamClient {
    async fn lookup(
        &self,
        kind: ResourceKind,
        query: &LookupQuery,
    ) -> Result<Option<RemoteResource>> {
        let spec = kinds::spec(kind);
        let root = self.controller_url(spec.controller);

        let url = match query {
            LookupQuery::ByPath { value } => format!("{}{}/", root, value),
            LookupQuery::ByFilter { field, value } => {
                format!("{}?filter_by={}&filter_value={}", root, field, value)
            }
            LookupQuery::ByCidr { subnet, mask, .. } => {
                format!("{}cidr/{}/{}/", root, subnet, mask)
            }
            LookupQuery::ByNumber { domain_id, .. } => {
                format!("{}?filter_by=domainId&filter_value={}", root, domain_id)
            }
        };

        tracing::debug!(kind = %kind, %url, "Lookup");

        let Some(data) = self.request_optional(spec.controller, &url).await? else {
            return Ok(None);
        };

        select_record(spec, &data, query)
    }

    async fn create(&self, kind: ResourceKind, payload: &Fields) -> Result<()> {
        let spec = kinds::spec(kind);
        let url = self.controller_url(spec.controller);
        tracing::debug!(kind = %kind, %url, "Create");
        self.request_mutation(spec.controller, Method::POST, &url, Some(payload))
            .await
    }

    async fn update(&self, kind: ResourceKind, id: &str, payload: &Fields) -> Result<()> {
        let spec = kinds::spec(kind);
        let url = match spec.update {
            UpdateAddressing::IdInPath => format!("{}{}/", self.controller_url(spec.controller), id),
            UpdateAddressing::IdInBody => self.controller_url(spec.controller),
        };
        tracing::debug!(kind = %kind, %url, "Update");
        self.request_mutation(spec.controller, Method::PATCH, &url, Some(payload))
            .await
    }

    async fn delete(&self, kind: ResourceKind, id: &str) -> Result<()> {
        let spec = kinds::spec(kind);
        let url = format!("{}{}/", self.controller_url(spec.controller), id);
        tracing::debug!(kind = %kind, %url, "Delete");
        self.request_mutation(spec.controller, Method::DELETE, &url, None)
            .await
    }

    fn store_name(&self) -> &'static str {
        "phpipam"
    }
}
