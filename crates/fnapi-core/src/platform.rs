//! The platform boundary consumed by the orchestrator.
//!
//! Every method maps to one blocking call against the Functions platform.
//! Implementations report failures verbatim; the orchestrator never retries.

use crate::error::Result;
use serde::Serialize;
use std::path::PathBuf;

/// How a web action receives its request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WebMode {
    /// Raw HTTP body and headers; used for file bytes.
    Raw,
    /// Parsed JSON parameters; used for document operations.
    Json,
}

impl WebMode {
    /// Value passed to `--web`.
    pub fn as_flag(&self) -> &'static str {
        match self {
            WebMode::Raw => "raw",
            WebMode::Json => "true",
        }
    }
}

impl std::fmt::Display for WebMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_flag())
    }
}

/// Gateway response type for an API route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseType {
    Http,
    Json,
}

impl ResponseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseType::Http => "http",
            ResponseType::Json => "json",
        }
    }
}

impl std::fmt::Display for ResponseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One API-gateway route backed by a web action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiRoute {
    pub api_name: String,
    pub base_path: String,
    pub sub_path: String,
    pub verb: String,
    /// Package-qualified action name.
    pub action: String,
    pub response_type: ResponseType,
}

/// A code action created from a local source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionSpec {
    pub package: String,
    pub name: String,
    pub source: PathBuf,
    /// Runtime kind, e.g. `nodejs:10`.
    pub runtime: String,
    pub timeout_ms: u64,
}

pub trait Platform {
    fn login(&self, region: &str, resource_group: &str) -> Result<()>;

    fn create_namespace(&self, name: &str) -> Result<()>;
    fn delete_namespace(&self, name: &str) -> Result<()>;

    fn package_exists(&self, name: &str) -> Result<bool>;
    fn create_package(&self, name: &str) -> Result<()>;
    fn delete_package(&self, name: &str) -> Result<()>;

    /// Run the external installer that provisions the storage package.
    fn install_external_package(&self, region: &str) -> Result<()>;

    /// Bind a platform-predefined package (e.g. `/whisk.system/cloudant`)
    /// under `local_name`.
    fn bind_predefined(&self, source: &str, local_name: &str) -> Result<()>;

    fn bind_service_credential(&self, package: &str, service: &str, key_name: &str)
        -> Result<()>;

    fn create_action(&self, spec: &ActionSpec) -> Result<()>;

    fn set_web_mode(&self, package: &str, action: &str, mode: WebMode) -> Result<()>;

    /// Create (or overwrite) `name` as a sequence of `actions`, in order.
    fn create_sequence(&self, name: &str, actions: &[String]) -> Result<()>;

    fn create_api_route(&self, route: &ApiRoute) -> Result<()>;

    /// Invocation base URL for an API created with `create_api_route`.
    fn api_base_url(&self, api_name: &str) -> Result<String>;

    /// Bare names of the actions currently inside `package`.
    fn list_actions(&self, namespace: &str, package: &str) -> Result<Vec<String>>;

    fn delete_action(&self, package: &str, action: &str) -> Result<()>;
}
