//! [`Platform`] implementation that shells out to the `ibmcloud` CLI.
//!
//! Every call is one blocking `ibmcloud ...` subprocess. A non-zero exit
//! becomes [`DeployError::CommandFailed`] carrying the CLI's own stderr.
//!
//! The IAM API key is handed to the CLI through `IBMCLOUD_API_KEY` in the
//! child environment, never on the command line.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use serde::Deserialize;

use crate::config::qualified;
use crate::error::{DeployError, Result};
use crate::platform::{ActionSpec, ApiRoute, Platform, WebMode};

const API_KEY_ENV: &str = "IBMCLOUD_API_KEY";

pub struct IbmCloud {
    bin: Option<PathBuf>,
    api_key: Option<String>,
    installer: PathBuf,
}

impl IbmCloud {
    /// `installer` is the script run by `install_external_package`.
    pub fn new(api_key: Option<String>, installer: impl Into<PathBuf>) -> Self {
        Self {
            bin: None,
            api_key,
            installer: installer.into(),
        }
    }

    /// Use this binary instead of looking up `ibmcloud` on `PATH`.
    pub fn with_bin(mut self, bin: impl Into<PathBuf>) -> Self {
        self.bin = Some(bin.into());
        self
    }

    fn program(&self) -> Result<PathBuf> {
        match &self.bin {
            Some(bin) => Ok(bin.clone()),
            None => which::which("ibmcloud").map_err(|_| DeployError::CliNotInstalled),
        }
    }

    fn command(&self, program: &Path) -> Command {
        let mut cmd = Command::new(program);
        cmd.stdin(Stdio::null());
        if let Some(key) = &self.api_key {
            cmd.env(API_KEY_ENV, key);
        }
        cmd
    }

    /// Run `ibmcloud <args>` and return its stdout.
    fn run(&self, args: &[String]) -> Result<String> {
        let program = self.program()?;
        tracing::debug!(command = %command_line(args), "ibmcloud");

        let output = self
            .command(&program)
            .args(args)
            .output()
            .map_err(|e| DeployError::SpawnFailed {
                program: program.display().to_string(),
                reason: e.to_string(),
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(DeployError::CommandFailed {
                command: command_line(args),
                status: output.status.to_string(),
                // the CLI prints some failures on stdout
                stderr: if stderr.is_empty() {
                    stdout.trim().to_string()
                } else {
                    stderr
                },
            });
        }
        Ok(stdout)
    }

    /// Run a `get` query: `false` when the CLI reports the resource as
    /// missing. Any other failure (auth, network, quota) is an error.
    fn exists(&self, args: &[String]) -> Result<bool> {
        match self.run(args) {
            Ok(_) => Ok(true),
            Err(DeployError::CommandFailed { stderr, .. }) if is_not_found(&stderr) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

/// Whether CLI error output reports a missing resource.
///
/// ```text
/// error: Unable to get package 'docs': The requested resource does not exist. (code 2x3)
/// FAILED: Namespace 'data-proxy' could not be found.
/// ```
fn is_not_found(stderr: &str) -> bool {
    let stderr = stderr.to_ascii_lowercase();
    ["does not exist", "could not be found", "not found"]
        .iter()
        .any(|needle| stderr.contains(needle))
}

impl Platform for IbmCloud {
    fn login(&self, region: &str, resource_group: &str) -> Result<()> {
        if self.api_key.as_deref().map_or(true, str::is_empty) {
            return Err(DeployError::MissingApiKey);
        }
        self.run(&args::login(region, resource_group)).map(drop)
    }

    fn create_namespace(&self, name: &str) -> Result<()> {
        if self.exists(&args::namespace_get(name))? {
            tracing::info!(namespace = name, "namespace exists");
        } else {
            self.run(&args::namespace_create(name))?;
        }
        self.run(&args::namespace_target(name)).map(drop)
    }

    fn delete_namespace(&self, name: &str) -> Result<()> {
        self.run(&args::namespace_delete(name)).map(drop)
    }

    fn package_exists(&self, name: &str) -> Result<bool> {
        self.exists(&args::package_get(name))
    }

    fn create_package(&self, name: &str) -> Result<()> {
        self.run(&args::package_create(name)).map(drop)
    }

    fn delete_package(&self, name: &str) -> Result<()> {
        self.run(&args::package_delete(name)).map(drop)
    }

    fn install_external_package(&self, region: &str) -> Result<()> {
        let mut cmd = Command::new("sh");
        cmd.arg(&self.installer)
            .arg(region)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::piped());
        if let Some(key) = &self.api_key {
            cmd.env(API_KEY_ENV, key);
        }
        tracing::info!(script = %self.installer.display(), region, "running package installer");

        let output = cmd.output().map_err(|e| DeployError::SpawnFailed {
            program: "sh".to_string(),
            reason: e.to_string(),
        })?;
        if !output.status.success() {
            return Err(DeployError::CommandFailed {
                command: format!("sh {} {region}", self.installer.display()),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }

    fn bind_predefined(&self, source: &str, local_name: &str) -> Result<()> {
        self.run(&args::package_bind(source, local_name)).map(drop)
    }

    fn bind_service_credential(&self, package: &str, service: &str, key_name: &str) -> Result<()> {
        self.run(&args::service_bind(package, service, key_name))
            .map(drop)
    }

    fn create_action(&self, spec: &ActionSpec) -> Result<()> {
        self.run(&args::action_create(spec)).map(drop)
    }

    fn set_web_mode(&self, package: &str, action: &str, mode: WebMode) -> Result<()> {
        self.run(&args::action_web(package, action, mode)).map(drop)
    }

    fn create_sequence(&self, name: &str, actions: &[String]) -> Result<()> {
        self.run(&args::sequence(name, actions)).map(drop)
    }

    fn create_api_route(&self, route: &ApiRoute) -> Result<()> {
        self.run(&args::api_create(route)).map(drop)
    }

    fn api_base_url(&self, api_name: &str) -> Result<String> {
        let cmd = args::api_get(api_name);
        let stdout = self.run(&cmd)?;
        parse_api_url(&stdout).map_err(|detail| DeployError::UnexpectedOutput {
            command: command_line(&cmd),
            detail,
        })
    }

    fn list_actions(&self, namespace: &str, package: &str) -> Result<Vec<String>> {
        self.run(&args::namespace_target(namespace))?;
        let stdout = self.run(&args::action_list(package))?;
        Ok(parse_action_list(&stdout))
    }

    fn delete_action(&self, package: &str, action: &str) -> Result<()> {
        self.run(&args::action_delete(package, action)).map(drop)
    }
}

fn command_line(args: &[String]) -> String {
    format!("ibmcloud {}", args.join(" "))
}

// ---------------------------------------------------------------------------
// Argument lists
// ---------------------------------------------------------------------------

mod args {
    use super::*;

    fn fn_cmd(parts: &[&str]) -> Vec<String> {
        std::iter::once("fn")
            .chain(parts.iter().copied())
            .map(str::to_string)
            .collect()
    }

    pub(super) fn login(region: &str, resource_group: &str) -> Vec<String> {
        ["login", "-r", region, "-g", resource_group]
            .map(str::to_string)
            .to_vec()
    }

    pub(super) fn namespace_get(name: &str) -> Vec<String> {
        fn_cmd(&["namespace", "get", name])
    }

    pub(super) fn namespace_create(name: &str) -> Vec<String> {
        fn_cmd(&["namespace", "create", name])
    }

    pub(super) fn namespace_target(name: &str) -> Vec<String> {
        fn_cmd(&["property", "set", "--namespace", name])
    }

    pub(super) fn namespace_delete(name: &str) -> Vec<String> {
        fn_cmd(&["namespace", "delete", name])
    }

    pub(super) fn package_get(name: &str) -> Vec<String> {
        fn_cmd(&["package", "get", name, "--summary"])
    }

    pub(super) fn package_create(name: &str) -> Vec<String> {
        fn_cmd(&["package", "create", name])
    }

    pub(super) fn package_delete(name: &str) -> Vec<String> {
        fn_cmd(&["package", "delete", name])
    }

    pub(super) fn package_bind(source: &str, local_name: &str) -> Vec<String> {
        fn_cmd(&["package", "bind", source, local_name])
    }

    /// An empty key name leaves `--keyname` off, so the CLI picks the
    /// service's first credential.
    pub(super) fn service_bind(package: &str, service: &str, key_name: &str) -> Vec<String> {
        if key_name.is_empty() {
            fn_cmd(&["service", "bind", service, package])
        } else {
            fn_cmd(&["service", "bind", service, package, "--keyname", key_name])
        }
    }

    pub(super) fn action_create(spec: &ActionSpec) -> Vec<String> {
        let name = qualified(&spec.package, &spec.name);
        let source = spec.source.to_string_lossy();
        let timeout = spec.timeout_ms.to_string();
        fn_cmd(&[
            "action",
            "update",
            &name,
            &*source,
            "--kind",
            &spec.runtime,
            "--timeout",
            &timeout,
        ])
    }

    pub(super) fn action_web(package: &str, action: &str, mode: WebMode) -> Vec<String> {
        let name = qualified(package, action);
        fn_cmd(&["action", "update", &name, "--web", mode.as_flag()])
    }

    pub(super) fn sequence(name: &str, actions: &[String]) -> Vec<String> {
        let chain = actions.join(",");
        fn_cmd(&["action", "update", name, "--sequence", &chain])
    }

    pub(super) fn api_create(route: &ApiRoute) -> Vec<String> {
        fn_cmd(&[
            "api",
            "create",
            &route.base_path,
            &route.sub_path,
            &route.verb,
            &route.action,
            "--apiname",
            &route.api_name,
            "--response-type",
            route.response_type.as_str(),
        ])
    }

    pub(super) fn api_get(api_name: &str) -> Vec<String> {
        fn_cmd(&["api", "get", api_name])
    }

    pub(super) fn action_list(package: &str) -> Vec<String> {
        fn_cmd(&["action", "list", package])
    }

    pub(super) fn action_delete(package: &str, action: &str) -> Vec<String> {
        let name = qualified(package, action);
        fn_cmd(&["action", "delete", &name])
    }
}

// ---------------------------------------------------------------------------
// Output parsing
// ---------------------------------------------------------------------------

/// The parts of the swagger document printed by `fn api get` that locate the
/// gateway.
#[derive(Debug, Deserialize)]
struct ApiDoc {
    #[serde(rename = "gwApiUrl")]
    gw_api_url: Option<String>,
    host: Option<String>,
    #[serde(rename = "basePath")]
    base_path: Option<String>,
    #[serde(default)]
    schemes: Vec<String>,
}

/// Extract the invocation base URL from `fn api get` output.
///
/// Prefers an explicit `gwApiUrl`; otherwise joins scheme, host and
/// base path. Any non-JSON banner before the document is skipped.
fn parse_api_url(stdout: &str) -> std::result::Result<String, String> {
    let start = stdout
        .find('{')
        .ok_or_else(|| "no JSON document in output".to_string())?;
    let doc: ApiDoc = serde_json::from_str(stdout[start..].trim_end())
        .map_err(|e| format!("invalid api document: {e}"))?;

    if let Some(url) = doc.gw_api_url.filter(|u| !u.is_empty()) {
        return Ok(url);
    }
    let host = doc
        .host
        .filter(|h| !h.is_empty())
        .ok_or_else(|| "api document has neither gwApiUrl nor host".to_string())?;
    let scheme = doc.schemes.first().map(String::as_str).unwrap_or("https");
    let base_path = doc.base_path.unwrap_or_default();
    Ok(format!("{scheme}://{host}{base_path}"))
}

/// Bare action names from the `fn action list` table.
///
/// ```text
/// actions
/// /a1b2c3/cloud-object-storage/object-read     private nodejs:10
/// ```
fn parse_action_list(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .filter_map(|line| line.split_whitespace().next())
        .filter(|first| first.starts_with('/'))
        .filter_map(|path| path.rsplit('/').next())
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
