//! In-memory [`Platform`] that records every call as a one-line string.

use crate::error::{DeployError, Result};
use crate::platform::{ActionSpec, ApiRoute, Platform, WebMode};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};

#[derive(Default)]
pub(crate) struct RecordingPlatform {
    calls: RefCell<Vec<String>>,
    packages: RefCell<HashSet<String>>,
    actions: HashMap<String, Vec<String>>,
    urls: HashMap<String, String>,
    fail_on: Option<String>,
}

impl RecordingPlatform {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_packages(self, names: &[&str]) -> Self {
        self.packages
            .borrow_mut()
            .extend(names.iter().map(|n| n.to_string()));
        self
    }

    pub(crate) fn with_actions(mut self, package: &str, names: &[&str]) -> Self {
        self.actions.insert(
            package.to_string(),
            names.iter().map(|n| n.to_string()).collect(),
        );
        self
    }

    pub(crate) fn with_url(mut self, api: &str, url: &str) -> Self {
        self.urls.insert(api.to_string(), url.to_string());
        self
    }

    /// Fail the first call whose recorded line starts with `prefix`.
    pub(crate) fn failing_on(mut self, prefix: &str) -> Self {
        self.fail_on = Some(prefix.to_string());
        self
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    pub(crate) fn count(&self, prefix: &str) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    fn record(&self, line: String) -> Result<()> {
        let fail = self
            .fail_on
            .as_deref()
            .is_some_and(|prefix| line.starts_with(prefix));
        self.calls.borrow_mut().push(line.clone());
        if fail {
            return Err(DeployError::CommandFailed {
                command: line,
                status: "exit status: 1".to_string(),
                stderr: "FAILED".to_string(),
            });
        }
        Ok(())
    }
}

impl Platform for RecordingPlatform {
    fn login(&self, region: &str, resource_group: &str) -> Result<()> {
        self.record(format!("login {region} {resource_group}"))
    }

    fn create_namespace(&self, name: &str) -> Result<()> {
        self.record(format!("create_namespace {name}"))
    }

    fn delete_namespace(&self, name: &str) -> Result<()> {
        self.record(format!("delete_namespace {name}"))
    }

    fn package_exists(&self, name: &str) -> Result<bool> {
        self.record(format!("package_exists {name}"))?;
        Ok(self.packages.borrow().contains(name))
    }

    fn create_package(&self, name: &str) -> Result<()> {
        self.record(format!("create_package {name}"))?;
        self.packages.borrow_mut().insert(name.to_string());
        Ok(())
    }

    fn delete_package(&self, name: &str) -> Result<()> {
        self.record(format!("delete_package {name}"))?;
        self.packages.borrow_mut().remove(name);
        Ok(())
    }

    fn install_external_package(&self, region: &str) -> Result<()> {
        self.record(format!("install_external_package {region}"))?;
        self.packages
            .borrow_mut()
            .insert("cloud-object-storage".to_string());
        Ok(())
    }

    fn bind_predefined(&self, source: &str, local_name: &str) -> Result<()> {
        self.record(format!("bind_predefined {source} {local_name}"))?;
        self.packages.borrow_mut().insert(local_name.to_string());
        Ok(())
    }

    fn bind_service_credential(&self, package: &str, service: &str, key_name: &str) -> Result<()> {
        self.record(format!("bind_service_credential {package} {service} {key_name}"))
    }

    fn create_action(&self, spec: &ActionSpec) -> Result<()> {
        self.record(format!(
            "create_action {}/{} {} {} {}",
            spec.package,
            spec.name,
            spec.source.display(),
            spec.runtime,
            spec.timeout_ms
        ))
    }

    fn set_web_mode(&self, package: &str, action: &str, mode: WebMode) -> Result<()> {
        self.record(format!("set_web_mode {package} {action} {mode}"))
    }

    fn create_sequence(&self, name: &str, actions: &[String]) -> Result<()> {
        self.record(format!("create_sequence {name} [{}]", actions.join(", ")))
    }

    fn create_api_route(&self, route: &ApiRoute) -> Result<()> {
        self.record(format!(
            "create_api_route {} {} {} {} {} {}",
            route.api_name,
            route.base_path,
            route.sub_path,
            route.verb,
            route.action,
            route.response_type
        ))
    }

    fn api_base_url(&self, api_name: &str) -> Result<String> {
        self.record(format!("api_base_url {api_name}"))?;
        Ok(self
            .urls
            .get(api_name)
            .cloned()
            .unwrap_or_else(|| format!("https://gateway.test/{api_name}")))
    }

    fn list_actions(&self, namespace: &str, package: &str) -> Result<Vec<String>> {
        self.record(format!("list_actions {namespace} {package}"))?;
        Ok(self.actions.get(package).cloned().unwrap_or_default())
    }

    fn delete_action(&self, package: &str, action: &str) -> Result<()> {
        self.record(format!("delete_action {package} {action}"))
    }
}
