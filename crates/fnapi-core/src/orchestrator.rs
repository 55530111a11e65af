//! Drives the create and delete plans against a [`Platform`].
//!
//! Every platform failure aborts the run immediately. Nothing already
//! created is rolled back; re-running `create` converges because packages
//! are existence-checked and every other call overwrites.

use crate::api_list::ApiList;
use crate::config::{qualified, ProvisionConfig};
use crate::error::{DeployError, Result};
use crate::plan::{self, PackageSource, Step};
use crate::platform::Platform;
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    Delete,
}

impl Operation {
    /// `None` for anything other than `create` / `delete`.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "create" => Some(Operation::Create),
            "delete" => Some(Operation::Delete),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateRequest {
    pub region: String,
    pub resource_group: String,
    pub namespace: String,
    pub storage_keys: Vec<String>,
    pub document_keys: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteRequest {
    pub region: String,
    pub resource_group: String,
    pub namespace: String,
}

impl From<&CreateRequest> for DeleteRequest {
    fn from(req: &CreateRequest) -> Self {
        Self {
            region: req.region.clone(),
            resource_group: req.resource_group.clone(),
            namespace: req.namespace.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Created(ApiList),
    Deleted,
    /// The operation name was not recognised; nothing was done.
    Unknown(String),
}

pub struct Orchestrator<'a, P: Platform> {
    platform: &'a P,
    config: &'a ProvisionConfig,
}

impl<'a, P: Platform> Orchestrator<'a, P> {
    pub fn new(platform: &'a P, config: &'a ProvisionConfig) -> Self {
        Self { platform, config }
    }

    /// Dispatch on an operation name as typed by the operator.
    pub fn run(&self, operation: &str, req: &CreateRequest, api_list_file: &Path) -> Result<Outcome> {
        match Operation::parse(operation) {
            Some(Operation::Create) => self.create(req, api_list_file).map(Outcome::Created),
            Some(Operation::Delete) => {
                self.delete(&DeleteRequest::from(req))?;
                Ok(Outcome::Deleted)
            }
            None => {
                tracing::debug!(operation, "unknown operation, nothing to do");
                Ok(Outcome::Unknown(operation.to_string()))
            }
        }
    }

    pub fn create(&self, req: &CreateRequest, api_list_file: &Path) -> Result<ApiList> {
        let steps = plan::create_plan(self.config, req);
        plan::validate(&steps)?;

        let mut urls = HashMap::new();
        for step in &steps {
            self.execute(step, &mut urls)?;
        }

        let public = take_url(&mut urls, &self.config.public_api.name)?;
        let private = take_url(&mut urls, &self.config.private_api.name)?;
        let list = ApiList::new(self.config, &public, &private);
        list.write(api_list_file)?;
        tracing::info!(path = %api_list_file.display(), "api list written");
        Ok(list)
    }

    pub fn delete(&self, req: &DeleteRequest) -> Result<()> {
        let steps = plan::delete_plan(self.config, req);
        plan::validate(&steps)?;

        let mut urls = HashMap::new();
        for step in &steps {
            self.execute(step, &mut urls)?;
        }
        Ok(())
    }

    fn execute(&self, step: &Step, urls: &mut HashMap<String, String>) -> Result<()> {
        tracing::info!(step = %step, "running");
        let p = self.platform;
        match step {
            Step::Login {
                region,
                resource_group,
            } => p.login(region, resource_group),
            Step::EnsureNamespace { name } => p.create_namespace(name),
            Step::EnsurePackage { name, source, .. } => self.ensure_package(name, source),
            Step::BindCredential {
                package,
                service,
                key,
            } => p.bind_service_credential(package, service, key),
            Step::ExposeWeb {
                package,
                action,
                mode,
            } => p.set_web_mode(package, action, *mode),
            Step::CreateSequence {
                package,
                name,
                actions,
            } => p.create_sequence(&qualified(package, name), actions),
            Step::CreateRoute(route) => p.create_api_route(route),
            Step::FetchApiUrl { api_name } => {
                let url = p.api_base_url(api_name)?;
                tracing::info!(api = %api_name, url = %url, "api base url");
                urls.insert(api_name.clone(), url);
                Ok(())
            }
            Step::PurgePackage { namespace, package } => {
                for action in p.list_actions(namespace, package)? {
                    p.delete_action(package, &action)?;
                }
                p.delete_package(package)
            }
            Step::DeleteAction { package, action } => p.delete_action(package, action),
            Step::DeletePackage { name } => p.delete_package(name),
            Step::DeleteNamespace { name } => p.delete_namespace(name),
        }
    }

    fn ensure_package(&self, name: &str, source: &PackageSource) -> Result<()> {
        if self.platform.package_exists(name)? {
            tracing::info!(package = name, "package exists, skipping creation");
            return Ok(());
        }
        match source {
            PackageSource::Installer { region } => self.platform.install_external_package(region),
            PackageSource::Predefined { source } => self.platform.bind_predefined(source, name),
            PackageSource::Empty => self.platform.create_package(name),
        }
    }
}

fn take_url(urls: &mut HashMap<String, String>, api_name: &str) -> Result<String> {
    urls.remove(api_name)
        .ok_or_else(|| DeployError::UnexpectedOutput {
            command: format!("api url {api_name}"),
            detail: "no url was fetched for this api".to_string(),
        })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
