//! The create and delete flows as ordered lists of steps.
//!
//! Each step declares the resources it consumes and produces. `validate`
//! walks a plan front to back and rejects any step that consumes a resource
//! no earlier step produced, which is how the ordering invariants of the
//! flows are checked without reading the code.

use crate::config::{qualified, ProvisionConfig};
use crate::error::{DeployError, Result};
use crate::orchestrator::{CreateRequest, DeleteRequest};
use crate::platform::{ApiRoute, ResponseType, WebMode};
use std::collections::HashSet;
use std::fmt;

// ---------------------------------------------------------------------------
// Resource
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Resource {
    Session,
    /// The namespace targeted for the rest of the session.
    Namespace,
    Package(String),
    /// Package-qualified action name.
    Action(String),
    WebAction(String),
    Api(String),
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resource::Session => write!(f, "platform session"),
            Resource::Namespace => write!(f, "target namespace"),
            Resource::Package(name) => write!(f, "package '{name}'"),
            Resource::Action(name) => write!(f, "action '{name}'"),
            Resource::WebAction(name) => write!(f, "web action '{name}'"),
            Resource::Api(name) => write!(f, "api '{name}'"),
        }
    }
}

// ---------------------------------------------------------------------------
// Step
// ---------------------------------------------------------------------------

/// What to do when an ensured package is absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackageSource {
    /// Run the external installer script for this region.
    Installer { region: String },
    /// Bind a platform-predefined package under the local name.
    Predefined { source: String },
    /// Create an empty package.
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Login {
        region: String,
        resource_group: String,
    },
    EnsureNamespace {
        name: String,
    },
    EnsurePackage {
        name: String,
        source: PackageSource,
        /// Bare names of actions the package brings with it.
        provides: Vec<String>,
    },
    BindCredential {
        package: String,
        service: String,
        key: String,
    },
    ExposeWeb {
        package: String,
        action: String,
        mode: WebMode,
    },
    CreateSequence {
        package: String,
        name: String,
        /// Package-qualified component actions, in invocation order.
        actions: Vec<String>,
    },
    CreateRoute(ApiRoute),
    FetchApiUrl {
        api_name: String,
    },
    /// Delete every action currently in the package, then the package.
    PurgePackage {
        namespace: String,
        package: String,
    },
    DeleteAction {
        package: String,
        action: String,
    },
    DeletePackage {
        name: String,
    },
    DeleteNamespace {
        name: String,
    },
}

impl Step {
    pub fn consumes(&self) -> Vec<Resource> {
        match self {
            Step::Login { .. } => vec![],
            Step::EnsureNamespace { .. } => vec![Resource::Session],
            Step::EnsurePackage { .. } => vec![Resource::Namespace],
            Step::BindCredential { package, .. } => vec![Resource::Package(package.clone())],
            Step::ExposeWeb {
                package, action, ..
            } => vec![Resource::Action(qualified(package, action))],
            Step::CreateSequence {
                package, actions, ..
            } => {
                let mut out = vec![Resource::Package(package.clone())];
                out.extend(actions.iter().cloned().map(Resource::Action));
                out
            }
            Step::CreateRoute(route) => vec![Resource::WebAction(route.action.clone())],
            Step::FetchApiUrl { api_name } => vec![Resource::Api(api_name.clone())],
            Step::PurgePackage { .. }
            | Step::DeleteAction { .. }
            | Step::DeletePackage { .. }
            | Step::DeleteNamespace { .. } => vec![Resource::Session],
        }
    }

    pub fn produces(&self) -> Vec<Resource> {
        match self {
            Step::Login { .. } => vec![Resource::Session],
            Step::EnsureNamespace { .. } => vec![Resource::Namespace],
            Step::EnsurePackage { name, provides, .. } => {
                let mut out = vec![Resource::Package(name.clone())];
                out.extend(
                    provides
                        .iter()
                        .map(|action| Resource::Action(qualified(name, action))),
                );
                out
            }
            Step::ExposeWeb {
                package, action, ..
            } => vec![Resource::WebAction(qualified(package, action))],
            Step::CreateSequence { package, name, .. } => {
                vec![Resource::Action(qualified(package, name))]
            }
            Step::CreateRoute(route) => vec![Resource::Api(route.api_name.clone())],
            _ => vec![],
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Login {
                region,
                resource_group,
            } => write!(f, "login {region}/{resource_group}"),
            Step::EnsureNamespace { name } => write!(f, "ensure namespace {name}"),
            Step::EnsurePackage { name, .. } => write!(f, "ensure package {name}"),
            Step::BindCredential {
                package,
                service,
                key,
            } => write!(f, "bind {service} key '{key}' to {package}"),
            Step::ExposeWeb {
                package,
                action,
                mode,
            } => write!(f, "expose {package}/{action} as web action ({mode})"),
            Step::CreateSequence {
                package,
                name,
                actions,
            } => write!(f, "sequence {package}/{name} = [{}]", actions.join(", ")),
            Step::CreateRoute(route) => write!(
                f,
                "route {} {}{} -> {}",
                route.api_name, route.base_path, route.sub_path, route.action
            ),
            Step::FetchApiUrl { api_name } => write!(f, "fetch url of {api_name}"),
            Step::PurgePackage { package, .. } => write!(f, "purge package {package}"),
            Step::DeleteAction { package, action } => write!(f, "delete action {package}/{action}"),
            Step::DeletePackage { name } => write!(f, "delete package {name}"),
            Step::DeleteNamespace { name } => write!(f, "delete namespace {name}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Plans
// ---------------------------------------------------------------------------

/// Split a comma-separated credential key list verbatim: input order,
/// duplicates, whitespace and empty entries are all kept. An empty list
/// yields one empty key, which binds the service's default credential.
pub fn split_keys(list: &str) -> Vec<String> {
    list.split(',').map(str::to_string).collect()
}

pub fn create_plan(cfg: &ProvisionConfig, req: &CreateRequest) -> Vec<Step> {
    let storage = &cfg.storage;
    let store = &cfg.document_store;
    let docs = &cfg.docs;
    let public = &cfg.public_api;
    let private = &cfg.private_api;

    let mut steps = vec![
        Step::Login {
            region: req.region.clone(),
            resource_group: req.resource_group.clone(),
        },
        Step::EnsureNamespace {
            name: req.namespace.clone(),
        },
        Step::EnsurePackage {
            name: storage.package.clone(),
            source: PackageSource::Installer {
                region: req.region.clone(),
            },
            provides: vec![storage.read_action.clone(), storage.write_action.clone()],
        },
    ];
    steps.extend(req.storage_keys.iter().map(|key| Step::BindCredential {
        package: storage.package.clone(),
        service: storage.service.clone(),
        key: key.clone(),
    }));

    steps.push(Step::EnsurePackage {
        name: store.package.clone(),
        source: PackageSource::Predefined {
            source: store.predefined_source.clone(),
        },
        provides: vec![store.query_action.clone(), store.create_action.clone()],
    });
    steps.extend(req.document_keys.iter().map(|key| Step::BindCredential {
        package: store.package.clone(),
        service: store.service.clone(),
        key: key.clone(),
    }));

    // public (read) files
    steps.push(Step::ExposeWeb {
        package: storage.package.clone(),
        action: storage.read_action.clone(),
        mode: WebMode::Raw,
    });
    steps.push(Step::CreateRoute(ApiRoute {
        api_name: public.name.clone(),
        base_path: public.base_path.clone(),
        sub_path: public.files_path.clone(),
        verb: public.verb.clone(),
        action: qualified(&storage.package, &storage.read_action),
        response_type: ResponseType::Http,
    }));

    // public (read) docs
    steps.push(Step::EnsurePackage {
        name: docs.package.clone(),
        source: PackageSource::Empty,
        provides: vec![],
    });
    steps.push(Step::CreateSequence {
        package: docs.package.clone(),
        name: docs.query_sequence.clone(),
        actions: vec![qualified(&store.package, &store.query_action)],
    });
    steps.push(Step::ExposeWeb {
        package: docs.package.clone(),
        action: docs.query_sequence.clone(),
        mode: WebMode::Json,
    });
    steps.push(Step::CreateRoute(ApiRoute {
        api_name: public.name.clone(),
        base_path: public.base_path.clone(),
        sub_path: public.docs_path.clone(),
        verb: public.verb.clone(),
        action: qualified(&docs.package, &docs.query_sequence),
        response_type: ResponseType::Json,
    }));

    // private (write) files
    steps.push(Step::ExposeWeb {
        package: storage.package.clone(),
        action: storage.write_action.clone(),
        mode: WebMode::Raw,
    });
    steps.push(Step::CreateRoute(ApiRoute {
        api_name: private.name.clone(),
        base_path: private.base_path.clone(),
        sub_path: private.files_path.clone(),
        verb: private.verb.clone(),
        action: qualified(&storage.package, &storage.write_action),
        response_type: ResponseType::Http,
    }));

    // private (write) docs
    steps.push(Step::CreateSequence {
        package: docs.package.clone(),
        name: docs.write_sequence.clone(),
        actions: vec![qualified(&store.package, &store.create_action)],
    });
    steps.push(Step::ExposeWeb {
        package: docs.package.clone(),
        action: docs.write_sequence.clone(),
        mode: WebMode::Json,
    });
    steps.push(Step::CreateRoute(ApiRoute {
        api_name: private.name.clone(),
        base_path: private.base_path.clone(),
        sub_path: private.docs_path.clone(),
        verb: private.verb.clone(),
        action: qualified(&docs.package, &docs.write_sequence),
        response_type: ResponseType::Json,
    }));

    steps.push(Step::FetchApiUrl {
        api_name: public.name.clone(),
    });
    steps.push(Step::FetchApiUrl {
        api_name: private.name.clone(),
    });
    steps
}

/// Teardown, children before parents.
///
/// Only the query sequence is removed from the docs package; the write
/// sequence and all API routes are left behind.
pub fn delete_plan(cfg: &ProvisionConfig, req: &DeleteRequest) -> Vec<Step> {
    vec![
        Step::Login {
            region: req.region.clone(),
            resource_group: req.resource_group.clone(),
        },
        Step::PurgePackage {
            namespace: req.namespace.clone(),
            package: cfg.storage.package.clone(),
        },
        Step::PurgePackage {
            namespace: req.namespace.clone(),
            package: cfg.document_store.package.clone(),
        },
        Step::DeleteAction {
            package: cfg.docs.package.clone(),
            action: cfg.docs.query_sequence.clone(),
        },
        Step::DeletePackage {
            name: cfg.docs.package.clone(),
        },
        Step::DeleteNamespace {
            name: req.namespace.clone(),
        },
    ]
}

/// Reject the first step that consumes a resource nothing before it produced.
pub fn validate(steps: &[Step]) -> Result<()> {
    let mut available: HashSet<Resource> = HashSet::new();
    for step in steps {
        for resource in step.consumes() {
            if !available.contains(&resource) {
                return Err(DeployError::PlanOrder {
                    step: step.to_string(),
                    resource: resource.to_string(),
                });
            }
        }
        available.extend(step.produces());
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn request(storage_keys: &str, document_keys: &str) -> CreateRequest {
        CreateRequest {
            region: "jp-tok".to_string(),
            resource_group: "rg".to_string(),
            namespace: "ns".to_string(),
            storage_keys: split_keys(storage_keys),
            document_keys: split_keys(document_keys),
        }
    }

    fn delete_request() -> DeleteRequest {
        DeleteRequest {
            region: "jp-tok".to_string(),
            resource_group: "rg".to_string(),
            namespace: "ns".to_string(),
        }
    }

    #[test]
    fn split_keys_keeps_order_and_duplicates() {
        assert_eq!(split_keys("b,a,b"), vec!["b", "a", "b"]);
        assert_eq!(split_keys("only"), vec!["only"]);
    }

    #[test]
    fn split_keys_is_verbatim() {
        assert_eq!(split_keys(""), vec![""]);
        assert_eq!(split_keys("a,,b"), vec!["a", "", "b"]);
        assert_eq!(split_keys("b, a"), vec!["b", " a"]);
        assert_eq!(split_keys("a,"), vec!["a", ""]);
    }

    #[test]
    fn empty_key_entries_still_bind() {
        let plan = create_plan(&ProvisionConfig::default(), &request("", "a,,b"));
        let bound: Vec<(&str, &str)> = plan
            .iter()
            .filter_map(|s| match s {
                Step::BindCredential { package, key, .. } => Some((package.as_str(), key.as_str())),
                _ => None,
            })
            .collect();
        assert_eq!(
            bound,
            vec![
                ("cloud-object-storage", ""),
                ("cloudant", "a"),
                ("cloudant", ""),
                ("cloudant", "b"),
            ]
        );
        validate(&plan).unwrap();
    }

    #[test]
    fn create_plan_is_valid() {
        let plan = create_plan(&ProvisionConfig::default(), &request("k1,k2", "d1"));
        validate(&plan).unwrap();
    }

    #[test]
    fn create_plan_is_valid_with_renamed_resources() {
        let mut cfg = ProvisionConfig::default();
        cfg.docs.package = "documents".to_string();
        cfg.document_store.package = "nosql".to_string();
        cfg.storage.read_action = "get".to_string();
        let plan = create_plan(&cfg, &request("", ""));
        validate(&plan).unwrap();
        assert!(plan.iter().any(|s| matches!(
            s,
            Step::CreateRoute(r) if r.action == "cloud-object-storage/get"
        )));
    }

    #[test]
    fn validate_rejects_binding_before_package() {
        let plan = vec![
            Step::Login {
                region: "r".into(),
                resource_group: "g".into(),
            },
            Step::EnsureNamespace { name: "ns".into() },
            Step::BindCredential {
                package: "cloudant".into(),
                service: "cloudantnosqldb".into(),
                key: "k".into(),
            },
        ];
        let err = validate(&plan).unwrap_err();
        match err {
            DeployError::PlanOrder { step, resource } => {
                assert!(step.contains("cloudant"));
                assert_eq!(resource, "package 'cloudant'");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn validate_rejects_route_before_web_exposure() {
        let cfg = ProvisionConfig::default();
        let mut plan = create_plan(&cfg, &request("", ""));
        // swap "expose object-read" with its route
        let expose = plan
            .iter()
            .position(|s| matches!(s, Step::ExposeWeb { action, .. } if action == "object-read"))
            .unwrap();
        plan.swap(expose, expose + 1);
        assert!(matches!(
            validate(&plan),
            Err(DeployError::PlanOrder { .. })
        ));
    }

    #[test]
    fn validate_rejects_sequence_over_unknown_action() {
        let cfg = ProvisionConfig::default();
        let mut plan = create_plan(&cfg, &request("", ""));
        for step in plan.iter_mut() {
            if let Step::CreateSequence { actions, .. } = step {
                *actions = vec!["cloudant/no-such-action".to_string()];
            }
        }
        let err = validate(&plan).unwrap_err();
        assert!(err.to_string().contains("cloudant/no-such-action"));
    }

    #[test]
    fn credential_fan_out_follows_input_order() {
        let plan = create_plan(&ProvisionConfig::default(), &request("a,b,a", "x"));
        let bound: Vec<(&str, &str)> = plan
            .iter()
            .filter_map(|s| match s {
                Step::BindCredential { package, key, .. } => Some((package.as_str(), key.as_str())),
                _ => None,
            })
            .collect();
        assert_eq!(
            bound,
            vec![
                ("cloud-object-storage", "a"),
                ("cloud-object-storage", "b"),
                ("cloud-object-storage", "a"),
                ("cloudant", "x"),
            ]
        );
    }

    #[test]
    fn query_sequence_built_from_exec_query_find() {
        let plan = create_plan(&ProvisionConfig::default(), &request("", ""));
        let actions = plan
            .iter()
            .find_map(|s| match s {
                Step::CreateSequence { package, name, actions }
                    if package == "docs" && name == "query" =>
                {
                    Some(actions.clone())
                }
                _ => None,
            })
            .unwrap();
        assert_eq!(actions, vec!["cloudant/exec-query-find"]);
    }

    #[test]
    fn create_plan_ends_with_url_fetches() {
        let plan = create_plan(&ProvisionConfig::default(), &request("", ""));
        let tail: Vec<String> = plan[plan.len() - 2..].iter().map(|s| s.to_string()).collect();
        assert_eq!(tail, vec!["fetch url of public-api", "fetch url of private-api"]);
    }

    #[test]
    fn delete_plan_ends_with_namespace() {
        let plan = delete_plan(&ProvisionConfig::default(), &delete_request());
        validate(&plan).unwrap();
        assert!(matches!(plan.first(), Some(Step::Login { .. })));
        assert_eq!(
            plan.last(),
            Some(&Step::DeleteNamespace { name: "ns".into() })
        );
    }

    #[test]
    fn step_labels_are_readable() {
        let step = Step::ExposeWeb {
            package: "docs".into(),
            action: "query".into(),
            mode: WebMode::Json,
        };
        assert_eq!(step.to_string(), "expose docs/query as web action (true)");
    }
}
