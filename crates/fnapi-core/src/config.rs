use crate::error::{DeployError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// StorageConfig
// ---------------------------------------------------------------------------

/// The object-storage package. It is installed by an external script when
/// absent and ships the `object-read` / `object-write` actions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StorageConfig {
    #[serde(default = "default_storage_package")]
    pub package: String,
    #[serde(default = "default_storage_service")]
    pub service: String,
    #[serde(default = "default_installer")]
    pub installer: PathBuf,
    #[serde(default = "default_read_action")]
    pub read_action: String,
    #[serde(default = "default_write_action")]
    pub write_action: String,
}

fn default_storage_package() -> String {
    "cloud-object-storage".to_string()
}

fn default_storage_service() -> String {
    "cloud-object-storage".to_string()
}

fn default_installer() -> PathBuf {
    PathBuf::from("./install-cos-package.sh")
}

fn default_read_action() -> String {
    "object-read".to_string()
}

fn default_write_action() -> String {
    "object-write".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            package: default_storage_package(),
            service: default_storage_service(),
            installer: default_installer(),
            read_action: default_read_action(),
            write_action: default_write_action(),
        }
    }
}

// ---------------------------------------------------------------------------
// DocumentStoreConfig
// ---------------------------------------------------------------------------

/// The document-store package, bound from a platform-predefined package.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentStoreConfig {
    #[serde(default = "default_docstore_package")]
    pub package: String,
    #[serde(default = "default_docstore_service")]
    pub service: String,
    #[serde(default = "default_predefined_source")]
    pub predefined_source: String,
    #[serde(default = "default_query_action")]
    pub query_action: String,
    #[serde(default = "default_create_action")]
    pub create_action: String,
}

fn default_docstore_package() -> String {
    "cloudant".to_string()
}

fn default_docstore_service() -> String {
    "cloudantnosqldb".to_string()
}

fn default_predefined_source() -> String {
    "/whisk.system/cloudant".to_string()
}

fn default_query_action() -> String {
    "exec-query-find".to_string()
}

fn default_create_action() -> String {
    "create-document".to_string()
}

impl Default for DocumentStoreConfig {
    fn default() -> Self {
        Self {
            package: default_docstore_package(),
            service: default_docstore_service(),
            predefined_source: default_predefined_source(),
            query_action: default_query_action(),
            create_action: default_create_action(),
        }
    }
}

// ---------------------------------------------------------------------------
// DocsConfig
// ---------------------------------------------------------------------------

/// The locally owned package holding the document query/write sequences.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocsConfig {
    #[serde(default = "default_docs_package")]
    pub package: String,
    #[serde(default = "default_query_sequence")]
    pub query_sequence: String,
    #[serde(default = "default_write_sequence")]
    pub write_sequence: String,
}

fn default_docs_package() -> String {
    "docs".to_string()
}

fn default_query_sequence() -> String {
    "query".to_string()
}

fn default_write_sequence() -> String {
    "doc-write".to_string()
}

impl Default for DocsConfig {
    fn default() -> Self {
        Self {
            package: default_docs_package(),
            query_sequence: default_query_sequence(),
            write_sequence: default_write_sequence(),
        }
    }
}

// ---------------------------------------------------------------------------
// ApiConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiConfig {
    pub name: String,
    pub base_path: String,
    #[serde(default = "default_files_path")]
    pub files_path: String,
    #[serde(default = "default_docs_path")]
    pub docs_path: String,
    #[serde(default = "default_verb")]
    pub verb: String,
}

fn default_files_path() -> String {
    "/files".to_string()
}

fn default_docs_path() -> String {
    "/docs".to_string()
}

fn default_verb() -> String {
    "post".to_string()
}

fn default_public_api() -> ApiConfig {
    ApiConfig::new("public-api", "/public/api")
}

fn default_private_api() -> ApiConfig {
    ApiConfig::new("private-api", "/private/api")
}

impl ApiConfig {
    pub fn new(name: impl Into<String>, base_path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base_path: base_path.into(),
            files_path: default_files_path(),
            docs_path: default_docs_path(),
            verb: default_verb(),
        }
    }
}

// ---------------------------------------------------------------------------
// ProvisionConfig (top-level)
// ---------------------------------------------------------------------------

/// Fixed resource names used by the create and delete flows.
///
/// The defaults describe the stock deployment. A YAML file may override any
/// subset; missing fields fall back to the defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProvisionConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub document_store: DocumentStoreConfig,
    #[serde(default)]
    pub docs: DocsConfig,
    #[serde(default = "default_public_api")]
    pub public_api: ApiConfig,
    #[serde(default = "default_private_api")]
    pub private_api: ApiConfig,
}

impl Default for ProvisionConfig {
    fn default() -> Self {
        Self {
            storage: StorageConfig::default(),
            document_store: DocumentStoreConfig::default(),
            docs: DocsConfig::default(),
            public_api: default_public_api(),
            private_api: default_private_api(),
        }
    }
}

impl ProvisionConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        let cfg: ProvisionConfig = serde_yaml::from_str(&data)?;
        cfg.validate().map_err(|reason| DeployError::InvalidConfig {
            path: path.display().to_string(),
            reason,
        })?;
        Ok(cfg)
    }

    /// Check that every name is non-empty and every route path is absolute.
    pub fn validate(&self) -> std::result::Result<(), String> {
        let names = [
            ("storage.package", &self.storage.package),
            ("storage.service", &self.storage.service),
            ("storage.read_action", &self.storage.read_action),
            ("storage.write_action", &self.storage.write_action),
            ("document_store.package", &self.document_store.package),
            ("document_store.service", &self.document_store.service),
            (
                "document_store.predefined_source",
                &self.document_store.predefined_source,
            ),
            ("document_store.query_action", &self.document_store.query_action),
            (
                "document_store.create_action",
                &self.document_store.create_action,
            ),
            ("docs.package", &self.docs.package),
            ("docs.query_sequence", &self.docs.query_sequence),
            ("docs.write_sequence", &self.docs.write_sequence),
            ("public_api.name", &self.public_api.name),
            ("private_api.name", &self.private_api.name),
        ];
        for (field, value) in names {
            if value.trim().is_empty() {
                return Err(format!("{field} must not be empty"));
            }
        }

        for (label, api) in [("public_api", &self.public_api), ("private_api", &self.private_api)] {
            for (field, path) in [
                ("base_path", &api.base_path),
                ("files_path", &api.files_path),
                ("docs_path", &api.docs_path),
            ] {
                if !path.starts_with('/') {
                    return Err(format!("{label}.{field} must start with '/': {path}"));
                }
            }
        }

        if self.public_api.name == self.private_api.name {
            return Err(format!(
                "public_api and private_api share the name '{}'",
                self.public_api.name
            ));
        }

        Ok(())
    }
}

/// `package/action` as the platform expects it.
pub fn qualified(package: &str, action: &str) -> String {
    format!("{package}/{action}")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
