use crate::config::ProvisionConfig;
use crate::error::Result;
use crate::io;
use serde::Serialize;
use std::path::Path;

/// The four endpoint URLs produced by a create run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiList {
    #[serde(rename = "PUBLIC_API_FILES")]
    pub public_files: String,
    #[serde(rename = "PUBLIC_API_DOCS")]
    pub public_docs: String,
    #[serde(rename = "PRIVATE_API_FILES")]
    pub private_files: String,
    #[serde(rename = "PRIVATE_API_DOCS")]
    pub private_docs: String,
}

impl ApiList {
    /// Append the configured route paths to the two API base URLs verbatim.
    pub fn new(cfg: &ProvisionConfig, public_url: &str, private_url: &str) -> Self {
        Self {
            public_files: format!("{public_url}{}", cfg.public_api.files_path),
            public_docs: format!("{public_url}{}", cfg.public_api.docs_path),
            private_files: format!("{private_url}{}", cfg.private_api.files_path),
            private_docs: format!("{private_url}{}", cfg.private_api.docs_path),
        }
    }

    pub fn entries(&self) -> [(&'static str, &str); 4] {
        [
            ("PUBLIC_API_FILES", &self.public_files),
            ("PUBLIC_API_DOCS", &self.public_docs),
            ("PRIVATE_API_FILES", &self.private_files),
            ("PRIVATE_API_DOCS", &self.private_docs),
        ]
    }

    /// `KEY=VALUE` lines, no quoting or escaping.
    pub fn render(&self) -> String {
        self.entries()
            .iter()
            .map(|(k, v)| format!("{k}={v}\n"))
            .collect()
    }

    /// Overwrite `path` with the rendered list.
    pub fn write(&self, path: &Path) -> Result<()> {
        io::atomic_write(path, self.render().as_bytes())
    }
}
