pub mod api_list;
pub mod config;
pub mod error;
pub mod ibmcloud;
pub mod io;
pub mod orchestrator;
pub mod plan;
pub mod platform;

#[cfg(test)]
mod fake;

pub use error::{DeployError, Result};
