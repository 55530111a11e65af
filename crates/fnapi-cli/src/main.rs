mod output;

use anyhow::Context;
use clap::Parser;
use fnapi_core::config::ProvisionConfig;
use fnapi_core::ibmcloud::IbmCloud;
use fnapi_core::orchestrator::{CreateRequest, Orchestrator, Outcome};
use fnapi_core::plan::split_keys;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "fnapi",
    about = "Deploy the file/document API functions onto IBM Cloud Functions",
    long_about = "Deploy the file/document API functions onto IBM Cloud Functions.\n\
                  Requires your IAM API key in the APIKEY environment variable.",
    version
)]
struct Cli {
    /// create|delete the API deployment
    #[arg(short = 'o', long, default_value = "create")]
    operation: String,

    /// Region name
    #[arg(short = 'r', long, default_value = "jp-tok", env = "FNAPI_REGION")]
    region: String,

    /// Resource group name
    #[arg(
        short = 'g',
        long,
        default_value = "c4c-covid-19",
        env = "FNAPI_RESOURCE_GROUP"
    )]
    resource_group: String,

    /// Functions namespace to deploy into
    #[arg(short = 'n', long, default_value = "data-proxy", env = "FNAPI_NAMESPACE")]
    namespace: String,

    /// Comma-separated key names of object-storage credentials
    #[arg(short = 'c', long, default_value = "")]
    cos_keyname: String,

    /// Comma-separated key names of Cloudant credentials
    #[arg(short = 'l', long, default_value = "")]
    cloudant_keyname: String,

    /// File that receives the API endpoint list
    #[arg(short = 'f', long, default_value = "./.api-list")]
    api_list_file: PathBuf,

    /// YAML file overriding package, service and API names
    #[arg(long, env = "FNAPI_CONFIG")]
    config: Option<PathBuf>,

    /// ibmcloud binary (default: looked up on PATH)
    #[arg(long, env = "FNAPI_IBMCLOUD_BIN")]
    ibmcloud_bin: Option<PathBuf>,

    /// IAM API key
    #[arg(long, env = "APIKEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Print the endpoint list as JSON
    #[arg(long, short = 'j')]
    json: bool,
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli) {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => ProvisionConfig::load(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => ProvisionConfig::default(),
    };

    let mut platform = IbmCloud::new(cli.api_key.clone(), config.storage.installer.clone());
    if let Some(bin) = &cli.ibmcloud_bin {
        platform = platform.with_bin(bin);
    }

    let req = CreateRequest {
        region: cli.region.clone(),
        resource_group: cli.resource_group.clone(),
        namespace: cli.namespace.clone(),
        storage_keys: split_keys(&cli.cos_keyname),
        document_keys: split_keys(&cli.cloudant_keyname),
    };

    let outcome = Orchestrator::new(&platform, &config)
        .run(&cli.operation, &req, &cli.api_list_file)
        .with_context(|| format!("{} failed", cli.operation))?;

    match outcome {
        Outcome::Created(list) => {
            if cli.json {
                output::print_json(&list)?;
            } else {
                output::print_api_list(&list);
                println!("\nwritten to {}", cli.api_list_file.display());
            }
        }
        Outcome::Deleted => println!("deleted namespace {}", cli.namespace),
        Outcome::Unknown(op) => {
            eprintln!("warning: no operation '{op}'. please check usage (create|delete).");
        }
    }
    Ok(())
}
