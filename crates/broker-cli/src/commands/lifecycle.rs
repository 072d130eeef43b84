use crate::Commands;
use anyhow::{Context, Result};
use broker_admin::HttpConnector;
use broker_config::Config;
use broker_orchestration::{
    BindRequest, DeprovisionRequest, LifecycleRequest, ProvisionRequest, ServiceBroker,
    UnbindRequest,
};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::debug;

/// Translate a subcommand into the request the broker understands
///
/// `Validate` never reaches the broker and maps to the catalog read.
pub fn request_for(command: Commands) -> LifecycleRequest {
    match command {
        Commands::Validate | Commands::Catalog => LifecycleRequest::Catalog,
        Commands::Provision { instance_id, zone } => {
            LifecycleRequest::Provision(ProvisionRequest { instance_id, zone })
        }
        Commands::Deprovision { instance_id, zone } => {
            LifecycleRequest::Deprovision(DeprovisionRequest { instance_id, zone })
        }
        Commands::Bind {
            instance_id,
            binding_id,
            zone,
        } => LifecycleRequest::Bind(BindRequest {
            instance_id,
            binding_id,
            zone,
        }),
        Commands::Unbind {
            instance_id,
            binding_id,
            zone,
        } => LifecycleRequest::Unbind(UnbindRequest {
            instance_id,
            binding_id,
            zone,
        }),
    }
}

/// Run `request` against the configured zones and print the response
pub async fn run(config: &Config, request: LifecycleRequest) -> Result<ExitCode> {
    let connector = Arc::new(HttpConnector::new(config.settings.request_timeout()));
    let broker = ServiceBroker::new(config, connector).context("Invalid zone configuration")?;
    debug!(zones = broker.registry().len(), ?request, "Dispatching");

    let response = broker.handle(&request).await;
    println!("{}", serde_json::to_string_pretty(&response)?);

    Ok(if response.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
