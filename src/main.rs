use std::sync::Arc;

use color_eyre::eyre::Context;
use webhook_funnel::config::Config;
use webhook_funnel::domain::ports::FunnelStore;
use webhook_funnel::infrastructure::registry::FunnelRegistry;
use webhook_funnel::infrastructure::store::JsonFileStore;
use webhook_funnel::outbound::dispatch::Dispatcher;
use webhook_funnel::outbound::provisioning::{Provisioner, ProvisioningClient};
use webhook_funnel::server::{RelayState, Server};
use webhook_funnel::telemetry;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static ALLOC: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    telemetry::init_tracing();

    // Load configuration
    let config = Config::load()?;
    tracing::info!("Loaded configuration: {:?}", config);

    // Load funnels once; changes require a restart
    let store = JsonFileStore::new(&config.registry.path);
    let funnels = store
        .load()
        .await
        .wrap_err_with(|| format!("Failed to load funnels from {}", config.registry.path))?;
    let registry = FunnelRegistry::from_list(&funnels).wrap_err("Invalid funnel registry")?;
    tracing::info!(funnels = registry.len(), "Funnel registry built");

    // Register endpoints with the webhook source before accepting traffic
    match (
        config.provisioning.enabled,
        config.provisioning.token.as_deref(),
    ) {
        (true, Some(token)) => {
            let client = ProvisioningClient::new(&config.provisioning.api_url, token)?;
            let reports = Provisioner::new(Arc::new(client))
                .provision_all(&funnels)
                .await;
            let failed = reports.iter().filter(|r| r.result.is_err()).count();
            if failed > 0 {
                tracing::warn!(failed, total = reports.len(), "Some funnels were not provisioned");
            }
        }
        (true, None) => {
            tracing::warn!("No provisioning token configured, skipping webhook registration")
        }
        (false, _) => tracing::info!("Provisioning disabled"),
    }

    // Create and run server
    let dispatcher = Dispatcher::with_timeout(config.dispatch.timeout())?;
    let state = RelayState::new(registry, dispatcher);
    let port = config.server.port.unwrap_or(funnels.port);

    let server = Server::new(&config.server.host, port, state).await?;
    server.run().await
}
