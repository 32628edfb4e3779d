//! Tessera gateway node entry point.
//!
//! # Environment variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `TESSERA_CONFIG` | `tessera.yaml` | Settings file (YAML, TOML or JSON); defaults apply when absent. |
//! | `TESSERA__<KEY>` | *(none)* | Overrides one setting, e.g. `TESSERA__PORT`, `TESSERA__ADMIN__SECRET`. |
//! | `RUST_LOG` | `tessera_gateway=info` | Log filter. |

use tessera_gateway::bootstrap::Gateway;
use tessera_gateway::kernel::settings::load_settings;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG: &str = "tessera.yaml";

#[tokio::main]
async fn main() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("tessera_gateway=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let path = std::env::var("TESSERA_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG.to_string());
    let settings = match load_settings(&path) {
        Ok(settings) => settings,
        Err(e) => {
            error!(path = %path, error = %e, "unable to load settings");
            std::process::exit(1);
        }
    };

    if settings.admin.secret.is_empty() {
        warn!(
            "TESSERA__ADMIN__SECRET is not set; admin authentication is DISABLED. \
             Do not use this configuration in production."
        );
    }

    info!(
        port = settings.port,
        cluster_id = %settings.cluster_id,
        node_id = %settings.node_id,
        projects = settings.projects.len(),
        hooks = settings.hooks.len(),
        "Tessera gateway configuration loaded"
    );

    let gateway = match Gateway::from_settings(settings) {
        Ok(gateway) => gateway,
        Err(e) => {
            error!(error = %e, "unable to build gateway");
            std::process::exit(1);
        }
    };

    match gateway.load_initial_projects().await {
        Ok(report) => {
            for failed in report.failed() {
                warn!(
                    tenant = %failed.tenant(),
                    facets = failed.failures().len(),
                    "project came up with config errors"
                );
            }
        }
        Err(e) => {
            error!(error = %e, "initial project config aborted");
            std::process::exit(1);
        }
    }

    if let Err(e) = gateway.into_server().start().await {
        error!(error = %e, "gateway server error");
        std::process::exit(1);
    }
}
