mod config;
mod db;
mod models;
mod report;

use std::io::{self, BufWriter};

use anyhow::{Context, Result};
use tracing::warn;
use tracing_subscriber::EnvFilter;

use crate::db::FirestoreClient;
use crate::report::Reporter;

const DEFAULT_LOG_FILTER: &str = "warn";

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    init_tracing();

    // Load configuration
    let config = config::init()?;

    // Connect before anything is printed so credential failures leave stdout empty
    let client = match FirestoreClient::connect(&config).await {
        Ok(client) => client,
        Err(err) => {
            if err.is_auth_failure() {
                warn_auth_hint();
            }
            return Err(err).with_context(|| {
                format!(
                    "unable to connect to Firestore project '{}'",
                    config.firestore_project_id
                )
            });
        }
    };

    let reporter = Reporter::new(client, config.firestore_collection.as_str());
    let mut out = BufWriter::new(io::stdout().lock());

    if let Err(err) = reporter.run(&mut out).await {
        if err.is_permission_denied() {
            warn_auth_hint();
        }
        return Err(err).context("error while listing users");
    }

    Ok(())
}

fn warn_auth_hint() {
    warn!(
        "authenticate with `gcloud auth application-default login` \
         or point GOOGLE_APPLICATION_CREDENTIALS at a service account key"
    );
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}
