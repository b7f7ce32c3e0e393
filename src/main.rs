// Copyright Cortex Authors
// SPDX-License-Identifier: Apache-2.0

//! Cortex: an external OpenStack compute-scheduling decision engine.
//!
//! Each invocation serves exactly one scheduler family and, concurrently,
//! reconciles every `Pipeline`/`Step` CRD tagged with the configured
//! operator string.

use clap::{Args, Parser, Subcommand};
use cortex_api::{router, AppState, Family};
use cortex_config::settings::{DEFAULT_CONFIG_PATH, DEFAULT_SECRETS_PATH};
use cortex_config::Settings;
use cortex_controller::PipelineRegistry;
use cortex_telemetry::PipelineMetrics;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "cortex", about = "External decision engine for OpenStack compute scheduling")]
struct Cli {
    #[command(subcommand)]
    family: FamilyCommand,
}

#[derive(Subcommand, Debug)]
enum FamilyCommand {
    /// Serve Nova (compute) scheduling requests.
    SchedulerNova(FamilyArgs),
    /// Serve Cinder (volume) scheduling requests.
    SchedulerCinder(FamilyArgs),
    /// Serve Manila (share) scheduling requests.
    SchedulerManila(FamilyArgs),
}

#[derive(Args, Debug)]
struct FamilyArgs {
    /// Base configuration file, merged under the secrets file.
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
    /// Secrets overlay file, wins over the base configuration.
    #[arg(long, default_value = DEFAULT_SECRETS_PATH)]
    secrets: PathBuf,
}

impl FamilyCommand {
    fn family(&self) -> Family {
        match self {
            FamilyCommand::SchedulerNova(_) => Family::Nova,
            FamilyCommand::SchedulerCinder(_) => Family::Cinder,
            FamilyCommand::SchedulerManila(_) => Family::Manila,
        }
    }

    fn args(&self) -> &FamilyArgs {
        match self {
            FamilyCommand::SchedulerNova(args)
            | FamilyCommand::SchedulerCinder(args)
            | FamilyCommand::SchedulerManila(args) => args,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let family = cli.family.family();
    let args = cli.family.args();

    let settings = Settings::load(&args.config, &args.secrets)?;
    info!(operator = %settings.operator, namespace = %settings.namespace, family = ?family, "starting cortex");

    let client = kube::Client::try_default().await?;
    let registry = Arc::new(PipelineRegistry::new());
    let metrics = Arc::new(PipelineMetrics::new()?);

    let step_context = cortex_controller::run(
        client,
        settings.operator.clone(),
        Arc::clone(&registry),
        Arc::clone(&metrics),
    )
    .await?;

    let state = AppState {
        registry,
        namespace: settings.namespace.clone(),
        step_context,
        metrics,
    };

    let app = router(state, family);
    let listener = TcpListener::bind(&settings.bind_address).await?;
    info!(bind_address = %settings.bind_address, "decision api listening");

    let shutdown = shutdown_signal();
    axum::serve(listener, app).with_graceful_shutdown(shutdown).await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        #[allow(clippy::expect_used)]
        tokio::signal::ctrl_c().await.expect("failed to install ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        #[allow(clippy::expect_used)]
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
