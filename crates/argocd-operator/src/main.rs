use anyhow::Result;
use argocd_operator::{controller, server, telemetry};
use clap::{Parser, Subcommand};
use tracing::error;

const METRICS_PORT: u16 = 8080;

#[derive(Parser)]
#[command(
    name = "argocd-operator",
    about = "Kubernetes operator managing Argo CD installations"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the ArgoCD CRD YAML to stdout.
    Crd,
}

#[tokio::main]
async fn main() -> Result<()> {
    telemetry::init();

    let cli = Cli::parse();
    if let Some(Commands::Crd) = cli.command {
        return controller::print_crd();
    }

    let state = server::ServerState::new();
    tokio::select! {
        res = server::run(METRICS_PORT, state.clone()) => {
            error!("metrics server exited: {res:?}");
            res
        }
        res = controller::run(state) => res,
    }
}
