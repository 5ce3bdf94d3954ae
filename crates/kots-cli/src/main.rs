//! Kots CLI - render application manifests into a Kustomize layout

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod error;
mod exit_codes;

#[derive(Parser)]
#[command(name = "kots")]
#[command(author = "Kots Contributors")]
#[command(version)]
#[command(about = "Render kots applications into base, midstream and overlays", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Render upstream manifests into base and midstream layers
    Render {
        /// Directory holding the upstream manifests
        source: PathBuf,

        /// Render root (base/, midstream/ and overlays/ are created under it)
        #[arg(long)]
        render_dir: PathBuf,

        /// Replace an existing base directory
        #[arg(long)]
        overwrite: bool,

        /// Leave kots kinds (Application, Config, ...) out of the base
        #[arg(long)]
        exclude_kots_kinds: bool,

        #[command(flatten)]
        registry: RegistryArgs,

        /// Namespace set on the generated pull secret
        #[arg(short, long)]
        namespace: Option<String>,
    },
}

/// Private registry images are rewritten to
#[derive(Args, Debug, Default)]
pub struct RegistryArgs {
    /// Registry host, e.g. registry.example.com:5000
    #[arg(long)]
    pub registry_endpoint: Option<String>,

    /// Namespace images are pushed under
    #[arg(long)]
    pub registry_namespace: Option<String>,

    #[arg(long, env = "KOTS_REGISTRY_USERNAME")]
    pub registry_username: Option<String>,

    #[arg(long, env = "KOTS_REGISTRY_PASSWORD", hide_env_values = true)]
    pub registry_password: Option<String>,

    /// YAML file with endpoint/namespace/username/password; flags take precedence
    #[arg(long)]
    pub registry_config: Option<PathBuf>,
}

fn init_tracing(debug: bool) {
    let default_level = if debug { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(debug)
        .init();
}

fn main() {
    // Setup miette for nice error display
    miette::set_panic_hook();

    let cli = Cli::parse();
    init_tracing(cli.debug);

    let result = match cli.command {
        Commands::Render {
            source,
            render_dir,
            overwrite,
            exclude_kots_kinds,
            registry,
            namespace,
        } => commands::render::run(
            &source,
            &render_dir,
            overwrite,
            exclude_kots_kinds,
            &registry,
            namespace.as_deref(),
        ),
    };

    if let Err(err) = result {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}
