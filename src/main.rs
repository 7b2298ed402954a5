use anyhow::{Context, Result};
use clap::Parser;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use usbide::config::Config;
use usbide::environment::process_env;
use usbide::layout::PortableLayout;
use usbide::preflight;
use usbide::process::SystemLauncher;
use usbide::tui::TuiRunner;

#[derive(Parser)]
#[command(name = "usbide")]
#[command(about = "Portable terminal workbench with a shell, Python tooling and the Codex CLI", long_about = None)]
struct Cli {
    /// Workspace root (default: current directory)
    #[arg(short, long, default_value = ".")]
    root: PathBuf,
    /// Print the environment report and exit
    #[arg(long)]
    preflight: bool,
}

/// Log to a file; the terminal belongs to the UI
fn init_tracing(layout: &PortableLayout) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "usbide=info".into());
    let file = std::fs::create_dir_all(layout.app_dir())
        .and_then(|_| {
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(layout.log_file())
        });
    let fmt = tracing_subscriber::fmt::layer().with_ansi(false);
    match file {
        Ok(file) => tracing_subscriber::registry()
            .with(filter)
            .with(fmt.with_writer(Mutex::new(file)))
            .init(),
        Err(_) => tracing_subscriber::registry()
            .with(filter)
            .with(fmt.with_writer(std::io::sink))
            .init(),
    }
}

fn resolve_root(root: &Path) -> Result<PathBuf> {
    let root = std::path::absolute(root)
        .with_context(|| format!("Invalid workspace root {}", root.display()))?;
    if !root.is_dir() {
        anyhow::bail!("Workspace root {} is not a directory", root.display());
    }
    Ok(root)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let root = resolve_root(&cli.root)?;

    if cli.preflight {
        print!("{}", preflight::report(&root, &process_env(), preflight::dns_ok));
        return Ok(());
    }

    let layout = PortableLayout::new(&root);
    init_tracing(&layout);
    layout
        .ensure_dirs()
        .with_context(|| format!("Failed to create portable directories under {}", root.display()))?;

    let config = Config::load(&root)?;
    info!(root = %root.display(), auto_install = config.codex.auto_install, "starting");

    let mut runner = TuiRunner::new(layout, config, Arc::new(SystemLauncher), process_env());
    runner.run().await
}
