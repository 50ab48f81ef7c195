//! sxg-pack binary.
//!
//! `pack` checks tool availability, validates the request, then runs the
//! packaging pipeline with the production signer. `serve` exposes the
//! resulting artifacts over HTTP(S).

use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use sxg_pack::cli::{Cli, Commands, PackArgs};
use sxg_pack::config::PackagingRequest;
use sxg_pack::error::PackagerError;
use sxg_pack::local_signer::LocalSigner;
use sxg_pack::packager::{PackagingSummary, SxgPackager};
use sxg_pack::{server, signer, workspace};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let code = match cli.command {
        Commands::Pack(args) => match run_pack(*args) {
            Ok(()) => 0,
            Err(e) => {
                error!("{e}");
                eprintln!("sxg-pack: {e}");
                e.exit_code()
            }
        },
        Commands::Serve(args) => match server::serve(*args) {
            Ok(()) => 0,
            Err(e) => {
                eprintln!("sxg-pack: {e:#}");
                1
            }
        },
    };
    std::process::exit(code);
}

fn run_pack(args: PackArgs) -> Result<(), PackagerError> {
    // Tool availability is checked once, before any workspace or file I/O.
    signer::require_tools()?;

    let json = args.json;
    let request = PackagingRequest::from_args(args);
    request.validate()?;

    spawn_interrupt_watcher();

    let summary = SxgPackager::new(request, LocalSigner).package()?;
    print_summary(&summary, json)
}

fn print_summary(summary: &PackagingSummary, json: bool) -> Result<(), PackagerError> {
    if json {
        let rendered = serde_json::to_string_pretty(summary)
            .map_err(|e| PackagerError::Io(std::io::Error::other(e)))?;
        println!("{rendered}");
        return Ok(());
    }

    println!("\n✓ SXG package complete");
    for file in &summary.files {
        println!("  {}", file.display());
    }
    println!("✓ Output directory: {}", summary.out_dir.display());
    Ok(())
}

/// Tear down live workspaces and exit 130 when the run is interrupted.
///
/// `Drop` does not run on a signal-terminated process, so the watcher removes
/// registered workspaces itself before exiting.
fn spawn_interrupt_watcher() {
    std::thread::spawn(|| {
        let rt = match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(rt) => rt,
            Err(e) => {
                error!("failed to start interrupt watcher: {e}");
                return;
            }
        };
        rt.block_on(async {
            let _ = tokio::signal::ctrl_c().await;
        });
        workspace::remove_registered();
        eprintln!("sxg-pack: interrupted");
        std::process::exit(130);
    });
}
