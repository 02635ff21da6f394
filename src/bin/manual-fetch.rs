//! manual-fetch
//!
//! Downloads a service manual from an authenticated portal as HTML/PDF snapshots,
//! keeping the manual's section tree as directories.

use clap::Parser;
use manual_fetch::{
    AcquireConfig, AcquireError, BrowserSource, ConnectionOptions, ErrorClass, Intervention, LaunchOptions,
    NoIntervention, StdinIntervention, run,
};
use std::{path::PathBuf, process::ExitCode};

#[derive(Parser)]
#[command(name = "manual-fetch")]
#[command(version)]
#[command(about = "Download a service manual as HTML/PDF snapshots", long_about = None)]
struct Cli {
    /// Path to the JSON run configuration
    #[arg(long, short = 'c', value_name = "FILE", default_value = "manual-fetch.json")]
    config: PathBuf,

    /// Attach to a running Chrome via its DevTools WebSocket URL instead of launching one
    #[arg(long, value_name = "WS_URL")]
    attach: Option<String>,

    /// Launch browser in headed mode (default: headless)
    #[arg(long, short = 'H')]
    headed: bool,

    /// Path to custom browser executable
    #[arg(long, value_name = "PATH")]
    chrome_path: Option<PathBuf>,

    /// Persistent browser profile directory
    #[arg(long, value_name = "DIR")]
    user_data_dir: Option<PathBuf>,

    /// Output directory (overrides the config file)
    #[arg(long, short = 'o', value_name = "DIR")]
    output: Option<PathBuf>,

    /// Also save the rendered HTML of every page
    #[arg(long)]
    save_html: bool,

    /// Record failed pages and continue instead of aborting
    #[arg(long)]
    ignore_save_errors: bool,

    /// Skip pages whose PDF already exists
    #[arg(long)]
    resume: bool,

    /// Never wait for keyboard input
    #[arg(long)]
    non_interactive: bool,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match acquire(cli) {
        Ok(failed) if failed > 0 => {
            eprintln!("Finished with {} failed pages (see log above)", failed);
            ExitCode::SUCCESS
        }
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            report(&e);
            ExitCode::FAILURE
        }
    }
}

fn acquire(cli: Cli) -> anyhow::Result<usize> {
    let mut config = AcquireConfig::from_file(&cli.config)?;
    if let Some(output) = cli.output {
        config.output_dir = output;
    }
    config.save_html |= cli.save_html;
    config.ignore_save_errors |= cli.ignore_save_errors;
    config.resume |= cli.resume;

    let source = match cli.attach {
        Some(ws_url) => BrowserSource::Attach(ConnectionOptions::new(ws_url)),
        None => {
            let mut options = LaunchOptions::new().headless(!cli.headed);
            if let Some(path) = cli.chrome_path {
                options = options.chrome_path(path);
            }
            if let Some(dir) = cli.user_data_dir {
                options = options.user_data_dir(dir);
            }
            BrowserSource::Launch(options)
        }
    };

    eprintln!("manual-fetch v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("Output directory: {}", config.output_dir.display());
    match &source {
        BrowserSource::Launch(options) => {
            eprintln!("Browser mode: {}", if options.headless { "headless" } else { "headed" })
        }
        BrowserSource::Attach(options) => eprintln!("Attaching to: {}", options.ws_url),
    }

    let intervention: Box<dyn Intervention> =
        if cli.non_interactive { Box::new(NoIntervention) } else { Box::new(StdinIntervention) };

    let summary = run(&config, source, intervention.as_ref())?;
    let failed = summary.failed_nodes();
    for (phase, node_id) in &failed {
        eprintln!("  failed: {} / {}", phase, node_id);
    }
    Ok(failed.len())
}

fn report(error: &anyhow::Error) {
    let Some(error) = error.downcast_ref::<AcquireError>() else {
        eprintln!("Error: {:#}", error);
        return;
    };

    let heading = match error.class() {
        ErrorClass::FatalSetup => "Setup failed",
        ErrorClass::Authentication => "Not authenticated",
        ErrorClass::PlanAcquisition => "Could not load the manual's table of contents",
        ErrorClass::Node => "A page could not be saved",
    };
    eprintln!("{}: {}", heading, error);

    if let Some(partial) = error.partial_result() {
        eprintln!("{} nodes were processed before the run stopped; rerun with --resume to continue", partial.len());
    }
}
