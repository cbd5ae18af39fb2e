//! Attendance kiosk command-line entry point

use anyhow::Context;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use scan_core::{ScannerController, ScannerStatus};
use scan_kiosk::{HttpAttendanceClient, Kiosk, KioskConfig, LineInputBackend, Notice};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

fn cli() -> Command {
    Command::new("scan-kiosk")
        .version(scan_kiosk::VERSION)
        .about("Attendance kiosk: check members in and out from scanned codes")
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .value_parser(value_parser!(PathBuf))
                .help("TOML configuration file"),
        )
        .arg(
            Arg::new("api-url")
                .long("api-url")
                .help("Attendance API base URL"),
        )
        .arg(
            Arg::new("input")
                .long("input")
                .short('i')
                .action(ArgAction::Append)
                .help("Line source to scan from, '-' for stdin (repeatable)"),
        )
        .arg(
            Arg::new("token")
                .long("token")
                .help("Bearer token for the attendance API"),
        )
        .arg(
            Arg::new("cooldown-ms")
                .long("cooldown-ms")
                .value_parser(value_parser!(u64))
                .help("Ignore further scans for this long after an accepted one"),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .action(ArgAction::SetTrue)
                .help("Log at debug level"),
        )
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON lines"),
        )
}

fn init_logging(verbose: bool, json: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_config(args: &ArgMatches) -> anyhow::Result<KioskConfig> {
    let mut config = match args.get_one::<PathBuf>("config") {
        Some(path) => KioskConfig::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => KioskConfig::default(),
    };

    if let Some(url) = args.get_one::<String>("api-url") {
        config = config.with_api_base_url(url.clone());
    }
    if let Some(inputs) = args.get_many::<String>("input") {
        config = config.with_inputs(inputs.cloned().collect());
    }
    if let Some(token) = args.get_one::<String>("token") {
        config = config.with_api_token(token.clone());
    }
    if let Some(ms) = args.get_one::<u64>("cooldown-ms") {
        config = config.with_cooldown(Duration::from_millis(*ms));
    }

    let config = config.with_env_token();
    config.validate()?;
    Ok(config)
}

fn print_notice(notice: &Notice) {
    match notice {
        Notice::Success(text) => println!("OK     {text}"),
        Notice::Error(text) => println!("ERROR  {text}"),
        Notice::Alert(text) => println!("ALERT  {text}"),
        Notice::Warning(text) => println!("WARN   {text}"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = cli().get_matches();
    init_logging(args.get_flag("verbose"), args.get_flag("log-json"));

    let config = load_config(&args)?;
    tracing::info!(
        "Scan kiosk {} using {} (inputs: {})",
        scan_kiosk::VERSION,
        config.api_base_url,
        config.inputs.join(", ")
    );

    let api = HttpAttendanceClient::from_config(&config)?;
    let backend = LineInputBackend::new(config.inputs.clone());
    let (scanner, events) = ScannerController::spawn(backend.clone(), config.scanner.clone())?;
    let kiosk = tokio::spawn(Kiosk::new(api).run(events, print_notice));

    scanner.set_desired_active(true)?;

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result.context("listening for Ctrl-C")?;
            tracing::info!("Interrupted, shutting down");
        }
        () = backend.wait_exhausted() => {
            // Let the controller see every line before it goes down
            let delivered = backend.lines_delivered();
            let drained = scanner.wait_for(|s| {
                s.stats.device_events >= delivered || s.status == ScannerStatus::Failed
            });
            if drained.await.is_err() {
                tracing::warn!("Scanner stopped before input was drained");
            }
            tracing::info!("Input exhausted, shutting down");
        }
    }

    scanner.shutdown().await;
    let summary = kiosk.await.context("kiosk task")?;
    tracing::info!(
        "Checked in: {}, checked out: {}, failed scans: {}, scanner errors: {}",
        summary.checked_in,
        summary.checked_out,
        summary.failed_scans,
        summary.scanner_errors
    );
    Ok(())
}
