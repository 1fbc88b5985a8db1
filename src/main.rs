//! pgaudit
//!
//! Find volumes on a FlashArray that are not in an enabled protection group.
//!
//! ```text
//! pgaudit array01 --api-token <token> --enable-check either --ignore scratch
//! ```

use std::error::Error as _;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use tracing::{debug, info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use pgaudit::config::DEFAULT_REST_VERSION;
use pgaudit::error::EXIT_SUCCESS;
use pgaudit::prompt::prompt_password;
use pgaudit::report::write_report;
use pgaudit::{
    find_unprotected, ArrayConfig, AuditOptions, Credentials, EnabledCheckMode, Error,
    FlashArrayClient, ReachabilityMode, Result,
};

// =============================================================================
// CLI Arguments
// =============================================================================

/// Find unprotected volumes on a Pure FlashArray
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Array FQDN or IP
    array: String,

    /// Username, required if no api-token
    #[arg(long, env = "PGAUDIT_USER", conflicts_with = "api_token")]
    user: Option<String>,

    /// Password, prompted for if missing
    #[arg(
        long = "pass",
        env = "PGAUDIT_PASSWORD",
        hide_env_values = true,
        conflicts_with = "api_token"
    )]
    password: Option<String>,

    /// API token
    #[arg(long, env = "PGAUDIT_API_TOKEN", hide_env_values = true)]
    api_token: Option<String>,

    /// Check if the local or remote schedule is enabled on each PG. Remote
    /// checks also require at least one allowed target.
    #[arg(long, value_enum, default_value_t = EnabledCheckMode::Either)]
    enable_check: EnabledCheckMode,

    /// How protection is traced from groups to volumes
    #[arg(long, value_enum, default_value_t = ReachabilityMode::Full)]
    reachability: ReachabilityMode,

    /// Print only volume names
    #[arg(long)]
    quiet: bool,

    /// Skip volumes whose name contains this substring
    #[arg(long)]
    ignore: Option<String>,

    /// Do not verify the array's TLS certificate
    #[arg(long, env = "PGAUDIT_INSECURE")]
    insecure: bool,

    /// Per-request timeout in seconds
    #[arg(long, default_value = "30", value_parser = clap::value_parser!(u64).range(1..))]
    timeout: u64,

    /// Maximum number of queries in flight
    #[arg(long, default_value = "5")]
    max_concurrency: usize,

    /// REST API version
    #[arg(long, default_value = DEFAULT_REST_VERSION)]
    rest_version: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "warn")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,
}

// =============================================================================
// Main
// =============================================================================

fn main() {
    let args = Args::parse();

    init_logging(&args);

    let code = match execute(args) {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => report_failure(e),
    };

    std::process::exit(code);
}

fn execute(args: Args) -> Result<()> {
    // Everything that can be a usage error is settled before any network call
    let credentials = Credentials::resolve(
        args.api_token.clone(),
        args.user.clone(),
        args.password.clone(),
        prompt_password,
    )?;

    let config = ArrayConfig {
        rest_version: args.rest_version.clone(),
        request_timeout: Duration::from_secs(args.timeout),
        accept_invalid_certs: args.insecure,
        max_concurrency: args.max_concurrency,
        ..ArrayConfig::for_address(&args.array)?
    };
    config.validate()?;

    let options = AuditOptions {
        check_mode: args.enable_check,
        reachability: args.reachability,
        ignore: args.ignore.clone(),
        max_concurrency: config.max_concurrency,
    };

    info!("Auditing array {}", config.endpoint);
    info!("  Enable check: {}", options.check_mode);
    info!("  Reachability: {}", options.reachability);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| Error::Internal(format!("Failed to start async runtime: {}", e)))?;

    let report = runtime.block_on(async {
        let client = Arc::new(FlashArrayClient::connect(config, &credentials).await?);
        let report = find_unprotected(client.clone(), &options).await;

        if let Err(e) = client.logout().await {
            debug!("Failed to close REST session: {}", e);
        }

        report
    })?;

    let mut stdout = io::stdout().lock();
    write_report(&mut stdout, &report, options.check_mode, args.quiet)
}

/// Print one diagnostic for `err` and pick the exit code.
fn report_failure(err: Error) -> i32 {
    match &err {
        Error::Usage(msg) => Args::command()
            .error(ErrorKind::MissingRequiredArgument, msg)
            .exit(),
        Error::Config(msg) => Args::command().error(ErrorKind::ValueValidation, msg).exit(),
        e if e.is_connectivity() => {
            eprintln!("error: connection or credential problem: {}", e);
        }
        e => {
            eprintln!("error: {}", e);
        }
    }

    if let Some(source) = err.source() {
        debug!("Caused by: {}", source);
    }
    debug!(exit_code = err.exit_code(), "Audit aborted");

    err.exit_code()
}

// =============================================================================
// Logging Setup
// =============================================================================

fn init_logging(args: &Args) {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::WARN,
    };

    let mut filter = EnvFilter::from_default_env().add_directive(level.into());
    for directive in ["hyper=warn", "reqwest=warn", "rustls=warn"] {
        if let Ok(d) = directive.parse() {
            filter = filter.add_directive(d);
        }
    }

    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_writer(io::stderr))
            .init();
    }
}
