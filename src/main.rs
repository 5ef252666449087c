//! Luno CLI - send signed requests to the Luno API.
//!
//! This binary parses the command line, builds a client and prints results as
//! JSON on stdout. Logs go to stderr.

use clap::Parser;
use serde_json::{json, Value};
use std::process::ExitCode;
use tracing::{debug, error};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use luno_client::{
    config::{Cli, Command, RequestConfig, SignConfig, SignOutputFormat},
    Client, Error, Signer,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    match cli.command {
        Command::Request(config) => run_request(config).await,
        Command::Sign(config) => run_sign(config),
    }
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "luno_client=debug,luno=debug"
    } else {
        "luno_client=info,luno=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

// =============================================================================
// Request Command
// =============================================================================

async fn run_request(config: RequestConfig) -> ExitCode {
    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let (method, params, body) = match (
        config.request.method(),
        config.request.parse_params(),
        config.request.parse_body(),
    ) {
        (Ok(method), Ok(params), Ok(body)) => (method, params, body),
        (Err(e), _, _) | (_, Err(e), _) | (_, _, Err(e)) => {
            error!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let client = match Client::new(config.connection.to_config()) {
        Ok(client) => client,
        Err(e) => {
            error!("Failed to create client: {}", e);
            return ExitCode::FAILURE;
        }
    };

    debug!(
        method = %method,
        url = %client.url_for(&config.request.route),
        "Sending request"
    );

    match client
        .request(method.as_str(), &config.request.route, &params, body.as_ref())
        .await
    {
        Ok(value) => {
            print_json(&value);
            ExitCode::SUCCESS
        }
        Err(err) => {
            report_error(&err);
            ExitCode::FAILURE
        }
    }
}

/// Print an error and whatever structured details it carries.
fn report_error(err: &Error) {
    eprintln!("Error: {}", err);
    if let Some(code) = err.code() {
        eprintln!("  code:   {}", code);
    }
    if let Some(status) = err.status() {
        eprintln!("  status: {}", status);
    }
    if let Some(extra) = err.extra() {
        eprintln!("  extra:  {}", extra);
    }
    if let Error::Unrecognized { body, .. } = err {
        eprintln!("  body:   {}", body);
    }
}

fn print_json(value: &Value) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{}", text),
        Err(_) => println!("{}", value),
    }
}

// =============================================================================
// Sign Command
// =============================================================================

fn run_sign(config: SignConfig) -> ExitCode {
    if let Err(e) = config.validate() {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    let (method, params, body, at) = match (
        config.request.method(),
        config.request.parse_params(),
        config.request.parse_body(),
        config.parse_timestamp(),
    ) {
        (Ok(method), Ok(params), Ok(body), Ok(at)) => (method, params, body, at),
        (Err(e), _, _, _) | (_, Err(e), _, _) | (_, _, Err(e), _) | (_, _, _, Err(e)) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let client_config = config.connection.to_config();
    let signer = Signer::from_config(&client_config);
    let signed = signer.sign_at(method, &config.request.route, &params, body.as_ref(), at);

    let url = format!(
        "{}{}",
        client_config.host.trim_end_matches('/'),
        signed.path_and_query()
    );

    match config.format {
        SignOutputFormat::Signature => {
            println!("{}", signed.signature);
        }
        SignOutputFormat::Json => {
            print_json(&json!({
                "method": signed.method.as_str(),
                "route": signed.route,
                "canonical": signed.canonical,
                "signature": signed.signature,
                "body": signed.body,
                "url": url,
            }));
        }
        SignOutputFormat::Url => {
            println!("{}", url);
        }
    }

    ExitCode::SUCCESS
}
