//! `devicecode` - sign in from a console with the OAuth2 device code flow
//!
//! Reuses a cached token when it can, otherwise prints the device code
//! instructions, waits for the user to sign in on another device, then calls
//! the configured resource and prints its properties.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod cli;
mod display;
mod resource;

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use devicecode_oauth::{AppConfig, TokenOutcome};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cli::Cli;
use resource::ResourceResponse;

/// Exit status when the user did not finish signing in.
const SIGN_IN_INCOMPLETE: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging; stdout is reserved for the user-facing output
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "devicecode=info,devicecode_oauth=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match run(&cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            if let Some(hint) = e
                .downcast_ref::<devicecode_oauth::Error>()
                .and_then(devicecode_oauth::Error::hint)
            {
                eprintln!("Hint: {hint}");
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli) -> Result<ExitCode> {
    let config = AppConfig::discover(cli.config.as_deref()).context("failed to load configuration")?;
    let config = cli.apply(config);
    let app = config.public_client()?;
    let resource_url = config.resource_url()?;

    info!(authority = %config.authority_url(), scopes = %config.scopes(), "Starting devicecode");

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            debug!("Ctrl-C received, cancelling");
            ctrl_c.cancel();
        }
    });

    let outcome = app
        .acquire_token(&config.scopes(), |message| println!("{message}"), cancel.clone())
        .await?;

    let token = match outcome {
        TokenOutcome::Succeeded(token) => token,
        TokenOutcome::Expired => {
            println!("Sign-in did not complete (the code expired before it was used)");
            return Ok(ExitCode::from(SIGN_IN_INCOMPLETE));
        }
        TokenOutcome::Cancelled => {
            println!("Sign-in did not complete (cancelled)");
            return Ok(ExitCode::from(SIGN_IN_INCOMPLETE));
        }
    };

    let username = token
        .account
        .as_ref()
        .map_or("Unknown user", |account| account.username.as_str());
    println!("{username} successfully signed-in");

    let http = reqwest::Client::new();
    match resource::fetch(&http, resource_url, &token.access_token, &cancel).await? {
        ResourceResponse::Object(object) => {
            for line in display::properties(&object) {
                println!("{line}");
            }
            Ok(ExitCode::SUCCESS)
        }
        ResourceResponse::Failed { status, body } => {
            println!("Failed to call the resource: {status}");
            println!("Content: {body}");
            Ok(ExitCode::FAILURE)
        }
        ResourceResponse::Cancelled => {
            println!("Resource call cancelled");
            Ok(ExitCode::FAILURE)
        }
    }
}
