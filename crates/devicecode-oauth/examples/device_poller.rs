//! Example: driving the device code poller by hand
//!
//! This example demonstrates how to:
//! 1. Start a device code session against an Azure AD tenant
//! 2. Poll the token endpoint with a cancellable poller
//! 3. Inspect the poller's final state
//!
//! ## Prerequisites
//!
//! 1. Register an application in Azure AD:
//!    - Go to https://portal.azure.com/#blade/Microsoft_AAD_RegisteredApps/ApplicationsListBlade
//!    - Create a new app registration
//!    - Under Authentication, enable "Allow public client flows"
//!    - Note your Application (client) ID and Directory (tenant) ID
//!
//! 2. Set environment variables:
//!    ```bash
//!    export DEVICECODE_CLIENT_ID="your-client-id-here"
//!    export DEVICECODE_TENANT="your-tenant-id-here"
//!    ```
//!
//! ## Running
//!
//! ```bash
//! cargo run --example device_poller
//! ```
//!
//! Press Ctrl-C while waiting to cancel the sign-in.

use devicecode_oauth::{Authority, DeviceFlow, OAuthClient, Scopes, TokenOutcome};
use std::env;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let client_id = env::var("DEVICECODE_CLIENT_ID")?;
    let tenant = env::var("DEVICECODE_TENANT").unwrap_or_else(|_| "organizations".into());

    let authority = Authority::microsoft(&tenant)?;
    println!("Authority: {}", authority.token_url);

    let flow = DeviceFlow::new(OAuthClient::new(client_id, authority));
    let session = flow
        .start_session(&Scopes::new(["user.read"]), |msg| println!("\n{msg}\n"))
        .await?;
    println!(
        "Code {} expires at {}, polling every {}s",
        session.user_code(),
        session.expires_at(),
        session.interval().as_secs()
    );

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    let mut poller = flow.poller(session, cancel);
    let outcome = poller.run().await;
    println!("Poller finished in {:?} after {} polls", poller.state(), poller.polls());

    match outcome? {
        TokenOutcome::Succeeded(token) => {
            let user = token.account.as_ref().map_or("unknown user", |a| a.username.as_str());
            println!("Signed in as {user}; token expires at {:?}", token.expires_at);
        }
        TokenOutcome::Expired => println!("The code expired before sign-in completed"),
        TokenOutcome::Cancelled => println!("Sign-in was cancelled"),
    }

    Ok(())
}
