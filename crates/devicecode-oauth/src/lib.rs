//! # devicecode-oauth
//!
//! `OAuth2` device authorization grant (RFC 8628) for console and headless apps.
//!
//! ## Features
//!
//! - **Device code flow**: session initiation, polling with `slow_down`
//!   backoff, local expiry enforcement, and cancellation
//! - **Token cache**: concurrent in-memory cache keyed by account
//! - **Silent acquisition**: cached token reuse and refresh-token redemption
//!   before falling back to the device code flow
//! - **Azure AD authorities**: tenanted v2.0 endpoints and mitigation hints
//!   for common registration mistakes
//!
//! ## Quick Start
//!
//! ```ignore
//! use devicecode_oauth::{AppConfig, TokenOutcome};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::discover(None)?;
//!     let app = config.public_client()?;
//!
//!     let outcome = app
//!         .acquire_token(&config.scopes(), |msg| println!("{msg}"), CancellationToken::new())
//!         .await?;
//!
//!     match outcome {
//!         TokenOutcome::Succeeded(token) => println!("Token: {}", token.access_token),
//!         TokenOutcome::Expired | TokenOutcome::Cancelled => println!("Sign-in did not complete"),
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ### Driving the poller directly
//!
//! ```ignore
//! use devicecode_oauth::{Authority, DeviceFlow, OAuthClient, Scopes};
//!
//! let flow = DeviceFlow::new(OAuthClient::new("client-id", Authority::microsoft("contoso")?));
//! let session = flow.start_session(&Scopes::new(["user.read"]), |msg| println!("{msg}")).await?;
//! let mut poller = flow.poller(session, cancel.clone());
//! let outcome = poller.run().await?;
//! println!("finished in state {:?} after {} polls", poller.state(), poller.polls());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod authority;
pub mod cache;
pub mod client;
pub mod config;
mod error;
pub mod flow;
pub mod scopes;
pub mod token;

pub use authority::Authority;
pub use cache::TokenCache;
pub use client::{PublicClient, SilentOutcome};
pub use config::AppConfig;
pub use error::{Error, Result};
pub use flow::{
    DeviceAuthorization, DeviceCodeSession, DeviceFlow, DevicePoller, OAuthClient, PollResponse,
    PollState, TokenOutcome,
};
pub use scopes::Scopes;
pub use token::{Account, Token};
