//! Token polling state machine for a device code session.

use super::device::{DeviceCodeSession, DeviceFlow, PollResponse};
use crate::error::{Error, Result};
use crate::token::Token;
use chrono::Utc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Interval increase on `slow_down` (RFC 8628 §3.5).
const SLOW_DOWN_STEP: Duration = Duration::from_secs(5);

/// Poller state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    /// Waiting for the user to finish signing in.
    Polling,
    /// A token was issued.
    Succeeded,
    /// The device code expired first.
    Expired,
    /// The caller cancelled, or the user declined.
    Cancelled,
    /// The provider rejected the grant or the transport failed.
    Failed,
}

impl PollState {
    /// Returns true for every state except `Polling`.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Polling)
    }
}

/// How a token acquisition ended without an error.
#[derive(Debug)]
pub enum TokenOutcome {
    /// A token was obtained, from the cache or from the user signing in.
    Succeeded(Token),
    /// The code expired before the user signed in.
    Expired,
    /// The caller cancelled, or the user declined.
    Cancelled,
}

impl TokenOutcome {
    /// Returns the token, if one was obtained.
    #[must_use]
    pub const fn token(&self) -> Option<&Token> {
        match self {
            Self::Succeeded(token) => Some(token),
            Self::Expired | Self::Cancelled => None,
        }
    }

    /// Consumes the outcome, returning the token if one was obtained.
    #[must_use]
    pub fn into_token(self) -> Option<Token> {
        match self {
            Self::Succeeded(token) => Some(token),
            Self::Expired | Self::Cancelled => None,
        }
    }
}

/// Polls the token endpoint for one session until a terminal state.
///
/// Each iteration waits for the current interval (cut short by the session
/// expiry or by cancellation), then checks expiry, then cancellation, and only
/// then sends a request. A request still in flight at the expiry is abandoned.
/// Polls are strictly sequential.
#[derive(Debug)]
pub struct DevicePoller<'a> {
    flow: &'a DeviceFlow,
    session: DeviceCodeSession,
    cancel: CancellationToken,
    interval: Duration,
    state: PollState,
    polls: u32,
}

impl<'a> DevicePoller<'a> {
    /// Creates a poller in the `Polling` state.
    #[must_use]
    pub fn new(flow: &'a DeviceFlow, session: DeviceCodeSession, cancel: CancellationToken) -> Self {
        let interval = session.interval();
        Self {
            flow,
            session,
            cancel,
            interval,
            state: PollState::Polling,
            polls: 0,
        }
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> PollState {
        self.state
    }

    /// Number of token requests issued so far.
    #[must_use]
    pub const fn polls(&self) -> u32 {
        self.polls
    }

    /// Current polling interval, including any `slow_down` backoff.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// The session being polled.
    #[must_use]
    pub const fn session(&self) -> &DeviceCodeSession {
        &self.session
    }

    /// Polls until the user signs in, the code expires, or `cancel` fires.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Provider`] for definitive provider rejections,
    /// transport errors, and [`Error::SessionFinished`] if the poller already
    /// reached a terminal state.
    pub async fn run(&mut self) -> Result<TokenOutcome> {
        if self.state.is_terminal() {
            return Err(Error::SessionFinished);
        }

        loop {
            let wait = self.next_wait();
            tokio::select! {
                biased;
                () = self.cancel.cancelled() => {}
                () = tokio::time::sleep(wait) => {}
            }

            if Utc::now() >= self.session.expires_at() {
                return Ok(self.finish(PollState::Expired));
            }
            if self.cancel.is_cancelled() {
                return Ok(self.finish(PollState::Cancelled));
            }

            self.polls += 1;
            let response = tokio::select! {
                biased;
                () = self.cancel.cancelled() => Err(PollState::Cancelled),
                response = self.flow.poll_once(&self.session) => Ok(response),
                () = tokio::time::sleep(self.time_left()) => Err(PollState::Expired),
            };
            let response = match response {
                Ok(response) => response,
                Err(state) => return Ok(self.finish(state)),
            };

            match response {
                Ok(PollResponse::Token(token)) => {
                    self.transition(PollState::Succeeded);
                    return Ok(TokenOutcome::Succeeded(token));
                }
                Ok(PollResponse::Pending) => {
                    debug!(polls = self.polls, "Authorization pending");
                }
                Ok(PollResponse::SlowDown) => {
                    self.interval += SLOW_DOWN_STEP;
                    debug!(
                        interval_secs = self.interval.as_secs(),
                        "Provider asked to slow down"
                    );
                }
                Ok(PollResponse::Expired) => return Ok(self.finish(PollState::Expired)),
                Ok(PollResponse::Declined) => {
                    return Ok(self.finish(PollState::Cancelled));
                }
                Err(e) => {
                    warn!("Device code polling failed: {e}");
                    self.transition(PollState::Failed);
                    return Err(e);
                }
            }
        }
    }

    /// Time to wait before the next poll: the interval, or less if the
    /// session expires sooner.
    fn next_wait(&self) -> Duration {
        self.interval.min(self.time_left())
    }

    fn time_left(&self) -> Duration {
        (self.session.expires_at() - Utc::now())
            .to_std()
            .unwrap_or(Duration::ZERO)
    }

    fn finish(&mut self, state: PollState) -> TokenOutcome {
        self.transition(state);
        match state {
            PollState::Expired => TokenOutcome::Expired,
            _ => TokenOutcome::Cancelled,
        }
    }

    fn transition(&mut self, state: PollState) {
        info!(from = ?self.state, to = ?state, polls = self.polls, "Device code poller finished");
        self.state = state;
    }
}
