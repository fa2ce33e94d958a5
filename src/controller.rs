//! Retry Controller
//!
//! Drives one run: read credentials, probe once, then attempt login up to the
//! configured budget with a linearly growing pause between attempts.
//!
//! # State Flow
//!
//! ```text
//! Idle
//!   ↓
//! Probing ──→ Direct
//!   ↓
//! Attempting(1) ──→ Success(1)
//!   ↓
//! Attempting(n) ──→ Success(n)
//!   ↓
//! OutOfAttempts(n)
//! ```

use crate::config_file::AutologinConfig;
use crate::error::Result;
use crate::http::HttpSession;
use crate::login::Submitter;
use crate::probe::Prober;
use crate::secrets::{SecretStore, load_credentials};
use crate::types::{ExitStatus, LoginAttempt, ProbeResult};
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info, warn};

/// Pause between attempts.
pub trait Sleeper {
    fn sleep(&self, duration: Duration);
}

/// Blocks the current thread.
#[derive(Debug, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// States of one run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunState {
    /// Nothing done yet; credentials are read here
    Idle,
    /// Checking connectivity
    Probing,
    /// Not intercepted (terminal)
    Direct,
    /// Login attempt number `n` (1-based) in progress
    Attempting(u32),
    /// Attempt `n` logged in (terminal)
    Success(u32),
    /// All `n` attempts failed (terminal)
    OutOfAttempts(u32),
}

impl RunState {
    /// Returns true for Direct, Success and OutOfAttempts
    #[inline]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Direct | Self::Success(_) | Self::OutOfAttempts(_))
    }

    /// Whether `next` directly follows `self`.
    pub const fn can_transition_to(self, next: RunState) -> bool {
        match (self, next) {
            (Self::Idle, Self::Probing) => true,
            (Self::Probing, Self::Direct) => true,
            (Self::Probing, Self::Attempting(1)) => true,
            (Self::Attempting(n), Self::Attempting(m)) => m == n + 1,
            (Self::Attempting(n), Self::Success(m)) => m == n,
            (Self::Attempting(n), Self::OutOfAttempts(m)) => m == n,
            _ => false,
        }
    }

    /// Exit status of a terminal state.
    pub const fn exit_status(self) -> Option<ExitStatus> {
        match self {
            Self::Direct | Self::Success(_) => Some(ExitStatus::Connected),
            Self::OutOfAttempts(_) => Some(ExitStatus::LoginFailed),
            _ => None,
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Probing => write!(f, "probing"),
            Self::Direct => write!(f, "direct connection"),
            Self::Attempting(n) => write!(f, "login attempt {}", n),
            Self::Success(n) => write!(f, "logged in on attempt {}", n),
            Self::OutOfAttempts(n) => write!(f, "failed after {} attempts", n),
        }
    }
}

/// Errors that can occur during state transitions
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RunTransitionError {
    #[error("Cannot transition from terminal state {from}")]
    FromTerminalState { from: RunState },

    #[error("Cannot transition from {from} to {to}")]
    Illegal { from: RunState, to: RunState },
}

/// Owns the current state and the path taken to reach it.
#[derive(Debug, Clone)]
pub struct RunContext {
    current: RunState,
    history: Vec<RunState>,
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new()
    }
}

impl RunContext {
    pub fn new() -> Self {
        Self {
            current: RunState::Idle,
            history: vec![RunState::Idle],
        }
    }

    #[inline]
    pub fn current(&self) -> RunState {
        self.current
    }

    /// Every state visited, starting with Idle.
    pub fn history(&self) -> &[RunState] {
        &self.history
    }

    /// Move to `next`.
    ///
    /// # Errors
    ///
    /// - `FromTerminalState` if the run already ended
    /// - `Illegal` if `next` does not directly follow the current state
    pub fn transition_to(&mut self, next: RunState) -> std::result::Result<(), RunTransitionError> {
        if self.current.is_terminal() {
            return Err(RunTransitionError::FromTerminalState { from: self.current });
        }
        if !self.current.can_transition_to(next) {
            return Err(RunTransitionError::Illegal {
                from: self.current,
                to: next,
            });
        }
        self.current = next;
        self.history.push(next);
        Ok(())
    }
}

/// What one run did.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub final_state: RunState,
    pub states: Vec<RunState>,
    pub probe: ProbeResult,
    pub attempts: Vec<LoginAttempt>,
    /// Pauses slept between attempts, in order.
    pub backoffs: Vec<Duration>,
}

impl RunReport {
    pub fn exit_status(&self) -> ExitStatus {
        self.final_state
            .exit_status()
            .unwrap_or(ExitStatus::LoginFailed)
    }
}

/// Orchestrates probe, submit and retry for one invocation.
pub struct Controller<'a> {
    config: &'a AutologinConfig,
    session: &'a dyn HttpSession,
    secrets: &'a dyn SecretStore,
    sleeper: &'a dyn Sleeper,
}

impl<'a> Controller<'a> {
    pub fn new(
        config: &'a AutologinConfig,
        session: &'a dyn HttpSession,
        secrets: &'a dyn SecretStore,
        sleeper: &'a dyn Sleeper,
    ) -> Self {
        Self {
            config,
            session,
            secrets,
            sleeper,
        }
    }

    /// Run to a terminal state.
    ///
    /// # Errors
    ///
    /// `MissingCredentials` when either secret is absent; no request is made then.
    pub fn run(&self) -> Result<RunReport> {
        let mut ctx = RunContext::new();

        let credentials = load_credentials(
            self.secrets,
            &self.config.username_service,
            &self.config.password_service,
        )
        .inspect_err(|e| {
            error!(
                "Secret store is missing credentials ({} / {}): {}",
                self.config.username_service, self.config.password_service, e
            )
        })?;
        info!("Loaded credentials for user {}", credentials.masked_username());

        ctx.transition_to(RunState::Probing)?;
        let probe = Prober::new(self.session, &self.config.probe_endpoints).probe();

        let mut attempts = Vec::new();
        let mut backoffs = Vec::new();

        if !probe.is_intercepted() {
            ctx.transition_to(RunState::Direct)?;
            info!("Network is directly connected, no login needed");
        } else {
            info!(
                "Captive portal detected: {}",
                probe.portal_url().unwrap_or("(unknown entry)")
            );

            let submitter = Submitter::new(
                self.session,
                &self.config.probe_endpoints,
                &self.config.success_markers,
            );
            let max = self.config.max_attempts;

            for attempt in 1..=max {
                ctx.transition_to(RunState::Attempting(attempt))?;
                let result = submitter.submit(&credentials, probe.portal_url());
                let outcome = result.outcome;
                attempts.push(result);

                if outcome.is_success() {
                    ctx.transition_to(RunState::Success(attempt))?;
                    info!("Login succeeded on attempt {}", attempt);
                    break;
                }

                if attempt == max {
                    ctx.transition_to(RunState::OutOfAttempts(attempt))?;
                    error!("Login still failing after {} attempts", attempt);
                    break;
                }

                let delay = self.config.backoff_for(attempt);
                warn!(
                    "Login attempt {} {}, retrying in {}s",
                    attempt,
                    outcome,
                    delay.as_secs()
                );
                self.sleeper.sleep(delay);
                backoffs.push(delay);
            }
        }

        Ok(RunReport {
            final_state: ctx.current(),
            states: ctx.history().to_vec(),
            probe,
            attempts,
            backoffs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_starts_idle() {
        let ctx = RunContext::new();
        assert_eq!(ctx.current(), RunState::Idle);
        assert_eq!(ctx.history(), &[RunState::Idle]);
    }

    #[test]
    fn test_direct_path() {
        let mut ctx = RunContext::new();
        ctx.transition_to(RunState::Probing).unwrap();
        ctx.transition_to(RunState::Direct).unwrap();
        assert!(ctx.current().is_terminal());
        assert_eq!(ctx.current().exit_status(), Some(ExitStatus::Connected));
    }

    #[test]
    fn test_attempt_path() {
        let mut ctx = RunContext::new();
        ctx.transition_to(RunState::Probing).unwrap();
        ctx.transition_to(RunState::Attempting(1)).unwrap();
        ctx.transition_to(RunState::Attempting(2)).unwrap();
        ctx.transition_to(RunState::OutOfAttempts(2)).unwrap();
        assert_eq!(ctx.current().exit_status(), Some(ExitStatus::LoginFailed));
        assert_eq!(ctx.history().len(), 5);
    }

    #[test]
    fn test_cannot_skip_attempts() {
        let mut ctx = RunContext::new();
        ctx.transition_to(RunState::Probing).unwrap();
        let err = ctx.transition_to(RunState::Attempting(2)).unwrap_err();
        assert!(matches!(err, RunTransitionError::Illegal { .. }));

        ctx.transition_to(RunState::Attempting(1)).unwrap();
        assert!(ctx.transition_to(RunState::Success(2)).is_err());
        assert!(ctx.transition_to(RunState::Attempting(3)).is_err());
    }

    #[test]
    fn test_cannot_probe_without_leaving_idle() {
        let mut ctx = RunContext::new();
        assert!(ctx.transition_to(RunState::Direct).is_err());
        assert!(ctx.transition_to(RunState::Attempting(1)).is_err());
    }

    #[test]
    fn test_terminal_states_are_final() {
        let mut ctx = RunContext::new();
        ctx.transition_to(RunState::Probing).unwrap();
        ctx.transition_to(RunState::Attempting(1)).unwrap();
        ctx.transition_to(RunState::Success(1)).unwrap();
        let err = ctx.transition_to(RunState::Attempting(2)).unwrap_err();
        assert_eq!(
            err,
            RunTransitionError::FromTerminalState {
                from: RunState::Success(1)
            }
        );
    }

    #[test]
    fn test_state_display() {
        assert_eq!(RunState::Attempting(2).to_string(), "login attempt 2");
        assert_eq!(RunState::OutOfAttempts(3).to_string(), "failed after 3 attempts");
    }
}
