//! Shared data model for the probe → discover → submit pipeline
//!
//! Every value here lives for a single run; nothing is persisted.

use std::collections::BTreeMap;
use std::fmt;
use strum::{Display, EnumString};

/// Input field name → value for one form. Sorted so discovery output is
/// reproducible.
pub type FormFields = BTreeMap<String, String>;

/// Result of one probe cycle.
///
/// The portal URL is only ever present when interception was detected; the
/// constructors are the only way to build a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResult {
    intercepted: bool,
    portal_url: Option<String>,
}

impl ProbeResult {
    /// Traffic reaches the internet directly.
    pub fn direct() -> Self {
        Self {
            intercepted: false,
            portal_url: None,
        }
    }

    /// Traffic is intercepted; `portal_url` is the best guess at the portal entry page.
    pub fn intercepted(portal_url: Option<String>) -> Self {
        Self {
            intercepted: true,
            portal_url,
        }
    }

    pub fn is_intercepted(&self) -> bool {
        self.intercepted
    }

    pub fn portal_url(&self) -> Option<&str> {
        self.portal_url.as_deref()
    }
}

impl fmt::Display for ProbeResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.intercepted, &self.portal_url) {
            (false, _) => write!(f, "direct"),
            (true, Some(url)) => write!(f, "intercepted (portal: {})", url),
            (true, None) => write!(f, "intercepted (portal unknown)"),
        }
    }
}

/// The first login form found on a portal page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoginForm {
    /// `action` attribute exactly as found in markup, unresolved.
    pub action: Option<String>,
    pub fields: FormFields,
}

impl LoginForm {
    /// True when the page had no form at all.
    pub fn is_empty(&self) -> bool {
        self.action.is_none() && self.fields.is_empty()
    }
}

/// Username and password read from the secret store.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Username with everything after the first two characters masked.
    pub fn masked_username(&self) -> String {
        let visible: String = self.username.chars().take(2).collect();
        let hidden = self.username.chars().count().saturating_sub(2);
        format!("{}{}", visible, "*".repeat(hidden))
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.masked_username())
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Outcome of one login submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum LoginAttemptOutcome {
    Success,
    Failed,
    TransportError,
}

impl LoginAttemptOutcome {
    pub fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }
}

/// One submit attempt with the diagnostics gathered along the way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginAttempt {
    pub outcome: LoginAttemptOutcome,
    /// Where the payload was posted, when the attempt got that far.
    pub action_url: Option<String>,
    /// Status of the POST response, absent on transport failure.
    pub status: Option<u16>,
    /// Truncated response body kept for failed attempts.
    pub snippet: Option<String>,
}

impl LoginAttempt {
    pub fn new(outcome: LoginAttemptOutcome) -> Self {
        Self {
            outcome,
            action_url: None,
            status: None,
            snippet: None,
        }
    }
}

/// Process exit status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[repr(u8)]
pub enum ExitStatus {
    /// Already connected, or login succeeded
    #[strum(serialize = "connected")]
    Connected = 0,
    /// Login attempted but every attempt failed
    #[strum(serialize = "login failed")]
    LoginFailed = 1,
    /// Credentials or configuration unavailable
    #[strum(serialize = "configuration error")]
    ConfigurationError = 2,
}

impl ExitStatus {
    #[inline]
    pub const fn code(self) -> i32 {
        self as i32
    }
}
