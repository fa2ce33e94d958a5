//! Login submission and success verification.
//!
//! One call to [`Submitter::submit`] is one attempt: fetch the portal page,
//! discover its form, POST the payload, then decide from the response body or
//! a fresh probe whether the portal let us through.

use crate::config_file::ProbeEndpoint;
use crate::form::discover_form;
use crate::http::{HttpSession, Redirects};
use crate::probe::Prober;
use crate::types::{Credentials, LoginAttempt, LoginAttemptOutcome, LoginForm};
use tracing::{debug, info, warn};
use url::Url;

/// Longest response body excerpt kept for a failed attempt, in characters.
pub const SNIPPET_CHARS: usize = 1000;

pub struct Submitter<'a> {
    session: &'a dyn HttpSession,
    prober: Prober<'a>,
    bootstrap_url: Option<&'a str>,
    success_markers: Vec<String>,
}

impl<'a> Submitter<'a> {
    pub fn new(
        session: &'a dyn HttpSession,
        endpoints: &'a [ProbeEndpoint],
        success_markers: &[String],
    ) -> Self {
        Self {
            session,
            prober: Prober::new(session, endpoints),
            bootstrap_url: endpoints.first().map(|e| e.url.as_str()),
            success_markers: success_markers.iter().map(|m| m.to_lowercase()).collect(),
        }
    }

    /// Run one login attempt against the portal at `portal_hint` (if known).
    pub fn submit(&self, credentials: &Credentials, portal_hint: Option<&str>) -> LoginAttempt {
        let Some(page_url) = portal_hint.or(self.bootstrap_url) else {
            warn!("No portal URL known and no probe endpoint to bootstrap from");
            return LoginAttempt::new(LoginAttemptOutcome::Failed);
        };

        let (referer, form) = self.fetch_form(page_url, credentials);
        if form.is_empty() {
            debug!("No login form discovered; posting fallback payload");
        }

        let Some(action_url) = resolve_action(
            form.action.as_deref(),
            referer.as_deref(),
            portal_hint,
            self.bootstrap_url,
        ) else {
            warn!("Could not determine where to submit the login form");
            return LoginAttempt::new(LoginAttemptOutcome::Failed);
        };

        let mut attempt = LoginAttempt::new(LoginAttemptOutcome::Failed);
        attempt.action_url = Some(action_url.clone());

        let response = match self
            .session
            .post_form(&action_url, &form.fields, referer.as_deref())
        {
            Ok(response) => response,
            Err(e) => {
                warn!("POST login failed: {}", e);
                attempt.outcome = LoginAttemptOutcome::TransportError;
                return attempt;
            }
        };
        attempt.status = Some(response.status);

        if self.has_success_marker(&response.body) {
            info!("Login success (hint matched) to {}", action_url);
            attempt.outcome = LoginAttemptOutcome::Success;
            return attempt;
        }

        if !self.prober.probe().is_intercepted() {
            info!("Login success (no captive portal detected after POST)");
            attempt.outcome = LoginAttemptOutcome::Success;
            return attempt;
        }

        warn!(
            "Login probably failed. status={} url={}",
            response.status, response.url
        );
        let snippet = truncate_chars(&response.body, SNIPPET_CHARS);
        debug!("Resp snippet: {}", snippet);
        attempt.snippet = Some(snippet);
        attempt
    }

    /// GET the portal page. Returns the referer (final URL) and discovered form;
    /// any failure yields no referer and an empty form.
    fn fetch_form(&self, page_url: &str, credentials: &Credentials) -> (Option<String>, LoginForm) {
        match self.session.get(page_url, Redirects::Follow) {
            Ok(page) if page.is_success() => {
                let form = discover_form(&page.body, &credentials.username, &credentials.password);
                debug!(
                    "Portal page {} has form action {:?} with {} field(s)",
                    page.url,
                    form.action,
                    form.fields.len()
                );
                (Some(page.url), form)
            }
            Ok(page) => {
                warn!("GET portal page {} returned status {}", page.url, page.status);
                (None, LoginForm::default())
            }
            Err(e) => {
                warn!("GET portal page fail: {}", e);
                (None, LoginForm::default())
            }
        }
    }

    fn has_success_marker(&self, body: &str) -> bool {
        let lower = body.to_lowercase();
        self.success_markers.iter().any(|m| lower.contains(m.as_str()))
    }
}

/// Pick the submission URL: the action resolved against the referer, then the
/// referer itself, then the portal hint, then the bootstrap endpoint.
pub fn resolve_action(
    action: Option<&str>,
    referer: Option<&str>,
    portal_hint: Option<&str>,
    bootstrap: Option<&str>,
) -> Option<String> {
    let resolved = match (action, referer) {
        (Some(action), Some(referer)) => Url::parse(referer)
            .and_then(|base| base.join(action))
            .map(|u| u.to_string())
            .ok(),
        (Some(action), None) => Url::parse(action).ok().map(|u| u.to_string()),
        _ => None,
    };

    resolved
        .or_else(|| referer.map(str::to_string))
        .or_else(|| portal_hint.map(str::to_string))
        .or_else(|| bootstrap.map(str::to_string))
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}
