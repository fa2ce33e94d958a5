//! Connectivity probing.
//!
//! Endpoints are tried in order and the first conclusive answer wins. When no
//! endpoint answers at all the network is reported as intercepted with an
//! unknown portal, so "no network at all" reads the same as "portal present".

use crate::config_file::{ProbeEndpoint, ProbeExpectation};
use crate::error::TransportError;
use crate::http::{HttpResponse, HttpSession, Redirects};
use crate::types::ProbeResult;
use tracing::{debug, info, warn};
use url::Url;

/// Body markers of a login page served in place of the probe response.
const LOGIN_PAGE_MARKERS: &[&str] = &["login", "<form"];

/// Decides whether traffic is being intercepted.
pub struct Prober<'a> {
    session: &'a dyn HttpSession,
    endpoints: &'a [ProbeEndpoint],
}

impl<'a> Prober<'a> {
    pub fn new(session: &'a dyn HttpSession, endpoints: &'a [ProbeEndpoint]) -> Self {
        Self { session, endpoints }
    }

    /// Run one probe cycle.
    pub fn probe(&self) -> ProbeResult {
        for endpoint in self.endpoints {
            match self.probe_endpoint(endpoint) {
                Ok(Some(result)) => {
                    info!("Probe of {}: {}", endpoint.url, result);
                    return result;
                }
                Ok(None) => {
                    debug!("Probe of {} inconclusive, trying next endpoint", endpoint.url);
                }
                Err(e) => {
                    warn!("Connectivity check error on {}: {}", endpoint.url, e);
                }
            }
        }

        warn!("No probe endpoint gave a conclusive answer; assuming a captive portal");
        ProbeResult::intercepted(None)
    }

    /// `Ok(None)` means the endpoint answered but proved nothing.
    fn probe_endpoint(&self, endpoint: &ProbeEndpoint) -> Result<Option<ProbeResult>, TransportError> {
        let first = self.session.get(&endpoint.url, Redirects::Manual)?;

        if answers_directly(&endpoint.expect, &first) {
            return Ok(Some(ProbeResult::direct()));
        }

        if let Some(location) = redirect_target(&first) {
            return Ok(Some(ProbeResult::intercepted(Some(resolve_location(
                &endpoint.url,
                location,
            )))));
        }

        let followed = self.session.get(&endpoint.url, Redirects::Follow)?;
        if !same_url(&followed.url, &endpoint.url) {
            return Ok(Some(ProbeResult::intercepted(Some(followed.url))));
        }

        if looks_like_login_page(&first.body) {
            return Ok(Some(ProbeResult::intercepted(Some(first.url))));
        }

        Ok(None)
    }
}

/// True when `response` is what the endpoint sends on an open network.
///
/// A body marker only counts on a plain 2xx page: a redirect or anything that
/// looks like a login page is interception even when the marker appears.
fn answers_directly(expect: &ProbeExpectation, response: &HttpResponse) -> bool {
    if response.status == 204 {
        return true;
    }
    match expect {
        ProbeExpectation::NoContent => false,
        ProbeExpectation::Body(marker) => {
            response.is_success()
                && redirect_target(response).is_none()
                && response.body.contains(marker.as_str())
                && !looks_like_login_page(&response.body)
        }
    }
}

/// Non-blank `Location` header.
fn redirect_target(response: &HttpResponse) -> Option<&str> {
    response
        .location
        .as_deref()
        .map(str::trim)
        .filter(|l| !l.is_empty())
}

/// Case-insensitive check for login page markers.
pub fn looks_like_login_page(body: &str) -> bool {
    let lower = body.to_lowercase();
    LOGIN_PAGE_MARKERS.iter().any(|m| lower.contains(m))
}

/// Absolute targets are returned verbatim; relative ones are joined to `base`.
fn resolve_location(base: &str, location: &str) -> String {
    if Url::parse(location).is_ok() {
        return location.to_string();
    }
    Url::parse(base)
        .and_then(|b| b.join(location))
        .map(|u| u.to_string())
        .unwrap_or_else(|_| location.to_string())
}

/// URL equality after normalisation (`http://host` equals `http://host/`).
fn same_url(a: &str, b: &str) -> bool {
    match (Url::parse(a), Url::parse(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}
