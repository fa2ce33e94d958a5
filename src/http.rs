//! HTTP session capability used by the prober and the submitter.
//!
//! The core only talks to the `HttpSession` trait. `ReqwestSession` is the
//! real implementation; tests script a fake one.

use crate::error::{TransportError, TransportErrorKind};
use crate::types::FormFields;
use reqwest::blocking::{Client, Response};
use reqwest::header::{LOCATION, REFERER};
use reqwest::redirect::Policy;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Whether a request follows redirects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Redirects {
    Follow,
    Manual,
}

/// A fully read HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    /// Final URL after any followed redirects.
    pub url: String,
    /// `Location` header, when present.
    pub location: Option<String>,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The network session shared by one run.
pub trait HttpSession {
    /// GET `url`.
    fn get(&self, url: &str, redirects: Redirects) -> Result<HttpResponse, TransportError>;

    /// POST `fields` form-encoded to `url`, following redirects.
    fn post_form(
        &self,
        url: &str,
        fields: &FormFields,
        referer: Option<&str>,
    ) -> Result<HttpResponse, TransportError>;
}

/// Blocking reqwest session with one cookie jar for every request of a run.
pub struct ReqwestSession {
    following: Client,
    manual: Client,
}

impl ReqwestSession {
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self, TransportError> {
        let jar = Arc::new(reqwest::cookie::Jar::default());
        let build = |policy: Policy| {
            Client::builder()
                .timeout(timeout)
                .user_agent(user_agent)
                .cookie_provider(Arc::clone(&jar))
                .redirect(policy)
                .build()
                .map_err(|e| TransportError::new("", TransportErrorKind::Other, e.to_string()))
        };

        Ok(Self {
            following: build(Policy::default())?,
            manual: build(Policy::none())?,
        })
    }

    fn client(&self, redirects: Redirects) -> &Client {
        match redirects {
            Redirects::Follow => &self.following,
            Redirects::Manual => &self.manual,
        }
    }
}

fn read_response(url: &str, response: Response) -> Result<HttpResponse, TransportError> {
    let status = response.status().as_u16();
    let final_url = response.url().to_string();
    let location = response
        .headers()
        .get(LOCATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body = response
        .text()
        .map_err(|e| TransportError::from_reqwest(url, &e))?;

    Ok(HttpResponse {
        status,
        url: final_url,
        location,
        body,
    })
}

impl HttpSession for ReqwestSession {
    fn get(&self, url: &str, redirects: Redirects) -> Result<HttpResponse, TransportError> {
        debug!("GET {} ({:?} redirects)", url, redirects);
        let response = self
            .client(redirects)
            .get(url)
            .send()
            .map_err(|e| TransportError::from_reqwest(url, &e))?;
        read_response(url, response)
    }

    fn post_form(
        &self,
        url: &str,
        fields: &FormFields,
        referer: Option<&str>,
    ) -> Result<HttpResponse, TransportError> {
        debug!("POST {} with {} field(s)", url, fields.len());
        let mut request = self.following.post(url).form(fields);
        if let Some(referer) = referer {
            request = request.header(REFERER, referer);
        }
        let response = request
            .send()
            .map_err(|e| TransportError::from_reqwest(url, &e))?;
        read_response(url, response)
    }
}
