//! Scripted fakes for the injected capabilities (HTTP session, secret store, sleeper).

#![allow(dead_code)]

use portal_autologin::{
    FormFields, HttpResponse, HttpSession, Redirects, SecretStore, Sleeper, TransportError,
    TransportErrorKind,
};
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;

pub type Reply = Result<HttpResponse, TransportError>;

/// One request seen by the fake session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recorded {
    pub method: &'static str,
    pub url: String,
    pub redirects: Option<Redirects>,
    pub fields: Option<FormFields>,
    pub referer: Option<String>,
}

/// Replies are consumed in order; the last one keeps answering.
/// Unscripted URLs fail with a connect error.
#[derive(Default)]
pub struct FakeSession {
    gets: RefCell<HashMap<(String, Redirects), VecDeque<Reply>>>,
    posts: RefCell<HashMap<String, VecDeque<Reply>>>,
    log: RefCell<Vec<Recorded>>,
}

impl FakeSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_get(self, url: &str, redirects: Redirects, reply: Reply) -> Self {
        self.gets
            .borrow_mut()
            .entry((url.to_string(), redirects))
            .or_default()
            .push_back(reply);
        self
    }

    pub fn on_post(self, url: &str, reply: Reply) -> Self {
        self.posts
            .borrow_mut()
            .entry(url.to_string())
            .or_default()
            .push_back(reply);
        self
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.log.borrow().clone()
    }

    pub fn posts(&self) -> Vec<Recorded> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == "POST")
            .collect()
    }

    fn next(queue: Option<&mut VecDeque<Reply>>, url: &str) -> Reply {
        match queue {
            Some(q) if q.len() > 1 => q.pop_front().unwrap(),
            Some(q) if !q.is_empty() => q.front().unwrap().clone(),
            _ => Err(transport_error(url)),
        }
    }
}

impl HttpSession for FakeSession {
    fn get(&self, url: &str, redirects: Redirects) -> Reply {
        self.log.borrow_mut().push(Recorded {
            method: "GET",
            url: url.to_string(),
            redirects: Some(redirects),
            fields: None,
            referer: None,
        });
        let mut gets = self.gets.borrow_mut();
        Self::next(gets.get_mut(&(url.to_string(), redirects)), url)
    }

    fn post_form(&self, url: &str, fields: &FormFields, referer: Option<&str>) -> Reply {
        self.log.borrow_mut().push(Recorded {
            method: "POST",
            url: url.to_string(),
            redirects: None,
            fields: Some(fields.clone()),
            referer: referer.map(str::to_string),
        });
        let mut posts = self.posts.borrow_mut();
        Self::next(posts.get_mut(url), url)
    }
}

pub fn transport_error(url: &str) -> TransportError {
    TransportError::new(url, TransportErrorKind::Connect, "connection refused")
}

pub fn status(code: u16, url: &str) -> Reply {
    Ok(HttpResponse {
        status: code,
        url: url.to_string(),
        location: None,
        body: String::new(),
    })
}

pub fn redirect(url: &str, location: &str) -> Reply {
    Ok(HttpResponse {
        status: 302,
        url: url.to_string(),
        location: Some(location.to_string()),
        body: String::new(),
    })
}

pub fn page(code: u16, url: &str, body: &str) -> Reply {
    Ok(HttpResponse {
        status: code,
        url: url.to_string(),
        location: None,
        body: body.to_string(),
    })
}

/// Secret store backed by a fixed map.
#[derive(Default)]
pub struct FakeStore {
    secrets: HashMap<String, String>,
}

impl FakeStore {
    pub fn with(mut self, service: &str, secret: &str) -> Self {
        self.secrets.insert(service.to_string(), secret.to_string());
        self
    }

    pub fn campus(username: &str, password: &str) -> Self {
        Self::default()
            .with("campus_net_user", username)
            .with("campus_net_pass", password)
    }
}

impl SecretStore for FakeStore {
    fn lookup(&self, service: &str) -> Option<String> {
        self.secrets.get(service).cloned()
    }
}

/// Records requested pauses instead of sleeping.
#[derive(Default)]
pub struct RecordingSleeper {
    pub slept: RefCell<Vec<Duration>>,
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) {
        self.slept.borrow_mut().push(duration);
    }
}
