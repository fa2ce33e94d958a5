//! portal-autologin Library
//!
//! Captive portal detection and automatic login: connectivity probing, login
//! form discovery, submission with success verification, and bounded retry.

pub mod cli;
pub mod config_file;
pub mod controller;
pub mod error;
pub mod form;
pub mod http;
pub mod logging;
pub mod login;
pub mod probe;
pub mod secrets;
pub mod types;

// Re-export main types for convenience
pub use config_file::{AutologinConfig, ProbeEndpoint, ProbeExpectation, SecretBackendKind};
pub use controller::{Controller, RunContext, RunReport, RunState, RunTransitionError, Sleeper};
pub use error::{AutologinError, TransportError, TransportErrorKind};
pub use form::discover_form;
pub use http::{HttpResponse, HttpSession, Redirects, ReqwestSession};
pub use login::Submitter;
pub use probe::Prober;
pub use secrets::{SecretStore, load_credentials};
pub use types::{
    Credentials, ExitStatus, FormFields, LoginAttempt, LoginAttemptOutcome, LoginForm, ProbeResult,
};
