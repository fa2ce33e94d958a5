//! Secret store lookup for the portal credentials.
//!
//! A store maps a service name to one secret string. Backends shell out to
//! the platform helper (`security` on macOS, `secret-tool` on freedesktop
//! systems) or read environment variables.

use crate::config_file::SecretBackendKind;
use crate::error::{AutologinError, Result};
use crate::types::Credentials;
use std::process::{Command, Stdio};
use tracing::{debug, error};

/// Lookup of a single secret by service name.
pub trait SecretStore {
    /// Returns `None` if the service has no stored secret.
    fn lookup(&self, service: &str) -> Option<String>;
}

/// macOS keychain via `security find-generic-password -s <service> -w`
#[derive(Debug, Default)]
pub struct KeychainStore;

impl SecretStore for KeychainStore {
    fn lookup(&self, service: &str) -> Option<String> {
        run_helper("security", &["find-generic-password", "-s", service, "-w"], service)
    }
}

/// Secret service via `secret-tool lookup service <service>`
#[derive(Debug, Default)]
pub struct SecretToolStore;

impl SecretStore for SecretToolStore {
    fn lookup(&self, service: &str) -> Option<String> {
        run_helper("secret-tool", &["lookup", "service", service], service)
    }
}

/// Environment variables: service `campus_net_user` reads `CAMPUS_NET_USER`.
#[derive(Debug, Default)]
pub struct EnvStore;

impl EnvStore {
    pub fn var_name(service: &str) -> String {
        service
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() {
                    c.to_ascii_uppercase()
                } else {
                    '_'
                }
            })
            .collect()
    }
}

impl SecretStore for EnvStore {
    fn lookup(&self, service: &str) -> Option<String> {
        std::env::var(Self::var_name(service))
            .ok()
            .filter(|v| !v.is_empty())
    }
}

/// Run a helper that prints the secret on stdout.
fn run_helper(program: &str, args: &[&str], service: &str) -> Option<String> {
    debug!("Looking up secret for service {} via {}", service, program);
    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .output();

    match output {
        Ok(output) if output.status.success() => {
            let secret = String::from_utf8_lossy(&output.stdout).trim().to_string();
            if secret.is_empty() { None } else { Some(secret) }
        }
        Ok(output) => {
            error!(
                "Secret store read failed: {} (exit code {:?})",
                service,
                output.status.code()
            );
            None
        }
        Err(e) => {
            error!("Secret store read failed: {} ({} unavailable: {})", service, program, e);
            None
        }
    }
}

/// Build the store selected in configuration.
pub fn store_for(kind: SecretBackendKind) -> Box<dyn SecretStore> {
    match kind {
        SecretBackendKind::Keychain => Box::new(KeychainStore),
        SecretBackendKind::SecretTool => Box::new(SecretToolStore),
        SecretBackendKind::Env => Box::new(EnvStore),
    }
}

/// Read both credentials. Either one missing is a configuration error.
pub fn load_credentials(
    store: &dyn SecretStore,
    username_service: &str,
    password_service: &str,
) -> Result<Credentials> {
    let username = store
        .lookup(username_service)
        .ok_or_else(|| AutologinError::missing_credentials(username_service))?;
    let password = store
        .lookup(password_service)
        .ok_or_else(|| AutologinError::missing_credentials(password_service))?;
    Ok(Credentials::new(username, password))
}
