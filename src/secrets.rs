//! Credential lookup backed by the OS secret store
//!
//! A [`SecretResolver`] first asks the secret store (when one is available)
//! and otherwise falls back to prompting on the terminal. Values entered
//! while a store is available are written back so the next run finds them.

use std::path::PathBuf;

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::shell;
use crate::ui;

const SECRET_TOOL: &str = "secret-tool";

/// Storage of named secrets for a local user
pub trait SecretStore {
    /// Returns `Ok(None)` when nothing is stored under `key`.
    fn lookup(&self, user: &str, key: &str) -> Result<Option<String>>;

    fn store(&self, user: &str, key: &str, secret: &str) -> Result<()>;
}

/// Source of interactively entered secrets
pub trait Prompter {
    fn secret(&mut self, message: &str) -> Result<String>;
}

/// The libsecret command line client
///
/// Secrets are kept under the attribute `<user>` with value `<key>`, the
/// layout earlier `secret-tool` based scripts wrote. The CLI is driven
/// instead of a keyring library so those entries keep resolving.
#[derive(Debug, Clone)]
pub struct SecretTool {
    program: PathBuf,
}

impl Default for SecretTool {
    fn default() -> Self {
        Self::new(SECRET_TOOL)
    }
}

impl SecretTool {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Whether the program can be executed on this host
    pub fn available(&self) -> bool {
        let probe = format!("command -v '{}'", self.program.display());
        shell::call("sh", &["-c", &probe], true)
    }
}

impl SecretStore for SecretTool {
    fn lookup(&self, user: &str, key: &str) -> Result<Option<String>> {
        // secret-tool exits with 1 when nothing matches
        let secret = match shell::run(&self.program, &["lookup", user, key]) {
            Ok(secret) => secret,
            Err(Error::Command(msg)) => {
                debug!(key, %msg, "secret-tool lookup found nothing");
                return Ok(None);
            }
            Err(err) => return Err(err),
        };
        let secret = secret.trim_end_matches(['\r', '\n']);
        if secret.is_empty() {
            Ok(None)
        } else {
            Ok(Some(secret.to_string()))
        }
    }

    fn store(&self, user: &str, key: &str, secret: &str) -> Result<()> {
        let label = format!("--label={}", key);
        shell::run_with_input(&self.program, &["store", &label, user, key], secret)?;
        Ok(())
    }
}

/// Prompts on the controlling terminal without echo
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn secret(&mut self, message: &str) -> Result<String> {
        ui::prompt_secret(message)
    }
}

/// Where credentials come from on this host
pub enum CredentialProvider {
    OsSecretStore(Box<dyn SecretStore>),
    InteractiveOnly,
}

impl CredentialProvider {
    /// Probe the host for a usable secret store
    pub fn detect() -> Self {
        let tool = SecretTool::default();
        if tool.available() {
            debug!("using secret-tool as credential store");
            CredentialProvider::OsSecretStore(Box::new(tool))
        } else {
            debug!("no secret store found, credentials will be prompted for");
            CredentialProvider::InteractiveOnly
        }
    }
}

pub struct SecretResolver {
    provider: CredentialProvider,
    prompter: Box<dyn Prompter>,
    local_user: String,
}

impl SecretResolver {
    pub fn new(
        provider: CredentialProvider,
        prompter: Box<dyn Prompter>,
        local_user: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            prompter,
            local_user: local_user.into(),
        }
    }

    /// Resolver for the current host: detected store, terminal prompts
    pub fn detect(local_user: impl Into<String>) -> Self {
        Self::new(
            CredentialProvider::detect(),
            Box::new(TerminalPrompter),
            local_user,
        )
    }

    /// Resolve the secret stored under `key`
    ///
    /// With `force` the stored value is ignored and a new one is asked for
    /// and written back. Lookup failures count as "not found"; failures to
    /// store or read back the new value are returned, as is a store
    /// access without a known local user.
    pub fn resolve(&mut self, key: &str, force: bool) -> Result<String> {
        let store = match &self.provider {
            CredentialProvider::OsSecretStore(store) => store,
            CredentialProvider::InteractiveOnly => {
                return prompt_non_empty(self.prompter.as_mut(), key);
            }
        };

        if self.local_user.is_empty() {
            return Err(Error::Secret(format!(
                "cannot look up '{}': the local user is unknown (USER is not set)",
                key
            )));
        }

        if !force {
            match store.lookup(&self.local_user, key) {
                Ok(Some(secret)) => return Ok(secret),
                Ok(None) => debug!(key, "no stored secret"),
                Err(err) => warn!(key, %err, "secret lookup failed"),
            }
        }

        let secret = prompt_non_empty(self.prompter.as_mut(), key)?;
        store.store(&self.local_user, key, &secret)?;

        store
            .lookup(&self.local_user, key)?
            .ok_or_else(|| Error::Secret(format!("'{}' could not be read back after storing", key)))
    }
}

fn prompt_non_empty(prompter: &mut dyn Prompter, key: &str) -> Result<String> {
    let message = format!("Password for {}?:", key);
    loop {
        let secret = prompter.secret(&message)?;
        if !secret.is_empty() {
            return Ok(secret);
        }
        ui::warn("Cannot be empty");
    }
}
