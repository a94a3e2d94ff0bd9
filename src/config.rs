//! Configuration loading for git-precommit
//!
//! The configuration is an INI file, by default `mergeissue.conf` next to
//! the installation directory:
//!
//! ```ini
//! [project]
//! jenkins.url = https://jenkins.example.com
//! jenkins.job = precommit
//! jira.url.api = https://jira.example.com
//! ```

use std::collections::HashMap;
use std::fmt::Display;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Error, Result};

/// The file name looked up when `--config` is not given
pub const DEFAULT_CONFIG_FILE: &str = "mergeissue.conf";

/// Section holding fallback values for every other section
const DEFAULT_SECTION: &str = "DEFAULT";

pub const PROJECT_SECTION: &str = "project";
pub const JENKINS_URL: &str = "jenkins.url";
pub const JENKINS_JOB: &str = "jenkins.job";
pub const JIRA_URL_API: &str = "jira.url.api";
pub const TLS_INSECURE: &str = "tls.insecure";

pub type Section = HashMap<String, String>;

/// Parsed INI file: section name -> key -> value
///
/// Keys are case-insensitive, section names are not.
#[derive(Debug, Default, Clone)]
pub struct Config {
    defaults: Section,
    sections: HashMap<String, Section>,
}

impl Config {
    /// Load a configuration file
    ///
    /// Missing and unreadable files, and directories, yield an empty
    /// configuration. Other I/O errors are returned.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if path.is_dir() {
            debug!(path = %path.display(), "config path is a directory, skipped");
            return Ok(Self::default());
        }

        match std::fs::read_to_string(path) {
            Ok(contents) => Self::parse(&contents),
            Err(err)
                if matches!(
                    err.kind(),
                    ErrorKind::NotFound | ErrorKind::PermissionDenied
                ) =>
            {
                debug!(path = %path.display(), %err, "config file skipped");
                Ok(Self::default())
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Parse INI text
    pub fn parse(contents: &str) -> Result<Self> {
        let mut config = Self::default();
        let mut current: Option<String> = None;
        let mut last_key: Option<String> = None;

        for (number, raw) in contents.lines().enumerate() {
            let line = raw.trim();

            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }

            // Indented lines continue the previous value
            if raw.starts_with([' ', '\t']) {
                if let (Some(section), Some(key)) = (&current, &last_key) {
                    if let Some(value) = config.section_mut(section).get_mut(key) {
                        value.push('\n');
                        value.push_str(line);
                        continue;
                    }
                }
            }

            if line.starts_with('[') && line.ends_with(']') {
                let name = line[1..line.len() - 1].trim().to_string();
                config.section_mut(&name);
                current = Some(name);
                last_key = None;
                continue;
            }

            let section = current.clone().ok_or_else(|| {
                Error::Config(format!(
                    "line {}: entry outside of any section: {}",
                    number + 1,
                    line
                ))
            })?;

            let (key, value) = split_entry(line).ok_or_else(|| {
                Error::Config(format!("line {}: expected key = value: {}", number + 1, line))
            })?;

            config.section_mut(&section).insert(key.clone(), value);
            last_key = Some(key);
        }

        Ok(config)
    }

    fn section_mut(&mut self, name: &str) -> &mut Section {
        if name == DEFAULT_SECTION {
            &mut self.defaults
        } else {
            self.sections.entry(name.to_string()).or_default()
        }
    }

    pub fn has_section(&self, name: &str) -> bool {
        self.sections.contains_key(name)
    }

    /// Look up `key` in `section`, falling back to `[DEFAULT]`
    ///
    /// Returns `None` when either the section or the key is absent.
    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        let values = self.sections.get(section)?;
        let key = key.to_lowercase();
        values
            .get(&key)
            .or_else(|| self.defaults.get(&key))
            .map(String::as_str)
    }

    /// Like [`Config::get`] but treats an empty value as absent
    pub fn get_non_empty(&self, section: &str, key: &str) -> Option<&str> {
        self.get(section, key).filter(|value| !value.is_empty())
    }
}

fn split_entry(line: &str) -> Option<(String, String)> {
    let at = line.find(['=', ':'])?;
    let key = line[..at].trim();
    if key.is_empty() {
        return None;
    }
    Some((key.to_lowercase(), line[at + 1..].trim().to_string()))
}

/// The validated `[project]` section
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectConfig {
    pub jenkins_url: String,
    pub jenkins_job: String,
    pub jira_url_api: Option<String>,
    pub tls_insecure: bool,
}

impl ProjectConfig {
    /// Validate the keys required to trigger a build
    ///
    /// `path` is only used for diagnostics.
    pub fn from_config(config: &Config, path: impl Display) -> Result<Self> {
        if !config.has_section(PROJECT_SECTION) {
            return Err(Error::Config(format!(
                "config file malformed, no '{}' section found at {}",
                PROJECT_SECTION, path
            )));
        }

        let required = |key: &str| -> Result<String> {
            config
                .get_non_empty(PROJECT_SECTION, key)
                .map(str::to_string)
                .ok_or_else(|| Error::Config(format!("{} not defined in {}", key, path)))
        };

        let jenkins_url = required(JENKINS_URL)?;
        let jenkins_job = required(JENKINS_JOB)?;

        let tls_insecure = match config.get_non_empty(PROJECT_SECTION, TLS_INSECURE) {
            None => false,
            Some(value) => parse_bool(value).ok_or_else(|| {
                Error::Config(format!(
                    "{} must be a boolean in {}, got {:?}",
                    TLS_INSECURE, path, value
                ))
            })?,
        };

        Ok(Self {
            jenkins_url,
            jenkins_job,
            jira_url_api: config
                .get_non_empty(PROJECT_SECTION, JIRA_URL_API)
                .map(str::to_string),
            tls_insecure,
        })
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "1" | "yes" | "true" | "on" => Some(true),
        "0" | "no" | "false" | "off" => Some(false),
        _ => None,
    }
}

/// Default configuration path: `<dir of executable>/../mergeissue.conf`
pub fn default_config_path() -> Result<PathBuf> {
    let exe = std::env::current_exe()?;
    let dir = exe
        .parent()
        .ok_or_else(|| Error::Config(format!("cannot locate directory of {}", exe.display())))?;
    Ok(dir.join("..").join(DEFAULT_CONFIG_FILE))
}
