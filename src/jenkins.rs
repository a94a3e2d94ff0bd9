//! Jenkins "build with parameters" trigger

use reqwest::blocking::Client;
use tracing::debug;
use url::Url;

use crate::error::Result;
use crate::http;
use crate::ui;

/// Secret store key of the Jenkins API token
pub const TOKEN_KEY: &str = "jenkinsdevtoken";

/// Build parameter carrying the branch to build
pub const COMMIT_PARAM: &str = "JK_GITCOMMITID";
/// Build parameter carrying the Jira issue key
pub const ISSUE_PARAM: &str = "JIRA_ISSUE";

/// Ordered build parameters, sent as the query string
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BuildParameters {
    entries: Vec<(String, String)>,
}

impl BuildParameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parameters for a precommit build of `branch`
    pub fn precommit(branch: &str, issue: &str) -> Self {
        Self::new()
            .with(COMMIT_PARAM, branch)
            .with(ISSUE_PARAM, issue)
    }

    /// Set a parameter; an existing name keeps its position
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }
}

/// Result of a build trigger
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildOutcome {
    Started,
    Failed { status: u16, body: String },
}

impl BuildOutcome {
    /// Process exit status for this outcome
    pub fn exit_code(&self) -> i32 {
        match self {
            BuildOutcome::Started => 0,
            BuildOutcome::Failed { .. } => 1,
        }
    }
}

/// A parameterized Jenkins job
#[derive(Debug, Clone)]
pub struct Job {
    pub server: String,
    pub name: String,
}

impl Job {
    pub fn new(server: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            server: server.into(),
            name: name.into(),
        }
    }

    /// `{server}/job/{name}`
    pub fn url(&self) -> String {
        format!("{}/job/{}", self.server.trim_end_matches('/'), self.name)
    }

    /// `{server}/job/{name}/buildWithParameters?{params}`
    pub fn build_url(&self, params: &BuildParameters) -> Result<Url> {
        let base = format!("{}/buildWithParameters", self.url());
        Ok(Url::parse_with_params(&base, params.iter())?)
    }

    /// Trigger a build
    ///
    /// Connection errors are returned as errors; any response outside
    /// `[200, 300)` is reported and yields [`BuildOutcome::Failed`].
    pub fn launch(
        &self,
        client: &Client,
        params: &BuildParameters,
        username: &str,
        token: &str,
    ) -> Result<BuildOutcome> {
        let url = self.build_url(params)?;
        ui::step("Send POST HTTP Request to", &url);

        let response = client
            .post(url)
            .basic_auth(username, Some(token))
            .send()?;

        let status = response.status().as_u16();
        debug!(status, "jenkins responded");

        if !http::is_success(status) {
            let body = http::response_text(response);
            ui::failure(format!("ERROR ON REQUEST: CODE: {}", status));
            println!("{}", body);
            return Ok(BuildOutcome::Failed { status, body });
        }

        ui::success(format!("Build started correctly. {}", self.url()));
        Ok(BuildOutcome::Started)
    }
}
