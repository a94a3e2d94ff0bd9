//! Jira integration for git-precommit
//!
//! After a precommit build has been started, a comment is added to the
//! issue named in the branch through the Jira REST API (v2):
//!
//! - `GET {base}/rest/api/2/issue/{key}` checks the credentials
//! - `PUT {base}/rest/api/2/issue/{key}` adds the comment
//!
//! The Jira password is kept in the secret store under [`SECRET_KEY`].

use chrono::{DateTime, Local};
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::Serialize;
use tracing::debug;

use crate::error::Result;
use crate::http;
use crate::jenkins::{BuildParameters, COMMIT_PARAM};
use crate::secrets::SecretResolver;
use crate::ui;

/// Secret store key of the Jira password
pub const SECRET_KEY: &str = "jirarestapi";

#[derive(Serialize, Debug)]
pub struct IssueUpdate {
    update: Update,
}

#[derive(Serialize, Debug)]
struct Update {
    comment: Vec<CommentOperation>,
}

#[derive(Serialize, Debug)]
struct CommentOperation {
    add: NewComment,
}

#[derive(Serialize, Debug)]
struct NewComment {
    body: String,
}

impl IssueUpdate {
    /// An update adding a single comment
    pub fn add_comment(body: impl Into<String>) -> Self {
        Self {
            update: Update {
                comment: vec![CommentOperation {
                    add: NewComment { body: body.into() },
                }],
            },
        }
    }
}

/// Comment announcing a precommit build of `branch`
pub fn comment_body(now: DateTime<Local>, branch: &str) -> String {
    format!(
        "Started Precommit Job\nStart time: *{}*\nBranch: *{}*",
        now.format("%Y-%m-%d %H:%M:%S"),
        branch
    )
}

/// REST resource of an issue
pub fn issue_url(base_url: &str, issue_id: &str) -> String {
    format!("{}/rest/api/2/issue/{}", base_url.trim_end_matches('/'), issue_id)
}

/// Comment on `issue_id` that a precommit build was started
///
/// Returns whether the comment was added. A rejected update is reported
/// but not an error; connection and credential errors are.
pub fn comment(
    client: &Client,
    resolver: &mut SecretResolver,
    params: &BuildParameters,
    base_url: &str,
    username: &str,
    issue_id: &str,
) -> Result<bool> {
    let url = issue_url(base_url, issue_id);

    let mut password = resolver.resolve(SECRET_KEY, false)?;
    let status = client
        .get(&url)
        .basic_auth(username, Some(&password))
        .send()?
        .status();
    debug!(%status, "jira issue fetched");

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        ui::warn(format!("Jira rejected the stored credentials ({})", status));
        password = resolver.resolve(SECRET_KEY, true)?;
    }

    // The response is discarded; only the PUT below decides the outcome.
    let status = client
        .get(&url)
        .basic_auth(username, Some(&password))
        .send()?
        .status();
    debug!(%status, "jira issue fetched again");

    let branch = params.get(COMMIT_PARAM).unwrap_or_default();
    let update = IssueUpdate::add_comment(comment_body(Local::now(), branch));

    let response = client
        .put(&url)
        .basic_auth(username, Some(&password))
        .json(&update)
        .send()?;

    let status = response.status().as_u16();
    if !http::is_success(status) {
        let body = http::response_text(response);
        ui::failure(format!("Error on updating issue {}: {}", issue_id, body));
        return Ok(false);
    }

    ui::success(format!("Comment added on issue {}", issue_id));
    Ok(true)
}
