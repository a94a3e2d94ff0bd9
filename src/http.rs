use reqwest::blocking::{Client, Response};
use tracing::{debug, warn};

use crate::error::Result;

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Build the HTTP client shared by the Jenkins and Jira calls
///
/// Certificate verification stays on unless `insecure` is set.
pub fn client(insecure: bool) -> Result<Client> {
    if insecure {
        warn!("TLS certificate verification is disabled");
    }

    let client = Client::builder()
        .user_agent(USER_AGENT)
        .danger_accept_invalid_certs(insecure)
        .build()?;

    Ok(client)
}

/// Whether an HTTP status code counts as success: `[200, 300)`
pub fn is_success(status: u16) -> bool {
    (200..300).contains(&status)
}

/// Body of a failed response, for diagnostics
///
/// A body that cannot be read is logged and reported as empty.
pub fn response_text(response: Response) -> String {
    let status = response.status();
    match response.text() {
        Ok(body) => body,
        Err(err) => {
            debug!(%status, %err, "could not read response body");
            String::new()
        }
    }
}
