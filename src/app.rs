use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::{debug, warn};

use crate::cli::Args;
use crate::config::{self, Config, ProjectConfig};
use crate::error::{Error, Result};
use crate::git;
use crate::http;
use crate::issue;
use crate::jenkins::{self, BuildOutcome, BuildParameters, Job};
use crate::jira;
use crate::secrets::SecretResolver;
use crate::shell;
use crate::ui;

/// Everything a run needs once the local context has been resolved
#[derive(Debug, Clone)]
pub struct Invocation {
    pub user: String,
    pub token: String,
    pub config_path: PathBuf,
    pub branch: String,
    pub extra_params: Vec<(String, String)>,
    pub insecure: bool,
    pub dry_run: bool,
    /// Ask before building a branch that names no issue
    pub confirm_missing_issue: bool,
}

/// Main application entry point
///
/// Returns the process exit status.
pub fn run(args: Args) -> Result<i32> {
    ui::init_render_config();
    run_in(Path::new("."), args)
}

/// Run against the repository containing `dir`
pub fn run_in(dir: &Path, args: Args) -> Result<i32> {
    let repo = git::open_repository(dir)?;
    match git::has_uncommitted_changes(&repo) {
        Ok(true) => ui::warn("Uncommitted changes are not part of the build"),
        Ok(false) => {}
        Err(err) => warn!(%err, "could not check the work tree for changes"),
    }

    let local_user = shell::local_username();
    let user = default_user(&local_user, args.user);
    let store_user = if local_user.is_empty() {
        user.clone()
    } else {
        local_user
    };
    let mut resolver = SecretResolver::detect(store_user);

    let token = match args.token {
        Some(token) => token,
        None => resolver.resolve(jenkins::TOKEN_KEY, false)?,
    };

    let config_path = match args.config {
        Some(path) => path,
        None => config::default_config_path()?,
    };

    let branch = match args.branch {
        Some(branch) => branch,
        None => git::current_branch(&repo)?,
    };

    let invocation = Invocation {
        user,
        token,
        config_path,
        branch,
        extra_params: args.params,
        insecure: args.insecure,
        dry_run: args.dry_run,
        confirm_missing_issue: std::io::stdin().is_terminal(),
    };

    execute(&invocation, &mut resolver)
}

/// `--user` wins, then the local user; the local user may be empty.
fn default_user(local_user: &str, given: Option<String>) -> String {
    match given {
        Some(user) if !user.is_empty() => user,
        _ => local_user.to_string(),
    }
}

/// Trigger the build and comment on the issue
///
/// Precondition failures are returned before any request is sent. The
/// exit status is the one of the build trigger; a failed comment does
/// not change it.
pub fn execute(invocation: &Invocation, resolver: &mut SecretResolver) -> Result<i32> {
    let branch = invocation.branch.as_str();
    ui::step("Branch", branch);

    let issue_ids = issue::extract(branch);
    let issue_id = issue::select(&issue_ids, branch);

    if issue_id.is_none()
        && invocation.confirm_missing_issue
        && !ui::ask_yes_no("Trigger the build without a JIRA issue?", true)?
    {
        return Err(Error::Cancelled);
    }

    let config_display = invocation.config_path.display();
    let config = Config::load(&invocation.config_path)?;
    let project = ProjectConfig::from_config(&config, &config_display)?;
    debug!(?project, "configuration loaded");

    let issue_id = issue_id.unwrap_or_default();
    if !issue_id.is_empty() {
        ui::step("JIRA Issue", &issue_id);
    }

    let mut params = BuildParameters::precommit(branch, &issue_id);
    for (name, value) in &invocation.extra_params {
        params.set(name.as_str(), value.as_str());
    }

    let job = Job::new(&project.jenkins_url, &project.jenkins_job);

    if invocation.dry_run {
        return dry_run(&job, &params, &project, &issue_id);
    }

    let client = http::client(invocation.insecure || project.tls_insecure)?;
    let outcome = job.launch(&client, &params, &invocation.user, &invocation.token)?;

    if outcome == BuildOutcome::Started {
        match (&project.jira_url_api, issue_id.is_empty()) {
            (None, _) => ui::warn(format!(
                "{} not defined in {}",
                config::JIRA_URL_API,
                config_display
            )),
            (Some(_), true) => ui::warn("No JIRA Issue to comment on"),
            (Some(jira_url), false) => {
                jira::comment(
                    &client,
                    resolver,
                    &params,
                    jira_url,
                    &invocation.user,
                    &issue_id,
                )?;
            }
        }
    }

    Ok(outcome.exit_code())
}

fn dry_run(
    job: &Job,
    params: &BuildParameters,
    project: &ProjectConfig,
    issue_id: &str,
) -> Result<i32> {
    ui::step("Would POST", job.build_url(params)?);

    if let (Some(jira_url), false) = (&project.jira_url_api, issue_id.is_empty()) {
        let branch = params.get(jenkins::COMMIT_PARAM).unwrap_or_default();
        let update = jira::IssueUpdate::add_comment(jira::comment_body(Local::now(), branch));
        ui::step("Would PUT", jira::issue_url(jira_url, issue_id));
        println!("{}", serde_json::to_string_pretty(&update)?);
    }

    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secrets::testing::{resolver, MemoryStore, ScriptedPrompter};
    use httpmock::Method::{GET, POST, PUT};
    use httpmock::MockServer;
    use tempfile::TempDir;

    fn write_config(contents: &str) -> (TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(config::DEFAULT_CONFIG_FILE);
        std::fs::write(&path, contents).unwrap();
        (dir, path)
    }

    fn invocation(config_path: PathBuf, branch: &str) -> Invocation {
        Invocation {
            user: "bob".into(),
            token: "t0ken".into(),
            config_path,
            branch: branch.into(),
            extra_params: vec![],
            insecure: false,
            dry_run: false,
            confirm_missing_issue: false,
        }
    }

    fn full_config(server: &MockServer) -> String {
        format!(
            "[project]\njenkins.url = {url}\njenkins.job = precommit\njira.url.api = {url}\n",
            url = server.base_url()
        )
    }

    #[test]
    fn test_build_and_comment() {
        let server = MockServer::start();
        let build = server.mock(|when, then| {
            when.method(POST)
                .path("/job/precommit/buildWithParameters")
                .query_param("JK_GITCOMMITID", "bugfix/PROJ-77-thing")
                .query_param("JIRA_ISSUE", "PROJ-77");
            then.status(200);
        });
        let get = server.mock(|when, then| {
            when.method(GET).path("/rest/api/2/issue/PROJ-77");
            then.status(200);
        });
        let put = server.mock(|when, then| {
            when.method(PUT)
                .path("/rest/api/2/issue/PROJ-77")
                .body_includes("Branch: *bugfix/PROJ-77-thing*");
            then.status(204);
        });

        let (_dir, path) = write_config(&full_config(&server));
        let store = MemoryStore::with("alice", jira::SECRET_KEY, "s3cret");
        let prompter = ScriptedPrompter::new(&[]);

        let code = execute(
            &invocation(path, "bugfix/PROJ-77-thing"),
            &mut resolver(&store, &prompter),
        )
        .unwrap();

        assert_eq!(code, 0);
        build.assert();
        get.assert_hits(2);
        put.assert();
    }

    #[test]
    fn test_extra_params_are_sent() {
        let server = MockServer::start();
        let build = server.mock(|when, then| {
            when.method(POST)
                .path("/job/precommit/buildWithParameters")
                .query_param("JIRA_ISSUE", "ABC-1")
                .query_param("SUITE", "FULL");
            then.status(201);
        });

        let (_dir, path) = write_config(&format!(
            "[project]\njenkins.url = {}\njenkins.job = precommit\n",
            server.base_url()
        ));
        let mut invocation = invocation(path, "ABC-1");
        invocation.extra_params = vec![("SUITE".into(), "FULL".into())];

        let store = MemoryStore::default();
        let prompter = ScriptedPrompter::new(&[]);
        let code = execute(&invocation, &mut resolver(&store, &prompter)).unwrap();

        assert_eq!(code, 0);
        build.assert();
        assert_eq!(prompter.asked(), 0);
    }

    #[test]
    fn test_failed_build_skips_comment() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/job/precommit/buildWithParameters");
            then.status(500).body("boom");
        });
        let get = server.mock(|when, then| {
            when.method(GET);
            then.status(200);
        });

        let (_dir, path) = write_config(&full_config(&server));
        let store = MemoryStore::default();
        let prompter = ScriptedPrompter::new(&[]);

        let code = execute(
            &invocation(path, "feature/ABC-1"),
            &mut resolver(&store, &prompter),
        )
        .unwrap();

        assert_eq!(code, 1);
        get.assert_hits(0);
    }

    #[test]
    fn test_failed_comment_keeps_success_status() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/job/precommit/buildWithParameters");
            then.status(201);
        });
        server.mock(|when, then| {
            when.method(GET).path("/rest/api/2/issue/ABC-1");
            then.status(200);
        });
        server.mock(|when, then| {
            when.method(PUT).path("/rest/api/2/issue/ABC-1");
            then.status(500);
        });

        let (_dir, path) = write_config(&full_config(&server));
        let store = MemoryStore::with("alice", jira::SECRET_KEY, "s3cret");
        let prompter = ScriptedPrompter::new(&[]);

        let code = execute(
            &invocation(path, "feature/ABC-1"),
            &mut resolver(&store, &prompter),
        )
        .unwrap();

        assert_eq!(code, 0);
    }

    #[test]
    fn test_missing_project_section_aborts_before_any_request() {
        let server = MockServer::start();
        let any = server.mock(|_when, then| {
            then.status(200);
        });

        let (_dir, path) = write_config(&format!("[other]\njenkins.url = {}\n", server.base_url()));
        let store = MemoryStore::default();
        let prompter = ScriptedPrompter::new(&[]);

        let result = execute(
            &invocation(path, "feature/ABC-1"),
            &mut resolver(&store, &prompter),
        );

        assert!(matches!(result, Err(Error::Config(_))));
        any.assert_hits(0);
    }

    #[test]
    fn test_missing_config_file_aborts() {
        let dir = tempfile::tempdir().unwrap();
        let store = MemoryStore::default();
        let prompter = ScriptedPrompter::new(&[]);

        let result = execute(
            &invocation(dir.path().join("absent.conf"), "feature/ABC-1"),
            &mut resolver(&store, &prompter),
        );

        assert!(matches!(result, Err(Error::Config(msg)) if msg.contains("no 'project' section")));
    }

    #[test]
    fn test_branch_without_issue_builds_without_comment() {
        let server = MockServer::start();
        let build = server.mock(|when, then| {
            when.method(POST)
                .path("/job/precommit/buildWithParameters")
                .query_param("JK_GITCOMMITID", "cleanup")
                .query_param_exists("JIRA_ISSUE");
            then.status(201);
        });
        let get = server.mock(|when, then| {
            when.method(GET);
            then.status(200);
        });

        let (_dir, path) = write_config(&full_config(&server));
        let store = MemoryStore::default();
        let prompter = ScriptedPrompter::new(&[]);

        let code = execute(&invocation(path, "cleanup"), &mut resolver(&store, &prompter)).unwrap();

        assert_eq!(code, 0);
        build.assert();
        get.assert_hits(0);
    }

    #[test]
    fn test_dry_run_sends_nothing() {
        let server = MockServer::start();
        let any = server.mock(|_when, then| {
            then.status(200);
        });

        let (_dir, path) = write_config(&full_config(&server));
        let mut invocation = invocation(path, "feature/ABC-1");
        invocation.dry_run = true;

        let store = MemoryStore::default();
        let prompter = ScriptedPrompter::new(&[]);
        let code = execute(&invocation, &mut resolver(&store, &prompter)).unwrap();

        assert_eq!(code, 0);
        any.assert_hits(0);
        assert_eq!(prompter.asked(), 0);
    }

    fn offline_args(config: PathBuf) -> Args {
        Args {
            token: Some("t0ken".into()),
            user: Some("bob".into()),
            config: Some(config),
            branch: Some("feature/ABC-1".into()),
            ..Args::default()
        }
    }

    #[test]
    fn test_default_user() {
        assert_eq!(default_user("alice", None), "alice");
        assert_eq!(default_user("alice", Some("bob".into())), "bob");
        assert_eq!(default_user("", Some("bob".into())), "bob");
        assert_eq!(default_user("alice", Some(String::new())), "alice");
        assert_eq!(default_user("", None), "");
    }

    #[test]
    fn test_run_without_user_env_reaches_config_check() {
        let repo_dir = tempfile::tempdir().unwrap();
        git2::Repository::init(repo_dir.path()).unwrap();
        let absent = repo_dir.path().join("absent.conf");

        let saved = std::env::var_os("USER");
        std::env::remove_var("USER");
        let result = run_in(repo_dir.path(), offline_args(absent));
        if let Some(user) = saved {
            std::env::set_var("USER", user);
        }

        assert!(matches!(result, Err(Error::Config(msg)) if msg.contains("no 'project' section")));
    }

    #[test]
    fn test_run_in_bare_repository_reaches_config_check() {
        let repo_dir = tempfile::tempdir().unwrap();
        git2::Repository::init_bare(repo_dir.path()).unwrap();
        let absent = repo_dir.path().join("absent.conf");

        let result = run_in(repo_dir.path(), offline_args(absent));

        assert!(matches!(result, Err(Error::Config(_))));
    }
}
