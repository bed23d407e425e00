//! Per-run settings: flags, `skdeploy.yaml`, the user config file, prompts.
//!
//! # Sources, highest precedence first
//!
//! 1. command-line flags (`--password` also reads `SKDEPLOY_PASSWORD`)
//! 2. `skdeploy.yaml`, found by walking up from the working directory
//! 3. `<config_dir>/spiderkeeper-deploy/config.yaml`
//! 4. an interactive prompt, unless `--no-input` is given
//!
//! The job list is never prompted for and never defaults to empty: an empty
//! desired state would delete every job on the scheduler.

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Args;
use serde::Deserialize;
use thiserror::Error;

use skdeploy_client::config::DEFAULT_TIMEOUT;
use skdeploy_client::{Credentials, RemoteConfig};
use skdeploy_core::{parse_job_list, DesiredJob, ModelError, ProjectName};

/// File name searched for in the working directory and its ancestors.
pub const PROJECT_CONFIG_FILE: &str = "skdeploy.yaml";

const USER_CONFIG_DIR: &str = "spiderkeeper-deploy";
const USER_CONFIG_FILE: &str = "config.yaml";

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// All errors that can arise while assembling the run configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no value for `{key}`; pass {flag}, set `{key}` in skdeploy.yaml, or run without --no-input")]
    Missing {
        key: &'static str,
        flag: &'static str,
    },

    #[error("no job list configured; pass --jobs '<JSON array>' or set `jobs` in skdeploy.yaml")]
    MissingJobs,

    #[error("`{key}` must not be empty")]
    Empty { key: &'static str },

    #[error("project name {name:?} may not contain quotes, slashes or control characters")]
    InvalidProject { name: String },

    #[error("cannot read config file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// serde_yaml's message carries the line and column.
    #[error("failed to parse config file {path}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("invalid --jobs value")]
    Jobs(#[source] ModelError),

    #[error("interactive prompt failed")]
    Prompt(#[from] dialoguer::Error),
}

// ---------------------------------------------------------------------------
// Flags
// ---------------------------------------------------------------------------

/// Settings shared by `deploy` and `plan`. Each flag overrides the config files.
#[derive(Args, Debug, Clone)]
pub struct SettingsArgs {
    /// Path to a project config file (default: nearest skdeploy.yaml).
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// SpiderKeeper base URL, e.g. http://localhost:5000
    #[arg(long)]
    pub url: Option<String>,

    /// SpiderKeeper project name.
    #[arg(long, short = 'p')]
    pub project: Option<String>,

    /// Desired jobs as a JSON array of job objects.
    #[arg(long, value_name = "JSON")]
    pub jobs: Option<String>,

    #[arg(long, short = 'u')]
    pub username: Option<String>,

    #[arg(long, env = "SKDEPLOY_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Python interpreter used to build the egg.
    #[arg(long, value_name = "PROGRAM")]
    pub python: Option<String>,

    /// Per-request timeout in seconds.
    #[arg(
        long,
        value_name = "SECS",
        default_value_t = DEFAULT_TIMEOUT.as_secs(),
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub timeout: u64,

    /// Never prompt; missing values become errors.
    #[arg(long)]
    pub no_input: bool,
}

impl Default for SettingsArgs {
    fn default() -> Self {
        Self {
            config: None,
            url: None,
            project: None,
            jobs: None,
            username: None,
            password: None,
            python: None,
            timeout: DEFAULT_TIMEOUT.as_secs(),
            no_input: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Files
// ---------------------------------------------------------------------------

/// Shape shared by the project and user config files. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub url: Option<String>,
    pub project: Option<String>,
    pub jobs: Option<Vec<DesiredJob>>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub python: Option<String>,
}

/// Load a config file. Returns `ConfigError::Parse` with the path on bad YAML.
pub fn load_file(path: &Path) -> Result<FileConfig, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    if contents.trim().is_empty() {
        return Ok(FileConfig::default());
    }
    serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Nearest `skdeploy.yaml` in `start` or any of its ancestors.
pub fn find_project_config(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(PROJECT_CONFIG_FILE))
        .find(|candidate| candidate.is_file())
}

/// `<config_dir>/spiderkeeper-deploy/config.yaml`. Does not touch the disk.
pub fn user_config_path_at(config_dir: &Path) -> PathBuf {
    config_dir.join(USER_CONFIG_DIR).join(USER_CONFIG_FILE)
}

// ---------------------------------------------------------------------------
// Prompts
// ---------------------------------------------------------------------------

/// Last-resort source of a missing value.
pub trait Prompter {
    /// `Ok(None)` means prompting is disabled.
    fn text(&self, label: &str) -> Result<Option<String>, ConfigError>;
    fn secret(&self, label: &str) -> Result<Option<String>, ConfigError>;
}

/// Terminal prompts via dialoguer.
pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn text(&self, label: &str) -> Result<Option<String>, ConfigError> {
        let value: String = dialoguer::Input::new()
            .with_prompt(label)
            .interact_text()?;
        Ok(Some(value))
    }

    fn secret(&self, label: &str) -> Result<Option<String>, ConfigError> {
        let value = dialoguer::Password::new().with_prompt(label).interact()?;
        Ok(Some(value))
    }
}

/// `--no-input`: never asks.
pub struct NoPrompt;

impl Prompter for NoPrompt {
    fn text(&self, _label: &str) -> Result<Option<String>, ConfigError> {
        Ok(None)
    }

    fn secret(&self, _label: &str) -> Result<Option<String>, ConfigError> {
        Ok(None)
    }
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// Fully resolved settings for one run.
#[derive(Debug, Clone)]
pub struct Settings {
    pub url: String,
    pub project: ProjectName,
    pub jobs: Vec<DesiredJob>,
    pub credentials: Credentials,
    /// Directory holding the project's `setup.py`.
    pub project_dir: PathBuf,
    pub python: Option<String>,
    pub timeout: Duration,
}

impl Settings {
    pub fn remote_config(&self) -> RemoteConfig {
        RemoteConfig::new(&self.url, self.credentials.clone()).with_timeout(self.timeout)
    }
}

/// Resolve settings from flags, files under `cwd`, the user config dir and
/// prompts, in that order.
pub fn resolve(
    args: &SettingsArgs,
    cwd: &Path,
    user_config_dir: Option<&Path>,
    prompter: &dyn Prompter,
) -> Result<Settings, ConfigError> {
    let project_file = match &args.config {
        Some(path) => Some(cwd.join(path)),
        None => find_project_config(cwd),
    };
    let project_cfg = match &project_file {
        Some(path) => {
            tracing::debug!(path = %path.display(), "loading project config");
            load_file(path)?
        }
        None => FileConfig::default(),
    };
    let user_cfg = match user_config_dir.map(user_config_path_at) {
        Some(path) if path.is_file() => {
            tracing::debug!(path = %path.display(), "loading user config");
            load_file(&path)?
        }
        _ => FileConfig::default(),
    };
    let project_dir = project_file
        .as_deref()
        .and_then(Path::parent)
        .map(Path::to_path_buf)
        .unwrap_or_else(|| cwd.to_path_buf());

    // Jobs are parsed before anything is prompted for so that a broken job
    // list fails fast.
    let jobs = match &args.jobs {
        Some(json) => parse_job_list(json).map_err(ConfigError::Jobs)?,
        None => project_cfg
            .jobs
            .clone()
            .or_else(|| user_cfg.jobs.clone())
            .ok_or(ConfigError::MissingJobs)?,
    };

    let files = [&project_cfg, &user_cfg];
    let prompter: &dyn Prompter = if args.no_input { &NoPrompt } else { prompter };

    let url = require(
        pick(&args.url, files, |c| &c.url),
        "url",
        "--url",
        || prompter.text("SpiderKeeper URL"),
    )?;
    let project = require(
        pick(&args.project, files, |c| &c.project),
        "project",
        "--project",
        || prompter.text("Project name"),
    )?;
    check_project_name(&project)?;
    let username = require(
        pick(&args.username, files, |c| &c.username),
        "username",
        "--username",
        || prompter.text("Username"),
    )?;
    let password = require(
        pick(&args.password, files, |c| &c.password),
        "password",
        "--password",
        || prompter.secret("Password"),
    )?;
    let python = pick(&args.python, files, |c| &c.python);

    Ok(Settings {
        url,
        project: ProjectName::from(project),
        jobs,
        credentials: Credentials { username, password },
        project_dir,
        python,
        timeout: Duration::from_secs(args.timeout),
    })
}

/// The name ends up in the artifact's file name and in upload headers.
fn check_project_name(name: &str) -> Result<(), ConfigError> {
    let bad = |c: char| c.is_control() || matches!(c, '"' | '/' | '\\');
    if name.contains(bad) {
        return Err(ConfigError::InvalidProject {
            name: name.to_string(),
        });
    }
    Ok(())
}

/// First of: the flag, the project file, the user file.
fn pick(
    flag: &Option<String>,
    files: [&FileConfig; 2],
    get: fn(&FileConfig) -> &Option<String>,
) -> Option<String> {
    flag.clone()
        .or_else(|| files.iter().find_map(|cfg| get(cfg).clone()))
}

fn require(
    value: Option<String>,
    key: &'static str,
    flag: &'static str,
    ask: impl FnOnce() -> Result<Option<String>, ConfigError>,
) -> Result<String, ConfigError> {
    let value = match value {
        Some(v) => v,
        None => ask()?.ok_or(ConfigError::Missing { key, flag })?,
    };
    // Passwords may legitimately be anything, including whitespace.
    if key != "password" && value.trim().is_empty() {
        return Err(ConfigError::Empty { key });
    }
    Ok(value)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
