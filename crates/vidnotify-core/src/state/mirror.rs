// # Git Mirror
//
// Pushes the saved state file to a remote git repository, so a scheduler
// without persistent disk (e.g. a CI runner) still sees the previous run's
// state on its next checkout.
//
// ## Behavior
//
// 1. Configure a local committer identity (failures only warned)
// 2. `git add <state file>`
// 3. Stop when `git diff --cached --quiet` reports no change
// 4. Commit, point `origin` at a token-authenticated URL, push `HEAD:<branch>`
//
// Every git invocation runs under a bounded timeout and is killed when it
// exceeds it. The token never appears in logs or error messages.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Output;
use std::time::Duration;
use tokio::process::Command;

use crate::Error;
use crate::config::MirrorConfig;
use crate::traits::state_store::StateMirror;

/// Commit message used for state updates
const COMMIT_MESSAGE: &str = "chore(bot): update state";

/// Branch used when the checked-out branch cannot be determined
const DEFAULT_BRANCH: &str = "main";

/// Default time budget for one git invocation
const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(60);

/// Remote mirror that commits and pushes the state file with `git`
pub struct GitMirror {
    /// Write-capable credential
    /// ⚠️ NEVER log this value
    token: String,

    /// Remote identifier (`owner/repo`)
    repository: String,

    /// Branch override
    branch: Option<String>,

    /// Working directory for git (defaults to the process cwd)
    workdir: Option<PathBuf>,

    /// Time budget for each git invocation
    command_timeout: Duration,
}

impl std::fmt::Debug for GitMirror {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitMirror")
            .field("token", &"<REDACTED>")
            .field("repository", &self.repository)
            .field("branch", &self.branch)
            .field("workdir", &self.workdir)
            .finish()
    }
}

impl GitMirror {
    /// Create a git mirror from configuration
    pub fn new(config: &MirrorConfig) -> Self {
        Self {
            token: config.token.clone(),
            repository: config.repository.clone(),
            branch: config.branch.clone(),
            workdir: None,
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
        }
    }

    /// Run git inside `workdir`
    pub fn with_workdir(mut self, workdir: impl Into<PathBuf>) -> Self {
        self.workdir = Some(workdir.into());
        self
    }

    /// Override the per-command time budget
    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Token-authenticated push URL
    fn remote_url(&self) -> String {
        format!(
            "https://x-access-token:{}@github.com/{}.git",
            self.token, self.repository
        )
    }

    /// Replace every occurrence of the token in `text`
    fn redact(&self, text: &str) -> String {
        if self.token.is_empty() {
            text.to_string()
        } else {
            text.replace(&self.token, "<REDACTED>")
        }
    }

    /// Run git and return its output regardless of exit status
    async fn git(&self, args: &[&str]) -> Result<Output, Error> {
        let mut command = Command::new("git");
        command.args(args).kill_on_drop(true);
        if let Some(workdir) = &self.workdir {
            command.current_dir(workdir);
        }

        let subcommand = args.first().copied().unwrap_or("git");
        match tokio::time::timeout(self.command_timeout, command.output()).await {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(e)) => Err(Error::mirror(format!(
                "Failed to run git {}: {}",
                subcommand, e
            ))),
            Err(_) => Err(Error::timeout(format!(
                "git {} exceeded {:?}",
                subcommand, self.command_timeout
            ))),
        }
    }

    /// Run git and fail on a non-zero exit status
    async fn git_checked(&self, args: &[&str]) -> Result<Output, Error> {
        let output = self.git(args).await?;
        if output.status.success() {
            Ok(output)
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(Error::mirror(format!(
                "git {} failed ({}): {}",
                args.first().copied().unwrap_or("git"),
                output.status,
                self.redact(stderr.trim())
            )))
        }
    }

    /// Branch to push to
    async fn target_branch(&self) -> String {
        if let Some(branch) = &self.branch {
            return branch.clone();
        }

        match self.git(&["rev-parse", "--abbrev-ref", "HEAD"]).await {
            Ok(output) if output.status.success() => {
                let branch = String::from_utf8_lossy(&output.stdout).trim().to_string();
                if branch.is_empty() || branch == "HEAD" {
                    DEFAULT_BRANCH.to_string()
                } else {
                    branch
                }
            }
            _ => DEFAULT_BRANCH.to_string(),
        }
    }
}

#[async_trait]
impl StateMirror for GitMirror {
    async fn mirror(&self, path: &Path) -> Result<(), Error> {
        for (key, value) in [
            ("user.email", "action@github.com"),
            ("user.name", "github-actions[bot]"),
        ] {
            if let Err(e) = self.git_checked(&["config", "--local", key, value]).await {
                tracing::warn!("Could not configure git {}: {}", key, e);
            }
        }

        let path = path.to_string_lossy().into_owned();
        let path = path.as_str();
        self.git_checked(&["add", "--", path]).await?;

        let diff = self.git(&["diff", "--cached", "--quiet", "--", path]).await?;
        if diff.status.success() {
            tracing::info!("No state changes to commit");
            return Ok(());
        }

        self.git_checked(&["commit", "-m", COMMIT_MESSAGE, "--", path])
            .await?;

        let remote_url = self.remote_url();
        self.git_checked(&["remote", "set-url", "origin", remote_url.as_str()])
            .await?;

        let branch = self.target_branch().await;
        let refspec = format!("HEAD:{}", branch);
        self.git_checked(&["push", "origin", refspec.as_str()]).await?;

        tracing::info!("State committed and pushed to {} ({})", self.repository, branch);
        Ok(())
    }

    fn mirror_name(&self) -> &'static str {
        "git"
    }
}
