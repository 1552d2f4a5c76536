use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use secrecy::SecretString;

use crate::constants::{DEFAULT_BOT_NAME, DEFAULT_GIT_URL, DEFAULT_PATCH_URL};

#[derive(Parser)]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub(crate) command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Start web hook server
    Serve(ServeArgs),
}

#[derive(Args, Debug)]
pub(crate) struct ServeArgs {
    /// IP and port to listen on
    #[arg(default_value = "0.0.0.0:8888")]
    pub(crate) addr: String,
    /// Webhook secret as configured on GitHub
    #[arg(long, env)]
    pub(crate) webhook_secret: Option<SecretString>,
    /// Token of the bot account, used for the API and for pushing
    #[arg(long, env)]
    pub(crate) github_token: Option<SecretString>,
    /// Bot account owning the forks
    #[arg(long, env, default_value = DEFAULT_BOT_NAME)]
    pub(crate) bot_name: String,
    /// Committer email of cherry-picked commits
    #[arg(long, env, default_value = "ci-robot@users.noreply.github.com")]
    pub(crate) bot_email: String,
    /// GitHub API base URL, for GitHub Enterprise
    #[arg(long, env)]
    pub(crate) github_api_url: Option<String>,
    /// Base URL repositories are cloned from and pushed to
    #[arg(long, env, default_value = DEFAULT_GIT_URL)]
    pub(crate) git_base_url: String,
    /// Base URL serving `/raw/<org>/<repo>/pull/<n>.patch`
    #[arg(long, env, default_value = DEFAULT_PATCH_URL)]
    pub(crate) patch_base_url: String,
    /// Timeout of outgoing HTTP requests in seconds
    #[arg(long, env, default_value_t = 30)]
    pub(crate) http_timeout: u64,
    /// Only count `/approve` comments by someone other than the requester
    #[arg(long, env)]
    pub(crate) require_independent_approval: bool,
    /// Where working clones are kept
    #[arg(long, env)]
    pub(crate) cache_dir: Option<PathBuf>,
}
