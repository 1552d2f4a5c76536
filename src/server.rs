use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use futures::FutureExt;
use futures::{channel::mpsc::channel, TryFutureExt};
use tokio::net::TcpListener;
use tokio::task::JoinSet;

use crate::cli::{build_octocrab, ServeArgs};
use crate::event::InboundEvent;
use crate::forge::OctocrabForge;
use crate::git::LibGit;
use crate::patch::PatchFetcher;
use crate::repo_cache::default_cache_dir;
use crate::utils::get_credential;
use crate::workflow::{CherryPicker, WorkflowConfig};

mod listener;
mod runner;

pub(crate) async fn serve(args: ServeArgs) -> Result<()> {
    let (sender, receiver) = channel::<InboundEvent>(32);
    // If secrets have not been passed via CLI or env, get them as credentials.
    let webhook_secret = args
        .webhook_secret
        .ok_or(())
        .or_else(|()| get_credential("webhook_secret"))?;
    let github_token = args
        .github_token
        .ok_or(())
        .or_else(|()| get_credential("github_token"))?;
    let cache_dir = args
        .cache_dir
        .or_else(default_cache_dir)
        .context("No cache directory given and no default available")?;
    let timeout = Duration::from_secs(args.http_timeout);

    let client = build_octocrab(&github_token, args.github_api_url.as_deref(), timeout)?;
    let git = LibGit::new(
        args.git_base_url,
        cache_dir,
        args.bot_name.clone(),
        args.bot_email,
    );
    let config = WorkflowConfig {
        bot_name: args.bot_name,
        push_token: github_token,
        require_independent_approval: args.require_independent_approval,
    };
    let picker = CherryPicker::new(
        config,
        Arc::new(OctocrabForge::new(Arc::new(client))),
        Arc::new(git),
        PatchFetcher::new(args.patch_base_url, Some(timeout))?,
    );

    let service = listener::listen(sender, webhook_secret);
    let tcp_listener = TcpListener::bind(&args.addr).await?;
    tracing::info!("Listening on {}", args.addr);

    let mut set: JoinSet<Result<()>> = JoinSet::new();
    set.spawn(axum::serve(tcp_listener, service).into_future().err_into());
    set.spawn(runner::runner(receiver, Arc::new(picker)).map(Result::Ok));
    while let Some(res) = set.join_next().await {
        res??;
    }
    Ok(())
}
