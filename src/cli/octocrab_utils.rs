use std::time::Duration;

use anyhow::Result;
use octocrab::Octocrab;
use secrecy::{ExposeSecret, SecretString};

/// API client authenticated as the bot account.
pub(crate) fn build_octocrab(
    token: &SecretString,
    base_uri: Option<&str>,
    timeout: Duration,
) -> Result<Octocrab> {
    let builder = Octocrab::builder()
        // https://github.com/XAMPPRocky/octocrab/issues/594
        .personal_token(token.expose_secret().to_owned())
        .set_connect_timeout(Some(timeout))
        .set_read_timeout(Some(timeout))
        .set_write_timeout(Some(timeout));
    let builder = match base_uri {
        Some(uri) => builder.base_uri(uri)?,
        None => builder,
    };
    Ok(builder.build()?)
}
