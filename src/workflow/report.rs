use askama::Template;
use chrono::{DateTime, Utc};

use super::{CherryPickError, Outcome};
use crate::constants::REPORT_MARKER;

/// Tool output beyond this is cut off; GitHub rejects comments over 65536 characters.
const MAX_OUTPUT: usize = 60_000;

#[derive(Template)]
#[template(path = "report.md.j2", escape = "none")]
struct Report<'a> {
    marker: &'a str,
    summary: String,
    output: Option<&'a str>,
    /// Backtick fence longer than any backtick run inside `output`.
    fence: String,
    now: DateTime<Utc>,
}

fn fence_for(output: &str) -> String {
    let longest = output
        .split(|c| c != '`')
        .map(str::len)
        .max()
        .unwrap_or(0);
    "`".repeat(longest.max(2) + 1)
}

/// Longest prefix of `s` not exceeding `max` bytes that ends on a character boundary.
fn clamp(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let end = (0..=max).rev().find(|&i| s.is_char_boundary(i)).unwrap_or(0);
    &s[..end]
}

fn summary(source_pr: u64, target: &str, outcome: &Outcome) -> String {
    match outcome {
        Outcome::Created(number) => format!("new pull request created: #{number}"),
        Outcome::Reused(number) => format!(
            "pull request #{number} already carries the cherry-pick of #{source_pr} onto \
             `{target}`, its branch was refreshed"
        ),
        Outcome::Aborted { error, .. } => match error {
            CherryPickError::Precondition(reason) => {
                format!("no cherry-pick of #{source_pr} onto `{target}` was attempted: {reason}")
            }
            CherryPickError::PatchApply(_) => format!(
                "#{source_pr} failed to apply on top of branch `{target}`, \
                 please cherry-pick it manually:"
            ),
            CherryPickError::PatchFetch(e) => {
                format!("could not fetch the patch of #{source_pr}: {e}")
            }
            CherryPickError::Push(e) => {
                format!("could not push the cherry-pick of #{source_pr} onto `{target}`: {e}")
            }
            CherryPickError::Forge(e) => {
                format!("cherry-pick of #{source_pr} onto `{target}` failed: {e}")
            }
            CherryPickError::Git(e) => format!(
                "could not prepare the cherry-pick of #{source_pr} onto `{target}`: {e}"
            ),
        },
    }
}

/// The comment posted back to the thread that triggered the workflow.
pub(super) fn render(source_pr: u64, target: &str, outcome: &Outcome) -> askama::Result<String> {
    let output = match outcome {
        Outcome::Aborted {
            error: CherryPickError::PatchApply(output),
            ..
        } => Some(clamp(output, MAX_OUTPUT)),
        _ => None,
    };
    Report {
        marker: REPORT_MARKER,
        summary: summary(source_pr, target, outcome),
        fence: fence_for(output.unwrap_or_default()),
        output,
        now: Utc::now(),
    }
    .render()
}
