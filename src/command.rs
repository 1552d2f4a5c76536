//! Chat commands recognised in comment bodies.
//!
//! `/cherrypick <branch>` requests a cherry-pick onto `<branch>`, `/approve`
//! approves it. Both must stand alone on their line. History is always
//! scanned newest-first: later comments and, within a comment, later lines
//! take precedence.

use std::sync::LazyLock;

use regex::Regex;

use crate::forge::IssueComment;

static CHERRYPICK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^/cherrypick[ \t]+(\S+)[ \t]*\r?$").expect("valid cherrypick regex")
});
static APPROVE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^/approve[ \t]*\r?$").expect("valid approve regex"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Directive {
    pub target_branch: String,
    pub requested_by: String,
    /// Comment carrying the directive, when it came from a listed thread.
    pub comment_id: Option<u64>,
}

/// Most recent target branch requested in `body`. Lines without a branch are ignored.
pub(crate) fn parse_cherrypick(body: &str) -> Option<&str> {
    CHERRYPICK_RE
        .captures_iter(body)
        .last()
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

pub(crate) fn is_approval(body: &str) -> bool {
    APPROVE_RE.is_match(body)
}

/// Directive in a single, freshly posted comment.
pub(crate) fn directive_in(author: &str, body: &str) -> Option<Directive> {
    parse_cherrypick(body).map(|branch| Directive {
        target_branch: branch.to_owned(),
        requested_by: author.to_owned(),
        comment_id: None,
    })
}

/// Every directive in a thread given oldest-first, yielded newest-first.
pub(crate) fn directives(comments: &[IssueComment]) -> impl Iterator<Item = Directive> + '_ {
    comments.iter().rev().filter_map(|c| {
        parse_cherrypick(&c.body).map(|branch| Directive {
            target_branch: branch.to_owned(),
            requested_by: c.author.clone(),
            comment_id: Some(c.id),
        })
    })
}

/// Approving comments of a thread, newest-first.
pub(crate) fn approvals(comments: &[IssueComment]) -> impl Iterator<Item = &IssueComment> {
    comments.iter().rev().filter(|c| is_approval(&c.body))
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn comment(id: u64, author: &str, body: &str) -> IssueComment {
        IssueComment {
            id,
            author: author.to_owned(),
            body: body.to_owned(),
        }
    }

    #[rstest]
    #[case("/cherrypick stage", Some("stage"))]
    #[case("/cherrypick release-1.5\r\n", Some("release-1.5"))]
    #[case("LGTM\n/cherrypick  release-1.5  \nthanks", Some("release-1.5"))]
    #[case("/cherrypick a\n/cherrypick b", Some("b"))]
    #[case("/cherrypick", None)]
    #[case("/cherrypick   ", None)]
    #[case("/cherrypick two words", None)]
    #[case("please /cherrypick stage", None)]
    #[case("/cherrypickstage", None)]
    #[case("", None)]
    fn test_parse_cherrypick(#[case] body: &str, #[case] expected: Option<&str>) {
        assert_eq!(parse_cherrypick(body), expected);
    }

    #[rstest]
    #[case("/approve", true)]
    #[case("looks good\n/approve\n", true)]
    #[case("/approve cancel", false)]
    #[case("I /approve", false)]
    fn test_is_approval(#[case] body: &str, #[case] expected: bool) {
        assert_eq!(is_approval(body), expected);
    }

    #[test]
    fn test_directives_newest_first() {
        let thread = [
            comment(1, "alice", "/cherrypick release-1.4"),
            comment(2, "developer", "a review comment"),
            comment(3, "bob", "/cherrypick"),
            comment(4, "carol", "/cherrypick release-1.5"),
        ];
        let found: Vec<_> = directives(&thread)
            .map(|d| (d.target_branch, d.requested_by, d.comment_id))
            .collect();
        assert_eq!(
            found,
            vec![
                ("release-1.5".to_owned(), "carol".to_owned(), Some(4)),
                ("release-1.4".to_owned(), "alice".to_owned(), Some(1)),
            ]
        );
    }

    #[test]
    fn test_approvals() {
        let thread = [
            comment(1, "approver", "/cherrypick release-1.5"),
            comment(2, "approver", "/approve"),
            comment(3, "other", "/approve cancel"),
        ];
        let ids: Vec<_> = approvals(&thread).map(|c| c.id).collect();
        assert_eq!(ids, vec![2]);
    }

    #[test]
    fn test_directive_in() {
        assert_eq!(
            directive_in("wiseguy", "/cherrypick stage"),
            Some(Directive {
                target_branch: "stage".to_owned(),
                requested_by: "wiseguy".to_owned(),
                comment_id: None,
            })
        );
        assert_eq!(directive_in("wiseguy", "/cherrypick"), None);
    }
}
