/// `wiseguy` asks for a cherry-pick of `foo/bar#2` onto `stage`.
pub(crate) const ISSUE_COMMENT: &str = r#"{
  "action": "created",
  "issue": {
    "number": 2,
    "state": "closed",
    "title": "Update magic number",
    "pull_request": {
      "url": "https://api.github.com/repos/foo/bar/pulls/2",
      "html_url": "https://github.com/foo/bar/pull/2"
    }
  },
  "comment": {
    "id": 1001,
    "body": "/cherrypick stage",
    "user": { "login": "wiseguy", "id": 17 }
  },
  "repository": {
    "name": "bar",
    "full_name": "foo/bar",
    "owner": { "login": "foo", "id": 1 }
  },
  "sender": { "login": "wiseguy", "id": 17 }
}"#;

/// `foo/bar#2` was merged into `master`.
pub(crate) const PR_CLOSED: &str = r#"{
  "action": "closed",
  "number": 2,
  "pull_request": {
    "number": 2,
    "state": "closed",
    "merged": true,
    "merge_commit_sha": "af468c9e69dfdf39db591f1e3e8de5b64b0e62a2",
    "base": { "ref": "master", "sha": "a4786471ee4d4e894fec150e426c3551db0f31e0" },
    "head": { "ref": "magic", "sha": "f88f7bd4250b963752d615e491b7e676ce5eb7f0" }
  },
  "repository": {
    "name": "bar",
    "full_name": "foo/bar",
    "owner": { "login": "foo", "id": 1 }
  },
  "sender": { "login": "developer", "id": 23 }
}"#;

pub(crate) const BAR_GO: &str = "// Package bar does an interesting thing.
package bar

// Foo does a thing.
func Foo(wow int) int {
\treturn 42 + wow
}
";

pub(crate) const PATCH: &str = "From af468c9e69dfdf39db591f1e3e8de5b64b0e62a2 Mon Sep 17 00:00:00 2001
From: Wise Guy <wise@guy.com>
Date: Thu, 19 Oct 2017 15:14:36 +0200
Subject: [PATCH] Update magic number

---
 bar.go | 3 ++-
 1 file changed, 2 insertions(+), 1 deletion(-)

diff --git a/bar.go b/bar.go
index 1ea52dc..5bd70a9 100644
--- a/bar.go
+++ b/bar.go
@@ -3,5 +3,6 @@ package bar
\x20
 // Foo does a thing.
 func Foo(wow int) int {
-\treturn 42 + wow
+\t// Needs to be 49 because of a reason.
+\treturn 49 + wow
 }
";
