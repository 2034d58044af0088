//! Integration tests for the GitHub REST client.
//!
//! Requests go to a local wiremock server standing in for the API.
//! Live GitHub API tests are behind the `live_github_tests` feature flag.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_json, body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use commit_headless::auth::StaticTokenProvider;
use commit_headless::core::change::{Change, FileEntry};
use commit_headless::core::types::{BranchName, Target};
use commit_headless::engine::{push_changes, PushOptions};
use commit_headless::forge::{
    BranchApi, CreateCommitRequest, ForgeError, GitDataApi, GitHubClient, TreeEntry,
};

const HEAD: &str = "1111111111111111111111111111111111111111";

fn client(server: &MockServer) -> GitHubClient {
    let provider = Arc::new(StaticTokenProvider::new("github.com", "test-token"));
    let target: Target = "octo/repo".parse().unwrap();
    GitHubClient::new(provider, &target, &server.uri(), Duration::from_secs(5)).unwrap()
}

fn sha(n: u8) -> String {
    format!("{:040x}", n)
}

// =============================================================================
// Branches
// =============================================================================

mod branches {
    use super::*;

    #[tokio::test]
    async fn get_branch_head_reads_commit_sha() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/octo/repo/branches/main"))
            .and(header("authorization", "Bearer test-token"))
            .and(header("accept", "application/vnd.github+json"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"name": "main", "commit": {"sha": HEAD}})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let head = client(&server).get_branch_head("main").await.unwrap();
        assert_eq!(head, HEAD);
    }

    #[tokio::test]
    async fn branch_name_with_slash_is_one_segment() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/octo/repo/branches/feature%2Fx"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"commit": {"sha": HEAD}})))
            .expect(1)
            .mount(&server)
            .await;

        let head = client(&server).get_branch_head("feature/x").await.unwrap();
        assert_eq!(head, HEAD);
    }

    #[tokio::test]
    async fn missing_branch_is_no_remote_branch() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/octo/repo/branches/gone"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "Branch not found"})))
            .mount(&server)
            .await;

        let err = client(&server).get_branch_head("gone").await.unwrap_err();
        assert_eq!(
            err,
            ForgeError::NoRemoteBranch {
                branch: "gone".into()
            }
        );
    }

    #[tokio::test]
    async fn create_branch_posts_full_ref() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/repos/octo/repo/git/refs"))
            .and(body_json(json!({"ref": "refs/heads/feature", "sha": HEAD})))
            .respond_with(
                ResponseTemplate::new(201)
                    .set_body_json(json!({"ref": "refs/heads/feature", "object": {"sha": HEAD}})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let head = client(&server).create_branch("feature", HEAD).await.unwrap();
        assert_eq!(head, HEAD);
    }

    #[tokio::test]
    async fn create_branch_at_unknown_sha() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/repos/octo/repo/git/refs"))
            .respond_with(ResponseTemplate::new(422).set_body_json(json!({"message": "Object does not exist"})))
            .mount(&server)
            .await;

        let err = client(&server).create_branch("feature", HEAD).await.unwrap_err();
        assert_eq!(err, ForgeError::BranchPointMissing { sha: HEAD.into() });
    }

    #[tokio::test]
    async fn create_existing_branch_is_not_a_missing_branch_point() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/repos/octo/repo/git/refs"))
            .respond_with(ResponseTemplate::new(422).set_body_json(json!({"message": "Reference already exists"})))
            .mount(&server)
            .await;

        let err = client(&server).create_branch("feature", HEAD).await.unwrap_err();
        assert!(matches!(err, ForgeError::ApiError { status: 422, .. }));
    }
}

// =============================================================================
// Git data
// =============================================================================

mod git_data {
    use super::*;

    #[tokio::test]
    async fn blob_is_sent_base64_encoded() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/repos/octo/repo/git/blobs"))
            .and(body_json(json!({"content": "aGVsbG8K", "encoding": "base64"})))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"sha": sha(2)})))
            .expect(1)
            .mount(&server)
            .await;

        let blob = client(&server).create_blob(b"hello\n").await.unwrap();
        assert_eq!(blob, sha(2));
    }

    #[tokio::test]
    async fn tree_deletion_has_null_sha() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/repos/octo/repo/git/trees"))
            .and(body_json(json!({
                "base_tree": sha(1),
                "tree": [
                    {"path": "a.txt", "mode": "100644", "type": "blob", "sha": sha(2)},
                    {"path": "b.txt", "mode": "100644", "type": "blob", "sha": null},
                ]
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"sha": sha(3)})))
            .expect(1)
            .mount(&server)
            .await;

        let entries = [
            TreeEntry::blob("a.txt", "100644", sha(2)),
            TreeEntry::deletion("b.txt", "100644"),
        ];
        let tree = client(&server).create_tree(&sha(1), &entries).await.unwrap();
        assert_eq!(tree, sha(3));
    }

    #[tokio::test]
    async fn commit_lists_parents() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/repos/octo/repo/git/commits"))
            .and(body_json(json!({"message": "msg", "tree": sha(3), "parents": [HEAD]})))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"sha": sha(4)})))
            .expect(1)
            .mount(&server)
            .await;

        let commit = client(&server)
            .create_commit(CreateCommitRequest {
                message: "msg".into(),
                tree: sha(3),
                parents: vec![HEAD.into()],
            })
            .await
            .unwrap();
        assert_eq!(commit, sha(4));
    }

    #[tokio::test]
    async fn update_ref_patches_branch_ref() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/repos/octo/repo/git/refs/heads/feature/x"))
            .and(body_json(json!({"sha": sha(4), "force": true})))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"ref": "refs/heads/feature/x", "object": {"sha": sha(4)}})),
            )
            .expect(1)
            .mount(&server)
            .await;

        client(&server)
            .update_ref("feature/x", &sha(4), true)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn missing_commit_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("/repos/octo/repo/git/commits/{}", sha(9))))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "Not Found"})))
            .mount(&server)
            .await;

        let err = client(&server).get_commit_tree(&sha(9)).await.unwrap_err();
        assert!(matches!(err, ForgeError::NotFound(_)));
    }
}

// =============================================================================
// Error mapping
// =============================================================================

mod errors {
    use super::*;

    async fn error_for(template: ResponseTemplate) -> ForgeError {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/repos/octo/repo/git/blobs"))
            .respond_with(template)
            .mount(&server)
            .await;
        client(&server).create_blob(b"x").await.unwrap_err()
    }

    #[tokio::test]
    async fn unauthorized() {
        let err = error_for(ResponseTemplate::new(401).set_body_json(json!({"message": "Bad credentials"}))).await;
        assert!(matches!(err, ForgeError::AuthFailed(_)));
    }

    #[tokio::test]
    async fn forbidden_with_exhausted_quota_is_rate_limited() {
        let err = error_for(
            ResponseTemplate::new(403)
                .insert_header("X-RateLimit-Remaining", "0")
                .set_body_json(json!({"message": "API rate limit exceeded"})),
        )
        .await;
        assert_eq!(err, ForgeError::RateLimited);
    }

    #[tokio::test]
    async fn forbidden_names_required_permissions() {
        let err = error_for(
            ResponseTemplate::new(403)
                .insert_header("X-Accepted-GitHub-Permissions", "contents=write")
                .set_body_json(json!({"message": "Resource not accessible by integration"})),
        )
        .await;
        match err {
            ForgeError::AuthFailed(message) => assert!(message.contains("contents=write")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn server_error_keeps_status() {
        let err = error_for(ResponseTemplate::new(502)).await;
        assert!(matches!(err, ForgeError::ApiError { status: 502, .. }));
    }
}

// =============================================================================
// End to end
// =============================================================================

#[tokio::test]
async fn push_one_change_through_the_api() {
    let server = MockServer::start().await;
    let tree = sha(0x10);

    Mock::given(method("GET"))
        .and(path("/repos/octo/repo/branches/main"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"commit": {"sha": HEAD}})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/repos/octo/repo/git/commits/{}", HEAD)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"sha": HEAD, "tree": {"sha": tree}})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/repos/octo/repo/git/blobs"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"sha": sha(0x20)})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/repos/octo/repo/git/trees"))
        .and(body_partial_json(json!({"base_tree": tree})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"sha": sha(0x30)})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/repos/octo/repo/git/commits"))
        .and(body_partial_json(json!({"tree": sha(0x30), "parents": [HEAD]})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"sha": sha(0x40)})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/repos/octo/repo/git/refs/heads/main"))
        .and(body_json(json!({"sha": sha(0x40), "force": false})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"object": {"sha": sha(0x40)}})))
        .expect(1)
        .mount(&server)
        .await;

    let change = Change::builder(sha(0xaa))
        .message("add a")
        .entry("a.txt", FileEntry::file(b"a\n".to_vec(), "100644"))
        .build();
    let options = PushOptions::new(BranchName::new("main").unwrap());

    let report = push_changes(Arc::new(client(&server)), &options, &[change])
        .await
        .unwrap();

    assert_eq!(report.pushed, 1);
    assert_eq!(report.base, HEAD);
    assert_eq!(report.head, sha(0x40));
}

// =============================================================================
// Live GitHub API Tests (behind feature flag)
// =============================================================================

#[cfg(feature = "live_github_tests")]
mod live_tests {
    use super::*;

    fn live_client() -> Option<GitHubClient> {
        let token = std::env::var("GITHUB_TOKEN").ok()?;
        let owner = std::env::var("COMMIT_HEADLESS_TEST_OWNER").ok()?;
        let repo = std::env::var("COMMIT_HEADLESS_TEST_REPO").ok()?;
        let target = Target::new(owner, repo).ok()?;
        let provider = Arc::new(StaticTokenProvider::new("github.com", token));
        GitHubClient::new(
            provider,
            &target,
            "https://api.github.com",
            Duration::from_secs(30),
        )
        .ok()
    }

    #[tokio::test]
    async fn live_missing_branch() {
        let Some(client) = live_client() else {
            eprintln!("Skipping: GITHUB_TOKEN or COMMIT_HEADLESS_TEST_OWNER/REPO not set");
            return;
        };

        let err = client
            .get_branch_head("definitely-does-not-exist-xyz-123")
            .await
            .unwrap_err();
        assert!(matches!(err, ForgeError::NoRemoteBranch { .. }));
    }
}
