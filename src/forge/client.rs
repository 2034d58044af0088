//! forge::client
//!
//! Replays [`Change`]s as remote commits through the git-data capabilities.
//!
//! # Write algorithm
//!
//! For one change on top of remote commit `head`:
//!
//! 1. Read `head` to learn its tree (the base tree).
//! 2. Create a blob for every file with content.
//! 3. Create a tree from the base tree plus one entry per path. Deleted
//!    paths are sent without a blob id, which removes them.
//! 4. Create a commit with that tree and `head` as its only parent.
//! 5. Move the branch ref to the new commit, fast-forward only unless the
//!    client is forcing.
//!
//! Each step's failure is annotated with the step name. Nothing is retried
//! and nothing already written is rolled back.
//!
//! # Dry run
//!
//! A dry-run client returns a placeholder id of zeros, as long as the local
//! commit hash, from [`RemoteClient::push_change`] without touching the
//! network. Read-side checks elsewhere in the session still run.

use std::sync::Arc;

use thiserror::Error;

use super::traits::{
    BranchApi, CreateCommitRequest, ForgeError, GitDataApi, RemoteApi, TreeEntry, WriteStep,
};
use crate::core::change::Change;
use crate::core::types::BranchName;

/// A fully applied list of changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushResult {
    /// Number of changes written
    pub pushed: usize,
    /// Remote id of the last commit written
    pub head: String,
}

/// A push that stopped partway.
///
/// No head is reported: the branch points at whatever the last successful
/// ref update left it at.
#[derive(Debug, Error)]
#[error("stopped after {pushed} change(s)")]
pub struct PartialPush {
    /// Changes applied before the failing one
    pub pushed: usize,
    /// Why the next change failed
    #[source]
    pub source: ForgeError,
}

/// Remote client bound to one branch.
#[derive(Clone)]
pub struct RemoteClient {
    api: Arc<dyn RemoteApi>,
    branch: BranchName,
    dry_run: bool,
    force: bool,
}

impl std::fmt::Debug for RemoteClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteClient")
            .field("branch", &self.branch)
            .field("dry_run", &self.dry_run)
            .field("force", &self.force)
            .finish()
    }
}

impl RemoteClient {
    /// Create a live, fast-forward-only client for `branch`.
    pub fn new(api: Arc<dyn RemoteApi>, branch: BranchName) -> Self {
        Self {
            api,
            branch,
            dry_run: false,
            force: false,
        }
    }

    /// Suppress every remote write.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Force ref updates instead of requiring fast-forward.
    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn branch(&self) -> &BranchName {
        &self.branch
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Current head commit of the branch.
    ///
    /// # Errors
    ///
    /// - [`ForgeError::NoRemoteBranch`] if the branch does not exist
    pub async fn get_head_commit_hash(&self) -> Result<String, ForgeError> {
        self.api.get_branch_head(self.branch.as_str()).await
    }

    /// Create the branch at `head_sha`, returning the id it points at.
    ///
    /// In dry-run mode the ref is not created, but `head_sha` is still looked
    /// up so a missing branch point is reported.
    ///
    /// # Errors
    ///
    /// - [`ForgeError::BranchPointMissing`] if `head_sha` does not exist remotely
    pub async fn create_branch(&self, head_sha: &str) -> Result<String, ForgeError> {
        if self.dry_run {
            return match self.api.get_commit_tree(head_sha).await {
                Ok(_) => Ok(head_sha.to_string()),
                Err(ForgeError::NotFound(_)) => Err(ForgeError::BranchPointMissing {
                    sha: head_sha.to_string(),
                }),
                Err(e) => Err(e),
            };
        }

        let created = self
            .api
            .create_branch(self.branch.as_str(), head_sha)
            .await?;
        tracing::info!(branch = %self.branch, head = %created, "created remote branch");
        Ok(created)
    }

    /// Write `change` as a new remote commit on top of `head`.
    ///
    /// Returns the new commit id.
    pub async fn push_change(&self, head: &str, change: &Change) -> Result<String, ForgeError> {
        if self.dry_run {
            tracing::debug!(commit = change.hash(), "dry run, skipping remote writes");
            return Ok("0".repeat(change.hash().len()));
        }

        let base_tree = self
            .api
            .get_commit_tree(head)
            .await
            .map_err(|e| e.at(WriteStep::FetchParentTree))?;

        let mut paths: Vec<_> = change.entries().iter().collect();
        paths.sort_by(|a, b| a.0.cmp(b.0));

        let mut entries = Vec::with_capacity(paths.len());
        for (path, entry) in paths {
            let mode = entry.effective_mode();
            match &entry.content {
                Some(content) => {
                    let blob = self
                        .api
                        .create_blob(content)
                        .await
                        .map_err(|e| {
                            e.at(WriteStep::CreateBlob {
                                path: path.to_string(),
                            })
                        })?;
                    entries.push(TreeEntry::blob(path.as_str(), mode, blob));
                }
                None => entries.push(TreeEntry::deletion(path.as_str(), mode)),
            }
        }

        let tree = self
            .api
            .create_tree(&base_tree, &entries)
            .await
            .map_err(|e| e.at(WriteStep::CreateTree))?;

        let commit = self
            .api
            .create_commit(CreateCommitRequest {
                message: change.remote_message(),
                tree,
                parents: vec![head.to_string()],
            })
            .await
            .map_err(|e| e.at(WriteStep::CreateCommit))?;

        self.api
            .update_ref(self.branch.as_str(), &commit, self.force)
            .await
            .map_err(|e| e.at(WriteStep::UpdateRef))?;

        tracing::info!(
            local = change.hash(),
            remote = %commit,
            files = entries.len(),
            "pushed change"
        );
        Ok(commit)
    }

    /// Push `changes` in order, each on top of the previous result.
    ///
    /// Stops at the first failure.
    pub async fn push_changes(
        &self,
        head: &str,
        changes: &[Change],
    ) -> Result<PushResult, PartialPush> {
        let mut head = head.to_string();
        for (pushed, change) in changes.iter().enumerate() {
            head = self
                .push_change(&head, change)
                .await
                .map_err(|source| PartialPush { pushed, source })?;
        }
        Ok(PushResult {
            pushed: changes.len(),
            head,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::change::FileEntry;
    use crate::forge::mock::{FailOn, MockOperation, MockRemote};

    fn branch() -> BranchName {
        BranchName::new("main").unwrap()
    }

    fn client(remote: &MockRemote) -> RemoteClient {
        RemoteClient::new(Arc::new(remote.clone()), branch())
    }

    fn change(hash: &str, message: &str, entries: Vec<(&str, FileEntry)>) -> Change {
        Change::builder(hash)
            .message(message)
            .entries(entries.into_iter().map(|(p, e)| (p.to_string(), e)).collect())
            .build()
    }

    #[tokio::test]
    async fn dry_run_returns_zeros_without_calls() {
        let remote = MockRemote::new();
        let client = client(&remote).dry_run(true);
        let c = change("abc123", "subject", vec![("a", FileEntry::file(b"x".to_vec(), ""))]);

        let result = client.push_change("whatever", &c).await.unwrap();
        assert_eq!(result, "000000");
        assert!(remote.operations().is_empty());
    }

    #[tokio::test]
    async fn push_change_writes_all_objects() {
        let remote = MockRemote::new();
        let root = remote.seed_branch("main", &[("a.txt", "a"), ("b.txt", "b")]);
        let c = change(
            &"1".repeat(40),
            "Edit a\n\nbody",
            vec![
                ("a.txt", FileEntry::file(b"A".to_vec(), "100644")),
                ("b.txt", FileEntry::deleted()),
            ],
        );

        let new_head = client(&remote).push_change(&root, &c).await.unwrap();

        assert_eq!(remote.head("main").as_deref(), Some(new_head.as_str()));
        let commit = remote.commit(&new_head).unwrap();
        assert_eq!(commit.parents, vec![root]);
        assert_eq!(commit.message, "Edit a\n\nbody");

        let files = remote.files_at(&new_head).unwrap();
        assert_eq!(files.keys().collect::<Vec<_>>(), vec!["a.txt"]);

        let blobs = remote
            .operations()
            .into_iter()
            .filter(|op| matches!(op, MockOperation::CreateBlob { .. }))
            .count();
        assert_eq!(blobs, 1);
    }

    #[tokio::test]
    async fn deletion_entry_has_no_blob() {
        let remote = MockRemote::new();
        let root = remote.seed_branch("main", &[("gone.txt", "x")]);
        let c = change(&"2".repeat(40), "rm", vec![("gone.txt", FileEntry::deleted())]);

        client(&remote).push_change(&root, &c).await.unwrap();

        let tree_entries = remote
            .operations()
            .into_iter()
            .find_map(|op| match op {
                MockOperation::CreateTree { entries, .. } => Some(entries),
                _ => None,
            })
            .unwrap();
        assert_eq!(tree_entries, vec![TreeEntry::deletion("gone.txt", "100644")]);
    }

    #[tokio::test]
    async fn step_failures_are_named() {
        let cases = [
            (FailOn::GetCommitTree(ForgeError::RateLimited), WriteStep::FetchParentTree),
            (
                FailOn::CreateBlob(ForgeError::RateLimited),
                WriteStep::CreateBlob { path: "f".into() },
            ),
            (FailOn::CreateTree(ForgeError::RateLimited), WriteStep::CreateTree),
            (FailOn::CreateCommit(ForgeError::RateLimited), WriteStep::CreateCommit),
            (FailOn::UpdateRef(ForgeError::RateLimited), WriteStep::UpdateRef),
        ];

        for (fail_on, step) in cases {
            let remote = MockRemote::new();
            let root = remote.seed_branch("main", &[]);
            let remote = remote.fail_on(fail_on);
            let c = change(
                &"3".repeat(40),
                "x",
                vec![("f", FileEntry::file(b"f".to_vec(), ""))],
            );

            let err = client(&remote).push_change(&root, &c).await.unwrap_err();
            assert!(
                err.to_string().starts_with(&step.to_string()),
                "expected '{step}' in '{err}'"
            );
            assert_eq!(err.step(), Some(&step));
            assert!(matches!(err.root(), ForgeError::RateLimited));
        }
    }

    #[tokio::test]
    async fn push_changes_stops_at_first_failure() {
        let remote = MockRemote::new();
        let root = remote.seed_branch("main", &[]);
        let remote = remote.fail_on_after(FailOn::CreateCommit(ForgeError::RateLimited), 1);

        let changes: Vec<_> = (1..=3)
            .map(|i| {
                change(
                    &i.to_string().repeat(40),
                    &format!("change {i}"),
                    vec![("f", FileEntry::file(i.to_string().into_bytes(), ""))],
                )
            })
            .collect();

        let err = client(&remote)
            .push_changes(&root, &changes)
            .await
            .unwrap_err();
        assert_eq!(err.pushed, 1);

        let creates = remote
            .operations()
            .into_iter()
            .filter(|op| matches!(op, MockOperation::CreateCommit { .. }))
            .count();
        assert_eq!(creates, 2);
    }

    #[tokio::test]
    async fn forced_client_rewrites_history() {
        let remote = MockRemote::new();
        let base = remote.seed_branch("main", &[("a", "1")]);
        let first = client(&remote)
            .push_change(&base, &change(&"4".repeat(40), "one", vec![("a", FileEntry::file(b"2".to_vec(), ""))]))
            .await
            .unwrap();
        assert_eq!(remote.head("main"), Some(first));

        let replacement = change(&"5".repeat(40), "two", vec![("a", FileEntry::file(b"3".to_vec(), ""))]);
        assert!(client(&remote).push_change(&base, &replacement).await.is_err());

        let rewritten = client(&remote)
            .force(true)
            .push_change(&base, &replacement)
            .await
            .unwrap();
        assert_eq!(remote.head("main"), Some(rewritten));
    }

    #[tokio::test]
    async fn dry_run_create_branch_checks_branch_point() {
        let remote = MockRemote::new();
        let root = remote.seed_branch("main", &[]);
        let client = RemoteClient::new(Arc::new(remote.clone()), BranchName::new("feature").unwrap())
            .dry_run(true);

        assert_eq!(client.create_branch(&root).await.unwrap(), root);
        assert!(matches!(
            client.create_branch(&"f".repeat(40)).await,
            Err(ForgeError::BranchPointMissing { .. })
        ));
        assert_eq!(remote.head("feature"), None);
        assert_eq!(remote.write_count(), 0);
    }
}
