//! forge::mock
//!
//! Mock remote implementation for deterministic testing.
//!
//! # Design
//!
//! The mock keeps a small in-memory object store (blobs, flattened trees,
//! commits and branch refs) and implements both [`BranchApi`] and
//! [`GitDataApi`] over it. Object ids are SHA-256 digests of the object's
//! content, truncated to 40 hex characters, so identical writes produce
//! identical ids. Ref updates enforce fast-forward unless forced.
//!
//! Failures can be injected per operation, optionally after a number of
//! successful calls, and every call is recorded for later assertions.
//!
//! # Example
//!
//! ```
//! use commit_headless::forge::mock::MockRemote;
//! use commit_headless::forge::BranchApi;
//!
//! # tokio_test::block_on(async {
//! let remote = MockRemote::new();
//! let root = remote.seed_branch("main", &[("README.md", "hello")]);
//!
//! assert_eq!(remote.get_branch_head("main").await.unwrap(), root);
//! # });
//! ```

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use super::traits::{BranchApi, CreateCommitRequest, ForgeError, GitDataApi, TreeEntry};

/// Flattened tree: path to (mode, blob id).
type MockTree = BTreeMap<String, (String, String)>;

/// Mock remote for testing.
///
/// Thread-safe via internal `Arc<Mutex<...>>` wrapping; clones share state.
#[derive(Debug, Clone, Default)]
pub struct MockRemote {
    /// Internal state shared across clones.
    inner: Arc<Mutex<MockRemoteInner>>,
}

/// Internal mutable state.
#[derive(Debug, Default)]
struct MockRemoteInner {
    blobs: HashMap<String, Vec<u8>>,
    trees: HashMap<String, MockTree>,
    commits: HashMap<String, MockCommit>,
    branches: HashMap<String, String>,
    /// Operation to fail on, and how many matching calls succeed first.
    fail_on: Option<(FailOn, usize)>,
    /// Recorded operations for verification.
    operations: Vec<MockOperation>,
}

/// A commit object stored by the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockCommit {
    pub message: String,
    pub tree: String,
    pub parents: Vec<String>,
}

/// Configuration for which operation should fail.
#[derive(Debug, Clone)]
pub enum FailOn {
    GetBranchHead(ForgeError),
    CreateBranch(ForgeError),
    GetCommitTree(ForgeError),
    CreateBlob(ForgeError),
    CreateTree(ForgeError),
    CreateCommit(ForgeError),
    UpdateRef(ForgeError),
}

impl FailOn {
    fn matches(&self, op: &MockOperation) -> Option<&ForgeError> {
        match (self, op) {
            (FailOn::GetBranchHead(e), MockOperation::GetBranchHead { .. })
            | (FailOn::CreateBranch(e), MockOperation::CreateBranch { .. })
            | (FailOn::GetCommitTree(e), MockOperation::GetCommitTree { .. })
            | (FailOn::CreateBlob(e), MockOperation::CreateBlob { .. })
            | (FailOn::CreateTree(e), MockOperation::CreateTree { .. })
            | (FailOn::CreateCommit(e), MockOperation::CreateCommit { .. })
            | (FailOn::UpdateRef(e), MockOperation::UpdateRef { .. }) => Some(e),
            _ => None,
        }
    }
}

/// Recorded operation for test verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockOperation {
    GetBranchHead {
        branch: String,
    },
    CreateBranch {
        branch: String,
        sha: String,
    },
    GetCommitTree {
        sha: String,
    },
    CreateBlob {
        content: Vec<u8>,
    },
    CreateTree {
        base_tree: String,
        entries: Vec<TreeEntry>,
    },
    CreateCommit {
        request: CreateCommitRequest,
    },
    UpdateRef {
        branch: String,
        sha: String,
        force: bool,
    },
}

impl MockOperation {
    /// Whether the operation writes to the remote.
    pub fn is_write(&self) -> bool {
        !matches!(
            self,
            MockOperation::GetBranchHead { .. } | MockOperation::GetCommitTree { .. }
        )
    }
}

fn object_id(kind: &str, parts: &[&[u8]]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(kind.as_bytes());
    for part in parts {
        hasher.update((part.len() as u64).to_be_bytes());
        hasher.update(part);
    }
    let mut id = hex::encode(hasher.finalize());
    id.truncate(40);
    id
}

fn tree_id(tree: &MockTree) -> String {
    let flat: Vec<u8> = tree
        .iter()
        .flat_map(|(path, (mode, blob))| {
            [path.as_bytes(), &b"\0"[..], mode.as_bytes(), &b"\0"[..], blob.as_bytes(), &b"\n"[..]]
                .concat()
        })
        .collect();
    object_id("tree", &[&flat])
}

fn unprocessable(message: impl Into<String>) -> ForgeError {
    ForgeError::ApiError {
        status: 422,
        message: message.into(),
    }
}

impl MockRemoteInner {
    fn is_ancestor(&self, ancestor: &str, descendant: &str) -> bool {
        let mut pending = vec![descendant.to_string()];
        while let Some(sha) = pending.pop() {
            if sha == ancestor {
                return true;
            }
            if let Some(commit) = self.commits.get(&sha) {
                pending.extend(commit.parents.iter().cloned());
            }
        }
        false
    }
}

impl MockRemote {
    /// Create a new empty mock remote.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create `branch` with one root commit holding `files`, returning its id.
    pub fn seed_branch(&self, branch: &str, files: &[(&str, &str)]) -> String {
        let mut inner = self.state();

        let mut tree = MockTree::new();
        for (path, content) in files {
            let blob = object_id("blob", &[content.as_bytes()]);
            inner.blobs.insert(blob.clone(), content.as_bytes().to_vec());
            tree.insert(path.to_string(), ("100644".to_string(), blob));
        }
        let tree_sha = tree_id(&tree);
        inner.trees.insert(tree_sha.clone(), tree);

        let message = format!("seed {}", branch);
        let commit = object_id("commit", &[tree_sha.as_bytes(), message.as_bytes()]);
        inner.commits.insert(
            commit.clone(),
            MockCommit {
                message,
                tree: tree_sha,
                parents: Vec::new(),
            },
        );
        inner.branches.insert(branch.to_string(), commit.clone());
        commit
    }

    /// Configure the mock to fail on a specific operation.
    ///
    /// # Example
    ///
    /// ```
    /// use commit_headless::forge::mock::{MockRemote, FailOn};
    /// use commit_headless::forge::ForgeError;
    ///
    /// let remote = MockRemote::new()
    ///     .fail_on(FailOn::CreateBlob(ForgeError::RateLimited));
    /// ```
    pub fn fail_on(self, fail_on: FailOn) -> Self {
        self.fail_on_after(fail_on, 0)
    }

    /// Fail the matching operation after `successes` calls to it have succeeded.
    pub fn fail_on_after(self, fail_on: FailOn, successes: usize) -> Self {
        {
            let mut inner = self.state();
            inner.fail_on = Some((fail_on, successes));
        }
        self
    }

    /// Clear the failure configuration.
    pub fn clear_fail_on(&self) {
        let mut inner = self.state();
        inner.fail_on = None;
    }

    /// Get all recorded operations.
    pub fn operations(&self) -> Vec<MockOperation> {
        let inner = self.state();
        inner.operations.clone()
    }

    /// Number of recorded operations that write to the remote.
    pub fn write_count(&self) -> usize {
        self.operations().iter().filter(|op| op.is_write()).count()
    }

    /// Current head of `branch` (for test verification).
    pub fn head(&self, branch: &str) -> Option<String> {
        let inner = self.state();
        inner.branches.get(branch).cloned()
    }

    /// A stored commit (for test verification).
    pub fn commit(&self, sha: &str) -> Option<MockCommit> {
        let inner = self.state();
        inner.commits.get(sha).cloned()
    }

    /// Files in the tree of commit `sha`, with contents.
    pub fn files_at(&self, sha: &str) -> Option<BTreeMap<String, Vec<u8>>> {
        let inner = self.state();
        let commit = inner.commits.get(sha)?;
        let tree = inner.trees.get(&commit.tree)?;
        tree.iter()
            .map(|(path, (_, blob))| Some((path.clone(), inner.blobs.get(blob)?.clone())))
            .collect()
    }

    // A panicking test must not poison the store for the next assertion.
    fn state(&self) -> MutexGuard<'_, MockRemoteInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record an operation and return the injected failure for it, if any.
    fn record(&self, op: MockOperation) -> Result<(), ForgeError> {
        let mut inner = self.state();
        let failure = match &mut inner.fail_on {
            Some((fail_on, remaining)) => match fail_on.matches(&op) {
                Some(_) if *remaining > 0 => {
                    *remaining -= 1;
                    None
                }
                Some(err) => Some(err.clone()),
                None => None,
            },
            None => None,
        };
        inner.operations.push(op);
        match failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl BranchApi for MockRemote {
    async fn get_branch_head(&self, branch: &str) -> Result<String, ForgeError> {
        self.record(MockOperation::GetBranchHead {
            branch: branch.to_string(),
        })?;

        let inner = self.state();
        inner
            .branches
            .get(branch)
            .cloned()
            .ok_or_else(|| ForgeError::NoRemoteBranch {
                branch: branch.to_string(),
            })
    }

    async fn create_branch(&self, branch: &str, sha: &str) -> Result<String, ForgeError> {
        self.record(MockOperation::CreateBranch {
            branch: branch.to_string(),
            sha: sha.to_string(),
        })?;

        let mut inner = self.state();
        if inner.branches.contains_key(branch) {
            return Err(unprocessable("Reference already exists"));
        }
        if !inner.commits.contains_key(sha) {
            return Err(ForgeError::BranchPointMissing {
                sha: sha.to_string(),
            });
        }
        inner.branches.insert(branch.to_string(), sha.to_string());
        Ok(sha.to_string())
    }
}

#[async_trait]
impl GitDataApi for MockRemote {
    async fn get_commit_tree(&self, sha: &str) -> Result<String, ForgeError> {
        self.record(MockOperation::GetCommitTree {
            sha: sha.to_string(),
        })?;

        let inner = self.state();
        inner
            .commits
            .get(sha)
            .map(|c| c.tree.clone())
            .ok_or_else(|| ForgeError::NotFound(format!("commit {}", sha)))
    }

    async fn create_blob(&self, content: &[u8]) -> Result<String, ForgeError> {
        self.record(MockOperation::CreateBlob {
            content: content.to_vec(),
        })?;

        let mut inner = self.state();
        let sha = object_id("blob", &[content]);
        inner.blobs.insert(sha.clone(), content.to_vec());
        Ok(sha)
    }

    async fn create_tree(
        &self,
        base_tree: &str,
        entries: &[TreeEntry],
    ) -> Result<String, ForgeError> {
        self.record(MockOperation::CreateTree {
            base_tree: base_tree.to_string(),
            entries: entries.to_vec(),
        })?;

        let mut inner = self.state();
        let mut tree = inner
            .trees
            .get(base_tree)
            .cloned()
            .ok_or_else(|| unprocessable(format!("base_tree {} does not exist", base_tree)))?;

        for entry in entries {
            match &entry.sha {
                Some(blob) => {
                    if !inner.blobs.contains_key(blob) {
                        return Err(unprocessable(format!("blob {} does not exist", blob)));
                    }
                    tree.insert(entry.path.clone(), (entry.mode.clone(), blob.clone()));
                }
                None => {
                    tree.remove(&entry.path);
                }
            }
        }

        let sha = tree_id(&tree);
        inner.trees.insert(sha.clone(), tree);
        Ok(sha)
    }

    async fn create_commit(&self, request: CreateCommitRequest) -> Result<String, ForgeError> {
        self.record(MockOperation::CreateCommit {
            request: request.clone(),
        })?;

        let mut inner = self.state();
        if !inner.trees.contains_key(&request.tree) {
            return Err(unprocessable(format!("tree {} does not exist", request.tree)));
        }
        if let Some(missing) = request.parents.iter().find(|p| !inner.commits.contains_key(*p)) {
            return Err(unprocessable(format!("parent {} does not exist", missing)));
        }

        let parents = request.parents.join(",");
        let sha = object_id(
            "commit",
            &[
                request.tree.as_bytes(),
                parents.as_bytes(),
                request.message.as_bytes(),
            ],
        );
        inner.commits.insert(
            sha.clone(),
            MockCommit {
                message: request.message,
                tree: request.tree,
                parents: request.parents,
            },
        );
        Ok(sha)
    }

    async fn update_ref(&self, branch: &str, sha: &str, force: bool) -> Result<(), ForgeError> {
        self.record(MockOperation::UpdateRef {
            branch: branch.to_string(),
            sha: sha.to_string(),
            force,
        })?;

        let mut inner = self.state();
        let current = inner
            .branches
            .get(branch)
            .cloned()
            .ok_or_else(|| unprocessable("Reference does not exist"))?;
        if !inner.commits.contains_key(sha) {
            return Err(unprocessable(format!("Object {} does not exist", sha)));
        }
        if !force && !inner.is_ancestor(&current, sha) {
            return Err(unprocessable("Update is not a fast forward"));
        }
        inner.branches.insert(branch.to_string(), sha.to_string());
        Ok(())
    }
}
