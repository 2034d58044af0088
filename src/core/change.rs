//! core::change
//!
//! The unit of replication: one local commit's worth of file changes plus
//! the metadata needed to recreate it on the remote.
//!
//! # Deletion vs. empty file
//!
//! A [`FileEntry`] with `content == None` removes the path. A present but
//! zero-length `content` is an existing, empty file. The two must never be
//! conflated; the remote write path relies on the distinction.
//!
//! # Message composition
//!
//! The raw message is split on the first blank line. The part before it is
//! the headline; the rest is the body, to which a `Co-authored-by:` trailer
//! for the original author and any configured trailers are appended. A
//! trailer is skipped when its text already appears in the body (compared
//! case-insensitively). The headline never counts as a trailer.
//!
//! # Example
//!
//! ```
//! use commit_headless::core::change::{Change, FileEntry};
//!
//! let change = Change::builder("0123abcd")
//!     .author("A U Thor <author@example.com>")
//!     .message("Fix the thing\n\nLonger explanation.")
//!     .entry("src/lib.rs", FileEntry::file(b"fn main() {}".to_vec(), "100644"))
//!     .entry("old.txt", FileEntry::deleted())
//!     .build();
//!
//! assert_eq!(change.headline(), "Fix the thing");
//! assert_eq!(
//!     change.body(),
//!     "Longer explanation.\n\nCo-authored-by: A U Thor <author@example.com>"
//! );
//! ```

use std::collections::HashMap;
use std::fmt;

use thiserror::Error;

/// Mode used for tree entries whose mode was never recorded.
pub const REGULAR_FILE_MODE: &str = "100644";

/// Author substituted when a commit's author header can't be parsed.
pub const PLACEHOLDER_AUTHOR: &str = "Commit Headless <commit-headless-bot@users.noreply.github.com>";

/// Errors from parsing change metadata.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChangeError {
    #[error("invalid trailer '{0}': expected 'Key: Value'")]
    InvalidTrailer(String),
}

/// Content and mode for one path in a [`Change`].
#[derive(Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// File bytes, or `None` when the path is deleted.
    pub content: Option<Vec<u8>>,
    /// Octal git mode (e.g. `100644`). Empty means unset.
    pub mode: String,
}

impl FileEntry {
    /// An added or modified file.
    pub fn file(content: Vec<u8>, mode: impl Into<String>) -> Self {
        Self {
            content: Some(content),
            mode: mode.into(),
        }
    }

    /// A removed path.
    pub fn deleted() -> Self {
        Self {
            content: None,
            mode: String::new(),
        }
    }

    /// Whether this entry removes its path.
    pub fn is_deletion(&self) -> bool {
        self.content.is_none()
    }

    /// The mode to write, falling back to [`REGULAR_FILE_MODE`].
    pub fn effective_mode(&self) -> &str {
        if self.mode.is_empty() {
            REGULAR_FILE_MODE
        } else {
            &self.mode
        }
    }
}

// Content can be large or binary; only its size is useful in logs.
impl fmt::Debug for FileEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileEntry")
            .field("content_len", &self.content.as_ref().map(Vec::len))
            .field("mode", &self.mode)
            .finish()
    }
}

/// A `Key: Value` line appended to a commit body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trailer {
    key: String,
    value: String,
}

impl Trailer {
    /// Parse a trailer from its `Key: Value` form.
    ///
    /// # Errors
    ///
    /// Returns [`ChangeError::InvalidTrailer`] when there is no `": "`
    /// separator or the key is empty or contains whitespace.
    pub fn parse(text: &str) -> Result<Self, ChangeError> {
        let (key, value) = text
            .split_once(": ")
            .ok_or_else(|| ChangeError::InvalidTrailer(text.to_string()))?;
        let (key, value) = (key.trim(), value.trim());
        if key.is_empty() || key.contains(char::is_whitespace) || value.is_empty() {
            return Err(ChangeError::InvalidTrailer(text.to_string()));
        }
        Ok(Self {
            key: key.to_string(),
            value: value.to_string(),
        })
    }

    /// A `Co-authored-by:` trailer crediting `author`.
    pub fn co_authored_by(author: &str) -> Self {
        Self {
            key: "Co-authored-by".to_string(),
            value: author.to_string(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

impl fmt::Display for Trailer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.key, self.value)
    }
}

/// One replicated commit.
///
/// Built once from local history (or the staging area) and consumed by the
/// remote writer. There are no mutators after [`ChangeBuilder::build`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    hash: String,
    author: String,
    message: String,
    trailers: Vec<Trailer>,
    entries: HashMap<String, FileEntry>,
}

impl Change {
    /// Start building a change for the source commit `hash`.
    pub fn builder(hash: impl Into<String>) -> ChangeBuilder {
        ChangeBuilder {
            change: Change {
                hash: hash.into(),
                author: String::new(),
                message: String::new(),
                trailers: Vec::new(),
                entries: HashMap::new(),
            },
        }
    }

    /// Source commit id. Informational only on the remote.
    pub fn hash(&self) -> &str {
        &self.hash
    }

    /// `Name <email>` of the original author, possibly empty.
    pub fn author(&self) -> &str {
        &self.author
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn trailers(&self) -> &[Trailer] {
        &self.trailers
    }

    /// Path → entry map. Iteration order is unspecified.
    pub fn entries(&self) -> &HashMap<String, FileEntry> {
        &self.entries
    }

    fn split_message(&self) -> (&str, &str) {
        self.message
            .split_once("\n\n")
            .unwrap_or((self.message.as_str(), ""))
    }

    /// Text before the first blank line of the message.
    pub fn headline(&self) -> &str {
        self.split_message().0
    }

    /// Text after the first blank line, followed by trailers.
    ///
    /// The author's `Co-authored-by:` trailer comes first, then configured
    /// trailers in order. Each is added only if the body does not already
    /// contain it, ignoring case.
    pub fn body(&self) -> String {
        let mut body = self.split_message().1.trim().to_string();

        let author = (!self.author.is_empty()).then(|| Trailer::co_authored_by(&self.author));
        let mut lines: Vec<String> = Vec::new();
        for trailer in author.iter().chain(self.trailers.iter()) {
            let text = trailer.to_string();
            let haystack = format!("{}\n{}", body, lines.join("\n")).to_lowercase();
            if !haystack.contains(&text.to_lowercase()) {
                lines.push(text);
            }
        }

        if !lines.is_empty() {
            body.push_str("\n\n");
            body.push_str(&lines.join("\n"));
        }
        body.trim().to_string()
    }

    /// The full message written to the remote commit.
    pub fn remote_message(&self) -> String {
        let body = self.body();
        if body.is_empty() {
            self.headline().to_string()
        } else {
            format!("{}\n\n{}", self.headline(), body)
        }
    }

    /// Reopen a built change, e.g. to attach invocation trailers.
    pub fn into_builder(self) -> ChangeBuilder {
        ChangeBuilder { change: self }
    }
}

/// Builder for [`Change`].
#[derive(Debug)]
pub struct ChangeBuilder {
    change: Change,
}

impl ChangeBuilder {
    pub fn author(mut self, author: impl Into<String>) -> Self {
        self.change.author = author.into();
        self
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.change.message = message.into();
        self
    }

    pub fn trailers(mut self, trailers: impl IntoIterator<Item = Trailer>) -> Self {
        self.change.trailers.extend(trailers);
        self
    }

    pub fn entry(mut self, path: impl Into<String>, entry: FileEntry) -> Self {
        self.change.entries.insert(path.into(), entry);
        self
    }

    pub fn entries(mut self, entries: HashMap<String, FileEntry>) -> Self {
        self.change.entries.extend(entries);
        self
    }

    pub fn build(self) -> Change {
        self.change
    }
}

/// Summarize change hashes for display: the first ten, then a count.
///
/// ```
/// use commit_headless::core::change::summarize_hashes;
///
/// let hashes: Vec<String> = (0..12).map(|i| format!("h{i}")).collect();
/// let summary = summarize_hashes(hashes.iter().map(String::as_str));
/// assert!(summary.ends_with("h9, ...and 2 more."));
/// ```
pub fn summarize_hashes<'a>(hashes: impl ExactSizeIterator<Item = &'a str>) -> String {
    const SHOWN: usize = 10;
    let total = hashes.len();
    let mut parts: Vec<String> = hashes.take(SHOWN).map(str::to_string).collect();
    if total > SHOWN {
        parts.push(format!("...and {} more.", total - SHOWN));
    }
    parts.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn change(message: &str, author: &str, trailers: &[&str]) -> Change {
        Change::builder("abc123")
            .message(message)
            .author(author)
            .trailers(trailers.iter().map(|t| Trailer::parse(t).unwrap()))
            .build()
    }

    #[test]
    fn headline_and_body_table() {
        let cases: &[(&str, &str, &[&str], &str, &str)] = &[
            (
                "subject\n\nbody\n\nco-authored-by: author",
                "author",
                &[],
                "subject",
                "body\n\nco-authored-by: author",
            ),
            ("subject only", "", &[], "subject only", ""),
            (
                "no trailers and no author\n\nbody",
                "",
                &[],
                "no trailers and no author",
                "body",
            ),
            (
                "no trailers with author",
                "author",
                &[],
                "no trailers with author",
                "Co-authored-by: author",
            ),
            (
                "no trailers with author and body\n\nbody",
                "author",
                &[],
                "no trailers with author and body",
                "body\n\nCo-authored-by: author",
            ),
            // A headline shaped like a trailer is still a headline.
            (
                "Co-authored-by: subject",
                "author",
                &[],
                "Co-authored-by: subject",
                "Co-authored-by: author",
            ),
            (
                "subject\n\nbody",
                "author",
                &["Foo: bar"],
                "subject",
                "body\n\nCo-authored-by: author\nFoo: bar",
            ),
        ];

        for (message, author, trailers, headline, body) in cases {
            let c = change(message, author, trailers);
            assert_eq!(c.headline(), *headline, "headline for {message:?}");
            assert_eq!(c.body(), *body, "body for {message:?}");
        }
    }

    #[test]
    fn body_is_idempotent() {
        let c = change("subject\n\nbody", "A <a@b.c>", &["Signed-off-by: X <x@y.z>"]);
        assert_eq!(c.body(), c.body());
    }

    #[test]
    fn trailer_already_present_is_not_repeated() {
        let c = change(
            "subject\n\nbody\n\nSIGNED-OFF-BY: x <x@y.z>",
            "",
            &["Signed-off-by: x <x@y.z>"],
        );
        assert_eq!(c.body(), "body\n\nSIGNED-OFF-BY: x <x@y.z>");
    }

    #[test]
    fn duplicate_configured_trailers_collapse() {
        let c = change("subject", "", &["Foo: bar", "foo: BAR"]);
        assert_eq!(c.body(), "Foo: bar");
    }

    #[test]
    fn remote_message_omits_empty_body() {
        assert_eq!(change("Subject only", "", &[]).remote_message(), "Subject only");
        assert_eq!(
            change("Headline\n\nBody text", "", &[]).remote_message(),
            "Headline\n\nBody text"
        );
    }

    #[test]
    fn trailer_parse() {
        let t = Trailer::parse("Reviewed-by: Someone <s@example.com>").unwrap();
        assert_eq!(t.key(), "Reviewed-by");
        assert_eq!(t.value(), "Someone <s@example.com>");
        assert!(Trailer::parse("no separator").is_err());
        assert!(Trailer::parse(": value").is_err());
        assert!(Trailer::parse("Key:").is_err());
        assert!(Trailer::parse("Key:Value").is_err());
        assert_eq!(Trailer::parse("Key: a: b").unwrap().value(), "a: b");
        assert!(Trailer::parse("two words: value").is_err());
    }

    #[test]
    fn file_entry_modes() {
        assert_eq!(FileEntry::deleted().effective_mode(), REGULAR_FILE_MODE);
        assert_eq!(FileEntry::file(vec![], "").effective_mode(), REGULAR_FILE_MODE);
        assert_eq!(FileEntry::file(vec![], "100755").effective_mode(), "100755");
    }

    #[test]
    fn empty_file_is_not_a_deletion() {
        assert!(!FileEntry::file(Vec::new(), "100644").is_deletion());
        assert!(FileEntry::deleted().is_deletion());
    }

    #[test]
    fn summarize_short_list() {
        let hashes = ["a", "b"];
        assert_eq!(summarize_hashes(hashes.iter().copied()), "a, b");
    }
}
