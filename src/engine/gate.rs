//! engine::gate
//!
//! Pre-flight checks for a push session.
//!
//! Every check here runs before the first remote write, in dry-run mode
//! as well as live, so a user gets the same feedback either way.
//!
//! # Invariants
//!
//! - An explicit head sha is a full 40-character hex SHA-1
//! - Branch creation always has a starting point
//! - An explicit head sha equals the live remote head unless the branch is
//!   being created

use super::push::PushError;
use crate::core::types::is_full_sha1;

/// Normalize and validate an explicit `--head-sha`.
///
/// Returns the lowercased sha. Abbreviations are rejected because the
/// remote cannot resolve them.
///
/// # Example
///
/// ```
/// use commit_headless::engine::gate::validate_head_sha;
///
/// let sha = validate_head_sha("F8034FE40034A602C232B8CBE06AB79E518F71C1").unwrap();
/// assert_eq!(sha, "f8034fe40034a602c232b8cbe06ab79e518f71c1");
/// assert!(validate_head_sha("f8034fe").is_err());
/// ```
pub fn validate_head_sha(sha: &str) -> Result<String, PushError> {
    let normalized = sha.to_ascii_lowercase();
    if is_full_sha1(&normalized) {
        Ok(normalized)
    } else {
        Err(PushError::InvalidHeadShaFormat(sha.to_string()))
    }
}

/// Branch creation needs an explicit starting commit.
pub fn require_branch_point(head_sha: Option<&str>, create_branch: bool) -> Result<(), PushError> {
    if create_branch && head_sha.is_none() {
        return Err(PushError::MissingCreateBranchBase);
    }
    Ok(())
}

/// The expected head must be what the remote currently reports.
pub fn check_head_matches(expected: &str, actual: &str) -> Result<(), PushError> {
    if expected.eq_ignore_ascii_case(actual) {
        Ok(())
    } else {
        Err(PushError::HeadShaMismatch {
            expected: expected.to_string(),
            actual: actual.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod head_sha {
        use super::*;

        #[test]
        fn accepts_full_sha() {
            let sha = "a".repeat(40);
            assert_eq!(validate_head_sha(&sha).unwrap(), sha);
        }

        #[test]
        fn rejects_short_long_and_non_hex() {
            let cases = [
                String::new(),
                "abc123".to_string(),
                "a".repeat(39),
                "a".repeat(41),
                "g".repeat(40),
            ];
            for bad in &cases {
                assert!(
                    matches!(validate_head_sha(bad), Err(PushError::InvalidHeadShaFormat(_))),
                    "{bad:?} should be rejected"
                );
            }
        }
    }

    #[test]
    fn create_branch_needs_base() {
        assert!(matches!(
            require_branch_point(None, true),
            Err(PushError::MissingCreateBranchBase)
        ));
        assert!(require_branch_point(Some("abc"), true).is_ok());
        assert!(require_branch_point(None, false).is_ok());
    }

    #[test]
    fn head_mismatch_reports_both() {
        let err = check_head_matches(&"a".repeat(40), &"b".repeat(40)).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains(&"a".repeat(40)));
        assert!(msg.contains(&"b".repeat(40)));
        assert!(check_head_matches(&"a".repeat(40), &"A".repeat(40)).is_ok());
    }
}
