//! Reference transition classification.
//!
//! Git invokes the `update` hook as
//!   "update <refname> <old-oid> <new-oid>"
//! where a zero object id stands for "the reference does not exist" on that side.
//! Object ids are decoded with `ObjectId::from_hex()`; the zero sentinel may be 40 or 64 digits long.

use crate::Error;
use gix_hash::ObjectId;

/// A single reference transition as proposed by the pushing client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefTransition {
    /// Create a new reference pointing to `new`.
    Created { new: ObjectId, name: String },
    /// Move an existing reference from `old` to `new`, fast-forward or not.
    Updated { old: ObjectId, new: ObjectId, name: String },
    /// Delete an existing reference which pointed to `old`.
    Deleted { old: ObjectId, name: String },
}

impl RefTransition {
    /// Classify the three hook arguments.
    ///
    /// Invariants enforced:
    /// - Created: old is zero, new is non-zero
    /// - Deleted: new is zero, old is non-zero
    /// - Updated: old and new are non-zero
    /// - Both zero → invalid
    pub fn parse(name: &str, old_hex: &str, new_hex: &str) -> Result<Self, Error> {
        if name.is_empty() {
            return Err(Error::MalformedInvocation("missing <refname>".into()));
        }
        let old = parse_side(old_hex, "old")?;
        let new = parse_side(new_hex, "new")?;
        let name = name.to_owned();

        match (old, new) {
            (None, None) => Err(Error::MalformedInvocation(
                "both old and new are zero (invalid transition)".into(),
            )),
            (None, Some(new)) => Ok(RefTransition::Created { new, name }),
            (Some(old), None) => Ok(RefTransition::Deleted { old, name }),
            (Some(old), Some(new)) => Ok(RefTransition::Updated { old, new, name }),
        }
    }

    /// The refname targeted by this transition.
    pub fn name(&self) -> &str {
        match self {
            RefTransition::Created { name, .. }
            | RefTransition::Updated { name, .. }
            | RefTransition::Deleted { name, .. } => name,
        }
    }

    /// The state the reference had before the push, if it existed.
    pub fn old(&self) -> Option<ObjectId> {
        match self {
            RefTransition::Created { .. } => None,
            RefTransition::Updated { old, .. } | RefTransition::Deleted { old, .. } => Some(*old),
        }
    }

    /// The state the reference would have after the push, if it still exists.
    pub fn new_tip(&self) -> Option<ObjectId> {
        match self {
            RefTransition::Deleted { .. } => None,
            RefTransition::Created { new, .. } | RefTransition::Updated { new, .. } => Some(*new),
        }
    }

    /// Deletions can never introduce commits.
    pub fn is_deletion(&self) -> bool {
        matches!(self, RefTransition::Deleted { .. })
    }
}

/// Decode one side of the transition, mapping the zero sentinel to `None`.
fn parse_side(hex: &str, side: &str) -> Result<Option<ObjectId>, Error> {
    if is_all_zeros(hex) {
        if hex.len() != 40 && hex.len() != 64 {
            return Err(Error::MalformedInvocation(format!(
                "invalid {side} oid '{hex}': zero sentinel has unexpected length {}",
                hex.len()
            )));
        }
        return Ok(None);
    }
    ObjectId::from_hex(hex.as_bytes())
        .map(Some)
        .map_err(|e| Error::MalformedInvocation(format!("invalid {side} oid '{hex}': {e}")))
}

/// Return true if all chars are ASCII '0'.
fn is_all_zeros(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b == b'0')
}

#[cfg(test)]
mod tests {
    use super::*;

    const ZERO: &str = "0000000000000000000000000000000000000000";
    const ONE: &str = "1111111111111111111111111111111111111111";
    const TWO: &str = "2222222222222222222222222222222222222222";

    fn oid(hex40: &str) -> ObjectId {
        ObjectId::from_hex(hex40.as_bytes()).expect("valid hex")
    }

    #[test]
    fn create_update_delete_classification() {
        match RefTransition::parse("refs/heads/main", ZERO, ONE).unwrap() {
            RefTransition::Created { new, name } => {
                assert_eq!(new, oid(ONE));
                assert_eq!(name, "refs/heads/main");
            }
            other => panic!("expected Created, got {other:?}"),
        }

        match RefTransition::parse("refs/heads/main", ONE, TWO).unwrap() {
            RefTransition::Updated { old, new, .. } => {
                assert_eq!(old, oid(ONE));
                assert_eq!(new, oid(TWO));
            }
            other => panic!("expected Updated, got {other:?}"),
        }

        let deleted = RefTransition::parse("refs/tags/v1", TWO, ZERO).unwrap();
        assert!(deleted.is_deletion());
        assert_eq!(deleted.old(), Some(oid(TWO)));
        assert_eq!(deleted.new_tip(), None);
        assert_eq!(deleted.name(), "refs/tags/v1");
    }

    #[test]
    fn both_zero_is_malformed() {
        let err = RefTransition::parse("refs/heads/main", ZERO, ZERO).unwrap_err();
        assert!(matches!(err, Error::MalformedInvocation(_)));
    }

    #[test]
    fn invalid_hex_is_malformed() {
        let err = RefTransition::parse("refs/heads/main", "zzzz000000000000000000000000000000000000", ONE)
            .unwrap_err();
        assert!(matches!(err, Error::MalformedInvocation(_)));

        let err = RefTransition::parse("refs/heads/main", ONE, "1234").unwrap_err();
        assert!(matches!(err, Error::MalformedInvocation(_)));
    }

    #[test]
    fn short_zero_sentinel_is_malformed() {
        let err = RefTransition::parse("refs/heads/main", "0000", ONE).unwrap_err();
        assert!(matches!(err, Error::MalformedInvocation(_)));
    }

    #[test]
    fn missing_refname_is_malformed() {
        let err = RefTransition::parse("", ONE, TWO).unwrap_err();
        assert!(matches!(err, Error::MalformedInvocation(_)));
    }
}
