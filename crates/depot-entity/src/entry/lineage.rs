//! Lineage algebra for the folder tree.
//!
//! A lineage is the ordered list of ancestor ids from the root down to the
//! immediate parent, excluding the entry itself. The invariant maintained
//! everywhere: `lineage(child) == lineage(parent) + [parent.id]`.

use uuid::Uuid;

/// Compute the lineage of a child under the given parent.
pub fn child_lineage(parent_lineage: &[Uuid], parent_id: Uuid) -> Vec<Uuid> {
    let mut lineage = Vec::with_capacity(parent_lineage.len() + 1);
    lineage.extend_from_slice(parent_lineage);
    lineage.push(parent_id);
    lineage
}

/// The prefix shared by every descendant of an entry: its own lineage plus
/// its own id.
pub fn descendant_prefix(lineage: &[Uuid], id: Uuid) -> Vec<Uuid> {
    child_lineage(lineage, id)
}

/// Whether `lineage` starts with `prefix`.
pub fn starts_with(lineage: &[Uuid], prefix: &[Uuid]) -> bool {
    lineage.len() >= prefix.len() && &lineage[..prefix.len()] == prefix
}

/// Rewrite a descendant's lineage for a move: the first `old_prefix_len`
/// ids (the moved entry's old chain plus itself) are replaced by
/// `new_prefix`, preserving the relative suffix below the moved entry.
pub fn splice(descendant_lineage: &[Uuid], old_prefix_len: usize, new_prefix: &[Uuid]) -> Vec<Uuid> {
    let suffix = descendant_lineage.get(old_prefix_len..).unwrap_or(&[]);
    let mut lineage = Vec::with_capacity(new_prefix.len() + suffix.len());
    lineage.extend_from_slice(new_prefix);
    lineage.extend_from_slice(suffix);
    lineage
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_child_lineage_appends_parent() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert_eq!(child_lineage(&[], a), vec![a]);
        assert_eq!(child_lineage(&[a], b), vec![a, b]);
    }

    #[test]
    fn test_starts_with() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let c = Uuid::new_v4();
        assert!(starts_with(&[a, b, c], &[a, b]));
        assert!(starts_with(&[a, b], &[a, b]));
        assert!(!starts_with(&[a], &[a, b]));
        assert!(!starts_with(&[b, a], &[a]));
    }

    #[test]
    fn test_splice_preserves_suffix() {
        // Tree: root_a/moved/x/y  moved under root_b.
        let root_a = Uuid::new_v4();
        let moved = Uuid::new_v4();
        let x = Uuid::new_v4();
        let root_b = Uuid::new_v4();

        let deep = vec![root_a, moved, x];
        let old_prefix = vec![root_a, moved];
        let new_prefix = vec![root_b, moved];

        let rewritten = splice(&deep, old_prefix.len(), &new_prefix);
        assert_eq!(rewritten, vec![root_b, moved, x]);
    }

    #[test]
    fn test_splice_to_root() {
        let a = Uuid::new_v4();
        let moved = Uuid::new_v4();
        let x = Uuid::new_v4();

        // moved goes from under `a` to the root: new prefix is just [moved].
        let rewritten = splice(&[a, moved, x], 2, &[moved]);
        assert_eq!(rewritten, vec![moved, x]);
    }
}
