//! Document graph merge
//!
//! Reconciles one nested collection of a document against a desired-state
//! collection. The merge is a pure function over id-keyed sets: the caller
//! loads the persisted ids, computes the plan here, and applies it inside a
//! transaction. Matching is by primary key equality only; a desired element
//! that omits its id is inserted, never fuzzy-matched.

use std::collections::HashSet;

use uuid::Uuid;

/// Desired-state elements expose their persisted id, if any.
pub trait HasId {
    fn id(&self) -> Option<Uuid>;
}

/// What happens to persisted elements absent from the desired set.
///
/// Attachments use [`RemovalPolicy::KeepMissing`]: removing an attachment is
/// exclusively the deletion pipeline's job, never a side effect of an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalPolicy {
    /// Delete (or unlink) persisted elements missing from the desired set.
    RemoveMissing,
    /// Leave persisted elements missing from the desired set untouched.
    KeepMissing,
}

/// Plan produced by [`merge_collection`].
#[derive(Debug)]
pub struct CollectionMerge<T> {
    /// Elements whose id matched a persisted element: apply field updates in place.
    pub updates: Vec<(Uuid, T)>,
    /// Elements with no id, or an id unknown to the persisted set: insert fresh.
    pub inserts: Vec<T>,
    /// Persisted ids absent from the desired set (empty under `KeepMissing`).
    pub removals: Vec<Uuid>,
}

/// Reconcile a desired-state collection against the persisted ids.
pub fn merge_collection<T: HasId>(
    existing_ids: &[Uuid],
    desired: Vec<T>,
    policy: RemovalPolicy,
) -> CollectionMerge<T> {
    let existing: HashSet<Uuid> = existing_ids.iter().copied().collect();
    let mut seen: HashSet<Uuid> = HashSet::new();

    let mut updates = Vec::new();
    let mut inserts = Vec::new();

    for item in desired {
        match item.id() {
            Some(id) if existing.contains(&id) => {
                seen.insert(id);
                updates.push((id, item));
            }
            // No id, or an id we do not know: a fresh insert. An element that
            // should have replaced an existing one but omitted its id becomes
            // a duplicate by design.
            _ => inserts.push(item),
        }
    }

    let removals = match policy {
        RemovalPolicy::RemoveMissing => existing_ids
            .iter()
            .filter(|id| !seen.contains(id))
            .copied()
            .collect(),
        RemovalPolicy::KeepMissing => Vec::new(),
    };

    CollectionMerge {
        updates,
        inserts,
        removals,
    }
}

/// Reconcile a plain id set (the shared category links): returns
/// `(to_link, to_unlink)`. Category rows themselves are never deleted by a
/// document operation, only dissociated.
pub fn merge_id_set(existing_ids: &[Uuid], desired_ids: &[Uuid]) -> (Vec<Uuid>, Vec<Uuid>) {
    let existing: HashSet<Uuid> = existing_ids.iter().copied().collect();
    let desired: HashSet<Uuid> = desired_ids.iter().copied().collect();

    let to_link = desired_ids
        .iter()
        .filter(|id| !existing.contains(id))
        .copied()
        .collect();
    let to_unlink = existing_ids
        .iter()
        .filter(|id| !desired.contains(id))
        .copied()
        .collect();

    (to_link, to_unlink)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Item {
        id: Option<Uuid>,
        name: &'static str,
    }

    impl HasId for Item {
        fn id(&self) -> Option<Uuid> {
            self.id
        }
    }

    #[test]
    fn test_merge_preserves_ids_and_inserts_new() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let desired = vec![
            Item {
                id: Some(a),
                name: "renamed",
            },
            Item {
                id: None,
                name: "fresh",
            },
        ];

        let plan = merge_collection(&[a, b], desired, RemovalPolicy::KeepMissing);

        assert_eq!(plan.updates.len(), 1);
        assert_eq!(plan.updates[0].0, a);
        assert_eq!(plan.updates[0].1.name, "renamed");
        assert_eq!(plan.inserts.len(), 1);
        assert_eq!(plan.inserts[0].name, "fresh");
        // B untouched: no removal under KeepMissing
        assert!(plan.removals.is_empty());
    }

    #[test]
    fn test_merge_removes_missing_under_remove_policy() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let desired = vec![Item {
            id: Some(a),
            name: "kept",
        }];

        let plan = merge_collection(&[a, b], desired, RemovalPolicy::RemoveMissing);

        assert_eq!(plan.updates.len(), 1);
        assert!(plan.inserts.is_empty());
        assert_eq!(plan.removals, vec![b]);
    }

    #[test]
    fn test_unknown_id_becomes_insert_not_update() {
        let a = Uuid::new_v4();
        let stranger = Uuid::new_v4();
        let desired = vec![Item {
            id: Some(stranger),
            name: "dup",
        }];

        let plan = merge_collection(&[a], desired, RemovalPolicy::RemoveMissing);

        assert!(plan.updates.is_empty());
        assert_eq!(plan.inserts.len(), 1);
        assert_eq!(plan.removals, vec![a]);
    }

    #[test]
    fn test_empty_desired_set_under_keep_policy_is_noop() {
        let a = Uuid::new_v4();
        let plan = merge_collection::<Item>(&[a], Vec::new(), RemovalPolicy::KeepMissing);
        assert!(plan.updates.is_empty());
        assert!(plan.inserts.is_empty());
        assert!(plan.removals.is_empty());
    }

    #[test]
    fn test_merge_id_set_links_and_unlinks() {
        let keep = Uuid::new_v4();
        let drop = Uuid::new_v4();
        let add = Uuid::new_v4();

        let (to_link, to_unlink) = merge_id_set(&[keep, drop], &[keep, add]);

        assert_eq!(to_link, vec![add]);
        assert_eq!(to_unlink, vec![drop]);
    }
}
