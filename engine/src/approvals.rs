//! Approval registry — which integrations an owner has authorized.
//!
//! Each owner has a membership set for O(1) `is_approved` lookups and an
//! enumeration list for `list`. Revocation swaps the removed entry with the
//! last one and pops, so enumeration order is not stable across
//! grant/revoke cycles. Grant never appends an identity that is already in
//! the set, which keeps the list duplicate-free and makes the single
//! swap-remove per revoke sufficient.

use std::collections::{HashMap, HashSet};

use credscore_types::Identity;

use crate::error::CreditError;

#[derive(Clone, Debug, Default)]
struct OwnerApprovals {
    approved: HashSet<Identity>,
    order: Vec<Identity>,
}

/// Per-owner set of approved integrations.
#[derive(Clone, Debug, Default)]
pub struct ApprovalRegistry {
    by_owner: HashMap<Identity, OwnerApprovals>,
}

impl ApprovalRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Approve `integration` for `owner`. Returns `true` if the approval is
    /// new, `false` if it was already present.
    pub fn grant(&mut self, owner: &Identity, integration: &Identity) -> bool {
        let entry = self.by_owner.entry(owner.clone()).or_default();
        if !entry.approved.insert(integration.clone()) {
            return false;
        }
        entry.order.push(integration.clone());
        true
    }

    /// Withdraw an approval. Fails with [`CreditError::NotApproved`] if the
    /// integration is not currently approved; lock checks are the caller's job.
    pub fn revoke(&mut self, owner: &Identity, integration: &Identity) -> Result<(), CreditError> {
        let not_approved = || CreditError::NotApproved {
            owner: owner.clone(),
            integration: integration.clone(),
        };
        let entry = self.by_owner.get_mut(owner).ok_or_else(not_approved)?;
        if !entry.approved.remove(integration) {
            return Err(not_approved());
        }
        if let Some(pos) = entry.order.iter().position(|i| i == integration) {
            entry.order.swap_remove(pos);
        }
        if entry.approved.is_empty() {
            self.by_owner.remove(owner);
        }
        Ok(())
    }

    pub fn is_approved(&self, owner: &Identity, integration: &Identity) -> bool {
        self.by_owner
            .get(owner)
            .is_some_and(|e| e.approved.contains(integration))
    }

    /// Approved integrations in current enumeration order.
    pub fn list(&self, owner: &Identity) -> Vec<Identity> {
        self.by_owner
            .get(owner)
            .map(|e| e.order.clone())
            .unwrap_or_default()
    }

    /// All owners with at least one approval and their lists, sorted by owner.
    pub fn entries(&self) -> Vec<(Identity, Vec<Identity>)> {
        let mut out: Vec<_> = self
            .by_owner
            .iter()
            .map(|(owner, e)| (owner.clone(), e.order.clone()))
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }

    /// Rebuild from [`entries`](Self::entries) output, preserving list order.
    pub fn from_entries(entries: Vec<(Identity, Vec<Identity>)>) -> Self {
        let mut registry = Self::new();
        for (owner, integrations) in entries {
            for integration in integrations {
                registry.grant(&owner, &integration);
            }
        }
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> Identity {
        Identity::new(s)
    }

    #[test]
    fn grant_then_lookup() {
        let mut reg = ApprovalRegistry::new();
        assert!(reg.grant(&id("alice"), &id("lender")));
        assert!(reg.is_approved(&id("alice"), &id("lender")));
        assert!(!reg.is_approved(&id("bob"), &id("lender")));
        assert_eq!(reg.list(&id("alice")), vec![id("lender")]);
    }

    #[test]
    fn grant_is_idempotent() {
        let mut reg = ApprovalRegistry::new();
        assert!(reg.grant(&id("alice"), &id("lender")));
        assert!(!reg.grant(&id("alice"), &id("lender")));
        assert_eq!(reg.list(&id("alice")).len(), 1);
    }

    #[test]
    fn revoke_swaps_last_into_place() {
        let mut reg = ApprovalRegistry::new();
        for name in ["a", "b", "c", "d"] {
            reg.grant(&id("alice"), &id(name));
        }
        reg.revoke(&id("alice"), &id("b")).unwrap();
        assert_eq!(reg.list(&id("alice")), vec![id("a"), id("d"), id("c")]);
        assert!(!reg.is_approved(&id("alice"), &id("b")));
    }

    #[test]
    fn revoke_unknown_is_not_approved() {
        let mut reg = ApprovalRegistry::new();
        assert!(matches!(
            reg.revoke(&id("alice"), &id("lender")),
            Err(CreditError::NotApproved { .. })
        ));
        reg.grant(&id("alice"), &id("other"));
        assert!(matches!(
            reg.revoke(&id("alice"), &id("lender")),
            Err(CreditError::NotApproved { .. })
        ));
        assert_eq!(reg.list(&id("alice")), vec![id("other")]);
    }

    #[test]
    fn repeated_cycles_never_duplicate() {
        let mut reg = ApprovalRegistry::new();
        for _ in 0..5 {
            reg.grant(&id("alice"), &id("lender"));
            reg.grant(&id("alice"), &id("lender"));
            reg.grant(&id("alice"), &id("bank"));
            reg.revoke(&id("alice"), &id("lender")).unwrap();
        }
        reg.grant(&id("alice"), &id("lender"));
        let list = reg.list(&id("alice"));
        assert_eq!(list.len(), 2);
        assert!(list.contains(&id("lender")) && list.contains(&id("bank")));
    }

    #[test]
    fn approvals_are_per_owner() {
        let mut reg = ApprovalRegistry::new();
        reg.grant(&id("alice"), &id("lender"));
        reg.grant(&id("bob"), &id("lender"));
        reg.revoke(&id("alice"), &id("lender")).unwrap();
        assert!(reg.is_approved(&id("bob"), &id("lender")));
        assert!(reg.list(&id("alice")).is_empty());
    }

    #[test]
    fn entries_roundtrip_keeps_order() {
        let mut reg = ApprovalRegistry::new();
        for name in ["x", "y", "z"] {
            reg.grant(&id("alice"), &id(name));
        }
        reg.revoke(&id("alice"), &id("x")).unwrap();
        let rebuilt = ApprovalRegistry::from_entries(reg.entries());
        assert_eq!(rebuilt.list(&id("alice")), reg.list(&id("alice")));
    }
}
