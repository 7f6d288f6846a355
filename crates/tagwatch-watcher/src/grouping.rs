//! Subscription grouping by registry identity.
//!
//! Each group shares one registry client, so each distinct registry context
//! acquires at most one bearer token per poll cycle.

use std::collections::BTreeMap;

use tagwatch_core::{RegistryIdentity, Subscription};

/// Subscriptions sharing one registry identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryGroup {
    /// Identity shared by every subscription in the group.
    pub identity: RegistryIdentity,

    /// Member subscriptions.
    pub subscriptions: Vec<Subscription>,
}

impl RegistryGroup {
    /// Returns the repositories of the group's subscriptions, possibly with
    /// duplicates.
    pub fn repositories(&self) -> impl Iterator<Item = &str> {
        self.subscriptions.iter().map(|s| s.repository.as_str())
    }

    /// Returns the number of member subscriptions.
    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    /// Returns true if the group has no members.
    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }
}

/// Partitions `subscriptions` by structural equality of their registry
/// identity.
///
/// Two subscriptions land in the same group iff every identity field
/// matches. Groups come back ordered by identity.
pub fn group_by_registry(subscriptions: Vec<Subscription>) -> Vec<RegistryGroup> {
    let mut groups: BTreeMap<RegistryIdentity, Vec<Subscription>> = BTreeMap::new();
    for subscription in subscriptions {
        groups
            .entry(subscription.registry.clone())
            .or_default()
            .push(subscription);
    }

    groups
        .into_iter()
        .map(|(identity, subscriptions)| RegistryGroup {
            identity,
            subscriptions,
        })
        .collect()
}
