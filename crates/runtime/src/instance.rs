//! Shared dungeon instances.
//!
//! Users exploring the same dungeon from the same voice channel share an
//! instance. Membership is what makes someone eligible to intervene in
//! another member's encounter. A user belongs to at most one instance.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};

use game_core::{ChannelId, UserId};

/// Key of a shared instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InstanceKey {
    pub channel: ChannelId,
    pub dungeon: String,
}

impl InstanceKey {
    pub fn new(channel: ChannelId, dungeon: impl Into<String>) -> Self {
        Self {
            channel,
            dungeon: dungeon.into(),
        }
    }
}

impl fmt::Display for InstanceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.channel, self.dungeon)
    }
}

#[derive(Default)]
struct Instances {
    members: HashMap<InstanceKey, BTreeSet<UserId>>,
    membership: HashMap<UserId, InstanceKey>,
}

impl Instances {
    fn remove(&mut self, user: UserId) -> Option<InstanceKey> {
        let key = self.membership.remove(&user)?;
        if let Some(members) = self.members.get_mut(&key) {
            members.remove(&user);
            if members.is_empty() {
                self.members.remove(&key);
                tracing::debug!(target: "runtime::instance", instance = %key, "instance closed");
            }
        }
        Some(key)
    }
}

/// Registry of live shared instances.
#[derive(Default)]
pub struct SharedInstanceManager {
    inner: Mutex<Instances>,
}

impl SharedInstanceManager {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Instances> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Moves `user` into the `(channel, dungeon)` instance, leaving any
    /// previous one first. Creates the instance on first join.
    pub fn join(&self, user: UserId, channel: ChannelId, dungeon: &str) -> InstanceKey {
        let key = InstanceKey::new(channel, dungeon);
        let mut inner = self.lock();
        inner.remove(user);
        inner.members.entry(key.clone()).or_default().insert(user);
        inner.membership.insert(user, key.clone());
        tracing::debug!(target: "runtime::instance", user = %user, instance = %key, "joined instance");
        key
    }

    /// Removes `user` from its instance, closing the instance when it empties.
    ///
    /// Returns the instance left, or `None` when the user was in none.
    pub fn leave(&self, user: UserId) -> Option<InstanceKey> {
        self.lock().remove(user)
    }

    pub fn instance_of(&self, user: UserId) -> Option<InstanceKey> {
        self.lock().membership.get(&user).cloned()
    }

    /// Members in id order; empty for an unknown instance.
    pub fn members(&self, key: &InstanceKey) -> Vec<UserId> {
        self.lock()
            .members
            .get(key)
            .map(|members| members.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn shares_instance(&self, a: UserId, b: UserId) -> bool {
        let inner = self.lock();
        match (inner.membership.get(&a), inner.membership.get(&b)) {
            (Some(left), Some(right)) => left == right,
            _ => false,
        }
    }

    /// Number of live instances.
    pub fn len(&self) -> usize {
        self.lock().members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joining_another_instance_transfers_membership() {
        let manager = SharedInstanceManager::new();
        let first = manager.join(UserId(1), ChannelId(10), "goblin_warren");
        let second = manager.join(UserId(1), ChannelId(10), "sunken_crypt");

        assert_ne!(first, second);
        assert_eq!(manager.instance_of(UserId(1)), Some(second.clone()));
        assert!(manager.members(&first).is_empty());
        assert_eq!(manager.len(), 1);
    }

    #[test]
    fn leave_twice_is_a_no_op() {
        let manager = SharedInstanceManager::new();
        let key = manager.join(UserId(1), ChannelId(10), "goblin_warren");
        manager.join(UserId(2), ChannelId(10), "goblin_warren");

        assert_eq!(manager.leave(UserId(1)), Some(key.clone()));
        assert_eq!(manager.leave(UserId(1)), None);
        assert_eq!(manager.members(&key), vec![UserId(2)]);

        assert_eq!(manager.leave(UserId(2)), Some(key));
        assert!(manager.is_empty());
    }

    #[test]
    fn sharing_requires_the_same_channel_and_dungeon() {
        let manager = SharedInstanceManager::new();
        manager.join(UserId(1), ChannelId(10), "goblin_warren");
        manager.join(UserId(2), ChannelId(10), "goblin_warren");
        manager.join(UserId(3), ChannelId(11), "goblin_warren");

        assert!(manager.shares_instance(UserId(1), UserId(2)));
        assert!(!manager.shares_instance(UserId(1), UserId(3)));
        assert!(!manager.shares_instance(UserId(1), UserId(4)));
    }
}
