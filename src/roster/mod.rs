//! Roster - profile id to live player / bridge lookup
//!
//! Owned and mutated by the player-lifecycle collaborator (spawning,
//! despawning, extraction); the replication core only reads it.

use std::sync::Arc;

use dashmap::DashMap;

use crate::player::{Player, PlayerBridge};

/// Registry of all players known to this peer for the current raid.
#[derive(Default)]
pub struct Roster {
    /// Players with a live object in the world right now.
    alive: DashMap<String, Arc<Player>>,
    /// Attribution bridges; survive the live object.
    bridges: DashMap<String, Arc<PlayerBridge>>,
    /// Every player seen this session. Fallback when the live lookup misses
    /// (aggressor disconnected or not yet spawned on this peer).
    session: DashMap<String, Arc<Player>>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a freshly spawned player.
    pub fn register(&self, player: Arc<Player>) {
        let profile_id = player.profile_id().to_string();
        self.bridges
            .insert(profile_id.clone(), Arc::new(player.bridge()));
        self.session.insert(profile_id.clone(), player.clone());
        self.alive.insert(profile_id, player);
    }

    /// Remove the live object; bridge and session entries stay.
    pub fn despawn(&self, profile_id: &str) -> Option<Arc<Player>> {
        self.alive.remove(profile_id).map(|(_, player)| player)
    }

    pub fn resolve_alive(&self, profile_id: &str) -> Option<Arc<Player>> {
        self.alive.get(profile_id).map(|entry| entry.value().clone())
    }

    pub fn resolve_bridge(&self, profile_id: &str) -> Option<Arc<PlayerBridge>> {
        self.bridges
            .get(profile_id)
            .map(|entry| entry.value().clone())
    }

    /// Session-cached lookup, used as the aggressor fallback.
    pub fn resolve_session(&self, profile_id: &str) -> Option<Arc<Player>> {
        self.session
            .get(profile_id)
            .map(|entry| entry.value().clone())
    }

    pub fn alive_count(&self) -> usize {
        self.alive.len()
    }
}
