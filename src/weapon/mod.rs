//! Weapon identity resolution and minimal item construction
//!
//! A sender's weapon instance id only means something inside the sender's
//! inventory graph. Receivers derive a stable local id from the instance id
//! and the aggressor's profile id, then build a fresh minimal item of the
//! right template under that id. Derivation is deterministic, so repeated
//! damage events from the same weapon/profile pair resolve to the same
//! handle without any coordination with the sender.

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use tracing::debug;

/// Hex characters kept from the SHA-256 digest. 96 bits of id space makes
/// collisions negligible within a single raid's weapon/profile cardinality.
pub const DERIVED_ID_LEN: usize = 24;

/// Derive the local item id for a remote weapon reference.
pub fn derive_weapon_id(weapon_instance_id: &str, aggressor_profile_id: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(weapon_instance_id.as_bytes());
    hasher.update(aggressor_profile_id.as_bytes());
    let digest = hasher.finalize();
    hex::encode(digest)[..DERIVED_ID_LEN].to_string()
}

/// Mutable item state behind the shared handle.
#[derive(Debug, Clone, Copy)]
struct ItemState {
    resource: f32,
    stack_count: i32,
}

/// A minimal item: identity, template, and the consumable state the
/// replication layer cares about. Everything else stays on the owning peer.
#[derive(Debug)]
pub struct Item {
    id: String,
    template_id: String,
    state: Mutex<ItemState>,
}

impl Item {
    pub fn new(id: impl Into<String>, template_id: impl Into<String>, resource: f32) -> Arc<Self> {
        Arc::new(Self {
            id: id.into(),
            template_id: template_id.into(),
            state: Mutex::new(ItemState {
                resource,
                stack_count: 1,
            }),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn template_id(&self) -> &str {
        &self.template_id
    }

    /// Remaining usable quantity (hp resource, nutrition, etc).
    pub fn resource(&self) -> f32 {
        self.state.lock().resource
    }

    pub fn set_resource(&self, value: f32) {
        self.state.lock().resource = value;
    }

    /// Consume part of the resource, clamping at zero.
    pub fn consume(&self, amount: f32) -> f32 {
        let mut state = self.state.lock();
        state.resource = (state.resource - amount).max(0.0);
        state.resource
    }

    pub fn stack_count(&self) -> i32 {
        self.state.lock().stack_count
    }

    pub fn set_stack_count(&self, count: i32) {
        self.state.lock().stack_count = count;
    }
}

/// External item construction boundary.
///
/// Returns `None` when the template is unknown; callers treat that as
/// "no weapon" and carry on without attribution.
pub trait ItemFactory: Send + Sync {
    fn create_item(&self, local_id: &str, template_id: &str) -> Option<Arc<Item>>;
}

/// Per-template defaults for freshly constructed items.
#[derive(Debug, Clone, Copy)]
pub struct ItemTemplate {
    pub default_resource: f32,
}

/// In-memory template registry backing [`ItemFactory`].
///
/// The real game hydrates this from its item database; tests register the
/// handful of templates they need.
#[derive(Default)]
pub struct TemplateRegistry {
    templates: DashMap<String, ItemTemplate>,
}

impl TemplateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, template_id: impl Into<String>, template: ItemTemplate) {
        self.templates.insert(template_id.into(), template);
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

impl ItemFactory for TemplateRegistry {
    fn create_item(&self, local_id: &str, template_id: &str) -> Option<Arc<Item>> {
        let template = match self.templates.get(template_id) {
            Some(entry) => *entry.value(),
            None => {
                debug!(template_id = %template_id, "Unknown item template, no item created");
                return None;
            }
        };
        Some(Item::new(local_id, template_id, template.default_resource))
    }
}

/// Resolve a remote weapon reference into a local item handle.
///
/// Derived fresh on every call; recomputation is idempotent so no cache is
/// kept.
pub fn resolve_weapon(
    factory: &dyn ItemFactory,
    weapon_instance_id: &str,
    weapon_template: &str,
    aggressor_profile_id: &str,
) -> Option<Arc<Item>> {
    let local_id = derive_weapon_id(weapon_instance_id, aggressor_profile_id);
    factory.create_item(&local_id, weapon_template)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derivation_is_deterministic() {
        let a = derive_weapon_id("weapon-1", "profile-a");
        let b = derive_weapon_id("weapon-1", "profile-a");
        assert_eq!(a, b);
    }

    #[test]
    fn derived_id_is_24_lowercase_hex_chars() {
        let id = derive_weapon_id("weapon-1", "profile-a");
        assert_eq!(id.len(), DERIVED_ID_LEN);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn differing_inputs_produce_differing_ids() {
        let base = derive_weapon_id("weapon-1", "profile-a");
        assert_ne!(base, derive_weapon_id("weapon-2", "profile-a"));
        assert_ne!(base, derive_weapon_id("weapon-1", "profile-b"));
    }

    #[test]
    fn unknown_template_resolves_to_none() {
        let registry = TemplateRegistry::new();
        assert!(resolve_weapon(&registry, "weapon-1", "no-such-template", "profile-a").is_none());
    }

    #[test]
    fn known_template_resolves_to_stable_handle() {
        let registry = TemplateRegistry::new();
        registry.register(
            "5447a9cd4bdc2dbd208b4567",
            ItemTemplate {
                default_resource: 0.0,
            },
        );

        let first =
            resolve_weapon(&registry, "weapon-1", "5447a9cd4bdc2dbd208b4567", "profile-a").unwrap();
        let second =
            resolve_weapon(&registry, "weapon-1", "5447a9cd4bdc2dbd208b4567", "profile-a").unwrap();

        assert_eq!(first.id(), second.id());
        assert_eq!(first.template_id(), "5447a9cd4bdc2dbd208b4567");
    }

    #[test]
    fn consume_clamps_at_zero() {
        let item = Item::new("ifak-1", "590c678286f77426c9660122", 30.0);
        assert_eq!(item.consume(12.5), 17.5);
        assert_eq!(item.consume(100.0), 0.0);
        assert_eq!(item.resource(), 0.0);
    }
}
