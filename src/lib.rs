//! raidlink - peer replication core for cooperative raid sessions
//!
//! Turns one peer's gameplay events into compact binary packets and applies
//! the packets it receives to local state. It handles:
//! - Binary packet codec with a method-discriminator header
//! - Damage application with aggressor and weapon attribution
//! - Deferred action synchronization (eating, medding, weapon swaps)
//! - Deterministic weapon identity derivation across peers
//! - Per-frame inbound dispatch over a pluggable transport
//!
//! The embedding host owns sockets, rendering and the simulation loop; this
//! crate owns what goes on the wire and what a received packet means.

pub mod actions;
pub mod config;
pub mod damage;
pub mod dispatch;
pub mod packets;
pub mod player;
pub mod roster;
pub mod util;
pub mod weapon;
pub mod wire;

pub use actions::{
    ActionController, ActionError, ActionKind, ActionState, ActionSynchronizer, CompletedAction,
    CompletionPolicy, ConfirmationPolicy, ControllerStep,
};
pub use config::{ConfigError, FeedbackTuning, ReplicationConfig, ABSORBED_SLACK};
pub use damage::{apply_incoming_damage, broadcast_damage, DamageEvent};
pub use dispatch::{
    BroadcastTransport, DroneEvent, InboundHandle, NullTransport, RecordingTransport,
    ReplicationContext, ReplicationSession, Transport,
};
pub use packets::{
    peek_method, ApplyDamagePacket, BodyPart, ColliderType, DamageType, KillPacket, Packet,
    ProceedFoodDrinkPacket, ProceedGrenadePacket, ProceedKnifePacket, ProceedMedsPacket,
    ProceedSyncPacket, ProceedWeaponPacket,
};
pub use player::{broadcast_death, FeedbackImpulse, Player, PlayerBridge, PlayerKind};
pub use roster::Roster;
pub use weapon::{
    derive_weapon_id, resolve_weapon, Item, ItemFactory, ItemTemplate, TemplateRegistry,
    DERIVED_ID_LEN,
};
pub use wire::{DecodeError, WireReader, WireWriter};
