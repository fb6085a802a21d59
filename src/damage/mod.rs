//! Damage pipeline - turns a received damage packet into a locally applied hit
//!
//! Every resolution step degrades to "skip and log"; only a missing subject
//! stops the packet. A single bad or late packet must never destabilize the
//! processing of subsequent packets.

use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::config::ABSORBED_SLACK;
use crate::dispatch::{ReplicationContext, Transport};
use crate::packets::damage::Aggressor;
use crate::packets::{
    debug_json, ApplyDamagePacket, BodyPart, ColliderType, DamageType, Packet,
};
use crate::player::{PlayerBridge, PlayerKind};
use crate::weapon::{resolve_weapon, Item};

/// One damage occurrence, reconstructed from a packet and resolved against
/// local state. Consumed synchronously; never persisted.
#[derive(Clone)]
pub struct DamageEvent {
    pub damage: f32,
    pub damage_type: DamageType,
    pub collider: ColliderType,
    pub absorbed: f32,
    pub aggressor: Option<Arc<PlayerBridge>>,
    pub weapon: Option<Arc<Item>>,
}

/// Apply an inbound damage packet to the subject player.
pub fn apply_incoming_damage(ctx: &ReplicationContext, packet: &ApplyDamagePacket) {
    debug!(packet = %debug_json(packet), "Processing damage packet");

    let damage = packet.damage.max(0.0);
    let mut absorbed = packet.absorbed.max(0.0);
    if ctx.config.clamp_absorbed && absorbed > damage + ABSORBED_SLACK {
        warn!(
            profile_id = %packet.profile_id,
            absorbed = packet.absorbed,
            damage = packet.damage,
            "Absorbed amount exceeds physical bound, clamping"
        );
        absorbed = damage + ABSORBED_SLACK;
    }

    let mut event = DamageEvent {
        damage,
        damage_type: packet.damage_type,
        collider: packet.collider,
        absorbed,
        aggressor: None,
        weapon: None,
    };

    if let Some(aggressor) = &packet.aggressor {
        attach_aggressor(ctx, aggressor, &mut event);
    }

    // The subject of the damage is a hard requirement; the event is simply
    // not applied if it cannot be resolved (no damage is lost retroactively).
    if ctx.roster.resolve_bridge(&packet.profile_id).is_none() {
        error!(profile_id = %packet.profile_id, "Unable to find bridge for damage subject");
        return;
    }
    let Some(subject) = ctx.roster.resolve_alive(&packet.profile_id) else {
        error!(profile_id = %packet.profile_id, "Unable to find live player for damage subject");
        return;
    };
    if subject.kind() != PlayerKind::Local {
        error!(
            profile_id = %packet.profile_id,
            "Damage subject is not locally simulated, refusing relayed damage"
        );
        return;
    }

    subject.receive_damage(
        &event,
        packet.body_part,
        packet.collider,
        absorbed,
        &ctx.config.feedback,
    );
}

/// Resolve aggressor attribution and, where possible, a local weapon handle.
/// All failures here are soft: the damage still applies.
fn attach_aggressor(ctx: &ReplicationContext, aggressor: &Aggressor, event: &mut DamageEvent) {
    let Some(bridge) = ctx.roster.resolve_bridge(&aggressor.profile_id) else {
        warn!(
            aggressor_profile_id = %aggressor.profile_id,
            "Aggressor bridge not found, applying damage unattributed"
        );
        return;
    };
    debug!(aggressor = %debug_json(bridge.as_ref()), "Damage attributed");
    event.aggressor = Some(bridge);

    let aggressor_player = ctx
        .roster
        .resolve_alive(&aggressor.profile_id)
        .or_else(|| ctx.roster.resolve_session(&aggressor.profile_id));
    let Some(aggressor_player) = aggressor_player else {
        warn!(
            aggressor_profile_id = %aggressor.profile_id,
            "Aggressor player not resolvable, continuing without weapon"
        );
        return;
    };

    if aggressor.weapon_id.is_empty() {
        return;
    }
    event.weapon = resolve_weapon(
        ctx.items.as_ref(),
        &aggressor.weapon_id,
        &aggressor.weapon_template,
        aggressor_player.profile_id(),
    );
    if event.weapon.is_none() {
        debug!(
            weapon_template = %aggressor.weapon_template,
            "Weapon template unresolved, kill attribution will be weaponless"
        );
    }
}

/// Broadcast a locally registered damage event against `subject_profile_id`.
/// This is the sender half of the pipeline, called from the local hit path.
pub fn broadcast_damage(
    transport: &dyn Transport,
    subject_profile_id: &str,
    event: &DamageEvent,
    body_part: BodyPart,
) {
    let packet = ApplyDamagePacket {
        profile_id: subject_profile_id.to_string(),
        damage_type: event.damage_type,
        damage: event.damage,
        body_part,
        collider: event.collider,
        absorbed: event.absorbed,
        aggressor: event.aggressor.as_ref().map(|bridge| Aggressor {
            profile_id: bridge.profile_id.clone(),
            weapon_id: event
                .weapon
                .as_ref()
                .map(|weapon| weapon.id().to_string())
                .unwrap_or_default(),
            weapon_template: event
                .weapon
                .as_ref()
                .map(|weapon| weapon.template_id().to_string())
                .unwrap_or_default(),
        }),
    };
    transport.send(packet.encode());
}
