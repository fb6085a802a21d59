//! Peer dispatch - transport seam, inbound queue, method routing
//!
//! The transport is fire-and-forget: `send` hands an encoded packet to every
//! other peer, with ordering guaranteed per sender only. Inbound bytes are
//! queued off-thread and drained on the simulation thread once per frame, so
//! packet handlers never race the simulation.

use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, warn};

use crate::config::ReplicationConfig;
use crate::damage::apply_incoming_damage;
use crate::packets::{
    peek_method, ApplyDamagePacket, KillPacket, Packet, ProceedFoodDrinkPacket,
    ProceedGrenadePacket, ProceedKnifePacket, ProceedMedsPacket, ProceedSyncPacket,
    ProceedWeaponPacket,
};
use crate::roster::Roster;
use crate::wire::DecodeError;
use crate::weapon::ItemFactory;

/// Outbound seam between the replication core and the host's socket layer.
pub trait Transport: Send + Sync {
    fn send(&self, bytes: Bytes);
}

/// Transport that drops everything. For hosts running without peers.
pub struct NullTransport;

impl Transport for NullTransport {
    fn send(&self, _bytes: Bytes) {}
}

/// Transport that records every send, in order. Test support.
#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<Bytes>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<Bytes> {
        self.sent.lock().clone()
    }
}

impl Transport for RecordingTransport {
    fn send(&self, bytes: Bytes) {
        self.sent.lock().push(bytes);
    }
}

/// Broadcast-channel transport. The host's socket layer subscribes one
/// receiver per connected peer and forwards whatever arrives.
pub struct BroadcastTransport {
    tx: broadcast::Sender<Bytes>,
}

impl BroadcastTransport {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Bytes> {
        self.tx.subscribe()
    }
}

impl Transport for BroadcastTransport {
    fn send(&self, bytes: Bytes) {
        // No subscribers yet is not an error.
        let _ = self.tx.send(bytes);
    }
}

/// Shared state every packet handler needs.
#[derive(Clone)]
pub struct ReplicationContext {
    pub config: Arc<ReplicationConfig>,
    pub roster: Arc<Roster>,
    pub items: Arc<dyn ItemFactory>,
    pub transport: Arc<dyn Transport>,
}

/// Handle the socket layer uses to push raw inbound packets. Cheap to clone,
/// safe from any thread.
#[derive(Clone)]
pub struct InboundHandle {
    tx: mpsc::UnboundedSender<Bytes>,
}

impl InboundHandle {
    pub fn push(&self, bytes: Bytes) {
        // A dropped session means the raid is over; late packets are moot.
        let _ = self.tx.send(bytes);
    }
}

/// A decoded remote action the host's puppet layer replays on the matching
/// drone this frame.
#[derive(Debug, Clone, PartialEq)]
pub enum DroneEvent {
    FoodDrink(ProceedFoodDrinkPacket),
    Meds(ProceedMedsPacket),
    Weapon(ProceedWeaponPacket),
    Knife(ProceedKnifePacket),
    Grenade(ProceedGrenadePacket),
    ResourceSync(ProceedSyncPacket),
}

/// Per-raid replication session: owns the inbound queue and drains it on
/// the simulation thread.
pub struct ReplicationSession {
    ctx: ReplicationContext,
    inbound_tx: mpsc::UnboundedSender<Bytes>,
    inbound_rx: mpsc::UnboundedReceiver<Bytes>,
}

impl ReplicationSession {
    pub fn new(ctx: ReplicationContext) -> Self {
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        Self {
            ctx,
            inbound_tx,
            inbound_rx,
        }
    }

    pub fn context(&self) -> &ReplicationContext {
        &self.ctx
    }

    pub fn handle(&self) -> InboundHandle {
        InboundHandle {
            tx: self.inbound_tx.clone(),
        }
    }

    /// Drain and route every queued inbound packet. Called once per
    /// simulation frame. Returns the drone actions for the puppet layer.
    pub fn frame(&mut self) -> Vec<DroneEvent> {
        let mut events = Vec::new();
        while let Ok(bytes) = self.inbound_rx.try_recv() {
            self.route(&bytes, &mut events);
        }
        events
    }

    /// Route one packet by its method discriminator. A bad packet is logged
    /// and dropped; it never interrupts the drain.
    fn route(&self, bytes: &Bytes, events: &mut Vec<DroneEvent>) {
        let method = match peek_method(bytes) {
            Ok(method) => method,
            Err(err) => {
                warn!(error = %err, len = bytes.len(), "Discarding packet with unreadable header");
                return;
            }
        };

        let outcome = match method.as_str() {
            ApplyDamagePacket::METHOD => ApplyDamagePacket::decode(bytes)
                .map(|packet| apply_incoming_damage(&self.ctx, &packet)),
            KillPacket::METHOD => KillPacket::decode(bytes).map(|packet| self.handle_kill(&packet)),
            ProceedFoodDrinkPacket::METHOD => ProceedFoodDrinkPacket::decode(bytes)
                .map(|packet| events.push(DroneEvent::FoodDrink(packet))),
            ProceedMedsPacket::METHOD => ProceedMedsPacket::decode(bytes)
                .map(|packet| events.push(DroneEvent::Meds(packet))),
            ProceedWeaponPacket::METHOD => ProceedWeaponPacket::decode(bytes)
                .map(|packet| events.push(DroneEvent::Weapon(packet))),
            ProceedKnifePacket::METHOD => ProceedKnifePacket::decode(bytes)
                .map(|packet| events.push(DroneEvent::Knife(packet))),
            ProceedGrenadePacket::METHOD => ProceedGrenadePacket::decode(bytes)
                .map(|packet| events.push(DroneEvent::Grenade(packet))),
            ProceedSyncPacket::METHOD => ProceedSyncPacket::decode(bytes)
                .map(|packet| events.push(DroneEvent::ResourceSync(packet))),
            _ => {
                debug!(method = %method, "Unknown packet method, dropping");
                return;
            }
        };

        if let Err(err) = outcome {
            match err {
                // A mismatched discriminator inside the payload is a no-op.
                DecodeError::MethodMismatch { .. } => {
                    debug!(method = %method, "Method mismatch, ignoring packet")
                }
                err => warn!(method = %method, error = %err, "Discarding undecodable packet"),
            }
        }
    }

    fn handle_kill(&self, packet: &KillPacket) {
        match self.ctx.roster.resolve_alive(&packet.profile_id) {
            Some(player) => player.kill(packet.damage_type),
            None => warn!(
                profile_id = %packet.profile_id,
                "Kill packet for a player with no live object"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packets::{BodyPart, ColliderType, DamageType};
    use crate::player::{Player, PlayerKind};
    use crate::weapon::TemplateRegistry;

    fn session() -> ReplicationSession {
        ReplicationSession::new(ReplicationContext {
            config: Arc::new(ReplicationConfig::default()),
            roster: Arc::new(Roster::new()),
            items: Arc::new(TemplateRegistry::new()),
            transport: Arc::new(NullTransport),
        })
    }

    fn damage_bytes(profile_id: &str) -> Bytes {
        ApplyDamagePacket {
            profile_id: profile_id.to_string(),
            damage_type: DamageType::Bullet,
            damage: 35.0,
            body_part: BodyPart::Head,
            collider: ColliderType::HeadCommon,
            absorbed: 10.0,
            aggressor: None,
        }
        .encode()
    }

    #[test]
    fn damage_packet_reaches_the_local_player() {
        let mut session = session();
        let victim = Player::new("victim", "Victim", PlayerKind::Local, 100.0);
        session.ctx.roster.register(victim.clone());

        session.handle().push(damage_bytes("victim"));
        let events = session.frame();

        assert!(events.is_empty());
        assert_eq!(victim.health(), 65.0);
    }

    #[test]
    fn kill_packet_marks_the_drone_dead() {
        let mut session = session();
        let drone = Player::new("remote", "Remote", PlayerKind::Drone, 100.0);
        session.ctx.roster.register(drone.clone());

        session.handle().push(
            KillPacket {
                profile_id: "remote".to_string(),
                damage_type: DamageType::Bullet,
            }
            .encode(),
        );
        session.frame();

        assert!(!drone.is_alive());
    }

    #[test]
    fn proceed_packets_surface_as_drone_events_in_order() {
        let mut session = session();
        let handle = session.handle();

        let meds = ProceedMedsPacket {
            profile_id: "remote".to_string(),
            item_id: "ifak-1".to_string(),
            template_id: "590c678286f77426c9660122".to_string(),
            body_part: BodyPart::LeftArm,
            animation_variant: 0,
            scheduled: true,
            amount: 1.0,
        };
        let sync = ProceedSyncPacket {
            profile_id: "remote".to_string(),
            item_id: "ifak-1".to_string(),
            new_value: 40.0,
            stack_count: 1,
        };
        handle.push(meds.encode());
        handle.push(sync.encode());

        let events = session.frame();
        assert_eq!(
            events,
            vec![
                DroneEvent::Meds(meds),
                DroneEvent::ResourceSync(sync),
            ]
        );

        // The queue drains fully; a second frame sees nothing.
        assert!(session.frame().is_empty());
    }

    #[test]
    fn bad_packets_never_interrupt_the_drain() {
        let mut session = session();
        let drone = Player::new("remote", "Remote", PlayerKind::Drone, 100.0);
        session.ctx.roster.register(drone.clone());
        let handle = session.handle();

        // Garbage, a truncated damage packet, an unknown method, then a
        // valid kill. All of the bad ones are dropped, the kill lands.
        handle.push(Bytes::from_static(&[0xff, 0xff, 0xff]));
        let full = damage_bytes("remote");
        handle.push(full.slice(..full.len() - 2));
        let mut unknown = crate::wire::WireWriter::new();
        unknown.put_string("TeleportPacket");
        unknown.put_string("remote");
        handle.push(unknown.freeze());
        handle.push(
            KillPacket {
                profile_id: "remote".to_string(),
                damage_type: DamageType::Landmine,
            }
            .encode(),
        );

        session.frame();
        assert!(!drone.is_alive());
    }

    #[test]
    fn broadcast_transport_fans_out_to_subscribers() {
        let transport = BroadcastTransport::new(16);
        let mut peer_a = transport.subscribe();
        let mut peer_b = transport.subscribe();

        transport.send(damage_bytes("victim"));

        assert_eq!(peer_a.try_recv().unwrap(), damage_bytes("victim"));
        assert_eq!(peer_b.try_recv().unwrap(), damage_bytes("victim"));
    }

    #[test]
    fn broadcast_transport_without_subscribers_is_silent() {
        let transport = BroadcastTransport::new(16);
        transport.send(damage_bytes("victim"));
    }
}
