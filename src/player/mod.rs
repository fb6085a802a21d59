//! Player model - identity, health state, hit feedback
//!
//! Two kinds of player exist on every peer: the locally-simulated player
//! (and locally-owned bots) and drone copies of remote players. Only the
//! locally-simulated kind may receive relayed damage; drones are driven by
//! their owning peer.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info};

use crate::config::FeedbackTuning;
use crate::damage::DamageEvent;
use crate::dispatch::Transport;
use crate::packets::{debug_json, BodyPart, ColliderType, DamageType, KillPacket, Packet};
use crate::weapon::Item;

/// Simulation ownership of a player object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerKind {
    /// Simulated on this peer; replication-capable.
    Local,
    /// Remote player's puppet; driven by inbound packets only.
    Drone,
}

/// Lightweight reference to a player used for attribution (kill feed,
/// aggressor display). Stays valid even after the full object despawns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlayerBridge {
    pub profile_id: String,
    pub nickname: String,
}

/// Mutable health and condition state.
#[derive(Debug, Clone, Copy)]
struct HealthState {
    health: f32,
    alive: bool,
    on_painkillers: bool,
}

/// A presentation impulse produced by an inbound hit on the local player.
/// Drained by the camera/haptics layer once per frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FeedbackImpulse {
    pub force: f32,
    pub hands_shake: f32,
    pub camera_shake: f32,
    pub blur: f32,
}

/// A player object as the replication core sees it.
pub struct Player {
    profile_id: String,
    nickname: String,
    kind: PlayerKind,
    /// True only for the one player this peer's camera follows.
    is_your_player: bool,
    state: Mutex<HealthState>,
    feedback: Mutex<Vec<FeedbackImpulse>>,
    /// Attribution of the most recent hit, for the kill feed.
    last_aggressor: Mutex<Option<Arc<PlayerBridge>>>,
    last_weapon: Mutex<Option<Arc<Item>>>,
}

impl Player {
    pub fn new(
        profile_id: impl Into<String>,
        nickname: impl Into<String>,
        kind: PlayerKind,
        max_health: f32,
    ) -> Arc<Self> {
        Self::build(profile_id, nickname, kind, kind == PlayerKind::Local, max_health)
    }

    /// A locally-owned bot: replication-capable like the followed player,
    /// but its hits never reach the camera or haptics.
    pub fn new_bot(
        profile_id: impl Into<String>,
        nickname: impl Into<String>,
        max_health: f32,
    ) -> Arc<Self> {
        Self::build(profile_id, nickname, PlayerKind::Local, false, max_health)
    }

    fn build(
        profile_id: impl Into<String>,
        nickname: impl Into<String>,
        kind: PlayerKind,
        is_your_player: bool,
        max_health: f32,
    ) -> Arc<Self> {
        Arc::new(Self {
            profile_id: profile_id.into(),
            nickname: nickname.into(),
            kind,
            is_your_player,
            state: Mutex::new(HealthState {
                health: max_health,
                alive: true,
                on_painkillers: false,
            }),
            feedback: Mutex::new(Vec::new()),
            last_aggressor: Mutex::new(None),
            last_weapon: Mutex::new(None),
        })
    }

    pub fn profile_id(&self) -> &str {
        &self.profile_id
    }

    pub fn nickname(&self) -> &str {
        &self.nickname
    }

    pub fn kind(&self) -> PlayerKind {
        self.kind
    }

    pub fn bridge(&self) -> PlayerBridge {
        PlayerBridge {
            profile_id: self.profile_id.clone(),
            nickname: self.nickname.clone(),
        }
    }

    pub fn health(&self) -> f32 {
        self.state.lock().health
    }

    pub fn is_alive(&self) -> bool {
        self.state.lock().alive
    }

    pub fn set_on_painkillers(&self, value: bool) {
        self.state.lock().on_painkillers = value;
    }

    /// Local damage-application entry point for server-relayed damage.
    ///
    /// Presentation feedback first (bullet hits on the followed player
    /// only), then the health mutation. Mirrors the local simulation's own
    /// hit path so replicated and local hits feel identical.
    pub fn receive_damage(
        &self,
        event: &DamageEvent,
        body_part: BodyPart,
        collider: ColliderType,
        absorbed: f32,
        tuning: &FeedbackTuning,
    ) {
        if event.damage_type == DamageType::Bullet && self.is_your_player {
            let impulse = hit_feedback(event.damage, absorbed, body_part, self.on_painkillers(), tuning);
            debug!(
                profile_id = %self.profile_id,
                impulse = %debug_json(&impulse),
                "Queued hit feedback"
            );
            self.feedback.lock().push(impulse);
        }

        debug!(
            profile_id = %self.profile_id,
            damage_type = ?event.damage_type,
            damage = event.damage,
            body_part = ?body_part,
            collider = ?collider,
            "Applying replicated damage"
        );

        *self.last_aggressor.lock() = event.aggressor.clone();
        *self.last_weapon.lock() = event.weapon.clone();

        let mut state = self.state.lock();
        state.health = (state.health - event.damage).max(0.0);
        if state.health <= 0.0 && state.alive {
            state.alive = false;
            info!(profile_id = %self.profile_id, "Player died from replicated damage");
        }
    }

    /// Attribution of the most recent hit, if any.
    pub fn last_aggressor(&self) -> Option<Arc<PlayerBridge>> {
        self.last_aggressor.lock().clone()
    }

    pub fn last_weapon(&self) -> Option<Arc<Item>> {
        self.last_weapon.lock().clone()
    }

    /// Mark this player dead without running the damage path. Used when a
    /// kill packet arrives for a drone whose damage packets were lost or
    /// applied elsewhere first.
    pub fn kill(&self, damage_type: DamageType) {
        let mut state = self.state.lock();
        if state.alive {
            state.alive = false;
            state.health = 0.0;
            info!(profile_id = %self.profile_id, damage_type = ?damage_type, "Player marked dead");
        }
    }

    /// Drain queued presentation impulses. Called by the camera layer.
    pub fn drain_feedback(&self) -> Vec<FeedbackImpulse> {
        std::mem::take(&mut *self.feedback.lock())
    }

    fn on_painkillers(&self) -> bool {
        self.state.lock().on_painkillers
    }
}

/// Compute the presentation impulse for a bullet hit.
fn hit_feedback(
    damage: f32,
    absorbed: f32,
    body_part: BodyPart,
    on_painkillers: bool,
    tuning: &FeedbackTuning,
) -> FeedbackImpulse {
    let mut hands_shake = tuning.base_hands_shake;
    let mut camera_shake = tuning.base_camera_shake;

    match body_part {
        BodyPart::Head => {
            hands_shake = tuning.head_hands_shake;
            camera_shake = tuning.head_camera_shake;
        }
        BodyPart::LeftArm | BodyPart::RightArm => {
            hands_shake = tuning.arm_hands_shake;
            camera_shake = tuning.arm_camera_shake;
        }
        BodyPart::LeftLeg | BodyPart::RightLeg => {
            camera_shake = tuning.leg_camera_shake;
        }
        _ => {}
    }

    let total = absorbed + damage;
    let blur = if on_painkillers {
        total
    } else if body_part == BodyPart::Head {
        total * tuning.head_blur_scale
    } else {
        total * tuning.body_blur_scale
    };

    FeedbackImpulse {
        force: total.sqrt() / 10.0,
        hands_shake,
        camera_shake,
        blur,
    }
}

/// Broadcast this player's death to all peers.
pub fn broadcast_death(player: &Player, damage_type: DamageType, transport: &dyn Transport) {
    let packet = KillPacket {
        profile_id: player.profile_id().to_string(),
        damage_type,
    };
    info!(profile_id = %player.profile_id(), damage_type = ?damage_type, "Broadcasting death");
    transport.send(packet.encode());
}
