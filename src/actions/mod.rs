//! Deferred action synchronizer
//!
//! Local player actions (eating, medding, drawing a weapon, swinging a
//! knife) span multiple simulation frames because they are driven by
//! animation. Replication needs a single "it actually happened" moment.
//! The synchronizer wraps each action's controller, advances it once per
//! frame, emits the action's outcome packet only when the action confirms,
//! and guarantees the post-action resource sync fires exactly once at
//! teardown no matter how the action ended.

use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, info, warn};

use crate::dispatch::Transport;
use crate::packets::{
    debug_json, BodyPart, Packet, ProceedFoodDrinkPacket, ProceedGrenadePacket,
    ProceedKnifePacket, ProceedMedsPacket, ProceedSyncPacket, ProceedWeaponPacket,
};
use crate::weapon::Item;

/// The action kinds the overlay replicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    UseFoodDrink,
    UseMeds,
    DrawWeapon,
    DrawKnife,
    QuickKnife,
    ThrowGrenade,
}

impl ActionKind {
    /// Consumable actions track a before/after resource delta and owe the
    /// peers a sync packet at teardown.
    fn tracks_resource(self) -> bool {
        matches!(self, Self::UseFoodDrink | Self::UseMeds)
    }
}

/// Whether the controller resolves within the `begin_action` call or spans
/// frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionPolicy {
    Sync,
    Async,
}

/// How the action's success is decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationPolicy {
    /// The action counts as succeeded by reaching its end.
    AlwaysSucceed,
    /// The controller must report an explicit success flag (actions that can
    /// fail mid-stream, e.g. an interrupted melee swing).
    RequireConfirmed,
}

/// Lifecycle of one wrapped action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionState {
    Started,
    Running,
    Confirmed,
    Rejected,
}

/// Cooperative frame-spanning controller driving the in-engine animation.
/// `advance` is called once per simulation frame.
pub trait ActionController: Send {
    fn advance(&mut self) -> ControllerStep;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerStep {
    Running,
    Done { succeed: bool },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActionError {
    #[error("a non-skippable action is still running")]
    Busy,
}

/// Resource accounting for one in-flight consumable action.
///
/// At most one record is live per player; it is cleared the instant the
/// action's controller is torn down.
struct DeferredActionRecord {
    item: Arc<Item>,
    previous_amount: Option<f32>,
    new_value: Option<f32>,
}

struct RunningAction {
    kind: ActionKind,
    controller: Box<dyn ActionController>,
    confirmation: ConfirmationPolicy,
    skippable: bool,
    /// Pre-encoded outcome packet, sent only on confirmation.
    outcome: Bytes,
}

/// Result handed to dependent local systems when an action resolves.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompletedAction {
    pub kind: ActionKind,
    pub confirmed: bool,
    /// Final resource amount, for consumable actions.
    pub final_amount: Option<f32>,
}

/// Per-player action synchronizer. Owned by the local player object;
/// drone players never run one.
pub struct ActionSynchronizer {
    profile_id: String,
    transport: Arc<dyn Transport>,
    running: Option<RunningAction>,
    record: Option<DeferredActionRecord>,
    /// Lifecycle state of the current or most recently resolved action.
    state: Option<ActionState>,
}

impl ActionSynchronizer {
    pub fn new(profile_id: impl Into<String>, transport: Arc<dyn Transport>) -> Self {
        Self {
            profile_id: profile_id.into(),
            transport,
            running: None,
            record: None,
            state: None,
        }
    }

    pub fn profile_id(&self) -> &str {
        &self.profile_id
    }

    /// State of the current action, or how the last one resolved.
    pub fn state(&self) -> Option<ActionState> {
        self.state
    }

    pub fn is_busy(&self) -> bool {
        self.running.is_some()
    }

    /// Begin a wrapped action.
    ///
    /// A running skippable action is pre-empted (its teardown accounting
    /// still runs); a running non-skippable action rejects the newcomer.
    #[allow(clippy::too_many_arguments)]
    pub fn begin_action(
        &mut self,
        kind: ActionKind,
        item: &Arc<Item>,
        controller: Box<dyn ActionController>,
        completion: CompletionPolicy,
        confirmation: ConfirmationPolicy,
        skippable: bool,
        outcome: Bytes,
    ) -> Result<Option<CompletedAction>, ActionError> {
        if let Some(running) = &self.running {
            if !running.skippable {
                warn!(
                    profile_id = %self.profile_id,
                    running_kind = ?running.kind,
                    requested_kind = ?kind,
                    "Rejecting action, current one cannot be skipped"
                );
                return Err(ActionError::Busy);
            }
            info!(
                profile_id = %self.profile_id,
                abandoned_kind = ?running.kind,
                requested_kind = ?kind,
                "Pre-empting running action"
            );
            self.running = None;
            self.finalize_record();
        }

        if kind.tracks_resource() {
            self.record = Some(DeferredActionRecord {
                item: item.clone(),
                previous_amount: Some(item.resource()),
                new_value: None,
            });
        }

        debug!(profile_id = %self.profile_id, kind = ?kind, item_id = %item.id(), "Action started");
        self.state = Some(ActionState::Started);
        self.running = Some(RunningAction {
            kind,
            controller,
            confirmation,
            skippable,
            outcome,
        });

        // Sync actions resolve before begin_action returns.
        if completion == CompletionPolicy::Sync {
            let completed = self.tick();
            if completed.is_none() {
                warn!(
                    profile_id = %self.profile_id,
                    kind = ?kind,
                    "Sync action did not resolve on first advance"
                );
            }
            return Ok(completed);
        }
        Ok(None)
    }

    /// Capture an explicit final resource value before teardown. Without
    /// this, teardown recomputes the value from the item's live state.
    pub fn capture_result(&mut self, amount: f32) {
        match &mut self.record {
            Some(record) => record.new_value = Some(amount),
            None => warn!(
                profile_id = %self.profile_id,
                amount,
                "No action record to capture a result into"
            ),
        }
    }

    /// Advance the running action by one frame. Returns the completed
    /// action when this frame resolved it.
    pub fn tick(&mut self) -> Option<CompletedAction> {
        let running = self.running.as_mut()?;
        match running.controller.advance() {
            ControllerStep::Running => {
                self.state = Some(ActionState::Running);
                None
            }
            ControllerStep::Done { succeed } => {
                let confirmed = match running.confirmation {
                    ConfirmationPolicy::AlwaysSucceed => true,
                    ConfirmationPolicy::RequireConfirmed => succeed,
                };
                let kind = running.kind;
                let outcome = running.outcome.clone();
                self.running = None;
                self.state = Some(if confirmed {
                    ActionState::Confirmed
                } else {
                    ActionState::Rejected
                });

                if confirmed {
                    info!(profile_id = %self.profile_id, kind = ?kind, "Action confirmed");
                    self.transport.send(outcome);
                } else {
                    info!(
                        profile_id = %self.profile_id,
                        kind = ?kind,
                        "Action rejected, no outcome packet"
                    );
                }

                let final_amount = self.finalize_record();
                Some(CompletedAction {
                    kind,
                    confirmed,
                    final_amount,
                })
            }
        }
    }

    /// Abandon the running action (controller torn down externally, e.g.
    /// player death). Teardown accounting still runs.
    pub fn cancel(&mut self) {
        if let Some(running) = self.running.take() {
            info!(profile_id = %self.profile_id, kind = ?running.kind, "Action cancelled");
            self.state = None;
        }
        self.finalize_record();
    }

    /// Teardown accounting: if a record is live, finalize the resource delta
    /// (recomputing the final value from the item when none was captured)
    /// and emit the sync packet before clearing it.
    fn finalize_record(&mut self) -> Option<f32> {
        let record = self.record.take()?;
        let new_value = record
            .new_value
            .unwrap_or_else(|| record.item.resource());

        let packet = ProceedSyncPacket {
            profile_id: self.profile_id.clone(),
            item_id: record.item.id().to_string(),
            new_value,
            stack_count: record.item.stack_count(),
        };
        debug!(
            packet = %debug_json(&packet),
            previous_amount = ?record.previous_amount,
            "Post-action resource sync"
        );
        self.transport.send(packet.encode());
        Some(new_value)
    }

    // Convenience wrappers for the replicated action kinds. Each builds the
    // outcome packet up front; the synchronizer sends it on confirmation.

    pub fn use_food_drink(
        &mut self,
        item: &Arc<Item>,
        amount: f32,
        animation_variant: i32,
        scheduled: bool,
        controller: Box<dyn ActionController>,
    ) -> Result<Option<CompletedAction>, ActionError> {
        let outcome = ProceedFoodDrinkPacket {
            profile_id: self.profile_id.clone(),
            item_id: item.id().to_string(),
            template_id: item.template_id().to_string(),
            amount,
            animation_variant,
            scheduled,
        }
        .encode();
        self.begin_action(
            ActionKind::UseFoodDrink,
            item,
            controller,
            CompletionPolicy::Async,
            ConfirmationPolicy::AlwaysSucceed,
            true,
            outcome,
        )
    }

    pub fn use_meds(
        &mut self,
        item: &Arc<Item>,
        body_part: BodyPart,
        animation_variant: i32,
        scheduled: bool,
        controller: Box<dyn ActionController>,
    ) -> Result<Option<CompletedAction>, ActionError> {
        let outcome = ProceedMedsPacket {
            profile_id: self.profile_id.clone(),
            item_id: item.id().to_string(),
            template_id: item.template_id().to_string(),
            body_part,
            animation_variant,
            scheduled,
            amount: 1.0,
        }
        .encode();
        self.begin_action(
            ActionKind::UseMeds,
            item,
            controller,
            CompletionPolicy::Async,
            ConfirmationPolicy::AlwaysSucceed,
            true,
            outcome,
        )
    }

    pub fn draw_weapon(
        &mut self,
        item: &Arc<Item>,
        scheduled: bool,
        controller: Box<dyn ActionController>,
    ) -> Result<Option<CompletedAction>, ActionError> {
        let outcome = ProceedWeaponPacket {
            profile_id: self.profile_id.clone(),
            item_id: item.id().to_string(),
            scheduled,
        }
        .encode();
        self.begin_action(
            ActionKind::DrawWeapon,
            item,
            controller,
            CompletionPolicy::Async,
            ConfirmationPolicy::AlwaysSucceed,
            true,
            outcome,
        )
    }

    pub fn draw_knife(
        &mut self,
        item: &Arc<Item>,
        scheduled: bool,
        controller: Box<dyn ActionController>,
    ) -> Result<Option<CompletedAction>, ActionError> {
        let outcome = ProceedKnifePacket {
            profile_id: self.profile_id.clone(),
            item_id: item.id().to_string(),
            scheduled,
            quick_knife: false,
        }
        .encode();
        self.begin_action(
            ActionKind::DrawKnife,
            item,
            controller,
            CompletionPolicy::Async,
            ConfirmationPolicy::RequireConfirmed,
            true,
            outcome,
        )
    }

    /// Quick melee swing: resolves synchronously, can fail mid-stream, and
    /// cannot be pre-empted.
    pub fn quick_knife(
        &mut self,
        item: &Arc<Item>,
        scheduled: bool,
        controller: Box<dyn ActionController>,
    ) -> Result<Option<CompletedAction>, ActionError> {
        let outcome = ProceedKnifePacket {
            profile_id: self.profile_id.clone(),
            item_id: item.id().to_string(),
            scheduled,
            quick_knife: true,
        }
        .encode();
        self.begin_action(
            ActionKind::QuickKnife,
            item,
            controller,
            CompletionPolicy::Sync,
            ConfirmationPolicy::RequireConfirmed,
            false,
            outcome,
        )
    }

    pub fn throw_grenade(
        &mut self,
        item: &Arc<Item>,
        scheduled: bool,
        controller: Box<dyn ActionController>,
    ) -> Result<Option<CompletedAction>, ActionError> {
        let outcome = ProceedGrenadePacket {
            profile_id: self.profile_id.clone(),
            item_id: item.id().to_string(),
            scheduled,
        }
        .encode();
        self.begin_action(
            ActionKind::ThrowGrenade,
            item,
            controller,
            CompletionPolicy::Async,
            ConfirmationPolicy::AlwaysSucceed,
            true,
            outcome,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::RecordingTransport;
    use crate::packets::peek_method;

    /// Scripted controller: runs for `frames` frames, then finishes.
    struct Scripted {
        frames: u32,
        succeed: bool,
    }

    impl Scripted {
        fn frames(frames: u32) -> Box<dyn ActionController> {
            Box::new(Self {
                frames,
                succeed: true,
            })
        }

        fn failing() -> Box<dyn ActionController> {
            Box::new(Self {
                frames: 0,
                succeed: false,
            })
        }
    }

    impl ActionController for Scripted {
        fn advance(&mut self) -> ControllerStep {
            if self.frames == 0 {
                ControllerStep::Done {
                    succeed: self.succeed,
                }
            } else {
                self.frames -= 1;
                ControllerStep::Running
            }
        }
    }

    fn setup() -> (ActionSynchronizer, Arc<RecordingTransport>) {
        let transport = Arc::new(RecordingTransport::new());
        let sync = ActionSynchronizer::new("p1", transport.clone());
        (sync, transport)
    }

    fn meds_item(resource: f32) -> Arc<Item> {
        Item::new("ifak-1", "590c678286f77426c9660122", resource)
    }

    #[test]
    fn confirmed_meds_use_emits_outcome_then_recomputed_sync() {
        let (mut sync, transport) = setup();
        let item = meds_item(100.0);

        sync.use_meds(&item, BodyPart::LeftLeg, 0, true, Scripted::frames(3))
            .unwrap();
        assert_eq!(sync.state(), Some(ActionState::Started));

        // Action spans frames; no packets yet.
        for _ in 0..3 {
            assert!(sync.tick().is_none());
            assert_eq!(sync.state(), Some(ActionState::Running));
            assert!(transport.sent().is_empty());
        }

        // The animation consumed resource without an explicit capture.
        item.set_resource(40.0);

        let completed = sync.tick().unwrap();
        assert!(completed.confirmed);
        assert_eq!(completed.final_amount, Some(40.0));
        assert!(!sync.is_busy());

        let sent = transport.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(peek_method(&sent[0]).unwrap(), ProceedMedsPacket::METHOD);
        let synced = ProceedSyncPacket::decode(&sent[1]).unwrap();
        assert_eq!(synced.new_value, 40.0);
        assert_eq!(synced.item_id, "ifak-1");

        // Teardown ran once; further frames are inert.
        assert!(sync.tick().is_none());
        assert_eq!(transport.sent().len(), 2);
    }

    #[test]
    fn explicit_capture_wins_over_recomputation() {
        let (mut sync, transport) = setup();
        let item = meds_item(100.0);

        sync.use_meds(&item, BodyPart::Chest, 0, true, Scripted::frames(1))
            .unwrap();
        sync.capture_result(62.5);
        item.set_resource(1.0); // live state diverged; capture is authoritative

        sync.tick();
        let completed = sync.tick().unwrap();
        assert_eq!(completed.final_amount, Some(62.5));

        let sent = transport.sent();
        let synced = ProceedSyncPacket::decode(&sent[1]).unwrap();
        assert_eq!(synced.new_value, 62.5);
    }

    #[test]
    fn failed_quick_knife_emits_nothing() {
        let (mut sync, transport) = setup();
        let item = Item::new("blade-1", "knife-template", 0.0);

        let completed = sync.quick_knife(&item, true, Scripted::failing()).unwrap();
        assert_eq!(
            completed,
            Some(CompletedAction {
                kind: ActionKind::QuickKnife,
                confirmed: false,
                final_amount: None,
            })
        );
        assert!(transport.sent().is_empty());
        assert!(!sync.is_busy());
    }

    #[test]
    fn confirmed_quick_knife_resolves_synchronously() {
        let (mut sync, transport) = setup();
        let item = Item::new("blade-1", "knife-template", 0.0);

        let completed = sync.quick_knife(&item, true, Scripted::frames(0)).unwrap();
        assert!(completed.unwrap().confirmed);

        let sent = transport.sent();
        assert_eq!(sent.len(), 1);
        let packet = ProceedKnifePacket::decode(&sent[0]).unwrap();
        assert!(packet.quick_knife);
    }

    #[test]
    fn resolution_is_visible_through_state() {
        let (mut sync, _transport) = setup();
        let blade = Item::new("blade-1", "knife-template", 0.0);

        assert_eq!(sync.state(), None);

        sync.quick_knife(&blade, true, Scripted::frames(0)).unwrap();
        assert_eq!(sync.state(), Some(ActionState::Confirmed));

        sync.quick_knife(&blade, true, Scripted::failing()).unwrap();
        assert_eq!(sync.state(), Some(ActionState::Rejected));
        assert!(!sync.is_busy());
    }

    #[test]
    fn non_skippable_action_rejects_newcomers() {
        let (mut sync, _transport) = setup();
        let blade = Item::new("blade-1", "knife-template", 0.0);
        let meds = meds_item(100.0);

        // A quick knife that never resolves on its sync advance stays busy.
        sync.quick_knife(&blade, true, Scripted::frames(5)).unwrap();
        assert!(sync.is_busy());

        let err = sync
            .use_meds(&meds, BodyPart::Chest, 0, true, Scripted::frames(1))
            .unwrap_err();
        assert_eq!(err, ActionError::Busy);
    }

    #[test]
    fn preempted_consumable_still_syncs_exactly_once() {
        let (mut sync, transport) = setup();
        let food = Item::new("water-1", "water-template", 100.0);
        let weapon = Item::new("ak74-1", "ak-template", 0.0);

        sync.use_food_drink(&food, 0.25, 0, true, Scripted::frames(10))
            .unwrap();
        food.set_resource(75.0);

        // New action pre-empts; the abandoned record must finalize from
        // live item state.
        sync.draw_weapon(&weapon, true, Scripted::frames(2)).unwrap();

        let sent = transport.sent();
        assert_eq!(sent.len(), 1);
        let synced = ProceedSyncPacket::decode(&sent[0]).unwrap();
        assert_eq!(synced.item_id, "water-1");
        assert_eq!(synced.new_value, 75.0);

        // The weapon draw confirms later and owes no resource sync.
        sync.tick();
        sync.tick();
        let completed = sync.tick().unwrap();
        assert!(completed.confirmed);
        assert_eq!(completed.final_amount, None);

        let sent = transport.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(peek_method(&sent[1]).unwrap(), ProceedWeaponPacket::METHOD);
    }

    #[test]
    fn cancel_runs_teardown_accounting() {
        let (mut sync, transport) = setup();
        let item = meds_item(100.0);

        sync.use_meds(&item, BodyPart::Chest, 0, true, Scripted::frames(10))
            .unwrap();
        item.set_resource(90.0);
        sync.cancel();

        let sent = transport.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(ProceedSyncPacket::decode(&sent[0]).unwrap().new_value, 90.0);
        assert!(!sync.is_busy());

        // No double accounting.
        sync.cancel();
        assert_eq!(transport.sent().len(), 1);
    }
}
