//! Round State (`SPEC_FULL.md` §4.3).
//!
//! Counters are atomic; `per_vehicle_replied` is an array of atomic bools;
//! `pending_replies` and `client_timestamps` are guarded by independent
//! mutexes so the control path and the latency-accounting path never
//! contend with each other (`SPEC_FULL.md` §5).

use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU32, Ordering};
use std::sync::Mutex;

use crate::types::{Command, Timestamp, TimestampRecord, VehicleReply, VehicleState};

/// What happened as a result of recording one reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplyOutcome {
    /// Whether the reply was appended to `pending_replies`.
    pub appended: bool,
    /// Whether this was the vehicle's first reply this round (and so was
    /// actually counted) — duplicates are detected and not double-counted,
    /// fixing the known source bug in `SPEC_FULL.md` §9 item 3.
    pub counted: bool,
    /// Whether this reply was the one that completed the round
    /// (`replied_count + completed_count == N`).
    pub complete: bool,
}

/// The authoritative state of the current round.
pub struct RoundState {
    tick_id: AtomicU32,
    command: Mutex<Command>,
    sm_start_tstamp: Mutex<Timestamp>,
    per_vehicle_replied: Vec<AtomicBool>,
    replied_count: AtomicI32,
    completed_count: AtomicI32,
    /// Single counter folding `replied_count + completed_count` vs `N` into
    /// one atomic decrement, so exactly one thread observes completion
    /// (`SPEC_FULL.md` §5, §9).
    remaining: AtomicI32,
    pending_replies: Mutex<Vec<Vec<u8>>>,
    client_timestamps: Mutex<Vec<TimestampRecord>>,
}

impl RoundState {
    /// Create round state sized for `capacity` vehicles, starting at tick 0
    /// with no vehicles replied.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            tick_id: AtomicU32::new(0),
            command: Mutex::new(Command::Tick),
            sm_start_tstamp: Mutex::new(Timestamp::default()),
            per_vehicle_replied: (0..capacity).map(|_| AtomicBool::new(false)).collect(),
            replied_count: AtomicI32::new(0),
            completed_count: AtomicI32::new(0),
            remaining: AtomicI32::new(capacity as i32),
            pending_replies: Mutex::new(Vec::new()),
            client_timestamps: Mutex::new(Vec::new()),
        }
    }

    /// Reset all per-round state for a new round, arming the completion
    /// counter from `expected_count` (the scenario's `N`) rather than the
    /// registry's fixed storage capacity — `N` is only known once
    /// `StartScenario` arrives, and in general `capacity != N`.
    pub fn reset(&self, tick_id: u32, command: Command, sm_start_tstamp: Timestamp, expected_count: usize) {
        self.tick_id.store(tick_id, Ordering::Release);
        *self.command.lock().unwrap() = command;
        *self.sm_start_tstamp.lock().unwrap() = sm_start_tstamp;
        for flag in &self.per_vehicle_replied {
            flag.store(false, Ordering::Release);
        }
        self.replied_count.store(0, Ordering::Release);
        self.completed_count.store(0, Ordering::Release);
        self.remaining.store(expected_count as i32, Ordering::Release);
        self.pending_replies.lock().unwrap().clear();
        self.client_timestamps.lock().unwrap().clear();
    }

    /// The tick id of the current round.
    #[must_use]
    pub fn tick_id(&self) -> u32 {
        self.tick_id.load(Ordering::Acquire)
    }

    /// The command currently in effect for this round.
    #[must_use]
    pub fn command(&self) -> Command {
        *self.command.lock().unwrap()
    }

    /// The simulator-supplied round start time.
    #[must_use]
    pub fn sm_start_tstamp(&self) -> Timestamp {
        *self.sm_start_tstamp.lock().unwrap()
    }

    /// Whether vehicle `i` has replied (in any counted or appended sense)
    /// this round.
    #[must_use]
    pub fn has_replied(&self, vehicle_index: usize) -> bool {
        self.per_vehicle_replied
            .get(vehicle_index)
            .is_some_and(|f| f.load(Ordering::Acquire))
    }

    #[must_use]
    pub fn replied_count(&self) -> i32 {
        self.replied_count.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn completed_count(&self) -> i32 {
        self.completed_count.load(Ordering::Acquire)
    }

    /// Atomically swap out `pending_replies` and zero `replied_count`, per
    /// `GetVehicleUpdates` (`SPEC_FULL.md` §4.3). Does not touch
    /// `completed_count`, the reply bitmap, or `remaining` — those belong
    /// to the round, not the drain.
    pub fn drain(&self) -> Vec<Vec<u8>> {
        let mut guard = self.pending_replies.lock().unwrap();
        let drained = std::mem::take(&mut *guard);
        self.replied_count.store(0, Ordering::Release);
        drained
    }

    /// A snapshot of the timestamps collected so far this round.
    #[must_use]
    pub fn timestamps_snapshot(&self) -> Vec<TimestampRecord> {
        self.client_timestamps.lock().unwrap().clone()
    }

    fn try_count_once(&self, vehicle_index: usize) -> bool {
        self.per_vehicle_replied[vehicle_index]
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    fn decrement_remaining(&self) -> bool {
        self.remaining.fetch_sub(1, Ordering::AcqRel) == 1
    }

    /// Record a `SendUpdate` reply, applying the append policy from
    /// `SPEC_FULL.md` §4.4: append iff `is_edge`, or the vehicle is the
    /// spectator, or the reply is `TickDone`/`DebugInfoUpdate`.
    pub fn record_send_update(
        &self,
        reply: &VehicleReply,
        is_edge: bool,
        spectator_index: usize,
    ) -> ReplyOutcome {
        let should_append = is_edge
            || reply.vehicle_index == spectator_index
            || matches!(
                reply.state,
                VehicleState::TickDone | VehicleState::DebugInfoUpdate
            );
        if should_append {
            self.pending_replies.lock().unwrap().push(reply.raw.clone());
        }

        let counted = self.try_count_once(reply.vehicle_index);
        let mut complete = false;
        if counted {
            match reply.state {
                VehicleState::TickOk => {
                    self.replied_count.fetch_add(1, Ordering::AcqRel);
                    let record = TimestampRecord {
                        vehicle_index: reply.vehicle_index,
                        sm_start_tstamp: self.sm_start_tstamp(),
                        client_start_tstamp: reply.client_start_tstamp,
                        client_end_tstamp: reply.client_end_tstamp,
                        ecloud_rcv_tstamp: Timestamp::now(),
                        ecloud_snd_tstamp: Timestamp::default(),
                    };
                    self.client_timestamps.lock().unwrap().push(record);
                }
                VehicleState::TickDone | VehicleState::DebugInfoUpdate => {
                    self.completed_count.fetch_add(1, Ordering::AcqRel);
                }
                VehicleState::Registering | VehicleState::CarlaUpdate => {}
            }
            complete = self.decrement_remaining();
        }
        ReplyOutcome {
            appended: should_append,
            counted,
            complete,
        }
    }

    /// Record a `CarlaUpdate` registration reply (`Register`, second
    /// phase). Unlike `SendUpdate`, the append is unconditional — the
    /// original forwards every `CarlaUpdate` reply regardless of edge mode
    /// or spectator index.
    pub fn record_carla_update(&self, vehicle_index: usize, raw: Vec<u8>) -> ReplyOutcome {
        self.pending_replies.lock().unwrap().push(raw);
        let counted = self.try_count_once(vehicle_index);
        let mut complete = false;
        if counted {
            self.replied_count.fetch_add(1, Ordering::AcqRel);
            complete = self.decrement_remaining();
        }
        ReplyOutcome {
            appended: true,
            counted,
            complete,
        }
    }

    /// Stamp every collected timestamp record's `ecloud_snd_tstamp` just
    /// before they are pushed out, and return the stamped snapshot.
    pub fn stamp_and_take_timestamps(&self) -> Vec<TimestampRecord> {
        let now = Timestamp::now();
        let mut guard = self.client_timestamps.lock().unwrap();
        for record in guard.iter_mut() {
            record.ecloud_snd_tstamp = now;
        }
        guard.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reply(vehicle_index: usize, state: VehicleState) -> VehicleReply {
        VehicleReply {
            vehicle_index,
            tick_id: 1,
            state,
            client_start_tstamp: Timestamp::default(),
            client_end_tstamp: Timestamp::default(),
            raw: vec![vehicle_index as u8],
        }
    }

    #[test]
    fn completion_fires_exactly_once_at_n() {
        let round = RoundState::new(3);
        round.reset(1, Command::Tick, Timestamp::default(), 3);

        let o0 = round.record_send_update(&reply(0, VehicleState::TickOk), false, 0);
        assert!(!o0.complete);
        let o1 = round.record_send_update(&reply(1, VehicleState::TickOk), false, 0);
        assert!(!o1.complete);
        let o2 = round.record_send_update(&reply(2, VehicleState::TickDone), false, 0);
        assert!(o2.complete);

        assert_eq!(round.replied_count(), 2);
        assert_eq!(round.completed_count(), 1);
    }

    #[test]
    fn duplicate_reply_is_not_double_counted() {
        let round = RoundState::new(2);
        round.reset(1, Command::Tick, Timestamp::default(), 2);

        let first = round.record_send_update(&reply(0, VehicleState::TickOk), false, 0);
        assert!(first.counted);
        let dup = round.record_send_update(&reply(0, VehicleState::TickOk), false, 0);
        assert!(!dup.counted);
        assert_eq!(round.replied_count(), 1);
    }

    #[test]
    fn spectator_reply_always_appended_non_spectator_is_not() {
        let round = RoundState::new(2);
        round.reset(1, Command::Tick, Timestamp::default(), 2);

        let spectator = round.record_send_update(&reply(0, VehicleState::TickOk), false, 0);
        assert!(spectator.appended);
        let other = round.record_send_update(&reply(1, VehicleState::TickOk), false, 0);
        assert!(!other.appended);

        let drained = round.drain();
        assert_eq!(drained.len(), 1);
        assert_eq!(drained[0], vec![0u8]);
    }

    #[test]
    fn edge_mode_forwards_every_reply() {
        let round = RoundState::new(2);
        round.reset(1, Command::Tick, Timestamp::default(), 2);
        round.record_send_update(&reply(0, VehicleState::TickOk), true, 0);
        round.record_send_update(&reply(1, VehicleState::TickOk), true, 0);
        assert_eq!(round.drain().len(), 2);
    }

    #[test]
    fn drain_clears_pending_and_replied_count_only() {
        let round = RoundState::new(2);
        round.reset(1, Command::Tick, Timestamp::default(), 2);
        round.record_send_update(&reply(0, VehicleState::TickOk), true, 0);
        round.record_send_update(&reply(1, VehicleState::TickDone), true, 0);

        assert_eq!(round.drain().len(), 2);
        assert_eq!(round.replied_count(), 0);
        // completed_count survives the drain — only the next reset clears it.
        assert_eq!(round.completed_count(), 1);
    }

    #[test]
    fn reset_clears_everything() {
        let round = RoundState::new(2);
        round.reset(1, Command::Tick, Timestamp::default(), 2);
        round.record_send_update(&reply(0, VehicleState::TickOk), true, 0);

        round.reset(2, Command::End, Timestamp::default(), 2);
        assert_eq!(round.tick_id(), 2);
        assert_eq!(round.command(), Command::End);
        assert_eq!(round.replied_count(), 0);
        assert_eq!(round.completed_count(), 0);
        assert!(round.drain().is_empty());
        assert!(!round.has_replied(0));
    }
}
