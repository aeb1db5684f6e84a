//! Time-ordered queue of deferred callbacks.
//!
//! Every timed state change in the world (affect expiry, DOT ticks, cooldown
//! expiry, script waits, room resets, object timers) is an [`EventPayload`]
//! parked here until its pulse comes up. The queue itself never runs game
//! code; [`crate::mud::events`] pops due entries and interprets them.
//!
//! Handles are stable across reschedules. Cancelling a handle removes the
//! entry and hands its payload back, after which the id is dead: popping,
//! rescheduling or cancelling it again is a no-op.

use crate::mud::types::{AffectId, CharId, DotId, EntityRef, EventId, ObjId, Pulse, RoomId, TrigId};
use log::{debug, warn};
use std::collections::{BTreeMap, HashMap};

/// What to do when an event comes due.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventPayload {
    AffectExpire { ch: CharId, affect: AffectId },
    RoomAffectExpire { room: RoomId, affect: AffectId },
    DotTick { ch: CharId, dot: DotId },
    CooldownExpire { ch: CharId, cooldown: u32 },
    TriggerWait { owner: EntityRef, trig: TrigId },
    RoomReset { room: RoomId },
    ObjTimer { obj: ObjId },
}

impl EventPayload {
    pub fn kind(&self) -> &'static str {
        match self {
            EventPayload::AffectExpire { .. } => "affect-expire",
            EventPayload::RoomAffectExpire { .. } => "room-affect-expire",
            EventPayload::DotTick { .. } => "dot-tick",
            EventPayload::CooldownExpire { .. } => "cooldown-expire",
            EventPayload::TriggerWait { .. } => "trigger-wait",
            EventPayload::RoomReset { .. } => "room-reset",
            EventPayload::ObjTimer { .. } => "obj-timer",
        }
    }
}

#[derive(Debug)]
struct Scheduled {
    fire_at: Pulse,
    seq: u64,
    payload: EventPayload,
}

/// The event being fired right now, if any.
#[derive(Debug, Clone, Copy)]
struct InFlight {
    id: EventId,
    cancelled: bool,
}

#[derive(Debug, Default)]
pub struct EventQueue {
    next_id: u64,
    next_seq: u64,
    order: BTreeMap<(Pulse, u64), EventId>,
    entries: HashMap<EventId, Scheduled>,
    in_flight: Option<InFlight>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&mut self, id: EventId, fire_at: Pulse, payload: EventPayload) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.order.insert((fire_at, seq), id);
        self.entries.insert(
            id,
            Scheduled {
                fire_at,
                seq,
                payload,
            },
        );
    }

    /// Queue `payload` to fire `delay` pulses after `now`. A delay below one
    /// pulse is raised to one so nothing fires in the pass that scheduled it.
    pub fn schedule(&mut self, now: Pulse, delay: u64, payload: EventPayload) -> EventId {
        let delay = delay.max(1);
        self.next_id += 1;
        let id = EventId(self.next_id);
        debug!("event {} scheduled: {} at +{}", id, payload.kind(), delay);
        self.insert(id, now + delay, payload);
        id
    }

    /// Remove a pending event and return its payload.
    ///
    /// Unknown or already-fired handles return `None`. Cancelling the event
    /// that is currently firing suppresses its reschedule.
    pub fn cancel(&mut self, id: EventId) -> Option<EventPayload> {
        if let Some(flight) = self.in_flight.as_mut() {
            if flight.id == id {
                flight.cancelled = true;
                return None;
            }
        }
        match self.entries.remove(&id) {
            Some(entry) => {
                self.order.remove(&(entry.fire_at, entry.seq));
                debug!("event {} cancelled: {}", id, entry.payload.kind());
                Some(entry.payload)
            }
            None => {
                debug!("event {} cancel ignored, not queued", id);
                None
            }
        }
    }

    pub fn is_queued(&self, id: EventId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Pulses left before `id` fires, or `None` when it is not queued.
    pub fn time_remaining(&self, id: EventId, now: Pulse) -> Option<Pulse> {
        self.entries
            .get(&id)
            .map(|entry| entry.fire_at.saturating_sub(now))
    }

    /// Absolute pulse at which `id` fires.
    pub fn fire_time(&self, id: EventId) -> Option<Pulse> {
        self.entries.get(&id).map(|entry| entry.fire_at)
    }

    /// Take the earliest event due at or before `now`.
    ///
    /// The returned id stays "in flight" until [`EventQueue::finish`] is
    /// called for it.
    pub fn pop_due(&mut self, now: Pulse) -> Option<(EventId, EventPayload)> {
        let (&key, &id) = self.order.iter().next()?;
        if key.0 > now {
            return None;
        }
        self.order.remove(&key);
        let entry = self.entries.remove(&id)?;
        self.in_flight = Some(InFlight {
            id,
            cancelled: false,
        });
        Some((id, entry.payload))
    }

    /// Close out the in-flight event. A positive `reschedule` requeues the
    /// same payload under the same id, unless the event was cancelled while
    /// it was firing.
    pub fn finish(&mut self, id: EventId, now: Pulse, reschedule: u64, payload: EventPayload) -> bool {
        let flight = match self.in_flight.take() {
            Some(flight) if flight.id == id => flight,
            other => {
                warn!("event {} finished but {:?} was in flight", id, other.map(|f| f.id));
                self.in_flight = other;
                return false;
            }
        };
        if flight.cancelled || reschedule == 0 {
            return false;
        }
        self.insert(id, now + reschedule, payload);
        true
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every pending event, returning how many were discarded.
    pub fn clear(&mut self) -> usize {
        let count = self.entries.len();
        self.entries.clear();
        self.order.clear();
        count
    }

    /// Pulse of the next pending event.
    pub fn next_due(&self) -> Option<Pulse> {
        self.order.keys().next().map(|(at, _)| *at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reset(room: u64) -> EventPayload {
        EventPayload::RoomReset { room: RoomId(room) }
    }

    #[test]
    fn fires_in_time_then_insertion_order() {
        let mut q = EventQueue::new();
        let late = q.schedule(0, 5, reset(1));
        let first = q.schedule(0, 2, reset(2));
        let second = q.schedule(0, 2, reset(3));
        assert_eq!(q.pop_due(1), None);

        let (id, payload) = q.pop_due(2).unwrap();
        assert_eq!(id, first);
        assert_eq!(payload, reset(2));
        q.finish(id, 2, 0, payload);

        let (id, payload) = q.pop_due(2).unwrap();
        assert_eq!(id, second);
        q.finish(id, 2, 0, payload);

        assert_eq!(q.pop_due(4), None);
        assert_eq!(q.pop_due(5).map(|(id, _)| id), Some(late));
    }

    #[test]
    fn zero_delay_is_one_pulse() {
        let mut q = EventQueue::new();
        let id = q.schedule(10, 0, reset(1));
        assert_eq!(q.time_remaining(id, 10), Some(1));
        assert!(q.pop_due(10).is_none());
    }

    #[test]
    fn cancel_is_final_and_idempotent() {
        let mut q = EventQueue::new();
        let id = q.schedule(0, 3, reset(7));
        assert_eq!(q.cancel(id), Some(reset(7)));
        assert_eq!(q.cancel(id), None);
        assert!(q.pop_due(100).is_none());
        assert!(q.is_empty());
    }

    #[test]
    fn reschedule_keeps_handle() {
        let mut q = EventQueue::new();
        let id = q.schedule(0, 1, reset(1));
        let (popped, payload) = q.pop_due(1).unwrap();
        assert!(q.finish(popped, 1, 4, payload));
        assert_eq!(q.fire_time(id), Some(5));
        assert_eq!(q.cancel(id), Some(reset(1)));
    }

    #[test]
    fn cancel_while_firing_blocks_reschedule() {
        let mut q = EventQueue::new();
        let id = q.schedule(0, 1, reset(1));
        let (popped, payload) = q.pop_due(1).unwrap();
        assert_eq!(q.cancel(popped), None);
        assert!(!q.finish(popped, 1, 4, payload));
        assert!(!q.is_queued(id));
    }
}
