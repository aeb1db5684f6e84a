//! Narrow interfaces to the subsystems this engine does not own.
//!
//! Text output, named tunables and persistence are all reached through the
//! types in this module. None of them block or perform I/O on the caller's
//! behalf.

use crate::logutil::escape_log;
use crate::mud::types::{CharId, EntityRef, ObjId, RoomId, VehId};
use chrono::{DateTime, Utc};
use log::{debug, info};
use std::collections::HashMap;

/// Who should see a line of text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    ToChar(CharId),
    ToRoom(RoomId),
    /// Everyone in the room except the given character.
    ToNotChar(RoomId, CharId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingText {
    pub audience: Audience,
    pub text: String,
}

/// Opaque sink for user-visible text.
pub trait MessageSink: Send {
    fn send(&mut self, audience: Audience, text: &str);

    /// Hand back everything buffered so far. Sinks that forward immediately
    /// return nothing.
    fn drain(&mut self) -> Vec<OutgoingText> {
        Vec::new()
    }
}

/// Keeps every line until drained.
#[derive(Debug, Default)]
pub struct BufferedSink {
    lines: Vec<OutgoingText>,
}

impl MessageSink for BufferedSink {
    fn send(&mut self, audience: Audience, text: &str) {
        self.lines.push(OutgoingText {
            audience,
            text: text.to_string(),
        });
    }

    fn drain(&mut self) -> Vec<OutgoingText> {
        std::mem::take(&mut self.lines)
    }
}

/// Writes every line to the log. Used by the standalone server, which has
/// no connections to deliver text to.
#[derive(Debug, Default)]
pub struct LogSink;

impl MessageSink for LogSink {
    fn send(&mut self, audience: Audience, text: &str) {
        info!("[{:?}] {}", audience, escape_log(text));
    }
}

/// Named integer tunables (`config_get_int`).
pub trait TunableLookup: Send {
    fn config_get_int(&self, key: &str) -> i64;
}

impl TunableLookup for HashMap<String, i64> {
    fn config_get_int(&self, key: &str) -> i64 {
        match self.get(key) {
            Some(v) => *v,
            None => {
                debug!("config_get_int: unknown tunable '{}'", escape_log(key));
                0
            }
        }
    }
}

/// Dirty marks for the persistence layer (`request_*_save_in_world`).
///
/// Each entity is recorded once with the time of its first request since the
/// last drain.
#[derive(Debug, Default)]
pub struct SaveRequests {
    dirty: HashMap<EntityRef, DateTime<Utc>>,
}

impl SaveRequests {
    fn mark(&mut self, target: EntityRef) {
        self.dirty.entry(target).or_insert_with(Utc::now);
    }

    pub fn request_char_save_in_world(&mut self, ch: CharId) {
        self.mark(EntityRef::Char(ch));
    }

    pub fn request_obj_save_in_world(&mut self, obj: ObjId) {
        self.mark(EntityRef::Obj(obj));
    }

    pub fn request_world_save(&mut self, room: RoomId) {
        self.mark(EntityRef::Room(room));
    }

    pub fn request_vehicle_save_in_world(&mut self, veh: VehId) {
        self.mark(EntityRef::Veh(veh));
    }

    pub fn is_dirty(&self, target: EntityRef) -> bool {
        self.dirty.contains_key(&target)
    }

    pub fn len(&self) -> usize {
        self.dirty.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dirty.is_empty()
    }

    /// Take all pending requests, oldest first.
    pub fn take_dirty(&mut self) -> Vec<(EntityRef, DateTime<Utc>)> {
        let mut out: Vec<_> = self.dirty.drain().collect();
        out.sort_by_key(|(_, at)| *at);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffered_sink_drains_in_order() {
        let mut sink = BufferedSink::default();
        sink.send(Audience::ToChar(CharId(1)), "one");
        sink.send(Audience::ToRoom(RoomId(2)), "two");
        let lines = sink.drain();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].text, "one");
        assert_eq!(lines[1].audience, Audience::ToRoom(RoomId(2)));
        assert!(sink.drain().is_empty());
    }

    #[test]
    fn unknown_tunable_is_zero() {
        let mut map = HashMap::new();
        map.insert("max_npc_attribute".to_string(), 12);
        assert_eq!(map.config_get_int("max_npc_attribute"), 12);
        assert_eq!(map.config_get_int("missing"), 0);
    }

    #[test]
    fn save_requests_dedupe() {
        let mut saves = SaveRequests::default();
        saves.request_char_save_in_world(CharId(4));
        saves.request_char_save_in_world(CharId(4));
        saves.request_world_save(RoomId(9));
        assert_eq!(saves.len(), 2);
        assert!(saves.is_dirty(EntityRef::Room(RoomId(9))));
        assert_eq!(saves.take_dirty().len(), 2);
        assert!(saves.is_empty());
    }
}
