//! Per-character cooldowns.
//!
//! A character has at most one cooldown of each type. Re-adding never
//! shortens an existing one.

use crate::mud::collab::Audience;
use crate::mud::scheduler::EventPayload;
use crate::mud::types::{CharId, EventId, Pulse};
use crate::mud::world::World;
use log::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cooldown {
    pub cooldown_type: u32,
    pub expire_at: Pulse,
    pub event: Option<EventId>,
}

/// Start (or extend) a cooldown of `duration` pulses.
///
/// An existing cooldown keeps the later of its current and the new expiry.
/// A non-positive duration only ever touches an existing entry.
pub fn add_cooldown(world: &mut World, ch: CharId, cooldown_type: u32, duration: i64) {
    let now = world.pulse();
    let wanted = now.saturating_add(duration.max(0) as u64);

    let (expire_at, old_event) = match world.char_mut(ch) {
        Some(c) => match c.cooldowns.iter_mut().find(|cd| cd.cooldown_type == cooldown_type) {
            Some(cd) => {
                if wanted <= cd.expire_at {
                    return;
                }
                cd.expire_at = wanted;
                (wanted, cd.event.take())
            }
            None if duration > 0 => {
                c.cooldowns.insert(
                    0,
                    Cooldown {
                        cooldown_type,
                        expire_at: wanted,
                        event: None,
                    },
                );
                (wanted, None)
            }
            None => return,
        },
        None => return,
    };

    if let Some(ev) = old_event {
        world.events.cancel(ev);
    }
    let ev = world.events.schedule(
        now,
        expire_at - now,
        EventPayload::CooldownExpire {
            ch,
            cooldown: cooldown_type,
        },
    );
    let is_npc = match world.char_mut(ch) {
        Some(c) => {
            if let Some(cd) = c.cooldowns.iter_mut().find(|cd| cd.cooldown_type == cooldown_type) {
                cd.event = Some(ev);
            }
            c.is_npc
        }
        None => return,
    };
    if !is_npc {
        world.saves.request_char_save_in_world(ch);
    }
}

/// Pulses left on a cooldown, 0 when not cooling down.
pub fn get_cooldown_time(world: &World, ch: CharId, cooldown_type: u32) -> u64 {
    let now = world.pulse();
    world
        .char(ch)
        .and_then(|c| c.cooldowns.iter().find(|cd| cd.cooldown_type == cooldown_type))
        .map(|cd| cd.expire_at.saturating_sub(now))
        .unwrap_or(0)
}

/// Silently remove all cooldowns of a type, cancelling their expiry.
pub fn remove_cooldown_by_type(world: &mut World, ch: CharId, cooldown_type: u32) -> bool {
    let events: Vec<Option<EventId>> = match world.char_mut(ch) {
        Some(c) => {
            let mut taken = Vec::new();
            c.cooldowns.retain_mut(|cd| {
                if cd.cooldown_type == cooldown_type {
                    taken.push(cd.event.take());
                    false
                } else {
                    true
                }
            });
            taken
        }
        None => return false,
    };
    let found = !events.is_empty();
    for ev in events.into_iter().flatten() {
        world.events.cancel(ev);
    }
    found
}

/// Expiry path used by the event pass.
pub(crate) fn cooldown_expired(world: &mut World, ch: CharId, cooldown_type: u32) -> bool {
    let removed = match world.char_mut(ch) {
        Some(c) => match c.cooldowns.iter().position(|cd| cd.cooldown_type == cooldown_type) {
            Some(pos) => {
                c.cooldowns[pos].event = None;
                c.cooldowns.remove(pos);
                true
            }
            None => false,
        },
        None => false,
    };
    if removed {
        debug!("cooldown {} ended for {}", cooldown_type, ch);
        world.send(
            Audience::ToChar(ch),
            &format!("Your cooldown {} has ended.", cooldown_type),
        );
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mud::entity::{Character, Room};

    fn setup() -> (World, CharId) {
        let mut world = World::new(Some(9));
        let room = world.add_room(Room::new(1, "R"));
        let ch = world.add_char(Character::player("Kit", 3));
        world.char_to_room(ch, room).unwrap();
        (world, ch)
    }

    #[test]
    fn shorter_cooldown_never_shortens() {
        let (mut world, ch) = setup();
        add_cooldown(&mut world, ch, 7, 100);
        world.set_pulse(20);
        add_cooldown(&mut world, ch, 7, 10);
        assert_eq!(get_cooldown_time(&world, ch, 7), 80);
        add_cooldown(&mut world, ch, 7, 200);
        assert_eq!(get_cooldown_time(&world, ch, 7), 200);
        assert_eq!(world.char(ch).unwrap().cooldowns.len(), 1);
        assert_eq!(world.events.len(), 1);
    }

    #[test]
    fn zero_duration_does_not_create() {
        let (mut world, ch) = setup();
        add_cooldown(&mut world, ch, 3, 0);
        assert_eq!(get_cooldown_time(&world, ch, 3), 0);
        assert!(world.events.is_empty());
    }

    #[test]
    fn remove_cancels_expiry() {
        let (mut world, ch) = setup();
        add_cooldown(&mut world, ch, 3, 50);
        assert!(remove_cooldown_by_type(&mut world, ch, 3));
        assert!(world.events.is_empty());
        assert!(!remove_cooldown_by_type(&mut world, ch, 3));
    }
}
