//! Timed modifiers on characters and rooms, and damage-over-time effects.
//!
//! Derived stats are never patched in place for long: every change ends in
//! [`affect_total`], which takes all gear, passive and timed contributions
//! off, resets to the real values and puts them all back on.

use crate::mud::collab::Audience;
use crate::mud::entity::{Attributes, Character, ObjApply};
use crate::mud::scheduler::EventPayload;
use crate::mud::types::{AffFlags, AffectId, Apply, CharId, DotId, EventId, Pulse, RoomAffFlags, RoomId};
use crate::mud::world::World;
use bitflags::bitflags;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

/// Duration sentinel for affects that never expire on their own.
pub const UNLIMITED: i64 = -1;

/// Pulses between two ticks of a damage-over-time effect.
pub const DOT_TICK_PULSES: u64 = 50;

bitflags! {
    /// How [`affect_join`] merges with an existing affect of the same signature.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
    pub struct JoinFlags: u8 {
        const ADD_DURATION = 1 << 0;
        const AVG_DURATION = 1 << 1;
        const ADD_MODIFIER = 1 << 2;
        const AVG_MODIFIER = 1 << 3;
    }
}

/// A timed modifier on a character or room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AffectedType {
    pub id: AffectId,
    /// Source ability/spell/effect.
    pub atype: u32,
    pub cast_by: Option<CharId>,
    /// Absolute expiry pulse; `None` never expires.
    pub expire_at: Option<Pulse>,
    pub modifier: i32,
    pub location: Apply,
    /// AFF_x bits for characters, ROOM_AFF_x bits for rooms.
    pub bitvector: u64,
    #[serde(skip)]
    pub expire_event: Option<EventId>,
}

impl AffectedType {
    /// Pulses left at `now`, or `None` for unlimited.
    pub fn remaining(&self, now: Pulse) -> Option<u64> {
        self.expire_at.map(|at| at.saturating_sub(now))
    }

    pub fn char_flags(&self) -> AffFlags {
        AffFlags::from_bits_truncate(self.bitvector)
    }

    pub fn room_flags(&self) -> RoomAffFlags {
        RoomAffFlags::from_bits_truncate(self.bitvector)
    }

    fn same_signature(&self, other: &AffectedType) -> bool {
        self.atype == other.atype && self.location == other.location && self.bitvector == other.bitvector
    }
}

/// Build a new affect that expires `duration` pulses from now
/// (or never, for [`UNLIMITED`]).
pub fn create_aff(
    world: &mut World,
    atype: u32,
    duration: i64,
    location: Apply,
    modifier: i32,
    bitvector: u64,
    cast_by: Option<CharId>,
) -> AffectedType {
    let expire_at = if duration == UNLIMITED {
        None
    } else {
        Some(world.pulse() + duration.max(1) as u64)
    };
    AffectedType {
        id: AffectId(world.alloc_uid()),
        atype,
        cast_by,
        expire_at,
        modifier,
        location,
        bitvector,
        expire_event: None,
    }
}

const ATTRIBUTE_APPLIES: [Apply; 6] = [
    Apply::Strength,
    Apply::Dexterity,
    Apply::Charisma,
    Apply::Greatness,
    Apply::Intelligence,
    Apply::Wits,
];

fn add_clamped(slot: &mut i32, delta: i32) {
    *slot = slot.saturating_add(delta);
}

/// Apply (or with `add == false`, take back) one modifier on `ch`.
pub fn affect_modify(ch: &mut Character, location: Apply, modifier: i32, bits: AffFlags, add: bool) {
    let delta = if add {
        ch.aff_flags |= bits;
        modifier
    } else {
        ch.aff_flags.remove(bits);
        -modifier
    };

    if let Some(slot) = ch.current.slot_mut(location) {
        add_clamped(slot, delta);
        return;
    }
    let d = &mut ch.derived;
    match location {
        Apply::None => {}
        Apply::Age => add_clamped(&mut d.age_modifier, delta),
        Apply::Move => {
            add_clamped(&mut d.max_move, delta);
            add_clamped(&mut ch.pools.move_points, delta);
        }
        Apply::Health => {
            add_clamped(&mut d.max_health, delta);
            add_clamped(&mut ch.pools.health, delta);
        }
        Apply::Mana => {
            add_clamped(&mut d.max_mana, delta);
            add_clamped(&mut ch.pools.mana, delta);
        }
        Apply::Blood => add_clamped(&mut d.max_blood, delta),
        Apply::Soak => add_clamped(&mut d.soak, delta),
        Apply::ToHit => add_clamped(&mut d.to_hit, delta),
        Apply::Dodge => add_clamped(&mut d.dodge, delta),
        Apply::Block => add_clamped(&mut d.block, delta),
        Apply::HealthRegen => add_clamped(&mut d.health_regen, delta),
        Apply::MoveRegen => add_clamped(&mut d.move_regen, delta),
        Apply::ManaRegen => add_clamped(&mut d.mana_regen, delta),
        Apply::BonusPhysical => add_clamped(&mut d.bonus_physical, delta),
        Apply::BonusMagical => add_clamped(&mut d.bonus_magical, delta),
        Apply::BonusHealing => add_clamped(&mut d.bonus_healing, delta),
        Apply::HealOverTime => add_clamped(&mut d.heal_over_time, delta),
        Apply::Inventory => add_clamped(&mut d.bonus_inventory, delta),
        // attribute applies were handled above
        _ => {}
    }
}

/// Keep every attribute in `0..=max`. A non-positive `max` means the
/// tunable is unset and only the floor applies.
fn clamp_attributes(current: &mut Attributes, max: i64) {
    let max = if max > 0 { max.min(i32::MAX as i64) as i32 } else { i32::MAX };
    for apply in ATTRIBUTE_APPLIES {
        if let Some(slot) = current.slot_mut(apply) {
            *slot = (*slot).clamp(0, max);
        }
    }
}

/// Recompute every derived value on `ch` from scratch.
///
/// Current pools are kept across the recompute and then clamped to the new
/// maximums. Attributes are clamped to the `max_player_attribute` or
/// `max_npc_attribute` tunable. Nested calls while a recompute is running
/// are ignored.
pub fn affect_total(world: &mut World, ch: CharId) {
    if world.affect_total_running {
        return;
    }

    let gear: Vec<(Vec<ObjApply>, AffFlags)> = match world.char(ch) {
        Some(c) => c
            .equipment
            .iter()
            .filter(|(slot, _)| slot.counts_stats())
            .filter_map(|(_, obj)| world.obj(*obj))
            .map(|o| (o.applies.clone(), o.aff_flags))
            .collect(),
        None => return,
    };
    let pool_bonus = world.config_get_int("pool_bonus_amount") as i32;
    let att_max = match world.char(ch) {
        Some(c) if !c.is_npc => world.config_get_int("max_player_attribute"),
        _ => world.config_get_int("max_npc_attribute"),
    };

    world.affect_total_running = true;
    if let Some(c) = world.char_mut(ch) {
        let saved = c.pools;
        let passives = c.passive_buffs.clone();
        let timed: Vec<(Apply, i32, AffFlags)> = c
            .affected
            .iter()
            .map(|a| (a.location, a.modifier, a.char_flags()))
            .collect();

        for (applies, flags) in &gear {
            affect_modify(c, Apply::None, 0, *flags, false);
            for ap in applies {
                affect_modify(c, ap.location, ap.modifier, AffFlags::empty(), false);
            }
        }
        for ap in &passives {
            affect_modify(c, ap.location, ap.modifier, AffFlags::empty(), false);
        }
        for (loc, m, bits) in &timed {
            affect_modify(c, *loc, *m, *bits, false);
        }

        c.current = c.real;
        c.derived = c.base;
        c.aff_flags = c.innate_flags;
        if !c.is_npc {
            c.derived.max_health += pool_bonus;
            c.derived.max_move += pool_bonus;
            c.derived.max_mana += pool_bonus;
        }

        for (applies, flags) in &gear {
            affect_modify(c, Apply::None, 0, *flags, true);
            for ap in applies {
                affect_modify(c, ap.location, ap.modifier, AffFlags::empty(), true);
            }
        }
        for ap in &passives {
            affect_modify(c, ap.location, ap.modifier, AffFlags::empty(), true);
        }
        for (loc, m, bits) in &timed {
            affect_modify(c, *loc, *m, *bits, true);
        }

        clamp_attributes(&mut c.current, att_max);

        c.pools = saved;
        c.pools.health = c.pools.health.min(c.derived.max_health);
        c.pools.move_points = c.pools.move_points.min(c.derived.max_move);
        c.pools.mana = c.pools.mana.min(c.derived.max_mana);
        c.pools.blood = c.pools.blood.min(c.derived.max_blood.max(0));
    }
    world.affect_total_running = false;
}

/// Attach an affect to a character (newest first) and schedule its expiry.
pub fn affect_to_char(world: &mut World, ch: CharId, mut af: AffectedType) {
    if world.char(ch).is_none() {
        warn!("affect_to_char: no character {}", ch);
        return;
    }
    let now = world.pulse();
    if let Some(at) = af.expire_at {
        let id = af.id;
        af.expire_event = Some(world.events.schedule(
            now,
            at.saturating_sub(now),
            EventPayload::AffectExpire { ch, affect: id },
        ));
    }
    let is_npc = match world.char_mut(ch) {
        Some(c) => {
            let (loc, m, bits) = (af.location, af.modifier, af.char_flags());
            c.affected.insert(0, af);
            affect_modify(c, loc, m, bits, true);
            c.is_npc
        }
        None => return,
    };
    affect_total(world, ch);
    if !is_npc {
        world.saves.request_char_save_in_world(ch);
    }
}

/// Remove one affect by id, cancelling its expiry. Returns whether it existed.
pub fn affect_remove(world: &mut World, ch: CharId, affect: AffectId) -> bool {
    let removed = match world.char_mut(ch) {
        Some(c) => match c.affected.iter().position(|a| a.id == affect) {
            Some(pos) => {
                let af = c.affected.remove(pos);
                affect_modify(c, af.location, af.modifier, af.char_flags(), false);
                af
            }
            None => return false,
        },
        None => return false,
    };
    if let Some(ev) = removed.expire_event {
        world.events.cancel(ev);
    }
    affect_total(world, ch);
    true
}

fn remove_matching<F>(world: &mut World, ch: CharId, pred: F) -> usize
where
    F: Fn(&AffectedType) -> bool,
{
    let ids: Vec<AffectId> = match world.char(ch) {
        Some(c) => c.affected.iter().filter(|a| pred(a)).map(|a| a.id).collect(),
        None => return 0,
    };
    ids.into_iter()
        .filter(|id| affect_remove(world, ch, *id))
        .count()
}

/// Remove every affect of `atype`, optionally telling the character.
pub fn affect_from_char(world: &mut World, ch: CharId, atype: u32, show_msg: bool) -> usize {
    let n = remove_matching(world, ch, |a| a.atype == atype);
    if n > 0 && show_msg {
        world.send(Audience::ToChar(ch), &wear_off_text(atype));
    }
    n
}

pub fn affect_from_char_by_apply(world: &mut World, ch: CharId, atype: u32, apply: Apply) -> usize {
    remove_matching(world, ch, |a| a.atype == atype && a.location == apply)
}

pub fn affect_from_char_by_bitvector(world: &mut World, ch: CharId, atype: u32, bits: AffFlags) -> usize {
    remove_matching(world, ch, |a| a.atype == atype && a.char_flags().intersects(bits))
}

/// Remove every affect, of any type, that grants `flag`.
pub fn affects_from_char_by_aff_flag(world: &mut World, ch: CharId, flag: AffFlags) -> usize {
    remove_matching(world, ch, |a| a.char_flags().intersects(flag))
}

pub fn affected_by_spell(world: &World, ch: CharId, atype: u32) -> bool {
    world
        .char(ch)
        .map(|c| c.affected.iter().any(|a| a.atype == atype))
        .unwrap_or(false)
}

pub fn affected_by_spell_and_apply(world: &World, ch: CharId, atype: u32, apply: Apply) -> bool {
    world
        .char(ch)
        .map(|c| c.affected.iter().any(|a| a.atype == atype && a.location == apply))
        .unwrap_or(false)
}

/// Attach `af`, merging it into an existing affect with the same
/// type, location and bitvector according to `flags`.
pub fn affect_join(world: &mut World, ch: CharId, mut af: AffectedType, flags: JoinFlags) {
    let now = world.pulse();
    let existing = world
        .char(ch)
        .and_then(|c| c.affected.iter().find(|a| a.same_signature(&af)).cloned());

    if let Some(old) = existing {
        let new_left = af.remaining(now);
        let old_left = old.remaining(now);
        if flags.contains(JoinFlags::ADD_DURATION) {
            af.expire_at = match (new_left, old_left) {
                (Some(n), Some(o)) => Some(now + n + o),
                _ => None,
            };
        } else if flags.contains(JoinFlags::AVG_DURATION) {
            af.expire_at = match (new_left, old_left) {
                (Some(n), Some(o)) => Some(now + ((n + o) / 2).max(1)),
                _ => None,
            };
        }
        if flags.contains(JoinFlags::ADD_MODIFIER) {
            af.modifier += old.modifier;
        }
        if flags.contains(JoinFlags::AVG_MODIFIER) {
            af.modifier = (af.modifier + old.modifier) / 2;
        }
        affect_remove(world, ch, old.id);
    }
    affect_to_char(world, ch, af);
}

fn wear_off_text(atype: u32) -> String {
    format!("Effect {} wears off.", atype)
}

/// Expiry path used by the event pass; the handle has already fired.
pub(crate) fn affect_expired(world: &mut World, ch: CharId, affect: AffectId) -> bool {
    let atype = match world.char_mut(ch) {
        Some(c) => match c.affected.iter_mut().find(|a| a.id == affect) {
            Some(af) => {
                af.expire_event = None;
                af.atype
            }
            None => return false,
        },
        None => return false,
    };
    affect_remove(world, ch, affect);
    if !affected_by_spell(world, ch, atype) {
        world.send(Audience::ToChar(ch), &wear_off_text(atype));
    }
    true
}

// ---- rooms ----

/// Recompute a room's flags from its base flags and active affects.
///
/// Flipping MAGIC_LIGHT adjusts the light count; flipping any map-visible
/// flag queues a map refresh.
pub fn affect_total_room(world: &mut World, room: RoomId) {
    let changed = match world.room_mut(room) {
        Some(r) => {
            let old = r.aff_flags;
            let mut new = r.base_flags;
            for af in &r.affects {
                new |= af.room_flags();
            }
            r.aff_flags = new;
            let flipped = old ^ new;
            if flipped.contains(RoomAffFlags::MAGIC_LIGHT) {
                r.light += if new.contains(RoomAffFlags::MAGIC_LIGHT) { 1 } else { -1 };
            }
            if flipped.intersects(RoomAffFlags::map_visible()) {
                r.map_refresh_pending = true;
                debug!("room {} needs a map refresh", r.vnum);
            }
            !flipped.is_empty()
        }
        None => return,
    };
    if changed {
        world.saves.request_world_save(room);
    }
}

pub fn affect_to_room(world: &mut World, room: RoomId, mut af: AffectedType) {
    if world.room(room).is_none() {
        warn!("affect_to_room: no room {}", room);
        return;
    }
    let now = world.pulse();
    if let Some(at) = af.expire_at {
        let id = af.id;
        af.expire_event = Some(world.events.schedule(
            now,
            at.saturating_sub(now),
            EventPayload::RoomAffectExpire { room, affect: id },
        ));
    }
    if let Some(r) = world.room_mut(room) {
        r.affects.insert(0, af);
    }
    affect_total_room(world, room);
}

pub fn affect_remove_room(world: &mut World, room: RoomId, affect: AffectId) -> bool {
    let removed = match world.room_mut(room) {
        Some(r) => match r.affects.iter().position(|a| a.id == affect) {
            Some(pos) => r.affects.remove(pos),
            None => return false,
        },
        None => return false,
    };
    if let Some(ev) = removed.expire_event {
        world.events.cancel(ev);
    }
    affect_total_room(world, room);
    true
}

pub fn affect_from_room(world: &mut World, room: RoomId, atype: u32) -> usize {
    let ids: Vec<AffectId> = match world.room(room) {
        Some(r) => r.affects.iter().filter(|a| a.atype == atype).map(|a| a.id).collect(),
        None => return 0,
    };
    ids.into_iter()
        .filter(|id| affect_remove_room(world, room, *id))
        .count()
}

pub fn room_affected_by_spell(world: &World, room: RoomId, atype: u32) -> bool {
    world
        .room(room)
        .map(|r| r.affects.iter().any(|a| a.atype == atype))
        .unwrap_or(false)
}

pub(crate) fn room_affect_expired(world: &mut World, room: RoomId, affect: AffectId) -> bool {
    match world.room_mut(room) {
        Some(r) => match r.affects.iter_mut().find(|a| a.id == affect) {
            Some(af) => af.expire_event = None,
            None => return false,
        },
        None => return false,
    }
    affect_remove_room(world, room, affect)
}

// ---- damage over time ----

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DamageType {
    Physical,
    Magical,
    Fire,
    Poison,
    Direct,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverTimeEffect {
    pub id: DotId,
    pub atype: u32,
    pub cast_by: Option<CharId>,
    pub damage: i32,
    pub damage_type: DamageType,
    /// Ticks left, or [`UNLIMITED`].
    pub duration: i64,
    pub stack: i32,
    pub max_stack: i32,
    pub update_event: Option<EventId>,
}

/// Apply a DOT. An existing DOT with the same type, damage type and damage
/// is refreshed instead: its duration becomes the longer of the two and its
/// stack grows by one up to the smaller max stack.
#[allow(clippy::too_many_arguments)]
pub fn apply_dot_effect(
    world: &mut World,
    ch: CharId,
    atype: u32,
    duration: i64,
    damage_type: DamageType,
    damage: i32,
    max_stack: i32,
    cast_by: Option<CharId>,
) -> Option<DotId> {
    let now = world.pulse();
    let new_id = DotId(world.alloc_uid());
    let c = world.char_mut(ch)?;

    if let Some(dot) = c
        .dots
        .iter_mut()
        .find(|d| d.atype == atype && d.damage_type == damage_type && d.damage == damage)
    {
        dot.duration = if dot.duration == UNLIMITED || duration == UNLIMITED {
            UNLIMITED
        } else {
            dot.duration.max(duration)
        };
        if dot.stack < dot.max_stack.min(max_stack) {
            dot.stack += 1;
        }
        return Some(dot.id);
    }

    c.dots.insert(
        0,
        OverTimeEffect {
            id: new_id,
            atype,
            cast_by,
            damage,
            damage_type,
            duration,
            stack: 1,
            max_stack,
            update_event: None,
        },
    );
    let ev = world
        .events
        .schedule(now, DOT_TICK_PULSES, EventPayload::DotTick { ch, dot: new_id });
    if let Some(dot) = world
        .char_mut(ch)
        .and_then(|c| c.dots.iter_mut().find(|d| d.id == new_id))
    {
        dot.update_event = Some(ev);
    }
    Some(new_id)
}

/// Remove a DOT, cancelling its tick. During an event pass the data is
/// parked on the deferred list instead of dropped.
pub fn dot_remove(world: &mut World, ch: CharId, dot: DotId) -> bool {
    let removed = match world.char_mut(ch) {
        Some(c) => match c.dots.iter().position(|d| d.id == dot) {
            Some(pos) => c.dots.remove(pos),
            None => return false,
        },
        None => return false,
    };
    if let Some(ev) = removed.update_event {
        world.events.cancel(ev);
    }
    if world.event_phase {
        world.deferred_dots.push(removed);
    }
    true
}

/// Release DOTs removed during the last event pass.
pub fn flush_deferred_dots(world: &mut World) -> usize {
    let n = world.deferred_dots.len();
    world.deferred_dots.clear();
    n
}

/// Result of one DOT tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DotTick {
    /// Tick again after this many pulses.
    Continue(u64),
    Expired,
    Killed { by: Option<CharId> },
    Gone,
}

pub(crate) fn dot_tick(world: &mut World, ch: CharId, dot: DotId) -> DotTick {
    let (dealt, by, left, dead) = match world.char_mut(ch) {
        Some(c) => match c.dots.iter_mut().find(|d| d.id == dot) {
            Some(d) => {
                let dealt = d.damage.saturating_mul(d.stack);
                if d.duration != UNLIMITED {
                    d.duration -= 1;
                }
                let (by, left) = (d.cast_by, d.duration);
                c.pools.health -= dealt;
                (dealt, by, left, c.pools.health <= 0)
            }
            None => return DotTick::Gone,
        },
        None => return DotTick::Gone,
    };
    world.send(Audience::ToChar(ch), &format!("You take {} damage.", dealt));
    if dead {
        return DotTick::Killed { by };
    }
    if left == UNLIMITED || left > 0 {
        DotTick::Continue(DOT_TICK_PULSES)
    } else {
        DotTick::Expired
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mud::entity::{Character, Object, Room};
    use crate::mud::types::WearSlot;

    fn setup() -> (World, CharId) {
        let mut world = World::new(Some(3));
        let room = world.add_room(Room::new(1, "R"));
        let ch = world.add_char(Character::npc(10, "orc"));
        world.char_to_room(ch, room).unwrap();
        (world, ch)
    }

    #[test]
    fn affect_applies_and_removes_cleanly() {
        let (mut world, ch) = setup();
        let base = world.char(ch).unwrap().current.strength;
        let af = create_aff(&mut world, 5, 10, Apply::Strength, 3, AffFlags::FLY.bits(), None);
        let id = af.id;
        affect_to_char(&mut world, ch, af);
        let c = world.char(ch).unwrap();
        assert_eq!(c.current.strength, base + 3);
        assert!(c.is_affected(AffFlags::FLY));

        assert!(affect_remove(&mut world, ch, id));
        let c = world.char(ch).unwrap();
        assert_eq!(c.current.strength, base);
        assert!(!c.is_affected(AffFlags::FLY));
        assert!(world.events.is_empty());
    }

    #[test]
    fn recompute_is_stable_with_gear() {
        let (mut world, ch) = setup();
        let ring = world.add_obj(Object::new(7, "ring").with_apply(Apply::Health, 20));
        world.obj_to_char(ring, ch).unwrap();
        world.equip_char(ch, ring, WearSlot::Finger).unwrap();
        let af = create_aff(&mut world, 9, UNLIMITED, Apply::Health, 5, 0, None);
        affect_to_char(&mut world, ch, af);
        affect_total(&mut world, ch);
        affect_total(&mut world, ch);
        assert_eq!(world.char(ch).unwrap().derived.max_health, 125);
    }

    #[test]
    fn join_adds_remaining_durations() {
        let (mut world, ch) = setup();
        let first = create_aff(&mut world, 2, 30, Apply::Dodge, 1, 0, None);
        affect_to_char(&mut world, ch, first);
        world.set_pulse(10);
        let second = create_aff(&mut world, 2, 15, Apply::Dodge, 1, 0, None);
        affect_join(&mut world, ch, second, JoinFlags::ADD_DURATION | JoinFlags::ADD_MODIFIER);
        let c = world.char(ch).unwrap();
        assert_eq!(c.affected.len(), 1);
        assert_eq!(c.affected[0].remaining(10), Some(20 + 15));
        assert_eq!(c.affected[0].modifier, 2);
        assert_eq!(world.events.len(), 1);
    }

    #[test]
    fn dot_refresh_stacks_to_lower_max() {
        let (mut world, ch) = setup();
        let a = apply_dot_effect(&mut world, ch, 4, 3, DamageType::Fire, 2, 5, None).unwrap();
        let b = apply_dot_effect(&mut world, ch, 4, 6, DamageType::Fire, 2, 2, None).unwrap();
        let _ = apply_dot_effect(&mut world, ch, 4, 1, DamageType::Fire, 2, 2, None);
        assert_eq!(a, b);
        let dot = &world.char(ch).unwrap().dots[0];
        assert_eq!(dot.stack, 2);
        assert_eq!(dot.duration, 6);
        assert_eq!(world.events.len(), 1);
    }

    #[test]
    fn room_magic_light_adjusts_light_count() {
        let mut world = World::new(Some(1));
        let room = world.add_room(Room::new(5, "glade"));
        let af = create_aff(&mut world, 1, 20, Apply::None, 0, RoomAffFlags::MAGIC_LIGHT.bits(), None);
        affect_to_room(&mut world, room, af);
        assert_eq!(world.room(room).unwrap().light, 1);
        assert_eq!(affect_from_room(&mut world, room, 1), 1);
        let r = world.room(room).unwrap();
        assert_eq!(r.light, 0);
        assert!(!r.aff_flags.contains(RoomAffFlags::MAGIC_LIGHT));
    }
}
