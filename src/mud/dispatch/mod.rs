//! Trigger dispatch.
//!
//! Every game action that scripts may react to has a dispatcher here. A
//! dispatcher finds the listening entities, walks their triggers in
//! attachment order, applies the type, depth, charm and chance gates, binds
//! context variables and hands the trigger to the [`ScriptDriver`]. It then
//! turns the driver's results into the allow/block answer the caller needs.
//!
//! Listener and trigger lists are snapshotted before any script runs and
//! every entity is re-checked afterwards, because a script may extract or
//! move anything, including the entity it runs on.

pub mod combined;
pub mod mobile;
pub mod object;
pub mod room;
pub mod vehicle;

use crate::mud::entity::{LVL_CIMPL, LVL_START_IMM};
use crate::mud::script::{uid_token, RunContext, RunMode, ScriptDriver, TriggerPrototype, MAX_SCRIPT_DEPTH};
use crate::mud::types::{AffFlags, CharId, Direction, EntityRef, TrigId};
use crate::mud::world::World;
use log::{debug, error};
use std::sync::Arc;

/// Gods with nohassle are still valid targets for these dispatchers.
pub const DG_ALLOW_GODS: bool = true;

/// Whether `ch` may be the actor of a trigger.
///
/// NPCs and mortals always are. Immortals without nohassle are too. A
/// nohassle immortal is skipped while wizinvis, and the top level is
/// skipped unless `allow_gods` is set.
pub fn valid_dg_target(world: &World, ch: CharId, allow_gods: bool) -> bool {
    let c = match world.char(ch) {
        Some(c) => c,
        None => return false,
    };
    if c.is_npc {
        return true;
    }
    if c.level < LVL_START_IMM || !c.has_nohassle() {
        return true;
    }
    if !allow_gods && c.level >= LVL_CIMPL {
        return false;
    }
    c.invis_level < LVL_START_IMM
}

/// Visibility of `target` to `viewer`.
pub fn can_see(world: &World, viewer: CharId, target: CharId) -> bool {
    if viewer == target {
        return true;
    }
    let (v, t) = match (world.char(viewer), world.char(target)) {
        (Some(v), Some(t)) => (v, t),
        _ => return false,
    };
    if v.is_affected(AffFlags::BLIND) {
        return false;
    }
    if !t.is_npc && t.invis_level > v.level {
        return false;
    }
    if t.is_affected(AffFlags::INVISIBLE) && !v.is_immortal() {
        return false;
    }
    if t.is_affected(AffFlags::HIDE) && !v.is_affected(AffFlags::SENSE_HIDE) && !v.is_immortal() {
        return false;
    }
    true
}

pub(crate) fn is_charmed(world: &World, ch: CharId) -> bool {
    world
        .char(ch)
        .map(|c| c.is_affected(AffFlags::CHARM))
        .unwrap_or(false)
}

pub(crate) fn is_awake(world: &World, ch: CharId) -> bool {
    world.char(ch).map(|c| c.awake).unwrap_or(false)
}

pub(crate) fn is_fighting(world: &World, ch: CharId) -> bool {
    world.char(ch).map(|c| c.fighting.is_some()).unwrap_or(false)
}

/// Whether any attached trigger has one of `bits`.
pub(crate) fn script_check(world: &World, owner: EntityRef, bits: u64) -> bool {
    world
        .script(owner)
        .map(|s| s.has_types(bits))
        .unwrap_or(false)
}

pub(crate) fn trigger_ids(world: &World, owner: EntityRef) -> Vec<TrigId> {
    world.script(owner).map(|s| s.trigger_ids()).unwrap_or_default()
}

pub(crate) fn proto(world: &World, owner: EntityRef, trig: TrigId) -> Option<Arc<TriggerPrototype>> {
    world.trigger(owner, trig).map(|t| t.proto.clone())
}

/// Type bit present and the trigger is not already running.
pub(crate) fn trigger_check(world: &World, owner: EntityRef, trig: TrigId, bits: u64) -> bool {
    world
        .trigger(owner, trig)
        .map(|t| t.check(bits))
        .unwrap_or(false)
}

pub(crate) fn trigger_has(world: &World, owner: EntityRef, trig: TrigId, bits: u64) -> bool {
    world
        .trigger(owner, trig)
        .map(|t| t.proto.has_bits(bits))
        .unwrap_or(false)
}

pub(crate) fn trigger_idle(world: &World, owner: EntityRef, trig: TrigId) -> bool {
    world.trigger(owner, trig).map(|t| t.depth == 0).unwrap_or(false)
}

/// One independent percent roll against the trigger's numeric argument.
pub(crate) fn percent_gate(world: &mut World, owner: EntityRef, trig: TrigId) -> bool {
    let narg = match world.trigger(owner, trig) {
        Some(t) => t.narg(),
        None => return false,
    };
    world.number(1, 100) <= narg
}

/// Trigger with a text argument, logging the ones that lack it.
pub(crate) fn text_arg(world: &World, owner: EntityRef, trig: TrigId, what: &str) -> Option<String> {
    let t = world.trigger(owner, trig)?;
    if t.arg().trim().is_empty() {
        error!("SYSERR: {} Trigger #{} has no text argument!", what, t.vnum());
        return None;
    }
    Some(t.arg().to_string())
}

pub(crate) fn bind(world: &mut World, owner: EntityRef, trig: TrigId, name: &str, value: &str) {
    if let Some(t) = world.trigger_mut(owner, trig) {
        t.vars.add_var(name, value, 0);
    }
}

pub(crate) fn bind_uid(world: &mut World, owner: EntityRef, trig: TrigId, name: &str, target: EntityRef) {
    bind(world, owner, trig, name, &uid_token(target));
}

/// Bind a uid when present, otherwise `fallback`.
pub(crate) fn bind_uid_or(
    world: &mut World,
    owner: EntityRef,
    trig: TrigId,
    name: &str,
    target: Option<EntityRef>,
    fallback: &str,
) {
    match target {
        Some(t) => bind_uid(world, owner, trig, name, t),
        None => bind(world, owner, trig, name, fallback),
    }
}

pub(crate) fn bind_direction(world: &mut World, owner: EntityRef, trig: TrigId, dir: Option<Direction>) {
    bind(world, owner, trig, "direction", crate::mud::types::direction_name(dir));
}

/// Run one trigger through the driver.
///
/// A fresh run marks the trigger busy for the duration of the call. If the
/// driver parked it on a wait it stays busy until resumed. Nested runs past
/// [`MAX_SCRIPT_DEPTH`] are refused.
pub fn run_script(
    world: &mut World,
    driver: &mut dyn ScriptDriver,
    owner: EntityRef,
    trig: TrigId,
    ctx: &RunContext,
) -> i32 {
    if world.script_depth >= MAX_SCRIPT_DEPTH {
        error!(
            "SYSERR: Triggers recursed beyond maximum allowed depth ({}) running #{} on {:?}",
            MAX_SCRIPT_DEPTH, trig, owner
        );
        return 0;
    }
    match world.trigger_mut(owner, trig) {
        Some(t) => {
            if ctx.mode == RunMode::New {
                t.depth = 1;
                t.resume_at = 0;
            }
            debug!("running trigger #{} ({}) on {:?}", t.vnum(), t.proto.name, owner);
        }
        None => return 0,
    }

    world.script_depth += 1;
    let ret = driver.run(world, owner, trig, ctx);
    world.script_depth -= 1;

    if let Some(t) = world.trigger_mut(owner, trig) {
        if t.wait_event.is_none() {
            t.depth = 0;
        }
    }
    ret
}

/// Run with a fresh context.
pub(crate) fn run_new(world: &mut World, driver: &mut dyn ScriptDriver, owner: EntityRef, trig: TrigId) -> i32 {
    run_script(world, driver, owner, trig, &RunContext::new())
}

/// Optional entity ids as uid variables.
pub(crate) fn opt_ref<T: Into<EntityRef>>(id: Option<T>) -> Option<EntityRef> {
    id.map(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mud::entity::{Character, Room};

    #[test]
    fn nohassle_gods_are_filtered() {
        let mut world = World::new(Some(1));
        let room = world.add_room(Room::new(1, "R"));
        let mortal = world.add_char(Character::player("m", 10));
        let mut imm = Character::player("imm", LVL_START_IMM);
        imm.nohassle = true;
        let imm = world.add_char(imm);
        let mut hidden = Character::player("hidden", LVL_START_IMM + 1);
        hidden.nohassle = true;
        hidden.invis_level = LVL_START_IMM;
        let hidden = world.add_char(hidden);
        let mut top = Character::player("top", LVL_CIMPL);
        top.nohassle = true;
        let top = world.add_char(top);
        for ch in [mortal, imm, hidden, top] {
            world.char_to_room(ch, room).unwrap();
        }

        assert!(valid_dg_target(&world, mortal, false));
        assert!(valid_dg_target(&world, imm, false));
        assert!(!valid_dg_target(&world, hidden, true));
        assert!(valid_dg_target(&world, top, DG_ALLOW_GODS));
        assert!(!valid_dg_target(&world, top, false));
    }

    #[test]
    fn recursion_ceiling_refuses_deep_runs() {
        use crate::mud::script::MobTrig;
        let mut world = World::new(Some(1));
        world
            .registry_mut()
            .insert(TriggerPrototype::mob(1, "loop", MobTrig::LOAD));
        let room = world.add_room(Room::new(1, "R"));
        let mob = world.add_char(Character::npc(2, "m"));
        world.char_to_room(mob, room).unwrap();
        let trig = world.attach_trigger(mob.into(), 1).unwrap();

        let mut calls = 0;
        let mut driver = |w: &mut World, owner: EntityRef, t: TrigId, _: &RunContext| -> i32 {
            calls += 1;
            assert_eq!(w.trigger(owner, t).unwrap().depth, 1);
            1
        };
        world.script_depth = MAX_SCRIPT_DEPTH;
        assert_eq!(run_new(&mut world, &mut driver, mob.into(), trig), 0);
        world.script_depth = 0;
        assert_eq!(run_new(&mut world, &mut driver, mob.into(), trig), 1);
        assert_eq!(calls, 1);
        assert_eq!(world.trigger(mob.into(), trig).unwrap().depth, 0);
    }
}
