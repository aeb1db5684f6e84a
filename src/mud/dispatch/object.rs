//! Object triggers.
//!
//! Most object dispatchers fire on one object and must re-check after the
//! script that the object still exists (and, where an actor is involved,
//! that the actor survived) before letting the action go ahead.

use super::combined::{bind_buy, bind_quest, BuyContext, QuestEvent};
use super::{
    bind, bind_direction, bind_uid, bind_uid_or, percent_gate, run_new, run_script, script_check,
    text_arg, trigger_check, trigger_ids, valid_dg_target,
};
use crate::mud::script::matching::{match_command_trig, CommandMatch};
use crate::mud::script::{ObjTrig, OcmdLocation, RunContext, ScriptDriver};
use crate::mud::types::{
    AbilityRef, CharId, ConsumeCommand, Direction, EntityRef, InstanceId, ObjId, QuestRef, RoomId,
    TrigId, WearSlot,
};
use crate::mud::world::World;
use log::debug;

/// Everything `actor` could reach: worn gear in slot order, then inventory,
/// then the room floor. Each entry carries the location bit it was found at.
pub(crate) fn reachable_objects(world: &World, actor: CharId) -> Vec<(ObjId, OcmdLocation)> {
    let ch = match world.char(actor) {
        Some(c) => c,
        None => return Vec::new(),
    };
    let mut found: Vec<(ObjId, OcmdLocation)> = ch
        .equipment
        .values()
        .map(|o| (*o, OcmdLocation::EQUIP))
        .collect();
    found.extend(ch.carrying.iter().map(|o| (*o, OcmdLocation::INVEN)));
    if let Some(room) = ch.in_room.and_then(|r| world.room(r)) {
        found.extend(room.contents.iter().map(|o| (*o, OcmdLocation::ROOM)));
    }
    found
}

/// narg of command, buy and quest triggers is a location mask.
fn location_allowed(world: &World, owner: EntityRef, trig: TrigId, loc: OcmdLocation) -> bool {
    world
        .trigger(owner, trig)
        .map(|t| OcmdLocation::from_bits_truncate(t.narg()).intersects(loc))
        .unwrap_or(false)
}

fn first_rolled(world: &mut World, obj: ObjId, bits: u64) -> Option<TrigId> {
    let owner = EntityRef::Obj(obj);
    for trig in trigger_ids(world, owner) {
        if trigger_check(world, owner, trig, bits) && percent_gate(world, owner, trig) {
            return Some(trig);
        }
    }
    None
}

fn first_eligible(world: &World, obj: ObjId, bits: u64) -> Option<TrigId> {
    let owner = EntityRef::Obj(obj);
    trigger_ids(world, owner)
        .into_iter()
        .find(|t| trigger_check(world, owner, *t, bits))
}

/// Run `trig` and block when the object did not survive it.
fn run_guarded(world: &mut World, driver: &mut dyn ScriptDriver, obj: ObjId, trig: TrigId) -> bool {
    let ret = run_new(world, driver, EntityRef::Obj(obj), trig);
    world.obj_valid(obj) && ret != 0
}

pub fn random_otrigger(world: &mut World, driver: &mut dyn ScriptDriver, obj: ObjId) {
    let owner = EntityRef::Obj(obj);
    if !world.obj_valid(obj) || !script_check(world, owner, ObjTrig::RANDOM.bits()) {
        return;
    }
    for trig in trigger_ids(world, owner) {
        if !world.obj_valid(obj) {
            return;
        }
        if trigger_check(world, owner, trig, ObjTrig::RANDOM.bits())
            && percent_gate(world, owner, trig)
            && run_new(world, driver, owner, trig) != 0
        {
            break;
        }
    }
}

/// The object's timer ran out. Every TIMER trigger runs; false means the
/// object was purged or a script asked to keep it.
pub fn timer_otrigger(world: &mut World, driver: &mut dyn ScriptDriver, obj: ObjId) -> bool {
    let owner = EntityRef::Obj(obj);
    if !script_check(world, owner, ObjTrig::TIMER.bits()) {
        return true;
    }
    for trig in trigger_ids(world, owner) {
        if trigger_check(world, owner, trig, ObjTrig::TIMER.bits()) && !run_guarded(world, driver, obj, trig) {
            return false;
        }
    }
    true
}

pub fn get_otrigger(world: &mut World, driver: &mut dyn ScriptDriver, obj: ObjId, actor: CharId) -> bool {
    let owner = EntityRef::Obj(obj);
    if !script_check(world, owner, ObjTrig::GET.bits()) {
        return true;
    }
    match first_rolled(world, obj, ObjTrig::GET.bits()) {
        Some(trig) => {
            bind_uid(world, owner, trig, "actor", actor.into());
            let ok = run_guarded(world, driver, obj, trig);
            ok && world.char_valid(actor)
        }
        None => true,
    }
}

fn cmd_otrig(
    world: &mut World,
    driver: &mut dyn ScriptDriver,
    obj: ObjId,
    actor: CharId,
    cmd: &str,
    argument: &str,
    loc: OcmdLocation,
    mode: CommandMatch,
) -> bool {
    let owner = EntityRef::Obj(obj);
    if !world.obj_valid(obj) || !script_check(world, owner, ObjTrig::COMMAND.bits()) {
        return false;
    }
    for trig in trigger_ids(world, owner) {
        if !trigger_check(world, owner, trig, ObjTrig::COMMAND.bits()) || !location_allowed(world, owner, trig, loc) {
            continue;
        }
        let pattern = match text_arg(world, owner, trig, "O-Command") {
            Some(p) => p,
            None => continue,
        };
        if match_command_trig(cmd, &pattern, mode) {
            bind_uid(world, owner, trig, "actor", actor.into());
            bind(world, owner, trig, "arg", argument.trim_start());
            bind(world, owner, trig, "cmd", cmd.trim_start());
            if run_new(world, driver, owner, trig) != 0 {
                return true;
            }
        }
    }
    false
}

/// A command typed by `actor`, offered to equipment, inventory and then the
/// room floor. True means a script handled it.
pub fn command_otrigger(
    world: &mut World,
    driver: &mut dyn ScriptDriver,
    actor: CharId,
    cmd: &str,
    argument: &str,
    mode: CommandMatch,
) -> bool {
    if !valid_dg_target(world, actor, false) {
        return false;
    }
    for (obj, loc) in reachable_objects(world, actor) {
        if cmd_otrig(world, driver, obj, actor, cmd, argument, loc, mode) {
            return true;
        }
    }
    false
}

pub fn wear_otrigger(world: &mut World, driver: &mut dyn ScriptDriver, obj: ObjId, actor: CharId, slot: WearSlot) -> bool {
    let owner = EntityRef::Obj(obj);
    if !script_check(world, owner, ObjTrig::WEAR.bits()) {
        return true;
    }
    match first_eligible(world, obj, ObjTrig::WEAR.bits()) {
        Some(trig) => {
            debug!("wear trigger on {} for slot {:?}", obj, slot);
            bind_uid(world, owner, trig, "actor", actor.into());
            run_guarded(world, driver, obj, trig)
        }
        None => true,
    }
}

pub fn remove_otrigger(world: &mut World, driver: &mut dyn ScriptDriver, obj: ObjId, actor: CharId) -> bool {
    let owner = EntityRef::Obj(obj);
    if !script_check(world, owner, ObjTrig::REMOVE.bits()) {
        return true;
    }
    match first_eligible(world, obj, ObjTrig::REMOVE.bits()) {
        Some(trig) => {
            bind_uid(world, owner, trig, "actor", actor.into());
            run_guarded(world, driver, obj, trig)
        }
        None => true,
    }
}

pub fn drop_otrigger(world: &mut World, driver: &mut dyn ScriptDriver, obj: ObjId, actor: CharId) -> bool {
    let owner = EntityRef::Obj(obj);
    if !script_check(world, owner, ObjTrig::DROP.bits()) {
        return true;
    }
    match first_rolled(world, obj, ObjTrig::DROP.bits()) {
        Some(trig) => {
            bind_uid(world, owner, trig, "actor", actor.into());
            run_guarded(world, driver, obj, trig)
        }
        None => true,
    }
}

/// `actor` gives `obj` to `victim`. Blocked if the script took the object
/// out of the giver's hands.
pub fn give_otrigger(
    world: &mut World,
    driver: &mut dyn ScriptDriver,
    obj: ObjId,
    actor: CharId,
    victim: CharId,
) -> bool {
    let owner = EntityRef::Obj(obj);
    if !script_check(world, owner, ObjTrig::GIVE.bits()) {
        return true;
    }
    match first_rolled(world, obj, ObjTrig::GIVE.bits()) {
        Some(trig) => {
            bind_uid(world, owner, trig, "actor", actor.into());
            bind_uid(world, owner, trig, "victim", victim.into());
            let ok = run_guarded(world, driver, obj, trig);
            ok && world.obj(obj).and_then(|o| o.carried_by()) == Some(actor)
        }
        None => true,
    }
}

pub fn load_otrigger(world: &mut World, driver: &mut dyn ScriptDriver, obj: ObjId) {
    let owner = EntityRef::Obj(obj);
    if !script_check(world, owner, ObjTrig::LOAD.bits()) {
        return;
    }
    if let Some(trig) = first_rolled(world, obj, ObjTrig::LOAD.bits()) {
        run_new(world, driver, owner, trig);
    }
}

pub fn ability_otrigger(
    world: &mut World,
    driver: &mut dyn ScriptDriver,
    actor: CharId,
    obj: Option<ObjId>,
    ability: Option<&AbilityRef>,
) -> bool {
    let (obj, ability) = match (obj, ability) {
        (Some(o), Some(a)) => (o, a),
        _ => return true,
    };
    let owner = EntityRef::Obj(obj);
    if !script_check(world, owner, ObjTrig::ABILITY.bits()) {
        return true;
    }
    match first_rolled(world, obj, ObjTrig::ABILITY.bits()) {
        Some(trig) => {
            bind_uid(world, owner, trig, "actor", actor.into());
            bind(world, owner, trig, "ability", &ability.vnum.to_string());
            bind(world, owner, trig, "abilityname", &ability.name);
            run_new(world, driver, owner, trig) != 0
        }
        None => true,
    }
}

/// `actor` leaves `room`. Every LEAVE trigger on the floor runs; false if
/// any of them objected.
pub fn leave_otrigger(
    world: &mut World,
    driver: &mut dyn ScriptDriver,
    room: RoomId,
    actor: CharId,
    dir: Option<Direction>,
) -> bool {
    let contents = world.room(room).map(|r| r.contents.clone()).unwrap_or_default();
    let mut result = true;
    for obj in contents {
        let owner = EntityRef::Obj(obj);
        if !world.obj_valid(obj) || !script_check(world, owner, ObjTrig::LEAVE.bits()) {
            continue;
        }
        for trig in trigger_ids(world, owner) {
            if !world.obj_valid(obj) {
                break;
            }
            if trigger_check(world, owner, trig, ObjTrig::LEAVE.bits()) && percent_gate(world, owner, trig) {
                bind_direction(world, owner, trig, dir);
                bind_uid(world, owner, trig, "actor", actor.into());
                if run_new(world, driver, owner, trig) == 0 {
                    result = false;
                }
            }
        }
    }
    result
}

pub fn consume_otrigger(
    world: &mut World,
    driver: &mut dyn ScriptDriver,
    obj: ObjId,
    actor: CharId,
    command: ConsumeCommand,
) -> bool {
    let owner = EntityRef::Obj(obj);
    if !script_check(world, owner, ObjTrig::CONSUME.bits()) {
        return true;
    }
    match first_eligible(world, obj, ObjTrig::CONSUME.bits()) {
        Some(trig) => {
            bind_uid(world, owner, trig, "actor", actor.into());
            bind(world, owner, trig, "command", command.verb());
            run_guarded(world, driver, obj, trig)
        }
        None => true,
    }
}

/// `actor` finished using `obj` (a book read through, a meal eaten).
pub fn finish_otrigger(world: &mut World, driver: &mut dyn ScriptDriver, obj: ObjId, actor: CharId) -> bool {
    let owner = EntityRef::Obj(obj);
    if !script_check(world, owner, ObjTrig::FINISH.bits()) {
        return true;
    }
    match first_eligible(world, obj, ObjTrig::FINISH.bits()) {
        Some(trig) => {
            bind_uid(world, owner, trig, "actor", actor.into());
            let ok = run_guarded(world, driver, obj, trig);
            ok && world.char_valid(actor)
        }
        None => true,
    }
}

/// KILL triggers on a set of sibling objects and, recursively, on what
/// they contain.
///
/// Each object's contents are captured before its own triggers run, so
/// objects a script moves in afterwards are not visited. Objects purged
/// along the way are skipped.
pub fn kill_otrigger(
    world: &mut World,
    driver: &mut dyn ScriptDriver,
    objs: &[ObjId],
    victim: CharId,
    killer: Option<CharId>,
) -> bool {
    let mut result = true;
    for obj in objs.iter().copied() {
        if !world.obj_valid(obj) {
            continue;
        }
        let inside = world.obj(obj).map(|o| o.contains.clone()).unwrap_or_default();
        let owner = EntityRef::Obj(obj);
        if script_check(world, owner, ObjTrig::KILL.bits()) {
            for trig in trigger_ids(world, owner) {
                if !world.obj_valid(obj) {
                    break;
                }
                if trigger_check(world, owner, trig, ObjTrig::KILL.bits()) && percent_gate(world, owner, trig) {
                    bind_uid(world, owner, trig, "actor", victim.into());
                    bind_uid_or(world, owner, trig, "killer", killer.map(EntityRef::Char), "nobody");
                    if run_new(world, driver, owner, trig) == 0 {
                        result = false;
                    }
                }
            }
        }
        if !inside.is_empty() && !kill_otrigger(world, driver, &inside, victim, killer) {
            result = false;
        }
    }
    result
}

/// BUY triggers on everything the buyer can reach. Stops at the first
/// trigger that returns false.
pub fn buy_otrigger(world: &mut World, driver: &mut dyn ScriptDriver, ctx: &BuyContext) -> bool {
    for (obj, loc) in reachable_objects(world, ctx.buyer) {
        let owner = EntityRef::Obj(obj);
        if !world.obj_valid(obj) || !script_check(world, owner, ObjTrig::BUY.bits()) {
            continue;
        }
        for trig in trigger_ids(world, owner) {
            if !world.obj_valid(obj) {
                break;
            }
            if trigger_check(world, owner, trig, ObjTrig::BUY.bits()) && location_allowed(world, owner, trig, loc) {
                bind_buy(world, owner, trig, ctx);
                if run_new(world, driver, owner, trig) == 0 {
                    return false;
                }
            }
        }
    }
    true
}

/// START_QUEST / FINISH_QUEST triggers on everything `actor` can reach.
/// Stops at the first script that refuses.
pub fn quest_otrigger(
    world: &mut World,
    driver: &mut dyn ScriptDriver,
    actor: CharId,
    quest: &QuestRef,
    event: QuestEvent,
    instance: Option<InstanceId>,
) -> bool {
    let bits = event.obj_bits().bits();
    let ctx = RunContext::with_instance(instance);
    for (obj, loc) in reachable_objects(world, actor) {
        let owner = EntityRef::Obj(obj);
        if !world.obj_valid(obj) || !script_check(world, owner, bits) {
            continue;
        }
        for trig in trigger_ids(world, owner) {
            if !world.obj_valid(obj) {
                break;
            }
            if trigger_check(world, owner, trig, bits) && location_allowed(world, owner, trig, loc) {
                bind_uid(world, owner, trig, "actor", actor.into());
                bind_quest(world, owner, trig, quest);
                if run_script(world, driver, owner, trig, &ctx) == 0 {
                    return false;
                }
            }
        }
    }
    true
}

pub fn reboot_otrigger(world: &mut World, driver: &mut dyn ScriptDriver, obj: ObjId) -> bool {
    let owner = EntityRef::Obj(obj);
    if !script_check(world, owner, ObjTrig::REBOOT.bits()) {
        return true;
    }
    for trig in trigger_ids(world, owner) {
        if !world.obj_valid(obj) {
            return false;
        }
        if trigger_check(world, owner, trig, ObjTrig::REBOOT.bits())
            && percent_gate(world, owner, trig)
            && run_new(world, driver, owner, trig) == 0
        {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mud::entity::{Character, Object, Room};
    use crate::mud::script::TriggerPrototype;

    fn world_with_actor() -> (World, RoomId, CharId) {
        let mut world = World::new(Some(11));
        let room = world.add_room(Room::new(100, "Vault"));
        let actor = world.add_char(Character::player("Ana", 5));
        world.char_to_room(actor, room).unwrap();
        (world, room, actor)
    }

    #[test]
    fn command_respects_location_mask() {
        let (mut world, room, actor) = world_with_actor();
        world.registry_mut().insert(
            TriggerPrototype::obj(1, "floor only", ObjTrig::COMMAND)
                .with_narg(OcmdLocation::ROOM.bits())
                .with_arg("pull"),
        );
        let lever = world.add_obj(Object::new(5, "lever"));
        world.obj_to_char(lever, actor).unwrap();
        world.attach_trigger(lever.into(), 1).unwrap();

        let mut fired = 0;
        let mut driver = |_: &mut World, _: EntityRef, _: TrigId, _: &RunContext| -> i32 {
            fired += 1;
            1
        };
        assert!(!command_otrigger(&mut world, &mut driver, actor, "pull", "", CommandMatch::Exact));
        world.obj_to_room(lever, room).unwrap();
        assert!(command_otrigger(&mut world, &mut driver, actor, "pull", "", CommandMatch::Exact));
        assert_eq!(fired, 1);
    }

    #[test]
    fn drop_blocked_when_script_purges_object() {
        let (mut world, _room, actor) = world_with_actor();
        world
            .registry_mut()
            .insert(TriggerPrototype::obj(2, "vanish", ObjTrig::DROP));
        let orb = world.add_obj(Object::new(6, "orb"));
        world.obj_to_char(orb, actor).unwrap();
        world.attach_trigger(orb.into(), 2).unwrap();

        let mut driver = |w: &mut World, owner: EntityRef, _: TrigId, _: &RunContext| -> i32 {
            if let EntityRef::Obj(o) = owner {
                w.extract_obj(o);
            }
            1
        };
        assert!(!drop_otrigger(&mut world, &mut driver, orb, actor));
    }

    #[test]
    fn kill_walk_reaches_nested_contents() {
        let (mut world, _room, actor) = world_with_actor();
        world
            .registry_mut()
            .insert(TriggerPrototype::obj(3, "trophy", ObjTrig::KILL));
        let bag = world.add_obj(Object::new(7, "bag"));
        let skull = world.add_obj(Object::new(8, "skull"));
        world.obj_to_char(bag, actor).unwrap();
        world.obj_to_obj(skull, bag).unwrap();
        world.attach_trigger(skull.into(), 3).unwrap();
        let victim = world.add_char(Character::npc(9, "rat"));

        let mut seen = Vec::new();
        let mut driver = |_: &mut World, owner: EntityRef, _: TrigId, _: &RunContext| -> i32 {
            seen.push(owner);
            0
        };
        let carried = world.char(actor).unwrap().carrying.clone();
        assert!(!kill_otrigger(&mut world, &mut driver, &carried, victim, Some(actor)));
        assert_eq!(seen, vec![EntityRef::Obj(skull)]);
    }
}
