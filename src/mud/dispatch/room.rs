//! Room (world) triggers. Every room trigger sees its own room as `room`.

use super::combined::{bind_buy, bind_quest, BuyContext, QuestEvent};
use super::{
    bind, bind_direction, bind_uid, bind_uid_or, opt_ref, percent_gate, run_new, run_script,
    script_check, text_arg, trigger_check, trigger_ids, valid_dg_target,
};
use crate::mud::script::matching::{match_command_trig, speech_matches, CommandMatch};
use crate::mud::script::{RunContext, ScriptDriver, WldTrig};
use crate::mud::types::{
    AbilityRef, CharId, Direction, DoorCommand, EntityRef, InstanceId, ObjId, QuestRef, RoomId, TrigId,
};
use crate::mud::world::World;

fn actor_room(world: &World, actor: CharId) -> Option<RoomId> {
    world.char(actor).and_then(|c| c.in_room)
}

fn first_rolled(world: &mut World, room: RoomId, bits: u64) -> Option<TrigId> {
    let owner = EntityRef::Room(room);
    for trig in trigger_ids(world, owner) {
        if trigger_check(world, owner, trig, bits) && percent_gate(world, owner, trig) {
            return Some(trig);
        }
    }
    None
}

fn bind_room(world: &mut World, room: RoomId, trig: TrigId) {
    bind_uid(world, EntityRef::Room(room), trig, "room", room.into());
}

/// Adventure zone is being cleaned up. Stops at the first script that
/// returns false.
pub fn adventure_cleanup_wtrigger(world: &mut World, driver: &mut dyn ScriptDriver, room: RoomId) {
    let owner = EntityRef::Room(room);
    if !script_check(world, owner, WldTrig::ADVENTURE_CLEANUP.bits()) {
        return;
    }
    for trig in trigger_ids(world, owner) {
        if trigger_check(world, owner, trig, WldTrig::ADVENTURE_CLEANUP.bits()) && percent_gate(world, owner, trig) {
            bind_room(world, room, trig);
            if run_new(world, driver, owner, trig) == 0 {
                break;
            }
        }
    }
}

/// Periodic room reset.
pub fn reset_wtrigger(world: &mut World, driver: &mut dyn ScriptDriver, room: RoomId) {
    let owner = EntityRef::Room(room);
    if !script_check(world, owner, WldTrig::RESET.bits()) {
        return;
    }
    if let Some(trig) = first_rolled(world, room, WldTrig::RESET.bits()) {
        bind_room(world, room, trig);
        run_new(world, driver, owner, trig);
    }
}

pub fn random_wtrigger(world: &mut World, driver: &mut dyn ScriptDriver, room: RoomId) {
    let owner = EntityRef::Room(room);
    if !script_check(world, owner, WldTrig::RANDOM.bits()) {
        return;
    }
    for trig in trigger_ids(world, owner) {
        if trigger_check(world, owner, trig, WldTrig::RANDOM.bits()) && percent_gate(world, owner, trig) {
            bind_room(world, room, trig);
            if run_new(world, driver, owner, trig) != 0 {
                break;
            }
        }
    }
}

/// `actor` entered `room` travelling `dir`; `direction` is where they came
/// from.
pub fn enter_wtrigger(
    world: &mut World,
    driver: &mut dyn ScriptDriver,
    room: RoomId,
    actor: CharId,
    dir: Option<Direction>,
) -> bool {
    let owner = EntityRef::Room(room);
    if !script_check(world, owner, WldTrig::ENTER.bits()) {
        return true;
    }
    match first_rolled(world, room, WldTrig::ENTER.bits()) {
        Some(trig) => {
            bind_room(world, room, trig);
            bind_direction(world, owner, trig, dir.map(|d| d.reverse()));
            bind_uid(world, owner, trig, "actor", actor.into());
            run_new(world, driver, owner, trig) != 0
        }
        None => true,
    }
}

/// A command typed in the actor's room. The first matching trigger's
/// result is the answer.
pub fn command_wtrigger(
    world: &mut World,
    driver: &mut dyn ScriptDriver,
    actor: CharId,
    cmd: &str,
    argument: &str,
    mode: CommandMatch,
) -> bool {
    let room = match actor_room(world, actor) {
        Some(r) => r,
        None => return false,
    };
    let owner = EntityRef::Room(room);
    if !script_check(world, owner, WldTrig::COMMAND.bits()) || !valid_dg_target(world, actor, false) {
        return false;
    }
    for trig in trigger_ids(world, owner) {
        if !trigger_check(world, owner, trig, WldTrig::COMMAND.bits()) {
            continue;
        }
        let pattern = match text_arg(world, owner, trig, "W-Command") {
            Some(p) => p,
            None => continue,
        };
        if match_command_trig(cmd, &pattern, mode) {
            bind_room(world, room, trig);
            bind_uid(world, owner, trig, "actor", actor.into());
            bind(world, owner, trig, "arg", argument.trim_start());
            bind(world, owner, trig, "cmd", cmd.trim_start());
            return run_new(world, driver, owner, trig) != 0;
        }
    }
    false
}

pub fn speech_wtrigger(world: &mut World, driver: &mut dyn ScriptDriver, actor: CharId, speech: &str) {
    let room = match actor_room(world, actor) {
        Some(r) => r,
        None => return,
    };
    let owner = EntityRef::Room(room);
    if !script_check(world, owner, WldTrig::SPEECH.bits()) {
        return;
    }
    for trig in trigger_ids(world, owner) {
        if !trigger_check(world, owner, trig, WldTrig::SPEECH.bits()) {
            continue;
        }
        let pattern = match text_arg(world, owner, trig, "W-Speech") {
            Some(p) => p,
            None => continue,
        };
        let narg = world.trigger(owner, trig).map(|t| t.narg()).unwrap_or(0);
        if speech_matches(speech, &pattern, narg) {
            bind_room(world, room, trig);
            bind_uid(world, owner, trig, "actor", actor.into());
            bind(world, owner, trig, "speech", speech);
            run_new(world, driver, owner, trig);
            break;
        }
    }
}

/// `actor` drops `obj` here. Blocked if the script took it from them.
pub fn drop_wtrigger(world: &mut World, driver: &mut dyn ScriptDriver, obj: ObjId, actor: CharId) -> bool {
    let room = match actor_room(world, actor) {
        Some(r) => r,
        None => return true,
    };
    let owner = EntityRef::Room(room);
    if !script_check(world, owner, WldTrig::DROP.bits()) {
        return true;
    }
    match first_rolled(world, room, WldTrig::DROP.bits()) {
        Some(trig) => {
            bind_room(world, room, trig);
            bind_uid(world, owner, trig, "actor", actor.into());
            bind_uid(world, owner, trig, "object", obj.into());
            let ret = run_new(world, driver, owner, trig);
            let still_held = world.obj_valid(obj) && world.obj(obj).and_then(|o| o.carried_by()) == Some(actor);
            still_held && ret != 0
        }
        None => true,
    }
}

pub fn ability_wtrigger(
    world: &mut World,
    driver: &mut dyn ScriptDriver,
    actor: CharId,
    victim: Option<CharId>,
    obj: Option<ObjId>,
    ability: Option<&AbilityRef>,
) -> bool {
    let ability = match ability {
        Some(a) => a,
        None => return true,
    };
    let room = match actor_room(world, actor) {
        Some(r) => r,
        None => return true,
    };
    let owner = EntityRef::Room(room);
    if !script_check(world, owner, WldTrig::ABILITY.bits()) {
        return true;
    }
    match first_rolled(world, room, WldTrig::ABILITY.bits()) {
        Some(trig) => {
            bind_room(world, room, trig);
            bind_uid(world, owner, trig, "actor", actor.into());
            if let Some(v) = opt_ref(victim) {
                bind_uid(world, owner, trig, "victim", v);
            }
            if let Some(o) = opt_ref(obj) {
                bind_uid(world, owner, trig, "object", o);
            }
            bind(world, owner, trig, "ability", &ability.vnum.to_string());
            bind(world, owner, trig, "abilityname", &ability.name);
            run_new(world, driver, owner, trig) != 0
        }
        None => true,
    }
}

pub fn leave_wtrigger(
    world: &mut World,
    driver: &mut dyn ScriptDriver,
    room: RoomId,
    actor: CharId,
    dir: Option<Direction>,
) -> bool {
    let owner = EntityRef::Room(room);
    if !script_check(world, owner, WldTrig::LEAVE.bits()) {
        return true;
    }
    match first_rolled(world, room, WldTrig::LEAVE.bits()) {
        Some(trig) => {
            bind_room(world, room, trig);
            bind_direction(world, owner, trig, dir);
            bind_uid(world, owner, trig, "actor", actor.into());
            run_new(world, driver, owner, trig) != 0
        }
        None => true,
    }
}

pub fn door_wtrigger(
    world: &mut World,
    driver: &mut dyn ScriptDriver,
    actor: CharId,
    door: DoorCommand,
    dir: Option<Direction>,
) -> bool {
    let room = match actor_room(world, actor) {
        Some(r) => r,
        None => return true,
    };
    let owner = EntityRef::Room(room);
    if !script_check(world, owner, WldTrig::DOOR.bits()) {
        return true;
    }
    match first_rolled(world, room, WldTrig::DOOR.bits()) {
        Some(trig) => {
            bind_room(world, room, trig);
            bind(world, owner, trig, "cmd", door.verb());
            bind_direction(world, owner, trig, dir);
            bind_uid(world, owner, trig, "actor", actor.into());
            run_new(world, driver, owner, trig) != 0
        }
        None => true,
    }
}

/// BUY triggers on the buyer's room. Stops at the first false.
pub fn buy_wtrigger(world: &mut World, driver: &mut dyn ScriptDriver, ctx: &BuyContext) -> bool {
    let room = match actor_room(world, ctx.buyer) {
        Some(r) => r,
        None => return true,
    };
    let owner = EntityRef::Room(room);
    if !script_check(world, owner, WldTrig::BUY.bits()) {
        return true;
    }
    for trig in trigger_ids(world, owner) {
        if trigger_check(world, owner, trig, WldTrig::BUY.bits()) {
            bind_room(world, room, trig);
            bind_buy(world, owner, trig, ctx);
            if run_new(world, driver, owner, trig) == 0 {
                return false;
            }
        }
    }
    true
}

/// Quest triggers carried by the quest itself, run in the actor's room.
///
/// Each vnum in the quest's script list is attached to the room for the
/// duration of its run and detached again afterwards, whatever the result.
/// The first refusal ends the sweep.
pub fn quest_wtrigger(
    world: &mut World,
    driver: &mut dyn ScriptDriver,
    actor: CharId,
    quest: &QuestRef,
    event: QuestEvent,
    instance: Option<InstanceId>,
) -> bool {
    let room = match actor_room(world, actor) {
        Some(r) => r,
        None => return true,
    };
    let owner = EntityRef::Room(room);
    let bits = event.room_bits().bits();
    let ctx = RunContext::with_instance(instance);

    for vnum in quest.script.iter().copied() {
        let trig = match world.attach_trigger(owner, vnum) {
            Ok(t) => t,
            Err(e) => {
                log::warn!("quest {} script {} not attached: {}", quest.vnum, vnum, e);
                continue;
            }
        };
        let refused = trigger_check(world, owner, trig, bits) && {
            bind_room(world, room, trig);
            bind_uid(world, owner, trig, "actor", actor.into());
            bind_quest(world, owner, trig, quest);
            run_script(world, driver, owner, trig, &ctx) == 0
        };
        world.detach_trigger(owner, trig);
        if refused {
            return false;
        }
    }
    true
}

/// A building in this room was finished.
pub fn complete_wtrigger(world: &mut World, driver: &mut dyn ScriptDriver, room: RoomId) {
    let owner = EntityRef::Room(room);
    if !script_check(world, owner, WldTrig::COMPLETE.bits()) {
        return;
    }
    for trig in trigger_ids(world, owner) {
        if trigger_check(world, owner, trig, WldTrig::COMPLETE.bits()) && percent_gate(world, owner, trig) {
            bind_room(world, room, trig);
            if run_new(world, driver, owner, trig) == 0 {
                break;
            }
        }
    }
}

/// The building here is being dismantled. Only a preventable dismantle can
/// be blocked by a script returning false.
pub fn dismantle_wtrigger(
    world: &mut World,
    driver: &mut dyn ScriptDriver,
    room: RoomId,
    actor: Option<CharId>,
    preventable: bool,
) -> bool {
    let owner = EntityRef::Room(room);
    if !script_check(world, owner, WldTrig::DISMANTLE.bits()) {
        return true;
    }
    match first_rolled(world, room, WldTrig::DISMANTLE.bits()) {
        Some(trig) => {
            bind_room(world, room, trig);
            bind_uid_or(world, owner, trig, "actor", opt_ref(actor), "nobody");
            bind(world, owner, trig, "preventable", if preventable { "1" } else { "0" });
            let ret = run_new(world, driver, owner, trig);
            !preventable || ret != 0
        }
        None => true,
    }
}

pub fn reboot_wtrigger(world: &mut World, driver: &mut dyn ScriptDriver, room: RoomId) -> bool {
    let owner = EntityRef::Room(room);
    if !script_check(world, owner, WldTrig::REBOOT.bits()) {
        return true;
    }
    for trig in trigger_ids(world, owner) {
        if trigger_check(world, owner, trig, WldTrig::REBOOT.bits()) && percent_gate(world, owner, trig) {
            bind_room(world, room, trig);
            if run_new(world, driver, owner, trig) == 0 {
                return false;
            }
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mud::entity::{Character, Room};
    use crate::mud::script::TriggerPrototype;

    #[test]
    fn enter_reports_where_actor_came_from() {
        let mut world = World::new(Some(5));
        world
            .registry_mut()
            .insert(TriggerPrototype::room(10, "doorway", WldTrig::ENTER));
        let hall = world.add_room(Room::new(1, "Hall"));
        let actor = world.add_char(Character::player("Tam", 4));
        world.char_to_room(actor, hall).unwrap();
        world.attach_trigger(hall.into(), 10).unwrap();

        let mut seen = String::new();
        let mut driver = |w: &mut World, owner: EntityRef, t: TrigId, _: &RunContext| -> i32 {
            seen = w.trigger(owner, t).unwrap().vars.get("direction", 0).unwrap().to_string();
            1
        };
        assert!(enter_wtrigger(&mut world, &mut driver, hall, actor, Some(Direction::North)));
        assert_eq!(seen, "south");
    }

    #[test]
    fn quest_triggers_are_detached_afterwards() {
        let mut world = World::new(Some(5));
        world
            .registry_mut()
            .insert(TriggerPrototype::room(20, "briefing", WldTrig::START_QUEST));
        world
            .registry_mut()
            .insert(TriggerPrototype::room(21, "sendoff", WldTrig::START_QUEST));
        let hall = world.add_room(Room::new(1, "Hall"));
        let actor = world.add_char(Character::player("Tam", 4));
        world.char_to_room(actor, hall).unwrap();
        let quest = QuestRef {
            vnum: 77,
            name: "Rat Problem".into(),
            script: vec![20, 21],
        };

        let mut seen = None;
        let mut runs = 0;
        let mut driver = |w: &mut World, owner: EntityRef, t: TrigId, ctx: &RunContext| -> i32 {
            runs += 1;
            seen = Some((
                w.trigger(owner, t).unwrap().vars.get("questvnum", 0).unwrap().to_string(),
                ctx.instance,
            ));
            0
        };
        let inst = Some(InstanceId(3));
        assert!(!quest_wtrigger(&mut world, &mut driver, actor, &quest, QuestEvent::Start, inst));
        assert_eq!(seen, Some(("77".to_string(), inst)));
        // the refusal from 20 means 21 is never attached or run
        assert_eq!(runs, 1);
        assert!(world.room(hall).unwrap().script.is_none());
    }
}
