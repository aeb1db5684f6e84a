//! Vehicle triggers. Vehicles listen to events in the room they are parked
//! in.

use super::combined::{bind_buy, bind_quest, BuyContext, QuestEvent};
use super::{
    bind, bind_direction, bind_uid, bind_uid_or, opt_ref, percent_gate, run_new, run_script,
    script_check, text_arg, trigger_check, trigger_ids, valid_dg_target, DG_ALLOW_GODS,
};
use crate::mud::script::matching::{match_command_trig, speech_matches, CommandMatch};
use crate::mud::script::{RunContext, ScriptDriver, VehTrig};
use crate::mud::types::{CharId, Direction, EntityRef, InstanceId, QuestRef, TrigId, VehId};
use crate::mud::world::World;

fn vehicles_near(world: &World, actor: CharId) -> Vec<VehId> {
    world
        .char(actor)
        .and_then(|c| c.in_room)
        .and_then(|r| world.room(r))
        .map(|r| r.vehicles.clone())
        .unwrap_or_default()
}

fn first_rolled(world: &mut World, veh: VehId, bits: u64) -> Option<TrigId> {
    let owner = EntityRef::Veh(veh);
    for trig in trigger_ids(world, owner) {
        if trigger_check(world, owner, trig, bits) && percent_gate(world, owner, trig) {
            return Some(trig);
        }
    }
    None
}

pub fn random_vtrigger(world: &mut World, driver: &mut dyn ScriptDriver, veh: VehId) {
    let owner = EntityRef::Veh(veh);
    if !world.vehicle_valid(veh) || !script_check(world, owner, VehTrig::RANDOM.bits()) {
        return;
    }
    for trig in trigger_ids(world, owner) {
        if !world.vehicle_valid(veh) {
            return;
        }
        if trigger_check(world, owner, trig, VehTrig::RANDOM.bits())
            && percent_gate(world, owner, trig)
            && run_new(world, driver, owner, trig) != 0
        {
            break;
        }
    }
}

pub fn command_vtrigger(
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
    for veh in vehicles_near(world, actor) {
        let owner = EntityRef::Veh(veh);
        if !world.vehicle_valid(veh) || !script_check(world, owner, VehTrig::COMMAND.bits()) {
            continue;
        }
        for trig in trigger_ids(world, owner) {
            if !trigger_check(world, owner, trig, VehTrig::COMMAND.bits()) {
                continue;
            }
            let pattern = match text_arg(world, owner, trig, "V-Command") {
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
    }
    false
}

pub fn speech_vtrigger(world: &mut World, driver: &mut dyn ScriptDriver, actor: CharId, speech: &str) {
    for veh in vehicles_near(world, actor) {
        let owner = EntityRef::Veh(veh);
        if !world.vehicle_valid(veh) || !script_check(world, owner, VehTrig::SPEECH.bits()) {
            continue;
        }
        for trig in trigger_ids(world, owner) {
            if !trigger_check(world, owner, trig, VehTrig::SPEECH.bits()) {
                continue;
            }
            let pattern = match text_arg(world, owner, trig, "V-Speech") {
                Some(p) => p,
                None => continue,
            };
            let narg = world.trigger(owner, trig).map(|t| t.narg()).unwrap_or(0);
            if speech_matches(speech, &pattern, narg) {
                bind_uid(world, owner, trig, "actor", actor.into());
                bind(world, owner, trig, "speech", speech);
                run_new(world, driver, owner, trig);
                break;
            }
        }
    }
}

/// The vehicle is about to be destroyed. False if a script purged it
/// already or asked to stop the normal destruction messages.
pub fn destroy_vtrigger(world: &mut World, driver: &mut dyn ScriptDriver, veh: VehId) -> bool {
    let owner = EntityRef::Veh(veh);
    if !script_check(world, owner, VehTrig::DESTROY.bits()) {
        return true;
    }
    match first_rolled(world, veh, VehTrig::DESTROY.bits()) {
        Some(trig) => {
            let ret = run_new(world, driver, owner, trig);
            world.vehicle_valid(veh) && ret != 0
        }
        None => true,
    }
}

/// Someone arrived next to parked vehicles. All eligible GREET triggers
/// run; false if any of them returned false.
pub fn greet_vtrigger(world: &mut World, driver: &mut dyn ScriptDriver, actor: CharId, dir: Option<Direction>) -> bool {
    if !valid_dg_target(world, actor, DG_ALLOW_GODS) {
        return true;
    }
    let mut result = true;
    for veh in vehicles_near(world, actor) {
        let owner = EntityRef::Veh(veh);
        if !world.vehicle_valid(veh) || !script_check(world, owner, VehTrig::GREET.bits()) {
            continue;
        }
        for trig in trigger_ids(world, owner) {
            if !world.vehicle_valid(veh) {
                break;
            }
            if trigger_check(world, owner, trig, VehTrig::GREET.bits()) && percent_gate(world, owner, trig) {
                bind_direction(world, owner, trig, dir.map(|d| d.reverse()));
                bind_uid(world, owner, trig, "actor", actor.into());
                if run_new(world, driver, owner, trig) == 0 {
                    result = false;
                }
            }
        }
    }
    result
}

/// The vehicle itself moved into a room.
pub fn entry_vtrigger(world: &mut World, driver: &mut dyn ScriptDriver, veh: VehId) -> bool {
    let owner = EntityRef::Veh(veh);
    if !script_check(world, owner, VehTrig::ENTRY.bits()) {
        return true;
    }
    match first_rolled(world, veh, VehTrig::ENTRY.bits()) {
        Some(trig) => {
            let ret = run_new(world, driver, owner, trig);
            world.vehicle_valid(veh) && ret != 0
        }
        None => true,
    }
}

pub fn load_vtrigger(world: &mut World, driver: &mut dyn ScriptDriver, veh: VehId) {
    let owner = EntityRef::Veh(veh);
    if !script_check(world, owner, VehTrig::LOAD.bits()) {
        return;
    }
    if let Some(trig) = first_rolled(world, veh, VehTrig::LOAD.bits()) {
        run_new(world, driver, owner, trig);
    }
}

/// `actor` tries to leave; the first eligible vehicle trigger decides.
pub fn leave_vtrigger(world: &mut World, driver: &mut dyn ScriptDriver, actor: CharId, dir: Option<Direction>) -> bool {
    for veh in vehicles_near(world, actor) {
        let owner = EntityRef::Veh(veh);
        if !world.vehicle_valid(veh) || !script_check(world, owner, VehTrig::LEAVE.bits()) {
            continue;
        }
        if let Some(trig) = first_rolled(world, veh, VehTrig::LEAVE.bits()) {
            bind_direction(world, owner, trig, dir);
            bind_uid(world, owner, trig, "actor", actor.into());
            return run_new(world, driver, owner, trig) != 0;
        }
    }
    true
}

pub fn buy_vtrigger(world: &mut World, driver: &mut dyn ScriptDriver, ctx: &BuyContext) -> bool {
    for veh in vehicles_near(world, ctx.buyer) {
        let owner = EntityRef::Veh(veh);
        if !world.vehicle_valid(veh) || !script_check(world, owner, VehTrig::BUY.bits()) {
            continue;
        }
        for trig in trigger_ids(world, owner) {
            if !world.vehicle_valid(veh) {
                break;
            }
            if trigger_check(world, owner, trig, VehTrig::BUY.bits()) {
                bind_buy(world, owner, trig, ctx);
                if run_new(world, driver, owner, trig) == 0 {
                    return false;
                }
            }
        }
    }
    true
}

/// A vehicle (siege engine, warship) killed `victim`. Every KILL trigger
/// runs.
pub fn kill_vtrigger(
    world: &mut World,
    driver: &mut dyn ScriptDriver,
    veh: VehId,
    victim: CharId,
    killer: Option<CharId>,
) -> bool {
    let owner = EntityRef::Veh(veh);
    if !script_check(world, owner, VehTrig::KILL.bits()) {
        return true;
    }
    let mut result = true;
    for trig in trigger_ids(world, owner) {
        if !world.vehicle_valid(veh) {
            break;
        }
        if trigger_check(world, owner, trig, VehTrig::KILL.bits()) && percent_gate(world, owner, trig) {
            bind_uid(world, owner, trig, "actor", victim.into());
            bind_uid_or(world, owner, trig, "killer", opt_ref(killer), "nobody");
            if run_new(world, driver, owner, trig) == 0 {
                result = false;
            }
        }
    }
    result
}

pub fn quest_vtrigger(
    world: &mut World,
    driver: &mut dyn ScriptDriver,
    actor: CharId,
    quest: &QuestRef,
    event: QuestEvent,
    instance: Option<InstanceId>,
) -> bool {
    let bits = event.veh_bits().bits();
    let ctx = RunContext::with_instance(instance);
    for veh in vehicles_near(world, actor) {
        let owner = EntityRef::Veh(veh);
        if !world.vehicle_valid(veh) || !script_check(world, owner, bits) {
            continue;
        }
        for trig in trigger_ids(world, owner) {
            if !world.vehicle_valid(veh) {
                break;
            }
            if trigger_check(world, owner, trig, bits) {
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

/// Construction of the vehicle finished.
pub fn complete_vtrigger(world: &mut World, driver: &mut dyn ScriptDriver, veh: VehId) {
    let owner = EntityRef::Veh(veh);
    if !script_check(world, owner, VehTrig::COMPLETE.bits()) {
        return;
    }
    if let Some(trig) = first_rolled(world, veh, VehTrig::COMPLETE.bits()) {
        run_new(world, driver, owner, trig);
    }
}

/// The vehicle is being dismantled; a preventable dismantle stops on false.
pub fn dismantle_vtrigger(
    world: &mut World,
    driver: &mut dyn ScriptDriver,
    veh: VehId,
    actor: Option<CharId>,
    preventable: bool,
) -> bool {
    let owner = EntityRef::Veh(veh);
    if !script_check(world, owner, VehTrig::DISMANTLE.bits()) {
        return true;
    }
    match first_rolled(world, veh, VehTrig::DISMANTLE.bits()) {
        Some(trig) => {
            bind_uid_or(world, owner, trig, "actor", opt_ref(actor), "nobody");
            bind(world, owner, trig, "preventable", if preventable { "1" } else { "0" });
            let ret = run_new(world, driver, owner, trig);
            !preventable || ret != 0
        }
        None => true,
    }
}

pub fn reboot_vtrigger(world: &mut World, driver: &mut dyn ScriptDriver, veh: VehId) -> bool {
    let owner = EntityRef::Veh(veh);
    if !script_check(world, owner, VehTrig::REBOOT.bits()) {
        return true;
    }
    for trig in trigger_ids(world, owner) {
        if !world.vehicle_valid(veh) {
            return false;
        }
        if trigger_check(world, owner, trig, VehTrig::REBOOT.bits())
            && percent_gate(world, owner, trig)
            && run_new(world, driver, owner, trig) == 0
        {
            return false;
        }
    }
    true
}
