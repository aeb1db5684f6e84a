//! Mobile (NPC) triggers.

use super::combined::{bind_buy, bind_quest, BuyContext, QuestEvent};
use super::{
    bind, bind_direction, bind_uid, bind_uid_or, can_see, is_awake, is_charmed, is_fighting,
    percent_gate, run_new, run_script, script_check, text_arg, trigger_check, trigger_has,
    trigger_ids, trigger_idle, valid_dg_target, DG_ALLOW_GODS,
};
use crate::mud::script::matching::{match_command_trig, speech_matches, CommandMatch};
use crate::mud::script::{MobTrig, RunContext, ScriptDriver};
use crate::mud::types::{
    AbilityRef, AffFlags, CharId, Direction, DoorCommand, EntityRef, InstanceId, ObjId, QuestRef,
    TrigId,
};
use crate::mud::world::World;
use log::debug;

/// Charmed mobs only run triggers that are flagged to fire while charmed.
fn charm_ok(world: &World, ch: CharId, trig: TrigId) -> bool {
    !is_charmed(world, ch) || trigger_has(world, EntityRef::Char(ch), trig, MobTrig::CHARMED.bits())
}

fn people_in_room_of(world: &World, actor: CharId) -> Vec<CharId> {
    world
        .char(actor)
        .and_then(|c| c.in_room)
        .and_then(|r| world.room(r))
        .map(|r| r.people.clone())
        .unwrap_or_default()
}

/// First trigger on `ch` with `bits` that passes charm, depth and chance.
fn first_rolled(world: &mut World, ch: CharId, bits: u64) -> Option<TrigId> {
    let owner = EntityRef::Char(ch);
    for trig in trigger_ids(world, owner) {
        if trigger_check(world, owner, trig, bits) && charm_ok(world, ch, trig) && percent_gate(world, owner, trig) {
            return Some(trig);
        }
    }
    None
}

/// Random chatter. Stops at the first trigger that returns true.
pub fn random_mtrigger(world: &mut World, driver: &mut dyn ScriptDriver, ch: CharId) {
    let owner = EntityRef::Char(ch);
    if !world.char_valid(ch) || !script_check(world, owner, MobTrig::RANDOM.bits()) {
        return;
    }
    for trig in trigger_ids(world, owner) {
        if !world.char_valid(ch) {
            return;
        }
        if trigger_check(world, owner, trig, MobTrig::RANDOM.bits())
            && charm_ok(world, ch, trig)
            && percent_gate(world, owner, trig)
            && run_new(world, driver, owner, trig) != 0
        {
            break;
        }
    }
}

/// Mobs that remember `actor` react once to seeing them arrive, then forget.
///
/// For each listener only the first memory entry for `actor` is consumed.
/// A remembered command runs through `command_interpreter`; otherwise the
/// listener's first MEMORY trigger that passes the gates runs.
pub fn greet_memory_mtrigger<C>(
    world: &mut World,
    driver: &mut dyn ScriptDriver,
    actor: CharId,
    mut command_interpreter: C,
) where
    C: FnMut(&mut World, CharId, &str),
{
    if !valid_dg_target(world, actor, DG_ALLOW_GODS) {
        return;
    }
    for ch in people_in_room_of(world, actor) {
        if ch == actor || !world.char_valid(ch) {
            continue;
        }
        let has_memory = world.char(ch).map(|c| !c.memory.is_empty()).unwrap_or(false);
        if !has_memory || !is_awake(world, ch) || is_fighting(world, ch) || is_charmed(world, ch) {
            continue;
        }
        consume_memory(world, driver, ch, actor, true, &mut command_interpreter);
    }
}

/// A mob entering a room reacts to the people it remembers there.
pub fn entry_memory_mtrigger<C>(
    world: &mut World,
    driver: &mut dyn ScriptDriver,
    ch: CharId,
    mut command_interpreter: C,
) where
    C: FnMut(&mut World, CharId, &str),
{
    if !world.char_valid(ch) || is_charmed(world, ch) {
        return;
    }
    for actor in people_in_room_of(world, ch) {
        let has_memory = world.char(ch).map(|c| !c.memory.is_empty()).unwrap_or(false);
        if !has_memory || !world.char_valid(ch) {
            return;
        }
        if actor == ch {
            continue;
        }
        consume_memory(world, driver, ch, actor, false, &mut command_interpreter);
    }
}

fn consume_memory<C>(
    world: &mut World,
    driver: &mut dyn ScriptDriver,
    ch: CharId,
    actor: CharId,
    needs_sight: bool,
    command_interpreter: &mut C,
) where
    C: FnMut(&mut World, CharId, &str),
{
    let entry = match world.char_mut(ch) {
        Some(c) => match c.memory.iter().position(|m| m.id == actor) {
            Some(pos) => c.memory.remove(pos),
            None => return,
        },
        None => return,
    };
    debug!("{} recalls {} (cmd: {:?})", ch, actor, entry.cmd);

    if let Some(cmd) = entry.cmd {
        command_interpreter(world, ch, &cmd);
        return;
    }
    let owner = EntityRef::Char(ch);
    for trig in trigger_ids(world, owner) {
        let eligible = trigger_check(world, owner, trig, MobTrig::MEMORY.bits())
            && (!needs_sight || can_see(world, ch, actor))
            && percent_gate(world, owner, trig);
        if eligible {
            bind_uid(world, owner, trig, "actor", actor.into());
            run_new(world, driver, owner, trig);
            break;
        }
    }
}

/// Someone arrived. Every eligible GREET/GREET_ALL trigger on every mob in
/// the room runs; the result is false if any of them returned false.
///
/// `dir` is the direction the actor travelled; scripts see where they came
/// from.
pub fn greet_mtrigger(world: &mut World, driver: &mut dyn ScriptDriver, actor: CharId, dir: Option<Direction>) -> bool {
    if !valid_dg_target(world, actor, DG_ALLOW_GODS) {
        return true;
    }
    let greet_bits = (MobTrig::GREET | MobTrig::GREET_ALL).bits();
    let mut result = true;

    for ch in people_in_room_of(world, actor) {
        let owner = EntityRef::Char(ch);
        if ch == actor || !world.char_valid(ch) || !script_check(world, owner, greet_bits) {
            continue;
        }
        if !script_check(world, owner, MobTrig::GREET_ALL.bits())
            && (!is_awake(world, ch)
                || is_fighting(world, ch)
                || world.char(actor).map(|a| a.is_affected(AffFlags::SNEAK)).unwrap_or(false))
        {
            continue;
        }

        for trig in trigger_ids(world, owner) {
            if !world.char_valid(ch) {
                break;
            }
            let wanted = (trigger_has(world, owner, trig, MobTrig::GREET.bits()) && can_see(world, ch, actor))
                || trigger_has(world, owner, trig, MobTrig::GREET_ALL.bits());
            if wanted
                && trigger_idle(world, owner, trig)
                && charm_ok(world, ch, trig)
                && percent_gate(world, owner, trig)
            {
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

/// The mob itself entered a room.
pub fn entry_mtrigger(world: &mut World, driver: &mut dyn ScriptDriver, ch: CharId) -> bool {
    let owner = EntityRef::Char(ch);
    if !script_check(world, owner, MobTrig::ENTRY.bits()) {
        return true;
    }
    match first_rolled(world, ch, MobTrig::ENTRY.bits()) {
        Some(trig) => run_new(world, driver, owner, trig) != 0,
        None => true,
    }
}

/// A command typed near mobs. True means a script handled it.
pub fn command_mtrigger(
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
    for ch in people_in_room_of(world, actor) {
        let owner = EntityRef::Char(ch);
        if ch == actor || !world.char_valid(ch) || !script_check(world, owner, MobTrig::COMMAND.bits()) {
            continue;
        }
        for trig in trigger_ids(world, owner) {
            if !trigger_check(world, owner, trig, MobTrig::COMMAND.bits()) || !charm_ok(world, ch, trig) {
                continue;
            }
            let pattern = match text_arg(world, owner, trig, "Command") {
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

/// Speech heard by awake mobs; each runs at most its first matching trigger.
pub fn speech_mtrigger(world: &mut World, driver: &mut dyn ScriptDriver, actor: CharId, speech: &str) {
    for ch in people_in_room_of(world, actor) {
        let owner = EntityRef::Char(ch);
        if ch == actor
            || !world.char_valid(ch)
            || !script_check(world, owner, MobTrig::SPEECH.bits())
            || !is_awake(world, ch)
        {
            continue;
        }
        for trig in trigger_ids(world, owner) {
            if !trigger_check(world, owner, trig, MobTrig::SPEECH.bits()) || !charm_ok(world, ch, trig) {
                continue;
            }
            let pattern = match text_arg(world, owner, trig, "Speech") {
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

/// Entities named in an act message.
#[derive(Debug, Clone, Copy, Default)]
pub struct ActArgs {
    pub actor: Option<CharId>,
    pub victim: Option<CharId>,
    pub object: Option<ObjId>,
    pub target: Option<ObjId>,
}

/// `ch` saw an act message.
pub fn act_mtrigger(world: &mut World, driver: &mut dyn ScriptDriver, ch: CharId, text: &str, args: &ActArgs) {
    let owner = EntityRef::Char(ch);
    if args.actor == Some(ch) || !world.char_valid(ch) || !script_check(world, owner, MobTrig::ACT.bits()) {
        return;
    }
    for trig in trigger_ids(world, owner) {
        if !trigger_check(world, owner, trig, MobTrig::ACT.bits()) || !charm_ok(world, ch, trig) {
            continue;
        }
        let pattern = match text_arg(world, owner, trig, "Act") {
            Some(p) => p,
            None => continue,
        };
        let narg = world.trigger(owner, trig).map(|t| t.narg()).unwrap_or(0);
        if !speech_matches(text, &pattern, narg) {
            continue;
        }
        if let Some(a) = args.actor {
            bind_uid(world, owner, trig, "actor", a.into());
        }
        if let Some(v) = args.victim {
            bind_uid(world, owner, trig, "victim", v.into());
        }
        if let Some(o) = args.object {
            bind_uid(world, owner, trig, "object", o.into());
        }
        if let Some(t) = args.target {
            bind_uid(world, owner, trig, "target", t.into());
        }
        let line = text.lines().next().unwrap_or("").trim_start();
        bind(world, owner, trig, "arg", line);
        run_new(world, driver, owner, trig);
        break;
    }
}

/// Combat round for a fighting mob.
pub fn fight_mtrigger(world: &mut World, driver: &mut dyn ScriptDriver, ch: CharId) {
    let owner = EntityRef::Char(ch);
    if !world.char_valid(ch) || !is_fighting(world, ch) || !script_check(world, owner, MobTrig::FIGHT.bits()) {
        return;
    }
    if let Some(trig) = first_rolled(world, ch, MobTrig::FIGHT.bits()) {
        let foe = world.char(ch).and_then(|c| c.fighting);
        bind_uid_or(world, owner, trig, "actor", foe.map(EntityRef::Char), "nobody");
        run_new(world, driver, owner, trig);
    }
}

/// Health dropped; fires the first trigger whose threshold (narg, percent of
/// max health) has been reached.
pub fn hitprcnt_mtrigger(world: &mut World, driver: &mut dyn ScriptDriver, ch: CharId) {
    let owner = EntityRef::Char(ch);
    if !world.char_valid(ch) || !is_fighting(world, ch) || !script_check(world, owner, MobTrig::HITPRCNT.bits()) {
        return;
    }
    let (health, max, foe) = match world.char(ch) {
        Some(c) => (c.pools.health, c.derived.max_health, c.fighting),
        None => return,
    };
    let pct = i64::from(health) * 100 / i64::from(max.max(1));
    for trig in trigger_ids(world, owner) {
        let narg = world.trigger(owner, trig).map(|t| t.narg()).unwrap_or(0);
        if trigger_check(world, owner, trig, MobTrig::HITPRCNT.bits()) && charm_ok(world, ch, trig) && pct <= i64::from(narg) {
            bind_uid_or(world, owner, trig, "actor", foe.map(EntityRef::Char), "nobody");
            run_new(world, driver, owner, trig);
            break;
        }
    }
}

/// `actor` hands `obj` to `ch`. False blocks the give; it is also false
/// whenever the script killed either party or the object left the actor.
pub fn receive_mtrigger(world: &mut World, driver: &mut dyn ScriptDriver, ch: CharId, actor: CharId, obj: ObjId) -> bool {
    let owner = EntityRef::Char(ch);
    if !script_check(world, owner, MobTrig::RECEIVE.bits()) {
        return true;
    }
    let trig = match first_rolled(world, ch, MobTrig::RECEIVE.bits()) {
        Some(t) => t,
        None => return true,
    };
    bind_uid(world, owner, trig, "actor", actor.into());
    bind_uid(world, owner, trig, "object", obj.into());
    let ret = run_new(world, driver, owner, trig);
    let still_held = world.obj_valid(obj) && world.obj(obj).and_then(|o| o.carried_by()) == Some(actor);
    if !world.char_valid(actor) || !world.char_valid(ch) || !still_held {
        return false;
    }
    ret != 0
}

/// `ch` is dying. False suppresses the normal death cry.
pub fn death_mtrigger(world: &mut World, driver: &mut dyn ScriptDriver, ch: CharId, actor: Option<CharId>) -> bool {
    let owner = EntityRef::Char(ch);
    if !script_check(world, owner, MobTrig::DEATH.bits()) {
        return true;
    }
    match first_rolled(world, ch, MobTrig::DEATH.bits()) {
        Some(trig) => {
            if let Some(a) = actor.filter(|a| *a != ch) {
                bind_uid(world, owner, trig, "actor", a.into());
            }
            run_new(world, driver, owner, trig) != 0
        }
        None => true,
    }
}

/// Coins offered to `ch`. narg is the minimum amount.
pub fn bribe_mtrigger(world: &mut World, driver: &mut dyn ScriptDriver, ch: CharId, actor: CharId, amount: i32) {
    let owner = EntityRef::Char(ch);
    if !world.char_valid(ch) || !script_check(world, owner, MobTrig::BRIBE.bits()) {
        return;
    }
    for trig in trigger_ids(world, owner) {
        let narg = world.trigger(owner, trig).map(|t| t.narg()).unwrap_or(0);
        if trigger_check(world, owner, trig, MobTrig::BRIBE.bits()) && charm_ok(world, ch, trig) && amount >= narg {
            bind(world, owner, trig, "amount", &amount.to_string());
            bind_uid(world, owner, trig, "actor", actor.into());
            run_new(world, driver, owner, trig);
            break;
        }
    }
}

pub fn load_mtrigger(world: &mut World, driver: &mut dyn ScriptDriver, ch: CharId) {
    let owner = EntityRef::Char(ch);
    if !script_check(world, owner, MobTrig::LOAD.bits()) {
        return;
    }
    if let Some(trig) = first_rolled(world, ch, MobTrig::LOAD.bits()) {
        run_new(world, driver, owner, trig);
    }
}

/// `actor` used an ability on `ch`.
pub fn ability_mtrigger(
    world: &mut World,
    driver: &mut dyn ScriptDriver,
    actor: CharId,
    ch: CharId,
    ability: Option<&AbilityRef>,
) -> bool {
    let ability = match ability {
        Some(a) => a,
        None => return true,
    };
    let owner = EntityRef::Char(ch);
    if !script_check(world, owner, MobTrig::ABILITY.bits()) {
        return true;
    }
    match first_rolled(world, ch, MobTrig::ABILITY.bits()) {
        Some(trig) => {
            bind_uid(world, owner, trig, "actor", actor.into());
            bind(world, owner, trig, "ability", &ability.vnum.to_string());
            bind(world, owner, trig, "abilityname", &ability.name);
            run_new(world, driver, owner, trig) != 0
        }
        None => true,
    }
}

/// `actor` tries to leave in `dir`. The first eligible trigger decides.
pub fn leave_mtrigger(world: &mut World, driver: &mut dyn ScriptDriver, actor: CharId, dir: Option<Direction>) -> bool {
    let leave_bits = (MobTrig::LEAVE | MobTrig::LEAVE_ALL).bits();
    for ch in people_in_room_of(world, actor) {
        let owner = EntityRef::Char(ch);
        if ch == actor || !world.char_valid(ch) || !script_check(world, owner, leave_bits) {
            continue;
        }
        if !script_check(world, owner, MobTrig::LEAVE_ALL.bits()) && (!is_awake(world, ch) || is_fighting(world, ch)) {
            continue;
        }
        for trig in trigger_ids(world, owner) {
            let wanted = (trigger_has(world, owner, trig, MobTrig::LEAVE.bits()) && can_see(world, ch, actor))
                || trigger_has(world, owner, trig, MobTrig::LEAVE_ALL.bits());
            if wanted
                && trigger_idle(world, owner, trig)
                && charm_ok(world, ch, trig)
                && percent_gate(world, owner, trig)
            {
                bind_direction(world, owner, trig, dir);
                bind_uid(world, owner, trig, "actor", actor.into());
                return run_new(world, driver, owner, trig) != 0;
            }
        }
    }
    true
}

/// `actor` works a door. The first eligible trigger decides.
pub fn door_mtrigger(
    world: &mut World,
    driver: &mut dyn ScriptDriver,
    actor: CharId,
    door: DoorCommand,
    dir: Option<Direction>,
) -> bool {
    for ch in people_in_room_of(world, actor) {
        let owner = EntityRef::Char(ch);
        if ch == actor
            || !world.char_valid(ch)
            || !script_check(world, owner, MobTrig::DOOR.bits())
            || !is_awake(world, ch)
            || is_fighting(world, ch)
        {
            continue;
        }
        for trig in trigger_ids(world, owner) {
            if trigger_has(world, owner, trig, MobTrig::DOOR.bits())
                && can_see(world, ch, actor)
                && trigger_idle(world, owner, trig)
                && charm_ok(world, ch, trig)
                && percent_gate(world, owner, trig)
            {
                bind(world, owner, trig, "cmd", door.verb());
                bind_direction(world, owner, trig, dir);
                bind_uid(world, owner, trig, "actor", actor.into());
                return run_new(world, driver, owner, trig) != 0;
            }
        }
    }
    true
}

/// Every KILL trigger on `ch` runs; false if any returned false.
pub fn kill_mtrigger(
    world: &mut World,
    driver: &mut dyn ScriptDriver,
    ch: CharId,
    victim: CharId,
    killer: Option<CharId>,
) -> bool {
    let owner = EntityRef::Char(ch);
    if !script_check(world, owner, MobTrig::KILL.bits()) {
        return true;
    }
    let mut result = true;
    for trig in trigger_ids(world, owner) {
        if !world.char_valid(ch) {
            break;
        }
        if trigger_check(world, owner, trig, MobTrig::KILL.bits())
            && charm_ok(world, ch, trig)
            && percent_gate(world, owner, trig)
        {
            bind_uid(world, owner, trig, "actor", victim.into());
            bind_uid_or(world, owner, trig, "killer", killer.map(EntityRef::Char), "nobody");
            if run_new(world, driver, owner, trig) == 0 {
                result = false;
            }
        }
    }
    result
}

/// BUY triggers on the mobs around the buyer. Stops at the first false.
pub fn buy_mtrigger(world: &mut World, driver: &mut dyn ScriptDriver, ctx: &BuyContext) -> bool {
    for ch in people_in_room_of(world, ctx.buyer) {
        let owner = EntityRef::Char(ch);
        if ch == ctx.buyer || !world.char_valid(ch) || !script_check(world, owner, MobTrig::BUY.bits()) {
            continue;
        }
        for trig in trigger_ids(world, owner) {
            if !world.char_valid(ch) {
                break;
            }
            if trigger_check(world, owner, trig, MobTrig::BUY.bits()) && charm_ok(world, ch, trig) {
                bind_buy(world, owner, trig, ctx);
                if run_new(world, driver, owner, trig) == 0 {
                    return false;
                }
            }
        }
    }
    true
}

/// Quest start/finish on the mobs around `actor`. The first refusal ends
/// the sweep.
pub fn quest_mtrigger(
    world: &mut World,
    driver: &mut dyn ScriptDriver,
    actor: CharId,
    quest: &QuestRef,
    event: QuestEvent,
    instance: Option<InstanceId>,
) -> bool {
    let bits = event.mob_bits().bits();
    let ctx = RunContext::with_instance(instance);
    for ch in people_in_room_of(world, actor) {
        let owner = EntityRef::Char(ch);
        if ch == actor || !world.char_valid(ch) || !script_check(world, owner, bits) {
            continue;
        }
        for trig in trigger_ids(world, owner) {
            if !world.char_valid(ch) {
                break;
            }
            if trigger_check(world, owner, trig, bits) && charm_ok(world, ch, trig) {
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

/// Runs REBOOT triggers in order until one returns false.
pub fn reboot_mtrigger(world: &mut World, driver: &mut dyn ScriptDriver, ch: CharId) -> bool {
    let owner = EntityRef::Char(ch);
    if !script_check(world, owner, MobTrig::REBOOT.bits()) {
        return true;
    }
    for trig in trigger_ids(world, owner) {
        if !world.char_valid(ch) {
            return false;
        }
        if trigger_check(world, owner, trig, MobTrig::REBOOT.bits())
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
    use crate::mud::entity::{Character, Room};
    use crate::mud::script::{RunContext, TriggerPrototype};

    #[test]
    fn hit_percent_handles_extreme_health() {
        let mut world = World::new(Some(2));
        world
            .registry_mut()
            .insert(TriggerPrototype::mob(5, "rally", MobTrig::HITPRCNT).with_narg(60));
        let room = world.add_room(Room::new(1, "Arena"));
        let troll = world.add_char(Character::npc(30, "troll").with_max_health(10));
        let hero = world.add_char(Character::player("Bo", 9));
        world.char_to_room(troll, room).unwrap();
        world.char_to_room(hero, room).unwrap();
        world.attach_trigger(troll.into(), 5).unwrap();
        if let Some(c) = world.char_mut(troll) {
            c.fighting = Some(hero);
            c.pools.health = i32::MAX;
        }

        let mut runs = 0;
        let mut driver = |_: &mut World, _: EntityRef, _: TrigId, _: &RunContext| -> i32 {
            runs += 1;
            1
        };
        hitprcnt_mtrigger(&mut world, &mut driver, troll);
        if let Some(c) = world.char_mut(troll) {
            c.pools.health = 5;
        }
        hitprcnt_mtrigger(&mut world, &mut driver, troll);
        assert_eq!(runs, 1);
    }
}
