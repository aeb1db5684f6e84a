//! Sweeps that span every entity kind: command precedence, shop purchases,
//! quests, kills, movement and the periodic random/reboot passes.

use super::{bind, bind_uid, bind_uid_or, mobile, object, room, vehicle};
use crate::mud::script::matching::CommandMatch;
use crate::mud::script::{MobTrig, ObjTrig, ScriptDriver, VehTrig, WldTrig};
use crate::mud::types::{CharId, Direction, EntityRef, InstanceId, QuestRef, TrigId, VehId, NOTHING};
use crate::mud::world::World;
use log::debug;

/// A purchase about to happen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuyContext {
    pub buyer: CharId,
    /// What is being bought (object, mob or vehicle), if it exists yet.
    pub item: Option<EntityRef>,
    pub cost: i32,
    /// Empire currency vnum, or [`NOTHING`] for coins.
    pub currency: i32,
    pub shopkeeper: Option<EntityRef>,
}

impl BuyContext {
    pub fn new(buyer: CharId, cost: i32) -> Self {
        Self {
            buyer,
            item: None,
            cost,
            currency: NOTHING,
            shopkeeper: None,
        }
    }

    pub fn with_item(mut self, item: EntityRef) -> Self {
        self.item = Some(item);
        self
    }

    pub fn with_currency(mut self, currency: i32) -> Self {
        self.currency = currency;
        self
    }

    pub fn with_shopkeeper(mut self, shopkeeper: EntityRef) -> Self {
        self.shopkeeper = Some(shopkeeper);
        self
    }

    /// Value of the `currency` variable.
    pub fn currency_name(&self) -> String {
        if self.currency == NOTHING {
            "coins".to_string()
        } else {
            self.currency.to_string()
        }
    }
}

pub(crate) fn bind_buy(world: &mut World, owner: EntityRef, trig: TrigId, ctx: &BuyContext) {
    bind_uid(world, owner, trig, "actor", ctx.buyer.into());
    bind_uid_or(world, owner, trig, "item", ctx.item, "0");
    bind(world, owner, trig, "cost", &ctx.cost.to_string());
    bind(world, owner, trig, "currency", &ctx.currency_name());
    bind_uid_or(world, owner, trig, "shopkeeper", ctx.shopkeeper, "nobody");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestEvent {
    Start,
    Finish,
}

impl QuestEvent {
    pub fn mob_bits(&self) -> MobTrig {
        match self {
            QuestEvent::Start => MobTrig::START_QUEST,
            QuestEvent::Finish => MobTrig::FINISH_QUEST,
        }
    }

    pub fn obj_bits(&self) -> ObjTrig {
        match self {
            QuestEvent::Start => ObjTrig::START_QUEST,
            QuestEvent::Finish => ObjTrig::FINISH_QUEST,
        }
    }

    pub fn room_bits(&self) -> WldTrig {
        match self {
            QuestEvent::Start => WldTrig::START_QUEST,
            QuestEvent::Finish => WldTrig::FINISH_QUEST,
        }
    }

    pub fn veh_bits(&self) -> VehTrig {
        match self {
            QuestEvent::Start => VehTrig::START_QUEST,
            QuestEvent::Finish => VehTrig::FINISH_QUEST,
        }
    }
}

pub(crate) fn bind_quest(world: &mut World, owner: EntityRef, trig: TrigId, quest: &QuestRef) {
    bind(world, owner, trig, "questvnum", &quest.vnum.to_string());
    bind(world, owner, trig, "questname", &quest.name);
}

/// Offer a typed command to scripts: the room first, then mobs, objects and
/// vehicles. True means a script handled it and normal processing stops.
pub fn check_command_trigger(
    world: &mut World,
    driver: &mut dyn ScriptDriver,
    actor: CharId,
    cmd: &str,
    argument: &str,
    mode: CommandMatch,
) -> bool {
    room::command_wtrigger(world, driver, actor, cmd, argument, mode)
        || mobile::command_mtrigger(world, driver, actor, cmd, argument, mode)
        || object::command_otrigger(world, driver, actor, cmd, argument, mode)
        || vehicle::command_vtrigger(world, driver, actor, cmd, argument, mode)
}

/// Speech heard by the room, the mobs in it and parked vehicles.
pub fn speech_triggers(world: &mut World, driver: &mut dyn ScriptDriver, actor: CharId, speech: &str) {
    mobile::speech_mtrigger(world, driver, actor, speech);
    room::speech_wtrigger(world, driver, actor, speech);
    vehicle::speech_vtrigger(world, driver, actor, speech);
}

/// BUY triggers on the room, mobs, objects and vehicles in that order. The
/// first script returning false cancels the purchase.
pub fn buy_trigger_check(world: &mut World, driver: &mut dyn ScriptDriver, ctx: &BuyContext) -> bool {
    let allowed = room::buy_wtrigger(world, driver, ctx)
        && mobile::buy_mtrigger(world, driver, ctx)
        && object::buy_otrigger(world, driver, ctx)
        && vehicle::buy_vtrigger(world, driver, ctx);
    if !allowed {
        debug!("purchase by {} stopped by a script", ctx.buyer);
    }
    allowed
}

fn quest_sweep(
    world: &mut World,
    driver: &mut dyn ScriptDriver,
    actor: CharId,
    quest: &QuestRef,
    event: QuestEvent,
    instance: Option<InstanceId>,
) -> bool {
    let allowed = mobile::quest_mtrigger(world, driver, actor, quest, event, instance)
        && object::quest_otrigger(world, driver, actor, quest, event, instance)
        && vehicle::quest_vtrigger(world, driver, actor, quest, event, instance)
        && room::quest_wtrigger(world, driver, actor, quest, event, instance);
    if !allowed {
        debug!("quest {} for {} stopped by a script", quest.vnum, actor);
    }
    allowed
}

/// Scripts may veto `actor` starting `quest`. `instance` is the adventure
/// instance the quest belongs to, visible to every script in the sweep.
pub fn check_start_quest_trigger(
    world: &mut World,
    driver: &mut dyn ScriptDriver,
    actor: CharId,
    quest: &QuestRef,
    instance: Option<InstanceId>,
) -> bool {
    quest_sweep(world, driver, actor, quest, QuestEvent::Start, instance)
}

pub fn check_finish_quest_trigger(
    world: &mut World,
    driver: &mut dyn ScriptDriver,
    actor: CharId,
    quest: &QuestRef,
    instance: Option<InstanceId>,
) -> bool {
    quest_sweep(world, driver, actor, quest, QuestEvent::Finish, instance)
}

/// Whether `ch` fights on `killer`'s side.
pub fn is_fight_ally(world: &World, killer: CharId, ch: CharId) -> bool {
    if killer == ch {
        return true;
    }
    let (k, c) = match (world.char(killer), world.char(ch)) {
        (Some(k), Some(c)) => (k, c),
        _ => return false,
    };
    if k.empire.is_some() && k.empire == c.empire {
        return true;
    }
    c.master == Some(killer) || k.master == Some(ch) || (c.master.is_some() && c.master == k.master)
}

/// `victim` died. KILL triggers run on the killer and its allies in the
/// room, on everything they wear or carry, and on a killing vehicle. Every
/// eligible trigger runs; false means some script asked to suppress the
/// normal death cry.
pub fn kill_trigger(
    world: &mut World,
    driver: &mut dyn ScriptDriver,
    victim: CharId,
    killer: Option<CharId>,
    killer_vehicle: Option<VehId>,
) -> bool {
    let mut result = true;

    if let Some(k) = killer.filter(|k| *k != victim) {
        let room = world
            .char(k)
            .and_then(|c| c.in_room)
            .or_else(|| world.char(victim).and_then(|c| c.in_room));
        let people = room
            .and_then(|r| world.room(r))
            .map(|r| r.people.clone())
            .unwrap_or_default();

        for ally in people {
            if ally == victim || !world.char_valid(ally) || !is_fight_ally(world, k, ally) {
                continue;
            }
            if !mobile::kill_mtrigger(world, driver, ally, victim, killer) {
                result = false;
            }
            let worn: Vec<_> = world
                .char(ally)
                .map(|c| c.equipment.values().copied().collect())
                .unwrap_or_default();
            for obj in worn {
                if !object::kill_otrigger(world, driver, &[obj], victim, killer) {
                    result = false;
                }
            }
            let carried = world.char(ally).map(|c| c.carrying.clone()).unwrap_or_default();
            if !object::kill_otrigger(world, driver, &carried, victim, killer) {
                result = false;
            }
        }
    }

    if let Some(veh) = killer_vehicle {
        if !vehicle::kill_vtrigger(world, driver, veh, victim, killer) {
            result = false;
        }
    }
    result
}

/// Movement into a room: the room's ENTER triggers first, then the greet
/// triggers of mobs and vehicles. False means the arrival was refused.
pub fn greet_triggers(world: &mut World, driver: &mut dyn ScriptDriver, actor: CharId, dir: Option<Direction>) -> bool {
    let room = match world.char(actor).and_then(|c| c.in_room) {
        Some(r) => r,
        None => return true,
    };
    room::enter_wtrigger(world, driver, room, actor, dir)
        && mobile::greet_mtrigger(world, driver, actor, dir)
        && vehicle::greet_vtrigger(world, driver, actor, dir)
}

/// Movement out of a room. The first refusal stops the move.
pub fn leave_triggers(world: &mut World, driver: &mut dyn ScriptDriver, actor: CharId, dir: Option<Direction>) -> bool {
    let room = match world.char(actor).and_then(|c| c.in_room) {
        Some(r) => r,
        None => return true,
    };
    room::leave_wtrigger(world, driver, room, actor, dir)
        && mobile::leave_mtrigger(world, driver, actor, dir)
        && object::leave_otrigger(world, driver, room, actor, dir)
        && vehicle::leave_vtrigger(world, driver, actor, dir)
}

/// Whether any mortal player is online to witness random triggers.
fn anyone_watching(world: &World) -> bool {
    world.char_ids().into_iter().any(|id| {
        world
            .char(id)
            .map(|c| !c.is_npc && !c.extracted && !c.is_immortal() && !c.has_nohassle())
            .unwrap_or(false)
    })
}

/// One pass of RANDOM triggers over the whole world. Skipped while no
/// mortal player is around.
pub fn run_random_triggers(world: &mut World, driver: &mut dyn ScriptDriver) {
    if !anyone_watching(world) {
        return;
    }
    for ch in world.char_ids() {
        let npc = world.char(ch).map(|c| c.is_npc).unwrap_or(false);
        if npc && world.char_valid(ch) && super::script_check(world, ch.into(), MobTrig::RANDOM.bits()) {
            mobile::random_mtrigger(world, driver, ch);
        }
    }
    for obj in world.obj_ids() {
        if world.obj_valid(obj) && super::script_check(world, obj.into(), ObjTrig::RANDOM.bits()) {
            object::random_otrigger(world, driver, obj);
        }
    }
    for r in world.room_ids() {
        if super::script_check(world, r.into(), WldTrig::RANDOM.bits()) {
            room::random_wtrigger(world, driver, r);
        }
    }
    for veh in world.vehicle_ids() {
        if world.vehicle_valid(veh) && super::script_check(world, veh.into(), VehTrig::RANDOM.bits()) {
            vehicle::random_vtrigger(world, driver, veh);
        }
    }
}

/// Fire REBOOT triggers everywhere, once, after the world is loaded.
/// Returns how many entities ran their reboot scripts to completion.
pub fn reboot_triggers(world: &mut World, driver: &mut dyn ScriptDriver) -> usize {
    let mut completed = 0;
    for ch in world.char_ids() {
        if world.char_valid(ch) && mobile::reboot_mtrigger(world, driver, ch) {
            completed += 1;
        }
    }
    for obj in world.obj_ids() {
        if world.obj_valid(obj) && object::reboot_otrigger(world, driver, obj) {
            completed += 1;
        }
    }
    for r in world.room_ids() {
        if room::reboot_wtrigger(world, driver, r) {
            completed += 1;
        }
    }
    for veh in world.vehicle_ids() {
        if world.vehicle_valid(veh) && vehicle::reboot_vtrigger(world, driver, veh) {
            completed += 1;
        }
    }
    completed
}
