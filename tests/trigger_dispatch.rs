//! End-to-end dispatch behavior across mobiles, objects, rooms and vehicles.
mod common;

use common::{room_with_player, Recorder};
use dgmud::mud::dispatch::combined::{
    buy_trigger_check, check_start_quest_trigger, greet_triggers, BuyContext,
};
use dgmud::mud::dispatch::mobile::greet_mtrigger;
use dgmud::mud::dispatch::object::{command_otrigger, drop_otrigger};
use dgmud::mud::entity::{Character, Object};
use dgmud::mud::script::matching::CommandMatch;
use dgmud::mud::script::{MobTrig, ObjTrig, TriggerPrototype, WldTrig};
use dgmud::mud::types::{Direction, EntityRef, InstanceId, QuestRef, WearSlot};
use dgmud::mud::LineDriver;

#[test]
fn test_command_offered_to_equipment_then_inventory_then_floor() {
    let (mut world, room, player) = room_with_player(7);
    world
        .registry_mut()
        .insert(TriggerPrototype::obj(100, "pull lever", ObjTrig::COMMAND).with_arg("pull").with_narg(7));

    let floor = world.add_obj(Object::new(1, "lever"));
    let carried = world.add_obj(Object::new(2, "rope"));
    let ring = world.add_obj(Object::new(3, "ring"));
    let cloak = world.add_obj(Object::new(4, "cloak"));
    world.obj_to_room(floor, room).unwrap();
    world.obj_to_char(carried, player).unwrap();
    world.equip_char(player, ring, WearSlot::Finger).unwrap();
    world.equip_char(player, cloak, WearSlot::About).unwrap();
    for obj in [floor, carried, ring, cloak] {
        world.attach_trigger(obj.into(), 100).unwrap();
    }

    // Every script declines, so all four are offered the command.
    let mut driver = Recorder::new().answer(100, 0);
    assert!(!command_otrigger(&mut world, &mut driver, player, "pull", "chain", CommandMatch::Exact));
    assert_eq!(
        driver.owners(),
        vec![
            EntityRef::Obj(cloak),
            EntityRef::Obj(ring),
            EntityRef::Obj(carried),
            EntityRef::Obj(floor)
        ]
    );

    // The first one to accept ends the search.
    let mut driver = Recorder::new();
    assert!(command_otrigger(&mut world, &mut driver, player, "pull", "", CommandMatch::Exact));
    assert_eq!(driver.owners(), vec![EntityRef::Obj(cloak)]);
}

#[test]
fn test_command_location_mask_hides_carried_triggers() {
    let (mut world, room, player) = room_with_player(7);
    world
        .registry_mut()
        .insert(TriggerPrototype::obj(101, "floor only", ObjTrig::COMMAND).with_arg("push").with_narg(4));
    let carried = world.add_obj(Object::new(5, "button"));
    world.obj_to_char(carried, player).unwrap();
    world.attach_trigger(carried.into(), 101).unwrap();

    let mut driver = Recorder::new();
    assert!(!command_otrigger(&mut world, &mut driver, player, "push", "", CommandMatch::Exact));

    world.obj_from_location(carried);
    world.obj_to_room(carried, room).unwrap();
    assert!(command_otrigger(&mut world, &mut driver, player, "push", "", CommandMatch::Exact));
}

#[test]
fn test_percent_extremes_are_deterministic() {
    let (mut world, room, player) = room_with_player(99);
    world
        .registry_mut()
        .insert(TriggerPrototype::mob(10, "always", MobTrig::GREET).with_narg(100));
    world
        .registry_mut()
        .insert(TriggerPrototype::mob(11, "never", MobTrig::GREET).with_narg(0));
    let always = world.add_char(Character::npc(500, "doorman"));
    let never = world.add_char(Character::npc(501, "statue"));
    world.char_to_room(always, room).unwrap();
    world.char_to_room(never, room).unwrap();
    world.attach_trigger(always.into(), 10).unwrap();
    world.attach_trigger(never.into(), 11).unwrap();

    let mut driver = Recorder::new();
    for _ in 0..50 {
        greet_mtrigger(&mut world, &mut driver, player, Some(Direction::East));
    }
    assert_eq!(driver.calls.len(), 50);
    assert!(driver.vnums().iter().all(|v| *v == 10));
}

#[test]
fn test_greet_reports_the_side_the_actor_came_from() {
    let (mut world, room, player) = room_with_player(3);
    world
        .registry_mut()
        .insert(TriggerPrototype::room(20, "arrival", WldTrig::ENTER));
    world
        .registry_mut()
        .insert(TriggerPrototype::mob(21, "hello", MobTrig::GREET));
    world.attach_trigger(room.into(), 20).unwrap();
    let guard = world.add_char(Character::npc(600, "guard"));
    world.char_to_room(guard, room).unwrap();
    world.attach_trigger(guard.into(), 21).unwrap();

    let mut driver = Recorder::new().watching(&["direction"]);
    assert!(greet_triggers(&mut world, &mut driver, player, Some(Direction::North)));
    assert_eq!(driver.vnums(), vec![20, 21]);
    assert!(driver.calls.iter().all(|c| c.var("direction") == Some("south")));
}

#[test]
fn test_blocked_enter_skips_mobile_greets() {
    let (mut world, room, player) = room_with_player(3);
    world
        .registry_mut()
        .insert(TriggerPrototype::room(22, "closed", WldTrig::ENTER));
    world
        .registry_mut()
        .insert(TriggerPrototype::mob(23, "hello", MobTrig::GREET));
    world.attach_trigger(room.into(), 22).unwrap();
    let guard = world.add_char(Character::npc(600, "guard"));
    world.char_to_room(guard, room).unwrap();
    world.attach_trigger(guard.into(), 23).unwrap();

    let mut driver = Recorder::new().answer(22, 0);
    assert!(!greet_triggers(&mut world, &mut driver, player, None));
    assert_eq!(driver.vnums(), vec![22]);
}

#[test]
fn test_two_half_chance_drop_triggers_roll_independently() {
    let (mut world, _room, player) = room_with_player(2024);
    world
        .registry_mut()
        .insert(TriggerPrototype::obj(30, "first", ObjTrig::DROP).with_narg(50));
    world
        .registry_mut()
        .insert(TriggerPrototype::obj(31, "second", ObjTrig::DROP).with_narg(50));
    let coin = world.add_obj(Object::new(9, "coin"));
    world.obj_to_char(coin, player).unwrap();
    world.attach_trigger(coin.into(), 30).unwrap();
    world.attach_trigger(coin.into(), 31).unwrap();

    let mut driver = Recorder::new();
    const DROPS: usize = 4000;
    for _ in 0..DROPS {
        assert!(drop_otrigger(&mut world, &mut driver, coin, player));
    }
    let first = driver.vnums().iter().filter(|v| **v == 30).count();
    let second = driver.vnums().iter().filter(|v| **v == 31).count();
    // At most one trigger per drop: about 1/2 first, 1/4 second, 1/4 none.
    assert_eq!(first + second, driver.calls.len());
    assert!((1800..2200).contains(&first), "first ran {} times", first);
    assert!((800..1200).contains(&second), "second ran {} times", second);
}

#[test]
fn test_purging_self_during_drop_is_safe() {
    let (mut world, room, player) = room_with_player(5);
    world
        .registry_mut()
        .insert(TriggerPrototype::obj(40, "crumble", ObjTrig::DROP).with_commands("echo The scroll crumbles.\npurge\necho never"));
    let scroll = world.add_obj(Object::new(12, "scroll"));
    world.obj_to_char(scroll, player).unwrap();
    world.attach_trigger(scroll.into(), 40).unwrap();

    let mut driver = LineDriver::new();
    assert!(!drop_otrigger(&mut world, &mut driver, scroll, player));
    assert!(!world.obj_valid(scroll));
    assert!(world.char(player).unwrap().carrying.is_empty());

    let texts: Vec<String> = world.drain_messages().into_iter().map(|m| m.text).collect();
    assert_eq!(texts, vec!["The scroll crumbles.".to_string()]);

    let swept = world.extract_pending().unwrap();
    assert_eq!(swept.objs, 1);
    assert!(world.obj(scroll).is_none());
    assert!(world.room(room).unwrap().contents.is_empty());
}

#[test]
fn test_first_refusal_stops_a_purchase() {
    let (mut world, room, player) = room_with_player(8);
    world
        .registry_mut()
        .insert(TriggerPrototype::room(50, "no sales today", WldTrig::BUY));
    world
        .registry_mut()
        .insert(TriggerPrototype::mob(51, "haggle", MobTrig::BUY));
    world.attach_trigger(room.into(), 50).unwrap();
    let merchant = world.add_char(Character::npc(700, "merchant"));
    world.char_to_room(merchant, room).unwrap();
    world.attach_trigger(merchant.into(), 51).unwrap();

    let ctx = BuyContext::new(player, 25).with_shopkeeper(merchant.into());
    let mut driver = Recorder::new().answer(50, 0).watching(&["cost", "currency"]);
    assert!(!buy_trigger_check(&mut world, &mut driver, &ctx));
    assert_eq!(driver.vnums(), vec![50]);
    assert_eq!(driver.calls[0].var("cost"), Some("25"));
    assert_eq!(driver.calls[0].var("currency"), Some("coins"));

    let mut driver = Recorder::new();
    assert!(buy_trigger_check(&mut world, &mut driver, &ctx));
    assert_eq!(driver.vnums(), vec![50, 51]);
}

#[test]
fn test_first_quest_refusal_ends_the_sweep() {
    let (mut world, room, player) = room_with_player(8);
    world
        .registry_mut()
        .insert(TriggerPrototype::mob(60, "refuse", MobTrig::START_QUEST));
    world
        .registry_mut()
        .insert(TriggerPrototype::mob(61, "welcome", MobTrig::START_QUEST));
    world
        .registry_mut()
        .insert(TriggerPrototype::room(62, "notice board", WldTrig::START_QUEST));
    let sage = world.add_char(Character::npc(800, "sage"));
    world.char_to_room(sage, room).unwrap();
    world.attach_trigger(sage.into(), 60).unwrap();
    world.attach_trigger(sage.into(), 61).unwrap();

    let quest = QuestRef {
        vnum: 9100,
        name: "The Lost Bell".to_string(),
        script: vec![62],
    };
    let mut driver = Recorder::new().answer(60, 0).watching(&["questvnum"]);
    let ok = check_start_quest_trigger(&mut world, &mut driver, player, &quest, Some(InstanceId(4)));
    assert!(!ok);
    assert_eq!(driver.vnums(), vec![60]);
    assert_eq!(driver.calls[0].instance, Some(InstanceId(4)));
    assert_eq!(driver.calls[0].var("questvnum"), Some("9100"));
    assert!(world.room(room).unwrap().script.is_none());

    // with no refusal every leg runs, the quest's own script last
    let mut driver = Recorder::new();
    assert!(check_start_quest_trigger(&mut world, &mut driver, player, &quest, None));
    assert_eq!(driver.vnums(), vec![60, 61, 62]);
}
