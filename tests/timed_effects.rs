//! Affects, damage-over-time, cooldowns and the event pass working together.
mod common;

use common::{room_with_player, Recorder};
use dgmud::mud::affects::{
    affect_join, affect_remove, affect_to_char, affect_total, affected_by_spell, apply_dot_effect,
    create_aff, DamageType, JoinFlags, DOT_TICK_PULSES,
};
use dgmud::mud::cooldowns::{add_cooldown, get_cooldown_time};
use dgmud::mud::entity::{Character, Object};
use dgmud::mud::scheduler::EventPayload;
use dgmud::mud::types::{AffFlags, Apply, WearSlot};
use dgmud::mud::{process_events, MudError};
use std::collections::HashMap;

#[test]
fn test_joining_the_same_affect_twice_counts_once() {
    let (mut world, _room, player) = room_with_player(1);
    let base = world.char(player).unwrap().current.strength;

    for _ in 0..2 {
        let af = create_aff(&mut world, 77, 20, Apply::Strength, 2, AffFlags::SNEAK.bits(), None);
        affect_join(&mut world, player, af, JoinFlags::empty());
    }
    let ch = world.char(player).unwrap();
    assert_eq!(ch.affected.len(), 1);
    assert_eq!(ch.current.strength, base + 2);
    assert!(ch.is_affected(AffFlags::SNEAK));
    // the replaced affect's expiry was cancelled along with it
    assert_eq!(world.events.len(), 1);
}

#[test]
fn test_joining_with_added_modifier_stacks_strength() {
    let (mut world, _room, player) = room_with_player(1);
    let base = world.char(player).unwrap().current.strength;

    let af = create_aff(&mut world, 78, 20, Apply::Strength, 2, 0, None);
    affect_join(&mut world, player, af, JoinFlags::empty());
    let af = create_aff(&mut world, 78, 20, Apply::Strength, 3, 0, None);
    affect_join(&mut world, player, af, JoinFlags::ADD_MODIFIER | JoinFlags::ADD_DURATION);

    let ch = world.char(player).unwrap();
    assert_eq!(ch.affected.len(), 1);
    assert_eq!(ch.current.strength, base + 5);
    assert_eq!(ch.affected[0].expire_at, Some(40));
}

#[test]
fn test_worn_gear_grants_its_flags_once() {
    let (mut world, _room, player) = room_with_player(1);
    let mut wings = Object::new(50, "feathered cloak");
    wings.aff_flags = AffFlags::FLY;
    let wings = world.add_obj(wings);
    let mut boots = Object::new(51, "quiet boots")
        .with_apply(Apply::Dexterity, 1)
        .with_apply(Apply::Move, 5);
    boots.aff_flags = AffFlags::SNEAK;
    let boots = world.add_obj(boots);

    world.equip_char(player, wings, WearSlot::About).unwrap();
    world.equip_char(player, boots, WearSlot::Feet).unwrap();
    let ch = world.char(player).unwrap();
    assert!(ch.is_affected(AffFlags::FLY));
    assert!(ch.is_affected(AffFlags::SNEAK));

    world.unequip_char(player, WearSlot::About);
    let ch = world.char(player).unwrap();
    assert!(!ch.is_affected(AffFlags::FLY));
    assert!(ch.is_affected(AffFlags::SNEAK));
}

#[test]
fn test_attributes_stay_within_the_configured_maximum() {
    let (mut world, _room, player) = room_with_player(1);
    let mut tunables = HashMap::new();
    tunables.insert("max_player_attribute".to_string(), 3_i64);
    world.set_tunables(Box::new(tunables));

    let af = create_aff(&mut world, 80, 20, Apply::Strength, 5, 0, None);
    affect_to_char(&mut world, player, af);
    let af = create_aff(&mut world, 81, 20, Apply::Wits, -10, 0, None);
    affect_to_char(&mut world, player, af);
    affect_total(&mut world, player);

    let ch = world.char(player).unwrap();
    assert_eq!(ch.current.strength, 3);
    assert_eq!(ch.current.wits, 0);
}

#[test]
fn test_removed_affect_never_fires() {
    let (mut world, _room, player) = room_with_player(1);
    let af = create_aff(&mut world, 12, 10, Apply::None, 0, AffFlags::FLY.bits(), None);
    let id = af.id;
    affect_to_char(&mut world, player, af);
    assert!(affect_remove(&mut world, player, id));

    let mut driver = Recorder::new();
    world.set_pulse(10);
    assert_eq!(process_events(&mut world, &mut driver), 0);
    assert!(world.drain_messages().is_empty());
    assert!(!affected_by_spell(&world, player, 12));
}

#[test]
fn test_cancelled_handle_stays_dead() {
    let (mut world, _room, player) = room_with_player(1);
    let id = world.events.schedule(0, 5, EventPayload::CooldownExpire { ch: player, cooldown: 3 });
    assert!(world.events.cancel(id).is_some());
    assert!(world.events.cancel(id).is_none());
    assert!(!world.events.is_queued(id));
    assert!(world.events.is_empty());
}

#[test]
fn test_cooldowns_only_ever_grow() {
    let (mut world, _room, player) = room_with_player(1);
    add_cooldown(&mut world, player, 4, 30);
    add_cooldown(&mut world, player, 4, 10);
    assert_eq!(get_cooldown_time(&world, player, 4), 30);
    add_cooldown(&mut world, player, 4, 50);
    assert_eq!(get_cooldown_time(&world, player, 4), 50);
    assert_eq!(world.events.len(), 1);

    let mut driver = Recorder::new();
    world.set_pulse(30);
    assert_eq!(process_events(&mut world, &mut driver), 0);
    assert_eq!(get_cooldown_time(&world, player, 4), 20);
    world.set_pulse(50);
    assert_eq!(process_events(&mut world, &mut driver), 1);
    assert_eq!(get_cooldown_time(&world, player, 4), 0);
    assert!(world.char(player).unwrap().cooldowns.is_empty());
}

#[test]
fn test_dot_reapplication_refreshes_and_stacks() {
    let (mut world, _room, player) = room_with_player(1);
    let first = apply_dot_effect(&mut world, player, 90, 3, DamageType::Poison, 4, 2, None).unwrap();
    let again = apply_dot_effect(&mut world, player, 90, 6, DamageType::Poison, 4, 5, None).unwrap();
    let third = apply_dot_effect(&mut world, player, 90, 1, DamageType::Poison, 4, 5, None).unwrap();
    assert_eq!(first, again);
    assert_eq!(first, third);

    let dots = &world.char(player).unwrap().dots;
    assert_eq!(dots.len(), 1);
    assert_eq!(dots[0].stack, 2);
    assert_eq!(dots[0].duration, 6);
    assert_eq!(world.events.len(), 1);

    // different damage is a separate effect
    apply_dot_effect(&mut world, player, 90, 3, DamageType::Poison, 7, 1, None);
    assert_eq!(world.char(player).unwrap().dots.len(), 2);
}

#[test]
fn test_dot_ticks_until_it_runs_out() {
    let (mut world, _room, player) = room_with_player(1);
    let start = world.char(player).unwrap().pools.health;
    apply_dot_effect(&mut world, player, 91, 2, DamageType::Fire, 5, 1, None);

    let mut driver = Recorder::new();
    world.set_pulse(DOT_TICK_PULSES);
    assert_eq!(process_events(&mut world, &mut driver), 1);
    world.set_pulse(DOT_TICK_PULSES * 2);
    assert_eq!(process_events(&mut world, &mut driver), 1);

    let ch = world.char(player).unwrap();
    assert_eq!(ch.pools.health, start - 10);
    assert!(ch.dots.is_empty());
    assert!(world.events.is_empty());
}

#[test]
fn test_dot_death_drops_belongings_at_the_sweep() {
    let (mut world, room, _player) = room_with_player(1);
    let rat = world.add_char(Character::npc(40, "rat").with_max_health(3));
    world.char_to_room(rat, room).unwrap();
    let cheese = world.add_obj(Object::new(41, "cheese"));
    world.obj_to_char(cheese, rat).unwrap();
    apply_dot_effect(&mut world, rat, 92, 5, DamageType::Poison, 10, 1, None);

    let mut driver = Recorder::new();
    world.set_pulse(DOT_TICK_PULSES);
    process_events(&mut world, &mut driver);
    assert!(!world.char_valid(rat));
    assert_eq!(world.extractions_pending(), 1);

    let swept = world.extract_pending().unwrap();
    assert_eq!(swept.chars, 1);
    assert!(world.char(rat).is_none());
    assert_eq!(world.room(room).unwrap().contents, vec![cheese]);
    assert_eq!(world.extractions_pending(), 0);
}

#[test]
fn test_sweep_refuses_a_character_with_no_room() {
    let mut world = dgmud::mud::World::new(Some(1));
    let ghost = world.add_char(Character::npc(13, "ghost"));
    world.extract_char(ghost);
    match world.extract_pending() {
        Err(MudError::NoLocation { uid, name }) => {
            assert_eq!(uid, ghost.0);
            assert_eq!(name, "ghost");
        }
        other => panic!("expected NoLocation, got {:?}", other),
    }
    assert!(MudError::NoLocation {
        uid: 0,
        name: String::new()
    }
    .is_fatal());
}
