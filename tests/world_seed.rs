//! Loading a world seed from disk and running its scripts with the line driver.
use dgmud::mud::dispatch::combined::greet_triggers;
use dgmud::mud::seed::load_world_from_json;
use dgmud::mud::types::Direction;
use dgmud::mud::{process_events, LineDriver, MudError, World};
use tempfile::tempdir;

const WORLD: &str = r#"{
    "triggers": [
        {"vnum": 1, "name": "herald greeting", "attach": "mob", "types": ["GREET"],
         "commands": "echo Welcome, traveller.\nwait 3\necho Mind the gate."},
        {"vnum": 2, "name": "sweep the square", "attach": "room", "types": ["RESET"],
         "commands": "echo A sweeper tidies the square."},
        {"vnum": 3, "name": "orphan", "attach": "mob", "types": ["SPEECH"], "commands": "echo ?"}
    ],
    "rooms": [
        {"vnum": 100, "name": "Gatehouse", "exits": {"north": 101}, "triggers": [2]},
        {"vnum": 101, "name": "Road"}
    ],
    "mobiles": [
        {"vnum": 200, "name": "herald", "room": 100, "triggers": [1, 404]}
    ],
    "players": [
        {"name": "Tam", "level": 5, "room": 100}
    ],
    "objects": [
        {"vnum": 300, "name": "horn", "location": {"worn_by": {"who": "herald", "slot": "neck"}}},
        {"vnum": 301, "name": "bench", "location": {"room": 100}, "timer": 50}
    ],
    "quests": [
        {"vnum": 900, "name": "Open the Gate"}
    ]
}"#;

fn load(world: &mut World) -> dgmud::mud::seed::SeedReport {
    let dir = tempdir().unwrap();
    let path = dir.path().join("world.json");
    std::fs::write(&path, WORLD).unwrap();
    load_world_from_json(&path, world).unwrap()
}

fn find_char(world: &World, name: &str) -> dgmud::mud::types::CharId {
    world
        .char_ids()
        .into_iter()
        .find(|id| world.char(*id).map(|c| c.name == name).unwrap_or(false))
        .unwrap()
}

fn texts(world: &mut World) -> Vec<String> {
    world.drain_messages().into_iter().map(|m| m.text).collect()
}

#[test]
fn test_seed_builds_everything_and_lists_problems() {
    let mut world = World::new(Some(11));
    let report = load(&mut world);
    assert_eq!(report.triggers, 3);
    assert_eq!(report.rooms, 2);
    assert_eq!(report.chars, 2);
    assert_eq!(report.objs, 2);
    assert_eq!(report.quests.len(), 1);
    // speech trigger without an argument, and an attachment of an unknown vnum
    assert_eq!(report.problems.len(), 2, "{:?}", report.problems);
    assert!(report.problems.iter().any(|p| p.contains("404")));

    let herald = find_char(&world, "herald");
    assert_eq!(world.char(herald).unwrap().equipment.len(), 1);
    let gate = world.room_by_vnum(100).unwrap();
    assert_eq!(world.room(gate).unwrap().contents.len(), 1);
}

#[test]
fn test_greeting_waits_and_resumes() {
    let mut world = World::new(Some(11));
    load(&mut world);
    let tam = find_char(&world, "Tam");
    let mut driver = LineDriver::new();

    assert!(greet_triggers(&mut world, &mut driver, tam, Some(Direction::South)));
    assert_eq!(texts(&mut world), vec!["Welcome, traveller.".to_string()]);

    // parked on its wait, so a second arrival does not restart it
    greet_triggers(&mut world, &mut driver, tam, Some(Direction::South));
    assert!(texts(&mut world).is_empty());

    for _ in 0..2 {
        world.advance_pulse();
        process_events(&mut world, &mut driver);
    }
    assert!(texts(&mut world).is_empty());
    world.advance_pulse();
    process_events(&mut world, &mut driver);
    assert_eq!(texts(&mut world), vec!["Mind the gate.".to_string()]);
}

#[test]
fn test_extracting_the_speaker_cancels_its_wait() {
    let mut world = World::new(Some(11));
    load(&mut world);
    let tam = find_char(&world, "Tam");
    let herald = find_char(&world, "herald");
    let mut driver = LineDriver::new();

    greet_triggers(&mut world, &mut driver, tam, None);
    texts(&mut world);
    world.extract_char(herald);

    world.set_pulse(3);
    process_events(&mut world, &mut driver);
    assert!(texts(&mut world).is_empty());
    let swept = world.extract_pending().unwrap();
    assert_eq!(swept.chars, 1);
}

#[test]
fn test_reset_triggers_recur() {
    let mut world = World::new(Some(11));
    world.reset_interval = 10;
    load(&mut world);
    let mut driver = LineDriver::new();

    world.set_pulse(10);
    process_events(&mut world, &mut driver);
    assert_eq!(texts(&mut world), vec!["A sweeper tidies the square.".to_string()]);
    world.set_pulse(20);
    process_events(&mut world, &mut driver);
    assert_eq!(texts(&mut world), vec!["A sweeper tidies the square.".to_string()]);
}

#[test]
fn test_object_timer_removes_untriggered_objects() {
    let mut world = World::new(Some(11));
    load(&mut world);
    let gate = world.room_by_vnum(100).unwrap();
    let bench = world.room(gate).unwrap().contents[0];
    let mut driver = LineDriver::new();

    world.set_pulse(50);
    process_events(&mut world, &mut driver);
    assert!(!world.obj_valid(bench));
    assert!(world.room(gate).unwrap().contents.is_empty());
}

#[test]
fn test_unreadable_and_malformed_seeds_fail() {
    let dir = tempdir().unwrap();
    let mut world = World::new(Some(1));
    let missing = load_world_from_json(dir.path().join("absent.json"), &mut world);
    assert!(matches!(missing, Err(MudError::Io(_))));

    let path = dir.path().join("bad.json");
    std::fs::write(&path, "{\"rooms\": [").unwrap();
    match load_world_from_json(&path, &mut world) {
        Err(MudError::InvalidSeed(msg)) => assert!(msg.contains("Failed to parse")),
        other => panic!("expected InvalidSeed, got {:?}", other),
    }
}
