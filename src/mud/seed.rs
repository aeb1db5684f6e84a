//! World seed loading.
//!
//! A seed is one JSON document describing trigger prototypes, rooms,
//! mobiles, players, objects, vehicles and quests. Problems with individual
//! trigger attachments are collected in the report instead of failing the
//! whole load, so `check` can list them all at once.

use crate::mud::entity::{Character, Object, Room, Vehicle};
use crate::mud::errors::MudError;
use crate::mud::script::registry::parse_type_flags;
use crate::mud::script::TriggerPrototype;
use crate::mud::types::{
    AffFlags, AttachType, CharId, Direction, EntityRef, QuestRef, RoomAffFlags, TrigVnum, WearSlot,
};
use crate::mud::world::World;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorldSeed {
    #[serde(default)]
    pub triggers: Vec<TriggerSeed>,
    #[serde(default)]
    pub rooms: Vec<RoomSeed>,
    #[serde(default)]
    pub mobiles: Vec<MobileSeed>,
    #[serde(default)]
    pub players: Vec<PlayerSeed>,
    #[serde(default)]
    pub objects: Vec<ObjectSeed>,
    #[serde(default)]
    pub vehicles: Vec<VehicleSeed>,
    #[serde(default)]
    pub quests: Vec<QuestRef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerSeed {
    pub vnum: TrigVnum,
    pub name: String,
    pub attach: AttachType,
    /// Type names such as "GREET" or "COMMAND".
    pub types: Vec<String>,
    #[serde(default = "default_narg")]
    pub narg: i32,
    #[serde(default)]
    pub arg: String,
    #[serde(default)]
    pub commands: String,
}

fn default_narg() -> i32 {
    100
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomSeed {
    pub vnum: u32,
    pub name: String,
    #[serde(default)]
    pub exits: BTreeMap<Direction, u32>,
    #[serde(default)]
    pub flags: RoomAffFlags,
    #[serde(default)]
    pub triggers: Vec<TrigVnum>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MobileSeed {
    pub vnum: u32,
    pub name: String,
    pub room: u32,
    #[serde(default)]
    pub max_health: Option<i32>,
    #[serde(default)]
    pub empire: Option<u32>,
    #[serde(default)]
    pub flags: AffFlags,
    #[serde(default)]
    pub triggers: Vec<TrigVnum>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerSeed {
    pub name: String,
    pub level: u32,
    pub room: u32,
    #[serde(default)]
    pub nohassle: bool,
    #[serde(default)]
    pub empire: Option<u32>,
}

/// Where a seeded object starts. Holders are named by character name.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectPlacement {
    Room(u32),
    CarriedBy(String),
    WornBy { who: String, slot: WearSlot },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectSeed {
    pub vnum: u32,
    pub name: String,
    pub location: ObjectPlacement,
    #[serde(default)]
    pub timer: Option<u64>,
    #[serde(default)]
    pub triggers: Vec<TrigVnum>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VehicleSeed {
    pub vnum: u32,
    pub name: String,
    pub room: u32,
    #[serde(default)]
    pub triggers: Vec<TrigVnum>,
}

/// What a load produced.
#[derive(Debug, Clone, Default)]
pub struct SeedReport {
    pub triggers: usize,
    pub rooms: usize,
    pub chars: usize,
    pub objs: usize,
    pub vehicles: usize,
    pub quests: Vec<QuestRef>,
    /// Content problems that did not stop the load.
    pub problems: Vec<String>,
}

/// Read and parse a seed file.
pub fn read_seed<P: AsRef<Path>>(path: P) -> Result<WorldSeed, MudError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;
    serde_json::from_str(&contents)
        .map_err(|e| MudError::InvalidSeed(format!("Failed to parse {}: {}", path.display(), e)))
}

/// Load a seed file into `world`.
pub fn load_world_from_json<P: AsRef<Path>>(path: P, world: &mut World) -> Result<SeedReport, MudError> {
    let seed = read_seed(path)?;
    apply_seed(seed, world)
}

fn attach_all(world: &mut World, owner: EntityRef, label: &str, vnums: &[TrigVnum], report: &mut SeedReport) {
    for vnum in vnums {
        if let Err(e) = world.attach_trigger(owner, *vnum) {
            let msg = format!("{}: {}", label, e);
            warn!("seed: {}", msg);
            report.problems.push(msg);
        }
    }
}

fn room_for(world: &World, vnum: u32, label: &str) -> Result<crate::mud::types::RoomId, MudError> {
    world
        .room_by_vnum(vnum)
        .ok_or_else(|| MudError::InvalidSeed(format!("{} refers to unknown room {}", label, vnum)))
}

/// Build entities from an already parsed seed.
pub fn apply_seed(seed: WorldSeed, world: &mut World) -> Result<SeedReport, MudError> {
    let mut report = SeedReport::default();

    for t in seed.triggers {
        let bits = parse_type_flags(t.attach, &t.types)?;
        let proto = TriggerPrototype::new(t.vnum, &t.name, t.attach, bits)
            .with_narg(t.narg)
            .with_arg(&t.arg)
            .with_commands(&t.commands);
        world.registry_mut().insert(proto);
        report.triggers += 1;
    }
    report.problems.extend(world.registry().validate());

    let mut room_triggers = Vec::new();
    for r in &seed.rooms {
        let id = world.add_room(Room::new(r.vnum, &r.name).with_flags(r.flags));
        room_triggers.push((id, r.vnum, r.triggers.clone()));
        report.rooms += 1;
    }
    for r in &seed.rooms {
        let from = room_for(world, r.vnum, "room")?;
        for (dir, to) in &r.exits {
            let to = room_for(world, *to, &format!("exit {} of room {}", dir.name(), r.vnum))?;
            world.link_rooms(from, *dir, to)?;
        }
    }
    for (id, vnum, triggers) in room_triggers {
        attach_all(world, id.into(), &format!("room {}", vnum), &triggers, &mut report);
    }

    let mut by_name: HashMap<String, CharId> = HashMap::new();
    for m in seed.mobiles {
        let room = room_for(world, m.room, &format!("mobile {}", m.vnum))?;
        let mut ch = Character::npc(m.vnum, &m.name).with_flags(m.flags);
        if let Some(max) = m.max_health {
            ch = ch.with_max_health(max);
        }
        if let Some(e) = m.empire {
            ch = ch.with_empire(e);
        }
        let id = world.add_char(ch);
        world.char_to_room(id, room)?;
        attach_all(world, id.into(), &format!("mobile {}", m.vnum), &m.triggers, &mut report);
        by_name.entry(m.name.to_ascii_lowercase()).or_insert(id);
        report.chars += 1;
    }
    for p in seed.players {
        let room = room_for(world, p.room, &format!("player {}", p.name))?;
        let mut ch = Character::player(&p.name, p.level);
        ch.nohassle = p.nohassle;
        if let Some(e) = p.empire {
            ch = ch.with_empire(e);
        }
        let id = world.add_char(ch);
        world.char_to_room(id, room)?;
        by_name.entry(p.name.to_ascii_lowercase()).or_insert(id);
        report.chars += 1;
    }

    for o in seed.objects {
        let mut obj = Object::new(o.vnum, &o.name);
        if let Some(t) = o.timer {
            obj = obj.with_timer(t);
        }
        let id = world.add_obj(obj);
        let holder = |who: &str| {
            by_name
                .get(&who.to_ascii_lowercase())
                .copied()
                .ok_or_else(|| MudError::InvalidSeed(format!("object {} held by unknown '{}'", o.vnum, who)))
        };
        match &o.location {
            ObjectPlacement::Room(vnum) => {
                let room = room_for(world, *vnum, &format!("object {}", o.vnum))?;
                world.obj_to_room(id, room)?;
            }
            ObjectPlacement::CarriedBy(who) => world.obj_to_char(id, holder(who)?)?,
            ObjectPlacement::WornBy { who, slot } => world.equip_char(holder(who)?, id, *slot)?,
        }
        attach_all(world, id.into(), &format!("object {}", o.vnum), &o.triggers, &mut report);
        report.objs += 1;
    }

    for v in seed.vehicles {
        let room = room_for(world, v.room, &format!("vehicle {}", v.vnum))?;
        let id = world.add_vehicle(Vehicle::new(v.vnum, &v.name));
        world.vehicle_to_room(id, room)?;
        attach_all(world, id.into(), &format!("vehicle {}", v.vnum), &v.triggers, &mut report);
        report.vehicles += 1;
    }

    report.quests = seed.quests;
    info!(
        "seeded {} triggers, {} rooms, {} characters, {} objects, {} vehicles, {} quests",
        report.triggers,
        report.rooms,
        report.chars,
        report.objs,
        report.vehicles,
        report.quests.len()
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEED: &str = r#"{
        "triggers": [
            {"vnum": 1, "name": "greeter", "attach": "mob", "types": ["GREET"], "commands": "echo hi"},
            {"vnum": 2, "name": "broken", "attach": "room", "types": ["COMMAND"]}
        ],
        "rooms": [
            {"vnum": 10, "name": "Gate", "exits": {"north": 11}, "triggers": [2, 99]},
            {"vnum": 11, "name": "Yard"}
        ],
        "mobiles": [{"vnum": 500, "name": "porter", "room": 10, "triggers": [1]}],
        "objects": [{"vnum": 700, "name": "lantern", "location": {"carried_by": "porter"}}]
    }"#;

    #[test]
    fn builds_world_and_collects_problems() {
        let seed: WorldSeed = serde_json::from_str(SEED).unwrap();
        let mut world = World::new(Some(1));
        let report = apply_seed(seed, &mut world).unwrap();
        assert_eq!(report.rooms, 2);
        assert_eq!(report.chars, 1);
        assert_eq!(report.objs, 1);
        // command trigger without an argument plus an unknown vnum
        assert_eq!(report.problems.len(), 2);

        let gate = world.room_by_vnum(10).unwrap();
        let yard = world.room_by_vnum(11).unwrap();
        assert_eq!(world.room(gate).unwrap().exits.get(&Direction::North), Some(&yard));
        let porter = world.room(gate).unwrap().people[0];
        assert_eq!(world.char(porter).unwrap().carrying.len(), 1);
    }

    #[test]
    fn unknown_trigger_type_is_rejected() {
        let seed: WorldSeed = serde_json::from_str(
            r#"{"triggers": [{"vnum": 3, "name": "x", "attach": "obj", "types": ["GREET_ALL"]}]}"#,
        )
        .unwrap();
        let mut world = World::new(Some(1));
        assert!(matches!(apply_seed(seed, &mut world), Err(MudError::InvalidSeed(_))));
    }
}
