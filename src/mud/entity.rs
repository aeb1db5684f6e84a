//! Entity records owned by the world arena.
//!
//! Characters, objects, rooms and vehicles all carry an optional [`Script`]
//! and refer to each other only through typed ids. Containment lists are
//! kept in the order the move operations produce (newest first).

use crate::mud::affects::{AffectedType, OverTimeEffect};
use crate::mud::cooldowns::Cooldown;
use crate::mud::script::Script;
use crate::mud::types::{
    AffFlags, Apply, CharId, Direction, EventId, InstanceId, ObjId, RoomAffFlags, RoomId, VehId,
    WearSlot,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// First level with immortal privileges.
pub const LVL_START_IMM: u32 = 31;
/// Highest immortal level.
pub const LVL_CIMPL: u32 = 34;

/// Base attribute block (strength, dexterity, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attributes {
    pub strength: i32,
    pub dexterity: i32,
    pub charisma: i32,
    pub greatness: i32,
    pub intelligence: i32,
    pub wits: i32,
}

impl Default for Attributes {
    fn default() -> Self {
        Self {
            strength: 1,
            dexterity: 1,
            charisma: 1,
            greatness: 1,
            intelligence: 1,
            wits: 1,
        }
    }
}

impl Attributes {
    pub fn get(&self, apply: Apply) -> Option<i32> {
        match apply {
            Apply::Strength => Some(self.strength),
            Apply::Dexterity => Some(self.dexterity),
            Apply::Charisma => Some(self.charisma),
            Apply::Greatness => Some(self.greatness),
            Apply::Intelligence => Some(self.intelligence),
            Apply::Wits => Some(self.wits),
            _ => None,
        }
    }

    /// Mutable slot for an attribute apply, `None` for non-attribute applies.
    pub fn slot_mut(&mut self, apply: Apply) -> Option<&mut i32> {
        match apply {
            Apply::Strength => Some(&mut self.strength),
            Apply::Dexterity => Some(&mut self.dexterity),
            Apply::Charisma => Some(&mut self.charisma),
            Apply::Greatness => Some(&mut self.greatness),
            Apply::Intelligence => Some(&mut self.intelligence),
            Apply::Wits => Some(&mut self.wits),
            _ => None,
        }
    }
}

/// Derived values that gear and affects modify on top of the base record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Derived {
    pub max_health: i32,
    pub max_move: i32,
    pub max_mana: i32,
    pub max_blood: i32,
    pub soak: i32,
    pub to_hit: i32,
    pub dodge: i32,
    pub block: i32,
    pub health_regen: i32,
    pub move_regen: i32,
    pub mana_regen: i32,
    pub bonus_physical: i32,
    pub bonus_magical: i32,
    pub bonus_healing: i32,
    pub heal_over_time: i32,
    pub bonus_inventory: i32,
    pub age_modifier: i32,
}

/// Current resource pools.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pools {
    pub health: i32,
    pub move_points: i32,
    pub mana: i32,
    pub blood: i32,
}

/// One modifier carried by a piece of gear or a passive buff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjApply {
    pub location: Apply,
    pub modifier: i32,
}

/// One remembered actor (`remember` in scripts), consumed by greet/entry memory triggers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptMemory {
    pub id: CharId,
    pub cmd: Option<String>,
}

/// A player or mobile.
#[derive(Debug, Clone)]
pub struct Character {
    pub id: CharId,
    /// Prototype vnum; 0 for players.
    pub vnum: u32,
    pub name: String,
    pub is_npc: bool,
    pub level: u32,
    pub nohassle: bool,
    pub invis_level: u32,
    pub in_room: Option<RoomId>,
    /// Carried objects, newest first.
    pub carrying: Vec<ObjId>,
    pub equipment: BTreeMap<WearSlot, ObjId>,
    pub script: Option<Script>,
    pub memory: Vec<ScriptMemory>,
    pub awake: bool,
    pub fighting: Option<CharId>,
    pub master: Option<CharId>,
    /// Owning empire, used to decide fight-ally sides.
    pub empire: Option<u32>,
    pub dead: bool,
    pub extracted: bool,
    pub real: Attributes,
    pub current: Attributes,
    pub base: Derived,
    pub derived: Derived,
    pub pools: Pools,
    /// Flags the character has regardless of affects (mobile flags, racial traits).
    pub innate_flags: AffFlags,
    pub aff_flags: AffFlags,
    /// Always-on applies from passive abilities.
    pub passive_buffs: Vec<ObjApply>,
    /// Timed affects, newest first.
    pub affected: Vec<AffectedType>,
    pub dots: Vec<OverTimeEffect>,
    pub cooldowns: Vec<Cooldown>,
}

impl Character {
    fn blank(name: &str, vnum: u32, is_npc: bool) -> Self {
        let base = Derived {
            max_health: 100,
            max_move: 100,
            max_mana: 100,
            ..Derived::default()
        };
        Self {
            id: CharId(0),
            vnum,
            name: name.to_string(),
            is_npc,
            level: if is_npc { 0 } else { 1 },
            nohassle: false,
            invis_level: 0,
            in_room: None,
            carrying: Vec::new(),
            equipment: BTreeMap::new(),
            script: None,
            memory: Vec::new(),
            awake: true,
            fighting: None,
            master: None,
            empire: None,
            dead: false,
            extracted: false,
            real: Attributes::default(),
            current: Attributes::default(),
            base,
            derived: base,
            pools: Pools {
                health: base.max_health,
                move_points: base.max_move,
                mana: base.max_mana,
                blood: 0,
            },
            innate_flags: AffFlags::empty(),
            aff_flags: AffFlags::empty(),
            passive_buffs: Vec::new(),
            affected: Vec::new(),
            dots: Vec::new(),
            cooldowns: Vec::new(),
        }
    }

    pub fn npc(vnum: u32, name: &str) -> Self {
        Self::blank(name, vnum, true)
    }

    pub fn player(name: &str, level: u32) -> Self {
        let mut ch = Self::blank(name, 0, false);
        ch.level = level;
        ch
    }

    pub fn with_flags(mut self, flags: AffFlags) -> Self {
        self.innate_flags |= flags;
        self.aff_flags |= flags;
        self
    }

    pub fn with_empire(mut self, empire: u32) -> Self {
        self.empire = Some(empire);
        self
    }

    pub fn with_max_health(mut self, max: i32) -> Self {
        self.base.max_health = max;
        self.derived.max_health = max;
        self.pools.health = max;
        self
    }

    pub fn is_affected(&self, flag: AffFlags) -> bool {
        self.aff_flags.contains(flag)
    }

    /// Player-level immortal check, mobs never qualify.
    pub fn is_immortal(&self) -> bool {
        !self.is_npc && self.level >= LVL_START_IMM
    }

    /// Whether `nohassle` is in effect for this character.
    pub fn has_nohassle(&self) -> bool {
        !self.is_npc && self.nohassle
    }
}

/// Where an object currently lives. An object has exactly one parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObjLocation {
    Nowhere,
    Room(RoomId),
    CarriedBy(CharId),
    WornBy(CharId, WearSlot),
    InObj(ObjId),
    InVehicle(VehId),
}

#[derive(Debug, Clone)]
pub struct Object {
    pub id: ObjId,
    pub vnum: u32,
    pub name: String,
    pub location: ObjLocation,
    /// Objects inside this container, newest first.
    pub contains: Vec<ObjId>,
    pub script: Option<Script>,
    pub applies: Vec<ObjApply>,
    pub aff_flags: AffFlags,
    /// Pulses until the object's timer expires.
    pub timer: Option<u64>,
    pub timer_event: Option<EventId>,
    pub extracted: bool,
}

impl Object {
    pub fn new(vnum: u32, name: &str) -> Self {
        Self {
            id: ObjId(0),
            vnum,
            name: name.to_string(),
            location: ObjLocation::Nowhere,
            contains: Vec::new(),
            script: None,
            applies: Vec::new(),
            aff_flags: AffFlags::empty(),
            timer: None,
            timer_event: None,
            extracted: false,
        }
    }

    pub fn with_apply(mut self, location: Apply, modifier: i32) -> Self {
        self.applies.push(ObjApply { location, modifier });
        self
    }

    pub fn with_timer(mut self, pulses: u64) -> Self {
        self.timer = Some(pulses);
        self
    }

    /// Character carrying this object in inventory, if any.
    pub fn carried_by(&self) -> Option<CharId> {
        match self.location {
            ObjLocation::CarriedBy(ch) => Some(ch),
            _ => None,
        }
    }

    pub fn worn_by(&self) -> Option<CharId> {
        match self.location {
            ObjLocation::WornBy(ch, _) => Some(ch),
            _ => None,
        }
    }

    pub fn in_room(&self) -> Option<RoomId> {
        match self.location {
            ObjLocation::Room(room) => Some(room),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Room {
    pub id: RoomId,
    pub vnum: u32,
    pub name: String,
    /// Characters present, newest arrival first.
    pub people: Vec<CharId>,
    pub contents: Vec<ObjId>,
    pub vehicles: Vec<VehId>,
    pub exits: BTreeMap<Direction, RoomId>,
    pub script: Option<Script>,
    pub affects: Vec<AffectedType>,
    pub base_flags: RoomAffFlags,
    pub aff_flags: RoomAffFlags,
    /// Count of light sources; invalidated when MAGIC_LIGHT flips.
    pub light: i32,
    pub map_refresh_pending: bool,
    pub reset_event: Option<EventId>,
    pub instance: Option<InstanceId>,
}

impl Room {
    pub fn new(vnum: u32, name: &str) -> Self {
        Self {
            id: RoomId(0),
            vnum,
            name: name.to_string(),
            people: Vec::new(),
            contents: Vec::new(),
            vehicles: Vec::new(),
            exits: BTreeMap::new(),
            script: None,
            affects: Vec::new(),
            base_flags: RoomAffFlags::empty(),
            aff_flags: RoomAffFlags::empty(),
            light: 0,
            map_refresh_pending: false,
            reset_event: None,
            instance: None,
        }
    }

    pub fn with_flags(mut self, flags: RoomAffFlags) -> Self {
        self.base_flags |= flags;
        self.aff_flags |= flags;
        self
    }
}

#[derive(Debug, Clone)]
pub struct Vehicle {
    pub id: VehId,
    pub vnum: u32,
    pub name: String,
    pub in_room: Option<RoomId>,
    pub contains: Vec<ObjId>,
    pub script: Option<Script>,
    pub extracted: bool,
}

impl Vehicle {
    pub fn new(vnum: u32, name: &str) -> Self {
        Self {
            id: VehId(0),
            vnum,
            name: name.to_string(),
            in_room: None,
            contains: Vec::new(),
            script: None,
            extracted: false,
        }
    }
}
