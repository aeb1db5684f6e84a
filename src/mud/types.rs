use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Vnum of a trigger prototype.
pub type TrigVnum = u32;

/// Sentinel currency meaning "plain coins" (no empire currency).
pub const NOTHING: i32 = -1;

/// Game time is counted in pulses.
pub type Pulse = u64;

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

entity_id!(
    /// Stable id of a character (player or mobile).
    CharId
);
entity_id!(
    /// Stable id of an object.
    ObjId
);
entity_id!(
    /// Stable id of a room.
    RoomId
);
entity_id!(
    /// Stable id of a vehicle.
    VehId
);
entity_id!(
    /// Id of one attached trigger instance.
    TrigId
);
entity_id!(
    /// Handle of a scheduled event.
    EventId
);
entity_id!(
    /// Id of one affect entry, unique per world.
    AffectId
);
entity_id!(
    /// Id of one over-time effect entry.
    DotId
);
entity_id!(
    /// Id of a running adventure instance.
    InstanceId
);

/// Which entity owns a script execution context.
///
/// Every id shares the world's uid space, so a bare number resolves to at
/// most one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityRef {
    Char(CharId),
    Obj(ObjId),
    Room(RoomId),
    Veh(VehId),
}

impl EntityRef {
    /// Raw uid, shared across all entity kinds.
    pub fn uid(&self) -> u64 {
        match self {
            EntityRef::Char(id) => id.0,
            EntityRef::Obj(id) => id.0,
            EntityRef::Room(id) => id.0,
            EntityRef::Veh(id) => id.0,
        }
    }

    pub fn kind(&self) -> AttachType {
        match self {
            EntityRef::Char(_) => AttachType::Mob,
            EntityRef::Obj(_) => AttachType::Obj,
            EntityRef::Room(_) => AttachType::Room,
            EntityRef::Veh(_) => AttachType::Vehicle,
        }
    }
}

impl From<CharId> for EntityRef {
    fn from(id: CharId) -> Self {
        EntityRef::Char(id)
    }
}

impl From<ObjId> for EntityRef {
    fn from(id: ObjId) -> Self {
        EntityRef::Obj(id)
    }
}

impl From<RoomId> for EntityRef {
    fn from(id: RoomId) -> Self {
        EntityRef::Room(id)
    }
}

impl From<VehId> for EntityRef {
    fn from(id: VehId) -> Self {
        EntityRef::Veh(id)
    }
}

/// Entity kind a trigger prototype is written for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttachType {
    Mob,
    Obj,
    Room,
    Vehicle,
}

impl fmt::Display for AttachType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AttachType::Mob => "mob",
            AttachType::Obj => "obj",
            AttachType::Room => "room",
            AttachType::Vehicle => "vehicle",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    North,
    East,
    South,
    West,
    Northeast,
    Northwest,
    Southeast,
    Southwest,
    Up,
    Down,
}

impl Direction {
    pub const ALL: [Direction; 10] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
        Direction::Northeast,
        Direction::Northwest,
        Direction::Southeast,
        Direction::Southwest,
        Direction::Up,
        Direction::Down,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Direction::North => "north",
            Direction::East => "east",
            Direction::South => "south",
            Direction::West => "west",
            Direction::Northeast => "northeast",
            Direction::Northwest => "northwest",
            Direction::Southeast => "southeast",
            Direction::Southwest => "southwest",
            Direction::Up => "up",
            Direction::Down => "down",
        }
    }

    pub fn reverse(&self) -> Direction {
        match self {
            Direction::North => Direction::South,
            Direction::East => Direction::West,
            Direction::South => Direction::North,
            Direction::West => Direction::East,
            Direction::Northeast => Direction::Southwest,
            Direction::Northwest => Direction::Southeast,
            Direction::Southeast => Direction::Northwest,
            Direction::Southwest => Direction::Northeast,
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
        }
    }

    pub fn parse(s: &str) -> Option<Direction> {
        let lower = s.trim().to_ascii_lowercase();
        Direction::ALL.iter().copied().find(|d| d.name() == lower)
    }
}

/// Name bound to `direction`, or "none" when the move has no compass direction.
pub fn direction_name(dir: Option<Direction>) -> &'static str {
    dir.map(|d| d.name()).unwrap_or("none")
}

/// Door verbs, bound to `cmd` by door triggers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DoorCommand {
    Open,
    Close,
    Unlock,
    Lock,
    Pick,
}

impl DoorCommand {
    pub fn verb(&self) -> &'static str {
        match self {
            DoorCommand::Open => "open",
            DoorCommand::Close => "close",
            DoorCommand::Unlock => "unlock",
            DoorCommand::Lock => "lock",
            DoorCommand::Pick => "pick",
        }
    }
}

/// How something was consumed, bound to `command` by consume triggers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsumeCommand {
    Eat,
    Drink,
    Quaff,
}

impl ConsumeCommand {
    pub fn verb(&self) -> &'static str {
        match self {
            ConsumeCommand::Eat => "eat",
            ConsumeCommand::Drink => "drink",
            ConsumeCommand::Quaff => "quaff",
        }
    }
}

/// Equipment slots, in the fixed order used whenever equipment is scanned.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum WearSlot {
    Head,
    Ears,
    Neck,
    Clothes,
    Armor,
    About,
    Arms,
    Wrists,
    Hands,
    Finger,
    Waist,
    Legs,
    Feet,
    Pack,
    Saddle,
    Wield,
    Ranged,
    Hold,
    Sheath,
}

impl WearSlot {
    /// Slots whose object applies count toward derived stats.
    pub fn counts_stats(&self) -> bool {
        !matches!(self, WearSlot::Saddle | WearSlot::Sheath)
    }
}

/// Derived attribute an affect modifies (APPLY_x).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum Apply {
    #[default]
    None,
    Strength,
    Dexterity,
    Charisma,
    Greatness,
    Intelligence,
    Wits,
    Age,
    Move,
    Health,
    Mana,
    Blood,
    Soak,
    ToHit,
    Dodge,
    Block,
    HealthRegen,
    MoveRegen,
    ManaRegen,
    BonusPhysical,
    BonusMagical,
    BonusHealing,
    HealOverTime,
    Inventory,
}

bitflags! {
    /// Boolean character flags granted by affects (AFF_x).
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct AffFlags: u64 {
        const BLIND        = 1 << 0;
        const MAJESTY      = 1 << 1;
        const INFRAVISION  = 1 << 2;
        const SNEAK        = 1 << 3;
        const HIDE         = 1 << 4;
        const CHARM        = 1 << 5;
        const INVISIBLE    = 1 << 6;
        const IMMUNE_PHYSICAL = 1 << 7;
        const MUMMIFY      = 1 << 8;
        const STUNNED      = 1 << 9;
        const STUN_IMMUNITY = 1 << 10;
        const NO_TARGET_IN_ROOM = 1 << 11;
        const FLY          = 1 << 12;
        const SENSE_HIDE   = 1 << 13;
        const DISTRACTED   = 1 << 14;
        const ENTANGLED    = 1 << 15;
        const DEATHSHROUD  = 1 << 16;
        const EARTHMELD    = 1 << 17;
    }
}

bitflags! {
    /// Room flags that affects can add (ROOM_AFF_x).
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct RoomAffFlags: u64 {
        const DARK        = 1 << 0;
        const SILENT      = 1 << 1;
        const HAS_INSTANCE = 1 << 2;
        const CHAMELEON   = 1 << 3;
        const NO_FLY      = 1 << 4;
        const MAGIC_LIGHT = 1 << 5;
        const NO_EVOLVE   = 1 << 6;
        const UNCLAIMABLE = 1 << 7;
        const PUBLIC      = 1 << 8;
        const DISMANTLING = 1 << 9;
        const NO_TELEPORT = 1 << 10;
    }
}

impl RoomAffFlags {
    /// Flags that change what the map shows when they flip.
    pub fn map_visible() -> RoomAffFlags {
        RoomAffFlags::CHAMELEON | RoomAffFlags::DISMANTLING | RoomAffFlags::HAS_INSTANCE
    }
}

/// Ability reference passed to ability triggers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbilityRef {
    pub vnum: u32,
    pub name: String,
}

/// Quest reference passed to quest triggers.
///
/// `script` lists trigger vnums that are temporarily attached to the room
/// for the duration of a start/finish check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestRef {
    pub vnum: u32,
    pub name: String,
    #[serde(default)]
    pub script: Vec<TrigVnum>,
}
