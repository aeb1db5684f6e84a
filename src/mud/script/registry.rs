//! Trigger prototypes and the per-kind trigger type flags.

use crate::mud::errors::MudError;
use crate::mud::types::{AttachType, TrigVnum};
use bitflags::bitflags;
use log::error;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

bitflags! {
    /// Events a mobile trigger listens for.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct MobTrig: u64 {
        const GLOBAL       = 1 << 0;
        const RANDOM       = 1 << 1;
        const COMMAND      = 1 << 2;
        const SPEECH       = 1 << 3;
        const ACT          = 1 << 4;
        const DEATH        = 1 << 5;
        const GREET        = 1 << 6;
        const GREET_ALL    = 1 << 7;
        const ENTRY        = 1 << 8;
        const RECEIVE      = 1 << 9;
        const FIGHT        = 1 << 10;
        const HITPRCNT     = 1 << 11;
        const BRIBE        = 1 << 12;
        const LOAD         = 1 << 13;
        const MEMORY       = 1 << 14;
        const ABILITY      = 1 << 15;
        const LEAVE        = 1 << 16;
        const DOOR         = 1 << 17;
        const LEAVE_ALL    = 1 << 18;
        const CHARMED      = 1 << 19;
        const START_QUEST  = 1 << 20;
        const FINISH_QUEST = 1 << 21;
        const KILL         = 1 << 22;
        const BUY          = 1 << 23;
        const REBOOT       = 1 << 24;
    }
}

bitflags! {
    /// Events an object trigger listens for.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct ObjTrig: u64 {
        const GLOBAL       = 1 << 0;
        const RANDOM       = 1 << 1;
        const COMMAND      = 1 << 2;
        const TIMER        = 1 << 5;
        const GET          = 1 << 6;
        const DROP         = 1 << 7;
        const GIVE         = 1 << 8;
        const WEAR         = 1 << 9;
        const REMOVE       = 1 << 11;
        const LOAD         = 1 << 13;
        const ABILITY      = 1 << 15;
        const LEAVE        = 1 << 16;
        const CONSUME      = 1 << 18;
        const FINISH       = 1 << 19;
        const START_QUEST  = 1 << 20;
        const FINISH_QUEST = 1 << 21;
        const KILL         = 1 << 22;
        const BUY          = 1 << 23;
        const REBOOT       = 1 << 24;
    }
}

bitflags! {
    /// Events a room ("world") trigger listens for.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct WldTrig: u64 {
        const GLOBAL            = 1 << 0;
        const RANDOM            = 1 << 1;
        const COMMAND           = 1 << 2;
        const SPEECH            = 1 << 3;
        const ADVENTURE_CLEANUP = 1 << 4;
        const RESET             = 1 << 5;
        const ENTER             = 1 << 6;
        const DROP              = 1 << 7;
        const COMPLETE          = 1 << 8;
        const DISMANTLE         = 1 << 9;
        const ABILITY           = 1 << 15;
        const LEAVE             = 1 << 16;
        const DOOR              = 1 << 17;
        const START_QUEST       = 1 << 20;
        const FINISH_QUEST      = 1 << 21;
        const BUY               = 1 << 23;
        const REBOOT            = 1 << 24;
    }
}

bitflags! {
    /// Events a vehicle trigger listens for.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct VehTrig: u64 {
        const GLOBAL       = 1 << 0;
        const RANDOM       = 1 << 1;
        const COMMAND      = 1 << 2;
        const SPEECH       = 1 << 3;
        const DESTROY      = 1 << 5;
        const GREET        = 1 << 6;
        const ENTRY        = 1 << 8;
        const COMPLETE     = 1 << 9;
        const DISMANTLE    = 1 << 10;
        const LOAD         = 1 << 13;
        const LEAVE        = 1 << 16;
        const START_QUEST  = 1 << 20;
        const FINISH_QUEST = 1 << 21;
        const KILL         = 1 << 22;
        const BUY          = 1 << 23;
        const REBOOT       = 1 << 24;
    }
}

bitflags! {
    /// Where an object command trigger may be used from (narg of OBJ COMMAND).
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct OcmdLocation: i32 {
        const EQUIP = 1 << 0;
        const INVEN = 1 << 1;
        const ROOM  = 1 << 2;
    }
}

/// Parse a list of flag names for the given attach kind into raw bits.
pub fn parse_type_flags(attach: AttachType, names: &[String]) -> Result<u64, MudError> {
    let mut bits = 0u64;
    for name in names {
        let upper = name.trim().to_ascii_uppercase();
        let found = match attach {
            AttachType::Mob => MobTrig::from_name(&upper).map(|f| f.bits()),
            AttachType::Obj => ObjTrig::from_name(&upper).map(|f| f.bits()),
            AttachType::Room => WldTrig::from_name(&upper).map(|f| f.bits()),
            AttachType::Vehicle => VehTrig::from_name(&upper).map(|f| f.bits()),
        };
        match found {
            Some(b) => bits |= b,
            None => {
                return Err(MudError::InvalidSeed(format!(
                    "unknown {} trigger type '{}'",
                    attach, name
                )))
            }
        }
    }
    Ok(bits)
}

/// Compiled trigger data shared by every instance of a vnum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerPrototype {
    pub vnum: TrigVnum,
    pub name: String,
    pub attach: AttachType,
    /// Raw type bits; interpret with the accessor matching `attach`.
    pub type_flags: u64,
    /// Percent chance, threshold, or location mask depending on trigger kind.
    pub narg: i32,
    pub arglist: String,
    pub commands: Vec<String>,
}

impl TriggerPrototype {
    pub fn new(vnum: TrigVnum, name: &str, attach: AttachType, type_flags: u64) -> Self {
        Self {
            vnum,
            name: name.to_string(),
            attach,
            type_flags,
            narg: 100,
            arglist: String::new(),
            commands: Vec::new(),
        }
    }

    pub fn mob(vnum: TrigVnum, name: &str, flags: MobTrig) -> Self {
        Self::new(vnum, name, AttachType::Mob, flags.bits())
    }

    pub fn obj(vnum: TrigVnum, name: &str, flags: ObjTrig) -> Self {
        Self::new(vnum, name, AttachType::Obj, flags.bits())
    }

    pub fn room(vnum: TrigVnum, name: &str, flags: WldTrig) -> Self {
        Self::new(vnum, name, AttachType::Room, flags.bits())
    }

    pub fn vehicle(vnum: TrigVnum, name: &str, flags: VehTrig) -> Self {
        Self::new(vnum, name, AttachType::Vehicle, flags.bits())
    }

    pub fn with_narg(mut self, narg: i32) -> Self {
        self.narg = narg;
        self
    }

    pub fn with_arg(mut self, arg: &str) -> Self {
        self.arglist = arg.to_string();
        self
    }

    pub fn with_commands(mut self, body: &str) -> Self {
        self.commands = body.lines().map(|l| l.to_string()).collect();
        self
    }

    pub fn has_bits(&self, bits: u64) -> bool {
        self.type_flags & bits != 0
    }

    /// Content problems that make the trigger unusable for some events.
    pub fn content_errors(&self) -> Vec<String> {
        let mut errs = Vec::new();
        let needs_arg = match self.attach {
            AttachType::Mob => self.has_bits((MobTrig::COMMAND | MobTrig::SPEECH | MobTrig::ACT).bits()),
            AttachType::Obj => self.has_bits(ObjTrig::COMMAND.bits()),
            AttachType::Room => self.has_bits((WldTrig::COMMAND | WldTrig::SPEECH).bits()),
            AttachType::Vehicle => self.has_bits((VehTrig::COMMAND | VehTrig::SPEECH).bits()),
        };
        if needs_arg && self.arglist.trim().is_empty() {
            errs.push(format!(
                "{} trigger #{} ({}) has no text argument",
                self.attach, self.vnum, self.name
            ));
        }
        errs
    }
}

/// All known trigger prototypes, keyed by vnum.
#[derive(Debug, Default, Clone)]
pub struct TriggerRegistry {
    protos: BTreeMap<TrigVnum, Arc<TriggerPrototype>>,
}

impl TriggerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a prototype. Live instances keep the version they
    /// were attached with.
    pub fn insert(&mut self, proto: TriggerPrototype) {
        self.protos.insert(proto.vnum, Arc::new(proto));
    }

    pub fn get(&self, vnum: TrigVnum) -> Option<Arc<TriggerPrototype>> {
        self.protos.get(&vnum).cloned()
    }

    pub fn len(&self) -> usize {
        self.protos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.protos.is_empty()
    }

    /// Log and collect every content error across the registry.
    pub fn validate(&self) -> Vec<String> {
        let mut all = Vec::new();
        for proto in self.protos.values() {
            for e in proto.content_errors() {
                error!("SYSERR: {}", e);
                all.push(e);
            }
        }
        all
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_flag_names_per_kind() {
        let bits = parse_type_flags(
            AttachType::Mob,
            &["greet".to_string(), "SPEECH".to_string()],
        )
        .unwrap();
        assert_eq!(bits, (MobTrig::GREET | MobTrig::SPEECH).bits());
        assert!(parse_type_flags(AttachType::Obj, &["GREET".to_string()]).is_err());
    }

    #[test]
    fn command_trigger_without_arg_is_flagged() {
        let mut reg = TriggerRegistry::new();
        reg.insert(TriggerPrototype::mob(10, "broken", MobTrig::COMMAND));
        reg.insert(TriggerPrototype::mob(11, "fine", MobTrig::COMMAND).with_arg("pull"));
        let errs = reg.validate();
        assert_eq!(errs.len(), 1);
        assert!(errs[0].contains("#10"));
    }
}
