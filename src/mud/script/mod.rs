//! Scripts attached to entities.
//!
//! A [`Script`] is the ordered set of trigger instances on one entity plus
//! that entity's global variables. Each [`TriggerInstance`] has its own
//! local variables, recursion depth and wait state.

pub mod driver;
pub mod line_driver;
pub mod matching;
pub mod registry;

pub use driver::{RunContext, RunMode, ScriptDriver};
pub use registry::{MobTrig, ObjTrig, OcmdLocation, TriggerPrototype, TriggerRegistry, VehTrig, WldTrig};

use crate::mud::types::{EntityRef, EventId, TrigId, TrigVnum};
use std::sync::Arc;

/// Nested script runs deeper than this are refused.
pub const MAX_SCRIPT_DEPTH: u32 = 10;

/// Marker that starts a uid reference token inside a variable value.
pub const UID_CHAR: char = '}';

/// Encode an entity reference as a variable value.
pub fn uid_token(target: EntityRef) -> String {
    format!("{}{}", UID_CHAR, target.uid())
}

/// Decode a uid token. Anything that is not exactly a token yields `None`.
pub fn parse_uid_token(value: &str) -> Option<u64> {
    value.strip_prefix(UID_CHAR)?.parse().ok()
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Var {
    name: String,
    context: i64,
    value: String,
}

/// Name to string bindings, disambiguated by an integer context (0 = global).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VarEnv {
    vars: Vec<Var>,
}

impl VarEnv {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set or overwrite `name` in `context`.
    pub fn add_var(&mut self, name: &str, value: &str, context: i64) {
        match self
            .vars
            .iter_mut()
            .find(|v| v.context == context && v.name.eq_ignore_ascii_case(name))
        {
            Some(var) => var.value = value.to_string(),
            None => self.vars.push(Var {
                name: name.to_string(),
                context,
                value: value.to_string(),
            }),
        }
    }

    /// Bind `name` to a reference to `target`.
    pub fn add_uid_var(&mut self, name: &str, target: EntityRef, context: i64) {
        self.add_var(name, &uid_token(target), context);
    }

    /// Look up `name`, preferring an exact context match over the global one.
    pub fn get(&self, name: &str, context: i64) -> Option<&str> {
        let mut global = None;
        for var in self.vars.iter().filter(|v| v.name.eq_ignore_ascii_case(name)) {
            if var.context == context {
                return Some(&var.value);
            }
            if var.context == 0 {
                global = Some(var.value.as_str());
            }
        }
        global
    }

    pub fn remove(&mut self, name: &str, context: i64) -> bool {
        let before = self.vars.len();
        self.vars
            .retain(|v| !(v.context == context && v.name.eq_ignore_ascii_case(name)));
        before != self.vars.len()
    }

    pub fn clear(&mut self) {
        self.vars.clear();
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

/// One live attachment of a prototype to an entity.
#[derive(Debug, Clone)]
pub struct TriggerInstance {
    pub id: TrigId,
    pub proto: Arc<TriggerPrototype>,
    /// Nonzero while the trigger is running or parked.
    pub depth: u32,
    pub vars: VarEnv,
    pub wait_event: Option<EventId>,
    /// Command line to continue from on restart.
    pub resume_at: usize,
}

impl TriggerInstance {
    pub fn new(id: TrigId, proto: Arc<TriggerPrototype>) -> Self {
        Self {
            id,
            proto,
            depth: 0,
            vars: VarEnv::new(),
            wait_event: None,
            resume_at: 0,
        }
    }

    pub fn vnum(&self) -> TrigVnum {
        self.proto.vnum
    }

    pub fn narg(&self) -> i32 {
        self.proto.narg
    }

    pub fn arg(&self) -> &str {
        &self.proto.arglist
    }

    pub fn is_waiting(&self) -> bool {
        self.wait_event.is_some()
    }

    /// Type check that also requires the trigger not to be running.
    pub fn check(&self, bits: u64) -> bool {
        self.proto.has_bits(bits) && self.depth == 0
    }
}

/// Triggers and globals owned by one entity.
#[derive(Debug, Clone, Default)]
pub struct Script {
    /// Evaluated in attachment order.
    pub triggers: Vec<TriggerInstance>,
    pub globals: VarEnv,
    pub context: i64,
}

impl Script {
    /// Union of the type bits of all attached triggers.
    pub fn types(&self) -> u64 {
        self.triggers
            .iter()
            .fold(0, |acc, t| acc | t.proto.type_flags)
    }

    pub fn has_types(&self, bits: u64) -> bool {
        self.types() & bits != 0
    }

    pub fn trigger_ids(&self) -> Vec<TrigId> {
        self.triggers.iter().map(|t| t.id).collect()
    }

    pub fn find(&self, id: TrigId) -> Option<&TriggerInstance> {
        self.triggers.iter().find(|t| t.id == id)
    }

    pub fn find_mut(&mut self, id: TrigId) -> Option<&mut TriggerInstance> {
        self.triggers.iter_mut().find(|t| t.id == id)
    }

    pub fn find_vnum(&self, vnum: TrigVnum) -> Option<&TriggerInstance> {
        self.triggers.iter().find(|t| t.vnum() == vnum)
    }

    pub fn attach(&mut self, trig: TriggerInstance) {
        self.triggers.push(trig);
    }

    pub fn detach(&mut self, id: TrigId) -> Option<TriggerInstance> {
        let pos = self.triggers.iter().position(|t| t.id == id)?;
        Some(self.triggers.remove(pos))
    }

    pub fn is_empty(&self) -> bool {
        self.triggers.is_empty()
    }
}
