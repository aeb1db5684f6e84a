//! The contract between dispatchers and whatever executes trigger bodies.

use crate::mud::types::{EntityRef, InstanceId, TrigId};
use crate::mud::world::World;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Start the command list from the top.
    New,
    /// Continue a parked run from where it stopped.
    Restart,
}

/// Per-call context handed to the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunContext {
    pub mode: RunMode,
    /// Adventure instance in scope for quest scripts.
    pub instance: Option<InstanceId>,
}

impl RunContext {
    pub fn new() -> Self {
        Self {
            mode: RunMode::New,
            instance: None,
        }
    }

    pub fn restart() -> Self {
        Self {
            mode: RunMode::Restart,
            instance: None,
        }
    }

    pub fn with_instance(instance: Option<InstanceId>) -> Self {
        Self {
            mode: RunMode::New,
            instance,
        }
    }
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Executes one trigger body.
///
/// The returned value is nonzero to allow/continue and zero to block. The
/// driver may change anything in `world`, including extracting `owner`, and
/// may dispatch further events. Callers re-check liveness afterwards.
pub trait ScriptDriver {
    fn run(&mut self, world: &mut World, owner: EntityRef, trig: TrigId, ctx: &RunContext) -> i32;
}

impl<F> ScriptDriver for F
where
    F: FnMut(&mut World, EntityRef, TrigId, &RunContext) -> i32,
{
    fn run(&mut self, world: &mut World, owner: EntityRef, trig: TrigId, ctx: &RunContext) -> i32 {
        self(world, owner, trig, ctx)
    }
}
