//! Test utilities & fixtures shared by the integration tests.

use dgmud::mud::entity::{Character, Room};
use dgmud::mud::script::{RunContext, ScriptDriver};
use dgmud::mud::types::{CharId, EntityRef, InstanceId, RoomId, TrigId};
use dgmud::mud::World;
use std::collections::HashMap;

/// One driver invocation as seen by [`Recorder`].
#[derive(Debug, Clone)]
#[allow(dead_code)]
pub struct Call {
    pub owner: EntityRef,
    pub vnum: u32,
    pub instance: Option<InstanceId>,
    vars: HashMap<String, String>,
}

#[allow(dead_code)]
impl Call {
    pub fn var(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }
}

/// Script driver that records every run and answers with a per-vnum result
/// (1 unless told otherwise).
#[derive(Debug, Default)]
pub struct Recorder {
    pub calls: Vec<Call>,
    results: HashMap<u32, i32>,
    watched: Vec<&'static str>,
}

#[allow(dead_code)]
impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Capture these variables on every run.
    pub fn watching(mut self, names: &[&'static str]) -> Self {
        self.watched.extend_from_slice(names);
        self
    }

    pub fn answer(mut self, vnum: u32, result: i32) -> Self {
        self.results.insert(vnum, result);
        self
    }

    pub fn vnums(&self) -> Vec<u32> {
        self.calls.iter().map(|c| c.vnum).collect()
    }

    pub fn owners(&self) -> Vec<EntityRef> {
        self.calls.iter().map(|c| c.owner).collect()
    }
}

impl ScriptDriver for Recorder {
    fn run(&mut self, world: &mut World, owner: EntityRef, trig: TrigId, ctx: &RunContext) -> i32 {
        let t = match world.trigger(owner, trig) {
            Some(t) => t,
            None => return 0,
        };
        let vnum = t.vnum();
        let vars = self
            .watched
            .iter()
            .filter_map(|name| t.vars.get(name, 0).map(|v| (name.to_string(), v.to_string())))
            .collect();
        self.calls.push(Call {
            owner,
            vnum,
            instance: ctx.instance,
            vars,
        });
        self.results.get(&vnum).copied().unwrap_or(1)
    }
}

/// A world with one lit room and a mortal player standing in it.
#[allow(dead_code)]
pub fn room_with_player(seed: u64) -> (World, RoomId, CharId) {
    let mut world = World::new(Some(seed));
    let room = world.add_room(Room::new(3001, "Temple Square"));
    let player = world.add_char(Character::player("Aria", 12));
    world.char_to_room(player, room).unwrap();
    (world, room, player)
}
