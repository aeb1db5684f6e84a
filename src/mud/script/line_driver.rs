//! Built-in line-oriented script driver.
//!
//! Each line of a trigger body is one statement:
//!
//! - `* text` comment
//! - `set <name> <value>` local variable on the trigger
//! - `global <name>` copy a local into the owner's script globals
//! - `send <target> <text>` text to one character
//! - `echo <text>` text to the owner's room
//! - `if <a> == <b>`, `if <a> != <b>`, `if <value>`, `else`, `end`
//! - `return <n>` set the result and keep going
//! - `halt` stop with the current result
//! - `wait <pulses>` park the run and resume on the next line later
//! - `purge [target]` extract the target, or the owner itself
//! - `damage <target> <amount>` hurt a character
//! - `detach <vnum>` remove a trigger from the owner
//! - `remember <target> [command]`, `forget <target>` mob memory
//!
//! `%name%` expands to a trigger variable, then a script global. `%self%`
//! is the owner, `%instance%` the quest instance in scope, `%random.N%` a
//! roll from 1 to N and `%%` a literal percent sign.

use super::driver::{RunContext, ScriptDriver};
use super::uid_token;
use crate::mud::collab::Audience;
use crate::mud::entity::ScriptMemory;
use crate::mud::scheduler::EventPayload;
use crate::mud::types::{EntityRef, TrigId, TrigVnum};
use crate::mud::world::World;
use log::{debug, error, warn};

/// Upper bound on statements executed in one call.
pub const MAX_LINES_PER_RUN: usize = 500;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    Comment,
    Set { name: String, value: String },
    Global { name: String },
    Send { target: String, text: String },
    Echo { text: String },
    If(Condition),
    Else,
    End,
    Return(String),
    Halt,
    Wait(String),
    Purge(Option<String>),
    Damage { target: String, amount: String },
    Detach(String),
    Remember { target: String, command: Option<String> },
    Forget { target: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    Equal(String, String),
    NotEqual(String, String),
    Truthy(String),
}

fn split_word(line: &str) -> (&str, &str) {
    let line = line.trim();
    match line.find(char::is_whitespace) {
        Some(pos) => (&line[..pos], line[pos..].trim_start()),
        None => (line, ""),
    }
}

fn required<'a>(rest: &'a str, what: &str) -> Result<&'a str, String> {
    if rest.is_empty() {
        Err(format!("{} needs an argument", what))
    } else {
        Ok(rest)
    }
}

/// Parse one (unexpanded) line.
pub fn parse_line(line: &str) -> Result<Statement, String> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('*') {
        return Ok(Statement::Comment);
    }
    let (word, rest) = split_word(trimmed);
    match word.to_ascii_lowercase().as_str() {
        "set" => {
            let (name, value) = split_word(required(rest, "set")?);
            Ok(Statement::Set {
                name: name.to_string(),
                value: value.to_string(),
            })
        }
        "global" => Ok(Statement::Global {
            name: required(rest, "global")?.to_string(),
        }),
        "send" => {
            let (target, text) = split_word(required(rest, "send")?);
            Ok(Statement::Send {
                target: target.to_string(),
                text: text.to_string(),
            })
        }
        "echo" => Ok(Statement::Echo { text: rest.to_string() }),
        "if" => {
            let cond = required(rest, "if")?;
            let parsed = if let Some((a, b)) = cond.split_once("==") {
                Condition::Equal(a.trim().to_string(), b.trim().to_string())
            } else if let Some((a, b)) = cond.split_once("!=") {
                Condition::NotEqual(a.trim().to_string(), b.trim().to_string())
            } else {
                Condition::Truthy(cond.to_string())
            };
            Ok(Statement::If(parsed))
        }
        "else" => Ok(Statement::Else),
        "end" => Ok(Statement::End),
        "return" => Ok(Statement::Return(required(rest, "return")?.to_string())),
        "halt" => Ok(Statement::Halt),
        "wait" => Ok(Statement::Wait(required(rest, "wait")?.to_string())),
        "purge" => Ok(Statement::Purge(if rest.is_empty() {
            None
        } else {
            Some(rest.to_string())
        })),
        "damage" => {
            let (target, amount) = split_word(required(rest, "damage")?);
            Ok(Statement::Damage {
                target: target.to_string(),
                amount: required(amount, "damage")?.to_string(),
            })
        }
        "detach" => Ok(Statement::Detach(required(rest, "detach")?.to_string())),
        "remember" => {
            let (target, command) = split_word(required(rest, "remember")?);
            Ok(Statement::Remember {
                target: target.to_string(),
                command: if command.is_empty() {
                    None
                } else {
                    Some(command.to_string())
                },
            })
        }
        "forget" => Ok(Statement::Forget {
            target: required(rest, "forget")?.to_string(),
        }),
        other => Err(format!("Unknown command '{}'", other)),
    }
}

/// Reference driver that executes trigger bodies line by line.
#[derive(Debug, Default)]
pub struct LineDriver {
    /// Statements executed across all runs, for diagnostics.
    pub executed: u64,
}

impl LineDriver {
    pub fn new() -> Self {
        Self::default()
    }

    fn expand(&self, world: &mut World, owner: EntityRef, trig: TrigId, ctx: &RunContext, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut rest = text;
        while let Some(start) = rest.find('%') {
            out.push_str(&rest[..start]);
            let after = &rest[start + 1..];
            match after.find('%') {
                Some(0) => {
                    out.push('%');
                    rest = &after[1..];
                }
                Some(end) => {
                    let name = &after[..end];
                    out.push_str(&self.lookup(world, owner, trig, ctx, name));
                    rest = &after[end + 1..];
                }
                None => {
                    out.push_str(&rest[start..]);
                    rest = "";
                }
            }
        }
        out.push_str(rest);
        out
    }

    fn lookup(&self, world: &mut World, owner: EntityRef, trig: TrigId, ctx: &RunContext, name: &str) -> String {
        if name.eq_ignore_ascii_case("self") {
            return uid_token(owner);
        }
        if name.eq_ignore_ascii_case("instance") {
            return ctx.instance.map(|i| i.to_string()).unwrap_or_default();
        }
        if let Some(max) = name.strip_prefix("random.") {
            let max = max.parse::<i32>().unwrap_or(0);
            return if max > 0 {
                world.number(1, max).to_string()
            } else {
                "0".to_string()
            };
        }
        let local = world
            .trigger(owner, trig)
            .and_then(|t| t.vars.get(name, 0))
            .map(str::to_string);
        if let Some(v) = local {
            return v;
        }
        world
            .script(owner)
            .and_then(|s| s.globals.get(name, s.context))
            .map(str::to_string)
            .unwrap_or_default()
    }

    fn condition_holds(&self, world: &mut World, owner: EntityRef, trig: TrigId, ctx: &RunContext, cond: &Condition) -> bool {
        match cond {
            Condition::Equal(a, b) => {
                self.expand(world, owner, trig, ctx, a) == self.expand(world, owner, trig, ctx, b)
            }
            Condition::NotEqual(a, b) => {
                self.expand(world, owner, trig, ctx, a) != self.expand(world, owner, trig, ctx, b)
            }
            Condition::Truthy(v) => {
                let v = self.expand(world, owner, trig, ctx, v);
                !v.is_empty() && v != "0"
            }
        }
    }
}

/// Index after the `else`/`end` closing the block that starts before `from`.
/// With `stop_at_else` an `else` at the same level also ends the skip.
fn skip_block(lines: &[String], from: usize, stop_at_else: bool) -> usize {
    let mut depth = 0usize;
    let mut i = from;
    while i < lines.len() {
        match parse_line(&lines[i]) {
            Ok(Statement::If(_)) => depth += 1,
            Ok(Statement::Else) if depth == 0 && stop_at_else => return i + 1,
            Ok(Statement::End) => {
                if depth == 0 {
                    return i + 1;
                }
                depth -= 1;
            }
            _ => {}
        }
        i += 1;
    }
    lines.len()
}

fn owner_room(world: &World, owner: EntityRef) -> Option<crate::mud::types::RoomId> {
    world.entity_room(owner)
}

impl ScriptDriver for LineDriver {
    fn run(&mut self, world: &mut World, owner: EntityRef, trig: TrigId, ctx: &RunContext) -> i32 {
        let (proto, mut pc) = match world.trigger(owner, trig) {
            Some(t) => (t.proto.clone(), t.resume_at),
            None => return 0,
        };
        let lines = &proto.commands;
        let mut ret = 1;
        let mut steps = 0usize;

        while pc < lines.len() {
            steps += 1;
            if steps > MAX_LINES_PER_RUN {
                error!(
                    "SYSERR: trigger #{} ({}) ran past {} lines, stopping",
                    proto.vnum, proto.name, MAX_LINES_PER_RUN
                );
                return 0;
            }
            self.executed += 1;
            if !world.entity_valid(owner) {
                return 0;
            }

            let stmt = match parse_line(&lines[pc]) {
                Ok(s) => s,
                Err(e) => {
                    warn!("trigger #{} line {}: {}", proto.vnum, pc + 1, e);
                    pc += 1;
                    continue;
                }
            };
            pc += 1;

            match stmt {
                Statement::Comment | Statement::End => {}
                Statement::Set { name, value } => {
                    let value = self.expand(world, owner, trig, ctx, &value);
                    if let Some(t) = world.trigger_mut(owner, trig) {
                        t.vars.add_var(&name, &value, 0);
                    }
                }
                Statement::Global { name } => {
                    let value = world
                        .trigger(owner, trig)
                        .and_then(|t| t.vars.get(&name, 0))
                        .map(str::to_string);
                    match (value, world.script_mut(owner)) {
                        (Some(v), Some(script)) => {
                            let context = script.context;
                            script.globals.add_var(&name, &v, context);
                        }
                        _ => debug!("global {}: no such local on trigger #{}", name, proto.vnum),
                    }
                }
                Statement::Send { target, text } => {
                    let target = self.expand(world, owner, trig, ctx, &target);
                    let text = self.expand(world, owner, trig, ctx, &text);
                    if let Some(EntityRef::Char(ch)) = world.resolve_token(&target) {
                        world.send(Audience::ToChar(ch), &text);
                    }
                }
                Statement::Echo { text } => {
                    let text = self.expand(world, owner, trig, ctx, &text);
                    if let Some(room) = owner_room(world, owner) {
                        world.send(Audience::ToRoom(room), &text);
                    }
                }
                Statement::If(cond) => {
                    if !self.condition_holds(world, owner, trig, ctx, &cond) {
                        pc = skip_block(lines, pc, true);
                    }
                }
                Statement::Else => {
                    // reached the end of a taken branch
                    pc = skip_block(lines, pc, false);
                }
                Statement::Return(value) => {
                    ret = self.expand(world, owner, trig, ctx, &value).trim().parse().unwrap_or(0);
                }
                Statement::Halt => return ret,
                Statement::Wait(pulses) => {
                    let pulses = self
                        .expand(world, owner, trig, ctx, &pulses)
                        .trim()
                        .parse::<u64>()
                        .unwrap_or(1)
                        .max(1);
                    let now = world.pulse();
                    let ev = world
                        .events
                        .schedule(now, pulses, EventPayload::TriggerWait { owner, trig });
                    if let Some(t) = world.trigger_mut(owner, trig) {
                        t.wait_event = Some(ev);
                        t.resume_at = pc;
                    }
                    return ret;
                }
                Statement::Purge(target) => {
                    let victim = match target {
                        Some(t) => {
                            let t = self.expand(world, owner, trig, ctx, &t);
                            world.resolve_token(&t)
                        }
                        None => Some(owner),
                    };
                    match victim {
                        Some(EntityRef::Char(ch)) => world.extract_char(ch),
                        Some(EntityRef::Obj(obj)) => world.extract_obj(obj),
                        Some(EntityRef::Veh(veh)) => world.extract_vehicle(veh),
                        Some(EntityRef::Room(_)) | None => {
                            debug!("purge on trigger #{}: nothing to purge", proto.vnum)
                        }
                    }
                    if victim == Some(owner) {
                        return ret;
                    }
                }
                Statement::Damage { target, amount } => {
                    let target = self.expand(world, owner, trig, ctx, &target);
                    let amount: i32 = self
                        .expand(world, owner, trig, ctx, &amount)
                        .trim()
                        .parse()
                        .unwrap_or(0);
                    if let Some(EntityRef::Char(ch)) = world.resolve_token(&target) {
                        let dead = match world.char_mut(ch) {
                            Some(c) => {
                                c.pools.health = c.pools.health.saturating_sub(amount);
                                c.pools.health <= 0
                            }
                            None => false,
                        };
                        if dead {
                            world.extract_char(ch);
                        }
                    }
                }
                Statement::Detach(vnum) => {
                    let vnum = self.expand(world, owner, trig, ctx, &vnum);
                    match vnum.trim().parse::<TrigVnum>() {
                        Ok(v) => {
                            world.detach_trigger_vnum(owner, v);
                            if world.trigger(owner, trig).is_none() {
                                return ret;
                            }
                        }
                        Err(_) => warn!("trigger #{}: bad detach vnum '{}'", proto.vnum, vnum),
                    }
                }
                Statement::Remember { target, command } => {
                    let target = self.expand(world, owner, trig, ctx, &target);
                    let command = command.map(|c| self.expand(world, owner, trig, ctx, &c));
                    if let (EntityRef::Char(me), Some(EntityRef::Char(them))) = (owner, world.resolve_token(&target)) {
                        if let Some(c) = world.char_mut(me) {
                            c.memory.insert(0, ScriptMemory { id: them, cmd: command });
                        }
                    }
                }
                Statement::Forget { target } => {
                    let target = self.expand(world, owner, trig, ctx, &target);
                    if let (EntityRef::Char(me), Some(EntityRef::Char(them))) = (owner, world.resolve_token(&target)) {
                        if let Some(c) = world.char_mut(me) {
                            c.memory.retain(|m| m.id != them);
                        }
                    }
                }
            }
        }

        if let Some(t) = world.trigger_mut(owner, trig) {
            t.resume_at = 0;
        }
        ret
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mud::collab::BufferedSink;
    use crate::mud::dispatch::run_script;
    use crate::mud::entity::{Character, Room};
    use crate::mud::script::{MobTrig, TriggerPrototype};

    fn setup(body: &str) -> (World, EntityRef, TrigId, crate::mud::types::CharId) {
        let mut world = World::new(Some(3));
        world.set_message_sink(Box::new(BufferedSink::default()));
        world
            .registry_mut()
            .insert(TriggerPrototype::mob(1, "test", MobTrig::GREET).with_commands(body));
        let room = world.add_room(Room::new(1, "Square"));
        let mob = world.add_char(Character::npc(10, "guard"));
        let pc = world.add_char(Character::player("Ivy", 3));
        world.char_to_room(mob, room).unwrap();
        world.char_to_room(pc, room).unwrap();
        let owner = EntityRef::Char(mob);
        let trig = world.attach_trigger(owner, 1).unwrap();
        world
            .trigger_mut(owner, trig)
            .unwrap()
            .vars
            .add_uid_var("actor", pc.into(), 0);
        (world, owner, trig, pc)
    }

    #[test]
    fn parses_known_statements() {
        assert_eq!(parse_line("* note").unwrap(), Statement::Comment);
        assert_eq!(
            parse_line("if %a% == 1").unwrap(),
            Statement::If(Condition::Equal("%a%".into(), "1".into()))
        );
        assert_eq!(parse_line("purge").unwrap(), Statement::Purge(None));
        assert!(parse_line("dance wildly").is_err());
        assert!(parse_line("wait").is_err());
    }

    #[test]
    fn branches_and_substitutes() {
        let body = "set mood grumpy\nif %mood% == happy\necho smiles\nelse\nsend %actor% The guard glares.\nreturn 0\nend";
        let (mut world, owner, trig, pc) = setup(body);
        let mut driver = LineDriver::new();
        let ret = run_script(&mut world, &mut driver, owner, trig, &RunContext::new());
        assert_eq!(ret, 0);
        let out = world.drain_messages();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].audience, Audience::ToChar(pc));
        assert_eq!(out[0].text, "The guard glares.");
    }

    #[test]
    fn damage_amounts_saturate() {
        let (mut world, owner, trig, pc) = setup("damage %actor% -2147483648");
        let mut driver = LineDriver::new();
        run_script(&mut world, &mut driver, owner, trig, &RunContext::new());
        assert_eq!(world.char(pc).unwrap().pools.health, i32::MAX);

        let (mut world, owner, trig, pc) = setup("damage %actor% 2147483647");
        run_script(&mut world, &mut driver, owner, trig, &RunContext::new());
        assert!(world.char(pc).unwrap().pools.health <= 0);
        assert!(!world.char_valid(pc));
    }

    #[test]
    fn wait_parks_and_resumes() {
        let (mut world, owner, trig, _) = setup("echo one\nwait 5\necho two");
        let mut driver = LineDriver::new();
        run_script(&mut world, &mut driver, owner, trig, &RunContext::new());
        let t = world.trigger(owner, trig).unwrap();
        assert!(t.is_waiting());
        assert_eq!(t.depth, 1);
        assert_eq!(world.drain_messages().len(), 1);

        if let Some(t) = world.trigger_mut(owner, trig) {
            t.wait_event = None;
        }
        run_script(&mut world, &mut driver, owner, trig, &RunContext::restart());
        let out = world.drain_messages();
        assert_eq!(out[0].text, "two");
        assert_eq!(world.trigger(owner, trig).unwrap().depth, 0);
    }

    #[test]
    fn purge_self_stops_the_run() {
        let (mut world, owner, trig, _) = setup("purge\necho never");
        let mut driver = LineDriver::new();
        run_script(&mut world, &mut driver, owner, trig, &RunContext::new());
        assert!(!world.entity_valid(owner));
        assert!(world.drain_messages().is_empty());
    }
}
