//! # dgmud - trigger dispatch and timed effects for a text MUD
//!
//! dgmud is the event core of a multiplayer text game server. Game content
//! attaches scripts ("triggers") to characters, objects, rooms and
//! vehicles; the engine decides which of them hear each game event, runs
//! them through a pluggable script driver, and turns their results into
//! allow/block answers for the action that raised the event. Alongside it
//! runs a pulse-driven scheduler for buffs, damage-over-time, cooldowns,
//! script waits, room resets and object timers.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use dgmud::mud::seed::load_world_from_json;
//! use dgmud::mud::{process_events, LineDriver, World};
//!
//! fn main() -> anyhow::Result<()> {
//!     let mut world = World::new(Some(42));
//!     load_world_from_json("data/world.json", &mut world)?;
//!     let mut driver = LineDriver::new();
//!     world.advance_pulse();
//!     process_events(&mut world, &mut driver);
//!     world.extract_pending()?;
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`mud`] - world arena, dispatchers, scheduler, affects and scripts
//! - [`config`] - TOML configuration and tunables
//! - [`logutil`] - log line sanitizing

pub mod config;
pub mod logutil;
pub mod mud;
