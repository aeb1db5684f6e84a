//! The scripting and timed-effect core of the game world.
//!
//! [`world::World`] owns all state. Game code calls into [`dispatch`] when
//! something happens that scripts may react to, and calls
//! [`events::process_events`] once per pulse to fire whatever the
//! [`scheduler`] has come due.

pub mod affects;
pub mod collab;
pub mod cooldowns;
pub mod dispatch;
pub mod entity;
pub mod errors;
pub mod events;
pub mod scheduler;
pub mod script;
pub mod seed;
pub mod types;
pub mod world;

pub use errors::MudError;
pub use events::process_events;
pub use script::line_driver::LineDriver;
pub use script::ScriptDriver;
pub use world::World;
