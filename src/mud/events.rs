//! The event pass: fire everything due on the current pulse.
//!
//! Every handler re-validates what its payload names before touching it,
//! because an earlier event in the same pass (or a script it ran) may have
//! removed it. DOTs freed during the pass are parked and released once the
//! pass is over.

use crate::mud::affects::{self, DotTick};
use crate::mud::cooldowns;
use crate::mud::dispatch::mobile::death_mtrigger;
use crate::mud::dispatch::object::timer_otrigger;
use crate::mud::dispatch::room::reset_wtrigger;
use crate::mud::dispatch::run_script;
use crate::mud::scheduler::EventPayload;
use crate::mud::script::{RunContext, ScriptDriver, WldTrig};
use crate::mud::types::EventId;
use crate::mud::world::World;
use log::{debug, trace};

/// Fire all events due at the world's current pulse. Returns how many fired.
pub fn process_events(world: &mut World, driver: &mut dyn ScriptDriver) -> usize {
    let now = world.pulse();
    let mut fired = 0;
    world.event_phase = true;

    while let Some((id, payload)) = world.events.pop_due(now) {
        fired += 1;
        trace!("event {} ({}) firing at pulse {}", id, payload.kind(), now);
        let reschedule = fire(world, driver, id, &payload);
        world.events.finish(id, now, reschedule, payload);
    }

    world.event_phase = false;
    let freed = affects::flush_deferred_dots(world);
    if freed > 0 {
        debug!("released {} expired damage-over-time effects", freed);
    }
    fired
}

/// Run one callback. The return value is the delay before it fires again,
/// 0 for never.
fn fire(world: &mut World, driver: &mut dyn ScriptDriver, id: EventId, payload: &EventPayload) -> u64 {
    match *payload {
        EventPayload::AffectExpire { ch, affect } => {
            affects::affect_expired(world, ch, affect);
            0
        }
        EventPayload::RoomAffectExpire { room, affect } => {
            affects::room_affect_expired(world, room, affect);
            0
        }
        EventPayload::CooldownExpire { ch, cooldown } => {
            cooldowns::cooldown_expired(world, ch, cooldown);
            0
        }
        EventPayload::DotTick { ch, dot } => {
            if !world.char_valid(ch) {
                return 0;
            }
            match affects::dot_tick(world, ch, dot) {
                DotTick::Continue(delay) => delay,
                DotTick::Expired => {
                    clear_dot_handle(world, ch, dot);
                    affects::dot_remove(world, ch, dot);
                    0
                }
                DotTick::Killed { by } => {
                    clear_dot_handle(world, ch, dot);
                    affects::dot_remove(world, ch, dot);
                    debug!("{} died to a damage-over-time effect", ch);
                    death_mtrigger(world, driver, ch, by);
                    world.extract_char(ch);
                    0
                }
                DotTick::Gone => 0,
            }
        }
        EventPayload::TriggerWait { owner, trig } => {
            let parked = match world.trigger_mut(owner, trig) {
                Some(t) if t.wait_event == Some(id) => {
                    t.wait_event = None;
                    true
                }
                _ => false,
            };
            if parked && world.entity_valid(owner) {
                run_script(world, driver, owner, trig, &RunContext::restart());
            }
            0
        }
        EventPayload::RoomReset { room } => {
            if world.room(room).is_none() {
                return 0;
            }
            reset_wtrigger(world, driver, room);
            let still_resets = world
                .script(room.into())
                .map(|s| s.has_types(WldTrig::RESET.bits()))
                .unwrap_or(false);
            if still_resets {
                world.reset_interval.max(1)
            } else {
                if let Some(r) = world.room_mut(room) {
                    r.reset_event = None;
                }
                0
            }
        }
        EventPayload::ObjTimer { obj } => {
            match world.obj_mut(obj) {
                Some(o) if !o.extracted => {
                    o.timer_event = None;
                    o.timer = Some(0);
                }
                _ => return 0,
            }
            if timer_otrigger(world, driver, obj) && world.obj_valid(obj) {
                debug!("object {} timed out", obj);
                world.extract_obj(obj);
            }
            0
        }
    }
}

fn clear_dot_handle(world: &mut World, ch: crate::mud::types::CharId, dot: crate::mud::types::DotId) {
    if let Some(d) = world
        .char_mut(ch)
        .and_then(|c| c.dots.iter_mut().find(|d| d.id == dot))
    {
        d.update_event = None;
    }
}
