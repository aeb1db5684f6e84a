//! The world arena.
//!
//! `World` owns every character, object, room and vehicle, the trigger
//! registry, the event queue, the RNG and the collaborator handles. All
//! cross-entity references are typed ids; an id that no longer resolves
//! simply means the entity is gone.
//!
//! Destruction is two-phase. `extract_*` only marks an entity and detaches
//! what has to be detached right away; [`World::extract_pending`] frees the
//! marked entities once no dispatch is running.

use crate::mud::affects;
use crate::mud::collab::{Audience, BufferedSink, MessageSink, OutgoingText, SaveRequests, TunableLookup};
use crate::mud::entity::{Character, ObjLocation, Object, Room, Vehicle};
use crate::mud::errors::MudError;
use crate::mud::scheduler::{EventPayload, EventQueue};
use crate::mud::script::{parse_uid_token, Script, TriggerInstance, TriggerRegistry, WldTrig};
use crate::mud::types::{CharId, EntityRef, ObjId, Pulse, RoomId, TrigId, TrigVnum, VehId, WearSlot};
use crate::mud::affects::OverTimeEffect;
use log::{debug, error, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::{BTreeMap, HashMap};

/// Pulses between periodic room resets unless configured otherwise.
pub const DEFAULT_RESET_INTERVAL: u64 = 600;

/// What one extraction sweep freed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub chars: usize,
    pub objs: usize,
    pub vehicles: usize,
}

impl SweepReport {
    pub fn total(&self) -> usize {
        self.chars + self.objs + self.vehicles
    }
}

pub struct World {
    next_uid: u64,
    pulse: Pulse,
    chars: HashMap<CharId, Character>,
    /// Global character list, newest first.
    char_list: Vec<CharId>,
    objs: HashMap<ObjId, Object>,
    rooms: BTreeMap<RoomId, Room>,
    room_vnums: HashMap<u32, RoomId>,
    vehicles: HashMap<VehId, Vehicle>,
    registry: TriggerRegistry,
    pub events: EventQueue,
    rng: StdRng,
    messages: Box<dyn MessageSink>,
    tunables: Box<dyn TunableLookup>,
    pub saves: SaveRequests,
    pub reset_interval: u64,
    extractions_pending: i32,
    pending_objs: Vec<ObjId>,
    pending_vehicles: Vec<VehId>,
    pub(crate) script_depth: u32,
    pub(crate) affect_total_running: bool,
    pub(crate) event_phase: bool,
    pub(crate) deferred_dots: Vec<OverTimeEffect>,
}

impl Default for World {
    fn default() -> Self {
        Self::new(None)
    }
}

impl World {
    /// Create an empty world. A fixed `seed` makes every random gate
    /// reproducible.
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        Self {
            next_uid: 0,
            pulse: 0,
            chars: HashMap::new(),
            char_list: Vec::new(),
            objs: HashMap::new(),
            rooms: BTreeMap::new(),
            room_vnums: HashMap::new(),
            vehicles: HashMap::new(),
            registry: TriggerRegistry::new(),
            events: EventQueue::new(),
            rng,
            messages: Box::new(BufferedSink::default()),
            tunables: Box::new(HashMap::<String, i64>::new()),
            saves: SaveRequests::default(),
            reset_interval: DEFAULT_RESET_INTERVAL,
            extractions_pending: 0,
            pending_objs: Vec::new(),
            pending_vehicles: Vec::new(),
            script_depth: 0,
            affect_total_running: false,
            event_phase: false,
            deferred_dots: Vec::new(),
        }
    }

    pub fn set_message_sink(&mut self, sink: Box<dyn MessageSink>) {
        self.messages = sink;
    }

    pub fn set_tunables(&mut self, tunables: Box<dyn TunableLookup>) {
        self.tunables = tunables;
    }

    // ---- clock, rng, collaborators ----

    pub fn pulse(&self) -> Pulse {
        self.pulse
    }

    pub fn advance_pulse(&mut self) -> Pulse {
        self.pulse += 1;
        self.pulse
    }

    pub fn set_pulse(&mut self, pulse: Pulse) {
        self.pulse = pulse;
    }

    /// Uniform integer in `lo..=hi`.
    pub fn number(&mut self, lo: i32, hi: i32) -> i32 {
        if lo >= hi {
            return lo;
        }
        self.rng.gen_range(lo..=hi)
    }

    pub fn send(&mut self, audience: Audience, text: &str) {
        self.messages.send(audience, text);
    }

    pub fn drain_messages(&mut self) -> Vec<OutgoingText> {
        self.messages.drain()
    }

    pub fn config_get_int(&self, key: &str) -> i64 {
        self.tunables.config_get_int(key)
    }

    pub fn registry(&self) -> &TriggerRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut TriggerRegistry {
        &mut self.registry
    }

    pub(crate) fn alloc_uid(&mut self) -> u64 {
        self.next_uid += 1;
        self.next_uid
    }

    // ---- creation ----

    pub fn add_room(&mut self, mut room: Room) -> RoomId {
        let id = RoomId(self.alloc_uid());
        room.id = id;
        self.room_vnums.insert(room.vnum, id);
        self.rooms.insert(id, room);
        id
    }

    pub fn add_char(&mut self, mut ch: Character) -> CharId {
        let id = CharId(self.alloc_uid());
        ch.id = id;
        self.chars.insert(id, ch);
        self.char_list.insert(0, id);
        affects::affect_total(self, id);
        id
    }

    /// Add an object (located nowhere). Objects with a timer start counting
    /// down immediately.
    pub fn add_obj(&mut self, mut obj: Object) -> ObjId {
        let id = ObjId(self.alloc_uid());
        obj.id = id;
        obj.location = ObjLocation::Nowhere;
        let timer = obj.timer;
        self.objs.insert(id, obj);
        if let Some(pulses) = timer {
            let ev = self
                .events
                .schedule(self.pulse, pulses, EventPayload::ObjTimer { obj: id });
            if let Some(o) = self.objs.get_mut(&id) {
                o.timer_event = Some(ev);
            }
        }
        id
    }

    pub fn add_vehicle(&mut self, mut veh: Vehicle) -> VehId {
        let id = VehId(self.alloc_uid());
        veh.id = id;
        veh.in_room = None;
        self.vehicles.insert(id, veh);
        id
    }

    /// Connect `from` to `to` in direction `dir` (one way).
    pub fn link_rooms(&mut self, from: RoomId, dir: crate::mud::types::Direction, to: RoomId) -> Result<(), MudError> {
        if !self.rooms.contains_key(&to) {
            return Err(MudError::NotFound(format!("room {}", to)));
        }
        let room = self
            .rooms
            .get_mut(&from)
            .ok_or_else(|| MudError::NotFound(format!("room {}", from)))?;
        room.exits.insert(dir, to);
        Ok(())
    }

    // ---- lookup ----

    pub fn char(&self, id: CharId) -> Option<&Character> {
        self.chars.get(&id)
    }

    pub fn char_mut(&mut self, id: CharId) -> Option<&mut Character> {
        self.chars.get_mut(&id)
    }

    pub fn obj(&self, id: ObjId) -> Option<&Object> {
        self.objs.get(&id)
    }

    pub fn obj_mut(&mut self, id: ObjId) -> Option<&mut Object> {
        self.objs.get_mut(&id)
    }

    pub fn room(&self, id: RoomId) -> Option<&Room> {
        self.rooms.get(&id)
    }

    pub fn room_mut(&mut self, id: RoomId) -> Option<&mut Room> {
        self.rooms.get_mut(&id)
    }

    pub fn room_by_vnum(&self, vnum: u32) -> Option<RoomId> {
        self.room_vnums.get(&vnum).copied()
    }

    pub fn vehicle(&self, id: VehId) -> Option<&Vehicle> {
        self.vehicles.get(&id)
    }

    pub fn vehicle_mut(&mut self, id: VehId) -> Option<&mut Vehicle> {
        self.vehicles.get_mut(&id)
    }

    /// Characters in global list order (newest first).
    pub fn char_ids(&self) -> Vec<CharId> {
        self.char_list.clone()
    }

    pub fn room_ids(&self) -> Vec<RoomId> {
        self.rooms.keys().copied().collect()
    }

    pub fn obj_ids(&self) -> Vec<ObjId> {
        let mut ids: Vec<ObjId> = self.objs.keys().copied().collect();
        ids.sort();
        ids
    }

    pub fn vehicle_ids(&self) -> Vec<VehId> {
        let mut ids: Vec<VehId> = self.vehicles.keys().copied().collect();
        ids.sort();
        ids
    }

    /// Present and not marked for extraction or dead.
    pub fn char_valid(&self, id: CharId) -> bool {
        self.chars
            .get(&id)
            .map(|c| !c.extracted && !c.dead)
            .unwrap_or(false)
    }

    pub fn obj_valid(&self, id: ObjId) -> bool {
        self.objs.get(&id).map(|o| !o.extracted).unwrap_or(false)
    }

    pub fn vehicle_valid(&self, id: VehId) -> bool {
        self.vehicles.get(&id).map(|v| !v.extracted).unwrap_or(false)
    }

    pub fn entity_valid(&self, target: EntityRef) -> bool {
        match target {
            EntityRef::Char(id) => self.char_valid(id),
            EntityRef::Obj(id) => self.obj_valid(id),
            EntityRef::Room(id) => self.rooms.contains_key(&id),
            EntityRef::Veh(id) => self.vehicle_valid(id),
        }
    }

    /// Resolve a raw uid to a live entity.
    pub fn resolve_uid(&self, uid: u64) -> Option<EntityRef> {
        let candidates = [
            EntityRef::Char(CharId(uid)),
            EntityRef::Obj(ObjId(uid)),
            EntityRef::Room(RoomId(uid)),
            EntityRef::Veh(VehId(uid)),
        ];
        candidates.into_iter().find(|t| self.entity_valid(*t))
    }

    /// Resolve a variable value holding a uid token.
    pub fn resolve_token(&self, value: &str) -> Option<EntityRef> {
        parse_uid_token(value).and_then(|uid| self.resolve_uid(uid))
    }

    pub fn entity_name(&self, target: EntityRef) -> Option<String> {
        match target {
            EntityRef::Char(id) => self.chars.get(&id).map(|c| c.name.clone()),
            EntityRef::Obj(id) => self.objs.get(&id).map(|o| o.name.clone()),
            EntityRef::Room(id) => self.rooms.get(&id).map(|r| r.name.clone()),
            EntityRef::Veh(id) => self.vehicles.get(&id).map(|v| v.name.clone()),
        }
    }

    /// The room an entity ultimately sits in, following containers upward.
    pub fn entity_room(&self, target: EntityRef) -> Option<RoomId> {
        match target {
            EntityRef::Char(id) => self.chars.get(&id)?.in_room,
            EntityRef::Room(id) => Some(id),
            EntityRef::Veh(id) => self.vehicles.get(&id)?.in_room,
            EntityRef::Obj(mut id) => {
                // containers cannot cycle, but cap the walk anyway
                for _ in 0..64 {
                    match self.objs.get(&id)?.location {
                        ObjLocation::Nowhere => return None,
                        ObjLocation::Room(r) => return Some(r),
                        ObjLocation::CarriedBy(c) | ObjLocation::WornBy(c, _) => {
                            return self.chars.get(&c)?.in_room
                        }
                        ObjLocation::InVehicle(v) => return self.vehicles.get(&v)?.in_room,
                        ObjLocation::InObj(parent) => id = parent,
                    }
                }
                None
            }
        }
    }

    // ---- scripts ----

    fn script_slot_mut(&mut self, owner: EntityRef) -> Option<&mut Option<Script>> {
        match owner {
            EntityRef::Char(id) => self.chars.get_mut(&id).map(|c| &mut c.script),
            EntityRef::Obj(id) => self.objs.get_mut(&id).map(|o| &mut o.script),
            EntityRef::Room(id) => self.rooms.get_mut(&id).map(|r| &mut r.script),
            EntityRef::Veh(id) => self.vehicles.get_mut(&id).map(|v| &mut v.script),
        }
    }

    pub fn script(&self, owner: EntityRef) -> Option<&Script> {
        match owner {
            EntityRef::Char(id) => self.chars.get(&id)?.script.as_ref(),
            EntityRef::Obj(id) => self.objs.get(&id)?.script.as_ref(),
            EntityRef::Room(id) => self.rooms.get(&id)?.script.as_ref(),
            EntityRef::Veh(id) => self.vehicles.get(&id)?.script.as_ref(),
        }
    }

    pub fn script_mut(&mut self, owner: EntityRef) -> Option<&mut Script> {
        self.script_slot_mut(owner)?.as_mut()
    }

    pub fn trigger(&self, owner: EntityRef, trig: TrigId) -> Option<&TriggerInstance> {
        self.script(owner)?.find(trig)
    }

    pub fn trigger_mut(&mut self, owner: EntityRef, trig: TrigId) -> Option<&mut TriggerInstance> {
        self.script_mut(owner)?.find_mut(trig)
    }

    /// Attach a new instance of prototype `vnum` to `owner`, after any
    /// triggers it already has.
    pub fn attach_trigger(&mut self, owner: EntityRef, vnum: TrigVnum) -> Result<TrigId, MudError> {
        let proto = self.registry.get(vnum).ok_or(MudError::UnknownTrigger(vnum))?;
        if proto.attach != owner.kind() {
            return Err(MudError::WrongAttachType {
                vnum,
                expected: attach_name(proto.attach),
                found: attach_name(owner.kind()),
            });
        }
        let is_reset = proto.attach == crate::mud::types::AttachType::Room
            && proto.has_bits(WldTrig::RESET.bits());
        let id = TrigId(self.alloc_uid());
        let slot = self
            .script_slot_mut(owner)
            .ok_or_else(|| MudError::NotFound(format!("{:?}", owner)))?;
        slot.get_or_insert_with(Script::default)
            .attach(TriggerInstance::new(id, proto));
        if let (true, EntityRef::Room(room)) = (is_reset, owner) {
            self.ensure_room_reset(room);
        }
        Ok(id)
    }

    /// Remove one trigger instance, cancelling any wait it has parked.
    pub fn detach_trigger(&mut self, owner: EntityRef, trig: TrigId) -> Option<TriggerInstance> {
        let slot = self.script_slot_mut(owner)?;
        let script = slot.as_mut()?;
        let removed = script.detach(trig)?;
        if script.is_empty() && script.globals.is_empty() {
            *slot = None;
        }
        if let Some(ev) = removed.wait_event {
            self.events.cancel(ev);
        }
        Some(removed)
    }

    /// Detach the first instance of `vnum` from `owner`.
    pub fn detach_trigger_vnum(&mut self, owner: EntityRef, vnum: TrigVnum) -> bool {
        let found = self
            .script(owner)
            .and_then(|s| s.find_vnum(vnum))
            .map(|t| t.id);
        match found {
            Some(id) => self.detach_trigger(owner, id).is_some(),
            None => false,
        }
    }

    fn cancel_script_waits(&mut self, owner: EntityRef) {
        let waits: Vec<_> = match self.script_mut(owner) {
            Some(script) => script
                .triggers
                .iter_mut()
                .filter_map(|t| t.wait_event.take())
                .collect(),
            None => return,
        };
        for ev in waits {
            self.events.cancel(ev);
        }
    }

    /// Make sure a room with reset triggers has its periodic reset queued.
    pub fn ensure_room_reset(&mut self, room: RoomId) {
        let needs = match self.rooms.get(&room) {
            Some(r) => r.reset_event.is_none(),
            None => false,
        };
        if needs {
            let ev = self
                .events
                .schedule(self.pulse, self.reset_interval, EventPayload::RoomReset { room });
            if let Some(r) = self.rooms.get_mut(&room) {
                r.reset_event = Some(ev);
            }
        }
    }

    // ---- movement ----

    /// Place `ch` in `room`, leaving any room it was in first.
    pub fn char_to_room(&mut self, ch: CharId, room: RoomId) -> Result<(), MudError> {
        if !self.rooms.contains_key(&room) {
            return Err(MudError::NotFound(format!("room {}", room)));
        }
        if !self.chars.contains_key(&ch) {
            return Err(MudError::NotFound(format!("character {}", ch)));
        }
        self.char_from_room(ch);
        if let Some(r) = self.rooms.get_mut(&room) {
            r.people.insert(0, ch);
        }
        if let Some(c) = self.chars.get_mut(&ch) {
            c.in_room = Some(room);
        }
        Ok(())
    }

    pub fn char_from_room(&mut self, ch: CharId) {
        let old = match self.chars.get_mut(&ch) {
            Some(c) => c.in_room.take(),
            None => return,
        };
        if let Some(room) = old.and_then(|r| self.rooms.get_mut(&r)) {
            room.people.retain(|id| *id != ch);
        }
    }

    /// Detach an object from whatever holds it and leave it nowhere.
    pub fn obj_from_location(&mut self, obj: ObjId) -> Option<ObjLocation> {
        let loc = self.objs.get(&obj)?.location;
        match loc {
            ObjLocation::Nowhere => {}
            ObjLocation::Room(r) => {
                if let Some(room) = self.rooms.get_mut(&r) {
                    room.contents.retain(|o| *o != obj);
                }
            }
            ObjLocation::CarriedBy(c) => {
                if let Some(ch) = self.chars.get_mut(&c) {
                    ch.carrying.retain(|o| *o != obj);
                }
            }
            ObjLocation::WornBy(c, slot) => {
                if let Some(ch) = self.chars.get_mut(&c) {
                    ch.equipment.remove(&slot);
                }
            }
            ObjLocation::InObj(parent) => {
                if let Some(p) = self.objs.get_mut(&parent) {
                    p.contains.retain(|o| *o != obj);
                }
            }
            ObjLocation::InVehicle(v) => {
                if let Some(veh) = self.vehicles.get_mut(&v) {
                    veh.contains.retain(|o| *o != obj);
                }
            }
        }
        if let Some(o) = self.objs.get_mut(&obj) {
            o.location = ObjLocation::Nowhere;
        }
        if let ObjLocation::WornBy(c, _) = loc {
            affects::affect_total(self, c);
        }
        Some(loc)
    }

    fn require_obj(&self, obj: ObjId) -> Result<(), MudError> {
        if self.objs.contains_key(&obj) {
            Ok(())
        } else {
            Err(MudError::NotFound(format!("object {}", obj)))
        }
    }

    pub fn obj_to_room(&mut self, obj: ObjId, room: RoomId) -> Result<(), MudError> {
        self.require_obj(obj)?;
        if !self.rooms.contains_key(&room) {
            return Err(MudError::NotFound(format!("room {}", room)));
        }
        self.obj_from_location(obj);
        if let Some(r) = self.rooms.get_mut(&room) {
            r.contents.insert(0, obj);
        }
        if let Some(o) = self.objs.get_mut(&obj) {
            o.location = ObjLocation::Room(room);
        }
        Ok(())
    }

    pub fn obj_to_char(&mut self, obj: ObjId, ch: CharId) -> Result<(), MudError> {
        self.require_obj(obj)?;
        if !self.chars.contains_key(&ch) {
            return Err(MudError::NotFound(format!("character {}", ch)));
        }
        self.obj_from_location(obj);
        if let Some(c) = self.chars.get_mut(&ch) {
            c.carrying.insert(0, obj);
        }
        if let Some(o) = self.objs.get_mut(&obj) {
            o.location = ObjLocation::CarriedBy(ch);
        }
        Ok(())
    }

    /// Wear `obj` in `slot`; its applies start counting immediately.
    pub fn equip_char(&mut self, ch: CharId, obj: ObjId, slot: WearSlot) -> Result<(), MudError> {
        self.require_obj(obj)?;
        match self.chars.get(&ch) {
            None => return Err(MudError::NotFound(format!("character {}", ch))),
            Some(c) if c.equipment.contains_key(&slot) => {
                return Err(MudError::Internal(format!(
                    "{} already wears something in {:?}",
                    c.name, slot
                )))
            }
            Some(_) => {}
        }
        self.obj_from_location(obj);
        if let Some(c) = self.chars.get_mut(&ch) {
            c.equipment.insert(slot, obj);
        }
        if let Some(o) = self.objs.get_mut(&obj) {
            o.location = ObjLocation::WornBy(ch, slot);
        }
        affects::affect_total(self, ch);
        Ok(())
    }

    /// Move whatever is worn in `slot` back to inventory.
    pub fn unequip_char(&mut self, ch: CharId, slot: WearSlot) -> Option<ObjId> {
        let obj = *self.chars.get(&ch)?.equipment.get(&slot)?;
        self.obj_to_char(obj, ch).ok()?;
        Some(obj)
    }

    pub fn obj_to_obj(&mut self, obj: ObjId, container: ObjId) -> Result<(), MudError> {
        self.require_obj(obj)?;
        self.require_obj(container)?;
        if obj == container {
            return Err(MudError::Internal(format!("object {} cannot contain itself", obj)));
        }
        let mut outer = self.objs.get(&container).map(|o| o.location);
        while let Some(ObjLocation::InObj(parent)) = outer {
            if parent == obj {
                return Err(MudError::Internal(format!(
                    "object {} is already inside {}",
                    container, obj
                )));
            }
            outer = self.objs.get(&parent).map(|o| o.location);
        }
        self.obj_from_location(obj);
        if let Some(c) = self.objs.get_mut(&container) {
            c.contains.insert(0, obj);
        }
        if let Some(o) = self.objs.get_mut(&obj) {
            o.location = ObjLocation::InObj(container);
        }
        Ok(())
    }

    pub fn obj_to_vehicle(&mut self, obj: ObjId, veh: VehId) -> Result<(), MudError> {
        self.require_obj(obj)?;
        if !self.vehicles.contains_key(&veh) {
            return Err(MudError::NotFound(format!("vehicle {}", veh)));
        }
        self.obj_from_location(obj);
        if let Some(v) = self.vehicles.get_mut(&veh) {
            v.contains.insert(0, obj);
        }
        if let Some(o) = self.objs.get_mut(&obj) {
            o.location = ObjLocation::InVehicle(veh);
        }
        Ok(())
    }

    pub fn vehicle_to_room(&mut self, veh: VehId, room: RoomId) -> Result<(), MudError> {
        if !self.rooms.contains_key(&room) {
            return Err(MudError::NotFound(format!("room {}", room)));
        }
        let old = match self.vehicles.get_mut(&veh) {
            Some(v) => v.in_room.replace(room),
            None => return Err(MudError::NotFound(format!("vehicle {}", veh))),
        };
        if let Some(r) = old.and_then(|r| self.rooms.get_mut(&r)) {
            r.vehicles.retain(|v| *v != veh);
        }
        if let Some(r) = self.rooms.get_mut(&room) {
            r.vehicles.insert(0, veh);
        }
        Ok(())
    }

    // ---- extraction ----

    /// Mark a character for removal at the next sweep. Charmed followers
    /// go with it.
    pub fn extract_char(&mut self, ch: CharId) {
        match self.chars.get_mut(&ch) {
            None => {
                warn!("extract_char: no character {}", ch);
                return;
            }
            Some(c) if c.extracted => {
                debug!("extract_char: {} already marked", c.name);
                return;
            }
            Some(c) => c.extracted = true,
        }
        self.extractions_pending += 1;
        self.cancel_script_waits(EntityRef::Char(ch));
        let charmies: Vec<CharId> = self
            .char_list
            .iter()
            .copied()
            .filter(|id| {
                self.chars
                    .get(id)
                    .map(|c| {
                        c.master == Some(ch)
                            && c.is_npc
                            && c.is_affected(crate::mud::types::AffFlags::CHARM)
                            && !c.extracted
                    })
                    .unwrap_or(false)
            })
            .collect();
        for follower in charmies {
            self.extract_char(follower);
        }
    }

    /// Mark an object (and everything inside it) for removal. The object is
    /// detached at once so nothing can find it in a container any more.
    pub fn extract_obj(&mut self, obj: ObjId) {
        let contents = match self.objs.get_mut(&obj) {
            None => {
                warn!("extract_obj: no object {}", obj);
                return;
            }
            Some(o) if o.extracted => return,
            Some(o) => {
                o.extracted = true;
                if let Some(ev) = o.timer_event.take() {
                    self.events.cancel(ev);
                }
                o.contains.clone()
            }
        };
        self.cancel_script_waits(EntityRef::Obj(obj));
        for inner in contents {
            self.extract_obj(inner);
        }
        self.obj_from_location(obj);
        self.pending_objs.push(obj);
    }

    pub fn extract_vehicle(&mut self, veh: VehId) {
        match self.vehicles.get_mut(&veh) {
            None => warn!("extract_vehicle: no vehicle {}", veh),
            Some(v) if v.extracted => {}
            Some(v) => {
                v.extracted = true;
                self.cancel_script_waits(EntityRef::Veh(veh));
                self.pending_vehicles.push(veh);
            }
        }
    }

    pub fn extractions_pending(&self) -> i32 {
        self.extractions_pending
    }

    /// Free everything marked for extraction.
    ///
    /// A drifting pending count is logged and recounted. A marked character
    /// with no room is unrecoverable and aborts the sweep with
    /// [`MudError::NoLocation`].
    pub fn extract_pending(&mut self) -> Result<SweepReport, MudError> {
        let mut report = SweepReport::default();

        if self.extractions_pending != 0 {
            let marked: Vec<CharId> = self
                .char_list
                .iter()
                .copied()
                .filter(|id| self.chars.get(id).map(|c| c.extracted).unwrap_or(false))
                .collect();
            for ch in marked {
                self.extract_char_final(ch)?;
                self.extractions_pending -= 1;
                report.chars += 1;
            }
            if self.extractions_pending != 0 {
                error!(
                    "SYSERR: extractions_pending is {} after sweep, recounting",
                    self.extractions_pending
                );
                self.extractions_pending = self
                    .chars
                    .values()
                    .filter(|c| c.extracted)
                    .count() as i32;
            }
        }

        for obj in std::mem::take(&mut self.pending_objs) {
            if self.objs.remove(&obj).is_some() {
                report.objs += 1;
            }
        }

        for veh in std::mem::take(&mut self.pending_vehicles) {
            self.extract_vehicle_final(veh);
            report.vehicles += 1;
        }

        if report.total() > 0 {
            debug!(
                "extraction sweep freed {} chars, {} objs, {} vehicles",
                report.chars, report.objs, report.vehicles
            );
        }
        Ok(report)
    }

    fn extract_char_final(&mut self, ch: CharId) -> Result<(), MudError> {
        let (room, name) = match self.chars.get(&ch) {
            Some(c) => (c.in_room, c.name.clone()),
            None => return Ok(()),
        };
        let room = match room {
            Some(r) => r,
            None => {
                error!("SYSERR: extract_char_final: {} (#{}) is not in any room", name, ch);
                return Err(MudError::NoLocation { uid: ch.0, name });
            }
        };

        for other in self.chars.values_mut() {
            if other.master == Some(ch) {
                other.master = None;
            }
            if other.fighting == Some(ch) {
                other.fighting = None;
            }
        }

        let (carried, worn) = match self.chars.get_mut(&ch) {
            Some(c) => {
                c.fighting = None;
                (c.carrying.clone(), c.equipment.values().copied().collect::<Vec<_>>())
            }
            None => return Ok(()),
        };
        for obj in worn.into_iter().chain(carried) {
            self.obj_to_room(obj, room)?;
        }

        let mut timers = Vec::new();
        if let Some(c) = self.chars.get_mut(&ch) {
            timers.extend(c.affected.iter_mut().filter_map(|a| a.expire_event.take()));
            timers.extend(c.dots.iter_mut().filter_map(|d| d.update_event.take()));
            timers.extend(c.cooldowns.iter_mut().filter_map(|cd| cd.event.take()));
        }
        for ev in timers {
            self.events.cancel(ev);
        }
        self.cancel_script_waits(EntityRef::Char(ch));

        self.char_from_room(ch);
        self.chars.remove(&ch);
        self.char_list.retain(|id| *id != ch);
        debug!("extracted {} (#{})", name, ch);
        Ok(())
    }

    fn extract_vehicle_final(&mut self, veh: VehId) {
        let (room, contents) = match self.vehicles.get(&veh) {
            Some(v) => (v.in_room, v.contains.clone()),
            None => return,
        };
        for obj in contents {
            match room {
                Some(r) => {
                    if let Err(e) = self.obj_to_room(obj, r) {
                        warn!("extract_vehicle: could not drop object {}: {}", obj, e);
                        self.extract_obj(obj);
                    }
                }
                None => self.extract_obj(obj),
            }
        }
        if let Some(r) = room.and_then(|r| self.rooms.get_mut(&r)) {
            r.vehicles.retain(|v| *v != veh);
        }
        self.vehicles.remove(&veh);
        // objects dropped for lack of a room are freed on the next sweep
    }
}

fn attach_name(kind: crate::mud::types::AttachType) -> &'static str {
    use crate::mud::types::AttachType;
    match kind {
        AttachType::Mob => "mob",
        AttachType::Obj => "obj",
        AttachType::Room => "room",
        AttachType::Vehicle => "vehicle",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mud::entity::{Character, Object, Room};

    #[test]
    fn moves_are_atomic() {
        let mut world = World::new(Some(1));
        let a = world.add_room(Room::new(100, "A"));
        let b = world.add_room(Room::new(101, "B"));
        let ch = world.add_char(Character::player("Ann", 5));
        world.char_to_room(ch, a).unwrap();
        world.char_to_room(ch, b).unwrap();
        assert!(world.room(a).unwrap().people.is_empty());
        assert_eq!(world.room(b).unwrap().people, vec![ch]);

        let sword = world.add_obj(Object::new(1, "sword"));
        world.obj_to_char(sword, ch).unwrap();
        world.equip_char(ch, sword, WearSlot::Wield).unwrap();
        assert!(world.char(ch).unwrap().carrying.is_empty());
        world.obj_to_room(sword, a).unwrap();
        assert!(world.char(ch).unwrap().equipment.is_empty());
        assert_eq!(world.room(a).unwrap().contents, vec![sword]);
    }

    #[test]
    fn containers_cannot_form_a_loop() {
        let mut world = World::new(Some(1));
        let room = world.add_room(Room::new(1, "R"));
        let chest = world.add_obj(Object::new(1, "chest"));
        let bag = world.add_obj(Object::new(2, "bag"));
        let pouch = world.add_obj(Object::new(3, "pouch"));
        world.obj_to_room(chest, room).unwrap();
        world.obj_to_obj(bag, chest).unwrap();
        world.obj_to_obj(pouch, bag).unwrap();

        assert!(matches!(world.obj_to_obj(chest, bag), Err(MudError::Internal(_))));
        assert!(matches!(world.obj_to_obj(chest, pouch), Err(MudError::Internal(_))));
        assert!(matches!(world.obj_to_obj(chest, chest), Err(MudError::Internal(_))));

        // a refused move leaves everything where it was
        assert_eq!(world.obj(chest).unwrap().location, ObjLocation::Room(room));
        assert_eq!(world.room(room).unwrap().contents, vec![chest]);
        assert_eq!(world.entity_room(EntityRef::Obj(pouch)), Some(room));

        // moving a container inside a sibling is fine
        let box_ = world.add_obj(Object::new(4, "box"));
        world.obj_to_obj(box_, chest).unwrap();
        world.obj_to_obj(bag, box_).unwrap();
        assert_eq!(world.obj(bag).unwrap().location, ObjLocation::InObj(box_));
    }

    #[test]
    fn uid_resolution_degrades_to_none() {
        let mut world = World::new(Some(1));
        let room = world.add_room(Room::new(1, "R"));
        let obj = world.add_obj(Object::new(5, "rock"));
        world.obj_to_room(obj, room).unwrap();
        assert_eq!(world.resolve_uid(obj.0), Some(EntityRef::Obj(obj)));
        world.extract_obj(obj);
        assert_eq!(world.resolve_uid(obj.0), None);
        world.extract_pending().unwrap();
        assert!(world.obj(obj).is_none());
    }

    #[test]
    fn extraction_is_deferred_until_sweep() {
        let mut world = World::new(Some(1));
        let room = world.add_room(Room::new(1, "R"));
        let ch = world.add_char(Character::npc(10, "goblin"));
        world.char_to_room(ch, room).unwrap();
        world.extract_char(ch);
        world.extract_char(ch);
        assert_eq!(world.extractions_pending(), 1);
        assert!(world.char(ch).is_some());
        assert!(!world.char_valid(ch));
        let report = world.extract_pending().unwrap();
        assert_eq!(report.chars, 1);
        assert!(world.char(ch).is_none());
        assert_eq!(world.extractions_pending(), 0);
    }
}
