//! The real-time loop's logical per-tick entry point (§4.3): binds every
//! other crate's systems into the fixed phase order a multiplayer world
//! needs — network admission, parsing, acting, moving, fighting, growing,
//! decaying — and hands back this tick's outbound mailbag for the caller
//! to actually write to sockets.

use rustc_hash::FxHashMap;
use tokio::sync::mpsc::UnboundedReceiver;

use mud_core::rng::SimRng;
use mud_core::signals::{
    Act, Cook, Echo, Emit, GrowAnchor, Inbound, InboundPrompt, Learn, Melee, Parse,
    PositionChanged, Roast, StanceChanged,
};
use mud_core::{EntityId, SignalBus};
use mud_world::entity::EntityStore;
use mud_world::terrain::{process_decay_check, process_tile_decay, Chips};

use mud_net::{
    admission::Admission, connection, outbox, AuthPort, ConnectionTable, InboundEvent, Outbox,
    OutboundHandle, Packet, PersistencePort,
};
use mud_play::{combat, commands, experience, inbound as play_inbound, movement, parser, Command, CommandContext};
use mud_time::ActQueue;

use crate::bootstrap::WorldHandle;
use crate::systems::{self, RegenState};
use crate::visibility;

/// Nominal month length used to drive `NightClock::brightness_index`'s
/// seasonal drift — this workspace has no real-calendar concept, so the
/// figure is an honest placeholder rather than a derived constant.
const MONTH_LEN_SECS: f64 = 30.0 * 86_400.0;

/// Everything a running world needs that isn't an `EntityStore` component:
/// queues, tables, rng, and the command dispatch table.
pub struct Simulation {
    pub store: EntityStore,
    bus: SignalBus,
    acts: ActQueue,
    rng: SimRng,
    global_seed: u64,

    world: WorldHandle,
    maps: FxHashMap<String, EntityId>,

    admission: Admission,
    conn_table: ConnectionTable,
    outbox: Outbox,
    auth: Box<dyn AuthPort>,
    persistence: Box<dyn PersistencePort>,

    pending_queue: play_inbound::PendingQueue,
    commands: Vec<Box<dyn Command>>,

    regen_state: RegenState,
    ai_last_tick_secs: f64,
    gas_next_call_secs: f64,
    last_phase: Option<u8>,
    next_act_id: u64,
    now_secs: f64,
    epoch_start_secs: f64,
}

impl Simulation {
    /// `store` must already carry whatever [`crate::bootstrap::bootstrap_world`]
    /// populated it with — this does not bootstrap the world itself, so the
    /// two stay independently testable.
    pub fn new(
        store: EntityStore,
        world: WorldHandle,
        seed: u64,
        epoch_start_secs: f64,
        auth: Box<dyn AuthPort>,
        persistence: Box<dyn PersistencePort>,
    ) -> Self {
        let mut maps = FxHashMap::default();
        maps.insert("start".to_string(), world.map_id);

        Self {
            store,
            bus: SignalBus::new(),
            acts: ActQueue::new(),
            rng: SimRng::new(seed),
            global_seed: seed,
            world,
            maps,
            admission: Admission::new(),
            conn_table: ConnectionTable::new(),
            outbox: Outbox::new(),
            auth,
            persistence,
            pending_queue: play_inbound::PendingQueue::default(),
            commands: commands::default_commands(),
            regen_state: RegenState::default(),
            ai_last_tick_secs: 0.0,
            gas_next_call_secs: 0.0,
            last_phase: None,
            next_act_id: 1,
            now_secs: 0.0,
            epoch_start_secs,
        }
    }

    fn alloc_act_id(&mut self) -> u64 {
        let id = self.next_act_id;
        self.next_act_id += 1;
        id
    }

    pub fn now_secs(&self) -> f64 {
        self.now_secs
    }

    /// The socket a given entity is currently bound to, if any — the
    /// caller needs this to turn `tick`'s returned mailbag into actual
    /// `OutboundHandle::send` calls.
    pub fn conn_for(&self, entity: EntityId) -> Option<mud_net::ConnId> {
        self.conn_table.conn_for(entity)
    }

    /// Advance the world by `dt_secs` of logical time. Draining transport
    /// events and writing the resulting packets to sockets is the caller's
    /// job (it owns `events`/`outbound`); this only needs them to admit new
    /// players and report rejections.
    pub fn tick(
        &mut self,
        dt_secs: f64,
        events: &mut UnboundedReceiver<InboundEvent>,
        outbound: &OutboundHandle,
    ) -> FxHashMap<EntityId, Packet> {
        self.now_secs += dt_secs;
        let night_clock = mud_time::NightClock::from_epoch_secs(self.epoch_start_secs + self.now_secs);

        // 1. Timers and world cues.
        self.bus.drain_timers();
        self.world.cues.process_at(&mut self.bus, night_clock);

        // 2. Network admission.
        let mut pending_binds = self.admission.process(
            &mut self.store,
            &mut self.bus,
            &self.conn_table,
            events,
            self.auth.as_ref(),
            self.persistence.as_ref(),
            &self.maps,
            outbound,
        );
        connection::process(
            &mut self.store,
            &self.bus,
            &mut self.conn_table,
            &mut self.outbox,
            &mut pending_binds,
            self.persistence.as_ref(),
        );

        // 3. Inbound text: prompts, lag buffer, parser.
        let inbound_prompts: Vec<InboundPrompt> = self.bus.iter::<InboundPrompt>().collect();
        play_inbound::process_prompts(&mut self.store, &mut self.bus, self.now_secs, &inbound_prompts);

        let inbound: Vec<Inbound> = self.bus.iter::<Inbound>().collect();
        play_inbound::process(&mut self.store, &mut self.bus, &mut self.pending_queue, self.now_secs, &inbound);

        let parses: Vec<Parse> = self.bus.iter::<Parse>().collect();
        {
            let mut ctx = CommandContext { store: &mut self.store, bus: &mut self.bus, acts: &self.acts };
            parser::process(&mut ctx, &self.commands, &parses);
        }

        // 4. Act queue: resolve relative delays into absolute deadlines and
        // fresh ids before handing this tick's pulsed `Act`s to the queue.
        let now_secs = self.now_secs;
        let mut pulsed_acts: Vec<Act> = self.bus.iter::<Act>().collect();
        for act in &mut pulsed_acts {
            act.id = self.alloc_act_id();
            act.delay_secs += now_secs;
        }
        self.acts.process(&self.store, &mut self.bus, self.now_secs, &pulsed_acts);
        systems::dispatch_act_effects(&mut self.bus);

        // 5. Combat, stance.
        let melees: Vec<Melee> = self.bus.iter::<Melee>().collect();
        combat::process_melee(&mut self.store, &mut self.bus, self.rng.inner(), &melees);
        let stance_changes: Vec<StanceChanged> = self.bus.iter::<StanceChanged>().collect();
        commands::process_stance_changed(&mut self.store, &stance_changes);

        // 6. Movement, then visibility off this tick's position deltas.
        movement::process_move_compass(&mut self.store, &mut self.bus, &self.world.chips_by_map, self.now_secs);
        movement::process_move_position_and_entity(&mut self.store, &mut self.bus);
        self.store.apply_pending();

        let position_changes: Vec<PositionChanged> = self.bus.iter::<PositionChanged>().collect();
        visibility::process(&self.store, &mut self.bus, &position_changes);

        // 7. AI: drives (simple mobs), then priority behavior queues.
        mud_ai::drives::process(
            &self.store,
            &self.acts,
            &mut self.bus,
            &self.world.chips_by_map,
            self.now_secs,
            &mut self.ai_last_tick_secs,
        );
        let behavior_mobs: Vec<EntityId> =
            self.store.query::<mud_ai::behavior::BehaviorQueue>().map(|(e, _)| e).collect();
        for eid in behavior_mobs {
            let Some(map_id) = self
                .store
                .try_component::<mud_world::components::Transform>(eid)
                .map(|t| t.map_id)
            else {
                continue;
            };
            let Some(chips) = self.world.chips_by_map.get(&map_id) else { continue };
            let Some(queue) = self
                .store
                .try_component::<mud_ai::behavior::BehaviorQueue>(eid)
                .cloned()
            else {
                continue;
            };
            mud_ai::behavior::process_behavior_queue(&mut self.store, chips, &mut self.bus, eid, &queue);
        }
        self.store.apply_pending();

        // 8. Experience, rest.
        let learns: Vec<Learn> = self.bus.iter::<Learn>().collect();
        for learn in &learns {
            let mut entity_rng = self.rng.entity_rng(self.global_seed, learn.source);
            experience::process_learn(&mut self.store, &mut self.bus, &mut entity_rng, std::slice::from_ref(learn));
        }
        systems::process_rest(&mut self.store, &mut self.bus);
        systems::process_regen(&mut self.store, &mut self.bus, self.now_secs, &mut self.regen_state, 1.0);

        // 9. Health/condition: death, then broadcast to viewers.
        systems::process_death(&mut self.store, &mut self.bus);
        systems::broadcast_health_and_condition(&self.store, &mut self.bus);
        self.store.apply_pending();

        // 10. Consumables.
        systems::process_rot(&mut self.store, &self.bus);
        let cooks: Vec<Cook> = self.bus.iter::<Cook>().collect();
        systems::process_cook(&mut self.store, &mut self.bus, &cooks);
        let roasts: Vec<Roast> = self.bus.iter::<Roast>().collect();
        systems::process_roast(&mut self.store, &mut self.bus, &roasts);

        // 11. Anchors, gas, terrain decay.
        let grows: Vec<GrowAnchor> = self.bus.iter::<GrowAnchor>().collect();
        systems::process_anchor_growth(&mut self.store, &mut self.bus, dt_secs, &grows);
        systems::process_anchor_destroyed_cleanup(&mut self.store, &self.bus);
        systems::process_gas(
            &mut self.store,
            &self.world.chips_by_map,
            &mut self.bus,
            self.now_secs,
            &mut self.gas_next_call_secs,
        );
        {
            let map_refs: Vec<(EntityId, &Chips)> =
                self.world.chips_by_map.iter().map(|(id, c)| (*id, c)).collect();
            process_decay_check(&self.store, &mut self.bus, &map_refs);
        }
        process_tile_decay(&mut self.store, &mut self.bus, &mut self.world.chips_by_map);
        self.store.apply_pending();

        // 12. Narrative broadcast.
        let emits: Vec<Emit> = self.bus.iter::<Emit>().collect();
        systems::process_emit(&self.store, &mut self.bus, &emits);
        let echoes: Vec<Echo> = self.bus.iter::<Echo>().collect();
        systems::process_echo(&self.store, &mut self.bus, &echoes);

        // 13. Phase/brightness broadcast.
        let elapsed_in_month = night_clock.epoch_secs().rem_euclid(MONTH_LEN_SECS);
        let brightness = night_clock.brightness_index(MONTH_LEN_SECS, elapsed_in_month);
        systems::process_phase_change(&self.store, &mut self.bus, &mut self.last_phase, brightness);

        // 14. Outbox: drain every Outbound* queue into this tick's mailbag.
        let mailbag = outbox::process(&self.store, &self.bus, &self.world.chips_by_map, &mut self.outbox, self.now_secs);

        self.bus.clear();
        mailbag
    }
}
