//! `mud-server` — CLI entrypoint: load configuration, wire up the network
//! and persistence adapters, bootstrap the world, and drive the fixed-step
//! tick loop (§4.13).

mod cli;
mod config;

use anyhow::Context;
use tracing::{info, info_span, warn};
use tracing_subscriber::EnvFilter;

use mud_core::clock::{TickClock, TickConfig};
use mud_net::wire::encode_packet;
use mud_net::{AuthPort, InMemoryPersistence, LocalAuth, PersistencePort};
use mud_time::clock::NightClock;
use mud_world::entity::EntityStore;

use cli::Cli;
use config::ServerConfig;

fn init_logging(level: &str) {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn build_auth(cfg: &ServerConfig) -> Box<dyn AuthPort> {
    if cfg.allow_local_auth {
        warn!("allow_local_auth is set — accepting the connection's first line as its owner id, dev use only");
    }
    Box::new(LocalAuth)
}

fn build_persistence(cfg: &ServerConfig) -> anyhow::Result<Box<dyn PersistencePort>> {
    #[cfg(feature = "sqlite")]
    if let Some(path) = &cfg.sqlite_path {
        let adapter = mud_net::persistence::sqlite::SqlitePersistence::open(path)
            .with_context(|| format!("opening sqlite database at {}", path.display()))?;
        return Ok(Box::new(adapter));
    }
    #[cfg(not(feature = "sqlite"))]
    if cfg.sqlite_path.is_some() {
        warn!("sqlite_path is set but the `sqlite` feature wasn't built in — falling back to in-memory persistence");
    }
    Ok(Box::new(InMemoryPersistence::new()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse_args();
    let cfg = ServerConfig::load(cli.config.as_deref()).context("loading server configuration")?;
    init_logging(cli.log_level.as_deref().unwrap_or(&cfg.log_level));

    info!(bind = %cfg.bind, seed = cfg.seed, "starting mud-server");

    let auth = build_auth(&cfg);
    let persistence = build_persistence(&cfg)?;

    let mut store = EntityStore::new();
    let start_clock = NightClock::from_epoch_secs(cfg.epoch_start_secs);
    let world = mud_sim::bootstrap_world(&mut store, start_clock, persistence.as_ref())
        .context("bootstrapping starter world")?;

    let (mut events, outbound) = mud_net::serve(cfg.bind).await.context("binding TCP listener")?;
    let mut sim = mud_sim::Simulation::new(store, world, cfg.seed, cfg.epoch_start_secs, auth, persistence);

    let tick_config = TickConfig::default();
    let step_secs = tick_config.step.as_secs_f64();
    let mut clock = TickClock::new(tick_config);

    info!("world bootstrapped, entering tick loop");
    loop {
        clock.wait_for_deadline();
        if clock.reset_last_tick {
            warn!(tick = %clock.tick(), jitter_ema_ms = clock.jitter_ema().as_secs_f64() * 1000.0, "tick loop fell behind; deadline reset");
        }

        let span = info_span!("tick", tick = %clock.tick());
        let _guard = span.enter();

        let mailbag = sim.tick(step_secs, &mut events, &outbound);
        for (entity, packet) in mailbag {
            let Some(conn) = sim.conn_for(entity) else { continue };
            match encode_packet(&packet) {
                Ok(frame) => outbound.send(conn, frame),
                Err(e) => warn!(%entity, error = %e, "failed to encode outbound packet"),
            }
        }
    }
}
