//! Simulator runtime
//!
//! Builds the registry, projection maps and protocol front-ends from the
//! service config, then spawns the clock and one task per front-end. Every
//! task observes the same cancellation token.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use errors::SimResult;
use sensim_model::{
    load_point_set_or_default, PointDefinition, Registry, SimulationClock, TimeProvider,
};
use sensim_protocols::{
    run_frontend, Frontend, FrontendError, FrontendStats, ModbusTcpServer, MqttPublisher,
    ObjectFrontend, ObjectStore, ReconnectPolicy, RegisterBank, RegisterFrontend,
    TelemetryFrontend, TelemetrySwitch,
};
use sensim_routing::ProjectionMaps;

use crate::api::AppState;
use crate::config::SimConfig;

/// Everything the simulator runs, wired but not yet started
pub struct Simulator {
    config: SimConfig,
    time: Arc<dyn TimeProvider>,
    registry: Arc<Registry>,
    maps: Arc<ProjectionMaps>,
    clock: Arc<SimulationClock>,
    bank: Arc<RegisterBank>,
    store: Arc<ObjectStore>,
    register_frontend: Arc<RegisterFrontend>,
    object_frontend: Arc<ObjectFrontend>,
    telemetry_switch: Arc<TelemetrySwitch>,
    stats: BTreeMap<&'static str, Arc<FrontendStats>>,
}

impl Simulator {
    /// Load the point set and maps named in `config`, falling back to defaults
    pub fn build(config: SimConfig, time: Arc<dyn TimeProvider>) -> SimResult<Self> {
        let points = load_point_set_or_default(Some(&config.files.points));
        let maps = ProjectionMaps::load(&config.files.map_paths(), &points);
        Self::from_parts(config, &points, maps, time)
    }

    pub fn from_parts(
        config: SimConfig,
        points: &[PointDefinition],
        maps: ProjectionMaps,
        time: Arc<dyn TimeProvider>,
    ) -> SimResult<Self> {
        let seed = config.simulation.seed.unwrap_or_else(rand::random);
        let registry = Arc::new(Registry::from_definitions(points, time.now_millis(), seed));
        info!(
            "Registry loaded: {} point(s), seed {}",
            registry.len(),
            seed
        );

        let maps = Arc::new(maps);
        let clock = Arc::new(SimulationClock::new(
            registry.clone(),
            time.clone(),
            config.tick(),
        ));

        let bank = Arc::new(RegisterBank::for_map(&maps.registers));
        let register_frontend = Arc::new(
            RegisterFrontend::new(registry.clone(), Arc::new(maps.registers.clone()), bank.clone())
                .with_write_priority(config.register.write_priority),
        );

        // A BACnet/IP adapter reads from `store` and routes WriteProperty to `object_frontend`
        let store = Arc::new(ObjectStore::new());
        let object_frontend = Arc::new(ObjectFrontend::new(
            registry.clone(),
            Arc::new(maps.objects.clone()),
            store.clone(),
        ));
        let installed = object_frontend.install().map_err(FrontendError::from)?;
        info!("Object store: {} object(s) installed", installed);

        let telemetry_switch = Arc::new(TelemetrySwitch::new(config.telemetry.publish_on_start));

        let stats = ["register", "object", "telemetry"]
            .into_iter()
            .map(|name| (name, Arc::new(FrontendStats::new())))
            .collect();

        Ok(Self {
            config,
            time,
            registry,
            maps,
            clock,
            bank,
            store,
            register_frontend,
            object_frontend,
            telemetry_switch,
            stats,
        })
    }

    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }

    pub fn clock(&self) -> Arc<SimulationClock> {
        self.clock.clone()
    }

    pub fn maps(&self) -> &ProjectionMaps {
        &self.maps
    }

    pub fn register_bank(&self) -> Arc<RegisterBank> {
        self.bank.clone()
    }

    pub fn object_store(&self) -> Arc<ObjectStore> {
        self.store.clone()
    }

    pub fn telemetry_switch(&self) -> Arc<TelemetrySwitch> {
        self.telemetry_switch.clone()
    }

    /// Control API state sharing this simulator's registry and switches
    pub fn app_state(&self) -> AppState {
        let frontends = self
            .stats
            .iter()
            .map(|(name, stats)| (*name, stats.clone()))
            .collect();
        AppState::new(
            self.registry.clone(),
            self.clock.clone(),
            self.telemetry_switch.clone(),
            self.maps.protocol_labels(),
        )
        .with_frontends(frontends)
        .with_service_name(self.config.service.name.clone())
    }

    fn stats_for(&self, name: &str) -> Arc<FrontendStats> {
        self.stats.get(name).cloned().unwrap_or_default()
    }

    fn spawn_frontend(
        &self,
        frontend: Arc<dyn Frontend>,
        period_ms: u64,
        token: &CancellationToken,
    ) -> JoinHandle<()> {
        let stats = self.stats_for(frontend.name());
        tokio::spawn(run_frontend(
            frontend,
            Duration::from_millis(period_ms),
            stats,
            token.clone(),
        ))
    }

    /// Spawn the clock, enabled front-ends and the register server
    ///
    /// A register bind failure is logged and the server skipped; the
    /// simulation and other front-ends keep running.
    pub async fn start(&self, token: CancellationToken) -> Vec<JoinHandle<()>> {
        let mut handles = Vec::new();

        // One tick up front so protocols never expose construction-time values
        self.clock.tick();
        handles.push(tokio::spawn(self.clock.clone().run(token.clone())));

        if self.config.register.enabled {
            handles.push(self.spawn_frontend(
                self.register_frontend.clone(),
                self.config.register.update_ms,
                &token,
            ));

            match TcpListener::bind(&self.config.register.bind).await {
                Ok(listener) => {
                    let server = Arc::new(ModbusTcpServer::new(
                        self.bank.clone(),
                        self.register_frontend.clone(),
                    ));
                    handles.push(tokio::spawn(server.serve(listener, token.clone())));
                },
                Err(e) => {
                    error!(
                        "Failed to bind register server on {}: {}",
                        self.config.register.bind, e
                    );
                },
            }
        } else {
            info!("Register front-end disabled");
        }

        if self.config.object.enabled {
            handles.push(self.spawn_frontend(
                self.object_frontend.clone(),
                self.config.object.update_ms,
                &token,
            ));
        } else {
            info!("Object front-end disabled");
        }

        if self.config.telemetry.enabled {
            if self.maps.topics.is_empty() {
                warn!("Telemetry enabled but no topics are mapped");
            }
            let publisher = Arc::new(MqttPublisher::start(
                &self.config.telemetry.mqtt,
                ReconnectPolicy::default(),
                token.clone(),
            ));
            let frontend = Arc::new(TelemetryFrontend::new(
                self.registry.clone(),
                Arc::new(self.maps.topics.clone()),
                publisher,
                self.telemetry_switch.clone(),
                self.time.clone(),
            ));
            handles.push(self.spawn_frontend(frontend, self.config.telemetry.interval_ms, &token));
        } else {
            info!("Telemetry front-end disabled");
        }

        info!("Simulator started: {} task(s)", handles.len());
        handles
    }
}
