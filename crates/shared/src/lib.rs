//! Ambient stack shared by the engine binary: injectable clock and RNG
//! ports, layered configuration, persistence adapters, and a metrics sink.
//! Nothing here knows about rooms, mobs, or combat — that's
//! `ambonmud-domain` and `ambonmud-engine`.

pub mod clock;
pub mod config;
pub mod metrics;
pub mod rng;
pub mod repository;

pub use clock::{Clock, FakeClock, SystemClock};
pub use config::{AppConfig, ConfigError, DeploymentConfig, GameplayConfig, ObservabilityConfig};
pub use metrics::{InMemoryMetrics, MetricsSink, NoopMetrics};
pub use repository::{InMemoryPlayerRepository, PlayerRepository, RepositoryError, SqlitePlayerRepository};
pub use rng::{GameRng, StdGameRng};
