pub mod simulation;
pub mod configuration;
pub mod visualization;
pub mod benchmark;

pub use simulation::arena::{BodyArena, BodyId};
pub use simulation::states::{Body, System, NVec2};
pub use simulation::forces::{Acceleration, AccelSet};
pub use simulation::sandbox::{Sandbox, TickEvents};
pub use simulation::prediction::TrajectoryPoint;
pub use simulation::zones::{PeriodicTrigger, ZoneShape};

pub use configuration::config::{BodyConfig, BondConfig, EngineConfig, ParametersConfig, ScenarioConfig, ZoneConfig};

pub use visualization::physim_vis2d::run_2d;

pub use benchmark::benchmark::{bench_long_range, bench_tick};
