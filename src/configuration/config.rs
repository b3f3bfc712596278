//! Configuration types for loading sandbox scenarios from YAML.
//!
//! This module defines a thin, `serde`-deserializable representation of a
//! scenario. A scenario consists of:
//!
//! - [`EngineConfig`]     – long-range evaluation options (Barnes-Hut, theta)
//! - [`ParametersConfig`] – numerical parameters, physical constants, toggles
//! - [`BodyConfig`]       – initial state for each body
//! - [`ZoneConfig`]       – zone definitions, tagged by family
//! - [`BondEntryConfig`]  – elastic bonds between body list indices
//! - [`BarrierConfig`]    – solid line barriers
//! - [`FieldConfig`]      – formula force fields
//! - [`ScenarioConfig`]   – top-level wrapper used to load a scenario from YAML
//!
//! Every section and almost every field is optional; missing values fall
//! back to the same defaults the interactive sandbox uses.
//!
//! # YAML format
//! An example scenario YAML matching these types:
//!
//! ```yaml
//! engine:
//!   barnes_hut: false
//!   theta: 0.5
//!
//! parameters:
//!   h0: 0.016               # fixed step size
//!   speed_limit: 4000.0     # hard velocity clamp
//!   G: 0.5                  # gravitational constant
//!   ke: 8000.0              # Coulomb constant
//!   km: 100.0               # magnetic constant
//!   seed: 42                # deterministic seed
//!   ambient_temp: 293.0     # null -> vacuum
//!
//! bodies:
//!   - x: [ -200.0, 0.0 ]
//!     v: [ 0.0, 12.0 ]
//!     m: 100.0
//!     radius: 12.0
//!     color: [0.9, 0.7, 0.2]
//!   - x: [ 200.0, 0.0 ]
//!     v: [ 0.0, -12.0 ]
//!     m: 1.0                # omit radius to derive it from the mass
//!     restitution: 0.9      # single number -> flat material curve
//!     stiffness:            # or a full temperature curve
//!       cold: 2.0e4
//!       hot: 500.0
//!       critical_temp: 900.0
//!       sharpness: 0.02
//!
//! zones:
//!   - kind: periodic
//!     shape: { type: rect, min: [-500.0, -500.0], max: [500.0, 500.0] }
//!     trigger: radius
//!   - kind: thermal
//!     shape: { type: circle, center: [0.0, 0.0], radius: 150.0 }
//!     temperature: 1200.0
//!     transfer: 0.8
//!
//! bonds:
//!   - a: 0                  # indices into the bodies list
//!     b: 1
//!     stiffness: 50.0
//!     damping: 0.5
//!
//! barriers:
//!   - a: [-300.0, -100.0]
//!     b: [ 300.0, -100.0]
//!     restitution: 1.0
//!
//! fields:
//!   - fx: "-y / (x*x + y*y + 100)"
//!     fy: "x / (x*x + y*y + 100)"
//! ```

use serde::Deserialize;

use crate::simulation::states::MaterialCurve;

/// Long-range force evaluation options
#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct EngineConfig {
    pub barnes_hut: bool, // `true` - approximate pair forces with the quadtree, `false` - direct N^2 summation
    pub theta: Option<f64>, // opening threshold, node treated as one aggregate when size/distance < theta
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            barnes_hut: false,
            theta: None,
        }
    }
}

/// Global numerical and physical parameters for a scenario
#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ParametersConfig {
    pub h0: f64, // fixed step size
    pub speed_limit: f64, // hard velocity clamp
    pub eps2: f64, // softening - prevents singular forces at very small separations
    pub G: f64, // gravitational constant
    pub ke: f64, // Coulomb constant
    pub km: f64, // magnetic dipole constant
    pub c: f64, // speed-of-light constant for field formulas
    pub gravity: bool, // long-range force toggles
    pub electric: bool,
    pub magnetic: bool,
    pub fragmentation: bool, // body breakup on overload
    pub thermodynamics: bool, // heat flow and radiation
    pub sigma: f64, // radiative constant
    pub ambient_temp: Option<f64>, // surrounding temperature, null -> vacuum
    pub seed: u64, // deterministic seed to make runs reproducible
    pub trail_len: usize, // positions kept per body trail
}

impl Default for ParametersConfig {
    fn default() -> Self {
        Self {
            h0: 0.016,
            speed_limit: 4000.0,
            eps2: 1e-4,
            G: 0.5,
            ke: 8000.0,
            km: 100.0,
            c: 1000.0,
            gravity: true,
            electric: true,
            magnetic: true,
            fragmentation: true,
            thermodynamics: true,
            sigma: 5.67e-8,
            ambient_temp: Some(293.0),
            seed: 42,
            trail_len: 120,
        }
    }
}

/// A temperature-dependent material property: either one flat value or a
/// full logistic curve.
#[derive(Deserialize, Debug, Clone)]
#[serde(untagged)]
pub enum MaterialConfig {
    Flat(f64),
    Curve {
        cold: f64,
        hot: f64,
        critical_temp: f64,
        sharpness: f64,
    },
}

impl MaterialConfig {
    pub fn to_curve(&self) -> MaterialCurve {
        match *self {
            MaterialConfig::Flat(value) => MaterialCurve::flat(value),
            MaterialConfig::Curve {
                cold,
                hot,
                critical_temp,
                sharpness,
            } => MaterialCurve {
                cold,
                hot,
                critical_temp,
                sharpness,
            },
        }
    }
}

/// Configuration for a single body's initial state
#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct BodyConfig {
    pub x: [f64; 2], // initial position
    pub v: [f64; 2], // initial velocity
    pub a0: [f64; 2], // constant external acceleration
    pub m: f64, // mass, <= 0 pins the body in place
    pub radius: Option<f64>, // omitted -> derived from the mass
    pub charge: f64, // electric charge
    pub moment: f64, // magnetic moment
    pub spin: f64, // initial angular speed
    pub friction: f64, // Coulomb friction coefficient
    pub lifetime: Option<u64>, // remaining ticks, omitted -> infinite
    pub integrity: Option<f64>, // breakup threshold, omitted -> unbreakable
    pub temp: f64, // initial temperature
    pub specific_heat: f64,
    pub absorption: f64, // fraction of collision heat absorbed
    pub restitution: MaterialConfig,
    pub stiffness: MaterialConfig,
    pub color: Option<[f32; 3]>, // omitted -> random hue
}

impl Default for BodyConfig {
    fn default() -> Self {
        Self {
            x: [0.0, 0.0],
            v: [0.0, 0.0],
            a0: [0.0, 0.0],
            m: 1.0,
            radius: None,
            charge: 0.0,
            moment: 0.0,
            spin: 0.0,
            friction: 0.3,
            lifetime: None,
            integrity: None,
            temp: 293.0,
            specific_heat: 1000.0,
            absorption: 0.5,
            restitution: MaterialConfig::Flat(0.8),
            stiffness: MaterialConfig::Flat(1.0e4),
            color: None,
        }
    }
}

/// Zone shape, axis-aligned rectangle (extents may be `.inf`) or circle
#[derive(Deserialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ZoneShapeConfig {
    Rect { min: [f64; 2], max: [f64; 2] },
    Circle { center: [f64; 2], radius: f64 },
}

/// How a periodic zone detects a boundary crossing
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PeriodicTriggerConfig {
    Center, // the body center crosses the edge
    Radius, // the edge offset by the body radius
}

fn default_true() -> bool {
    true
}

/// One zone definition, tagged by family
#[derive(Deserialize, Debug, Clone)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ZoneConfig {
    Periodic {
        shape: ZoneShapeConfig,
        #[serde(default = "default_periodic_trigger")]
        trigger: PeriodicTriggerConfig,
        #[serde(default = "default_true")]
        enabled: bool,
    },
    Viscosity {
        shape: ZoneShapeConfig,
        coefficient: f64,
        #[serde(default = "default_true")]
        enabled: bool,
    },
    Field {
        shape: ZoneShapeConfig,
        force: [f64; 2],
        #[serde(default = "default_true")]
        enabled: bool,
    },
    Thermal {
        shape: ZoneShapeConfig,
        temperature: f64,
        transfer: f64,
        #[serde(default = "default_true")]
        enabled: bool,
    },
    Annihilation {
        shape: ZoneShapeConfig,
        #[serde(default)]
        burst: bool,
        #[serde(default = "default_true")]
        enabled: bool,
    },
    Chaos {
        shape: ZoneShapeConfig,
        strength: f64,
        #[serde(default = "default_chaos_frequency")]
        frequency: f64,
        #[serde(default = "default_chaos_scale")]
        spatial_scale: f64,
        #[serde(default = "default_true")]
        enabled: bool,
    },
    Vortex {
        shape: ZoneShapeConfig,
        strength: f64,
        #[serde(default = "default_true")]
        enabled: bool,
    },
    Null {
        shape: ZoneShapeConfig,
        #[serde(default)]
        no_gravity: bool,
        #[serde(default)]
        no_electric: bool,
        #[serde(default)]
        no_magnetic: bool,
        #[serde(default = "default_true")]
        enabled: bool,
    },
}

fn default_periodic_trigger() -> PeriodicTriggerConfig {
    PeriodicTriggerConfig::Center
}

fn default_chaos_frequency() -> f64 {
    1.0
}

fn default_chaos_scale() -> f64 {
    80.0
}

/// Runtime parameters of an elastic bond, shared by YAML entries and the
/// sandbox API
#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct BondConfig {
    pub rest_len: Option<f64>, // omitted -> current distance at creation
    pub stiffness: f64,
    pub damping: f64,
    pub nonlinearity: f64, // displacement exponent, 1 = Hooke
    pub break_tension: f64, // <= 0 never breaks
    pub amplitude: f64, // rest-length oscillation
    pub frequency: f64, // cycles per second
    pub rope: bool, // pull only
}

impl Default for BondConfig {
    fn default() -> Self {
        Self {
            rest_len: None,
            stiffness: 50.0,
            damping: 0.5,
            nonlinearity: 1.0,
            break_tension: 0.0,
            amplitude: 0.0,
            frequency: 0.0,
            rope: false,
        }
    }
}

/// One bond in a scenario file, endpoints are indices into the bodies list
#[derive(Deserialize, Debug, Clone)]
pub struct BondEntryConfig {
    pub a: usize,
    pub b: usize,
    #[serde(flatten)]
    pub params: BondConfig,
}

/// Solid line barrier between two points
#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct BarrierConfig {
    pub a: [f64; 2],
    pub b: [f64; 2],
    pub restitution: f64,
    pub friction: f64,
}

impl Default for BarrierConfig {
    fn default() -> Self {
        Self {
            a: [0.0, 0.0],
            b: [0.0, 0.0],
            restitution: 0.9,
            friction: 0.3,
        }
    }
}

/// Formula force field, one expression per acceleration component
#[derive(Deserialize, Debug, Clone, Default)]
pub struct FieldConfig {
    #[serde(default)]
    pub fx: String,
    #[serde(default)]
    pub fy: String,
}

/// Top-level scenario configuration loaded from YAML.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct ScenarioConfig {
    pub engine: EngineConfig, // long-range evaluation options
    pub parameters: ParametersConfig, // global numerical and physical parameters
    pub bodies: Vec<BodyConfig>, // initial bodies
    pub zones: Vec<ZoneConfig>, // zone definitions
    pub bonds: Vec<BondEntryConfig>, // bonds between body list indices
    pub barriers: Vec<BarrierConfig>, // solid line barriers
    pub fields: Vec<FieldConfig>, // formula force fields
}
