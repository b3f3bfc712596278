//! Numerical and physical parameters for the sandbox
//!
//! `Parameters` holds the runtime settings every pass reads:
//! - fixed step size and speed limit,
//! - force constants (`G`, `ke`, `km`, `c`) and softening (`eps2`),
//! - per-force and subsystem toggles,
//! - thermal environment (`sigma`, ambient temperature),
//! - deterministic seed and trail length

#[derive(Debug, Clone)]
pub struct Parameters {
    pub h0: f64, // fixed step size
    pub speed_limit: f64, // hard velocity clamp
    pub eps2: f64, // softening floor for long-range forces
    pub G: f64, // gravitational constant
    pub ke: f64, // Coulomb constant
    pub km: f64, // magnetic dipole constant
    pub c: f64, // speed-of-light constant exposed to field formulas
    pub gravity: bool, // long-range toggles
    pub electric: bool,
    pub magnetic: bool,
    pub fragmentation: bool,
    pub thermodynamics: bool,
    pub sigma: f64, // radiative constant
    pub ambient_temp: Option<f64>, // None = vacuum
    pub seed: u64, // deterministic seed for chaos noise and the sandbox rng
    pub trail_len: usize, // positions kept per body trail
}

impl Default for Parameters {
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
