//! Deterministic lattice noise for chaos zones
//!
//! Produces a smooth pseudo-random 2D direction field from a hash of
//! (seed, time index, lattice cell). No state is kept anywhere: the same
//! seed, time and position always give the same vector, which keeps the
//! whole simulation reproducible and lets the trajectory predictor see the
//! identical chaos forces the live run will.

use crate::simulation::states::NVec2;

/// Hash one lattice corner to [-1, 1]. `salt` separates the x and y
/// component fields.
fn lattice(seed: u64, ti: u64, ix: i64, iy: i64, salt: u64) -> f64 {
    let h = seed
        .wrapping_mul(0x9e3779b97f4a7c15)
        .wrapping_add(ti.wrapping_mul(0xd1b54a32d192ed03))
        .wrapping_add((ix as u64).wrapping_mul(0x8cb92ba72f3d8dd7))
        .wrapping_add((iy as u64).wrapping_mul(0xaef17502108ef2d9))
        .wrapping_add(salt.wrapping_mul(0x2545f4914f6cdd1d));
    let mut x = (h ^ (h >> 32)) as u32;
    x ^= x << 13;
    x ^= x >> 17;
    x ^= x << 5;
    x ^= x << 13;
    x ^= x >> 17;
    x ^= x << 5;
    (x as f64 / u32::MAX as f64) * 2.0 - 1.0
}

/// Hermite smoothstep, zero derivative at both lattice planes.
fn smooth(t: f64) -> f64 {
    t * t * (3.0 - 2.0 * t)
}

/// Sample the noise field at position `p` and time `t`. `frequency` scales
/// how fast the field churns, `spatial_scale` is the lattice cell size.
/// Components stay within [-1, 1].
pub fn sample(seed: u64, t: f64, frequency: f64, p: NVec2, spatial_scale: f64) -> NVec2 {
    let scale = spatial_scale.max(1e-6);
    let u = t * frequency.max(0.0);
    let gx = p.x / scale;
    let gy = p.y / scale;

    let ti = u.floor();
    let ft = smooth(u - ti);
    let xi = gx.floor();
    let fx = smooth(gx - xi);
    let yi = gy.floor();
    let fy = smooth(gy - yi);

    let ti = ti as u64;
    let xi = xi as i64;
    let yi = yi as i64;

    let corner = |dt: u64, dx: i64, dy: i64, salt: u64| {
        lattice(seed, ti.wrapping_add(dt), xi.wrapping_add(dx), yi.wrapping_add(dy), salt)
    };
    let blend = |salt: u64| {
        let mut planes = [0.0; 2];
        for (k, plane) in planes.iter_mut().enumerate() {
            let dt = k as u64;
            let c00 = corner(dt, 0, 0, salt);
            let c10 = corner(dt, 1, 0, salt);
            let c01 = corner(dt, 0, 1, salt);
            let c11 = corner(dt, 1, 1, salt);
            let lo = c00 + (c10 - c00) * fx;
            let hi = c01 + (c11 - c01) * fx;
            *plane = lo + (hi - lo) * fy;
        }
        planes[0] + (planes[1] - planes[0]) * ft
    };

    NVec2::new(blend(0), blend(1))
}
