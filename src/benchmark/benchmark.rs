use std::time::Instant;

use crate::configuration::config::BodyConfig;
use crate::simulation::engine::Engine;
use crate::simulation::forces::{long_range_accels, null_masks};
use crate::simulation::params::Parameters;
use crate::simulation::sandbox::Sandbox;
use crate::simulation::states::{Body, NVec2, System};

/// Time one long-range pass, direct vs quadtree, over growing system sizes.
pub fn bench_long_range() {
    let ns = [200, 400, 800, 1600, 3200, 6400];

    for n in ns {
        let sys = make_system(n);
        let params = make_params();
        let direct = Engine {
            barnes_hut: false,
            theta: 0.5,
        };
        let tree = Engine {
            barnes_hut: true,
            theta: 0.5,
        };

        let mut masks = Vec::new();
        null_masks(&sys, &mut masks);
        let mut out = vec![NVec2::zeros(); sys.bodies.slot_count()];
        let mut frag = Vec::new();

        // Warm up both paths
        long_range_accels(&sys, &direct, &params, &masks, &mut out, &mut frag);
        long_range_accels(&sys, &tree, &params, &masks, &mut out, &mut frag);
        frag.clear();

        let t0 = Instant::now();
        long_range_accels(&sys, &direct, &params, &masks, &mut out, &mut frag);
        let dt_direct = t0.elapsed().as_secs_f64();

        let t1 = Instant::now();
        long_range_accels(&sys, &tree, &params, &masks, &mut out, &mut frag);
        let dt_tree = t1.elapsed().as_secs_f64();

        println!(
            "N = {n:5}, direct = {:8.6} s, quadtree = {:8.6} s",
            dt_direct, dt_tree
        );
    }
}

/// Time full ticks of the sandbox pipeline per backend.
pub fn bench_tick() {
    let ns = [200, 400, 800, 1600, 3200];
    let steps = 10; // ticks timed per backend

    for n in ns {
        let mut direct = make_sandbox(n, false);
        let mut tree = make_sandbox(n, true);

        // Warm up
        direct.advance(true);
        tree.advance(true);

        let t0 = Instant::now();
        for _ in 0..steps {
            direct.advance(true);
        }
        let direct_per_step = t0.elapsed().as_secs_f64() / steps as f64;

        let t1 = Instant::now();
        for _ in 0..steps {
            tree.advance(true);
        }
        let tree_per_step = t1.elapsed().as_secs_f64() / steps as f64;

        println!(
            "N = {:5}, direct tick = {:8.6} s, quadtree tick = {:8.6} s",
            n, direct_per_step, tree_per_step
        );
    }
}

/// Deterministic spread of `n` unit masses, no rand needed.
fn make_system(n: usize) -> System {
    let mut sys = System::new();
    for i in 0..n {
        let i_f = i as f64;
        let mut body = Body {
            x: NVec2::new((i_f * 0.37).sin() * 900.0, (i_f * 0.13).cos() * 900.0),
            radius: 1.0,
            ..Body::default()
        };
        body.set_mass(1.0);
        sys.bodies.insert(body);
    }
    sys
}

fn make_params() -> Parameters {
    Parameters {
        gravity: true,
        electric: false,
        magnetic: false,
        fragmentation: false,
        thermodynamics: false,
        ..Parameters::default()
    }
}

fn make_sandbox(n: usize, barnes_hut: bool) -> Sandbox {
    let engine = Engine {
        barnes_hut,
        theta: 0.5,
    };
    let mut sandbox = Sandbox::new(engine, make_params());
    for i in 0..n {
        let i_f = i as f64;
        sandbox.create_body(&BodyConfig {
            x: [(i_f * 0.37).sin() * 900.0, (i_f * 0.13).cos() * 900.0],
            radius: Some(1.0),
            ..BodyConfig::default()
        });
    }
    sandbox
}
