pub mod physim_vis2d;
