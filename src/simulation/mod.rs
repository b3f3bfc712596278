pub mod states;
pub mod arena;
pub mod params;
pub mod engine;
pub mod zones;
pub mod bonds;
pub mod barriers;
pub mod formula;
pub mod noise;
pub mod grid;
pub mod quadtree;
pub mod forces;
pub mod collision;
pub mod thermal;
pub mod fragmentation;
pub mod integrator;
pub mod history;
pub mod sandbox;
pub mod prediction;
