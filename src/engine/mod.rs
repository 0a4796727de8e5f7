// Engine modules: physics, shared simulation state, driver loop

pub mod game_loop;
pub mod physics;
pub mod simulation;
