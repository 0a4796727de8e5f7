// Core helpers shared by the engine and the network layer

pub mod math;
pub mod sync;
