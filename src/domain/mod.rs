// Domain layer: core models and ports (interfaces) shared by the engine and adapters.

pub mod model;
pub mod ports;
