// Domain layer: delivery/fare models and the ports the pipeline is built against.

pub mod model;
pub mod ports;
