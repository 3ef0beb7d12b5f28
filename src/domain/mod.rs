// Domain layer: loan records and the ports the services talk through.

pub mod model;
pub mod ports;
