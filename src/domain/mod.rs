// Domain layer: plan model and the runner port. No process or config code here.

pub mod model;
pub mod ports;
