// Domain layer: value objects, canonical label sets and the ports that
// external classifiers implement.

pub mod assessment;
pub mod labels;
pub mod model;
pub mod ports;
