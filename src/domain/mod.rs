pub mod funnel;
pub mod ports;
