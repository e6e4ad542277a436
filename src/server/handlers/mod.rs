pub mod funnel;
pub mod status;
