pub mod dispatch;
pub mod provisioning;
