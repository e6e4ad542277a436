pub mod http_client;
pub mod provisioner;

pub use http_client::ProvisioningClient;
pub use provisioner::{ProvisionReport, Provisioner};
