#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use webhook_funnel::domain::funnel::{FunnelDefinition, TargetType};
use webhook_funnel::domain::ports::PayloadOpener;
use webhook_funnel::inbound::{CipherError, FunnelCrypto, delivery_signature, derive_key, encrypt};
use webhook_funnel::infrastructure::registry::FunnelRegistry;
use webhook_funnel::outbound::dispatch::Dispatcher;
use webhook_funnel::server::{RelayState, Server};

pub const SECRET: &str = "whsec_integration";

pub fn funnel(endpoint_id: &str, forward: &str) -> FunnelDefinition {
    FunnelDefinition {
        target_type: TargetType::Bot,
        target_id: "1001".to_string(),
        webhook_secret: SECRET.to_string(),
        endpoint_id: endpoint_id.to_string(),
        forward: forward.to_string(),
    }
}

pub fn state_for(funnels: Vec<FunnelDefinition>) -> RelayState {
    let registry = FunnelRegistry::from_funnels(funnels).unwrap();
    let dispatcher = Dispatcher::with_timeout(Duration::from_secs(2)).unwrap();
    RelayState::new(registry, dispatcher)
}

pub async fn spawn_relay(state: RelayState) -> String {
    let server = Server::new("127.0.0.1", 0, state).await.unwrap();

    let port = server.port();
    tokio::spawn(server.run());

    format!("http://127.0.0.1:{port}")
}

/// Encrypt and sign a payload the way a sender does. Returns (body, signature).
pub fn seal(secret: &str, nonce: &str, plaintext: &[u8]) -> (String, String) {
    let body = encrypt(&derive_key(secret, nonce), plaintext).unwrap();
    let signature = delivery_signature(secret, nonce, body.as_bytes());
    (body, signature)
}

/// Real crypto that counts how often it is used
#[derive(Default)]
pub struct CountingOpener {
    pub verifications: AtomicUsize,
    pub openings: AtomicUsize,
}

impl CountingOpener {
    pub fn calls(&self) -> usize {
        self.verifications.load(Ordering::SeqCst) + self.openings.load(Ordering::SeqCst)
    }
}

impl PayloadOpener for CountingOpener {
    fn verify(&self, secret: &str, nonce: &str, body: &[u8], signature: &str) -> bool {
        self.verifications.fetch_add(1, Ordering::SeqCst);
        FunnelCrypto.verify(secret, nonce, body, signature)
    }

    fn open(&self, secret: &str, nonce: &str, body: &[u8]) -> Result<Vec<u8>, CipherError> {
        self.openings.fetch_add(1, Ordering::SeqCst);
        FunnelCrypto.open(secret, nonce, body)
    }
}

pub fn counting_state(funnels: Vec<FunnelDefinition>) -> (RelayState, Arc<CountingOpener>) {
    let opener = Arc::new(CountingOpener::default());
    let state = state_for(funnels).with_opener(opener.clone());
    (state, opener)
}
