// Verification and decryption of inbound funnel deliveries
//
//   signature – two-stage HMAC-SHA512 over the hex body
//   cipher    – SHA-256 key derivation and AES-256-GCM opening

pub mod cipher;
pub mod signature;

pub use cipher::{CipherError, NONCE_LEN, decrypt, derive_key, encrypt};
pub use signature::{delivery_signature, sign, verify};

use crate::domain::ports::PayloadOpener;

/// Stateless [`PayloadOpener`] backed by the real crypto
#[derive(Debug, Clone, Copy, Default)]
pub struct FunnelCrypto;

impl PayloadOpener for FunnelCrypto {
    fn verify(&self, secret: &str, nonce: &str, body: &[u8], signature: &str) -> bool {
        signature::verify(secret, nonce, body, signature)
    }

    fn open(&self, secret: &str, nonce: &str, body: &[u8]) -> Result<Vec<u8>, CipherError> {
        let key = derive_key(secret, nonce);
        decrypt(&key, body)
    }
}
