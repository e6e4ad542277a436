use hmac::{Hmac, Mac};
use sha2::Sha512;

type HmacSha512 = Hmac<Sha512>;

/// Compute hex-encoded HMAC-SHA512 of `message` keyed by `key`
pub fn sign(key: &[u8], message: &[u8]) -> String {
    let mut mac = match HmacSha512::new_from_slice(key) {
        Ok(mac) => mac,
        Err(_) => unreachable!("HMAC key can be of any size, as per crate documentation"),
    };

    mac.update(message);

    hex::encode(mac.finalize().into_bytes())
}

/// Signature a sender attaches to a delivery.
///
/// Two stages: the secret signs the body, then the nonce string signs that
/// hex token. Changing either stage breaks compatibility with senders.
pub fn delivery_signature(secret: &str, nonce: &str, body: &[u8]) -> String {
    let token = sign(secret.as_bytes(), body);
    sign(nonce.as_bytes(), token.as_bytes())
}

/// Check a provided signature against the expected two-stage HMAC
pub fn verify(secret: &str, nonce: &str, body: &[u8], provided: &str) -> bool {
    delivery_signature(secret, nonce, body) == provided
}
