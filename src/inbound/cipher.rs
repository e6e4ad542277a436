use aes_gcm::aead::{Aead, AeadCore, OsRng};
use aes_gcm::{Aes256Gcm, Key, KeyInit, Nonce};
use sha2::{Digest, Sha256};

/// Nonce length for AES-GCM (96 bits)
pub const NONCE_LEN: usize = 12;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CipherError {
    #[error("Payload is not valid hex: {0}")]
    Decode(#[from] hex::FromHexError),

    #[error("Payload is {0} bytes, shorter than the {NONCE_LEN}-byte nonce")]
    ShortBuffer(usize),

    #[error("Could not open payload")]
    Authentication,
}

/// Derive the payload key as SHA-256 over `secret || nonce`
pub fn derive_key(secret: &str, nonce: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hasher.update(nonce.as_bytes());
    hasher.finalize().into()
}

/// Decrypt a hex body laid out as `nonce || ciphertext+tag`
pub fn decrypt(key: &[u8; 32], body: &[u8]) -> Result<Vec<u8>, CipherError> {
    let raw = hex::decode(body)?;
    if raw.len() < NONCE_LEN {
        return Err(CipherError::ShortBuffer(raw.len()));
    }

    let (nonce, ciphertext) = raw.split_at(NONCE_LEN);
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));

    cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| CipherError::Authentication)
}

/// Sender-side counterpart of [`decrypt`]: random nonce prefix, hex output
pub fn encrypt(key: &[u8; 32], plaintext: &[u8]) -> Result<String, CipherError> {
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

    let ciphertext = cipher
        .encrypt(&nonce, plaintext)
        .map_err(|_| CipherError::Authentication)?;

    let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    sealed.extend_from_slice(&nonce);
    sealed.extend_from_slice(&ciphertext);
    Ok(hex::encode(sealed))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_key_is_plain_concatenation() {
        // No separator between the two inputs
        assert_eq!(derive_key("ab", "cd"), derive_key("a", "bcd"));
        assert_ne!(derive_key("secret", "n1"), derive_key("secret", "n2"));
    }

    #[test]
    fn test_derive_key_known_vector() {
        // sha256("abc")
        assert_eq!(
            hex::encode(derive_key("a", "bc")),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_encrypt_then_decrypt() -> Result<(), CipherError> {
        let key = derive_key("whsec_test", "nonce-1");
        let plaintext = br#"{"event":"message.created","id":42}"#;

        let body = encrypt(&key, plaintext)?;
        assert_eq!(decrypt(&key, body.as_bytes())?, plaintext.to_vec());
        Ok(())
    }

    #[test]
    fn test_empty_plaintext() -> Result<(), CipherError> {
        let key = derive_key("whsec_test", "nonce-1");

        let body = encrypt(&key, b"")?;
        // nonce + 16 byte tag
        assert_eq!(body.len(), (NONCE_LEN + 16) * 2);
        assert!(decrypt(&key, body.as_bytes())?.is_empty());
        Ok(())
    }

    #[test]
    fn test_decrypt_rejects_non_hex() {
        let key = derive_key("s", "n");
        assert!(matches!(
            decrypt(&key, b"not hex at all"),
            Err(CipherError::Decode(_))
        ));
    }

    #[test]
    fn test_decrypt_rejects_short_buffer() {
        let key = derive_key("s", "n");
        let short = hex::encode([0u8; NONCE_LEN - 1]);

        assert_eq!(
            decrypt(&key, short.as_bytes()),
            Err(CipherError::ShortBuffer(NONCE_LEN - 1))
        );
        assert_eq!(decrypt(&key, b""), Err(CipherError::ShortBuffer(0)));
    }

    #[test]
    fn test_decrypt_rejects_wrong_key() -> Result<(), CipherError> {
        let body = encrypt(&derive_key("s", "n1"), b"payload")?;

        assert_eq!(
            decrypt(&derive_key("s", "n2"), body.as_bytes()),
            Err(CipherError::Authentication)
        );
        Ok(())
    }

    #[test]
    fn test_decrypt_rejects_tampered_ciphertext() -> Result<(), CipherError> {
        let key = derive_key("s", "n");
        let mut raw = hex::decode(encrypt(&key, b"payload")?)?;
        let last = raw.len() - 1;
        raw[last] ^= 0x01;

        assert_eq!(
            decrypt(&key, hex::encode(raw).as_bytes()),
            Err(CipherError::Authentication)
        );
        Ok(())
    }

    #[test]
    fn test_nonce_only_buffer_fails_authentication() {
        let key = derive_key("s", "n");
        let nonce_only = hex::encode([7u8; NONCE_LEN]);

        assert_eq!(
            decrypt(&key, nonce_only.as_bytes()),
            Err(CipherError::Authentication)
        );
    }
}
