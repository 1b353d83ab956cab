//! Session sealing with AES-256-GCM.
//!
//! Blob layout, base64 encoded: `nonce (12 bytes) || tag (16 bytes) || ciphertext`.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Key, Nonce,
};
use base64ct::{Base64, Encoding};
use hkdf::Hkdf;
use rand::{rngs::OsRng, RngCore};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;

use super::{Session, SessionError};

const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;
const KEY_LEN: usize = 32;

// Static salt: the key must be reproducible from the secret alone.
const KEY_SALT: &[u8] = b"gatehouse.session.salt.v1";
const KEY_INFO: &[u8] = b"gatehouse session cookie aes-256-gcm";

#[derive(Clone)]
pub struct SessionCodec {
    cipher: Aes256Gcm,
}

impl std::fmt::Debug for SessionCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCodec")
            .field("cipher", &"***")
            .finish()
    }
}

impl SessionCodec {
    /// Derive the cookie key from the server secret.
    ///
    /// # Errors
    /// Returns an error if the secret is empty.
    pub fn new(secret: &SecretString) -> Result<Self, SessionError> {
        let secret = secret.expose_secret();
        if secret.trim().is_empty() {
            return Err(SessionError::EmptySecret);
        }

        let hk = Hkdf::<Sha256>::new(Some(KEY_SALT), secret.as_bytes());
        let mut key = [0u8; KEY_LEN];
        hk.expand(KEY_INFO, &mut key)
            .map_err(|_| SessionError::KeyDerivation)?;

        Ok(Self {
            cipher: Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key)),
        })
    }

    /// Seal a session into an opaque cookie value. A fresh nonce is drawn on
    /// every call, so identical sessions never produce identical blobs.
    ///
    /// # Errors
    /// Returns an error if serialization or encryption fails.
    pub fn encrypt(&self, session: &Session) -> Result<String, SessionError> {
        let plaintext = serde_json::to_vec(session)?;

        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        // aes-gcm appends the tag; the cookie format carries it up front.
        let sealed = self
            .cipher
            .encrypt(nonce, plaintext.as_slice())
            .map_err(|_| SessionError::Encrypt)?;
        let (ciphertext, tag) = sealed.split_at(sealed.len() - TAG_LEN);

        let mut blob = Vec::with_capacity(NONCE_LEN + TAG_LEN + ciphertext.len());
        blob.extend_from_slice(&nonce_bytes);
        blob.extend_from_slice(tag);
        blob.extend_from_slice(ciphertext);

        Ok(Base64::encode_string(&blob))
    }

    /// Open a cookie value. Any failure (bad base64, short input, tag
    /// mismatch, unexpected JSON) yields `None`.
    #[must_use]
    pub fn decrypt(&self, blob: &str) -> Option<Session> {
        let data = Base64::decode_vec(blob.trim()).ok()?;
        if data.len() < NONCE_LEN + TAG_LEN {
            return None;
        }

        let (nonce_bytes, rest) = data.split_at(NONCE_LEN);
        let (tag, ciphertext) = rest.split_at(TAG_LEN);

        let mut sealed = Vec::with_capacity(ciphertext.len() + TAG_LEN);
        sealed.extend_from_slice(ciphertext);
        sealed.extend_from_slice(tag);

        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce_bytes), sealed.as_slice())
            .ok()?;

        serde_json::from_slice(&plaintext).ok()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn codec(secret: &str) -> SessionCodec {
        SessionCodec::new(&SecretString::from(secret.to_string())).unwrap()
    }

    #[test]
    fn encrypt_decrypt_roundtrip() -> anyhow::Result<()> {
        let codec = codec("correct horse battery staple");
        let session = Session::new("adb", 1_700_000_000_123);

        let blob = codec.encrypt(&session)?;
        assert_eq!(codec.decrypt(&blob), Some(session));
        Ok(())
    }

    #[test]
    fn fresh_nonce_per_call() -> anyhow::Result<()> {
        let codec = codec("secret");
        let session = Session::new("adb", 42);

        assert_ne!(codec.encrypt(&session)?, codec.encrypt(&session)?);
        Ok(())
    }

    #[test]
    fn key_is_reproducible_from_secret() -> anyhow::Result<()> {
        let blob = codec("shared").encrypt(&Session::new("adb", 7))?;
        assert!(codec("shared").decrypt(&blob).is_some());
        assert!(codec("different").decrypt(&blob).is_none());
        Ok(())
    }

    #[test]
    fn any_flipped_byte_is_rejected() -> anyhow::Result<()> {
        let codec = codec("secret");
        let blob = codec.encrypt(&Session::new("adb", 1_700_000_000_000))?;
        let bytes = Base64::decode_vec(&blob).unwrap();

        for index in 0..bytes.len() {
            let mut tampered = bytes.clone();
            if let Some(byte) = tampered.get_mut(index) {
                *byte ^= 0x01;
            }
            let tampered = Base64::encode_string(&tampered);
            assert!(
                codec.decrypt(&tampered).is_none(),
                "tampering byte {index} went unnoticed"
            );
        }
        Ok(())
    }

    #[test]
    fn malformed_input_is_rejected() {
        let codec = codec("secret");
        assert!(codec.decrypt("").is_none());
        assert!(codec.decrypt("not base64 %%%").is_none());
        assert!(codec.decrypt(&Base64::encode_string(&[0u8; 20])).is_none());
    }

    #[test]
    fn empty_secret_is_refused() {
        let result = SessionCodec::new(&SecretString::from("  ".to_string()));
        assert!(matches!(result, Err(SessionError::EmptySecret)));
    }
}
