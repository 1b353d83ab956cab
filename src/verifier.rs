//! Per-proposal password check.
//!
//! Expected passwords come from configuration under
//! `PROPOSAL_PASSWORD_<RESOURCE ID IN UPPERCASE>`. They are compared in plain
//! text (there is no hashing), but in constant time.

use secrecy::{ExposeSecret, SecretString};
use std::collections::HashMap;
use subtle::ConstantTimeEq;

const PASSWORD_KEY_PREFIX: &str = "PROPOSAL_PASSWORD_";

/// Where expected passwords are looked up.
pub trait PasswordSource: Send + Sync {
    fn expected(&self, key: &str) -> Option<SecretString>;
}

/// Reads the process environment on every lookup, so rotating a password
/// only needs a restart of whatever injects the variable.
#[derive(Clone, Copy, Debug, Default)]
pub struct EnvPasswords;

impl PasswordSource for EnvPasswords {
    fn expected(&self, key: &str) -> Option<SecretString> {
        std::env::var(key)
            .ok()
            .filter(|value| !value.is_empty())
            .map(SecretString::from)
    }
}

/// Fixed map of configuration keys to passwords.
#[derive(Debug, Default)]
pub struct StaticPasswords {
    passwords: HashMap<String, SecretString>,
}

impl StaticPasswords {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the password for a resource id (the key transform is applied here).
    #[must_use]
    pub fn with(mut self, resource_id: &str, password: &str) -> Self {
        self.passwords.insert(
            password_key(resource_id),
            SecretString::from(password.to_string()),
        );
        self
    }
}

impl PasswordSource for StaticPasswords {
    fn expected(&self, key: &str) -> Option<SecretString> {
        self.passwords.get(key).cloned()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Verification {
    Valid,
    Invalid,
    /// No password configured for the resource; fails closed.
    NotConfigured { key: String },
}

impl Verification {
    #[must_use]
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }
}

pub struct PasswordVerifier {
    source: Box<dyn PasswordSource>,
}

impl std::fmt::Debug for PasswordVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordVerifier").finish_non_exhaustive()
    }
}

impl PasswordVerifier {
    #[must_use]
    pub fn new(source: impl PasswordSource + 'static) -> Self {
        Self {
            source: Box::new(source),
        }
    }

    #[must_use]
    pub fn verify(&self, resource_id: &str, candidate: &str) -> Verification {
        let key = password_key(resource_id);
        let Some(expected) = self.source.expected(&key) else {
            return Verification::NotConfigured { key };
        };

        if constant_time_eq(expected.expose_secret().as_bytes(), candidate.as_bytes()) {
            Verification::Valid
        } else {
            Verification::Invalid
        }
    }
}

/// Configuration key holding the password for `resource_id`.
#[must_use]
pub fn password_key(resource_id: &str) -> String {
    format!("{PASSWORD_KEY_PREFIX}{}", resource_id.to_uppercase())
}

fn constant_time_eq(expected: &[u8], provided: &[u8]) -> bool {
    expected.len() == provided.len() && expected.ct_eq(provided).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verifier() -> PasswordVerifier {
        PasswordVerifier::new(StaticPasswords::new().with("adb", "secret123"))
    }

    #[test]
    fn key_is_prefixed_and_uppercased() {
        assert_eq!(password_key("adb"), "PROPOSAL_PASSWORD_ADB");
        assert_eq!(password_key("acme-co"), "PROPOSAL_PASSWORD_ACME-CO");
    }

    #[test]
    fn exact_match_only() {
        let verifier = verifier();
        assert_eq!(verifier.verify("adb", "secret123"), Verification::Valid);
        assert_eq!(verifier.verify("adb", "secret124"), Verification::Invalid);
        assert_eq!(verifier.verify("adb", "secret123 "), Verification::Invalid);
        assert_eq!(verifier.verify("adb", "SECRET123"), Verification::Invalid);
        assert_eq!(verifier.verify("adb", ""), Verification::Invalid);
    }

    #[test]
    fn resource_id_case_maps_to_same_key() {
        assert!(verifier().verify("ADB", "secret123").is_valid());
    }

    #[test]
    fn unconfigured_resource_fails_closed() {
        assert_eq!(
            verifier().verify("acme", "secret123"),
            Verification::NotConfigured {
                key: "PROPOSAL_PASSWORD_ACME".to_string()
            }
        );
    }

    #[test]
    fn env_source_reads_process_environment() {
        temp_env::with_vars(
            [
                ("PROPOSAL_PASSWORD_ENVTEST", Some("from-env")),
                ("PROPOSAL_PASSWORD_EMPTYTEST", Some("")),
            ],
            || {
                let verifier = PasswordVerifier::new(EnvPasswords);
                assert!(verifier.verify("envtest", "from-env").is_valid());
                assert!(matches!(
                    verifier.verify("emptytest", ""),
                    Verification::NotConfigured { .. }
                ));
            },
        );
    }
}
