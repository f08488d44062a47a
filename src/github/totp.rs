use anyhow::{Context, Result};
use chrono::Utc;
use data_encoding::BASE32_NOPAD;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretSlice};
use sha1::Sha1;

const STEP_SECONDS: u64 = 30;
const DIGITS: u32 = 6;

/// RFC 6238 one-time password generator (HMAC-SHA1, 30s step, 6 digits)
pub struct Totp {
    key: SecretSlice<u8>,
}

impl Totp {
    /// Build a generator from a base32 seed as shown by GitHub's 2FA setup page
    pub fn new(seed: &str) -> Result<Self> {
        let normalized: String = seed
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '=')
            .map(|c| c.to_ascii_uppercase())
            .collect();
        anyhow::ensure!(!normalized.is_empty(), "TOTP seed is empty");

        let key = BASE32_NOPAD
            .decode(normalized.as_bytes())
            .context("TOTP seed is not valid base32")?;

        Ok(Self {
            key: SecretSlice::from(key),
        })
    }

    /// Code valid at the given unix time
    pub fn at(&self, unix_seconds: u64) -> String {
        let counter = unix_seconds / STEP_SECONDS;

        let mut mac = Hmac::<Sha1>::new_from_slice(self.key.expose_secret())
            .expect("HMAC can take key of any size");
        mac.update(&counter.to_be_bytes());
        let hash = mac.finalize().into_bytes();

        let offset = (hash[hash.len() - 1] & 0x0f) as usize;
        let binary = u32::from_be_bytes([
            hash[offset] & 0x7f,
            hash[offset + 1],
            hash[offset + 2],
            hash[offset + 3],
        ]);

        format!("{:0width$}", binary % 10u32.pow(DIGITS), width = DIGITS as usize)
    }

    /// Code valid right now
    pub fn now(&self) -> String {
        self.at(Utc::now().timestamp().max(0) as u64)
    }
}

impl std::fmt::Debug for Totp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Totp(<redacted>)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // base32 of the RFC 6238 SHA1 test key "12345678901234567890"
    const RFC_SEED: &str = "GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ";

    #[test]
    fn test_rfc6238_vectors() {
        let totp = Totp::new(RFC_SEED).unwrap();
        assert_eq!(totp.at(59), "287082");
        assert_eq!(totp.at(1111111109), "081804");
        assert_eq!(totp.at(1111111111), "050471");
        assert_eq!(totp.at(1234567890), "005924");
        assert_eq!(totp.at(2000000000), "279037");
        assert_eq!(totp.at(20000000000), "353130");
    }

    #[test]
    fn test_seed_is_normalized() {
        let spaced = Totp::new("gezd gnbv gy3t qojq gezd gnbv gy3t qojq").unwrap();
        assert_eq!(spaced.at(59), "287082");
    }

    #[test]
    fn test_same_window_same_code() {
        let totp = Totp::new(RFC_SEED).unwrap();
        assert_eq!(totp.at(30), totp.at(59));
        assert_ne!(totp.at(59), totp.at(60));
        assert_eq!(totp.now().len(), 6);
    }

    #[test]
    fn test_invalid_seed_rejected() {
        assert!(Totp::new("").is_err());
        assert!(Totp::new("not-base32!").is_err());
    }

    #[test]
    fn test_debug_is_redacted() {
        let totp = Totp::new(RFC_SEED).unwrap();
        assert_eq!(format!("{:?}", totp), "Totp(<redacted>)");
    }
}
