//! Time-windowed one-time tokens.
//!
//! Stateless: a token is the truncated keyed digest of the current time
//! bucket, the action and the user. It verifies only while the wall clock
//! stays inside the bucket it was minted in; one tick later it is dead. No
//! grace window, which keeps the scheme state-free.

use std::time::{SystemTime, UNIX_EPOCH};

use subtle::ConstantTimeEq;
use xxhash_rust::xxh64::xxh64;

use crate::config::NonceConfig;
use crate::structs::Fatal;

/// Token length in hex characters.
const TOKEN_LEN: usize = 10;

/// User identity substituted when none is given.
const ANONYMOUS_USER: &str = "-1";

pub struct NonceFactory {
    lifetime_seconds: u64,
    secret: String,
}

impl NonceFactory {
    pub fn new(config: NonceConfig) -> Self {
        Self {
            lifetime_seconds: config.lifetime_seconds.max(1),
            secret: config.secret,
        }
    }

    fn now_seconds() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }

    /// Current time bucket.
    pub fn tick(&self) -> u64 {
        self.tick_at(Self::now_seconds())
    }

    /// Time bucket for an explicit wall-clock second, for deterministic
    /// tests.
    pub fn tick_at(&self, seconds: u64) -> u64 {
        seconds.div_ceil(self.lifetime_seconds)
    }

    /// Mint a token for the current tick.
    pub fn create(&self, action: &str, user: Option<&str>) -> String {
        self.create_at(Self::now_seconds(), action, user)
    }

    /// Mint a token for an explicit wall-clock second.
    pub fn create_at(&self, seconds: u64, action: &str, user: Option<&str>) -> String {
        let user = user.unwrap_or(ANONYMOUS_USER);
        let tick = self.tick_at(seconds);
        let material = format!("{}{}{}", tick, action, user);
        let digest = xxh64(material.as_bytes(), xxh64(self.secret.as_bytes(), 0));
        let hex = format!("{:016x}", digest);
        hex[..TOKEN_LEN].to_string()
    }

    /// Verify a token against the current tick. Mismatch is fatal.
    pub fn verify(&self, action: &str, token: &str, user: Option<&str>) -> Result<(), Fatal> {
        if self.matches(Self::now_seconds(), action, token, user) {
            Ok(())
        } else {
            Err(Fatal::forbidden("Unauthorized action or expired link"))
        }
    }

    /// Non-fatal verification: returns `fallback` instead of aborting.
    pub fn verify_or(
        &self,
        action: &str,
        token: &str,
        user: Option<&str>,
        fallback: bool,
    ) -> bool {
        if self.matches(Self::now_seconds(), action, token, user) {
            true
        } else {
            fallback
        }
    }

    fn matches(&self, seconds: u64, action: &str, token: &str, user: Option<&str>) -> bool {
        let expected = self.create_at(seconds, action, user);
        expected.len() == token.len() && expected.as_bytes().ct_eq(token.as_bytes()).into()
    }

    #[cfg(test)]
    fn verify_at(&self, seconds: u64, action: &str, token: &str, user: Option<&str>) -> bool {
        self.matches(seconds, action, token, user)
    }
}
