// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Sign-in nonce store: the only process-wide mutable structure. A
//! bounded TTL cache behind its own mutex; expired entries are swept
//! opportunistically on issue, and the capacity bound evicts the oldest
//! entry rather than growing without limit.

use rand::RngCore;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);
const DEFAULT_CAPACITY: usize = 10_000;

pub struct NonceStore {
    entries: Mutex<HashMap<String, Instant>>,
    ttl: Duration,
    capacity: usize,
}

impl Default for NonceStore {
    fn default() -> Self {
        Self::new(DEFAULT_TTL, DEFAULT_CAPACITY)
    }
}

impl NonceStore {
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
            capacity,
        }
    }

    /// Issue a fresh 16-byte nonce, sweeping expired entries while the
    /// lock is held.
    pub fn issue(&self) -> String {
        let mut bytes = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut bytes);
        let nonce = hex::encode(bytes);

        let expiry = Instant::now() + self.ttl;
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());

        let now = Instant::now();
        entries.retain(|_, exp| *exp > now);
        if entries.len() >= self.capacity {
            if let Some(oldest) = entries
                .iter()
                .min_by_key(|(_, exp)| **exp)
                .map(|(k, _)| k.clone())
            {
                entries.remove(&oldest);
            }
        }

        entries.insert(nonce.clone(), expiry);
        nonce
    }

    /// Single-use consume: true iff the nonce exists and has not
    /// expired. The entry is removed either way.
    pub fn consume(&self, nonce: &str) -> bool {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        match entries.remove(nonce) {
            Some(expiry) => expiry > Instant::now(),
            None => false,
        }
    }
}
