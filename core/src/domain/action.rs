// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! The action shape submitted for validation.
//!
//! An action is what an agent *proposes* to do: a lowercase action token
//! plus optional asset, amount, chain, and destination fields, and a
//! free-form `data` map that conditions may inspect. Neither address
//! format nor token id is validated here beyond case-insensitive
//! equality during matching.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Action {
    /// Action token, e.g. `swap`, `transfer`. Matched case-insensitively.
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub token: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub protocol: String,
    /// Decimal string, non-negative, unbounded. Empty means "no amount".
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub amount: String,
    /// Chain id; 0 means unspecified.
    #[serde(default, skip_serializing_if = "chain_is_unset")]
    pub chain: i64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub to: String,
    /// Arbitrary extra fields, addressable from policy conditions.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub data: Map<String, Value>,
}

fn chain_is_unset(chain: &i64) -> bool {
    *chain == 0
}

impl Action {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            ..Default::default()
        }
    }
}
