// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Warden Core
//!
//! Multi-tenant policy and permission control plane for autonomous agents.
//! Tenants (wallets) declare policies, bind them to agents through
//! permissions, and ask the validation engine in real time whether a
//! proposed agent action is allowed. Lifecycle transitions are mirrored
//! onto an on-chain registry, either live or simulated.
//!
//! # Architecture
//!
//! - **domain** — entities, the policy grammar, and port traits
//! - **application** — lifecycle manager, validation engine, auth
//! - **infrastructure** — PostgreSQL/in-memory stores, chain mirrors,
//!   webhook fan-out, configuration
//! - **presentation** — HTTP API

pub mod domain;
pub mod application;
pub mod infrastructure;
pub mod presentation;

pub use domain::*;
