// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod audit_log;
pub mod auth;
pub mod chain;
pub mod config;
pub mod db;
pub mod repositories;
pub mod webhooks;

pub use config::Config;
pub use db::Database;
