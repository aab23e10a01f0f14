// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Chain mirror implementations and the multi-chain routing façade.
//! Lifecycle operations run against the primary chain; constraint sync
//! routes to the chain an agent's smart account is bound to.

pub mod live;
pub mod simulated;

use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info};

use crate::domain::chain::ChainMirror;
use crate::infrastructure::config::ChainSet;

pub use live::LiveMirror;
pub use simulated::SimulatedMirror;

/// One mirror per configured chain id plus a designated primary.
pub struct MirrorRouter {
    mirrors: HashMap<i64, Arc<dyn ChainMirror>>,
    primary: i64,
}

impl MirrorRouter {
    pub fn new(mirrors: HashMap<i64, Arc<dyn ChainMirror>>, primary: i64) -> Self {
        Self { mirrors, primary }
    }

    /// Build the per-chain mirrors from config. A chain without a
    /// deployer key — or whose key/RPC fails to initialize — gets the
    /// simulated mirror rather than failing startup.
    pub fn from_config(chains: &ChainSet) -> Self {
        let mut mirrors: HashMap<i64, Arc<dyn ChainMirror>> = HashMap::new();

        for cfg in &chains.chains {
            let mirror: Arc<dyn ChainMirror> = if cfg.deployer_private_key.trim().is_empty() {
                info!(chain_id = cfg.chain_id, "no deployer key configured, using simulated mirror");
                Arc::new(SimulatedMirror::new(cfg.chain_id))
            } else {
                match LiveMirror::connect(cfg) {
                    Ok(mirror) => {
                        info!(chain_id = cfg.chain_id, rpc_url = %cfg.rpc_url, "chain mirror connected in live mode");
                        Arc::new(mirror)
                    }
                    Err(e) => {
                        error!(
                            chain_id = cfg.chain_id,
                            error = %e,
                            "live mirror initialization failed, falling back to simulated mode"
                        );
                        Arc::new(SimulatedMirror::new(cfg.chain_id))
                    }
                }
            };
            mirrors.insert(cfg.chain_id, mirror);
        }

        Self::new(mirrors, chains.primary)
    }

    pub fn primary(&self) -> Arc<dyn ChainMirror> {
        self.mirrors
            .get(&self.primary)
            .cloned()
            .unwrap_or_else(|| Arc::new(SimulatedMirror::new(self.primary)))
    }

    pub fn for_chain(&self, chain_id: i64) -> Option<Arc<dyn ChainMirror>> {
        self.mirrors.get(&chain_id).cloned()
    }

    pub fn supported_chains(&self) -> Vec<i64> {
        let mut ids: Vec<i64> = self.mirrors.keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::config::{ChainConfig, ChainSet};

    #[test]
    fn test_from_config_defaults_to_simulated() {
        let chains = ChainSet {
            primary: 31337,
            chains: vec![
                ChainConfig {
                    chain_id: 31337,
                    ..Default::default()
                },
                ChainConfig {
                    chain_id: 8453,
                    ..Default::default()
                },
            ],
        };
        let router = MirrorRouter::from_config(&chains);
        assert!(router.primary().is_simulated());
        assert_eq!(router.supported_chains(), vec![8453, 31337]);
        assert!(router.for_chain(8453).is_some());
        assert!(router.for_chain(1).is_none());
    }
}
