//! Typed configuration for `node`/`miner` processes.
//!
//! Simple structs constructed via `Default` with overridable fields, no
//! external configuration-file crate: the peer lists and ports are fixed,
//! compiled-in defaults, but remain a typed seam a future CLI or
//! environment-driven override could plug into.

use std::path::PathBuf;

/// The fixed peer topology shared by every node and miner process.
///
/// Both [`NodeConfig`] and [`MinerConfig`] embed one of these so the two
/// process kinds agree on who to gossip to without duplicating the port
/// literals.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NetworkConfig {
    /// Ports bound by node processes on `localhost`.
    pub node_ports: Vec<u16>,
    /// Ports bound by miner processes on `localhost`.
    pub miner_ports: Vec<u16>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            node_ports: (5555..=5559).collect(),
            miner_ports: (2221..=2225).collect(),
        }
    }
}

impl NetworkConfig {
    /// Every peer port except `own_port`, across both roles: the set a
    /// process gossips transactions and blocks to.
    pub fn peers_excluding(&self, own_port: u16) -> Vec<u16> {
        self.node_ports
            .iter()
            .chain(self.miner_ports.iter())
            .copied()
            .filter(|port| *port != own_port)
            .collect()
    }

    /// Node ports only, except `own_port`: the set queried for chain height
    /// and sync, since only nodes serve `BlockHeight`/`SyncBlockchain`
    /// (`node.go`'s `nodeList`, also the only list `miner.go` ever queries).
    pub fn node_peers_excluding(&self, own_port: u16) -> Vec<u16> {
        self.node_ports
            .iter()
            .copied()
            .filter(|port| *port != own_port)
            .collect()
    }
}

/// Configuration for a `node` process.
#[derive(Clone, Debug)]
pub struct NodeConfig {
    /// Port this node binds on `localhost`.
    pub bind_port: u16,
    /// Directory the block store keeps its per-block files in.
    pub storage_dir: PathBuf,
    /// File the PGP public-key cache is persisted to.
    pub pgp_cache_path: PathBuf,
    pub network: NetworkConfig,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            bind_port: 5555,
            storage_dir: PathBuf::from("./node-data/blocks"),
            pgp_cache_path: PathBuf::from("./node-data/pgp_cache.json"),
            network: NetworkConfig::default(),
        }
    }
}

/// Configuration for a `miner` process.
#[derive(Clone, Debug)]
pub struct MinerConfig {
    /// Port this miner binds on `localhost`.
    pub bind_port: u16,
    /// Wallet address credited with the coinbase reward of blocks this
    /// process mines.
    pub miner_address: String,
    /// Proof-of-work target every block this process mines must beat.
    pub target_bits: f64,
    /// Directory the block store keeps its per-block files in.
    pub storage_dir: PathBuf,
    pub network: NetworkConfig,
}

impl Default for MinerConfig {
    fn default() -> Self {
        Self {
            bind_port: 2221,
            miner_address: String::new(),
            target_bits: 2f64.powi(231),
            storage_dir: PathBuf::from("./miner-data/blocks"),
            network: NetworkConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn network_config_matches_fixed_port_ranges() {
        let net = NetworkConfig::default();
        assert_eq!(net.node_ports, vec![5555, 5556, 5557, 5558, 5559]);
        assert_eq!(net.miner_ports, vec![2221, 2222, 2223, 2224, 2225]);
    }

    #[test]
    fn peers_excluding_drops_only_own_port() {
        let net = NetworkConfig::default();
        let peers = net.peers_excluding(5555);
        assert_eq!(peers.len(), 9);
        assert!(!peers.contains(&5555));
        assert!(peers.contains(&2221));
    }

    #[test]
    fn node_peers_excluding_drops_miner_ports_entirely() {
        let net = NetworkConfig::default();
        let peers = net.node_peers_excluding(5556);
        assert_eq!(peers.len(), 4);
        assert!(!peers.contains(&5556));
        assert!(peers.iter().all(|p| (5555..=5559).contains(p)));
    }

    #[test]
    fn node_and_miner_configs_share_network_defaults() {
        let node = NodeConfig::default();
        let miner = MinerConfig::default();
        assert_eq!(node.network, miner.network);
    }
}
