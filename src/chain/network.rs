//! Network selector for the chain the registry contract is deployed on

use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Network {
    Base,
    BaseSepolia,
    Celo,
    CeloAlfajores,
    /// Anvil/Hardhat dev node
    Local,
    Custom(u64),
}

impl Network {
    pub fn chain_id(&self) -> u64 {
        match self {
            Network::Base => 8453,
            Network::BaseSepolia => 84532,
            Network::Celo => 42220,
            Network::CeloAlfajores => 44787,
            Network::Local => 31337,
            Network::Custom(id) => *id,
        }
    }

    pub fn from_chain_id(chain_id: u64) -> Self {
        match chain_id {
            8453 => Network::Base,
            84532 => Network::BaseSepolia,
            42220 => Network::Celo,
            44787 => Network::CeloAlfajores,
            31337 => Network::Local,
            other => Network::Custom(other),
        }
    }

    pub fn is_testnet(&self) -> bool {
        matches!(
            self,
            Network::BaseSepolia | Network::CeloAlfajores | Network::Local
        )
    }
}

impl FromStr for Network {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "base" | "base-mainnet" => Ok(Network::Base),
            "base-sepolia" => Ok(Network::BaseSepolia),
            "celo" | "celo-mainnet" => Ok(Network::Celo),
            "celo-alfajores" | "alfajores" => Ok(Network::CeloAlfajores),
            "local" | "anvil" | "hardhat" => Ok(Network::Local),
            other => other
                .parse::<u64>()
                .map(Network::from_chain_id)
                .map_err(|_| format!("unknown network '{}'", s)),
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Network::Base => write!(f, "base"),
            Network::BaseSepolia => write!(f, "base-sepolia"),
            Network::Celo => write!(f, "celo"),
            Network::CeloAlfajores => write!(f, "celo-alfajores"),
            Network::Local => write!(f, "local"),
            Network::Custom(id) => write!(f, "chain-{}", id),
        }
    }
}
