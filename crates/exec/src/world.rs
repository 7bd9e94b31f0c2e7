//! TOML description of a simulated cluster.
//!
//! ```toml
//! skill = 100
//!
//! [memory_costs]
//! weaken = 1.75
//! grow = 1.75
//! hack = 1.7
//!
//! [[server]]
//! name = "home"
//! max_memory = 256
//!
//! [[server]]
//! name = "joesguns"
//! max_memory = 16
//! max_money = 2500000
//! min_security = 5
//! required_skill = 10
//! growth = 20
//! ```

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use hgw_model::{HgwError, MemoryCosts, NodeState, TargetState};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldFile {
    /// Starting skill level of the operator.
    #[serde(default = "default_skill")]
    pub skill: u32,
    /// Experience needed per skill level.
    #[serde(default = "default_exp_per_level")]
    pub exp_per_level: f64,
    /// Memory held by the scheduler process on the home node.
    #[serde(default)]
    pub self_memory: f64,
    #[serde(default)]
    pub memory_costs: MemoryCosts,
    #[serde(default, rename = "server")]
    pub servers: Vec<ServerSpec>,
}

/// One server: a potential worker node and a potential target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSpec {
    pub name: String,
    #[serde(default)]
    pub max_memory: f64,
    /// Memory already held by jobs outside the scheduler.
    #[serde(default)]
    pub used_memory: f64,
    #[serde(default = "default_rights")]
    pub rights: bool,
    #[serde(default)]
    pub max_money: f64,
    /// Defaults to `max_money`.
    #[serde(default)]
    pub money: Option<f64>,
    #[serde(default = "default_min_security")]
    pub min_security: f64,
    /// Defaults to `min_security`.
    #[serde(default)]
    pub security: Option<f64>,
    #[serde(default = "default_required_skill")]
    pub required_skill: u32,
    #[serde(default)]
    pub growth: f64,
}

fn default_skill() -> u32 { 1 }
fn default_exp_per_level() -> f64 { 250.0 }
fn default_rights() -> bool { true }
fn default_min_security() -> f64 { 1.0 }
fn default_required_skill() -> u32 { 1 }

impl ServerSpec {
    pub fn node_state(&self) -> NodeState {
        NodeState {
            name: self.name.clone(),
            max_memory: self.max_memory,
            used_memory: self.used_memory,
            has_rights: self.rights,
            processes: 0,
        }
    }

    pub fn target_state(&self) -> TargetState {
        let min_security = self.min_security;
        TargetState {
            name: self.name.clone(),
            max_money: self.max_money,
            money: self.money.unwrap_or(self.max_money),
            min_security,
            security: self.security.unwrap_or(min_security),
            required_skill: self.required_skill,
            growth: self.growth,
        }
    }
}

impl WorldFile {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, HgwError> {
        let path = path.as_ref();
        debug!(path = %path.display(), "Loading world file");
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, HgwError> {
        let world: Self = toml::from_str(content).map_err(|e| HgwError::World(e.to_string()))?;
        world.validate()?;
        Ok(world)
    }

    fn validate(&self) -> Result<(), HgwError> {
        self.memory_costs
            .validate()
            .map_err(|e| HgwError::World(e.to_string()))?;
        let mut seen = HashSet::new();
        for server in &self.servers {
            if !seen.insert(server.name.as_str()) {
                return Err(HgwError::World(format!("duplicate server '{}'", server.name)));
            }
            if server.max_memory < 0.0 || server.used_memory > server.max_memory {
                return Err(HgwError::World(format!(
                    "server '{}' uses {} of {} memory",
                    server.name, server.used_memory, server.max_memory
                )));
            }
            if server.money.unwrap_or(0.0) > server.max_money {
                return Err(HgwError::World(format!(
                    "server '{}' holds more than its max money",
                    server.name
                )));
            }
            if server.security.unwrap_or(server.min_security) < server.min_security {
                return Err(HgwError::World(format!(
                    "server '{}' security below its minimum",
                    server.name
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
skill = 50

[[server]]
name = "home"
max_memory = 64

[[server]]
name = "n00dles"
max_memory = 4
max_money = 70000
money = 35000
min_security = 1
security = 1.5
growth = 3000
"#;

    #[test]
    fn parses_sample_with_defaults() {
        let world = WorldFile::from_toml_str(SAMPLE).unwrap();
        assert_eq!(world.skill, 50);
        assert_eq!(world.memory_costs, MemoryCosts::default());
        assert_eq!(world.servers.len(), 2);

        let home = world.servers[0].target_state();
        assert_eq!(home.max_money, 0.0);
        assert_eq!(home.security, 1.0);
        assert!(world.servers[0].rights);

        let noodles = world.servers[1].target_state();
        assert_eq!(noodles.money, 35_000.0);
        assert_eq!(noodles.security, 1.5);
    }

    #[test]
    fn rejects_duplicate_servers() {
        let content = "[[server]]\nname = \"a\"\n[[server]]\nname = \"a\"\n";
        assert!(matches!(
            WorldFile::from_toml_str(content),
            Err(HgwError::World(_))
        ));
    }

    #[test]
    fn rejects_overcommitted_memory() {
        let content = "[[server]]\nname = \"a\"\nmax_memory = 4\nused_memory = 8\n";
        assert!(WorldFile::from_toml_str(content).is_err());
    }

    #[test]
    fn rejects_zero_memory_cost() {
        let content = "[memory_costs]\nweaken = 0\ngrow = 1.75\nhack = 1.7\n";
        assert!(matches!(
            WorldFile::from_toml_str(content),
            Err(HgwError::World(_))
        ));
    }

    #[test]
    fn rejects_malformed_toml() {
        assert!(WorldFile::from_toml_str("[[server]\nname=").is_err());
    }
}
