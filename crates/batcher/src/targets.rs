//! Target selection heuristics.

use hgw_exec::ExecutionAgent;
use hgw_model::{HgwError, NodeState, TargetState};

/// Node and target view of every known server.
pub async fn servers(
    agent: &dyn ExecutionAgent,
) -> Result<Vec<(NodeState, TargetState)>, HgwError> {
    let mut out = Vec::new();
    for name in agent.list_nodes().await? {
        let node = agent.node_state(&name).await?;
        let target = agent.target_state(&name).await?;
        out.push((node, target));
    }
    Ok(out)
}

/// Targets worth batching: not home, has money, has rights, and
/// `required_skill <= skill * eligibility_ratio`.
pub async fn valid_targets(
    agent: &dyn ExecutionAgent,
    home_node: &str,
    eligibility_ratio: f64,
) -> Result<Vec<String>, HgwError> {
    let skill = agent.current_skill().await? as f64;
    Ok(servers(agent)
        .await?
        .into_iter()
        .filter(|(node, target)| {
            node.name != home_node
                && node.has_rights
                && target.max_money > 0.0
                && target.required_skill as f64 <= skill * eligibility_ratio
        })
        .map(|(_, target)| target.name)
        .collect())
}

/// Easiest hackable target for grinding: lowest minimum security, then
/// lowest required skill, then name.
pub async fn best_grind_target(
    agent: &dyn ExecutionAgent,
    home_node: &str,
) -> Result<Option<String>, HgwError> {
    let skill = agent.current_skill().await?;
    let best = servers(agent)
        .await?
        .into_iter()
        .filter(|(node, target)| {
            node.name != home_node
                && node.has_rights
                && target.max_money > 0.0
                && target.required_skill <= skill
        })
        .map(|(_, target)| target)
        .min_by(|a, b| {
            a.min_security
                .total_cmp(&b.min_security)
                .then(a.required_skill.cmp(&b.required_skill))
                .then_with(|| a.name.cmp(&b.name))
        });
    Ok(best.map(|t| t.name))
}

#[cfg(test)]
mod tests {
    use hgw_exec::{SimulatedCluster, WorldFile};

    use super::*;

    const WORLD: &str = r#"
skill = 40

[[server]]
name = "home"
max_memory = 64
max_money = 100

[[server]]
name = "n00dles"
max_money = 70000
min_security = 1
required_skill = 1

[[server]]
name = "sigma"
max_money = 50000
min_security = 1
required_skill = 30

[[server]]
name = "joesguns"
max_money = 2500000
min_security = 5
required_skill = 10

[[server]]
name = "locked"
rights = false
max_money = 900000
min_security = 1
required_skill = 1

[[server]]
name = "darkweb"
min_security = 1
required_skill = 1
"#;

    fn sim() -> SimulatedCluster {
        SimulatedCluster::from_world(WorldFile::from_toml_str(WORLD).unwrap())
    }

    #[tokio::test]
    async fn valid_targets_respect_half_skill() {
        let sim = sim();
        let targets = valid_targets(&sim, "home", 0.5).await.unwrap();
        assert_eq!(targets, vec!["joesguns".to_string(), "n00dles".to_string()]);

        let targets = valid_targets(&sim, "home", 1.0).await.unwrap();
        assert!(targets.contains(&"sigma".to_string()));
        assert!(!targets.contains(&"locked".to_string()));
        assert!(!targets.contains(&"darkweb".to_string()));
    }

    #[tokio::test]
    async fn grind_target_prefers_low_security() {
        let sim = sim();
        let best = best_grind_target(&sim, "home").await.unwrap();
        assert_eq!(best.as_deref(), Some("n00dles"));
    }

    #[tokio::test]
    async fn no_grind_target_when_skill_too_low() {
        let sim = sim();
        sim.set_skill(0).unwrap();
        assert_eq!(best_grind_target(&sim, "home").await.unwrap(), None);
    }
}
