use std::fmt;

use serde::Serialize;

use hgw_exec::ExecutionAgent;
use hgw_model::HgwError;

use crate::targets::servers;

/// One line of the status table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusRow {
    pub name: String,
    pub required_skill: u32,
    pub money: f64,
    pub max_money: f64,
    pub security: f64,
    pub min_security: f64,
}

impl StatusRow {
    pub fn header() -> String {
        format!(
            "{:<20} {:>5} {:>10} {:>10} {:>7} {:>5}",
            "Name", "Level", "Avail", "Max", "Current", "Min"
        )
    }
}

/// Compact money figure, e.g. `1.250m`.
fn short_number(value: f64) -> String {
    const UNITS: [(f64, &str); 4] = [(1e12, "t"), (1e9, "b"), (1e6, "m"), (1e3, "k")];
    for (scale, suffix) in UNITS {
        if value.abs() >= scale {
            return format!("{:.3}{}", value / scale, suffix);
        }
    }
    format!("{:.0}", value)
}

impl fmt::Display for StatusRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<20} {:>5} {:>10} {:>10} {:>7.0} {:>5.0}",
            self.name,
            self.required_skill,
            short_number(self.money),
            short_number(self.max_money),
            self.security,
            self.min_security
        )
    }
}

/// Every server except `home_node` whose required skill is at most half the
/// current skill.
pub async fn status_report(
    agent: &dyn ExecutionAgent,
    home_node: &str,
) -> Result<Vec<StatusRow>, HgwError> {
    let skill = agent.current_skill().await? as f64;
    Ok(servers(agent)
        .await?
        .into_iter()
        .filter(|(node, target)| {
            node.name != home_node && target.required_skill as f64 <= skill / 2.0
        })
        .map(|(_, t)| StatusRow {
            name: t.name,
            required_skill: t.required_skill,
            money: t.money,
            max_money: t.max_money,
            security: t.security,
            min_security: t.min_security,
        })
        .collect())
}
