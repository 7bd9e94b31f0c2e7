//! In-process cluster that runs jobs on the tokio clock.
//!
//! Dispatching reserves memory immediately; a spawned task sleeps for the
//! operation's duration (fixed at dispatch time), applies the effect to the
//! target, releases the memory and reports on the log ports.

use std::collections::{BTreeMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::time::Instant;
use tracing::{debug, warn};

use hgw_model::{HgwError, MemoryCosts, NodeState, Operation, TargetState};

use crate::agent::ExecutionAgent;
use crate::formulas::{Formulas, StandardFormulas};
use crate::ports::{LogPort, LogPorts};
use crate::world::WorldFile;

/// Experience granted per completed thread.
const EXP_PER_THREAD: f64 = 1.0;
/// Dispatch records kept by default; older ones are dropped first.
pub const DEFAULT_DISPATCH_LOG: usize = 1024;
/// Tolerance for float memory accounting.
const MEMORY_EPSILON: f64 = 1e-9;

/// One accepted dispatch, kept for inspection.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchRecord {
    pub pid: u64,
    pub op: Operation,
    pub node: String,
    pub threads: u64,
    pub argument: String,
    pub at: Instant,
}

#[derive(Debug)]
struct SimServer {
    node: NodeState,
    target: TargetState,
    payloads: HashSet<Operation>,
}

#[derive(Debug)]
struct SimState {
    servers: BTreeMap<String, SimServer>,
    base_skill: u32,
    skill: u32,
    experience: f64,
    exp_per_level: f64,
    next_pid: u64,
    dispatches: VecDeque<DispatchRecord>,
    dispatch_log: usize,
}

impl SimState {
    fn gain_experience(&mut self, threads: u64) {
        self.experience += threads as f64 * EXP_PER_THREAD;
        if self.exp_per_level > 0.0 {
            self.skill = self.base_skill + (self.experience / self.exp_per_level) as u32;
        }
    }

    fn record(&mut self, job: DispatchRecord) {
        if self.dispatch_log == 0 {
            return;
        }
        while self.dispatches.len() >= self.dispatch_log {
            self.dispatches.pop_front();
        }
        self.dispatches.push_back(job);
    }
}

pub struct SimulatedCluster {
    state: Arc<Mutex<SimState>>,
    ports: Arc<LogPorts>,
    formulas: StandardFormulas,
    costs: MemoryCosts,
    self_memory: f64,
}

impl SimulatedCluster {
    pub fn from_world(world: WorldFile) -> Self {
        let servers = world
            .servers
            .iter()
            .map(|spec| {
                let server = SimServer {
                    node: spec.node_state(),
                    target: spec.target_state(),
                    payloads: HashSet::new(),
                };
                (spec.name.clone(), server)
            })
            .collect();

        Self {
            state: Arc::new(Mutex::new(SimState {
                servers,
                base_skill: world.skill,
                skill: world.skill,
                experience: 0.0,
                exp_per_level: world.exp_per_level,
                next_pid: 1,
                dispatches: VecDeque::new(),
                dispatch_log: DEFAULT_DISPATCH_LOG,
            })),
            ports: Arc::new(LogPorts::new()),
            formulas: StandardFormulas,
            costs: world.memory_costs,
            self_memory: world.self_memory,
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, SimState>, HgwError> {
        self.state
            .lock()
            .map_err(|e| HgwError::Agent(format!("cluster state lock poisoned: {}", e)))
    }

    /// Keep at most `capacity` dispatch records. Zero disables the log.
    pub fn with_dispatch_log(self, capacity: usize) -> Self {
        if let Ok(mut state) = self.state.lock() {
            state.dispatch_log = capacity;
            while state.dispatches.len() > capacity {
                state.dispatches.pop_front();
            }
        }
        self
    }

    /// The most recent accepted dispatches, oldest first.
    pub fn dispatches(&self) -> Vec<DispatchRecord> {
        self.lock()
            .map(|s| s.dispatches.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Jobs currently running across all nodes.
    pub fn running_jobs(&self) -> usize {
        self.lock()
            .map(|s| s.servers.values().map(|srv| srv.node.processes).sum())
            .unwrap_or(0)
    }

    /// Simulate memory taken by something outside the scheduler.
    pub fn set_used_memory(&self, node: &str, used: f64) -> Result<(), HgwError> {
        let mut state = self.lock()?;
        let server = state
            .servers
            .get_mut(node)
            .ok_or_else(|| HgwError::NodeNotFound(node.to_string()))?;
        server.node.used_memory = used;
        Ok(())
    }

    pub fn set_skill(&self, skill: u32) -> Result<(), HgwError> {
        let mut state = self.lock()?;
        state.base_skill = skill;
        state.experience = 0.0;
        state.skill = skill;
        Ok(())
    }

    pub fn set_security(&self, target: &str, security: f64) -> Result<(), HgwError> {
        let mut state = self.lock()?;
        let server = state
            .servers
            .get_mut(target)
            .ok_or_else(|| HgwError::TargetNotFound(target.to_string()))?;
        server.target.security = security.max(server.target.min_security);
        Ok(())
    }
}

/// Applies a finished job's effect and frees its memory.
fn complete_job(
    state: &Mutex<SimState>,
    ports: &LogPorts,
    formulas: StandardFormulas,
    job: &DispatchRecord,
    memory: f64,
) {
    let Ok(mut state) = state.lock() else {
        warn!(pid = job.pid, "cluster state lock poisoned, job result lost");
        return;
    };
    let skill = state.skill;
    let threads = job.threads as f64;

    if let Some(server) = state.servers.get_mut(&job.node) {
        server.node.used_memory = (server.node.used_memory - memory).max(0.0);
        server.node.processes = server.node.processes.saturating_sub(1);
    }

    let Some(server) = state.servers.get_mut(&job.argument) else {
        return;
    };
    let target = &mut server.target;
    let mut stolen = 0.0;
    match job.op {
        Operation::Weaken => {
            target.security =
                (target.security - formulas.weaken_potency(threads, 1)).max(target.min_security);
        }
        Operation::Grow => {
            let multiplier = formulas.grow_multiplier(target, threads, 1);
            target.money = ((target.money + threads) * multiplier).min(target.max_money);
            target.security += formulas.grow_security(threads);
        }
        Operation::Hack => {
            let fraction = (formulas.hack_fraction(target, skill) * threads).min(1.0);
            stolen = target.money * fraction;
            target.money -= stolen;
            target.security += formulas.hack_security(threads);
        }
    }
    let summary = format!(
        "{}: security {:.2}/{:.2} money {:.0}/{:.0}",
        target.name, target.security, target.min_security, target.money, target.max_money
    );
    state.gain_experience(job.threads);

    let stamp = Utc::now().format("%H:%M:%S");
    ports.write(
        LogPort::Trace,
        format!(
            "{} job {} {} x{} on {} finished",
            stamp, job.pid, job.op, job.threads, job.node
        ),
    );
    ports.write(LogPort::Debug, format!("{} {}", stamp, summary));
    if job.op == Operation::Hack {
        ports.write(
            LogPort::Info,
            format!("{} hacked {} for {:.0}", stamp, job.argument, stolen),
        );
    }
}

#[async_trait]
impl ExecutionAgent for SimulatedCluster {
    async fn list_nodes(&self) -> Result<Vec<String>, HgwError> {
        Ok(self.lock()?.servers.keys().cloned().collect())
    }

    async fn node_state(&self, name: &str) -> Result<NodeState, HgwError> {
        self.lock()?
            .servers
            .get(name)
            .map(|s| s.node.clone())
            .ok_or_else(|| HgwError::NodeNotFound(name.to_string()))
    }

    async fn target_state(&self, name: &str) -> Result<TargetState, HgwError> {
        self.lock()?
            .servers
            .get(name)
            .map(|s| s.target.clone())
            .ok_or_else(|| HgwError::TargetNotFound(name.to_string()))
    }

    async fn current_skill(&self) -> Result<u32, HgwError> {
        Ok(self.lock()?.skill)
    }

    async fn memory_cost(&self, op: Operation) -> Result<f64, HgwError> {
        Ok(self.costs.of(op))
    }

    async fn self_memory(&self) -> Result<f64, HgwError> {
        Ok(self.self_memory)
    }

    async fn transfer_payload(&self, op: Operation, node: &str) -> Result<(), HgwError> {
        let mut state = self.lock()?;
        let server = state
            .servers
            .get_mut(node)
            .ok_or_else(|| HgwError::NodeNotFound(node.to_string()))?;
        if server.payloads.insert(op) {
            debug!(node, payload = op.payload(), "payload transferred");
        }
        Ok(())
    }

    async fn dispatch(
        &self,
        op: Operation,
        node: &str,
        threads: u64,
        argument: &str,
    ) -> Result<u64, HgwError> {
        if threads == 0 {
            return Err(HgwError::InvalidThreads(threads));
        }
        let memory = self.costs.of(op) * threads as f64;

        let (job, duration) = {
            let mut state = self.lock()?;
            let skill = state.skill;
            let target = state
                .servers
                .get(argument)
                .map(|s| s.target.clone())
                .ok_or_else(|| HgwError::TargetNotFound(argument.to_string()))?;

            let server = state
                .servers
                .get_mut(node)
                .ok_or_else(|| HgwError::NodeNotFound(node.to_string()))?;
            if !server.node.has_rights {
                return Err(HgwError::NoRights(node.to_string()));
            }
            if !server.payloads.contains(&op) {
                return Err(HgwError::PayloadMissing {
                    operation: op.to_string(),
                    node: node.to_string(),
                });
            }
            let free = server.node.free_memory();
            if memory > free + MEMORY_EPSILON {
                return Err(HgwError::InsufficientMemory {
                    node: node.to_string(),
                    required: memory,
                    free,
                });
            }
            server.node.used_memory += memory;
            server.node.processes += 1;

            let pid = state.next_pid;
            state.next_pid += 1;

            let durations = self.formulas.durations(&target, skill);
            let duration: Duration = match op {
                Operation::Weaken => durations.weaken,
                Operation::Grow => durations.grow,
                Operation::Hack => durations.hack,
            };
            let job = DispatchRecord {
                pid,
                op,
                node: node.to_string(),
                threads,
                argument: argument.to_string(),
                at: Instant::now(),
            };
            state.record(job.clone());
            (job, duration)
        };

        let pid = job.pid;
        let state = Arc::clone(&self.state);
        let ports = Arc::clone(&self.ports);
        let formulas = self.formulas;
        tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            complete_job(&state, &ports, formulas, &job, memory);
        });
        Ok(pid)
    }

    fn formulas(&self) -> &dyn Formulas {
        &self.formulas
    }

    fn ports(&self) -> &LogPorts {
        &self.ports
    }
}
