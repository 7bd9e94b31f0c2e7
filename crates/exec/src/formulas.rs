//! Analysis formulas: how much each operation does, and how long it takes.

use std::time::Duration;

use hgw_model::TargetState;

/// Security removed by one weaken thread on a single core.
pub const WEAKEN_PER_THREAD: f64 = 0.05;
/// Security added by one grow thread.
pub const GROW_SECURITY_PER_THREAD: f64 = 0.004;
/// Security added by one hack thread.
pub const HACK_SECURITY_PER_THREAD: f64 = 0.002;

const BASE_GROWTH_RATE: f64 = 0.03;
const MAX_GROWTH_RATE: f64 = 1.0035;
const HACK_DIVISOR: f64 = 240.0;

/// How long each operation takes against one target right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Durations {
    pub weaken: Duration,
    pub grow: Duration,
    pub hack: Duration,
}

/// Per-target analysis values. Pure functions of the polled state.
pub trait Formulas: Send + Sync {
    /// Fraction of current money one hack thread steals.
    fn hack_fraction(&self, target: &TargetState, skill: u32) -> f64;

    /// Grow threads needed to multiply the target's money by `multiplier`.
    fn growth_threads(&self, target: &TargetState, multiplier: f64, cores: u32) -> f64;

    /// Security increase caused by `threads` grow threads.
    fn grow_security(&self, threads: f64) -> f64;

    /// Security increase caused by `threads` hack threads.
    fn hack_security(&self, threads: f64) -> f64;

    /// Security decrease caused by `threads` weaken threads.
    fn weaken_potency(&self, threads: f64, cores: u32) -> f64;

    fn durations(&self, target: &TargetState, skill: u32) -> Durations;
}

/// The standard model used by the simulated cluster.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardFormulas;

impl StandardFormulas {
    fn core_bonus(cores: u32) -> f64 {
        1.0 + (cores.max(1) as f64 - 1.0) / 16.0
    }

    fn growth_rate(target: &TargetState) -> f64 {
        let rate = 1.0 + BASE_GROWTH_RATE / target.security;
        rate.min(MAX_GROWTH_RATE)
    }

    /// Money multiplier produced by `threads` grow threads.
    pub fn grow_multiplier(&self, target: &TargetState, threads: f64, cores: u32) -> f64 {
        let exponent = threads * (target.growth / 100.0) * Self::core_bonus(cores);
        Self::growth_rate(target).powf(exponent)
    }

    fn hack_time_ms(target: &TargetState, skill: u32) -> f64 {
        let difficulty = 2.5 * target.required_skill as f64 * target.security + 500.0;
        5_000.0 * difficulty / (skill as f64 + 50.0)
    }
}

fn millis(ms: f64) -> Duration {
    Duration::from_millis(ms.max(0.0).round() as u64)
}

impl Formulas for StandardFormulas {
    fn hack_fraction(&self, target: &TargetState, skill: u32) -> f64 {
        if skill == 0 || target.required_skill > skill {
            return 0.0;
        }
        let difficulty = (100.0 - target.security) / 100.0;
        let skill_mult = (skill - target.required_skill + 1) as f64 / skill as f64;
        (difficulty * skill_mult / HACK_DIVISOR).clamp(0.0, 1.0)
    }

    fn growth_threads(&self, target: &TargetState, multiplier: f64, cores: u32) -> f64 {
        if multiplier <= 1.0 {
            return 0.0;
        }
        let per_thread =
            Self::growth_rate(target).ln() * (target.growth / 100.0) * Self::core_bonus(cores);
        multiplier.ln() / per_thread
    }

    fn grow_security(&self, threads: f64) -> f64 {
        threads * GROW_SECURITY_PER_THREAD
    }

    fn hack_security(&self, threads: f64) -> f64 {
        threads * HACK_SECURITY_PER_THREAD
    }

    fn weaken_potency(&self, threads: f64, cores: u32) -> f64 {
        threads * WEAKEN_PER_THREAD * Self::core_bonus(cores)
    }

    fn durations(&self, target: &TargetState, skill: u32) -> Durations {
        let hack = Self::hack_time_ms(target, skill);
        Durations {
            weaken: millis(hack * 4.0),
            grow: millis(hack * 3.2),
            hack: millis(hack),
        }
    }
}
