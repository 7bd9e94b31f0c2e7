//! Thread requirement calculator.

use tracing::error;

use hgw_exec::Formulas;
use hgw_model::{CyclePhase, MemoryCosts, SchedulerConfig, TargetState, ThreadPlan};

/// Grow must undo 1.25x the money a hack removes.
pub const GROW_TO_HACK_RATIO: f64 = 1.25;

/// Why no plan was produced for a cycle.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PlanSkip {
    #[error("skill {skill} below required {required}")]
    SkillTooLow { required: u32, skill: u32 },

    #[error("degenerate memory budget {budget}")]
    DegenerateBudget { budget: f64 },
}

/// Sizes one cycle from a single snapshot of the target.
pub struct ThreadCalculator<'a> {
    config: &'a SchedulerConfig,
    costs: MemoryCosts,
    formulas: &'a dyn Formulas,
}

impl<'a> ThreadCalculator<'a> {
    pub fn new(config: &'a SchedulerConfig, costs: MemoryCosts, formulas: &'a dyn Formulas) -> Self {
        Self {
            config,
            costs,
            formulas,
        }
    }

    /// Money multiplier the grow must achieve this cycle.
    pub fn growth_multiplier(&self, target: &TargetState) -> f64 {
        let offset_steal = 1.0 / (1.0 - self.config.steal * GROW_TO_HACK_RATIO);
        let refill = target.max_money / target.money.max(1.0);
        offset_steal.max(refill)
    }

    pub fn plan(&self, target: &TargetState, skill: u32) -> Result<ThreadPlan, PlanSkip> {
        if target.required_skill > skill {
            return Err(PlanSkip::SkillTooLow {
                required: target.required_skill,
                skill,
            });
        }

        let phase = if target.needs_prep(self.config.prep_thresh) {
            CyclePhase::Prep
        } else {
            CyclePhase::Money
        };
        let cores = self.config.cores;
        let growth_multiplier = self.growth_multiplier(target);

        let hack_fraction = self.formulas.hack_fraction(target, skill);
        let hack = (self.config.steal / hack_fraction).ceil();
        let mut grow = self
            .formulas
            .growth_threads(target, growth_multiplier, cores)
            .ceil();
        if let Some(cap) = self.config.max_grow_threads {
            grow = grow.min(cap as f64);
        }

        let extra_security = target.extra_security();
        let grow_security = self.formulas.grow_security(grow);
        let hack_security = self.formulas.hack_security(hack);
        let weaken_potency = self.formulas.weaken_potency(1.0, cores);

        let grow_weaken = (grow_security / weaken_potency).ceil();
        let hack_weaken = ((hack_security + extra_security) / weaken_potency).ceil();
        let prep_weaken = (extra_security / weaken_potency).ceil();

        let budget = self.costs.weaken * (prep_weaken + grow_weaken + hack_weaken)
            + self.costs.grow * grow
            + self.costs.hack * hack;

        if !budget.is_finite() || !(budget > 0.0) {
            error!(
                target = %target.name,
                budget,
                hack,
                grow,
                prep_weaken,
                grow_weaken,
                hack_weaken,
                hack_fraction,
                grow_security,
                hack_security,
                weaken_potency,
                growth_multiplier,
                "Failed to build budget"
            );
            return Err(PlanSkip::DegenerateBudget { budget });
        }

        Ok(ThreadPlan {
            phase,
            hack: to_count(hack),
            grow: to_count(grow),
            prep_weaken: to_count(prep_weaken),
            grow_weaken: to_count(grow_weaken),
            hack_weaken: to_count(hack_weaken),
            budget,
        })
    }
}

/// Only called once the budget proved every count finite.
fn to_count(threads: f64) -> u64 {
    threads.max(0.0) as u64
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use hgw_exec::{Durations, StandardFormulas};

    use super::*;

    fn target() -> TargetState {
        TargetState {
            name: "foodnstuff".into(),
            max_money: 1_000_000.0,
            money: 1_000_000.0,
            min_security: 10.0,
            security: 10.0,
            required_skill: 10,
            growth: 50.0,
        }
    }

    fn calc(config: &SchedulerConfig) -> ThreadCalculator<'_> {
        ThreadCalculator::new(config, MemoryCosts::default(), &StandardFormulas)
    }

    #[test]
    fn skill_too_low_is_not_ready() {
        let config = SchedulerConfig::default();
        let result = calc(&config).plan(&target(), 9);
        assert_eq!(
            result,
            Err(PlanSkip::SkillTooLow {
                required: 10,
                skill: 9
            })
        );
    }

    #[test]
    fn money_cycle_at_minimum_security() {
        let config = SchedulerConfig::default();
        let t = target();
        let plan = calc(&config).plan(&t, 100).unwrap();

        assert_eq!(plan.phase, CyclePhase::Money);
        let fraction = StandardFormulas.hack_fraction(&t, 100);
        assert_eq!(plan.hack, (0.4 / fraction).ceil() as u64);
        assert!((calc(&config).growth_multiplier(&t) - 2.0).abs() < 1e-12);
        let grow = StandardFormulas.growth_threads(&t, 2.0, 1).ceil() as u64;
        assert_eq!(plan.grow, grow);
        assert_eq!(plan.prep_weaken, 0);
        assert!(plan.grow_weaken > 0);
        assert!(plan.hack_weaken > 0);
    }

    #[test]
    fn budget_is_literal_sum() {
        let config = SchedulerConfig::default();
        let costs = MemoryCosts::default();
        let plan = calc(&config).plan(&target(), 100).unwrap();
        let expected = costs.weaken * plan.weaken_total() as f64
            + costs.grow * plan.grow as f64
            + costs.hack * plan.hack as f64;
        assert!((plan.budget - expected).abs() < 1e-9);
    }

    #[test]
    fn high_security_selects_prep() {
        let config = SchedulerConfig::default();
        let mut t = target();
        t.security = 15.0;
        let plan = calc(&config).plan(&t, 100).unwrap();
        assert_eq!(plan.phase, CyclePhase::Prep);
        // 5 security / 0.05 per thread
        assert_eq!(plan.prep_weaken, 100);
        assert!(plan.hack_weaken >= plan.prep_weaken);
    }

    #[test]
    fn near_empty_target_needs_refill_growth() {
        let config = SchedulerConfig::default();
        let mut t = target();
        t.money = 0.0;
        assert_eq!(calc(&config).growth_multiplier(&t), 1_000_000.0);
    }

    #[test]
    fn grow_threads_capped() {
        let mut config = SchedulerConfig::default();
        config.max_grow_threads = Some(50);
        let plan = calc(&config).plan(&target(), 100).unwrap();
        assert_eq!(plan.grow, 50);
        // counter-weaken follows the capped grow: 50 * 0.004 / 0.05
        assert_eq!(plan.grow_weaken, 4);
    }

    #[test]
    fn zero_hack_effectiveness_yields_no_plan() {
        let config = SchedulerConfig::default();
        let mut t = target();
        // difficulty multiplier hits zero at security 100
        t.min_security = 100.0;
        t.security = 100.0;
        let result = calc(&config).plan(&t, 100);
        assert!(matches!(result, Err(PlanSkip::DegenerateBudget { .. })));
    }

    struct NanFormulas;

    impl Formulas for NanFormulas {
        fn hack_fraction(&self, _: &TargetState, _: u32) -> f64 { 0.01 }
        fn growth_threads(&self, _: &TargetState, _: f64, _: u32) -> f64 { f64::NAN }
        fn grow_security(&self, threads: f64) -> f64 { threads * 0.004 }
        fn hack_security(&self, threads: f64) -> f64 { threads * 0.002 }
        fn weaken_potency(&self, threads: f64, _: u32) -> f64 { threads * 0.05 }
        fn durations(&self, _: &TargetState, _: u32) -> Durations {
            Durations {
                weaken: Duration::ZERO,
                grow: Duration::ZERO,
                hack: Duration::ZERO,
            }
        }
    }

    #[test]
    fn nan_threads_yield_no_plan() {
        let config = SchedulerConfig::default();
        let calc = ThreadCalculator::new(&config, MemoryCosts::default(), &NanFormulas);
        assert!(matches!(
            calc.plan(&target(), 100),
            Err(PlanSkip::DegenerateBudget { .. })
        ));
    }

    #[test]
    fn recomputing_is_idempotent() {
        let config = SchedulerConfig::default();
        let mut t = target();
        t.security = 10.5;
        t.money = 400_000.0;
        let first = calc(&config).plan(&t, 120).unwrap();
        let second = calc(&config).plan(&t, 120).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn more_cores_need_fewer_threads() {
        let mut config = SchedulerConfig::default();
        let one = calc(&config).plan(&target(), 100).unwrap();
        config.cores = 8;
        let eight = calc(&config).plan(&target(), 100).unwrap();
        assert!(eight.grow < one.grow);
        assert!(eight.grow_weaken <= one.grow_weaken);
        assert_eq!(eight.hack, one.hack);
    }
}
