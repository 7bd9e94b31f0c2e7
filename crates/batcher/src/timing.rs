//! Timing calculator.
//!
//! A money cycle dispatches hack-weaken, grow-weaken, grow and hack in that
//! order, sleeping the offsets below between calls, so that the effects land
//! hack, hack-weaken, grow, grow-weaken, one margin apart.

use std::time::Duration;

use hgw_exec::Durations;
use hgw_model::TimingPlan;

/// Offsets from live durations. Negative leads clamp to zero.
pub fn calculate_times(durations: &Durations, margin: Duration) -> TimingPlan {
    TimingPlan {
        weaken_time: durations.weaken,
        grow_time: durations.grow,
        hack_time: durations.hack,
        margin,
        grow_lead: durations
            .weaken
            .saturating_sub(durations.grow)
            .saturating_sub(margin),
        hack_lead: durations
            .weaken
            .saturating_sub(durations.hack)
            .saturating_sub(margin * 3),
        weaken_lead: margin * 2,
        trailing_margin: margin * 4,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn durations(hack_ms: u64) -> Durations {
        Durations {
            weaken: Duration::from_millis(hack_ms * 4),
            grow: Duration::from_millis(hack_ms * 16 / 5),
            hack: Duration::from_millis(hack_ms),
        }
    }

    #[test]
    fn offsets_follow_durations() {
        let margin = Duration::from_millis(200);
        let times = calculate_times(&durations(25_000), margin);
        assert_eq!(times.grow_lead, Duration::from_millis(100_000 - 80_000 - 200));
        assert_eq!(times.hack_lead, Duration::from_millis(100_000 - 25_000 - 600));
        assert_eq!(times.weaken_lead, Duration::from_millis(400));
        assert_eq!(times.trailing_margin, Duration::from_millis(800));
        assert_eq!(times.batch_length(), Duration::from_millis(100_800));
    }

    #[test]
    fn grow_dispatches_before_hack() {
        let times = calculate_times(&durations(25_000), Duration::from_millis(200));
        assert!(times.grow_lead < times.hack_lead);
        assert!(times.grow_dispatch_at() < times.hack_dispatch_at());
    }

    #[test]
    fn effects_land_in_order_one_margin_apart() {
        let margin = Duration::from_millis(200);
        for hack_ms in [1_000, 25_000, 250_000] {
            let landings = calculate_times(&durations(hack_ms), margin).landings();
            assert!(landings.hack < landings.hack_weaken);
            assert!(landings.hack_weaken < landings.grow);
            assert!(landings.grow < landings.grow_weaken);
            assert_eq!(landings.hack_weaken - landings.hack, margin);
            assert_eq!(landings.grow_weaken - landings.grow, margin);
        }
    }

    #[test]
    fn zero_margin_keeps_order() {
        let times = calculate_times(&durations(10_000), Duration::ZERO);
        let landings = times.landings();
        assert!(landings.hack <= landings.hack_weaken);
        assert!(landings.grow <= landings.grow_weaken);
        assert!(times.grow_lead <= times.hack_lead);
    }

    #[test]
    fn short_weaken_clamps_leads() {
        let d = Durations {
            weaken: Duration::from_millis(100),
            grow: Duration::from_millis(500),
            hack: Duration::from_millis(50),
        };
        let times = calculate_times(&d, Duration::from_millis(200));
        assert_eq!(times.grow_lead, Duration::ZERO);
        assert_eq!(times.hack_lead, Duration::ZERO);
        assert_eq!(times.hack_after_grow(), Duration::ZERO);
    }

    #[test]
    fn same_durations_same_plan() {
        let margin = Duration::from_millis(150);
        assert_eq!(
            calculate_times(&durations(7_000), margin),
            calculate_times(&durations(7_000), margin)
        );
    }
}
