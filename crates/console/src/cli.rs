use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use hgw_model::SchedulerConfig;

/// Memory-aware weaken/grow/hack batch scheduler.
///
/// Every subcommand runs against the cluster described by the world file.
#[derive(Parser, Debug)]
#[command(name = "hgw", version, about)]
pub struct Cli {
    /// World file describing nodes and targets.
    #[arg(long, global = true, env = "HGW_WORLD", default_value = "config/world.toml")]
    pub world: PathBuf,

    /// Node whose memory is reduced by the reserve.
    #[arg(long, global = true, env = "HGW_HOME_NODE", default_value = "home")]
    pub home_node: String,

    /// Debug output (batch plans, state snapshots, debug port).
    #[arg(long, global = true, env = "HGW_DEBUG")]
    pub debug: bool,

    /// Trace output, implies --debug.
    #[arg(long, global = true, env = "HGW_TRACE")]
    pub trace: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Default log filter when `RUST_LOG` is unset. `config` is the merged
    /// scheduler config of a `run`, whose file may turn on debug or trace.
    pub fn log_level(&self, config: Option<&SchedulerConfig>) -> &'static str {
        let trace = self.trace || config.is_some_and(|c| c.trace);
        let debug = self.debug || config.is_some_and(SchedulerConfig::debug_enabled);
        if trace {
            "trace"
        } else if debug {
            "debug"
        } else {
            "info"
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the batch scheduler until stopped.
    Run(RunArgs),
    /// Print targets within half the current skill.
    Scan {
        /// Emit JSON instead of a table.
        #[arg(long)]
        json: bool,
    },
    /// Split every free weaken thread evenly across targets.
    Weaken {
        /// Target names, `best` or `all`. Defaults to `best`.
        #[arg(long = "target", value_delimiter = ',')]
        targets: Vec<String>,
    },
}

/// Scheduler options. Unset options keep the value from `--config`, or
/// the built-in default.
#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// TOML file with scheduler options.
    #[arg(long, env = "HGW_CONFIG")]
    pub config: Option<PathBuf>,

    /// Margin between dependent dispatches, in milliseconds.
    #[arg(long, env = "HGW_MARGIN")]
    pub margin: Option<u64>,

    /// Home-node memory kept out of the pool.
    #[arg(long, env = "HGW_RESERVED")]
    pub reserved: Option<f64>,

    /// Fraction of a target's money to hack per cycle.
    #[arg(long, env = "HGW_STEAL")]
    pub steal: Option<f64>,

    /// Share of committed budgets the grinder may overcommit.
    #[arg(long, env = "HGW_MEMORY_OVERSUBSCRIPTION")]
    pub memory_oversubscription: Option<f64>,

    /// Overlapping cycles per target.
    #[arg(long, env = "HGW_CONCURRENCY")]
    pub concurrency: Option<u32>,

    /// Targets to schedule. Empty means every valid target.
    #[arg(long = "target", env = "HGW_TARGETS", value_delimiter = ',')]
    pub targets: Vec<String>,

    /// Fill leftover memory with weaken jobs.
    #[arg(long, env = "HGW_GRIND")]
    pub grind: bool,

    /// Security ratio above which a cycle preps.
    #[arg(long, env = "HGW_PREP_THRESH")]
    pub prep_thresh: Option<f64>,

    /// Money ratio below which a money cycle skips its hack.
    #[arg(long, env = "HGW_HACK_MONEY_THRESH")]
    pub hack_money_thresh: Option<f64>,

    /// CPU cores of the dispatching node.
    #[arg(long, env = "HGW_CORES")]
    pub cores: Option<u32>,

    /// Upper bound on grow threads per cycle.
    #[arg(long, env = "HGW_MAX_GROW_THREADS")]
    pub max_grow_threads: Option<u64>,

    /// Start a target once `required <= skill * ratio`.
    #[arg(long, env = "HGW_ELIGIBILITY_RATIO")]
    pub eligibility_ratio: Option<f64>,

    /// Run one batch per target and exit.
    #[arg(long, env = "HGW_ONCE")]
    pub once: bool,
}

impl RunArgs {
    /// Layer the flags over `base`.
    pub fn apply(&self, cli: &Cli, mut base: SchedulerConfig) -> SchedulerConfig {
        if let Some(v) = self.margin {
            base.margin_ms = v;
        }
        if let Some(v) = self.reserved {
            base.reserved = v;
        }
        if let Some(v) = self.steal {
            base.steal = v;
        }
        if let Some(v) = self.memory_oversubscription {
            base.memory_oversubscription = v;
        }
        if let Some(v) = self.concurrency {
            base.concurrency = v;
        }
        if !self.targets.is_empty() {
            base.targets = self.targets.clone();
        }
        if let Some(v) = self.prep_thresh {
            base.prep_thresh = v;
        }
        if let Some(v) = self.hack_money_thresh {
            base.hack_money_thresh = v;
        }
        if let Some(v) = self.cores {
            base.cores = v;
        }
        if self.max_grow_threads.is_some() {
            base.max_grow_threads = self.max_grow_threads;
        }
        if let Some(v) = self.eligibility_ratio {
            base.eligibility_ratio = v;
        }
        base.grind |= self.grind;
        base.once |= self.once;
        base.debug |= cli.debug;
        base.trace |= cli.trace;
        base.home_node = cli.home_node.clone();
        base
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("hgw").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn run_flags_override_defaults() {
        let cli = parse(&[
            "run",
            "--margin",
            "150",
            "--target",
            "n00dles,foodnstuff",
            "--grind",
            "--debug",
        ]);
        let Command::Run(args) = &cli.command else {
            panic!("expected run");
        };
        let config = args.apply(&cli, SchedulerConfig::default());
        assert_eq!(config.margin_ms, 150);
        assert_eq!(config.targets, vec!["n00dles", "foodnstuff"]);
        assert!(config.grind);
        assert!(config.debug);
        assert_eq!(config.steal, 0.4);
        assert_eq!(config.concurrency, 2);
        assert_eq!(cli.log_level(Some(&config)), "debug");
    }

    #[test]
    fn unset_flags_keep_file_values() {
        let cli = parse(&["run"]);
        let Command::Run(args) = &cli.command else {
            panic!("expected run");
        };
        let base: SchedulerConfig = toml::from_str("steal = 0.25\nconcurrency = 4").unwrap();
        let config = args.apply(&cli, base);
        assert_eq!(config.steal, 0.25);
        assert_eq!(config.concurrency, 4);
        assert_eq!(config.margin_ms, 200);
    }

    #[test]
    fn weaken_targets() {
        let cli = parse(&["weaken", "--target", "best"]);
        match cli.command {
            Command::Weaken { targets } => assert_eq!(targets, vec!["best"]),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(parse(&["--trace", "scan", "--json"]).log_level(None), "trace");
    }

    #[test]
    fn config_file_sets_log_level() {
        let cli = parse(&["run"]);
        let Command::Run(args) = &cli.command else {
            panic!("expected run");
        };
        assert_eq!(cli.log_level(None), "info");

        let base: SchedulerConfig = toml::from_str("debug = true").unwrap();
        let config = args.apply(&cli, base);
        assert_eq!(cli.log_level(Some(&config)), "debug");

        let base: SchedulerConfig = toml::from_str("trace = true").unwrap();
        let config = args.apply(&cli, base);
        assert_eq!(cli.log_level(Some(&config)), "trace");
    }
}
