//! Simulation configuration.
//!
//! Everything that shapes a run besides the workshop itself: the seed, the
//! replanning cadence, processing-time spread, interrupt generators, and
//! order arrivals. Configurations deserialize from JSON and are validated
//! before the clock starts.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::{Machine, MachineId, MachineType, TimeDistribution};
use crate::planner::MachineTypePolicy;
use crate::time::hours;

/// Default processing-time variation coefficient (std / mean).
pub const DEFAULT_VARIATION_COEFFICIENT: f64 = 0.1;

/// A source of machine breakdowns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterruptConfig {
    /// Machines this source may break. Empty means all.
    #[serde(default)]
    pub machines: Vec<MachineId>,
    /// Machine types this source may break. Empty means all.
    #[serde(default)]
    pub machine_types: Vec<MachineType>,
    /// Time between breakdowns.
    pub inter_arrival: TimeDistribution,
    /// Time to repair each affected machine.
    pub repair_time: TimeDistribution,
    /// Stop after this many breakdowns.
    #[serde(default)]
    pub max_occurrences: Option<u32>,
}

impl InterruptConfig {
    pub fn new(inter_arrival: TimeDistribution, repair_time: TimeDistribution) -> Self {
        Self {
            machines: Vec::new(),
            machine_types: Vec::new(),
            inter_arrival,
            repair_time,
            max_occurrences: None,
        }
    }

    pub fn with_machines(mut self, machines: Vec<MachineId>) -> Self {
        self.machines = machines;
        self
    }

    pub fn with_machine_types(mut self, machine_types: Vec<MachineType>) -> Self {
        self.machine_types = machine_types;
        self
    }

    pub fn with_max_occurrences(mut self, max: u32) -> Self {
        self.max_occurrences = Some(max);
        self
    }

    /// Whether this source targets the machine.
    pub fn matches(&self, machine: &Machine) -> bool {
        (self.machines.is_empty() || self.machines.contains(&machine.id))
            && (self.machine_types.is_empty() || self.machine_types.contains(&machine.machine_type))
    }
}

/// Arrival process for generated production orders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderGenerationConfig {
    /// Time between generated orders.
    pub inter_arrival: TimeDistribution,
}

/// Configuration of one simulation run.
///
/// # Example
///
/// ```
/// use jobshop_sim::config::SimulationConfig;
/// use jobshop_sim::time::hours;
///
/// let config = SimulationConfig::default()
///     .with_seed(7)
///     .with_replanning_interval(Some(hours(4)));
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Seeds the RNG behind every sample of the run.
    pub seed: u64,
    /// Simulation time at which the clock starts (ms).
    pub start_time_ms: i64,
    /// Interval of the periodic replanning timer; `None` disables it.
    pub replanning_interval_ms: Option<i64>,
    /// Processing-time spread for positions without their own.
    pub variation_coefficient: f64,
    pub interrupts: Vec<InterruptConfig>,
    pub order_generation: Option<OrderGenerationConfig>,
    /// Tie-break among machine types in the planner.
    pub machine_type_policy: MachineTypePolicy,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            start_time_ms: 0,
            replanning_interval_ms: Some(hours(8)),
            variation_coefficient: DEFAULT_VARIATION_COEFFICIENT,
            interrupts: Vec::new(),
            order_generation: None,
            machine_type_policy: MachineTypePolicy::default(),
        }
    }
}

impl SimulationConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_start_time(mut self, start_time_ms: i64) -> Self {
        self.start_time_ms = start_time_ms;
        self
    }

    pub fn with_replanning_interval(mut self, interval_ms: Option<i64>) -> Self {
        self.replanning_interval_ms = interval_ms;
        self
    }

    pub fn with_variation_coefficient(mut self, coefficient: f64) -> Self {
        self.variation_coefficient = coefficient;
        self
    }

    pub fn with_interrupt(mut self, interrupt: InterruptConfig) -> Self {
        self.interrupts.push(interrupt);
        self
    }

    pub fn with_order_generation(mut self, inter_arrival: TimeDistribution) -> Self {
        self.order_generation = Some(OrderGenerationConfig { inter_arrival });
        self
    }

    pub fn with_machine_type_policy(mut self, policy: MachineTypePolicy) -> Self {
        self.machine_type_policy = policy;
        self
    }

    /// Parses a configuration from JSON. Missing fields take defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Rejects configurations the simulator cannot run.
    pub fn validate(&self) -> Result<()> {
        if let Some(interval) = self.replanning_interval_ms {
            if interval <= 0 {
                return Err(Error::Config(format!(
                    "replanning interval must be positive, got {interval} ms"
                )));
            }
        }
        if !self.variation_coefficient.is_finite() || self.variation_coefficient < 0.0 {
            return Err(Error::Config(format!(
                "variation coefficient must be non-negative, got {}",
                self.variation_coefficient
            )));
        }
        for (i, interrupt) in self.interrupts.iter().enumerate() {
            interrupt
                .inter_arrival
                .validate_inter_arrival(&format!("interrupts[{i}].inter_arrival"))?;
            interrupt
                .repair_time
                .validate(&format!("interrupts[{i}].repair_time"))?;
        }
        if let Some(generation) = &self.order_generation {
            generation
                .inter_arrival
                .validate_inter_arrival("order_generation.inter_arrival")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::minutes;

    #[test]
    fn test_defaults() {
        let config = SimulationConfig::default();
        assert_eq!(config.seed, 42);
        assert_eq!(config.replanning_interval_ms, Some(hours(8)));
        assert_eq!(config.machine_type_policy, MachineTypePolicy::LowestTypeId);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_json_fills_defaults() {
        let json = r#"{
            "seed": 7,
            "interrupts": [{
                "machine_types": [2],
                "inter_arrival": { "Exponential": { "mean_ms": 3600000.0 } },
                "repair_time": { "Constant": 300000 },
                "max_occurrences": 3
            }]
        }"#;
        let config = SimulationConfig::from_json(json).unwrap();
        assert_eq!(config.seed, 7);
        assert_eq!(config.replanning_interval_ms, Some(hours(8)));
        assert_eq!(config.interrupts.len(), 1);
        let interrupt = &config.interrupts[0];
        assert!(interrupt.machines.is_empty());
        assert_eq!(interrupt.machine_types, vec![MachineType(2)]);
        assert_eq!(interrupt.repair_time, TimeDistribution::Constant(minutes(5)));
        assert_eq!(interrupt.max_occurrences, Some(3));
    }

    #[test]
    fn test_json_round_trip() {
        let config = SimulationConfig::default()
            .with_seed(3)
            .with_replanning_interval(None)
            .with_order_generation(TimeDistribution::Constant(hours(1)))
            .with_machine_type_policy(MachineTypePolicy::Seeded(9));
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(SimulationConfig::from_json(&json).unwrap(), config);
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            SimulationConfig::from_json("{ seed: }"),
            Err(Error::Json(_))
        ));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = SimulationConfig::default().with_replanning_interval(Some(0));
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let config = SimulationConfig::default().with_interrupt(InterruptConfig::new(
            TimeDistribution::Exponential { mean_ms: -1.0 },
            TimeDistribution::Constant(10),
        ));
        assert!(matches!(
            config.validate(),
            Err(Error::InvalidDistribution { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_zero_inter_arrival() {
        let zero_capable = [
            TimeDistribution::Constant(0),
            TimeDistribution::Uniform {
                min_ms: 0,
                max_ms: 0,
            },
            TimeDistribution::Uniform {
                min_ms: 0,
                max_ms: minutes(5),
            },
            TimeDistribution::Triangular {
                min_ms: 0.0,
                mode_ms: 0.0,
                max_ms: 0.0,
            },
            TimeDistribution::Normal {
                mean_ms: 0.0,
                std_dev_ms: 0.0,
            },
        ];
        for inter_arrival in zero_capable {
            let interrupts = SimulationConfig::default().with_interrupt(InterruptConfig::new(
                inter_arrival.clone(),
                TimeDistribution::Constant(minutes(5)),
            ));
            assert!(
                matches!(interrupts.validate(), Err(Error::InvalidDistribution { .. })),
                "interrupt inter-arrival {inter_arrival:?} accepted"
            );

            let orders = SimulationConfig::default().with_order_generation(inter_arrival.clone());
            assert!(
                matches!(orders.validate(), Err(Error::InvalidDistribution { .. })),
                "order inter-arrival {inter_arrival:?} accepted"
            );
        }

        // Zero repair time stays legal.
        let config = SimulationConfig::default()
            .with_interrupt(InterruptConfig::new(
                TimeDistribution::Exponential {
                    mean_ms: minutes(30) as f64,
                },
                TimeDistribution::Constant(0),
            ))
            .with_order_generation(TimeDistribution::Constant(1));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_interrupt_matching() {
        let mut lathe = Machine::new("Lathe", MachineType(1));
        lathe.id = MachineId(0);
        let mut mill = Machine::new("Mill", MachineType(2));
        mill.id = MachineId(1);

        let all = InterruptConfig::new(TimeDistribution::Constant(1), TimeDistribution::Constant(1));
        assert!(all.matches(&lathe) && all.matches(&mill));

        let mills = all.clone().with_machine_types(vec![MachineType(2)]);
        assert!(!mills.matches(&lathe));
        assert!(mills.matches(&mill));

        let first = all.with_machines(vec![MachineId(0)]);
        assert!(first.matches(&lathe));
        assert!(!first.matches(&mill));
    }
}
