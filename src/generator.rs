//! Production order generator for dynamic arrivals.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::{DiscreteDistribution, WorkPlan};

/// A production order drawn by [`OrderGenerator::generate`].
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedOrder {
    pub name: String,
    pub work_plan: WorkPlan,
    pub quantity: u32,
}

/// Draws production orders from weighted work plans and quantities.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderGenerator {
    work_plans: DiscreteDistribution<WorkPlan>,
    quantities: DiscreteDistribution<u32>,
    #[serde(default)]
    generated: u64,
}

impl OrderGenerator {
    pub fn new(
        work_plans: DiscreteDistribution<WorkPlan>,
        quantities: DiscreteDistribution<u32>,
    ) -> Self {
        Self {
            work_plans,
            quantities,
            generated: 0,
        }
    }

    /// Work plans this generator may draw.
    pub fn work_plans(&self) -> &[WorkPlan] {
        self.work_plans.values()
    }

    /// Number of orders generated so far.
    pub fn generated(&self) -> u64 {
        self.generated
    }

    /// Draws the next order. Names run `GEN-1`, `GEN-2`, ...
    ///
    /// # Errors
    /// [`Error::InvalidDistribution`] when the quantity drawn is zero.
    pub fn generate<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<GeneratedOrder> {
        let work_plan = self.work_plans.sample(rng).clone();
        let quantity = *self.quantities.sample(rng);
        if quantity == 0 {
            return Err(Error::InvalidDistribution {
                name: "order quantity".to_string(),
                reason: "quantity must be positive".to_string(),
            });
        }
        self.generated += 1;
        Ok(GeneratedOrder {
            name: format!("GEN-{}", self.generated),
            work_plan,
            quantity,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MachineType, ToolId, WorkPlanPosition};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn plan(name: &str) -> WorkPlan {
        WorkPlan::new(name).with_position(WorkPlanPosition::new("X", 1000, MachineType(1), ToolId(1)))
    }

    #[test]
    fn test_generates_named_orders() {
        let mut generator = OrderGenerator::new(
            DiscreteDistribution::constant(plan("Gear")),
            DiscreteDistribution::constant(3),
        );
        let mut rng = StdRng::seed_from_u64(1);

        let first = generator.generate(&mut rng).unwrap();
        let second = generator.generate(&mut rng).unwrap();
        assert_eq!(first.name, "GEN-1");
        assert_eq!(second.name, "GEN-2");
        assert_eq!(first.work_plan.name, "Gear");
        assert_eq!(first.quantity, 3);
        assert_eq!(generator.generated(), 2);
    }

    #[test]
    fn test_weighted_plan_choice() {
        let mut generator = OrderGenerator::new(
            DiscreteDistribution::new(vec![plan("A"), plan("B")], vec![0.0, 1.0]).unwrap(),
            DiscreteDistribution::uniform(vec![1, 2]).unwrap(),
        );
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..20 {
            let order = generator.generate(&mut rng).unwrap();
            assert_eq!(order.work_plan.name, "B");
            assert!((1..=2).contains(&order.quantity));
        }
    }

    #[test]
    fn test_zero_quantity_is_rejected() {
        let mut generator = OrderGenerator::new(
            DiscreteDistribution::constant(plan("A")),
            DiscreteDistribution::constant(0),
        );
        let mut rng = StdRng::seed_from_u64(0);
        assert!(matches!(
            generator.generate(&mut rng),
            Err(Error::InvalidDistribution { .. })
        ));
        assert_eq!(generator.generated(), 0);
    }
}
