//! Work plans: product routings.
//!
//! A work plan is the recipe for producing one unit of a product: an
//! ordered list of positions, each naming the machine type, tool, and
//! nominal duration of one processing step.

use serde::{Deserialize, Serialize};

use super::{MachineType, ToolId};

/// One step of a routing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkPlanPosition {
    /// Step name (e.g., "Drilling").
    pub name: String,
    /// Nominal processing time (ms).
    pub duration_ms: i64,
    /// Machine type required.
    pub machine_type: MachineType,
    /// Tool required.
    pub tool: ToolId,
    /// Per-step override of the global processing-time variation coefficient.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variation_coefficient: Option<f64>,
}

impl WorkPlanPosition {
    pub fn new(
        name: impl Into<String>,
        duration_ms: i64,
        machine_type: MachineType,
        tool: ToolId,
    ) -> Self {
        Self {
            name: name.into(),
            duration_ms,
            machine_type,
            tool,
            variation_coefficient: None,
        }
    }

    /// Overrides the variation coefficient for this step.
    pub fn with_variation(mut self, coefficient: f64) -> Self {
        self.variation_coefficient = Some(coefficient);
        self
    }
}

/// A product routing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkPlan {
    /// Unique name.
    pub name: String,
    /// Steps in processing order.
    pub positions: Vec<WorkPlanPosition>,
}

impl WorkPlan {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            positions: Vec::new(),
        }
    }

    /// Appends a step.
    pub fn with_position(mut self, position: WorkPlanPosition) -> Self {
        self.positions.push(position);
        self
    }

    /// Sum of nominal step durations (ms).
    pub fn total_duration_ms(&self) -> i64 {
        self.positions.iter().map(|p| p.duration_ms).sum()
    }

    /// Distinct machine types used, in order of first appearance.
    pub fn machine_types(&self) -> Vec<MachineType> {
        let mut types = Vec::new();
        for p in &self.positions {
            if !types.contains(&p.machine_type) {
                types.push(p.machine_type);
            }
        }
        types
    }
}
