//! Production orders and work orders.
//!
//! A production order requests `quantity` units of a work plan. It is
//! expanded into one work order per unit; each work order owns the chain
//! of operations for that unit.

use serde::{Deserialize, Serialize};

use super::{OperationId, ProductionOrderId, WorkOrderId};

/// Lifecycle of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OrderState {
    #[default]
    Created,
    InProgress,
    Completed,
}

/// A customer request for a quantity of one product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductionOrder {
    pub id: ProductionOrderId,
    pub name: String,
    /// Name of the work plan being produced.
    pub work_plan: String,
    pub quantity: u32,
    pub state: OrderState,
    /// When the first operation started (ms).
    pub started_at_ms: Option<i64>,
    /// When the last work order completed (ms).
    pub completed_at_ms: Option<i64>,
    /// One work order per unit.
    pub work_orders: Vec<WorkOrderId>,
}

impl ProductionOrder {
    /// Lead time from first start to completion (ms).
    pub fn lead_time_ms(&self) -> Option<i64> {
        Some(self.completed_at_ms? - self.started_at_ms?)
    }
}

/// One unit of a production order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkOrder {
    pub id: WorkOrderId,
    pub production_order: ProductionOrderId,
    pub name: String,
    pub state: OrderState,
    pub started_at_ms: Option<i64>,
    pub completed_at_ms: Option<i64>,
    /// Operations in routing order.
    pub operations: Vec<OperationId>,
}

impl WorkOrder {
    pub fn is_completed(&self) -> bool {
        self.state == OrderState::Completed
    }
}
