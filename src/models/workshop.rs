//! The workshop registry.
//!
//! Owns every machine, order, and operation of a simulation run. Other
//! components hold typed ids and resolve them here; ids are indices into
//! append-only vectors, so they stay valid for the registry's lifetime.

use serde::{Deserialize, Serialize};
use tracing::info;

use super::{
    Machine, MachineId, MachineType, OperationId, OrderState, ProductionOrder, ProductionOrderId,
    WorkOperation, WorkOrder, WorkOrderId, WorkPlan,
};
use crate::error::{Error, Result};

/// Registry of machines, orders, and operations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Workshop {
    machines: Vec<Machine>,
    production_orders: Vec<ProductionOrder>,
    work_orders: Vec<WorkOrder>,
    operations: Vec<WorkOperation>,
}

impl Workshop {
    pub fn new() -> Self {
        Self::default()
    }

    // ======================== Machines ========================

    /// Registers a machine and returns its id.
    pub fn add_machine(&mut self, mut machine: Machine) -> MachineId {
        let id = MachineId(self.machines.len());
        machine.id = id;
        self.machines.push(machine);
        id
    }

    /// Builder form of [`add_machine`](Self::add_machine).
    pub fn with_machine(mut self, machine: Machine) -> Self {
        self.add_machine(machine);
        self
    }

    pub fn machines(&self) -> &[Machine] {
        &self.machines
    }

    pub fn machine(&self, id: MachineId) -> Result<&Machine> {
        self.machines.get(id.0).ok_or(Error::UnknownMachine(id))
    }

    pub fn machine_mut(&mut self, id: MachineId) -> Result<&mut Machine> {
        self.machines.get_mut(id.0).ok_or(Error::UnknownMachine(id))
    }

    pub fn machine_ids(&self) -> Vec<MachineId> {
        self.machines.iter().map(|m| m.id).collect()
    }

    /// Machines that are not interrupted.
    pub fn available_machine_ids(&self) -> Vec<MachineId> {
        self.machines
            .iter()
            .filter(|m| m.is_available())
            .map(|m| m.id)
            .collect()
    }

    /// Whether any machine (interrupted or not) has the given type.
    pub fn has_machine_type(&self, machine_type: MachineType) -> bool {
        self.machines.iter().any(|m| m.machine_type == machine_type)
    }

    // ======================== Orders ========================

    /// Expands a production order into `quantity` work orders, each a
    /// linear chain of operations following `work_plan`.
    ///
    /// Returns the new production order's id; its operations are listed by
    /// [`operations_of`](Self::operations_of).
    pub fn add_production_order(
        &mut self,
        name: impl Into<String>,
        work_plan: &WorkPlan,
        quantity: u32,
    ) -> Result<ProductionOrderId> {
        let name = name.into();
        if quantity == 0 {
            return Err(Error::Config(format!(
                "production order {name} has zero quantity"
            )));
        }
        if work_plan.positions.is_empty() {
            return Err(Error::Config(format!(
                "work plan {} has no positions",
                work_plan.name
            )));
        }

        let po_id = ProductionOrderId(self.production_orders.len());
        let mut work_order_ids = Vec::with_capacity(quantity as usize);

        for unit in 0..quantity {
            let wo_id = WorkOrderId(self.work_orders.len());
            let mut chain = Vec::with_capacity(work_plan.positions.len());

            for position in &work_plan.positions {
                let op_id = OperationId(self.operations.len());
                let mut op = WorkOperation::new(op_id, wo_id, position.clone());
                if let Some(&prev) = chain.last() {
                    op.predecessor = Some(prev);
                    self.operations[prev.0].successor = Some(op_id);
                }
                self.operations.push(op);
                chain.push(op_id);
            }

            self.work_orders.push(WorkOrder {
                id: wo_id,
                production_order: po_id,
                name: format!("{name}/{}", unit + 1),
                state: OrderState::Created,
                started_at_ms: None,
                completed_at_ms: None,
                operations: chain,
            });
            work_order_ids.push(wo_id);
        }

        self.production_orders.push(ProductionOrder {
            id: po_id,
            name,
            work_plan: work_plan.name.clone(),
            quantity,
            state: OrderState::Created,
            started_at_ms: None,
            completed_at_ms: None,
            work_orders: work_order_ids,
        });
        Ok(po_id)
    }

    pub fn production_orders(&self) -> &[ProductionOrder] {
        &self.production_orders
    }

    pub fn production_order(&self, id: ProductionOrderId) -> Option<&ProductionOrder> {
        self.production_orders.get(id.0)
    }

    pub fn work_orders(&self) -> &[WorkOrder] {
        &self.work_orders
    }

    pub fn work_order(&self, id: WorkOrderId) -> Option<&WorkOrder> {
        self.work_orders.get(id.0)
    }

    /// All operations of a production order, work order by work order.
    pub fn operations_of(&self, id: ProductionOrderId) -> Vec<OperationId> {
        self.production_order(id)
            .map(|po| {
                po.work_orders
                    .iter()
                    .filter_map(|wo| self.work_order(*wo))
                    .flat_map(|wo| wo.operations.iter().copied())
                    .collect()
            })
            .unwrap_or_default()
    }

    // ======================== Operations ========================

    pub fn operations(&self) -> &[WorkOperation] {
        &self.operations
    }

    pub fn operation(&self, id: OperationId) -> Result<&WorkOperation> {
        self.operations.get(id.0).ok_or(Error::UnknownOperation(id))
    }

    pub fn operation_mut(&mut self, id: OperationId) -> Result<&mut WorkOperation> {
        self.operations
            .get_mut(id.0)
            .ok_or(Error::UnknownOperation(id))
    }

    /// Records that an operation started; opens its work and production order.
    pub fn mark_started(&mut self, id: OperationId, now_ms: i64) -> Result<()> {
        let wo_id = self.operation(id)?.work_order;
        let Some(wo) = self.work_orders.get_mut(wo_id.0) else {
            return Ok(());
        };
        if wo.state == OrderState::Created {
            wo.state = OrderState::InProgress;
            wo.started_at_ms = Some(now_ms);
        }
        if let Some(po) = self.production_orders.get_mut(wo.production_order.0) {
            if po.state == OrderState::Created {
                po.state = OrderState::InProgress;
                po.started_at_ms = Some(now_ms);
            }
        }
        Ok(())
    }

    /// Records that an operation finished. Closes its work order when it was
    /// the last step, and the production order when all its units are done.
    ///
    /// Returns the production order id if this completion finished it.
    pub fn mark_completed(
        &mut self,
        id: OperationId,
        now_ms: i64,
    ) -> Result<Option<ProductionOrderId>> {
        let op = self.operation(id)?;
        if op.successor.is_some() {
            return Ok(None);
        }
        let wo_id = op.work_order;
        let Some(wo) = self.work_orders.get_mut(wo_id.0) else {
            return Ok(None);
        };
        wo.state = OrderState::Completed;
        wo.completed_at_ms = Some(now_ms);
        let po_id = wo.production_order;

        let Some(po) = self.production_orders.get(po_id.0) else {
            return Ok(None);
        };
        let all_done = po
            .work_orders
            .iter()
            .all(|w| self.work_orders.get(w.0).is_some_and(WorkOrder::is_completed));
        if !all_done {
            return Ok(None);
        }
        if let Some(po) = self.production_orders.get_mut(po_id.0) {
            po.state = OrderState::Completed;
            po.completed_at_ms = Some(now_ms);
            info!(order = %po.name, at_ms = now_ms, "production order completed");
        }
        Ok(Some(po_id))
    }
}
