//! Job-shop domain models.
//!
//! Provides the data types shared by the planner, the simulator, and the
//! controller. All entities are owned by the [`Workshop`] registry and
//! referenced by typed ids.
//!
//! # Domain Mappings
//!
//! | Type | Meaning |
//! |------|---------|
//! | `WorkPlan` | Product routing (ordered positions) |
//! | `ProductionOrder` | Request for `quantity` units of a work plan |
//! | `WorkOrder` | One unit of a production order |
//! | `WorkOperation` | One routing step of one work order |
//! | `Machine` | Processing resource of a given type |
//! | `Plan` | Planner output: operation → machine × time |

mod distribution;
mod feedback;
mod ids;
mod machine;
mod operation;
mod order;
mod plan;
mod work_plan;
mod workshop;

pub use distribution::{
    sample_positive_normal, DiscreteDistribution, TimeDistribution, MIN_INTER_ARRIVAL_MS,
};
pub use feedback::{
    InfluenceFactors, ProductionFeedback, FACTOR_CURRENT_TIME, FACTOR_NEEDED_CHANGEOVER,
};
pub use ids::{MachineId, MachineType, OperationId, ProductionOrderId, ToolId, WorkOrderId};
pub use machine::{Changeover, ChangeoverMatrix, Machine, MachineState};
pub use operation::{OperationState, WorkOperation};
pub use order::{OrderState, ProductionOrder, WorkOrder};
pub use plan::{Assignment, Plan};
pub use work_plan::{WorkPlan, WorkPlanPosition};
pub use workshop::Workshop;
