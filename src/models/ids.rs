//! Typed identifiers.
//!
//! Entities live in the [`Workshop`](super::Workshop) registry and refer to
//! each other by index-backed ids rather than references, which keeps the
//! operation graph free of ownership cycles.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! index_id {
    ($(#[$doc:meta])* $name:ident, $prefix:literal) => {
        $(#[$doc])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        pub struct $name(pub usize);

        impl $name {
            /// Registry index.
            #[inline]
            pub fn index(self) -> usize {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "#{}"), self.0)
            }
        }
    };
}

index_id!(
    /// Identifies a [`WorkOperation`](super::WorkOperation).
    OperationId,
    "op"
);
index_id!(
    /// Identifies a [`Machine`](super::Machine).
    MachineId,
    "machine"
);
index_id!(
    /// Identifies a [`WorkOrder`](super::WorkOrder).
    WorkOrderId,
    "wo"
);
index_id!(
    /// Identifies a [`ProductionOrder`](super::ProductionOrder).
    ProductionOrderId,
    "po"
);

/// Category of machine. Operations are planned onto any machine of their type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MachineType(pub u32);

impl fmt::Display for MachineType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "type{}", self.0)
    }
}

/// Tool mounted on a machine while processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ToolId(pub u32);

impl fmt::Display for ToolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tool{}", self.0)
    }
}
