//! Machine model and tool changeover times.
//!
//! A machine belongs to exactly one [`MachineType`] and processes one
//! operation at a time. Switching tools between operations costs a
//! changeover whose mean duration comes from the machine's
//! [`ChangeoverMatrix`].
//!
//! # Reference
//! Allahverdi et al. (2008), "A survey of scheduling problems with
//! setup times or costs"

use serde::{Deserialize, Serialize};

use super::{MachineId, MachineType, ToolId};

/// Runtime state of a machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MachineState {
    /// Not processing (may be waiting or changing tools).
    #[default]
    Idle,
    /// Processing an operation.
    Working,
    /// Broken down; excluded from planning until repaired.
    Interrupted,
}

/// A production machine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Machine {
    /// Registry id, assigned by [`Workshop::add_machine`](super::Workshop::add_machine).
    pub id: MachineId,
    /// Human-readable name.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Machine category.
    pub machine_type: MachineType,
    /// Current state.
    pub state: MachineState,
    /// Tools this machine can mount. The first one is mounted at start.
    pub allowed_tools: Vec<ToolId>,
    /// Mean tool changeover durations.
    pub changeover: ChangeoverMatrix,
}

impl Machine {
    /// Creates an idle machine with no tools and zero changeover.
    pub fn new(name: impl Into<String>, machine_type: MachineType) -> Self {
        Self {
            id: MachineId(0),
            name: name.into(),
            description: String::new(),
            machine_type,
            state: MachineState::Idle,
            allowed_tools: Vec::new(),
            changeover: ChangeoverMatrix::default(),
        }
    }

    /// Sets the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets the mountable tools.
    pub fn with_tools(mut self, tools: Vec<ToolId>) -> Self {
        self.allowed_tools = tools;
        self
    }

    /// Sets the changeover matrix.
    pub fn with_changeover(mut self, changeover: ChangeoverMatrix) -> Self {
        self.changeover = changeover;
        self
    }

    /// Whether the machine can take part in planning.
    #[inline]
    pub fn is_available(&self) -> bool {
        self.state != MachineState::Interrupted
    }

    /// Whether the machine can mount `tool`. Machines without a tool list accept any tool.
    pub fn supports_tool(&self, tool: ToolId) -> bool {
        self.allowed_tools.is_empty() || self.allowed_tools.contains(&tool)
    }

    /// Tool mounted before the first operation, if any.
    pub fn initial_tool(&self) -> Option<ToolId> {
        self.allowed_tools.first().copied()
    }
}

/// One explicit tool-to-tool changeover entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Changeover {
    pub from: ToolId,
    pub to: ToolId,
    /// Mean changeover time (ms).
    pub duration_ms: i64,
}

/// Tool changeover matrix.
///
/// Maps (from_tool, to_tool) to a mean changeover time in ms. Same-tool
/// transitions cost 0 unless set explicitly; other missing pairs fall back
/// to `default_ms`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChangeoverMatrix {
    transitions: Vec<Changeover>,
    /// Mean changeover time for pairs without an explicit entry.
    pub default_ms: i64,
}

impl ChangeoverMatrix {
    /// Creates an empty matrix (every changeover is free).
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the default changeover time.
    pub fn with_default(mut self, default_ms: i64) -> Self {
        self.default_ms = default_ms;
        self
    }

    /// Defines a changeover time, replacing any previous entry for the pair.
    pub fn set(&mut self, from: ToolId, to: ToolId, duration_ms: i64) {
        match self
            .transitions
            .iter_mut()
            .find(|c| c.from == from && c.to == to)
        {
            Some(existing) => existing.duration_ms = duration_ms,
            None => self.transitions.push(Changeover {
                from,
                to,
                duration_ms,
            }),
        }
    }

    /// Builder form of [`set`](Self::set).
    pub fn with(mut self, from: ToolId, to: ToolId, duration_ms: i64) -> Self {
        self.set(from, to, duration_ms);
        self
    }

    /// Mean changeover time between two tools.
    pub fn get(&self, from: ToolId, to: ToolId) -> i64 {
        let explicit = self
            .transitions
            .iter()
            .find(|c| c.from == from && c.to == to)
            .map(|c| c.duration_ms);
        match explicit {
            Some(ms) => ms,
            None if from == to => 0,
            None => self.default_ms,
        }
    }

    /// Number of explicitly defined changeovers.
    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }
}
