//! Input and plan validation.
//!
//! [`validate_input`] checks the structural integrity of machines and work
//! plans before a simulation is built and reports every issue it finds.
//! [`validate_plan`] enforces the no-overlap invariant on planner output:
//! no two operations on the same machine, and no two operations of the same
//! work order, may overlap in time.
//!
//! # Reference
//! Pinedo (2016), "Scheduling", Ch. 2.1 (disjunctive constraints)

use std::collections::HashSet;

use crate::error::{Error, Result};
use crate::models::{Assignment, Machine, Plan, WorkPlan};

/// Validation result.
pub type ValidationResult = std::result::Result<(), Vec<ValidationError>>;

/// A validation error.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Error category.
    pub kind: ValidationErrorKind,
    /// Human-readable description.
    pub message: String,
}

/// Categories of validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// Two machines or two work plans share a name.
    DuplicateId,
    /// A work plan has no positions.
    EmptyWorkPlan,
    /// A position requires a machine type no machine has.
    MissingMachineType,
    /// No machine of the required type can mount the position's tool.
    ToolNotAllowed,
    /// A duration or variation coefficient is negative or not finite.
    InvalidDuration,
}

impl ValidationError {
    fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Validates machines and work plans.
///
/// Checks:
/// 1. No duplicate machine names
/// 2. No duplicate work plan names
/// 3. Every work plan has at least one position
/// 4. Every position has a non-negative duration and variation coefficient
/// 5. Every position's machine type is provided by some machine
/// 6. Some machine of that type can mount the position's tool
///
/// # Returns
/// `Ok(())` if all checks pass, `Err(errors)` with all detected issues.
pub fn validate_input(machines: &[Machine], work_plans: &[WorkPlan]) -> ValidationResult {
    let mut errors = Vec::new();

    let mut machine_names = HashSet::new();
    for m in machines {
        if !machine_names.insert(m.name.as_str()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                format!("Duplicate machine name: {}", m.name),
            ));
        }
    }

    let mut plan_names = HashSet::new();
    for plan in work_plans {
        if !plan_names.insert(plan.name.as_str()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                format!("Duplicate work plan name: {}", plan.name),
            ));
        }

        if plan.positions.is_empty() {
            errors.push(ValidationError::new(
                ValidationErrorKind::EmptyWorkPlan,
                format!("Work plan {} has no positions", plan.name),
            ));
        }

        for position in &plan.positions {
            let bad_variation = position
                .variation_coefficient
                .is_some_and(|cv| !cv.is_finite() || cv < 0.0);
            if position.duration_ms < 0 || bad_variation {
                errors.push(ValidationError::new(
                    ValidationErrorKind::InvalidDuration,
                    format!(
                        "Position {} of work plan {} has an invalid duration or variation",
                        position.name, plan.name
                    ),
                ));
            }

            let of_type: Vec<&Machine> = machines
                .iter()
                .filter(|m| m.machine_type == position.machine_type)
                .collect();
            if of_type.is_empty() {
                errors.push(ValidationError::new(
                    ValidationErrorKind::MissingMachineType,
                    format!(
                        "Position {} of work plan {} requires {} but no machine has it",
                        position.name, plan.name, position.machine_type
                    ),
                ));
            } else if !of_type.iter().any(|m| m.supports_tool(position.tool)) {
                errors.push(ValidationError::new(
                    ValidationErrorKind::ToolNotAllowed,
                    format!(
                        "Position {} of work plan {} needs {} which no {} machine can mount",
                        position.name, plan.name, position.tool, position.machine_type
                    ),
                ));
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Checks that no two assignments overlap on a machine or within a work order.
///
/// Intervals are half-open, so back-to-back operations never overlap.
///
/// # Errors
/// [`Error::PlanOverlap`] naming the first overlapping pair found.
pub fn validate_plan(plan: &Plan) -> Result<()> {
    for (machine, group) in plan.by_machine() {
        check_group(&machine.to_string(), &group)?;
    }
    for (work_order, group) in plan.by_work_order() {
        check_group(&work_order.to_string(), &group)?;
    }
    Ok(())
}

fn check_group(resource: &str, sorted: &[&Assignment]) -> Result<()> {
    for (i, first) in sorted.iter().enumerate() {
        for second in &sorted[i + 1..] {
            if first.finish_ms() > second.start_ms() && first.start_ms() < second.finish_ms() {
                return Err(Error::PlanOverlap {
                    resource: resource.to_string(),
                    first: first.operation,
                    second: second.operation,
                });
            }
        }
    }
    Ok(())
}
