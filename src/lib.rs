//! Discrete-event job-shop simulation with event-driven replanning.
//!
//! Simulates machines working through production orders over virtual time
//! while a Giffler-Thompson planner keeps the plan current as machines
//! break down, operations finish late, and new orders arrive.
//!
//! # Modules
//!
//! - **`models`**: Domain types: `Workshop`, `Machine`, `WorkPlan`,
//!   `ProductionOrder`, `WorkOrder`, `WorkOperation`, `Plan`, distributions
//! - **`dispatching`**: Priority rules resolving machine conflicts (`Spt`, ...)
//! - **`planner`**: `Planner` trait, `GifflerThompsonPlanner`, KPIs
//! - **`sim`**: Event scheduler, machine processes, `Simulator`
//! - **`controller`**: `SimulationController` replanning loop, right-shift
//! - **`validation`**: Input integrity checks and plan overlap checks
//! - **`config`**, **`generator`**, **`logging`**, **`time`**: run setup
//!
//! # Architecture
//!
//! ```text
//! Controller ──schedule──▶ Planner ──Plan──▶ Controller ──reconcile──▶ Simulator
//!     ▲                                                                  │
//!     └──────────────────── SimulationEvent ◀── MachineProcess ◀── clock ┘
//! ```
//!
//! The simulator is single-threaded and deterministic for a fixed seed.
//!
//! # References
//!
//! - Giffler & Thompson (1960), "Algorithms for Solving Production-Scheduling Problems"
//! - Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems"
//! - Law (2015), "Simulation Modeling and Analysis"

pub mod config;
pub mod controller;
pub mod dispatching;
pub mod error;
pub mod generator;
pub mod logging;
pub mod models;
pub mod planner;
pub mod sim;
pub mod time;
pub mod validation;

pub use controller::SimulationController;
pub use error::{Error, Result};
