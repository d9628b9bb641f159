// THEORY:
// This file is the entry point for the `phosphene` library crate. It exposes
// the `pipeline` (runner + orchestrator) as the high-level API, with the
// building blocks of the simulation (`core_modules`) available to callers that
// want a single implant, a custom grid or direct access to percepts.
//
// Consumers such as the HTTP front end only need `Orchestrator`,
// `SimulationRunner`, `TempFileManager` and `SimulationError`.

pub mod core_modules;
pub mod error;
pub mod pipeline;

pub use core_modules::registry::{ConfigurationRegistry, ImplantConfiguration, ImplantKind, ModelParams};
pub use core_modules::temp_file::{StagedFile, TempFileManager};
pub use error::SimulationError;
pub use pipeline::{Orchestrator, SimulationResult, SimulationRunner};
