// ABOUTME: Ordered deployment orchestration: apply, rollback, step-back.
// ABOUTME: Exports the orchestrator, template units, and deployment errors.

mod error;
mod orchestrator;
mod unit;

pub use error::DeployError;
pub use orchestrator::{EnvironmentStatus, Orchestrator};
pub use unit::{DeploymentUnit, ParamValue, UnitError};
