//! Schema validator facade
//!
//! One validation contract, two interchangeable backends: a full validator
//! that interprets schema documents at runtime, and a precompiled set of
//! check functions for targets where script evaluation is forbidden. Backend
//! selection is a pure function of the deployment target's capabilities,
//! decided once at client construction.

pub mod full;
pub mod precompiled;
pub mod schemas;

pub use full::FullValidator;
pub use precompiled::PrecompiledValidator;

use crate::policy::DeploymentTarget;
use crate::traits::validator::SchemaValidator;

/// Select the validator backend for a deployment target
pub fn for_target(target: DeploymentTarget) -> Box<dyn SchemaValidator> {
    if target.capabilities().script_eval {
        Box::new(FullValidator::new())
    } else {
        Box::new(PrecompiledValidator::new())
    }
}

/// Schema name used to advisory-check inbound payloads for an action
pub fn response_schema(action: &str) -> String {
    format!("{action}.response")
}
