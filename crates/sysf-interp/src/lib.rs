//! Call-by-value evaluation of elaborated System F programs, with tool calls
//! and `LLM` functions served by pluggable host capabilities.

mod error;
mod eval;
mod host;
mod llm;
mod primitives;
mod value;

pub use error::EvalError;
pub use eval::Evaluator;
pub use host::{LlmConfig, LlmError, LlmHost, OfflineLlm, ToolError, ToolRegistry, Tools};
pub use value::{Env, PrimFn, PrimImpl, Primitive, Value};

use smol_str::SmolStr;
use std::collections::HashMap;
use sysf_core::Module;

/// Evaluate `module` with no tools and an offline LLM host.
pub fn evaluate_program(module: &Module) -> Result<HashMap<SmolStr, Value>, EvalError> {
    Evaluator::new(module).evaluate_program(module)
}
