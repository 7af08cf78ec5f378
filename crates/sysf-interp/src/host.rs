//! Capabilities the evaluator borrows from its host: named tools reachable
//! through `(tool name args...)` and a model endpoint for `LLM` functions.

use crate::Value;
use smol_str::SmolStr;
use std::collections::HashMap;

// ── Tools ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ToolError {
    #[error("unknown tool: {0}")]
    Unknown(SmolStr),

    #[error("tool {tool} failed: {message}")]
    Failed { tool: SmolStr, message: String },
}

pub trait ToolRegistry {
    fn execute(&self, name: &str, args: &[Value]) -> Result<Value, ToolError>;
}

type ToolFn = Box<dyn Fn(&[Value]) -> Result<Value, String>>;

/// In-memory registry of tool closures.
#[derive(Default)]
pub struct Tools {
    tools: HashMap<SmolStr, ToolFn>,
}

impl Tools {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        name: impl Into<SmolStr>,
        tool: impl Fn(&[Value]) -> Result<Value, String> + 'static,
    ) {
        self.tools.insert(name.into(), Box::new(tool));
    }

    pub fn with(
        mut self,
        name: impl Into<SmolStr>,
        tool: impl Fn(&[Value]) -> Result<Value, String> + 'static,
    ) -> Self {
        self.register(name, tool);
        self
    }
}

impl ToolRegistry for Tools {
    fn execute(&self, name: &str, args: &[Value]) -> Result<Value, ToolError> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| ToolError::Unknown(SmolStr::new(name)))?;
        tool(args).map_err(|message| ToolError::Failed {
            tool: SmolStr::new(name),
            message,
        })
    }
}

// ── LLM ──────────────────────────────────────────────────────────

/// Failures while running an `LLM` function. The evaluator never lets one
/// escape: the call returns its input instead.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LlmError {
    #[error("cannot build prompt: {0}")]
    Prompt(String),

    #[error("model call failed: {0}")]
    Host(String),

    #[error("cannot parse response: {0}")]
    Parse(String),
}

pub trait LlmHost {
    fn call(&self, model: &str, temperature: f64, prompt: &str) -> Result<String, LlmError>;
}

/// A host with no provider behind it. Every call fails, so `LLM` functions
/// behave as the identity.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineLlm;

impl LlmHost for OfflineLlm {
    fn call(&self, model: &str, _temperature: f64, _prompt: &str) -> Result<String, LlmError> {
        Err(LlmError::Host(format!("no provider configured for model {}", model)))
    }
}

/// Model settings used when an `LLM` pragma does not name its own.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmConfig {
    pub model: String,
    pub temperature: f64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "default".into(),
            temperature: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tools_dispatch_by_name() {
        let tools = Tools::new().with("len", |args: &[Value]| match args {
            [Value::String(s)] => Ok(Value::Int(s.len() as i64)),
            _ => Err("expected one string".into()),
        });
        assert_eq!(
            tools.execute("len", &[Value::string("abc")]),
            Ok(Value::Int(3))
        );
        assert_eq!(
            tools.execute("len", &[]).unwrap_err().to_string(),
            "tool len failed: expected one string"
        );
        assert_eq!(
            tools.execute("nope", &[]),
            Err(ToolError::Unknown("nope".into()))
        );
    }

    #[test]
    fn offline_host_always_fails() {
        let err = OfflineLlm.call("gpt-4o", 0.2, "hi").unwrap_err();
        assert!(matches!(err, LlmError::Host(_)));
    }
}
