//! Prompt construction and response parsing for `LLM` functions.

use crate::{LlmError, Value};
use smol_str::SmolStr;
use std::collections::HashMap;
use std::fmt::Write;
use sysf_core::{DataDeclaration, LlmFunction, Type};

/// Render an argument the way it is shown to the model. Functions have no
/// textual form.
fn render_input(value: &Value) -> Result<String, LlmError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Int(_) => Ok(value.to_string()),
        Value::Constructor { .. } if value.is_saturated() => Ok(value.to_string()),
        other => Err(LlmError::Prompt(format!("cannot show {} to a model", other))),
    }
}

pub fn craft_prompt(function: &LlmFunction, input: &Value) -> Result<String, LlmError> {
    let mut prompt = String::new();
    let fmt_err = |e: std::fmt::Error| LlmError::Prompt(e.to_string());

    if let Some(doc) = &function.docstring {
        writeln!(prompt, "{}", doc.trim()).map_err(fmt_err)?;
        writeln!(prompt).map_err(fmt_err)?;
    }
    if !function.param_docstrings.is_empty() {
        writeln!(prompt, "Parameters:").map_err(fmt_err)?;
        for (name, doc) in &function.param_docstrings {
            writeln!(prompt, "- {} ({}): {}", name, function.param_type, doc).map_err(fmt_err)?;
        }
        writeln!(prompt).map_err(fmt_err)?;
    }
    writeln!(prompt, "Input: {}", render_input(input)?).map_err(fmt_err)?;
    write!(
        prompt,
        "Respond with a value of type {} and nothing else.",
        function.return_type
    )
    .map_err(fmt_err)?;
    Ok(prompt)
}

/// Read a model response back as a value of `ty`.
pub fn parse_response(
    response: &str,
    ty: &Type,
    data_types: &HashMap<SmolStr, DataDeclaration>,
) -> Result<Value, LlmError> {
    let text = response.trim();
    match ty {
        Type::Primitive(name) if name == "Int" => text
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|_| LlmError::Parse(format!("expected an integer, got {:?}", text))),

        Type::Primitive(name) if name == "String" => {
            let unquoted = text
                .strip_prefix('"')
                .and_then(|t| t.strip_suffix('"'))
                .unwrap_or(text);
            Ok(Value::string(unquoted))
        }

        Type::Constructor(name, _) => {
            let data = data_types
                .get(name)
                .filter(|d| d.is_enumeration())
                .ok_or_else(|| {
                    LlmError::Parse(format!("cannot read a response as {}", ty))
                })?;
            data.constructors
                .iter()
                .find(|c| c.name == text)
                .map(|c| Value::constructor(c.name.clone(), Vec::new()))
                .ok_or_else(|| {
                    LlmError::Parse(format!("{:?} is not a constructor of {}", text, name))
                })
        }

        _ => Err(LlmError::Parse(format!("cannot read a response as {}", ty))),
    }
}
