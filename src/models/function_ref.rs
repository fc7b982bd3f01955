//! # Function References
//!
//! A task names the code it runs with a string: either a bare function name
//! (`multiply`) or an `object.method` pair (`math.multiply`). Messages keep the
//! raw string so that a malformed reference still reaches a worker, which
//! records the parse failure on the task.

use crate::error::{Result, TaskhiveError};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FunctionRef {
    /// Resolved in the registry's function namespace
    Function(String),
    /// Resolved in a named object's method table
    Method { object: String, method: String },
}

impl FunctionRef {
    pub fn function(name: impl Into<String>) -> Self {
        Self::Function(name.into())
    }

    pub fn method(object: impl Into<String>, method: impl Into<String>) -> Self {
        Self::Method {
            object: object.into(),
            method: method.into(),
        }
    }
}

fn is_identifier(segment: &str) -> bool {
    let mut chars = segment.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl FromStr for FunctionRef {
    type Err = TaskhiveError;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split('.').collect();
        if let Some(bad) = parts.iter().find(|p| !is_identifier(p)) {
            return Err(TaskhiveError::invalid_function_ref(
                s,
                format!("'{bad}' is not a valid identifier"),
            ));
        }
        match parts.as_slice() {
            [name] => Ok(Self::function(*name)),
            [object, method] => Ok(Self::method(*object, *method)),
            _ => Err(TaskhiveError::invalid_function_ref(
                s,
                "expected 'function' or 'object.method'",
            )),
        }
    }
}

impl fmt::Display for FunctionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Function(name) => write!(f, "{name}"),
            Self::Method { object, method } => write!(f, "{object}.{method}"),
        }
    }
}
