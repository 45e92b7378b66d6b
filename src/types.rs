// src/types.rs

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// Which of the two pipelines something belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PipelineKind {
    Scripts,
    Styles,
}

impl fmt::Display for PipelineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineKind::Scripts => f.write_str("scripts"),
            PipelineKind::Styles => f.write_str("styles"),
        }
    }
}

/// What a watch session does with change events that arrive while it is
/// compiling.
///
/// - `Queue`: remember that something changed and compile once more after the
///   current compile finishes. Any number of events collapse into that one
///   extra compile (default).
/// - `Drop`: ignore them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ChangeWhileCompiling {
    #[default]
    Queue,
    Drop,
}

impl FromStr for ChangeWhileCompiling {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "queue" => Ok(ChangeWhileCompiling::Queue),
            "drop" => Ok(ChangeWhileCompiling::Drop),
            other => Err(format!(
                "invalid changes_while_compiling: {other} (expected \"queue\" or \"drop\")"
            )),
        }
    }
}

/// CSS output formatting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputStyle {
    #[default]
    Expanded,
    Compressed,
}
