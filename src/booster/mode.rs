//! Operation modes

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which strategy handles a triggered optimization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationMode {
    /// Rewrite a selected prompt in place, on demand
    #[default]
    Manual,
    /// Intercept chat prompts and show an optimized preview
    Realtime,
    /// Stage the optimized prompt in an editable `.prompt.md` file
    File,
}

impl OperationMode {
    pub const ALL: [OperationMode; 3] = [Self::Manual, Self::Realtime, Self::File];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Realtime => "realtime",
            Self::File => "file",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Manual => "Manual",
            Self::Realtime => "Real-time",
            Self::File => "File",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            Self::Manual => "🔧",
            Self::Realtime => "⚡",
            Self::File => "📝",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Manual => "Boost prompts on demand",
            Self::Realtime => "Auto-optimize with preview",
            Self::File => "Generate editable prompt files",
        }
    }
}

impl fmt::Display for OperationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OperationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "manual" => Ok(Self::Manual),
            "realtime" | "real-time" => Ok(Self::Realtime),
            "file" => Ok(Self::File),
            other => Err(format!(
                "Invalid mode '{}'. Valid modes are: manual, realtime, file",
                other
            )),
        }
    }
}
