use rocket::request::FromParam;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::common::errors::StationError;

/// Pipeline stage an extension hooks into.
///
/// The declaration order is the execution priority: capture, process, output.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Capture,
    Process,
    Output,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Capture, Category::Process, Category::Output];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Capture => "capture",
            Category::Process => "process",
            Category::Output => "output",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = StationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "capture" => Ok(Category::Capture),
            "process" => Ok(Category::Process),
            "output" => Ok(Category::Output),
            other => Err(StationError::InvalidCategory(other.to_string())),
        }
    }
}

impl<'a> FromParam<'a> for Category {
    type Error = StationError;

    fn from_param(param: &'a str) -> Result<Self, Self::Error> {
        param.parse()
    }
}
