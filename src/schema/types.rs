//! Attribute data types

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Supported attribute data types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DataType {
    /// Free text
    Text,
    /// Finite number, integral values kept as integers
    Number,
    Boolean,
    /// One of the attribute's allowed values, compared as strings
    Enum,
    /// ISO date, `YYYY-MM-DD`
    Date,
    /// ISO datetime with optional fraction and offset
    Datetime,
}

impl DataType {
    pub const ALL: [DataType; 6] = [
        DataType::Text,
        DataType::Number,
        DataType::Boolean,
        DataType::Enum,
        DataType::Date,
        DataType::Datetime,
    ];

    /// Returns the wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Text => "TEXT",
            DataType::Number => "NUMBER",
            DataType::Boolean => "BOOLEAN",
            DataType::Enum => "ENUM",
            DataType::Date => "DATE",
            DataType::Datetime => "DATETIME",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DataType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("Unknown data type '{}'", s))
    }
}
