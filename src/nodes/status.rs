/*
 *  nodes/status.rs
 *
 *  LyLEDs - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Node status indicator
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFill {
    Red,
    Green,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusShape {
    #[default]
    Dot,
}

/// Status badge shown next to a node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeStatus {
    pub fill: StatusFill,
    pub shape: StatusShape,
    pub text: String,
}

impl NodeStatus {
    fn dot(fill: StatusFill, text: &str) -> Self {
        Self {
            fill,
            shape: StatusShape::Dot,
            text: text.to_string(),
        }
    }

    pub fn ready() -> Self {
        Self::dot(StatusFill::Green, "Ready")
    }

    pub fn not_configured() -> Self {
        Self::dot(StatusFill::Red, "Not configured")
    }

    pub fn driver_error() -> Self {
        Self::dot(StatusFill::Red, "Driver Error")
    }

    pub fn init_failed() -> Self {
        Self::dot(StatusFill::Red, "Init Failed")
    }

    pub fn error() -> Self {
        Self::dot(StatusFill::Red, "Error")
    }

    pub fn is_ok(&self) -> bool {
        self.fill == StatusFill::Green
    }
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fill = match self.fill {
            StatusFill::Red => "red",
            StatusFill::Green => "green",
        };
        write!(f, "[{}] {}", fill, self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_json_shape() {
        let json = serde_json::to_value(NodeStatus::ready()).unwrap();
        assert_eq!(json, serde_json::json!({"fill": "green", "shape": "dot", "text": "Ready"}));

        let json = serde_json::to_value(NodeStatus::init_failed()).unwrap();
        assert_eq!(json["fill"], "red");
        assert_eq!(json["text"], "Init Failed");
    }

    #[test]
    fn test_status_display() {
        assert_eq!(NodeStatus::driver_error().to_string(), "[red] Driver Error");
        assert!(NodeStatus::ready().is_ok());
        assert!(!NodeStatus::error().is_ok());
    }
}
