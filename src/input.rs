/*
 *  input.rs
 *
 *  LyLEDs - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Line-oriented message input for the host binary
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

use serde_json::Value;

/// Payload carried by one input line
///
/// A JSON object with a `payload` field is a message envelope; any other
/// JSON value is the payload itself; anything that is not JSON is a string
/// payload. Blank lines carry nothing.
pub fn payload_from_line(line: &str) -> Option<Value> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    match serde_json::from_str::<Value>(line) {
        Ok(Value::Object(mut envelope)) if envelope.contains_key("payload") => {
            envelope.remove("payload")
        }
        Ok(value) => Some(value),
        Err(_) => Some(Value::String(line.to_string())),
    }
}
