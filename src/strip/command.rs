/*
 *  strip/command.rs
 *
 *  LyLEDs - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Inbound payload decoding into strip commands
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

use serde_json::{Map, Value};

use crate::strip::channel::ChannelState;
use crate::strip::color;
use crate::strip::error::CommandError;

/// What a message asks of the strip
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StripCommand {
    /// Blank the strip through the driver's reset path
    Clear,

    /// Render the buffer as it is
    Show,

    /// Set every slot to one packed color
    Fill(u32),

    /// Positional copy from slot 0
    Pixels(Vec<u32>),

    /// Set one slot. `color` is None when the inline color did not parse;
    /// such messages change nothing.
    SetPixel { index: Option<i64>, color: Option<u32> },

    /// New brightness, None when the value is not an integer
    Brightness(Option<i64>),

    /// Payload shape with nothing to apply
    Nothing,
}

/// A decoded message payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StripMessage {
    pub command: StripCommand,

    /// Per-message render flag; only `Some(false)` has an effect
    pub render: Option<bool>,
}

/// Result of applying a command to a channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// Buffer or brightness may have changed (or was left alone by a
    /// lenient branch); follow the normal render decision
    Mutated,

    /// The caller must run the driver's reset path instead of mutating
    Reset,
}

impl StripMessage {
    /// Decode a payload once at the boundary
    pub fn decode(payload: &Value) -> Result<Self, CommandError> {
        match payload {
            Value::String(s) => Ok(Self::plain(Self::decode_string(s)?)),
            Value::Number(_) => Ok(Self::plain(StripCommand::Fill(to_u32(payload)))),
            Value::Object(fields) => Ok(Self::decode_object(fields)),
            _ => Ok(Self::plain(StripCommand::Nothing)),
        }
    }

    /// True unless the payload carried `render: false`
    pub fn render_requested(&self) -> bool {
        self.render != Some(false)
    }

    fn plain(command: StripCommand) -> Self {
        Self { command, render: None }
    }

    fn decode_string(s: &str) -> Result<StripCommand, CommandError> {
        let lowered = s.to_lowercase();
        match lowered.as_str() {
            "clear" => Ok(StripCommand::Clear),
            "render" | "show" => Ok(StripCommand::Show),
            _ => color::parse_packed(s)
                .map(StripCommand::Fill)
                .ok_or_else(|| CommandError::InvalidColor(s.to_string())),
        }
    }

    fn decode_object(fields: &Map<String, Value>) -> Self {
        let command = if let Some(Value::Array(values)) = fields.get("pixels") {
            StripCommand::Pixels(values.iter().map(to_u32).collect())
        } else if let (Some(index), Some(color)) = (fields.get("index"), fields.get("color")) {
            StripCommand::SetPixel {
                index: to_index(index),
                color: color.as_str().and_then(color::parse_packed),
            }
        } else if let Some(brightness) = fields.get("brightness") {
            StripCommand::Brightness(parse_int(brightness))
        } else {
            StripCommand::Nothing
        };

        Self {
            command,
            render: fields.get("render").and_then(Value::as_bool),
        }
    }
}

impl StripCommand {
    /// Mutate `channel` in place. Out-of-range indices, bad inline colors
    /// and out-of-range brightness are ignored.
    pub fn apply(&self, channel: &mut ChannelState) -> Applied {
        match self {
            StripCommand::Clear => return Applied::Reset,
            StripCommand::Show | StripCommand::Nothing => {}
            StripCommand::Fill(color) => channel.fill(*color),
            StripCommand::Pixels(values) => {
                channel.copy_pixels(values);
            }
            StripCommand::SetPixel { index: Some(index), color: Some(color) } => {
                channel.set_pixel(*index, *color);
            }
            StripCommand::SetPixel { .. } => {}
            StripCommand::Brightness(Some(value)) => {
                channel.set_brightness(*value);
            }
            StripCommand::Brightness(None) => {}
        }
        Applied::Mutated
    }
}

/// Store a value into a 32-bit slot: integers wrap, fractions truncate,
/// numeric strings and booleans convert, anything else becomes 0
fn to_u32(value: &Value) -> u32 {
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                i as u32
            } else if let Some(u) = n.as_u64() {
                u as u32
            } else {
                n.as_f64().map_or(0, wrap_u32)
            }
        }
        Value::String(s) => numeric_string(s).map_or(0, wrap_u32),
        Value::Bool(b) => u32::from(*b),
        _ => 0,
    }
}

/// Truncate and wrap modulo 2^32; NaN and infinities become 0
fn wrap_u32(f: f64) -> u32 {
    if f.is_finite() {
        f.trunc().rem_euclid(4_294_967_296.0) as u32
    } else {
        0
    }
}

/// Whole-string numeric conversion: blank is 0, `0x`/`0o`/`0b` prefixes
/// are honoured, anything else must be a decimal number
fn numeric_string(s: &str) -> Option<f64> {
    let s = s.trim();
    if s.is_empty() {
        return Some(0.0);
    }

    let radix = match s.get(..2).map(str::to_ascii_lowercase).as_deref() {
        Some("0x") => Some(16),
        Some("0o") => Some(8),
        Some("0b") => Some(2),
        _ => None,
    };
    match radix {
        Some(radix) => u64::from_str_radix(&s[2..], radix).ok().map(|n| n as f64),
        None if s.bytes().all(|b| b.is_ascii_digit() || b"+-.eE".contains(&b)) => {
            s.parse::<f64>().ok()
        }
        None => None,
    }
}

/// Integer index from a number or a numeric string; fractional indices
/// address nothing
fn to_index(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

/// Base-10 integer parse: numbers truncate, strings take their leading
/// digits ("128px" -> 128)
fn parse_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        Value::String(s) => {
            let s = s.trim_start();
            let (sign, digits) = match s.as_bytes().first() {
                Some(b'-') => (-1, &s[1..]),
                Some(b'+') => (1, &s[1..]),
                _ => (1, s),
            };
            let end = digits.find(|c: char| !c.is_ascii_digit()).unwrap_or(digits.len());
            digits[..end].parse::<i64>().ok().map(|n| sign * n)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn decode(payload: Value) -> StripMessage {
        StripMessage::decode(&payload).unwrap()
    }

    #[test]
    fn test_string_commands() {
        assert_eq!(decode(json!("clear")).command, StripCommand::Clear);
        assert_eq!(decode(json!("CLEAR")).command, StripCommand::Clear);
        assert_eq!(decode(json!("render")).command, StripCommand::Show);
        assert_eq!(decode(json!("Show")).command, StripCommand::Show);
        assert_eq!(decode(json!("#ff0000")).command, StripCommand::Fill(0xff0000));
    }

    #[test]
    fn test_invalid_color_string() {
        let err = StripMessage::decode(&json!("not-a-color")).unwrap_err();
        assert_eq!(err, CommandError::InvalidColor("not-a-color".into()));
    }

    #[test]
    fn test_numeric_fill_is_unvalidated() {
        assert_eq!(decode(json!(0x00ff00)).command, StripCommand::Fill(0x00ff00));
        assert_eq!(decode(json!(0xffffffffu32)).command, StripCommand::Fill(0xffffffff));
        assert_eq!(decode(json!(-1)).command, StripCommand::Fill(0xffffffff));
        assert_eq!(decode(json!(255.9)).command, StripCommand::Fill(255));
    }

    #[test]
    fn test_object_precedence() {
        // pixels wins over index/color and brightness
        let msg = decode(json!({ "pixels": [1, 2], "index": 0, "color": "red", "brightness": 5 }));
        assert_eq!(msg.command, StripCommand::Pixels(vec![1, 2]));

        // index/color wins over brightness
        let msg = decode(json!({ "index": 3, "color": "blue", "brightness": 5 }));
        assert_eq!(msg.command, StripCommand::SetPixel { index: Some(3), color: Some(0x0000ff) });

        let msg = decode(json!({ "brightness": "128" }));
        assert_eq!(msg.command, StripCommand::Brightness(Some(128)));

        // index without color falls through to brightness
        let msg = decode(json!({ "index": 3, "brightness": 7 }));
        assert_eq!(msg.command, StripCommand::Brightness(Some(7)));

        // a null index still claims the index/color branch
        let msg = decode(json!({ "index": null, "color": "red", "brightness": 10 }));
        assert_eq!(msg.command, StripCommand::SetPixel { index: None, color: Some(0xff0000) });

        let msg = decode(json!({ "brightness": null }));
        assert_eq!(msg.command, StripCommand::Brightness(None));

        let msg = decode(json!({ "foo": 1 }));
        assert_eq!(msg.command, StripCommand::Nothing);
        assert!(msg.render_requested());
    }

    #[test]
    fn test_pixel_entries_convert_like_numbers() {
        let msg = decode(json!({
            "pixels": ["255", true, false, null, " 0x10 ", "1e3", "abc", "", 4294967297.5, -1.5]
        }));
        assert_eq!(
            msg.command,
            StripCommand::Pixels(vec![255, 1, 0, 0, 16, 1000, 0, 0, 1, 0xffffffff])
        );
    }

    #[test]
    fn test_lenient_set_pixel() {
        let msg = decode(json!({ "index": 1, "color": "nope" }));
        assert_eq!(msg.command, StripCommand::SetPixel { index: Some(1), color: None });

        let msg = decode(json!({ "index": 1.5, "color": "red" }));
        assert_eq!(msg.command, StripCommand::SetPixel { index: None, color: Some(0xff0000) });
    }

    #[test]
    fn test_render_flag() {
        let msg = decode(json!({ "pixels": [0xff0000], "render": false }));
        assert_eq!(msg.render, Some(false));
        assert!(!msg.render_requested());

        let msg = decode(json!({ "pixels": [0xff0000], "render": true }));
        assert!(msg.render_requested());

        // render is only read from objects
        assert!(decode(json!("#00ff00")).render_requested());
    }

    #[test]
    fn test_other_shapes_do_nothing() {
        assert_eq!(decode(json!(null)).command, StripCommand::Nothing);
        assert_eq!(decode(json!(true)).command, StripCommand::Nothing);
        assert_eq!(decode(json!([1, 2, 3])).command, StripCommand::Nothing);
    }

    #[test]
    fn test_parse_int_prefix() {
        assert_eq!(parse_int(&json!("128px")), Some(128));
        assert_eq!(parse_int(&json!(" -4")), Some(-4));
        assert_eq!(parse_int(&json!("abc")), None);
        assert_eq!(parse_int(&json!(99.9)), Some(99));
        assert_eq!(parse_int(&json!(true)), None);
    }
}
