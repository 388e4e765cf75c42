/*
 *  strip/color.rs
 *
 *  LyLEDs - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Color string parsing into packed 0xRRGGBB words
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

//! Accepted forms, case-insensitive and whitespace-trimmed:
//!
//! - CSS named colors (`blue`, `rebeccapurple`, `transparent`)
//! - hex `#rgb`, `#rgba`, `#rrggbb`, `#rrggbbaa`, with or without `#`
//! - `rgb(r, g, b)` / `rgba(r, g, b, a)`, channels as 0-255 or percentages
//! - `hsl(h, s%, l%)` / `hsla(h, s%, l%, a)`
//!
//! Alpha is parsed and discarded.

use smart_leds::RGB8;

pub type Rgb = RGB8;

/// Pack into the 24-bit word the driver expects
pub const fn pack(rgb: Rgb) -> u32 {
    ((rgb.r as u32) << 16) | ((rgb.g as u32) << 8) | rgb.b as u32
}

/// Inverse of [`pack`]; bits above 24 are dropped
pub const fn unpack(color: u32) -> Rgb {
    Rgb {
        r: ((color >> 16) & 0xFF) as u8,
        g: ((color >> 8) & 0xFF) as u8,
        b: (color & 0xFF) as u8,
    }
}

/// Parse a color specification, None when it is not a color
pub fn parse_color(input: &str) -> Option<Rgb> {
    let text = input.trim().to_ascii_lowercase();
    if text.is_empty() {
        return None;
    }

    if let Some(rgb) = named_color(&text) {
        return Some(rgb);
    }

    if let Some(args) = function_args(&text, &["rgba", "rgb"]) {
        return parse_rgb_function(&args);
    }

    if let Some(args) = function_args(&text, &["hsla", "hsl"]) {
        return parse_hsl_function(&args);
    }

    parse_hex(text.strip_prefix('#').unwrap_or(&text))
}

/// Parse straight to the packed form
pub fn parse_packed(input: &str) -> Option<u32> {
    parse_color(input).map(pack)
}

fn parse_hex(digits: &str) -> Option<Rgb> {
    if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let nibble = |i: usize| u8::from_str_radix(&digits[i..=i], 16).ok();
    let byte = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).ok();

    match digits.len() {
        3 | 4 => Some(Rgb {
            r: nibble(0)? * 17,
            g: nibble(1)? * 17,
            b: nibble(2)? * 17,
        }),
        6 | 8 => Some(Rgb {
            r: byte(0)?,
            g: byte(2)?,
            b: byte(4)?,
        }),
        _ => None,
    }
}

/// Split `name(a, b, c)` / `name a b c` into its argument tokens
fn function_args(text: &str, names: &[&str]) -> Option<Vec<String>> {
    let rest = names.iter().find_map(|name| text.strip_prefix(name))?;
    let rest = rest.trim();
    let inner = match rest.strip_prefix('(') {
        Some(open) => open.strip_suffix(')')?,
        None => rest,
    };
    let args: Vec<String> = inner
        .split(|c: char| c == ',' || c == '/' || c.is_whitespace())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect();

    match args.len() {
        3 | 4 => Some(args),
        _ => None,
    }
}

/// 0-255 or percentage, clamped
fn channel_value(token: &str) -> Option<u8> {
    let value = match token.strip_suffix('%') {
        Some(pct) => pct.parse::<f64>().ok()? * 255.0 / 100.0,
        None => token.parse::<f64>().ok()?,
    };
    if !value.is_finite() {
        return None;
    }
    Some(value.clamp(0.0, 255.0).round() as u8)
}

/// Percentage, or a fraction when given without `%` and <= 1
fn unit_value(token: &str) -> Option<f64> {
    let value = match token.strip_suffix('%') {
        Some(pct) => pct.parse::<f64>().ok()? / 100.0,
        None => {
            let v = token.parse::<f64>().ok()?;
            if v <= 1.0 { v } else { v / 100.0 }
        }
    };
    value.is_finite().then(|| value.clamp(0.0, 1.0))
}

fn parse_rgb_function(args: &[String]) -> Option<Rgb> {
    if let Some(alpha) = args.get(3) {
        unit_value(alpha)?;
    }
    Some(Rgb {
        r: channel_value(&args[0])?,
        g: channel_value(&args[1])?,
        b: channel_value(&args[2])?,
    })
}

fn parse_hsl_function(args: &[String]) -> Option<Rgb> {
    if let Some(alpha) = args.get(3) {
        unit_value(alpha)?;
    }
    let hue = args[0].trim_end_matches("deg").parse::<f64>().ok()?;
    if !hue.is_finite() {
        return None;
    }
    let saturation = unit_value(&args[1])?;
    let lightness = unit_value(&args[2])?;
    Some(hsl_to_rgb(hue.rem_euclid(360.0) / 360.0, saturation, lightness))
}

fn hsl_to_rgb(h: f64, s: f64, l: f64) -> Rgb {
    let to_byte = |v: f64| (v * 255.0).round().clamp(0.0, 255.0) as u8;

    if s == 0.0 {
        let v = to_byte(l);
        return Rgb { r: v, g: v, b: v };
    }

    let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let p = 2.0 * l - q;
    let hue_to_rgb = |mut t: f64| {
        if t < 0.0 {
            t += 1.0;
        }
        if t > 1.0 {
            t -= 1.0;
        }
        if t < 1.0 / 6.0 {
            p + (q - p) * 6.0 * t
        } else if t < 0.5 {
            q
        } else if t < 2.0 / 3.0 {
            p + (q - p) * (2.0 / 3.0 - t) * 6.0
        } else {
            p
        }
    };

    Rgb {
        r: to_byte(hue_to_rgb(h + 1.0 / 3.0)),
        g: to_byte(hue_to_rgb(h)),
        b: to_byte(hue_to_rgb(h - 1.0 / 3.0)),
    }
}

fn named_color(name: &str) -> Option<Rgb> {
    NAMED_COLORS
        .binary_search_by(|(n, _)| n.cmp(&name))
        .ok()
        .map(|i| unpack(NAMED_COLORS[i].1))
}

/// CSS color keywords, sorted for binary search
static NAMED_COLORS: &[(&str, u32)] = &[
    ("aliceblue", 0xf0f8ff),
    ("antiquewhite", 0xfaebd7),
    ("aqua", 0x00ffff),
    ("aquamarine", 0x7fffd4),
    ("azure", 0xf0ffff),
    ("beige", 0xf5f5dc),
    ("bisque", 0xffe4c4),
    ("black", 0x000000),
    ("blanchedalmond", 0xffebcd),
    ("blue", 0x0000ff),
    ("blueviolet", 0x8a2be2),
    ("brown", 0xa52a2a),
    ("burlywood", 0xdeb887),
    ("cadetblue", 0x5f9ea0),
    ("chartreuse", 0x7fff00),
    ("chocolate", 0xd2691e),
    ("coral", 0xff7f50),
    ("cornflowerblue", 0x6495ed),
    ("cornsilk", 0xfff8dc),
    ("crimson", 0xdc143c),
    ("cyan", 0x00ffff),
    ("darkblue", 0x00008b),
    ("darkcyan", 0x008b8b),
    ("darkgoldenrod", 0xb8860b),
    ("darkgray", 0xa9a9a9),
    ("darkgreen", 0x006400),
    ("darkgrey", 0xa9a9a9),
    ("darkkhaki", 0xbdb76b),
    ("darkmagenta", 0x8b008b),
    ("darkolivegreen", 0x556b2f),
    ("darkorange", 0xff8c00),
    ("darkorchid", 0x9932cc),
    ("darkred", 0x8b0000),
    ("darksalmon", 0xe9967a),
    ("darkseagreen", 0x8fbc8f),
    ("darkslateblue", 0x483d8b),
    ("darkslategray", 0x2f4f4f),
    ("darkslategrey", 0x2f4f4f),
    ("darkturquoise", 0x00ced1),
    ("darkviolet", 0x9400d3),
    ("deeppink", 0xff1493),
    ("deepskyblue", 0x00bfff),
    ("dimgray", 0x696969),
    ("dimgrey", 0x696969),
    ("dodgerblue", 0x1e90ff),
    ("firebrick", 0xb22222),
    ("floralwhite", 0xfffaf0),
    ("forestgreen", 0x228b22),
    ("fuchsia", 0xff00ff),
    ("gainsboro", 0xdcdcdc),
    ("ghostwhite", 0xf8f8ff),
    ("gold", 0xffd700),
    ("goldenrod", 0xdaa520),
    ("gray", 0x808080),
    ("green", 0x008000),
    ("greenyellow", 0xadff2f),
    ("grey", 0x808080),
    ("honeydew", 0xf0fff0),
    ("hotpink", 0xff69b4),
    ("indianred", 0xcd5c5c),
    ("indigo", 0x4b0082),
    ("ivory", 0xfffff0),
    ("khaki", 0xf0e68c),
    ("lavender", 0xe6e6fa),
    ("lavenderblush", 0xfff0f5),
    ("lawngreen", 0x7cfc00),
    ("lemonchiffon", 0xfffacd),
    ("lightblue", 0xadd8e6),
    ("lightcoral", 0xf08080),
    ("lightcyan", 0xe0ffff),
    ("lightgoldenrodyellow", 0xfafad2),
    ("lightgray", 0xd3d3d3),
    ("lightgreen", 0x90ee90),
    ("lightgrey", 0xd3d3d3),
    ("lightpink", 0xffb6c1),
    ("lightsalmon", 0xffa07a),
    ("lightseagreen", 0x20b2aa),
    ("lightskyblue", 0x87cefa),
    ("lightslategray", 0x778899),
    ("lightslategrey", 0x778899),
    ("lightsteelblue", 0xb0c4de),
    ("lightyellow", 0xffffe0),
    ("lime", 0x00ff00),
    ("limegreen", 0x32cd32),
    ("linen", 0xfaf0e6),
    ("magenta", 0xff00ff),
    ("maroon", 0x800000),
    ("mediumaquamarine", 0x66cdaa),
    ("mediumblue", 0x0000cd),
    ("mediumorchid", 0xba55d3),
    ("mediumpurple", 0x9370db),
    ("mediumseagreen", 0x3cb371),
    ("mediumslateblue", 0x7b68ee),
    ("mediumspringgreen", 0x00fa9a),
    ("mediumturquoise", 0x48d1cc),
    ("mediumvioletred", 0xc71585),
    ("midnightblue", 0x191970),
    ("mintcream", 0xf5fffa),
    ("mistyrose", 0xffe4e1),
    ("moccasin", 0xffe4b5),
    ("navajowhite", 0xffdead),
    ("navy", 0x000080),
    ("oldlace", 0xfdf5e6),
    ("olive", 0x808000),
    ("olivedrab", 0x6b8e23),
    ("orange", 0xffa500),
    ("orangered", 0xff4500),
    ("orchid", 0xda70d6),
    ("palegoldenrod", 0xeee8aa),
    ("palegreen", 0x98fb98),
    ("paleturquoise", 0xafeeee),
    ("palevioletred", 0xdb7093),
    ("papayawhip", 0xffefd5),
    ("peachpuff", 0xffdab9),
    ("peru", 0xcd853f),
    ("pink", 0xffc0cb),
    ("plum", 0xdda0dd),
    ("powderblue", 0xb0e0e6),
    ("purple", 0x800080),
    ("rebeccapurple", 0x663399),
    ("red", 0xff0000),
    ("rosybrown", 0xbc8f8f),
    ("royalblue", 0x4169e1),
    ("saddlebrown", 0x8b4513),
    ("salmon", 0xfa8072),
    ("sandybrown", 0xf4a460),
    ("seagreen", 0x2e8b57),
    ("seashell", 0xfff5ee),
    ("sienna", 0xa0522d),
    ("silver", 0xc0c0c0),
    ("skyblue", 0x87ceeb),
    ("slateblue", 0x6a5acd),
    ("slategray", 0x708090),
    ("slategrey", 0x708090),
    ("snow", 0xfffafa),
    ("springgreen", 0x00ff7f),
    ("steelblue", 0x4682b4),
    ("tan", 0xd2b48c),
    ("teal", 0x008080),
    ("thistle", 0xd8bfd8),
    ("tomato", 0xff6347),
    ("transparent", 0x000000),
    ("turquoise", 0x40e0d0),
    ("violet", 0xee82ee),
    ("wheat", 0xf5deb3),
    ("white", 0xffffff),
    ("whitesmoke", 0xf5f5f5),
    ("yellow", 0xffff00),
    ("yellowgreen", 0x9acd32),
];
