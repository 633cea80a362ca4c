//! Color parsing and formatting
//!
//! Colors travel through the library as `[r, g, b, a]` arrays with the
//! channels in `0.0..=255.0` and alpha in `0.0..=1.0`, the same shape the
//! `rgba()` functional notation uses. That keeps them directly tweenable by
//! the interpolation driver.
//!
//! Supported inputs:
//! - hex: `#rgb`, `#rgba`, `#rrggbb`, `#rrggbbaa`
//! - functional: `rgb(r, g, b)`, `rgba(r, g, b, a)` (channels may be percentages)
//! - the CSS named colors, plus `transparent`

use nom::{
    bytes::complete::tag_no_case,
    character::complete::{char, multispace0},
    combinator::{all_consuming, opt, verify},
    multi::separated_list1,
    number::complete::float,
    sequence::{delimited, pair, tuple},
    IResult,
};
use thiserror::Error;

/// An RGBA color as `[r, g, b, a]`
pub type ColorArray = [f32; 4];

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ColorError {
    #[error("empty color string")]
    Empty,

    #[error("invalid hex color `{0}`")]
    InvalidHex(String),

    #[error("malformed color function `{0}`")]
    MalformedFunction(String),

    #[error("unknown color `{0}`")]
    Unknown(String),
}

/// Parse a CSS color string into `[r, g, b, a]`.
///
/// ```
/// use sel_core::color::color_to_array;
///
/// assert_eq!(color_to_array("#ff8000").unwrap(), [255.0, 128.0, 0.0, 1.0]);
/// assert_eq!(color_to_array("rgba(10, 20, 30, 0.5)").unwrap(), [10.0, 20.0, 30.0, 0.5]);
/// ```
pub fn color_to_array(input: &str) -> Result<ColorArray, ColorError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(ColorError::Empty);
    }

    if input.starts_with('#') {
        return parse_hex(input).ok_or_else(|| ColorError::InvalidHex(input.to_string()));
    }

    let lower = input.to_ascii_lowercase();
    if lower.starts_with("rgb") {
        return match all_consuming(rgb_function)(input) {
            Ok((_, color)) => Ok(color),
            Err(_) => Err(ColorError::MalformedFunction(input.to_string())),
        };
    }

    named_color(&lower).ok_or_else(|| ColorError::Unknown(input.to_string()))
}

/// Format `[r, g, b, a]` as an `rgba()` string.
///
/// Channels are rounded to whole numbers and clamped, alpha keeps up to three
/// decimals, so `color_to_array(&array_to_color(c))` reproduces `c` for any
/// color that came out of [`color_to_array`].
pub fn array_to_color(color: &ColorArray) -> String {
    let channel = |v: f32| v.round().clamp(0.0, 255.0);
    format!(
        "rgba({}, {}, {}, {})",
        crate::number::format_number(channel(color[0])),
        crate::number::format_number(channel(color[1])),
        crate::number::format_number(channel(color[2])),
        crate::number::format_number(color[3].clamp(0.0, 1.0)),
    )
}

/// Check whether a string parses as a color without keeping the result
pub fn is_color(input: &str) -> bool {
    color_to_array(input).is_ok()
}

fn parse_hex(input: &str) -> Option<ColorArray> {
    let hex = input.strip_prefix('#')?;
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }

    let nibble = |i: usize| u8::from_str_radix(&hex[i..i + 1].repeat(2), 16).ok();
    let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();

    let (r, g, b, a) = match hex.len() {
        3 => (nibble(0)?, nibble(1)?, nibble(2)?, 255),
        4 => (nibble(0)?, nibble(1)?, nibble(2)?, nibble(3)?),
        6 => (byte(0)?, byte(2)?, byte(4)?, 255),
        8 => (byte(0)?, byte(2)?, byte(4)?, byte(6)?),
        _ => return None,
    };

    Some([r as f32, g as f32, b as f32, round_alpha(a as f32 / 255.0)])
}

fn round_alpha(a: f32) -> f32 {
    (a * 1000.0).round() / 1000.0
}

/// A finite numeric component, optionally suffixed with `%`
fn component(input: &str) -> IResult<&str, (f32, bool)> {
    let (input, value) = verify(float, |v: &f32| v.is_finite())(input)?;
    let (input, percent) = opt(char('%'))(input)?;
    Ok((input, (value, percent.is_some())))
}

fn comma(input: &str) -> IResult<&str, char> {
    delimited(multispace0, char(','), multispace0)(input)
}

/// `rgb(...)` / `rgba(...)`, either name accepting three or four components
fn rgb_function(input: &str) -> IResult<&str, ColorArray> {
    let (input, _) = pair(tag_no_case("rgb"), opt(tag_no_case("a")))(input)?;
    let (input, components) = delimited(
        tuple((multispace0, char('('), multispace0)),
        separated_list1(comma, component),
        tuple((multispace0, char(')'), multispace0)),
    )(input)?;

    if components.len() != 3 && components.len() != 4 {
        return Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Count,
        )));
    }

    let channel = |(value, percent): (f32, bool)| {
        let v = if percent { value * 255.0 / 100.0 } else { value };
        v.clamp(0.0, 255.0)
    };
    let alpha = components
        .get(3)
        .map(|&(value, percent)| if percent { value / 100.0 } else { value })
        .unwrap_or(1.0)
        .clamp(0.0, 1.0);

    Ok((
        input,
        [
            channel(components[0]),
            channel(components[1]),
            channel(components[2]),
            alpha,
        ],
    ))
}

fn named_color(name: &str) -> Option<ColorArray> {
    if name == "transparent" {
        return Some([0.0, 0.0, 0.0, 0.0]);
    }

    let hex = NAMED_COLORS
        .binary_search_by(|(candidate, _)| candidate.cmp(&name))
        .ok()
        .map(|idx| NAMED_COLORS[idx].1)?;

    Some([
        ((hex >> 16) & 0xFF) as f32,
        ((hex >> 8) & 0xFF) as f32,
        (hex & 0xFF) as f32,
        1.0,
    ])
}

/// Identifier check used by callers that accept "a color or a keyword"
pub fn is_named_color(name: &str) -> bool {
    named_color(&name.to_ascii_lowercase()).is_some()
}

/// CSS named colors, sorted for binary search
static NAMED_COLORS: &[(&str, u32)] = &[
    ("aliceblue", 0xF0F8FF),
    ("antiquewhite", 0xFAEBD7),
    ("aqua", 0x00FFFF),
    ("aquamarine", 0x7FFFD4),
    ("azure", 0xF0FFFF),
    ("beige", 0xF5F5DC),
    ("bisque", 0xFFE4C4),
    ("black", 0x000000),
    ("blanchedalmond", 0xFFEBCD),
    ("blue", 0x0000FF),
    ("blueviolet", 0x8A2BE2),
    ("brown", 0xA52A2A),
    ("burlywood", 0xDEB887),
    ("cadetblue", 0x5F9EA0),
    ("chartreuse", 0x7FFF00),
    ("chocolate", 0xD2691E),
    ("coral", 0xFF7F50),
    ("cornflowerblue", 0x6495ED),
    ("cornsilk", 0xFFF8DC),
    ("crimson", 0xDC143C),
    ("cyan", 0x00FFFF),
    ("darkblue", 0x00008B),
    ("darkcyan", 0x008B8B),
    ("darkgoldenrod", 0xB8860B),
    ("darkgray", 0xA9A9A9),
    ("darkgreen", 0x006400),
    ("darkgrey", 0xA9A9A9),
    ("darkkhaki", 0xBDB76B),
    ("darkmagenta", 0x8B008B),
    ("darkolivegreen", 0x556B2F),
    ("darkorange", 0xFF8C00),
    ("darkorchid", 0x9932CC),
    ("darkred", 0x8B0000),
    ("darksalmon", 0xE9967A),
    ("darkseagreen", 0x8FBC8F),
    ("darkslateblue", 0x483D8B),
    ("darkslategray", 0x2F4F4F),
    ("darkslategrey", 0x2F4F4F),
    ("darkturquoise", 0x00CED1),
    ("darkviolet", 0x9400D3),
    ("deeppink", 0xFF1493),
    ("deepskyblue", 0x00BFFF),
    ("dimgray", 0x696969),
    ("dimgrey", 0x696969),
    ("dodgerblue", 0x1E90FF),
    ("firebrick", 0xB22222),
    ("floralwhite", 0xFFFAF0),
    ("forestgreen", 0x228B22),
    ("fuchsia", 0xFF00FF),
    ("gainsboro", 0xDCDCDC),
    ("ghostwhite", 0xF8F8FF),
    ("gold", 0xFFD700),
    ("goldenrod", 0xDAA520),
    ("gray", 0x808080),
    ("green", 0x008000),
    ("greenyellow", 0xADFF2F),
    ("grey", 0x808080),
    ("honeydew", 0xF0FFF0),
    ("hotpink", 0xFF69B4),
    ("indianred", 0xCD5C5C),
    ("indigo", 0x4B0082),
    ("ivory", 0xFFFFF0),
    ("khaki", 0xF0E68C),
    ("lavender", 0xE6E6FA),
    ("lavenderblush", 0xFFF0F5),
    ("lawngreen", 0x7CFC00),
    ("lemonchiffon", 0xFFFACD),
    ("lightblue", 0xADD8E6),
    ("lightcoral", 0xF08080),
    ("lightcyan", 0xE0FFFF),
    ("lightgoldenrodyellow", 0xFAFAD2),
    ("lightgray", 0xD3D3D3),
    ("lightgreen", 0x90EE90),
    ("lightgrey", 0xD3D3D3),
    ("lightpink", 0xFFB6C1),
    ("lightsalmon", 0xFFA07A),
    ("lightseagreen", 0x20B2AA),
    ("lightskyblue", 0x87CEFA),
    ("lightslategray", 0x778899),
    ("lightslategrey", 0x778899),
    ("lightsteelblue", 0xB0C4DE),
    ("lightyellow", 0xFFFFE0),
    ("lime", 0x00FF00),
    ("limegreen", 0x32CD32),
    ("linen", 0xFAF0E6),
    ("magenta", 0xFF00FF),
    ("maroon", 0x800000),
    ("mediumaquamarine", 0x66CDAA),
    ("mediumblue", 0x0000CD),
    ("mediumorchid", 0xBA55D3),
    ("mediumpurple", 0x9370DB),
    ("mediumseagreen", 0x3CB371),
    ("mediumslateblue", 0x7B68EE),
    ("mediumspringgreen", 0x00FA9A),
    ("mediumturquoise", 0x48D1CC),
    ("mediumvioletred", 0xC71585),
    ("midnightblue", 0x191970),
    ("mintcream", 0xF5FFFA),
    ("mistyrose", 0xFFE4E1),
    ("moccasin", 0xFFE4B5),
    ("navajowhite", 0xFFDEAD),
    ("navy", 0x000080),
    ("oldlace", 0xFDF5E6),
    ("olive", 0x808000),
    ("olivedrab", 0x6B8E23),
    ("orange", 0xFFA500),
    ("orangered", 0xFF4500),
    ("orchid", 0xDA70D6),
    ("palegoldenrod", 0xEEE8AA),
    ("palegreen", 0x98FB98),
    ("paleturquoise", 0xAFEEEE),
    ("palevioletred", 0xDB7093),
    ("papayawhip", 0xFFEFD5),
    ("peachpuff", 0xFFDAB9),
    ("peru", 0xCD853F),
    ("pink", 0xFFC0CB),
    ("plum", 0xDDA0DD),
    ("powderblue", 0xB0E0E6),
    ("purple", 0x800080),
    ("rebeccapurple", 0x663399),
    ("red", 0xFF0000),
    ("rosybrown", 0xBC8F8F),
    ("royalblue", 0x4169E1),
    ("saddlebrown", 0x8B4513),
    ("salmon", 0xFA8072),
    ("sandybrown", 0xF4A460),
    ("seagreen", 0x2E8B57),
    ("seashell", 0xFFF5EE),
    ("sienna", 0xA0522D),
    ("silver", 0xC0C0C0),
    ("skyblue", 0x87CEEB),
    ("slateblue", 0x6A5ACD),
    ("slategray", 0x708090),
    ("slategrey", 0x708090),
    ("snow", 0xFFFAFA),
    ("springgreen", 0x00FF7F),
    ("steelblue", 0x4682B4),
    ("tan", 0xD2B48C),
    ("teal", 0x008080),
    ("thistle", 0xD8BFD8),
    ("tomato", 0xFF6347),
    ("turquoise", 0x40E0D0),
    ("violet", 0xEE82EE),
    ("wheat", 0xF5DEB3),
    ("white", 0xFFFFFF),
    ("whitesmoke", 0xF5F5F5),
    ("yellow", 0xFFFF00),
    ("yellowgreen", 0x9ACD32),
];
