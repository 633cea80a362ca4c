//! CSS property names and numeric values
//!
//! A value such as `translate(10px, -4.5%)` is split into literal text and
//! numbers with units, so the numbers can be tweened and written back into the
//! same template.

use indexmap::IndexMap;
use nom::branch::alt;
use nom::bytes::complete::take_while;
use nom::character::complete::{char, digit0, digit1, one_of};
use nom::combinator::{opt, recognize};
use nom::sequence::pair;
use nom::IResult;
use serde::{Deserialize, Serialize};

use sel_core::format_number;

use crate::error::{DomError, Result};

/// Normalize a property name to kebab-case (`backgroundColor` → `background-color`).
///
/// Custom properties (`--name`) are kept as written.
pub fn property_name(name: &str) -> String {
    let name = name.trim();
    if name.starts_with("--") {
        return name.to_string();
    }
    let mut out = String::with_capacity(name.len() + 4);
    for c in name.chars() {
        if c.is_ascii_uppercase() {
            out.push('-');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Custom property name with its `--` prefix
pub fn custom_property_name(name: &str) -> String {
    let name = name.trim();
    if name.starts_with("--") {
        name.to_string()
    } else {
        format!("--{}", name)
    }
}

/// A declaration value as it appears in JSON
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum CssScalar {
    Text(String),
    Number(f64),
}

impl CssScalar {
    pub(crate) fn into_string(self) -> String {
        match self {
            CssScalar::Text(text) => text,
            CssScalar::Number(number) => format_number(number as f32),
        }
    }
}

/// Ordered property → value declarations.
///
/// Names are normalized on insert. Deserializes from a JSON object whose
/// values are strings or numbers.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "IndexMap<String, CssScalar>")]
pub struct CssProperties(IndexMap<String, String>);

impl From<IndexMap<String, CssScalar>> for CssProperties {
    fn from(map: IndexMap<String, CssScalar>) -> Self {
        map.into_iter()
            .map(|(name, value)| (name, value.into_string()))
            .collect()
    }
}

impl CssProperties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with(mut self, property: &str, value: impl ToString) -> Self {
        self.insert(property, value);
        self
    }

    pub fn insert(&mut self, property: &str, value: impl ToString) {
        self.0.insert(property_name(property), value.to_string());
    }

    pub fn get(&self, property: &str) -> Option<&str> {
        self.0.get(&property_name(property)).map(String::as_str)
    }

    pub fn contains(&self, property: &str) -> bool {
        self.0.contains_key(&property_name(property))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: AsRef<str>, V: ToString> FromIterator<(K, V)> for CssProperties {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut properties = Self::new();
        for (name, value) in iter {
            properties.insert(name.as_ref(), value);
        }
        properties
    }
}

impl<const N: usize> From<[(&str, &str); N]> for CssProperties {
    fn from(pairs: [(&str, &str); N]) -> Self {
        pairs.into_iter().collect()
    }
}

#[derive(Clone, Debug, PartialEq)]
enum Segment {
    Literal(String),
    Number { value: f32, unit: String },
}

/// A CSS value split into literal text and numbers with units
#[derive(Clone, Debug, PartialEq)]
pub struct CssValue {
    segments: Vec<Segment>,
}

fn number(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        opt(one_of("+-")),
        alt((
            recognize(pair(digit1, opt(pair(char('.'), digit0)))),
            recognize(pair(char('.'), digit1)),
        )),
    ))(input)
}

fn number_with_unit(input: &str) -> IResult<&str, (f32, &str)> {
    let (rest, digits) = number(input)?;
    let (rest, unit) = take_while(|c: char| c.is_ascii_alphabetic() || c == '%')(rest)?;
    let value = digits.parse::<f32>().map_err(|_| {
        nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Float))
    })?;
    Ok((rest, (value, unit)))
}

/// Numbers inside identifiers (`translate3d`, `#a1b2c3`) are literal text
fn continues_word(prev: Option<char>) -> bool {
    prev.is_some_and(|p| p.is_ascii_alphanumeric() || matches!(p, '_' | '-' | '#' | '.'))
}

impl CssValue {
    pub fn parse(input: &str) -> Self {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut rest = input.trim();
        let mut prev = None;

        while let Some(c) = rest.chars().next() {
            if !continues_word(prev) {
                if let Ok((after, (value, unit))) = number_with_unit(rest) {
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Number {
                        value,
                        unit: unit.to_ascii_lowercase(),
                    });
                    prev = rest[..rest.len() - after.len()].chars().last();
                    rest = after;
                    continue;
                }
            }
            literal.push(c);
            prev = Some(c);
            rest = &rest[c.len_utf8()..];
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }
        Self { segments }
    }

    pub fn numbers(&self) -> Vec<f32> {
        self.segments
            .iter()
            .filter_map(|segment| match segment {
                Segment::Number { value, .. } => Some(*value),
                Segment::Literal(_) => None,
            })
            .collect()
    }

    pub fn count(&self) -> usize {
        self.segments
            .iter()
            .filter(|segment| matches!(segment, Segment::Number { .. }))
            .count()
    }

    /// Whether there is anything to tween
    pub fn is_numeric(&self) -> bool {
        self.count() > 0
    }

    /// Write `values` back into the template, in order
    pub fn format(&self, values: &[f32]) -> String {
        let mut values = values.iter();
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Number { value, unit } => {
                    out.push_str(&format_number(values.next().copied().unwrap_or(*value)));
                    out.push_str(unit);
                }
            }
        }
        out
    }

    /// Start values for tweening from `from` into this template.
    ///
    /// Literal text must agree (ignoring whitespace) and every number must
    /// carry the same unit, except a unitless zero which adopts ours.
    pub fn align(&self, property: &str, from: &str) -> Result<Vec<f32>> {
        let mismatch = || DomError::UnitMismatch {
            property: property.to_string(),
            from: from.to_string(),
            to: self.format(&[]),
        };
        let source = CssValue::parse(from);
        if source.segments.len() != self.segments.len() {
            return Err(mismatch());
        }

        let squash = |text: &str| text.split_whitespace().collect::<String>();
        let mut values = Vec::with_capacity(self.count());
        for (theirs, ours) in source.segments.iter().zip(&self.segments) {
            match (theirs, ours) {
                (Segment::Literal(a), Segment::Literal(b)) if squash(a) == squash(b) => {}
                (Segment::Number { value, unit }, Segment::Number { unit: target, .. })
                    if unit == target || (unit.is_empty() && *value == 0.0) =>
                {
                    values.push(*value)
                }
                _ => return Err(mismatch()),
            }
        }
        Ok(values)
    }
}

/// Leading number of a value, like `parseFloat` (`"12.5px"` → `12.5`)
pub fn parse_leading_number(input: &str) -> Option<f32> {
    number(input.trim())
        .ok()
        .and_then(|(_, digits)| digits.parse().ok())
}

/// Property names listed in a `transition-property` style value
#[derive(Clone, Debug, PartialEq)]
pub enum TransitionFilter {
    All,
    Only(Vec<String>),
}

impl TransitionFilter {
    pub fn parse(input: &str) -> Self {
        let names: Vec<String> = input
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(property_name)
            .collect();
        if names.is_empty() || names.iter().any(|name| name == "all") {
            TransitionFilter::All
        } else {
            TransitionFilter::Only(names)
        }
    }

    pub fn allows(&self, property: &str) -> bool {
        match self {
            TransitionFilter::All => true,
            TransitionFilter::Only(names) => names.iter().any(|name| name == property),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_property_name() {
        assert_eq!(property_name("backgroundColor"), "background-color");
        assert_eq!(property_name("WebkitTransform"), "-webkit-transform");
        assert_eq!(property_name(" opacity "), "opacity");
        assert_eq!(property_name("--mainColor"), "--mainColor");
        assert_eq!(custom_property_name("gap"), "--gap");
    }

    #[test]
    fn test_parse_simple_values() {
        assert_eq!(CssValue::parse("10px").numbers(), vec![10.0]);
        assert_eq!(CssValue::parse("0.5").numbers(), vec![0.5]);
        assert_eq!(CssValue::parse("-.25em").numbers(), vec![-0.25]);
        assert_eq!(CssValue::parse("50%").format(&[12.5]), "12.5%");
        assert!(!CssValue::parse("auto").is_numeric());
    }

    #[test]
    fn test_parse_function_template() {
        let value = CssValue::parse("translate(10px, -20px) rotate(45deg)");
        assert_eq!(value.numbers(), vec![10.0, -20.0, 45.0]);
        assert_eq!(
            value.format(&[1.0, 2.0, 3.5]),
            "translate(1px, 2px) rotate(3.5deg)"
        );
    }

    #[test]
    fn test_digits_inside_identifiers_are_literal() {
        let value = CssValue::parse("translate3d(1px, 2px, 3px)");
        assert_eq!(value.numbers(), vec![1.0, 2.0, 3.0]);
        assert!(value.format(&[0.0, 0.0, 0.0]).starts_with("translate3d("));
    }

    #[test]
    fn test_align_units() {
        let to = CssValue::parse("100px");
        assert_eq!(to.align("width", "20px").unwrap(), vec![20.0]);
        assert_eq!(to.align("width", "0").unwrap(), vec![0.0]);
        assert!(matches!(
            to.align("width", "20%"),
            Err(DomError::UnitMismatch { .. })
        ));
        assert!(to.align("width", "auto").is_err());

        let to = CssValue::parse("translate(10px, 20px)");
        assert_eq!(to.align("transform", "translate(0px,0px)").unwrap(), vec![0.0, 0.0]);
        assert!(to.align("transform", "scale(1, 1)").is_err());
    }

    #[test]
    fn test_leading_number() {
        assert_eq!(parse_leading_number(" 12.5px"), Some(12.5));
        assert_eq!(parse_leading_number("-3"), Some(-3.0));
        assert_eq!(parse_leading_number("px"), None);
    }

    #[test]
    fn test_css_properties_from_json() {
        let props = CssProperties::from_json(r#"{"marginLeft": "10px", "opacity": 0.5}"#).unwrap();
        assert_eq!(props.get("margin-left"), Some("10px"));
        assert_eq!(props.get("opacity"), Some("0.5"));
        let names: Vec<_> = props.iter().map(|(k, _)| k).collect();
        assert_eq!(names, vec!["margin-left", "opacity"]);
    }

    #[test]
    fn test_transition_filter() {
        assert_eq!(TransitionFilter::parse("all"), TransitionFilter::All);
        let filter = TransitionFilter::parse("opacity, marginLeft");
        assert!(filter.allows("margin-left"));
        assert!(!filter.allows("width"));
    }
}
