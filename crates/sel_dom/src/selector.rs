//! Selector parsing and matching
//!
//! Supports comma-separated lists of compound selectors (`tag#id.class[attr=value]`,
//! `*`) joined by descendant (whitespace) and child (`>`) combinators.

use std::str::FromStr;

use nom::branch::alt;
use nom::bytes::complete::{take_while, take_while1};
use nom::character::complete::{char, multispace0};
use nom::combinator::{all_consuming, map, opt, recognize};
use nom::multi::separated_list1;
use nom::sequence::{delimited, pair, preceded, tuple};
use nom::IResult;
use smallvec::SmallVec;

use crate::document::{Document, ElementData, NodeId};
use crate::error::DomError;

#[derive(Clone, Debug, PartialEq)]
enum AttributeTest {
    Exists(String),
    Equals(String, String),
}

impl AttributeTest {
    fn matches(&self, element: &ElementData) -> bool {
        match self {
            AttributeTest::Exists(name) => element.has_attribute(name),
            AttributeTest::Equals(name, value) => {
                element.attribute(name).as_deref() == Some(value.as_str())
            }
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: SmallVec<[String; 2]>,
    attributes: Vec<AttributeTest>,
}

impl Compound {
    fn matches(&self, element: &ElementData) -> bool {
        self.tag.as_deref().map_or(true, |tag| tag == element.tag())
            && self.id.as_deref().map_or(true, |id| element.id() == Some(id))
            && self.classes.iter().all(|class| element.has_class(class))
            && self.attributes.iter().all(|test| test.matches(element))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
}

/// Compounds left to right; only the first has no combinator
#[derive(Clone, Debug, PartialEq)]
struct Complex {
    parts: Vec<(Option<Combinator>, Compound)>,
}

impl Complex {
    fn matches(&self, doc: &Document, node: NodeId) -> bool {
        !self.parts.is_empty() && self.matches_at(doc, node, self.parts.len() - 1)
    }

    fn matches_at(&self, doc: &Document, node: NodeId, index: usize) -> bool {
        let Some(element) = doc.element(node) else {
            return false;
        };
        let (combinator, compound) = &self.parts[index];
        if !compound.matches(element) {
            return false;
        }
        match combinator {
            None => true,
            Some(Combinator::Child) => doc
                .parent(node)
                .is_some_and(|parent| self.matches_at(doc, parent, index - 1)),
            Some(Combinator::Descendant) => doc
                .ancestors(node)
                .into_iter()
                .any(|ancestor| self.matches_at(doc, ancestor, index - 1)),
        }
    }
}

/// A parsed selector list
#[derive(Clone, Debug, PartialEq)]
pub struct Selector {
    source: String,
    alternatives: Vec<Complex>,
}

fn ident(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        take_while1(|c: char| c.is_ascii_alphabetic() || c == '_' || c == '-'),
        take_while(|c: char| c.is_ascii_alphanumeric() || c == '_' || c == '-'),
    ))(input)
}

fn attribute_value(input: &str) -> IResult<&str, &str> {
    alt((
        delimited(char('"'), take_while(|c: char| c != '"'), char('"')),
        delimited(char('\''), take_while(|c: char| c != '\''), char('\'')),
        take_while1(|c: char| !c.is_whitespace() && c != ']'),
    ))(input)
}

fn attribute(input: &str) -> IResult<&str, AttributeTest> {
    map(
        delimited(
            char('['),
            tuple((
                delimited(multispace0, ident, multispace0),
                opt(preceded(
                    pair(char('='), multispace0),
                    attribute_value,
                )),
                multispace0,
            )),
            char(']'),
        ),
        |(name, value, _)| {
            let name = name.to_ascii_lowercase();
            match value {
                Some(value) => AttributeTest::Equals(name, value.to_string()),
                None => AttributeTest::Exists(name),
            }
        },
    )(input)
}

fn id_part(input: &str) -> IResult<&str, &str> {
    preceded(char('#'), ident)(input)
}

fn class_part(input: &str) -> IResult<&str, &str> {
    preceded(char('.'), ident)(input)
}

fn type_part(input: &str) -> IResult<&str, Option<String>> {
    alt((
        map(char('*'), |_| None),
        map(ident, |tag: &str| Some(tag.to_ascii_lowercase())),
    ))(input)
}

fn compound(input: &str) -> IResult<&str, Compound> {
    let (mut input, tag) = opt(type_part)(input)?;
    let mut any = tag.is_some();
    let mut compound = Compound {
        tag: tag.flatten(),
        ..Compound::default()
    };

    loop {
        if let Ok((rest, id)) = id_part(input) {
            compound.id = Some(id.to_string());
            input = rest;
        } else if let Ok((rest, class)) = class_part(input) {
            compound.classes.push(class.to_string());
            input = rest;
        } else if let Ok((rest, test)) = attribute(input) {
            compound.attributes.push(test);
            input = rest;
        } else {
            break;
        }
        any = true;
    }

    if !any {
        return Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Verify,
        )));
    }
    Ok((input, compound))
}

fn child_combinator(input: &str) -> IResult<&str, char> {
    delimited(multispace0, char('>'), multispace0)(input)
}

fn complex(input: &str) -> IResult<&str, Complex> {
    let (mut input, first) = compound(input)?;
    let mut parts = vec![(None, first)];

    loop {
        if let Ok((rest, _)) = child_combinator(input) {
            let (rest, next) = compound(rest)?;
            parts.push((Some(Combinator::Child), next));
            input = rest;
            continue;
        }
        let (after_space, space) = multispace0(input)?;
        if !space.is_empty() {
            if let Ok((rest, next)) = compound(after_space) {
                parts.push((Some(Combinator::Descendant), next));
                input = rest;
                continue;
            }
        }
        break;
    }
    Ok((input, Complex { parts }))
}

fn selector_list(input: &str) -> IResult<&str, Vec<Complex>> {
    all_consuming(delimited(
        multispace0,
        separated_list1(delimited(multispace0, char(','), multispace0), complex),
        multispace0,
    ))(input)
}

impl Selector {
    pub fn parse(input: &str) -> Result<Self, DomError> {
        match selector_list(input) {
            Ok((_, alternatives)) => Ok(Self {
                source: input.trim().to_string(),
                alternatives,
            }),
            Err(_) => Err(DomError::InvalidSelector(input.to_string())),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Whether `node` is an element matching any alternative
    pub fn matches(&self, doc: &Document, node: NodeId) -> bool {
        self.alternatives.iter().any(|alt| alt.matches(doc, node))
    }

    /// Every matching element under the root, in document order
    pub fn query_all(&self, doc: &Document) -> Vec<NodeId> {
        doc.descendants(doc.root())
            .into_iter()
            .filter(|&node| self.matches(doc, node))
            .collect()
    }

    pub fn query_first(&self, doc: &Document) -> Option<NodeId> {
        doc.descendants(doc.root())
            .into_iter()
            .find(|&node| self.matches(doc, node))
    }
}

impl FromStr for Selector {
    type Err = DomError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl std::fmt::Display for Selector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.source)
    }
}
