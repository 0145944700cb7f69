//! Canonical path addressing.
//!
//! A [`Path`] names a structural location inside a node tree: a sequence of
//! field steps and index steps. Paths serialize to a compact canonical string
//! and parse back from it:
//!
//! ```text
//! [Field("children"), Index(0), Field("text")]  <──>  "children[0].text"
//! [Index(2), Field("color")]                    <──>  "[2].color"
//! []                                            <──>  ""
//! ```
//!
//! Both the slot detector and the override applier address values through
//! this module, so the string form is the contract between them.
//!
//! ## Parsing
//!
//! Only machine-generated strings are expected, so parsing never fails.
//! A malformed string (unbalanced bracket, empty segment, stray `]`) is
//! truncated at the first bad token and the steps before it are kept.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// One step of a [`Path`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Step {
    /// A named field, e.g. `text` or `children`.
    Field(String),
    /// A position in an ordered sequence.
    Index(usize),
}

/// A structural address inside a node tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Path {
    steps: Vec<Step>,
}

impl Path {
    /// The empty path (addresses the root itself).
    pub fn root() -> Self {
        Path { steps: Vec::new() }
    }

    pub fn from_steps(steps: Vec<Step>) -> Self {
        Path { steps }
    }

    /// Parse a canonical string. Malformed input is truncated, never rejected.
    pub fn parse(s: &str) -> Self {
        Path { steps: tokenize(s) }
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn push(&mut self, step: Step) {
        self.steps.push(step);
    }

    pub fn pop(&mut self) -> Option<Step> {
        self.steps.pop()
    }

    /// Return a new path extended by a field step.
    pub fn field(&self, name: impl Into<String>) -> Path {
        let mut next = self.clone();
        next.steps.push(Step::Field(name.into()));
        next
    }

    /// Return a new path extended by `children[index]`.
    pub fn child(&self, index: usize) -> Path {
        let mut next = self.clone();
        next.steps.push(Step::Field(CHILDREN.to_string()));
        next.steps.push(Step::Index(index));
        next
    }

    /// Name of the terminal field step, if the path ends in one.
    pub fn terminal_field(&self) -> Option<&str> {
        match self.steps.last() {
            Some(Step::Field(name)) => Some(name.as_str()),
            _ => None,
        }
    }

    /// True when the path ends in an index step.
    pub fn ends_in_index(&self) -> bool {
        matches!(self.steps.last(), Some(Step::Index(_)))
    }

    /// True when every step is a well-formed field name or an index, i.e. the
    /// path survives a trip through its canonical string unchanged.
    pub fn is_canonical(&self) -> bool {
        self.steps.iter().all(|step| match step {
            Step::Field(name) => is_valid_field(name),
            Step::Index(_) => true,
        })
    }
}

/// Field name under which a node keeps its ordered children.
pub const CHILDREN: &str = "children";

fn is_valid_field(name: &str) -> bool {
    !name.is_empty() && !name.contains(['.', '[', ']'])
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, step) in self.steps.iter().enumerate() {
            match step {
                Step::Field(name) if idx == 0 => f.write_str(name)?,
                Step::Field(name) => write!(f, ".{}", name)?,
                Step::Index(n) => write!(f, "[{}]", n)?,
            }
        }
        Ok(())
    }
}

impl FromStr for Path {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Path::parse(s))
    }
}

impl From<Vec<Step>> for Path {
    fn from(steps: Vec<Step>) -> Self {
        Path { steps }
    }
}

impl Serialize for Path {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Path {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Path::parse(&s))
    }
}

/// Split `s` into steps, stopping at the first malformed token.
///
/// ```text
/// "a.b[3].c"  -> a, b, [3], c
/// "a[x]"      -> a, x          (non-integer bracket -> field)
/// "a[1"       -> a             (unterminated bracket -> truncated)
/// "a..b"      -> a             (empty segment -> truncated)
/// ```
fn tokenize(s: &str) -> Vec<Step> {
    let mut steps = Vec::new();
    let mut rest = s;
    let mut first = true;

    while !rest.is_empty() {
        if let Some(after) = rest.strip_prefix('[') {
            let Some(close) = after.find(']') else {
                break;
            };
            let inner = &after[..close];
            if inner.is_empty() {
                break;
            }
            match inner.parse::<usize>() {
                Ok(n) => steps.push(Step::Index(n)),
                Err(_) => steps.push(Step::Field(inner.to_string())),
            }
            rest = &after[close + 1..];
        } else {
            let body = if first {
                rest
            } else {
                match rest.strip_prefix('.') {
                    Some(body) => body,
                    None => break,
                }
            };
            let end = body.find(['.', '[', ']']).unwrap_or(body.len());
            if end == 0 {
                break;
            }
            steps.push(Step::Field(body[..end].to_string()));
            rest = &body[end..];
        }
        first = false;
    }

    steps
}
