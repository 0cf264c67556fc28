//! Property predicates evaluated against a node's property map.

use regex::Regex;
use std::fmt;

use crate::types::{keys, Node, Properties};

/// A shell-style glob (`*` and `?`) compiled to an anchored regex.
#[derive(Clone)]
pub struct Glob {
    pattern: String,
    regex: Regex,
}

impl Glob {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        let mut source = String::with_capacity(pattern.len() + 8);
        source.push('^');
        for c in pattern.chars() {
            match c {
                '*' => source.push_str(".*"),
                '?' => source.push('.'),
                c => source.push_str(&regex::escape(c.encode_utf8(&mut [0; 4]))),
            }
        }
        source.push('$');

        Ok(Self {
            pattern: pattern.to_string(),
            regex: Regex::new(&source)?,
        })
    }

    /// True if `s` contains glob metacharacters.
    pub fn is_pattern(s: &str) -> bool {
        s.contains(['*', '?'])
    }

    pub fn is_match(&self, value: &str) -> bool {
        self.regex.is_match(value)
    }

    pub fn as_str(&self) -> &str {
        &self.pattern
    }
}

impl fmt::Debug for Glob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Glob").field(&self.pattern).finish()
    }
}

impl PartialEq for Glob {
    fn eq(&self, other: &Self) -> bool {
        self.pattern == other.pattern
    }
}

/// What a constraint requires of its property.
#[derive(Debug, Clone, PartialEq)]
pub enum Verb {
    Equals(String),
    Matches(Glob),
    /// Inclusive numeric range; the property must parse as a number.
    InRange { min: f64, max: f64 },
    InSet(Vec<String>),
    Present,
    Absent,
}

/// One constraint on a named property.
#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    pub key: String,
    pub verb: Verb,
}

impl Constraint {
    pub fn new(key: impl Into<String>, verb: Verb) -> Self {
        Self {
            key: key.into(),
            verb,
        }
    }

    /// Equality for plain values, glob matching when `value` has wildcards.
    pub fn from_value(key: impl Into<String>, value: &str) -> Result<Self, regex::Error> {
        let verb = if Glob::is_pattern(value) {
            Verb::Matches(Glob::new(value)?)
        } else {
            Verb::Equals(value.to_string())
        };
        Ok(Self::new(key, verb))
    }

    pub fn is_satisfied_by(&self, properties: &Properties) -> bool {
        let value = properties.get(&self.key).map(String::as_str);

        match (&self.verb, value) {
            (Verb::Absent, v) => v.is_none(),
            (_, None) => false,
            (Verb::Present, Some(_)) => true,
            (Verb::Equals(expected), Some(v)) => v == expected,
            (Verb::Matches(glob), Some(v)) => glob.is_match(v),
            (Verb::InRange { min, max }, Some(v)) => v
                .trim()
                .parse::<f64>()
                .map(|n| n >= *min && n <= *max)
                .unwrap_or(false),
            (Verb::InSet(values), Some(v)) => values.iter().any(|candidate| candidate == v),
        }
    }
}

/// A conjunction of constraints.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Interest {
    pub constraints: Vec<Constraint>,
}

impl Interest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Interest in device-like nodes that configured targets may resolve to.
    pub fn target_candidates() -> Self {
        let audio = Glob::new("Audio/*").expect("static glob compiles");
        Self::new()
            .with(Constraint::new(keys::MEDIA_CLASS, Verb::Matches(audio)))
            .with(Constraint::new(keys::NODE_LINK_GROUP, Verb::Absent))
    }

    pub fn with(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    pub fn extend(mut self, constraints: impl IntoIterator<Item = Constraint>) -> Self {
        self.constraints.extend(constraints);
        self
    }

    pub fn matches(&self, properties: &Properties) -> bool {
        self.constraints.iter().all(|c| c.is_satisfied_by(properties))
    }

    pub fn matches_node(&self, node: &Node) -> bool {
        self.matches(&node.properties)
    }
}
