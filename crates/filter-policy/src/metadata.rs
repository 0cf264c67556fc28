//! Parsing of the configuration blobs published in the filters metadata.
//!
//! Two keys matter:
//!
//! - the **targets** key holds a JSON object mapping a target name to a
//!   predicate object (`{ "node.name": "alsa_output.*" }`)
//! - the **filters** key holds a JSON array of filter records
//!   (`stream-name`, `node-name`, `direction`, optional `target`, `mode`,
//!   `priority`)
//!
//! A blob of the wrong shape is an error for the whole blob. A bad record
//! only produces a warning and is skipped.

use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::error::MetadataError;
use crate::matcher::{Constraint, Verb};
use crate::types::Direction;

/// Rules parsed from one blob plus the records that had to be skipped.
#[derive(Debug, Clone)]
pub struct Parsed<T> {
    pub rules: Vec<T>,
    pub warnings: Vec<MetadataError>,
}

impl<T> Default for Parsed<T> {
    fn default() -> Self {
        Self {
            rules: Vec::new(),
            warnings: Vec::new(),
        }
    }
}

/// A configured target: a name and the predicate that resolves it.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetRule {
    pub name: String,
    pub constraints: Vec<Constraint>,
}

/// How a filter's `enabled` flag is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Always,
    Never,
    /// Enabled while at least one playback application stream exists.
    PlaybackOnly,
    /// Enabled while at least one capture application stream exists.
    CaptureOnly,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Always => "always",
            Self::Never => "never",
            Self::PlaybackOnly => "playback-only",
            Self::CaptureOnly => "capture-only",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Mode {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "always" => Ok(Self::Always),
            "never" => Ok(Self::Never),
            "playback-only" => Ok(Self::PlaybackOnly),
            "capture-only" => Ok(Self::CaptureOnly),
            _ => Err(format!("'{}' is not a valid filter mode", s)),
        }
    }
}

/// One record of the filters blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterRule {
    pub stream_name: String,
    pub node_name: String,
    pub direction: Direction,
    pub target: Option<String>,
    pub mode: Option<Mode>,
    pub priority: Option<i32>,
}

impl FilterRule {
    pub fn matches(&self, stream_name: &str, node_name: &str, direction: Direction) -> bool {
        self.stream_name == stream_name && self.node_name == node_name && self.direction == direction
    }
}

/// First rule matching a filter's stream name, node name and direction.
pub fn find_rule<'a>(
    rules: &'a [FilterRule],
    stream_name: &str,
    node_name: &str,
    direction: Direction,
) -> Option<&'a FilterRule> {
    rules
        .iter()
        .find(|rule| rule.matches(stream_name, node_name, direction))
}

fn parse_json(json: &str) -> Result<Value, MetadataError> {
    serde_json::from_str(json).map_err(|e| MetadataError::InvalidJson(e.to_string()))
}

/// Parse the targets blob.
pub fn parse_targets(json: &str) -> Result<Parsed<TargetRule>, MetadataError> {
    let value = parse_json(json)?;
    let Value::Object(map) = value else {
        return Err(MetadataError::WrongShape {
            expected: "object",
            value: json.to_string(),
        });
    };

    let mut parsed = Parsed::default();
    for (name, props) in map {
        match parse_predicate(&name, &props) {
            Ok(constraints) => parsed.rules.push(TargetRule { name, constraints }),
            Err(e) => parsed.warnings.push(e),
        }
    }

    Ok(parsed)
}

fn parse_predicate(target: &str, props: &Value) -> Result<Vec<Constraint>, MetadataError> {
    let Value::Object(props) = props else {
        return Err(MetadataError::TargetNotAnObject(target.to_string()));
    };

    let invalid = |key: &str| MetadataError::InvalidPredicate {
        target: target.to_string(),
        key: key.to_string(),
    };

    props
        .iter()
        .map(|(key, value)| {
            let constraint = match value {
                Value::Array(items) => {
                    let values = items
                        .iter()
                        .map(scalar_to_string)
                        .collect::<Option<Vec<_>>>()
                        .ok_or_else(|| invalid(key))?;
                    Constraint::new(key.as_str(), Verb::InSet(values))
                }
                Value::Object(range) => {
                    let min = range.get("min").and_then(Value::as_f64);
                    let max = range.get("max").and_then(Value::as_f64);
                    match (min, max) {
                        (Some(min), Some(max)) => {
                            Constraint::new(key.as_str(), Verb::InRange { min, max })
                        }
                        _ => return Err(invalid(key)),
                    }
                }
                scalar => {
                    let value = scalar_to_string(scalar).ok_or_else(|| invalid(key))?;
                    Constraint::from_value(key.as_str(), &value).map_err(|_| invalid(key))?
                }
            };
            Ok(constraint)
        })
        .collect()
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Parse the filters blob.
pub fn parse_filters(json: &str) -> Result<Parsed<FilterRule>, MetadataError> {
    let value = parse_json(json)?;
    let Value::Array(records) = value else {
        return Err(MetadataError::WrongShape {
            expected: "array",
            value: json.to_string(),
        });
    };

    let mut parsed = Parsed::default();
    for record in &records {
        match parse_filter_record(record, &mut parsed.warnings) {
            Ok(rule) => parsed.rules.push(rule),
            Err(e) => parsed.warnings.push(e),
        }
    }

    Ok(parsed)
}

fn parse_filter_record(
    record: &Value,
    warnings: &mut Vec<MetadataError>,
) -> Result<FilterRule, MetadataError> {
    let Value::Object(fields) = record else {
        return Err(MetadataError::NotAnObject(record.to_string()));
    };

    let text = |key: &str| fields.get(key).and_then(Value::as_str);
    let (Some(stream_name), Some(node_name), Some(direction)) =
        (text("stream-name"), text("node-name"), text("direction"))
    else {
        return Err(MetadataError::MissingFields(record.to_string()));
    };

    let direction = Direction::from_config(direction).ok_or_else(|| {
        MetadataError::InvalidDirection {
            direction: direction.to_string(),
            record: record.to_string(),
        }
    })?;

    let target = match fields.get("target") {
        None => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(_) => {
            return Err(MetadataError::InvalidField {
                field: "target",
                record: record.to_string(),
            })
        }
    };

    let priority = match fields.get("priority") {
        None => None,
        Some(v) => Some(
            v.as_i64()
                .and_then(|p| i32::try_from(p).ok())
                .ok_or_else(|| MetadataError::InvalidField {
                    field: "priority",
                    record: record.to_string(),
                })?,
        ),
    };

    // An unknown mode leaves `enabled` alone; target and priority still apply.
    let mode = match fields.get("mode") {
        None => None,
        Some(Value::String(s)) => match s.parse::<Mode>() {
            Ok(mode) => Some(mode),
            Err(_) => {
                warnings.push(MetadataError::InvalidField {
                    field: "mode",
                    record: record.to_string(),
                });
                None
            }
        },
        Some(_) => {
            warnings.push(MetadataError::InvalidField {
                field: "mode",
                record: record.to_string(),
            });
            None
        }
    };

    Ok(FilterRule {
        stream_name: stream_name.to_string(),
        node_name: node_name.to_string(),
        direction,
        target,
        mode,
        priority,
    })
}
