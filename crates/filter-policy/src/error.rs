use thiserror::Error;

use crate::scheduler::SyncSeq;

/// Errors surfaced to the owner of a policy engine or service.
#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("unknown direction flag: {0}")]
    UnknownDirection(String),

    #[error("settle barrier {seq} failed: {reason}")]
    Barrier { seq: SyncSeq, reason: String },

    #[error("policy service is no longer running")]
    ServiceClosed,
}

/// Problems found while parsing a configuration blob.
///
/// These are never fatal; the engine logs them and moves on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MetadataError {
    #[error("value is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("expected a JSON {expected}, got: {value}")]
    WrongShape { expected: &'static str, value: String },

    #[error("filter record is not an object: {0}")]
    NotAnObject(String),

    #[error("failed to parse stream-name, node-name and direction in filter: {0}")]
    MissingFields(String),

    #[error("direction {direction} is not valid for filter: {record}")]
    InvalidDirection { direction: String, record: String },

    #[error("invalid {field} in filter: {record}")]
    InvalidField { field: &'static str, record: String },

    #[error("could not get '{key}' value from target '{target}' properties")]
    InvalidPredicate { target: String, key: String },

    #[error("target '{0}' properties must be a JSON object")]
    TargetNotAnObject(String),
}
