//! This module defines the error type and Result alias.

use thiserror::Error;

/// Everything that can go wrong while compiling a schedule expression.
///
/// Every variant carries the offending input, so a message stays useful when
/// it surfaces far from the call site (the scheduler logs parse failures
/// instead of returning them).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// The expression has the wrong number of whitespace-separated fields
    /// for the parser's configuration.
    #[error("parser accepts {expected} fields, found {found}: {spec}")]
    FieldCountMismatch {
        expected: usize,
        found: usize,
        spec: String,
    },
    /// More than one `/` in a single field item.
    #[error("too many slashes: {0}")]
    TooManySlashes(String),
    /// More than one `-` in a single field item.
    #[error("too many hyphens: {0}")]
    TooManyHyphens(String),
    /// A value falls outside the field's legal domain.
    #[error("the effective range is [{min}, {max}], but got [{low}, {high}]: {expr}")]
    RangeOutOfBounds {
        min: u32,
        max: u32,
        low: u32,
        high: u32,
        expr: String,
    },
    /// A range whose start exceeds its end.
    #[error("beginning of range ({low}) is beyond end of range ({high}): {expr}")]
    InvertedRange { low: u32, high: u32, expr: String },
    #[error("the step (0) is invalid: {0}")]
    ZeroStep(String),
    /// A token that is neither a base-10 number nor a known name alias.
    #[error("not a number or a recognized name: {0}")]
    InvalidNumberOrName(String),
    /// An `@`-descriptor was given to a parser with descriptors disabled.
    #[error("parser does not accept descriptors: {0}")]
    DisabledDescriptor(String),
    #[error("invalid descriptor: {0}")]
    InvalidDescriptor(String),
    /// The duration after `@every` does not parse.
    #[error("invalid duration: {0}")]
    InvalidDuration(String),
}

pub type Result<T> = std::result::Result<T, Error>;
