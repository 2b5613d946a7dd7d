//! Error type shared by models, proposals, kernels, and the sampling driver.

use thiserror::Error;

/// Everything that can abort a chain.
///
/// Out-of-support parameters are not errors: models report them as a log-density of
/// `f64::NEG_INFINITY` and the acceptance test rejects them.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum McmcError {
    /// The sampler was set up in a way it cannot run with.
    #[error("invalid sampler configuration: {0}")]
    Configuration(String),

    /// A distribution or model was asked for something it cannot compute.
    #[error("missing capability: {what}")]
    Capability { what: String },

    /// A composite proposal was applied to parameters of a different shape.
    #[error("proposal shape {expected} does not match parameter shape {found}")]
    ShapeMismatch { expected: String, found: String },
}

impl McmcError {
    pub(crate) fn capability(what: impl Into<String>) -> Self {
        McmcError::Capability { what: what.into() }
    }

    pub(crate) fn shape(expected: impl ToString, found: impl ToString) -> Self {
        McmcError::ShapeMismatch {
            expected: expected.to_string(),
            found: found.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, McmcError>;
