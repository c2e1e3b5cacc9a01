use alloc::{boxed::Box, string::String, vec::Vec};
use core::fmt::{self, Display, Formatter};

use super::{instantiate::InstantiateErrorKind, instantiator::InstantiatorErrorKind};

#[derive(thiserror::Error, Debug)]
pub enum ResolveErrorKind {
    #[error("No provider for {token} found in the injector chain")]
    TokenNotFound { token: String },
    #[error("{token} is bound to the event context, but no context was supplied")]
    InvalidContextResolution { token: String },
    #[error("{0}")]
    CyclicDependency(CyclePath),
    #[error("Resolution of {token} exceeded the maximum depth of {max_depth}")]
    ResolutionTooDeep { token: String, max_depth: usize },
    #[error("Incorrect instance type for {token}. Expected: {expected}")]
    IncorrectType { token: String, expected: &'static str },
    #[error(transparent)]
    Instantiator(InstantiatorErrorKind<Box<ResolveErrorKind>, InstantiateErrorKind>),
}

/// Tokens on the resolution path, the last one closes the cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CyclePath(pub Vec<String>);

impl Display for CyclePath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Cyclic dependency detected: ")?;
        for (index, token) in self.0.iter().enumerate() {
            if index > 0 {
                write!(f, " -> ")?;
            }
            write!(f, "{token}")?;
        }
        Ok(())
    }
}
