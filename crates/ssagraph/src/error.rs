//! Error taxonomy for the graph builder.
//!
//! Two user-visible kinds, matching the host compiler's recovery story:
//! a [`BuildError::Bailout`] means "give up on this compile cleanly, the
//! method may be recompiled or interpreted"; a [`BuildError::Internal`]
//! means "the builder itself is broken". Deoptimization is *not* an error
//! — it is a graph node (`NodeKind::Deoptimize`) emitted in place of the
//! instruction that couldn't be resolved, so compilation proceeds.

use std::fmt;

/// Why a bailout happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BailoutKind {
    /// Operand-stack/local/lock shapes disagree across an edge into a block,
    /// a pop observed the wrong kind, or the lock stack underflowed. These
    /// are exactly the checks a bytecode verifier performs; a method that
    /// reaches one is not valid bytecode (or the options told us to skip
    /// verification and we paid for it).
    VerifierEquivalent(String),

    /// JSR/RET/JSR_W encountered. The builder does not support the
    /// deprecated subroutine opcodes.
    UnsupportedSubroutine,

    /// BREAKPOINT or an opcode the dispatcher has no semantics for.
    UnsupportedOpcode(String),

    /// The arena's configured `max_node_count` would be exceeded.
    MethodTooLarge { limit: usize },
}

impl fmt::Display for BailoutKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BailoutKind::VerifierEquivalent(msg) => write!(f, "cannot verify: {msg}"),
            BailoutKind::UnsupportedSubroutine => {
                write!(f, "JSR/RET subroutines are not supported")
            }
            BailoutKind::UnsupportedOpcode(op) => write!(f, "unsupported opcode: {op}"),
            BailoutKind::MethodTooLarge { limit } => {
                write!(f, "method too large: exceeded max_node_count={limit}")
            }
        }
    }
}

/// Top-level error returned by [`crate::compile_method`].
#[derive(Debug, Clone, thiserror::Error)]
pub enum BuildError {
    /// A clean, non-fatal compile failure. The host should not retain any
    /// partial graph and may retry this method under the interpreter or
    /// schedule a later recompile.
    #[error("bailout: {0}")]
    Bailout(BailoutKind),

    /// A programming error inside the builder (e.g. merging into a node
    /// that isn't a block begin, or a collaborator returning an
    /// inconsistent result). Never recovered from.
    #[error("internal invariant violation: {0}")]
    Internal(String),
}

impl BuildError {
    pub fn verifier(msg: impl Into<String>) -> Self {
        BuildError::Bailout(BailoutKind::VerifierEquivalent(msg.into()))
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        BuildError::Internal(msg.into())
    }

    /// True if this is a bailout (vs. an internal error).
    pub fn is_bailout(&self) -> bool {
        matches!(self, BuildError::Bailout(_))
    }
}

/// Convert an internal `anyhow::Error` (used for `.context(...)` plumbing
/// in leaf helpers) into the public, typed error at the API boundary.
impl From<anyhow::Error> for BuildError {
    fn from(e: anyhow::Error) -> Self {
        BuildError::Internal(format!("{e:#}"))
    }
}

pub type Result<T> = std::result::Result<T, BuildError>;
