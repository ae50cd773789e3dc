// SPDX-License-Identifier: Apache-2.0

use crate::diagnostics::{DiagnosticKind, Diagnostics, Severity};

/// Errors raised while building or resolving a processing chain.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChainError {
    /// The discovered description of an entity is malformed.
    #[error("discovery error in entity '{entity}': {msg}")]
    Discovery { entity: String, msg: String },

    /// A user-supplied rule condition or action could not be parsed.
    #[error("invalid port rule '{text}': {msg}")]
    RuleViolation { text: String, msg: String },

    /// Two objects could not be connected.
    #[error("connection error at {subject}: {msg}")]
    Connection {
        subject: String,
        msg: String,
        severity: Severity,
    },

    /// The register address space cannot hold another register interface.
    #[error(
        "register address space exhausted at module '{module}': block at {address:#010X} ends beyond {ceiling:#010X}"
    )]
    AddressSpaceExhausted {
        module: String,
        address: u32,
        ceiling: u32,
    },

    /// An entity requested by name is not present in the module library.
    #[error("entity '{0}' not found in the module library")]
    ModuleNotFound(String),

    #[error("{what} '{name}' already exists in '{owner}'")]
    Duplicate {
        what: &'static str,
        name: String,
        owner: String,
    },

    #[error("{what} '{name}' not found in '{owner}'")]
    NotFound {
        what: &'static str,
        name: String,
        owner: String,
    },

    /// A port does not fit the template of the interface it is added to.
    #[error("port '{port}' does not fit interface '{intf}': {msg}")]
    TemplateMismatch {
        port: String,
        intf: String,
        msg: String,
    },
}

impl ChainError {
    /// Errors that stop the build immediately rather than being collected.
    pub fn is_fatal(&self) -> bool {
        match self {
            ChainError::Discovery { .. }
            | ChainError::AddressSpaceExhausted { .. }
            | ChainError::ModuleNotFound(_) => true,
            ChainError::Connection { severity, .. } => *severity == Severity::Error,
            ChainError::RuleViolation { .. }
            | ChainError::Duplicate { .. }
            | ChainError::NotFound { .. }
            | ChainError::TemplateMismatch { .. } => false,
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            ChainError::Connection { severity, .. } => *severity,
            ChainError::RuleViolation { .. } => Severity::Warning,
            _ => Severity::Error,
        }
    }

    pub(crate) fn kind(&self) -> DiagnosticKind {
        match self {
            ChainError::Discovery { .. } => DiagnosticKind::Discovery,
            ChainError::RuleViolation { .. } => DiagnosticKind::RuleViolation,
            ChainError::Connection { .. }
            | ChainError::Duplicate { .. }
            | ChainError::NotFound { .. }
            | ChainError::TemplateMismatch { .. } => DiagnosticKind::Connection,
            ChainError::AddressSpaceExhausted { .. } => DiagnosticKind::AddressSpace,
            ChainError::ModuleNotFound(_) => DiagnosticKind::ModuleNotFound,
        }
    }

    pub(crate) fn subject(&self) -> Option<String> {
        match self {
            ChainError::Discovery { entity, .. } => Some(entity.clone()),
            ChainError::Connection { subject, .. } => Some(subject.clone()),
            ChainError::AddressSpaceExhausted { module, .. } => Some(module.clone()),
            ChainError::Duplicate { owner, .. } | ChainError::NotFound { owner, .. } => {
                Some(owner.clone())
            }
            ChainError::TemplateMismatch { intf, .. } => Some(intf.clone()),
            ChainError::RuleViolation { .. } | ChainError::ModuleNotFound(_) => None,
        }
    }
}

/// Returned by `ProcessingChain::auto_connect` when the build failed. Carries
/// every diagnostic collected up to the point where the pass stopped.
#[derive(Debug, Clone, thiserror::Error)]
#[error("chain build failed with {} error(s)", .diagnostics.error_count())]
pub struct BuildError {
    /// The error that stopped the pass, if the pass was aborted rather than
    /// completed with errors.
    pub fatal: Option<ChainError>,
    pub diagnostics: Diagnostics,
}

impl BuildError {
    /// All diagnostics grouped by severity.
    pub fn report(&self) -> String {
        self.diagnostics.report()
    }
}
