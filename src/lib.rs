// SPDX-License-Identifier: Apache-2.0

//! Automatic connection of hardware processing chains.
//!
//! A `ProcessingChain` holds a hierarchy of modules instantiated from the
//! entity descriptions of a `ModuleLibrary`. Ports are grouped into
//! interfaces by template matching, each port carries an ordered list of
//! rules, and `ProcessingChain::auto_connect` resolves the whole graph:
//! interfaces are paired, symbolic widths are solved, connections crossing
//! group boundaries are bridged with glue signals and register interfaces
//! are given addresses.

mod chain;
mod config;
mod diagnostics;
mod entity;
mod error;
mod generic;
mod intf;
mod io;
mod module;
mod port;
mod register;
mod rule;
mod util;
mod validate;
mod width;

pub use chain::{AddressEntry, Bundle, BundleOp, Endpoint, ProcessingChain};
pub use config::ChainConfig;
pub use diagnostics::{Diagnostic, DiagnosticKind, Diagnostics, Severity};
pub use entity::{
    DiscoveredConstant, DiscoveredGeneric, DiscoveredPort, EntityDescription, ModuleLibrary,
    StandardPortTemplate, standard_port_templates,
};
pub use error::{BuildError, ChainError};
pub use generic::{Generic, GenericValue};
pub use intf::{InterfaceTemplate, Intf, TemplatePort, template};
pub use io::Direction;
pub use module::Module;
pub use port::{Port, PortKind};
pub use register::{
    REGISTER_CONFIG_CONSTANT, REGISTER_PORTS, RegisterKind, RegisterState, decode_register_table,
};
pub use rule::{Action, Condition, Rule, RuleSet};
pub use util::get_prefix_suffix;
pub use width::expr::{evaluate, identifiers};
pub use width::{BitOrder, Bound, DataWidth};
