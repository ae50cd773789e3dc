// SPDX-License-Identifier: Apache-2.0

use std::cell::RefCell;
use std::rc::Rc;

use crate::chain::core::{ChainCore, EndpointId};
use crate::{BuildError, ChainConfig, Diagnostics, Intf, Module, ModuleLibrary, Port};

mod address;
mod auto_connect;
mod bundle;
mod connect;
pub(crate) mod core;
mod generics;
mod hierarchy;
mod pending;
mod rules;
mod unconnected;
mod widths;

pub use self::address::AddressEntry;
pub use self::core::BundleOp;

/// One side of a connection request: a whole module, an interface or a
/// single port.
#[derive(Clone, Debug)]
pub enum Endpoint {
    Module(Module),
    Intf(Intf),
    Port(Port),
}

impl Endpoint {
    fn id(&self) -> EndpointId {
        match self {
            Endpoint::Module(m) => EndpointId::Module(m.id),
            Endpoint::Intf(i) => EndpointId::Interface(i.id),
            Endpoint::Port(p) => EndpointId::Port(p.id),
        }
    }
}

impl From<Module> for Endpoint {
    fn from(value: Module) -> Self {
        Endpoint::Module(value)
    }
}

impl From<&Module> for Endpoint {
    fn from(value: &Module) -> Self {
        Endpoint::Module(value.clone())
    }
}

impl From<Intf> for Endpoint {
    fn from(value: Intf) -> Self {
        Endpoint::Intf(value)
    }
}

impl From<&Intf> for Endpoint {
    fn from(value: &Intf) -> Self {
        Endpoint::Intf(value.clone())
    }
}

impl From<Port> for Endpoint {
    fn from(value: Port) -> Self {
        Endpoint::Port(value)
    }
}

impl From<&Port> for Endpoint {
    fn from(value: &Port) -> Self {
        Endpoint::Port(value.clone())
    }
}

/// A reduction of same-named ports of one module group.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Bundle {
    pub op: BundleOp,
    /// Signal the members drive.
    pub signal: Port,
    /// Group port carrying the reduced value.
    pub external: Port,
    pub members: Vec<Port>,
}

/// A processing chain: a hierarchy of modules built from a `ModuleLibrary`,
/// plus the connections requested between them.
///
/// The chain starts with a top level group and a main group inside it. User
/// modules are added to the main group unless placed in a group of their
/// own. `auto_connect` then wires the whole graph in one pass.
#[derive(Clone)]
pub struct ProcessingChain {
    pub(crate) core: Rc<RefCell<ChainCore>>,
}

impl ProcessingChain {
    /// Creates a chain with the default configuration.
    pub fn new(library: ModuleLibrary) -> Self {
        Self::with_config(ChainConfig::default(), library)
    }

    pub fn with_config(config: ChainConfig, library: ModuleLibrary) -> Self {
        ProcessingChain {
            core: Rc::new(RefCell::new(ChainCore::new(config, library))),
        }
    }

    pub fn config(&self) -> ChainConfig {
        self.core.borrow().config.clone()
    }

    fn wrap_module(&self, id: crate::chain::core::ModuleId) -> Module {
        Module {
            chain: Rc::downgrade(&self.core),
            id,
        }
    }

    /// The top level group (modlevel 0).
    pub fn top(&self) -> Module {
        let id = self.core.borrow().top;
        self.wrap_module(id)
    }

    /// The main group user modules are added to.
    pub fn main(&self) -> Module {
        let id = self.core.borrow().main;
        self.wrap_module(id)
    }

    /// Instantiates the library entity `entity_name` as `name` in the main
    /// group.
    pub fn add_module(&self, entity_name: &str, name: &str) -> Result<Module, crate::ChainError> {
        self.main().add_module(entity_name, name)
    }

    /// Creates an empty module group in the main group.
    pub fn add_module_group(&self, name: &str) -> Result<Module, crate::ChainError> {
        self.main().add_module_group(name)
    }

    pub fn get_module(&self, name: &str) -> Option<Module> {
        let found = self.core.borrow().find_module(name);
        found.map(|id| self.wrap_module(id))
    }

    /// Every module and group, depth-first from the top.
    pub fn modules(&self) -> Vec<Module> {
        let ids = self.core.borrow().walk();
        ids.into_iter().map(|id| self.wrap_module(id)).collect()
    }

    /// Modules the chain instantiated on its own, such as register managers.
    pub fn auto_instantiated(&self) -> Vec<Module> {
        let ids = self.core.borrow().auto_instantiated.clone();
        ids.into_iter().map(|id| self.wrap_module(id)).collect()
    }

    /// Requests a connection between two modules, interfaces or ports. The
    /// request is resolved by `auto_connect`.
    pub fn connect(&self, a: impl Into<Endpoint>, b: impl Into<Endpoint>) {
        let (a, b) = (a.into(), b.into());
        self.core.borrow_mut().pending.push((a.id(), b.id()));
    }

    /// Resolves every connection of the chain.
    ///
    /// Returns the collected notes and warnings on success. On failure the
    /// `BuildError` carries every diagnostic collected up to that point and,
    /// if the pass was aborted, the error that stopped it.
    ///
    /// # Panics
    ///
    /// Panics when called a second time on the same chain.
    pub fn auto_connect(&self) -> Result<Diagnostics, BuildError> {
        self.core.borrow_mut().auto_connect()
    }

    /// Register slots reserved for every register interface.
    pub fn max_regs_per_module(&self) -> u32 {
        self.core.borrow().max_regs_per_module
    }

    /// Every assigned register, ascending by address.
    pub fn address_map(&self) -> Vec<AddressEntry> {
        self.core.borrow().address_map()
    }

    pub fn bundles(&self) -> Vec<Bundle> {
        let core = self.core.borrow();
        let wrap = |id| Port {
            chain: Rc::downgrade(&self.core),
            id,
        };
        core.bundles
            .values()
            .map(|b| Bundle {
                op: b.op,
                signal: wrap(b.signal),
                external: wrap(b.external),
                members: b.members.iter().copied().map(wrap).collect(),
            })
            .collect()
    }
}
