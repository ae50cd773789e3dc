// SPDX-License-Identifier: Apache-2.0

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;

use crate::chain::core::{ChainCore, GenericId, InterfaceId, ModuleId, PortId};
use crate::register::RegisterBlock;
use crate::{Direction, Generic, Module, Port, RegisterKind, RegisterState};

mod connect;
mod export;
pub mod template;

pub use template::{InterfaceTemplate, TemplatePort};

/// Data of an interface in the chain's arena.
#[derive(Clone, Debug)]
pub struct InterfaceCore {
    pub(crate) name: String,
    pub(crate) type_name: String,
    pub(crate) direction: Direction,
    /// Ports keyed by their function name.
    pub(crate) ports: IndexMap<String, PortId>,
    pub(crate) generics: Vec<GenericId>,
    /// Index into the library's template list.
    pub(crate) template: Option<usize>,
    pub(crate) prefix: String,
    pub(crate) suffix: String,
    pub(crate) unique_name: String,
    pub(crate) connected: bool,
    pub(crate) to_external: bool,
    /// Entity and group of a helper module to instantiate for this interface.
    pub(crate) instantiate: Option<(String, String)>,
    /// Module this interface is wired to automatically.
    pub(crate) connect_to: Option<ModuleId>,
    pub(crate) module: ModuleId,
    pub(crate) incoming: Vec<InterfaceId>,
    pub(crate) outgoing: Vec<InterfaceId>,
    pub(crate) origin: Option<InterfaceId>,
    pub(crate) register: Option<RegisterBlock>,
}

impl InterfaceCore {
    pub(crate) fn new(type_name: &str, direction: Direction, module: ModuleId) -> Self {
        InterfaceCore {
            name: String::new(),
            type_name: type_name.to_string(),
            direction,
            ports: IndexMap::new(),
            generics: Vec::new(),
            template: None,
            prefix: String::new(),
            suffix: String::new(),
            unique_name: String::new(),
            connected: false,
            to_external: false,
            instantiate: None,
            connect_to: None,
            module,
            incoming: Vec::new(),
            outgoing: Vec::new(),
            origin: None,
            register: None,
        }
    }
}

impl ChainCore {
    /// Whether every mandatory port of the interface is connected.
    pub(crate) fn interface_complete_connection(&self, intf: InterfaceId) -> bool {
        self.interfaces[intf.0]
            .ports
            .values()
            .map(|p| &self.ports[p.0])
            .filter(|p| !p.optional)
            .all(|p| p.connected)
    }

    /// Sets the interface `connected` flag once all mandatory ports are
    /// connected. The flag is never cleared.
    pub(crate) fn update_interface_connected(&mut self, intf: InterfaceId) {
        if !self.interfaces[intf.0].connected && self.interface_complete_connection(intf) {
            log::debug!("Interface '{}' is connected", self.intf_path(intf));
            self.interfaces[intf.0].connected = true;
        }
    }

    /// `{module}_{prefix}{type}{suffix}_{direction}`
    pub(crate) fn refresh_unique_name(&mut self, intf: InterfaceId) {
        let i = &self.interfaces[intf.0];
        let unique = format!(
            "{}_{}{}{}_{}",
            self.modules[i.module.0].name,
            i.prefix,
            i.type_name,
            i.suffix,
            i.direction
        );
        self.interfaces[intf.0].unique_name = unique;
    }

    pub(crate) fn interface_port(&self, intf: InterfaceId, name: &str) -> Option<PortId> {
        let i = &self.interfaces[intf.0];
        i.ports.get(name).copied().or_else(|| {
            i.ports
                .values()
                .copied()
                .find(|p| self.ports[p.0].code_name.eq_ignore_ascii_case(name))
        })
    }
}

/// Handle to an interface (or register interface) of a module in a
/// `ProcessingChain`.
#[derive(Clone, Debug)]
pub struct Intf {
    pub(crate) chain: Weak<RefCell<ChainCore>>,
    pub(crate) id: InterfaceId,
}

impl PartialEq for Intf {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && Weak::ptr_eq(&self.chain, &other.chain)
    }
}

impl Eq for Intf {}

impl Intf {
    pub(crate) fn core(&self) -> Rc<RefCell<ChainCore>> {
        self.chain
            .upgrade()
            .expect("Containing ProcessingChain has been dropped")
    }

    fn read<T>(&self, f: impl FnOnce(&InterfaceCore) -> T) -> T {
        let core = self.core();
        let core = core.borrow();
        f(&core.interfaces[self.id.0])
    }

    fn register<T>(&self, f: impl FnOnce(&RegisterBlock) -> T) -> Option<T> {
        self.read(|i| i.register.as_ref().map(f))
    }

    /// Name of the interface within its module, e.g. `in` or `sensor`.
    pub fn name(&self) -> String {
        self.read(|i| i.name.clone())
    }

    pub fn type_name(&self) -> String {
        self.read(|i| i.type_name.clone())
    }

    pub fn direction(&self) -> Direction {
        self.read(|i| i.direction)
    }

    pub fn prefix(&self) -> String {
        self.read(|i| i.prefix.clone())
    }

    pub fn suffix(&self) -> String {
        self.read(|i| i.suffix.clone())
    }

    /// Name that is unique across the chain.
    pub fn unique_name(&self) -> String {
        self.read(|i| i.unique_name.clone())
    }

    pub fn is_connected(&self) -> bool {
        self.read(|i| i.connected)
    }

    pub fn is_external(&self) -> bool {
        self.read(|i| i.to_external)
    }

    pub fn module(&self) -> Module {
        Module {
            chain: self.chain.clone(),
            id: self.read(|i| i.module),
        }
    }

    /// Returns the port with the given function or code name, or `None`.
    pub fn get_port(&self, name: impl AsRef<str>) -> Option<Port> {
        let core = self.core();
        let found = core.borrow().interface_port(self.id, name.as_ref());
        found.map(|id| Port {
            chain: self.chain.clone(),
            id,
        })
    }

    /// Ports of the interface, in discovery order.
    pub fn ports(&self) -> Vec<Port> {
        self.read(|i| i.ports.values().copied().collect::<Vec<_>>())
            .into_iter()
            .map(|id| Port {
                chain: self.chain.clone(),
                id,
            })
            .collect()
    }

    pub fn generics(&self) -> Vec<Generic> {
        self.read(|i| i.generics.clone())
            .into_iter()
            .map(|id| Generic {
                chain: self.chain.clone(),
                id,
            })
            .collect()
    }

    /// Interfaces driving this one.
    pub fn incoming(&self) -> Vec<Intf> {
        self.read(|i| i.incoming.clone())
            .into_iter()
            .map(|id| Intf {
                chain: self.chain.clone(),
                id,
            })
            .collect()
    }

    pub fn outgoing(&self) -> Vec<Intf> {
        self.read(|i| i.outgoing.clone())
            .into_iter()
            .map(|id| Intf {
                chain: self.chain.clone(),
                id,
            })
            .collect()
    }

    /// The interface this one was duplicated from while propagating it up the
    /// hierarchy.
    pub fn origin(&self) -> Option<Intf> {
        self.read(|i| i.origin).map(|id| Intf {
            chain: self.chain.clone(),
            id,
        })
    }

    pub fn is_register_interface(&self) -> bool {
        self.read(|i| i.register.is_some())
    }

    /// Decoded register table, for register interfaces.
    pub fn register_table(&self) -> Option<Vec<RegisterKind>> {
        self.register(|r| r.table.clone())
    }

    pub fn reg_count(&self) -> Option<usize> {
        self.register(|r| r.reg_count())
    }

    pub fn base_address(&self) -> Option<u32> {
        self.register(|r| r.base_address).flatten()
    }

    pub fn register_state(&self) -> Option<RegisterState> {
        self.register(|r| r.state)
    }

    /// Code name and raw value of the configuration constant.
    pub fn config_constant(&self) -> Option<(String, String)> {
        self.register(|r| r.config.clone()).flatten()
    }

    /// Register interfaces are complete once all canonical ports are present
    /// and the configuration constant has been decoded. Other interfaces are
    /// complete once all mandatory template ports are present.
    pub fn is_complete(&self) -> bool {
        let core = self.core();
        let core = core.borrow();
        core.interface_is_complete(self.id)
    }

    pub(crate) fn debug_string(&self) -> String {
        self.core().borrow().intf_path(self.id)
    }
}

impl ChainCore {
    pub(crate) fn interface_is_complete(&self, intf: InterfaceId) -> bool {
        let i = &self.interfaces[intf.0];
        let mandatory_present = match i.template {
            Some(t) => self.library.templates[t]
                .mandatory_ports()
                .all(|tp| i.ports.contains_key(&tp.name)),
            None => true,
        };
        match &i.register {
            Some(block) => {
                mandatory_present
                    && crate::register::REGISTER_PORTS
                        .iter()
                        .all(|name| i.ports.contains_key(*name))
                    && block.decoded
            }
            None => mandatory_present,
        }
    }
}

impl fmt::Display for Intf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.debug_string())
    }
}
