// SPDX-License-Identifier: Apache-2.0

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;

use crate::chain::core::{ChainCore, GenericId, InterfaceId, ModuleId, PortId};
use crate::{Intf, Port};

mod discover;
mod generics;
mod group;
mod ports;

/// Children and local signals of a module group.
#[derive(Clone, Debug, Default)]
pub struct GroupCore {
    pub(crate) children: Vec<ModuleId>,
    /// Declared and synthesized signals, keyed by code name.
    pub(crate) signals: IndexMap<String, PortId>,
}

#[derive(Clone, Debug)]
pub enum ModuleKind {
    Leaf,
    Group(GroupCore),
}

/// Data of a module or module group in the chain's arena.
#[derive(Clone, Debug)]
pub struct ModuleCore {
    pub(crate) name: String,
    pub(crate) entity_name: String,
    /// Ports outside of interfaces, keyed by code name.
    pub(crate) ports: IndexMap<String, PortId>,
    /// Interfaces and register interfaces, in discovery order.
    pub(crate) interfaces: Vec<InterfaceId>,
    pub(crate) generics: IndexMap<String, GenericId>,
    pub(crate) constants: IndexMap<String, String>,
    pub(crate) parent: Option<ModuleId>,
    pub(crate) modlevel: u32,
    pub(crate) connected: bool,
    /// False for helper modules instantiated by the engine.
    pub(crate) user_authored: bool,
    pub(crate) kind: ModuleKind,
    /// Modules this one exchanges data with.
    pub(crate) connections: Vec<ModuleId>,
}

impl ChainCore {
    /// Every port of a module: standalone ports first, then interface ports.
    pub(crate) fn module_ports(&self, module: ModuleId) -> Vec<PortId> {
        let m = &self.modules[module.0];
        let mut out = m.ports.values().copied().collect::<Vec<_>>();
        for intf in &m.interfaces {
            out.extend(self.interfaces[intf.0].ports.values().copied());
        }
        out
    }

    /// Finds a port of `module` by code name, then by function name. Group
    /// signals are not included.
    pub(crate) fn find_port(&self, module: ModuleId, name: &str) -> Option<PortId> {
        let m = &self.modules[module.0];
        let by = |pick: fn(&crate::port::PortCore) -> &String| {
            m.ports
                .values()
                .copied()
                .chain(
                    m.interfaces
                        .iter()
                        .flat_map(|i| self.interfaces[i.0].ports.values().copied()),
                )
                .find(|p| pick(&self.ports[p.0]).eq_ignore_ascii_case(name))
        };
        by(|p| &p.code_name).or_else(|| by(|p| &p.name))
    }

    pub(crate) fn find_signal(&self, group: ModuleId, name: &str) -> Option<PortId> {
        match &self.modules[group.0].kind {
            ModuleKind::Group(g) => g
                .signals
                .iter()
                .find(|(code_name, _)| code_name.eq_ignore_ascii_case(name))
                .map(|(_, id)| *id),
            ModuleKind::Leaf => None,
        }
    }

    /// Whether all interfaces and standalone ports of a module are connected.
    /// Ports bound to a value or left out of the entity count as connected.
    pub(crate) fn module_connect_complete(&self, module: ModuleId) -> bool {
        let m = &self.modules[module.0];
        let intfs_done = m.interfaces.iter().all(|i| self.interfaces[i.0].connected);
        let ports_done = m.ports.values().all(|p| {
            let p = &self.ports[p.0];
            p.connected || p.optional || !p.in_entity
        });
        intfs_done && ports_done
    }

    pub(crate) fn register_module_connection(&mut self, a: ModuleId, b: ModuleId) {
        if a == b {
            return;
        }
        if !self.modules[a.0].connections.contains(&b) {
            self.modules[a.0].connections.push(b);
        }
        if !self.modules[b.0].connections.contains(&a) {
            self.modules[b.0].connections.push(a);
        }
    }
}

/// Handle to a module or module group in a `ProcessingChain`.
#[derive(Clone, Debug)]
pub struct Module {
    pub(crate) chain: Weak<RefCell<ChainCore>>,
    pub(crate) id: ModuleId,
}

impl PartialEq for Module {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && Weak::ptr_eq(&self.chain, &other.chain)
    }
}

impl Eq for Module {}

impl Module {
    pub(crate) fn core(&self) -> Rc<RefCell<ChainCore>> {
        self.chain
            .upgrade()
            .expect("Containing ProcessingChain has been dropped")
    }

    fn read<T>(&self, f: impl FnOnce(&ModuleCore) -> T) -> T {
        let core = self.core();
        let core = core.borrow();
        f(&core.modules[self.id.0])
    }

    pub(crate) fn wrap_port(&self, id: PortId) -> Port {
        Port {
            chain: self.chain.clone(),
            id,
        }
    }

    pub(crate) fn wrap_module(&self, id: ModuleId) -> Module {
        Module {
            chain: self.chain.clone(),
            id,
        }
    }

    pub(crate) fn wrap_intf(&self, id: InterfaceId) -> Intf {
        Intf {
            chain: self.chain.clone(),
            id,
        }
    }

    pub fn name(&self) -> String {
        self.read(|m| m.name.clone())
    }

    pub fn entity_name(&self) -> String {
        self.read(|m| m.entity_name.clone())
    }

    /// Depth in the hierarchy; the top level group is 0.
    pub fn modlevel(&self) -> u32 {
        self.read(|m| m.modlevel)
    }

    pub fn parent(&self) -> Option<Module> {
        self.read(|m| m.parent).map(|id| self.wrap_module(id))
    }

    pub fn is_group(&self) -> bool {
        self.read(|m| matches!(m.kind, ModuleKind::Group(_)))
    }

    pub fn is_connected(&self) -> bool {
        self.read(|m| m.connected)
    }

    /// False for helper modules the engine instantiated on its own.
    pub fn is_user_authored(&self) -> bool {
        self.read(|m| m.user_authored)
    }

    /// Modules this module exchanges data with, in connection order.
    pub fn connections(&self) -> Vec<Module> {
        self.read(|m| m.connections.clone())
            .into_iter()
            .map(|id| self.wrap_module(id))
            .collect()
    }

    /// Raw value of a constant of the module's entity.
    pub fn get_constant(&self, name: impl AsRef<str>) -> Option<String> {
        self.read(|m| m.constants.get(name.as_ref()).cloned())
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.entity_name())
    }
}
