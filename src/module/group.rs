// SPDX-License-Identifier: Apache-2.0

use crate::chain::core::EndpointId;
use crate::generic::GenericCore;
use crate::port::{PortCore, PortKind};
use crate::{ChainError, DataWidth, Direction, Generic, Module, Port};

impl Module {
    fn assert_group(&self) {
        if !self.is_group() {
            panic!("{} is not a module group", self.name());
        }
    }

    /// Instantiates the library entity `entity_name` as a module named
    /// `name` in this group.
    pub fn add_module(&self, entity_name: &str, name: &str) -> Result<Module, ChainError> {
        let core = self.core();
        let id = core.borrow_mut().instantiate(entity_name, name, self.id, true)?;
        log::info!("Added module '{}' ({}) to '{}'", name, entity_name, self.name());
        Ok(self.wrap_module(id))
    }

    /// Creates an empty module group named `name` in this group.
    pub fn add_module_group(&self, name: &str) -> Result<Module, ChainError> {
        let core = self.core();
        let id = core.borrow_mut().add_group(name, self.id)?;
        Ok(self.wrap_module(id))
    }

    /// Modules and groups directly contained in this group. Empty for leaf
    /// modules.
    pub fn children(&self) -> Vec<Module> {
        let core = self.core();
        let ids = match &core.borrow().modules[self.id.0].kind {
            crate::module::ModuleKind::Group(group) => group.children.clone(),
            crate::module::ModuleKind::Leaf => Vec::new(),
        };
        ids.into_iter().map(|id| self.wrap_module(id)).collect()
    }

    /// Declared and synthesized signals of this group.
    pub fn signals(&self) -> Vec<Port> {
        let core = self.core();
        let ids = match &core.borrow().modules[self.id.0].kind {
            crate::module::ModuleKind::Group(group) => group.signals.values().copied().collect(),
            crate::module::ModuleKind::Leaf => Vec::new(),
        };
        ids.into_iter().map(|id| self.wrap_port(id)).collect::<Vec<_>>()
    }

    pub fn get_signal(&self, name: impl AsRef<str>) -> Option<Port> {
        let core = self.core();
        let found = core.borrow().find_signal(self.id, name.as_ref());
        found.map(|id| self.wrap_port(id))
    }

    /// Declares a signal in this group.
    pub fn define_signal(
        &self,
        name: &str,
        data_type: &str,
        width: &str,
    ) -> Result<Port, ChainError> {
        self.assert_group();
        let width = self.parse_width(name, width)?;
        let core = self.core();
        let mut core = core.borrow_mut();
        if core.find_signal(self.id, name).is_some() {
            return Err(ChainError::Duplicate {
                what: "signal",
                name: name.to_string(),
                owner: core.modules[self.id.0].name.clone(),
            });
        }
        let id = core.new_signal(self.id, name, data_type, width);
        Ok(self.wrap_port(id))
    }

    /// Declares a port on the boundary of this group.
    pub fn define_port(
        &self,
        name: &str,
        direction: Direction,
        data_type: &str,
        width: &str,
    ) -> Result<Port, ChainError> {
        self.assert_group();
        let width = self.parse_width(name, width)?;
        let core = self.core();
        let mut core = core.borrow_mut();
        if core.find_port(self.id, name).is_some() {
            return Err(ChainError::Duplicate {
                what: "port",
                name: name.to_string(),
                owner: core.modules[self.id.0].name.clone(),
            });
        }
        let mut port = PortCore::new(name, direction, PortKind::External, data_type, width, self.id);
        port.generics = port
            .width
            .identifiers()
            .iter()
            .filter_map(|g| core.find_generic(self.id, g))
            .collect();
        let id = core.push_port(port);
        core.attach_port(self.id, id);
        Ok(self.wrap_port(id))
    }

    /// Declares a generic of this group, e.g. as the target of
    /// `link_generics` on its children.
    pub fn define_generic(&self, name: &str, default: Option<&str>) -> Result<Generic, ChainError> {
        self.assert_group();
        let core = self.core();
        let mut core = core.borrow_mut();
        if core.find_generic(self.id, name).is_some() {
            return Err(ChainError::Duplicate {
                what: "generic",
                name: name.to_string(),
                owner: core.modules[self.id.0].name.clone(),
            });
        }
        let id = core.push_generic(GenericCore::new(name, default.map(str::to_string), self.id));
        core.modules[self.id.0].generics.insert(name.to_string(), id);
        Ok(Generic {
            chain: self.chain.clone(),
            id,
        })
    }

    /// Requests a connection of all matching interfaces of this module and
    /// `other`. Resolved by `ProcessingChain::auto_connect`.
    pub fn connect(&self, other: &Module) {
        let core = self.core();
        core.borrow_mut()
            .pending
            .push((EndpointId::Module(self.id), EndpointId::Module(other.id)));
    }

    fn parse_width(&self, name: &str, width: &str) -> Result<DataWidth, ChainError> {
        DataWidth::parse(width).ok_or_else(|| ChainError::Discovery {
            entity: self.name(),
            msg: format!("'{name}' has an unparsable width '{width}'"),
        })
    }
}
