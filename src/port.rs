// SPDX-License-Identifier: Apache-2.0

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::chain::core::{ChainCore, GenericId, InterfaceId, ModuleId, PortId};
use crate::{DataWidth, Direction, Generic, Intf, Module, RuleSet};

mod connect;
mod export;
mod rules;
mod tieoff;

/// Role of a port in the module graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PortKind {
    /// Faces outward from a module group, or is a clock/reset style port
    /// that is wired to the enclosing group's port of the same name.
    External,
    /// Standalone port that belongs to no interface.
    Single,
    /// Member of an interface.
    Interface,
    /// Member of a register interface.
    Register,
    /// Signal declared in a module group.
    Signal,
    /// Signal synthesized by the engine.
    Glue,
}

impl PortKind {
    /// Signals may merge several drivers; all other ports accept one.
    pub fn is_signal(&self) -> bool {
        matches!(self, PortKind::Signal | PortKind::Glue)
    }
}

impl fmt::Display for PortKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            PortKind::External => "external",
            PortKind::Single => "single",
            PortKind::Interface => "interface",
            PortKind::Register => "register",
            PortKind::Signal => "signal",
            PortKind::Glue => "glue",
        };
        f.write_str(text)
    }
}

/// Data of a single port or signal in the chain's arena.
#[derive(Clone, Debug)]
pub struct PortCore {
    /// Function name (the template port name for interface ports).
    pub(crate) name: String,
    /// Name as declared by the entity.
    pub(crate) code_name: String,
    pub(crate) direction: Direction,
    pub(crate) kind: PortKind,
    pub(crate) data_type: String,
    pub(crate) width: DataWidth,
    pub(crate) optional: bool,
    pub(crate) connected: bool,
    /// Drivers. Holds at most one entry unless the port is a signal.
    pub(crate) incoming: Vec<PortId>,
    pub(crate) outgoing: Vec<PortId>,
    pub(crate) rules: RuleSet,
    pub(crate) generics: Vec<GenericId>,
    pub(crate) module: ModuleId,
    pub(crate) interface: Option<InterfaceId>,
    pub(crate) glue: Option<PortId>,
    pub(crate) fixed_value: Option<String>,
    /// Cleared when the port is bound to a value and is left out of the
    /// emitted entity.
    pub(crate) in_entity: bool,
    pub(crate) origin: Option<PortId>,
    pub(crate) duplicates: Vec<PortId>,
    /// The current driver was chosen by a fallback rule and may be replaced.
    pub(crate) fallback_driven: bool,
    pub(crate) standard: bool,
}

impl PortCore {
    pub(crate) fn new(
        code_name: &str,
        direction: Direction,
        kind: PortKind,
        data_type: &str,
        width: DataWidth,
        module: ModuleId,
    ) -> Self {
        PortCore {
            name: code_name.to_string(),
            code_name: code_name.to_string(),
            direction,
            kind,
            data_type: data_type.to_string(),
            width,
            optional: false,
            connected: false,
            incoming: Vec::new(),
            outgoing: Vec::new(),
            rules: RuleSet::default(),
            generics: Vec::new(),
            module,
            interface: None,
            glue: None,
            fixed_value: None,
            in_entity: true,
            origin: None,
            duplicates: Vec::new(),
            fallback_driven: false,
            standard: false,
        }
    }

    /// Copy of this port for another module: same name, type and width,
    /// fresh connection state.
    pub(crate) fn duplicate(&self, code_name: &str, kind: PortKind, module: ModuleId) -> Self {
        PortCore {
            name: self.name.clone(),
            code_name: code_name.to_string(),
            direction: self.direction,
            kind,
            data_type: self.data_type.clone(),
            width: self.width.clone(),
            optional: self.optional,
            connected: false,
            incoming: Vec::new(),
            outgoing: Vec::new(),
            rules: self.rules.clone(),
            generics: self.generics.clone(),
            module,
            interface: None,
            glue: None,
            fixed_value: None,
            in_entity: true,
            origin: None,
            duplicates: Vec::new(),
            fallback_driven: false,
            standard: self.standard,
        }
    }
}

/// Handle to a port (or signal) of a module in a `ProcessingChain`.
#[derive(Clone, Debug)]
pub struct Port {
    pub(crate) chain: Weak<RefCell<ChainCore>>,
    pub(crate) id: PortId,
}

impl PartialEq for Port {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && Weak::ptr_eq(&self.chain, &other.chain)
    }
}

impl Eq for Port {}

impl Port {
    pub(crate) fn core(&self) -> Rc<RefCell<ChainCore>> {
        self.chain
            .upgrade()
            .expect("Containing ProcessingChain has been dropped")
    }

    pub(crate) fn wrap(&self, id: PortId) -> Port {
        Port {
            chain: self.chain.clone(),
            id,
        }
    }

    fn read<T>(&self, f: impl FnOnce(&PortCore) -> T) -> T {
        let core = self.core();
        let core = core.borrow();
        f(&core.ports[self.id.0])
    }

    /// Function name of the port, e.g. `data` for `in_data`.
    pub fn name(&self) -> String {
        self.read(|p| p.name.clone())
    }

    /// Name as declared by the module's entity.
    pub fn code_name(&self) -> String {
        self.read(|p| p.code_name.clone())
    }

    pub fn direction(&self) -> Direction {
        self.read(|p| p.direction)
    }

    pub fn kind(&self) -> PortKind {
        self.read(|p| p.kind)
    }

    pub fn data_type(&self) -> String {
        self.read(|p| p.data_type.clone())
    }

    pub fn width(&self) -> DataWidth {
        self.read(|p| p.width.clone())
    }

    /// Width with the current values of the owning module's generics
    /// substituted.
    pub fn resolved_width(&self) -> DataWidth {
        self.core().borrow().resolved_width(self.id)
    }

    pub fn is_optional(&self) -> bool {
        self.read(|p| p.optional)
    }

    pub fn is_connected(&self) -> bool {
        self.read(|p| p.connected)
    }

    /// Whether the port appears in the emitted entity declaration.
    pub fn in_entity(&self) -> bool {
        self.read(|p| p.in_entity)
    }

    pub fn is_standard(&self) -> bool {
        self.read(|p| p.standard)
    }

    /// Literal the port is bound to, if any.
    pub fn fixed_value(&self) -> Option<String> {
        self.read(|p| p.fixed_value.clone())
    }

    /// The driver of this port. For signals, the first of their drivers.
    pub fn incoming(&self) -> Option<Port> {
        self.read(|p| p.incoming.first().copied())
            .map(|id| self.wrap(id))
    }

    /// Every driver of this port. Only signals have more than one.
    pub fn drivers(&self) -> Vec<Port> {
        self.read(|p| p.incoming.clone())
            .into_iter()
            .map(|id| self.wrap(id))
            .collect()
    }

    pub fn outgoing(&self) -> Vec<Port> {
        self.read(|p| p.outgoing.clone())
            .into_iter()
            .map(|id| self.wrap(id))
            .collect()
    }

    /// The signal synthesized for this port, if it is wired through one.
    pub fn glue_signal(&self) -> Option<Port> {
        self.read(|p| p.glue).map(|id| self.wrap(id))
    }

    /// The port this one was duplicated from while propagating it up the
    /// hierarchy.
    pub fn origin(&self) -> Option<Port> {
        self.read(|p| p.origin).map(|id| self.wrap(id))
    }

    pub fn duplicates(&self) -> Vec<Port> {
        self.read(|p| p.duplicates.clone())
            .into_iter()
            .map(|id| self.wrap(id))
            .collect()
    }

    /// Module (or module group) owning the port.
    pub fn module(&self) -> Module {
        Module {
            chain: self.chain.clone(),
            id: self.read(|p| p.module),
        }
    }

    pub fn interface(&self) -> Option<Intf> {
        self.read(|p| p.interface).map(|id| Intf {
            chain: self.chain.clone(),
            id,
        })
    }

    /// Generics of the owning module referenced by the port's width.
    pub fn generics(&self) -> Vec<Generic> {
        self.read(|p| p.generics.clone())
            .into_iter()
            .map(|id| Generic {
                chain: self.chain.clone(),
                id,
            })
            .collect()
    }

    pub fn rules(&self) -> RuleSet {
        self.read(|p| p.rules.clone())
    }

    pub(crate) fn debug_string(&self) -> String {
        self.core().borrow().port_path(self.id)
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.debug_string())
    }
}
