// SPDX-License-Identifier: Apache-2.0

use indexmap::IndexMap;

use crate::config::ChainConfig;
use crate::entity::ModuleLibrary;
use crate::generic::GenericCore;
use crate::intf::InterfaceCore;
use crate::module::{GroupCore, ModuleCore, ModuleKind};
use crate::port::{PortCore, PortKind};
use crate::{DataWidth, Direction, RuleSet};

macro_rules! arena_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub(crate) usize);
    };
}

arena_id!(
    /// Index of a module or module group in the chain's arena.
    ModuleId
);
arena_id!(
    /// Index of an interface in the chain's arena.
    InterfaceId
);
arena_id!(
    /// Index of a port or signal in the chain's arena.
    PortId
);
arena_id!(
    /// Index of a generic in the chain's arena.
    GenericId
);

/// One side of a user connection request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum EndpointId {
    Module(ModuleId),
    Interface(InterfaceId),
    Port(PortId),
}

/// A reduction group collecting same-named ports of one module group.
#[derive(Clone, Debug)]
pub(crate) struct BundleGroup {
    pub(crate) op: BundleOp,
    pub(crate) signal: PortId,
    pub(crate) external: PortId,
    pub(crate) members: Vec<PortId>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BundleOp {
    And,
    Or,
}

impl BundleOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            BundleOp::And => "and",
            BundleOp::Or => "or",
        }
    }
}

/// Data structure holding the whole module graph of a processing chain.
///
/// Not intended to be used directly; use `ProcessingChain` and the handles it
/// returns, which hold a smart pointer to this struct. All cross references
/// between entities are arena ids.
pub struct ChainCore {
    pub(crate) config: ChainConfig,
    pub(crate) library: ModuleLibrary,
    pub(crate) modules: Vec<ModuleCore>,
    pub(crate) interfaces: Vec<InterfaceCore>,
    pub(crate) ports: Vec<PortCore>,
    pub(crate) generics: Vec<GenericCore>,
    pub(crate) top: ModuleId,
    pub(crate) main: ModuleId,
    pub(crate) pending: Vec<(EndpointId, EndpointId)>,
    /// Byte offset (relative to the base address) to register interface.
    pub(crate) address_space: IndexMap<u32, InterfaceId>,
    pub(crate) next_offset: u32,
    pub(crate) max_regs_per_module: u32,
    pub(crate) bundles: IndexMap<(ModuleId, String), BundleGroup>,
    pub(crate) auto_instantiated: Vec<ModuleId>,
    pub(crate) auto_instantiation_done: bool,
    pub(crate) built: bool,
}

impl ChainCore {
    pub(crate) fn new(config: ChainConfig, library: ModuleLibrary) -> Self {
        let mut core = ChainCore {
            max_regs_per_module: config.default_regs_per_module,
            config,
            library,
            modules: Vec::new(),
            interfaces: Vec::new(),
            ports: Vec::new(),
            generics: Vec::new(),
            top: ModuleId(0),
            main: ModuleId(0),
            pending: Vec::new(),
            address_space: IndexMap::new(),
            next_offset: 0,
            bundles: IndexMap::new(),
            auto_instantiated: Vec::new(),
            auto_instantiation_done: false,
            built: false,
        };
        let top_name = core.config.top_name.clone();
        let main_name = core.config.main_name.clone();
        core.top = core.push_module(&top_name, &top_name, None, ModuleKind::Group(GroupCore::default()), false);
        core.main = core.push_module(
            &main_name,
            &format!("{main_name}_impl"),
            Some(core.top),
            ModuleKind::Group(GroupCore::default()),
            false,
        );

        // The top level carries the system clock and reset as signals; main
        // forwards them and derives an active-high reset.
        for name in ["clk", "reset_n"] {
            let signal = core.new_signal(core.top, name, "std_logic", DataWidth::Scalar);
            core.ports[signal.0].connected = true;
            let fwd = core.push_port(PortCore::new(
                name,
                Direction::In,
                PortKind::External,
                "std_logic",
                DataWidth::Scalar,
                core.main,
            ));
            core.attach_port(core.main, fwd);
            core.link(signal, fwd);
        }
        let reset = core.new_signal(core.main, "reset", "std_logic", DataWidth::Scalar);
        core.ports[reset.0].fixed_value = Some("not reset_n".to_string());
        core.ports[reset.0].connected = true;
        core
    }

    pub(crate) fn push_module(
        &mut self,
        name: &str,
        entity_name: &str,
        parent: Option<ModuleId>,
        kind: ModuleKind,
        user_authored: bool,
    ) -> ModuleId {
        let id = ModuleId(self.modules.len());
        let modlevel = parent.map_or(0, |p| self.modules[p.0].modlevel + 1);
        self.modules.push(ModuleCore {
            name: name.to_string(),
            entity_name: entity_name.to_string(),
            ports: IndexMap::new(),
            interfaces: Vec::new(),
            generics: IndexMap::new(),
            constants: IndexMap::new(),
            parent,
            modlevel,
            connected: false,
            user_authored,
            kind,
            connections: Vec::new(),
        });
        if let Some(parent) = parent {
            self.group_mut(parent).children.push(id);
        }
        id
    }

    pub(crate) fn push_port(&mut self, port: PortCore) -> PortId {
        self.ports.push(port);
        PortId(self.ports.len() - 1)
    }

    pub(crate) fn push_generic(&mut self, generic: GenericCore) -> GenericId {
        self.generics.push(generic);
        GenericId(self.generics.len() - 1)
    }

    pub(crate) fn push_interface(&mut self, intf: InterfaceCore) -> InterfaceId {
        let module = intf.module;
        self.interfaces.push(intf);
        let id = InterfaceId(self.interfaces.len() - 1);
        self.modules[module.0].interfaces.push(id);
        id
    }

    /// Registers a standalone port with its module, keyed by code name.
    pub(crate) fn attach_port(&mut self, module: ModuleId, port: PortId) {
        let code_name = self.ports[port.0].code_name.clone();
        self.ports[port.0].module = module;
        self.modules[module.0].ports.insert(code_name, port);
    }

    /// Creates a signal (a port of kind `Signal`) in a module group.
    pub(crate) fn new_signal(
        &mut self,
        group: ModuleId,
        code_name: &str,
        data_type: &str,
        width: DataWidth,
    ) -> PortId {
        let mut core = PortCore::new(code_name, Direction::InOut, PortKind::Signal, data_type, width, group);
        core.rules = RuleSet::empty();
        let id = self.push_port(core);
        self.group_mut(group).signals.insert(code_name.to_string(), id);
        id
    }

    pub(crate) fn group_mut(&mut self, id: ModuleId) -> &mut GroupCore {
        let name = self.modules[id.0].name.clone();
        match &mut self.modules[id.0].kind {
            ModuleKind::Group(group) => group,
            ModuleKind::Leaf => panic!("Module {name} is not a module group"),
        }
    }

    pub(crate) fn is_group(&self, id: ModuleId) -> bool {
        matches!(self.modules[id.0].kind, ModuleKind::Group(_))
    }

    pub(crate) fn parent(&self, id: ModuleId) -> Option<ModuleId> {
        self.modules[id.0].parent
    }

    /// Module owning a port. For interface ports this is the interface's
    /// module.
    pub(crate) fn port_owner(&self, port: PortId) -> ModuleId {
        self.ports[port.0].module
    }

    pub(crate) fn port_path(&self, port: PortId) -> String {
        let p = &self.ports[port.0];
        format!("{}.{}", self.modules[p.module.0].name, p.code_name)
    }

    pub(crate) fn intf_path(&self, intf: InterfaceId) -> String {
        let i = &self.interfaces[intf.0];
        format!("{}.{}", self.modules[i.module.0].name, i.name)
    }

    /// Every module id in depth-first order starting at the top.
    pub(crate) fn walk(&self) -> Vec<ModuleId> {
        let mut out = Vec::new();
        let mut stack = vec![self.top];
        while let Some(id) = stack.pop() {
            out.push(id);
            if let ModuleKind::Group(group) = &self.modules[id.0].kind {
                stack.extend(group.children.iter().rev());
            }
        }
        out
    }

    /// Leaf modules, in creation order.
    pub(crate) fn leaf_modules(&self) -> Vec<ModuleId> {
        (0..self.modules.len())
            .map(ModuleId)
            .filter(|id| !self.is_group(*id))
            .collect()
    }

    /// Module groups other than the top, deepest first. Groups on the same
    /// level keep creation order.
    pub(crate) fn groups_deepest_first(&self) -> Vec<ModuleId> {
        let mut groups = (0..self.modules.len())
            .map(ModuleId)
            .filter(|id| self.is_group(*id) && *id != self.top)
            .collect::<Vec<_>>();
        groups.sort_by_key(|id| std::cmp::Reverse(self.modules[id.0].modlevel));
        groups
    }

    pub(crate) fn find_module(&self, name: &str) -> Option<ModuleId> {
        self.modules
            .iter()
            .position(|m| m.name == name)
            .map(ModuleId)
    }

    /// Returns `name`, or `name_<n>` with the smallest `n` that is not yet
    /// taken by another module.
    pub(crate) fn unique_module_name(&self, name: &str) -> String {
        if self.find_module(name).is_none() {
            return name.to_string();
        }
        (1..)
            .map(|n| format!("{name}_{n}"))
            .find(|candidate| self.find_module(candidate).is_none())
            .unwrap_or_else(|| name.to_string())
    }

    /// Whether `ancestor` is `module` or one of its enclosing groups.
    pub(crate) fn is_ancestor(&self, ancestor: ModuleId, module: ModuleId) -> bool {
        let mut cur = Some(module);
        while let Some(id) = cur {
            if id == ancestor {
                return true;
            }
            cur = self.parent(id);
        }
        false
    }

    pub(crate) fn entity_is_manager(&self, module: ModuleId) -> bool {
        self.modules[module.0].entity_name == self.config.manager_entity
    }
}
