// SPDX-License-Identifier: Apache-2.0

//! Building modules from entity descriptions: ports are sorted into standard
//! ports, interfaces and single ports, register interfaces are decoded and
//! interfaces are named.

use indexmap::IndexMap;

use crate::chain::core::{ChainCore, InterfaceId, ModuleId, PortId};
use crate::entity::EntityDescription;
use crate::generic::GenericCore;
use crate::intf::{InterfaceCore, TemplatePort};
use crate::module::{GroupCore, ModuleKind};
use crate::port::{PortCore, PortKind};
use crate::register::{REGISTER_CONFIG_CONSTANT, RegisterBlock, decode_register_table};
use crate::util::{DIRECTION_KEYWORDS, get_prefix_suffix};
use crate::{ChainError, DataWidth, Direction, GenericValue, RuleSet};

/// An interface assembled during discovery, before it is committed to the
/// arena.
#[derive(Clone, Debug)]
pub(crate) struct StagedInterface {
    pub(crate) template: usize,
    pub(crate) direction: Direction,
    pub(crate) prefix: String,
    pub(crate) suffix: String,
    /// Function name to index into the staged port list.
    pub(crate) ports: IndexMap<String, usize>,
}

struct StagedRegister {
    config: (String, String),
    table: Vec<crate::RegisterKind>,
}

/// Everything discovery derives from an entity. Nothing here refers to the
/// arena yet, so a failed discovery leaves the chain untouched.
struct Plan {
    ports: Vec<PortCore>,
    standalone: Vec<usize>,
    interfaces: Vec<StagedInterface>,
    registers: IndexMap<usize, StagedRegister>,
}

impl ChainCore {
    /// Creates a module from the library entity `entity_name` inside the
    /// group `parent`.
    pub(crate) fn instantiate(
        &mut self,
        entity_name: &str,
        name: &str,
        parent: ModuleId,
        user_authored: bool,
    ) -> Result<ModuleId, ChainError> {
        let entity = self
            .library
            .get_entity(entity_name)
            .cloned()
            .ok_or_else(|| ChainError::ModuleNotFound(entity_name.to_string()))?;
        if !self.is_group(parent) {
            panic!(
                "Cannot add module {} to {}, which is not a module group",
                name, self.modules[parent.0].name
            );
        }
        if self.find_module(name).is_some() {
            return Err(ChainError::Duplicate {
                what: "module",
                name: name.to_string(),
                owner: self.modules[parent.0].name.clone(),
            });
        }
        let plan = self.plan_discovery(&entity)?;
        let id = self.push_module(name, &entity.entity_name, Some(parent), ModuleKind::Leaf, user_authored);
        self.commit_discovery(id, &entity, plan);
        self.name_interfaces(id);
        log::debug!(
            "Discovered module '{}' ({}): {} ports, {} interfaces",
            name,
            entity.entity_name,
            self.modules[id.0].ports.len(),
            self.modules[id.0].interfaces.len()
        );
        Ok(id)
    }

    /// Creates an empty module group inside `parent`.
    pub(crate) fn add_group(&mut self, name: &str, parent: ModuleId) -> Result<ModuleId, ChainError> {
        if !self.is_group(parent) {
            panic!(
                "Cannot add module group {} to {}, which is not a module group",
                name, self.modules[parent.0].name
            );
        }
        if self.find_module(name).is_some() {
            return Err(ChainError::Duplicate {
                what: "module",
                name: name.to_string(),
                owner: self.modules[parent.0].name.clone(),
            });
        }
        Ok(self.push_module(name, name, Some(parent), ModuleKind::Group(GroupCore::default()), true))
    }

    fn plan_discovery(&self, entity: &EntityDescription) -> Result<Plan, ChainError> {
        entity.validate()?;
        let fail = |msg: String| ChainError::Discovery {
            entity: entity.entity_name.clone(),
            msg,
        };

        let mut plan = Plan {
            ports: Vec::new(),
            standalone: Vec::new(),
            interfaces: Vec::new(),
            registers: IndexMap::new(),
        };

        // Module id is filled in on commit.
        let placeholder = ModuleId(usize::MAX);
        let mut remaining = Vec::new();
        for discovered in &entity.ports {
            let width = DataWidth::parse(&discovered.width).ok_or_else(|| {
                fail(format!(
                    "port '{}' has an unparsable width '{}'",
                    discovered.code_name, discovered.width
                ))
            })?;
            let mut port = PortCore::new(
                &discovered.code_name,
                discovered.direction,
                PortKind::Single,
                &discovered.data_type,
                width,
                placeholder,
            );
            let index = plan.ports.len();
            if let Some(standard) = self.library.standard_ports.iter().find(|t| {
                t.name == discovered.code_name
                    && t.direction == discovered.direction
                    && t.data_type.eq_ignore_ascii_case(&discovered.data_type)
            }) {
                port.kind = standard.kind;
                port.rules = standard.rules.clone();
                port.standard = true;
                plan.standalone.push(index);
            } else {
                remaining.push(index);
            }
            plan.ports.push(port);
        }

        for index in remaining {
            if self.fit_port(&mut plan, index, true) {
                continue;
            }
            plan.standalone.push(index);
        }

        // Incomplete interfaces fold back; their ports may still fit another
        // interface that is already open.
        let (complete, incomplete): (Vec<_>, Vec<_>) = std::mem::take(&mut plan.interfaces)
            .into_iter()
            .partition(|staged| self.staged_is_complete(staged));
        plan.interfaces = complete;
        for staged in incomplete {
            log::debug!(
                "Dissolving incomplete '{}' interface of '{}'",
                self.library.templates[staged.template].type_name,
                entity.entity_name
            );
            for index in staged.ports.into_values() {
                let port = &mut plan.ports[index];
                port.name = port.code_name.clone();
                port.kind = PortKind::Single;
                port.optional = false;
                port.rules = RuleSet::default();
                if !self.fit_port(&mut plan, index, false) {
                    plan.standalone.push(index);
                }
            }
        }

        // Register interfaces, except on the register manager itself.
        if entity.entity_name != self.config.manager_entity {
            for (i, staged) in plan.interfaces.iter().enumerate() {
                if !self.library.templates[staged.template].register {
                    continue;
                }
                let register = self.plan_register(entity, staged, &plan.ports).map_err(fail)?;
                plan.registers.insert(i, register);
            }
        }
        Ok(plan)
    }

    /// Tries to place a staged port in an open interface, then (if allowed)
    /// in a new interface. Returns whether the port was placed.
    fn fit_port(&self, plan: &mut Plan, index: usize, new_allowed: bool) -> bool {
        for i in 0..plan.interfaces.len() {
            if let Ok(tport) = self.fit_port_to(&plan.interfaces[i], &plan.ports, &plan.ports[index]) {
                adopt_template_port(&mut plan.ports[index], &tport);
                plan.interfaces[i].ports.insert(tport.name.clone(), index);
                return true;
            }
        }
        if !new_allowed {
            return false;
        }
        let port = &plan.ports[index];
        let code_name = port.code_name.to_ascii_lowercase();
        let mut best: Option<(usize, &TemplatePort)> = None;
        for (t, template) in self.library.templates.iter().enumerate() {
            for tport in &template.ports {
                let longer = best.is_none_or(|(_, b)| tport.name.len() > b.name.len());
                if longer
                    && code_name.contains(&tport.name.to_ascii_lowercase())
                    && tport.data_type.eq_ignore_ascii_case(&port.data_type)
                {
                    best = Some((t, tport));
                }
            }
        }
        let Some((template, tport)) = best else {
            return false;
        };
        let (prefix, suffix) = get_prefix_suffix(&tport.name, &port.code_name, &DIRECTION_KEYWORDS);
        let staged = StagedInterface {
            template,
            direction: if port.direction == tport.direction {
                Direction::In
            } else {
                Direction::Out
            },
            prefix,
            suffix,
            ports: IndexMap::new(),
        };
        match self.fit_port_to(&staged, &plan.ports, port) {
            Ok(tport) => {
                let mut staged = staged;
                staged.ports.insert(tport.name.clone(), index);
                adopt_template_port(&mut plan.ports[index], &tport);
                plan.interfaces.push(staged);
                true
            }
            Err(reason) => {
                log::debug!("Port '{}' opens no interface: {}", plan.ports[index].code_name, reason);
                false
            }
        }
    }

    /// Checks whether `port` fits `staged`: a template port name must be
    /// contained in the code name (the longest one wins), the prefix and
    /// suffix must match the interface's, and function name, data type and
    /// direction must agree with the template. Returns the template port.
    pub(crate) fn fit_port_to(
        &self,
        staged: &StagedInterface,
        ports: &[PortCore],
        port: &PortCore,
    ) -> Result<TemplatePort, String> {
        let template = &self.library.templates[staged.template];
        let code_name = port.code_name.to_ascii_lowercase();
        let tport = template
            .ports
            .iter()
            .filter(|t| code_name.contains(&t.name.to_ascii_lowercase()))
            .fold(None::<&TemplatePort>, |best, t| match best {
                Some(b) if b.name.len() >= t.name.len() => Some(b),
                _ => Some(t),
            })
            .ok_or_else(|| format!("no port of template '{}' in the name", template.type_name))?;
        let (prefix, suffix) = get_prefix_suffix(&tport.name, &port.code_name, &DIRECTION_KEYWORDS);
        if prefix != staged.prefix || suffix != staged.suffix {
            return Err(format!(
                "prefix/suffix '{prefix}'/'{suffix}' differ from '{}'/'{}'",
                staged.prefix, staged.suffix
            ));
        }
        if staged.ports.contains_key(&tport.name) {
            let taken = &ports[staged.ports[&tport.name]].code_name;
            return Err(format!("'{}' is already taken by '{}'", tport.name, taken));
        }
        if !tport.data_type.eq_ignore_ascii_case(&port.data_type) {
            return Err(format!(
                "data type '{}' does not match '{}'",
                port.data_type, tport.data_type
            ));
        }
        let expected = match staged.direction {
            Direction::In => tport.direction,
            _ => tport.direction.flip(),
        };
        if port.direction != expected {
            return Err(format!(
                "direction '{}' does not match '{}'",
                port.direction, expected
            ));
        }
        Ok(tport.clone())
    }

    fn staged_is_complete(&self, staged: &StagedInterface) -> bool {
        self.library.templates[staged.template]
            .mandatory_ports()
            .all(|t| staged.ports.contains_key(&t.name))
    }

    fn plan_register(
        &self,
        entity: &EntityDescription,
        staged: &StagedInterface,
        ports: &[PortCore],
    ) -> Result<StagedRegister, String> {
        let wanted = format!("{}{}{}", staged.prefix, REGISTER_CONFIG_CONSTANT, staged.suffix);
        let constant = entity
            .constants
            .iter()
            .find(|c| c.code_name.eq_ignore_ascii_case(&wanted))
            .or_else(|| {
                entity
                    .constants
                    .iter()
                    .find(|c| c.code_name.eq_ignore_ascii_case(REGISTER_CONFIG_CONSTANT))
            })
            .ok_or_else(|| {
                format!("register interface has no configuration constant '{wanted}'")
            })?;

        // `others` fills up to the highest index of the control register port.
        let defaults = |name: &str| {
            entity
                .generics
                .iter()
                .find(|g| g.code_name.eq_ignore_ascii_case(name))
                .and_then(|g| g.default.clone())
        };
        let others_len = staged
            .ports
            .get("slv_ctrl_reg")
            .and_then(|&i| ports[i].width.resolve(defaults).bounds())
            .and_then(|(l, r)| usize::try_from(l.max(r) + 1).ok());
        let table = decode_register_table(&constant.value, others_len)
            .map_err(|e| format!("constant '{}': {}", constant.code_name, e))?;
        Ok(StagedRegister {
            config: (constant.code_name.clone(), constant.value.clone()),
            table,
        })
    }

    fn commit_discovery(&mut self, id: ModuleId, entity: &EntityDescription, plan: Plan) {
        for generic in &entity.generics {
            let gid = self.push_generic(GenericCore::new(&generic.code_name, generic.default.clone(), id));
            self.modules[id.0].generics.insert(generic.code_name.clone(), gid);
        }
        for constant in &entity.constants {
            self.modules[id.0]
                .constants
                .insert(constant.code_name.clone(), constant.value.clone());
        }

        let mut port_ids = Vec::with_capacity(plan.ports.len());
        for mut port in plan.ports {
            port.module = id;
            port.generics = port
                .width
                .identifiers()
                .iter()
                .filter_map(|name| self.find_generic(id, name))
                .collect();
            port_ids.push(self.push_port(port));
        }
        for index in plan.standalone {
            self.attach_port(id, port_ids[index]);
        }

        let mut registers = plan.registers;
        for (i, staged) in plan.interfaces.into_iter().enumerate() {
            let template = self.library.templates[staged.template].clone();
            let mut intf = InterfaceCore::new(&template.type_name, staged.direction, id);
            intf.template = Some(staged.template);
            intf.prefix = staged.prefix;
            intf.suffix = staged.suffix;
            intf.to_external = template.to_external;
            if template
                .instantiate
                .as_ref()
                .is_some_and(|(entity_name, _)| *entity_name != entity.entity_name)
            {
                intf.instantiate = template.instantiate.clone();
            }
            let intf_id = self.push_interface(intf);
            for (name, index) in staged.ports {
                let pid = port_ids[index];
                self.ports[pid.0].interface = Some(intf_id);
                self.interfaces[intf_id.0].ports.insert(name, pid);
            }
            if let Some(register) = registers.shift_remove(&i) {
                self.commit_register(intf_id, register);
            }
            // Generics used by the widths of the interface's ports.
            let used = self.interfaces[intf_id.0]
                .ports
                .values()
                .flat_map(|p| self.ports[p.0].generics.clone())
                .collect::<Vec<_>>();
            for gid in used {
                if !self.interfaces[intf_id.0].generics.contains(&gid) {
                    self.interfaces[intf_id.0].generics.push(gid);
                }
            }
        }
    }

    fn commit_register(&mut self, intf: InterfaceId, register: StagedRegister) {
        let module = self.interfaces[intf.0].module;
        let mut block = RegisterBlock::new();
        block.config = Some(register.config);
        block.table = register.table;
        block.decoded = true;

        // Parameters handed to the register manager on connection.
        let mut reg_count = GenericCore::new("REG_COUNT", None, module);
        reg_count.value = GenericValue::Literal(block.reg_count().to_string());
        let base_addr = GenericCore::new("MODULE_BASEADDR", None, module);
        let reg_count = self.push_generic(reg_count);
        let base_addr = self.push_generic(base_addr);
        self.interfaces[intf.0].generics.extend([reg_count, base_addr]);

        let ports = self.interfaces[intf.0].ports.values().copied().collect::<Vec<PortId>>();
        for port in ports {
            self.ports[port.0].kind = PortKind::Register;
        }
        self.interfaces[intf.0].register = Some(block);
    }

    /// Names the interfaces of a module and refreshes their unique names.
    ///
    /// An interface with a prefix or suffix is named after them. Otherwise
    /// the direction is used when the interface is the only one of its type,
    /// or one of two that differ in direction; `type_direction` is the last
    /// resort. Register interfaces are named after their type.
    pub(crate) fn name_interfaces(&mut self, module: ModuleId) {
        let all = self.modules[module.0].interfaces.clone();
        let mut queue = Vec::new();
        for intf in all.iter().copied() {
            if self.interfaces[intf.0].register.is_some() {
                let i = &self.interfaces[intf.0];
                let name = affix_name(&i.prefix, &i.suffix).unwrap_or_else(|| i.type_name.clone());
                self.interfaces[intf.0].name = name;
            } else {
                queue.push(intf);
            }
        }

        let mut stalled = 0;
        while !queue.is_empty() {
            let named = self.choose_interface_names(&queue);
            if named.is_empty() {
                if stalled < queue.len() {
                    queue.rotate_left(1);
                    stalled += 1;
                    continue;
                }
                let i = &self.interfaces[queue[0].0];
                let name = format!("{}_{}", i.type_name, i.direction);
                named_push(self, queue[0], name);
                queue.remove(0);
                stalled = 0;
                continue;
            }
            stalled = 0;
            for (intf, name) in named {
                named_push(self, intf, name);
                queue.retain(|q| *q != intf);
            }
        }

        for intf in all {
            self.refresh_unique_name(intf);
        }
    }

    fn choose_interface_names(&self, queue: &[InterfaceId]) -> Vec<(InterfaceId, String)> {
        let current = queue[0];
        let cur = &self.interfaces[current.0];
        if let Some(name) = affix_name(&cur.prefix, &cur.suffix) {
            return vec![(current, name)];
        }
        let mut others = queue
            .iter()
            .copied()
            .filter(|q| self.interfaces[q.0].type_name == cur.type_name)
            .collect::<Vec<_>>();
        if others.len() > 2 {
            others.retain(|q| self.interfaces[q.0].direction == cur.direction);
        }
        match others.len() {
            1 => vec![(current, cur.direction.to_string())],
            2 => {
                let other_id = if others[0] == current { others[1] } else { others[0] };
                let other = &self.interfaces[other_id.0];
                if other.direction != cur.direction {
                    vec![
                        (current, cur.direction.to_string()),
                        (other_id, other.direction.to_string()),
                    ]
                } else if !other.prefix.is_empty() || !other.suffix.is_empty() {
                    let stem = format!("{}{}", other.prefix, other.suffix).replace("__", "_");
                    vec![
                        (current, cur.direction.to_string()),
                        (
                            other_id,
                            format!("{}_{}", stem.trim_matches('_'), other.direction),
                        ),
                    ]
                } else {
                    vec![
                        (current, format!("{}_{}", cur.type_name, cur.direction)),
                        (other_id, format!("{}_{}", other.type_name, other.direction)),
                    ]
                }
            }
            _ => Vec::new(),
        }
    }
}

fn named_push(core: &mut ChainCore, intf: InterfaceId, name: String) {
    log::debug!("Naming interface '{}' of '{}'", name, core.modules[core.interfaces[intf.0].module.0].name);
    core.interfaces[intf.0].name = name;
}

/// `sensor_` and `_left` give `sensor_left`; `None` without prefix and
/// suffix.
fn affix_name(prefix: &str, suffix: &str) -> Option<String> {
    let prefix = prefix.trim_end_matches('_');
    let suffix = suffix.trim_start_matches('_');
    match (prefix.is_empty(), suffix.is_empty()) {
        (true, true) => None,
        (false, true) => Some(prefix.to_string()),
        (true, false) => Some(suffix.to_string()),
        (false, false) => Some(format!("{prefix}_{suffix}")),
    }
}

/// Turns a staged single port into a member of an interface.
fn adopt_template_port(port: &mut PortCore, tport: &TemplatePort) {
    port.name = tport.name.clone();
    port.optional = tport.optional;
    port.kind = PortKind::Interface;
    let mut rules = RuleSet::default();
    for rule in tport.rules.iter().rev() {
        rules.prepend(rule.clone());
    }
    port.rules = rules;
}
