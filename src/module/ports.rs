// SPDX-License-Identifier: Apache-2.0

use indexmap::IndexMap;

use crate::intf::InterfaceCore;
use crate::module::discover::StagedInterface;
use crate::port::{PortCore, PortKind};
use crate::util::{DIRECTION_KEYWORDS, get_prefix_suffix};
use crate::{
    ChainError, DataWidth, DiscoveredPort, Direction, Intf, Module, Port, Rule, RuleSet,
};

impl Module {
    /// Returns the port with the given code name (or, failing that, function
    /// name), including ports of interfaces. Group signals are not searched;
    /// use `get_signal` for those.
    pub fn get_port(&self, name: impl AsRef<str>) -> Option<Port> {
        let core = self.core();
        let found = core.borrow().find_port(self.id, name.as_ref());
        found.map(|id| self.wrap_port(id))
    }

    /// Returns the interface with the given name, unique name or type name,
    /// in that order.
    pub fn get_interface(&self, name: impl AsRef<str>) -> Option<Intf> {
        let name = name.as_ref();
        let core = self.core();
        let core = core.borrow();
        let intfs = &core.modules[self.id.0].interfaces;
        let find = |pick: fn(&InterfaceCore, &str) -> bool| {
            intfs
                .iter()
                .copied()
                .find(|i| pick(&core.interfaces[i.0], name))
        };
        find(|i, n| i.name == n)
            .or_else(|| find(|i, n| i.unique_name == n))
            .or_else(|| find(|i, n| i.type_name == n))
            .map(|id| self.wrap_intf(id))
    }

    /// Ports that are not part of an interface.
    pub fn ports(&self) -> Vec<Port> {
        let core = self.core();
        let ids = core.borrow().modules[self.id.0]
            .ports
            .values()
            .copied()
            .collect::<Vec<_>>();
        ids.into_iter().map(|id| self.wrap_port(id)).collect()
    }

    /// Every port of the module, interface ports included.
    pub fn all_ports(&self) -> Vec<Port> {
        let core = self.core();
        let ids = core.borrow().module_ports(self.id);
        ids.into_iter().map(|id| self.wrap_port(id)).collect()
    }

    /// Interfaces of the module, register interfaces included.
    pub fn interfaces(&self) -> Vec<Intf> {
        let core = self.core();
        let ids = core.borrow().modules[self.id.0].interfaces.clone();
        ids.into_iter().map(|id| self.wrap_intf(id)).collect()
    }

    pub fn register_interfaces(&self) -> Vec<Intf> {
        self.interfaces()
            .into_iter()
            .filter(|i| i.is_register_interface())
            .collect()
    }

    /// Mandatory ports of the module that have no connection, no fixed value
    /// and are part of the entity.
    pub fn get_unconnected_ports(&self) -> Vec<Port> {
        let core = self.core();
        let ids = {
            let core = core.borrow();
            core.module_ports(self.id)
                .into_iter()
                .filter(|p| {
                    let p = &core.ports[p.0];
                    !p.connected && !p.optional && p.in_entity
                })
                .collect::<Vec<_>>()
        };
        ids.into_iter().map(|id| self.wrap_port(id)).collect()
    }

    /// Adds a single port to the module.
    pub fn add_port(&self, port: DiscoveredPort) -> Result<Port, ChainError> {
        let core = self.core();
        let mut core = core.borrow_mut();
        let owner = core.modules[self.id.0].name.clone();
        if core.find_port(self.id, &port.code_name).is_some() {
            return Err(ChainError::Duplicate {
                what: "port",
                name: port.code_name,
                owner,
            });
        }
        let width = DataWidth::parse(&port.width).ok_or_else(|| ChainError::Discovery {
            entity: owner.clone(),
            msg: format!("port '{}' has an unparsable width '{}'", port.code_name, port.width),
        })?;
        let mut new_port = PortCore::new(
            &port.code_name,
            port.direction,
            PortKind::Single,
            &port.data_type,
            width,
            self.id,
        );
        new_port.generics = new_port
            .width
            .identifiers()
            .iter()
            .filter_map(|name| core.find_generic(self.id, name))
            .collect();
        let id = core.push_port(new_port);
        core.attach_port(self.id, id);
        Ok(self.wrap_port(id))
    }

    /// Groups existing single ports (by code name) into a new interface of
    /// the template `type_name`. Every port must fit the template, and all
    /// mandatory template ports must be covered.
    pub fn add_interface(
        &self,
        type_name: &str,
        direction: Direction,
        port_names: &[&str],
    ) -> Result<Intf, ChainError> {
        let core = self.core();
        let mut core = core.borrow_mut();
        let owner = core.modules[self.id.0].name.clone();
        let template = core.library.template_index(type_name).ok_or_else(|| ChainError::NotFound {
            what: "interface template",
            name: type_name.to_string(),
            owner: "module library".to_string(),
        })?;

        let mut staged = StagedInterface {
            template,
            direction,
            prefix: String::new(),
            suffix: String::new(),
            ports: IndexMap::new(),
        };
        let mut members = Vec::new();
        let mut fitted = Vec::new();
        for (i, name) in port_names.iter().enumerate() {
            let id = core.modules[self.id.0]
                .ports
                .get(*name)
                .copied()
                .ok_or_else(|| ChainError::NotFound {
                    what: "single port",
                    name: name.to_string(),
                    owner: owner.clone(),
                })?;
            if i == 0 {
                // The first port decides prefix and suffix.
                let tport_name = core.library.templates[template]
                    .ports
                    .iter()
                    .filter(|t| name.to_ascii_lowercase().contains(&t.name.to_ascii_lowercase()))
                    .max_by_key(|t| t.name.len())
                    .map(|t| t.name.clone())
                    .unwrap_or_default();
                let (prefix, suffix) = get_prefix_suffix(&tport_name, name, &DIRECTION_KEYWORDS);
                staged.prefix = prefix;
                staged.suffix = suffix;
            }
            let tport = core
                .fit_port_to(&staged, &core.ports, &core.ports[id.0])
                .map_err(|msg| ChainError::TemplateMismatch {
                    port: name.to_string(),
                    intf: type_name.to_string(),
                    msg,
                })?;
            staged.ports.insert(tport.name.clone(), id.0);
            members.push(id);
            fitted.push(tport);
        }
        let missing = core.library.templates[template]
            .mandatory_ports()
            .find(|t| !staged.ports.contains_key(&t.name))
            .map(|t| t.name.clone());
        if let Some(missing) = missing {
            return Err(ChainError::TemplateMismatch {
                port: missing,
                intf: type_name.to_string(),
                msg: "mandatory port missing".to_string(),
            });
        }
        let clash = core.modules[self.id.0].interfaces.iter().any(|i| {
            let i = &core.interfaces[i.0];
            i.type_name == type_name
                && i.direction == direction
                && i.prefix == staged.prefix
                && i.suffix == staged.suffix
        });
        if clash {
            return Err(ChainError::Duplicate {
                what: "interface",
                name: format!("{}{}{}", staged.prefix, type_name, staged.suffix),
                owner,
            });
        }

        let mut intf = InterfaceCore::new(type_name, direction, self.id);
        intf.template = Some(template);
        intf.prefix = staged.prefix;
        intf.suffix = staged.suffix;
        intf.to_external = core.library.templates[template].to_external;
        let intf_id = core.push_interface(intf);
        for (port, tport) in members.into_iter().zip(fitted) {
            let code_name = core.ports[port.0].code_name.clone();
            core.modules[self.id.0].ports.shift_remove(&code_name);
            let p = &mut core.ports[port.0];
            p.name = tport.name.clone();
            p.optional = tport.optional;
            p.kind = PortKind::Interface;
            p.interface = Some(intf_id);
            for rule in tport.rules.iter().rev() {
                p.rules.prepend(rule.clone());
            }
            let generics = p.generics.clone();
            core.interfaces[intf_id.0].ports.insert(tport.name, port);
            for gid in generics {
                if !core.interfaces[intf_id.0].generics.contains(&gid) {
                    core.interfaces[intf_id.0].generics.push(gid);
                }
            }
        }
        core.name_interfaces(self.id);
        Ok(self.wrap_intf(intf_id))
    }

    /// Binds a port to a literal. The port counts as connected and is left
    /// out of the emitted entity.
    pub fn set_port_fixed_value(
        &self,
        port: impl AsRef<str>,
        value: impl AsRef<str>,
    ) -> Result<(), ChainError> {
        let port = self.require_port(port.as_ref())?;
        port.set_fixed_value(value);
        Ok(())
    }

    /// Adds a rule with priority over the port's existing rules.
    pub fn port_rule_add(
        &self,
        port: impl AsRef<str>,
        condition: &str,
        action: &str,
    ) -> Result<(), ChainError> {
        let rule = Rule::parse(condition, action)?;
        self.require_port(port.as_ref())?.add_rule(rule);
        Ok(())
    }

    /// Removes a rule. Returns whether the port had it.
    pub fn port_rule_remove(
        &self,
        port: impl AsRef<str>,
        condition: &str,
        action: &str,
    ) -> Result<bool, ChainError> {
        let rule = Rule::parse(condition, action)?;
        Ok(self.require_port(port.as_ref())?.remove_rule(&rule))
    }

    /// Replaces every rule of the port with the same condition.
    pub fn port_rule_overwrite(
        &self,
        port: impl AsRef<str>,
        condition: &str,
        action: &str,
    ) -> Result<(), ChainError> {
        let rule = Rule::parse(condition, action)?;
        self.require_port(port.as_ref())?.overwrite_rule(rule);
        Ok(())
    }

    /// Replaces the whole rule list of a port.
    pub fn port_set_rules(&self, port: impl AsRef<str>, rules: RuleSet) -> Result<(), ChainError> {
        self.require_port(port.as_ref())?.set_rules(rules);
        Ok(())
    }

    pub(crate) fn require_port(&self, name: &str) -> Result<Port, ChainError> {
        self.get_port(name).ok_or_else(|| ChainError::NotFound {
            what: "port",
            name: name.to_string(),
            owner: self.name(),
        })
    }
}
