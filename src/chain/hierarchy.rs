// SPDX-License-Identifier: Apache-2.0

use crate::chain::core::{ChainCore, InterfaceId, ModuleId, PortId};
use crate::chain::rules::RuleContext;
use crate::diagnostics::{Diagnostics, Severity};
use crate::intf::InterfaceCore;
use crate::port::PortKind;
use crate::{ChainError, Direction, RuleSet};

impl ChainCore {
    /// Routes `port` to the top level and returns its copy on the enclosing
    /// group, which the port is then wired to.
    pub(crate) fn make_external(&mut self, port: PortId) -> PortId {
        match self.parent(self.port_owner(port)) {
            Some(group) => self.ensure_external(group, port),
            None => port,
        }
    }

    /// Makes sure every group from `group` up to the top has a port named
    /// like `port` and that these ports are wired level by level. Existing
    /// ports of that name are reused. Returns the port on `group`.
    pub(crate) fn ensure_external(&mut self, group: ModuleId, port: PortId) -> PortId {
        let code_name = self.ports[port.0].code_name.clone();
        let mut first = None;
        let mut below: Option<PortId> = None;
        let mut level = Some(group);
        while let Some(g) = level {
            let (copy, reused) = match self.find_port(g, &code_name) {
                Some(existing) => (existing, true),
                None => {
                    let mut dup = self.ports[port.0].duplicate(&code_name, PortKind::External, g);
                    dup.width = self.resolved_width(port);
                    dup.generics.clear();
                    dup.rules = RuleSet::empty();
                    dup.origin = Some(port);
                    let id = self.push_port(dup);
                    self.attach_port(g, id);
                    self.ports[port.0].duplicates.push(id);
                    log::debug!("Exported '{}' as '{}'", self.port_path(port), self.port_path(id));
                    (id, false)
                }
            };
            if let Some(inner) = below {
                if !self.ports[inner.0].incoming.contains(&copy) && !self.ports[inner.0].outgoing.contains(&copy) {
                    let (driver, sink) = self.orient(inner, copy);
                    self.link(driver, sink);
                }
            }
            if g == self.top {
                self.ports[copy.0].connected = true;
            }
            first.get_or_insert(copy);
            // A reused port that already reaches further up needs no more copies.
            if reused && self.has_outward_link(copy) {
                break;
            }
            below = Some(copy);
            level = self.parent(g);
        }
        first.unwrap_or(port)
    }

    /// Whether the port is linked to something outside its module's subtree.
    pub(crate) fn has_outward_link(&self, port: PortId) -> bool {
        let p = &self.ports[port.0];
        p.incoming
            .iter()
            .chain(p.outgoing.iter())
            .any(|n| !self.is_ancestor(p.module, self.port_owner(*n)))
    }

    /// Copies an interface one level up: the enclosing group gets an
    /// interface `<module>_<name>` whose ports are wired to every port of the
    /// original that still needs a connection. An interface of the top level
    /// is simply marked connected. Returns the copy.
    pub(crate) fn propagate_interface_up_once(&mut self, intf: InterfaceId) -> Option<InterfaceId> {
        let module = self.interfaces[intf.0].module;
        let Some(parent) = self.parent(module) else {
            let ports = self.interfaces[intf.0].ports.values().copied().collect::<Vec<_>>();
            for port in ports {
                self.ports[port.0].connected = true;
            }
            self.interfaces[intf.0].connected = true;
            return None;
        };
        if let Some(existing) = self.interfaces.iter().position(|i| i.origin == Some(intf)) {
            return Some(InterfaceId(existing));
        }

        let src = self.interfaces[intf.0].clone();
        let module_name = self.modules[module.0].name.clone();
        let mut dup = InterfaceCore::new(&src.type_name, src.direction, parent);
        dup.name = format!("{module_name}_{}", src.name);
        dup.template = src.template;
        dup.prefix = format!("{module_name}_{}", src.prefix);
        dup.suffix = src.suffix.clone();
        dup.to_external = true;
        dup.instantiate = src.instantiate.clone();
        dup.connect_to = src.connect_to;
        dup.origin = Some(intf);
        let dup = self.push_interface(dup);
        self.refresh_unique_name(dup);

        for (name, port) in src.ports {
            let p = &self.ports[port.0];
            if !p.in_entity || self.has_outward_link(port) {
                continue;
            }
            let code_name = self.unique_port_name(parent, &format!("{module_name}_{}", p.code_name));
            let mut copy = p.duplicate(&code_name, PortKind::Interface, parent);
            copy.width = self.resolved_width(port);
            copy.generics.clear();
            copy.interface = Some(dup);
            copy.origin = Some(port);
            let copy = self.push_port(copy);
            self.ports[port.0].duplicates.push(copy);
            self.interfaces[dup.0].ports.insert(name, copy);
            let (driver, sink) = self.orient(port, copy);
            self.link(driver, sink);
        }
        log::debug!("Propagated '{}' to '{}'", self.intf_path(intf), self.intf_path(dup));

        if parent == self.top {
            let ports = self.interfaces[dup.0].ports.values().copied().collect::<Vec<_>>();
            for port in ports {
                self.ports[port.0].connected = true;
            }
            self.interfaces[dup.0].connected = true;
        }
        Some(dup)
    }

    /// Pairs the ports of two interfaces by function name and resolves each
    /// pair through the source port's rules. Unpaired ports are resolved
    /// without a sink, with the other interface as fallback context.
    ///
    /// Interfaces on the same level need opposite directions; an interface
    /// of a group and one of its child need the same direction.
    pub(crate) fn connect_interfaces(
        &mut self,
        a: InterfaceId,
        b: InterfaceId,
        diags: &mut Diagnostics,
    ) -> Result<(), ChainError> {
        let (ia, ib) = (&self.interfaces[a.0], &self.interfaces[b.0]);
        let (ma, mb) = (ia.module, ib.module);
        let fail = |msg: String| ChainError::Connection {
            subject: format!("{} -> {}", self.intf_path(a), self.intf_path(b)),
            msg,
            severity: Severity::Error,
        };
        if ia.type_name != ib.type_name {
            return Err(fail(format!(
                "interface types '{}' and '{}' differ",
                ia.type_name, ib.type_name
            )));
        }
        let nested = self.parent(ma) == Some(mb) || self.parent(mb) == Some(ma);
        let directions_ok = if nested {
            ia.direction == ib.direction
        } else {
            ia.direction == ib.direction.flip()
        };
        if !directions_ok {
            return Err(fail(format!(
                "directions '{}' and '{}' do not fit",
                ia.direction, ib.direction
            )));
        }
        log::debug!("Connecting '{}' and '{}'", self.intf_path(a), self.intf_path(b));

        let a_ports = ia.ports.iter().map(|(n, p)| (n.clone(), *p)).collect::<Vec<_>>();
        let b_ports = ib.ports.clone();
        let a_is_inner = self.parent(ma) == Some(mb);
        for (name, pa) in &a_ports {
            match b_ports.get(name) {
                Some(pb) => {
                    // The group's port is the source of a nested pair.
                    let (source, sink) = if a_is_inner { (*pb, *pa) } else { (*pa, *pb) };
                    self.resolve_port(source, Some(sink), RuleContext::default(), diags)?;
                }
                None if !self.ports[pa.0].connected => {
                    let ctx = RuleContext {
                        counterpart_intf: Some(b),
                        counterpart_module: Some(mb),
                    };
                    self.resolve_port(*pa, None, ctx, diags)?;
                }
                None => {}
            }
        }
        for (name, pb) in &b_ports {
            if a_ports.iter().any(|(n, _)| n == name) || self.ports[pb.0].connected {
                continue;
            }
            let ctx = RuleContext {
                counterpart_intf: Some(a),
                counterpart_module: Some(ma),
            };
            self.resolve_port(*pb, None, ctx, diags)?;
        }

        let (from, to) = self.intf_orient(a, b);
        if !self.interfaces[from.0].outgoing.contains(&to) {
            self.interfaces[from.0].outgoing.push(to);
        }
        if !self.interfaces[to.0].incoming.contains(&from) {
            self.interfaces[to.0].incoming.push(from);
        }
        if !self.is_group(ma) && !self.is_group(mb) {
            self.register_module_connection(ma, mb);
        }
        self.update_interface_connected(a);
        self.update_interface_connected(b);
        Ok(())
    }

    /// Splits an interface pair into `(driving, driven)`, like `orient` does
    /// for ports.
    fn intf_orient(&self, a: InterfaceId, b: InterfaceId) -> (InterfaceId, InterfaceId) {
        let (ia, ib) = (&self.interfaces[a.0], &self.interfaces[b.0]);
        if ia.direction == ib.direction {
            let a_outer = self.modules[ia.module.0].modlevel < self.modules[ib.module.0].modlevel;
            return match (ia.direction, a_outer) {
                (Direction::Out, false) | (Direction::In, true) | (Direction::InOut, _) => (a, b),
                _ => (b, a),
            };
        }
        match ia.direction {
            Direction::In => (b, a),
            _ => (a, b),
        }
    }

    /// The interface of `module` that `intf` would plug into: same type,
    /// fitting direction and not yet connected.
    pub(crate) fn matching_interface(&self, intf: InterfaceId, module: ModuleId) -> Option<InterfaceId> {
        let i = &self.interfaces[intf.0];
        let nested = self.parent(i.module) == Some(module) || self.parent(module) == Some(i.module);
        let wanted = if nested { i.direction } else { i.direction.flip() };
        self.modules[module.0].interfaces.iter().copied().find(|other| {
            let o = &self.interfaces[other.0];
            *other != intf && o.type_name == i.type_name && o.direction == wanted && !o.connected
        })
    }

    pub(crate) fn connect_interface_to_module(
        &mut self,
        intf: InterfaceId,
        module: ModuleId,
        diags: &mut Diagnostics,
    ) -> Result<(), ChainError> {
        let Some(target) = self.matching_interface(intf, module) else {
            return Err(ChainError::Connection {
                subject: self.intf_path(intf),
                msg: format!(
                    "module '{}' has no free interface of type '{}'",
                    self.modules[module.0].name, self.interfaces[intf.0].type_name
                ),
                severity: Severity::Error,
            });
        };
        self.connect_interfaces(intf, target, diags)
    }

    /// An interface needs routing until it is paired with another interface
    /// or each of its ports is bound, left out of the entity or linked to
    /// something outside its module.
    fn interface_needs_routing(&self, intf: InterfaceId) -> bool {
        let i = &self.interfaces[intf.0];
        if !i.incoming.is_empty() || !i.outgoing.is_empty() {
            return false;
        }
        i.ports.values().any(|p| {
            let port = &self.ports[p.0];
            port.in_entity && port.fixed_value.is_none() && !self.has_outward_link(*p)
        })
    }

    /// Wires an interface to its `connect_to` target once the target lies
    /// within the enclosing group, or moves it up one level otherwise.
    /// Interfaces marked external are moved up as well.
    pub(crate) fn route_interface(&mut self, intf: InterfaceId, diags: &mut Diagnostics) -> Result<(), ChainError> {
        if !self.interface_needs_routing(intf) {
            return Ok(());
        }
        let i = &self.interfaces[intf.0];
        let (scope, connect_to, to_external) = (self.parent(i.module), i.connect_to, i.to_external);
        match connect_to {
            Some(target) if scope.is_some_and(|g| self.is_ancestor(g, target)) => {
                self.connect_interface_to_module(intf, target, diags)
            }
            Some(_) => {
                self.interfaces[intf.0].to_external = true;
                self.propagate_interface_up_once(intf);
                Ok(())
            }
            None if to_external => {
                self.propagate_interface_up_once(intf);
                Ok(())
            }
            None => Ok(()),
        }
    }
}
