// SPDX-License-Identifier: Apache-2.0

use crate::chain::core::{ChainCore, ModuleId, PortId};
use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::port::PortKind;
use crate::Direction;

impl ChainCore {
    /// Records `driver -> sink` and marks both ends connected.
    pub(crate) fn link(&mut self, driver: PortId, sink: PortId) {
        if !self.ports[sink.0].incoming.contains(&driver) {
            self.ports[sink.0].incoming.push(driver);
        }
        if !self.ports[driver.0].outgoing.contains(&sink) {
            self.ports[driver.0].outgoing.push(sink);
        }
        log::debug!("Linked '{}' -> '{}'", self.port_path(driver), self.port_path(sink));
        for port in [driver, sink] {
            self.ports[port.0].connected = true;
            if let Some(intf) = self.ports[port.0].interface {
                self.update_interface_connected(intf);
            }
        }
    }

    pub(crate) fn unlink(&mut self, driver: PortId, sink: PortId) {
        log::debug!("Unlinked '{}' -> '{}'", self.port_path(driver), self.port_path(sink));
        self.ports[sink.0].incoming.retain(|p| *p != driver);
        self.ports[driver.0].outgoing.retain(|p| *p != sink);
    }

    /// Splits a pair into `(driver, sink)`.
    ///
    /// Inputs are driven by their counterpart and outputs drive it. Two ports
    /// of the same direction only meet across a group boundary: there the
    /// outer port drives inputs and the inner port drives outputs.
    pub(crate) fn orient(&self, port: PortId, other: PortId) -> (PortId, PortId) {
        let (dir, other_dir) = (self.ports[port.0].direction, self.ports[other.0].direction);
        if dir == other_dir && dir != Direction::InOut {
            let port_level = self.modules[self.port_owner(port).0].modlevel;
            let other_level = self.modules[self.port_owner(other).0].modlevel;
            let port_outer = port_level < other_level;
            return match (dir, port_outer) {
                (Direction::In, true) | (Direction::Out, false) => (port, other),
                _ => (other, port),
            };
        }
        match (dir, other_dir) {
            (Direction::In, _) => (other, port),
            (Direction::Out, _) => (port, other),
            (Direction::InOut, Direction::Out) => (other, port),
            (Direction::InOut, _) => (port, other),
        }
    }

    /// Whether `driver` already reaches `sink`, directly or through glue
    /// signals and exported copies.
    pub(crate) fn drives(&self, driver: PortId, sink: PortId) -> bool {
        let mut cur = sink;
        for _ in 0..self.ports.len() {
            let Some(&up) = self.ports[cur.0].incoming.first() else {
                return false;
            };
            if up == driver {
                return true;
            }
            let hop = &self.ports[up.0];
            if hop.kind != PortKind::Glue && hop.origin.is_none() {
                return false;
            }
            cur = up;
        }
        false
    }

    /// Wires `port` to `target`, bridging hierarchy levels as needed.
    ///
    /// A sink that already has a driver keeps it unless that driver was
    /// chosen by a fallback rule; otherwise a note is emitted and nothing
    /// changes. Returns whether the two ports are connected afterwards.
    pub(crate) fn establish(&mut self, port: PortId, target: PortId, diags: &mut Diagnostics) -> bool {
        let (driver, sink) = self.orient(port, target);
        if driver == sink {
            return false;
        }
        if self.drives(driver, sink) {
            return true;
        }
        if self.ports[sink.0].fixed_value.is_some() {
            diags.note(
                DiagnosticKind::Connection,
                self.port_path(sink),
                format!("bound to a fixed value, not connecting '{}'", self.port_path(driver)),
            );
            return false;
        }
        if !self.ports[sink.0].kind.is_signal() {
            if let Some(&existing) = self.ports[sink.0].incoming.first() {
                if !self.ports[sink.0].fallback_driven {
                    diags.note(
                        DiagnosticKind::Connection,
                        self.port_path(sink),
                        format!(
                            "already driven by '{}', ignoring '{}'",
                            self.port_path(existing),
                            self.port_path(driver)
                        ),
                    );
                    return false;
                }
                log::debug!(
                    "Replacing fallback driver '{}' of '{}'",
                    self.port_path(existing),
                    self.port_path(sink)
                );
                self.unlink(existing, sink);
                self.ports[sink.0].fallback_driven = false;
            }
        }
        self.bridge(driver, sink);
        let (a, b) = (self.port_owner(driver), self.port_owner(sink));
        if !self.is_group(a) && !self.is_group(b) {
            self.register_module_connection(a, b);
        }
        true
    }

    /// Connects two ports that may live on different hierarchy levels.
    ///
    /// Ports of the same module, or of a group and its child, are linked
    /// directly. Siblings are linked through a glue signal in their parent.
    /// Otherwise the deeper port is copied onto its parent group and the
    /// copy takes its place until one of the first two cases applies.
    pub(crate) fn bridge(&mut self, mut driver: PortId, mut sink: PortId) {
        loop {
            let (a, b) = (self.port_owner(driver), self.port_owner(sink));
            if a == b || self.parent(a) == Some(b) || self.parent(b) == Some(a) {
                self.link(driver, sink);
                return;
            }
            if self.parent(a) == self.parent(b) {
                self.link_through_glue(driver, sink);
                return;
            }
            if self.modules[a.0].modlevel >= self.modules[b.0].modlevel {
                driver = self.lift(driver, true);
            } else {
                sink = self.lift(sink, false);
            }
        }
    }

    /// Copies `port` onto the group enclosing its module and wires the two
    /// through a glue signal in that group. Reuses an earlier copy.
    fn lift(&mut self, port: PortId, port_drives: bool) -> PortId {
        let module = self.port_owner(port);
        let Some(group) = self.parent(module) else {
            panic!("Cannot lift '{}' above the top level", self.port_path(port));
        };
        if let Some(&dup) = self.ports[port.0]
            .duplicates
            .iter()
            .find(|d| self.port_owner(**d) == group)
        {
            return dup;
        }

        let code_name = format!("{}_{}", self.modules[module.0].name, self.ports[port.0].code_name);
        let code_name = self.unique_port_name(group, &code_name);
        let mut dup = self.ports[port.0].duplicate(&code_name, PortKind::External, group);
        // The copy no longer sees the generics of the inner module.
        dup.width = self.resolved_width(port);
        dup.generics.clear();
        dup.origin = Some(port);
        let dup = self.push_port(dup);
        self.ports[port.0].duplicates.push(dup);
        self.attach_port(group, dup);

        let glue = self.new_glue(group, &code_name, port);
        if port_drives {
            self.link(port, glue);
            self.link(glue, dup);
        } else {
            self.link(dup, glue);
            self.link(glue, port);
        }
        self.ports[port.0].glue = Some(glue);
        self.ports[dup.0].glue = Some(glue);
        log::debug!("Lifted '{}' to '{}'", self.port_path(port), self.port_path(dup));
        dup
    }

    /// Links two sibling modules' ports through a glue signal in their
    /// parent. A driver with several sinks shares one glue signal.
    fn link_through_glue(&mut self, driver: PortId, sink: PortId) {
        let module = self.port_owner(driver);
        let Some(group) = self.parent(module) else {
            panic!("'{}' has no enclosing group", self.port_path(driver));
        };
        let name = format!("{}_{}", self.modules[module.0].name, self.ports[driver.0].code_name);
        let glue = match self.find_signal(group, &name) {
            Some(existing)
                if self.ports[existing.0].kind == PortKind::Glue
                    && self.ports[existing.0].incoming.contains(&driver) =>
            {
                existing
            }
            _ => self.new_glue(group, &name, driver),
        };
        self.link(driver, glue);
        self.link(glue, sink);
        self.ports[driver.0].glue = Some(glue);
        self.ports[sink.0].glue = Some(glue);
    }

    /// Synthesizes a glue signal in `group` shaped like `like`.
    pub(crate) fn new_glue(&mut self, group: ModuleId, name: &str, like: PortId) -> PortId {
        let name = self.unique_signal_name(group, name);
        let data_type = self.ports[like.0].data_type.clone();
        let width = self.resolved_width(like);
        let glue = self.new_signal(group, &name, &data_type, width);
        self.ports[glue.0].kind = PortKind::Glue;
        glue
    }

    pub(crate) fn unique_port_name(&self, module: ModuleId, name: &str) -> String {
        if self.find_port(module, name).is_none() {
            return name.to_string();
        }
        (1..)
            .map(|n| format!("{name}_{n}"))
            .find(|candidate| self.find_port(module, candidate).is_none())
            .unwrap_or_else(|| name.to_string())
    }

    pub(crate) fn unique_signal_name(&self, group: ModuleId, name: &str) -> String {
        if self.find_signal(group, name).is_none() {
            return name.to_string();
        }
        (1..)
            .map(|n| format!("{name}_{n}"))
            .find(|candidate| self.find_signal(group, candidate).is_none())
            .unwrap_or_else(|| name.to_string())
    }

    /// Whether direction, data type and width allow wiring `source` to
    /// `sink`. With `check_name`, the function names must match as well.
    /// Width management may bind generics as a side effect.
    pub(crate) fn can_connect(
        &mut self,
        source: PortId,
        sink: PortId,
        check_name: bool,
        diags: &mut Diagnostics,
    ) -> bool {
        let (s, t) = (&self.ports[source.0], &self.ports[sink.0]);
        if check_name && !s.name.eq_ignore_ascii_case(&t.name) {
            return false;
        }
        if !s.direction.compatible_with(&t.direction) {
            let (a, b) = (s.module, t.module);
            let exempt = s.kind == PortKind::External
                || s.interface.is_some_and(|i| self.interfaces[i.0].to_external)
                || (a != b && (self.is_ancestor(a, b) || self.is_ancestor(b, a)));
            if !exempt {
                log::debug!(
                    "Direction mismatch: '{}' ({}) and '{}' ({})",
                    self.port_path(source),
                    s.direction,
                    self.port_path(sink),
                    t.direction
                );
                return false;
            }
        }
        if !s.data_type.eq_ignore_ascii_case(&t.data_type) {
            log::debug!(
                "Data type mismatch: '{}' ({}) and '{}' ({})",
                self.port_path(source),
                s.data_type,
                self.port_path(sink),
                t.data_type
            );
            return false;
        }
        self.manage_widths(source, sink, diags)
    }
}

#[cfg(test)]
mod tests {
    use crate::chain::rules::RuleContext;
    use crate::*;

    fn library() -> ModuleLibrary {
        ModuleLibrary::bare()
            .with_entity(EntityDescription::new("pulse").port(DiscoveredPort::bit("sync_out", Direction::Out)))
            .unwrap()
            .with_entity(EntityDescription::new("gate").port(DiscoveredPort::bit("sync_in", Direction::In)))
            .unwrap()
    }

    #[test]
    fn test_fallback_driver_is_replaced() {
        let chain = ProcessingChain::new(library());
        let frame_sync = chain.main().define_signal("frame_sync", "std_logic", "").unwrap();
        let pulse = chain.add_module("pulse", "pulse").unwrap();
        let other = chain.add_module("pulse", "other").unwrap();
        let gate = chain.add_module("gate", "gate").unwrap();
        gate.port_rule_add("sync_in", "sink_missing", "fallback_signal(frame_sync)")
            .unwrap();
        let sync_in = gate.get_port("sync_in").unwrap();
        let sync_out = pulse.get_port("sync_out").unwrap();
        let mut diags = Diagnostics::new();

        let handled = chain
            .core
            .borrow_mut()
            .resolve_port(sync_in.id, None, RuleContext::default(), &mut diags)
            .unwrap();
        assert!(handled);
        assert_eq!(sync_in.incoming(), Some(frame_sync.clone()));
        assert!(chain.core.borrow().ports[sync_in.id.0].fallback_driven);

        // A real driver displaces the fallback.
        let replaced = chain.core.borrow_mut().establish(sync_out.id, sync_in.id, &mut diags);
        assert!(replaced);
        assert_eq!(sync_in.drivers().len(), 1);
        assert_eq!(sync_in.incoming().unwrap().drivers(), vec![sync_out.clone()]);
        assert!(frame_sync.outgoing().is_empty());
        assert!(!chain.core.borrow().ports[sync_in.id.0].fallback_driven);
        assert!(diags.is_empty());

        // A second real driver is refused.
        let glue = sync_in.incoming();
        let second = other.get_port("sync_out").unwrap();
        let refused = !chain.core.borrow_mut().establish(second.id, sync_in.id, &mut diags);
        assert!(refused);
        assert_eq!(sync_in.incoming(), glue);
        assert!(second.outgoing().is_empty());
        let notes = diags.iter().collect::<Vec<_>>();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].severity, Severity::Note);
        assert_eq!(notes[0].kind, DiagnosticKind::Connection);
        assert_eq!(notes[0].subject.as_deref(), Some("gate.sync_in"));
        assert!(notes[0].message.contains("already driven"));
    }
}
