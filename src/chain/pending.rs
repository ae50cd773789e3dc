// SPDX-License-Identifier: Apache-2.0

use crate::chain::core::{ChainCore, EndpointId, InterfaceId, ModuleId, PortId};
use crate::chain::unconnected::collect_connection_error;
use crate::diagnostics::{Diagnostics, Severity};
use crate::{ChainError, Direction};

impl ChainCore {
    /// Resolves the connections requested through `connect` calls, in
    /// request order. Failures are collected as diagnostics.
    pub(crate) fn process_pending(&mut self, diags: &mut Diagnostics) -> Result<(), ChainError> {
        let pending = std::mem::take(&mut self.pending);
        for (a, b) in pending {
            let result = match (a, b) {
                (EndpointId::Port(p), EndpointId::Port(q)) => self.connect_ports(p, q, diags),
                (EndpointId::Interface(i), EndpointId::Interface(j)) => self.connect_interfaces(i, j, diags),
                (EndpointId::Module(m), EndpointId::Module(n)) => self.connect_modules(m, n, diags),
                (EndpointId::Interface(i), EndpointId::Module(m))
                | (EndpointId::Module(m), EndpointId::Interface(i)) => {
                    self.connect_interface_to_module(i, m, diags)
                }
                (EndpointId::Port(p), EndpointId::Module(m))
                | (EndpointId::Module(m), EndpointId::Port(p)) => {
                    let found = self.find_port(m, &self.ports[p.0].code_name);
                    let target = self.modules[m.0].name.clone();
                    self.connect_port_to(p, found, &target, diags)
                }
                (EndpointId::Port(p), EndpointId::Interface(i))
                | (EndpointId::Interface(i), EndpointId::Port(p)) => {
                    let found = self.interface_port(i, &self.ports[p.0].name);
                    let target = self.intf_path(i);
                    self.connect_port_to(p, found, &target, diags)
                }
            };
            collect_connection_error(result, diags)?;
        }
        Ok(())
    }

    fn connection_error(&self, subject: String, msg: String) -> ChainError {
        ChainError::Connection {
            subject,
            msg,
            severity: Severity::Error,
        }
    }

    /// Wires two ports chosen by the user. Names need not match.
    fn connect_ports(&mut self, p: PortId, q: PortId, diags: &mut Diagnostics) -> Result<(), ChainError> {
        if self.can_connect(p, q, false, diags) && self.establish(p, q, diags) {
            return Ok(());
        }
        Err(self.connection_error(
            format!("{} -> {}", self.port_path(p), self.port_path(q)),
            "ports are incompatible".to_string(),
        ))
    }

    fn connect_port_to(
        &mut self,
        p: PortId,
        found: Option<PortId>,
        target: &str,
        diags: &mut Diagnostics,
    ) -> Result<(), ChainError> {
        match found {
            Some(q) => self.connect_ports(p, q, diags),
            None => Err(self.connection_error(
                self.port_path(p),
                format!("'{target}' has no port of that name"),
            )),
        }
    }

    /// Connects `a` as the source of `b`. Each output interface of `a` is
    /// paired with a free input interface of `b` of the same type (a group
    /// and its child pair interfaces of equal direction instead). Single
    /// ports of `a` then drive the same-named ports of `b`.
    fn connect_modules(&mut self, a: ModuleId, b: ModuleId, diags: &mut Diagnostics) -> Result<(), ChainError> {
        let nested = self.parent(a) == Some(b) || self.parent(b) == Some(a);
        let mut connected = 0;
        let intfs: Vec<InterfaceId> = self.modules[a.0].interfaces.clone();
        for intf in intfs {
            let i = &self.interfaces[intf.0];
            if i.connected || (i.direction == Direction::In && !nested) {
                continue;
            }
            if let Some(target) = self.matching_interface(intf, b) {
                self.connect_interfaces(intf, target, diags)?;
                connected += 1;
            }
        }

        let singles: Vec<PortId> = self.modules[a.0].ports.values().copied().collect();
        for port in singles {
            let Some(target) = self.find_port(b, &self.ports[port.0].code_name) else {
                continue;
            };
            if self.ports[target.0].connected || self.orient(port, target).0 != port {
                continue;
            }
            if self.can_connect(port, target, false, diags) && self.establish(port, target, diags) {
                connected += 1;
            }
        }

        if connected == 0 {
            return Err(self.connection_error(
                format!("{} -> {}", self.modules[a.0].name, self.modules[b.0].name),
                "modules have no matching interfaces or ports".to_string(),
            ));
        }
        Ok(())
    }
}
