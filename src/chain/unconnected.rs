// SPDX-License-Identifier: Apache-2.0

use crate::chain::core::{ChainCore, ModuleId, PortId};
use crate::chain::rules::RuleContext;
use crate::diagnostics::Diagnostics;
use crate::port::PortKind;
use crate::ChainError;

impl ChainCore {
    /// Candidate counterpart of a port left without connection: the
    /// enclosing group's port of the same name, or else a signal of that
    /// name in the enclosing groups, innermost first.
    fn sweep_candidate(&self, port: PortId) -> Option<PortId> {
        let parent = self.parent(self.port_owner(port))?;
        let p = &self.ports[port.0];
        let by_port = self
            .find_port(parent, &p.code_name)
            .or_else(|| self.find_port(parent, &p.name))
            .filter(|candidate| *candidate != port);
        if by_port.is_some() {
            return by_port;
        }
        let mut group = Some(parent);
        while let Some(g) = group {
            if let Some(signal) = self.find_signal(g, &p.code_name) {
                return Some(signal);
            }
            group = self.parent(g);
        }
        None
    }

    /// Resolves the ports of `module` that are still without connection.
    /// With `standalone_only`, interface ports are left alone.
    pub(crate) fn sweep_module(
        &mut self,
        module: ModuleId,
        standalone_only: bool,
        diags: &mut Diagnostics,
    ) -> Result<(), ChainError> {
        let ports = if standalone_only {
            self.modules[module.0].ports.values().copied().collect()
        } else {
            self.module_ports(module)
        };
        for port in ports {
            let p = &self.ports[port.0];
            if p.connected || !p.in_entity {
                continue;
            }
            // Top level pins have nothing to connect to.
            if module == self.top && p.kind == PortKind::External {
                continue;
            }
            let candidate = self.sweep_candidate(port);
            let result = self.resolve_port(port, candidate, RuleContext::default(), diags);
            collect_connection_error(result, diags)?;
        }
        Ok(())
    }

    /// Last pass over every port without connection: leaf modules first,
    /// then groups from the deepest level up, then the top level.
    pub(crate) fn sweep_unconnected(&mut self, diags: &mut Diagnostics) -> Result<(), ChainError> {
        let mut order = self.leaf_modules();
        order.extend(self.groups_deepest_first());
        order.push(self.top);
        for module in order {
            self.sweep_module(module, false, diags)?;
        }
        Ok(())
    }
}

/// Records a connection error and carries on; other errors abort the build.
pub(crate) fn collect_connection_error<T>(
    result: Result<T, ChainError>,
    diags: &mut Diagnostics,
) -> Result<(), ChainError> {
    match result {
        Ok(_) => Ok(()),
        Err(e @ ChainError::Connection { .. }) => {
            diags.record(&e);
            Ok(())
        }
        Err(e) => Err(e),
    }
}
