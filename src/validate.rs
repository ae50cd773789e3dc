// SPDX-License-Identifier: Apache-2.0

use fixedbitset::FixedBitSet;

use crate::chain::core::{ChainCore, PortId};
use crate::diagnostics::{DiagnosticKind, Diagnostics};

impl ChainCore {
    /// Checks the finished graph: every port other than a signal has at most
    /// one driver, ports bound to a value have none, and links are recorded
    /// on both ends.
    pub(crate) fn validate(&self, diags: &mut Diagnostics) {
        let mut driven = FixedBitSet::with_capacity(self.ports.len());
        for (index, port) in self.ports.iter().enumerate() {
            let id = PortId(index);
            if !port.incoming.is_empty() {
                driven.insert(index);
            }
            if port.incoming.len() > 1 && !port.kind.is_signal() {
                let drivers = port
                    .incoming
                    .iter()
                    .map(|d| format!("'{}'", self.port_path(*d)))
                    .collect::<Vec<_>>()
                    .join(", ");
                diags.error(
                    DiagnosticKind::Validation,
                    self.port_path(id),
                    format!("driven by more than one port: {drivers}"),
                );
            }
            for sink in &port.outgoing {
                if !self.ports[sink.0].incoming.contains(&id) {
                    diags.error(
                        DiagnosticKind::Validation,
                        self.port_path(id),
                        format!("link to '{}' is only recorded on one side", self.port_path(*sink)),
                    );
                }
            }
        }

        for index in driven.ones() {
            let port = &self.ports[index];
            if port.fixed_value.is_some() {
                diags.error(
                    DiagnosticKind::Validation,
                    self.port_path(PortId(index)),
                    format!(
                        "bound to {} but driven by '{}'",
                        port.fixed_value.as_deref().unwrap_or_default(),
                        self.port_path(port.incoming[0])
                    ),
                );
            }
        }
    }
}
