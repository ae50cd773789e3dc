// SPDX-License-Identifier: Apache-2.0

use crate::chain::core::{BundleGroup, BundleOp, ChainCore, PortId};
use crate::chain::rules::Resolution;

impl ChainCore {
    /// Adds `port` to the reduction of its group's ports with the same code
    /// name.
    ///
    /// The first member creates the reduction signal `<code>_<op>` in the
    /// enclosing group and routes it out through a group port of the same
    /// code name. Every member then drives the reduction signal.
    pub(crate) fn bundle(&mut self, port: PortId, op: BundleOp) -> Resolution {
        let Some(group) = self.parent(self.port_owner(port)) else {
            return Resolution::Unresolved;
        };
        let code_name = self.ports[port.0].code_name.clone();
        let key = (group, code_name.clone());
        if !self.bundles.contains_key(&key) {
            let external = self.ensure_external(group, port);
            let signal = self.new_glue(group, &format!("{code_name}_{}", op.as_str()), port);
            self.link(signal, external);
            log::debug!(
                "Created {} bundle '{}' for '{}'",
                op.as_str(),
                self.port_path(signal),
                code_name
            );
            self.bundles.insert(
                key.clone(),
                BundleGroup {
                    op,
                    signal,
                    external,
                    members: Vec::new(),
                },
            );
        }
        let Some(bundle) = self.bundles.get_mut(&key) else {
            return Resolution::Unresolved;
        };
        if bundle.op != op {
            log::warn!(
                "'{}' requests an {} bundle, joining the existing {} bundle",
                code_name,
                op.as_str(),
                bundle.op.as_str()
            );
        }
        if !bundle.members.contains(&port) {
            bundle.members.push(port);
        }
        let signal = bundle.signal;
        self.link(port, signal);
        self.ports[port.0].glue = Some(signal);
        Resolution::Terminated
    }
}
