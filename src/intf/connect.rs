// SPDX-License-Identifier: Apache-2.0

use crate::chain::core::EndpointId;
use crate::{Intf, Module};

impl Intf {
    /// Requests a connection of this interface to `other`. Ports are paired
    /// by function name and resolved through their rules by
    /// `ProcessingChain::auto_connect`.
    pub fn connect(&self, other: &Intf) {
        let core = self.core();
        core.borrow_mut()
            .pending
            .push((EndpointId::Interface(self.id), EndpointId::Interface(other.id)));
    }

    /// Wires this interface to the matching interface of `module` during
    /// `auto_connect`, across group boundaries if necessary.
    pub fn connect_to_module(&self, module: &Module) {
        let core = self.core();
        core.borrow_mut().interfaces[self.id.0].connect_to = Some(module.id);
    }

    /// The module this interface is wired to automatically, if any.
    pub fn connect_target(&self) -> Option<Module> {
        let core = self.core();
        let target = core.borrow().interfaces[self.id.0].connect_to;
        target.map(|id| Module {
            chain: self.chain.clone(),
            id,
        })
    }
}
