// SPDX-License-Identifier: Apache-2.0

use crate::chain::core::EndpointId;
use crate::{Intf, Module, Port};

impl Port {
    /// Requests a connection from this port to another port. Names need not
    /// match; direction, data type and width are checked when the request is
    /// resolved by `ProcessingChain::auto_connect`.
    pub fn connect(&self, other: &Port) {
        self.push_pending(EndpointId::Port(other.id));
    }

    /// Requests a connection to the port of `module` with the same code name.
    pub fn connect_to_module(&self, module: &Module) {
        self.push_pending(EndpointId::Module(module.id));
    }

    /// Requests a connection to the port of `intf` with the same function
    /// name.
    pub fn connect_to_interface(&self, intf: &Intf) {
        self.push_pending(EndpointId::Interface(intf.id));
    }

    fn push_pending(&self, other: EndpointId) {
        let core = self.core();
        core.borrow_mut()
            .pending
            .push((EndpointId::Port(self.id), other));
    }
}
