// SPDX-License-Identifier: Apache-2.0

use crate::Intf;

impl Intf {
    /// Routes the interface up to the top level, one group per pass.
    pub fn make_external(&self) {
        let core = self.core();
        core.borrow_mut().interfaces[self.id.0].to_external = true;
    }

    /// Instantiates `entity_name` in the top level group during
    /// `auto_connect` and wires this interface to it.
    pub fn instantiate_module(&self, entity_name: &str) {
        let core = self.core();
        let mut core = core.borrow_mut();
        let top = core.config.top_name.clone();
        let intf = &mut core.interfaces[self.id.0];
        intf.instantiate = Some((entity_name.to_string(), top));
        intf.to_external = true;
    }
}
