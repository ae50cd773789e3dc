// SPDX-License-Identifier: Apache-2.0

use crate::Port;

impl Port {
    /// Binds the port to a literal, e.g. `'0'` or `(others => '0')`. The port
    /// counts as connected and is left out of the emitted entity.
    pub fn set_fixed_value(&self, value: impl AsRef<str>) {
        let core = self.core();
        let mut core = core.borrow_mut();
        let port = &mut core.ports[self.id.0];
        port.fixed_value = Some(value.as_ref().trim().to_string());
        port.connected = true;
        port.in_entity = false;
        let intf = port.interface;
        if let Some(intf) = intf {
            core.update_interface_connected(intf);
        }
    }

    /// Whether the port is bound to a literal instead of being wired.
    pub fn is_tied_off(&self) -> bool {
        self.fixed_value().is_some()
    }
}
