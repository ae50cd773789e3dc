// SPDX-License-Identifier: Apache-2.0

use std::fmt;

use crate::chain::core::{ChainCore, InterfaceId};
use crate::{ChainError, GenericValue, RegisterKind, RegisterState};

/// One register in the address map of a chain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AddressEntry {
    pub address: u32,
    pub module: String,
    pub kind: RegisterKind,
}

impl fmt::Display for AddressEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010X}: {}: {}", self.address, self.module, self.kind)
    }
}

impl ChainCore {
    /// Largest register count of any register interface, rounded up to a
    /// power of two and at least the configured default.
    pub(crate) fn compute_max_regs(&self) -> u32 {
        let largest = self
            .interfaces
            .iter()
            .filter_map(|i| i.register.as_ref())
            .map(|r| r.reg_count() as u32)
            .max()
            .unwrap_or(0);
        crate::util::next_power_of_two(largest).max(self.config.default_regs_per_module)
    }

    /// Whether the interface, or one of the copies made while propagating
    /// it, is paired with an interface of a register manager.
    fn has_manager(&self, intf: InterfaceId) -> bool {
        let mut cur = Some(intf);
        while let Some(id) = cur {
            let i = &self.interfaces[id.0];
            let managed = i
                .incoming
                .iter()
                .chain(i.outgoing.iter())
                .any(|other| self.entity_is_manager(self.interfaces[other.0].module));
            if managed {
                return true;
            }
            cur = self
                .interfaces
                .iter()
                .position(|other| other.origin == Some(id))
                .map(InterfaceId);
        }
        false
    }

    /// Gives each managed register interface a block of
    /// `addr_per_reg * max_regs_per_module` bytes, in module creation order.
    ///
    /// The bounds check happens before anything is committed, so a failing
    /// interface keeps its `Unassigned` state.
    pub(crate) fn assign_addresses(&mut self) -> Result<(), ChainError> {
        let block = u64::from(self.config.addr_per_reg) * u64::from(self.max_regs_per_module);
        let base = u64::from(self.config.base_address);
        let span = u64::from(self.config.address_space_size);

        for module in self.leaf_modules() {
            let intfs = self.modules[module.0].interfaces.clone();
            for intf in intfs {
                let Some(state) = self.interfaces[intf.0].register.as_ref().map(|r| r.state) else {
                    continue;
                };
                if state != RegisterState::Unassigned {
                    continue;
                }
                if !self.has_manager(intf) {
                    log::debug!("Register interface '{}' has no manager", self.intf_path(intf));
                    continue;
                }

                let offset = u64::from(self.next_offset);
                if (offset + block).saturating_sub(1) > span {
                    return Err(ChainError::AddressSpaceExhausted {
                        module: self.modules[module.0].name.clone(),
                        address: u32::try_from(base + offset).unwrap_or(u32::MAX),
                        ceiling: self.config.address_ceiling(),
                    });
                }
                let address = u32::try_from(base + offset).unwrap_or(u32::MAX);
                let block_index = if block == 0 { 0 } else { offset / block };
                self.address_space.insert(offset as u32, intf);
                let module_name = self.modules[module.0].name.clone();
                if let Some(register) = self.interfaces[intf.0].register.as_mut() {
                    register.base_address = Some(address);
                    register.block_index = Some(block_index as u32);
                    register.state = RegisterState::AddressBound;
                }
                log::info!(
                    "Register interface '{}' at {:#010X}",
                    self.intf_path(intf),
                    address
                );

                let base_addr = self.interfaces[intf.0]
                    .generics
                    .iter()
                    .copied()
                    .find(|g| self.generics[g.0].code_name == "MODULE_BASEADDR");
                if let Some(generic) = base_addr {
                    self.generics[generic.0].value = GenericValue::Literal(format!("c_{module_name}_base_addr"));
                    if let Some(register) = self.interfaces[intf.0].register.as_mut() {
                        register.state = RegisterState::Connected;
                    }
                }
                self.next_offset = (offset + block) as u32;
            }
        }
        Ok(())
    }

    /// Every assigned register, ascending by address.
    pub(crate) fn address_map(&self) -> Vec<AddressEntry> {
        let mut offsets = self.address_space.iter().collect::<Vec<_>>();
        offsets.sort_by_key(|(offset, _)| **offset);
        let mut entries = Vec::new();
        for (_, intf) in offsets {
            let i = &self.interfaces[intf.0];
            let (Some(register), module) = (i.register.as_ref(), &self.modules[i.module.0].name) else {
                continue;
            };
            let Some(base) = register.base_address else {
                continue;
            };
            for (n, kind) in register.table.iter().enumerate() {
                entries.push(AddressEntry {
                    address: base.saturating_add(n as u32 * self.config.addr_per_reg),
                    module: module.clone(),
                    kind: *kind,
                });
            }
        }
        entries
    }
}
