// SPDX-License-Identifier: Apache-2.0

/// Build-wide settings of a `ProcessingChain`.
///
/// Override individual fields with struct update syntax:
///
/// ```
/// use chainstitch::ChainConfig;
/// let cfg = ChainConfig {
///     base_address: 0x8000_0000,
///     ..Default::default()
/// };
/// assert_eq!(cfg.address_space_size, 0xFFFF);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChainConfig {
    /// Absolute address of the first register interface.
    pub base_address: u32,
    /// Span of the register map; the last usable byte is
    /// `base_address + address_space_size`.
    pub address_space_size: u32,
    /// Bytes occupied by one register.
    pub addr_per_reg: u32,
    /// Register slots per interface used when no interface needs more.
    pub default_regs_per_module: u32,
    /// Entity name of the register manager helper. Register interfaces are
    /// only assigned an address when linked to a module of this entity.
    pub manager_entity: String,
    /// Name of the root module group (modlevel 0).
    pub top_name: String,
    /// Name of the main module group user modules are added to.
    pub main_name: String,
}

impl Default for ChainConfig {
    fn default() -> Self {
        ChainConfig {
            base_address: 0x43C1_0000,
            address_space_size: 0xFFFF,
            addr_per_reg: 4,
            default_regs_per_module: 2,
            manager_entity: "as_regmgr".to_string(),
            top_name: "asterics".to_string(),
            main_name: "as_main".to_string(),
        }
    }
}

impl ChainConfig {
    /// Highest address a register block may end at.
    pub fn address_ceiling(&self) -> u32 {
        self.base_address.saturating_add(self.address_space_size)
    }
}
