// SPDX-License-Identifier: Apache-2.0

use std::fmt;

/// Access direction of one register of a register interface.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RegisterKind {
    /// Unused slot.
    None,
    /// Status register, written by hardware and read by software.
    HwToSw,
    /// Control register, written by software and read by hardware.
    SwToHw,
    /// Written and read by both sides.
    Both,
}

impl RegisterKind {
    /// Decodes one entry of a register configuration constant. Accepts the
    /// two-bit literals `00`..`11` and the symbolic `AS_REG_*` names.
    pub fn from_code(code: &str) -> Option<RegisterKind> {
        match code.trim().to_ascii_uppercase().as_str() {
            "00" | "AS_REG_NONE" => Some(RegisterKind::None),
            "01" | "AS_REG_STATUS" => Some(RegisterKind::HwToSw),
            "10" | "AS_REG_CONTROL" => Some(RegisterKind::SwToHw),
            "11" | "AS_REG_BOTH" => Some(RegisterKind::Both),
            _ => None,
        }
    }
}

impl fmt::Display for RegisterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegisterKind::None => f.write_str("None"),
            RegisterKind::HwToSw => f.write_str("HW→SW"),
            RegisterKind::SwToHw => f.write_str("HW←SW"),
            RegisterKind::Both => f.write_str("HW⇔SW"),
        }
    }
}

/// Address allocation state of a register interface.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RegisterState {
    Unassigned,
    /// An offset in the address space has been reserved.
    AddressBound,
    /// The base address generic is bound to its constant.
    Connected,
}

/// Register specific state of an interface.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct RegisterBlock {
    /// Code name of the configuration constant and its raw value.
    pub(crate) config: Option<(String, String)>,
    pub(crate) table: Vec<RegisterKind>,
    pub(crate) decoded: bool,
    pub(crate) base_address: Option<u32>,
    pub(crate) state: RegisterState,
    /// Index of the interface's block in the address space.
    pub(crate) block_index: Option<u32>,
}

impl RegisterBlock {
    pub(crate) fn new() -> Self {
        RegisterBlock {
            config: None,
            table: Vec::new(),
            decoded: false,
            base_address: None,
            state: RegisterState::Unassigned,
            block_index: None,
        }
    }

    pub(crate) fn reg_count(&self) -> usize {
        self.table.len()
    }
}

/// Name of the constant configuring a register interface, without the
/// interface's prefix and suffix.
pub const REGISTER_CONFIG_CONSTANT: &str = "slave_register_configuration";

/// Names of the canonical ports of a slave register interface.
pub const REGISTER_PORTS: [&str; 4] = [
    "slv_ctrl_reg",
    "slv_status_reg",
    "slv_reg_modify",
    "slv_reg_config",
];

/// Decodes the value of a register configuration constant, e.g.
/// `("11","01","10")` or `(0 => AS_REG_BOTH)` or
/// `("01", others => "10")`.
///
/// `others` fills the table up to `others_len` entries and ends decoding;
/// it is rejected when `others_len` is unknown.
pub fn decode_register_table(
    value: &str,
    others_len: Option<usize>,
) -> Result<Vec<RegisterKind>, String> {
    let clean = |s: &str| -> String {
        s.trim_matches(|c: char| c.is_whitespace() || "()\",;".contains(c))
            .to_string()
    };
    let mut table = Vec::new();
    for raw in value.split(',') {
        let item = clean(raw);
        if item.is_empty() {
            continue;
        }
        if let Some(kind) = RegisterKind::from_code(&item) {
            table.push(kind);
            continue;
        }
        let Some((key, code)) = item.split_once("=>") else {
            return Err(format!("unrecognized register entry '{}'", raw.trim()));
        };
        let key = clean(key).to_ascii_lowercase();
        let kind = RegisterKind::from_code(&clean(code))
            .ok_or_else(|| format!("unrecognized register type in '{}'", raw.trim()))?;
        match key.as_str() {
            "others" => {
                let len = others_len.ok_or_else(|| {
                    "'others' needs a resolved register count".to_string()
                })?;
                while table.len() < len {
                    table.push(kind);
                }
                break;
            }
            "0" if table.is_empty() => table.push(kind),
            _ => return Err(format!("unsupported register entry '{}'", raw.trim())),
        }
    }
    if table.is_empty() {
        return Err(format!("empty register configuration '{value}'"));
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_literals() {
        assert_eq!(
            decode_register_table(r#"("11","01","10")"#, None),
            Ok(vec![
                RegisterKind::Both,
                RegisterKind::HwToSw,
                RegisterKind::SwToHw
            ])
        );
    }

    #[test]
    fn test_decode_symbolic_and_single() {
        assert_eq!(
            decode_register_table("(0 => AS_REG_CONTROL)", None),
            Ok(vec![RegisterKind::SwToHw])
        );
        assert_eq!(
            decode_register_table("(AS_REG_STATUS, AS_REG_NONE);", None),
            Ok(vec![RegisterKind::HwToSw, RegisterKind::None])
        );
    }

    #[test]
    fn test_decode_others() {
        assert_eq!(
            decode_register_table(r#"("01", others => "10")"#, Some(4)),
            Ok(vec![
                RegisterKind::HwToSw,
                RegisterKind::SwToHw,
                RegisterKind::SwToHw,
                RegisterKind::SwToHw
            ])
        );
        assert!(decode_register_table(r#"(others => "10")"#, None).is_err());
    }

    #[test]
    fn test_decode_errors() {
        assert!(decode_register_table(r#"("12")"#, None).is_err());
        assert!(decode_register_table("()", None).is_err());
        assert!(decode_register_table(r#"(3 => "11")"#, None).is_err());
    }

    #[test]
    fn test_display() {
        let shown = [
            RegisterKind::None,
            RegisterKind::HwToSw,
            RegisterKind::SwToHw,
            RegisterKind::Both,
        ]
        .map(|k| k.to_string());
        assert_eq!(shown, ["None", "HW→SW", "HW←SW", "HW⇔SW"]);
    }
}
