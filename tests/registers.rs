// SPDX-License-Identifier: Apache-2.0

use chainstitch::*;
use rstest::rstest;

fn manager() -> EntityDescription {
    let width = "0 to REG_COUNT-1";
    EntityDescription::new("as_regmgr")
        .generic("REG_COUNT", None)
        .generic("MODULE_BASEADDR", None)
        .port(DiscoveredPort::new("slv_ctrl_reg", Direction::Out, "slv_reg_data", width))
        .port(DiscoveredPort::new("slv_status_reg", Direction::In, "slv_reg_data", width))
        .port(DiscoveredPort::vector("slv_reg_modify", Direction::In, width))
        .port(DiscoveredPort::new("slv_reg_config", Direction::In, "slv_reg_config_table", width))
}

/// An entity with one register interface holding `codes.len()` registers.
fn register_entity(name: &str, codes: &[&str]) -> EntityDescription {
    let width = format!("0 to {}", codes.len() - 1);
    let table = codes.iter().map(|c| format!("\"{c}\"")).collect::<Vec<_>>().join(",");
    EntityDescription::new(name)
        .constant("slave_register_configuration", &format!("({table})"))
        .port(DiscoveredPort::new("slv_ctrl_reg", Direction::In, "slv_reg_data", &width))
        .port(DiscoveredPort::new("slv_status_reg", Direction::Out, "slv_reg_data", &width))
        .port(DiscoveredPort::vector("slv_reg_modify", Direction::Out, &width))
        .port(DiscoveredPort::new(
            "slv_reg_config",
            Direction::Out,
            "slv_reg_config_table",
            &width,
        ))
}

fn library(entities: Vec<EntityDescription>) -> ModuleLibrary {
    let mut library = ModuleLibrary::new();
    library.add_entity(manager()).unwrap();
    for entity in entities {
        library.add_entity(entity).unwrap();
    }
    library
}

#[test]
fn test_register_interface_discovery() {
    let chain = ProcessingChain::new(library(vec![register_entity("filter", &["11", "01", "10"])]));
    let filter = chain.add_module("filter", "filter").unwrap();

    let regs = filter.register_interfaces();
    assert_eq!(regs.len(), 1);
    let intf = &regs[0];
    assert_eq!(intf.name(), "slv_reg_interface");
    assert!(intf.is_complete());
    assert_eq!(
        intf.register_table(),
        Some(vec![
            RegisterKind::Both,
            RegisterKind::HwToSw,
            RegisterKind::SwToHw
        ])
    );
    assert_eq!(intf.reg_count(), Some(3));
    assert_eq!(intf.register_state(), Some(RegisterState::Unassigned));
    assert_eq!(
        intf.config_constant(),
        Some((
            "slave_register_configuration".to_string(),
            r#"("11","01","10")"#.to_string()
        ))
    );
    assert!(
        intf.ports()
            .iter()
            .all(|p| p.kind() == PortKind::Register)
    );
    let generics = intf.generics().iter().map(|g| g.code_name()).collect::<Vec<_>>();
    assert_eq!(generics, vec!["REG_COUNT", "MODULE_BASEADDR"]);
    // Interface parameters are not parameters of the module.
    assert!(filter.get_generic("REG_COUNT").is_none());
}

#[test]
fn test_missing_configuration_constant() {
    let mut entity = register_entity("filter", &["11"]);
    entity.constants.clear();
    let chain = ProcessingChain::new(library(vec![entity]));
    assert!(matches!(
        chain.add_module("filter", "filter"),
        Err(ChainError::Discovery { .. })
    ));
    assert!(chain.get_module("filter").is_none());
}

#[rstest]
#[case(&["10"], 2)]
#[case(&["10", "01", "11"], 4)]
#[case(&["10", "01", "11", "11", "01"], 8)]
fn test_max_regs_per_module(#[case] codes: &[&str], #[case] expected: u32) {
    let chain = ProcessingChain::new(library(vec![register_entity("filter", codes)]));
    chain.add_module("filter", "filter").unwrap();
    chain.auto_connect().unwrap();
    assert_eq!(chain.max_regs_per_module(), expected);
}

#[test]
fn test_addresses_follow_creation_order() {
    let chain = ProcessingChain::new(library(vec![
        register_entity("small", &["10", "01"]),
        register_entity("wide", &["11", "01", "10", "10", "10"]),
        register_entity("medium", &["11", "01", "10"]),
    ]));
    let modules = [
        chain.add_module("medium", "m0").unwrap(),
        chain.add_module("wide", "m1").unwrap(),
        chain.add_module("small", "m2").unwrap(),
    ];

    chain.auto_connect().unwrap();
    assert_eq!(chain.max_regs_per_module(), 8);

    let base = ChainConfig::default().base_address;
    let addresses = modules
        .iter()
        .map(|m| m.register_interfaces()[0].base_address().unwrap())
        .collect::<Vec<_>>();
    assert_eq!(addresses, vec![base, base + 32, base + 64]);
    for module in &modules {
        let intf = &module.register_interfaces()[0];
        assert_eq!(intf.register_state(), Some(RegisterState::Connected));
        let manager = chain.get_module(&format!("{}_as_regmgr", module.name())).unwrap();
        assert_eq!(manager.entity_name(), "as_regmgr");
        assert_eq!(
            manager.get_generic("MODULE_BASEADDR").unwrap().value(),
            Some(format!("c_{}_base_addr", module.name()))
        );
        assert_eq!(
            manager.get_generic("REG_COUNT").unwrap().value(),
            intf.reg_count().map(|n| n.to_string())
        );
    }

    let map = chain.address_map();
    assert_eq!(map.len(), 3 + 5 + 2);
    assert!(map.windows(2).all(|w| w[0].address < w[1].address));
    assert_eq!(
        map[0],
        AddressEntry {
            address: base,
            module: "m0".to_string(),
            kind: RegisterKind::Both,
        }
    );
    assert_eq!(map[3].address, base + 32);
    assert_eq!(map[3].to_string(), "0x43C10020: m1: HW⇔SW");
}

#[test]
fn test_address_space_exhausted() {
    let config = ChainConfig {
        address_space_size: 0x0F,
        ..Default::default()
    };
    let chain = ProcessingChain::with_config(
        config.clone(),
        library(vec![register_entity("filter", &["10", "01"])]),
    );
    let modules = ["f0", "f1", "f2"].map(|name| chain.add_module("filter", name).unwrap());

    let err = chain.auto_connect().unwrap_err();
    match &err.fatal {
        Some(ChainError::AddressSpaceExhausted { module, address, .. }) => {
            assert_eq!(module, "f2");
            assert_eq!(*address, config.base_address + 16);
        }
        other => panic!("unexpected fatal error {other:?}"),
    }
    assert!(
        err.diagnostics
            .iter()
            .any(|d| d.kind == DiagnosticKind::AddressSpace && d.severity == Severity::Error)
    );

    let state = |i: usize| modules[i].register_interfaces()[0].register_state();
    assert_eq!(state(0), Some(RegisterState::Connected));
    assert_eq!(state(1), Some(RegisterState::Connected));
    assert_eq!(state(2), Some(RegisterState::Unassigned));
    assert_eq!(modules[2].register_interfaces()[0].base_address(), None);
    assert_eq!(chain.address_map().len(), 4);
}

#[test]
fn test_missing_manager_entity() {
    let mut library = ModuleLibrary::new();
    library
        .add_entity(register_entity("filter", &["10"]))
        .unwrap();
    let chain = ProcessingChain::new(library);
    chain.add_module("filter", "filter").unwrap();

    let err = chain.auto_connect().unwrap_err();
    assert_eq!(
        err.fatal,
        Some(ChainError::ModuleNotFound("as_regmgr".to_string()))
    );
    assert_eq!(
        err.diagnostics.iter().next().map(|d| d.kind),
        Some(DiagnosticKind::ModuleNotFound)
    );
}

#[test]
fn test_unknown_entity() {
    let chain = ProcessingChain::new(ModuleLibrary::new());
    assert_eq!(
        chain.add_module("nope", "x").err(),
        Some(ChainError::ModuleNotFound("nope".to_string()))
    );
}

#[test]
fn test_decode_register_table() {
    assert_eq!(
        decode_register_table(r#"("11","01","10")"#, None),
        Ok(vec![
            RegisterKind::Both,
            RegisterKind::HwToSw,
            RegisterKind::SwToHw
        ])
    );
    assert_eq!(
        decode_register_table(r#"(0 => "01")"#, None),
        Ok(vec![RegisterKind::HwToSw])
    );
}
