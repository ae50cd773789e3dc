// SPDX-License-Identifier: Apache-2.0

use chainstitch::*;

fn monitor_library() -> ModuleLibrary {
    ModuleLibrary::new()
        .with_entity(
            EntityDescription::new("monitor")
                .port(DiscoveredPort::bit("clk", Direction::In))
                .port(DiscoveredPort::bit("dbg", Direction::Out))
                .port(DiscoveredPort::bit("irq", Direction::Out)),
        )
        .unwrap()
}

#[test]
fn test_deep_port_to_top_port() {
    let chain = ProcessingChain::new(monitor_library());
    let group = chain.add_module_group("g1").unwrap();
    let monitor = group.add_module("monitor", "monitor").unwrap();
    assert_eq!(monitor.modlevel(), 3);
    monitor.get_port("irq").unwrap().set_fixed_value("'0'");

    let pin = chain
        .top()
        .define_port("dbg_pin", Direction::Out, "std_logic", "")
        .unwrap();
    let dbg = monitor.get_port("dbg").unwrap();
    dbg.connect(&pin);

    chain.auto_connect().unwrap();

    // One copy and one glue signal per group boundary below the top.
    let on_group = dbg.duplicates();
    assert_eq!(on_group.len(), 1);
    let on_group = on_group[0].clone();
    assert_eq!(on_group.module(), group);
    assert_eq!(on_group.kind(), PortKind::External);
    assert_eq!(on_group.origin(), Some(dbg.clone()));
    assert!(on_group.is_connected());

    let glue = dbg.glue_signal().unwrap();
    assert_eq!(glue.kind(), PortKind::Glue);
    assert_eq!(glue.module(), group);
    assert_eq!(dbg.outgoing(), vec![glue.clone()]);
    assert_eq!(on_group.incoming(), Some(glue));

    let on_main = on_group.duplicates();
    assert_eq!(on_main.len(), 1);
    assert_eq!(on_main[0].module(), chain.main());
    assert_eq!(on_main[0].glue_signal().unwrap().module(), chain.main());
    assert_eq!(pin.drivers(), vec![on_main[0].clone()]);

    let glue_count = chain
        .modules()
        .iter()
        .flat_map(|m| m.signals())
        .filter(|s| s.kind() == PortKind::Glue)
        .count();
    assert_eq!(glue_count, 2);
}

#[test]
fn test_clock_wired_from_enclosing_group() {
    let chain = ProcessingChain::new(monitor_library());
    let monitor = chain.add_module("monitor", "monitor").unwrap();
    monitor.set_port_fixed_value("dbg", "'0'").unwrap();
    monitor.set_port_fixed_value("irq", "'0'").unwrap();

    chain.auto_connect().unwrap();

    let clk = monitor.get_port("clk").unwrap();
    assert!(clk.is_standard());
    assert_eq!(clk.incoming(), chain.main().get_port("clk"));
    assert!(monitor.is_connected());
    assert!(monitor.get_unconnected_ports().is_empty());
}

#[test]
fn test_make_external_routes_to_top() {
    let chain = ProcessingChain::new(monitor_library());
    let group = chain.add_module_group("g1").unwrap();
    let monitor = group.add_module("monitor", "monitor").unwrap();
    monitor.set_port_fixed_value("dbg", "'0'").unwrap();
    let irq = monitor.get_port("irq").unwrap();
    irq.make_external();

    let diags = chain.auto_connect().unwrap();
    assert_eq!(diags.with_severity(Severity::Note).count(), 0);

    assert!(irq.is_external());
    let on_group = group.get_port("irq").unwrap();
    let on_main = chain.main().get_port("irq").unwrap();
    let on_top = chain.top().get_port("irq").unwrap();
    assert_eq!(irq.outgoing(), vec![on_group.clone()]);
    assert_eq!(on_main.incoming(), Some(on_group));
    assert_eq!(on_top.incoming(), Some(on_main));
    assert!(on_top.is_connected());
}

#[test]
fn test_interface_propagated_to_top() {
    let library = ModuleLibrary::new()
        .with_entity(
            EntityDescription::new("camera_rx")
                .port(DiscoveredPort::bit("cam_reset_n", Direction::Out))
                .port(DiscoveredPort::bit("cam_powerdown", Direction::Out))
                .port(DiscoveredPort::bit("cam_pixclk", Direction::In))
                .port(DiscoveredPort::bit("cam_frame_valid", Direction::In))
                .port(DiscoveredPort::bit("cam_line_valid", Direction::In))
                .port(DiscoveredPort::vector("cam_data", Direction::In, "9 downto 0")),
        )
        .unwrap();
    let chain = ProcessingChain::new(library);
    let sensor = chain.add_module("camera_rx", "sensor").unwrap();
    let intf = sensor.get_interface("cam").unwrap();
    assert_eq!(intf.type_name(), "camera_interface");
    assert_eq!(intf.direction(), Direction::In);
    assert!(intf.is_external());
    assert_eq!(intf.ports().len(), 6);

    chain.auto_connect().unwrap();

    assert!(intf.is_connected());
    let on_main = chain.main().get_interface("sensor_cam").unwrap();
    assert_eq!(on_main.origin(), Some(intf.clone()));
    assert_eq!(on_main.prefix(), "sensor_cam_");
    let on_top = chain
        .top()
        .interfaces()
        .into_iter()
        .find(|i| i.origin() == Some(on_main.clone()))
        .unwrap();
    assert!(on_top.is_connected());

    // Outputs drive their copies, inputs are driven by them.
    let reset_n = intf.get_port("reset_n").unwrap();
    let pixclk = intf.get_port("pixclk").unwrap();
    assert_eq!(reset_n.outgoing(), vec![on_main.get_port("reset_n").unwrap()]);
    assert_eq!(pixclk.incoming(), on_main.get_port("pixclk"));
    assert_eq!(
        on_main.get_port("data").unwrap().width(),
        DataWidth::downto(9, 0)
    );
}

#[test]
fn test_bundled_ready_ports() {
    let library = ModuleLibrary::new()
        .with_entity(
            EntityDescription::new("stage").port(DiscoveredPort::bit("ready", Direction::Out)),
        )
        .unwrap();
    let chain = ProcessingChain::new(library);
    let a = chain.add_module("stage", "stage_a").unwrap();
    let b = chain.add_module("stage", "stage_b").unwrap();

    chain.auto_connect().unwrap();

    let bundles = chain.bundles();
    assert_eq!(bundles.len(), 1);
    let bundle = &bundles[0];
    assert_eq!(bundle.op, BundleOp::And);
    assert_eq!(bundle.signal.code_name(), "ready_and");
    assert_eq!(bundle.signal.module(), chain.main());
    assert_eq!(
        bundle.members,
        vec![a.get_port("ready").unwrap(), b.get_port("ready").unwrap()]
    );
    assert_eq!(bundle.signal.drivers().len(), 2);
    assert_eq!(bundle.external, chain.main().get_port("ready").unwrap());
    assert_eq!(bundle.external.incoming(), Some(bundle.signal.clone()));
    assert!(chain.top().get_port("ready").is_some());
}

#[test]
fn test_register_interface_in_subgroup_reaches_manager() {
    let library = ModuleLibrary::new()
        .with_entity(
            EntityDescription::new("as_regmgr")
                .generic("REG_COUNT", None)
                .generic("MODULE_BASEADDR", None)
                .port(DiscoveredPort::new(
                    "slv_ctrl_reg",
                    Direction::Out,
                    "slv_reg_data",
                    "0 to REG_COUNT-1",
                ))
                .port(DiscoveredPort::new(
                    "slv_status_reg",
                    Direction::In,
                    "slv_reg_data",
                    "0 to REG_COUNT-1",
                ))
                .port(DiscoveredPort::vector(
                    "slv_reg_modify",
                    Direction::In,
                    "0 to REG_COUNT-1",
                ))
                .port(DiscoveredPort::new(
                    "slv_reg_config",
                    Direction::In,
                    "slv_reg_config_table",
                    "0 to REG_COUNT-1",
                )),
        )
        .unwrap()
        .with_entity(
            EntityDescription::new("filter")
                .constant("slave_register_configuration", r#"("10","01")"#)
                .port(DiscoveredPort::new("slv_ctrl_reg", Direction::In, "slv_reg_data", "0 to 1"))
                .port(DiscoveredPort::new("slv_status_reg", Direction::Out, "slv_reg_data", "0 to 1"))
                .port(DiscoveredPort::vector("slv_reg_modify", Direction::Out, "0 to 1"))
                .port(DiscoveredPort::new(
                    "slv_reg_config",
                    Direction::Out,
                    "slv_reg_config_table",
                    "0 to 1",
                )),
        )
        .unwrap();
    let chain = ProcessingChain::new(library);
    let group = chain.add_module_group("pipeline").unwrap();
    let filter = group.add_module("filter", "filter").unwrap();

    chain.auto_connect().unwrap();

    let managers = chain.auto_instantiated();
    assert_eq!(managers.len(), 1);
    assert_eq!(managers[0].name(), "filter_as_regmgr");
    assert_eq!(managers[0].parent(), Some(chain.main()));
    assert!(!managers[0].is_user_authored());

    let regs = filter.register_interfaces();
    assert_eq!(regs.len(), 1);
    assert!(regs[0].is_connected());
    assert_eq!(regs[0].base_address(), Some(ChainConfig::default().base_address));
    assert_eq!(regs[0].register_state(), Some(RegisterState::Connected));

    let on_group = group.interfaces();
    assert_eq!(on_group.len(), 1);
    assert_eq!(on_group[0].origin(), Some(regs[0].clone()));
    assert_eq!(
        on_group[0].incoming(),
        managers[0].interfaces()
    );
}
