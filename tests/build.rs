// SPDX-License-Identifier: Apache-2.0

use chainstitch::*;

fn library() -> ModuleLibrary {
    let manager_width = "0 to REG_COUNT-1";
    ModuleLibrary::new()
        .with_entity(
            EntityDescription::new("as_regmgr")
                .generic("REG_COUNT", None)
                .generic("MODULE_BASEADDR", None)
                .port(DiscoveredPort::new("slv_ctrl_reg", Direction::Out, "slv_reg_data", manager_width))
                .port(DiscoveredPort::new("slv_status_reg", Direction::In, "slv_reg_data", manager_width))
                .port(DiscoveredPort::vector("slv_reg_modify", Direction::In, manager_width))
                .port(DiscoveredPort::new(
                    "slv_reg_config",
                    Direction::In,
                    "slv_reg_config_table",
                    manager_width,
                )),
        )
        .unwrap()
        .with_entity(
            EntityDescription::new("threshold")
                .constant("slave_register_configuration", r#"("11","01","10")"#)
                .port(DiscoveredPort::new("slv_ctrl_reg", Direction::In, "slv_reg_data", "0 to 2"))
                .port(DiscoveredPort::new("slv_status_reg", Direction::Out, "slv_reg_data", "0 to 2"))
                .port(DiscoveredPort::vector("slv_reg_modify", Direction::Out, "0 to 2"))
                .port(DiscoveredPort::new(
                    "slv_reg_config",
                    Direction::Out,
                    "slv_reg_config_table",
                    "0 to 2",
                )),
        )
        .unwrap()
        .with_entity(EntityDescription::new("stage").port(DiscoveredPort::bit("ready", Direction::Out)))
        .unwrap()
        .with_entity(
            EntityDescription::new("monitor")
                .port(DiscoveredPort::bit("clk", Direction::In))
                .port(DiscoveredPort::bit("dbg", Direction::Out))
                .port(DiscoveredPort::bit("irq", Direction::Out)),
        )
        .unwrap()
}

fn declare(chain: &ProcessingChain) {
    chain.add_module("threshold", "thresh").unwrap();
    chain.add_module("stage", "stage_a").unwrap();
    chain.add_module("stage", "stage_b").unwrap();
    let monitor = chain.add_module("monitor", "monitor").unwrap();
    monitor.set_port_fixed_value("dbg", "'0'").unwrap();
    monitor.set_port_fixed_value("irq", "'0'").unwrap();
}

/// Every port and signal of the chain with its drivers.
fn snapshot(chain: &ProcessingChain) -> Vec<String> {
    chain
        .modules()
        .iter()
        .flat_map(|m| m.all_ports().into_iter().chain(m.signals()))
        .map(|p| {
            let drivers = p
                .drivers()
                .iter()
                .map(|d| d.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            format!("{p} ({}) <- [{drivers}]", p.kind())
        })
        .collect()
}

#[test]
fn test_build_is_deterministic() {
    let _ = env_logger::builder().is_test(true).try_init();
    let first = ProcessingChain::new(library());
    let second = ProcessingChain::new(library());
    declare(&first);
    declare(&second);

    let first_diags = first.auto_connect().unwrap();
    let second_diags = second.auto_connect().unwrap();

    assert_eq!(snapshot(&first), snapshot(&second));
    assert_eq!(first.address_map(), second.address_map());
    assert_eq!(first_diags.report(), second_diags.report());
    assert_eq!(
        first.modules().iter().map(|m| m.name()).collect::<Vec<_>>(),
        second.modules().iter().map(|m| m.name()).collect::<Vec<_>>()
    );
}

#[test]
fn test_single_driver_per_port() {
    let chain = ProcessingChain::new(library());
    declare(&chain);
    chain.auto_connect().unwrap();

    for module in chain.modules() {
        for port in module.all_ports() {
            assert!(
                port.drivers().len() <= 1,
                "{port} has {} drivers",
                port.drivers().len()
            );
        }
    }
    // The bundle signal is the only place several drivers meet.
    let bundles = chain.bundles();
    assert_eq!(bundles.len(), 1);
    assert!(bundles[0].signal.kind().is_signal());
    assert_eq!(bundles[0].signal.drivers().len(), 2);
}

#[test]
fn test_connections_are_never_undone() {
    let chain = ProcessingChain::new(library());
    declare(&chain);
    let before = chain
        .modules()
        .iter()
        .flat_map(|m| m.all_ports().into_iter().chain(m.signals()))
        .filter(|p| p.is_connected())
        .collect::<Vec<_>>();
    assert!(!before.is_empty());

    chain.auto_connect().unwrap();

    for port in &before {
        assert!(port.is_connected(), "{port} lost its connection");
    }
    let monitor = chain.get_module("monitor").unwrap();
    assert!(monitor.is_connected());
    assert!(monitor.get_port("dbg").unwrap().is_tied_off());
}

#[test]
fn test_build_summary() {
    let chain = ProcessingChain::new(library());
    declare(&chain);
    chain.auto_connect().unwrap();

    assert_eq!(chain.auto_instantiated().len(), 1);
    assert_eq!(chain.max_regs_per_module(), 4);
    let map = chain.address_map();
    assert_eq!(map.len(), 3);
    assert!(map.iter().all(|e| e.module == "thresh"));
    assert_eq!(map[0].address, chain.config().base_address);
    assert_eq!(map[2].kind, RegisterKind::SwToHw);
}

#[test]
#[should_panic(expected = "auto_connect has already run")]
fn test_auto_connect_runs_once() {
    let chain = ProcessingChain::new(library());
    declare(&chain);
    let _ = chain.auto_connect();
    let _ = chain.auto_connect();
}

fn pipeline_library() -> ModuleLibrary {
    ModuleLibrary::new()
        .with_entity(
            EntityDescription::new("pass")
                .port(DiscoveredPort::bit("in_strobe", Direction::In))
                .port(DiscoveredPort::vector("in_data", Direction::In, "7 downto 0"))
                .port(DiscoveredPort::bit("out_strobe", Direction::Out))
                .port(DiscoveredPort::vector("out_data", Direction::Out, "7 downto 0")),
        )
        .unwrap()
        .with_entity(
            EntityDescription::new("marker")
                .port(DiscoveredPort::bit("clk", Direction::In))
                .port(DiscoveredPort::bit("frame_sync", Direction::Out)),
        )
        .unwrap()
        .with_entity(
            EntityDescription::new("latch")
                .port(DiscoveredPort::bit("clk", Direction::In))
                .port(DiscoveredPort::bit("frame_sync", Direction::In)),
        )
        .unwrap()
}

#[test]
fn test_connected_modules_form_a_pipeline() {
    let chain = ProcessingChain::new(pipeline_library());
    let a = chain.add_module("pass", "a").unwrap();
    let b = chain.add_module("pass", "b").unwrap();
    let c = chain.add_module("pass", "c").unwrap();
    chain.connect(&a, &b);
    chain.connect(&b, &c);

    let diags = chain.auto_connect().unwrap();
    assert_eq!(diags.error_count(), 0);

    // Data flows a -> b -> c, each hop through a glue signal in main.
    for (from, to) in [(&a, &b), (&b, &c)] {
        let sink = to.get_port("in_data").unwrap();
        let glue = sink.incoming().unwrap();
        assert_eq!(glue.kind(), PortKind::Glue);
        assert_eq!(glue.drivers(), vec![from.get_port("out_data").unwrap()]);
        assert_eq!(
            to.get_port("in_strobe").unwrap().incoming().unwrap().drivers(),
            vec![from.get_port("out_strobe").unwrap()]
        );
        assert_eq!(
            from.get_interface("out").unwrap().outgoing(),
            vec![to.get_interface("in").unwrap()]
        );
    }

    // The ends of the pipeline stay open.
    assert_eq!(a.get_port("in_data").unwrap().incoming(), None);
    assert!(!a.get_interface("in").unwrap().is_connected());
    assert!(c.get_port("out_data").unwrap().outgoing().is_empty());
    assert!(b.get_interface("in").unwrap().is_connected());
    assert!(b.get_interface("out").unwrap().is_connected());
    assert_eq!(b.connections(), vec![a.clone(), c.clone()]);
}

#[test]
fn test_connected_modules_pair_single_ports() {
    let chain = ProcessingChain::new(pipeline_library());
    let marker = chain.add_module("marker", "marker").unwrap();
    let latch = chain.add_module("latch", "latch").unwrap();
    chain.connect(&marker, &latch);

    chain.auto_connect().unwrap();

    let sync_in = latch.get_port("frame_sync").unwrap();
    let glue = sync_in.incoming().unwrap();
    assert_eq!(glue.kind(), PortKind::Glue);
    assert_eq!(glue.module(), chain.main());
    assert_eq!(glue.drivers(), vec![marker.get_port("frame_sync").unwrap()]);
    assert_eq!(marker.connections(), vec![latch.clone()]);

    // Two inputs of the same name are not wired to each other.
    let marker_clk = marker.get_port("clk").unwrap();
    assert!(marker_clk.outgoing().is_empty());
    assert!(!latch.get_port("clk").unwrap().drivers().contains(&marker_clk));
}

#[test]
fn test_connected_modules_without_counterparts() {
    let chain = ProcessingChain::new(pipeline_library());
    let latch = chain.add_module("latch", "latch").unwrap();
    let marker = chain.add_module("marker", "marker").unwrap();
    // Wrong way round: the latch has no outputs for the marker's inputs.
    chain.connect(&latch, &marker);

    let err = chain.auto_connect().unwrap_err();
    assert!(
        err.diagnostics
            .with_severity(Severity::Error)
            .any(|d| d.kind == DiagnosticKind::Connection
                && d.message.contains("no matching interfaces or ports"))
    );
    assert!(latch.get_port("frame_sync").unwrap().incoming().is_none());
}
