// SPDX-License-Identifier: Apache-2.0

use chainstitch::*;

fn stream_filter() -> EntityDescription {
    EntityDescription::new("stream_filter")
        .port(DiscoveredPort::bit("clk", Direction::In))
        .port(DiscoveredPort::bit("reset", Direction::In))
        .port(DiscoveredPort::bit("in_strobe", Direction::In))
        .port(DiscoveredPort::vector("in_data", Direction::In, "7 downto 0"))
        .port(DiscoveredPort::bit("in_stall", Direction::Out))
        .port(DiscoveredPort::bit("out_strobe", Direction::Out))
        .port(DiscoveredPort::vector("out_data", Direction::Out, "7 downto 0"))
        .port(DiscoveredPort::bit("out_stall", Direction::In))
}

#[test]
fn test_interfaces_named_by_direction() {
    let library = ModuleLibrary::new().with_entity(stream_filter()).unwrap();
    let chain = ProcessingChain::new(library);
    let filter = chain.add_module("stream_filter", "filter").unwrap();

    let names = filter.interfaces().iter().map(|i| i.name()).collect::<Vec<_>>();
    assert_eq!(names, vec!["in", "out"]);

    let input = filter.get_interface("in").unwrap();
    assert_eq!(input.type_name(), "as_stream");
    assert_eq!(input.direction(), Direction::In);
    assert_eq!(input.unique_name(), "filter_as_stream_in");
    assert!(input.is_complete());
    let ports = input.ports().iter().map(|p| p.code_name()).collect::<Vec<_>>();
    assert_eq!(ports, vec!["in_strobe", "in_data", "in_stall"]);
    let stall = input.get_port("stall").unwrap();
    assert!(stall.is_optional());
    assert_eq!(stall.kind(), PortKind::Interface);
    assert_eq!(stall.interface(), Some(input.clone()));

    let output = filter.get_interface("filter_as_stream_out").unwrap();
    assert_eq!(output.direction(), Direction::Out);
    assert_eq!(output.get_port("data").unwrap().code_name(), "out_data");
    assert_eq!(filter.get_interface("as_stream"), Some(input));

    // Standard ports stay outside of interfaces.
    let singles = filter.ports().iter().map(|p| p.code_name()).collect::<Vec<_>>();
    assert_eq!(singles, vec!["clk", "reset"]);
    assert!(filter.get_port("clk").unwrap().is_standard());
    assert_eq!(filter.get_port("clk").unwrap().kind(), PortKind::External);
    assert_eq!(filter.all_ports().len(), 8);
}

#[test]
fn test_interfaces_named_by_prefix() {
    let library = ModuleLibrary::new()
        .with_entity(
            EntityDescription::new("merge")
                .port(DiscoveredPort::bit("left_strobe", Direction::In))
                .port(DiscoveredPort::vector("left_data", Direction::In, "7 downto 0"))
                .port(DiscoveredPort::bit("right_strobe", Direction::In))
                .port(DiscoveredPort::vector("right_data", Direction::In, "7 downto 0")),
        )
        .unwrap();
    let chain = ProcessingChain::new(library);
    let merge = chain.add_module("merge", "merge").unwrap();

    let left = merge.get_interface("left").unwrap();
    let right = merge.get_interface("right").unwrap();
    assert_eq!(left.prefix(), "left_");
    assert_eq!(right.prefix(), "right_");
    assert_eq!(left.suffix(), "");
    assert_eq!(right.unique_name(), "merge_right_as_stream_in");
    assert_eq!(right.get_port("strobe").unwrap().code_name(), "right_strobe");
}

#[test]
fn test_incomplete_interface_dissolved() {
    let library = ModuleLibrary::new()
        .with_entity(
            EntityDescription::new("partial").port(DiscoveredPort::bit("in_strobe", Direction::In)),
        )
        .unwrap();
    let chain = ProcessingChain::new(library);
    let partial = chain.add_module("partial", "partial").unwrap();

    assert!(partial.interfaces().is_empty());
    let strobe = partial.get_port("in_strobe").unwrap();
    assert_eq!(strobe.kind(), PortKind::Single);
    assert_eq!(strobe.name(), "in_strobe");
    assert_eq!(strobe.rules(), RuleSet::default());
}

#[test]
fn test_add_interface_from_single_ports() {
    let library = ModuleLibrary::new()
        .with_entity(
            EntityDescription::new("partial").port(DiscoveredPort::bit("in_strobe", Direction::In)),
        )
        .unwrap();
    let chain = ProcessingChain::new(library);
    let partial = chain.add_module("partial", "partial").unwrap();

    assert!(matches!(
        partial.add_interface("as_stream", Direction::In, &["in_strobe"]),
        Err(ChainError::TemplateMismatch { .. })
    ));
    assert!(matches!(
        partial.add_interface("no_such_type", Direction::In, &["in_strobe"]),
        Err(ChainError::NotFound { .. })
    ));

    let data = partial
        .add_port(DiscoveredPort::vector("in_data", Direction::In, "11 downto 0"))
        .unwrap();
    assert_eq!(data.kind(), PortKind::Single);
    assert!(matches!(
        partial.add_port(DiscoveredPort::bit("in_data", Direction::In)),
        Err(ChainError::Duplicate { what: "port", .. })
    ));

    let intf = partial
        .add_interface("as_stream", Direction::In, &["in_strobe", "in_data"])
        .unwrap();
    assert_eq!(intf.name(), "in");
    assert_eq!(intf.ports().len(), 2);
    assert_eq!(data.kind(), PortKind::Interface);
    assert_eq!(data.name(), "data");
    assert!(partial.ports().is_empty());
    assert_eq!(partial.get_interface("in"), Some(intf));
}

#[test]
fn test_discovery_errors() {
    let duplicate = EntityDescription::new("dup")
        .port(DiscoveredPort::bit("a", Direction::In))
        .port(DiscoveredPort::bit("A", Direction::Out));
    assert!(matches!(
        ModuleLibrary::bare().with_entity(duplicate),
        Err(ChainError::Discovery { .. })
    ));

    let unnamed = EntityDescription::new(" ");
    assert!(matches!(
        ModuleLibrary::bare().with_entity(unnamed),
        Err(ChainError::Discovery { .. })
    ));

    let mut library = ModuleLibrary::bare();
    library
        .add_entity(
            EntityDescription::new("broken")
                .port(DiscoveredPort::vector("data", Direction::In, "7 downto")),
        )
        .unwrap();
    assert!(matches!(
        library.add_entity(EntityDescription::new("broken")),
        Err(ChainError::Duplicate { what: "entity", .. })
    ));
    let chain = ProcessingChain::new(library);
    let err = chain.add_module("broken", "broken").unwrap_err();
    assert!(matches!(err, ChainError::Discovery { ref entity, .. } if entity == "broken"));
    assert!(err.is_fatal());
    assert!(chain.get_module("broken").is_none());
}

#[test]
fn test_duplicate_module_names() {
    let library = ModuleLibrary::new().with_entity(stream_filter()).unwrap();
    let chain = ProcessingChain::new(library);
    chain.add_module("stream_filter", "filter").unwrap();
    assert!(matches!(
        chain.add_module("stream_filter", "filter"),
        Err(ChainError::Duplicate { what: "module", .. })
    ));
    assert!(matches!(
        chain.add_module_group("filter"),
        Err(ChainError::Duplicate { what: "module", .. })
    ));
}

#[test]
#[should_panic(expected = "is not a module group")]
fn test_add_module_to_leaf() {
    let library = ModuleLibrary::new().with_entity(stream_filter()).unwrap();
    let chain = ProcessingChain::new(library);
    let filter = chain.add_module("stream_filter", "filter").unwrap();
    let _ = filter.add_module("stream_filter", "inner");
}

#[test]
fn test_chain_layout() {
    let chain = ProcessingChain::new(ModuleLibrary::new());
    let top = chain.top();
    let main = chain.main();
    assert_eq!(top.name(), "asterics");
    assert_eq!(top.modlevel(), 0);
    assert_eq!(main.name(), "as_main");
    assert_eq!(main.parent(), Some(top.clone()));
    assert_eq!(top.children(), vec![main.clone()]);
    assert!(top.get_signal("clk").is_some());
    assert_eq!(
        main.get_port("reset_n").unwrap().incoming(),
        top.get_signal("reset_n")
    );
    assert_eq!(
        main.get_signal("reset").unwrap().fixed_value(),
        Some("not reset_n".to_string())
    );
}
