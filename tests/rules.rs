// SPDX-License-Identifier: Apache-2.0

use chainstitch::*;

fn library() -> ModuleLibrary {
    ModuleLibrary::bare()
        .with_entity(
            EntityDescription::new("gate")
                .port(DiscoveredPort::bit("enable", Direction::In))
                .port(DiscoveredPort::bit("sync_in", Direction::In)),
        )
        .unwrap()
}

#[test]
fn test_set_value_takes_priority_over_note() {
    let chain = ProcessingChain::new(library());
    let a = chain.add_module("gate", "a").unwrap();
    let b = chain.add_module("gate", "b").unwrap();
    for module in [&a, &b] {
        module.set_port_fixed_value("sync_in", "'0'").unwrap();
    }
    a.port_rule_add("enable", "sink_missing", "set_value('1')")
        .unwrap();
    assert_eq!(
        a.get_port("enable").unwrap().rules().iter().next(),
        Some(&Rule::new(
            Condition::SinkMissing,
            Action::SetValue("'1'".to_string())
        ))
    );

    let diags = chain.auto_connect().unwrap();

    let enable = a.get_port("enable").unwrap();
    assert_eq!(enable.fixed_value(), Some("'1'".to_string()));
    assert!(enable.is_connected());
    assert!(!enable.in_entity());
    assert!(a.is_connected());

    // The unhandled port is reported exactly once.
    let notes = diags
        .with_severity(Severity::Note)
        .filter(|d| d.kind == DiagnosticKind::Rule)
        .collect::<Vec<_>>();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].subject.as_deref(), Some("b.enable"));
    assert!(!b.get_port("enable").unwrap().is_connected());
    assert_eq!(b.get_unconnected_ports(), vec![b.get_port("enable").unwrap()]);
}

#[test]
fn test_error_rule_fails_the_build() {
    let chain = ProcessingChain::new(library());
    let gate = chain.add_module("gate", "gate").unwrap();
    gate.set_port_fixed_value("sync_in", "'0'").unwrap();
    gate.port_rule_add("enable", "sink_missing", "error").unwrap();

    let err = chain.auto_connect().unwrap_err();
    assert!(err.fatal.is_none());
    let first = err
        .diagnostics
        .with_severity(Severity::Error)
        .next()
        .unwrap();
    assert_eq!(first.kind, DiagnosticKind::Connection);
    assert_eq!(first.subject.as_deref(), Some("gate.enable"));
    assert!(err.report().starts_with(&format!(
        "{} error(s):",
        err.diagnostics.error_count()
    )));
}

#[test]
fn test_rule_violation() {
    let chain = ProcessingChain::new(library());
    let gate = chain.add_module("gate", "gate").unwrap();
    let before = gate.get_port("enable").unwrap().rules();

    let bad = gate.port_rule_add("enable", "sink_gone", "note");
    assert!(matches!(bad, Err(ChainError::RuleViolation { .. })));
    assert_eq!(bad.unwrap_err().severity(), Severity::Warning);
    assert!(matches!(
        gate.port_rule_add("enable", "sink_missing", "set_value"),
        Err(ChainError::RuleViolation { .. })
    ));
    assert!(matches!(
        gate.port_rule_add("missing", "sink_missing", "note"),
        Err(ChainError::NotFound { what: "port", .. })
    ));
    assert_eq!(gate.get_port("enable").unwrap().rules(), before);
}

#[test]
fn test_rule_edits() {
    let chain = ProcessingChain::new(library());
    let gate = chain.add_module("gate", "gate").unwrap();
    assert_eq!(
        gate.port_rule_remove("enable", "sink_missing", "note"),
        Ok(true)
    );
    assert_eq!(
        gate.port_rule_remove("enable", "sink_missing", "note"),
        Ok(false)
    );
    gate.port_rule_overwrite("enable", "both_present", "forceconnect")
        .unwrap();
    let rules = gate.get_port("enable").unwrap().rules();
    assert_eq!(
        rules.iter().map(|r| r.to_string()).collect::<Vec<_>>(),
        vec!["both_present -> forceconnect"]
    );
    gate.port_set_rules("enable", RuleSet::empty()).unwrap();
    assert!(gate.get_port("enable").unwrap().rules().is_empty());
}

#[test]
fn test_fallback_signal() {
    let chain = ProcessingChain::new(library());
    let sync = chain
        .main()
        .define_signal("frame_sync", "std_logic", "")
        .unwrap();
    let gate = chain.add_module("gate", "gate").unwrap();
    gate.set_port_fixed_value("enable", "'1'").unwrap();
    gate.port_rule_add("sync_in", "sink_missing", "fallback_signal(frame_sync)")
        .unwrap();

    let diags = chain.auto_connect().unwrap();
    assert_eq!(diags.with_severity(Severity::Note).count(), 0);

    let sync_in = gate.get_port("sync_in").unwrap();
    assert_eq!(sync_in.incoming(), Some(sync.clone()));
    assert_eq!(sync.outgoing(), vec![sync_in]);
    assert!(gate.is_connected());
}

#[test]
fn test_fallback_port_of_enclosing_group() {
    let chain = ProcessingChain::new(library());
    let group = chain.add_module_group("frontend").unwrap();
    let start = group
        .define_port("start", Direction::In, "std_logic", "")
        .unwrap();
    let gate = group.add_module("gate", "gate").unwrap();
    gate.set_port_fixed_value("sync_in", "'0'").unwrap();
    gate.port_rule_add("enable", "sink_missing", "fallback_port(start)")
        .unwrap();

    chain.auto_connect().unwrap();

    let enable = gate.get_port("enable").unwrap();
    assert_eq!(enable.incoming(), Some(start.clone()));
    assert!(start.is_connected());
}

#[test]
fn test_explicit_connection_wins_over_default_note() {
    let library = library()
        .with_entity(EntityDescription::new("pulse").port(DiscoveredPort::bit("sync_out", Direction::Out)))
        .unwrap();
    let chain = ProcessingChain::new(library);
    let pulse = chain.add_module("pulse", "pulse").unwrap();
    let gate = chain.add_module("gate", "gate").unwrap();
    gate.set_port_fixed_value("enable", "'1'").unwrap();
    chain.connect(
        pulse.get_port("sync_out").unwrap(),
        gate.get_port("sync_in").unwrap(),
    );

    let diags = chain.auto_connect().unwrap();
    assert!(diags.is_empty());
    assert_eq!(
        gate.get_port("sync_in").unwrap().incoming().unwrap().kind(),
        PortKind::Glue
    );
    assert_eq!(pulse.connections(), vec![gate.clone()]);
    assert_eq!(gate.connections(), vec![pulse]);
}
