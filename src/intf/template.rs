// SPDX-License-Identifier: Apache-2.0

use crate::{Action, Condition, Direction, Rule};

/// One port of an interface template.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TemplatePort {
    /// Function name matched against the code names of discovered ports.
    pub name: String,
    /// Direction seen from an interface of direction `in`.
    pub direction: Direction,
    pub data_type: String,
    pub optional: bool,
    /// Rules added in front of the default rules of matching ports.
    pub rules: Vec<Rule>,
}

impl TemplatePort {
    pub fn new(name: &str) -> Self {
        TemplatePort {
            name: name.to_string(),
            direction: Direction::In,
            data_type: "std_logic".to_string(),
            optional: false,
            rules: Vec::new(),
        }
    }

    pub fn direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    pub fn data_type(mut self, data_type: &str) -> Self {
        self.data_type = data_type.to_string();
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }
}

/// Shape of an interface type. Ports discovered on an entity are grouped
/// into interfaces by matching them against templates.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InterfaceTemplate {
    pub type_name: String,
    pub ports: Vec<TemplatePort>,
    /// Interfaces of this type are propagated up to the top level unless
    /// connected.
    pub to_external: bool,
    /// Entity to instantiate for each interface of this type, and the name
    /// of the module group it is placed in (empty for the top level).
    pub instantiate: Option<(String, String)>,
    /// Interfaces of this type are register interfaces.
    pub register: bool,
}

impl InterfaceTemplate {
    pub fn new(type_name: &str) -> Self {
        InterfaceTemplate {
            type_name: type_name.to_string(),
            ports: Vec::new(),
            to_external: false,
            instantiate: None,
            register: false,
        }
    }

    pub fn port(mut self, port: TemplatePort) -> Self {
        self.ports.push(port);
        self
    }

    pub fn get_port(&self, name: &str) -> Option<&TemplatePort> {
        self.ports.iter().find(|p| p.name == name)
    }

    /// Template ports that must be present for an interface to be complete.
    pub fn mandatory_ports(&self) -> impl Iterator<Item = &TemplatePort> {
        self.ports.iter().filter(|p| !p.optional)
    }
}

/// Streaming pixel interface.
pub fn as_stream() -> InterfaceTemplate {
    let fallback = |name: &str| {
        Rule::new(Condition::SinkMissing, Action::FallbackPort(name.to_string()))
    };
    InterfaceTemplate::new("as_stream")
        .port(TemplatePort::new("strobe"))
        .port(TemplatePort::new("data").data_type("std_logic_vector"))
        .port(TemplatePort::new("data_error").optional())
        .port(TemplatePort::new("stall").direction(Direction::Out).optional())
        .port(TemplatePort::new("vsync").optional())
        .port(
            TemplatePort::new("vcomplete")
                .optional()
                .rule(fallback("vsync"))
                .rule(fallback("data_unit_complete")),
        )
        .port(TemplatePort::new("hsync").optional())
        .port(TemplatePort::new("hcomplete").optional().rule(fallback("hsync")))
        .port(TemplatePort::new("xres").data_type("std_logic_vector").optional())
        .port(TemplatePort::new("yres").data_type("std_logic_vector").optional())
        .port(TemplatePort::new("data_unit_complete").optional())
}

/// Register interface between a module and its register manager.
pub fn slave_register_interface(manager_entity: &str, manager_group: &str) -> InterfaceTemplate {
    let mut template = InterfaceTemplate::new("slv_reg_interface")
        .port(TemplatePort::new("slv_ctrl_reg").data_type("slv_reg_data"))
        .port(
            TemplatePort::new("slv_status_reg")
                .direction(Direction::Out)
                .data_type("slv_reg_data"),
        )
        .port(
            TemplatePort::new("slv_reg_modify")
                .direction(Direction::Out)
                .data_type("std_logic_vector"),
        )
        .port(
            TemplatePort::new("slv_reg_config")
                .direction(Direction::Out)
                .data_type("slv_reg_config_table"),
        );
    template.register = true;
    template.instantiate = Some((manager_entity.to_string(), manager_group.to_string()));
    template
}

/// Parallel camera sensor interface, always routed to the top level.
pub fn camera_interface() -> InterfaceTemplate {
    let mut template = InterfaceTemplate::new("camera_interface")
        .port(TemplatePort::new("reset_n").direction(Direction::Out))
        .port(TemplatePort::new("powerdown").direction(Direction::Out))
        .port(TemplatePort::new("pixclk"))
        .port(TemplatePort::new("frame_valid"))
        .port(TemplatePort::new("line_valid"))
        .port(TemplatePort::new("data").data_type("std_logic_vector"));
    template.to_external = true;
    template
}
