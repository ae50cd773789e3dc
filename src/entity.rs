// SPDX-License-Identifier: Apache-2.0

use indexmap::IndexMap;

use crate::intf::template;
use crate::{Action, ChainError, Condition, Direction, InterfaceTemplate, PortKind, Rule, RuleSet};

/// A port as extracted from an entity declaration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DiscoveredPort {
    pub code_name: String,
    pub direction: Direction,
    pub data_type: String,
    /// Raw range text, e.g. `DATA_WIDTH - 1 downto 0`. Empty for scalars.
    pub width: String,
}

impl DiscoveredPort {
    pub fn new(code_name: &str, direction: Direction, data_type: &str, width: &str) -> Self {
        DiscoveredPort {
            code_name: code_name.to_string(),
            direction,
            data_type: data_type.to_string(),
            width: width.to_string(),
        }
    }

    /// Single-bit `std_logic` port.
    pub fn bit(code_name: &str, direction: Direction) -> Self {
        DiscoveredPort::new(code_name, direction, "std_logic", "")
    }

    /// `std_logic_vector` port with the given range.
    pub fn vector(code_name: &str, direction: Direction, width: &str) -> Self {
        DiscoveredPort::new(code_name, direction, "std_logic_vector", width)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DiscoveredGeneric {
    pub code_name: String,
    pub default: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DiscoveredConstant {
    pub code_name: String,
    pub value: String,
}

/// Ports, generics and constants of one entity, as produced by the front
/// end parsing component sources.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntityDescription {
    pub entity_name: String,
    pub ports: Vec<DiscoveredPort>,
    pub generics: Vec<DiscoveredGeneric>,
    pub constants: Vec<DiscoveredConstant>,
}

impl EntityDescription {
    pub fn new(entity_name: &str) -> Self {
        EntityDescription {
            entity_name: entity_name.to_string(),
            ports: Vec::new(),
            generics: Vec::new(),
            constants: Vec::new(),
        }
    }

    pub fn port(mut self, port: DiscoveredPort) -> Self {
        self.ports.push(port);
        self
    }

    pub fn generic(mut self, code_name: &str, default: Option<&str>) -> Self {
        self.generics.push(DiscoveredGeneric {
            code_name: code_name.to_string(),
            default: default.map(str::to_string),
        });
        self
    }

    pub fn constant(mut self, code_name: &str, value: &str) -> Self {
        self.constants.push(DiscoveredConstant {
            code_name: code_name.to_string(),
            value: value.to_string(),
        });
        self
    }

    /// Structural checks run before a module is built from the description.
    pub(crate) fn validate(&self) -> Result<(), ChainError> {
        let fail = |msg: String| ChainError::Discovery {
            entity: self.entity_name.clone(),
            msg,
        };
        if self.entity_name.trim().is_empty() {
            return Err(fail("entity name is empty".to_string()));
        }
        let mut seen = IndexMap::new();
        for port in &self.ports {
            if port.code_name.trim().is_empty() {
                return Err(fail("port with empty name".to_string()));
            }
            if seen.insert(port.code_name.to_ascii_lowercase(), ()).is_some() {
                return Err(fail(format!("duplicate port '{}'", port.code_name)));
            }
            if port.data_type.trim().is_empty() {
                return Err(fail(format!("port '{}' has no data type", port.code_name)));
            }
        }
        let mut seen = IndexMap::new();
        for generic in &self.generics {
            if seen.insert(generic.code_name.to_ascii_lowercase(), ()).is_some() {
                return Err(fail(format!("duplicate generic '{}'", generic.code_name)));
            }
        }
        Ok(())
    }
}

/// A standard port (clock, reset, ...) recognized by exact name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StandardPortTemplate {
    pub name: String,
    pub direction: Direction,
    pub kind: PortKind,
    pub data_type: String,
    pub rules: RuleSet,
}

impl StandardPortTemplate {
    fn new(name: &str, direction: Direction, kind: PortKind, extra: &[Rule]) -> Self {
        let mut rules = RuleSet::standard();
        for rule in extra {
            rules.append(rule.clone());
        }
        StandardPortTemplate {
            name: name.to_string(),
            direction,
            kind,
            data_type: "std_logic".to_string(),
            rules,
        }
    }
}

/// The standard ports every module may declare.
pub fn standard_port_templates() -> Vec<StandardPortTemplate> {
    use Direction::{In, Out};
    use PortKind::{External, Single};
    vec![
        StandardPortTemplate::new("clk", In, External, &[]),
        StandardPortTemplate::new(
            "reset",
            In,
            Single,
            &[Rule::new(Condition::ExternalPort, Action::None)],
        ),
        StandardPortTemplate::new("reset_n", In, External, &[]),
        StandardPortTemplate::new("rst", In, External, &[]),
        StandardPortTemplate::new("rst_n", In, External, &[]),
        StandardPortTemplate::new(
            "ready",
            Out,
            Single,
            &[Rule::new(Condition::SinglePort, Action::BundleAnd)],
        ),
        StandardPortTemplate::new(
            "flush",
            In,
            Single,
            &[Rule::new(Condition::SinkMissing, Action::Note)],
        ),
        StandardPortTemplate::new(
            "sync_error_out",
            Out,
            Single,
            &[Rule::new(Condition::SinglePort, Action::BundleOr)],
        ),
        StandardPortTemplate::new("sync_error_in", In, Single, &[]),
    ]
}

/// Entities and interface templates modules are built from.
#[derive(Clone, Debug)]
pub struct ModuleLibrary {
    pub(crate) entities: IndexMap<String, EntityDescription>,
    pub(crate) templates: Vec<InterfaceTemplate>,
    pub(crate) standard_ports: Vec<StandardPortTemplate>,
}

impl Default for ModuleLibrary {
    /// A library with the built-in interface templates and standard ports,
    /// and no entities.
    fn default() -> Self {
        ModuleLibrary {
            entities: IndexMap::new(),
            templates: vec![
                template::as_stream(),
                template::camera_interface(),
                template::slave_register_interface("as_regmgr", "as_main"),
            ],
            standard_ports: standard_port_templates(),
        }
    }
}

impl ModuleLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// A library without any interface templates.
    pub fn bare() -> Self {
        ModuleLibrary {
            entities: IndexMap::new(),
            templates: Vec::new(),
            standard_ports: standard_port_templates(),
        }
    }

    /// Adds an entity description. Fails if an entity of the same name is
    /// already present or the description is malformed.
    pub fn add_entity(&mut self, entity: EntityDescription) -> Result<(), ChainError> {
        entity.validate()?;
        if self.entities.contains_key(&entity.entity_name) {
            return Err(ChainError::Duplicate {
                what: "entity",
                name: entity.entity_name.clone(),
                owner: "module library".to_string(),
            });
        }
        self.entities.insert(entity.entity_name.clone(), entity);
        Ok(())
    }

    pub fn with_entity(mut self, entity: EntityDescription) -> Result<Self, ChainError> {
        self.add_entity(entity)?;
        Ok(self)
    }

    /// Adds an interface template. Templates are matched in insertion order.
    pub fn add_template(&mut self, template: InterfaceTemplate) -> Result<(), ChainError> {
        if self.templates.iter().any(|t| t.type_name == template.type_name) {
            return Err(ChainError::Duplicate {
                what: "interface template",
                name: template.type_name,
                owner: "module library".to_string(),
            });
        }
        self.templates.push(template);
        Ok(())
    }

    pub fn get_entity(&self, name: &str) -> Option<&EntityDescription> {
        self.entities.get(name)
    }

    pub fn get_template(&self, type_name: &str) -> Option<&InterfaceTemplate> {
        self.templates.iter().find(|t| t.type_name == type_name)
    }

    pub(crate) fn template_index(&self, type_name: &str) -> Option<usize> {
        self.templates.iter().position(|t| t.type_name == type_name)
    }
}
