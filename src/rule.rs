// SPDX-License-Identifier: Apache-2.0

use std::fmt;
use std::str::FromStr;

use crate::ChainError;

/// Condition under which a port rule fires. The "source" is the port whose
/// rules are evaluated; the "sink" is the candidate counterpart, if any.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Condition {
    AnyMissing,
    AnyPresent,
    BothMissing,
    BothPresent,
    SinkPresent,
    SinkMissing,
    SourcePresent,
    SourceMissing,
    /// The source is a standalone port outside any interface.
    SinglePort,
    /// The source is an external port.
    ExternalPort,
    /// The counterpart is a signal of a module group.
    TypeSignal,
    /// The source port already has a connection.
    IsConnected,
}

impl Condition {
    const ALL: [Condition; 12] = [
        Condition::AnyMissing,
        Condition::AnyPresent,
        Condition::BothMissing,
        Condition::BothPresent,
        Condition::SinkPresent,
        Condition::SinkMissing,
        Condition::SourcePresent,
        Condition::SourceMissing,
        Condition::SinglePort,
        Condition::ExternalPort,
        Condition::TypeSignal,
        Condition::IsConnected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Condition::AnyMissing => "any_missing",
            Condition::AnyPresent => "any_present",
            Condition::BothMissing => "both_missing",
            Condition::BothPresent => "both_present",
            Condition::SinkPresent => "sink_present",
            Condition::SinkMissing => "sink_missing",
            Condition::SourcePresent => "source_present",
            Condition::SourceMissing => "source_missing",
            Condition::SinglePort => "single_port",
            Condition::ExternalPort => "external_port",
            Condition::TypeSignal => "type_signal",
            Condition::IsConnected => "is_connected",
        }
    }

    /// Evaluates the condition against the facts gathered for one port.
    pub(crate) fn holds(&self, facts: &RuleFacts) -> bool {
        let (src, sink) = (facts.source_present, facts.sink_present);
        match self {
            Condition::AnyMissing => !src || !sink,
            Condition::AnyPresent => src || sink,
            Condition::BothMissing => !src && !sink,
            Condition::BothPresent => src && sink,
            Condition::SinkPresent => sink,
            Condition::SinkMissing => !sink,
            Condition::SourcePresent => src,
            Condition::SourceMissing => !src,
            Condition::SinglePort => facts.single,
            Condition::ExternalPort => facts.external,
            Condition::TypeSignal => facts.sink_is_signal,
            Condition::IsConnected => facts.connected,
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Condition {
    type Err = ChainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        Condition::ALL
            .iter()
            .find(|c| c.as_str() == name)
            .copied()
            .ok_or_else(|| ChainError::RuleViolation {
                text: s.to_string(),
                msg: "unknown rule condition".to_string(),
            })
    }
}

/// Action applied when a rule's condition holds.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Action {
    /// Wire source and sink if names, directions, types and widths agree.
    Connect,
    /// Like `Connect`, without requiring the port names to match.
    ForceConnect,
    /// Expose the port at every level up to the top, then target the copy
    /// one level up.
    MakeExternal,
    /// Combine with other ports of the same name through an AND reduction.
    BundleAnd,
    /// Combine with other ports of the same name through an OR reduction.
    BundleOr,
    /// Use the named port of the enclosing group if nothing else matched.
    FallbackPort(String),
    /// Use the named signal of the enclosing group if nothing else matched.
    FallbackSignal(String),
    /// Bind the port to a literal if nothing else matched.
    SetValue(String),
    Note,
    Warning,
    Error,
    None,
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::Connect => "connect",
            Action::ForceConnect => "forceconnect",
            Action::MakeExternal => "make_external",
            Action::BundleAnd => "bundle_and",
            Action::BundleOr => "bundle_or",
            Action::FallbackPort(_) => "fallback_port",
            Action::FallbackSignal(_) => "fallback_signal",
            Action::SetValue(_) => "set_value",
            Action::Note => "note",
            Action::Warning => "warning",
            Action::Error => "error",
            Action::None => "none",
        }
    }

    /// Diagnostic actions are skipped for ports of already connected
    /// interfaces.
    pub(crate) fn is_diagnostic(&self) -> bool {
        matches!(self, Action::Note | Action::Warning | Action::Error)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::FallbackPort(arg) | Action::FallbackSignal(arg) | Action::SetValue(arg) => {
                write!(f, "{}({})", self.name(), arg)
            }
            _ => f.write_str(self.name()),
        }
    }
}

impl FromStr for Action {
    type Err = ChainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        let violation = |msg: &str| ChainError::RuleViolation {
            text: s.to_string(),
            msg: msg.to_string(),
        };
        let (name, arg) = match text.find('(') {
            Some(open) => {
                let inner = text[open + 1..]
                    .strip_suffix(')')
                    .ok_or_else(|| violation("unbalanced parentheses"))?;
                (&text[..open], Some(inner.trim()))
            }
            None => (text, None),
        };
        let with_arg = |make: fn(String) -> Action| match arg {
            Some(arg) if !arg.is_empty() => Ok(make(arg.to_string())),
            _ => Err(violation("action requires an argument")),
        };
        let bare = |action: Action| match arg {
            None => Ok(action),
            Some(_) => Err(violation("action takes no argument")),
        };
        match name.trim() {
            "connect" => bare(Action::Connect),
            "forceconnect" => bare(Action::ForceConnect),
            "make_external" => bare(Action::MakeExternal),
            "bundle_and" => bare(Action::BundleAnd),
            "bundle_or" => bare(Action::BundleOr),
            "fallback_port" => with_arg(Action::FallbackPort),
            "fallback_signal" => with_arg(Action::FallbackSignal),
            "set_value" => with_arg(Action::SetValue),
            "note" => bare(Action::Note),
            "warning" => bare(Action::Warning),
            "error" => bare(Action::Error),
            "none" => bare(Action::None),
            _ => Err(violation("unknown rule action")),
        }
    }
}

/// A single `condition -> action` pair.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Rule {
    pub condition: Condition,
    pub action: Action,
}

impl Rule {
    pub fn new(condition: Condition, action: Action) -> Self {
        Rule { condition, action }
    }

    /// Parses a rule from its textual condition and action, e.g.
    /// `Rule::parse("sink_missing", "set_value('0')")`.
    pub fn parse(condition: &str, action: &str) -> Result<Rule, ChainError> {
        Ok(Rule {
            condition: condition.parse()?,
            action: action.parse()?,
        })
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.condition, self.action)
    }
}

/// Facts about a port and its candidate counterpart that conditions are
/// evaluated against.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct RuleFacts {
    pub(crate) source_present: bool,
    pub(crate) sink_present: bool,
    pub(crate) single: bool,
    pub(crate) external: bool,
    pub(crate) sink_is_signal: bool,
    pub(crate) connected: bool,
}

/// Ordered rules of a port. Earlier rules are evaluated first; rules added by
/// the user are placed in front of the defaults.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl Default for RuleSet {
    /// `both_present -> connect`, then `sink_missing -> note`.
    fn default() -> Self {
        RuleSet {
            rules: vec![
                Rule::new(Condition::BothPresent, Action::Connect),
                Rule::new(Condition::SinkMissing, Action::Note),
            ],
        }
    }
}

impl RuleSet {
    pub fn empty() -> Self {
        RuleSet { rules: Vec::new() }
    }

    /// Rules of standard ports (clock, reset, ...): the `*_missing` defaults
    /// are replaced by `external_port -> make_external`.
    pub fn standard() -> Self {
        let mut rules = RuleSet::default();
        rules.remove_condition(Condition::SinkMissing);
        rules.remove_condition(Condition::SourceMissing);
        rules.append(Rule::new(Condition::ExternalPort, Action::MakeExternal));
        rules
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn contains(&self, condition: Condition, action: &Action) -> bool {
        self.rules
            .iter()
            .any(|r| r.condition == condition && &r.action == action)
    }

    /// Adds a rule with priority over every existing rule. An identical rule
    /// already present is moved to the front.
    pub fn prepend(&mut self, rule: Rule) {
        self.rules.retain(|r| r != &rule);
        self.rules.insert(0, rule);
    }

    /// Adds a rule after the existing ones unless it is already present.
    pub fn append(&mut self, rule: Rule) {
        if !self.rules.contains(&rule) {
            self.rules.push(rule);
        }
    }

    /// Removes one `condition -> action` pair. Returns whether it existed.
    pub fn remove(&mut self, condition: Condition, action: &Action) -> bool {
        let before = self.rules.len();
        self.rules
            .retain(|r| !(r.condition == condition && &r.action == action));
        before != self.rules.len()
    }

    /// Removes every rule with the given condition and returns how many were
    /// removed.
    pub fn remove_condition(&mut self, condition: Condition) -> usize {
        let before = self.rules.len();
        self.rules.retain(|r| r.condition != condition);
        before - self.rules.len()
    }

    /// Replaces all rules for `rule.condition` with `rule`, at top priority.
    pub fn overwrite(&mut self, rule: Rule) {
        self.remove_condition(rule.condition);
        self.rules.insert(0, rule);
    }

    pub fn clear(&mut self) {
        self.rules.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_actions() {
        assert_eq!("connect".parse::<Action>(), Ok(Action::Connect));
        assert_eq!(
            "set_value('0')".parse::<Action>(),
            Ok(Action::SetValue("'0'".to_string()))
        );
        assert_eq!(
            " fallback_port( vsync ) ".parse::<Action>(),
            Ok(Action::FallbackPort("vsync".to_string()))
        );
        assert_eq!(
            "set_value((others => '0'))".parse::<Action>(),
            Ok(Action::SetValue("(others => '0')".to_string()))
        );
    }

    #[test]
    fn test_parse_rejects_unknown() {
        assert!(matches!(
            "explode".parse::<Action>(),
            Err(ChainError::RuleViolation { .. })
        ));
        assert!(matches!(
            "set_value".parse::<Action>(),
            Err(ChainError::RuleViolation { .. })
        ));
        assert!(matches!(
            "connect(x)".parse::<Action>(),
            Err(ChainError::RuleViolation { .. })
        ));
        assert!(matches!(
            "sink_gone".parse::<Condition>(),
            Err(ChainError::RuleViolation { .. })
        ));
    }

    #[test]
    fn test_display_round_trips_payload() {
        let rule = Rule::parse("sink_missing", "set_value(0)").unwrap();
        assert_eq!(rule.to_string(), "sink_missing -> set_value(0)");
    }

    #[test]
    fn test_standard_ruleset() {
        let rules = RuleSet::standard();
        let listed = rules.iter().map(|r| r.to_string()).collect::<Vec<_>>();
        assert_eq!(
            listed,
            vec!["both_present -> connect", "external_port -> make_external"]
        );
    }

    #[test]
    fn test_prepend_takes_priority() {
        let mut rules = RuleSet::default();
        rules.prepend(Rule::new(Condition::SinkMissing, Action::SetValue("0".into())));
        assert_eq!(
            rules.iter().next(),
            Some(&Rule::new(Condition::SinkMissing, Action::SetValue("0".into())))
        );
        assert_eq!(rules.len(), 3);
        rules.overwrite(Rule::new(Condition::SinkMissing, Action::None));
        assert_eq!(rules.len(), 2);
        assert!(rules.contains(Condition::SinkMissing, &Action::None));
    }
}
