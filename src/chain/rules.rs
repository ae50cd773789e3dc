// SPDX-License-Identifier: Apache-2.0

//! Port rule evaluation. Each port carries an ordered list of
//! `condition -> action` rules that decide what happens to it when a
//! counterpart is (or is not) available.

use crate::chain::core::{BundleOp, ChainCore, InterfaceId, ModuleId, PortId};
use crate::diagnostics::{DiagnosticKind, Diagnostics, Severity};
use crate::port::PortKind;
use crate::rule::RuleFacts;
use crate::{Action, ChainError};

/// Outcome of evaluating the rules of one port.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Resolution {
    Unresolved,
    /// Wire the port to this port.
    Target(PortId),
    /// Wire the port to this port; a later regular connection may replace
    /// the link.
    Fallback(PortId),
    /// The port was handled without a target (bound to a value or bundled).
    Terminated,
}

/// Where fallback actions look for the ports they name.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct RuleContext {
    pub(crate) counterpart_intf: Option<InterfaceId>,
    pub(crate) counterpart_module: Option<ModuleId>,
}

impl ChainCore {
    fn rule_facts(&self, port: PortId, sink: Option<PortId>) -> RuleFacts {
        let p = &self.ports[port.0];
        RuleFacts {
            source_present: true,
            sink_present: sink.is_some(),
            single: p.interface.is_none(),
            external: p.kind == PortKind::External,
            sink_is_signal: sink.is_some_and(|s| self.ports[s.0].kind.is_signal()),
            connected: p.connected,
        }
    }

    /// Evaluates the rules of `port` against the candidate `sink`.
    ///
    /// Rules are visited in order and every rule whose condition holds
    /// applies its action. A later target replaces an earlier one, while
    /// fallbacks and fixed values only apply as long as there is none. A
    /// bundle action takes over the port regardless. An `error` action
    /// aborts with a `ChainError`.
    pub(crate) fn apply_rules(
        &mut self,
        port: PortId,
        sink: Option<PortId>,
        ctx: RuleContext,
        diags: &mut Diagnostics,
    ) -> Result<Resolution, ChainError> {
        let rules = self.ports[port.0].rules.iter().cloned().collect::<Vec<_>>();
        let intf_connected = self.ports[port.0]
            .interface
            .is_some_and(|i| self.interfaces[i.0].connected);
        let mut resolution = Resolution::Unresolved;

        for rule in rules {
            if !rule.condition.holds(&self.rule_facts(port, sink)) {
                continue;
            }
            if rule.action.is_diagnostic() && (intf_connected || resolution != Resolution::Unresolved) {
                continue;
            }
            log::trace!("Rule '{}' applies to '{}'", rule, self.port_path(port));
            match &rule.action {
                Action::Connect | Action::ForceConnect => {
                    let Some(sink) = sink else { continue };
                    if resolution == Resolution::Terminated {
                        continue;
                    }
                    let check_name = rule.action == Action::Connect;
                    if self.can_connect(port, sink, check_name, diags) {
                        resolution = Resolution::Target(sink);
                    }
                }
                Action::MakeExternal => {
                    let owner = self.port_owner(port);
                    if resolution != Resolution::Terminated && owner != self.top {
                        resolution = Resolution::Target(self.make_external(port));
                    }
                }
                Action::BundleAnd => resolution = self.bundle(port, BundleOp::And),
                Action::BundleOr => resolution = self.bundle(port, BundleOp::Or),
                Action::FallbackPort(name) => {
                    if resolution == Resolution::Unresolved {
                        if let Some(found) = self.fallback_port(port, sink, ctx, name) {
                            resolution = Resolution::Fallback(found);
                        }
                    }
                }
                Action::FallbackSignal(name) => {
                    if resolution == Resolution::Unresolved {
                        if let Some(found) = self.fallback_signal(port, name) {
                            resolution = Resolution::Fallback(found);
                        }
                    }
                }
                Action::SetValue(value) => {
                    if resolution == Resolution::Unresolved {
                        log::debug!("Binding '{}' to {}", self.port_path(port), value);
                        let p = &mut self.ports[port.0];
                        p.fixed_value = Some(value.clone());
                        p.connected = true;
                        p.in_entity = false;
                        let intf = p.interface;
                        if let Some(intf) = intf {
                            self.update_interface_connected(intf);
                        }
                        resolution = Resolution::Terminated;
                    }
                }
                Action::Note | Action::Warning => {
                    let severity = if rule.action == Action::Note {
                        Severity::Note
                    } else {
                        Severity::Warning
                    };
                    diags.push(
                        severity,
                        DiagnosticKind::Rule,
                        Some(self.port_path(port)),
                        format!("no counterpart found (rule '{rule}')"),
                    );
                    // Reported once per port.
                    self.ports[port.0].rules.remove(rule.condition, &rule.action);
                }
                Action::Error => {
                    return Err(ChainError::Connection {
                        subject: self.port_path(port),
                        msg: format!("rule '{rule}' rejects the port"),
                        severity: Severity::Error,
                    });
                }
                Action::None => {}
            }
        }
        Ok(resolution)
    }

    /// Applies the rules of `port` and carries out the outcome. Returns
    /// whether the port ended up handled.
    pub(crate) fn resolve_port(
        &mut self,
        port: PortId,
        sink: Option<PortId>,
        ctx: RuleContext,
        diags: &mut Diagnostics,
    ) -> Result<bool, ChainError> {
        Ok(match self.apply_rules(port, sink, ctx, diags)? {
            Resolution::Unresolved => false,
            Resolution::Target(target) => self.establish(port, target, diags),
            Resolution::Fallback(target) => {
                let done = self.establish(port, target, diags);
                let (_, driven) = self.orient(port, target);
                if done && !self.ports[driven.0].kind.is_signal() {
                    self.ports[driven.0].fallback_driven = true;
                }
                done
            }
            Resolution::Terminated => true,
        })
    }

    /// Looks for the port `name` on the counterpart interface, the
    /// counterpart module, the sink's module and the enclosing group, in
    /// that order. A candidate that would need a second driver is skipped.
    fn fallback_port(&self, port: PortId, sink: Option<PortId>, ctx: RuleContext, name: &str) -> Option<PortId> {
        let parent = self.parent(self.port_owner(port));
        let candidates = [
            ctx.counterpart_intf.and_then(|i| self.interface_port(i, name)),
            ctx.counterpart_module.and_then(|m| self.find_port(m, name)),
            sink.and_then(|s| self.find_port(self.port_owner(s), name)),
            parent.and_then(|g| self.find_port(g, name)),
        ];
        candidates.into_iter().flatten().find(|found| {
            if *found == port {
                return false;
            }
            let (_, driven) = self.orient(port, *found);
            let f = &self.ports[found.0];
            !(driven == *found && !f.kind.is_signal() && !f.incoming.is_empty())
        })
    }

    /// Looks for the signal `name` in the enclosing groups, innermost first.
    fn fallback_signal(&self, port: PortId, name: &str) -> Option<PortId> {
        let mut group = self.parent(self.port_owner(port));
        while let Some(g) = group {
            if let Some(found) = self.find_signal(g, name) {
                return Some(found);
            }
            group = self.parent(g);
        }
        None
    }
}
