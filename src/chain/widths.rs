// SPDX-License-Identifier: Apache-2.0

use crate::chain::core::{ChainCore, GenericId, PortId};
use crate::diagnostics::{Diagnostics, Severity};
use crate::generic::Substitution;
use crate::width::expr::solve_linear;
use crate::{ChainError, DataWidth, GenericValue};

impl ChainCore {
    /// Width of a port with the current generic values substituted. Generics
    /// whose link chain ends without a value contribute the code name of the
    /// last generic in the chain.
    pub(crate) fn resolved_width(&self, port: PortId) -> DataWidth {
        let p = &self.ports[port.0];
        p.width.resolve(|name| {
            let id = p
                .generics
                .iter()
                .copied()
                .find(|g| self.generics[g.0].code_name.eq_ignore_ascii_case(name))
                .or_else(|| self.find_generic(p.module, name))?;
            match self.generic_substitution(id) {
                Substitution::Value(value) => Some(value),
                Substitution::Symbol(symbol) => Some(symbol),
                Substitution::Unresolved => None,
            }
        })
    }

    /// Last generic of each link chain referenced by the port's width that
    /// has no value yet.
    fn unresolved_tails(&self, port: PortId) -> Vec<GenericId> {
        let mut tails = Vec::new();
        for id in self.ports[port.0].generics.iter().copied() {
            if matches!(self.generic_substitution(id), Substitution::Value(_)) {
                continue;
            }
            let mut tail = id;
            for _ in 0..self.generics.len() {
                match self.generics[tail.0].value {
                    GenericValue::Linked(next) => tail = next,
                    _ => break,
                }
            }
            if !tails.contains(&tail) {
                tails.push(tail);
            }
        }
        tails
    }

    /// Makes the widths of `source` and `sink` agree, binding or linking
    /// generics where one side is still symbolic.
    ///
    /// A mismatch that cannot be fixed is recorded as a connection error
    /// (a warning if an engine-instantiated module is involved) and `false`
    /// is returned; generics are left as they were.
    pub(crate) fn manage_widths(&mut self, source: PortId, sink: PortId, diags: &mut Diagnostics) -> bool {
        let (sw, tw) = (self.resolved_width(source), self.resolved_width(sink));
        if sw.matches(&tw) {
            return true;
        }
        match (sw.is_resolved(), tw.is_resolved()) {
            (true, true) => {
                self.width_error(source, sink, format!("width mismatch between '{sw}' and '{tw}'"), diags);
                false
            }
            (true, false) => self.solve_width(sink, &sw, source, diags),
            (false, true) => self.solve_width(source, &tw, sink, diags),
            (false, false) => self.unify_widths(source, sink, diags),
        }
    }

    /// Binds the single unresolved generic of `port` so that its width has
    /// as many bits as `target`.
    fn solve_width(&mut self, port: PortId, target: &DataWidth, other: PortId, diags: &mut Diagnostics) -> bool {
        let width = self.resolved_width(port);
        let tails = self.unresolved_tails(port);
        let identifiers = width.identifiers();
        let solved = match (target, tails.as_slice(), identifiers.as_slice()) {
            (DataWidth::Range { .. }, [tail], [name]) => target
                .bit_width()
                .zip(width.bit_width_expr())
                .and_then(|(bits, expr)| solve_linear(&expr, name, bits as i64))
                .map(|value| (*tail, value)),
            _ => None,
        };
        let Some((tail, value)) = solved else {
            self.width_error(
                port,
                other,
                format!("cannot derive width '{width}' from '{target}'"),
                diags,
            );
            return false;
        };

        let saved = self.generics[tail.0].value.clone();
        self.generics[tail.0].value = GenericValue::Literal(value.to_string());
        if self.resolved_width(port).matches(target) {
            log::info!(
                "Set generic '{}' of '{}' to {} to match '{}'",
                self.generics[tail.0].code_name,
                self.modules[self.generics[tail.0].module.0].name,
                value,
                self.port_path(other)
            );
            return true;
        }
        self.generics[tail.0].value = saved;
        self.width_error(port, other, format!("cannot derive width '{width}' from '{target}'"), diags);
        false
    }

    /// Links the unresolved generics of two symbolic widths, the sink's to
    /// the source's first.
    fn unify_widths(&mut self, source: PortId, sink: PortId, diags: &mut Diagnostics) -> bool {
        let (source_tails, sink_tails) = (self.unresolved_tails(source), self.unresolved_tails(sink));
        if let ([s], [t]) = (source_tails.as_slice(), sink_tails.as_slice()) {
            for (from, to) in [(*t, *s), (*s, *t)] {
                let saved = self.generics[from.0].value.clone();
                if !self.link_generic(from, to) {
                    continue;
                }
                if self.resolved_width(source).matches(&self.resolved_width(sink)) {
                    log::debug!(
                        "Linked generic '{}' to '{}'",
                        self.generics[from.0].code_name,
                        self.generics[to.0].code_name
                    );
                    return true;
                }
                self.generics[from.0].value = saved;
            }
            let msg = format!(
                "widths '{}' and '{}' cannot be unified through generics '{}' and '{}'",
                self.resolved_width(source),
                self.resolved_width(sink),
                self.generics[s.0].code_name,
                self.generics[t.0].code_name
            );
            self.width_error(source, sink, msg, diags);
            return false;
        }
        let msg = format!(
            "widths '{}' and '{}' are both unresolved",
            self.resolved_width(source),
            self.resolved_width(sink)
        );
        self.width_error(source, sink, msg, diags);
        false
    }

    fn width_error(&self, a: PortId, b: PortId, msg: String, diags: &mut Diagnostics) {
        let helper_involved = [a, b]
            .iter()
            .any(|p| !self.modules[self.port_owner(*p).0].user_authored);
        diags.record(&ChainError::Connection {
            subject: format!("{} -> {}", self.port_path(a), self.port_path(b)),
            msg,
            severity: if helper_involved {
                Severity::Warning
            } else {
                Severity::Error
            },
        });
    }

    /// Reports how many ports still have symbolic widths. Widths are
    /// computed on demand, so this pass changes nothing.
    pub(crate) fn resolve_widths(&self) {
        let symbolic = (0..self.ports.len())
            .map(PortId)
            .filter(|p| !self.resolved_width(*p).is_resolved())
            .count();
        if symbolic > 0 {
            log::info!("{symbolic} port(s) keep a symbolic width");
        }
    }
}
