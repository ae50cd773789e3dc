// SPDX-License-Identifier: Apache-2.0

use crate::{Action, Condition, Port, Rule};

impl Port {
    /// Routes the port to the top level: a port of the same name is created
    /// on every enclosing group that lacks one.
    pub fn make_external(&self) {
        self.add_rule(Rule::new(Condition::SourcePresent, Action::MakeExternal));
    }

    /// Whether the port is wired all the way to a pin of the top level.
    pub fn is_external(&self) -> bool {
        let core = self.core();
        let core = core.borrow();
        let mut cur = self.id;
        // Follows the chain of copies made while exporting.
        for _ in 0..core.ports.len() {
            if core.port_owner(cur) == core.top {
                return true;
            }
            let p = &core.ports[cur.0];
            let next = p
                .outgoing
                .iter()
                .chain(p.incoming.iter())
                .copied()
                .find(|other| {
                    let o = &core.ports[other.0];
                    o.code_name == p.code_name
                        && core.parent(p.module) == Some(o.module)
                });
            match next {
                Some(next) => cur = next,
                None => return false,
            }
        }
        false
    }
}
