// SPDX-License-Identifier: Apache-2.0

use crate::{Port, Rule, RuleSet};

impl Port {
    /// Adds a rule in front of the existing ones.
    pub fn add_rule(&self, rule: Rule) {
        log::debug!("Adding rule '{}' to '{}'", rule, self.debug_string());
        let core = self.core();
        core.borrow_mut().ports[self.id.0].rules.prepend(rule);
    }

    /// Removes a rule. Returns whether the port had it.
    pub fn remove_rule(&self, rule: &Rule) -> bool {
        let core = self.core();
        core.borrow_mut().ports[self.id.0]
            .rules
            .remove(rule.condition, &rule.action)
    }

    /// Replaces every rule with the same condition by `rule`.
    pub fn overwrite_rule(&self, rule: Rule) {
        let core = self.core();
        core.borrow_mut().ports[self.id.0].rules.overwrite(rule);
    }

    pub fn set_rules(&self, rules: RuleSet) {
        let core = self.core();
        core.borrow_mut().ports[self.id.0].rules = rules;
    }
}
