// SPDX-License-Identifier: Apache-2.0

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::Module;
use crate::chain::core::{ChainCore, GenericId, ModuleId};

/// Value slot of a generic.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GenericValue {
    Unset,
    Literal(String),
    /// Takes the value of another generic, typically one level up.
    Linked(GenericId),
}

/// Data of a generic (a module parameter) in the chain's arena.
#[derive(Clone, Debug)]
pub struct GenericCore {
    pub(crate) code_name: String,
    pub(crate) value: GenericValue,
    pub(crate) default: Option<String>,
    /// Name of a generic in an enclosing group this one should follow.
    pub(crate) link_to: Option<String>,
    /// Expose this generic on every enclosing group up to the top.
    pub(crate) to_external: bool,
    pub(crate) module: ModuleId,
}

impl GenericCore {
    pub(crate) fn new(code_name: &str, default: Option<String>, module: ModuleId) -> Self {
        GenericCore {
            code_name: code_name.to_string(),
            value: GenericValue::Unset,
            default,
            link_to: None,
            to_external: false,
            module,
        }
    }
}

/// What a generic contributes when substituted into a width expression.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Substitution {
    /// A literal value (the generic's own, its default, or one found through
    /// its links).
    Value(String),
    /// The code name of the last generic in a link chain that has no value.
    Symbol(String),
    Unresolved,
}

impl ChainCore {
    /// Follows the link chain starting at `id`.
    ///
    /// An unset generic falls back to its default. A chain ending at a generic
    /// without value or default substitutes that generic's code name, unless
    /// the chain is just `id` itself. Cycles resolve to `Unresolved`.
    pub(crate) fn generic_substitution(&self, id: GenericId) -> Substitution {
        let mut visited = vec![id];
        let mut cur = id;
        loop {
            let generic = &self.generics[cur.0];
            match &generic.value {
                GenericValue::Literal(value) => return Substitution::Value(value.clone()),
                GenericValue::Linked(next) => {
                    if visited.contains(next) {
                        log::warn!(
                            "Generic link cycle through '{}' of '{}'",
                            generic.code_name,
                            self.modules[generic.module.0].name
                        );
                        return Substitution::Unresolved;
                    }
                    visited.push(*next);
                    cur = *next;
                }
                GenericValue::Unset => {
                    return match &generic.default {
                        Some(default) => Substitution::Value(default.clone()),
                        None if cur != id => Substitution::Symbol(generic.code_name.clone()),
                        None => Substitution::Unresolved,
                    };
                }
            }
        }
    }

    /// Resolved literal value of a generic, if its chain ends in one.
    pub(crate) fn generic_value(&self, id: GenericId) -> Option<String> {
        match self.generic_substitution(id) {
            Substitution::Value(value) => Some(value),
            Substitution::Symbol(_) | Substitution::Unresolved => None,
        }
    }

    /// Links `id` to `target`, refusing links that would close a cycle.
    pub(crate) fn link_generic(&mut self, id: GenericId, target: GenericId) -> bool {
        let mut cur = target;
        loop {
            if cur == id {
                return false;
            }
            match self.generics[cur.0].value {
                GenericValue::Linked(next) => cur = next,
                _ => break,
            }
        }
        self.generics[id.0].value = GenericValue::Linked(target);
        true
    }

    /// Generic of `module` with the given code name (case-insensitive).
    pub(crate) fn find_generic(&self, module: ModuleId, name: &str) -> Option<GenericId> {
        self.modules[module.0]
            .generics
            .iter()
            .find(|(code_name, _)| code_name.eq_ignore_ascii_case(name))
            .map(|(_, id)| *id)
    }
}

/// Handle to a generic of a module in a `ProcessingChain`.
#[derive(Clone, Debug)]
pub struct Generic {
    pub(crate) chain: Weak<RefCell<ChainCore>>,
    pub(crate) id: GenericId,
}

impl PartialEq for Generic {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && Weak::ptr_eq(&self.chain, &other.chain)
    }
}

impl Eq for Generic {}

impl Generic {
    pub(crate) fn core(&self) -> Rc<RefCell<ChainCore>> {
        self.chain
            .upgrade()
            .expect("Containing ProcessingChain has been dropped")
    }

    pub fn code_name(&self) -> String {
        self.core().borrow().generics[self.id.0].code_name.clone()
    }

    pub fn default_value(&self) -> Option<String> {
        self.core().borrow().generics[self.id.0].default.clone()
    }

    /// The value this generic resolves to, following links and defaults.
    /// Returns `None` while the chain ends at a generic without value.
    pub fn value(&self) -> Option<String> {
        self.core().borrow().generic_value(self.id)
    }

    /// The raw value slot, without following links.
    pub fn raw_value(&self) -> GenericValue {
        self.core().borrow().generics[self.id.0].value.clone()
    }

    /// The generic this one is linked to, if any.
    pub fn linked_to(&self) -> Option<Generic> {
        match self.raw_value() {
            GenericValue::Linked(id) => Some(Generic {
                chain: self.chain.clone(),
                id,
            }),
            _ => None,
        }
    }

    /// Assigns a literal value, replacing a link.
    pub fn set_value(&self, value: impl AsRef<str>) {
        self.core().borrow_mut().generics[self.id.0].value =
            GenericValue::Literal(value.as_ref().trim().to_string());
    }

    /// Follow the value of the generic `name` of an enclosing group. The link
    /// is established during `auto_connect`.
    pub fn link_to(&self, name: impl AsRef<str>) {
        self.core().borrow_mut().generics[self.id.0].link_to = Some(name.as_ref().to_string());
    }

    /// Expose this generic on every enclosing group up to the top level.
    pub fn make_external(&self) {
        self.core().borrow_mut().generics[self.id.0].to_external = true;
    }

    pub fn is_external(&self) -> bool {
        self.core().borrow().generics[self.id.0].to_external
    }

    pub fn module(&self) -> Module {
        Module {
            chain: self.chain.clone(),
            id: self.core().borrow().generics[self.id.0].module,
        }
    }
}

impl fmt::Display for Generic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let core = self.core();
        let core = core.borrow();
        let generic = &core.generics[self.id.0];
        write!(f, "{}.{}", core.modules[generic.module.0].name, generic.code_name)
    }
}
