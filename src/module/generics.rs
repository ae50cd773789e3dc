// SPDX-License-Identifier: Apache-2.0

use crate::{ChainError, Generic, Module};

impl Module {
    /// Returns the generic with the given code name (case-insensitive).
    pub fn get_generic(&self, name: impl AsRef<str>) -> Option<Generic> {
        let core = self.core();
        let found = core.borrow().find_generic(self.id, name.as_ref());
        found.map(|id| Generic {
            chain: self.chain.clone(),
            id,
        })
    }

    pub fn generics(&self) -> Vec<Generic> {
        let core = self.core();
        let ids = core.borrow().modules[self.id.0]
            .generics
            .values()
            .copied()
            .collect::<Vec<_>>();
        ids.into_iter()
            .map(|id| Generic {
                chain: self.chain.clone(),
                id,
            })
            .collect()
    }

    fn require_generic(&self, name: &str) -> Result<Generic, ChainError> {
        self.get_generic(name).ok_or_else(|| ChainError::NotFound {
            what: "generic",
            name: name.to_string(),
            owner: self.name(),
        })
    }

    pub fn set_generic_value(
        &self,
        name: impl AsRef<str>,
        value: impl AsRef<str>,
    ) -> Result<(), ChainError> {
        self.require_generic(name.as_ref())?.set_value(value);
        Ok(())
    }

    /// Exposes a generic on every enclosing group as `<MODULE>_<GENERIC>`.
    pub fn make_generic_external(&self, name: impl AsRef<str>) -> Result<(), ChainError> {
        self.require_generic(name.as_ref())?.make_external();
        Ok(())
    }

    /// Makes the generic `name` follow the generic `target` of the nearest
    /// enclosing group that declares it.
    pub fn link_generics(
        &self,
        name: impl AsRef<str>,
        target: impl AsRef<str>,
    ) -> Result<(), ChainError> {
        self.require_generic(name.as_ref())?.link_to(target);
        Ok(())
    }
}
