// SPDX-License-Identifier: Apache-2.0

use crate::chain::core::{ChainCore, GenericId, ModuleId};
use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::generic::GenericCore;
use crate::GenericValue;

impl ChainCore {
    /// Carries out the `link_to` and `to_external` requests of all generics.
    pub(crate) fn connect_generics(&mut self, diags: &mut Diagnostics) {
        // Exporting adds generics; those need no further processing.
        let count = self.generics.len();
        for id in (0..count).map(GenericId) {
            if let Some(target) = self.generics[id.0].link_to.clone() {
                self.link_generic_upwards(id, &target, diags);
            }
            if self.generics[id.0].to_external && !self.is_group(self.generics[id.0].module) {
                self.export_generic(id);
            }
        }
    }

    /// Links `id` to the generic `target` of the nearest enclosing group that
    /// has it. Groups in between get a generic of the same name that passes
    /// the value through.
    fn link_generic_upwards(&mut self, id: GenericId, target: &str, diags: &mut Diagnostics) {
        let module = self.generics[id.0].module;
        let mut between = Vec::new();
        let mut found = None;
        let mut cur = self.parent(module);
        while let Some(group) = cur {
            if let Some(g) = self.find_generic(group, target) {
                found = Some(g);
                break;
            }
            between.push(group);
            cur = self.parent(group);
        }
        let Some(found) = found else {
            diags.warning(
                DiagnosticKind::Connection,
                format!("{}.{}", self.modules[module.0].name, self.generics[id.0].code_name),
                format!("no enclosing group declares generic '{target}'"),
            );
            return;
        };

        let mut prev = id;
        for group in between {
            let pass = self.push_generic(GenericCore::new(target, None, group));
            self.modules[group.0].generics.insert(target.to_string(), pass);
            self.link_generic(prev, pass);
            prev = pass;
        }
        if !self.link_generic(prev, found) {
            log::warn!("Not linking '{}' to '{}': link cycle", self.generics[prev.0].code_name, target);
        }
    }

    /// Exposes a generic on every enclosing group up to the top as
    /// `<MODULE>_<GENERIC>`. The top level copy takes over the value.
    fn export_generic(&mut self, id: GenericId) {
        let module = self.generics[id.0].module;
        let name = format!(
            "{}_{}",
            self.modules[module.0].name.to_ascii_uppercase(),
            self.generics[id.0].code_name.to_ascii_uppercase()
        );
        let value = match &self.generics[id.0].value {
            GenericValue::Literal(value) => Some(value.clone()),
            _ => None,
        };
        let default = self.generics[id.0].default.clone();

        let mut prev = id;
        let mut cur: Option<ModuleId> = self.parent(module);
        while let Some(group) = cur {
            let copy = match self.find_generic(group, &name) {
                Some(existing) => existing,
                None => {
                    let copy = self.push_generic(GenericCore::new(&name, None, group));
                    self.modules[group.0].generics.insert(name.clone(), copy);
                    copy
                }
            };
            if prev != copy {
                self.link_generic(prev, copy);
            }
            prev = copy;
            cur = self.parent(group);
        }

        if prev != id {
            let top = &mut self.generics[prev.0];
            if let Some(value) = value {
                top.value = GenericValue::Literal(value);
            }
            top.default = default;
            top.to_external = true;
            log::debug!("Exported generic as '{name}'");
        }
    }
}
