// SPDX-License-Identifier: Apache-2.0

//! The build pass. Runs once per chain and turns the declared modules,
//! interfaces and connection requests into a fully wired graph.

use crate::chain::core::{ChainCore, InterfaceId};
use crate::chain::unconnected::collect_connection_error;
use crate::diagnostics::Diagnostics;
use crate::{BuildError, ChainError};

impl ChainCore {
    pub(crate) fn auto_connect(&mut self) -> Result<Diagnostics, BuildError> {
        if self.built {
            panic!("auto_connect has already run on this processing chain");
        }
        self.built = true;
        let mut diags = Diagnostics::new();
        match self.run_passes(&mut diags) {
            Ok(()) if !diags.has_errors() => {
                log::info!("Chain built with {} diagnostic(s)", diags.len());
                Ok(diags)
            }
            Ok(()) => Err(BuildError {
                fatal: None,
                diagnostics: diags,
            }),
            Err(fatal) => {
                diags.record(&fatal);
                Err(BuildError {
                    fatal: Some(fatal),
                    diagnostics: diags,
                })
            }
        }
    }

    fn run_passes(&mut self, diags: &mut Diagnostics) -> Result<(), ChainError> {
        self.max_regs_per_module = self.compute_max_regs();
        log::debug!("{} register slots per module", self.max_regs_per_module);

        self.auto_instantiate()?;
        self.connect_generics(diags);
        self.resolve_widths();

        self.process_pending(diags)?;
        if diags.has_errors() {
            return Ok(());
        }

        for module in self.leaf_modules() {
            self.sweep_module(module, true, diags)?;
            for intf in self.modules[module.0].interfaces.clone() {
                let result = self.route_interface(intf, diags);
                collect_connection_error(result, diags)?;
            }
            self.modules[module.0].connected = self.module_connect_complete(module);
        }
        for group in self.groups_deepest_first() {
            for intf in self.modules[group.0].interfaces.clone() {
                let result = self.route_interface(intf, diags);
                collect_connection_error(result, diags)?;
            }
        }

        if !diags.has_errors() {
            self.assign_addresses()?;
        }
        self.sweep_unconnected(diags)?;
        for module in self.leaf_modules() {
            if !self.modules[module.0].connected {
                self.modules[module.0].connected = self.module_connect_complete(module);
            }
        }
        self.resolve_widths();
        self.validate(diags);
        Ok(())
    }

    /// Instantiates the helper modules requested by interfaces (e.g. a
    /// register manager per register interface) and points the interfaces
    /// at them.
    fn auto_instantiate(&mut self) -> Result<(), ChainError> {
        if self.auto_instantiation_done {
            return Ok(());
        }
        self.auto_instantiation_done = true;

        let requests = self
            .interfaces
            .iter()
            .enumerate()
            .filter(|(_, i)| i.connect_to.is_none())
            .filter_map(|(n, i)| i.instantiate.clone().map(|req| (InterfaceId(n), req)))
            .collect::<Vec<_>>();
        for (intf, (entity_name, group_name)) in requests {
            let group = if group_name.is_empty() {
                self.top
            } else {
                match self.find_module(&group_name) {
                    Some(group) if self.is_group(group) => group,
                    _ => return Err(ChainError::ModuleNotFound(group_name)),
                }
            };
            let owner = self.interfaces[intf.0].module;
            let name = self.unique_module_name(&format!("{}_{}", self.modules[owner.0].name, entity_name));
            let helper = self.instantiate(&entity_name, &name, group, false)?;
            for helper_intf in self.modules[helper.0].interfaces.clone() {
                self.interfaces[helper_intf.0].to_external = false;
            }
            // The helper's parameters follow the interface's.
            let intf_generics = self.interfaces[intf.0].generics.clone();
            for generic in intf_generics {
                let code_name = self.generics[generic.0].code_name.clone();
                if let Some(own) = self.find_generic(helper, &code_name) {
                    self.link_generic(own, generic);
                }
            }
            self.interfaces[intf.0].connect_to = Some(helper);
            self.auto_instantiated.push(helper);
            log::info!(
                "Instantiated '{}' ({}) for '{}'",
                name,
                entity_name,
                self.intf_path(intf)
            );
        }
        Ok(())
    }
}
