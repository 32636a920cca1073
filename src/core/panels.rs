// Configured defaults merged with persisted panels. A persisted panel replaces
// the default of the same id. Mutations hit the store first.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::info;

use crate::core::config::Config;
use crate::store::{Alias, AliasStore, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelOrigin {
    Default,
    User,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Panel {
    pub id: String,
    pub origin: PanelOrigin,
    // Whether the store holds this panel. Unpersisted defaults live only in
    // memory until their first change.
    pub persisted: bool,
    aliases: BTreeMap<String, Alias>,
}

impl Panel {
    fn new(id: &str, origin: PanelOrigin, persisted: bool, aliases: Vec<Alias>) -> Self {
        Self {
            id: id.to_string(),
            origin,
            persisted,
            aliases: aliases.into_iter().map(|a| (a.token.clone(), a)).collect(),
        }
    }

    pub fn alias(&self, token: &str) -> Option<&Alias> {
        self.aliases.get(token)
    }

    pub fn aliases(&self) -> impl Iterator<Item = &Alias> {
        self.aliases.values()
    }

    pub fn alias_count(&self) -> usize {
        self.aliases.len()
    }
}

pub struct PanelRegistry<S: ?Sized> {
    store: Arc<S>,
    panels: Vec<Panel>,
}

impl<S: AliasStore + ?Sized> PanelRegistry<S> {
    pub fn load(store: Arc<S>, config: &Config) -> Result<Self, StoreError> {
        let mut panels = Vec::new();

        for spec in &config.default_panels {
            let panel = if store.has_panel(&spec.id)? {
                Panel::new(&spec.id, PanelOrigin::Default, true, store.list_aliases(&spec.id)?)
            } else {
                let aliases = spec.aliases.iter().map(Alias::from).collect();
                Panel::new(&spec.id, PanelOrigin::Default, false, aliases)
            };
            panels.push(panel);
        }

        for id in store.panels()? {
            if panels.iter().any(|p| p.id == id) {
                continue;
            }
            let aliases = store.list_aliases(&id)?;
            panels.push(Panel::new(&id, PanelOrigin::User, true, aliases));
        }

        let mut registry = Self { store, panels };
        registry.ensure_panel(&config.root_panel_id)?;
        Ok(registry)
    }

    pub fn resolve_panel(&self, id: &str) -> Result<&Panel, StoreError> {
        self.panels
            .iter()
            .find(|p| p.id == id)
            .ok_or_else(|| StoreError::PanelNotFound(id.to_string()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.panels.iter().any(|p| p.id == id)
    }

    pub fn list_panels(&self) -> &[Panel] {
        &self.panels
    }

    pub fn lookup(&self, panel: &str, token: &str) -> Option<&Alias> {
        self.resolve_panel(panel).ok()?.alias(token)
    }

    pub fn list_aliases(&self, panel: &str) -> Result<Vec<Alias>, StoreError> {
        Ok(self.resolve_panel(panel)?.aliases().cloned().collect())
    }

    // Creates an empty user panel. Returns `false` if it already existed.
    pub fn ensure_panel(&mut self, id: &str) -> Result<bool, StoreError> {
        if self.contains(id) {
            return Ok(false);
        }
        self.store.ensure_panel(id)?;
        self.panels
            .push(Panel::new(id, PanelOrigin::User, true, Vec::new()));
        info!(panel = id, "panel created");
        Ok(true)
    }

    pub fn set_alias(&mut self, panel: &str, alias: Alias) -> Result<(), StoreError> {
        let index = self.index_of(panel)?;
        self.materialize(index)?;
        self.store.set_alias(panel, alias.clone())?;

        info!(panel, token = %alias.token, "alias set");
        self.panels[index].aliases.insert(alias.token.clone(), alias);
        Ok(())
    }

    pub fn remove_alias(&mut self, panel: &str, token: &str) -> Result<Alias, StoreError> {
        let index = self.index_of(panel)?;
        if self.panels[index].alias(token).is_none() {
            return Err(StoreError::AliasNotFound {
                panel: panel.to_string(),
                token: token.to_string(),
            });
        }
        self.materialize(index)?;
        let removed = self.store.delete_alias(panel, token)?;

        info!(panel, token, "alias removed");
        self.panels[index].aliases.remove(token);
        Ok(removed)
    }

    // Drops a panel and its aliases. A default panel comes back with its
    // configured aliases on the next start.
    pub fn remove_panel(&mut self, id: &str) -> Result<Panel, StoreError> {
        let index = self.index_of(id)?;
        if self.panels[index].persisted {
            self.store.remove_panel(id)?;
        }
        info!(panel = id, "panel removed");
        Ok(self.panels.remove(index))
    }

    fn index_of(&self, id: &str) -> Result<usize, StoreError> {
        self.panels
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| StoreError::PanelNotFound(id.to_string()))
    }

    fn materialize(&mut self, index: usize) -> Result<(), StoreError> {
        let panel = &self.panels[index];
        if panel.persisted {
            return Ok(());
        }
        let aliases: Vec<Alias> = panel.aliases().cloned().collect();
        self.store.import_panel(&panel.id, &aliases)?;
        self.panels[index].persisted = true;
        Ok(())
    }
}
