use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{Alias, StoreError};

const CATALOG_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct AliasBody {
    template: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct PanelRecord {
    id: String,
    #[serde(default)]
    aliases: BTreeMap<String, AliasBody>,
}

// The persisted panel catalog: the contents of `aliases.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    version: u32,
    #[serde(default)]
    panels: Vec<PanelRecord>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self {
            version: CATALOG_VERSION,
            panels: Vec::new(),
        }
    }
}

impl Catalog {
    pub fn panel_ids(&self) -> Vec<String> {
        self.panels.iter().map(|p| p.id.clone()).collect()
    }

    pub fn has_panel(&self, panel: &str) -> bool {
        self.find(panel).is_some()
    }

    pub fn ensure_panel(&mut self, panel: &str) -> bool {
        if self.has_panel(panel) {
            return false;
        }
        self.panels.push(PanelRecord {
            id: panel.to_string(),
            aliases: BTreeMap::new(),
        });
        true
    }

    pub fn import_panel(&mut self, panel: &str, aliases: &[Alias]) -> bool {
        if !self.ensure_panel(panel) {
            return false;
        }
        for alias in aliases {
            self.set_alias(panel, alias.clone());
        }
        true
    }

    pub fn remove_panel(&mut self, panel: &str) -> Result<(), StoreError> {
        let index = self
            .panels
            .iter()
            .position(|p| p.id == panel)
            .ok_or_else(|| StoreError::PanelNotFound(panel.to_string()))?;
        self.panels.remove(index);
        Ok(())
    }

    pub fn get_alias(&self, panel: &str, token: &str) -> Option<Alias> {
        let body = self.find(panel)?.aliases.get(token)?;
        Some(to_alias(token, body))
    }

    pub fn set_alias(&mut self, panel: &str, alias: Alias) {
        self.ensure_panel(panel);
        if let Some(record) = self.panels.iter_mut().find(|p| p.id == panel) {
            record.aliases.insert(
                alias.token,
                AliasBody {
                    template: alias.template,
                    description: alias.description,
                },
            );
        }
    }

    pub fn delete_alias(&mut self, panel: &str, token: &str) -> Result<Alias, StoreError> {
        let not_found = || StoreError::AliasNotFound {
            panel: panel.to_string(),
            token: token.to_string(),
        };
        let record = self
            .panels
            .iter_mut()
            .find(|p| p.id == panel)
            .ok_or_else(not_found)?;
        let body = record.aliases.remove(token).ok_or_else(not_found)?;
        Ok(to_alias(token, &body))
    }

    pub fn list_aliases(&self, panel: &str) -> Result<Vec<Alias>, StoreError> {
        let record = self
            .find(panel)
            .ok_or_else(|| StoreError::PanelNotFound(panel.to_string()))?;
        Ok(record
            .aliases
            .iter()
            .map(|(token, body)| to_alias(token, body))
            .collect())
    }

    fn find(&self, panel: &str) -> Option<&PanelRecord> {
        self.panels.iter().find(|p| p.id == panel)
    }
}

fn to_alias(token: &str, body: &AliasBody) -> Alias {
    Alias {
        token: token.to_string(),
        template: body.template.clone(),
        description: body.description.clone(),
    }
}
