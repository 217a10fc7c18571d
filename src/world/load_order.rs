use crate::models::types::FormId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Top byte used by light plugins, their index sits in the next 12 bits.
pub const LIGHT_FORM_ID_SENTINEL: u32 = 0xFE00_0000;
const LIGHT_FORM_ID_MASK: u32 = 0xFFFF_F000;
const REGULAR_FORM_ID_MASK: u32 = 0xFF00_0000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginEntry {
    pub name: String,
    #[serde(default)]
    pub light: bool,
}

/// Plugin name to form-id mask, in load order. Names compare case-insensitively.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Vec<PluginEntry>", into = "Vec<PluginEntry>")]
pub struct LoadOrder {
    plugins: Vec<PluginEntry>,
    mask_by_name: BTreeMap<String, u32>,
    next_regular: u32,
    next_light: u32,
}

impl LoadOrder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a plugin. Returns its mask, or None if the load order is full.
    pub fn add_plugin(&mut self, name: &str, light: bool) -> Option<u32> {
        let key = name.to_ascii_lowercase();
        if let Some(existing) = self.mask_by_name.get(&key) {
            return Some(*existing);
        }
        let mask = if light {
            if self.next_light > 0xFFF {
                return None;
            }
            let m = LIGHT_FORM_ID_SENTINEL | (self.next_light << 12);
            self.next_light += 1;
            m
        } else {
            // 0xFE and 0xFF are reserved
            if self.next_regular >= 0xFE {
                return None;
            }
            let m = self.next_regular << 24;
            self.next_regular += 1;
            m
        };
        tracing::debug!(plugin = name, mask = format!("0x{mask:08x}"), "plugin has form id mask");
        self.mask_by_name.insert(key, mask);
        self.plugins.push(PluginEntry { name: name.to_string(), light });
        Some(mask)
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.mask_by_name.contains_key(&name.to_ascii_lowercase())
    }

    pub fn mask(&self, name: &str) -> Option<u32> {
        self.mask_by_name.get(&name.to_ascii_lowercase()).copied()
    }

    /// The bits of a form id that identify its owning plugin.
    pub fn owner_mask(id: FormId) -> u32 {
        if id.0 & REGULAR_FORM_ID_MASK == LIGHT_FORM_ID_SENTINEL {
            id.0 & LIGHT_FORM_ID_MASK
        } else {
            id.0 & REGULAR_FORM_ID_MASK
        }
    }

    pub fn mod_owns_form(&self, name: &str, id: FormId) -> bool {
        match self.mask(name) {
            Some(mask) => Self::owner_mask(id) == mask,
            None => false,
        }
    }

    /// Full form id for a plugin-local id. Unknown plugins resolve to None.
    pub fn form_id(&self, name: &str, local: u32) -> Option<FormId> {
        let mask = self.mask(name)?;
        let local_bits = if mask & REGULAR_FORM_ID_MASK == LIGHT_FORM_ID_SENTINEL {
            local & !LIGHT_FORM_ID_MASK
        } else {
            local & !REGULAR_FORM_ID_MASK
        };
        Some(FormId(mask | local_bits))
    }

    pub fn plugin_for_form(&self, id: FormId) -> Option<&str> {
        let owner = Self::owner_mask(id);
        self.plugins
            .iter()
            .find(|p| self.mask(&p.name) == Some(owner))
            .map(|p| p.name.as_str())
    }

    pub fn plugins(&self) -> &[PluginEntry] {
        &self.plugins
    }
}

impl From<Vec<PluginEntry>> for LoadOrder {
    fn from(entries: Vec<PluginEntry>) -> Self {
        let mut lo = LoadOrder::new();
        for e in entries {
            if lo.add_plugin(&e.name, e.light).is_none() {
                tracing::warn!(plugin = %e.name, "load order full, plugin ignored");
            }
        }
        lo
    }
}

impl From<LoadOrder> for Vec<PluginEntry> {
    fn from(lo: LoadOrder) -> Self {
        lo.plugins
    }
}
