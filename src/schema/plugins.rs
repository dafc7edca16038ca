use std::collections::BTreeMap;
use serde::{Serialize, Deserialize};
use crate::core::error::{Error, ErrorKind, Result};
use crate::schema::settings::SettingValue;

/// Key/value state saved by one plugin instance.
pub type PluginState = BTreeMap<String, SettingValue>;

/// One plugin instance: a plugin type run with one serialised set of settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginInstance {
    pub id: u64,
    pub plugin_type: String,
    pub settings: String,
    pub state: PluginState,
}

/// Plugin instances stored with the manifest, keyed by id.
///
/// `(plugin_type, settings)` identifies an instance. Storing state for a known
/// instance replaces its state and keeps its id; ids are never reused.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PluginRegistry {
    instances: BTreeMap<u64, PluginInstance>,
    last_id: u64,
}

fn not_found(context: String) -> Error {
    Error::new(ErrorKind::PluginNotFound, context)
}

impl PluginRegistry {
    pub fn new() -> Self {
        PluginRegistry::default()
    }

    fn find(&self, plugin_type: &str, settings: &str) -> Option<&PluginInstance> {
        self.instances
            .values()
            .find(|instance| instance.plugin_type == plugin_type && instance.settings == settings)
    }

    /// Replaces the state of the instance, registering it first if new.
    /// Returns the instance id.
    pub fn set(&mut self, plugin_type: &str, settings: &str, state: PluginState) -> u64 {
        let id = match self.find(plugin_type, settings) {
            Some(instance) => instance.id,
            None => {
                self.last_id += 1;
                self.last_id
            }
        };
        self.instances.insert(
            id,
            PluginInstance {
                id,
                plugin_type: plugin_type.to_string(),
                settings: settings.to_string(),
                state,
            },
        );
        id
    }

    pub fn state(&self, plugin_type: &str, settings: &str) -> Result<&PluginState> {
        self.find(plugin_type, settings)
            .map(|instance| &instance.state)
            .ok_or_else(|| not_found(format!("no '{}' plugin stored with settings '{}'", plugin_type, settings)))
    }

    pub fn by_id(&self, id: u64) -> Result<&PluginInstance> {
        self.instances
            .get(&id)
            .ok_or_else(|| not_found(format!("no plugin with id {}", id)))
    }

    /// `(plugin_type, settings, id)` of every instance, by id.
    pub fn list(&self) -> Vec<(String, String, u64)> {
        self.instances
            .values()
            .map(|instance| (instance.plugin_type.clone(), instance.settings.clone(), instance.id))
            .collect()
    }

    /// Id of the removed instance, if it existed.
    pub fn delete_instance(&mut self, plugin_type: &str, settings: &str) -> Option<u64> {
        let id = self.find(plugin_type, settings)?.id;
        self.instances.remove(&id);
        Some(id)
    }

    /// Ids of every removed instance of `plugin_type`.
    pub fn delete_type(&mut self, plugin_type: &str) -> Vec<u64> {
        let ids: Vec<u64> = self
            .instances
            .values()
            .filter(|instance| instance.plugin_type == plugin_type)
            .map(|instance| instance.id)
            .collect();
        for id in &ids {
            self.instances.remove(id);
        }
        ids
    }

    pub fn contains(&self, id: u64) -> bool {
        self.instances.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}
