// Copyright @yucwang 2026

use crate::wire::stream::{ WireError, WireReader, WireWriter };

use log::warn;

/// A remotely triggerable tool. The client addresses a plugin by its short
/// id: it sends the id followed by the plugin's configuration payload, the
/// server decodes and runs the plugin, and the plugin writes its result
/// back in `serialize`.
pub trait Plugin: Send {
    fn name(&self) -> &str;
    fn id(&self) -> i16;

    /// Execute with the most recently decoded configuration.
    fn run(&mut self);

    /// Write the result payload. Called after `run`; must produce a valid
    /// frame even if the run failed or never happened.
    fn serialize(&mut self, stream: &mut WireWriter) -> Result<(), WireError>;

    /// Decode a configuration payload. On error the plugin must keep its
    /// previous state.
    fn deserialize(&mut self, stream: &mut WireReader) -> Result<(), WireError>;
}

/// Id-keyed set of the plugins one server instance exposes.
#[derive(Default)]
pub struct PluginRegistry {
    plugins: Vec<Box<dyn Plugin>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self { plugins: Vec::new() }
    }

    pub fn add_plugin(&mut self, plugin: Box<dyn Plugin>) {
        if self.by_id(plugin.id()).is_some() {
            warn!("plugin id {} is already registered, ignoring {}", plugin.id(), plugin.name());
            return;
        }
        self.plugins.push(plugin);
    }

    pub fn by_id(&mut self, id: i16) -> Option<&mut (dyn Plugin + '_)> {
        for plugin in self.plugins.iter_mut() {
            if plugin.id() == id {
                return Some(plugin.as_mut());
            }
        }
        None
    }

    pub fn ids(&self) -> Vec<i16> {
        self.plugins.iter().map(|p| p.id()).collect()
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CountingPlugin {
        id: i16,
        runs: u32,
    }

    impl Plugin for CountingPlugin {
        fn name(&self) -> &str {
            "counting"
        }

        fn id(&self) -> i16 {
            self.id
        }

        fn run(&mut self) {
            self.runs += 1;
        }

        fn serialize(&mut self, stream: &mut WireWriter) -> Result<(), WireError> {
            stream.write_i16(self.id)?;
            stream.write_i32(self.runs as i32)
        }

        fn deserialize(&mut self, _stream: &mut WireReader) -> Result<(), WireError> {
            Ok(())
        }
    }

    #[test]
    fn test_dispatch_by_id() {
        let mut registry = PluginRegistry::new();
        registry.add_plugin(Box::new(CountingPlugin { id: 11, runs: 0 }));
        registry.add_plugin(Box::new(CountingPlugin { id: 66, runs: 0 }));

        assert_eq!(registry.len(), 2);
        assert!(registry.by_id(12).is_none());

        let plugin = registry.by_id(66).expect("missing plugin");
        plugin.run();
        plugin.run();

        let mut buffer = Vec::new();
        {
            let mut writer = WireWriter::new(&mut buffer);
            registry.by_id(66).unwrap().serialize(&mut writer).unwrap();
        }
        assert_eq!(buffer, vec![66, 0, 2, 0, 0, 0]);
    }

    #[test]
    fn test_duplicate_id_is_ignored() {
        let mut registry = PluginRegistry::new();
        registry.add_plugin(Box::new(CountingPlugin { id: 7, runs: 0 }));
        registry.add_plugin(Box::new(CountingPlugin { id: 7, runs: 0 }));
        assert_eq!(registry.len(), 1);
    }
}
