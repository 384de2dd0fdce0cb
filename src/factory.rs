use crate::adapter::{self, VersionAdapter};
use crate::config::FlowConfig;
use crate::error::{ConfigError, FlowError, Result};
use crate::flow::Flow;
use crate::ofp::FlowStats;
use crate::representation::{OfpVersion, Switch};
use dashmap::DashMap;
use log::debug;
use std::sync::Arc;

/// Entry point for turning flow stats entries into [Flow]s. Holds one
/// adapter per protocol version; clones share the registry.
#[derive(Clone)]
pub struct FlowFactory {
    adapters: Arc<DashMap<OfpVersion, Arc<dyn VersionAdapter>>>,
}

impl FlowFactory {
    /// A factory with nothing registered.
    pub fn new() -> FlowFactory {
        FlowFactory {
            adapters: Arc::new(DashMap::new()),
        }
    }

    pub fn from_config(config: &FlowConfig) -> Result<FlowFactory> {
        let factory = FlowFactory::new();
        for version in config.versions.iter() {
            let adapter: Arc<dyn VersionAdapter> = match *version {
                OfpVersion::V0X01 => Arc::new(adapter::v0x01::Adapter::new(config.flags)),
                OfpVersion::V0X04 => Arc::new(adapter::v0x04::Adapter::new(config.flags)),
                other => return Err(ConfigError::UnknownVersion(other).into()),
            };
            factory.register(adapter);
        }
        Ok(factory)
    }

    /// Add an adapter, replacing any adapter of the same version.
    pub fn register(&self, adapter: Arc<dyn VersionAdapter>) {
        let version = adapter.version();
        if self.adapters.insert(version, adapter).is_some() {
            debug!(target: "flow", "replaced adapter for {}", version);
        } else {
            debug!(target: "flow", "registered adapter for {}", version);
        }
    }

    pub fn versions(&self) -> Vec<OfpVersion> {
        let mut versions: Vec<OfpVersion> = self.adapters.iter().map(|e| *e.key()).collect();
        versions.sort();
        versions
    }

    /// Adapter for the version `switch` negotiated. Meant to be resolved
    /// once per connection and handed to the flows built for it.
    pub fn adapter_for(&self, switch: &dyn Switch) -> Result<Arc<dyn VersionAdapter>> {
        let version = switch.negotiated_version().ok_or(FlowError::NotConnected {
            switch: switch.dpid(),
        })?;
        match self.adapters.get(&version) {
            Some(adapter) => Ok(adapter.value().clone()),
            None => Err(FlowError::UnsupportedProtocolVersion {
                switch: switch.dpid(),
                version,
            }
            .into()),
        }
    }

    pub fn from_of_flow_stats(&self, stats: &FlowStats, switch: Arc<dyn Switch>) -> Result<Flow> {
        let adapter = self.adapter_for(&*switch)?;
        debug!(target: "flow", "flow stats from {} handled by {}", switch.dpid(), adapter.version());
        adapter.from_of_flow_stats(stats, switch)
    }
}

impl Default for FlowFactory {
    /// Both shipped adapters with default flags.
    fn default() -> Self {
        let factory = FlowFactory::new();
        factory.register(Arc::new(adapter::v0x01::Adapter::default()));
        factory.register(Arc::new(adapter::v0x04::Adapter::default()));
        factory
    }
}
