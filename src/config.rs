use crate::adapter::FlowModFlags;
use crate::error::{ConfigError, Result};
use crate::representation::OfpVersion;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Which protocol versions get an adapter, and the flags every flow-mod
/// carries.
///
/// ```json
/// {"versions": [1, 4], "flags": {"send_flow_removed": true}}
/// ```
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FlowConfig {
    pub versions: Vec<OfpVersion>,
    pub flags: FlowModFlags,
}

impl Default for FlowConfig {
    fn default() -> Self {
        FlowConfig {
            versions: vec![OfpVersion::V0X01, OfpVersion::V0X04],
            flags: FlowModFlags::default(),
        }
    }
}

impl FlowConfig {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<FlowConfig> {
        let path = path.as_ref();
        let data = std::fs::read(path).map_err(|error| ConfigError::ConfigFileError {
            path: path.display().to_string(),
            error,
        })?;
        Ok(serde_json::from_slice(&data).map_err(ConfigError::from)?)
    }

    pub fn from_json(json: &str) -> Result<FlowConfig> {
        Ok(serde_json::from_str(json).map_err(ConfigError::from)?)
    }

    pub fn flow_mod_flags(&self) -> FlowModFlags {
        self.flags
    }
}
