use crate::representation::{Dpid, OfpVersion};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FlowError {
    #[error("Switch {} negotiated unsupported protocol version {}", switch, version)]
    UnsupportedProtocolVersion { switch: Dpid, version: OfpVersion },
    #[error("Switch {} has no active connection", switch)]
    NotConnected { switch: Dpid },
    #[error("Malformed flow description: {}", reason)]
    MalformedFlowDescription { reason: String },
    #[error("Match field {} is not supported by {}: {}", field, version, reason)]
    UnsupportedMatchField {
        field: String,
        version: OfpVersion,
        reason: String,
    },
    #[error("Action {} is not supported by {}: {}", action_type, version, reason)]
    UnsupportedAction {
        action_type: String,
        version: OfpVersion,
        reason: String,
    },
    #[error("Adapter for {} got a message of {}", expected, found)]
    VersionMismatch {
        expected: OfpVersion,
        found: OfpVersion,
    },
}

impl FlowError {
    pub(crate) fn malformed<T: ToString>(reason: T) -> FlowError {
        FlowError::MalformedFlowDescription {
            reason: reason.to_string(),
        }
    }
}

#[derive(Error, Debug)]
pub enum WireError {
    #[error("Truncated {}: need {} bytes, {} left", what, needed, remaining)]
    Truncated {
        what: &'static str,
        needed: usize,
        remaining: usize,
    },
    #[error("Bad length {} in {}", length, what)]
    BadLength { what: &'static str, length: usize },
    #[error("Unexpected {} {:#x}", what, value)]
    UnexpectedValue { what: &'static str, value: u64 },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file {} error: {:?}", path, error)]
    ConfigFileError { path: String, error: std::io::Error },
    #[error("Config parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("No adapter shipped for protocol version {0}")]
    UnknownVersion(OfpVersion),
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Flow(#[from] FlowError),
    #[error(transparent)]
    Wire(#[from] WireError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type Result<T> = std::result::Result<T, Error>;
