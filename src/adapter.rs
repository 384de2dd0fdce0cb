//! Per-version encoders and decoders of [Flow](crate::flow::Flow).
//!
//! The flow entity owns everything that does not depend on the wire format
//! (attribute mapping, id). An adapter only knows how to turn a flow into a
//! flow-mod of its revision and how to read a flow stats entry back.

use crate::error::{FlowError, Result};
use crate::flow::{Action, FieldValue, Flow, MatchField};
use crate::ofp::{FlowMod, FlowModCommand, FlowStats, OFPFF_CHECK_OVERLAP, OFPFF_SEND_FLOW_REM};
use crate::representation::{OfpVersion, Switch};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::Debug;
use std::sync::Arc;

pub mod v0x01;
pub mod v0x04;

pub trait VersionAdapter: Send + Sync + Debug {
    fn version(&self) -> OfpVersion;

    /// A shared handle to this adapter, injected into the flows it creates.
    fn handle(&self) -> Arc<dyn VersionAdapter>;

    fn build_flow_mod(&self, flow: &Flow, command: FlowModCommand) -> Result<FlowMod>;

    fn from_of_flow_stats(&self, stats: &FlowStats, switch: Arc<dyn Switch>) -> Result<Flow>;

    fn from_dict(&self, data: &Value, switch: Arc<dyn Switch>) -> Result<Flow> {
        Flow::from_dict(data, switch, self.handle())
    }
}

/// Flag bits set on every flow-mod an adapter builds. Revisions that lack
/// a flag ignore it.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowModFlags {
    pub send_flow_removed: bool,
    pub check_overlap: bool,
    pub no_packet_counts: bool,
    pub no_byte_counts: bool,
}

impl FlowModFlags {
    /// Bits shared by 1.0 and 1.3.
    pub(crate) fn common_bits(&self) -> u16 {
        let mut bits = 0;
        if self.send_flow_removed {
            bits |= OFPFF_SEND_FLOW_REM;
        }
        if self.check_overlap {
            bits |= OFPFF_CHECK_OVERLAP;
        }
        bits
    }
}

/// Typed match of `flow`, with vocabulary errors reported against `version`.
pub(crate) fn typed_match(flow: &Flow, version: OfpVersion) -> Result<Vec<(MatchField, FieldValue)>> {
    flow.matches.fields().map_err(|(field, reason)| {
        FlowError::UnsupportedMatchField {
            field,
            version,
            reason,
        }
        .into()
    })
}

/// Typed actions of `flow` in list order.
pub(crate) fn typed_actions(flow: &Flow, version: OfpVersion) -> Result<Vec<Action>> {
    flow.actions
        .iter()
        .map(|desc| match Action::from_descriptor(desc) {
            Ok(Some(action)) => Ok(action),
            Ok(None) => Err(unsupported_action(&desc.action_type, version, "unknown action type")),
            Err(reason) => Err(FlowError::malformed(format!("{}: {}", desc.action_type, reason)).into()),
        })
        .collect()
}

pub(crate) fn unsupported_field<R: ToString>(
    field: MatchField,
    version: OfpVersion,
    reason: R,
) -> crate::error::Error {
    FlowError::UnsupportedMatchField {
        field: field.name().to_owned(),
        version,
        reason: reason.to_string(),
    }
    .into()
}

pub(crate) fn unsupported_action<R: ToString>(
    action_type: &str,
    version: OfpVersion,
    reason: R,
) -> crate::error::Error {
    FlowError::UnsupportedAction {
        action_type: action_type.to_owned(),
        version,
        reason: reason.to_string(),
    }
    .into()
}

pub(crate) fn version_mismatch(expected: OfpVersion, stats: &FlowStats) -> crate::error::Error {
    FlowError::VersionMismatch {
        expected,
        found: stats.version(),
    }
    .into()
}
