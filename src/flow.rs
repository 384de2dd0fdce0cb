use crate::adapter::VersionAdapter;
use crate::error::{FlowError, Result};
use crate::ofp::{FlowMod, FlowModCommand};
use crate::representation::{Dpid, OfpVersion, Switch};
use crate::util::{canonical_json, flow_hash};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::{self, Debug, Formatter};
use std::sync::Arc;

pub mod action;
pub mod matches;
pub mod stats;

pub use action::{Action, ActionDescriptor, VlanTag};
pub use matches::{FieldValue, Match, MatchField};
pub use stats::Statistics;

/// A flow table entry, independent of the OpenFlow version spoken by the
/// switch it belongs to. The version adapter it carries was resolved when
/// the switch connected and is what turns the entry into wire messages.
#[derive(Clone)]
pub struct Flow {
    switch: Arc<dyn Switch>,
    adapter: Arc<dyn VersionAdapter>,
    pub table_id: u8,
    pub matches: Match,
    pub priority: u16,
    pub idle_timeout: u16,
    pub hard_timeout: u16,
    pub cookie: u64,
    pub actions: Vec<ActionDescriptor>,
    pub stats: Statistics,
}

/// The plain attribute mapping, field for field.
#[derive(Serialize, Deserialize)]
struct FlowDict {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    switch: Option<Dpid>,
    #[serde(default)]
    table_id: u8,
    #[serde(default, rename = "match")]
    matches: Match,
    #[serde(default)]
    priority: u16,
    #[serde(default)]
    idle_timeout: u16,
    #[serde(default)]
    hard_timeout: u16,
    #[serde(default)]
    cookie: u64,
    #[serde(default)]
    actions: Vec<ActionDescriptor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    stats: Option<Statistics>,
}

impl Flow {
    pub fn new(switch: Arc<dyn Switch>, adapter: Arc<dyn VersionAdapter>) -> Flow {
        Flow {
            switch,
            adapter,
            table_id: 0,
            matches: Match::default(),
            priority: 0,
            idle_timeout: 0,
            hard_timeout: 0,
            cookie: 0,
            actions: vec![],
            stats: Statistics::default(),
        }
    }

    /// Build a flow from its plain attribute mapping. Missing attributes take
    /// their defaults; `id` is ignored since it is always derived.
    pub fn from_dict(
        data: &Value,
        switch: Arc<dyn Switch>,
        adapter: Arc<dyn VersionAdapter>,
    ) -> Result<Flow> {
        let dict: FlowDict = serde_json::from_value(data.clone()).map_err(FlowError::malformed)?;
        if let Some(dpid) = dict.switch {
            if dpid != switch.dpid() {
                return Err(FlowError::malformed(format!(
                    "flow belongs to switch {}, not {}",
                    dpid,
                    switch.dpid()
                ))
                .into());
            }
        }
        Ok(Flow {
            switch,
            adapter,
            table_id: dict.table_id,
            matches: dict.matches,
            priority: dict.priority,
            idle_timeout: dict.idle_timeout,
            hard_timeout: dict.hard_timeout,
            cookie: dict.cookie,
            actions: dict.actions,
            stats: dict.stats.unwrap_or_default(),
        })
    }

    pub fn as_dict(&self) -> Result<Value> {
        let mut dict = self.to_flow_dict();
        dict.id = Some(self.id()?);
        dict.stats = Some(self.stats);
        Ok(serde_json::to_value(&dict).map_err(FlowError::malformed)?)
    }

    /// Identifier of this entry on its switch. Counters do not take part, so
    /// it stays stable over the flow's lifetime, and the computation does not
    /// depend on the protocol version. Match values are hashed in canonical
    /// form.
    pub fn id(&self) -> Result<String> {
        let mut dict = self.to_flow_dict();
        dict.matches = dict.matches.canonical();
        let value = serde_json::to_value(&dict).map_err(FlowError::malformed)?;
        let canonical = canonical_json(&value).map_err(FlowError::malformed)?;
        Ok(flow_hash(&canonical))
    }

    pub fn switch(&self) -> &Arc<dyn Switch> {
        &self.switch
    }

    pub fn adapter(&self) -> &Arc<dyn VersionAdapter> {
        &self.adapter
    }

    pub fn version(&self) -> OfpVersion {
        self.adapter.version()
    }

    pub fn build_flow_mod(&self, command: FlowModCommand) -> Result<FlowMod> {
        self.adapter.build_flow_mod(self, command)
    }

    pub fn as_of_add_flow_mod(&self) -> Result<FlowMod> {
        self.build_flow_mod(FlowModCommand::Add)
    }

    pub fn as_of_delete_flow_mod(&self) -> Result<FlowMod> {
        self.build_flow_mod(FlowModCommand::DeleteStrict)
    }

    pub fn as_of_modify_flow_mod(&self) -> Result<FlowMod> {
        self.build_flow_mod(FlowModCommand::ModifyStrict)
    }

    fn to_flow_dict(&self) -> FlowDict {
        FlowDict {
            id: None,
            switch: Some(self.switch.dpid()),
            table_id: self.table_id,
            matches: self.matches.clone(),
            priority: self.priority,
            idle_timeout: self.idle_timeout,
            hard_timeout: self.hard_timeout,
            cookie: self.cookie,
            actions: self.actions.clone(),
            stats: None,
        }
    }
}

impl Debug for Flow {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.debug_struct("Flow")
            .field("switch", &self.switch.dpid())
            .field("version", &self.adapter.version())
            .field("table_id", &self.table_id)
            .field("matches", &self.matches)
            .field("priority", &self.priority)
            .field("idle_timeout", &self.idle_timeout)
            .field("hard_timeout", &self.hard_timeout)
            .field("cookie", &self.cookie)
            .field("actions", &self.actions)
            .field("stats", &self.stats)
            .finish()
    }
}

impl PartialEq for Flow {
    fn eq(&self, other: &Self) -> bool {
        self.switch.dpid() == other.switch.dpid()
            && self.adapter.version() == other.adapter.version()
            && self.table_id == other.table_id
            && self.matches == other.matches
            && self.priority == other.priority
            && self.idle_timeout == other.idle_timeout
            && self.hard_timeout == other.hard_timeout
            && self.cookie == other.cookie
            && self.actions == other.actions
            && self.stats == other.stats
    }
}
