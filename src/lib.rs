//! Version-independent OpenFlow flow entries.
//!
//! A [Flow] is built from its plain attribute mapping or decoded from a flow
//! stats entry through the [FlowFactory], and turned into OpenFlow 1.0 or
//! 1.3 flow-mods by the [VersionAdapter] of the switch it belongs to.

pub mod adapter;
pub mod config;
pub mod error;
pub mod factory;
pub mod flow;
pub mod ofp;
pub mod representation;
pub mod util;

pub use adapter::{FlowModFlags, VersionAdapter};
pub use config::FlowConfig;
pub use error::{Error, FlowError, Result};
pub use factory::FlowFactory;
pub use flow::{ActionDescriptor, Flow, Match, Statistics};
pub use ofp::{FlowMod, FlowModCommand, FlowStats};
pub use representation::{Device, Dpid, OfpVersion, Switch};
