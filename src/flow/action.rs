use crate::util::value::MAC;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::convert::TryFrom;
use std::net::Ipv4Addr;

/// One entry of a flow's action list in its plain form:
/// `{"action_type": "...", <params>}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct ActionDescriptor {
    pub action_type: String,
    pub params: Map<String, Value>,
}

impl ActionDescriptor {
    pub fn new(action_type: &str) -> ActionDescriptor {
        ActionDescriptor {
            action_type: action_type.to_owned(),
            params: Map::new(),
        }
    }

    pub fn with<V: Into<Value>>(mut self, name: &str, value: V) -> ActionDescriptor {
        self.params.insert(name.to_owned(), value.into());
        self
    }

    fn param(&self, name: &str) -> Result<&Value, String> {
        self.params
            .get(name)
            .ok_or_else(|| format!("missing parameter {}", name))
    }

    fn uint_param(&self, name: &str, max: u64) -> Result<u64, String> {
        let value = self.param(name)?;
        match value.as_u64() {
            Some(v) if v <= max => Ok(v),
            _ => Err(format!("{} must be an integer up to {}, got {}", name, max, value)),
        }
    }

    fn str_param(&self, name: &str) -> Result<&str, String> {
        let value = self.param(name)?;
        value
            .as_str()
            .ok_or_else(|| format!("{} must be a string, got {}", name, value))
    }
}

impl TryFrom<Map<String, Value>> for ActionDescriptor {
    type Error = String;

    fn try_from(mut params: Map<String, Value>) -> Result<Self, Self::Error> {
        match params.remove("action_type") {
            Some(Value::String(action_type)) => Ok(ActionDescriptor {
                action_type,
                params,
            }),
            Some(other) => Err(format!("action_type must be a string, got {}", other)),
            None => Err("action without action_type".to_owned()),
        }
    }
}

impl From<ActionDescriptor> for Map<String, Value> {
    fn from(action: ActionDescriptor) -> Self {
        let mut map = action.params;
        map.insert("action_type".to_owned(), Value::String(action.action_type));
        map
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum VlanTag {
    /// Customer tag, ethertype 0x8100.
    C,
    /// Service tag, ethertype 0x88a8.
    S,
}

impl VlanTag {
    pub fn ethertype(self) -> u16 {
        match self {
            VlanTag::C => 0x8100,
            VlanTag::S => 0x88a8,
        }
    }

    pub fn from_ethertype(ethertype: u16) -> Option<VlanTag> {
        match ethertype {
            0x8100 => Some(VlanTag::C),
            0x88a8 => Some(VlanTag::S),
            _ => None,
        }
    }
}

/// Typed action vocabulary shared by every protocol version. Whether a
/// version can put an action on the wire is up to its adapter.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Action {
    Output { port: u32 },
    SetVlan { vlan_id: u16 },
    SetVlanPcp { vlan_pcp: u8 },
    PopVlan,
    PushVlan { tag: VlanTag },
    SetDlSrc { mac: MAC },
    SetDlDst { mac: MAC },
    SetNwSrc { addr: Ipv4Addr },
    SetNwDst { addr: Ipv4Addr },
    GotoTable { table_id: u8 },
}

impl Action {
    pub fn action_type(&self) -> &'static str {
        match self {
            Action::Output { .. } => "output",
            Action::SetVlan { .. } => "set_vlan",
            Action::SetVlanPcp { .. } => "set_vlan_pcp",
            Action::PopVlan => "pop_vlan",
            Action::PushVlan { .. } => "push_vlan",
            Action::SetDlSrc { .. } => "set_dl_src",
            Action::SetDlDst { .. } => "set_dl_dst",
            Action::SetNwSrc { .. } => "set_nw_src",
            Action::SetNwDst { .. } => "set_nw_dst",
            Action::GotoTable { .. } => "goto_table",
        }
    }

    /// `Ok(None)` means the action type is outside the vocabulary, `Err`
    /// means a known type with bad parameters.
    pub fn from_descriptor(desc: &ActionDescriptor) -> Result<Option<Action>, String> {
        let action = match desc.action_type.as_str() {
            "output" => Action::Output {
                port: desc.uint_param("port", u32::MAX as u64)? as u32,
            },
            "set_vlan" => Action::SetVlan {
                vlan_id: desc.uint_param("vlan_id", 0x0fff)? as u16,
            },
            "set_vlan_pcp" => Action::SetVlanPcp {
                vlan_pcp: desc.uint_param("vlan_pcp", 7)? as u8,
            },
            "pop_vlan" => Action::PopVlan,
            "push_vlan" => {
                let tag = match desc.str_param("tag_type")? {
                    "c" => VlanTag::C,
                    "s" => VlanTag::S,
                    other => return Err(format!("tag_type must be 'c' or 's', got {}", other)),
                };
                Action::PushVlan { tag }
            }
            "set_dl_src" => Action::SetDlSrc {
                mac: desc.str_param("dl_src")?.parse()?,
            },
            "set_dl_dst" => Action::SetDlDst {
                mac: desc.str_param("dl_dst")?.parse()?,
            },
            "set_nw_src" => Action::SetNwSrc {
                addr: parse_ipv4(desc.str_param("nw_src")?)?,
            },
            "set_nw_dst" => Action::SetNwDst {
                addr: parse_ipv4(desc.str_param("nw_dst")?)?,
            },
            "goto_table" => Action::GotoTable {
                table_id: desc.uint_param("table_id", 0xfe)? as u8,
            },
            _ => return Ok(None),
        };
        Ok(Some(action))
    }

    pub fn to_descriptor(&self) -> ActionDescriptor {
        let desc = ActionDescriptor::new(self.action_type());
        match *self {
            Action::Output { port } => desc.with("port", port),
            Action::SetVlan { vlan_id } => desc.with("vlan_id", vlan_id),
            Action::SetVlanPcp { vlan_pcp } => desc.with("vlan_pcp", vlan_pcp),
            Action::PopVlan => desc,
            Action::PushVlan { tag } => desc.with(
                "tag_type",
                match tag {
                    VlanTag::C => "c",
                    VlanTag::S => "s",
                },
            ),
            Action::SetDlSrc { mac } => desc.with("dl_src", mac.to_string()),
            Action::SetDlDst { mac } => desc.with("dl_dst", mac.to_string()),
            Action::SetNwSrc { addr } => desc.with("nw_src", addr.to_string()),
            Action::SetNwDst { addr } => desc.with("nw_dst", addr.to_string()),
            Action::GotoTable { table_id } => desc.with("table_id", table_id),
        }
    }
}

fn parse_ipv4(s: &str) -> Result<Ipv4Addr, String> {
    s.parse().map_err(|e| format!("{}: {}", s, e))
}
