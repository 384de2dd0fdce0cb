use crate::util::value::{Ipv4Match, Ipv6Match, MAC};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Match field vocabulary shared by every protocol version. The order of the
/// variants is the order fields are emitted on the wire, which keeps OXM
/// prerequisites (eth_type before IPv4, ip_proto before L4 ports) in place.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum MatchField {
    InPort,
    DlSrc,
    DlDst,
    DlType,
    DlVlan,
    DlVlanPcp,
    NwTos,
    NwProto,
    NwSrc,
    NwDst,
    TpSrc,
    TpDst,
    Ipv6Src,
    Ipv6Dst,
}

impl MatchField {
    pub const ALL: [MatchField; 14] = [
        MatchField::InPort,
        MatchField::DlSrc,
        MatchField::DlDst,
        MatchField::DlType,
        MatchField::DlVlan,
        MatchField::DlVlanPcp,
        MatchField::NwTos,
        MatchField::NwProto,
        MatchField::NwSrc,
        MatchField::NwDst,
        MatchField::TpSrc,
        MatchField::TpDst,
        MatchField::Ipv6Src,
        MatchField::Ipv6Dst,
    ];

    pub fn name(self) -> &'static str {
        match self {
            MatchField::InPort => "in_port",
            MatchField::DlSrc => "dl_src",
            MatchField::DlDst => "dl_dst",
            MatchField::DlType => "dl_type",
            MatchField::DlVlan => "dl_vlan",
            MatchField::DlVlanPcp => "dl_vlan_pcp",
            MatchField::NwTos => "nw_tos",
            MatchField::NwProto => "nw_proto",
            MatchField::NwSrc => "nw_src",
            MatchField::NwDst => "nw_dst",
            MatchField::TpSrc => "tp_src",
            MatchField::TpDst => "tp_dst",
            MatchField::Ipv6Src => "ipv6_src",
            MatchField::Ipv6Dst => "ipv6_dst",
        }
    }

    pub fn from_name(name: &str) -> Option<MatchField> {
        MatchField::ALL.iter().copied().find(|f| f.name() == name)
    }
}

/// Typed value of a match field.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum FieldValue {
    Port(u32),
    Mac(MAC),
    U8(u8),
    U16(u16),
    Ipv4(Ipv4Match),
    Ipv6(Ipv6Match),
}

impl FieldValue {
    fn parse(field: MatchField, value: &Value) -> Result<FieldValue, String> {
        match field {
            MatchField::InPort => as_uint(value, u32::MAX as u64).map(|v| FieldValue::Port(v as u32)),
            MatchField::DlSrc | MatchField::DlDst => {
                as_str(value)?.parse().map(FieldValue::Mac)
            }
            MatchField::DlType | MatchField::DlVlan | MatchField::TpSrc | MatchField::TpDst => {
                as_uint(value, u16::MAX as u64).map(|v| FieldValue::U16(v as u16))
            }
            MatchField::DlVlanPcp => as_uint(value, 7).map(|v| FieldValue::U8(v as u8)),
            MatchField::NwTos | MatchField::NwProto => {
                as_uint(value, u8::MAX as u64).map(|v| FieldValue::U8(v as u8))
            }
            MatchField::NwSrc | MatchField::NwDst => as_str(value)?.parse().map(FieldValue::Ipv4),
            MatchField::Ipv6Src | MatchField::Ipv6Dst => {
                as_str(value)?.parse().map(FieldValue::Ipv6)
            }
        }
    }

    fn to_value(self) -> Value {
        match self {
            FieldValue::Port(v) => Value::from(v),
            FieldValue::Mac(mac) => Value::from(mac.to_string()),
            FieldValue::U8(v) => Value::from(v),
            FieldValue::U16(v) => Value::from(v),
            FieldValue::Ipv4(ip) => Value::from(ip.to_string()),
            FieldValue::Ipv6(ip) => Value::from(ip.to_string()),
        }
    }
}

fn as_uint(value: &Value, max: u64) -> Result<u64, String> {
    match value.as_u64() {
        Some(v) if v <= max => Ok(v),
        Some(v) => Err(format!("{} is larger than {}", v, max)),
        None => Err(format!("{} is not a non-negative integer", value)),
    }
}

fn as_str(value: &Value) -> Result<&str, String> {
    value
        .as_str()
        .ok_or_else(|| format!("{} is not a string", value))
}

/// Match part of a flow: field name to value, exactly as given. Keys are not
/// checked against the vocabulary until a version adapter encodes them.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Match(BTreeMap<String, Value>);

impl Match {
    pub fn new() -> Match {
        Match::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn insert<V: Into<Value>>(&mut self, name: &str, value: V) -> Option<Value> {
        self.0.insert(name.to_owned(), value.into())
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.0.remove(name)
    }

    /// Store a decoded field in its canonical textual form.
    pub fn set_field(&mut self, field: MatchField, value: FieldValue) {
        self.0.insert(field.name().to_owned(), value.to_value());
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Copy with every recognised value rewritten to its canonical form, so
    /// that `AA:BB:..` and `aa:bb:..` compare equal. Anything that does not
    /// parse is left as given.
    pub fn canonical(&self) -> Match {
        let fields = self.0.iter().map(|(name, value)| {
            let canonical = MatchField::from_name(name)
                .and_then(|field| FieldValue::parse(field, value).ok())
                .map(FieldValue::to_value)
                .unwrap_or_else(|| value.clone());
            (name.clone(), canonical)
        });
        Match(fields.collect())
    }

    /// Typed view of the match, in wire emission order. Unknown names and
    /// malformed values come back as `Err((name, reason))`.
    pub fn fields(&self) -> Result<Vec<(MatchField, FieldValue)>, (String, String)> {
        let mut fields = Vec::with_capacity(self.0.len());
        for (name, value) in self.0.iter() {
            let field = MatchField::from_name(name)
                .ok_or_else(|| (name.clone(), "unknown match field".to_owned()))?;
            let value = FieldValue::parse(field, value).map_err(|e| (name.clone(), e))?;
            fields.push((field, value));
        }
        fields.sort_by_key(|(field, _)| *field);
        Ok(fields)
    }
}
