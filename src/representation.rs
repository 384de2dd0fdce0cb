use parking_lot::RwLock;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{self, Debug, Display, Formatter};
use std::str::FromStr;

/// Datapath id of a switch, rendered as eight colon-separated hex octets.
#[derive(Hash, Copy, Clone, Eq, PartialEq, Ord, PartialOrd)]
pub struct Dpid(pub u64);

impl Display for Dpid {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        let octets = self.0.to_be_bytes();
        let parts: Vec<String> = octets.iter().map(|b| format!("{:02x}", b)).collect();
        write!(f, "{}", parts.join(":"))
    }
}

impl Debug for Dpid {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "Dpid({})", self)
    }
}

impl FromStr for Dpid {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = hex::decode(s.replace(':', "")).map_err(|e| format!("{}: {}", s, e))?;
        if raw.len() != 8 {
            return Err(format!("{}: datapath id must have 8 octets", s));
        }
        let mut octets = [0u8; 8];
        octets.copy_from_slice(&raw);
        Ok(Dpid(u64::from_be_bytes(octets)))
    }
}

impl Serialize for Dpid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Dpid {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// OpenFlow wire version byte as negotiated in the hello exchange.
#[derive(Hash, Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OfpVersion(pub u8);

impl OfpVersion {
    pub const V0X01: OfpVersion = OfpVersion(0x01);
    pub const V0X04: OfpVersion = OfpVersion(0x04);
}

impl Display for OfpVersion {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match *self {
            OfpVersion::V0X01 => write!(f, "OpenFlow 1.0"),
            OfpVersion::V0X04 => write!(f, "OpenFlow 1.3"),
            OfpVersion(v) => write!(f, "OpenFlow version {:#04x}", v),
        }
    }
}

/// What the flow layer needs to know about a switch. The switch itself is
/// owned and mutated by the connection layer; flows only read it.
pub trait Switch: Send + Sync + Debug {
    fn dpid(&self) -> Dpid;

    /// Version negotiated on the active connection, `None` while disconnected.
    fn negotiated_version(&self) -> Option<OfpVersion>;
}

#[derive(Debug)]
pub struct Device {
    pub dpid: Dpid,
    version: RwLock<Option<OfpVersion>>,
}

impl Device {
    pub fn new(dpid: Dpid) -> Device {
        Device {
            dpid,
            version: RwLock::new(None),
        }
    }

    pub fn connected(dpid: Dpid, version: OfpVersion) -> Device {
        Device {
            dpid,
            version: RwLock::new(Some(version)),
        }
    }

    /// Called by the connection layer once the handshake settled on a version.
    pub fn set_negotiated_version(&self, version: Option<OfpVersion>) {
        *self.version.write() = version;
    }
}

impl Switch for Device {
    fn dpid(&self) -> Dpid {
        self.dpid
    }

    fn negotiated_version(&self) -> Option<OfpVersion> {
        *self.version.read()
    }
}
