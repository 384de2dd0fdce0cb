use std::fmt::{self, Debug, Display, Formatter};
use std::net::{Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

#[derive(Eq, Hash, PartialEq, Clone, Copy)]
pub struct MAC(pub [u8; 6]);

impl MAC {
    pub fn broadcast() -> MAC {
        MAC([0xff; 6])
    }

    pub fn zero() -> MAC {
        MAC([0x00; 6])
    }

    pub fn is_broadcast(&self) -> bool {
        self.0 == [0xff; 6]
    }
}

impl FromStr for MAC {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let vec = hex::decode(s.replace(':', "")).map_err(|e| format!("{}: {}", s, e))?;
        if vec.len() != 6 {
            return Err(format!("{}: MAC address must have 6 octets", s));
        }
        let mut mac = [0u8; 6];
        mac.copy_from_slice(&vec);
        Ok(MAC(mac))
    }
}

impl Display for MAC {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            self.0[0], self.0[1], self.0[2], self.0[3], self.0[4], self.0[5]
        )
    }
}

impl Debug for MAC {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        Display::fmt(self, f)
    }
}

/// An IPv4 match value: address plus mask. Written as `a.b.c.d`,
/// `a.b.c.d/len` or `a.b.c.d/m.m.m.m`.
#[derive(Eq, Hash, PartialEq, Clone, Copy, Debug)]
pub struct Ipv4Match {
    pub addr: Ipv4Addr,
    pub mask: Ipv4Addr,
}

impl Ipv4Match {
    pub fn exact(addr: Ipv4Addr) -> Ipv4Match {
        Ipv4Match {
            addr,
            mask: Ipv4Addr::from(u32::MAX),
        }
    }

    pub fn with_prefix(addr: Ipv4Addr, prefix_len: u32) -> Ipv4Match {
        Ipv4Match {
            addr,
            mask: Ipv4Addr::from(prefix_mask_u32(prefix_len)),
        }
    }

    pub fn is_exact(&self) -> bool {
        u32::from(self.mask) == u32::MAX
    }

    /// Prefix length if the mask is contiguous.
    pub fn prefix_len(&self) -> Option<u32> {
        let mask = u32::from(self.mask);
        let len = mask.leading_ones();
        if prefix_mask_u32(len) == mask {
            Some(len)
        } else {
            None
        }
    }
}

impl FromStr for Ipv4Match {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(2, '/');
        let addr: Ipv4Addr = parts
            .next()
            .unwrap_or_default()
            .parse()
            .map_err(|e| format!("{}: {}", s, e))?;
        match parts.next() {
            None => Ok(Ipv4Match::exact(addr)),
            Some(mask) if mask.contains('.') => {
                let mask: Ipv4Addr = mask.parse().map_err(|e| format!("{}: {}", s, e))?;
                Ok(Ipv4Match { addr, mask })
            }
            Some(len) => {
                let len: u32 = len.parse().map_err(|e| format!("{}: {}", s, e))?;
                if len > 32 {
                    return Err(format!("{}: prefix longer than 32 bits", s));
                }
                Ok(Ipv4Match::with_prefix(addr, len))
            }
        }
    }
}

impl Display for Ipv4Match {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        if self.is_exact() {
            write!(f, "{}", self.addr)
        } else if let Some(len) = self.prefix_len() {
            write!(f, "{}/{}", self.addr, len)
        } else {
            write!(f, "{}/{}", self.addr, self.mask)
        }
    }
}

/// An IPv6 match value, `addr` or `addr/len`.
#[derive(Eq, Hash, PartialEq, Clone, Copy, Debug)]
pub struct Ipv6Match {
    pub addr: Ipv6Addr,
    pub mask: Ipv6Addr,
}

impl Ipv6Match {
    pub fn is_exact(&self) -> bool {
        u128::from(self.mask) == u128::MAX
    }

    pub fn prefix_len(&self) -> Option<u32> {
        let mask = u128::from(self.mask);
        let len = mask.leading_ones();
        let expected = if len == 0 { 0 } else { u128::MAX << (128 - len) };
        if expected == mask {
            Some(len)
        } else {
            None
        }
    }
}

impl FromStr for Ipv6Match {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(2, '/');
        let addr: Ipv6Addr = parts
            .next()
            .unwrap_or_default()
            .parse()
            .map_err(|e| format!("{}: {}", s, e))?;
        let len = match parts.next() {
            None => 128,
            Some(len) => len.parse::<u32>().map_err(|e| format!("{}: {}", s, e))?,
        };
        if len > 128 {
            return Err(format!("{}: prefix longer than 128 bits", s));
        }
        let mask = if len == 0 { 0 } else { u128::MAX << (128 - len) };
        Ok(Ipv6Match {
            addr,
            mask: Ipv6Addr::from(mask),
        })
    }
}

impl Display for Ipv6Match {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self.prefix_len() {
            Some(128) => write!(f, "{}", self.addr),
            Some(len) => write!(f, "{}/{}", self.addr, len),
            None => write!(f, "{}/{}", self.addr, self.mask),
        }
    }
}

fn prefix_mask_u32(len: u32) -> u32 {
    if len == 0 {
        0
    } else {
        u32::MAX << (32 - len.min(32))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_mac() {
        let mac: MAC = "11:22:33:44:55:66".parse().unwrap();
        assert_eq!(mac, MAC([0x11, 0x22, 0x33, 0x44, 0x55, 0x66]));
        assert_eq!("AA:BB:CC:DD:EE:FF".parse::<MAC>().unwrap().to_string(), "aa:bb:cc:dd:ee:ff");
        assert!("11:22:33".parse::<MAC>().is_err());
        assert!(MAC::broadcast().is_broadcast());
    }

    #[test]
    fn test_ipv4_match() {
        let m: Ipv4Match = "10.0.0.0/8".parse().unwrap();
        assert_eq!(m.prefix_len(), Some(8));
        assert_eq!(m.to_string(), "10.0.0.0/8");

        let m: Ipv4Match = "10.0.0.1".parse().unwrap();
        assert!(m.is_exact());
        assert_eq!(m.to_string(), "10.0.0.1");

        let m: Ipv4Match = "10.0.0.1/255.0.255.0".parse().unwrap();
        assert_eq!(m.prefix_len(), None);
        assert_eq!(m.to_string(), "10.0.0.1/255.0.255.0");

        let m: Ipv4Match = "10.0.0.1/255.255.0.0".parse().unwrap();
        assert_eq!(m.to_string(), "10.0.0.1/16");

        assert!("10.0.0.1/33".parse::<Ipv4Match>().is_err());
        assert!("10.0.0".parse::<Ipv4Match>().is_err());
    }

    #[test]
    fn test_ipv6_match() {
        let m: Ipv6Match = "2001:db8::/32".parse().unwrap();
        assert_eq!(m.prefix_len(), Some(32));
        assert_eq!(m.to_string(), "2001:db8::/32");
        let m: Ipv6Match = "::1".parse().unwrap();
        assert!(m.is_exact());
        assert_eq!(m.to_string(), "::1");
    }
}
