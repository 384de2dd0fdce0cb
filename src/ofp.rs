//! Wire level OpenFlow messages the flow layer produces and consumes.
//!
//! Only the pieces needed to install, modify, delete and report flows are
//! modelled: the flow-mod message and the flow entries of a flow stats
//! (multipart) reply, for OpenFlow 1.0 and 1.3.

use crate::error::{Result, WireError};
use crate::representation::OfpVersion;
use byteorder::{BigEndian, ByteOrder};
use bytes::{Buf, BufMut, Bytes, BytesMut};

pub mod v0x01;
pub mod v0x04;

pub const OFP_HEADER_LEN: usize = 8;
pub const OFPT_FLOW_MOD: u8 = 14;
pub const OFPT_STATS_REPLY_V0X01: u8 = 17;
pub const OFPT_MULTIPART_REPLY_V0X04: u8 = 19;
pub const OFPST_FLOW: u16 = 1;
pub const OFP_NO_BUFFER: u32 = 0xffff_ffff;

pub const OFPFF_SEND_FLOW_REM: u16 = 1 << 0;
pub const OFPFF_CHECK_OVERLAP: u16 = 1 << 1;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum FlowModCommand {
    Add,
    Modify,
    ModifyStrict,
    Delete,
    DeleteStrict,
}

impl FlowModCommand {
    /// Command codes are the same in 1.0 and 1.3; only the field width differs.
    pub fn code(self) -> u8 {
        match self {
            FlowModCommand::Add => 0,
            FlowModCommand::Modify => 1,
            FlowModCommand::ModifyStrict => 2,
            FlowModCommand::Delete => 3,
            FlowModCommand::DeleteStrict => 4,
        }
    }

    pub fn from_code(code: u16) -> std::result::Result<FlowModCommand, WireError> {
        Ok(match code {
            0 => FlowModCommand::Add,
            1 => FlowModCommand::Modify,
            2 => FlowModCommand::ModifyStrict,
            3 => FlowModCommand::Delete,
            4 => FlowModCommand::DeleteStrict,
            other => {
                return Err(WireError::UnexpectedValue {
                    what: "flow-mod command",
                    value: other as u64,
                })
            }
        })
    }

    pub fn is_delete(self) -> bool {
        matches!(self, FlowModCommand::Delete | FlowModCommand::DeleteStrict)
    }
}

/// A flow-mod ready to be handed to the connection of the switch.
#[derive(Clone, Debug, PartialEq)]
pub enum FlowMod {
    V0x01(v0x01::FlowMod),
    V0x04(v0x04::FlowMod),
}

impl FlowMod {
    pub fn version(&self) -> OfpVersion {
        match self {
            FlowMod::V0x01(_) => OfpVersion::V0X01,
            FlowMod::V0x04(_) => OfpVersion::V0X04,
        }
    }

    pub fn command(&self) -> FlowModCommand {
        match self {
            FlowMod::V0x01(m) => m.command,
            FlowMod::V0x04(m) => m.command,
        }
    }

    pub fn cookie(&self) -> u64 {
        match self {
            FlowMod::V0x01(m) => m.cookie,
            FlowMod::V0x04(m) => m.cookie,
        }
    }

    pub fn idle_timeout(&self) -> u16 {
        match self {
            FlowMod::V0x01(m) => m.idle_timeout,
            FlowMod::V0x04(m) => m.idle_timeout,
        }
    }

    pub fn hard_timeout(&self) -> u16 {
        match self {
            FlowMod::V0x01(m) => m.hard_timeout,
            FlowMod::V0x04(m) => m.hard_timeout,
        }
    }

    pub fn priority(&self) -> u16 {
        match self {
            FlowMod::V0x01(m) => m.priority,
            FlowMod::V0x04(m) => m.priority,
        }
    }

    pub fn xid(&self) -> u32 {
        match self {
            FlowMod::V0x01(m) => m.xid,
            FlowMod::V0x04(m) => m.xid,
        }
    }

    pub fn set_xid(&mut self, xid: u32) {
        match self {
            FlowMod::V0x01(m) => m.xid = xid,
            FlowMod::V0x04(m) => m.xid = xid,
        }
    }

    /// Total message length, header included.
    pub fn len(&self) -> usize {
        match self {
            FlowMod::V0x01(m) => m.len(),
            FlowMod::V0x04(m) => m.len(),
        }
    }

    pub fn pack(&self) -> Result<Bytes> {
        let packed = match self {
            FlowMod::V0x01(m) => m.pack()?,
            FlowMod::V0x04(m) => m.pack()?,
        };
        Ok(packed)
    }

    /// Parse a complete flow-mod message, header included.
    pub fn unpack(buf: &[u8]) -> Result<FlowMod> {
        need(&buf, 1, "ofp header")?;
        match OfpVersion(buf[0]) {
            OfpVersion::V0X01 => Ok(FlowMod::V0x01(v0x01::FlowMod::unpack(buf)?)),
            OfpVersion::V0X04 => Ok(FlowMod::V0x04(v0x04::FlowMod::unpack(buf)?)),
            OfpVersion(v) => Err(WireError::UnexpectedValue {
                what: "ofp version",
                value: v as u64,
            }
            .into()),
        }
    }
}

impl From<v0x01::FlowMod> for FlowMod {
    fn from(m: v0x01::FlowMod) -> Self {
        FlowMod::V0x01(m)
    }
}

impl From<v0x04::FlowMod> for FlowMod {
    fn from(m: v0x04::FlowMod) -> Self {
        FlowMod::V0x04(m)
    }
}

/// One flow entry of a flow stats reply, as delivered by the connection.
#[derive(Clone, Debug, PartialEq)]
pub enum FlowStats {
    V0x01(v0x01::FlowStats),
    V0x04(v0x04::FlowStats),
}

impl FlowStats {
    pub fn version(&self) -> OfpVersion {
        match self {
            FlowStats::V0x01(_) => OfpVersion::V0X01,
            FlowStats::V0x04(_) => OfpVersion::V0X04,
        }
    }

    /// Split the body of a flow stats reply into entries of `version`.
    pub fn unpack_all(version: OfpVersion, body: &[u8]) -> Result<Vec<FlowStats>> {
        match version {
            OfpVersion::V0X01 => Ok(v0x01::FlowStats::unpack_all(body)?
                .into_iter()
                .map(FlowStats::V0x01)
                .collect()),
            OfpVersion::V0X04 => Ok(v0x04::FlowStats::unpack_all(body)?
                .into_iter()
                .map(FlowStats::V0x04)
                .collect()),
            OfpVersion(v) => Err(WireError::UnexpectedValue {
                what: "ofp version",
                value: v as u64,
            }
            .into()),
        }
    }

    /// Parse a complete flow stats (1.0) or multipart flow (1.3) reply.
    pub fn unpack_reply(mut buf: &[u8]) -> Result<Vec<FlowStats>> {
        let header = Header::read(&mut buf)?;
        let version = OfpVersion(header.version);
        let (msg_type, pad) = match version {
            OfpVersion::V0X01 => (OFPT_STATS_REPLY_V0X01, 0),
            OfpVersion::V0X04 => (OFPT_MULTIPART_REPLY_V0X04, 4),
            OfpVersion(v) => {
                return Err(WireError::UnexpectedValue {
                    what: "ofp version",
                    value: v as u64,
                }
                .into())
            }
        };
        let mut body = header.expect(version, msg_type, buf)?;
        need(&body, 4 + pad, "stats reply")?;
        let stats_type = body.get_u16();
        if stats_type != OFPST_FLOW {
            return Err(WireError::UnexpectedValue {
                what: "stats type",
                value: stats_type as u64,
            }
            .into());
        }
        // flags, then padding on 1.3
        body.advance(2 + pad);
        FlowStats::unpack_all(version, body)
    }
}

impl From<v0x01::FlowStats> for FlowStats {
    fn from(s: v0x01::FlowStats) -> Self {
        FlowStats::V0x01(s)
    }
}

impl From<v0x04::FlowStats> for FlowStats {
    fn from(s: v0x04::FlowStats) -> Self {
        FlowStats::V0x04(s)
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Header {
    pub version: u8,
    pub msg_type: u8,
    pub length: u16,
    pub xid: u32,
}

impl Header {
    pub(crate) fn write(buf: &mut BytesMut, version: OfpVersion, msg_type: u8, xid: u32) {
        buf.put_u8(version.0);
        buf.put_u8(msg_type);
        // patched by finish_message
        buf.put_u16(0);
        buf.put_u32(xid);
    }

    pub(crate) fn read(buf: &mut &[u8]) -> std::result::Result<Header, WireError> {
        need(&*buf, OFP_HEADER_LEN, "ofp header")?;
        let header = Header {
            version: buf.get_u8(),
            msg_type: buf.get_u8(),
            length: buf.get_u16(),
            xid: buf.get_u32(),
        };
        if (header.length as usize) < OFP_HEADER_LEN {
            return Err(WireError::BadLength {
                what: "ofp header",
                length: header.length as usize,
            });
        }
        Ok(header)
    }

    /// Check a parsed header against what the caller expects and return the
    /// message body it announces.
    pub(crate) fn expect<'a>(
        &self,
        version: OfpVersion,
        msg_type: u8,
        body: &'a [u8],
    ) -> std::result::Result<&'a [u8], WireError> {
        if self.version != version.0 {
            return Err(WireError::UnexpectedValue {
                what: "ofp version",
                value: self.version as u64,
            });
        }
        if self.msg_type != msg_type {
            return Err(WireError::UnexpectedValue {
                what: "message type",
                value: self.msg_type as u64,
            });
        }
        let body_len = self.length as usize - OFP_HEADER_LEN;
        need(&body, body_len, "message body")?;
        Ok(&body[..body_len])
    }
}

/// Length fields are 16 bits wide.
pub(crate) fn check_len(len: usize, what: &'static str) -> std::result::Result<u16, WireError> {
    if len > u16::MAX as usize {
        Err(WireError::BadLength { what, length: len })
    } else {
        Ok(len as u16)
    }
}

/// Write the total length into the header at the start of `buf`.
pub(crate) fn finish_message(mut buf: BytesMut) -> std::result::Result<Bytes, WireError> {
    let len = check_len(buf.len(), "ofp message")?;
    BigEndian::write_u16(&mut buf[2..4], len);
    Ok(buf.freeze())
}

pub(crate) fn need<B: Buf>(buf: &B, needed: usize, what: &'static str) -> std::result::Result<(), WireError> {
    if buf.remaining() < needed {
        Err(WireError::Truncated {
            what,
            needed,
            remaining: buf.remaining(),
        })
    } else {
        Ok(())
    }
}

pub(crate) fn put_zeros(buf: &mut BytesMut, n: usize) {
    for _ in 0..n {
        buf.put_u8(0);
    }
}

pub(crate) fn padded_len(len: usize) -> usize {
    (len + 7) / 8 * 8
}

/// Split a sequence of `type, length` prefixed TLVs (actions, instructions,
/// stats entries) into the raw slice of each element.
pub(crate) fn split_tlvs<'a>(
    mut buf: &'a [u8],
    what: &'static str,
    length_offset: usize,
    min_len: usize,
) -> std::result::Result<Vec<&'a [u8]>, WireError> {
    let mut items = vec![];
    while !buf.is_empty() {
        need(&buf, length_offset + 2, what)?;
        let len = BigEndian::read_u16(&buf[length_offset..length_offset + 2]) as usize;
        if len < min_len || len % 8 != 0 {
            return Err(WireError::BadLength { what, length: len });
        }
        need(&buf, len, what)?;
        items.push(&buf[..len]);
        buf = &buf[len..];
    }
    Ok(items)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_command_codes() {
        for command in [
            FlowModCommand::Add,
            FlowModCommand::Modify,
            FlowModCommand::ModifyStrict,
            FlowModCommand::Delete,
            FlowModCommand::DeleteStrict,
        ]
        .iter()
        {
            assert_eq!(FlowModCommand::from_code(command.code() as u16).unwrap(), *command);
        }
        assert!(FlowModCommand::from_code(5).is_err());
        assert!(FlowModCommand::DeleteStrict.is_delete());
        assert!(!FlowModCommand::ModifyStrict.is_delete());
    }

    #[test]
    fn test_split_tlvs() {
        let buf = [0u8, 0, 0, 8, 1, 2, 3, 4, 0, 1, 0, 16, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0];
        let items = split_tlvs(&buf, "action", 2, 8).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].len(), 16);

        let short = [0u8, 0, 0, 16, 0, 0, 0, 0];
        assert!(split_tlvs(&short, "action", 2, 8).is_err());
        let odd = [0u8, 0, 0, 6, 0, 0];
        assert!(split_tlvs(&odd, "action", 2, 8).is_err());
    }

    #[test]
    fn test_finish_message_length_limit() {
        let mut buf = BytesMut::new();
        Header::write(&mut buf, OfpVersion::V0X04, OFPT_FLOW_MOD, 1);
        put_zeros(&mut buf, u16::MAX as usize - OFP_HEADER_LEN);
        let max = finish_message(buf.clone()).unwrap();
        assert_eq!(BigEndian::read_u16(&max[2..4]), u16::MAX);

        buf.put_u8(0);
        match finish_message(buf) {
            Err(WireError::BadLength { length, .. }) => assert_eq!(length, 65536),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_unpack_reply() {
        let entry = v0x04::FlowStats {
            table_id: 0,
            duration_sec: 1,
            duration_nsec: 2,
            priority: 3,
            idle_timeout: 0,
            hard_timeout: 0,
            flags: 0,
            cookie: 4,
            packet_count: Some(5),
            byte_count: Some(6),
            matches: v0x04::Match::new(),
            instructions: vec![],
        };
        let mut buf = BytesMut::new();
        Header::write(&mut buf, OfpVersion::V0X04, OFPT_MULTIPART_REPLY_V0X04, 9);
        buf.put_u16(OFPST_FLOW);
        put_zeros(&mut buf, 6);
        buf.put_slice(&entry.pack().unwrap());
        let reply = finish_message(buf).unwrap();
        assert_eq!(FlowStats::unpack_reply(&reply).unwrap(), vec![FlowStats::V0x04(entry)]);

        let mut wrong = reply.to_vec();
        wrong[9] = 2;
        assert!(FlowStats::unpack_reply(&wrong).is_err());
    }

    #[test]
    fn test_unpack_unknown_version() {
        let buf = [0x06u8, OFPT_FLOW_MOD, 0, 8, 0, 0, 0, 0];
        assert!(FlowMod::unpack(&buf).is_err());
        assert!(FlowMod::unpack(&[]).is_err());
    }
}
