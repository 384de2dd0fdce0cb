//! OpenFlow 1.0 flow-mod and flow stats entries.

use super::{check_len, finish_message, need, put_zeros, split_tlvs, FlowModCommand, Header, OFPT_FLOW_MOD};
use crate::error::WireError;
use crate::flow::stats::counter;
use crate::representation::OfpVersion;
use crate::util::value::MAC;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::net::Ipv4Addr;

pub const VERSION: OfpVersion = OfpVersion::V0X01;

pub const OFPP_MAX: u16 = 0xff00;
pub const OFPP_CONTROLLER: u16 = 0xfffd;
pub const OFPP_NONE: u16 = 0xffff;
pub const OFP_VLAN_NONE: u16 = 0xffff;

pub const OFPFW_IN_PORT: u32 = 1 << 0;
pub const OFPFW_DL_VLAN: u32 = 1 << 1;
pub const OFPFW_DL_SRC: u32 = 1 << 2;
pub const OFPFW_DL_DST: u32 = 1 << 3;
pub const OFPFW_DL_TYPE: u32 = 1 << 4;
pub const OFPFW_NW_PROTO: u32 = 1 << 5;
pub const OFPFW_TP_SRC: u32 = 1 << 6;
pub const OFPFW_TP_DST: u32 = 1 << 7;
pub const OFPFW_NW_SRC_SHIFT: u32 = 8;
pub const OFPFW_NW_DST_SHIFT: u32 = 14;
pub const OFPFW_NW_SRC_MASK: u32 = 0x3f << OFPFW_NW_SRC_SHIFT;
pub const OFPFW_NW_DST_MASK: u32 = 0x3f << OFPFW_NW_DST_SHIFT;
pub const OFPFW_DL_VLAN_PCP: u32 = 1 << 20;
pub const OFPFW_NW_TOS: u32 = 1 << 21;
pub const OFPFW_ALL: u32 = (1 << 22) - 1;

/// The fixed 12-tuple match. A field only counts when its wildcard bit is
/// clear; IPv4 addresses carry a count of wildcarded low-order bits instead.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Match {
    pub wildcards: u32,
    pub in_port: u16,
    pub dl_src: MAC,
    pub dl_dst: MAC,
    pub dl_vlan: u16,
    pub dl_vlan_pcp: u8,
    pub dl_type: u16,
    pub nw_tos: u8,
    pub nw_proto: u8,
    pub nw_src: Ipv4Addr,
    pub nw_dst: Ipv4Addr,
    pub tp_src: u16,
    pub tp_dst: u16,
}

impl Default for Match {
    fn default() -> Self {
        Match {
            wildcards: OFPFW_ALL,
            in_port: 0,
            dl_src: MAC::zero(),
            dl_dst: MAC::zero(),
            dl_vlan: 0,
            dl_vlan_pcp: 0,
            dl_type: 0,
            nw_tos: 0,
            nw_proto: 0,
            nw_src: Ipv4Addr::UNSPECIFIED,
            nw_dst: Ipv4Addr::UNSPECIFIED,
            tp_src: 0,
            tp_dst: 0,
        }
    }
}

impl Match {
    pub const LEN: usize = 40;

    pub fn is_wildcarded(&self, bit: u32) -> bool {
        self.wildcards & bit != 0
    }

    /// Number of wildcarded low-order bits of nw_src, 32 or more meaning all.
    pub fn nw_src_wildcard_bits(&self) -> u32 {
        (self.wildcards & OFPFW_NW_SRC_MASK) >> OFPFW_NW_SRC_SHIFT
    }

    pub fn nw_dst_wildcard_bits(&self) -> u32 {
        (self.wildcards & OFPFW_NW_DST_MASK) >> OFPFW_NW_DST_SHIFT
    }

    pub fn set_nw_src_wildcard_bits(&mut self, bits: u32) {
        self.wildcards = (self.wildcards & !OFPFW_NW_SRC_MASK) | ((bits & 0x3f) << OFPFW_NW_SRC_SHIFT);
    }

    pub fn set_nw_dst_wildcard_bits(&mut self, bits: u32) {
        self.wildcards = (self.wildcards & !OFPFW_NW_DST_MASK) | ((bits & 0x3f) << OFPFW_NW_DST_SHIFT);
    }

    fn write(&self, buf: &mut BytesMut) {
        buf.put_u32(self.wildcards);
        buf.put_u16(self.in_port);
        buf.put_slice(&self.dl_src.0);
        buf.put_slice(&self.dl_dst.0);
        buf.put_u16(self.dl_vlan);
        buf.put_u8(self.dl_vlan_pcp);
        put_zeros(buf, 1);
        buf.put_u16(self.dl_type);
        buf.put_u8(self.nw_tos);
        buf.put_u8(self.nw_proto);
        put_zeros(buf, 2);
        buf.put_u32(u32::from(self.nw_src));
        buf.put_u32(u32::from(self.nw_dst));
        buf.put_u16(self.tp_src);
        buf.put_u16(self.tp_dst);
    }

    fn read(buf: &mut &[u8]) -> Result<Match, WireError> {
        need(&*buf, Match::LEN, "ofp_match")?;
        let wildcards = buf.get_u32();
        let in_port = buf.get_u16();
        let dl_src = read_mac(buf);
        let dl_dst = read_mac(buf);
        let dl_vlan = buf.get_u16();
        let dl_vlan_pcp = buf.get_u8();
        buf.advance(1);
        let dl_type = buf.get_u16();
        let nw_tos = buf.get_u8();
        let nw_proto = buf.get_u8();
        buf.advance(2);
        let nw_src = Ipv4Addr::from(buf.get_u32());
        let nw_dst = Ipv4Addr::from(buf.get_u32());
        let tp_src = buf.get_u16();
        let tp_dst = buf.get_u16();
        Ok(Match {
            wildcards,
            in_port,
            dl_src,
            dl_dst,
            dl_vlan,
            dl_vlan_pcp,
            dl_type,
            nw_tos,
            nw_proto,
            nw_src,
            nw_dst,
            tp_src,
            tp_dst,
        })
    }
}

fn read_mac(buf: &mut &[u8]) -> MAC {
    let mut mac = [0u8; 6];
    buf.copy_to_slice(&mut mac);
    MAC(mac)
}

const OFPAT_OUTPUT: u16 = 0;
const OFPAT_SET_VLAN_VID: u16 = 1;
const OFPAT_SET_VLAN_PCP: u16 = 2;
const OFPAT_STRIP_VLAN: u16 = 3;
const OFPAT_SET_DL_SRC: u16 = 4;
const OFPAT_SET_DL_DST: u16 = 5;
const OFPAT_SET_NW_SRC: u16 = 6;
const OFPAT_SET_NW_DST: u16 = 7;
const OFPAT_SET_NW_TOS: u16 = 8;
const OFPAT_SET_TP_SRC: u16 = 9;
const OFPAT_SET_TP_DST: u16 = 10;
const OFPAT_ENQUEUE: u16 = 11;

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Action {
    Output { port: u16, max_len: u16 },
    SetVlanVid(u16),
    SetVlanPcp(u8),
    StripVlan,
    SetDlSrc(MAC),
    SetDlDst(MAC),
    SetNwSrc(Ipv4Addr),
    SetNwDst(Ipv4Addr),
    SetNwTos(u8),
    SetTpSrc(u16),
    SetTpDst(u16),
    Enqueue { port: u16, queue_id: u32 },
    /// Vendor or unknown action, kept verbatim (body excludes the header).
    Other { action_type: u16, body: Bytes },
}

impl Action {
    pub fn action_type(&self) -> u16 {
        match self {
            Action::Output { .. } => OFPAT_OUTPUT,
            Action::SetVlanVid(_) => OFPAT_SET_VLAN_VID,
            Action::SetVlanPcp(_) => OFPAT_SET_VLAN_PCP,
            Action::StripVlan => OFPAT_STRIP_VLAN,
            Action::SetDlSrc(_) => OFPAT_SET_DL_SRC,
            Action::SetDlDst(_) => OFPAT_SET_DL_DST,
            Action::SetNwSrc(_) => OFPAT_SET_NW_SRC,
            Action::SetNwDst(_) => OFPAT_SET_NW_DST,
            Action::SetNwTos(_) => OFPAT_SET_NW_TOS,
            Action::SetTpSrc(_) => OFPAT_SET_TP_SRC,
            Action::SetTpDst(_) => OFPAT_SET_TP_DST,
            Action::Enqueue { .. } => OFPAT_ENQUEUE,
            Action::Other { action_type, .. } => *action_type,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Action::SetDlSrc(_) | Action::SetDlDst(_) | Action::Enqueue { .. } => 16,
            Action::Other { body, .. } => 4 + body.len(),
            _ => 8,
        }
    }

    fn write(&self, buf: &mut BytesMut) {
        buf.put_u16(self.action_type());
        buf.put_u16(self.len() as u16);
        match self {
            Action::Output { port, max_len } => {
                buf.put_u16(*port);
                buf.put_u16(*max_len);
            }
            Action::SetVlanVid(vid) => {
                buf.put_u16(*vid);
                put_zeros(buf, 2);
            }
            Action::SetVlanPcp(pcp) => {
                buf.put_u8(*pcp);
                put_zeros(buf, 3);
            }
            Action::StripVlan => put_zeros(buf, 4),
            Action::SetDlSrc(mac) | Action::SetDlDst(mac) => {
                buf.put_slice(&mac.0);
                put_zeros(buf, 6);
            }
            Action::SetNwSrc(addr) | Action::SetNwDst(addr) => buf.put_u32(u32::from(*addr)),
            Action::SetNwTos(tos) => {
                buf.put_u8(*tos);
                put_zeros(buf, 3);
            }
            Action::SetTpSrc(port) | Action::SetTpDst(port) => {
                buf.put_u16(*port);
                put_zeros(buf, 2);
            }
            Action::Enqueue { port, queue_id } => {
                buf.put_u16(*port);
                put_zeros(buf, 6);
                buf.put_u32(*queue_id);
            }
            Action::Other { body, .. } => buf.put_slice(body),
        }
    }

    fn read(mut raw: &[u8]) -> Result<Action, WireError> {
        let action_type = raw.get_u16();
        let len = raw.get_u16() as usize;
        let expect = |body_len: usize| -> Result<(), WireError> {
            if len == 4 + body_len {
                Ok(())
            } else {
                Err(WireError::BadLength {
                    what: "ofp_action",
                    length: len,
                })
            }
        };
        let action = match action_type {
            OFPAT_OUTPUT => {
                expect(4)?;
                Action::Output {
                    port: raw.get_u16(),
                    max_len: raw.get_u16(),
                }
            }
            OFPAT_SET_VLAN_VID => {
                expect(4)?;
                Action::SetVlanVid(raw.get_u16())
            }
            OFPAT_SET_VLAN_PCP => {
                expect(4)?;
                Action::SetVlanPcp(raw.get_u8())
            }
            OFPAT_STRIP_VLAN => {
                expect(4)?;
                Action::StripVlan
            }
            OFPAT_SET_DL_SRC => {
                expect(12)?;
                Action::SetDlSrc(read_mac(&mut raw))
            }
            OFPAT_SET_DL_DST => {
                expect(12)?;
                Action::SetDlDst(read_mac(&mut raw))
            }
            OFPAT_SET_NW_SRC => {
                expect(4)?;
                Action::SetNwSrc(Ipv4Addr::from(raw.get_u32()))
            }
            OFPAT_SET_NW_DST => {
                expect(4)?;
                Action::SetNwDst(Ipv4Addr::from(raw.get_u32()))
            }
            OFPAT_SET_NW_TOS => {
                expect(4)?;
                Action::SetNwTos(raw.get_u8())
            }
            OFPAT_SET_TP_SRC => {
                expect(4)?;
                Action::SetTpSrc(raw.get_u16())
            }
            OFPAT_SET_TP_DST => {
                expect(4)?;
                Action::SetTpDst(raw.get_u16())
            }
            OFPAT_ENQUEUE => {
                expect(12)?;
                let port = raw.get_u16();
                raw.advance(6);
                Action::Enqueue {
                    port,
                    queue_id: raw.get_u32(),
                }
            }
            other => Action::Other {
                action_type: other,
                body: Bytes::copy_from_slice(raw),
            },
        };
        Ok(action)
    }

    pub fn read_all(buf: &[u8]) -> Result<Vec<Action>, WireError> {
        split_tlvs(buf, "ofp_action", 2, 8)?
            .into_iter()
            .map(Action::read)
            .collect()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct FlowMod {
    pub xid: u32,
    pub matches: Match,
    pub cookie: u64,
    pub command: FlowModCommand,
    pub idle_timeout: u16,
    pub hard_timeout: u16,
    pub priority: u16,
    pub buffer_id: u32,
    pub out_port: u16,
    pub flags: u16,
    pub actions: Vec<Action>,
}

impl FlowMod {
    /// Header, match and fixed fields, without actions.
    pub const MIN_LEN: usize = 72;

    pub fn len(&self) -> usize {
        FlowMod::MIN_LEN + self.actions.iter().map(Action::len).sum::<usize>()
    }

    pub fn pack(&self) -> Result<Bytes, WireError> {
        let mut buf = BytesMut::with_capacity(self.len());
        Header::write(&mut buf, VERSION, OFPT_FLOW_MOD, self.xid);
        self.matches.write(&mut buf);
        buf.put_u64(self.cookie);
        buf.put_u16(self.command.code() as u16);
        buf.put_u16(self.idle_timeout);
        buf.put_u16(self.hard_timeout);
        buf.put_u16(self.priority);
        buf.put_u32(self.buffer_id);
        buf.put_u16(self.out_port);
        buf.put_u16(self.flags);
        for action in self.actions.iter() {
            action.write(&mut buf);
        }
        finish_message(buf)
    }

    pub fn unpack(mut buf: &[u8]) -> Result<FlowMod, WireError> {
        let header = Header::read(&mut buf)?;
        let mut body = header.expect(VERSION, OFPT_FLOW_MOD, buf)?;
        need(&body, FlowMod::MIN_LEN - super::OFP_HEADER_LEN, "ofp_flow_mod")?;
        let matches = Match::read(&mut body)?;
        let cookie = body.get_u64();
        let command = FlowModCommand::from_code(body.get_u16())?;
        let idle_timeout = body.get_u16();
        let hard_timeout = body.get_u16();
        let priority = body.get_u16();
        let buffer_id = body.get_u32();
        let out_port = body.get_u16();
        let flags = body.get_u16();
        let actions = Action::read_all(body)?;
        Ok(FlowMod {
            xid: header.xid,
            matches,
            cookie,
            command,
            idle_timeout,
            hard_timeout,
            priority,
            buffer_id,
            out_port,
            flags,
            actions,
        })
    }
}

/// One `ofp_flow_stats` entry of a flow stats reply.
#[derive(Clone, Debug, PartialEq)]
pub struct FlowStats {
    pub table_id: u8,
    pub matches: Match,
    pub duration_sec: u32,
    pub duration_nsec: u32,
    pub priority: u16,
    pub idle_timeout: u16,
    pub hard_timeout: u16,
    pub cookie: u64,
    pub packet_count: Option<u64>,
    pub byte_count: Option<u64>,
    pub actions: Vec<Action>,
}

impl FlowStats {
    pub const MIN_LEN: usize = 88;

    pub fn pack(&self) -> Result<Bytes, WireError> {
        let len = FlowStats::MIN_LEN + self.actions.iter().map(Action::len).sum::<usize>();
        let mut buf = BytesMut::with_capacity(len);
        buf.put_u16(check_len(len, "ofp_flow_stats")?);
        buf.put_u8(self.table_id);
        put_zeros(&mut buf, 1);
        self.matches.write(&mut buf);
        buf.put_u32(self.duration_sec);
        buf.put_u32(self.duration_nsec);
        buf.put_u16(self.priority);
        buf.put_u16(self.idle_timeout);
        buf.put_u16(self.hard_timeout);
        put_zeros(&mut buf, 6);
        buf.put_u64(self.cookie);
        buf.put_u64(self.packet_count.unwrap_or(u64::MAX));
        buf.put_u64(self.byte_count.unwrap_or(u64::MAX));
        for action in self.actions.iter() {
            action.write(&mut buf);
        }
        Ok(buf.freeze())
    }

    pub fn unpack(mut buf: &[u8]) -> Result<FlowStats, WireError> {
        need(&buf, FlowStats::MIN_LEN, "ofp_flow_stats")?;
        let len = buf.get_u16() as usize;
        if len < FlowStats::MIN_LEN || len - 2 > buf.len() {
            return Err(WireError::BadLength {
                what: "ofp_flow_stats",
                length: len,
            });
        }
        let mut entry = &buf[..len - 2];
        let table_id = entry.get_u8();
        entry.advance(1);
        let matches = Match::read(&mut entry)?;
        let duration_sec = entry.get_u32();
        let duration_nsec = entry.get_u32();
        let priority = entry.get_u16();
        let idle_timeout = entry.get_u16();
        let hard_timeout = entry.get_u16();
        entry.advance(6);
        let cookie = entry.get_u64();
        let packet_count = counter(entry.get_u64());
        let byte_count = counter(entry.get_u64());
        let actions = Action::read_all(entry)?;
        Ok(FlowStats {
            table_id,
            matches,
            duration_sec,
            duration_nsec,
            priority,
            idle_timeout,
            hard_timeout,
            cookie,
            packet_count,
            byte_count,
            actions,
        })
    }

    pub fn unpack_all(body: &[u8]) -> Result<Vec<FlowStats>, WireError> {
        split_tlvs(body, "ofp_flow_stats", 0, FlowStats::MIN_LEN)?
            .into_iter()
            .map(FlowStats::unpack)
            .collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn flow_mod() -> FlowMod {
        let mut matches = Match::default();
        matches.wildcards &= !OFPFW_DL_SRC;
        matches.dl_src = MAC([0x11, 0x22, 0x33, 0x44, 0x55, 0x66]);
        FlowMod {
            xid: 7,
            matches,
            cookie: 5,
            command: FlowModCommand::Add,
            idle_timeout: 3,
            hard_timeout: 4,
            priority: 2,
            buffer_id: super::super::OFP_NO_BUFFER,
            out_port: OFPP_NONE,
            flags: 0,
            actions: vec![Action::SetVlanVid(6), Action::Output { port: 1, max_len: 0xffff }],
        }
    }

    #[test]
    fn test_pack_flow_mod() {
        let packed = flow_mod().pack().unwrap();
        assert_eq!(packed.len(), FlowMod::MIN_LEN + 16);
        assert_eq!(&packed[..4], &[0x01, OFPT_FLOW_MOD, 0, 88]);
        // wildcards with only dl_src cleared
        assert_eq!(&packed[8..12], &(OFPFW_ALL & !OFPFW_DL_SRC).to_be_bytes());
        // cookie follows the 40 byte match
        assert_eq!(&packed[48..56], &5u64.to_be_bytes());
        assert_eq!(FlowMod::unpack(&packed).unwrap(), flow_mod());
    }

    #[test]
    fn test_unpack_rejects_truncated() {
        let packed = flow_mod().pack().unwrap();
        assert!(FlowMod::unpack(&packed[..60]).is_err());
        let mut wrong_type = packed.to_vec();
        wrong_type[1] = 10;
        assert!(FlowMod::unpack(&wrong_type).is_err());
    }

    #[test]
    fn test_pack_rejects_oversized() {
        let mut m = flow_mod();
        m.actions = vec![Action::Output { port: 1, max_len: 0 }; 8200];
        assert_eq!(m.len(), 65672);
        assert!(matches!(m.pack(), Err(WireError::BadLength { length: 65672, .. })));

        let entry = FlowStats {
            table_id: 0,
            matches: Match::default(),
            duration_sec: 0,
            duration_nsec: 0,
            priority: 0,
            idle_timeout: 0,
            hard_timeout: 0,
            cookie: 0,
            packet_count: None,
            byte_count: None,
            actions: m.actions,
        };
        assert!(entry.pack().is_err());
    }

    #[test]
    fn test_nw_wildcard_bits() {
        let mut m = Match::default();
        m.set_nw_src_wildcard_bits(8);
        m.set_nw_dst_wildcard_bits(0);
        assert_eq!(m.nw_src_wildcard_bits(), 8);
        assert_eq!(m.nw_dst_wildcard_bits(), 0);
        assert!(m.is_wildcarded(OFPFW_IN_PORT));
    }

    #[test]
    fn test_flow_stats_entries() {
        let entry = FlowStats {
            table_id: 0,
            matches: Match::default(),
            duration_sec: 10,
            duration_nsec: 20,
            priority: 100,
            idle_timeout: 0,
            hard_timeout: 0,
            cookie: 1,
            packet_count: Some(3),
            byte_count: None,
            actions: vec![Action::StripVlan, Action::SetDlDst(MAC::broadcast())],
        };
        let mut body = entry.pack().unwrap().to_vec();
        assert_eq!(body.len(), FlowStats::MIN_LEN + 24);
        body.extend_from_slice(&entry.pack().unwrap());
        let entries = FlowStats::unpack_all(&body).unwrap();
        assert_eq!(entries, vec![entry.clone(), entry]);
    }

    #[test]
    fn test_unknown_action_kept() {
        let raw = [0xffu8, 0xff, 0, 8, 0, 0, 0x23, 0x20];
        let actions = Action::read_all(&raw).unwrap();
        assert_eq!(
            actions,
            vec![Action::Other {
                action_type: 0xffff,
                body: Bytes::copy_from_slice(&[0, 0, 0x23, 0x20]),
            }]
        );
    }
}
