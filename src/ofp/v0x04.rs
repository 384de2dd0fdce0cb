//! OpenFlow 1.3 flow-mod, OXM match, instructions and flow stats entries.

use super::{
    check_len, finish_message, need, padded_len, put_zeros, split_tlvs, FlowModCommand, Header, OFPT_FLOW_MOD,
    OFP_HEADER_LEN,
};
use crate::error::WireError;
use crate::flow::stats::counter;
use crate::representation::OfpVersion;
use crate::util::value::MAC;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use smallvec::SmallVec;
use std::net::{Ipv4Addr, Ipv6Addr};

pub const VERSION: OfpVersion = OfpVersion::V0X04;

pub const OFPP_MAX: u32 = 0xffff_ff00;
pub const OFPP_CONTROLLER: u32 = 0xffff_fffd;
pub const OFPP_ANY: u32 = 0xffff_ffff;
pub const OFPG_ANY: u32 = 0xffff_ffff;
pub const OFPCML_NO_BUFFER: u16 = 0xffff;

pub const OFPVID_PRESENT: u16 = 0x1000;
pub const OFPVID_NONE: u16 = 0x0000;

pub const OFPFF_RESET_COUNTS: u16 = 1 << 2;
pub const OFPFF_NO_PKT_COUNTS: u16 = 1 << 3;
pub const OFPFF_NO_BYT_COUNTS: u16 = 1 << 4;

pub const OFPXMC_OPENFLOW_BASIC: u16 = 0x8000;
const OFPMT_OXM: u16 = 1;

const OXM_IN_PORT: u8 = 0;
const OXM_ETH_DST: u8 = 3;
const OXM_ETH_SRC: u8 = 4;
const OXM_ETH_TYPE: u8 = 5;
const OXM_VLAN_VID: u8 = 6;
const OXM_VLAN_PCP: u8 = 7;
const OXM_IP_PROTO: u8 = 10;
const OXM_IPV4_SRC: u8 = 11;
const OXM_IPV4_DST: u8 = 12;
const OXM_TCP_SRC: u8 = 13;
const OXM_TCP_DST: u8 = 14;
const OXM_UDP_SRC: u8 = 15;
const OXM_UDP_DST: u8 = 16;
const OXM_SCTP_SRC: u8 = 17;
const OXM_SCTP_DST: u8 = 18;
const OXM_ICMPV4_TYPE: u8 = 19;
const OXM_ICMPV4_CODE: u8 = 20;
const OXM_IPV6_SRC: u8 = 26;
const OXM_IPV6_DST: u8 = 27;

/// One OXM TLV of the basic class. IPv4 and IPv6 addresses may carry a
/// mask; every other masked or unknown TLV is kept as `Other`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum OxmField {
    InPort(u32),
    EthDst(MAC),
    EthSrc(MAC),
    EthType(u16),
    /// The raw field, `OFPVID_PRESENT` included for tagged packets.
    VlanVid(u16),
    VlanPcp(u8),
    IpProto(u8),
    Ipv4Src(Ipv4Addr, Option<Ipv4Addr>),
    Ipv4Dst(Ipv4Addr, Option<Ipv4Addr>),
    TcpSrc(u16),
    TcpDst(u16),
    UdpSrc(u16),
    UdpDst(u16),
    SctpSrc(u16),
    SctpDst(u16),
    Icmpv4Type(u8),
    Icmpv4Code(u8),
    Ipv6Src(Ipv6Addr, Option<Ipv6Addr>),
    Ipv6Dst(Ipv6Addr, Option<Ipv6Addr>),
    Other {
        class: u16,
        field: u8,
        has_mask: bool,
        payload: Bytes,
    },
}

impl OxmField {
    fn header(&self) -> (u16, u8, bool) {
        let basic = |field: u8, has_mask: bool| (OFPXMC_OPENFLOW_BASIC, field, has_mask);
        match self {
            OxmField::InPort(_) => basic(OXM_IN_PORT, false),
            OxmField::EthDst(_) => basic(OXM_ETH_DST, false),
            OxmField::EthSrc(_) => basic(OXM_ETH_SRC, false),
            OxmField::EthType(_) => basic(OXM_ETH_TYPE, false),
            OxmField::VlanVid(_) => basic(OXM_VLAN_VID, false),
            OxmField::VlanPcp(_) => basic(OXM_VLAN_PCP, false),
            OxmField::IpProto(_) => basic(OXM_IP_PROTO, false),
            OxmField::Ipv4Src(_, mask) => basic(OXM_IPV4_SRC, mask.is_some()),
            OxmField::Ipv4Dst(_, mask) => basic(OXM_IPV4_DST, mask.is_some()),
            OxmField::TcpSrc(_) => basic(OXM_TCP_SRC, false),
            OxmField::TcpDst(_) => basic(OXM_TCP_DST, false),
            OxmField::UdpSrc(_) => basic(OXM_UDP_SRC, false),
            OxmField::UdpDst(_) => basic(OXM_UDP_DST, false),
            OxmField::SctpSrc(_) => basic(OXM_SCTP_SRC, false),
            OxmField::SctpDst(_) => basic(OXM_SCTP_DST, false),
            OxmField::Icmpv4Type(_) => basic(OXM_ICMPV4_TYPE, false),
            OxmField::Icmpv4Code(_) => basic(OXM_ICMPV4_CODE, false),
            OxmField::Ipv6Src(_, mask) => basic(OXM_IPV6_SRC, mask.is_some()),
            OxmField::Ipv6Dst(_, mask) => basic(OXM_IPV6_DST, mask.is_some()),
            OxmField::Other {
                class,
                field,
                has_mask,
                ..
            } => (*class, *field, *has_mask),
        }
    }

    fn payload_len(&self) -> usize {
        match self {
            OxmField::InPort(_) => 4,
            OxmField::EthDst(_) | OxmField::EthSrc(_) => 6,
            OxmField::VlanPcp(_) | OxmField::IpProto(_) | OxmField::Icmpv4Type(_) | OxmField::Icmpv4Code(_) => 1,
            OxmField::Ipv4Src(_, mask) | OxmField::Ipv4Dst(_, mask) => {
                if mask.is_some() {
                    8
                } else {
                    4
                }
            }
            OxmField::Ipv6Src(_, mask) | OxmField::Ipv6Dst(_, mask) => {
                if mask.is_some() {
                    32
                } else {
                    16
                }
            }
            OxmField::Other { payload, .. } => payload.len(),
            _ => 2,
        }
    }

    /// Length on the wire, OXM header included.
    pub fn len(&self) -> usize {
        4 + self.payload_len()
    }

    fn write(&self, buf: &mut BytesMut) {
        let (class, field, has_mask) = self.header();
        buf.put_u16(class);
        buf.put_u8(field << 1 | has_mask as u8);
        buf.put_u8(self.payload_len() as u8);
        match self {
            OxmField::InPort(port) => buf.put_u32(*port),
            OxmField::EthDst(mac) | OxmField::EthSrc(mac) => buf.put_slice(&mac.0),
            OxmField::VlanPcp(v)
            | OxmField::IpProto(v)
            | OxmField::Icmpv4Type(v)
            | OxmField::Icmpv4Code(v) => buf.put_u8(*v),
            OxmField::EthType(v)
            | OxmField::VlanVid(v)
            | OxmField::TcpSrc(v)
            | OxmField::TcpDst(v)
            | OxmField::UdpSrc(v)
            | OxmField::UdpDst(v)
            | OxmField::SctpSrc(v)
            | OxmField::SctpDst(v) => buf.put_u16(*v),
            OxmField::Ipv4Src(addr, mask) | OxmField::Ipv4Dst(addr, mask) => {
                buf.put_u32(u32::from(*addr));
                if let Some(mask) = mask {
                    buf.put_u32(u32::from(*mask));
                }
            }
            OxmField::Ipv6Src(addr, mask) | OxmField::Ipv6Dst(addr, mask) => {
                buf.put_slice(&addr.octets());
                if let Some(mask) = mask {
                    buf.put_slice(&mask.octets());
                }
            }
            OxmField::Other { payload, .. } => buf.put_slice(payload),
        }
    }

    fn read(buf: &mut &[u8]) -> Result<OxmField, WireError> {
        need(&*buf, 4, "oxm header")?;
        let class = buf.get_u16();
        let field_hm = buf.get_u8();
        let len = buf.get_u8() as usize;
        need(&*buf, len, "oxm payload")?;
        let mut payload = &buf[..len];
        buf.advance(len);

        let field = field_hm >> 1;
        let has_mask = field_hm & 1 == 1;
        let other = || OxmField::Other {
            class,
            field,
            has_mask,
            payload: Bytes::copy_from_slice(payload),
        };
        if class != OFPXMC_OPENFLOW_BASIC {
            return Ok(other());
        }
        let expected = match (field, has_mask) {
            (OXM_IN_PORT, false) => 4,
            (OXM_ETH_DST, false) | (OXM_ETH_SRC, false) => 6,
            (OXM_VLAN_PCP, false)
            | (OXM_IP_PROTO, false)
            | (OXM_ICMPV4_TYPE, false)
            | (OXM_ICMPV4_CODE, false) => 1,
            (OXM_ETH_TYPE, false)
            | (OXM_VLAN_VID, false)
            | (OXM_TCP_SRC, false)
            | (OXM_TCP_DST, false)
            | (OXM_UDP_SRC, false)
            | (OXM_UDP_DST, false)
            | (OXM_SCTP_SRC, false)
            | (OXM_SCTP_DST, false) => 2,
            (OXM_IPV4_SRC, m) | (OXM_IPV4_DST, m) => {
                if m {
                    8
                } else {
                    4
                }
            }
            (OXM_IPV6_SRC, m) | (OXM_IPV6_DST, m) => {
                if m {
                    32
                } else {
                    16
                }
            }
            _ => return Ok(other()),
        };
        if len != expected {
            return Err(WireError::BadLength {
                what: "oxm payload",
                length: len,
            });
        }
        let value = match field {
            OXM_IN_PORT => OxmField::InPort(payload.get_u32()),
            OXM_ETH_DST => OxmField::EthDst(read_mac(&mut payload)),
            OXM_ETH_SRC => OxmField::EthSrc(read_mac(&mut payload)),
            OXM_ETH_TYPE => OxmField::EthType(payload.get_u16()),
            OXM_VLAN_VID => OxmField::VlanVid(payload.get_u16()),
            OXM_VLAN_PCP => OxmField::VlanPcp(payload.get_u8()),
            OXM_IP_PROTO => OxmField::IpProto(payload.get_u8()),
            OXM_TCP_SRC => OxmField::TcpSrc(payload.get_u16()),
            OXM_TCP_DST => OxmField::TcpDst(payload.get_u16()),
            OXM_UDP_SRC => OxmField::UdpSrc(payload.get_u16()),
            OXM_UDP_DST => OxmField::UdpDst(payload.get_u16()),
            OXM_SCTP_SRC => OxmField::SctpSrc(payload.get_u16()),
            OXM_SCTP_DST => OxmField::SctpDst(payload.get_u16()),
            OXM_ICMPV4_TYPE => OxmField::Icmpv4Type(payload.get_u8()),
            OXM_ICMPV4_CODE => OxmField::Icmpv4Code(payload.get_u8()),
            OXM_IPV4_SRC | OXM_IPV4_DST => {
                let addr = Ipv4Addr::from(payload.get_u32());
                let mask = if has_mask {
                    Some(Ipv4Addr::from(payload.get_u32()))
                } else {
                    None
                };
                if field == OXM_IPV4_SRC {
                    OxmField::Ipv4Src(addr, mask)
                } else {
                    OxmField::Ipv4Dst(addr, mask)
                }
            }
            _ => {
                let addr = read_ipv6(&mut payload);
                let mask = if has_mask {
                    Some(read_ipv6(&mut payload))
                } else {
                    None
                };
                if field == OXM_IPV6_SRC {
                    OxmField::Ipv6Src(addr, mask)
                } else {
                    OxmField::Ipv6Dst(addr, mask)
                }
            }
        };
        Ok(value)
    }
}

fn read_mac(buf: &mut &[u8]) -> MAC {
    let mut mac = [0u8; 6];
    buf.copy_to_slice(&mut mac);
    MAC(mac)
}

fn read_ipv6(buf: &mut &[u8]) -> Ipv6Addr {
    let mut octets = [0u8; 16];
    buf.copy_to_slice(&mut octets);
    Ipv6Addr::from(octets)
}

/// `ofp_match` of type OXM. An empty match is the wildcard-all match.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Match {
    pub fields: SmallVec<[OxmField; 4]>,
}

impl Match {
    pub fn new() -> Match {
        Match::default()
    }

    pub fn push(&mut self, field: OxmField) {
        self.fields.push(field);
    }

    /// Length of the match including its padding to 8 bytes.
    pub fn len(&self) -> usize {
        padded_len(self.unpadded_len())
    }

    fn unpadded_len(&self) -> usize {
        4 + self.fields.iter().map(OxmField::len).sum::<usize>()
    }

    fn write(&self, buf: &mut BytesMut) {
        let len = self.unpadded_len();
        buf.put_u16(OFPMT_OXM);
        buf.put_u16(len as u16);
        for field in self.fields.iter() {
            field.write(buf);
        }
        put_zeros(buf, padded_len(len) - len);
    }

    fn read(buf: &mut &[u8]) -> Result<Match, WireError> {
        need(&*buf, 4, "ofp_match")?;
        let match_type = buf.get_u16();
        if match_type != OFPMT_OXM {
            return Err(WireError::UnexpectedValue {
                what: "match type",
                value: match_type as u64,
            });
        }
        let len = buf.get_u16() as usize;
        if len < 4 {
            return Err(WireError::BadLength {
                what: "ofp_match",
                length: len,
            });
        }
        need(&*buf, padded_len(len) - 4, "ofp_match")?;
        let mut oxms = &buf[..len - 4];
        buf.advance(padded_len(len) - 4);
        let mut fields = SmallVec::new();
        while !oxms.is_empty() {
            fields.push(OxmField::read(&mut oxms)?);
        }
        Ok(Match { fields })
    }
}

const OFPAT_OUTPUT: u16 = 0;
const OFPAT_PUSH_VLAN: u16 = 17;
const OFPAT_POP_VLAN: u16 = 18;
const OFPAT_SET_FIELD: u16 = 25;

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Action {
    Output { port: u32, max_len: u16 },
    PushVlan(u16),
    PopVlan,
    SetField(OxmField),
    Other { action_type: u16, body: Bytes },
}

impl Action {
    pub fn len(&self) -> usize {
        match self {
            Action::Output { .. } => 16,
            Action::PushVlan(_) | Action::PopVlan => 8,
            Action::SetField(field) => padded_len(4 + field.len()),
            Action::Other { body, .. } => 4 + body.len(),
        }
    }

    fn write(&self, buf: &mut BytesMut) {
        let action_type = match self {
            Action::Output { .. } => OFPAT_OUTPUT,
            Action::PushVlan(_) => OFPAT_PUSH_VLAN,
            Action::PopVlan => OFPAT_POP_VLAN,
            Action::SetField(_) => OFPAT_SET_FIELD,
            Action::Other { action_type, .. } => *action_type,
        };
        buf.put_u16(action_type);
        buf.put_u16(self.len() as u16);
        match self {
            Action::Output { port, max_len } => {
                buf.put_u32(*port);
                buf.put_u16(*max_len);
                put_zeros(buf, 6);
            }
            Action::PushVlan(ethertype) => {
                buf.put_u16(*ethertype);
                put_zeros(buf, 2);
            }
            Action::PopVlan => put_zeros(buf, 4),
            Action::SetField(field) => {
                field.write(buf);
                put_zeros(buf, self.len() - 4 - field.len());
            }
            Action::Other { body, .. } => buf.put_slice(body),
        }
    }

    fn read(mut raw: &[u8]) -> Result<Action, WireError> {
        let action_type = raw.get_u16();
        let len = raw.get_u16() as usize;
        let action = match action_type {
            OFPAT_OUTPUT => {
                if len != 16 {
                    return Err(WireError::BadLength {
                        what: "output action",
                        length: len,
                    });
                }
                Action::Output {
                    port: raw.get_u32(),
                    max_len: raw.get_u16(),
                }
            }
            OFPAT_PUSH_VLAN | OFPAT_POP_VLAN if len != 8 => {
                return Err(WireError::BadLength {
                    what: "vlan action",
                    length: len,
                });
            }
            OFPAT_PUSH_VLAN => Action::PushVlan(raw.get_u16()),
            OFPAT_POP_VLAN => Action::PopVlan,
            OFPAT_SET_FIELD => Action::SetField(OxmField::read(&mut raw)?),
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

const OFPIT_GOTO_TABLE: u16 = 1;
const OFPIT_WRITE_ACTIONS: u16 = 3;
const OFPIT_APPLY_ACTIONS: u16 = 4;
const OFPIT_CLEAR_ACTIONS: u16 = 5;

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Instruction {
    GotoTable(u8),
    WriteActions(Vec<Action>),
    ApplyActions(Vec<Action>),
    ClearActions,
    /// Metadata, meter and experimenter instructions, kept verbatim.
    Other { instruction_type: u16, body: Bytes },
}

impl Instruction {
    pub fn len(&self) -> usize {
        match self {
            Instruction::GotoTable(_) | Instruction::ClearActions => 8,
            Instruction::WriteActions(actions) | Instruction::ApplyActions(actions) => {
                8 + actions.iter().map(Action::len).sum::<usize>()
            }
            Instruction::Other { body, .. } => 4 + body.len(),
        }
    }

    fn write(&self, buf: &mut BytesMut) {
        let instruction_type = match self {
            Instruction::GotoTable(_) => OFPIT_GOTO_TABLE,
            Instruction::WriteActions(_) => OFPIT_WRITE_ACTIONS,
            Instruction::ApplyActions(_) => OFPIT_APPLY_ACTIONS,
            Instruction::ClearActions => OFPIT_CLEAR_ACTIONS,
            Instruction::Other {
                instruction_type, ..
            } => *instruction_type,
        };
        buf.put_u16(instruction_type);
        buf.put_u16(self.len() as u16);
        match self {
            Instruction::GotoTable(table_id) => {
                buf.put_u8(*table_id);
                put_zeros(buf, 3);
            }
            Instruction::WriteActions(actions) | Instruction::ApplyActions(actions) => {
                put_zeros(buf, 4);
                for action in actions.iter() {
                    action.write(buf);
                }
            }
            Instruction::ClearActions => put_zeros(buf, 4),
            Instruction::Other { body, .. } => buf.put_slice(body),
        }
    }

    fn read(mut raw: &[u8]) -> Result<Instruction, WireError> {
        let instruction_type = raw.get_u16();
        let _len = raw.get_u16();
        let instruction = match instruction_type {
            OFPIT_GOTO_TABLE => Instruction::GotoTable(raw.get_u8()),
            OFPIT_WRITE_ACTIONS => Instruction::WriteActions(Action::read_all(&raw[4..])?),
            OFPIT_APPLY_ACTIONS => Instruction::ApplyActions(Action::read_all(&raw[4..])?),
            OFPIT_CLEAR_ACTIONS => Instruction::ClearActions,
            other => Instruction::Other {
                instruction_type: other,
                body: Bytes::copy_from_slice(raw),
            },
        };
        Ok(instruction)
    }

    pub fn read_all(buf: &[u8]) -> Result<Vec<Instruction>, WireError> {
        split_tlvs(buf, "ofp_instruction", 2, 8)?
            .into_iter()
            .map(Instruction::read)
            .collect()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct FlowMod {
    pub xid: u32,
    pub cookie: u64,
    pub cookie_mask: u64,
    pub table_id: u8,
    pub command: FlowModCommand,
    pub idle_timeout: u16,
    pub hard_timeout: u16,
    pub priority: u16,
    pub buffer_id: u32,
    pub out_port: u32,
    pub out_group: u32,
    pub flags: u16,
    pub matches: Match,
    pub instructions: Vec<Instruction>,
}

impl FlowMod {
    /// Header and fixed fields, before the match.
    pub const FIXED_LEN: usize = 48;

    pub fn len(&self) -> usize {
        FlowMod::FIXED_LEN + self.matches.len() + self.instructions.iter().map(Instruction::len).sum::<usize>()
    }

    /// Fails when the message does not fit the 16 bit length field. Inner
    /// lengths are bounded by the total, so checking it covers them.
    pub fn pack(&self) -> Result<Bytes, WireError> {
        check_len(self.len(), "ofp_flow_mod")?;
        let mut buf = BytesMut::with_capacity(self.len());
        Header::write(&mut buf, VERSION, OFPT_FLOW_MOD, self.xid);
        buf.put_u64(self.cookie);
        buf.put_u64(self.cookie_mask);
        buf.put_u8(self.table_id);
        buf.put_u8(self.command.code());
        buf.put_u16(self.idle_timeout);
        buf.put_u16(self.hard_timeout);
        buf.put_u16(self.priority);
        buf.put_u32(self.buffer_id);
        buf.put_u32(self.out_port);
        buf.put_u32(self.out_group);
        buf.put_u16(self.flags);
        put_zeros(&mut buf, 2);
        self.matches.write(&mut buf);
        for instruction in self.instructions.iter() {
            instruction.write(&mut buf);
        }
        finish_message(buf)
    }

    pub fn unpack(mut buf: &[u8]) -> Result<FlowMod, WireError> {
        let header = Header::read(&mut buf)?;
        let mut body = header.expect(VERSION, OFPT_FLOW_MOD, buf)?;
        need(&body, FlowMod::FIXED_LEN - OFP_HEADER_LEN, "ofp_flow_mod")?;
        let cookie = body.get_u64();
        let cookie_mask = body.get_u64();
        let table_id = body.get_u8();
        let command = FlowModCommand::from_code(body.get_u8() as u16)?;
        let idle_timeout = body.get_u16();
        let hard_timeout = body.get_u16();
        let priority = body.get_u16();
        let buffer_id = body.get_u32();
        let out_port = body.get_u32();
        let out_group = body.get_u32();
        let flags = body.get_u16();
        body.advance(2);
        let matches = Match::read(&mut body)?;
        let instructions = Instruction::read_all(body)?;
        Ok(FlowMod {
            xid: header.xid,
            cookie,
            cookie_mask,
            table_id,
            command,
            idle_timeout,
            hard_timeout,
            priority,
            buffer_id,
            out_port,
            out_group,
            flags,
            matches,
            instructions,
        })
    }
}

/// One `ofp_flow_stats` entry of a multipart flow reply.
#[derive(Clone, Debug, PartialEq)]
pub struct FlowStats {
    pub table_id: u8,
    pub duration_sec: u32,
    pub duration_nsec: u32,
    pub priority: u16,
    pub idle_timeout: u16,
    pub hard_timeout: u16,
    pub flags: u16,
    pub cookie: u64,
    pub packet_count: Option<u64>,
    pub byte_count: Option<u64>,
    pub matches: Match,
    pub instructions: Vec<Instruction>,
}

impl FlowStats {
    pub const FIXED_LEN: usize = 48;

    pub fn pack(&self) -> Result<Bytes, WireError> {
        let len = FlowStats::FIXED_LEN
            + self.matches.len()
            + self.instructions.iter().map(Instruction::len).sum::<usize>();
        let mut buf = BytesMut::with_capacity(len);
        buf.put_u16(check_len(len, "ofp_flow_stats")?);
        buf.put_u8(self.table_id);
        put_zeros(&mut buf, 1);
        buf.put_u32(self.duration_sec);
        buf.put_u32(self.duration_nsec);
        buf.put_u16(self.priority);
        buf.put_u16(self.idle_timeout);
        buf.put_u16(self.hard_timeout);
        buf.put_u16(self.flags);
        put_zeros(&mut buf, 4);
        buf.put_u64(self.cookie);
        buf.put_u64(self.packet_count.unwrap_or(u64::MAX));
        buf.put_u64(self.byte_count.unwrap_or(u64::MAX));
        self.matches.write(&mut buf);
        for instruction in self.instructions.iter() {
            instruction.write(&mut buf);
        }
        Ok(buf.freeze())
    }

    pub fn unpack(mut buf: &[u8]) -> Result<FlowStats, WireError> {
        need(&buf, FlowStats::FIXED_LEN + 8, "ofp_flow_stats")?;
        let len = buf.get_u16() as usize;
        if len < FlowStats::FIXED_LEN + 8 || len - 2 > buf.len() {
            return Err(WireError::BadLength {
                what: "ofp_flow_stats",
                length: len,
            });
        }
        let mut entry = &buf[..len - 2];
        let table_id = entry.get_u8();
        entry.advance(1);
        let duration_sec = entry.get_u32();
        let duration_nsec = entry.get_u32();
        let priority = entry.get_u16();
        let idle_timeout = entry.get_u16();
        let hard_timeout = entry.get_u16();
        let flags = entry.get_u16();
        entry.advance(4);
        let cookie = entry.get_u64();
        let packet_count = counter(entry.get_u64());
        let byte_count = counter(entry.get_u64());
        let matches = Match::read(&mut entry)?;
        let instructions = Instruction::read_all(entry)?;
        Ok(FlowStats {
            table_id,
            duration_sec,
            duration_nsec,
            priority,
            idle_timeout,
            hard_timeout,
            flags,
            cookie,
            packet_count,
            byte_count,
            matches,
            instructions,
        })
    }

    pub fn unpack_all(body: &[u8]) -> Result<Vec<FlowStats>, WireError> {
        split_tlvs(body, "ofp_flow_stats", 0, FlowStats::FIXED_LEN + 8)?
            .into_iter()
            .map(FlowStats::unpack)
            .collect()
    }
}
