use super::{typed_actions, typed_match, unsupported_action, unsupported_field, version_mismatch, FlowModFlags, VersionAdapter};
use crate::error::{FlowError, Result};
use crate::flow::{Action, FieldValue, Flow, MatchField, Statistics, VlanTag};
use crate::ofp::v0x04::{
    self as ofp, Instruction, OxmField, OFPCML_NO_BUFFER, OFPFF_NO_BYT_COUNTS, OFPFF_NO_PKT_COUNTS, OFPG_ANY,
    OFPP_ANY, OFPVID_NONE, OFPVID_PRESENT,
};
use crate::ofp::{check_len, FlowMod, FlowModCommand, FlowStats, OFP_NO_BUFFER};
use crate::representation::{OfpVersion, Switch};
use crate::util::value::{Ipv4Match, Ipv6Match};
use log::{debug, trace};
use std::convert::TryFrom;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::sync::Arc;

const VERSION: OfpVersion = OfpVersion::V0X04;

const IPPROTO_ICMP: u8 = 1;
const IPPROTO_TCP: u8 = 6;
const IPPROTO_UDP: u8 = 17;
const IPPROTO_SCTP: u8 = 132;

/// Shared-model value of `dl_vlan` for untagged packets.
const VLAN_UNTAGGED: u16 = 0xffff;

/// OXM for a `tp_src`/`tp_dst` value, chosen by the `nw_proto` of the same
/// match. ICMP carries type and code in these two fields. Without `nw_proto`
/// the ports are TCP.
fn transport_oxm(field: MatchField, value: u16, nw_proto: Option<u8>) -> Result<OxmField> {
    let src = field == MatchField::TpSrc;
    let oxm = match nw_proto {
        None | Some(IPPROTO_TCP) if src => OxmField::TcpSrc(value),
        None | Some(IPPROTO_TCP) => OxmField::TcpDst(value),
        Some(IPPROTO_UDP) if src => OxmField::UdpSrc(value),
        Some(IPPROTO_UDP) => OxmField::UdpDst(value),
        Some(IPPROTO_SCTP) if src => OxmField::SctpSrc(value),
        Some(IPPROTO_SCTP) => OxmField::SctpDst(value),
        Some(IPPROTO_ICMP) => {
            let value = u8::try_from(value)
                .map_err(|_| unsupported_field(field, VERSION, format!("icmp type or code {} out of range", value)))?;
            if src {
                OxmField::Icmpv4Type(value)
            } else {
                OxmField::Icmpv4Code(value)
            }
        }
        Some(proto) => {
            return Err(unsupported_field(
                field,
                VERSION,
                format!("ip protocol {} has no transport field in OpenFlow 1.3", proto),
            ));
        }
    };
    Ok(oxm)
}

/// OpenFlow 1.3: OXM match and instruction-wrapped actions.
#[derive(Clone, Debug, Default)]
pub struct Adapter {
    flags: FlowModFlags,
}

impl Adapter {
    pub fn new(flags: FlowModFlags) -> Adapter {
        Adapter { flags }
    }

    pub fn flags(&self) -> FlowModFlags {
        self.flags
    }

    fn flag_bits(&self) -> u16 {
        let mut bits = self.flags.common_bits();
        if self.flags.no_packet_counts {
            bits |= OFPFF_NO_PKT_COUNTS;
        }
        if self.flags.no_byte_counts {
            bits |= OFPFF_NO_BYT_COUNTS;
        }
        bits
    }

    fn encode_match(&self, flow: &Flow) -> Result<ofp::Match> {
        let fields = typed_match(flow, VERSION)?;
        // transport ports are typed by the protocol they belong to
        let nw_proto = fields.iter().find_map(|(field, value)| match (field, value) {
            (MatchField::NwProto, FieldValue::U8(proto)) => Some(*proto),
            _ => None,
        });
        let mut m = ofp::Match::new();
        for (field, value) in fields {
            let oxm = match (field, value) {
                (MatchField::InPort, FieldValue::Port(port)) => OxmField::InPort(port),
                (MatchField::DlSrc, FieldValue::Mac(mac)) => OxmField::EthSrc(mac),
                (MatchField::DlDst, FieldValue::Mac(mac)) => OxmField::EthDst(mac),
                (MatchField::DlType, FieldValue::U16(dl_type)) => OxmField::EthType(dl_type),
                (MatchField::DlVlan, FieldValue::U16(VLAN_UNTAGGED)) => OxmField::VlanVid(OFPVID_NONE),
                (MatchField::DlVlan, FieldValue::U16(vlan)) => {
                    if vlan > 0x0fff {
                        return Err(unsupported_field(field, VERSION, format!("vlan id {} out of range", vlan)));
                    }
                    OxmField::VlanVid(vlan | OFPVID_PRESENT)
                }
                (MatchField::DlVlanPcp, FieldValue::U8(pcp)) => OxmField::VlanPcp(pcp),
                (MatchField::NwProto, FieldValue::U8(proto)) => OxmField::IpProto(proto),
                (MatchField::NwSrc, FieldValue::Ipv4(ip)) => OxmField::Ipv4Src(ip.addr, ipv4_mask(&ip)),
                (MatchField::NwDst, FieldValue::Ipv4(ip)) => OxmField::Ipv4Dst(ip.addr, ipv4_mask(&ip)),
                (MatchField::TpSrc, FieldValue::U16(port)) | (MatchField::TpDst, FieldValue::U16(port)) => {
                    transport_oxm(field, port, nw_proto)?
                }
                (MatchField::Ipv6Src, FieldValue::Ipv6(ip)) => OxmField::Ipv6Src(ip.addr, ipv6_mask(&ip)),
                (MatchField::Ipv6Dst, FieldValue::Ipv6(ip)) => OxmField::Ipv6Dst(ip.addr, ipv6_mask(&ip)),
                (field, _) => {
                    return Err(unsupported_field(field, VERSION, "no OXM field in OpenFlow 1.3"));
                }
            };
            m.push(oxm);
        }
        Ok(m)
    }

    fn decode_match(&self, m: &ofp::Match, flow: &mut Flow) -> Result<()> {
        for oxm in m.fields.iter() {
            let (field, value) = match *oxm {
                OxmField::InPort(port) => (MatchField::InPort, FieldValue::Port(port)),
                OxmField::EthDst(mac) => (MatchField::DlDst, FieldValue::Mac(mac)),
                OxmField::EthSrc(mac) => (MatchField::DlSrc, FieldValue::Mac(mac)),
                OxmField::EthType(dl_type) => (MatchField::DlType, FieldValue::U16(dl_type)),
                OxmField::VlanVid(OFPVID_NONE) => (MatchField::DlVlan, FieldValue::U16(VLAN_UNTAGGED)),
                OxmField::VlanVid(vid) => (MatchField::DlVlan, FieldValue::U16(vid & 0x0fff)),
                OxmField::VlanPcp(pcp) => (MatchField::DlVlanPcp, FieldValue::U8(pcp)),
                OxmField::IpProto(proto) => (MatchField::NwProto, FieldValue::U8(proto)),
                OxmField::Ipv4Src(addr, mask) => (MatchField::NwSrc, FieldValue::Ipv4(ipv4_match(addr, mask))),
                OxmField::Ipv4Dst(addr, mask) => (MatchField::NwDst, FieldValue::Ipv4(ipv4_match(addr, mask))),
                OxmField::TcpSrc(port) | OxmField::UdpSrc(port) | OxmField::SctpSrc(port) => {
                    (MatchField::TpSrc, FieldValue::U16(port))
                }
                OxmField::TcpDst(port) | OxmField::UdpDst(port) | OxmField::SctpDst(port) => {
                    (MatchField::TpDst, FieldValue::U16(port))
                }
                OxmField::Icmpv4Type(icmp_type) => (MatchField::TpSrc, FieldValue::U16(u16::from(icmp_type))),
                OxmField::Icmpv4Code(code) => (MatchField::TpDst, FieldValue::U16(u16::from(code))),
                OxmField::Ipv6Src(addr, mask) => (MatchField::Ipv6Src, FieldValue::Ipv6(ipv6_match(addr, mask))),
                OxmField::Ipv6Dst(addr, mask) => (MatchField::Ipv6Dst, FieldValue::Ipv6(ipv6_match(addr, mask))),
                OxmField::Other { class, field, .. } => {
                    return Err(FlowError::UnsupportedMatchField {
                        field: format!("oxm {:#06x}:{}", class, field),
                        version: VERSION,
                        reason: "not in the flow vocabulary".to_owned(),
                    }
                    .into());
                }
            };
            flow.matches.set_field(field, value);
        }
        Ok(())
    }

    fn encode_action(&self, action: Action) -> Option<ofp::Action> {
        let wire = match action {
            Action::Output { port } => ofp::Action::Output {
                port,
                max_len: OFPCML_NO_BUFFER,
            },
            Action::SetVlan { vlan_id } => ofp::Action::SetField(OxmField::VlanVid(vlan_id | OFPVID_PRESENT)),
            Action::SetVlanPcp { vlan_pcp } => ofp::Action::SetField(OxmField::VlanPcp(vlan_pcp)),
            Action::PopVlan => ofp::Action::PopVlan,
            Action::PushVlan { tag } => ofp::Action::PushVlan(tag.ethertype()),
            Action::SetDlSrc { mac } => ofp::Action::SetField(OxmField::EthSrc(mac)),
            Action::SetDlDst { mac } => ofp::Action::SetField(OxmField::EthDst(mac)),
            Action::SetNwSrc { addr } => ofp::Action::SetField(OxmField::Ipv4Src(addr, None)),
            Action::SetNwDst { addr } => ofp::Action::SetField(OxmField::Ipv4Dst(addr, None)),
            Action::GotoTable { .. } => return None,
        };
        Some(wire)
    }

    /// Flat action list to instructions: list actions are applied in order,
    /// `goto_table` becomes its own instruction and must come last.
    fn encode_instructions(&self, flow: &Flow) -> Result<Vec<Instruction>> {
        let actions = typed_actions(flow, VERSION)?;
        let mut apply = vec![];
        let mut goto = None;
        for (i, action) in actions.iter().enumerate() {
            if let Action::GotoTable { table_id } = *action {
                if i + 1 != actions.len() {
                    return Err(unsupported_action(action.action_type(), VERSION, "goto_table must be the last action"));
                }
                goto = Some(table_id);
            } else if let Some(wire) = self.encode_action(*action) {
                apply.push(wire);
            }
        }
        let mut instructions = vec![];
        if !apply.is_empty() {
            instructions.push(Instruction::ApplyActions(apply));
        }
        if let Some(table_id) = goto {
            instructions.push(Instruction::GotoTable(table_id));
        }
        Ok(instructions)
    }

    fn decode_action(&self, action: &ofp::Action) -> Result<Action> {
        let decoded = match action {
            ofp::Action::Output { port, .. } => Action::Output { port: *port },
            ofp::Action::PopVlan => Action::PopVlan,
            ofp::Action::PushVlan(ethertype) => Action::PushVlan {
                tag: VlanTag::from_ethertype(*ethertype).ok_or_else(|| {
                    unsupported_action("push_vlan", VERSION, format!("ethertype {:#06x}", ethertype))
                })?,
            },
            ofp::Action::SetField(OxmField::VlanVid(vid)) => Action::SetVlan {
                vlan_id: vid & 0x0fff,
            },
            ofp::Action::SetField(OxmField::VlanPcp(vlan_pcp)) => Action::SetVlanPcp { vlan_pcp: *vlan_pcp },
            ofp::Action::SetField(OxmField::EthSrc(mac)) => Action::SetDlSrc { mac: *mac },
            ofp::Action::SetField(OxmField::EthDst(mac)) => Action::SetDlDst { mac: *mac },
            ofp::Action::SetField(OxmField::Ipv4Src(addr, None)) => Action::SetNwSrc { addr: *addr },
            ofp::Action::SetField(OxmField::Ipv4Dst(addr, None)) => Action::SetNwDst { addr: *addr },
            ofp::Action::SetField(field) => {
                return Err(unsupported_action("set_field", VERSION, format!("{:?}", field)));
            }
            ofp::Action::Other { action_type, .. } => {
                return Err(unsupported_action(
                    &format!("{:#06x}", action_type),
                    VERSION,
                    "unknown action type",
                ));
            }
        };
        Ok(decoded)
    }

    fn decode_instructions(&self, instructions: &[Instruction], flow: &mut Flow) -> Result<()> {
        let mut goto = None;
        for instruction in instructions {
            match instruction {
                Instruction::ApplyActions(actions) => {
                    for action in actions.iter() {
                        flow.actions.push(self.decode_action(action)?.to_descriptor());
                    }
                }
                Instruction::GotoTable(table_id) => goto = Some(*table_id),
                Instruction::WriteActions(_) => {
                    return Err(unsupported_action("write_actions", VERSION, "only apply-actions are represented"));
                }
                Instruction::ClearActions => {
                    return Err(unsupported_action("clear_actions", VERSION, "only apply-actions are represented"));
                }
                Instruction::Other { instruction_type, .. } => {
                    return Err(unsupported_action(
                        &format!("instruction {:#06x}", instruction_type),
                        VERSION,
                        "unknown instruction type",
                    ));
                }
            }
        }
        if let Some(table_id) = goto {
            flow.actions.push(Action::GotoTable { table_id }.to_descriptor());
        }
        Ok(())
    }
}

fn ipv4_mask(ip: &Ipv4Match) -> Option<Ipv4Addr> {
    if ip.is_exact() {
        None
    } else {
        Some(ip.mask)
    }
}

fn ipv6_mask(ip: &Ipv6Match) -> Option<Ipv6Addr> {
    if ip.is_exact() {
        None
    } else {
        Some(ip.mask)
    }
}

fn ipv4_match(addr: Ipv4Addr, mask: Option<Ipv4Addr>) -> Ipv4Match {
    match mask {
        Some(mask) => Ipv4Match { addr, mask },
        None => Ipv4Match::exact(addr),
    }
}

fn ipv6_match(addr: Ipv6Addr, mask: Option<Ipv6Addr>) -> Ipv6Match {
    Ipv6Match {
        addr,
        mask: mask.unwrap_or_else(|| Ipv6Addr::from(u128::MAX)),
    }
}

impl VersionAdapter for Adapter {
    fn version(&self) -> OfpVersion {
        VERSION
    }

    fn handle(&self) -> Arc<dyn VersionAdapter> {
        Arc::new(self.clone())
    }

    fn build_flow_mod(&self, flow: &Flow, command: FlowModCommand) -> Result<FlowMod> {
        let id = flow.id()?;
        debug!(target: "flow", "{:?} flow {} on switch {} (1.3)", command, id, flow.switch().dpid());
        let matches = self.encode_match(flow)?;
        let instructions = self.encode_instructions(flow)?;
        let flow_mod = ofp::FlowMod {
            xid: 0,
            cookie: flow.cookie,
            cookie_mask: 0,
            table_id: flow.table_id,
            command,
            idle_timeout: flow.idle_timeout,
            hard_timeout: flow.hard_timeout,
            priority: flow.priority,
            buffer_id: OFP_NO_BUFFER,
            out_port: OFPP_ANY,
            out_group: OFPG_ANY,
            flags: self.flag_bits(),
            matches,
            instructions,
        };
        if let Err(e) = check_len(flow_mod.len(), "ofp_flow_mod") {
            debug!(target: "flow", "flow {} does not fit in one flow-mod: {}", id, e);
            return Err(e.into());
        }
        Ok(flow_mod.into())
    }

    fn from_of_flow_stats(&self, stats: &FlowStats, switch: Arc<dyn Switch>) -> Result<Flow> {
        let entry = match stats {
            FlowStats::V0x04(entry) => entry,
            other => return Err(version_mismatch(VERSION, other)),
        };
        trace!(target: "flow", "decoding 1.3 flow stats from {}: {:?}", switch.dpid(), entry);
        let mut flow = Flow::new(switch, self.handle());
        flow.table_id = entry.table_id;
        self.decode_match(&entry.matches, &mut flow)?;
        flow.priority = entry.priority;
        flow.idle_timeout = entry.idle_timeout;
        flow.hard_timeout = entry.hard_timeout;
        flow.cookie = entry.cookie;
        self.decode_instructions(&entry.instructions, &mut flow)?;
        flow.stats = Statistics {
            packet_count: entry.packet_count,
            byte_count: entry.byte_count,
            duration_sec: Some(entry.duration_sec),
            duration_nsec: Some(entry.duration_nsec),
        };
        Ok(flow)
    }
}
