use super::{typed_actions, typed_match, unsupported_action, unsupported_field, version_mismatch, FlowModFlags, VersionAdapter};
use crate::error::Result;
use crate::flow::{Action, FieldValue, Flow, MatchField, Statistics};
use crate::ofp::v0x01::{self as ofp, OFPP_MAX, OFPP_NONE, OFP_VLAN_NONE};
use crate::ofp::{check_len, FlowMod, FlowModCommand, FlowStats, OFP_NO_BUFFER};
use crate::representation::{OfpVersion, Switch};
use crate::util::value::Ipv4Match;
use log::{debug, trace};
use std::sync::Arc;

const VERSION: OfpVersion = OfpVersion::V0X01;

/// Reserved ports are `0xff00..=0xffff` on a 1.0 switch and
/// `0xffffff00..=0xffffffff` in the shared model.
fn port_to_wire(port: u32) -> Option<u16> {
    if port >= 0xffff_ff00 {
        Some((port & 0xffff) as u16)
    } else if port < OFPP_MAX as u32 {
        Some(port as u16)
    } else {
        None
    }
}

fn port_from_wire(port: u16) -> u32 {
    if port >= OFPP_MAX {
        0xffff_0000 | port as u32
    } else {
        port as u32
    }
}

/// OpenFlow 1.0: fixed match with wildcard bits and a flat action list.
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

    fn encode_match(&self, flow: &Flow) -> Result<ofp::Match> {
        let mut m = ofp::Match::default();
        for (field, value) in typed_match(flow, VERSION)? {
            match (field, value) {
                (MatchField::InPort, FieldValue::Port(port)) => {
                    m.in_port = port_to_wire(port)
                        .ok_or_else(|| unsupported_field(field, VERSION, format!("port {} out of range", port)))?;
                    m.wildcards &= !ofp::OFPFW_IN_PORT;
                }
                (MatchField::DlSrc, FieldValue::Mac(mac)) => {
                    m.dl_src = mac;
                    m.wildcards &= !ofp::OFPFW_DL_SRC;
                }
                (MatchField::DlDst, FieldValue::Mac(mac)) => {
                    m.dl_dst = mac;
                    m.wildcards &= !ofp::OFPFW_DL_DST;
                }
                (MatchField::DlVlan, FieldValue::U16(vlan)) => {
                    if vlan != OFP_VLAN_NONE && vlan > 0x0fff {
                        return Err(unsupported_field(field, VERSION, format!("vlan id {} out of range", vlan)));
                    }
                    m.dl_vlan = vlan;
                    m.wildcards &= !ofp::OFPFW_DL_VLAN;
                }
                (MatchField::DlVlanPcp, FieldValue::U8(pcp)) => {
                    m.dl_vlan_pcp = pcp;
                    m.wildcards &= !ofp::OFPFW_DL_VLAN_PCP;
                }
                (MatchField::DlType, FieldValue::U16(dl_type)) => {
                    m.dl_type = dl_type;
                    m.wildcards &= !ofp::OFPFW_DL_TYPE;
                }
                (MatchField::NwTos, FieldValue::U8(tos)) => {
                    m.nw_tos = tos;
                    m.wildcards &= !ofp::OFPFW_NW_TOS;
                }
                (MatchField::NwProto, FieldValue::U8(proto)) => {
                    m.nw_proto = proto;
                    m.wildcards &= !ofp::OFPFW_NW_PROTO;
                }
                (MatchField::NwSrc, FieldValue::Ipv4(ip)) => {
                    let len = ip
                        .prefix_len()
                        .ok_or_else(|| unsupported_field(field, VERSION, "only prefix masks can be matched"))?;
                    m.nw_src = ip.addr;
                    m.set_nw_src_wildcard_bits(32 - len);
                }
                (MatchField::NwDst, FieldValue::Ipv4(ip)) => {
                    let len = ip
                        .prefix_len()
                        .ok_or_else(|| unsupported_field(field, VERSION, "only prefix masks can be matched"))?;
                    m.nw_dst = ip.addr;
                    m.set_nw_dst_wildcard_bits(32 - len);
                }
                (MatchField::TpSrc, FieldValue::U16(port)) => {
                    m.tp_src = port;
                    m.wildcards &= !ofp::OFPFW_TP_SRC;
                }
                (MatchField::TpDst, FieldValue::U16(port)) => {
                    m.tp_dst = port;
                    m.wildcards &= !ofp::OFPFW_TP_DST;
                }
                (field, _) => {
                    return Err(unsupported_field(field, VERSION, "no such field in the 1.0 match"));
                }
            }
        }
        Ok(m)
    }

    fn encode_action(&self, action: Action) -> Result<ofp::Action> {
        let wire = match action {
            Action::Output { port } => ofp::Action::Output {
                port: port_to_wire(port).ok_or_else(|| {
                    unsupported_action(action.action_type(), VERSION, format!("port {} out of range", port))
                })?,
                max_len: 0xffff,
            },
            Action::SetVlan { vlan_id } => ofp::Action::SetVlanVid(vlan_id),
            Action::SetVlanPcp { vlan_pcp } => ofp::Action::SetVlanPcp(vlan_pcp),
            Action::PopVlan => ofp::Action::StripVlan,
            Action::SetDlSrc { mac } => ofp::Action::SetDlSrc(mac),
            Action::SetDlDst { mac } => ofp::Action::SetDlDst(mac),
            Action::SetNwSrc { addr } => ofp::Action::SetNwSrc(addr),
            Action::SetNwDst { addr } => ofp::Action::SetNwDst(addr),
            Action::PushVlan { .. } | Action::GotoTable { .. } => {
                return Err(unsupported_action(action.action_type(), VERSION, "not available in OpenFlow 1.0"));
            }
        };
        Ok(wire)
    }

    fn decode_action(&self, action: &ofp::Action) -> Result<Action> {
        let decoded = match *action {
            ofp::Action::Output { port, .. } => Action::Output {
                port: port_from_wire(port),
            },
            ofp::Action::SetVlanVid(vlan_id) => Action::SetVlan { vlan_id },
            ofp::Action::SetVlanPcp(vlan_pcp) => Action::SetVlanPcp { vlan_pcp },
            ofp::Action::StripVlan => Action::PopVlan,
            ofp::Action::SetDlSrc(mac) => Action::SetDlSrc { mac },
            ofp::Action::SetDlDst(mac) => Action::SetDlDst { mac },
            ofp::Action::SetNwSrc(addr) => Action::SetNwSrc { addr },
            ofp::Action::SetNwDst(addr) => Action::SetNwDst { addr },
            ofp::Action::SetNwTos(_) => return Err(unsupported_action("set_nw_tos", VERSION, "not in the flow vocabulary")),
            ofp::Action::SetTpSrc(_) => return Err(unsupported_action("set_tp_src", VERSION, "not in the flow vocabulary")),
            ofp::Action::SetTpDst(_) => return Err(unsupported_action("set_tp_dst", VERSION, "not in the flow vocabulary")),
            ofp::Action::Enqueue { .. } => return Err(unsupported_action("enqueue", VERSION, "not in the flow vocabulary")),
            ofp::Action::Other { action_type, .. } => {
                return Err(unsupported_action(
                    &format!("{:#06x}", action_type),
                    VERSION,
                    "unknown action type",
                ))
            }
        };
        Ok(decoded)
    }

    fn decode_match(&self, m: &ofp::Match, flow: &mut Flow) {
        let matches = &mut flow.matches;
        if !m.is_wildcarded(ofp::OFPFW_IN_PORT) {
            matches.set_field(MatchField::InPort, FieldValue::Port(port_from_wire(m.in_port)));
        }
        if !m.is_wildcarded(ofp::OFPFW_DL_SRC) {
            matches.set_field(MatchField::DlSrc, FieldValue::Mac(m.dl_src));
        }
        if !m.is_wildcarded(ofp::OFPFW_DL_DST) {
            matches.set_field(MatchField::DlDst, FieldValue::Mac(m.dl_dst));
        }
        if !m.is_wildcarded(ofp::OFPFW_DL_VLAN) {
            matches.set_field(MatchField::DlVlan, FieldValue::U16(m.dl_vlan));
        }
        if !m.is_wildcarded(ofp::OFPFW_DL_VLAN_PCP) {
            matches.set_field(MatchField::DlVlanPcp, FieldValue::U8(m.dl_vlan_pcp));
        }
        if !m.is_wildcarded(ofp::OFPFW_DL_TYPE) {
            matches.set_field(MatchField::DlType, FieldValue::U16(m.dl_type));
        }
        if !m.is_wildcarded(ofp::OFPFW_NW_TOS) {
            matches.set_field(MatchField::NwTos, FieldValue::U8(m.nw_tos));
        }
        if !m.is_wildcarded(ofp::OFPFW_NW_PROTO) {
            matches.set_field(MatchField::NwProto, FieldValue::U8(m.nw_proto));
        }
        let src_bits = m.nw_src_wildcard_bits();
        if src_bits < 32 {
            matches.set_field(MatchField::NwSrc, FieldValue::Ipv4(Ipv4Match::with_prefix(m.nw_src, 32 - src_bits)));
        }
        let dst_bits = m.nw_dst_wildcard_bits();
        if dst_bits < 32 {
            matches.set_field(MatchField::NwDst, FieldValue::Ipv4(Ipv4Match::with_prefix(m.nw_dst, 32 - dst_bits)));
        }
        if !m.is_wildcarded(ofp::OFPFW_TP_SRC) {
            matches.set_field(MatchField::TpSrc, FieldValue::U16(m.tp_src));
        }
        if !m.is_wildcarded(ofp::OFPFW_TP_DST) {
            matches.set_field(MatchField::TpDst, FieldValue::U16(m.tp_dst));
        }
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
        debug!(target: "flow", "{:?} flow {} on switch {} (1.0)", command, id, flow.switch().dpid());
        let matches = self.encode_match(flow)?;
        let actions = typed_actions(flow, VERSION)?
            .into_iter()
            .map(|action| self.encode_action(action))
            .collect::<Result<Vec<_>>>()?;
        let flow_mod = ofp::FlowMod {
            xid: 0,
            matches,
            cookie: flow.cookie,
            command,
            idle_timeout: flow.idle_timeout,
            hard_timeout: flow.hard_timeout,
            priority: flow.priority,
            buffer_id: OFP_NO_BUFFER,
            out_port: OFPP_NONE,
            flags: self.flags.common_bits(),
            actions,
        };
        if let Err(e) = check_len(flow_mod.len(), "ofp_flow_mod") {
            debug!(target: "flow", "flow {} does not fit in one flow-mod: {}", id, e);
            return Err(e.into());
        }
        Ok(flow_mod.into())
    }

    fn from_of_flow_stats(&self, stats: &FlowStats, switch: Arc<dyn Switch>) -> Result<Flow> {
        let entry = match stats {
            FlowStats::V0x01(entry) => entry,
            other => return Err(version_mismatch(VERSION, other)),
        };
        trace!(target: "flow", "decoding 1.0 flow stats from {}: {:?}", switch.dpid(), entry);
        let mut flow = Flow::new(switch, self.handle());
        flow.table_id = entry.table_id;
        self.decode_match(&entry.matches, &mut flow);
        flow.priority = entry.priority;
        flow.idle_timeout = entry.idle_timeout;
        flow.hard_timeout = entry.hard_timeout;
        flow.cookie = entry.cookie;
        for action in entry.actions.iter() {
            flow.actions.push(self.decode_action(action)?.to_descriptor());
        }
        flow.stats = Statistics {
            packet_count: entry.packet_count,
            byte_count: entry.byte_count,
            duration_sec: Some(entry.duration_sec),
            duration_nsec: Some(entry.duration_nsec),
        };
        Ok(flow)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_port_mapping() {
        assert_eq!(port_to_wire(1), Some(1));
        assert_eq!(port_to_wire(0xffff_fffd), Some(0xfffd));
        assert_eq!(port_to_wire(0xff00), None);
        assert_eq!(port_to_wire(0x10000), None);
        assert_eq!(port_from_wire(0xfffd), 0xffff_fffd);
        assert_eq!(port_from_wire(0xfeff), 0xfeff);
    }
}
