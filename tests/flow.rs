use rusty_ofp::error::{Error, FlowError, WireError};
use rusty_ofp::ofp::{self, v0x01, v0x04};
use rusty_ofp::util::value::MAC;
use rusty_ofp::{
    adapter, Device, Dpid, Flow, FlowFactory, FlowMod, FlowModCommand, FlowStats, OfpVersion, Switch, VersionAdapter,
};
use serde_json::{json, Value};
use smallvec::smallvec;
use std::sync::Arc;

const SCENARIO_ID: &str = "ca11e386e4bb5b0301b775c4640573e7";

fn scenario() -> Value {
    json!({
        "id": SCENARIO_ID,
        "switch": "00:00:00:00:00:00:00:01",
        "table_id": 1,
        "match": {"dl_src": "11:22:33:44:55:66"},
        "priority": 2,
        "idle_timeout": 3,
        "hard_timeout": 4,
        "cookie": 5,
        "actions": [{"action_type": "set_vlan", "vlan_id": 6}],
        "stats": {}
    })
}

fn adapters() -> Vec<Arc<dyn VersionAdapter>> {
    vec![
        Arc::new(adapter::v0x01::Adapter::default()),
        Arc::new(adapter::v0x04::Adapter::default()),
    ]
}

fn switch(version: OfpVersion) -> Arc<dyn Switch> {
    Arc::new(Device::connected(Dpid(1), version))
}

fn flow_for(adapter: &Arc<dyn VersionAdapter>, data: Value) -> Flow {
    adapter.from_dict(&data, switch(adapter.version())).unwrap()
}

#[test]
fn test_scenario_round_trip() {
    for adapter in adapters() {
        let flow = flow_for(&adapter, scenario());
        assert_eq!(flow.id().unwrap(), SCENARIO_ID);
        assert_eq!(flow.as_dict().unwrap(), scenario());
    }
}

#[test]
fn test_scenario_flow_mod_fields() {
    for adapter in adapters() {
        let flow = flow_for(&adapter, scenario());
        for command in [FlowModCommand::Add, FlowModCommand::DeleteStrict].iter() {
            let flow_mod = flow.build_flow_mod(*command).unwrap();
            assert_eq!(flow_mod.version(), adapter.version());
            assert_eq!(flow_mod.cookie(), 5);
            assert_eq!(flow_mod.idle_timeout(), 3);
            assert_eq!(flow_mod.hard_timeout(), 4);
            assert_eq!(flow_mod.priority(), 2);
            assert_eq!(flow_mod.command(), *command);
        }
    }
}

#[test]
fn test_defaults() {
    for adapter in adapters() {
        let flow = flow_for(&adapter, json!({}));
        assert_eq!(flow.table_id, 0);
        assert_eq!(flow.priority, 0);
        assert_eq!(flow.cookie, 0);
        assert!(flow.matches.is_empty());
        assert!(flow.actions.is_empty());
        assert!(flow.stats.is_empty());
        let dict = flow.as_dict().unwrap();
        assert_eq!(dict["switch"], json!("00:00:00:00:00:00:00:01"));
        assert_eq!(dict["stats"], json!({}));
    }
}

#[test]
fn test_malformed_description() {
    let adapter: Arc<dyn VersionAdapter> = Arc::new(adapter::v0x04::Adapter::default());
    let cases = vec![
        json!({"priority": "high"}),
        json!({"priority": 70000}),
        json!({"match": [1, 2]}),
        json!({"actions": [{"port": 1}]}),
        json!({"switch": "00:00:00:00:00:00:00:02"}),
        json!("flow"),
    ];
    for data in cases {
        match adapter.from_dict(&data, switch(OfpVersion::V0X04)) {
            Err(Error::Flow(FlowError::MalformedFlowDescription { .. })) => {}
            other => panic!("{} gave {:?}", data, other),
        }
    }
}

#[test]
fn test_id_ignores_version_and_stats() {
    let flows: Vec<Flow> = adapters()
        .iter()
        .map(|adapter| flow_for(adapter, scenario()))
        .collect();
    assert_eq!(flows[0].id().unwrap(), flows[1].id().unwrap());

    let mut with_stats = scenario();
    with_stats["stats"] = json!({"packet_count": 10, "byte_count": 640});
    with_stats["id"] = json!("whatever");
    let flow = flow_for(&adapters()[0], with_stats);
    assert_eq!(flow.id().unwrap(), SCENARIO_ID);
    assert_eq!(flow.stats.packet_count, Some(10));

    let mut other = scenario();
    other["priority"] = json!(3);
    assert_ne!(flow_for(&adapters()[0], other).id().unwrap(), SCENARIO_ID);
}

#[test]
fn test_commands_differ_only_in_command() {
    for adapter in adapters() {
        let flow = flow_for(&adapter, scenario());
        let add = flow.as_of_add_flow_mod().unwrap().pack().unwrap();
        let delete = flow.as_of_delete_flow_mod().unwrap().pack().unwrap();
        let modify = flow.as_of_modify_flow_mod().unwrap().pack().unwrap();
        assert_eq!(add.len(), delete.len());
        let differing: Vec<usize> = (0..add.len()).filter(|i| add[*i] != delete[*i]).collect();
        // command offset: 1.0 u16 at 56, 1.3 u8 at 25
        match adapter.version() {
            OfpVersion::V0X01 => {
                assert_eq!(differing, vec![57]);
                assert_eq!(delete[57], 4);
                assert_eq!(modify[57], 2);
            }
            _ => {
                assert_eq!(differing, vec![25]);
                assert_eq!(delete[25], 4);
                assert_eq!(modify[25], 2);
            }
        }
    }
}

#[test]
fn test_legacy_flow_mod_layout() {
    let adapter = adapters().remove(0);
    let flow = flow_for(&adapter, scenario());
    let flow_mod = match flow.as_of_add_flow_mod().unwrap() {
        FlowMod::V0x01(m) => m,
        other => panic!("unexpected {:?}", other),
    };
    assert_eq!(flow_mod.matches.wildcards, v0x01::OFPFW_ALL & !v0x01::OFPFW_DL_SRC);
    assert_eq!(flow_mod.matches.dl_src, MAC([0x11, 0x22, 0x33, 0x44, 0x55, 0x66]));
    assert_eq!(flow_mod.actions, vec![v0x01::Action::SetVlanVid(6)]);
    assert_eq!(flow_mod.out_port, v0x01::OFPP_NONE);
    assert_eq!(flow_mod.buffer_id, ofp::OFP_NO_BUFFER);

    let packed = FlowMod::V0x01(flow_mod.clone()).pack().unwrap();
    assert_eq!(packed.len(), 72 + 8);
    assert_eq!(FlowMod::unpack(&packed).unwrap(), FlowMod::V0x01(flow_mod));
}

#[test]
fn test_legacy_ip_prefix_wildcards() {
    let adapter = adapters().remove(0);
    let flow = flow_for(
        &adapter,
        json!({"match": {"dl_type": 2048, "nw_src": "10.0.0.0/8", "nw_dst": "10.0.0.1"}}),
    );
    let m = match flow.as_of_add_flow_mod().unwrap() {
        FlowMod::V0x01(m) => m.matches,
        other => panic!("unexpected {:?}", other),
    };
    assert_eq!(m.nw_src_wildcard_bits(), 24);
    assert_eq!(m.nw_dst_wildcard_bits(), 0);
    assert!(!m.is_wildcarded(v0x01::OFPFW_DL_TYPE));
    assert!(m.is_wildcarded(v0x01::OFPFW_NW_PROTO));

    let masked = flow_for(&adapter, json!({"match": {"nw_src": "10.0.0.1/255.0.255.0"}}));
    assert!(matches!(
        masked.as_of_add_flow_mod(),
        Err(Error::Flow(FlowError::UnsupportedMatchField { .. }))
    ));
}

#[test]
fn test_modern_flow_mod_layout() {
    let adapter = adapters().remove(1);
    let mut data = scenario();
    data["actions"] = json!([
        {"action_type": "set_vlan", "vlan_id": 6},
        {"action_type": "output", "port": 2},
        {"action_type": "goto_table", "table_id": 3}
    ]);
    let flow = flow_for(&adapter, data);
    let flow_mod = match flow.as_of_add_flow_mod().unwrap() {
        FlowMod::V0x04(m) => m,
        other => panic!("unexpected {:?}", other),
    };
    assert_eq!(flow_mod.table_id, 1);
    assert_eq!(flow_mod.cookie_mask, 0);
    assert_eq!(flow_mod.out_port, v0x04::OFPP_ANY);
    assert_eq!(flow_mod.out_group, v0x04::OFPG_ANY);
    assert_eq!(
        flow_mod.matches.fields.to_vec(),
        vec![v0x04::OxmField::EthSrc(MAC([0x11, 0x22, 0x33, 0x44, 0x55, 0x66]))]
    );
    assert_eq!(
        flow_mod.instructions,
        vec![
            v0x04::Instruction::ApplyActions(vec![
                v0x04::Action::SetField(v0x04::OxmField::VlanVid(v0x04::OFPVID_PRESENT | 6)),
                v0x04::Action::Output {
                    port: 2,
                    max_len: v0x04::OFPCML_NO_BUFFER
                },
            ]),
            v0x04::Instruction::GotoTable(3),
        ]
    );

    let packed = FlowMod::V0x04(flow_mod.clone()).pack().unwrap();
    assert_eq!(packed.len() % 8, 0);
    assert_eq!(FlowMod::unpack(&packed).unwrap(), FlowMod::V0x04(flow_mod));
}

#[test]
fn test_unsupported_match_fields() {
    let legacy = adapters().remove(0);
    let flow = flow_for(&legacy, json!({"match": {"ipv6_src": "2001:db8::1"}}));
    match flow.as_of_add_flow_mod() {
        Err(Error::Flow(FlowError::UnsupportedMatchField { field, version, .. })) => {
            assert_eq!(field, "ipv6_src");
            assert_eq!(version, OfpVersion::V0X01);
        }
        other => panic!("unexpected {:?}", other),
    }

    let modern = adapters().remove(1);
    let flow = flow_for(&modern, json!({"match": {"nw_tos": 4}}));
    match flow.as_of_add_flow_mod() {
        Err(Error::Flow(FlowError::UnsupportedMatchField { field, version, .. })) => {
            assert_eq!(field, "nw_tos");
            assert_eq!(version, OfpVersion::V0X04);
        }
        other => panic!("unexpected {:?}", other),
    }

    for adapter in adapters() {
        let flow = flow_for(&adapter, json!({"match": {"mpls_label": 7}}));
        assert!(matches!(
            flow.as_of_delete_flow_mod(),
            Err(Error::Flow(FlowError::UnsupportedMatchField { .. }))
        ));
    }
}

#[test]
fn test_unsupported_actions() {
    let legacy = adapters().remove(0);
    for action in vec![
        json!({"action_type": "push_vlan", "tag_type": "c"}),
        json!({"action_type": "goto_table", "table_id": 1}),
    ] {
        let flow = flow_for(&legacy, json!({ "actions": [action] }));
        assert!(matches!(
            flow.as_of_add_flow_mod(),
            Err(Error::Flow(FlowError::UnsupportedAction { .. }))
        ));
    }

    for adapter in adapters() {
        let flow = flow_for(&adapter, json!({"actions": [{"action_type": "flood"}]}));
        match flow.as_of_add_flow_mod() {
            Err(Error::Flow(FlowError::UnsupportedAction { action_type, .. })) => assert_eq!(action_type, "flood"),
            other => panic!("unexpected {:?}", other),
        }
    }
}

fn legacy_stats(packet_count: Option<u64>) -> v0x01::FlowStats {
    let mut matches = v0x01::Match::default();
    matches.wildcards &= !(v0x01::OFPFW_DL_SRC | v0x01::OFPFW_IN_PORT);
    matches.dl_src = MAC([0x11, 0x22, 0x33, 0x44, 0x55, 0x66]);
    matches.in_port = 0xfffd;
    v0x01::FlowStats {
        table_id: 1,
        matches,
        duration_sec: 30,
        duration_nsec: 500,
        priority: 2,
        idle_timeout: 3,
        hard_timeout: 4,
        cookie: 5,
        packet_count,
        byte_count: packet_count.map(|p| p * 64),
        actions: vec![
            v0x01::Action::SetVlanVid(6),
            v0x01::Action::Output { port: 1, max_len: 0xffff },
        ],
    }
}

fn modern_stats(byte_count: Option<u64>) -> v0x04::FlowStats {
    v0x04::FlowStats {
        table_id: 1,
        duration_sec: 30,
        duration_nsec: 500,
        priority: 2,
        idle_timeout: 3,
        hard_timeout: 4,
        flags: 0,
        cookie: 5,
        packet_count: Some(7),
        byte_count,
        matches: v0x04::Match {
            fields: smallvec![
                v0x04::OxmField::EthSrc(MAC([0x11, 0x22, 0x33, 0x44, 0x55, 0x66])),
                v0x04::OxmField::IpProto(17),
                v0x04::OxmField::UdpDst(53),
            ],
        },
        instructions: vec![
            v0x04::Instruction::GotoTable(2),
            v0x04::Instruction::ApplyActions(vec![v0x04::Action::PushVlan(0x8100), v0x04::Action::PopVlan]),
        ],
    }
}

#[test]
fn test_decode_legacy_stats() {
    let factory = FlowFactory::default();
    let stats = FlowStats::from(legacy_stats(Some(10)));
    let flow = factory.from_of_flow_stats(&stats, switch(OfpVersion::V0X01)).unwrap();
    assert_eq!(flow.version(), OfpVersion::V0X01);
    assert_eq!(
        flow.as_dict().unwrap(),
        json!({
            "id": flow.id().unwrap(),
            "switch": "00:00:00:00:00:00:00:01",
            "table_id": 1,
            "match": {"dl_src": "11:22:33:44:55:66", "in_port": 0xffff_fffdu32},
            "priority": 2,
            "idle_timeout": 3,
            "hard_timeout": 4,
            "cookie": 5,
            "actions": [
                {"action_type": "set_vlan", "vlan_id": 6},
                {"action_type": "output", "port": 1}
            ],
            "stats": {"packet_count": 10, "byte_count": 640, "duration_sec": 30, "duration_nsec": 500}
        })
    );

    let flow = factory
        .from_of_flow_stats(&FlowStats::from(legacy_stats(None)), switch(OfpVersion::V0X01))
        .unwrap();
    assert_eq!(flow.stats.packet_count, None);
    assert_eq!(flow.stats.byte_count, None);
    assert_eq!(flow.stats.duration_sec, Some(30));
    assert!(flow.as_dict().unwrap()["stats"].get("packet_count").is_none());
}

#[test]
fn test_decode_modern_stats() {
    let factory = FlowFactory::default();
    let stats = FlowStats::from(modern_stats(None));
    let flow = factory.from_of_flow_stats(&stats, switch(OfpVersion::V0X04)).unwrap();
    assert_eq!(flow.table_id, 1);
    assert_eq!(
        serde_json::to_value(&flow.matches).unwrap(),
        json!({"dl_src": "11:22:33:44:55:66", "nw_proto": 17, "tp_dst": 53})
    );
    assert_eq!(
        serde_json::to_value(&flow.actions).unwrap(),
        json!([
            {"action_type": "push_vlan", "tag_type": "c"},
            {"action_type": "pop_vlan"},
            {"action_type": "goto_table", "table_id": 2}
        ])
    );
    assert_eq!(flow.stats.packet_count, Some(7));
    assert_eq!(flow.stats.byte_count, None);

    // re-encoding keeps the UDP port and moves goto_table into its own instruction
    let flow_mod = match flow.as_of_modify_flow_mod().unwrap() {
        FlowMod::V0x04(m) => m,
        other => panic!("unexpected {:?}", other),
    };
    assert_eq!(flow_mod.matches, modern_stats(None).matches);
    assert_eq!(flow_mod.instructions.last(), Some(&v0x04::Instruction::GotoTable(2)));
}

#[test]
fn test_stats_round_trip_through_wire() {
    let legacy = legacy_stats(Some(1));
    let entries = FlowStats::unpack_all(OfpVersion::V0X01, &legacy.pack().unwrap()).unwrap();
    assert_eq!(entries, vec![FlowStats::V0x01(legacy)]);

    let modern = modern_stats(Some(2));
    let mut body = modern.pack().unwrap().to_vec();
    body.extend_from_slice(&modern.pack().unwrap());
    let entries = FlowStats::unpack_all(OfpVersion::V0X04, &body).unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[1], FlowStats::V0x04(modern));

    assert!(FlowStats::unpack_all(OfpVersion::V0X04, &body[..body.len() - 8]).is_err());
}

#[test]
fn test_decode_rejects_foreign_entries() {
    let legacy: Arc<dyn VersionAdapter> = Arc::new(adapter::v0x01::Adapter::default());
    let stats = FlowStats::from(modern_stats(None));
    match legacy.from_of_flow_stats(&stats, switch(OfpVersion::V0X01)) {
        Err(Error::Flow(FlowError::VersionMismatch { expected, found })) => {
            assert_eq!(expected, OfpVersion::V0X01);
            assert_eq!(found, OfpVersion::V0X04);
        }
        other => panic!("unexpected {:?}", other),
    }

    let mut entry = modern_stats(None);
    entry.instructions = vec![v0x04::Instruction::ClearActions];
    let modern: Arc<dyn VersionAdapter> = Arc::new(adapter::v0x04::Adapter::default());
    assert!(matches!(
        modern.from_of_flow_stats(&FlowStats::from(entry), switch(OfpVersion::V0X04)),
        Err(Error::Flow(FlowError::UnsupportedAction { .. }))
    ));

    let mut entry = legacy_stats(None);
    entry.actions.push(v0x01::Action::Enqueue { port: 1, queue_id: 2 });
    assert!(matches!(
        legacy.from_of_flow_stats(&FlowStats::from(entry), switch(OfpVersion::V0X01)),
        Err(Error::Flow(FlowError::UnsupportedAction { .. }))
    ));
}

#[test]
fn test_reserved_ports_cross_versions() {
    let data = json!({"match": {"in_port": 1}, "actions": [{"action_type": "output", "port": 0xffff_fffdu32}]});
    for adapter in adapters() {
        let flow = flow_for(&adapter, data.clone());
        match flow.as_of_add_flow_mod().unwrap() {
            FlowMod::V0x01(m) => assert_eq!(m.actions, vec![v0x01::Action::Output { port: 0xfffd, max_len: 0xffff }]),
            FlowMod::V0x04(m) => assert_eq!(
                m.instructions,
                vec![v0x04::Instruction::ApplyActions(vec![v0x04::Action::Output {
                    port: 0xffff_fffd,
                    max_len: v0x04::OFPCML_NO_BUFFER
                }])]
            ),
        }
    }
}

#[test]
fn test_id_uses_canonical_match_values() {
    let mut upper = scenario();
    upper["match"] = json!({"dl_src": "11:22:33:AA:BB:CC", "nw_src": "10.0.0.1/32"});
    let mut lower = scenario();
    lower["match"] = json!({"dl_src": "11:22:33:aa:bb:cc", "nw_src": "10.0.0.1"});
    for adapter in adapters() {
        let a = flow_for(&adapter, upper.clone());
        let b = flow_for(&adapter, lower.clone());
        assert_eq!(a.id().unwrap(), b.id().unwrap());
        // the mapping itself keeps the values as given
        assert_eq!(a.as_dict().unwrap()["match"]["dl_src"], json!("11:22:33:AA:BB:CC"));
    }
    assert_eq!(flow_for(&adapters()[0], scenario()).id().unwrap(), SCENARIO_ID);
}

#[test]
fn test_oversized_flow_mod_rejected() {
    let actions: Vec<Value> = (0..8200).map(|_| json!({"action_type": "output", "port": 1})).collect();
    let data = json!({"actions": actions});
    for adapter in adapters() {
        let flow = flow_for(&adapter, data.clone());
        match flow.as_of_add_flow_mod() {
            Err(Error::Wire(WireError::BadLength { length, .. })) => assert!(length > 0xffff),
            other => panic!("unexpected {:?}", other.map(|m| m.len())),
        }
    }
}
