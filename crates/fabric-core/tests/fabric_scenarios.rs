//! End-to-end scenarios through the push/pull interface of a full fabric.

#![allow(clippy::pedantic, clippy::nursery, clippy::too_many_lines)]

use fabric_core::{
    CfgKind, ConfigFabric, FabricConfig, FabricInputs, FabricOutputs, Packet, PacketFormat,
    PushIn, PushPullMsg, TraceEvent,
};
use log as _;
use proptest as _;
use rstest::rstest;
#[cfg(feature = "serde")]
use serde as _;
use thiserror as _;

/// Drives a fabric the way a well-behaved external pusher/puller would:
/// pushes only when the previous cycle reported no stall and keeps pull
/// enabled once `pull_delay` cycles have passed.
struct Harness {
    fabric: ConfigFabric,
    stalled: bool,
    cycle: u64,
}

impl Harness {
    fn new(config: FabricConfig) -> Self {
        Self {
            fabric: ConfigFabric::new(config).expect("valid fabric"),
            stalled: false,
            cycle: 0,
        }
    }

    fn step(&mut self, inputs: FabricInputs) -> FabricOutputs {
        let outputs = self.fabric.step(&inputs);
        self.stalled = outputs.pull.stall;
        self.cycle += 1;
        outputs
    }

    fn run(&mut self, requests: &[Packet], pull_delay: u64, max_cycles: u64) -> Vec<Packet> {
        let mut pending = requests.iter().copied().peekable();
        let mut responses = Vec::new();
        let start = self.cycle;
        while self.cycle - start < max_cycles {
            let push = match pending.peek() {
                Some(packet) if !self.stalled => {
                    let packet = *packet;
                    pending.next();
                    PushIn::packet(packet)
                }
                _ => PushIn::default(),
            };
            let outputs = self.step(FabricInputs {
                push,
                pull_en: self.cycle - start >= pull_delay,
                loopback_en: false,
            });
            if outputs.pull.valid {
                responses.push(outputs.pull.payload);
            }
            if pending.peek().is_none() && responses.len() == requests.len() {
                break;
            }
        }
        assert_eq!(self.fabric.stats().pushes_dropped, 0);
        responses
    }
}

fn one_config_reg() -> FabricConfig {
    FabricConfig {
        config_regs: 1,
        status_regs: 0,
        ..FabricConfig::default()
    }
}

#[rstest]
#[case::eager_pull(0)]
#[case::late_pull(20)]
fn four_terminals_round_trip_independently(#[case] pull_delay: u64) {
    let values = [0xdead_beef, 0xcafe_c001, 0xbadb_ed00, 0xc01d_beef];
    let mut requests = Vec::new();
    let mut expected = Vec::new();
    for (terminal, value) in values.iter().enumerate() {
        let addr = 0x1000 * terminal as u32;
        requests.push(Packet::write(addr, *value));
        expected.push(Packet::new(CfgKind::Write, addr, 0));
        requests.push(Packet::read(addr));
        expected.push(Packet::new(CfgKind::Read, addr, *value));
    }

    let mut harness = Harness::new(one_config_reg());
    let mut responses = harness.run(&requests, pull_delay, 2_000);

    responses.sort_by_key(|packet| (packet.addr, packet.kind.as_u8()));
    expected.sort_by_key(|packet| (packet.addr, packet.kind.as_u8()));
    assert_eq!(responses, expected);

    for (terminal, value) in values.iter().enumerate() {
        let regs = harness.fabric.terminal(terminal).expect("terminal").config_regs();
        assert_eq!(regs, &[*value]);
    }
    assert_eq!(harness.fabric.stats().register_writes, 4);
    assert_eq!(harness.fabric.stats().outstanding(), 0);
}

#[test]
fn single_terminal_write_then_read() {
    let mut harness = Harness::new(one_config_reg());
    let responses = harness.run(
        &[Packet::write(0x0000, 0xdead_beef), Packet::read(0x0000)],
        0,
        200,
    );
    assert_eq!(
        responses,
        vec![
            Packet::new(CfgKind::Write, 0x0000, 0),
            Packet::new(CfgKind::Read, 0x0000, 0xdead_beef),
        ]
    );
}

#[test]
fn unmapped_register_reads_zero() {
    let mut harness = Harness::new(FabricConfig::default());
    // Two config and two status registers: index 3 is the last status input.
    harness.fabric.set_status(0, 1, 0x77).expect("status input");
    let mut responses = harness.run(
        &[Packet::read(0x0003), Packet::read(0x0007), Packet::read(0x1003)],
        0,
        200,
    );
    responses.sort_by_key(|packet| packet.addr);
    let data: Vec<u32> = responses.iter().map(|packet| packet.data).collect();
    assert_eq!(data, vec![0x77, 0x77, 0]);
}

#[test]
fn parity_tracks_the_request_leaving_the_adapter() {
    let mut fabric = ConfigFabric::new(FabricConfig::default()).expect("valid fabric");
    let packet = Packet::write(0x0200, 0xdead_beef);
    fabric.step(&FabricInputs {
        push: PushIn::packet(packet),
        ..FabricInputs::default()
    });
    let eval = fabric.evaluate(&FabricInputs::default());
    assert_eq!(eval.outputs().parity, PacketFormat::default().parity(&packet));
    assert_eq!(eval.adapter.req.msg, Some(packet));
}

#[test]
fn peer_stall_withholds_responses_until_pull_is_released() {
    let mut fabric = ConfigFabric::new(FabricConfig::default()).expect("valid fabric");
    let request = Packet::read(0x2000);

    // Push the read while also signalling a peer stall.
    fabric.step(&FabricInputs {
        push: PushIn {
            en: true,
            msg: PushPullMsg {
                valid: true,
                stall: true,
                payload: request,
            },
        },
        pull_en: true,
        loopback_en: false,
    });
    assert!(fabric.adapter().resp_stalled());

    // Keep pulling long enough for the response to come back: nothing may be
    // revealed while the latch is armed.
    for _ in 0..40 {
        let outputs = fabric.step(&FabricInputs {
            pull_en: true,
            ..FabricInputs::default()
        });
        assert!(!outputs.pull.valid);
    }
    assert_eq!(fabric.adapter().pending_responses(), 1);

    let outputs = fabric.step(&FabricInputs::default());
    assert!(!outputs.pull.valid);
    assert!(!fabric.adapter().resp_stalled());

    let outputs = fabric.step(&FabricInputs::pull());
    assert!(outputs.pull.valid);
    assert_eq!(outputs.pull.payload, request);
}

#[test]
fn ignoring_stall_drops_pushes_and_is_counted() {
    let mut fabric = ConfigFabric::new(FabricConfig {
        adapter_entries: 1,
        ..FabricConfig::default()
    })
    .expect("valid fabric");
    let mut events = Vec::new();
    for addr in 0..6 {
        fabric.step_traced(
            &FabricInputs {
                push: PushIn::packet(Packet::read(addr)),
                ..FabricInputs::default()
            },
            &mut events,
        );
    }
    let dropped = fabric.stats().pushes_dropped;
    assert!(dropped > 0);
    let traced = events
        .iter()
        .filter(|event| matches!(event, TraceEvent::PushDropped { .. }))
        .count() as u64;
    assert_eq!(traced, dropped);
    assert_eq!(fabric.stats().requests_accepted + dropped, 6);
}

#[test]
fn trace_follows_a_write_through_the_fabric() {
    let mut fabric = ConfigFabric::new(FabricConfig::default()).expect("valid fabric");
    let mut events = Vec::new();
    let request = Packet::write(0x3001, 0x55);
    fabric.step_traced(&FabricInputs::push(request), &mut events);
    for _ in 0..20 {
        fabric.step_traced(&FabricInputs::pull(), &mut events);
    }

    let position = |wanted: fn(&TraceEvent) -> bool| {
        events
            .iter()
            .position(wanted)
            .unwrap_or_else(|| panic!("missing event in {events:?}"))
    };
    let accepted = position(|e| matches!(e, TraceEvent::PushAccepted { .. }));
    let delivered = position(|e| {
        matches!(
            e,
            TraceEvent::RequestDelivered {
                terminal: 3,
                ..
            }
        )
    });
    let written = position(|e| {
        matches!(
            e,
            TraceEvent::RegisterWrite {
                terminal: 3,
                index: 1,
                value: 0x55,
                ..
            }
        )
    });
    let pulled = position(|e| matches!(e, TraceEvent::ResponsePulled { .. }));
    assert!(accepted < delivered && delivered < written && written < pulled);
}

#[test]
fn loopback_round_trip_preserves_request_fields() {
    let mut harness = Harness::new(FabricConfig::default());
    harness.step(FabricInputs {
        loopback_en: true,
        ..FabricInputs::default()
    });

    let request = Packet::read(0x1234);
    let mut seen = None;
    let mut push = PushIn::packet(request);
    for _ in 0..10 {
        let outputs = harness.step(FabricInputs {
            push,
            pull_en: true,
            loopback_en: true,
        });
        push = PushIn::default();
        if outputs.pull.valid {
            seen = Some(outputs.pull.payload);
        }
    }
    assert_eq!(seen, Some(request));
    assert!(harness.fabric.terminals().iter().all(|t| t.config_regs() == [0, 0]));
}
