//! Register layouts of a standalone config terminal.

#![allow(clippy::pedantic, clippy::nursery, clippy::cast_possible_truncation)]

use fabric_core::{ConfigError, ConfigTerminal, Packet, TerminalInputs};
use log as _;
use proptest as _;
use rstest::rstest;
#[cfg(feature = "serde")]
use serde as _;
use thiserror as _;

fn transact(terminal: &mut ConfigTerminal, request: Packet, status: &[u32]) -> Packet {
    let mut req = Some(request);
    for _ in 0..8 {
        let eval = terminal.tick(&TerminalInputs {
            req,
            resp_ready: true,
            status,
        });
        if eval.req.fires() {
            req = None;
        }
        if let Some(response) = eval.resp.transfer() {
            return response;
        }
    }
    panic!("terminal never answered {request:?}");
}

#[rstest]
#[case::config_only(1, 0)]
#[case::status_only(0, 1)]
#[case::mixed(2, 2)]
#[case::uneven(3, 2)]
fn every_register_decodes_to_its_index(#[case] num_config: usize, #[case] num_status: usize) {
    let mut terminal = ConfigTerminal::new(num_config, num_status).expect("registers");
    let total = num_config + num_status;
    let status: Vec<u32> = (0..num_status as u32).map(|i| 0x5000 + i).collect();

    for index in 0..num_config as u32 {
        transact(&mut terminal, Packet::write(index, 0xa000 + index), &status);
    }
    // Writes to status registers are ignored.
    for index in num_config as u32..total as u32 {
        transact(&mut terminal, Packet::write(index, 0xffff), &status);
    }

    let span = 1u32 << terminal.index_bits();
    for index in 0..span {
        let response = transact(&mut terminal, Packet::read(index), &status);
        let expected = match index as usize {
            i if i < num_config => 0xa000 + index,
            i if i < total => 0x5000 + (i - num_config) as u32,
            _ => 0,
        };
        assert_eq!(response.data, expected, "index {index}");
        assert_eq!(response.addr, index);
    }
    let expected_config: Vec<u32> = (0..num_config as u32).map(|i| 0xa000 + i).collect();
    assert_eq!(terminal.config_regs(), expected_config.as_slice());
}

#[rstest]
#[case(0x0000, 0)]
#[case(0x0004, 0)]
#[case(0x1001, 1)]
#[case(0xfffe, 2)]
fn upper_address_bits_alias(#[case] addr: u32, #[case] index: usize) {
    let terminal = ConfigTerminal::new(2, 1).expect("registers");
    assert_eq!(terminal.index_bits(), 2);
    assert_eq!(terminal.register_index(addr), index);
}

#[rstest]
fn empty_terminal_is_rejected() {
    assert_eq!(ConfigTerminal::new(0, 0), Err(ConfigError::NoRegisters));
}

#[test]
fn responses_keep_request_order() {
    let mut terminal = ConfigTerminal::new(2, 0).expect("registers");
    let requests = [
        Packet::write(0, 1),
        Packet::read(0),
        Packet::write(1, 2),
        Packet::read(1),
    ];
    let mut queue = requests.iter().copied().peekable();
    let mut responses = Vec::new();
    for _ in 0..32 {
        let eval = terminal.tick(&TerminalInputs {
            req: queue.peek().copied(),
            resp_ready: true,
            status: &[],
        });
        if eval.req.fires() {
            queue.next();
        }
        responses.extend(eval.resp.transfer());
    }
    let data: Vec<(u32, u32)> = responses.iter().map(|p| (p.addr, p.data)).collect();
    assert_eq!(data, vec![(0, 0), (0, 1), (1, 0), (1, 2)]);
}
