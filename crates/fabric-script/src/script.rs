//! Parsing for fabric transaction scripts.
//!
//! ## Supported Syntax
//!
//! - Directives: `.boundaries A B ...`, `.config_regs N`, `.status_regs N`,
//!   `.entries N`, `.max_cycles N`, `.status T I V`
//! - Requests: `wr ADDR DATA`, `rd ADDR`, optionally followed by an
//!   expected response `=> wr ADDR DATA` or `=> rd ADDR DATA`
//! - Register checks: `expect config T I == V`
//! - Comments: `;` to end of line
//! - Literals: decimal, `0x` hex, `0b` binary

#![allow(clippy::option_if_let_else, clippy::missing_const_for_fn)]

use std::fmt;

use fabric_core::{CfgKind, FabricConfig, Packet};

/// Cycle limit used when a script does not set `.max_cycles`.
pub const DEFAULT_MAX_CYCLES: u64 = 10_000;

/// A request with its optional expected response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transaction {
    /// 1-indexed source line.
    pub line: usize,
    /// Request pushed into the fabric.
    pub request: Packet,
    /// Expected response, when the script gives one.
    pub expect: Option<Packet>,
}

/// A check of a config register after the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterExpectation {
    /// 1-indexed source line.
    pub line: usize,
    /// Terminal index.
    pub terminal: usize,
    /// Config register index.
    pub index: usize,
    /// Expected value.
    pub value: u32,
}

/// A status input driven for the whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusDrive {
    /// 1-indexed source line.
    pub line: usize,
    /// Terminal index.
    pub terminal: usize,
    /// Status input index.
    pub index: usize,
    /// Driven value.
    pub value: u32,
}

/// A parsed script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Script {
    /// Fabric topology assembled from the directives.
    pub config: FabricConfig,
    /// Cycle limit for the run.
    pub max_cycles: u64,
    /// Status inputs applied before the first cycle.
    pub status: Vec<StatusDrive>,
    /// Requests in push order.
    pub transactions: Vec<Transaction>,
    /// Register checks evaluated after the run.
    pub registers: Vec<RegisterExpectation>,
}

/// Error parsing or validating a script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptError {
    /// 1-indexed line, or `None` for whole-script problems.
    pub line: Option<usize>,
    /// The offending text.
    pub text: String,
    /// Description of the error.
    pub message: String,
}

impl ScriptError {
    fn at(line: usize, text: &str, message: String) -> Self {
        Self {
            line: Some(line),
            text: text.to_string(),
            message,
        }
    }
}

impl fmt::Display for ScriptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "line {line}: {} (in '{}')", self.message, self.text),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for ScriptError {}

/// Formats a packet in script syntax, e.g. `rd 0x1000 0xcafec001`.
#[must_use]
pub fn format_packet(packet: &Packet) -> String {
    let kind = match packet.kind {
        CfgKind::Write => "wr",
        CfgKind::Read => "rd",
    };
    format!("{kind} {:#06x} {:#x}", packet.addr, packet.data)
}

/// Parses and validates a script.
///
/// # Errors
///
/// Returns the first syntax error, or a [`ScriptError`] for a fabric
/// configuration or reference the directives make invalid.
pub fn parse_script(source: &str) -> Result<Script, ScriptError> {
    let mut script = Script {
        config: FabricConfig::default(),
        max_cycles: DEFAULT_MAX_CYCLES,
        status: Vec::new(),
        transactions: Vec::new(),
        registers: Vec::new(),
    };

    for (idx, line) in source.lines().enumerate() {
        let line_num = idx + 1;
        let stripped = strip_comment(line).trim();
        if stripped.is_empty() {
            continue;
        }
        parse_line(&mut script, line_num, stripped)
            .map_err(|message| ScriptError::at(line_num, stripped, message))?;
    }

    validate(&script)?;
    Ok(script)
}

fn strip_comment(line: &str) -> &str {
    match line.find(';') {
        Some(pos) => &line[..pos],
        None => line,
    }
}

fn parse_line(script: &mut Script, line: usize, text: &str) -> Result<(), String> {
    let words: Vec<&str> = text.split_whitespace().collect();
    match words.as_slice() {
        [".boundaries", values @ ..] => {
            script.config.boundaries = values
                .iter()
                .map(|value| parse_u32(value))
                .collect::<Result<_, _>>()?;
        }
        [".config_regs", count] => script.config.config_regs = parse_usize(count)?,
        [".status_regs", count] => script.config.status_regs = parse_usize(count)?,
        [".entries", count] => script.config.adapter_entries = parse_usize(count)?,
        [".max_cycles", count] => script.max_cycles = u64::from(parse_u32(count)?),
        [".status", terminal, index, value] => script.status.push(StatusDrive {
            line,
            terminal: parse_usize(terminal)?,
            index: parse_usize(index)?,
            value: parse_u32(value)?,
        }),
        ["expect", "config", terminal, index, "==", value] => {
            script.registers.push(RegisterExpectation {
                line,
                terminal: parse_usize(terminal)?,
                index: parse_usize(index)?,
                value: parse_u32(value)?,
            });
        }
        [directive, ..] if directive.starts_with('.') => {
            return Err(format!("unknown or malformed directive '{directive}'"));
        }
        _ => script.transactions.push(parse_transaction(line, text)?),
    }
    Ok(())
}

fn parse_transaction(line: usize, text: &str) -> Result<Transaction, String> {
    let (request_text, expect_text) = match text.split_once("=>") {
        Some((request, expect)) => (request, Some(expect)),
        None => (text, None),
    };

    let request = match request_text.split_whitespace().collect::<Vec<_>>().as_slice() {
        ["wr", addr, data] => Packet::write(parse_u32(addr)?, parse_u32(data)?),
        ["rd", addr] => Packet::read(parse_u32(addr)?),
        ["wr", ..] => return Err("expected 'wr <addr> <data>'".to_string()),
        ["rd", ..] => return Err("expected 'rd <addr>'".to_string()),
        _ => return Err("expected a request, directive or expectation".to_string()),
    };

    let expect = expect_text.map(parse_response).transpose()?;
    Ok(Transaction {
        line,
        request,
        expect,
    })
}

fn parse_response(text: &str) -> Result<Packet, String> {
    match text.split_whitespace().collect::<Vec<_>>().as_slice() {
        [kind, addr, data] => {
            let kind = match *kind {
                "wr" => CfgKind::Write,
                "rd" => CfgKind::Read,
                other => return Err(format!("unknown response kind '{other}'")),
            };
            Ok(Packet::new(kind, parse_u32(addr)?, parse_u32(data)?))
        }
        _ => Err("expected '=> <wr|rd> <addr> <data>'".to_string()),
    }
}

fn validate(script: &Script) -> Result<(), ScriptError> {
    let config = &script.config;
    config.validate().map_err(|err| ScriptError {
        line: None,
        text: String::new(),
        message: format!("invalid fabric configuration: {err}"),
    })?;

    let terminals = config.num_terminals();
    for drive in &script.status {
        if drive.terminal >= terminals || drive.index >= config.status_regs {
            return Err(ScriptError::at(
                drive.line,
                ".status",
                format!(
                    "status input {}/{} does not exist ({terminals} terminals, {} status registers)",
                    drive.terminal, drive.index, config.status_regs
                ),
            ));
        }
    }
    for check in &script.registers {
        if check.terminal >= terminals || check.index >= config.config_regs {
            return Err(ScriptError::at(
                check.line,
                "expect config",
                format!(
                    "config register {}/{} does not exist ({terminals} terminals, {} config registers)",
                    check.terminal, check.index, config.config_regs
                ),
            ));
        }
    }
    for transaction in &script.transactions {
        if !config.format.fits(&transaction.request) {
            return Err(ScriptError::at(
                transaction.line,
                &format_packet(&transaction.request),
                format!(
                    "request does not fit the {}-bit address and {}-bit data fields",
                    config.format.addr_bits, config.format.data_bits
                ),
            ));
        }
    }
    Ok(())
}

fn parse_u32(text: &str) -> Result<u32, String> {
    let text = text.trim();
    if text.is_empty() {
        return Err("expected a value".to_string());
    }

    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        u32::from_str_radix(&hex.replace('_', ""), 16)
            .map_err(|_| format!("invalid hex value '{text}'"))
    } else if let Some(bin) = text.strip_prefix("0b").or_else(|| text.strip_prefix("0B")) {
        u32::from_str_radix(&bin.replace('_', ""), 2)
            .map_err(|_| format!("invalid binary value '{text}'"))
    } else {
        text.replace('_', "")
            .parse::<u32>()
            .map_err(|_| format!("invalid decimal value '{text}'"))
    }
}

fn parse_usize(text: &str) -> Result<usize, String> {
    parse_u32(text).and_then(|value| {
        usize::try_from(value).map_err(|_| format!("value '{text}' is out of range"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_requests_with_and_without_expectations() {
        let script = parse_script(
            "wr 0x0000 0xdeadbeef => wr 0x0000 0\n\
             rd 0x0000 => rd 0x0000 0xdeadbeef\n\
             rd 0x1000\n",
        )
        .expect("valid script");

        assert_eq!(
            script.transactions,
            vec![
                Transaction {
                    line: 1,
                    request: Packet::write(0, 0xdead_beef),
                    expect: Some(Packet::write(0, 0)),
                },
                Transaction {
                    line: 2,
                    request: Packet::read(0),
                    expect: Some(Packet::new(CfgKind::Read, 0, 0xdead_beef)),
                },
                Transaction {
                    line: 3,
                    request: Packet::read(0x1000),
                    expect: None,
                },
            ]
        );
    }

    #[test]
    fn directives_fill_the_fabric_config() {
        let script = parse_script(
            ".boundaries 0x100 0x200 ; three terminals\n\
             .config_regs 1\n\
             .status_regs 0\n\
             .entries 4\n\
             .max_cycles 500\n",
        )
        .expect("valid script");

        assert_eq!(script.config.boundaries, vec![0x100, 0x200]);
        assert_eq!(script.config.num_terminals(), 3);
        assert_eq!(script.config.config_regs, 1);
        assert_eq!(script.config.status_regs, 0);
        assert_eq!(script.config.adapter_entries, 4);
        assert_eq!(script.max_cycles, 500);
    }

    #[test]
    fn parses_register_and_status_lines() {
        let script = parse_script(".status 1 0 0x55\nexpect config 2 1 == 0b1010\n")
            .expect("valid script");
        assert_eq!(
            script.status,
            vec![StatusDrive {
                line: 1,
                terminal: 1,
                index: 0,
                value: 0x55,
            }]
        );
        assert_eq!(
            script.registers,
            vec![RegisterExpectation {
                line: 2,
                terminal: 2,
                index: 1,
                value: 0b1010,
            }]
        );
    }

    #[test]
    fn reports_the_offending_line() {
        let error = parse_script("rd 0x10\nwr 0x20\n").expect_err("missing data");
        assert_eq!(error.line, Some(2));
        assert_eq!(error.text, "wr 0x20");
        assert!(error.to_string().starts_with("line 2: expected 'wr <addr> <data>'"));
    }

    #[test]
    fn rejects_unknown_directives_and_bad_literals() {
        let error = parse_script(".speed 9\n").expect_err("unknown directive");
        assert!(error.message.contains("'.speed'"));

        let error = parse_script("rd 0xzz\n").expect_err("bad hex");
        assert!(error.message.contains("invalid hex value"));
    }

    #[test]
    fn rejects_invalid_topologies() {
        let error = parse_script(".boundaries 0x2000 0x1000\n").expect_err("unsorted");
        assert_eq!(error.line, None);
        assert!(error.message.starts_with("invalid fabric configuration"));

        let error =
            parse_script(".status_regs 1\n.status 0 1 5\n").expect_err("missing status input");
        assert_eq!(error.line, Some(2));
    }

    #[test]
    fn rejects_addresses_wider_than_the_packet() {
        let error = parse_script("rd 0x10000\n").expect_err("17-bit address");
        assert!(error.message.contains("16-bit address"));
    }

    #[test]
    fn formats_packets_in_script_syntax() {
        assert_eq!(
            format_packet(&Packet::new(CfgKind::Read, 0x1000, 0xcafe_c001)),
            "rd 0x1000 0xcafec001"
        );
        assert_eq!(format_packet(&Packet::write(0x2, 0)), "wr 0x0002 0x0");
    }
}
