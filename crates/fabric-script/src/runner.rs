//! Drives a parsed script through a [`ConfigFabric`] and checks the results.
//!
//! ## Execution Model
//!
//! 1. Build the fabric from the script's directives and apply `.status` drives.
//! 2. Push requests in script order, one per cycle, holding back whenever the
//!    previous cycle reported a stall. Pull stays enabled throughout.
//! 3. Match each pulled response to an outstanding request with the same kind
//!    and address. Terminals answer independently, so responses from different
//!    terminals may arrive in any order.
//! 4. Stop once every request is answered or `max_cycles` have elapsed, then
//!    evaluate the `expect config` checks against the terminals.

#![allow(clippy::option_if_let_else, clippy::missing_const_for_fn)]

use std::fmt;

use fabric_core::{
    ConfigError, ConfigFabric, FabricInputs, FabricStats, Packet, PushIn, TraceEvent,
};

use crate::script::{format_packet, RegisterExpectation, Script, Transaction};

/// Knobs for [`run_script`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunOptions {
    /// Record every fabric event in [`RunReport::trace`].
    pub trace: bool,
}

/// Outcome of one script line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckResult {
    /// 1-indexed source line.
    pub line: usize,
    /// Whether the check passed.
    pub passed: bool,
    /// What was observed.
    pub detail: String,
}

impl CheckResult {
    fn pass(line: usize, detail: String) -> Self {
        Self {
            line,
            passed: true,
            detail,
        }
    }

    fn fail(line: usize, detail: String) -> Self {
        Self {
            line,
            passed: false,
            detail,
        }
    }
}

/// Everything observed while running a script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// Per-line results, transactions first in completion order, then
    /// register checks in script order.
    pub results: Vec<CheckResult>,
    /// Responses that matched no outstanding request.
    pub unexpected: Vec<Packet>,
    /// Cycles simulated.
    pub cycles: u64,
    /// Whether the cycle limit was reached with requests still unanswered.
    pub timed_out: bool,
    /// Fabric counters at the end of the run.
    pub stats: FabricStats,
    /// Recorded events, empty unless [`RunOptions::trace`] was set.
    pub trace: Vec<TraceEvent>,
}

impl RunReport {
    /// Returns true if every check passed and nothing unexpected arrived.
    #[must_use]
    pub fn all_passed(&self) -> bool {
        !self.timed_out && self.unexpected.is_empty() && self.results.iter().all(|r| r.passed)
    }

    /// Returns counts for summary reporting.
    #[must_use]
    pub fn summary(&self) -> RunSummary {
        let passed = self.results.iter().filter(|r| r.passed).count();
        RunSummary {
            passed,
            failed: self.results.len() - passed,
            unexpected: self.unexpected.len(),
            cycles: self.cycles,
        }
    }
}

/// Summary counts for run reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Number of checks that passed.
    pub passed: usize,
    /// Number of checks that failed.
    pub failed: usize,
    /// Number of responses nobody asked for.
    pub unexpected: usize,
    /// Cycles simulated.
    pub cycles: u64,
}

/// Runs `script` to completion or its cycle limit.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the fabric cannot be built from the script's
/// directives. Scripts from [`crate::parse_script`] are already validated.
pub fn run_script(script: &Script, options: RunOptions) -> Result<RunReport, ConfigError> {
    let mut fabric = ConfigFabric::new(script.config.clone())?;
    for drive in &script.status {
        fabric.set_status(drive.terminal, drive.index, drive.value)?;
    }

    let mut pending = script.transactions.iter().peekable();
    let mut outstanding: Vec<&Transaction> = Vec::new();
    let mut results = Vec::new();
    let mut unexpected = Vec::new();
    let mut trace = Vec::new();
    let mut stalled = false;
    let mut cycles = 0;

    while cycles < script.max_cycles {
        if pending.peek().is_none() && outstanding.is_empty() {
            break;
        }

        let push = match pending.peek() {
            Some(&transaction) if !stalled => {
                pending.next();
                outstanding.push(transaction);
                PushIn::packet(transaction.request)
            }
            _ => PushIn::default(),
        };
        let inputs = FabricInputs {
            push,
            pull_en: true,
            loopback_en: false,
        };
        let outputs = if options.trace {
            fabric.step_traced(&inputs, &mut trace)
        } else {
            fabric.step(&inputs)
        };
        stalled = outputs.pull.stall;
        cycles += 1;

        if outputs.pull.valid {
            let response = outputs.pull.payload;
            log::debug!("cycle {cycles}: pulled {}", format_packet(&response));
            match match_response(&mut outstanding, response) {
                Some(result) => results.push(result),
                None => {
                    log::warn!("unexpected response {}", format_packet(&response));
                    unexpected.push(response);
                }
            }
        }
    }

    let unanswered: Vec<&Transaction> = outstanding.into_iter().chain(pending).collect();
    let timed_out = !unanswered.is_empty();
    for transaction in unanswered {
        results.push(CheckResult::fail(
            transaction.line,
            format!(
                "no response to {} within {} cycles",
                format_packet(&transaction.request),
                script.max_cycles
            ),
        ));
    }

    for check in &script.registers {
        results.push(check_register(&fabric, check));
    }

    Ok(RunReport {
        results,
        unexpected,
        cycles,
        timed_out,
        stats: fabric.stats(),
        trace,
    })
}

/// Pairs `response` with the best outstanding request and removes it.
///
/// Preference goes to a request expecting exactly this response, then to one
/// without an expectation, then to one expecting something else.
fn match_response(outstanding: &mut Vec<&Transaction>, response: Packet) -> Option<CheckResult> {
    let same_request = |t: &&Transaction| {
        t.request.kind == response.kind && t.request.addr == response.addr
    };
    let position = outstanding
        .iter()
        .position(|t| same_request(t) && t.expect == Some(response))
        .or_else(|| {
            outstanding
                .iter()
                .position(|t| same_request(t) && t.expect.is_none())
        })
        .or_else(|| outstanding.iter().position(same_request))?;

    let transaction = outstanding.remove(position);
    let got = format_packet(&response);
    Some(match transaction.expect {
        Some(expected) if expected != response => CheckResult::fail(
            transaction.line,
            format!("expected {}, got {got}", format_packet(&expected)),
        ),
        _ => CheckResult::pass(transaction.line, got),
    })
}

fn check_register(fabric: &ConfigFabric, check: &RegisterExpectation) -> CheckResult {
    let actual = fabric
        .terminal(check.terminal)
        .and_then(|terminal| terminal.config_regs().get(check.index))
        .copied();
    let name = format!("config {}/{}", check.terminal, check.index);
    match actual {
        Some(value) if value == check.value => {
            CheckResult::pass(check.line, format!("{name} == {value:#x}"))
        }
        Some(value) => CheckResult::fail(
            check.line,
            format!("{name}: expected {:#x}, got {value:#x}", check.value),
        ),
        None => CheckResult::fail(check.line, format!("{name} does not exist")),
    }
}

/// Renders a trace event as one line of text.
#[must_use]
pub fn format_event(event: &TraceEvent) -> String {
    match event {
        TraceEvent::PushAccepted { cycle, packet } => {
            format!("[{cycle:>5}] push      {}", format_packet(packet))
        }
        TraceEvent::PushDropped { cycle, packet } => {
            format!("[{cycle:>5}] dropped   {}", format_packet(packet))
        }
        TraceEvent::RequestDelivered {
            cycle,
            terminal,
            packet,
        } => format!("[{cycle:>5}] deliver   {} -> t{terminal}", format_packet(packet)),
        TraceEvent::RegisterWrite {
            cycle,
            terminal,
            index,
            value,
        } => format!("[{cycle:>5}] write     t{terminal}.config[{index}] = {value:#x}"),
        TraceEvent::ResponseReturned {
            cycle,
            packet,
            looped,
        } => {
            let via = if *looped { " (loopback)" } else { "" };
            format!("[{cycle:>5}] return    {}{via}", format_packet(packet))
        }
        TraceEvent::ResponsePulled { cycle, packet } => {
            format!("[{cycle:>5}] pull      {}", format_packet(packet))
        }
        TraceEvent::StallLatch { cycle, armed } => {
            let state = if *armed { "armed" } else { "released" };
            format!("[{cycle:>5}] stall     {state}")
        }
        TraceEvent::RouteFaulted { cycle, port, fault } => {
            format!("[{cycle:>5}] fault     port {port}: {fault}")
        }
    }
}

impl fmt::Display for CheckResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = if self.passed { "PASS" } else { "FAIL" };
        write!(f, "{status} (line {}): {}", self.line, self.detail)
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} passed, {} failed", self.passed, self.failed)?;
        if self.unexpected > 0 {
            write!(f, ", {} unexpected", self.unexpected)?;
        }
        write!(f, " in {} cycles", self.cycles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::parse_script;

    fn run(source: &str) -> RunReport {
        let script = parse_script(source).expect("valid script");
        run_script(&script, RunOptions::default()).expect("buildable fabric")
    }

    #[test]
    fn matching_expectations_pass() {
        let report = run(
            ".config_regs 1\n.status_regs 0\n\
             wr 0x0000 0xdeadbeef => wr 0x0000 0\n\
             rd 0x0000 => rd 0x0000 0xdeadbeef\n\
             expect config 0 0 == 0xdeadbeef\n",
        );
        assert!(report.all_passed(), "{report:?}");
        assert_eq!(report.results.len(), 3);
        assert_eq!(report.summary().passed, 3);
        assert!(!report.timed_out);
        assert_eq!(report.stats.register_writes, 1);
    }

    #[test]
    fn wrong_read_data_fails_with_both_values() {
        let report = run(".config_regs 1\n.status_regs 0\nrd 0x1000 => rd 0x1000 5\n");
        assert!(!report.all_passed());
        let failure = &report.results[0];
        assert_eq!(failure.line, 3);
        assert!(!failure.passed);
        assert_eq!(
            failure.to_string(),
            "FAIL (line 3): expected rd 0x1000 0x5, got rd 0x1000 0x0"
        );
    }

    #[test]
    fn responses_from_different_terminals_match_in_any_order() {
        let report = run(
            ".config_regs 1\n.status_regs 0\n\
             wr 0x3000 1 => wr 0x3000 0\n\
             wr 0x0000 2 => wr 0x0000 0\n\
             rd 0x3000 => rd 0x3000 1\n\
             rd 0x0000 => rd 0x0000 2\n\
             expect config 3 0 == 1\n\
             expect config 0 0 == 2\n",
        );
        assert!(report.all_passed(), "{report:?}");
        assert_eq!(report.summary().failed, 0);
    }

    #[test]
    fn status_drives_are_visible_to_reads() {
        let report = run(
            ".config_regs 1\n.status_regs 1\n.status 2 0 0x77\n\
             rd 0x2001 => rd 0x2001 0x77\n",
        );
        assert!(report.all_passed(), "{report:?}");
    }

    #[test]
    fn register_check_reports_actual_value() {
        let report = run(".config_regs 2\nwr 0x1001 9\nexpect config 1 1 == 8\n");
        let check = report.results.last().expect("register check");
        assert!(!check.passed);
        assert_eq!(check.detail, "config 1/1: expected 0x8, got 0x9");
    }

    #[test]
    fn cycle_limit_fails_unanswered_requests() {
        let report = run(".max_cycles 2\nrd 0x0000\nrd 0x1000\nrd 0x2000\n");
        assert!(report.timed_out);
        assert!(!report.all_passed());
        assert_eq!(report.cycles, 2);
        assert_eq!(report.summary().failed, 3);
        assert!(report.results[0].detail.starts_with("no response to rd 0x0000"));
    }

    #[test]
    fn trace_is_recorded_only_on_request() {
        let script = parse_script("wr 0x0000 1\n").expect("valid script");
        let quiet = run_script(&script, RunOptions::default()).expect("fabric");
        assert!(quiet.trace.is_empty());

        let traced = run_script(&script, RunOptions { trace: true }).expect("fabric");
        assert!(matches!(
            traced.trace.first(),
            Some(TraceEvent::PushAccepted { cycle: 0, .. })
        ));
        assert!(traced
            .trace
            .iter()
            .any(|event| matches!(event, TraceEvent::RegisterWrite { terminal: 0, .. })));
        assert_eq!(
            format_event(&traced.trace[0]),
            "[    0] push      wr 0x0000 0x1"
        );
    }

    #[test]
    fn summary_mentions_unexpected_responses() {
        let summary = RunSummary {
            passed: 2,
            failed: 1,
            unexpected: 1,
            cycles: 40,
        };
        assert_eq!(summary.to_string(), "2 passed, 1 failed, 1 unexpected in 40 cycles");
    }
}
