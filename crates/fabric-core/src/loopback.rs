//! Registered loopback bypass between the adapter and the router.

use crate::Packet;

/// Signals around a [`Loopback`] for one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoopbackInputs {
    /// Loopback enable, latched at the end of the cycle.
    pub enable: bool,
    /// Request from the minion (adapter) side.
    pub minion_req: Option<Packet>,
    /// Minion-side ready for responses.
    pub minion_resp_ready: bool,
    /// Master-side (router) request ready.
    pub master_req_ready: bool,
    /// Response from the master side.
    pub master_resp: Option<Packet>,
}

/// Resolved loopback wiring for one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoopbackEval {
    /// Request forwarded to the master side.
    pub master_req: Option<Packet>,
    /// Ready returned to the master side's response.
    pub master_resp_ready: bool,
    /// Ready returned to the minion-side request.
    pub minion_req_ready: bool,
    /// Response delivered to the minion side.
    pub minion_resp: Option<Packet>,
    /// Next value of the enable register.
    pub enable_next: bool,
}

/// Pass-through that can turn requests straight around into responses.
///
/// While enabled, the master side sees no requests and no response ready,
/// and each minion request is answered with a copy of itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Loopback {
    enabled: bool,
}

impl Loopback {
    /// Creates a disabled loopback.
    #[must_use]
    pub const fn new() -> Self {
        Self { enabled: false }
    }

    /// Registered enable.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Resolves the wiring from the registered enable.
    #[must_use]
    pub const fn evaluate(&self, inputs: &LoopbackInputs) -> LoopbackEval {
        if self.enabled {
            LoopbackEval {
                master_req: None,
                master_resp_ready: false,
                minion_req_ready: inputs.minion_resp_ready,
                minion_resp: inputs.minion_req,
                enable_next: inputs.enable,
            }
        } else {
            LoopbackEval {
                master_req: inputs.minion_req,
                master_resp_ready: inputs.minion_resp_ready,
                minion_req_ready: inputs.master_req_ready,
                minion_resp: inputs.master_resp,
                enable_next: inputs.enable,
            }
        }
    }

    /// Latches the enable.
    pub fn commit(&mut self, eval: &LoopbackEval) {
        if eval.enable_next != self.enabled {
            log::debug!("loopback {}", if eval.enable_next { "on" } else { "off" });
        }
        self.enabled = eval.enable_next;
    }

    /// Disables the loopback.
    pub fn reset(&mut self) {
        self.enabled = false;
    }
}
