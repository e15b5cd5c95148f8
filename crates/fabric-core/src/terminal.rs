//! Register-file terminal answering configuration reads and writes.

use crate::{ConfigError, Packet, Queue, StreamItem};

/// Per-cycle inputs of a [`ConfigTerminal`].
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalInputs<'a> {
    /// Request offered by the fabric.
    pub req: Option<Packet>,
    /// Fabric ready for this terminal's response.
    pub resp_ready: bool,
    /// Present values of the status inputs; missing entries read as 0.
    pub status: &'a [u32],
}

/// One cycle of terminal activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerminalEval {
    /// Request handshake.
    pub req: StreamItem<Packet>,
    /// Request serviced out of the request queue.
    pub serviced: Option<Packet>,
    /// Response produced for `serviced`.
    pub response: Option<Packet>,
    /// Config register write applied at commit, as `(index, value)`.
    pub write: Option<(usize, u32)>,
    /// Response handshake.
    pub resp: StreamItem<Packet>,
}

/// Register-mapped configuration endpoint.
///
/// Holds `num_config` writable registers followed by `num_status` read-only
/// registers mirroring external inputs. The low `index_bits` bits of a
/// request address select the register; higher bits alias. Each serviced
/// request produces exactly one response carrying the request's kind and
/// address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigTerminal {
    req_q: Queue<Packet>,
    resp_q: Queue<Packet>,
    config: Vec<u32>,
    num_status: usize,
    index_bits: u32,
}

impl ConfigTerminal {
    /// Creates a terminal with the given register counts.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NoRegisters`] when both counts are zero.
    pub fn new(num_config: usize, num_status: usize) -> Result<Self, ConfigError> {
        let total = num_config + num_status;
        if total == 0 {
            return Err(ConfigError::NoRegisters);
        }
        let index_bits = (usize::BITS - (total - 1).leading_zeros()).max(1);
        log::debug!(
            "config terminal: {num_config} config + {num_status} status registers, {index_bits} index bits"
        );
        Ok(Self {
            req_q: Queue::single(),
            resp_q: Queue::single(),
            config: vec![0; num_config],
            num_status,
            index_bits,
        })
    }

    /// Number of writable registers.
    #[must_use]
    pub fn num_config(&self) -> usize {
        self.config.len()
    }

    /// Number of status registers.
    #[must_use]
    pub const fn num_status(&self) -> usize {
        self.num_status
    }

    /// Width of the register index decoded from the address.
    #[must_use]
    pub const fn index_bits(&self) -> u32 {
        self.index_bits
    }

    /// Register index addressed by `addr`.
    #[must_use]
    pub const fn register_index(&self, addr: u32) -> usize {
        let index = if self.index_bits >= u32::BITS {
            addr
        } else {
            addr & ((1 << self.index_bits) - 1)
        };
        index as usize
    }

    /// Current config register outputs.
    #[must_use]
    pub fn config_regs(&self) -> &[u32] {
        &self.config
    }

    /// Request ready.
    #[must_use]
    pub fn req_ready(&self) -> bool {
        self.req_q.ready()
    }

    /// Response presented to the fabric.
    #[must_use]
    pub fn resp(&self) -> Option<&Packet> {
        self.resp_q.peek()
    }

    /// Packets held in the request and response queues.
    #[must_use]
    pub fn occupancy(&self) -> usize {
        self.req_q.len() + self.resp_q.len()
    }

    fn read_value(&self, index: usize, status: &[u32]) -> u32 {
        if let Some(value) = self.config.get(index) {
            *value
        } else if index < self.config.len() + self.num_status {
            status
                .get(index - self.config.len())
                .copied()
                .unwrap_or(0)
        } else {
            0
        }
    }

    /// Computes one cycle: a buffered request is serviced whenever the
    /// response queue can take its response.
    #[must_use]
    pub fn evaluate(&self, inputs: &TerminalInputs<'_>) -> TerminalEval {
        let serviced = self.req_q.peek().copied().filter(|_| self.resp_q.ready());
        let response = serviced.map(|req| {
            let index = self.register_index(req.addr);
            let data = if req.is_write() {
                0
            } else {
                self.read_value(index, inputs.status)
            };
            Packet::new(req.kind, req.addr, data)
        });
        let write = serviced.filter(Packet::is_write).and_then(|req| {
            let index = self.register_index(req.addr);
            (index < self.config.len()).then_some((index, req.data))
        });

        TerminalEval {
            req: StreamItem::new(inputs.req, self.req_q.ready()),
            serviced,
            response,
            write,
            resp: StreamItem::new(self.resp_q.peek().copied(), inputs.resp_ready),
        }
    }

    /// Latches a cycle computed by [`ConfigTerminal::evaluate`].
    pub fn commit(&mut self, eval: &TerminalEval) {
        if let Some((index, value)) = eval.write {
            if let Some(reg) = self.config.get_mut(index) {
                log::trace!("config terminal: reg[{index}] <- {value:#x}");
                *reg = value;
            }
        }
        self.req_q.commit(eval.req.transfer(), eval.serviced.is_some());
        self.resp_q.commit(eval.response, eval.resp.fires());
    }

    /// Evaluates and commits one cycle.
    pub fn tick(&mut self, inputs: &TerminalInputs<'_>) -> TerminalEval {
        let eval = self.evaluate(inputs);
        self.commit(&eval);
        eval
    }

    /// Clears config registers and both queues.
    pub fn reset(&mut self) {
        self.config.iter_mut().for_each(|reg| *reg = 0);
        self.req_q.reset();
        self.resp_q.reset();
    }
}
