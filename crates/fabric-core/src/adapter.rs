//! Bridge between the external push/pull interface and the streaming fabric.

use crate::{ConfigError, Packet, PacketFormat, PushPullMsg, Queue, StreamItem};

/// Default depth of the adapter request and response queues.
pub const DEFAULT_ADAPTER_ENTRIES: usize = 2;

/// Push-side input for one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct PushIn {
    /// Push enable.
    pub en: bool,
    /// Pushed message.
    pub msg: PushPullMsg,
}

impl PushIn {
    /// Pushes `packet` with no stall.
    #[must_use]
    pub const fn packet(packet: Packet) -> Self {
        Self {
            en: true,
            msg: PushPullMsg::valid(packet),
        }
    }

    /// Enabled push carrying only a stall indication.
    #[must_use]
    pub const fn stall(stall: bool) -> Self {
        Self {
            en: true,
            msg: PushPullMsg::stall_only(stall),
        }
    }

    /// Returns `true` when the peer signals stall this cycle.
    #[must_use]
    pub const fn peer_stall(&self) -> bool {
        self.en && self.msg.stall
    }
}

/// Per-cycle inputs of a [`PushPullAdapter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AdapterInputs {
    /// Push side.
    pub push: PushIn,
    /// Pull enable.
    pub pull_en: bool,
    /// Fabric ready for the outgoing request.
    pub req_ready: bool,
    /// Response offered by the fabric.
    pub resp: Option<Packet>,
}

/// One cycle of adapter activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdapterEval {
    /// Pushed packet entering the request queue.
    pub push_accepted: Option<Packet>,
    /// Pushed packet lost because the request queue was full.
    pub push_dropped: Option<Packet>,
    /// The pushed packet had address or data bits beyond the packet format
    /// and was clipped to it.
    pub push_clipped: bool,
    /// Outgoing request handshake.
    pub req: StreamItem<Packet>,
    /// Incoming response handshake.
    pub resp: StreamItem<Packet>,
    /// Message driven on the pull side.
    pub pull: PushPullMsg,
    /// XOR-reduction of the outgoing request bits.
    pub parity: bool,
    /// Next value of the stall latch.
    pub resp_stall_next: bool,
}

/// Push/pull to valid/ready adapter.
///
/// Pushed packets enter a request queue feeding the fabric; fabric responses
/// enter a response queue that is drained one packet per enabled pull. The
/// pull message also carries a stall bit asserted one cycle ahead of a full
/// request queue. A stall seen from the peer arms a latch that withholds
/// responses until a cycle with pull disabled.
///
/// Pushed packets are clipped to the packet format on entry, so routing,
/// register decode and parity all see the same bits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushPullAdapter {
    req_q: Queue<Packet>,
    resp_q: Queue<Packet>,
    resp_stall: bool,
    format: PacketFormat,
}

impl PushPullAdapter {
    /// Creates an adapter whose queues each hold `num_entries` packets.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ZeroCapacity`] for `num_entries == 0`, or
    /// [`ConfigError::InvalidPacketFormat`] for an unusable `format`.
    pub fn new(num_entries: usize, format: PacketFormat) -> Result<Self, ConfigError> {
        format.validate()?;
        let adapter = Self {
            req_q: Queue::new(num_entries)?,
            resp_q: Queue::new(num_entries)?,
            resp_stall: false,
            format,
        };
        log::debug!(
            "push/pull adapter: {num_entries} entries, {}-bit packets",
            format.total_bits()
        );
        Ok(adapter)
    }

    /// Queue depth.
    #[must_use]
    pub const fn num_entries(&self) -> usize {
        self.req_q.capacity()
    }

    /// Packet layout used for parity.
    #[must_use]
    pub const fn format(&self) -> PacketFormat {
        self.format
    }

    /// Request presented to the fabric.
    #[must_use]
    pub fn req(&self) -> Option<&Packet> {
        self.req_q.peek()
    }

    /// Ready presented to the fabric's response stream.
    #[must_use]
    pub fn resp_ready(&self) -> bool {
        self.resp_q.ready()
    }

    /// Stall latch state.
    #[must_use]
    pub const fn resp_stalled(&self) -> bool {
        self.resp_stall
    }

    /// Parity output: XOR of the outgoing request bits, or of an all-zero
    /// packet while no request is queued.
    #[must_use]
    pub fn parity(&self) -> bool {
        self.format
            .parity(&self.req_q.peek().copied().unwrap_or_default())
    }

    /// Requests waiting to enter the fabric.
    #[must_use]
    pub fn pending_requests(&self) -> usize {
        self.req_q.len()
    }

    /// Responses waiting to be pulled.
    #[must_use]
    pub fn pending_responses(&self) -> usize {
        self.resp_q.len()
    }

    /// Computes one cycle.
    #[must_use]
    pub fn evaluate(&self, inputs: &AdapterInputs) -> AdapterEval {
        let push = inputs.push;
        let pushed = push.en && push.msg.valid;
        let enq = if pushed {
            Some(self.format.clip(&push.msg.payload))
        } else {
            None
        };
        let push_clipped = pushed && !self.format.fits(&push.msg.payload);
        let req_ready = self.req_q.ready();

        let req = StreamItem::new(self.req_q.peek().copied(), inputs.req_ready);
        let last_slot = self.req_q.len() + 1 == self.req_q.capacity();
        let stall = !req_ready || (enq.is_some() && last_slot && !req.fires());

        let reveal = inputs.pull_en && !self.resp_stall && !push.peer_stall();
        let head = self.resp_q.peek().copied();
        let pull = PushPullMsg {
            valid: head.is_some() && reveal,
            stall,
            payload: head.unwrap_or_default(),
        };

        let resp_stall_next = if self.resp_stall {
            inputs.pull_en
        } else {
            push.peer_stall()
        };

        AdapterEval {
            push_accepted: enq.filter(|_| req_ready),
            push_dropped: enq.filter(|_| !req_ready),
            push_clipped,
            req,
            resp: StreamItem::new(inputs.resp, self.resp_q.ready()),
            pull,
            parity: self.parity(),
            resp_stall_next,
        }
    }

    /// Latches a cycle computed by [`PushPullAdapter::evaluate`].
    pub fn commit(&mut self, eval: &AdapterEval) {
        if eval.push_clipped {
            log::warn!(
                "push/pull adapter: pushed packet wider than the {}/{}/{} format, clipped",
                self.format.kind_bits,
                self.format.addr_bits,
                self.format.data_bits
            );
        }
        if let Some(packet) = eval.push_dropped {
            log::warn!("push/pull adapter: request queue full, dropped {packet:?}");
        }
        if eval.resp_stall_next != self.resp_stall {
            log::trace!("push/pull adapter: stall latch -> {}", eval.resp_stall_next);
        }
        self.req_q.commit(eval.push_accepted, eval.req.fires());
        self.resp_q.commit(eval.resp.transfer(), eval.pull.valid);
        self.resp_stall = eval.resp_stall_next;
    }

    /// Evaluates and commits one cycle.
    pub fn tick(&mut self, inputs: &AdapterInputs) -> AdapterEval {
        let eval = self.evaluate(inputs);
        self.commit(&eval);
        eval
    }

    /// Clears the stall latch and both queues.
    pub fn reset(&mut self) {
        self.req_q.reset();
        self.resp_q.reset();
        self.resp_stall = false;
    }
}
