//! Split request/response fabric: one minion port, `T` master ports.

use crate::{
    Arbiter, ConfigError, FixedRouting, Packet, RoundRobinArbiter, RoutingLogic,
    FABRIC_SENDER_ID,
};

use super::{Router, RouterEval};

/// Per-cycle inputs of a [`ReqRespRouter`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ReqRespInputs<'a> {
    /// Request offered on the minion side.
    pub minion_req: Option<Packet>,
    /// Minion-side consumer ready for responses.
    pub minion_resp_ready: bool,
    /// Ready of each terminal's request input.
    pub master_req_ready: &'a [bool],
    /// Response offered by each terminal.
    pub master_resp: &'a [Option<Packet>],
}

/// One cycle of both directions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReqRespEval {
    /// Request direction, 1×T.
    pub req: RouterEval,
    /// Response direction, T×1.
    pub resp: RouterEval,
}

/// Request router fanning out to `T` terminals paired with a response
/// router collapsing their replies back onto the minion side.
#[derive(Debug, Clone)]
pub struct ReqRespRouter<R, A = RoundRobinArbiter> {
    req: Router<R, A>,
    resp: Router<FixedRouting, A>,
}

impl<R: RoutingLogic + Clone> ReqRespRouter<R, RoundRobinArbiter> {
    /// Builds the pair for `num_terminals` terminals; requests are steered
    /// by `logic`, responses always go to port 0.
    ///
    /// # Errors
    ///
    /// Same conditions as [`Router::new`] for either direction.
    pub fn new(num_terminals: usize, logic: R) -> Result<Self, ConfigError> {
        Self::with_arbiter(num_terminals, logic, RoundRobinArbiter::new())
    }
}

impl<R: RoutingLogic + Clone, A: Arbiter + Clone> ReqRespRouter<R, A> {
    /// Builds the pair with a custom response-merge arbiter.
    ///
    /// # Errors
    ///
    /// Same as [`ReqRespRouter::new`].
    pub fn with_arbiter(num_terminals: usize, logic: R, arbiter: A) -> Result<Self, ConfigError> {
        let req = Router::with_arbiter(FABRIC_SENDER_ID, 1, num_terminals, logic, arbiter.clone())?;
        let resp = Router::with_arbiter(
            FABRIC_SENDER_ID,
            num_terminals,
            1,
            FixedRouting::new(1),
            arbiter,
        )?;
        Ok(Self { req, resp })
    }
}

impl<R: RoutingLogic, A: Arbiter> ReqRespRouter<R, A> {
    /// Number of terminal ports.
    #[must_use]
    pub fn num_terminals(&self) -> usize {
        self.req.num_outports()
    }

    /// Request-direction router.
    #[must_use]
    pub const fn req_router(&self) -> &Router<R, A> {
        &self.req
    }

    /// Response-direction router.
    #[must_use]
    pub const fn resp_router(&self) -> &Router<FixedRouting, A> {
        &self.resp
    }

    /// Minion-side request ready.
    #[must_use]
    pub fn minion_req_ready(&self) -> bool {
        self.req.recv_ready(0)
    }

    /// Response presented on the minion side.
    #[must_use]
    pub fn minion_resp(&self) -> Option<&Packet> {
        self.resp.send(0)
    }

    /// Request presented to terminal `terminal`.
    #[must_use]
    pub fn master_req(&self, terminal: usize) -> Option<&Packet> {
        self.req.send(terminal)
    }

    /// Response ready presented to terminal `terminal`.
    #[must_use]
    pub fn master_resp_ready(&self, terminal: usize) -> bool {
        self.resp.recv_ready(terminal)
    }

    /// Computes one cycle of both directions.
    #[must_use]
    pub fn evaluate(&self, inputs: &ReqRespInputs<'_>) -> ReqRespEval {
        ReqRespEval {
            req: self
                .req
                .evaluate(&[inputs.minion_req], inputs.master_req_ready),
            resp: self
                .resp
                .evaluate(inputs.master_resp, &[inputs.minion_resp_ready]),
        }
    }

    /// Latches a cycle computed by [`ReqRespRouter::evaluate`].
    pub fn commit(&mut self, eval: &ReqRespEval) {
        self.req.commit(&eval.req);
        self.resp.commit(&eval.resp);
    }

    /// Resets both directions.
    pub fn reset(&mut self) {
        self.req.reset();
        self.resp.reset();
    }
}
