//! Router microarchitecture and the request/response fabric built from it.

mod crossbar;
mod input_unit;
mod output_unit;
mod req_resp;
mod route_unit;
mod switch_unit;

pub use crossbar::{Router, RouterEval};
pub use input_unit::InputUnit;
pub use output_unit::OutputUnit;
pub use req_resp::{ReqRespEval, ReqRespInputs, ReqRespRouter};
pub use route_unit::{RouteDecision, RouteUnit};
pub use switch_unit::{SwitchGrant, SwitchUnit};
