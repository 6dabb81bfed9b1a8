// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error ring buffer, per-subsystem circuit breakers, and the overall
//! readiness/watchdog gate (spec §4.7).

mod breaker;
mod monitor;
mod ring;

pub use breaker::{BreakerState, CircuitBreaker};
pub use monitor::{HealthMonitor, Readiness};
pub use ring::{ErrorEvent, ErrorRing};
