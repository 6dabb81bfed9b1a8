// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The GPIO arbiter and board-model policy (spec §4.1). Every other
//! subsystem that touches a physical pin goes through a [`GpioArbiter`];
//! nothing else is allowed to hold its own notion of pin state.

mod arbiter;
mod board;

pub use arbiter::{GpioArbiter, NullPinController, Owner, PinController, PinReservation};
pub use board::{BoardModel, Direction, Esp32C3, Esp32Wroom};
