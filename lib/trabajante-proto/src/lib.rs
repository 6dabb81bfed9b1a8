// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Wire contracts shared by every Trabajante crate: the error taxonomy,
//! MQTT topic templates, and the canonical JSON payload shapes exchanged
//! with the control server. Nothing in this crate touches hardware or
//! the network directly — it is the "what", not the "how".

pub mod error;
pub mod ids;
pub mod payload;
pub mod topics;

pub use error::{ConfigErrorCode, ErrorCategory, ErrorCode, Severity};
pub use ids::{is_valid_slug, EspId, DEFAULT_KAISER_ID};
