// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! WiFi/MQTT connection management, the offline publish queue, and the
//! inbound topic router (spec §4.6).

mod backoff;
mod mqtt;
mod queue;
mod router;
mod wifi;

pub use backoff::{Backoff, MAX_BACKOFF_SECONDS, MIN_BACKOFF_SECONDS};
pub use mqtt::{ConnectOutcome, ConnectionMetrics, MqttClient, MqttTransport};
pub use queue::{OutboundMessage, PublishQueue};
pub use router::{InboundMessage, TopicRouter};
pub use wifi::{WifiManager, WifiState, WifiTransport};
