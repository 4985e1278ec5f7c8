// Copyright 2022 Matthew Ingwersen.
//
// Licensed under the Apache License, Version 2.0 (the "License"); you
// may not use this file except in compliance with the License. You may
// obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or
// implied. See the License for the specific language governing
// permissions and limitations under the License.

//! Network I/O for running a [`Server`](crate::server::Server).
//!
//! The message-handling logic of [`server`](crate::server) is
//! abstracted from network I/O: it takes the octets of a received
//! message and produces the octets of the response. The provider in
//! this module binds the UDP socket and TCP listener, feeds received
//! messages to a [`Router`](crate::server::Router) and sends back what
//! it produces.

use std::time::Duration;

mod tokio;

pub use self::tokio::{TokioIoProvider, TokioShutdownController};

/// How long a TCP client has to send a complete message before the
/// connection is closed.
const READ_MESSAGE_TIMEOUT: Duration = Duration::from_secs(5);
