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

//! Offsets and masks of the fixed DNS message header, and message size
//! limits.

pub const HEADER_SIZE: usize = 12;

pub const ID_START: usize = 0;
pub const FLAGS_HI: usize = 2;
pub const FLAGS_LO: usize = 3;
pub const QDCOUNT_START: usize = 4;
pub const ANCOUNT_START: usize = 6;
pub const NSCOUNT_START: usize = 8;
pub const ARCOUNT_START: usize = 10;

// Bits of FLAGS_HI.
pub const QR_MASK: u8 = 0x80;
pub const OPCODE_MASK: u8 = 0x78;
pub const OPCODE_SHIFT: usize = 3;
pub const AA_MASK: u8 = 0x04;
pub const TC_MASK: u8 = 0x02;
pub const RD_MASK: u8 = 0x01;

// Bits of FLAGS_LO.
pub const RA_MASK: u8 = 0x80;
pub const RCODE_MASK: u8 = 0x0f;

/// The largest offset a compression pointer can refer to.
pub const POINTER_MAX: usize = 0x3fff;

/// The maximum size of a DNS message sent over UDP without EDNS.
pub const MAX_UDP_MESSAGE_SIZE: usize = 512;

/// The maximum size of a DNS message sent over TCP, as limited by the
/// two-octet length prefix.
pub const MAX_TCP_MESSAGE_SIZE: usize = 65535;
