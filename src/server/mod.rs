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

//! The processing logic of an authoritative and forwarding DNS server.
//!
//! A [`Server`] is configured with a bind address and upstream
//! forwarders, and is then started with a list of zone files. Starting
//! loads each zone, starts its [watcher](crate::watcher), and builds a
//! [`Router`]:
//!
//! * over UDP, a query is answered from the zone whose origin most
//!   closely encloses its QNAME;
//! * over TCP, the same zone serves AXFR/IXFR, and queries outside
//!   every zone are passed to the forwarders (if any).
//!
//! Queries that match no route get SERVFAIL.

use std::collections::HashMap;
use std::fmt;
use std::io;
use std::mem;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use log::{debug, error, info, warn};

use crate::forward::{AddForwarderError, ForwarderChain};
use crate::io::{TokioIoProvider, TokioShutdownController};
use crate::message::constants::{MAX_TCP_MESSAGE_SIZE, MAX_UDP_MESSAGE_SIZE};
use crate::message::{writer, Question, Rcode, Reader, Writer};
use crate::name::Name;
use crate::rr::Record;
use crate::watcher;
use crate::zone::Zone;

mod router;

pub use router::{Handler, RouteTable, Router};

////////////////////////////////////////////////////////////////////////
// SERVER SETUP                                                       //
////////////////////////////////////////////////////////////////////////

/// A DNS server serving zones loaded from zone files and forwarding
/// other queries upstream.
pub struct Server {
    addr: SocketAddr,
    forwarders: ForwarderChain,
    zones: HashMap<Name, Arc<Zone>>,
}

impl Server {
    /// Creates a new `Server` that will listen on `addr` over both UDP
    /// and TCP.
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            forwarders: ForwarderChain::new(),
            zones: HashMap::new(),
        }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Adds an upstream server to the end of the forwarder chain.
    pub fn add_forward_server(
        &mut self,
        host: &str,
        transport: &str,
        port: u16,
    ) -> Result<(), AddForwarderError> {
        self.forwarders.add(host, transport, port)?;
        debug!("Added forwarder {host}/{transport} port {port}.");
        Ok(())
    }

    pub fn forwarders(&self) -> &ForwarderChain {
        &self.forwarders
    }

    /// Returns the zones loaded by [`Server::start`].
    pub fn zones(&self) -> impl Iterator<Item = &Arc<Zone>> {
        self.zones.values()
    }

    /// Loads the zone files, binds the listeners and starts serving.
    /// Must be called within a Tokio runtime.
    ///
    /// A zone file that cannot be loaded is logged and skipped. An
    /// error is returned only if the listeners cannot be bound.
    pub async fn start<I>(&mut self, zone_files: I) -> io::Result<Running>
    where
        I: IntoIterator,
        I::Item: Into<PathBuf>,
    {
        for path in zone_files {
            let path = path.into();
            let zone = match Zone::load(&path) {
                Ok(zone) => Arc::new(zone),
                Err(e) => {
                    error!("Skipping zone file {}: {e}", path.display());
                    continue;
                }
            };
            if let Some(replaced) = self.zones.insert(zone.origin().clone(), zone.clone()) {
                warn!(
                    "Zone {} from {} replaces the one from {}.",
                    zone.origin(),
                    zone.path().display(),
                    replaced.path().display()
                );
            }
        }

        let provider = TokioIoProvider::bind(self.addr).await?;
        let (udp_addr, tcp_addr) = (provider.udp_local_addr()?, provider.tcp_local_addr()?);
        let router = Arc::new(self.build_router());
        let watchers = self.zones.values().cloned().map(watcher::spawn).collect();
        info!(
            "Serving {} zones on {} (UDP) and {} (TCP).",
            self.zones.len(),
            udp_addr,
            tcp_addr
        );
        Ok(Running {
            controller: provider.start(&router),
            udp_addr,
            tcp_addr,
            watchers,
        })
    }

    fn build_router(&self) -> Router {
        let mut router = Router::default();
        for (origin, zone) in &self.zones {
            router
                .udp
                .insert(origin.clone(), Handler::Answer(zone.clone()));
            router
                .tcp
                .insert(origin.clone(), Handler::Transfer(zone.clone()));
        }
        if !self.forwarders.is_empty() {
            router
                .tcp
                .set_wildcard(Handler::Forward(Arc::new(self.forwarders.clone())));
        }
        router
    }
}

/// A started [`Server`].
#[must_use]
pub struct Running {
    controller: TokioShutdownController,
    udp_addr: SocketAddr,
    tcp_addr: SocketAddr,
    watchers: Vec<tokio::task::JoinHandle<()>>,
}

impl Running {
    pub fn udp_addr(&self) -> SocketAddr {
        self.udp_addr
    }

    pub fn tcp_addr(&self) -> SocketAddr {
        self.tcp_addr
    }

    /// Waits until a listener fails, returning its error. Listeners do
    /// not stop on their own otherwise, so this only returns `Ok` once
    /// they have all been shut down.
    pub async fn wait(&mut self) -> io::Result<()> {
        match self.controller.failure().await {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Stops the listeners and zone watchers, waiting for in-flight
    /// messages to be handled.
    pub async fn shut_down(self) {
        for watcher in &self.watchers {
            watcher.abort();
        }
        self.controller.shut_down().await;
    }
}

////////////////////////////////////////////////////////////////////////
// MESSAGE HANDLING                                                   //
////////////////////////////////////////////////////////////////////////

/// The transport over which a message was received.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Transport {
    Udp,
    Tcp,
}

impl Transport {
    /// The largest response that may be sent over the transport.
    fn message_size_limit(self) -> usize {
        match self {
            Self::Udp => MAX_UDP_MESSAGE_SIZE,
            Self::Tcp => MAX_TCP_MESSAGE_SIZE,
        }
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Udp => f.write_str("UDP"),
            Self::Tcp => f.write_str("TCP"),
        }
    }
}

/// The response to a received message.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Response {
    /// Nothing is sent.
    None,

    /// A single message.
    Single(Vec<u8>),

    /// A sequence of messages, as for zone transfers over TCP.
    Stream(Vec<Vec<u8>>),
}

impl Router {
    /// Handles a received DNS message. This is the API through which
    /// the I/O provider submits messages.
    pub async fn handle_message(&self, received: &[u8], transport: Transport) -> Response {
        let mut reader = match Reader::try_from(received) {
            Ok(reader) => reader,
            Err(_) => return Response::None,
        };

        // Never respond to a response.
        if reader.qr() {
            return Response::None;
        }

        let question = match reader.qdcount() {
            0 => return error_response(&reader, None, Rcode::FormErr),
            1 => match reader.read_question() {
                Ok(question) => question,
                Err(_) => return error_response(&reader, None, Rcode::FormErr),
            },
            _ => return Response::None,
        };

        match self.table(transport).route(&question.qname) {
            Some(Handler::Answer(zone)) => answer(&reader, &question, zone, transport),
            Some(Handler::Transfer(zone)) => transfer(&reader, &question, zone),
            Some(Handler::Forward(chain)) => match chain.lookup(received).await {
                Some(response) => Response::Single(response),
                None => Response::None,
            },
            None => {
                debug!("No route for {question} over {transport}.");
                error_response(&reader, Some(&question), Rcode::ServFail)
            }
        }
    }
}

/// Starts a response to the query in `reader`, copying its ID, opcode
/// and RD bit.
fn start_response(reader: &Reader, question: Option<&Question>, limit: usize) -> Writer {
    let mut writer = Writer::new(limit);
    writer.set_id(reader.id());
    writer.set_qr(true);
    writer.set_opcode(reader.opcode());
    writer.set_rd(reader.rd());
    if let Some(question) = question {
        // A question always fits in MAX_UDP_MESSAGE_SIZE.
        let _ = writer.add_question(question);
    }
    writer
}

fn error_response(reader: &Reader, question: Option<&Question>, rcode: Rcode) -> Response {
    let mut writer = start_response(reader, question, MAX_UDP_MESSAGE_SIZE);
    writer.set_rcode(rcode);
    Response::Single(writer.finish())
}

/// Answers a query from a zone's records. A response that does not
/// fit is replaced by an empty one with TC set.
fn answer(reader: &Reader, question: &Question, zone: &Zone, transport: Transport) -> Response {
    let limit = transport.message_size_limit();
    let mut writer = start_response(reader, Some(question), limit);
    writer.set_aa(true);

    for record in zone.answer(question.qtype, &question.qname) {
        match writer.add_answer(&record) {
            Ok(()) => (),
            Err(writer::Error::Truncation) => {
                let mut truncated = start_response(reader, Some(question), limit);
                truncated.set_aa(true);
                truncated.set_tc(true);
                return Response::Single(truncated.finish());
            }
            Err(e) => warn!("Zone {}: cannot send {record}: {e}", zone.origin()),
        }
    }
    Response::Single(writer.finish())
}

/// Serves a zone transfer: every record of the zone, then the SOA
/// records of the QNAME, each group in as many messages as needed.
fn transfer(reader: &Reader, question: &Question, zone: &Zone) -> Response {
    let transfer = match zone.transfer(question.qtype, &question.qname) {
        Ok(transfer) => transfer,
        Err(e) => {
            info!("Zone {}: not responding to {question}: {e}.", zone.origin());
            return Response::None;
        }
    };

    let mut messages = Vec::new();
    for group in [&transfer.records, &transfer.soa] {
        write_transfer_group(reader, question, zone, group, &mut messages);
    }
    debug!(
        "Zone {}: transferred {} records in {} messages.",
        zone.origin(),
        transfer.records.len() + transfer.soa.len(),
        messages.len()
    );
    Response::Stream(messages)
}

fn write_transfer_group(
    reader: &Reader,
    question: &Question,
    zone: &Zone,
    records: &[Record],
    messages: &mut Vec<Vec<u8>>,
) {
    let new_message = || {
        let mut writer = start_response(reader, Some(question), MAX_TCP_MESSAGE_SIZE);
        writer.set_aa(true);
        writer
    };

    let mut writer = new_message();
    for record in records {
        let mut res = writer.add_answer(record);
        if res == Err(writer::Error::Truncation) && writer.ancount() > 0 {
            messages.push(mem::replace(&mut writer, new_message()).finish());
            res = writer.add_answer(record);
        }
        if let Err(e) = res {
            warn!("Zone {}: cannot transfer {record}: {e}", zone.origin());
        }
    }
    messages.push(writer.finish());
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpStream, UdpSocket};

    use super::*;
    use crate::class::Class;
    use crate::message::Qtype;
    use crate::rr::{Rdata, Type};

    const ZONE: &str = "$ORIGIN example.test.\n\
                        $TTL 3600\n\
                        @ IN SOA ns1 hostmaster 42 7200 900 1209600 300\n\
                        @ IN NS ns1\n\
                        ns1 IN A 192.0.2.1\n\
                        www IN A 192.0.2.80\n\
                        www IN A 192.0.2.81\n";

    fn load_zone(dir: &TempDir, name: &str, text: &str) -> Arc<Zone> {
        let path = dir.path().join(name);
        fs::write(&path, text).unwrap();
        Arc::new(Zone::load(path).unwrap())
    }

    fn query(id: u16, qname: &str, qtype: Qtype) -> Vec<u8> {
        let mut writer = Writer::new(MAX_UDP_MESSAGE_SIZE);
        writer.set_id(id);
        writer.set_rd(true);
        writer
            .add_question(&Question {
                qname: qname.parse().unwrap(),
                qtype,
                qclass: Class::IN.into(),
            })
            .unwrap();
        writer.finish()
    }

    fn router(zone: &Arc<Zone>) -> Router {
        let mut router = Router::default();
        router
            .udp
            .insert(zone.origin().clone(), Handler::Answer(zone.clone()));
        router
            .tcp
            .insert(zone.origin().clone(), Handler::Transfer(zone.clone()));
        router
    }

    fn single(response: Response) -> Vec<u8> {
        match response {
            Response::Single(message) => message,
            other => panic!("expected a single message, got {other:?}"),
        }
    }

    fn answers(message: &[u8]) -> Vec<Record> {
        let mut reader = Reader::try_from(message).unwrap();
        for _ in 0..reader.qdcount() {
            reader.read_question().unwrap();
        }
        (0..reader.ancount()).map(|_| reader.read_rr().unwrap()).collect()
    }

    #[tokio::test]
    async fn answers_from_the_zone() {
        let dir = TempDir::new().unwrap();
        let router = router(&load_zone(&dir, "example.zone", ZONE));

        let message = single(
            router
                .handle_message(&query(7, "www.example.test.", Type::A.into()), Transport::Udp)
                .await,
        );
        let reader = Reader::try_from(message.as_slice()).unwrap();
        assert_eq!(reader.id(), 7);
        assert!(reader.qr() && reader.aa() && reader.rd() && !reader.tc());
        assert_eq!(reader.rcode(), Rcode::NoError);
        assert_eq!(reader.qdcount(), 1);
        let records = answers(&message);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].rdata, Rdata::A([192, 0, 2, 80].into()));
        assert_eq!(records[1].rdata, Rdata::A([192, 0, 2, 81].into()));

        // No NXDOMAIN: a missing name gets an empty NOERROR answer.
        let message = single(
            router
                .handle_message(&query(8, "nope.example.test.", Type::A.into()), Transport::Udp)
                .await,
        );
        let reader = Reader::try_from(message.as_slice()).unwrap();
        assert_eq!(reader.rcode(), Rcode::NoError);
        assert!(reader.aa());
        assert_eq!(reader.ancount(), 0);
    }

    #[tokio::test]
    async fn oversized_udp_answer_is_truncated() {
        let mut text = String::from(ZONE);
        for i in 0..40 {
            text.push_str(&format!("big IN A 198.51.100.{i}\n"));
        }
        let dir = TempDir::new().unwrap();
        let router = router(&load_zone(&dir, "example.zone", &text));
        let message = single(
            router
                .handle_message(&query(9, "big.example.test.", Type::A.into()), Transport::Udp)
                .await,
        );
        let reader = Reader::try_from(message.as_slice()).unwrap();
        assert!(reader.tc());
        assert_eq!(reader.qdcount(), 1);
        assert_eq!(reader.ancount(), 0);
    }

    #[tokio::test]
    async fn malformed_messages_are_dropped_or_rejected() {
        let dir = TempDir::new().unwrap();
        let router = router(&load_zone(&dir, "example.zone", ZONE));
        let good = query(10, "www.example.test.", Type::A.into());

        // Too short.
        assert_eq!(router.handle_message(&good[..11], Transport::Udp).await, Response::None);

        // A response.
        let mut response = good.clone();
        response[2] |= 0x80;
        assert_eq!(router.handle_message(&response, Transport::Udp).await, Response::None);

        // Two questions.
        let mut two = good.clone();
        two[5] = 2;
        assert_eq!(router.handle_message(&two, Transport::Udp).await, Response::None);

        // No question.
        let mut empty = good[..12].to_vec();
        empty[5] = 0;
        let message = single(router.handle_message(&empty, Transport::Udp).await);
        assert_eq!(Reader::try_from(message.as_slice()).unwrap().rcode(), Rcode::FormErr);

        // An unreadable question.
        let message = single(router.handle_message(&good[..good.len() - 2], Transport::Udp).await);
        let reader = Reader::try_from(message.as_slice()).unwrap();
        assert_eq!(reader.rcode(), Rcode::FormErr);
        assert_eq!(reader.id(), 10);
    }

    #[tokio::test]
    async fn unrouted_queries_get_servfail() {
        let dir = TempDir::new().unwrap();
        let router = router(&load_zone(&dir, "example.zone", ZONE));
        let message = single(
            router
                .handle_message(&query(11, "www.example.org.", Type::A.into()), Transport::Udp)
                .await,
        );
        let reader = Reader::try_from(message.as_slice()).unwrap();
        assert_eq!(reader.rcode(), Rcode::ServFail);
        assert_eq!(reader.qdcount(), 1);
    }

    #[tokio::test]
    async fn transfers_zone_then_soa() {
        let dir = TempDir::new().unwrap();
        let router = router(&load_zone(&dir, "example.zone", ZONE));
        let messages = match router
            .handle_message(&query(12, "example.test.", Qtype::AXFR), Transport::Tcp)
            .await
        {
            Response::Stream(messages) => messages,
            other => panic!("expected a stream, got {other:?}"),
        };
        assert_eq!(messages.len(), 2);
        let first = answers(&messages[0]);
        assert_eq!(first.len(), 5);
        assert_eq!(first[0].rr_type, Type::SOA);
        let second = answers(&messages[1]);
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].soa_serial(), Some(42));
        for message in &messages {
            let reader = Reader::try_from(message.as_slice()).unwrap();
            assert!(reader.qr() && reader.aa());
            assert_eq!(reader.qdcount(), 1);
            assert_eq!(reader.id(), 12);
        }

        // A non-transfer query on the zone's TCP route gets nothing.
        assert_eq!(
            router
                .handle_message(&query(13, "www.example.test.", Type::A.into()), Transport::Tcp)
                .await,
            Response::None
        );
    }

    #[tokio::test]
    async fn large_transfers_are_split() {
        let mut text = String::from(ZONE);
        for i in 0..2000 {
            text.push_str(&format!("host{i} IN TXT \"{}\"\n", "x".repeat(60)));
        }
        let dir = TempDir::new().unwrap();
        let router = router(&load_zone(&dir, "example.zone", &text));
        let messages = match router
            .handle_message(&query(14, "example.test.", Qtype::AXFR), Transport::Tcp)
            .await
        {
            Response::Stream(messages) => messages,
            other => panic!("expected a stream, got {other:?}"),
        };
        assert!(messages.len() > 2);
        assert!(messages.iter().all(|m| m.len() <= MAX_TCP_MESSAGE_SIZE));
        let total: usize = messages.iter().map(|m| answers(m).len()).sum();
        assert_eq!(total, 2005 + 1);
    }

    #[tokio::test]
    async fn serves_over_udp_and_tcp() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("example.zone");
        fs::write(&path, ZONE).unwrap();
        let missing = dir.path().join("missing.zone");

        let mut server = Server::new("127.0.0.1:0".parse().unwrap());
        let running = server.start([path, missing]).await.unwrap();
        assert_eq!(server.zones().count(), 1);

        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        socket
            .send_to(&query(20, "www.example.test.", Type::A.into()), running.udp_addr())
            .await
            .unwrap();
        let mut buf = vec![0; MAX_UDP_MESSAGE_SIZE];
        let (len, _) = socket.recv_from(&mut buf).await.unwrap();
        assert_eq!(answers(&buf[..len]).len(), 2);

        let mut stream = TcpStream::connect(running.tcp_addr()).await.unwrap();
        let axfr = query(21, "example.test.", Qtype::AXFR);
        stream.write_u16(axfr.len() as u16).await.unwrap();
        stream.write_all(&axfr).await.unwrap();
        let mut total = 0;
        for _ in 0..2 {
            let len = stream.read_u16().await.unwrap();
            let mut message = vec![0; len as usize];
            stream.read_exact(&mut message).await.unwrap();
            total += answers(&message).len();
        }
        assert_eq!(total, 6);

        drop(stream);
        running.shut_down().await;
    }

    #[tokio::test]
    async fn failed_bind_leaves_no_watchers() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("example.zone");
        fs::write(&path, ZONE).unwrap();
        let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();

        let mut server = Server::new(taken.local_addr().unwrap());
        assert!(server.start([path]).await.is_err());
        let zone = server.zones().next().unwrap();
        assert_eq!(Arc::strong_count(zone), 1);
    }
}
