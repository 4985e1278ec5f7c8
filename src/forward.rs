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

//! Forwarding of queries to upstream DNS servers.
//!
//! A [`ForwarderChain`] is an ordered list of upstream servers
//! ([`ForwardResolver`]s). [`ForwarderChain::lookup`] tries them in
//! order and returns the first response received.

use std::fmt;
use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use log::{debug, warn};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, UdpSocket};
use tokio::time::timeout;

use crate::message::constants::MAX_TCP_MESSAGE_SIZE;

/// How long to wait for each send to and each receive from an upstream
/// server.
pub const FORWARD_TIMEOUT: Duration = Duration::from_secs(5);

////////////////////////////////////////////////////////////////////////
// UPSTREAM SERVERS                                                   //
////////////////////////////////////////////////////////////////////////

/// The transport used to reach an upstream server.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Transport {
    Udp,
    Tcp,
}

impl FromStr for Transport {
    type Err = AddForwarderError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        match text {
            "udp" => Ok(Self::Udp),
            "tcp" => Ok(Self::Tcp),
            _ => Err(AddForwarderError::InvalidTransport),
        }
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Udp => f.write_str("udp"),
            Self::Tcp => f.write_str("tcp"),
        }
    }
}

/// An upstream server to which queries are forwarded.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ForwardResolver {
    pub addr: SocketAddr,
    pub transport: Transport,
}

impl ForwardResolver {
    /// Sends `query` to the upstream server and returns its response.
    /// The response must carry the query's ID.
    pub async fn exchange(&self, query: &[u8]) -> Result<Vec<u8>, ForwardError> {
        if query.len() < 2 {
            return Err(ForwardError::QueryTooShort);
        }
        let response = match self.transport {
            Transport::Udp => self.exchange_udp(query).await?,
            Transport::Tcp => self.exchange_tcp(query).await?,
        };
        if response.get(0..2) == Some(&query[0..2]) {
            Ok(response)
        } else {
            Err(ForwardError::IdMismatch)
        }
    }

    async fn exchange_udp(&self, query: &[u8]) -> Result<Vec<u8>, ForwardError> {
        let local_addr: SocketAddr = match self.addr {
            SocketAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, 0).into(),
            SocketAddr::V6(_) => (Ipv6Addr::UNSPECIFIED, 0).into(),
        };
        let socket = UdpSocket::bind(local_addr).await?;
        socket.connect(self.addr).await?;
        timeout(FORWARD_TIMEOUT, socket.send(query))
            .await
            .map_err(|_| ForwardError::Timeout)??;

        let mut buf = vec![0; MAX_TCP_MESSAGE_SIZE];
        let len = timeout(FORWARD_TIMEOUT, socket.recv(&mut buf))
            .await
            .map_err(|_| ForwardError::Timeout)??;
        buf.truncate(len);
        Ok(buf)
    }

    async fn exchange_tcp(&self, query: &[u8]) -> Result<Vec<u8>, ForwardError> {
        let len = u16::try_from(query.len()).or(Err(ForwardError::QueryTooLong))?;
        let mut framed = Vec::with_capacity(2 + query.len());
        framed.extend_from_slice(&len.to_be_bytes());
        framed.extend_from_slice(query);

        let mut stream = timeout(FORWARD_TIMEOUT, async {
            let mut stream = TcpStream::connect(self.addr).await?;
            stream.write_all(&framed).await?;
            Ok::<_, io::Error>(stream)
        })
        .await
        .map_err(|_| ForwardError::Timeout)??;

        timeout(FORWARD_TIMEOUT, async {
            let len = stream.read_u16().await? as usize;
            let mut buf = vec![0; len];
            stream.read_exact(&mut buf).await?;
            Ok::<_, io::Error>(buf)
        })
        .await
        .map_err(|_| ForwardError::Timeout)?
        .map_err(Into::into)
    }
}

impl fmt::Display for ForwardResolver {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}/{}", self.addr, self.transport)
    }
}

////////////////////////////////////////////////////////////////////////
// THE CHAIN                                                          //
////////////////////////////////////////////////////////////////////////

/// An ordered list of upstream servers. Earlier servers are preferred.
#[derive(Clone, Debug, Default)]
pub struct ForwarderChain {
    resolvers: Vec<ForwardResolver>,
}

impl ForwarderChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an upstream server. `host` must be an IP address and
    /// `transport` must be `udp` or `tcp`; otherwise the chain is left
    /// unchanged.
    pub fn add(&mut self, host: &str, transport: &str, port: u16) -> Result<(), AddForwarderError> {
        let ip: IpAddr = host.parse().or(Err(AddForwarderError::InvalidIp))?;
        let transport = transport.parse()?;
        self.resolvers.push(ForwardResolver {
            addr: SocketAddr::new(ip, port),
            transport,
        });
        Ok(())
    }

    pub fn resolvers(&self) -> &[ForwardResolver] {
        &self.resolvers
    }

    pub fn is_empty(&self) -> bool {
        self.resolvers.is_empty()
    }

    /// Forwards `query` to each upstream server in turn, returning the
    /// first response. Failures are logged. Returns `None` if every
    /// server fails.
    pub async fn lookup(&self, query: &[u8]) -> Option<Vec<u8>> {
        for resolver in &self.resolvers {
            match resolver.exchange(query).await {
                Ok(response) => {
                    debug!("Forwarder {resolver} answered.");
                    return Some(response);
                }
                Err(e) => warn!("Forwarder {resolver} failed: {e}"),
            }
        }
        None
    }
}

////////////////////////////////////////////////////////////////////////
// ERRORS                                                             //
////////////////////////////////////////////////////////////////////////

/// An error signaling that an upstream server could not be added to a
/// [`ForwarderChain`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AddForwarderError {
    InvalidIp,
    InvalidTransport,
}

impl fmt::Display for AddForwarderError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::InvalidIp => f.write_str("forwarder host is not an IP address"),
            Self::InvalidTransport => f.write_str("forwarder transport must be udp or tcp"),
        }
    }
}

impl std::error::Error for AddForwarderError {}

/// An error signaling that a query could not be forwarded to an
/// upstream server.
#[derive(Debug)]
pub enum ForwardError {
    Io(io::Error),
    Timeout,
    IdMismatch,
    QueryTooShort,
    QueryTooLong,
}

impl From<io::Error> for ForwardError {
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}

impl fmt::Display for ForwardError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "I/O error: {err}"),
            Self::Timeout => f.write_str("timed out"),
            Self::IdMismatch => f.write_str("response ID does not match the query"),
            Self::QueryTooShort => f.write_str("query is too short"),
            Self::QueryTooLong => f.write_str("query is too long"),
        }
    }
}

impl std::error::Error for ForwardError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use std::sync::{Mutex, Once};

    use lazy_static::lazy_static;
    use log::{Level, Log, Metadata};
    use tokio::net::TcpListener;

    use super::*;

    lazy_static! {
        static ref WARNINGS: Mutex<Vec<String>> = Mutex::new(Vec::new());
    }

    /// Records every warning logged while the tests run.
    struct WarningRecorder;

    impl Log for WarningRecorder {
        fn enabled(&self, metadata: &Metadata) -> bool {
            metadata.level() <= Level::Warn
        }

        fn log(&self, record: &log::Record) {
            if record.level() == Level::Warn {
                WARNINGS.lock().unwrap().push(record.args().to_string());
            }
        }

        fn flush(&self) {}
    }

    static RECORDER: WarningRecorder = WarningRecorder;
    static INSTALL_RECORDER: Once = Once::new();

    fn record_warnings() {
        INSTALL_RECORDER.call_once(|| {
            log::set_logger(&RECORDER).unwrap();
            log::set_max_level(log::LevelFilter::Warn);
        });
    }

    /// Counts the recorded warnings that mention `resolver`.
    fn warnings_about(resolver: &ForwardResolver) -> usize {
        let needle = format!("Forwarder {resolver} ");
        WARNINGS
            .lock()
            .unwrap()
            .iter()
            .filter(|warning| warning.starts_with(&needle))
            .count()
    }

    const QUERY: &[u8] = b"\xab\xcd\x01\x00\x00\x01\x00\x00\x00\x00\x00\x00\
                           \x07example\x04test\x00\x00\x01\x00\x01";

    /// Starts a UDP upstream that answers every message by echoing it
    /// with QR set and the ID XORed with `id_mask`.
    async fn udp_upstream(id_mask: u16) -> SocketAddr {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = socket.local_addr().unwrap();
        tokio::spawn(async move {
            let mut buf = vec![0; 512];
            while let Ok((len, src)) = socket.recv_from(&mut buf).await {
                let mut response = buf[..len].to_vec();
                let id = u16::from_be_bytes([response[0], response[1]]) ^ id_mask;
                response[0..2].copy_from_slice(&id.to_be_bytes());
                response[2] |= 0x80;
                let _ = socket.send_to(&response, src).await;
            }
        });
        addr
    }

    /// Starts a TCP upstream that answers one message in the same way
    /// as [`udp_upstream`].
    async fn tcp_upstream() -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let len = stream.read_u16().await.unwrap();
            let mut buf = vec![0; len as usize];
            stream.read_exact(&mut buf).await.unwrap();
            buf[2] |= 0x80;
            stream.write_u16(len).await.unwrap();
            stream.write_all(&buf).await.unwrap();
        });
        addr
    }

    /// Returns an address on which nothing is listening for TCP.
    async fn closed_tcp_port() -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    }

    fn add(chain: &mut ForwarderChain, addr: SocketAddr, transport: &str) {
        chain
            .add(&addr.ip().to_string(), transport, addr.port())
            .unwrap();
    }

    #[test]
    fn add_validates_host_and_transport() {
        let mut chain = ForwarderChain::new();
        assert_eq!(chain.add("not-an-ip", "udp", 53), Err(AddForwarderError::InvalidIp));
        assert_eq!(
            chain.add("192.0.2.1", "sctp", 53),
            Err(AddForwarderError::InvalidTransport)
        );
        assert_eq!(
            chain.add("192.0.2.1", "UDP", 53),
            Err(AddForwarderError::InvalidTransport)
        );
        assert!(chain.is_empty());

        chain.add("2001:db8::1", "tcp", 5353).unwrap();
        assert_eq!(
            chain.resolvers(),
            [ForwardResolver {
                addr: "[2001:db8::1]:5353".parse().unwrap(),
                transport: Transport::Tcp,
            }]
        );
    }

    #[tokio::test]
    async fn lookup_falls_back_past_failing_upstreams() {
        let mut chain = ForwarderChain::new();
        add(&mut chain, closed_tcp_port().await, "tcp");
        add(&mut chain, udp_upstream(0xffff).await, "udp");
        add(&mut chain, udp_upstream(0).await, "udp");
        record_warnings();

        let response = chain.lookup(QUERY).await.unwrap();
        assert_eq!(&response[0..2], &QUERY[0..2]);
        assert_eq!(response[2] & 0x80, 0x80);
        assert_eq!(&response[3..], &QUERY[3..]);

        let resolvers = chain.resolvers();
        assert_eq!(warnings_about(&resolvers[0]), 1);
        assert_eq!(warnings_about(&resolvers[1]), 1);
        assert_eq!(warnings_about(&resolvers[2]), 0);
    }

    #[tokio::test]
    async fn lookup_over_tcp_works() {
        let mut chain = ForwarderChain::new();
        add(&mut chain, tcp_upstream().await, "tcp");
        let response = chain.lookup(QUERY).await.unwrap();
        assert_eq!(response.len(), QUERY.len());
        assert_eq!(&response[0..2], &QUERY[0..2]);
    }

    #[tokio::test]
    async fn lookup_gives_nothing_when_all_fail() {
        let mut chain = ForwarderChain::new();
        add(&mut chain, closed_tcp_port().await, "tcp");
        add(&mut chain, udp_upstream(0x0001).await, "udp");
        assert!(chain.lookup(QUERY).await.is_none());
        assert!(ForwarderChain::new().lookup(QUERY).await.is_none());
    }
}
