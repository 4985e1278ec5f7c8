// Copyright 2023 Matthew Ingwersen.
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

//! Implementation of the Tokio I/O provider.

// NOTE: In this provider, I/O error handling is generally to exit the
// task. The run_supervised function reports a listener task that exits
// with an error or a panic through the failure channel of the
// TokioShutdownController, since a server without one of its listeners
// cannot do its job.

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use log::{debug, error};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream, UdpSocket};
use tokio::sync::{broadcast, mpsc};
use tokio::time::timeout;

use crate::message::constants::{MAX_TCP_MESSAGE_SIZE, MAX_UDP_MESSAGE_SIZE};
use crate::server::{Response, Router, Transport};

/// A Tokio I/O provider.
///
/// This provider uses asynchronous I/O and serves a [`Router`] by
/// spawning tasks on a Tokio runtime: one accepting TCP connections,
/// one receiving UDP messages, and one for each TCP connection and
/// received UDP message.
///
/// The `TokioIoProvider` supports graceful shutdown. To initiate a
/// graceful shutdown, use the [`TokioShutdownController`] returned by
/// [`TokioIoProvider::start`].
pub struct TokioIoProvider {
    tcp_listener: TcpListener,
    udp_socket: UdpSocket,
}

impl TokioIoProvider {
    /// Creates a new `TokioIoProvider`. This call binds a TCP listener
    /// and a UDP socket on `addr` in preparation, but does not start
    /// the server. This function requires that the Tokio runtime be
    /// active.
    pub async fn bind(addr: SocketAddr) -> io::Result<Self> {
        let tcp_listener = TcpListener::bind(addr).await?;
        let udp_socket = UdpSocket::bind(addr).await?;
        Ok(Self {
            tcp_listener,
            udp_socket,
        })
    }

    pub fn tcp_local_addr(&self) -> io::Result<SocketAddr> {
        self.tcp_listener.local_addr()
    }

    pub fn udp_local_addr(&self) -> io::Result<SocketAddr> {
        self.udp_socket.local_addr()
    }

    /// Starts the server on the active Tokio runtime.
    ///
    /// This spawns tasks on the active Tokio runtime and then returns
    /// a [`TokioShutdownController`] that can be used to shut down the
    /// tasks at a later time. (The [`TokioShutdownController`] must be
    /// held as long as the server should be running, since dropping it
    /// will trigger shutdown.)
    pub fn start(self, router: &Arc<Router>) -> TokioShutdownController {
        let (shutdown_controller, shutdown_handle, failure_sender) = make_shutdown_channels();

        tokio::spawn(run_supervised(
            run_tcp_listener,
            shutdown_handle.clone(),
            failure_sender.clone(),
            router.clone(),
            self.tcp_listener,
        ));
        tokio::spawn(run_supervised(
            run_udp_receiver,
            shutdown_handle,
            failure_sender,
            router.clone(),
            Arc::new(self.udp_socket),
        ));

        shutdown_controller
    }
}

/// Runs a listener task, reporting it through `failures` if it returns
/// an I/O error, is cancelled, or panics.
async fn run_supervised<F, G, S>(
    f: F,
    shutdown: ShutdownHandle,
    failures: mpsc::Sender<io::Error>,
    router: Arc<Router>,
    socket: S,
) where
    F: FnOnce(ShutdownHandle, Arc<Router>, S) -> G,
    G: Future<Output = io::Result<()>> + Send + 'static,
{
    let error = match tokio::spawn(f(shutdown, router, socket)).await {
        Ok(Ok(())) => return,
        Ok(Err(e)) => e,
        Err(e) => io::Error::new(io::ErrorKind::Other, format!("listener task failed: {e}")),
    };
    log_io_error(&error);
    // Nobody is listening if the controller is gone.
    let _ = failures.send(error).await;
}

/// The TCP listener/accept loop.
async fn run_tcp_listener(
    mut shutdown: ShutdownHandle,
    router: Arc<Router>,
    listener: TcpListener,
) -> io::Result<()> {
    loop {
        let (client, client_socket_addr) = tokio::select! {
            _ = shutdown.request_receiver.recv() => return Ok(()),
            res = listener.accept() => res?,
        };
        debug!("Accepted TCP connection from {client_socket_addr}.");
        let shutdown = shutdown.clone();
        let router = router.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_tcp_connection(shutdown, &router, client).await {
                log_io_error(&e);
            }
        });
    }
}

/// Handles a TCP connection.
async fn handle_tcp_connection(
    mut shutdown: ShutdownHandle,
    router: &Router,
    mut socket: TcpStream,
) -> io::Result<()> {
    let mut received_buf = vec![0; 2 + MAX_TCP_MESSAGE_SIZE];
    let mut n_read = 0;

    loop {
        let received_len = match timeout(
            super::READ_MESSAGE_TIMEOUT,
            read_message_over_tcp(&mut socket, &mut received_buf, &mut n_read),
        )
        .await
        {
            Ok(Ok(Some(len))) => len,
            Ok(Ok(None)) => return Ok(()), // The connection was closed.
            Ok(Err(e)) => return Err(e),   // There was an I/O error.
            Err(_) => return Ok(()),       // The operation timed out.
        };

        // Process the DNS message and write the response(s), if any.
        match router
            .handle_message(&received_buf[2..received_len + 2], Transport::Tcp)
            .await
        {
            Response::Single(message) => write_message_over_tcp(&mut socket, &message).await?,
            Response::Stream(messages) => {
                for message in messages {
                    write_message_over_tcp(&mut socket, &message).await?;
                }
            }

            // Response::None occurs when the message was malformed or
            // could not be answered, so close the connection.
            Response::None => return Ok(()),
        }

        // We won't continue to service this connection if we are
        // shutting down.
        if matches!(
            shutdown.request_receiver.try_recv(),
            Err(broadcast::error::TryRecvError::Closed)
        ) {
            return Ok(());
        }

        // Any leftover data is the start of the next message.
        if n_read > received_len + 2 {
            received_buf.copy_within(received_len + 2..n_read, 0);
            n_read -= received_len + 2;
        } else {
            n_read = 0;
        }
    }
}

/// Reads a single DNS message (including the initial two-octet length
/// field) from a [`TcpStream`].
///
/// This function assumes that `*n_read` octets have already been read
/// into the buffer. It updates `*n_read` as it reads more data. It may
/// read data past the end of the message. When this function returns,
/// `*n_read` reflects the number of octets read into the buffer
/// (including the initial two-octet length field and any data read
/// after the end of the message), while the returned `usize` (if any)
/// is the size of the message itself (not including the initial length
/// field).
///
/// If this function returns `Ok(None)`, then the connection was closed
/// before a whole message could be read.
async fn read_message_over_tcp(
    socket: &mut TcpStream,
    buf: &mut [u8],
    n_read: &mut usize,
) -> io::Result<Option<usize>> {
    let mut received_len_opt = None;
    loop {
        // There may already be data in the buffer, left over from the
        // previous message.
        if let Some(received_len) = received_len_opt {
            if *n_read >= received_len + 2 {
                return Ok(Some(received_len));
            }
        } else if *n_read >= 2 {
            // We've got the first two octets, so we now know the
            // message length.
            let received_len = u16::from_be_bytes([buf[0], buf[1]]) as usize;
            if *n_read >= received_len + 2 {
                return Ok(Some(received_len));
            } else {
                received_len_opt = Some(received_len);
            }
        }

        // Do the next read.
        let n_read_this_time = socket.read(&mut buf[*n_read..]).await?;

        // If we read nothing, then the client closed their side of
        // the connection.
        if n_read_this_time == 0 {
            return Ok(None);
        }

        // Prepare for the next iteration.
        *n_read += n_read_this_time;
    }
}

/// Writes a DNS message to a [`TcpStream`], preceded by its two-octet
/// length field.
async fn write_message_over_tcp(socket: &mut TcpStream, message: &[u8]) -> io::Result<()> {
    let len = u16::try_from(message.len())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "message too long for TCP"))?;
    let mut framed = Vec::with_capacity(2 + message.len());
    framed.extend_from_slice(&len.to_be_bytes());
    framed.extend_from_slice(message);
    socket.write_all(&framed).await
}

/// The UDP receiver loop.
async fn run_udp_receiver(
    mut shutdown: ShutdownHandle,
    router: Arc<Router>,
    socket: Arc<UdpSocket>,
) -> io::Result<()> {
    loop {
        let mut received_buf = vec![0; MAX_UDP_MESSAGE_SIZE];

        // Receive a DNS message (or a shutdown request).
        let (received_len, src) = tokio::select! {
            _ = shutdown.request_receiver.recv() => return Ok(()),
            res = socket.recv_from(&mut received_buf) => res?,
        };

        // In a new Tokio task, process the DNS message and send the
        // response (if any).
        let shutdown = shutdown.wait_sender.clone();
        let router = router.clone();
        let socket = socket.clone();
        tokio::spawn(async move {
            match router
                .handle_message(&received_buf[0..received_len], Transport::Udp)
                .await
            {
                Response::Single(message) => {
                    if let Err(e) = socket.send_to(&message, src).await {
                        log_io_error(&e);
                    }
                }
                Response::Stream(messages) => {
                    for message in messages {
                        if let Err(e) = socket.send_to(&message, src).await {
                            log_io_error(&e);
                            break;
                        }
                    }
                }
                Response::None => (),
            }

            // This ensures that the shutdown handle is moved into the
            // new task.
            drop(shutdown);
        });
    }
}

/// Controls the shutdown of a server's Tokio tasks, and reports the
/// failure of its listeners.
///
/// This type is used to shut down the Tokio tasks spawned by
/// [`TokioIoProvider::start`]. Use
/// [`TokioShutdownController::shut_down`] to initiate shutdown and wait
/// for its completion. Dropping the controller will also trigger
/// shutdown (but will not wait for it to complete).
#[must_use]
pub struct TokioShutdownController {
    request_sender: broadcast::Sender<()>,
    wait_receiver: mpsc::Receiver<()>,
    failure_receiver: mpsc::Receiver<io::Error>,
}

impl TokioShutdownController {
    /// Waits for a listener to fail and returns its error. Returns
    /// `None` once every listener has exited without failing, which
    /// happens only after shutdown.
    pub async fn failure(&mut self) -> Option<io::Error> {
        self.failure_receiver.recv().await
    }

    /// Requests that running server tasks shut down, and then waits for
    /// them to terminate.
    pub async fn shut_down(mut self) {
        drop(self.request_sender);
        let _ = self.wait_receiver.recv().await;
    }
}

/// A handle held by tasks to interact with the graceful shutdown
/// mechanism.
///
/// This type has two roles:
///
/// 1. It enables tasks to listen for graceful shutdown signals. This
///    is done by waiting for all senders attached to `request_receiver`
///    to close.
/// 2. It prevents graceful shutdown from completing until it is
///    dropped. This is done by holding `wait_sender`. All server tasks
///    therefore own a `ShutdownHandle` (or at least the `wait_sender`
///    component).
struct ShutdownHandle {
    request_receiver: broadcast::Receiver<()>,
    wait_sender: mpsc::Sender<()>,
}

impl Clone for ShutdownHandle {
    fn clone(&self) -> Self {
        // A resubscribed receiver misses values already queued, but
        // the shutdown signal is all senders being dropped rather than
        // a value.
        ShutdownHandle {
            request_receiver: self.request_receiver.resubscribe(),
            wait_sender: self.wait_sender.clone(),
        }
    }
}

/// Produces a [`TokioShutdownController`], an initial
/// [`ShutdownHandle`] connected to it, and the sender on which listener
/// failures are reported to it.
fn make_shutdown_channels() -> (
    TokioShutdownController,
    ShutdownHandle,
    mpsc::Sender<io::Error>,
) {
    let (request_sender, request_receiver) = broadcast::channel(1);
    let (wait_sender, wait_receiver) = mpsc::channel(1);
    let (failure_sender, failure_receiver) = mpsc::channel(2);
    let controller = TokioShutdownController {
        request_sender,
        wait_receiver,
        failure_receiver,
    };
    let handle = ShutdownHandle {
        request_receiver,
        wait_sender,
    };
    (controller, handle, failure_sender)
}

/// Logs an I/O error.
fn log_io_error(e: &io::Error) {
    error!("I/O error: {e}");
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////
