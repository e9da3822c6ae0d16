//! The relay: listener, event loop, and the submission API.
//!
//! [`Relay::bind`] starts everything the delivery side needs: the TCP
//! listener, the accept loop, and the dispatch worker pool. Each
//! accepted socket gets a reader task that drives the pure
//! per-connection state machine; the socket's write half goes into the
//! registry for dispatch.
//!
//! Shutdown follows the drain protocol: push one sentinel per worker
//! and join the pool, then stop accepting and close every remaining
//! connection. Messages already queued are delivered before the workers
//! exit.

use std::{net::SocketAddr, sync::Arc};

use async_trait::async_trait;
use pushframe_core::{
    ApplicationDirectory, Audience, Connection, ConnectionAction, Message, MessageSender,
};
use tokio::{
    io::AsyncReadExt,
    net::{TcpListener, TcpStream, tcp::OwnedReadHalf},
    sync::watch,
    task::JoinHandle,
};
use tracing::{debug, error, info, warn};

use crate::{
    dispatch::Dispatcher,
    error::ServerError,
    registry::{ConnId, ConnectionRegistry},
};

/// The running relay.
pub struct Relay {
    registry: Arc<ConnectionRegistry>,
    dispatcher: Dispatcher,
    local_addr: SocketAddr,
    shutdown: watch::Sender<bool>,
    accept_task: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl Relay {
    /// Bind the notification listener and start the event loop and the
    /// dispatch worker pool.
    ///
    /// # Errors
    ///
    /// [`ServerError::Bind`] when the listener cannot be bound.
    pub async fn bind(
        addr: SocketAddr,
        directory: Arc<dyn ApplicationDirectory>,
    ) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(addr).await.map_err(ServerError::Bind)?;
        let local_addr = listener.local_addr().map_err(ServerError::Bind)?;

        let registry = Arc::new(ConnectionRegistry::new());
        let dispatcher = Dispatcher::start(Arc::clone(&registry), Arc::clone(&directory));

        let (shutdown, shutdown_rx) = watch::channel(false);
        let accept_task =
            tokio::spawn(accept_loop(listener, Arc::clone(&registry), directory, shutdown_rx));

        info!(%local_addr, "notification relay listening");

        Ok(Self {
            registry,
            dispatcher,
            local_addr,
            shutdown,
            accept_task: std::sync::Mutex::new(Some(accept_task)),
        })
    }

    /// Address the notification listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Number of live connections (registered or not).
    pub fn connection_count(&self) -> usize {
        self.registry.len()
    }

    /// Number of connections that have completed a handshake.
    pub fn registered_count(&self) -> usize {
        self.registry.registered_count()
    }

    /// Stop the relay: drain the dispatch queue via the sentinel
    /// protocol, then stop accepting and close every remaining
    /// connection.
    pub async fn shutdown(&self) {
        // Pool join first: everything already queued gets delivered
        // before the listener is released and sockets start closing.
        self.dispatcher.shutdown().await;

        let _ = self.shutdown.send(true);

        let accept_task = {
            let mut guard =
                self.accept_task.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            guard.take()
        };
        if let Some(task) = accept_task {
            let _ = task.await;
        }

        let closed = self.registry.drain();
        info!(closed, "relay stopped");
    }

    fn submit(&self, app_id: &str, audience: Audience, message: Message) {
        let recipients = self.registry.resolve(&audience);
        debug!(app_id, recipients = recipients.len(), "message submitted");
        self.dispatcher.submit(app_id.to_owned(), recipients, message);
    }
}

#[async_trait]
impl MessageSender for Relay {
    async fn send_to_user(&self, app_id: &str, infobase_id: &str, user_id: &str, message: Message) {
        self.submit(
            app_id,
            Audience::User { infobase_id: infobase_id.to_owned(), user_id: user_id.to_owned() },
            message,
        );
    }

    async fn send_to_group(
        &self,
        app_id: &str,
        infobase_id: &str,
        user_group: &str,
        message: Message,
    ) {
        self.submit(
            app_id,
            Audience::Group {
                infobase_id: infobase_id.to_owned(),
                user_group: user_group.to_owned(),
            },
            message,
        );
    }

    async fn send_to_all(&self, app_id: &str, infobase_id: &str, message: Message) {
        self.submit(app_id, Audience::All { infobase_id: infobase_id.to_owned() }, message);
    }
}

/// The event loop: block on readiness, accept, hand off.
///
/// An accept failure during normal operation escalates (logged, loop
/// terminated). The wakeup caused by an intentional shutdown arrives on
/// the watch channel instead and is not an error.
async fn accept_loop(
    listener: TcpListener,
    registry: Arc<ConnectionRegistry>,
    directory: Arc<dyn ApplicationDirectory>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    debug!("accept loop stopping");
                    break;
                }
            },
            accepted = listener.accept() => {
                match accepted {
                    Ok((socket, addr)) => {
                        spawn_connection(socket, addr, &registry, &directory);
                    },
                    Err(error) => {
                        error!(%error, "accept failed, stopping the event loop");
                        break;
                    },
                }
            },
        }
    }
}

fn spawn_connection(
    socket: TcpStream,
    addr: SocketAddr,
    registry: &Arc<ConnectionRegistry>,
    directory: &Arc<dyn ApplicationDirectory>,
) {
    let (read_half, write_half) = socket.into_split();
    let id = registry.insert(addr, write_half);
    debug!(conn = %id, %addr, "client connected");

    let task = tokio::spawn(connection_task(
        id,
        read_half,
        Arc::clone(registry),
        Arc::clone(directory),
    ));
    registry.attach_reader(id, task.abort_handle());
}

/// Reader task: the only code that reads this socket. Feeds the state
/// machine and executes its actions; any failure tears the connection
/// down, with nothing sent back to the peer.
async fn connection_task(
    id: ConnId,
    mut read_half: OwnedReadHalf,
    registry: Arc<ConnectionRegistry>,
    directory: Arc<dyn ApplicationDirectory>,
) {
    let mut conn = Connection::new();
    let mut buf = [0u8; pushframe_proto::RECV_BUFFER_SIZE];

    loop {
        let capacity = conn.remaining_capacity();
        let read = read_half.read(&mut buf[..capacity]).await;

        let count = match read {
            Ok(0) => {
                debug!(conn = %id, "peer disconnected");
                break;
            },
            Ok(count) => count,
            Err(error) => {
                debug!(conn = %id, %error, "read failed");
                break;
            },
        };

        match conn.receive(&buf[..count], directory.as_ref()) {
            Ok(actions) => {
                for action in actions {
                    let ConnectionAction::Registered(identity) = action;
                    info!(
                        conn = %id,
                        infobase = %identity.infobase_id,
                        user = %identity.user_id,
                        "client registered",
                    );
                    registry.assign_identity(id, identity);
                }
            },
            Err(error) => {
                warn!(conn = %id, %error, "protocol violation, closing connection");
                break;
            },
        }
    }

    registry.remove(id);
}
