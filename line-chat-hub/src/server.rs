use std::{future::Future, io, net::SocketAddr, pin::Pin, sync::Arc, time::Duration};

use anyhow::Result;
use tokio::{
    io::BufReader,
    net::{TcpListener, TcpStream, tcp::OwnedReadHalf},
    select,
    sync::{Mutex, mpsc},
    task::JoinHandle,
    time::{Sleep, sleep},
};
use tracing::{debug, info, warn};

use crate::{
    hub::Hub,
    protocol::{read_line, write_line},
    session::{LineSession, Step},
};

/// Delay between a rejected login and closing the connection.
pub const DEFAULT_GRACE: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy)]
pub struct ServerConfig {
    pub grace: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            grace: DEFAULT_GRACE,
        }
    }
}

pub struct Server {
    listener: TcpListener,
    hub: Arc<Mutex<Hub>>,
    config: ServerConfig,
}

impl Server {
    pub fn new(listener: TcpListener, config: ServerConfig) -> Self {
        info!("server started");
        Self {
            listener,
            hub: Arc::new(Mutex::new(Hub::new())),
            config,
        }
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn hub(&self) -> Arc<Mutex<Hub>> {
        Arc::clone(&self.hub)
    }

    pub async fn run_until<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send,
    {
        let Server {
            listener,
            hub,
            config,
        } = self;
        tokio::pin!(shutdown);
        info!("start listening");

        loop {
            select! {
                _ = &mut shutdown => {
                    info!("server shutting down");
                    break;
                }
                accept_result = listener.accept() => {
                    handle_accept_result(accept_result, &hub, config);
                }
            }
        }

        Ok(())
    }

    pub async fn run_until_ctrl_c(self) -> Result<()> {
        self.run_until(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!(error = ?err, "failed to install ctrl-c handler");
            }
        })
        .await
    }
}

fn handle_accept_result(
    result: io::Result<(TcpStream, SocketAddr)>,
    hub: &Arc<Mutex<Hub>>,
    config: ServerConfig,
) {
    match result {
        Ok((stream, peer)) => spawn_connection(stream, peer, hub, config),
        Err(err) => warn!(error = ?err, "failed to accept connection"),
    }
}

fn spawn_connection(
    stream: TcpStream,
    peer: SocketAddr,
    hub: &Arc<Mutex<Hub>>,
    config: ServerConfig,
) {
    let hub = Arc::clone(hub);
    tokio::spawn(async move {
        if let Err(err) = handle_connection(stream, peer, hub, config).await {
            warn!(peer = %peer, error = ?err, "client connection closed with error");
        }
    });
}

async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    hub: Arc<Mutex<Hub>>,
    config: ServerConfig,
) -> Result<()> {
    let (reader, mut writer) = stream.into_split();
    let (outbox, mut outbound) = mpsc::unbounded_channel();
    let (mut inbound, reader_task) = spawn_line_reader(reader, peer);

    let mut session = LineSession::connect(&mut *hub.lock().await, peer, outbox);
    let mut pending_close: Option<Pin<Box<Sleep>>> = None;

    let result = loop {
        select! {
            biased;

            line = outbound.recv() => {
                let Some(line) = line else { break Ok(()) };
                if let Err(err) = write_line(&mut writer, &line).await {
                    debug!(peer = %peer, error = ?err, "failed to deliver line");
                    break Ok(());
                }
            }
            _ = close_timer(&mut pending_close) => {
                debug!(peer = %peer, "closing rejected connection");
                break Ok(());
            }
            inbound_line = inbound.recv() => {
                let line = match inbound_line {
                    Some(Ok(line)) => line,
                    Some(Err(err)) => break Err(err.into()),
                    None => break Ok(()),
                };
                let step = session.handle_line(&mut *hub.lock().await, &line);
                match step {
                    Step::Continue => {}
                    Step::Authenticated => pending_close = None,
                    Step::CloseAfterGrace(_) => {
                        if pending_close.is_none() {
                            pending_close = Some(Box::pin(sleep(config.grace)));
                        }
                    }
                }
            }
        }
    };

    reader_task.abort();
    session.disconnect(&mut *hub.lock().await);
    result
}

async fn close_timer(pending: &mut Option<Pin<Box<Sleep>>>) {
    match pending {
        Some(timer) => timer.as_mut().await,
        None => std::future::pending().await,
    }
}

/// Reads lines on a separate task so partially read lines survive `select!`.
fn spawn_line_reader(
    reader: OwnedReadHalf,
    peer: SocketAddr,
) -> (mpsc::Receiver<io::Result<String>>, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(32);
    let task = tokio::spawn(async move {
        let mut reader = BufReader::new(reader);
        loop {
            let item = match read_line(&mut reader).await {
                Ok(Some(line)) => Ok(line),
                Ok(None) => break,
                Err(err) => Err(err),
            };
            let failed = item.is_err();
            if tx.send(item).await.is_err() || failed {
                break;
            }
        }
        debug!(peer = %peer, "reader finished");
    });
    (rx, task)
}
