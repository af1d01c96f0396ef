use std::io::Write;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use anyhow::{anyhow, Result};

use super::broadcast::{SubscriberSet, Subscription};

const WRITE_TIMEOUT: Duration = Duration::from_secs(2);

/// TCP endpoint for live subscribers. Every broadcast is written to each
/// connected client as one JSON object per line.
pub struct LiveServer {
    addr: String,
    subscribers: SubscriberSet,
}

#[derive(Debug)]
pub struct LiveHandle {
    pub addr: SocketAddr,
    subscribers: SubscriberSet,
    shutdown: Arc<AtomicBool>,
    join: Option<JoinHandle<()>>,
}

impl LiveHandle {
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Stop accepting, disconnect every subscriber and join all threads.
    pub fn stop(mut self) -> Result<()> {
        self.shutdown.store(true, Ordering::SeqCst);
        self.subscribers.close();
        if let Some(join) = self.join.take() {
            join.join()
                .map_err(|_| anyhow!("live server thread panicked"))?;
        }
        Ok(())
    }
}

impl LiveServer {
    pub fn new(addr: impl Into<String>, subscribers: SubscriberSet) -> Self {
        Self {
            addr: addr.into(),
            subscribers,
        }
    }

    pub fn spawn(self) -> Result<LiveHandle> {
        let configured_addr: SocketAddr = self.addr.parse()?;
        let listener = TcpListener::bind(configured_addr)?;
        let addr = listener.local_addr()?;
        listener.set_nonblocking(true)?;

        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_thread = shutdown.clone();
        let subscribers = self.subscribers.clone();
        let join = std::thread::spawn(move || {
            if let Err(err) = run_acceptor(listener, subscribers, shutdown_thread) {
                log::error!("live server stopped: {}", err);
            }
        });

        Ok(LiveHandle {
            addr,
            subscribers: self.subscribers,
            shutdown,
            join: Some(join),
        })
    }
}

fn run_acceptor(
    listener: TcpListener,
    subscribers: SubscriberSet,
    shutdown: Arc<AtomicBool>,
) -> Result<()> {
    let mut writers: Vec<JoinHandle<()>> = Vec::new();
    let result = loop {
        if shutdown.load(Ordering::SeqCst) {
            break Ok(());
        }
        match listener.accept() {
            Ok((stream, peer)) => match start_writer(stream, &subscribers) {
                Ok(handle) => {
                    log::info!("live subscriber connected from {}", peer);
                    writers.push(handle);
                }
                Err(err) => log::warn!("live subscriber {} rejected: {}", peer, err),
            },
            Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => {
                writers.retain(|handle| !handle.is_finished());
                std::thread::sleep(Duration::from_millis(50));
            }
            Err(err) => break Err(err.into()),
        }
    };
    subscribers.close();
    for handle in writers {
        let _ = handle.join();
    }
    result
}

fn start_writer(stream: TcpStream, subscribers: &SubscriberSet) -> Result<JoinHandle<()>> {
    stream.set_nonblocking(false)?;
    stream.set_write_timeout(Some(WRITE_TIMEOUT))?;
    let _ = stream.set_nodelay(true);
    let subscription = subscribers.subscribe();
    let subscribers = subscribers.clone();
    Ok(std::thread::spawn(move || {
        write_messages(stream, subscription, &subscribers)
    }))
}

fn write_messages(mut stream: TcpStream, subscription: Subscription, subscribers: &SubscriberSet) {
    let Subscription { id, receiver } = subscription;
    for message in receiver {
        let sent = stream
            .write_all(message.as_bytes())
            .and_then(|()| stream.write_all(b"\n"))
            .and_then(|()| stream.flush());
        if let Err(err) = sent {
            log::warn!("live subscriber {} dropped: {}", id, err);
            subscribers.unsubscribe(id);
            return;
        }
    }
    log::debug!("live subscriber {} closed", id);
}
