//! # Perception snapshot
//!
//! The detector publishes a frame of detected objects continuously. A background thread keeps
//! the latest frame in a [`PerceptionStore`], request handling only ever reads a copy of it and
//! never waits on the detector.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::{debug, info, warn};
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, RwLock,
    },
    thread::{self, JoinHandle},
};

use comms_if::{
    eqpt::perception::{DetectedObject, DetectionFrame},
    net::{zmq, MonitoredSocket, MonitoredSocketError, SocketOptions},
};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Receive timeout of the subscriber, bounds how long the client takes to notice a shutdown.
const SUB_RECV_TIMEOUT_MS: i32 = 100;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Latest set of detected objects, shared between the subscriber thread and request handling.
#[derive(Debug, Clone, Default)]
pub struct PerceptionStore {
    latest: Arc<RwLock<Vec<DetectedObject>>>,
}

/// Subscribes to the detector and writes every frame it receives into a store.
pub struct PerceptionClient {
    shutdown: Arc<AtomicBool>,
    join_handle: Option<JoinHandle<()>>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum PerceptionClientError {
    #[error("Socket error: {0}")]
    SocketError(MonitoredSocketError),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl PerceptionStore {
    /// Replace the snapshot.
    pub fn update(&self, objects: Vec<DetectedObject>) {
        match self.latest.write() {
            Ok(mut l) => *l = objects,
            Err(_) => warn!("Perception store lock poisoned, detections dropped"),
        }
    }

    /// A copy of the latest snapshot.
    pub fn snapshot(&self) -> Vec<DetectedObject> {
        match self.latest.read() {
            Ok(l) => l.clone(),
            Err(_) => Vec::new(),
        }
    }

    /// Find an object by name, ignoring case. If several objects share the name the most
    /// confident detection is returned.
    pub fn find(&self, name: &str) -> Option<DetectedObject> {
        let name = name.trim().to_lowercase();

        self.snapshot()
            .into_iter()
            .filter(|o| o.name.to_lowercase() == name)
            .fold(None, |best: Option<DetectedObject>, o| match best {
                Some(b) if b.confidence >= o.confidence => Some(b),
                _ => Some(o),
            })
    }
}

impl PerceptionClient {
    /// Connect to the detector and start writing detections into `store`.
    pub fn new(
        ctx: &zmq::Context,
        endpoint: &str,
        store: PerceptionStore,
    ) -> Result<Self, PerceptionClientError> {
        let socket_options = SocketOptions {
            block_on_first_connect: false,
            recv_timeout: SUB_RECV_TIMEOUT_MS,
            linger: 1,
            subscribe: Some(Vec::new()),
            ..Default::default()
        };

        let socket = MonitoredSocket::new(ctx, zmq::SUB, socket_options, endpoint)
            .map_err(PerceptionClientError::SocketError)?;

        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_clone = shutdown.clone();

        let join_handle = thread::spawn(move || recv_loop(socket, store, shutdown_clone));

        Ok(Self {
            shutdown,
            join_handle: Some(join_handle),
        })
    }
}

impl Drop for PerceptionClient {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);

        if let Some(jh) = self.join_handle.take() {
            jh.join().ok();
        }
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn recv_loop(socket: MonitoredSocket, store: PerceptionStore, shutdown: Arc<AtomicBool>) {
    let mut was_connected = false;

    while !shutdown.load(Ordering::Relaxed) {
        if socket.connected() != was_connected {
            was_connected = socket.connected();
            info!(
                "Perception publisher {}",
                if was_connected { "connected" } else { "disconnected" }
            );
        }

        let msg = match socket.recv_string(0) {
            Ok(Ok(s)) => s,
            Ok(Err(_)) => {
                warn!("Perception publisher sent a non UTF-8 message");
                continue;
            }
            Err(zmq::Error::EAGAIN) => continue,
            Err(e) => {
                warn!("Perception subscriber stopped: {}", e);
                break;
            }
        };

        match serde_json::from_str::<DetectionFrame>(&msg) {
            Ok(frame) => {
                debug!(
                    "{} detections at {}",
                    frame.objects.len(),
                    frame.timestamp
                );
                store.update(frame.objects);
            }
            Err(e) => warn!("Could not parse detection frame: {}", e),
        }
    }
}
