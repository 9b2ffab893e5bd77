mod blocking;
mod watching;

use crate::{
    client::{Client, ClientId, ClientInfo},
    db::Db,
    pubsub::Pubsub,
    reply::Reply,
};
use blocking::Blocking;
use bytes::Bytes;
use hashbrown::{HashMap, hash_map::Entry};
use respite::RespConfig;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::mpsc;
use tracing::debug;
use triomphe::Arc;
use watching::Watching;

/// How many volatile keys one sweep of the expiry reaper samples.
const SWEEP_SAMPLE: usize = 20;

/// The sweep period while expired keys keep turning up.
const SWEEP_BUSY_MS: u64 = 100;

/// The ceiling the sweep period backs off to on an idle server.
const SWEEP_IDLE_MS: u64 = 1000;

/// A message to the store.
pub enum StoreMessage {
    /// A client is ready to execute some commands.
    Ready(Box<Client>),

    /// A client has connected.
    Connect(ClientInfo),

    /// A client has disconnected.
    Disconnect(ClientId),

    /// A blocking client has timed out.
    Timeout(ClientId, Arc<AtomicBool>),

    /// The reaper wants an expiry sweep.
    Sweep,
}

/// The store owns all shared state and runs on a single task, which is what
/// makes every command atomic with respect to every other connection: the
/// sequence of actions carried out by the server is happening wherever the
/// store is.
pub struct Store {
    /// Info about all connected clients, keyed by client id.
    pub clients: HashMap<ClientId, ClientInfo>,

    /// The keyspace.
    pub db: Db,

    /// The pubsub registry for this store.
    pub pubsub: Pubsub,

    /// The blocking registry for this store.
    pub blocking: Blocking,

    /// The watching registry for this store.
    pub watching: Watching,

    /// Resp reader config, shared with each client's reader.
    pub reader_config: RespConfig,

    /// The reaper's current period in milliseconds, shared with its task.
    sweep_interval: Arc<AtomicU64>,
}

impl Store {
    /// Spawn a store and its expiry reaper, returning the reader config.
    pub fn spawn(
        mut store_receiver: mpsc::UnboundedReceiver<StoreMessage>,
        store_sender: mpsc::UnboundedSender<StoreMessage>,
    ) -> RespConfig {
        let config = RespConfig::default();
        let sweep_interval = Arc::new(AtomicU64::new(SWEEP_IDLE_MS));

        let mut store = Store {
            clients: HashMap::new(),
            db: Db::default(),
            pubsub: Pubsub::default(),
            blocking: Blocking::default(),
            watching: Watching::default(),
            reader_config: config.clone(),
            sweep_interval: sweep_interval.clone(),
        };

        // The reaper: asks for a sweep on an adaptive period and stops
        // cooperatively once the store is gone.
        crate::spawn(async move {
            loop {
                let millis = sweep_interval.load(Ordering::Relaxed);
                tokio::time::sleep(tokio::time::Duration::from_millis(millis)).await;
                if store_sender.send(StoreMessage::Sweep).is_err() {
                    break;
                }
            }
        });

        crate::spawn(async move {
            while let Some(message) = store_receiver.recv().await {
                store.message(message);
            }
        });

        config
    }

    /// Check to see if a particular client is dirty.
    pub fn is_dirty(&self, id: ClientId) -> bool {
        self.watching.dirty.contains(&id)
    }

    /// Remove all previously watched keys for a transaction.
    pub fn unwatch(&mut self, id: ClientId) {
        self.watching.remove(id);
        self.watching.dirty.remove(&id);
    }

    /// Mark a key as ready to fulfill blocking requests.
    pub fn mark_ready(&mut self, key: &[u8]) {
        self.blocking.mark_ready(key);
    }

    /// Mark all clients watching a key as dirty.
    pub fn touch(&mut self, key: &[u8]) {
        self.watching.touch(key);
    }

    /// Handle a message from a client or background task.
    pub fn message(&mut self, message: StoreMessage) {
        use StoreMessage::*;
        match message {
            Connect(info) => self.connect(info),
            Disconnect(id) => self.disconnect(id),
            Ready(client) => client.ready(self),
            Timeout(id, canceled) => {
                if !canceled.load(Ordering::Relaxed) {
                    self.blocking.unblock_with(id, Reply::Nil);
                }
            }
            Sweep => self.sweep(),
        }
    }

    /// A client has connected, so store some shared info about it.
    fn connect(&mut self, info: ClientInfo) {
        debug!(id = %info.id, addr = ?info.addr, "client connected");
        self.clients.insert(info.id, info);
    }

    /// A client has disconnected, so remove all the tracking data for it.
    fn disconnect(&mut self, id: ClientId) {
        debug!(id = %id, "client disconnected");
        self.blocking.remove(id);
        self.pubsub.disconnect(id);
        self.unwatch(id);
        self.clients.remove(&id);
    }

    /// Sample volatile keys, drop the expired ones, and adapt the reaper's
    /// pace to the fraction found expired.
    fn sweep(&mut self) {
        let (sampled, removed) = self.db.sweep(SWEEP_SAMPLE);

        for key in &removed {
            self.touch(key);
        }

        let busy = sampled > 0 && removed.len() * 4 >= sampled;
        let next = if busy {
            SWEEP_BUSY_MS
        } else {
            let current = self.sweep_interval.load(Ordering::Relaxed);
            (current * 2).min(SWEEP_IDLE_MS)
        };
        self.sweep_interval.store(next, Ordering::Relaxed);
    }

    /// Block this client until the specified keys are ready.
    pub fn block(&mut self, mut client: Client, block: crate::BlockResult) {
        client.block(block.timeout);
        self.blocking.add(client, block.keys);
    }

    /// Iterate over ready keys and serve blocked clients with as many
    /// results as possible.
    pub fn unblock_ready(&mut self) {
        while let Some(ready) = self.blocking.ready() {
            // Commands need an exclusive reference to both the client and
            // the store, so blocked clients leave the store while they run.
            let mut clients = self.blocking.take_clients();
            for key in ready.iter() {
                self.unblock_key(&mut clients, key);
            }
            self.blocking.restore_clients(clients);
        }
    }

    /// Serve blocked clients for a particular key while results last.
    fn unblock_key(&mut self, clients: &mut HashMap<ClientId, Client>, key: &Bytes) {
        while let Some(id) = self.blocking.front(key) {
            let Entry::Occupied(mut entry) = clients.entry(id) else {
                panic!("missing client");
            };

            let client = entry.get_mut();

            // Reset the request before rerunning.
            client.request.reset(1);

            // If the client is still blocking then we're done.
            if client.run(self).is_some() {
                break;
            }

            // Remove the client and return it to the normal queue.
            self.blocking.remove(client.id);
            let mut client = entry.remove();
            client.unblock();
            client.ready(self);
        }
    }
}
