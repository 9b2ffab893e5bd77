use crate::{
    client::{Client, ClientId},
    reply::Reply,
};
use bytes::Bytes;
use hashbrown::{HashMap, HashSet};
use indexmap::IndexSet;
use std::{iter::StepBy, ops::Range};

/// Keep track of blocked clients, the keys they're waiting on, and keys that
/// have become ready.
pub struct Blocking {
    /// Blocked client instances.
    clients: Option<HashMap<ClientId, Client>>,

    /// The set of keys that a particular client is blocked on.
    keys: HashMap<ClientId, HashSet<Bytes>>,

    /// A wait queue per key, in blocking order.
    queues: HashMap<Bytes, IndexSet<ClientId>>,

    /// Keys with fresh data for their waiters.
    ready: Option<IndexSet<Bytes>>,
}

impl Default for Blocking {
    fn default() -> Self {
        Blocking {
            clients: Some(HashMap::new()),
            keys: HashMap::new(),
            queues: HashMap::new(),
            ready: None,
        }
    }
}

impl Blocking {
    /// Hold on to the client for re-running its command later.
    ///
    /// # Panics
    /// Panics if `clients` has been removed via `take_clients`.
    pub fn add(&mut self, client: Client, blocking_keys: StepBy<Range<usize>>) {
        let keys = self.keys.entry(client.id).or_default();

        for index in blocking_keys {
            let key = client.request.get(index).unwrap();
            self.queues.entry(key.clone()).or_default().insert(client.id);
            keys.insert(key);
        }

        self.clients.as_mut().unwrap().insert(client.id, client);
    }

    /// Remove a particular client from the wait queues.
    pub fn remove(&mut self, id: ClientId) -> Option<Client> {
        if let Some(keys) = self.keys.remove(&id) {
            for key in keys {
                if let Some(queue) = self.queues.get_mut(&key) {
                    queue.shift_remove(&id);
                    if queue.is_empty() {
                        self.queues.remove(&key);
                    }
                }
            }
        }

        self.clients
            .as_mut()
            .and_then(|clients| clients.remove(&id))
    }

    /// The first client to be woken for a particular key.
    pub fn front(&self, key: &[u8]) -> Option<ClientId> {
        self.queues.get(key)?.first().copied()
    }

    /// Mark a key as ready, if anyone is waiting on it.
    pub fn mark_ready(&mut self, key: &[u8]) {
        let Some((key, _)) = self.queues.get_key_value(key) else {
            return;
        };
        let key = key.clone();
        self.ready.get_or_insert_with(Default::default).insert(key);
    }

    /// Take the set of ready keys.
    pub fn ready(&mut self) -> Option<IndexSet<Bytes>> {
        self.ready.take()
    }

    /// Running a command requires an exclusive reference to a client and the
    /// store, but blocked clients are owned by the store. Remove them while
    /// rerunning commands; adding clients during this window panics.
    pub fn take_clients(&mut self) -> HashMap<ClientId, Client> {
        self.clients.take().unwrap()
    }

    /// Restore clients after running requests.
    pub fn restore_clients(&mut self, clients: HashMap<ClientId, Client>) {
        self.clients = Some(clients);
    }

    /// Attempt to unblock a client with a reply, then let it wait for input.
    pub fn unblock_with(&mut self, id: ClientId, reply: impl Into<Reply>) -> bool {
        if let Some(mut client) = self.remove(id) {
            client.reply(reply);
            client.unblock();
            client.wait();
            true
        } else {
            false
        }
    }
}
