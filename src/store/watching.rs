use crate::client::ClientId;
use bytes::Bytes;
use hashbrown::{HashMap, HashSet};
use indexmap::IndexSet;

/// Keep track of which clients are watching which keys and which clients
/// have had a watched key written underneath them.
#[derive(Default)]
pub struct Watching {
    watchers: HashMap<Bytes, IndexSet<ClientId>>,
    clients: HashMap<ClientId, HashSet<Bytes>>,
    pub dirty: HashSet<ClientId>,
}

impl Watching {
    /// Add an entry to find the watchers by key, and a reverse entry to find
    /// all keys watched by a particular client for easy removal.
    pub fn add(&mut self, key: &Bytes, id: ClientId) {
        self.watchers.entry(key.clone()).or_default().insert(id);
        self.clients.entry(id).or_default().insert(key.clone());
    }

    /// Remove all watched keys for a particular client.
    pub fn remove(&mut self, id: ClientId) {
        let Some(keys) = self.clients.remove(&id) else {
            return;
        };

        for key in keys {
            if let Some(watchers) = self.watchers.get_mut(&key) {
                watchers.shift_remove(&id);
                if watchers.is_empty() {
                    self.watchers.remove(&key);
                }
            }
        }
    }

    /// Mark all watchers of a key as dirty. Their transactions will abort.
    pub fn touch(&mut self, key: &[u8]) {
        let Some(ids) = self.watchers.remove(key) else {
            return;
        };

        for id in ids {
            self.remove(id);
            self.dirty.insert(id);
        }
    }
}
