use crate::{client::Client, pubsub::Subscriber};
use bytes::Bytes;
use hashbrown::{HashMap, HashSet};
use indexmap::IndexSet;

/// One side of the subscription registry: channels (or patterns) to their
/// subscribers in subscription order, plus the reverse index per client.
pub struct Subscribers {
    channels: HashMap<Bytes, IndexSet<Subscriber>>,
    members: HashMap<crate::ClientId, HashSet<Bytes>>,
}

impl Subscribers {
    pub fn new() -> Subscribers {
        Subscribers {
            channels: HashMap::new(),
            members: HashMap::new(),
        }
    }

    /// Add a subscription to a channel for a client. Returns the client's
    /// subscription count on this side of the registry.
    pub fn add(&mut self, channel: &Bytes, client: &Client) -> usize {
        let subscriber = Subscriber::new(client.id, client.reply_sender.clone());
        self.channels
            .entry(channel.clone())
            .or_default()
            .insert(subscriber);
        let members = self.members.entry(client.id).or_default();
        members.insert(channel.clone());
        members.len()
    }

    /// Remove one channel from a subscriber. Returns the remaining count.
    pub fn remove(&mut self, channel: &[u8], id: crate::ClientId) -> usize {
        if let Some(subscribers) = self.channels.get_mut(channel) {
            subscribers.shift_remove(&id);
            if subscribers.is_empty() {
                self.channels.remove(channel);
            }
        }

        match self.members.get_mut(&id) {
            Some(channels) => {
                channels.remove(channel);
                let len = channels.len();
                if len == 0 {
                    self.members.remove(&id);
                }
                len
            }
            None => 0,
        }
    }

    /// Remove all subscriptions for a client, returning the channels.
    pub fn remove_all(&mut self, id: crate::ClientId) -> Option<HashSet<Bytes>> {
        let channels = self.members.remove(&id)?;

        for channel in &channels {
            if let Some(subscribers) = self.channels.get_mut(channel) {
                subscribers.shift_remove(&id);
                if subscribers.is_empty() {
                    self.channels.remove(channel);
                }
            }
        }

        Some(channels)
    }

    /// Get all subscribers for a channel.
    pub fn get(&self, channel: &[u8]) -> Option<&IndexSet<Subscriber>> {
        self.channels.get(channel)
    }

    /// How many channels does a subscriber have?
    pub fn count(&self, id: crate::ClientId) -> usize {
        self.members.get(&id).map_or(0, HashSet::len)
    }

    /// Iterate over channels and their subscribers.
    pub fn iter(&self) -> impl Iterator<Item = (&Bytes, &IndexSet<Subscriber>)> {
        self.channels.iter()
    }
}
