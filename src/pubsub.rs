mod subscriber;
mod subscribers;

pub use subscriber::Subscriber;
use subscribers::Subscribers;

use crate::{
    client::{Client, ClientId},
    glob,
    reply::Reply,
};
use bytes::Bytes;

/// The process-wide subscription registry: exact channels on one side and
/// glob patterns on the other.
pub struct Pubsub {
    /// Clients subscribed to specific channels.
    subscribers: Subscribers,

    /// Clients subscribed to channel patterns.
    psubscribers: Subscribers,
}

impl Default for Pubsub {
    fn default() -> Self {
        Pubsub {
            subscribers: Subscribers::new(),
            psubscribers: Subscribers::new(),
        }
    }
}

impl Pubsub {
    /// Disconnect a client, removing all bookkeeping.
    pub fn disconnect(&mut self, id: ClientId) {
        self.subscribers.remove_all(id);
        self.psubscribers.remove_all(id);
    }

    /// Total subscriptions for a client.
    fn count(&self, id: ClientId) -> usize {
        self.subscribers.count(id) + self.psubscribers.count(id)
    }

    /// Subscribe a client to a channel.
    pub fn subscribe(&mut self, channel: Bytes, client: &mut Client) {
        self.subscribers.add(&channel, client);
        client.reply(Reply::Array(3));
        client.bulk("subscribe");
        client.reply(channel);
        client.reply(self.count(client.id));
        client.pubsub = true;
    }

    /// Subscribe a client to a pattern.
    pub fn psubscribe(&mut self, pattern: Bytes, client: &mut Client) {
        self.psubscribers.add(&pattern, client);
        client.reply(Reply::Array(3));
        client.bulk("psubscribe");
        client.reply(pattern);
        client.reply(self.count(client.id));
        client.pubsub = true;
    }

    /// Unsubscribe a client from a channel.
    pub fn unsubscribe(&mut self, channel: Bytes, client: &mut Client) {
        self.subscribers.remove(&channel, client.id);
        let count = self.count(client.id);
        client.reply(Reply::Array(3));
        client.bulk("unsubscribe");
        client.reply(channel);
        client.reply(count);

        if count == 0 {
            client.pubsub = false;
        }
    }

    /// Unsubscribe a client from a pattern.
    pub fn punsubscribe(&mut self, pattern: Bytes, client: &mut Client) {
        self.psubscribers.remove(&pattern, client.id);
        let count = self.count(client.id);
        client.reply(Reply::Array(3));
        client.bulk("punsubscribe");
        client.reply(pattern);
        client.reply(count);

        if count == 0 {
            client.pubsub = false;
        }
    }

    /// Unsubscribe a client from all channels.
    pub fn unsubscribe_all(&mut self, client: &mut Client) {
        let Some(channels) = self.subscribers.remove_all(client.id) else {
            client.reply(Reply::Array(3));
            client.bulk("unsubscribe");
            client.reply(Reply::Nil);
            client.reply(self.count(client.id));
            return;
        };

        let count = self.count(client.id);
        let len = channels.len();

        for (index, channel) in channels.iter().enumerate() {
            client.reply(Reply::Array(3));
            client.bulk("unsubscribe");
            client.reply(channel);
            client.reply(count + len - index - 1);
        }

        if count == 0 {
            client.pubsub = false;
        }
    }

    /// Unsubscribe a client from all patterns.
    pub fn punsubscribe_all(&mut self, client: &mut Client) {
        let Some(patterns) = self.psubscribers.remove_all(client.id) else {
            client.reply(Reply::Array(3));
            client.bulk("punsubscribe");
            client.reply(Reply::Nil);
            client.reply(self.count(client.id));
            return;
        };

        let count = self.count(client.id);
        let len = patterns.len();

        for (index, pattern) in patterns.iter().enumerate() {
            client.reply(Reply::Array(3));
            client.bulk("punsubscribe");
            client.reply(pattern);
            client.reply(count + len - index - 1);
        }

        if count == 0 {
            client.pubsub = false;
        }
    }

    /// Publish a message, returning the number of deliveries. A connection
    /// subscribed via both a channel and a matching pattern is counted twice.
    pub fn publish(&mut self, channel: &Bytes, message: &Bytes) -> usize {
        let mut count = 0;

        if let Some(subscribers) = self.subscribers.get(&channel[..]) {
            count += subscribers.len();

            for subscriber in subscribers {
                subscriber.reply(Reply::Array(3));
                subscriber.reply(Reply::Bulk("message".into()));
                subscriber.reply(channel);
                subscriber.reply(message);
            }
        }

        for (pattern, subscribers) in self.psubscribers.iter() {
            if glob::matches(&channel[..], &pattern[..]) {
                count += subscribers.len();
                for subscriber in subscribers {
                    subscriber.reply(Reply::Array(4));
                    subscriber.reply(Reply::Bulk("pmessage".into()));
                    subscriber.reply(pattern);
                    subscriber.reply(channel);
                    subscriber.reply(message);
                }
            }
        }

        count
    }
}
