use crate::Reply;

/// A message to a [`crate::client::Replier`].
#[derive(Debug)]
pub enum ReplyMessage {
    /// Stop replying.
    Quit,

    /// Send a reply to the client.
    Reply(Reply),
}

impl From<Reply> for ReplyMessage {
    fn from(reply: Reply) -> Self {
        ReplyMessage::Reply(reply)
    }
}
