use crate::{Reply, ReplyMessage};
use respite::{RespError, RespWriter};
use std::{io::Write as IoWrite, sync::Mutex};
use thiserror::Error;
use tokio::{
    io::{AsyncWrite, BufWriter},
    sync::{mpsc, oneshot},
};
use triomphe::Arc;

/// An error during writing replies
#[derive(Debug, Error)]
pub enum ReplierError {
    #[error(transparent)]
    IO(#[from] std::io::Error),

    #[error(transparent)]
    Resp(#[from] RespError),
}

/// Serializes replies in command order on a dedicated task, so handlers never
/// wait on the socket.
pub struct Replier<W: AsyncWrite + Unpin> {
    /// A buffer for rendering error text
    buffer: Vec<u8>,

    /// Is this client quitting?
    quitting: bool,

    /// A channel to receive replies from
    reply_receiver: mpsc::UnboundedReceiver<ReplyMessage>,

    /// A writer for sending bytes to the client
    writer: RespWriter<BufWriter<W>>,

    /// A oneshot sender to notify the client about errors.
    quit_sender: Arc<Mutex<Option<oneshot::Sender<()>>>>,
}

impl<W: AsyncWrite + Unpin + Send + 'static> Replier<W> {
    /// Create a new Replier and wait for replies
    pub fn spawn(
        writer: W,
        quit_sender: Arc<Mutex<Option<oneshot::Sender<()>>>>,
    ) -> mpsc::UnboundedSender<ReplyMessage> {
        let (reply_sender, reply_receiver) = mpsc::unbounded_channel();
        let replier = Replier {
            buffer: Vec::new(),
            quitting: false,
            reply_receiver,
            writer: RespWriter::new(BufWriter::new(writer)),
            quit_sender,
        };
        crate::spawn(replier.listen());
        reply_sender
    }

    /// Listen for reply messages and handle them as quickly as possible.
    async fn listen(mut self) {
        if self.listen_inner().await.is_err() {
            let Ok(mut quit) = self.quit_sender.lock() else {
                return;
            };
            let Some(quit) = quit.take() else {
                return;
            };
            _ = quit.send(());
        }
    }

    #[doc(hidden)]
    async fn listen_inner(&mut self) -> Result<(), ReplierError> {
        while let Some(message) = self.reply_receiver.recv().await {
            self.message(message).await?;

            // Receive as many messages as possible before flushing the writer.
            while let Ok(message) = self.reply_receiver.try_recv() {
                self.message(message).await?;
            }

            self.writer.flush().await?;
        }
        Ok(())
    }

    /// Handle one reply message
    async fn message(&mut self, message: ReplyMessage) -> Result<(), ReplierError> {
        match message {
            ReplyMessage::Quit => {
                self.quitting = true;
            }
            ReplyMessage::Reply(reply) => {
                self.write(reply).await?;
            }
        }
        Ok(())
    }

    /// Write a reply to send to the client
    async fn write(&mut self, reply: Reply) -> Result<(), ReplierError> {
        use Reply::*;

        if self.quitting {
            return Ok(());
        }

        match reply {
            Array(len) => {
                self.writer.write_array(len).await?;
            }
            Bulk(bytes) => {
                self.writer.write_blob_string(&bytes[..]).await?;
            }
            Error(error) => {
                self.buffer.clear();
                write!(self.buffer, "{error}").unwrap();
                self.writer.write_simple_error(&self.buffer[..]).await?;
            }
            Integer(value) => {
                self.writer.write_integer(value).await?;
            }
            Nil => {
                self.writer.write_nil().await?;
            }
            Status(status) => {
                self.writer.write_simple_string(status.as_bytes()).await?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
#[cfg(not(miri))]
mod tests {
    use super::*;
    use crate::ReplyError;
    use std::str::from_utf8;
    use tokio::io::{AsyncReadExt, duplex};

    macro_rules! assert_replies {
        ($reply:expr, $output:expr) => {{
            let (mut local, remote) = duplex(2usize.pow(8));
            let (quit_sender, _) = oneshot::channel();
            let quit_sender = Arc::new(Mutex::new(Some(quit_sender)));
            let sender = Replier::spawn(remote, quit_sender);

            _ = sender.send(ReplyMessage::Reply($reply.into()));

            // Drop the sender so that the replier task exits
            drop(sender);

            // Read and compare the output
            let mut buffer = Vec::new();
            local.read_to_end(&mut buffer).await?;

            let output = $output;
            match (from_utf8(&buffer), from_utf8(output)) {
                (Ok(a), Ok(b)) => assert_eq!(a, b),
                _ => assert_eq!(buffer, output),
            }
        }};
    }

    #[tokio::test]
    async fn write_nil() -> Result<(), ReplierError> {
        assert_replies!(Reply::Nil, b"$-1\r\n");
        Ok(())
    }

    #[tokio::test]
    async fn write_integer() -> Result<(), ReplierError> {
        assert_replies!(Reply::Integer(-53), b":-53\r\n");
        Ok(())
    }

    #[tokio::test]
    async fn write_array_header() -> Result<(), ReplierError> {
        assert_replies!(Reply::Array(5), b"*5\r\n");
        Ok(())
    }

    #[tokio::test]
    async fn write_bulk() -> Result<(), ReplierError> {
        assert_replies!(Reply::Bulk("abc".into()), b"$3\r\nabc\r\n");
        Ok(())
    }

    #[tokio::test]
    async fn write_status() -> Result<(), ReplierError> {
        assert_replies!(Reply::Status("PONG"), b"+PONG\r\n");
        Ok(())
    }

    #[tokio::test]
    async fn write_error() -> Result<(), ReplierError> {
        assert_replies!(ReplyError::Syntax, b"-ERR syntax error\r\n");
        Ok(())
    }

    #[tokio::test]
    async fn write_wrong_type() -> Result<(), ReplierError> {
        assert_replies!(
            ReplyError::WrongType,
            b"-WRONGTYPE Operation against a key holding the wrong kind of value\r\n"
        );
        Ok(())
    }
}
