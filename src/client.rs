mod addr;
mod id;
mod info;
mod replier;
mod reply_message;

pub use addr::Addr;
pub use id::ClientId;
pub use info::ClientInfo;
pub use replier::Replier;
pub use reply_message::ReplyMessage;

use crate::{
    BlockResult, Reply, ReplyError, Store, StoreMessage, request::Request,
};
use bytes::Bytes;
use respite::{RespConfig, RespReader, RespRequest};
use std::{
    collections::VecDeque,
    sync::{
        Mutex,
        atomic::{AtomicBool, Ordering},
    },
};
use tokio::{
    io::{AsyncRead, AsyncWrite},
    select,
    sync::{
        mpsc,
        oneshot::{self, error::TryRecvError},
    },
    task::JoinHandle,
    time::Duration,
};
use triomphe::Arc;

/// A queued transaction argument, with an end marker per command.
pub enum Argument {
    Push(Bytes),
    End,
}

/// The current timeout task for a blocking operation.
#[derive(Debug)]
struct Timeout {
    /// Has this timeout been canceled?
    canceled: Arc<AtomicBool>,

    /// The task for sending a timeout message.
    task: JoinHandle<()>,
}

impl Timeout {
    /// Abort the task and mark this timeout as canceled to skip an existing message.
    fn cancel(&mut self) {
        self.canceled.store(true, Ordering::Relaxed);
        self.task.abort();
    }
}

/// The transaction state of a client.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Tx {
    /// No transaction.
    None,

    /// In a transaction with the number of queued commands.
    Some(usize),
}

/// The client: where the connection's tasks intersect. It carries the reader
/// and replier channels, the session mode (normal, queued, subscribed), the
/// transaction queue, and the machinery for blocking reads.
pub struct Client {
    /// A channel for receiving requests
    requests: mpsc::UnboundedReceiver<RespRequest>,

    /// The next request to process, already read from the channel.
    next_request: Option<RespRequest>,

    /// Is this client currently parked on a blocking read?
    blocking: bool,

    /// The client id
    pub id: ClientId,

    /// A channel to listen for quit requests
    quit_receiver: oneshot::Receiver<()>,

    /// A channel for sending messages to the store
    store_sender: mpsc::UnboundedSender<StoreMessage>,

    /// A channel for sending replies
    pub reply_sender: mpsc::UnboundedSender<ReplyMessage>,

    /// Current transaction status
    tx: Tx,

    /// Are we currently running EXEC?
    pub in_exec: bool,

    /// The current request
    pub request: Request,

    /// A queue of commands to be executed with EXEC
    pub queue: VecDeque<Argument>,

    /// Are we currently subscribed to any channels or patterns?
    pub pubsub: bool,

    /// The reader task
    reader_task: crate::TaskHandle<()>,

    /// The current timeout
    timeout: Option<Timeout>,
}

impl Client {
    /// Create a new client and wait for input
    pub fn spawn<S: AsyncRead + AsyncWrite + Send + 'static>(
        stream: S,
        store_sender: mpsc::UnboundedSender<StoreMessage>,
        config: RespConfig,
        addr: Option<Addr>,
    ) {
        // Set up various channels
        let (reader, writer) = tokio::io::split(stream);
        let (quit_sender, quit_receiver) = oneshot::channel();
        let (request_sender, request_receiver) = mpsc::unbounded_channel();
        let quit_sender = Arc::new(Mutex::new(Some(quit_sender)));

        // Spawn the reader
        let mut reader = RespReader::new(reader, config);
        let reader_task = crate::spawn_with_handle(async move {
            reader
                .requests(|request| {
                    _ = request_sender.send(request);
                })
                .await;
        });

        // Spawn the replier
        let reply_sender = Replier::spawn(writer, quit_sender);

        let id = ClientId::next();

        // Notify the store about the connection
        let message = StoreMessage::Connect(ClientInfo { id, addr });
        _ = store_sender.send(message);

        // Create the client
        let client = Client {
            requests: request_receiver,
            next_request: None,
            blocking: false,
            id,
            quit_receiver,
            store_sender,
            reply_sender,
            tx: Tx::None,
            in_exec: false,
            request: Request::default(),
            queue: VecDeque::new(),
            pubsub: false,
            reader_task,
            timeout: None,
        };

        // Wait for the first request
        client.wait();
    }

    /// Discard the current multi transaction
    pub fn discard(&mut self, store: &mut Store) {
        self.tx = Tx::None;
        self.queue.clear();
        store.unwatch(self.id);
    }

    /// Get the current transaction state.
    pub fn tx(&self) -> Tx {
        self.tx
    }

    /// Set the current transaction state.
    pub fn set_tx(&mut self, tx: Tx) -> Tx {
        std::mem::replace(&mut self.tx, tx)
    }

    /// Is this client currently waiting on a blocking operation?
    pub fn is_blocked(&self) -> bool {
        self.blocking
    }

    /// Stop processing requests and drop.
    pub fn quit(&mut self) {
        if !self.is_quitting() {
            self.quit_receiver.close();
            // No more replies after quitting.
            _ = self.reply_sender.send(ReplyMessage::Quit);
        }
    }

    /// Is this client currently quitting?
    fn is_quitting(&mut self) -> bool {
        let result = self.quit_receiver.try_recv();
        !matches!(result, Err(TryRecvError::Empty))
    }

    /// Send a reply to the client.
    pub fn reply(&mut self, reply: impl Into<Reply>) {
        _ = self.reply_sender.send(reply.into().into());
    }

    /// Send an array reply for an iterator with an exact size.
    pub fn array<I, T>(&mut self, iter: I)
    where
        T: Into<Reply>,
        I: Iterator<Item = T> + ExactSizeIterator,
    {
        self.reply(Reply::Array(iter.len()));
        for reply in iter {
            self.reply(reply);
        }
    }

    /// Send a bulk reply.
    pub fn bulk(&mut self, reply: impl Into<Bytes>) {
        self.reply(Reply::Bulk(reply.into()));
    }

    /// Attempt to receive the next request if not blocked or quitting.
    pub fn try_request(&mut self) -> Option<RespRequest> {
        if self.is_blocked() {
            None
        } else if let Some(message) = self.next_request.take() {
            Some(message)
        } else {
            self.requests.try_recv().ok()
        }
    }

    /// Run the currently loaded request, then clear it unless it blocked.
    pub fn run(&mut self, store: &mut Store) -> Option<BlockResult> {
        let block = 'run: {
            // Arity errors never execute or queue. Inside a transaction the
            // command is simply rejected and the queue stays valid.
            if !self.request.is_valid() {
                self.reply(self.request.wrong_arguments());
                break 'run None;
            }

            // Subscribed clients only accept the subscription commands.
            if self.pubsub && !self.request.command.pubsub_allowed() {
                self.reply(ReplyError::Pubsub(self.request.command));
                break 'run None;
            }

            // Queue the request instead of running it during a transaction.
            if self.request.command.queueable() {
                if let Tx::Some(count) = self.tx {
                    self.tx = Tx::Some(count + 1);
                    for argument in self.request.drain() {
                        self.queue.push_back(Argument::Push(argument));
                    }
                    self.queue.push_back(Argument::End);
                    self.reply("QUEUED");
                    break 'run None;
                }
            }

            match (self.request.command.run)(self, store) {
                // The command has already replied.
                Ok(block) => block,

                // The command returned early with a reply or an error.
                Err(reply) => {
                    self.reply(reply);
                    None
                }
            }
        };

        if block.is_none() {
            self.request.clear();
        }

        block
    }

    /// If quitting, drop. Otherwise, wait for the next actionable event:
    /// a request from the reader, or a quit message.
    pub fn wait(self) {
        crate::spawn(self.wait_inner());
    }

    #[doc(hidden)]
    async fn wait_inner(mut self) {
        loop {
            select! {
                _ = &mut self.quit_receiver => break,
                message = self.requests.recv() => {
                    match message {
                        Some(RespRequest::Argument(argument)) => {
                            // Push arguments until the request is complete.
                            self.request.push_back(argument);
                        }
                        Some(message) => {
                            // Buffer this message for the store.
                            self.next_request = Some(message);
                            let store_sender = self.store_sender.clone();
                            let message = StoreMessage::Ready(Box::new(self));
                            _ = store_sender.send(message);
                            break;
                        }
                        None => break,
                    }
                }
            }
        }
    }

    /// Mark this client as blocked and spawn a timeout if necessary.
    pub fn block(&mut self, timeout: Duration) {
        self.blocking = true;

        if timeout.is_zero() {
            self.timeout = None;
            return;
        }

        let id = self.id;
        let sleep = tokio::time::sleep(timeout);
        let store_sender = self.store_sender.clone();

        // Use a shared value to ensure that a timeout message is from the
        // most recent blocking operation.
        let canceled = Arc::new(AtomicBool::new(false));

        self.timeout = Some(Timeout {
            canceled: canceled.clone(),
            task: tokio::spawn(async move {
                sleep.await;
                let message = StoreMessage::Timeout(id, canceled);
                _ = store_sender.send(message);
            }),
        });
    }

    /// Mark this client unblocked and cancel the timeout.
    pub fn unblock(&mut self) {
        self.request.clear();
        self.blocking = false;
        if let Some(mut timeout) = self.timeout.take() {
            timeout.cancel();
        }
    }

    /// Process all requests from the queue and then wait.
    pub fn ready(mut self, store: &mut Store) {
        while let Some(message) = self.try_request() {
            if self.is_quitting() {
                return;
            }

            use RespRequest::*;
            match message {
                Argument(argument) => {
                    self.request.push_back(argument);
                }
                End => {
                    if let Some(block) = self.run(store) {
                        store.block(self, block);
                        store.unblock_ready();
                        return;
                    }
                    store.unblock_ready();
                }
                InvalidArgument => {
                    self.reply(ReplyError::InvalidArgument);
                }
                Error(error) => {
                    self.reply(error);
                    self.quit();
                    return;
                }
            }
        }

        self.wait();
    }
}

impl Drop for Client {
    /// Send messages to stop the reader and clean up store resources.
    fn drop(&mut self) {
        self.reader_task.abort();
        _ = self.store_sender.send(StoreMessage::Disconnect(self.id));
    }
}
