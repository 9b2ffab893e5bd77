use crate::{ClientId, client::Addr};

/// Connection facts the store keeps per client for bookkeeping and logging.
#[derive(Clone, Copy, Debug)]
pub struct ClientInfo {
    /// The client id.
    pub id: ClientId,

    /// The client address.
    pub addr: Option<Addr>,
}
