//! Peer-to-peer interface: connection-closed notifications.

use std::sync::Arc;

use crate::bridge::callback::{trampoline, CallbackInfo, ClientData, NotificationId};
use crate::error::Result;
use crate::handle::{kinds, Handle, ProductUserId};
use crate::interfaces::{add_notify, remove_notify};
use crate::marshal::{Enum, FixedText, HandleRef, Nested, Token};
use crate::pair::struct_pair;
use crate::platform::Shared;
use crate::result::native_enum;

pub const SOCKET_ID_API_LATEST: i32 = 1;
pub const ADD_NOTIFY_PEER_CONNECTION_CLOSED_API_LATEST: i32 = 1;
/// Size of the inline socket name buffer, terminator included.
pub const SOCKET_NAME_BUFFER_LEN: usize = 33;

pub type OnRemoteConnectionClosedCallback =
    unsafe extern "C" fn(*const OnRemoteConnectionClosedInfoInternal);

struct_pair! {
    /// Names a P2P socket. At most 32 bytes of ASCII.
    pub struct SocketId => SocketIdInternal {
        @version = SOCKET_ID_API_LATEST;
        socket_name: String => FixedText<SOCKET_NAME_BUFFER_LEN>,
    }
}

impl SocketId {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            socket_name: name.into(),
        }
    }
}

native_enum! {
    pub enum ConnectionClosedReason {
        Unspecified = 0,
        ClosedByLocalUser = 1,
        ClosedByPeer = 2,
        TimedOut = 3,
        TooManyConnections = 4,
        InvalidMessage = 5,
        InvalidData = 6,
        ConnectionFailed = 7,
        ConnectionClosed = 8,
        NegotiationFailed = 9,
        UnexpectedError = 10,
    }
}

struct_pair! {
    pub struct AddNotifyPeerConnectionClosedOptions
        => AddNotifyPeerConnectionClosedOptionsInternal
    {
        @version = ADD_NOTIFY_PEER_CONNECTION_CLOSED_API_LATEST;
        local_user_id: Option<ProductUserId> => HandleRef,
        /// `None` subscribes to every socket.
        socket_id: Option<SocketId> => Nested,
    }
}

struct_pair! {
    pub struct OnRemoteConnectionClosedInfo => OnRemoteConnectionClosedInfoInternal {
        client_data: ClientData => Token,
        local_user_id: Option<ProductUserId> => HandleRef,
        remote_user_id: Option<ProductUserId> => HandleRef,
        socket_id: Option<SocketId> => Nested,
        reason: ConnectionClosedReason => Enum,
    }
}

impl CallbackInfo for OnRemoteConnectionClosedInfo {
    fn client_data(&self) -> ClientData {
        self.client_data
    }
}

#[derive(Debug)]
pub struct P2p {
    handle: Handle<kinds::P2p>,
    shared: Arc<Shared>,
}

impl P2p {
    pub(crate) fn new(handle: Handle<kinds::P2p>, shared: Arc<Shared>) -> Self {
        Self { handle, shared }
    }

    pub fn handle(&self) -> Handle<kinds::P2p> {
        self.handle
    }

    /// Call `on_closed` every time a matching connection closes, until
    /// [`remove_notify_peer_connection_closed`](Self::remove_notify_peer_connection_closed).
    pub fn add_notify_peer_connection_closed<F>(
        &self,
        options: &AddNotifyPeerConnectionClosedOptions,
        on_closed: F,
    ) -> Result<NotificationId>
    where
        F: FnMut(&OnRemoteConnectionClosedInfo) + Send + 'static,
    {
        let bindings = &self.shared.bindings;
        add_notify::<_, OnRemoteConnectionClosedInfo, _>(options, on_closed, |native, client_data| {
            unsafe {
                (bindings.eos_p2p_add_notify_peer_connection_closed)(
                    self.handle.as_ptr(),
                    native,
                    client_data,
                    trampoline::<OnRemoteConnectionClosedInfo>,
                )
            }
        })
    }

    pub fn remove_notify_peer_connection_closed(&self, id: NotificationId) {
        remove_notify(id, |raw| unsafe {
            (self.shared.bindings.eos_p2p_remove_notify_peer_connection_closed)(
                self.handle.as_ptr(),
                raw,
            )
        });
    }
}
