//! Kids Web Services interface: permission change notifications.

use std::sync::Arc;

use crate::bridge::callback::{trampoline, CallbackInfo, ClientData, NotificationId};
use crate::error::Result;
use crate::handle::{kinds, Handle, ProductUserId};
use crate::interfaces::{add_notify, remove_notify};
use crate::marshal::{HandleRef, Token};
use crate::pair::struct_pair;
use crate::platform::Shared;

pub const ADD_NOTIFY_PERMISSIONS_UPDATE_RECEIVED_API_LATEST: i32 = 1;

pub type OnPermissionsUpdateReceivedCallback =
    unsafe extern "C" fn(*const PermissionsUpdateReceivedCallbackInfoInternal);

struct_pair! {
    pub struct AddNotifyPermissionsUpdateReceivedOptions
        => AddNotifyPermissionsUpdateReceivedOptionsInternal
    {
        @version = ADD_NOTIFY_PERMISSIONS_UPDATE_RECEIVED_API_LATEST;
    }
}

struct_pair! {
    pub struct PermissionsUpdateReceivedCallbackInfo
        => PermissionsUpdateReceivedCallbackInfoInternal
    {
        client_data: ClientData => Token,
        local_user_id: Option<ProductUserId> => HandleRef,
    }
}

impl CallbackInfo for PermissionsUpdateReceivedCallbackInfo {
    fn client_data(&self) -> ClientData {
        self.client_data
    }
}

#[derive(Debug)]
pub struct Kws {
    handle: Handle<kinds::Kws>,
    shared: Arc<Shared>,
}

impl Kws {
    pub(crate) fn new(handle: Handle<kinds::Kws>, shared: Arc<Shared>) -> Self {
        Self { handle, shared }
    }

    pub fn handle(&self) -> Handle<kinds::Kws> {
        self.handle
    }

    pub fn add_notify_permissions_update_received<F>(
        &self,
        options: &AddNotifyPermissionsUpdateReceivedOptions,
        on_update: F,
    ) -> Result<NotificationId>
    where
        F: FnMut(&PermissionsUpdateReceivedCallbackInfo) + Send + 'static,
    {
        let bindings = &self.shared.bindings;
        add_notify::<_, PermissionsUpdateReceivedCallbackInfo, _>(
            options,
            on_update,
            |native, client_data| unsafe {
                (bindings.eos_kws_add_notify_permissions_update_received)(
                    self.handle.as_ptr(),
                    native,
                    client_data,
                    trampoline::<PermissionsUpdateReceivedCallbackInfo>,
                )
            },
        )
    }

    pub fn remove_notify_permissions_update_received(&self, id: NotificationId) {
        remove_notify(id, |raw| unsafe {
            (self.shared.bindings.eos_kws_remove_notify_permissions_update_received)(
                self.handle.as_ptr(),
                raw,
            )
        });
    }
}
