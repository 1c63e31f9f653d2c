//! Presence interface and presence modification handles.

use std::ptr;
use std::sync::Arc;

use crate::bridge::callback::{trampoline, CallbackInfo, ClientData};
use crate::error::Result;
use crate::handle::{kinds, EpicAccountId, Handle, Owned};
use crate::interfaces::call_async;
use crate::marshal::{Enum, HandleRef, Text, Token};
use crate::pair::{struct_pair, with_native};
use crate::platform::Shared;
use crate::result::ResultCode;

pub const CREATE_PRESENCE_MODIFICATION_API_LATEST: i32 = 1;
pub const PRESENCE_MODIFICATION_SET_RAW_RICH_TEXT_API_LATEST: i32 = 1;
pub const SET_PRESENCE_API_LATEST: i32 = 1;

pub type SetPresenceCompleteCallback =
    unsafe extern "C" fn(*const SetPresenceCallbackInfoInternal);

struct_pair! {
    pub struct CreatePresenceModificationOptions => CreatePresenceModificationOptionsInternal {
        @version = CREATE_PRESENCE_MODIFICATION_API_LATEST;
        local_user_id: Option<EpicAccountId> => HandleRef,
    }
}

struct_pair! {
    pub struct PresenceModificationSetRawRichTextOptions
        => PresenceModificationSetRawRichTextOptionsInternal
    {
        @version = PRESENCE_MODIFICATION_SET_RAW_RICH_TEXT_API_LATEST;
        rich_text: Option<String> => Text,
    }
}

struct_pair! {
    pub struct SetPresenceOptions => SetPresenceOptionsInternal {
        @version = SET_PRESENCE_API_LATEST;
        local_user_id: Option<EpicAccountId> => HandleRef,
        presence_modification_handle: Option<Handle<kinds::PresenceModification>> => HandleRef,
    }
}

struct_pair! {
    pub struct SetPresenceCallbackInfo => SetPresenceCallbackInfoInternal {
        result_code: ResultCode => Enum,
        client_data: ClientData => Token,
        local_user_id: Option<EpicAccountId> => HandleRef,
    }
}

impl CallbackInfo for SetPresenceCallbackInfo {
    fn client_data(&self) -> ClientData {
        self.client_data
    }

    fn result_code(&self) -> Option<ResultCode> {
        Some(self.result_code)
    }
}

#[derive(Debug)]
pub struct Presence {
    handle: Handle<kinds::Presence>,
    shared: Arc<Shared>,
}

impl Presence {
    pub(crate) fn new(handle: Handle<kinds::Presence>, shared: Arc<Shared>) -> Self {
        Self { handle, shared }
    }

    pub fn handle(&self) -> Handle<kinds::Presence> {
        self.handle
    }

    pub fn create_presence_modification(
        &self,
        options: &CreatePresenceModificationOptions,
    ) -> Result<(ResultCode, Option<PresenceModification>)> {
        let bindings = &self.shared.bindings;
        let mut out = ptr::null_mut();
        let raw = with_native(options, |native| unsafe {
            (bindings.eos_presence_create_presence_modification)(
                self.handle.as_ptr(),
                native,
                &mut out,
            )
        })?;
        let code = ResultCode::from_raw(raw);
        tracing::debug!("EOS_Presence_CreatePresenceModification -> {code}");
        let modification = Owned::adopt(out, bindings).map(|owned| PresenceModification {
            owned,
            shared: Arc::clone(&self.shared),
        });
        Ok((code, modification))
    }

    /// Publish a modification. The modification can be released as soon as
    /// this returns.
    pub fn set_presence<F>(
        &self,
        options: &SetPresenceOptions,
        on_complete: F,
    ) -> Result<ClientData>
    where
        F: FnMut(&SetPresenceCallbackInfo) + Send + 'static,
    {
        let bindings = &self.shared.bindings;
        call_async::<_, SetPresenceCallbackInfo, _>(options, on_complete, |native, client_data| {
            unsafe {
                (bindings.eos_presence_set_presence)(
                    self.handle.as_ptr(),
                    native,
                    client_data,
                    trampoline::<SetPresenceCallbackInfo>,
                )
            }
        })
    }
}

/// Pending presence changes. Released when dropped.
#[derive(Debug)]
pub struct PresenceModification {
    owned: Owned<kinds::PresenceModification>,
    shared: Arc<Shared>,
}

impl PresenceModification {
    pub fn handle(&self) -> Handle<kinds::PresenceModification> {
        self.owned.handle()
    }

    pub fn set_raw_rich_text(
        &self,
        options: &PresenceModificationSetRawRichTextOptions,
    ) -> Result<ResultCode> {
        let raw = with_native(options, |native| unsafe {
            (self.shared.bindings.eos_presence_modification_set_raw_rich_text)(
                self.handle().as_ptr(),
                native,
            )
        })?;
        Ok(ResultCode::from_raw(raw))
    }

    pub fn release(self) {
        self.owned.release();
    }
}
