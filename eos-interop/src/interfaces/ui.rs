//! Social overlay interface.

use std::sync::Arc;

use crate::bridge::callback::{trampoline, CallbackInfo, ClientData};
use crate::error::Result;
use crate::handle::{kinds, EpicAccountId, Handle};
use crate::interfaces::call_async;
use crate::marshal::{Enum, HandleRef, Scalar, Token};
use crate::pair::{struct_pair, with_native};
use crate::platform::Shared;
use crate::result::ResultCode;

pub const ACKNOWLEDGE_EVENT_ID_API_LATEST: i32 = 1;
pub const HIDE_FRIENDS_API_LATEST: i32 = 1;

pub type OnHideFriendsCallback = unsafe extern "C" fn(*const HideFriendsCallbackInfoInternal);

struct_pair! {
    /// Tells the SDK the game has handled a UI event.
    pub struct AcknowledgeEventIdOptions => AcknowledgeEventIdOptionsInternal {
        @version = ACKNOWLEDGE_EVENT_ID_API_LATEST;
        ui_event_id: u64 => Scalar,
        /// Outcome of handling the event.
        result: ResultCode => Enum,
    }
}

struct_pair! {
    pub struct HideFriendsOptions => HideFriendsOptionsInternal {
        @version = HIDE_FRIENDS_API_LATEST;
        local_user_id: Option<EpicAccountId> => HandleRef,
    }
}

struct_pair! {
    pub struct HideFriendsCallbackInfo => HideFriendsCallbackInfoInternal {
        result_code: ResultCode => Enum,
        client_data: ClientData => Token,
        local_user_id: Option<EpicAccountId> => HandleRef,
    }
}

impl CallbackInfo for HideFriendsCallbackInfo {
    fn client_data(&self) -> ClientData {
        self.client_data
    }

    fn result_code(&self) -> Option<ResultCode> {
        Some(self.result_code)
    }
}

#[derive(Debug)]
pub struct Ui {
    handle: Handle<kinds::Ui>,
    shared: Arc<Shared>,
}

impl Ui {
    pub(crate) fn new(handle: Handle<kinds::Ui>, shared: Arc<Shared>) -> Self {
        Self { handle, shared }
    }

    pub fn handle(&self) -> Handle<kinds::Ui> {
        self.handle
    }

    pub fn acknowledge_event_id(&self, options: &AcknowledgeEventIdOptions) -> Result<ResultCode> {
        let raw = with_native(options, |native| unsafe {
            (self.shared.bindings.eos_ui_acknowledge_event_id)(self.handle.as_ptr(), native)
        })?;
        Ok(ResultCode::from_raw(raw))
    }

    /// Hide the friends overlay. `on_complete` runs once the SDK reports back.
    pub fn hide_friends<F>(
        &self,
        options: &HideFriendsOptions,
        on_complete: F,
    ) -> Result<ClientData>
    where
        F: FnMut(&HideFriendsCallbackInfo) + Send + 'static,
    {
        let bindings = &self.shared.bindings;
        call_async::<_, HideFriendsCallbackInfo, _>(options, on_complete, |native, client_data| {
            unsafe {
                (bindings.eos_ui_hide_friends)(
                    self.handle.as_ptr(),
                    native,
                    client_data,
                    trampoline::<HideFriendsCallbackInfo>,
                )
            }
        })
    }
}
