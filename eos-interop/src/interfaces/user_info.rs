//! User info interface.

use std::sync::Arc;

use crate::bridge::callback::{trampoline, CallbackInfo, ClientData};
use crate::error::Result;
use crate::handle::{kinds, EpicAccountId, Handle};
use crate::interfaces::call_async;
use crate::marshal::{Enum, HandleRef, Token};
use crate::pair::struct_pair;
use crate::platform::Shared;
use crate::result::ResultCode;

pub const QUERY_USER_INFO_API_LATEST: i32 = 1;

pub type OnQueryUserInfoCallback = unsafe extern "C" fn(*const QueryUserInfoCallbackInfoInternal);

struct_pair! {
    pub struct QueryUserInfoOptions => QueryUserInfoOptionsInternal {
        @version = QUERY_USER_INFO_API_LATEST;
        local_user_id: Option<EpicAccountId> => HandleRef,
        target_user_id: Option<EpicAccountId> => HandleRef,
    }
}

struct_pair! {
    pub struct QueryUserInfoCallbackInfo => QueryUserInfoCallbackInfoInternal {
        result_code: ResultCode => Enum,
        client_data: ClientData => Token,
        local_user_id: Option<EpicAccountId> => HandleRef,
        target_user_id: Option<EpicAccountId> => HandleRef,
    }
}

impl CallbackInfo for QueryUserInfoCallbackInfo {
    fn client_data(&self) -> ClientData {
        self.client_data
    }

    fn result_code(&self) -> Option<ResultCode> {
        Some(self.result_code)
    }
}

#[derive(Debug)]
pub struct UserInfo {
    handle: Handle<kinds::UserInfo>,
    shared: Arc<Shared>,
}

impl UserInfo {
    pub(crate) fn new(handle: Handle<kinds::UserInfo>, shared: Arc<Shared>) -> Self {
        Self { handle, shared }
    }

    pub fn handle(&self) -> Handle<kinds::UserInfo> {
        self.handle
    }

    /// Fetch a user's info into the SDK cache.
    pub fn query_user_info<F>(
        &self,
        options: &QueryUserInfoOptions,
        on_complete: F,
    ) -> Result<ClientData>
    where
        F: FnMut(&QueryUserInfoCallbackInfo) + Send + 'static,
    {
        let bindings = &self.shared.bindings;
        call_async::<_, QueryUserInfoCallbackInfo, _>(options, on_complete, |native, client_data| {
            unsafe {
                (bindings.eos_user_info_query_user_info)(
                    self.handle.as_ptr(),
                    native,
                    client_data,
                    trampoline::<QueryUserInfoCallbackInfo>,
                )
            }
        })
    }
}
