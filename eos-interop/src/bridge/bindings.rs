//! Function table for the native SDK entry points.
//!
//! [`Bindings::load`] resolves every symbol from the EOS shared library.
//! [`Bindings::unlinked`] builds a table whose entries log a warning and
//! report `NotImplemented` (or null / an invalid id); individual entries can
//! then be replaced, which is how hosts without the library and the tests
//! drive the API surface.

use std::ffi::c_void;
use std::fmt;

use libloading::Library;

use crate::error::{Error, Result};
use crate::interfaces::integrated_platform::{
    CreateIntegratedPlatformOptionsContainerOptionsInternal,
    IntegratedPlatformOptionsContainerAddOptionsInternal,
};
use crate::interfaces::kws::{
    AddNotifyPermissionsUpdateReceivedOptionsInternal, OnPermissionsUpdateReceivedCallback,
};
use crate::interfaces::lobby::{
    LobbyModificationAddAttributeOptionsInternal, LobbyModificationRemoveAttributeOptionsInternal,
    LobbyModificationSetMaxMembersOptionsInternal, UpdateLobbyModificationOptionsInternal,
};
use crate::interfaces::p2p::{
    AddNotifyPeerConnectionClosedOptionsInternal, OnRemoteConnectionClosedCallback,
};
use crate::interfaces::presence::{
    CreatePresenceModificationOptionsInternal, PresenceModificationSetRawRichTextOptionsInternal,
    SetPresenceCompleteCallback, SetPresenceOptionsInternal,
};
use crate::interfaces::ui::{
    AcknowledgeEventIdOptionsInternal, HideFriendsOptionsInternal, OnHideFriendsCallback,
};
use crate::interfaces::user_info::{OnQueryUserInfoCallback, QueryUserInfoOptionsInternal};
use crate::logging::LogMessageFunc;
use crate::platform::{InitializeOptionsInternal, PlatformOptionsInternal};
use crate::result::ResultCode;

fn not_implemented() -> i32 {
    ResultCode::NotImplemented.raw()
}

macro_rules! bindings {
    (
        $(
            $field:ident = $symbol:literal
                => fn($($arg:ident: $argty:ty),* $(,)?) $(-> $ret:ty)? { $fallback:expr };
        )+
    ) => {
        /// One function pointer per native entry point.
        #[derive(Clone, Copy)]
        pub struct Bindings {
            $(
                #[doc = concat!("`", $symbol, "`")]
                pub $field: unsafe extern "C" fn($($argty),*) $(-> $ret)?,
            )+
        }

        impl Bindings {
            /// Names of every symbol the table resolves.
            pub const SYMBOLS: &'static [&'static str] = &[$($symbol),+];

            /// Table with no native library behind it.
            pub fn unlinked() -> Self {
                $(
                    unsafe extern "C" fn $field($($arg: $argty),*) $(-> $ret)? {
                        let _ = ($($arg,)*);
                        tracing::warn!("{} called without a native SDK", $symbol);
                        $fallback
                    }
                )+
                Self { $( $field, )+ }
            }

            /// Resolve every entry point from a loaded EOS library.
            ///
            /// The returned table is only valid while `library` stays loaded.
            pub fn load(library: &Library) -> Result<Self> {
                Ok(Self {
                    $(
                        $field: unsafe {
                            *library
                                .get::<unsafe extern "C" fn($($argty),*) $(-> $ret)?>(
                                    concat!($symbol, "\0").as_bytes(),
                                )
                                .map_err(|source| Error::MissingSymbol {
                                    symbol: $symbol,
                                    source,
                                })?
                        },
                    )+
                })
            }
        }
    };
}

bindings! {
    eos_initialize = "EOS_Initialize"
        => fn(options: *const InitializeOptionsInternal) -> i32 { not_implemented() };
    eos_shutdown = "EOS_Shutdown"
        => fn() -> i32 { not_implemented() };

    eos_platform_create = "EOS_Platform_Create"
        => fn(options: *const PlatformOptionsInternal) -> *mut c_void { std::ptr::null_mut() };
    eos_platform_release = "EOS_Platform_Release"
        => fn(handle: *mut c_void) { () };
    eos_platform_tick = "EOS_Platform_Tick"
        => fn(handle: *mut c_void) { () };
    eos_platform_get_lobby_interface = "EOS_Platform_GetLobbyInterface"
        => fn(handle: *mut c_void) -> *mut c_void { std::ptr::null_mut() };
    eos_platform_get_ui_interface = "EOS_Platform_GetUIInterface"
        => fn(handle: *mut c_void) -> *mut c_void { std::ptr::null_mut() };
    eos_platform_get_user_info_interface = "EOS_Platform_GetUserInfoInterface"
        => fn(handle: *mut c_void) -> *mut c_void { std::ptr::null_mut() };
    eos_platform_get_presence_interface = "EOS_Platform_GetPresenceInterface"
        => fn(handle: *mut c_void) -> *mut c_void { std::ptr::null_mut() };
    eos_platform_get_p2p_interface = "EOS_Platform_GetP2PInterface"
        => fn(handle: *mut c_void) -> *mut c_void { std::ptr::null_mut() };
    eos_platform_get_kws_interface = "EOS_Platform_GetKWSInterface"
        => fn(handle: *mut c_void) -> *mut c_void { std::ptr::null_mut() };

    eos_lobby_update_lobby_modification = "EOS_Lobby_UpdateLobbyModification"
        => fn(
            handle: *mut c_void,
            options: *const UpdateLobbyModificationOptionsInternal,
            out_modification: *mut *mut c_void,
        ) -> i32 { not_implemented() };
    eos_lobby_modification_set_max_members = "EOS_LobbyModification_SetMaxMembers"
        => fn(
            handle: *mut c_void,
            options: *const LobbyModificationSetMaxMembersOptionsInternal,
        ) -> i32 { not_implemented() };
    eos_lobby_modification_add_attribute = "EOS_LobbyModification_AddAttribute"
        => fn(
            handle: *mut c_void,
            options: *const LobbyModificationAddAttributeOptionsInternal,
        ) -> i32 { not_implemented() };
    eos_lobby_modification_remove_attribute = "EOS_LobbyModification_RemoveAttribute"
        => fn(
            handle: *mut c_void,
            options: *const LobbyModificationRemoveAttributeOptionsInternal,
        ) -> i32 { not_implemented() };
    eos_lobby_modification_release = "EOS_LobbyModification_Release"
        => fn(handle: *mut c_void) { () };

    eos_ui_acknowledge_event_id = "EOS_UI_AcknowledgeEventId"
        => fn(handle: *mut c_void, options: *const AcknowledgeEventIdOptionsInternal) -> i32 {
            not_implemented()
        };
    eos_ui_hide_friends = "EOS_UI_HideFriends"
        => fn(
            handle: *mut c_void,
            options: *const HideFriendsOptionsInternal,
            client_data: *mut c_void,
            completion: OnHideFriendsCallback,
        ) { () };

    eos_user_info_query_user_info = "EOS_UserInfo_QueryUserInfo"
        => fn(
            handle: *mut c_void,
            options: *const QueryUserInfoOptionsInternal,
            client_data: *mut c_void,
            completion: OnQueryUserInfoCallback,
        ) { () };

    eos_presence_create_presence_modification = "EOS_Presence_CreatePresenceModification"
        => fn(
            handle: *mut c_void,
            options: *const CreatePresenceModificationOptionsInternal,
            out_modification: *mut *mut c_void,
        ) -> i32 { not_implemented() };
    eos_presence_modification_set_raw_rich_text = "EOS_PresenceModification_SetRawRichText"
        => fn(
            handle: *mut c_void,
            options: *const PresenceModificationSetRawRichTextOptionsInternal,
        ) -> i32 { not_implemented() };
    eos_presence_modification_release = "EOS_PresenceModification_Release"
        => fn(handle: *mut c_void) { () };
    eos_presence_set_presence = "EOS_Presence_SetPresence"
        => fn(
            handle: *mut c_void,
            options: *const SetPresenceOptionsInternal,
            client_data: *mut c_void,
            completion: SetPresenceCompleteCallback,
        ) { () };

    eos_p2p_add_notify_peer_connection_closed = "EOS_P2P_AddNotifyPeerConnectionClosed"
        => fn(
            handle: *mut c_void,
            options: *const AddNotifyPeerConnectionClosedOptionsInternal,
            client_data: *mut c_void,
            notification: OnRemoteConnectionClosedCallback,
        ) -> u64 { 0 };
    eos_p2p_remove_notify_peer_connection_closed = "EOS_P2P_RemoveNotifyPeerConnectionClosed"
        => fn(handle: *mut c_void, notification_id: u64) { () };

    eos_kws_add_notify_permissions_update_received = "EOS_KWS_AddNotifyPermissionsUpdateReceived"
        => fn(
            handle: *mut c_void,
            options: *const AddNotifyPermissionsUpdateReceivedOptionsInternal,
            client_data: *mut c_void,
            notification: OnPermissionsUpdateReceivedCallback,
        ) -> u64 { 0 };
    eos_kws_remove_notify_permissions_update_received =
        "EOS_KWS_RemoveNotifyPermissionsUpdateReceived"
        => fn(handle: *mut c_void, notification_id: u64) { () };

    eos_integrated_platform_create_options_container =
        "EOS_IntegratedPlatform_CreateIntegratedPlatformOptionsContainer"
        => fn(
            options: *const CreateIntegratedPlatformOptionsContainerOptionsInternal,
            out_container: *mut *mut c_void,
        ) -> i32 { not_implemented() };
    eos_integrated_platform_options_container_add = "EOS_IntegratedPlatformOptionsContainer_Add"
        => fn(
            handle: *mut c_void,
            options: *const IntegratedPlatformOptionsContainerAddOptionsInternal,
        ) -> i32 { not_implemented() };
    eos_integrated_platform_options_container_release =
        "EOS_IntegratedPlatformOptionsContainer_Release"
        => fn(handle: *mut c_void) { () };

    eos_logging_set_callback = "EOS_Logging_SetCallback"
        => fn(callback: LogMessageFunc) -> i32 { not_implemented() };
    eos_logging_set_log_level = "EOS_Logging_SetLogLevel"
        => fn(category: i32, level: i32) -> i32 { not_implemented() };
}

impl fmt::Debug for Bindings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bindings")
            .field("symbols", &Self::SYMBOLS.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unlinked_entries_report_not_implemented() {
        let bindings = Bindings::unlinked();
        let code = unsafe { (bindings.eos_shutdown)() };
        assert_eq!(ResultCode::from_raw(code), ResultCode::NotImplemented);

        let platform = unsafe { (bindings.eos_platform_create)(std::ptr::null()) };
        assert!(platform.is_null());

        let id = unsafe {
            (bindings.eos_p2p_remove_notify_peer_connection_closed)(std::ptr::null_mut(), 3);
            (bindings.eos_kws_add_notify_permissions_update_received)(
                std::ptr::null_mut(),
                std::ptr::null(),
                std::ptr::null_mut(),
                crate::bridge::callback::trampoline::<
                    crate::interfaces::kws::PermissionsUpdateReceivedCallbackInfo,
                >,
            )
        };
        assert_eq!(id, 0);
    }

    #[test]
    fn test_entries_can_be_overridden() {
        unsafe extern "C" fn shutdown() -> i32 {
            ResultCode::Success.raw()
        }

        let mut bindings = Bindings::unlinked();
        bindings.eos_shutdown = shutdown;
        assert_eq!(unsafe { (bindings.eos_shutdown)() }, 0);
    }

    #[test]
    fn test_symbol_names_are_unique() {
        let mut names = Bindings::SYMBOLS.to_vec();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), Bindings::SYMBOLS.len());
        assert!(names.iter().all(|name| name.starts_with("EOS_")));
    }
}
