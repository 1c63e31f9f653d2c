//! SDK lifetime and the platform instance.

use std::ffi::OsStr;
use std::sync::Arc;

use libloading::Library;

use crate::bridge::bindings::Bindings;
use crate::error::Result;
use crate::handle::{kinds, Handle, HandleKind, Owned};
use crate::interfaces::integrated_platform::IntegratedPlatform;
use crate::interfaces::kws::Kws;
use crate::interfaces::lobby::Lobby;
use crate::interfaces::p2p::P2p;
use crate::interfaces::presence::Presence;
use crate::interfaces::ui::Ui;
use crate::interfaces::user_info::UserInfo;
use crate::logging::Logging;
use crate::marshal::{Address, Bool, Boxed, Enum, HandleRef, Inline, Nested, Scalar, Text};
use crate::pair::{struct_pair, with_native};
use crate::registry::HANDLES;
use crate::result::{native_enum, ResultCode};

pub const INITIALIZE_API_LATEST: i32 = 4;
pub const INITIALIZE_THREAD_AFFINITY_API_LATEST: i32 = 3;
pub const PLATFORM_OPTIONS_API_LATEST: i32 = 14;
pub const RTC_OPTIONS_API_LATEST: i32 = 2;

/// Bits for [`PlatformOptions::flags`].
pub mod flags {
    pub const LOADING_IN_EDITOR: u64 = 0x0001;
    pub const DISABLE_OVERLAY: u64 = 0x0002;
    pub const DISABLE_SOCIAL_OVERLAY: u64 = 0x0004;
    pub const RESERVED1: u64 = 0x0008;
    pub const WINDOWS_ENABLE_OVERLAY_D3D9: u64 = 0x0010;
    pub const WINDOWS_ENABLE_OVERLAY_D3D10: u64 = 0x0020;
    pub const WINDOWS_ENABLE_OVERLAY_OPENGL: u64 = 0x0040;
    pub const CONSOLE_ENABLE_OVERLAY_AUTOMATIC_UNLOADING: u64 = 0x0080;
}

struct_pair! {
    /// Per-thread-kind CPU affinity masks for the SDK's worker threads.
    pub struct InitializeThreadAffinity => InitializeThreadAffinityInternal {
        @version = INITIALIZE_THREAD_AFFINITY_API_LATEST;
        network_work: u64 => Scalar,
        storage_io: u64 => Scalar,
        web_socket_io: u64 => Scalar,
        p2p_io: u64 => Scalar,
        http_request_io: u64 => Scalar,
        rtc_io: u64 => Scalar,
    }
}

struct_pair! {
    /// Input to [`Sdk::initialize`].
    pub struct InitializeOptions => InitializeOptionsInternal {
        @version = INITIALIZE_API_LATEST;
        /// Custom allocator entry points; zero selects the SDK's own.
        allocate_memory_function: usize => Address,
        reallocate_memory_function: usize => Address,
        release_memory_function: usize => Address,
        product_name: Option<String> => Text,
        product_version: Option<String> => Text,
        reserved: usize => Address,
        system_initialize_options: usize => Address,
        override_thread_affinity: Option<InitializeThreadAffinity> => Nested,
    }
}

struct_pair! {
    pub struct ClientCredentials => ClientCredentialsInternal {
        client_id: Option<String> => Text,
        client_secret: Option<String> => Text,
    }
}

native_enum! {
    pub enum RtcBackgroundMode {
        LeaveRooms = 0,
        KeepRoomsAlive = 1,
    }
}

struct_pair! {
    pub struct RtcOptions => RtcOptionsInternal {
        @version = RTC_OPTIONS_API_LATEST;
        platform_specific_options: usize => Address,
        background_mode: RtcBackgroundMode => Enum,
    }
}

struct_pair! {
    /// Input to [`Sdk::create_platform`].
    pub struct PlatformOptions => PlatformOptionsInternal {
        @version = PLATFORM_OPTIONS_API_LATEST;
        reserved: usize => Address,
        product_id: Option<String> => Text,
        sandbox_id: Option<String> => Text,
        client_credentials: ClientCredentials => Inline,
        is_server: bool => Bool,
        /// 64 hex characters, or `None` when storage encryption is unused.
        encryption_key: Option<String> => Text,
        override_country_code: Option<String> => Text,
        override_locale_code: Option<String> => Text,
        deployment_id: Option<String> => Text,
        flags: u64 => Scalar,
        cache_directory: Option<String> => Text,
        tick_budget_in_milliseconds: u32 => Scalar,
        /// `None` disables the real-time communication interfaces.
        rtc_options: Option<RtcOptions> => Nested,
        integrated_platform_options_container_handle:
            Option<Handle<kinds::IntegratedPlatformOptionsContainer>> => HandleRef,
        system_specific_options: usize => Address,
        task_network_timeout_seconds: Option<f64> => Boxed,
    }
}

/// Loaded entry points, shared by every object created from one [`Sdk`].
pub(crate) struct Shared {
    pub(crate) bindings: Bindings,
    _library: Option<Library>,
}

/// Entry to the native SDK.
#[derive(Clone)]
pub struct Sdk {
    shared: Arc<Shared>,
}

impl Sdk {
    /// Load the EOS shared library at `path` and resolve its entry points.
    pub fn load(path: impl AsRef<OsStr>) -> Result<Self> {
        let path = path.as_ref();
        let library = unsafe { Library::new(path) }?;
        let bindings = Bindings::load(&library)?;
        tracing::info!("loaded EOS SDK from {}", path.to_string_lossy());
        Ok(Self {
            shared: Arc::new(Shared {
                bindings,
                _library: Some(library),
            }),
        })
    }

    /// Use an explicit entry-point table.
    pub fn with_bindings(bindings: Bindings) -> Self {
        Self {
            shared: Arc::new(Shared {
                bindings,
                _library: None,
            }),
        }
    }

    pub fn bindings(&self) -> &Bindings {
        &self.shared.bindings
    }

    pub fn initialize(&self, options: &InitializeOptions) -> Result<ResultCode> {
        let raw = with_native(options, |native| unsafe {
            (self.shared.bindings.eos_initialize)(native)
        })?;
        let code = ResultCode::from_raw(raw);
        tracing::debug!("EOS_Initialize -> {code}");
        Ok(code)
    }

    pub fn shutdown(&self) -> ResultCode {
        let code = ResultCode::from_raw(unsafe { (self.shared.bindings.eos_shutdown)() });
        tracing::debug!("EOS_Shutdown -> {code}");
        code
    }

    /// Create a platform instance. `None` when the SDK refuses the options.
    pub fn create_platform(&self, options: &PlatformOptions) -> Result<Option<Platform>> {
        let raw = with_native(options, |native| unsafe {
            (self.shared.bindings.eos_platform_create)(native)
        })?;
        let Some(owned) = Owned::adopt(raw, &self.shared.bindings) else {
            tracing::warn!("EOS_Platform_Create returned no platform");
            return Ok(None);
        };
        Ok(Some(Platform {
            owned,
            shared: Arc::clone(&self.shared),
        }))
    }

    pub fn integrated_platform(&self) -> IntegratedPlatform {
        IntegratedPlatform::new(Arc::clone(&self.shared))
    }

    pub fn logging(&self) -> Logging {
        Logging::new(Arc::clone(&self.shared))
    }
}

impl std::fmt::Debug for Sdk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sdk")
            .field("linked", &self.shared._library.is_some())
            .finish()
    }
}

/// A platform instance. Released when dropped.
#[derive(Debug)]
pub struct Platform {
    owned: Owned<kinds::Platform>,
    shared: Arc<Shared>,
}

impl std::fmt::Debug for Shared {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.bindings.fmt(f)
    }
}

impl Platform {
    pub fn handle(&self) -> Handle<kinds::Platform> {
        self.owned.handle()
    }

    /// Let the SDK run pending work and deliver callbacks.
    pub fn tick(&self) {
        unsafe { (self.shared.bindings.eos_platform_tick)(self.handle().as_ptr()) }
    }

    fn interface<K: HandleKind>(
        &self,
        get: unsafe extern "C" fn(*mut std::ffi::c_void) -> *mut std::ffi::c_void,
    ) -> Option<Handle<K>> {
        let raw = unsafe { get(self.handle().as_ptr()) };
        let handle = HANDLES.resolve::<K>(raw);
        if handle.is_none() {
            tracing::warn!("platform has no {} interface", K::NAME);
        }
        handle
    }

    pub fn lobby(&self) -> Option<Lobby> {
        let handle = self.interface(self.shared.bindings.eos_platform_get_lobby_interface)?;
        Some(Lobby::new(handle, Arc::clone(&self.shared)))
    }

    pub fn ui(&self) -> Option<Ui> {
        let handle = self.interface(self.shared.bindings.eos_platform_get_ui_interface)?;
        Some(Ui::new(handle, Arc::clone(&self.shared)))
    }

    pub fn user_info(&self) -> Option<UserInfo> {
        let handle = self.interface(self.shared.bindings.eos_platform_get_user_info_interface)?;
        Some(UserInfo::new(handle, Arc::clone(&self.shared)))
    }

    pub fn presence(&self) -> Option<Presence> {
        let handle = self.interface(self.shared.bindings.eos_platform_get_presence_interface)?;
        Some(Presence::new(handle, Arc::clone(&self.shared)))
    }

    pub fn p2p(&self) -> Option<P2p> {
        let handle = self.interface(self.shared.bindings.eos_platform_get_p2p_interface)?;
        Some(P2p::new(handle, Arc::clone(&self.shared)))
    }

    pub fn kws(&self) -> Option<Kws> {
        let handle = self.interface(self.shared.bindings.eos_platform_get_kws_interface)?;
        Some(Kws::new(handle, Arc::clone(&self.shared)))
    }

    /// Release the platform now instead of at drop.
    pub fn release(self) {
        self.owned.release();
    }
}
