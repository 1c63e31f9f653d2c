//! Integrated platform options containers, consumed by platform creation.

use std::ptr;
use std::sync::Arc;

use crate::error::Result;
use crate::handle::{kinds, Handle, Owned};
use crate::marshal::{Nested, Scalar, Text};
use crate::pair::{struct_pair, with_native};
use crate::platform::Shared;
use crate::result::ResultCode;

pub const CREATE_INTEGRATED_PLATFORM_OPTIONS_CONTAINER_API_LATEST: i32 = 1;
pub const INTEGRATED_PLATFORM_OPTIONS_CONTAINER_ADD_API_LATEST: i32 = 1;
pub const OPTIONS_API_LATEST: i32 = 1;
pub const STEAM_OPTIONS_API_LATEST: i32 = 2;

/// Platform type name for Steam.
pub const IPT_STEAM: &str = "STEAM";

/// Bits for [`IntegratedPlatformOptions::flags`].
pub mod management_flags {
    pub const DISABLED: u32 = 0x0001;
    pub const LIBRARY_MANAGED_BY_APPLICATION: u32 = 0x0002;
    pub const LIBRARY_MANAGED_BY_SDK: u32 = 0x0004;
    pub const DISABLE_PRESENCE_MIRRORING: u32 = 0x0008;
    pub const DISABLE_SDK_MANAGED_SESSIONS: u32 = 0x0010;
    pub const PREFER_EOS_IDENTITY: u32 = 0x0020;
    pub const PREFER_INTEGRATED_IDENTITY: u32 = 0x0040;
    pub const APPLICATION_MANAGED_IDENTITY_LOGIN: u32 = 0x0080;
}

struct_pair! {
    pub struct CreateIntegratedPlatformOptionsContainerOptions
        => CreateIntegratedPlatformOptionsContainerOptionsInternal
    {
        @version = CREATE_INTEGRATED_PLATFORM_OPTIONS_CONTAINER_API_LATEST;
    }
}

struct_pair! {
    /// Steam-specific initialization.
    pub struct SteamOptions => SteamOptionsInternal {
        @version = STEAM_OPTIONS_API_LATEST;
        /// Path to the Steam API library when the SDK loads it itself.
        override_library_path: Option<String> => Text,
        steam_major_version: u32 => Scalar,
        steam_minor_version: u32 => Scalar,
    }
}

struct_pair! {
    pub struct IntegratedPlatformOptions => IntegratedPlatformOptionsInternal {
        @version = OPTIONS_API_LATEST;
        /// One of the `IPT_*` names.
        platform_type: Option<String> => Text,
        flags: u32 => Scalar,
        init_options: Option<SteamOptions> => Nested,
    }
}

struct_pair! {
    pub struct IntegratedPlatformOptionsContainerAddOptions
        => IntegratedPlatformOptionsContainerAddOptionsInternal
    {
        @version = INTEGRATED_PLATFORM_OPTIONS_CONTAINER_ADD_API_LATEST;
        options: Option<IntegratedPlatformOptions> => Nested,
    }
}

/// Entry to the integrated platform functions, which need no interface
/// handle.
#[derive(Debug)]
pub struct IntegratedPlatform {
    shared: Arc<Shared>,
}

impl IntegratedPlatform {
    pub(crate) fn new(shared: Arc<Shared>) -> Self {
        Self { shared }
    }

    /// Create a container to fill with [`IntegratedPlatformOptionsContainer::add`]
    /// and pass to platform creation. Release it once the platform exists.
    pub fn create_integrated_platform_options_container(
        &self,
        options: &CreateIntegratedPlatformOptionsContainerOptions,
    ) -> Result<(ResultCode, Option<IntegratedPlatformOptionsContainer>)> {
        let bindings = &self.shared.bindings;
        let mut out = ptr::null_mut();
        let raw = with_native(options, |native| unsafe {
            (bindings.eos_integrated_platform_create_options_container)(native, &mut out)
        })?;
        let code = ResultCode::from_raw(raw);
        tracing::debug!(
            "EOS_IntegratedPlatform_CreateIntegratedPlatformOptionsContainer -> {code}"
        );
        let container = Owned::adopt(out, bindings).map(|owned| IntegratedPlatformOptionsContainer {
            owned,
            shared: Arc::clone(&self.shared),
        });
        Ok((code, container))
    }
}

/// Released when dropped.
#[derive(Debug)]
pub struct IntegratedPlatformOptionsContainer {
    owned: Owned<kinds::IntegratedPlatformOptionsContainer>,
    shared: Arc<Shared>,
}

impl IntegratedPlatformOptionsContainer {
    pub fn handle(&self) -> Handle<kinds::IntegratedPlatformOptionsContainer> {
        self.owned.handle()
    }

    pub fn add(
        &self,
        options: &IntegratedPlatformOptionsContainerAddOptions,
    ) -> Result<ResultCode> {
        let raw = with_native(options, |native| unsafe {
            (self.shared.bindings.eos_integrated_platform_options_container_add)(
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
