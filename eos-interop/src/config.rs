//! Per-platform JSON configuration, as written by the editor tooling.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::interfaces::integrated_platform::{
    management_flags, IntegratedPlatformOptions, SteamOptions, IPT_STEAM,
};
use crate::platform::{
    flags, ClientCredentials, InitializeOptions, InitializeThreadAffinity, PlatformOptions,
};

/// File name of the main configuration.
pub const CONFIG_FILE_NAME: &str = "EpicOnlineServicesConfig.json";
/// File name of the Steam integrated platform configuration.
pub const STEAM_CONFIG_FILE_NAME: &str = "eos_steam_config.json";

/// Bits for `auth_scope_flags`, passed to the auth interface at login.
pub mod auth_scope_flags {
    pub const NO_FLAGS: u32 = 0x0;
    pub const BASIC_PROFILE: u32 = 0x1;
    pub const FRIENDS_LIST: u32 = 0x2;
    pub const PRESENCE: u32 = 0x4;
    pub const FRIENDS_MANAGEMENT: u32 = 0x8;
    pub const EMAIL: u32 = 0x10;
    pub const COUNTRY: u32 = 0x20;
}

const PLATFORM_FLAG_NAMES: &[(&str, &str, u64)] = &[
    ("EOS_PF_NONE", "None", 0),
    ("EOS_PF_LOADING_IN_EDITOR", "LoadingInEditor", flags::LOADING_IN_EDITOR),
    ("EOS_PF_DISABLE_OVERLAY", "DisableOverlay", flags::DISABLE_OVERLAY),
    ("EOS_PF_DISABLE_SOCIAL_OVERLAY", "DisableSocialOverlay", flags::DISABLE_SOCIAL_OVERLAY),
    ("EOS_PF_RESERVED1", "Reserved1", flags::RESERVED1),
    (
        "EOS_PF_WINDOWS_ENABLE_OVERLAY_D3D9",
        "WindowsEnableOverlayD3D9",
        flags::WINDOWS_ENABLE_OVERLAY_D3D9,
    ),
    (
        "EOS_PF_WINDOWS_ENABLE_OVERLAY_D3D10",
        "WindowsEnableOverlayD3D10",
        flags::WINDOWS_ENABLE_OVERLAY_D3D10,
    ),
    (
        "EOS_PF_WINDOWS_ENABLE_OVERLAY_OPENGL",
        "WindowsEnableOverlayOpengl",
        flags::WINDOWS_ENABLE_OVERLAY_OPENGL,
    ),
    (
        "EOS_PF_CONSOLE_ENABLE_OVERLAY_AUTOMATIC_UNLOADING",
        "ConsoleEnableOverlayAutomaticUnloading",
        flags::CONSOLE_ENABLE_OVERLAY_AUTOMATIC_UNLOADING,
    ),
];

const AUTH_SCOPE_FLAG_NAMES: &[(&str, &str, u64)] = &[
    ("EOS_AS_NoFlags", "NoFlags", auth_scope_flags::NO_FLAGS as u64),
    ("EOS_AS_BasicProfile", "BasicProfile", auth_scope_flags::BASIC_PROFILE as u64),
    ("EOS_AS_FriendsList", "FriendsList", auth_scope_flags::FRIENDS_LIST as u64),
    ("EOS_AS_Presence", "Presence", auth_scope_flags::PRESENCE as u64),
    (
        "EOS_AS_FriendsManagement",
        "FriendsManagement",
        auth_scope_flags::FRIENDS_MANAGEMENT as u64,
    ),
    ("EOS_AS_Email", "Email", auth_scope_flags::EMAIL as u64),
    ("EOS_AS_Country", "Country", auth_scope_flags::COUNTRY as u64),
];

const MANAGEMENT_FLAG_NAMES: &[(&str, &str, u64)] = &[
    ("EOS_IPMF_Disabled", "Disabled", management_flags::DISABLED as u64),
    (
        "EOS_IPMF_LibraryManagedByApplication",
        "LibraryManagedByApplication",
        management_flags::LIBRARY_MANAGED_BY_APPLICATION as u64,
    ),
    (
        "EOS_IPMF_LibraryManagedBySDK",
        "LibraryManagedBySDK",
        management_flags::LIBRARY_MANAGED_BY_SDK as u64,
    ),
    (
        "EOS_IPMF_DisablePresenceMirroring",
        "DisablePresenceMirroring",
        management_flags::DISABLE_PRESENCE_MIRRORING as u64,
    ),
    (
        "EOS_IPMF_DisableSDKManagedSessions",
        "DisableSDKManagedSessions",
        management_flags::DISABLE_SDK_MANAGED_SESSIONS as u64,
    ),
    (
        "EOS_IPMF_PreferEOSIdentity",
        "PreferEOSIdentity",
        management_flags::PREFER_EOS_IDENTITY as u64,
    ),
    (
        "EOS_IPMF_PreferIntegratedIdentity",
        "PreferIntegratedIdentity",
        management_flags::PREFER_INTEGRATED_IDENTITY as u64,
    ),
    (
        "EOS_IPMF_ApplicationManagedIdentityLogin",
        "ApplicationManagedIdentityLogin",
        management_flags::APPLICATION_MANAGED_IDENTITY_LOGIN as u64,
    ),
];

/// OR together flag names. Each entry may itself hold several names
/// separated by `|`. Both the native and the managed spelling are accepted.
fn parse_flags(entries: &[String], table: &[(&str, &str, u64)], what: &str) -> Result<u64> {
    let mut bits = 0;
    for name in entries.iter().flat_map(|entry| entry.split('|')) {
        let name = name.trim();
        if name.is_empty() {
            continue;
        }
        let Some((_, _, value)) = table
            .iter()
            .find(|(native, managed, _)| *native == name || *managed == name)
        else {
            return Err(Error::Config(format!("unknown {what} flag {name:?}")));
        };
        bits |= value;
    }
    Ok(bits)
}

fn parse_affinity(field: &str, value: &str) -> Result<u64> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(0);
    }
    value
        .parse()
        .map_err(|_| Error::Config(format!("{field} is not an unsigned integer: {value:?}")))
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

/// Deployment to use instead of the default one when running in a given
/// sandbox.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxDeploymentOverride {
    #[serde(rename = "sandboxID")]
    pub sandbox_id: String,
    #[serde(rename = "deploymentID")]
    pub deployment_id: String,
}

/// Contents of [`CONFIG_FILE_NAME`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EosConfig {
    #[serde(rename = "productName")]
    pub product_name: String,
    #[serde(rename = "productVersion")]
    pub product_version: String,
    #[serde(rename = "productID")]
    pub product_id: String,
    #[serde(rename = "sandboxID")]
    pub sandbox_id: String,
    #[serde(rename = "deploymentID")]
    pub deployment_id: String,
    #[serde(rename = "sandboxDeploymentOverrides")]
    pub sandbox_deployment_overrides: Vec<SandboxDeploymentOverride>,
    #[serde(rename = "clientID")]
    pub client_id: String,
    #[serde(rename = "clientSecret")]
    pub client_secret: String,
    #[serde(rename = "encryptionKey")]
    pub encryption_key: String,
    #[serde(rename = "platformOptionsFlags")]
    pub platform_options_flags: Vec<String>,
    #[serde(rename = "authScopeOptionsFlags")]
    pub auth_scope_options_flags: Vec<String>,
    #[serde(rename = "tickBudgetInMilliseconds")]
    pub tick_budget_in_milliseconds: u32,
    #[serde(rename = "ThreadAffinity_networkWork")]
    pub thread_affinity_network_work: String,
    #[serde(rename = "ThreadAffinity_storageIO")]
    pub thread_affinity_storage_io: String,
    #[serde(rename = "ThreadAffinity_webSocketIO")]
    pub thread_affinity_web_socket_io: String,
    #[serde(rename = "ThreadAffinity_P2PIO")]
    pub thread_affinity_p2p_io: String,
    #[serde(rename = "ThreadAffinity_HTTPRequestIO")]
    pub thread_affinity_http_request_io: String,
    #[serde(rename = "ThreadAffinity_RTCIO")]
    pub thread_affinity_rtc_io: String,
    #[serde(rename = "isServer")]
    pub is_server: bool,
    #[serde(rename = "alwaysSendInputToOverlay")]
    pub always_send_input_to_overlay: bool,
}

impl EosConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let config = Self::from_json(&text)?;
        tracing::debug!("loaded EOS config for {:?} from {}", config.product_name, path.display());
        Ok(config)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json(&self, pretty: bool) -> Result<String> {
        Ok(if pretty {
            serde_json::to_string_pretty(self)?
        } else {
            serde_json::to_string(self)?
        })
    }

    pub fn write(&self, path: impl AsRef<Path>, pretty: bool) -> Result<()> {
        fs::write(path, self.to_json(pretty)?)?;
        Ok(())
    }

    /// Empty, or exactly 64 hex digits.
    pub fn is_encryption_key_valid(&self) -> bool {
        self.encryption_key.is_empty()
            || (self.encryption_key.len() == 64
                && self.encryption_key.chars().all(|c| c.is_ascii_hexdigit()))
    }

    /// Check everything platform creation needs.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("productName", &self.product_name),
            ("productID", &self.product_id),
            ("sandboxID", &self.sandbox_id),
            ("deploymentID", &self.deployment_id),
            ("clientID", &self.client_id),
            ("clientSecret", &self.client_secret),
        ] {
            if value.trim().is_empty() {
                return Err(Error::Config(format!("{name} is required")));
            }
        }
        if !self.is_encryption_key_valid() {
            return Err(Error::Config(format!(
                "encryptionKey must be 64 hex characters, got {}",
                self.encryption_key.len()
            )));
        }
        self.platform_flags()?;
        self.auth_scope_flags()?;
        self.thread_affinity()?;
        Ok(())
    }

    /// The deployment for the configured sandbox, honouring overrides.
    pub fn effective_deployment_id(&self) -> &str {
        self.sandbox_deployment_overrides
            .iter()
            .find(|o| o.sandbox_id == self.sandbox_id && !o.deployment_id.is_empty())
            .map_or(self.deployment_id.as_str(), |o| o.deployment_id.as_str())
    }

    pub fn platform_flags(&self) -> Result<u64> {
        parse_flags(&self.platform_options_flags, PLATFORM_FLAG_NAMES, "platform")
    }

    pub fn auth_scope_flags(&self) -> Result<u32> {
        let bits =
            parse_flags(&self.auth_scope_options_flags, AUTH_SCOPE_FLAG_NAMES, "auth scope")?;
        Ok(bits as u32)
    }

    /// `None` when no affinity is configured.
    pub fn thread_affinity(&self) -> Result<Option<InitializeThreadAffinity>> {
        let affinity = InitializeThreadAffinity {
            network_work: parse_affinity(
                "ThreadAffinity_networkWork",
                &self.thread_affinity_network_work,
            )?,
            storage_io: parse_affinity(
                "ThreadAffinity_storageIO",
                &self.thread_affinity_storage_io,
            )?,
            web_socket_io: parse_affinity(
                "ThreadAffinity_webSocketIO",
                &self.thread_affinity_web_socket_io,
            )?,
            p2p_io: parse_affinity("ThreadAffinity_P2PIO", &self.thread_affinity_p2p_io)?,
            http_request_io: parse_affinity(
                "ThreadAffinity_HTTPRequestIO",
                &self.thread_affinity_http_request_io,
            )?,
            rtc_io: parse_affinity("ThreadAffinity_RTCIO", &self.thread_affinity_rtc_io)?,
        };
        Ok((affinity != InitializeThreadAffinity::default()).then_some(affinity))
    }

    pub fn initialize_options(&self) -> Result<InitializeOptions> {
        Ok(InitializeOptions {
            product_name: non_empty(&self.product_name),
            product_version: non_empty(&self.product_version),
            override_thread_affinity: self.thread_affinity()?,
            ..Default::default()
        })
    }

    pub fn platform_options(&self) -> Result<PlatformOptions> {
        self.validate()?;
        Ok(PlatformOptions {
            product_id: non_empty(&self.product_id),
            sandbox_id: non_empty(&self.sandbox_id),
            deployment_id: non_empty(self.effective_deployment_id()),
            client_credentials: ClientCredentials {
                client_id: non_empty(&self.client_id),
                client_secret: non_empty(&self.client_secret),
            },
            is_server: self.is_server,
            encryption_key: non_empty(&self.encryption_key),
            flags: self.platform_flags()?,
            tick_budget_in_milliseconds: self.tick_budget_in_milliseconds,
            ..Default::default()
        })
    }
}

/// Contents of [`STEAM_CONFIG_FILE_NAME`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SteamConfig {
    pub flags: Vec<String>,
    #[serde(rename = "overrideLibraryPath")]
    pub override_library_path: String,
    #[serde(rename = "steamSDKMajorVersion")]
    pub steam_sdk_major_version: u32,
    #[serde(rename = "steamSDKMinorVersion")]
    pub steam_sdk_minor_version: u32,
}

impl SteamConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn management_flags(&self) -> Result<u32> {
        let bits = parse_flags(&self.flags, MANAGEMENT_FLAG_NAMES, "integrated platform")?;
        Ok(bits as u32)
    }

    /// Options to add to an integrated platform options container.
    pub fn integrated_platform_options(&self) -> Result<IntegratedPlatformOptions> {
        Ok(IntegratedPlatformOptions {
            platform_type: Some(IPT_STEAM.to_string()),
            flags: self.management_flags()?,
            init_options: Some(SteamOptions {
                override_library_path: non_empty(&self.override_library_path),
                steam_major_version: self.steam_sdk_major_version,
                steam_minor_version: self.steam_sdk_minor_version,
            }),
        })
    }
}
