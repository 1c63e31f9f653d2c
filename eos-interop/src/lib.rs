//! Interop layer between Rust game code and the Epic Online Services native SDK.
//!
//! Native handles are wrapped as typed [`Handle`]s resolved through a global
//! registry. Every option and callback-info structure exists twice: a public
//! Rust struct and a `#[repr(C)]` native counterpart built by the
//! [`pair::StructPair`] conversion. Completion and notification callbacks
//! enter through [`bridge::callback::trampoline`] and are routed back to the
//! closure registered under their client-data token.

pub mod bridge;
pub mod config;
pub mod error;
pub mod handle;
pub mod interfaces;
pub mod logging;
pub mod marshal;
pub mod pair;
pub mod platform;
pub mod registry;
pub mod result;

pub use bridge::bindings::Bindings;
pub use bridge::callback::{CallbackInfo, ClientData, Lifetime, NotificationId, CALLBACKS};
pub use config::{EosConfig, SteamConfig};
pub use error::{Error, Result};
pub use handle::{EpicAccountId, Handle, Owned, ProductUserId};
pub use marshal::NativeEnum;
pub use pair::StructPair;
pub use platform::{Platform, Sdk};
pub use registry::HANDLES;
pub use result::ResultCode;
