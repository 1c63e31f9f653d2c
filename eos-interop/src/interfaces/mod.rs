//! Per-interface API surfaces.
//!
//! Every method follows the same shape: encode the options, call the native
//! entry point, let the native options drop, resolve any output handle and
//! hand back the native result code unchanged. Asynchronous methods register
//! their closure first and take it back out if encoding fails.

pub mod integrated_platform;
pub mod kws;
pub mod lobby;
pub mod p2p;
pub mod presence;
pub mod ui;
pub mod user_info;

use std::ffi::c_void;

use crate::bridge::callback::{CallbackInfo, ClientData, Lifetime, NotificationId, CALLBACKS};
use crate::error::Result;
use crate::pair::{with_native, StructPair};

/// Start an asynchronous call whose completion is delivered as `I`.
pub(crate) fn call_async<O, I, F>(
    options: &O,
    handler: F,
    call: impl FnOnce(&O::Native, *mut c_void),
) -> Result<ClientData>
where
    O: StructPair,
    I: CallbackInfo,
    F: FnMut(&I) + Send + 'static,
{
    let token = CALLBACKS.register::<I, F>(Lifetime::OneShot, handler);
    if let Err(err) = with_native(options, |native| call(native, token.as_ptr())) {
        CALLBACKS.unregister(token);
        return Err(err);
    }
    Ok(token)
}

/// Subscribe to a notification delivered as `I`.
///
/// An invalid id from the SDK is returned as is, with nothing left
/// registered.
pub(crate) fn add_notify<O, I, F>(
    options: &O,
    handler: F,
    call: impl FnOnce(&O::Native, *mut c_void) -> u64,
) -> Result<NotificationId>
where
    O: StructPair,
    I: CallbackInfo,
    F: FnMut(&I) + Send + 'static,
{
    let token = CALLBACKS.register::<I, F>(Lifetime::Persistent, handler);
    let raw = match with_native(options, |native| call(native, token.as_ptr())) {
        Ok(raw) => raw,
        Err(err) => {
            CALLBACKS.unregister(token);
            return Err(err);
        }
    };
    let id = NotificationId::from_raw(raw);
    if !id.is_valid() {
        tracing::warn!("subscription for {} was refused", std::any::type_name::<I>());
        CALLBACKS.unregister(token);
        return Ok(id);
    }
    CALLBACKS.bind_notification(id, token);
    tracing::debug!("notification {} bound to callback {token}", id.raw());
    Ok(id)
}

/// Unsubscribe on the native side, then drop the registration.
pub(crate) fn remove_notify(id: NotificationId, call: impl FnOnce(u64)) {
    call(id.raw());
    if CALLBACKS.remove_notification(id).is_none() {
        tracing::warn!("notification {} was not registered", id.raw());
    }
}
