//! Routing of native callbacks back to Rust closures.
//!
//! An asynchronous native call carries a [`ClientData`] token as `void*`.
//! The closure for that call is registered under the token beforehand; when
//! the SDK invokes [`trampoline`] from one of its threads, the callback info
//! is decoded, the token looked up and the closure run synchronously.

use std::any::{Any, TypeId};
use std::ffi::c_void;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use once_cell::sync::Lazy;
use parking_lot::Mutex;

use crate::pair::StructPair;
use crate::result::ResultCode;

/// Process-wide table used by [`trampoline`].
pub static CALLBACKS: Lazy<CallbackRegistry> = Lazy::new(CallbackRegistry::new);

/// Opaque token passed through native calls. Zero means "no client data".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ClientData(u64);

impl ClientData {
    pub const NONE: ClientData = ClientData(0);

    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }

    pub fn is_none(self) -> bool {
        self.0 == 0
    }

    pub(crate) fn as_ptr(self) -> *mut c_void {
        self.0 as usize as *mut c_void
    }

    pub(crate) fn from_ptr(ptr: *mut c_void) -> Self {
        Self(ptr as usize as u64)
    }
}

impl fmt::Display for ClientData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identifier returned by the native `AddNotify*` entry points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct NotificationId(u64);

impl NotificationId {
    /// Returned by the SDK when the subscription could not be made.
    pub const INVALID: NotificationId = NotificationId(0);

    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }

    pub fn is_valid(self) -> bool {
        self.0 != 0
    }
}

/// How long a registration stays in the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifetime {
    /// Removed after the callback that completes the operation.
    OneShot,
    /// Kept until removed explicitly (notifications).
    Persistent,
}

/// Callback info delivered by the SDK.
pub trait CallbackInfo: StructPair + 'static {
    fn client_data(&self) -> ClientData;

    /// Result carried by the info. Notifications carry none.
    fn result_code(&self) -> Option<ResultCode> {
        None
    }

    /// Whether no further callback follows for the same token.
    fn is_operation_complete(&self) -> bool {
        self.result_code()
            .map_or(true, ResultCode::is_operation_complete)
    }
}

type Handler = Arc<Mutex<Box<dyn FnMut(&dyn Any) + Send>>>;

struct Registration {
    lifetime: Lifetime,
    info: TypeId,
    info_name: &'static str,
    handler: Handler,
}

/// Concurrent token table.
pub struct CallbackRegistry {
    next: AtomicU64,
    entries: DashMap<ClientData, Registration>,
    notifications: DashMap<NotificationId, ClientData>,
}

impl Default for CallbackRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CallbackRegistry {
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
            entries: DashMap::new(),
            notifications: DashMap::new(),
        }
    }

    /// Store `handler` for callbacks of type `I` and return its token.
    pub fn register<I, F>(&self, lifetime: Lifetime, mut handler: F) -> ClientData
    where
        I: CallbackInfo,
        F: FnMut(&I) + Send + 'static,
    {
        let token = ClientData(self.next.fetch_add(1, Ordering::Relaxed));
        let erased = move |info: &dyn Any| {
            if let Some(info) = info.downcast_ref::<I>() {
                handler(info);
            }
        };
        self.entries.insert(
            token,
            Registration {
                lifetime,
                info: TypeId::of::<I>(),
                info_name: std::any::type_name::<I>(),
                handler: Arc::new(Mutex::new(Box::new(erased))),
            },
        );
        tracing::debug!("registered {lifetime:?} callback {token}");
        token
    }

    /// Drop a registration. Returns whether it existed.
    pub fn unregister(&self, token: ClientData) -> bool {
        let removed = self.entries.remove(&token).is_some();
        if removed {
            tracing::debug!("unregistered callback {token}");
        }
        removed
    }

    pub fn is_registered(&self, token: ClientData) -> bool {
        self.entries.contains_key(&token)
    }

    /// Number of registrations.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Associate a native notification id with the token it delivers to.
    pub fn bind_notification(&self, id: NotificationId, token: ClientData) {
        self.notifications.insert(id, token);
    }

    /// Forget a notification and its registration. Returns the token that
    /// was bound to it.
    pub fn remove_notification(&self, id: NotificationId) -> Option<ClientData> {
        let (_, token) = self.notifications.remove(&id)?;
        self.unregister(token);
        Some(token)
    }

    /// Token bound to a notification id.
    pub fn notification_token(&self, id: NotificationId) -> Option<ClientData> {
        self.notifications.get(&id).map(|entry| *entry)
    }

    /// Deliver `info` to the closure registered under its token.
    ///
    /// Returns whether a closure ran. Unknown tokens and type mismatches are
    /// dropped with a warning.
    pub fn dispatch<I: CallbackInfo>(&self, info: &I) -> bool {
        let token = info.client_data();
        let handler = {
            let Some(entry) = self.entries.get(&token) else {
                tracing::warn!(
                    "dropping {} for unknown callback {token}",
                    std::any::type_name::<I>()
                );
                return false;
            };
            if entry.info != TypeId::of::<I>() {
                tracing::warn!(
                    "dropping {} for callback {token} registered as {}",
                    std::any::type_name::<I>(),
                    entry.info_name
                );
                return false;
            }
            let one_shot_done =
                entry.lifetime == Lifetime::OneShot && info.is_operation_complete();
            let handler = Arc::clone(&entry.handler);
            drop(entry);
            // Only the thread that takes the entry out runs a final callback.
            if one_shot_done && self.entries.remove(&token).is_none() {
                return false;
            }
            handler
        };

        // Run without holding a shard lock so the closure may register or
        // unregister callbacks itself.
        let mut call = handler.lock();
        (*call)(info as &dyn Any);
        true
    }
}

/// Native entry point for callbacks whose info type is `I`.
///
/// Pass `trampoline::<I>` as the completion delegate of a native call. A
/// panicking closure is caught here and logged.
pub unsafe extern "C" fn trampoline<I: CallbackInfo>(native: *const I::Native) {
    if native.is_null() {
        tracing::warn!("{} delivered without data", std::any::type_name::<I>());
        return;
    }
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        let info = unsafe { I::from_native(&*native) };
        CALLBACKS.dispatch(&info)
    }));
    if let Err(payload) = outcome {
        tracing::error!(
            "callback for {} panicked: {}",
            std::any::type_name::<I>(),
            panic_message(&*payload)
        );
    }
}

/// Text of a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic".into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marshal::{Enum, Scalar, Token};
    use crate::pair::struct_pair;
    use std::sync::atomic::AtomicUsize;

    struct_pair! {
        pub struct PingInfo => PingInfoInternal {
            result_code: ResultCode => Enum,
            client_data: ClientData => Token,
            sequence: u32 => Scalar,
        }
    }

    impl CallbackInfo for PingInfo {
        fn client_data(&self) -> ClientData {
            self.client_data
        }

        fn result_code(&self) -> Option<ResultCode> {
            Some(self.result_code)
        }
    }

    struct_pair! {
        pub struct TickInfo => TickInfoInternal {
            client_data: ClientData => Token,
        }
    }

    impl CallbackInfo for TickInfo {
        fn client_data(&self) -> ClientData {
            self.client_data
        }
    }

    fn ping(token: ClientData, result_code: ResultCode, sequence: u32) -> PingInfo {
        PingInfo {
            result_code,
            client_data: token,
            sequence,
        }
    }

    #[test]
    fn test_client_data_pointer_round_trip() {
        let token = ClientData::from_raw(0xfeed);
        assert_eq!(ClientData::from_ptr(token.as_ptr()), token);
        assert!(ClientData::NONE.as_ptr().is_null());
        assert!(ClientData::from_ptr(std::ptr::null_mut()).is_none());
    }

    #[test]
    fn test_tokens_are_unique_and_nonzero() {
        let registry = CallbackRegistry::new();
        let a = registry.register::<PingInfo, _>(Lifetime::OneShot, |_| {});
        let b = registry.register::<PingInfo, _>(Lifetime::OneShot, |_| {});
        assert_ne!(a, b);
        assert!(!a.is_none());
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_one_shot_fires_once() {
        let registry = CallbackRegistry::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&hits);
        let token = registry.register(Lifetime::OneShot, move |info: &PingInfo| {
            assert_eq!(info.sequence, 1);
            seen.fetch_add(1, Ordering::SeqCst);
        });

        assert!(registry.dispatch(&ping(token, ResultCode::Success, 1)));
        assert!(!registry.is_registered(token));
        assert!(!registry.dispatch(&ping(token, ResultCode::Success, 1)));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_one_shot_survives_retry() {
        let registry = CallbackRegistry::new();
        let results = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&results);
        let token = registry.register(Lifetime::OneShot, move |info: &PingInfo| {
            sink.lock().push(info.result_code);
        });

        registry.dispatch(&ping(token, ResultCode::OperationWillRetry, 1));
        assert!(registry.is_registered(token));
        registry.dispatch(&ping(token, ResultCode::TimedOut, 2));
        assert!(!registry.is_registered(token));

        assert_eq!(
            *results.lock(),
            vec![ResultCode::OperationWillRetry, ResultCode::TimedOut]
        );
    }

    #[test]
    fn test_persistent_until_removed() {
        let registry = CallbackRegistry::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&hits);
        let token = registry.register(Lifetime::Persistent, move |_: &TickInfo| {
            seen.fetch_add(1, Ordering::SeqCst);
        });
        let id = NotificationId::from_raw(55);
        registry.bind_notification(id, token);
        assert_eq!(registry.notification_token(id), Some(token));

        for _ in 0..3 {
            registry.dispatch(&TickInfo { client_data: token });
        }
        assert_eq!(hits.load(Ordering::SeqCst), 3);

        assert_eq!(registry.remove_notification(id), Some(token));
        assert!(!registry.dispatch(&TickInfo { client_data: token }));
        assert_eq!(hits.load(Ordering::SeqCst), 3);
        assert_eq!(registry.remove_notification(id), None);
    }

    #[test]
    fn test_routes_only_to_matching_token() {
        let registry = CallbackRegistry::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        let sink = Arc::clone(&order);
        let first = registry.register(Lifetime::Persistent, move |info: &PingInfo| {
            sink.lock().push(("first", info.sequence));
        });
        let sink = Arc::clone(&order);
        let second = registry.register(Lifetime::Persistent, move |info: &PingInfo| {
            sink.lock().push(("second", info.sequence));
        });

        registry.dispatch(&ping(second, ResultCode::Success, 1));
        registry.dispatch(&ping(first, ResultCode::Success, 2));
        registry.dispatch(&ping(second, ResultCode::Success, 3));

        assert_eq!(
            *order.lock(),
            vec![("second", 1), ("first", 2), ("second", 3)]
        );
    }

    #[test]
    fn test_unknown_token_and_type_mismatch_are_dropped() {
        let registry = CallbackRegistry::new();
        assert!(!registry.dispatch(&ping(ClientData::from_raw(999), ResultCode::Success, 0)));

        let token = registry.register::<TickInfo, _>(Lifetime::Persistent, |_| {
            panic!("must not run for a ping");
        });
        assert!(!registry.dispatch(&ping(token, ResultCode::Success, 0)));
        assert!(registry.is_registered(token));
    }

    #[test]
    fn test_handler_may_reenter_registry() {
        let registry = Arc::new(CallbackRegistry::new());
        let inner = Arc::clone(&registry);
        let token = registry.register(Lifetime::OneShot, move |_: &PingInfo| {
            inner.register::<TickInfo, _>(Lifetime::OneShot, |_| {});
        });
        registry.dispatch(&ping(token, ResultCode::Success, 0));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_concurrent_register_dispatch_unregister() {
        let registry = CallbackRegistry::new();
        let one_shots: Vec<(ClientData, Arc<AtomicUsize>)> = (0..64)
            .map(|_| {
                let hits = Arc::new(AtomicUsize::new(0));
                let seen = Arc::clone(&hits);
                let token = registry.register(Lifetime::OneShot, move |_: &PingInfo| {
                    seen.fetch_add(1, Ordering::SeqCst);
                });
                (token, hits)
            })
            .collect();
        let ticks = Arc::new(AtomicUsize::new(0));
        let removed = Mutex::new(Vec::new());

        std::thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| {
                    for (token, _) in &one_shots {
                        registry.dispatch(&ping(*token, ResultCode::Success, 0));
                    }
                });
            }
            scope.spawn(|| {
                for _ in 0..200 {
                    let seen = Arc::clone(&ticks);
                    let token = registry.register(Lifetime::Persistent, move |_: &TickInfo| {
                        seen.fetch_add(1, Ordering::SeqCst);
                    });
                    assert!(registry.dispatch(&TickInfo { client_data: token }));
                    assert!(registry.unregister(token));
                    removed.lock().push(token);
                }
            });
            scope.spawn(|| {
                for _ in 0..200 {
                    let latest = removed.lock().last().copied();
                    if let Some(token) = latest {
                        assert!(!registry.dispatch(&TickInfo { client_data: token }));
                    }
                }
            });
        });

        for (token, hits) in &one_shots {
            assert_eq!(hits.load(Ordering::SeqCst), 1);
            assert!(!registry.is_registered(*token));
        }
        assert!(registry.is_empty());

        let settled = ticks.load(Ordering::SeqCst);
        assert_eq!(settled, 200);
        for token in removed.lock().iter() {
            assert!(!registry.dispatch(&TickInfo { client_data: *token }));
        }
        assert_eq!(ticks.load(Ordering::SeqCst), settled);
    }

    #[test]
    fn test_panic_message_text() {
        let borrowed: Box<dyn Any + Send> = Box::new("static text");
        assert_eq!(panic_message(&*borrowed), "static text");
        let owned: Box<dyn Any + Send> = Box::new(format!("code {}", 7));
        assert_eq!(panic_message(&*owned), "code 7");
        let other: Box<dyn Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(&*other), "non-string panic");
    }

    #[test]
    fn test_trampoline_decodes_and_dispatches() {
        let hits = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&hits);
        let token = CALLBACKS.register(Lifetime::OneShot, move |info: &PingInfo| {
            assert_eq!(info.result_code, ResultCode::NotFound);
            assert_eq!(info.sequence, 12);
            seen.fetch_add(1, Ordering::SeqCst);
        });

        let native = ping(token, ResultCode::NotFound, 12).to_native().unwrap();
        unsafe { trampoline::<PingInfo>(&native) };
        unsafe { trampoline::<PingInfo>(&native) };

        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(!CALLBACKS.is_registered(token));
    }

    #[test]
    fn test_trampoline_contains_panics() {
        let token = CALLBACKS.register::<TickInfo, _>(Lifetime::Persistent, |_| {
            panic!("handler failure");
        });
        let native = TickInfo { client_data: token }.to_native().unwrap();
        unsafe { trampoline::<TickInfo>(&native) };
        unsafe { trampoline::<TickInfo>(std::ptr::null()) };
        assert!(CALLBACKS.unregister(token));
    }
}
