//! Typed wrappers around native handles.
//!
//! A [`Handle`] is a borrowed, copyable view of a native object; it never
//! frees anything. An [`Owned`] handle wraps a reference-counted native
//! resource and calls the native release entry point when dropped.

use std::ffi::c_void;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

use crate::bridge::bindings::Bindings;
use crate::registry::HANDLES;

/// Native release entry point shared by every owned handle kind.
pub type ReleaseFn = unsafe extern "C" fn(handle: *mut c_void);

/// Type tag for a family of native handles.
pub trait HandleKind: 'static {
    /// Native type name, used in log and panic messages.
    const NAME: &'static str;
}

/// Handle kinds the caller must release explicitly.
pub trait Releasable: HandleKind {
    fn release_entry(bindings: &Bindings) -> ReleaseFn;
}

macro_rules! handle_kinds {
    ($( $(#[$meta:meta])* $kind:ident => $native:literal ),+ $(,)?) => {
        $(
            $(#[$meta])*
            #[derive(Debug)]
            pub enum $kind {}

            impl HandleKind for $kind {
                const NAME: &'static str = $native;
            }
        )+
    };
}

/// Uninhabited marker types, one per native handle family.
pub mod kinds {
    use super::HandleKind;

    handle_kinds! {
        EpicAccount => "EOS_EpicAccountId",
        ProductUser => "EOS_ProductUserId",
        Platform => "EOS_HPlatform",
        Lobby => "EOS_HLobby",
        LobbyModification => "EOS_HLobbyModification",
        Ui => "EOS_HUI",
        UserInfo => "EOS_HUserInfo",
        Presence => "EOS_HPresence",
        PresenceModification => "EOS_HPresenceModification",
        P2p => "EOS_HP2P",
        Kws => "EOS_HKWS",
        IntegratedPlatformOptionsContainer => "EOS_HIntegratedPlatformOptionsContainer",
    }
}

impl Releasable for kinds::Platform {
    fn release_entry(bindings: &Bindings) -> ReleaseFn {
        bindings.eos_platform_release
    }
}

impl Releasable for kinds::LobbyModification {
    fn release_entry(bindings: &Bindings) -> ReleaseFn {
        bindings.eos_lobby_modification_release
    }
}

impl Releasable for kinds::PresenceModification {
    fn release_entry(bindings: &Bindings) -> ReleaseFn {
        bindings.eos_presence_modification_release
    }
}

impl Releasable for kinds::IntegratedPlatformOptionsContainer {
    fn release_entry(bindings: &Bindings) -> ReleaseFn {
        bindings.eos_integrated_platform_options_container_release
    }
}

/// Epic account identity. Valid for the lifetime of the SDK.
pub type EpicAccountId = Handle<kinds::EpicAccount>;
/// Product user identity. Valid for the lifetime of the SDK.
pub type ProductUserId = Handle<kinds::ProductUser>;

/// Non-owning view of a native object.
///
/// Equality and hashing use the native identifier only, so two handles
/// resolved from the same pointer compare equal even after one of them has
/// been released.
pub struct Handle<K: HandleKind> {
    id: usize,
    slot: u32,
    generation: u32,
    _kind: PhantomData<fn() -> K>,
}

impl<K: HandleKind> Handle<K> {
    pub(crate) fn new(id: usize, slot: u32, generation: u32) -> Self {
        Self {
            id,
            slot,
            generation,
            _kind: PhantomData,
        }
    }

    /// Native identifier.
    pub fn id(&self) -> usize {
        self.id
    }

    pub(crate) fn slot(&self) -> u32 {
        self.slot
    }

    pub(crate) fn generation(&self) -> u32 {
        self.generation
    }

    /// Native pointer for passing back across the boundary.
    ///
    /// # Panics
    ///
    /// Panics if the handle has been released.
    pub fn as_ptr(&self) -> *mut c_void {
        HANDLES.raw(*self)
    }

    /// Whether the handle is still usable.
    pub fn is_live(&self) -> bool {
        HANDLES.is_live(*self)
    }
}

impl<K: HandleKind> Clone for Handle<K> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K: HandleKind> Copy for Handle<K> {}

impl<K: HandleKind> PartialEq for Handle<K> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<K: HandleKind> Eq for Handle<K> {}

impl<K: HandleKind> Hash for Handle<K> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl<K: HandleKind> fmt::Debug for Handle<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({:#x})", K::NAME, self.id)
    }
}

/// Owning wrapper for a native resource the caller must release.
///
/// Dropping it calls the native release entry point and invalidates every
/// [`Handle`] copy taken from it.
pub struct Owned<K: Releasable> {
    handle: Handle<K>,
    release: ReleaseFn,
}

impl<K: Releasable> Owned<K> {
    /// Take ownership of a pointer the native side just handed out.
    /// Returns `None` for null.
    pub(crate) fn adopt(raw: *mut c_void, bindings: &Bindings) -> Option<Self> {
        let handle = HANDLES.resolve::<K>(raw)?;
        tracing::debug!("adopted {:?}", handle);
        Some(Self {
            handle,
            release: K::release_entry(bindings),
        })
    }

    /// Borrowed view, valid until this wrapper is released.
    pub fn handle(&self) -> Handle<K> {
        self.handle
    }

    /// Release the native resource now.
    pub fn release(self) {
        drop(self);
    }
}

impl<K: Releasable> Drop for Owned<K> {
    fn drop(&mut self) {
        if !HANDLES.is_live(self.handle) {
            tracing::warn!("{:?} was already released", self.handle);
            return;
        }
        unsafe { (self.release)(HANDLES.raw(self.handle)) };
        HANDLES.release(self.handle);
        tracing::debug!("released {:?}", self.handle);
    }
}

impl<K: Releasable> fmt::Debug for Owned<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Owned").field(&self.handle).finish()
    }
}
