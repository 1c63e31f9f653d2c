//! Field codecs between public Rust values and native representations.
//!
//! Every codec that allocates in `encode` frees exactly that allocation in
//! `release`, resets the native field to its empty value, and does nothing
//! on an empty field. Allocations go through a tracked allocator so tests can
//! assert that a call leaves nothing behind.

use std::alloc::Layout;
use std::cell::Cell;
use std::ffi::{c_char, c_void, CStr};
use std::ptr::{self, NonNull};

use chrono::{DateTime, Utc};

use crate::bridge::callback::ClientData;
use crate::error::{Error, Result};
use crate::handle::{Handle, HandleKind};
use crate::pair::StructPair;
use crate::registry::HANDLES;

thread_local! {
    static LIVE_ALLOCATIONS: Cell<isize> = const { Cell::new(0) };
}

/// Native allocations made by the current thread that are still
/// outstanding.
pub fn live_allocations() -> isize {
    LIVE_ALLOCATIONS.with(Cell::get)
}

fn allocate(layout: Layout) -> Result<NonNull<u8>> {
    debug_assert!(layout.size() > 0);
    let raw = unsafe { std::alloc::alloc(layout) };
    let Some(ptr) = NonNull::new(raw) else {
        tracing::error!("native allocation of {} bytes failed", layout.size());
        return Err(Error::OutOfMemory {
            size: layout.size(),
        });
    };
    LIVE_ALLOCATIONS.with(|n| n.set(n.get() + 1));
    Ok(ptr)
}

unsafe fn deallocate(ptr: NonNull<u8>, layout: Layout) {
    unsafe { std::alloc::dealloc(ptr.as_ptr(), layout) };
    LIVE_ALLOCATIONS.with(|n| n.set(n.get() - 1));
}

/// Move a value into a fresh native allocation.
pub(crate) fn alloc_value<T>(value: T) -> Result<*mut T> {
    let ptr = allocate(Layout::new::<T>())?.cast::<T>().as_ptr();
    unsafe { ptr.write(value) };
    Ok(ptr)
}

/// Drop and free a value created by [`alloc_value`].
pub(crate) unsafe fn free_value<T>(ptr: *mut T) {
    unsafe {
        ptr::drop_in_place(ptr);
        deallocate(NonNull::new_unchecked(ptr.cast()), Layout::new::<T>());
    }
}

/// Copy text into a null-terminated UTF-8 native buffer.
///
/// # Panics
///
/// Panics if the text contains an interior NUL.
pub(crate) fn alloc_utf8(text: &str) -> Result<*mut c_char> {
    let bytes = text.as_bytes();
    assert!(
        !bytes.contains(&0),
        "text passed to native code contains an interior NUL: {text:?}"
    );
    let layout = Layout::array::<u8>(bytes.len() + 1).map_err(|_| Error::OutOfMemory {
        size: bytes.len() + 1,
    })?;
    let ptr = allocate(layout)?.as_ptr();
    unsafe {
        ptr::copy_nonoverlapping(bytes.as_ptr(), ptr, bytes.len());
        ptr.add(bytes.len()).write(0);
    }
    Ok(ptr.cast())
}

/// Free a buffer created by [`alloc_utf8`].
pub(crate) unsafe fn free_utf8(ptr: *mut c_char) {
    unsafe {
        let len = CStr::from_ptr(ptr).to_bytes().len();
        deallocate(
            NonNull::new_unchecked(ptr.cast()),
            Layout::from_size_align_unchecked(len + 1, 1),
        );
    }
}

/// Read a null-terminated UTF-8 string owned by someone else.
pub(crate) unsafe fn read_utf8(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    Some(unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned())
}

/// A Rust enum with a native `int32` representation.
pub trait NativeEnum: Copy {
    fn to_raw(self) -> i32;
    fn from_raw(raw: i32) -> Self;
}

/// Conversion between a public field of type `T` and its native slot.
pub trait Codec<T> {
    type Native;

    /// The zero value of the native slot.
    fn empty() -> Self::Native;

    fn encode(value: &T) -> Result<Self::Native>;

    /// # Safety
    ///
    /// Any pointer in `native` must be null or valid for reads.
    unsafe fn decode(native: &Self::Native) -> T;

    /// Free what `encode` allocated and reset the slot.
    fn release(native: &mut Self::Native);
}

/// Plain copy for scalars laid out identically on both sides.
pub struct Scalar;

impl<T: Copy + Default> Codec<T> for Scalar {
    type Native = T;

    fn empty() -> T {
        T::default()
    }

    fn encode(value: &T) -> Result<T> {
        Ok(*value)
    }

    unsafe fn decode(native: &T) -> T {
        *native
    }

    fn release(_native: &mut T) {}
}

/// `bool` as a 32-bit `EOS_Bool`.
pub struct Bool;

impl Codec<bool> for Bool {
    type Native = i32;

    fn empty() -> i32 {
        0
    }

    fn encode(value: &bool) -> Result<i32> {
        Ok(i32::from(*value))
    }

    unsafe fn decode(native: &i32) -> bool {
        *native != 0
    }

    fn release(_native: &mut i32) {}
}

/// Enumerations as their raw `int32` value.
pub struct Enum;

impl<T: NativeEnum> Codec<T> for Enum {
    type Native = i32;

    fn empty() -> i32 {
        0
    }

    fn encode(value: &T) -> Result<i32> {
        Ok(value.to_raw())
    }

    unsafe fn decode(native: &i32) -> T {
        T::from_raw(*native)
    }

    fn release(_native: &mut i32) {}
}

/// Optional text as a pointer to a null-terminated UTF-8 buffer.
///
/// `None` is a null pointer; `Some("")` is a pointer to a lone terminator.
pub struct Text;

impl Codec<Option<String>> for Text {
    type Native = *mut c_char;

    fn empty() -> *mut c_char {
        ptr::null_mut()
    }

    fn encode(value: &Option<String>) -> Result<*mut c_char> {
        match value {
            Some(text) => alloc_utf8(text),
            None => Ok(ptr::null_mut()),
        }
    }

    unsafe fn decode(native: &*mut c_char) -> Option<String> {
        unsafe { read_utf8(*native) }
    }

    fn release(native: &mut *mut c_char) {
        if !native.is_null() {
            unsafe { free_utf8(*native) };
            *native = ptr::null_mut();
        }
    }
}

/// Text stored inline in a fixed-size, NUL-padded byte array.
pub struct FixedText<const N: usize>;

impl<const N: usize> Codec<String> for FixedText<N> {
    type Native = [c_char; N];

    fn empty() -> [c_char; N] {
        [0; N]
    }

    /// # Panics
    ///
    /// Panics if the text (plus terminator) does not fit in `N` bytes or
    /// contains an interior NUL.
    fn encode(value: &String) -> Result<[c_char; N]> {
        let bytes = value.as_bytes();
        assert!(
            bytes.len() < N,
            "text of {} bytes does not fit a {N}-byte native buffer: {value:?}",
            bytes.len()
        );
        assert!(
            !bytes.contains(&0),
            "text passed to native code contains an interior NUL: {value:?}"
        );
        let mut out = [0 as c_char; N];
        for (slot, byte) in out.iter_mut().zip(bytes) {
            *slot = *byte as c_char;
        }
        Ok(out)
    }

    unsafe fn decode(native: &[c_char; N]) -> String {
        let bytes: Vec<u8> = native
            .iter()
            .take_while(|&&c| c != 0)
            .map(|&c| c as u8)
            .collect();
        String::from_utf8_lossy(&bytes).into_owned()
    }

    fn release(_native: &mut [c_char; N]) {}
}

/// An address owned by someone else, passed through untouched.
pub struct Address;

impl Codec<usize> for Address {
    type Native = *mut c_void;

    fn empty() -> *mut c_void {
        ptr::null_mut()
    }

    fn encode(value: &usize) -> Result<*mut c_void> {
        Ok(*value as *mut c_void)
    }

    unsafe fn decode(native: &*mut c_void) -> usize {
        *native as usize
    }

    fn release(_native: &mut *mut c_void) {}
}

/// Optional scalar as a nullable pointer to a native copy.
pub struct Boxed;

impl<T: Copy> Codec<Option<T>> for Boxed {
    type Native = *mut T;

    fn empty() -> *mut T {
        ptr::null_mut()
    }

    fn encode(value: &Option<T>) -> Result<*mut T> {
        match value {
            Some(v) => alloc_value(*v),
            None => Ok(ptr::null_mut()),
        }
    }

    unsafe fn decode(native: &*mut T) -> Option<T> {
        if native.is_null() {
            None
        } else {
            Some(unsafe { **native })
        }
    }

    fn release(native: &mut *mut T) {
        if !native.is_null() {
            unsafe { free_value(*native) };
            *native = ptr::null_mut();
        }
    }
}

/// Optional handle as its native pointer; resolved through [`HANDLES`].
///
/// The native object belongs to the SDK, so release frees nothing.
pub struct HandleRef;

impl<K: HandleKind> Codec<Option<Handle<K>>> for HandleRef {
    type Native = *mut c_void;

    fn empty() -> *mut c_void {
        ptr::null_mut()
    }

    /// # Panics
    ///
    /// Panics if the handle was released.
    fn encode(value: &Option<Handle<K>>) -> Result<*mut c_void> {
        Ok(match value {
            Some(handle) => HANDLES.raw(*handle),
            None => ptr::null_mut(),
        })
    }

    unsafe fn decode(native: &*mut c_void) -> Option<Handle<K>> {
        HANDLES.resolve(*native)
    }

    fn release(_native: &mut *mut c_void) {}
}

/// Client-data token carried as `void*`.
pub struct Token;

impl Codec<ClientData> for Token {
    type Native = *mut c_void;

    fn empty() -> *mut c_void {
        ptr::null_mut()
    }

    fn encode(value: &ClientData) -> Result<*mut c_void> {
        Ok(value.as_ptr())
    }

    unsafe fn decode(native: &*mut c_void) -> ClientData {
        ClientData::from_ptr(*native)
    }

    fn release(_native: &mut *mut c_void) {}
}

/// Optional nested structure as a pointer to its native form.
pub struct Nested;

impl<T: StructPair> Codec<Option<T>> for Nested {
    type Native = *mut T::Native;

    fn empty() -> *mut T::Native {
        ptr::null_mut()
    }

    fn encode(value: &Option<T>) -> Result<*mut T::Native> {
        match value {
            Some(v) => alloc_value(v.to_native()?),
            None => Ok(ptr::null_mut()),
        }
    }

    unsafe fn decode(native: &*mut T::Native) -> Option<T> {
        if native.is_null() {
            None
        } else {
            Some(unsafe { T::from_native(&**native) })
        }
    }

    fn release(native: &mut *mut T::Native) {
        if !native.is_null() {
            // Dropping the nested native struct releases its own fields.
            unsafe { free_value(*native) };
            *native = ptr::null_mut();
        }
    }
}

/// Nested structure embedded by value.
pub struct Inline;

impl<T: StructPair> Codec<T> for Inline {
    type Native = T::Native;

    fn empty() -> T::Native {
        T::Native::default()
    }

    fn encode(value: &T) -> Result<T::Native> {
        value.to_native()
    }

    unsafe fn decode(native: &T::Native) -> T {
        unsafe { T::from_native(native) }
    }

    fn release(native: &mut T::Native) {
        crate::pair::Dispose::dispose(native);
    }
}

/// Native "undefined" timestamp.
pub const UNDEFINED_TIMESTAMP: i64 = -1;

/// Optional point in time as whole unix seconds, `-1` when undefined.
///
/// Sub-second precision is truncated toward the earlier second on encode.
///
/// # Panics
///
/// Encoding `1969-12-31T23:59:59Z`, or any instant inside that second,
/// panics: it would land on the undefined value and decode as `None`.
pub struct Timestamp;

impl Codec<Option<DateTime<Utc>>> for Timestamp {
    type Native = i64;

    fn empty() -> i64 {
        UNDEFINED_TIMESTAMP
    }

    fn encode(value: &Option<DateTime<Utc>>) -> Result<i64> {
        let Some(time) = value else {
            return Ok(UNDEFINED_TIMESTAMP);
        };
        let seconds = time.timestamp();
        if seconds == UNDEFINED_TIMESTAMP {
            panic!("timestamp {time} collides with the undefined value");
        }
        Ok(seconds)
    }

    unsafe fn decode(native: &i64) -> Option<DateTime<Utc>> {
        if *native == UNDEFINED_TIMESTAMP {
            None
        } else {
            DateTime::from_timestamp(*native, 0)
        }
    }

    fn release(_native: &mut i64) {}
}
