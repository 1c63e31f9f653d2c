//! Shared helpers for driving the API surface against stand-in native entry
//! points.

#![allow(dead_code)]

use std::ffi::c_void;

use eos_interop::StructPair;

/// Fake native pointer. Each test uses its own range so that concurrently
/// running tests never share registry entries.
pub fn fake(addr: usize) -> *mut c_void {
    addr as *mut c_void
}

/// Invoke a native completion or notification delegate the way the SDK
/// would: with a pointer to a short-lived native info structure.
pub fn deliver<I: StructPair>(callback: unsafe extern "C" fn(*const I::Native), info: &I) {
    let native = info.to_native().unwrap();
    unsafe { callback(&native) };
}
