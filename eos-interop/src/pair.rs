//! The struct-pair convention.
//!
//! Each native operation has a public structure (plain Rust fields, `Option`
//! for anything nullable) and a `#[repr(C)]` native structure matching the
//! SDK's declared layout. [`struct_pair!`] generates both from one ordered
//! field list, each field naming the [`Codec`](crate::marshal::Codec) that
//! converts it. The native structure owns what encoding allocated and frees
//! it when dropped.

use crate::error::Result;

/// Release everything a native structure owns.
///
/// Must be idempotent and a no-op on a default (zeroed) value.
pub trait Dispose {
    fn dispose(&mut self);
}

/// A public structure with a native counterpart.
pub trait StructPair: Sized {
    type Native: Dispose + Default;

    /// Version tag written at the head of the native structure, if it has one.
    const API_VERSION: Option<i32>;

    fn to_native(&self) -> Result<Self::Native>;

    /// # Safety
    ///
    /// Pointers inside `native` must be null or valid for reads.
    unsafe fn from_native(native: &Self::Native) -> Self;
}

/// Encode `value`, hand the native form to `call`, then release it.
///
/// Release happens whatever `call` returns, and during unwinding.
pub fn with_native<T, R>(value: &T, call: impl FnOnce(&T::Native) -> R) -> Result<R>
where
    T: StructPair,
{
    let native = value.to_native()?;
    let out = call(&native);
    drop(native);
    Ok(out)
}

#[doc(hidden)]
macro_rules! version_tag {
    (@zero $version:expr) => {
        0
    };
    (@const) => {
        None
    };
    (@const $version:expr) => {
        Some($version)
    };
    ($version:expr) => {
        i32
    };
}

pub(crate) use version_tag;

/// Declare a public/native structure pair.
///
/// ```ignore
/// struct_pair! {
///     /// Input parameters for `LobbyModification::set_max_members`.
///     pub struct SetMaxMembersOptions => SetMaxMembersOptionsInternal {
///         @version = SET_MAX_MEMBERS_API_LATEST;
///         max_members: u32 => Scalar,
///     }
/// }
/// ```
///
/// With `@version = ...;` the native structure starts with an `i32` tag that
/// is set on encode and never decoded. Fields follow in declaration order.
macro_rules! struct_pair {
    (@accessor $native:ident) => {};
    (@accessor $native:ident $version:expr) => {
        impl $native {
            /// Version tag as written by the last encode.
            pub fn api_version(&self) -> i32 {
                self.api_version
            }
        }
    };
    (
        $(#[$meta:meta])*
        pub struct $public:ident => $native:ident {
            $(@version = $version:expr;)?
            $(
                $(#[$fmeta:meta])*
                $field:ident: $ty:ty => $codec:ty
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Default)]
        pub struct $public {
            $( $(#[$fmeta])* pub $field: $ty, )*
        }

        #[doc = concat!("Native layout of [`", stringify!($public), "`].")]
        #[repr(C)]
        pub struct $native {
            $( pub(crate) api_version: $crate::pair::version_tag!($version), )?
            $( pub(crate) $field: <$codec as $crate::marshal::Codec<$ty>>::Native, )*
        }

        $crate::pair::struct_pair!(@accessor $native $($version)?);

        impl Default for $native {
            fn default() -> Self {
                Self {
                    $( api_version: $crate::pair::version_tag!(@zero $version), )?
                    $( $field: <$codec as $crate::marshal::Codec<$ty>>::empty(), )*
                }
            }
        }

        impl $crate::pair::Dispose for $native {
            fn dispose(&mut self) {
                $( <$codec as $crate::marshal::Codec<$ty>>::release(&mut self.$field); )*
            }
        }

        impl Drop for $native {
            fn drop(&mut self) {
                $crate::pair::Dispose::dispose(self);
            }
        }

        impl $crate::pair::StructPair for $public {
            type Native = $native;

            const API_VERSION: Option<i32> = $crate::pair::version_tag!(@const $($version)?);

            fn to_native(&self) -> $crate::Result<$native> {
                #[allow(unused_mut)]
                let mut native = <$native as Default>::default();
                $( native.api_version = $version; )?
                $(
                    native.$field =
                        <$codec as $crate::marshal::Codec<$ty>>::encode(&self.$field)?;
                )*
                Ok(native)
            }

            unsafe fn from_native(native: &$native) -> Self {
                let _ = native;
                Self {
                    $(
                        $field: unsafe {
                            <$codec as $crate::marshal::Codec<$ty>>::decode(&native.$field)
                        },
                    )*
                }
            }
        }
    };
}

pub(crate) use struct_pair;
