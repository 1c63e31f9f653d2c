//! The result code set shared by every native call and most callback infos.

use std::fmt;

use crate::marshal::NativeEnum;

/// Defines a Rust enum mirroring a native `int32` enumeration.
///
/// Each variant maps to one literal native value. Values the native side
/// produces that are not listed decode to `Unknown(raw)` and encode back to
/// the same raw value, so nothing is lost crossing the boundary.
macro_rules! native_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $(
                $(#[$vmeta:meta])*
                $variant:ident = $value:literal
            ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $( $(#[$vmeta])* $variant, )+
            /// A native value this crate does not name.
            Unknown(i32),
        }

        impl $crate::marshal::NativeEnum for $name {
            fn to_raw(self) -> i32 {
                match self {
                    $( Self::$variant => $value, )+
                    Self::Unknown(raw) => raw,
                }
            }

            fn from_raw(raw: i32) -> Self {
                match raw {
                    $( $value => Self::$variant, )+
                    other => Self::Unknown(other),
                }
            }
        }

        impl Default for $name {
            fn default() -> Self {
                [$(Self::$variant),+][0]
            }
        }
    };
}

pub(crate) use native_enum;

native_enum! {
    /// Result of a native call (`EOS_EResult`).
    ///
    /// Returned unchanged by every synchronous API function and carried in
    /// the callback info of most asynchronous ones.
    pub enum ResultCode {
        Success = 0,
        NoConnection = 1,
        InvalidCredentials = 2,
        InvalidUser = 3,
        InvalidAuth = 4,
        AccessDenied = 5,
        MissingPermissions = 6,
        TokenNotAccount = 7,
        TooManyRequests = 8,
        AlreadyPending = 9,
        InvalidParameters = 10,
        InvalidRequest = 11,
        UnrecognizedResponse = 12,
        IncompatibleVersion = 13,
        NotConfigured = 14,
        AlreadyConfigured = 15,
        NotImplemented = 16,
        Canceled = 17,
        NotFound = 18,
        /// The operation failed transiently and the SDK will call back again
        /// with the same client data.
        OperationWillRetry = 19,
        NoChange = 20,
        VersionMismatch = 21,
        LimitExceeded = 22,
        Disabled = 23,
        DuplicateNotAllowed = 24,
        InvalidSandboxId = 26,
        TimedOut = 27,
        PartialResult = 28,
        MissingRole = 29,
        MissingFeature = 30,
        InvalidSandbox = 31,
        InvalidDeployment = 32,
        InvalidProduct = 33,
        InvalidProductUserId = 34,
        ServiceFailure = 35,
        CacheDirectoryMissing = 36,
        CacheDirectoryInvalid = 37,
        InvalidState = 38,
        RequestInProgress = 39,
        ApplicationSuspended = 40,
        NetworkDisconnected = 41,
        LobbyNotOwner = 9000,
        LobbyInvalidLock = 9001,
        LobbyAlreadyExists = 9002,
        LobbySessionInProgress = 9003,
        LobbyTooManyPlayers = 9004,
        LobbyNoPermission = 9005,
        LobbyInvalidSession = 9006,
        UnexpectedError = 0x7FFF_FFFF,
    }
}

impl ResultCode {
    pub fn is_success(self) -> bool {
        self == ResultCode::Success
    }

    /// Whether a callback carrying this result is the last one for its
    /// operation. Only `OperationWillRetry` is followed by another callback.
    pub fn is_operation_complete(self) -> bool {
        self != ResultCode::OperationWillRetry
    }

    /// Raw native value.
    pub fn raw(self) -> i32 {
        self.to_raw()
    }

    /// Code for a raw native value; unlisted values become `Unknown`.
    pub fn from_raw(raw: i32) -> Self {
        <Self as NativeEnum>::from_raw(raw)
    }
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResultCode::Unknown(raw) => write!(f, "Unknown({raw:#x})"),
            other => write!(f, "{other:?}"),
        }
    }
}
