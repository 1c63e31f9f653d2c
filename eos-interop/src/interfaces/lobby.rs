//! Lobby interface and lobby modification handles.

use std::borrow::Cow;
use std::ffi::c_char;
use std::ptr;
use std::sync::Arc;

use crate::error::Result;
use crate::handle::{kinds, Handle, Owned, ProductUserId};
use crate::marshal::{
    alloc_utf8, free_utf8, read_utf8, Codec, Enum, HandleRef, NativeEnum, Nested, Scalar, Text,
};
use crate::pair::{struct_pair, with_native, Dispose, StructPair};
use crate::platform::Shared;
use crate::result::{native_enum, ResultCode};

pub const UPDATE_LOBBY_MODIFICATION_API_LATEST: i32 = 1;
pub const LOBBY_MODIFICATION_SET_MAX_MEMBERS_API_LATEST: i32 = 1;
pub const LOBBY_MODIFICATION_ADD_ATTRIBUTE_API_LATEST: i32 = 2;
pub const LOBBY_MODIFICATION_REMOVE_ATTRIBUTE_API_LATEST: i32 = 1;
pub const ATTRIBUTE_DATA_API_LATEST: i32 = 1;

native_enum! {
    /// Discriminant of [`AttributeValue`] on the native side.
    pub enum AttributeType {
        Boolean = 0,
        Int64 = 1,
        Double = 2,
        String = 3,
    }
}

native_enum! {
    pub enum LobbyAttributeVisibility {
        Public = 0,
        Private = 1,
    }
}

/// Value of a lobby or session attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    Bool(bool),
    Int64(i64),
    Double(f64),
    String(Option<String>),
    /// A value type this crate does not name, kept as its raw bits.
    Unknown { value_type: i32, bits: i64 },
}

impl AttributeValue {
    pub fn value_type(&self) -> AttributeType {
        match self {
            AttributeValue::Bool(_) => AttributeType::Boolean,
            AttributeValue::Int64(_) => AttributeType::Int64,
            AttributeValue::Double(_) => AttributeType::Double,
            AttributeValue::String(_) => AttributeType::String,
            AttributeValue::Unknown { value_type, .. } => AttributeType::from_raw(*value_type),
        }
    }

    /// Rewrites an `Unknown` carrying a named tag as that named variant.
    ///
    /// Raw bits are never a string pointer, so a string tag yields
    /// `String(None)`.
    pub fn normalized(&self) -> Cow<'_, AttributeValue> {
        let AttributeValue::Unknown { value_type, bits } = *self else {
            return Cow::Borrowed(self);
        };
        match AttributeType::from_raw(value_type) {
            AttributeType::Boolean => Cow::Owned(AttributeValue::Bool(bits != 0)),
            AttributeType::Int64 => Cow::Owned(AttributeValue::Int64(bits)),
            AttributeType::Double => {
                Cow::Owned(AttributeValue::Double(f64::from_bits(bits as u64)))
            }
            AttributeType::String => Cow::Owned(AttributeValue::String(None)),
            AttributeType::Unknown(_) => Cow::Borrowed(self),
        }
    }
}

impl Default for AttributeValue {
    fn default() -> Self {
        AttributeValue::Int64(0)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        AttributeValue::Bool(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        AttributeValue::Int64(value)
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        AttributeValue::Double(value)
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::String(Some(value.to_string()))
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::String(Some(value))
    }
}

/// A keyed attribute (`EOS_Sessions_AttributeData`, shared with lobbies).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AttributeData {
    pub key: Option<String>,
    pub value: AttributeValue,
}

impl AttributeData {
    pub fn new(key: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        Self {
            key: Some(key.into()),
            value: value.into(),
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy)]
pub union AttributeValueUnion {
    pub(crate) as_int64: i64,
    pub(crate) as_double: f64,
    pub(crate) as_bool: i32,
    pub(crate) as_utf8: *mut c_char,
}

/// Native layout of [`AttributeData`]; the value is a union tagged by
/// `value_type`.
#[repr(C)]
pub struct AttributeDataInternal {
    pub(crate) api_version: i32,
    pub(crate) key: *mut c_char,
    pub(crate) value: AttributeValueUnion,
    pub(crate) value_type: i32,
}

impl AttributeDataInternal {
    pub fn api_version(&self) -> i32 {
        self.api_version
    }
}

impl Default for AttributeDataInternal {
    fn default() -> Self {
        Self {
            api_version: 0,
            key: ptr::null_mut(),
            value: AttributeValueUnion { as_int64: 0 },
            value_type: AttributeType::Boolean.to_raw(),
        }
    }
}

impl Dispose for AttributeDataInternal {
    fn dispose(&mut self) {
        Text::release(&mut self.key);
        if AttributeType::from_raw(self.value_type) == AttributeType::String {
            let text = unsafe { self.value.as_utf8 };
            if !text.is_null() {
                unsafe { free_utf8(text) };
                self.value.as_utf8 = ptr::null_mut();
            }
        }
    }
}

impl Drop for AttributeDataInternal {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl StructPair for AttributeData {
    type Native = AttributeDataInternal;

    const API_VERSION: Option<i32> = Some(ATTRIBUTE_DATA_API_LATEST);

    fn to_native(&self) -> Result<AttributeDataInternal> {
        let mut native = AttributeDataInternal::default();
        native.api_version = ATTRIBUTE_DATA_API_LATEST;
        native.key = Text::encode(&self.key)?;
        let value = self.value.normalized();
        native.value_type = value.value_type().to_raw();
        native.value = match value.as_ref() {
            AttributeValue::Bool(v) => AttributeValueUnion {
                as_bool: i32::from(*v),
            },
            AttributeValue::Int64(v) => AttributeValueUnion { as_int64: *v },
            AttributeValue::Double(v) => AttributeValueUnion { as_double: *v },
            AttributeValue::String(Some(text)) => AttributeValueUnion {
                as_utf8: alloc_utf8(text)?,
            },
            AttributeValue::String(None) => AttributeValueUnion {
                as_utf8: ptr::null_mut(),
            },
            AttributeValue::Unknown { bits, .. } => AttributeValueUnion { as_int64: *bits },
        };
        Ok(native)
    }

    unsafe fn from_native(native: &AttributeDataInternal) -> Self {
        let value = unsafe {
            match AttributeType::from_raw(native.value_type) {
                AttributeType::Boolean => AttributeValue::Bool(native.value.as_bool != 0),
                AttributeType::Int64 => AttributeValue::Int64(native.value.as_int64),
                AttributeType::Double => AttributeValue::Double(native.value.as_double),
                AttributeType::String => AttributeValue::String(read_utf8(native.value.as_utf8)),
                AttributeType::Unknown(value_type) => AttributeValue::Unknown {
                    value_type,
                    bits: native.value.as_int64,
                },
            }
        };
        Self {
            key: unsafe { Text::decode(&native.key) },
            value,
        }
    }
}

struct_pair! {
    /// Input to [`Lobby::update_lobby_modification`].
    pub struct UpdateLobbyModificationOptions => UpdateLobbyModificationOptionsInternal {
        @version = UPDATE_LOBBY_MODIFICATION_API_LATEST;
        local_user_id: Option<ProductUserId> => HandleRef,
        lobby_id: Option<String> => Text,
    }
}

struct_pair! {
    pub struct LobbyModificationSetMaxMembersOptions
        => LobbyModificationSetMaxMembersOptionsInternal
    {
        @version = LOBBY_MODIFICATION_SET_MAX_MEMBERS_API_LATEST;
        max_members: u32 => Scalar,
    }
}

struct_pair! {
    pub struct LobbyModificationAddAttributeOptions
        => LobbyModificationAddAttributeOptionsInternal
    {
        @version = LOBBY_MODIFICATION_ADD_ATTRIBUTE_API_LATEST;
        attribute: Option<AttributeData> => Nested,
        visibility: LobbyAttributeVisibility => Enum,
    }
}

struct_pair! {
    pub struct LobbyModificationRemoveAttributeOptions
        => LobbyModificationRemoveAttributeOptionsInternal
    {
        @version = LOBBY_MODIFICATION_REMOVE_ATTRIBUTE_API_LATEST;
        key: Option<String> => Text,
    }
}

/// The lobby interface of a platform.
#[derive(Debug)]
pub struct Lobby {
    handle: Handle<kinds::Lobby>,
    shared: Arc<Shared>,
}

impl Lobby {
    pub(crate) fn new(handle: Handle<kinds::Lobby>, shared: Arc<Shared>) -> Self {
        Self { handle, shared }
    }

    pub fn handle(&self) -> Handle<kinds::Lobby> {
        self.handle
    }

    /// Start modifying a lobby the local user owns.
    ///
    /// The modification handle is returned whenever the SDK produced one.
    pub fn update_lobby_modification(
        &self,
        options: &UpdateLobbyModificationOptions,
    ) -> Result<(ResultCode, Option<LobbyModification>)> {
        let bindings = &self.shared.bindings;
        let mut out = ptr::null_mut();
        let raw = with_native(options, |native| unsafe {
            (bindings.eos_lobby_update_lobby_modification)(self.handle.as_ptr(), native, &mut out)
        })?;
        let code = ResultCode::from_raw(raw);
        tracing::debug!("EOS_Lobby_UpdateLobbyModification -> {code}");
        let modification = Owned::adopt(out, bindings).map(|owned| LobbyModification {
            owned,
            shared: Arc::clone(&self.shared),
        });
        Ok((code, modification))
    }
}

/// Pending changes to a lobby. Released when dropped.
#[derive(Debug)]
pub struct LobbyModification {
    owned: Owned<kinds::LobbyModification>,
    shared: Arc<Shared>,
}

impl LobbyModification {
    pub fn handle(&self) -> Handle<kinds::LobbyModification> {
        self.owned.handle()
    }

    pub fn set_max_members(
        &self,
        options: &LobbyModificationSetMaxMembersOptions,
    ) -> Result<ResultCode> {
        let raw = with_native(options, |native| unsafe {
            (self.shared.bindings.eos_lobby_modification_set_max_members)(
                self.handle().as_ptr(),
                native,
            )
        })?;
        Ok(ResultCode::from_raw(raw))
    }

    pub fn add_attribute(
        &self,
        options: &LobbyModificationAddAttributeOptions,
    ) -> Result<ResultCode> {
        let raw = with_native(options, |native| unsafe {
            (self.shared.bindings.eos_lobby_modification_add_attribute)(
                self.handle().as_ptr(),
                native,
            )
        })?;
        Ok(ResultCode::from_raw(raw))
    }

    pub fn remove_attribute(
        &self,
        options: &LobbyModificationRemoveAttributeOptions,
    ) -> Result<ResultCode> {
        let raw = with_native(options, |native| unsafe {
            (self.shared.bindings.eos_lobby_modification_remove_attribute)(
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
