//! Synchronous API surface driven end to end through stand-in natives.
//!
//! Tests cover:
//! - Platform creation, interface lookup and release on drop
//! - Lobby modification handles adopted from output parameters
//! - Options reaching the native side intact, with no allocation left over
//! - Result codes handed back unchanged, including failures
//! - Raw result codes converted without any trait in scope

use std::ffi::c_void;
use std::ptr;
use std::sync::Mutex;

use eos_interop::interfaces::lobby::{
    AttributeData, AttributeValue, LobbyAttributeVisibility, LobbyModificationAddAttributeOptions,
    LobbyModificationAddAttributeOptionsInternal, LobbyModificationSetMaxMembersOptions,
    LobbyModificationSetMaxMembersOptionsInternal, UpdateLobbyModificationOptions,
    UpdateLobbyModificationOptionsInternal, LOBBY_MODIFICATION_SET_MAX_MEMBERS_API_LATEST,
};
use eos_interop::marshal::live_allocations;
use eos_interop::platform::{ClientCredentials, PlatformOptions, PlatformOptionsInternal};
use eos_interop::{Bindings, ResultCode, Sdk, StructPair};

mod common;
use common::fake;

const ALPHA: usize = 0x1_0000;
const BETA: usize = 0x2_0000;
const GAMMA: usize = 0x3_0000;

static RELEASED: Mutex<Vec<usize>> = Mutex::new(Vec::new());
static MAX_MEMBERS: Mutex<Vec<(usize, i32, u32)>> = Mutex::new(Vec::new());
static ATTRIBUTES: Mutex<Vec<(usize, AttributeData, LobbyAttributeVisibility)>> =
    Mutex::new(Vec::new());

fn released(addr: usize) -> bool {
    RELEASED.lock().unwrap().contains(&addr)
}

unsafe extern "C" fn create_platform(options: *const PlatformOptionsInternal) -> *mut c_void {
    let options = PlatformOptions::from_native(&*options);
    match options.product_id.as_deref() {
        Some("alpha") => fake(ALPHA),
        Some("beta") => fake(BETA),
        Some("gamma") => fake(GAMMA),
        _ => ptr::null_mut(),
    }
}

unsafe extern "C" fn record_release(handle: *mut c_void) {
    RELEASED.lock().unwrap().push(handle as usize);
}

unsafe extern "C" fn lobby_interface(platform: *mut c_void) -> *mut c_void {
    fake(platform as usize + 0x100)
}

unsafe extern "C" fn update_lobby_modification(
    lobby: *mut c_void,
    options: *const UpdateLobbyModificationOptionsInternal,
    out: *mut *mut c_void,
) -> i32 {
    let options = UpdateLobbyModificationOptions::from_native(&*options);
    match options.lobby_id.as_deref() {
        Some("missing") => ResultCode::NotFound.raw(),
        Some("not-mine") => {
            *out = fake(lobby as usize + 0x200);
            ResultCode::LobbyNotOwner.raw()
        }
        _ => {
            *out = fake(lobby as usize + 0x100);
            ResultCode::Success.raw()
        }
    }
}

unsafe extern "C" fn set_max_members(
    modification: *mut c_void,
    options: *const LobbyModificationSetMaxMembersOptionsInternal,
) -> i32 {
    let native = &*options;
    let options = LobbyModificationSetMaxMembersOptions::from_native(native);
    MAX_MEMBERS
        .lock()
        .unwrap()
        .push((modification as usize, native.api_version(), options.max_members));
    ResultCode::Success.raw()
}

unsafe extern "C" fn add_attribute(
    modification: *mut c_void,
    options: *const LobbyModificationAddAttributeOptionsInternal,
) -> i32 {
    let options = LobbyModificationAddAttributeOptions::from_native(&*options);
    let Some(attribute) = options.attribute else {
        return ResultCode::InvalidParameters.raw();
    };
    ATTRIBUTES
        .lock()
        .unwrap()
        .push((modification as usize, attribute, options.visibility));
    ResultCode::Success.raw()
}

fn bindings() -> Bindings {
    let mut bindings = Bindings::unlinked();
    bindings.eos_platform_create = create_platform;
    bindings.eos_platform_release = record_release;
    bindings.eos_platform_get_lobby_interface = lobby_interface;
    bindings.eos_lobby_update_lobby_modification = update_lobby_modification;
    bindings.eos_lobby_modification_set_max_members = set_max_members;
    bindings.eos_lobby_modification_add_attribute = add_attribute;
    bindings.eos_lobby_modification_release = record_release;
    bindings
}

fn platform_options(product: &str) -> PlatformOptions {
    PlatformOptions {
        product_id: Some(product.into()),
        sandbox_id: Some("sandbox".into()),
        deployment_id: Some("deployment".into()),
        client_credentials: ClientCredentials {
            client_id: Some("client".into()),
            client_secret: Some("secret".into()),
        },
        ..Default::default()
    }
}

#[test]
fn set_max_members_end_to_end() {
    let sdk = Sdk::with_bindings(bindings());
    let platform = sdk.create_platform(&platform_options("alpha")).unwrap().unwrap();
    let lobby = platform.lobby().unwrap();
    let base = live_allocations();

    let (code, modification) = lobby
        .update_lobby_modification(&UpdateLobbyModificationOptions {
            local_user_id: None,
            lobby_id: Some("lobby-1".into()),
        })
        .unwrap();
    assert_eq!(code, ResultCode::Success);
    let modification = modification.unwrap();
    let raw = modification.handle().as_ptr() as usize;
    assert_eq!(raw, ALPHA + 0x200);

    let code = modification
        .set_max_members(&LobbyModificationSetMaxMembersOptions { max_members: 4 })
        .unwrap();
    assert_eq!(code, ResultCode::Success);
    assert!(MAX_MEMBERS
        .lock()
        .unwrap()
        .contains(&(raw, LOBBY_MODIFICATION_SET_MAX_MEMBERS_API_LATEST, 4)));
    assert_eq!(live_allocations(), base);

    let handle = modification.handle();
    modification.release();
    assert!(released(raw));
    assert!(!handle.is_live());

    drop(platform);
    assert!(released(ALPHA));
}

#[test]
fn add_attribute_crosses_intact() {
    let sdk = Sdk::with_bindings(bindings());
    let platform = sdk.create_platform(&platform_options("beta")).unwrap().unwrap();
    let lobby = platform.lobby().unwrap();
    let (_, modification) = lobby
        .update_lobby_modification(&UpdateLobbyModificationOptions::default())
        .unwrap();
    let modification = modification.unwrap();
    let raw = modification.handle().as_ptr() as usize;
    let base = live_allocations();

    let attribute = AttributeData::new("mode", "ranked");
    let code = modification
        .add_attribute(&LobbyModificationAddAttributeOptions {
            attribute: Some(attribute.clone()),
            visibility: LobbyAttributeVisibility::Private,
        })
        .unwrap();
    assert_eq!(code, ResultCode::Success);
    assert_eq!(live_allocations(), base);

    let code = modification
        .add_attribute(&LobbyModificationAddAttributeOptions::default())
        .unwrap();
    assert_eq!(code, ResultCode::InvalidParameters);

    let seen = ATTRIBUTES.lock().unwrap();
    let (_, stored, visibility) = seen.iter().find(|(addr, _, _)| *addr == raw).unwrap();
    assert_eq!(stored, &attribute);
    assert_eq!(stored.value, AttributeValue::String(Some("ranked".into())));
    assert_eq!(*visibility, LobbyAttributeVisibility::Private);
}

#[test]
fn failure_codes_pass_through_and_handles_are_still_adopted() {
    let sdk = Sdk::with_bindings(bindings());
    let platform = sdk.create_platform(&platform_options("gamma")).unwrap().unwrap();
    let lobby = platform.lobby().unwrap();

    let (code, modification) = lobby
        .update_lobby_modification(&UpdateLobbyModificationOptions {
            local_user_id: None,
            lobby_id: Some("missing".into()),
        })
        .unwrap();
    assert_eq!(code, ResultCode::NotFound);
    assert!(modification.is_none());

    let (code, modification) = lobby
        .update_lobby_modification(&UpdateLobbyModificationOptions {
            local_user_id: None,
            lobby_id: Some("not-mine".into()),
        })
        .unwrap();
    assert_eq!(code, ResultCode::LobbyNotOwner);
    let modification = modification.unwrap();
    assert_eq!(modification.handle().as_ptr() as usize, GAMMA + 0x300);
    drop(modification);
    assert!(released(GAMMA + 0x300));
}

#[test]
fn refused_platform_is_none() {
    let sdk = Sdk::with_bindings(bindings());
    let platform = sdk.create_platform(&platform_options("unknown")).unwrap();
    assert!(platform.is_none());
}

#[test]
fn unlinked_sdk_reports_not_implemented() {
    let sdk = Sdk::with_bindings(Bindings::unlinked());
    assert_eq!(sdk.shutdown(), ResultCode::NotImplemented);
    assert!(sdk.create_platform(&platform_options("alpha")).unwrap().is_none());
}

#[test]
fn raw_result_codes_resolve_by_path() {
    assert_eq!(ResultCode::from_raw(0), ResultCode::Success);
    assert_eq!(ResultCode::from_raw(9000), ResultCode::LobbyNotOwner);
    assert_eq!(ResultCode::from_raw(-7), ResultCode::Unknown(-7));
    assert_eq!(ResultCode::from_raw(ResultCode::NotFound.raw()), ResultCode::NotFound);
}
