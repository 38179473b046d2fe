//! C ABI over a single process-wide [`CaptureSession`].
//!
//! Symbol names match the capture DLL this library replaces. Every entry
//! point takes the boundary lock, so calls from different threads are
//! serialized. Errors never cross the boundary: they are logged and turned
//! into `-1` or a null pointer.
//!
//! Pointer lifetimes:
//! - strings from `getDeviceName`/`getDeviceFriendlyName` stay valid until
//!   the next call of the same function;
//! - frame bytes from `readFrame` stay valid until the next `readFrame`,
//!   `startCapture`, `deviceOpen`, `deviceClose` or `stopCapture`.

#![allow(non_snake_case)]

use crate::config::CrabCaptureConfig;
use crate::errors::CaptureError;
use crate::formats::{self, Guid};
use crate::session::CaptureSession;
use std::ffi::{c_char, c_int, CStr, CString};
use std::ptr;
use std::sync::Mutex;

#[derive(Default)]
struct Boundary {
    session: Option<CaptureSession>,
    device_name: Option<CString>,
    friendly_name: Option<CString>,
}

impl Boundary {
    /// The installed session, built from configuration on first use.
    fn session(&mut self) -> Result<&mut CaptureSession, CaptureError> {
        let session = match self.session.take() {
            Some(session) => session,
            None => {
                let config = CrabCaptureConfig::load_or_default();
                crate::init_logging_with(&config.logging.level);
                if let Err(e) = config.validate() {
                    log::warn!("Configuration problem: {}", e);
                }
                CaptureSession::from_config(&config)?
            }
        };
        Ok(self.session.insert(session))
    }
}

lazy_static::lazy_static! {
    static ref BOUNDARY: Mutex<Boundary> = Mutex::new(Boundary::default());
}

fn with_boundary<T>(
    on_error: T,
    f: impl FnOnce(&mut Boundary) -> Result<T, CaptureError>,
) -> T {
    let mut boundary = match BOUNDARY.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            log::warn!("Capture boundary lock was poisoned, recovering");
            poisoned.into_inner()
        }
    };
    match f(&mut boundary) {
        Ok(value) => value,
        Err(e) => {
            log::error!("{}", e);
            on_error
        }
    }
}

fn status(result: Result<(), CaptureError>) -> c_int {
    match result {
        Ok(()) => 0,
        Err(e) => {
            log::error!("{}", e);
            e.status_code()
        }
    }
}

fn store(slot: &mut Option<CString>, value: Option<String>) -> *const c_char {
    *slot = value.and_then(|s| match CString::new(s) {
        Ok(s) => Some(s),
        Err(e) => {
            log::warn!("Name contains a NUL byte: {}", e);
            None
        }
    });
    slot.as_ref().map_or(ptr::null(), |s| s.as_ptr())
}

fn index(index: c_int) -> Result<usize, CaptureError> {
    usize::try_from(index)
        .map_err(|_| CaptureError::invalid_argument(format!("negative index {index}")))
}

/// Replaces the boundary's session, closing the previous one.
pub fn install_session(session: CaptureSession) {
    with_boundary((), |boundary| {
        boundary.session = Some(session);
        Ok(())
    });
}

/// Removes the boundary's session; the next call builds a fresh one from
/// configuration.
pub fn uninstall_session() -> Option<CaptureSession> {
    with_boundary(None, |boundary| Ok(boundary.session.take()))
}

#[no_mangle]
pub extern "C" fn getDevicesNumber() -> c_int {
    with_boundary(0, |boundary| {
        let count = boundary.session()?.device_count();
        Ok(c_int::try_from(count).unwrap_or(c_int::MAX))
    })
}

/// Same as `getDeviceFriendlyName`; callers display this string.
#[no_mangle]
pub extern "C" fn getDeviceName(index: c_int) -> *const c_char {
    with_boundary(ptr::null(), |boundary| {
        let name = boundary.session()?.device_friendly_name(self::index(index)?);
        Ok(store(&mut boundary.device_name, name))
    })
}

#[no_mangle]
pub extern "C" fn getDeviceFriendlyName(index: c_int) -> *const c_char {
    with_boundary(ptr::null(), |boundary| {
        let name = boundary.session()?.device_friendly_name(self::index(index)?);
        Ok(store(&mut boundary.friendly_name, name))
    })
}

/// 1 when `guid` is in the format table. `index` is ignored.
///
/// # Safety
/// `guid` must be null or point to a readable `Guid`.
#[no_mangle]
pub unsafe extern "C" fn supportsMediaType(guid: *const Guid, _index: c_int) -> c_int {
    // SAFETY: the caller guarantees `guid` is null or valid.
    match unsafe { guid.as_ref() } {
        Some(guid) => c_int::from(formats::is_supported(guid)),
        None => 0,
    }
}

/// Opens the source named `name`: 0 on success, -1 otherwise.
///
/// # Safety
/// `name` must be null or a NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn deviceOpen(name: *const c_char) -> c_int {
    if name.is_null() {
        log::error!("deviceOpen: null name");
        return -1;
    }
    // SAFETY: non-null and NUL-terminated per the contract above.
    let name = unsafe { CStr::from_ptr(name) }.to_string_lossy().into_owned();
    with_boundary(-1, |boundary| Ok(status(boundary.session()?.open(&name))))
}

/// Closes the open source, if any. `index` is ignored.
#[no_mangle]
pub extern "C" fn deviceClose(_index: c_int) {
    with_boundary((), |boundary| {
        if let Some(session) = boundary.session.as_mut() {
            session.close();
        }
        Ok(())
    })
}

/// 0 on success, -1 otherwise. `index` is ignored.
///
/// # Safety
/// `media_type` must be null or point to a readable `Guid`.
#[no_mangle]
pub unsafe extern "C" fn startCapture(
    _index: c_int,
    media_type: *const Guid,
    width: c_int,
    height: c_int,
) -> c_int {
    // SAFETY: the caller guarantees `media_type` is null or valid.
    let Some(media_type) = (unsafe { media_type.as_ref() }).copied() else {
        log::error!("startCapture: null media type");
        return -1;
    };
    with_boundary(-1, |boundary| {
        let width = u32::try_from(width)
            .map_err(|_| CaptureError::invalid_argument(format!("width {width}")))?;
        let height = u32::try_from(height)
            .map_err(|_| CaptureError::invalid_argument(format!("height {height}")))?;
        Ok(status(boundary.session()?.start_capture(&media_type, width, height)))
    })
}

/// Closes the source and returns 0.
#[no_mangle]
pub extern "C" fn stopCapture(index: c_int) -> c_int {
    deviceClose(index);
    0
}

/// Next frame, or null with `*len == 0` when none is available.
///
/// # Safety
/// `len` must be null or point to writable memory for one `c_int`.
#[no_mangle]
pub unsafe extern "C" fn readFrame(len: *mut c_int) -> *const u8 {
    let (data, size) = with_boundary((ptr::null::<u8>(), 0 as c_int), |boundary| {
        Ok(match boundary.session()?.read_frame()? {
            Some(bytes) => match c_int::try_from(bytes.len()) {
                Ok(size) => (bytes.as_ptr(), size),
                Err(_) => {
                    return Err(CaptureError::ConversionFailed(format!(
                        "frame of {} bytes does not fit a C int",
                        bytes.len()
                    )))
                }
            },
            None => (ptr::null(), 0),
        })
    });
    // SAFETY: the caller guarantees `len` is null or writable.
    if let Some(len) = unsafe { len.as_mut() } {
        *len = size;
    }
    data
}
