//! Boundary entry points.
//!
//! The Rust functions ([`create`], [`run`], [`destroy`]) hold the logic; the
//! `extern "C"` functions decode pointers, call them, and report failures as
//! a status code plus a thread-local message from [`mecab_bridge_last_error`].
//!
//! Handle lifecycle: `create` issues a live handle, `run` is accepted only
//! while it is live, `destroy` releases it. Destroying an unknown, null or
//! already destroyed handle is a no-op; running one fails with
//! [`MecabError::InvalidHandle`].

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_int};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::ptr;
use std::sync::{Mutex, PoisonError};

use tracing::{debug, warn};

use crate::constants::{MECAB_BRIDGE_ERR_PANIC, MECAB_BRIDGE_OK};
use crate::error::{MecabError, Result};
use crate::registry::{dispose_shared, lock_tagger, registry, AnalyzerHandle};
use crate::runtime::MecabLibrary;

static LIBRARY: Mutex<Option<MecabLibrary>> = Mutex::new(None);

thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

/// Selects the `libmecab` used by later [`create`] calls.
pub fn use_library(library: MecabLibrary) {
    *LIBRARY.lock().unwrap_or_else(PoisonError::into_inner) = Some(library);
}

fn library() -> Result<MecabLibrary> {
    let mut guard = LIBRARY.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(library) = guard.as_ref() {
        return Ok(library.clone());
    }
    let library = MecabLibrary::load_from_env_or_default()?;
    *guard = Some(library.clone());
    Ok(library)
}

/// Creates a tagger for `dictionary_dir` and issues a handle for it.
pub fn create(dictionary_dir: &str) -> Result<AnalyzerHandle> {
    if dictionary_dir.is_empty() {
        return Err(MecabError::Initialization(
            "dictionary directory is empty".to_string(),
        ));
    }
    let tagger = library()?.tagger(dictionary_dir)?;
    Ok(registry().insert(tagger))
}

/// Tokenizes `query` with the tagger behind `handle`.
pub fn run(handle: AnalyzerHandle, query: &str) -> Result<String> {
    let tagger = registry().get(handle)?;
    let result = lock_tagger(&tagger).parse(query);
    result
}

/// Byte-level [`run`]; no encoding conversion is applied.
pub fn run_bytes(handle: AnalyzerHandle, query: &[u8]) -> Result<Vec<u8>> {
    let tagger = registry().get(handle)?;
    let result = lock_tagger(&tagger).parse_bytes(query);
    result
}

/// Releases the tagger behind `handle`. Unknown or released handles are
/// ignored.
pub fn destroy(handle: AnalyzerHandle) -> Result<()> {
    let released = registry().remove(handle);
    match released {
        Some(tagger) => dispose_shared(&tagger),
        None => debug!(%handle, "destroy ignored for inactive handle"),
    }
    Ok(())
}

/// Releases every live tagger. Previously issued handles stay invalid.
pub fn teardown() {
    let released = registry().clear();
    for tagger in &released {
        dispose_shared(tagger);
    }
    debug!(count = released.len(), "handle table cleared");
}

/// Number of live handles in the process-wide table.
pub fn live_handles() -> usize {
    registry().live_count()
}

fn store_last_error(message: String) {
    let message = CString::new(message.replace('\0', " ")).unwrap_or_default();
    LAST_ERROR.with(|slot| *slot.borrow_mut() = Some(message));
}

fn clear_last_error() {
    LAST_ERROR.with(|slot| *slot.borrow_mut() = None);
}

fn call(operation: &str, body: impl FnOnce() -> Result<()>) -> c_int {
    clear_last_error();
    match catch_unwind(AssertUnwindSafe(body)) {
        Ok(Ok(())) => MECAB_BRIDGE_OK,
        Ok(Err(error)) => {
            warn!(operation, %error, "bridge call failed");
            let status = error.status_code();
            store_last_error(error.to_string());
            status
        }
        Err(_) => {
            warn!(operation, "bridge call panicked");
            store_last_error(format!("panic in {operation}"));
            MECAB_BRIDGE_ERR_PANIC
        }
    }
}

unsafe fn c_str<'a>(pointer: *const c_char, name: &str) -> Result<&'a CStr> {
    if pointer.is_null() {
        return Err(MecabError::InvalidArgument(format!("{name} is null")));
    }
    Ok(CStr::from_ptr(pointer))
}

/// Creates a tagger for the NUL-terminated UTF-8 `dictionary_dir` and writes
/// its handle to `out_handle` (`0` on failure).
///
/// # Safety
/// `dictionary_dir` must be null or a valid C string; `out_handle` must be
/// null or writable.
#[no_mangle]
pub unsafe extern "C" fn mecab_bridge_create(
    dictionary_dir: *const c_char,
    out_handle: *mut i64,
) -> c_int {
    call("create", || {
        if out_handle.is_null() {
            return Err(MecabError::InvalidArgument("out_handle is null".to_string()));
        }
        *out_handle = 0;
        let dictionary_dir = c_str(dictionary_dir, "dictionary_dir")?
            .to_str()
            .map_err(|error| {
                MecabError::Initialization(format!("dictionary_dir is not UTF-8: {error}"))
            })?;
        *out_handle = create(dictionary_dir)?.into_raw();
        Ok(())
    })
}

/// Tokenizes `query` and writes a newly allocated result string to
/// `out_result` (null on failure). Free it with [`mecab_bridge_free_string`].
///
/// # Safety
/// `query` must be null or a valid C string; `out_result` must be null or
/// writable.
#[no_mangle]
pub unsafe extern "C" fn mecab_bridge_run(
    handle: i64,
    query: *const c_char,
    out_result: *mut *mut c_char,
) -> c_int {
    call("run", || {
        if out_result.is_null() {
            return Err(MecabError::InvalidArgument("out_result is null".to_string()));
        }
        *out_result = ptr::null_mut();
        let query = c_str(query, "query")?;
        let result = run_bytes(AnalyzerHandle::from_raw(handle), query.to_bytes())?;
        *out_result = CString::new(result)?.into_raw();
        Ok(())
    })
}

/// Releases the tagger behind `handle`; a no-op for inactive handles.
#[no_mangle]
pub extern "C" fn mecab_bridge_destroy(handle: i64) -> c_int {
    call("destroy", || destroy(AnalyzerHandle::from_raw(handle)))
}

/// Frees a string returned by [`mecab_bridge_run`].
///
/// # Safety
/// `value` must be null or a pointer obtained from [`mecab_bridge_run`] that
/// has not been freed yet.
#[no_mangle]
pub unsafe extern "C" fn mecab_bridge_free_string(value: *mut c_char) {
    if value.is_null() {
        return;
    }
    drop(CString::from_raw(value));
}

/// Message of the last failed bridge call on this thread, or null. Valid
/// until the next bridge call on the same thread.
#[no_mangle]
pub extern "C" fn mecab_bridge_last_error() -> *const c_char {
    LAST_ERROR.with(|slot| {
        slot.borrow()
            .as_ref()
            .map_or(ptr::null(), |message| message.as_ptr())
    })
}

/// Loads `libmecab` from `path` for later `create` calls.
///
/// # Safety
/// `path` must be null or a valid C string.
#[no_mangle]
pub unsafe extern "C" fn mecab_bridge_load_library(path: *const c_char) -> c_int {
    call("load_library", || {
        let path = c_str(path, "path")?.to_string_lossy().into_owned();
        use_library(MecabLibrary::load(path)?);
        Ok(())
    })
}

/// Releases every live tagger; see [`teardown`].
#[no_mangle]
pub extern "C" fn mecab_bridge_teardown() {
    call("teardown", || {
        teardown();
        Ok(())
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::*;
    use crate::test_support::{
        fake_double_destroys, fake_dictionary, fake_library, FAKE_PARSE_FAILURE_INPUT,
    };
    use std::sync::MutexGuard;

    // Bridge state is process-wide; `teardown` must not race other tests.
    fn bridge() -> MutexGuard<'static, ()> {
        static LOCK: Mutex<()> = Mutex::new(());
        let guard = LOCK.lock().unwrap_or_else(PoisonError::into_inner);
        use_library(fake_library());
        guard
    }

    fn last_error() -> String {
        let pointer = mecab_bridge_last_error();
        assert!(!pointer.is_null());
        unsafe { CStr::from_ptr(pointer) }
            .to_string_lossy()
            .into_owned()
    }

    #[test]
    fn empty_query_returns_empty_string() {
        let _bridge = bridge();
        let dictionary = fake_dictionary();
        let handle = create(dictionary.path().to_str().unwrap()).unwrap();
        assert_eq!(run(handle, "").unwrap(), "");
        destroy(handle).unwrap();
    }

    #[test]
    fn end_to_end_lifecycle() {
        let _bridge = bridge();
        let dictionary = fake_dictionary();
        let handle = create(dictionary.path().to_str().unwrap()).unwrap();

        let result = run(handle, "東京").unwrap();
        assert_eq!(
            result,
            "東: 名詞,固有名詞,地域,一般,*,*,東,ヒガシ,ヒガシ\n\
             京: 名詞,固有名詞,地域,一般,*,*,京,キョウ,キョー\n"
        );

        destroy(handle).unwrap();
        let error = run(handle, "東京").unwrap_err();
        assert!(matches!(error, MecabError::InvalidHandle(_)));
    }

    #[test]
    fn destroy_twice_is_a_no_op() {
        let _bridge = bridge();
        let dictionary = fake_dictionary();
        let before = fake_double_destroys();
        let handle = create(dictionary.path().to_str().unwrap()).unwrap();
        destroy(handle).unwrap();
        destroy(handle).unwrap();
        destroy(AnalyzerHandle::NULL).unwrap();
        assert_eq!(fake_double_destroys(), before);
    }

    #[test]
    fn invalid_dictionary_path_fails_without_leaking() {
        let _bridge = bridge();
        let before = live_handles();
        let error = create("/nonexistent").unwrap_err();
        assert!(matches!(error, MecabError::Initialization(_)));
        assert_eq!(live_handles(), before);
    }

    #[test]
    fn missing_rc_file_surfaces_library_message() {
        let _bridge = bridge();
        let dictionary = fake_dictionary();
        std::fs::remove_file(dictionary.path().join(MECAB_RC_FILE_NAME)).unwrap();
        let error = create(dictionary.path().to_str().unwrap()).unwrap_err();
        assert!(matches!(error, MecabError::Initialization(_)));
        assert!(error.to_string().contains("no such file or directory"));
    }

    #[test]
    fn library_parse_failure_is_a_parse_error() {
        let _bridge = bridge();
        let dictionary = fake_dictionary();
        let handle = create(dictionary.path().to_str().unwrap()).unwrap();
        let error = run(handle, FAKE_PARSE_FAILURE_INPUT).unwrap_err();
        assert!(matches!(error, MecabError::Parse(_)));
        assert!(error.to_string().contains("lattice is broken"));
        destroy(handle).unwrap();
    }

    #[test]
    fn teardown_invalidates_every_handle() {
        let _bridge = bridge();
        let dictionary = fake_dictionary();
        let first = create(dictionary.path().to_str().unwrap()).unwrap();
        let second = create(dictionary.path().to_str().unwrap()).unwrap();
        teardown();
        assert_eq!(live_handles(), 0);
        assert!(run(first, "東").is_err());
        assert!(run(second, "東").is_err());
        destroy(first).unwrap();
    }

    #[test]
    fn empty_dictionary_path_fails_initialization() {
        let _bridge = bridge();
        let error = create("").unwrap_err();
        assert!(matches!(error, MecabError::Initialization(_)));
        assert_eq!(error.status_code(), MECAB_BRIDGE_ERR_INITIALIZATION);
    }

    #[test]
    fn destroy_waits_for_in_flight_runs() {
        use std::sync::atomic::{AtomicBool, Ordering};
        use std::sync::Arc;
        use std::thread;

        let _bridge = bridge();
        let dictionary = fake_dictionary();
        let before = fake_double_destroys();

        for _ in 0..20 {
            let handle = create(dictionary.path().to_str().unwrap()).unwrap();
            let started = Arc::new(AtomicBool::new(false));
            let runner = {
                let started = started.clone();
                thread::spawn(move || {
                    let mut completed = 0;
                    loop {
                        match run(handle, "東京に行く") {
                            Ok(result) => {
                                assert_eq!(result.lines().count(), 4, "{result:?}");
                                completed += 1;
                                started.store(true, Ordering::SeqCst);
                            }
                            Err(MecabError::InvalidHandle(_)) => return completed,
                            Err(error) => panic!("unexpected error {error:?}"),
                        }
                    }
                })
            };
            while !started.load(Ordering::SeqCst) {
                thread::yield_now();
            }
            destroy(handle).unwrap();
            assert!(runner.join().unwrap() > 0);
        }
        assert_eq!(fake_double_destroys(), before);
    }

    #[test]
    fn c_abi_round_trip() {
        let _bridge = bridge();
        let dictionary = fake_dictionary();
        let dictionary_c = CString::new(dictionary.path().to_str().unwrap()).unwrap();
        let query = CString::new("京に行く").unwrap();

        let mut handle = -1_i64;
        let status = unsafe { mecab_bridge_create(dictionary_c.as_ptr(), &mut handle) };
        assert_eq!(status, MECAB_BRIDGE_OK);
        assert_ne!(handle, 0);
        assert!(mecab_bridge_last_error().is_null());

        let mut result: *mut c_char = ptr::null_mut();
        let status = unsafe { mecab_bridge_run(handle, query.as_ptr(), &mut result) };
        assert_eq!(status, MECAB_BRIDGE_OK);
        let text = unsafe { CStr::from_ptr(result) }.to_str().unwrap().to_string();
        unsafe { mecab_bridge_free_string(result) };
        assert_eq!(text.lines().count(), 3);
        assert!(text.starts_with("京: 名詞"));
        assert!(text.lines().all(|line| line.contains(": ")));

        assert_eq!(mecab_bridge_destroy(handle), MECAB_BRIDGE_OK);
        assert_eq!(mecab_bridge_destroy(handle), MECAB_BRIDGE_OK);

        let status = unsafe { mecab_bridge_run(handle, query.as_ptr(), &mut result) };
        assert_eq!(status, MECAB_BRIDGE_ERR_INVALID_HANDLE);
        assert!(result.is_null());
        assert!(last_error().contains("has been disposed"));
    }

    #[test]
    fn c_abi_reports_failures() {
        let _bridge = bridge();
        let missing = CString::new("/nonexistent").unwrap();
        let mut handle = -1_i64;
        let status = unsafe { mecab_bridge_create(missing.as_ptr(), &mut handle) };
        assert_eq!(status, MECAB_BRIDGE_ERR_INITIALIZATION);
        assert_eq!(handle, 0);
        assert!(last_error().starts_with("initialization error:"));

        let status = unsafe { mecab_bridge_create(ptr::null(), &mut handle) };
        assert_eq!(status, MECAB_BRIDGE_ERR_INVALID_ARGUMENT);

        let mut result: *mut c_char = ptr::null_mut();
        let query = CString::new("東").unwrap();
        let status = unsafe { mecab_bridge_run(0, query.as_ptr(), &mut result) };
        assert_eq!(status, MECAB_BRIDGE_ERR_INVALID_HANDLE);
        assert!(last_error().contains("handle is null"));

        let status = unsafe { mecab_bridge_run(0, query.as_ptr(), ptr::null_mut()) };
        assert_eq!(status, MECAB_BRIDGE_ERR_INVALID_ARGUMENT);
    }
}
