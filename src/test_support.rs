//! Test helpers: an environment lock and an in-process stand-in for
//! `libmecab`.
//!
//! The fake tagger reads `sys.dic` as plain text (`surface,feature...` per
//! line), tokenizes by greedy longest match, and emits unknown characters one
//! at a time. Node surfaces point into the caller's input buffer the same
//! way MeCab's do.

use std::collections::HashSet;
use std::env;
use std::ffi::{CStr, CString, OsString};
use std::fs;
use std::os::raw::{c_char, c_int};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, OnceLock, PoisonError};

use crate::config::{MecabHandle, MecabNodeRaw};
use crate::constants::{
    MECAB_BOS_NODE, MECAB_EOS_NODE, MECAB_NOR_NODE, MECAB_RC_FILE_NAME, MECAB_UNK_NODE,
    REQUIRED_DICTIONARY_FILES,
};
use crate::native::MecabApi;
use crate::runtime::MecabLibrary;

fn env_lock() -> &'static Mutex<()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
}

fn set_env_var(key: &str, value: &str) {
    #[allow(unused_unsafe)]
    unsafe {
        env::set_var(key, value);
    }
}

fn remove_env_var(key: &str) {
    #[allow(unused_unsafe)]
    unsafe {
        env::remove_var(key);
    }
}

/// Runs a closure while holding a global environment lock and applying overrides.
pub(crate) fn with_env_vars<T>(overrides: &[(&str, Option<&str>)], f: impl FnOnce() -> T) -> T {
    let _guard = env_lock()
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    let backups: Vec<(&str, Option<OsString>)> = overrides
        .iter()
        .map(|(key, _)| (*key, env::var_os(key)))
        .collect();

    for (key, value) in overrides {
        match value {
            Some(value) => set_env_var(key, value),
            None => remove_env_var(key),
        }
    }

    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(f));

    for (key, value) in backups.into_iter().rev() {
        match value {
            Some(value) => {
                #[allow(unused_unsafe)]
                unsafe {
                    env::set_var(key, value);
                }
            }
            None => remove_env_var(key),
        }
    }

    match result {
        Ok(result) => result,
        Err(payload) => std::panic::resume_unwind(payload),
    }
}

/// Input that makes the fake tagger return a null node list.
pub(crate) const FAKE_PARSE_FAILURE_INPUT: &str = "\u{1}fail";

pub(crate) const FAKE_DICTIONARY: &str = "\
東,名詞,固有名詞,地域,一般,*,*,東,ヒガシ,ヒガシ
京,名詞,固有名詞,地域,一般,*,*,京,キョウ,キョー
に,助詞,格助詞,一般,*,*,*,に,ニ,ニ
行く,動詞,自立,*,*,五段・カ行促音便,基本形,行く,イク,イク
";

const SENTINEL_FEATURE: &str = "BOS/EOS,*,*,*,*,*,*,*,*";
const UNKNOWN_FEATURE: &str = "名詞,一般,*,*,*,*,*";

/// Writes a complete fake dictionary (every required file plus `mecabrc`).
pub(crate) fn write_fake_dictionary(dir: &Path) {
    fs::create_dir_all(dir).unwrap();
    for file in REQUIRED_DICTIONARY_FILES {
        let contents = if file == "sys.dic" { FAKE_DICTIONARY } else { "" };
        fs::write(dir.join(file), contents).unwrap();
    }
    fs::write(dir.join(MECAB_RC_FILE_NAME), "").unwrap();
}

pub(crate) fn fake_dictionary() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    write_fake_dictionary(dir.path());
    dir
}

pub(crate) fn fake_api() -> MecabApi {
    MecabApi {
        mecab_version: fake_version,
        mecab_strerror: fake_strerror,
        mecab_new: Some(fake_new),
        mecab_new2: fake_new2,
        mecab_destroy: fake_destroy,
        mecab_sparse_tonode2: fake_sparse_tonode2,
    }
}

pub(crate) fn fake_library() -> MecabLibrary {
    MecabLibrary::from_api(fake_api())
}

pub(crate) fn fake_library_without_argv() -> MecabLibrary {
    MecabLibrary::from_api(MecabApi {
        mecab_new: None,
        ..fake_api()
    })
}

/// Fake whose `mecab_strerror` never has a message.
pub(crate) fn fake_library_without_diagnostics() -> MecabLibrary {
    MecabLibrary::from_api(MecabApi {
        mecab_strerror: fake_silent_strerror,
        ..fake_api()
    })
}

/// Times `mecab_destroy` was called on a pointer that was not live.
pub(crate) fn fake_double_destroys() -> usize {
    DOUBLE_DESTROYS.load(Ordering::SeqCst)
}

static DOUBLE_DESTROYS: AtomicUsize = AtomicUsize::new(0);
static GLOBAL_ERROR: Mutex<Option<CString>> = Mutex::new(None);
static VERSION: &[u8] = b"0.996-fake\0";

fn live_fakes() -> &'static Mutex<HashSet<usize>> {
    static LIVE: OnceLock<Mutex<HashSet<usize>>> = OnceLock::new();
    LIVE.get_or_init(|| Mutex::new(HashSet::new()))
}

struct FakeTagger {
    entries: Vec<(Vec<u8>, CString)>,
    unknown_feature: CString,
    sentinel_feature: CString,
    nodes: Vec<MecabNodeRaw>,
    error: CString,
}

fn set_global_error(message: String) {
    let message = CString::new(message).unwrap();
    *GLOBAL_ERROR.lock().unwrap_or_else(PoisonError::into_inner) = Some(message);
}

fn open_fake(arguments: &[String]) -> MecabHandle {
    let value_of = |flag: &str| {
        arguments
            .iter()
            .position(|argument| argument == flag)
            .and_then(|index| arguments.get(index + 1))
            .map(PathBuf::from)
    };
    let (Some(dicdir), Some(rcfile)) = (value_of("--dicdir"), value_of("--rcfile")) else {
        set_global_error("param.cpp(69) [--dicdir and --rcfile are required]".to_string());
        return std::ptr::null_mut();
    };
    if !rcfile.is_file() {
        set_global_error(format!(
            "param.cpp(69) [ifs] no such file or directory: {}",
            rcfile.display()
        ));
        return std::ptr::null_mut();
    }
    let Ok(dictionary) = fs::read_to_string(dicdir.join("sys.dic")) else {
        set_global_error(format!(
            "dictionary.cpp(78) [!is_open()] no such file or directory: {}",
            dicdir.join("sys.dic").display()
        ));
        return std::ptr::null_mut();
    };

    let entries = dictionary
        .lines()
        .filter_map(|line| line.split_once(','))
        .map(|(surface, feature)| {
            (
                surface.as_bytes().to_vec(),
                CString::new(feature).unwrap(),
            )
        })
        .collect();
    let tagger = Box::new(FakeTagger {
        entries,
        unknown_feature: CString::new(UNKNOWN_FEATURE).unwrap(),
        sentinel_feature: CString::new(SENTINEL_FEATURE).unwrap(),
        nodes: Vec::new(),
        error: CString::default(),
    });
    let handle = Box::into_raw(tagger);
    live_fakes()
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .insert(handle as usize);
    handle.cast()
}

unsafe extern "C" fn fake_version() -> *const c_char {
    VERSION.as_ptr().cast()
}

unsafe extern "C" fn fake_strerror(handle: MecabHandle) -> *const c_char {
    if handle.is_null() {
        let guard = GLOBAL_ERROR.lock().unwrap_or_else(PoisonError::into_inner);
        return guard
            .as_ref()
            .map_or(std::ptr::null(), |message| message.as_ptr());
    }
    (*handle.cast::<FakeTagger>()).error.as_ptr()
}

unsafe extern "C" fn fake_silent_strerror(_handle: MecabHandle) -> *const c_char {
    std::ptr::null()
}

unsafe extern "C" fn fake_new(argc: c_int, argv: *mut *mut c_char) -> MecabHandle {
    let arguments: Vec<String> = (1..argc as usize)
        .map(|index| {
            CStr::from_ptr(*argv.add(index))
                .to_string_lossy()
                .into_owned()
        })
        .collect();
    open_fake(&arguments)
}

unsafe extern "C" fn fake_new2(arg: *const c_char) -> MecabHandle {
    let arguments: Vec<String> = CStr::from_ptr(arg)
        .to_string_lossy()
        .split_whitespace()
        .map(str::to_string)
        .collect();
    open_fake(&arguments)
}

unsafe extern "C" fn fake_destroy(handle: MecabHandle) {
    let was_live = live_fakes()
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .remove(&(handle as usize));
    if !was_live {
        DOUBLE_DESTROYS.fetch_add(1, Ordering::SeqCst);
        return;
    }
    drop(Box::from_raw(handle.cast::<FakeTagger>()));
}

fn utf8_width(lead: u8) -> usize {
    match lead {
        0xF0..=0xFF => 4,
        0xE0..=0xEF => 3,
        0xC0..=0xDF => 2,
        _ => 1,
    }
}

unsafe extern "C" fn fake_sparse_tonode2(
    handle: MecabHandle,
    input: *const c_char,
    length: usize,
) -> *const MecabNodeRaw {
    let tagger = &mut *handle.cast::<FakeTagger>();
    let bytes = std::slice::from_raw_parts(input.cast::<u8>(), length);
    if bytes == FAKE_PARSE_FAILURE_INPUT.as_bytes() {
        tagger.error = CString::new("tagger.cpp(231) [lattice->is_available()] lattice is broken")
            .unwrap();
        return std::ptr::null();
    }

    let sentinel = |offset: usize, stat: u8| MecabNodeRaw {
        surface: input.add(offset),
        feature: tagger.sentinel_feature.as_ptr(),
        stat,
        ..MecabNodeRaw::default()
    };
    let mut nodes = vec![sentinel(0, MECAB_BOS_NODE)];
    let mut offset = 0;
    while offset < bytes.len() {
        let rest = &bytes[offset..];
        let matched = tagger
            .entries
            .iter()
            .filter(|(surface, _)| !surface.is_empty() && rest.starts_with(surface))
            .max_by_key(|(surface, _)| surface.len());
        let (width, feature, stat) = match matched {
            Some((surface, feature)) => (surface.len(), feature.as_ptr(), MECAB_NOR_NODE),
            None => (
                utf8_width(rest[0]).min(rest.len()),
                tagger.unknown_feature.as_ptr(),
                MECAB_UNK_NODE,
            ),
        };
        nodes.push(MecabNodeRaw {
            surface: input.add(offset),
            feature,
            length: width as u16,
            stat,
            ..MecabNodeRaw::default()
        });
        offset += width;
    }
    nodes.push(sentinel(bytes.len(), MECAB_EOS_NODE));

    let base = nodes.as_mut_ptr();
    for index in 0..nodes.len() - 1 {
        nodes[index].next = base.add(index + 1);
        nodes[index + 1].prev = base.add(index);
    }
    tagger.nodes = nodes;
    tagger.nodes.as_ptr()
}
