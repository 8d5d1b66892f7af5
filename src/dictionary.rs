//! Dictionary directory checks and provisioning.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;

use crate::constants::{MECAB_RC_FILE_NAME, REQUIRED_DICTIONARY_FILES};
use crate::error::{MecabError, Result};

fn edge_separators() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[\\/]+|[\\/]+$").expect("valid separator pattern"))
}

/// Strips leading and trailing `/` or `\` from an asset-relative name.
pub fn normalize_dictionary_name(name: &str) -> String {
    edge_separators().replace_all(name, "").into_owned()
}

/// Required dictionary files absent from `dir`, in canonical order.
pub fn missing_dictionary_files(dir: &Path) -> Vec<&'static str> {
    REQUIRED_DICTIONARY_FILES
        .iter()
        .copied()
        .filter(|file| !dir.join(file).is_file())
        .collect()
}

fn missing_files_error(missing: &[&str]) -> MecabError {
    MecabError::Initialization(format!(
        "Invalid contents of the dictionary directory. The following files are missing: \"{}\".",
        missing.join("\", \"")
    ))
}

/// Checks that `dir` exists and holds every compiled dictionary file.
pub fn verify_dictionary(dir: &Path) -> Result<()> {
    if !dir.is_dir() {
        return Err(MecabError::Initialization(format!(
            "Path \"{}\" was not found.",
            dir.display()
        )));
    }
    let missing = missing_dictionary_files(dir);
    if !missing.is_empty() {
        return Err(missing_files_error(&missing));
    }
    Ok(())
}

/// Creates an empty `mecabrc` in `dir` unless one exists. Returns its path.
pub fn ensure_rc_file(dir: &Path) -> Result<PathBuf> {
    let rc_file = dir.join(MECAB_RC_FILE_NAME);
    if !rc_file.exists() {
        fs::write(&rc_file, "")?;
        debug!(rc_file = %rc_file.display(), "created empty mecabrc");
    }
    Ok(rc_file)
}

/// Copies the dictionary `name` from `source_root` into `target_root/name`,
/// verifies it and provisions `mecabrc`. Returns the installed directory.
///
/// Used when the dictionary ships inside read-only application assets and
/// must be materialized on a writable filesystem before MeCab can open it.
pub fn install_dictionary(source_root: &Path, name: &str, target_root: &Path) -> Result<PathBuf> {
    let name = normalize_dictionary_name(name);
    let source = source_root.join(&name);
    if !source.is_dir() {
        return Err(MecabError::Initialization(format!(
            "Path \"{}\" was not found in {}.",
            name,
            source_root.display()
        )));
    }

    let target = target_root.join(&name);
    fs::create_dir_all(&target)?;

    let mut missing = Vec::new();
    for file in REQUIRED_DICTIONARY_FILES {
        let from = source.join(file);
        if !from.is_file() {
            missing.push(file);
            continue;
        }
        fs::copy(&from, target.join(file))?;
    }
    if !missing.is_empty() {
        return Err(missing_files_error(&missing));
    }

    let source_rc = source.join(MECAB_RC_FILE_NAME);
    if source_rc.is_file() {
        fs::copy(&source_rc, target.join(MECAB_RC_FILE_NAME))?;
    }
    ensure_rc_file(&target)?;
    debug!(source = %source.display(), target = %target.display(), "dictionary installed");
    Ok(target)
}
