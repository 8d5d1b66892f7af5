use std::env;
use std::path::PathBuf;

pub(crate) fn default_library_candidates() -> &'static [&'static str] {
    #[cfg(target_os = "windows")]
    {
        &["libmecab.dll", "mecab.dll"]
    }
    #[cfg(any(target_os = "macos", target_os = "ios"))]
    {
        &[
            "libmecab.dylib",
            "libmecab.2.dylib",
            "/usr/local/lib/libmecab.dylib",
            "/opt/homebrew/lib/libmecab.dylib",
            "@rpath/libmecab.dylib",
            "@loader_path/libmecab.dylib",
            "@loader_path/../Frameworks/libmecab.dylib",
        ]
    }
    #[cfg(all(unix, not(any(target_os = "macos", target_os = "ios"))))]
    {
        &[
            "libmecab.so",
            "libmecab.so.2",
            "./libmecab.so",
            "/usr/local/lib/libmecab.so",
            "/usr/lib/libmecab.so.2",
            "/usr/lib/x86_64-linux-gnu/libmecab.so.2",
            "/usr/lib/aarch64-linux-gnu/libmecab.so.2",
        ]
    }
}

pub(crate) fn discover_default_library_path() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        let well_known = [
            PathBuf::from("C:\\Program Files\\MeCab\\bin\\libmecab.dll"),
            PathBuf::from("C:\\Program Files (x86)\\MeCab\\bin\\libmecab.dll"),
        ];
        for path in well_known {
            if path.exists() {
                return Some(path);
            }
        }
    }

    #[cfg(any(target_os = "macos", target_os = "ios"))]
    {
        if let Some(home) = env::var_os("HOME") {
            let path = PathBuf::from(home)
                .join(".local")
                .join("lib")
                .join("libmecab.dylib");
            if path.exists() {
                return Some(path);
            }
        }
    }

    #[cfg(all(unix, not(any(target_os = "macos", target_os = "ios"))))]
    {
        if let Some(home) = env::var_os("HOME") {
            let path = PathBuf::from(home)
                .join(".local")
                .join("lib")
                .join("libmecab.so");
            if path.exists() {
                return Some(path);
            }
        }
    }

    None
}

/// Dictionary directory named by `MECAB_DICDIR`, if set.
pub(crate) fn discover_default_dictionary_dir() -> Option<PathBuf> {
    env::var_os("MECAB_DICDIR").map(PathBuf::from)
}
