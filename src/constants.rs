//! Constants mirrored from the MeCab C API plus bridge status codes.

/// Node stat: regular dictionary morpheme.
pub const MECAB_NOR_NODE: u8 = 0;
/// Node stat: unknown-word morpheme.
pub const MECAB_UNK_NODE: u8 = 1;
/// Node stat: begin-of-sentence sentinel.
pub const MECAB_BOS_NODE: u8 = 2;
/// Node stat: end-of-sentence sentinel.
pub const MECAB_EOS_NODE: u8 = 3;
/// Node stat: end of an N-best enumeration.
pub const MECAB_EON_NODE: u8 = 4;

/// Runtime-configuration file name expected inside a dictionary directory.
pub const MECAB_RC_FILE_NAME: &str = "mecabrc";

/// Files a compiled dictionary directory must contain.
pub const REQUIRED_DICTIONARY_FILES: [&str; 9] = [
    "char.bin",
    "dicrc",
    "left-id.def",
    "matrix.bin",
    "pos-id.def",
    "rewrite.def",
    "right-id.def",
    "sys.dic",
    "unk.dic",
];

/// Separator between surface and feature in a serialized result line.
pub const RESULT_SEPARATOR: &str = ": ";

/// Bridge status: success.
pub const MECAB_BRIDGE_OK: i32 = 0;
/// Bridge status: tagger construction failed.
pub const MECAB_BRIDGE_ERR_INITIALIZATION: i32 = 1;
/// Bridge status: null, never-issued, or disposed handle.
pub const MECAB_BRIDGE_ERR_INVALID_HANDLE: i32 = 2;
/// Bridge status: tokenization failed.
pub const MECAB_BRIDGE_ERR_PARSE: i32 = 3;
/// Bridge status: null pointer or otherwise invalid argument.
pub const MECAB_BRIDGE_ERR_INVALID_ARGUMENT: i32 = 4;
/// Bridge status: `libmecab` could not be loaded or is missing symbols.
pub const MECAB_BRIDGE_ERR_LIBRARY: i32 = 5;
/// Bridge status: filesystem failure.
pub const MECAB_BRIDGE_ERR_IO: i32 = 6;
/// Bridge status: a panic was caught at the boundary.
pub const MECAB_BRIDGE_ERR_PANIC: i32 = 7;
