use std::os::raw::{c_char, c_float, c_long, c_short, c_uint, c_ushort, c_void};

pub(crate) type MecabHandle = *mut c_void;
pub(crate) type MecabPathHandle = *mut c_void;

/// Layout of `mecab_node_t` from `mecab.h`.
#[repr(C)]
#[derive(Clone, Copy, Debug)]
pub(crate) struct MecabNodeRaw {
    pub(crate) prev: *mut MecabNodeRaw,
    pub(crate) next: *mut MecabNodeRaw,
    pub(crate) enext: *mut MecabNodeRaw,
    pub(crate) bnext: *mut MecabNodeRaw,
    pub(crate) rpath: MecabPathHandle,
    pub(crate) lpath: MecabPathHandle,
    pub(crate) surface: *const c_char,
    pub(crate) feature: *const c_char,
    pub(crate) id: c_uint,
    pub(crate) length: c_ushort,
    pub(crate) rlength: c_ushort,
    pub(crate) rc_attr: c_ushort,
    pub(crate) lc_attr: c_ushort,
    pub(crate) posid: c_ushort,
    pub(crate) char_type: u8,
    pub(crate) stat: u8,
    pub(crate) isbest: u8,
    pub(crate) alpha: c_float,
    pub(crate) beta: c_float,
    pub(crate) prob: c_float,
    pub(crate) wcost: c_short,
    pub(crate) cost: c_long,
}

impl Default for MecabNodeRaw {
    fn default() -> Self {
        Self {
            prev: std::ptr::null_mut(),
            next: std::ptr::null_mut(),
            enext: std::ptr::null_mut(),
            bnext: std::ptr::null_mut(),
            rpath: std::ptr::null_mut(),
            lpath: std::ptr::null_mut(),
            surface: std::ptr::null(),
            feature: std::ptr::null(),
            id: 0,
            length: 0,
            rlength: 0,
            rc_attr: 0,
            lc_attr: 0,
            posid: 0,
            char_type: 0,
            stat: 0,
            isbest: 0,
            alpha: 0.0,
            beta: 0.0,
            prob: 0.0,
            wcost: 0,
            cost: 0,
        }
    }
}
