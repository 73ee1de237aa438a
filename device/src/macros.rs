/// Convert a `Path` into a `CString`, failing on non-UTF-8 paths and interior NULs
macro_rules! path_to_cstring {
    ( $path:expr ) => {{
        let path: &std::path::Path = $path;
        path.to_str()
            .ok_or_else(|| $crate::error::Error::InvalidPath(path.to_path_buf()))
            .and_then(|s| std::ffi::CString::new(s).map_err($crate::error::Error::Nul))
    }};
}

/// Convert a string type into a `CString`
macro_rules! to_cstring {
    ( $str:expr ) => {
        std::ffi::CString::new($str.as_bytes()).map_err($crate::error::Error::Nul)
    };
}

/// Convert a byte slice into `*const c_char`
macro_rules! to_byte_ptr {
    ( $bytes:expr ) => {
        $bytes.as_ptr().cast::<std::os::raw::c_char>()
    };
}

/// Convert an optional `CString` into a possibly null `*const c_char`
macro_rules! opt_ptr {
    ( $opt:expr ) => {
        match $opt {
            Some(ref s) => s.as_ptr(),
            None => std::ptr::null(),
        }
    };
}
