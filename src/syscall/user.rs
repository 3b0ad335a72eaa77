//! # 用户指针
//!
//! 本内核不开启分页，用户地址与内核地址恒等映射，用户传来的指针可以直接
//! 解引用。这里做的只是边界检查（空指针、字符串长度上限、参数个数上限）
//! 并把数据复制成内核自己持有的副本：`exec` 会覆盖用户栈，不能继续引用它。

use alloc::string::String;
use alloc::vec::Vec;
use core::mem::{align_of, size_of};

use crate::config::{MAX_EXEC_ARGS, MAX_USER_STR_LEN};
use crate::error::ProcError;

/// 读取以 0 结尾的用户字符串
///
/// ## Errors
///
/// - 空指针 - [`ProcError::InvalidArgument`]
/// - [`MAX_USER_STR_LEN`] 字节内没有结尾的 0 - [`ProcError::BadAddress`]
/// - 不是合法的 UTF-8 - [`ProcError::InvalidArgument`]
///
/// ## Safety
///
/// `ptr` 非空时必须指向可读内存，且在结尾 0 或长度上限之前一直可读。
pub unsafe fn translated_str(ptr: *const u8) -> Result<String, ProcError> {
    if ptr.is_null() {
        return Err(ProcError::InvalidArgument);
    }
    let mut bytes = Vec::new();
    for i in 0..MAX_USER_STR_LEN {
        let c = *ptr.add(i);
        if c == 0 {
            return String::from_utf8(bytes).map_err(|_| ProcError::InvalidArgument);
        }
        bytes.push(c);
    }
    Err(ProcError::BadAddress)
}

/// 读取以空指针结尾的参数数组
///
/// 空的 `argv` 指针视为没有参数。
///
/// ## Safety
///
/// `argv` 非空时必须指向以 0 结尾的指针数组，每个指针满足
/// [`translated_str`] 的要求。
pub unsafe fn translated_argv(argv: *const usize) -> Result<Vec<String>, ProcError> {
    let mut args = Vec::new();
    if argv.is_null() {
        return Ok(args);
    }
    loop {
        let arg = *argv.add(args.len());
        if arg == 0 {
            return Ok(args);
        }
        if args.len() == MAX_EXEC_ARGS {
            return Err(ProcError::ArgumentsTooLong);
        }
        // 单个参数超长也算参数列表过长
        let arg = translated_str(arg as *const u8).map_err(|err| match err {
            ProcError::BadAddress => ProcError::ArgumentsTooLong,
            err => err,
        })?;
        args.push(arg);
    }
}

/// 用户缓冲区
///
/// ## Errors
///
/// 非空缓冲区的指针为空，或 `[ptr, ptr + len)` 超过 `isize::MAX` 字节或越过
/// 地址空间末尾时返回 [`ProcError::BadAddress`]。
///
/// ## Safety
///
/// `ptr` 非空时 `[ptr, ptr + len)` 必须可写，且在返回值存活期间没有别的引用。
pub unsafe fn translated_byte_buffer(
    ptr: *mut u8,
    len: usize,
) -> Result<&'static mut [u8], ProcError> {
    if len == 0 {
        return Ok(&mut []);
    }
    if ptr.is_null() {
        return Err(ProcError::BadAddress);
    }
    check_range(ptr as usize, len)?;
    Ok(core::slice::from_raw_parts_mut(ptr, len))
}

/// 用户数组
///
/// ## Safety
///
/// 同 [`translated_byte_buffer`]，且 `ptr` 按 `T` 对齐。
pub unsafe fn translated_slice_mut<T>(
    ptr: *mut T,
    len: usize,
) -> Result<&'static mut [T], ProcError> {
    if ptr.is_null() {
        return Err(ProcError::InvalidArgument);
    }
    if (ptr as usize) % align_of::<T>() != 0 {
        return Err(ProcError::BadAddress);
    }
    let bytes = len.checked_mul(size_of::<T>()).ok_or(ProcError::BadAddress)?;
    check_range(ptr as usize, bytes)?;
    Ok(core::slice::from_raw_parts_mut(ptr, len))
}

/// 切片总长不超过 `isize::MAX` 且不回绕
fn check_range(start: usize, bytes: usize) -> Result<(), ProcError> {
    if bytes > isize::MAX as usize || start.checked_add(bytes).is_none() {
        return Err(ProcError::BadAddress);
    }
    Ok(())
}

/// 用户对象
///
/// ## Safety
///
/// 同 [`translated_slice_mut`]。
pub unsafe fn translated_refmut<T>(ptr: *mut T) -> Result<&'static mut T, ProcError> {
    let slice = translated_slice_mut(ptr, 1)?;
    Ok(&mut slice[0])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_terminated_strings() {
        let raw = b"hello\0ignored";
        assert_eq!(unsafe { translated_str(raw.as_ptr()) }.unwrap(), "hello");
        assert_eq!(
            unsafe { translated_str(core::ptr::null()) },
            Err(ProcError::InvalidArgument)
        );
    }

    #[test]
    fn unterminated_string_is_rejected() {
        let raw = [b'x'; MAX_USER_STR_LEN + 1];
        assert_eq!(unsafe { translated_str(raw.as_ptr()) }, Err(ProcError::BadAddress));
    }

    #[test]
    fn argv_stops_at_null() {
        let a = b"sh\0";
        let b = b"-c\0";
        let argv = [a.as_ptr() as usize, b.as_ptr() as usize, 0];
        let args = unsafe { translated_argv(argv.as_ptr()) }.unwrap();
        assert_eq!(args, ["sh", "-c"]);
        assert!(unsafe { translated_argv(core::ptr::null()) }.unwrap().is_empty());
    }

    #[test]
    fn oversized_arg_is_too_long() {
        let mut long = [b'a'; MAX_USER_STR_LEN + 1];
        long[MAX_USER_STR_LEN] = 0;
        let argv = [long.as_ptr() as usize, 0];
        assert_eq!(
            unsafe { translated_argv(argv.as_ptr()) },
            Err(ProcError::ArgumentsTooLong)
        );
    }

    #[test]
    fn huge_lengths_are_bad_addresses() {
        let mut word = 0u32;
        let ptr = &mut word as *mut u32;
        assert_eq!(
            unsafe { translated_slice_mut(ptr, usize::MAX / 4) }.err(),
            Some(ProcError::BadAddress)
        );
        assert_eq!(
            unsafe { translated_slice_mut(ptr, usize::MAX) }.err(),
            Some(ProcError::BadAddress)
        );
        let mut byte = 0u8;
        assert_eq!(
            unsafe { translated_byte_buffer(&mut byte, usize::MAX) }.err(),
            Some(ProcError::BadAddress)
        );
        assert_eq!(unsafe { translated_slice_mut(ptr, 1) }.map(|s| s.len()), Ok(1));
    }

    #[test]
    fn too_many_args() {
        let arg = b"x\0";
        let mut argv = [arg.as_ptr() as usize; MAX_EXEC_ARGS + 2];
        argv[MAX_EXEC_ARGS + 1] = 0;
        assert_eq!(
            unsafe { translated_argv(argv.as_ptr()) },
            Err(ProcError::ArgumentsTooLong)
        );
    }
}
