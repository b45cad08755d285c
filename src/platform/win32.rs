//! Win32 console primitives.
//!
//! Thin wrappers around the Win32 calls the probes need. Each failing call is
//! logged with its error and reported as `PrimitiveCallFailed` with the
//! function's name.

use std::ffi::c_void;
use std::io;
use std::os::windows::ffi::OsStrExt;
use std::path::Path;
use std::thread;
use std::time::Duration;

use crossterm::tty::IsTty;
use tracing::debug;

use windows::core::{PCWSTR, PWSTR};
use windows::Win32::Foundation::{
    CloseHandle, GetLastError, SetLastError, ERROR_INSUFFICIENT_BUFFER, HANDLE, HWND,
    WIN32_ERROR,
};
use windows::Win32::Globalization::{
    GetACP, GetCPInfoExW, GetLocaleInfoW, MultiByteToWideChar, CPINFOEXW,
    MULTI_BYTE_TO_WIDE_CHAR_FLAGS,
};
use windows::Win32::Storage::FileSystem::{GetFileVersionInfoSizeW, GetFileVersionInfoW};
use windows::Win32::System::Console::{
    GetConsoleCP, GetConsoleMode, GetConsoleTitleW, GetConsoleWindow, GetStdHandle,
    SetConsoleCP, SetConsoleMode, SetConsoleOutputCP, SetConsoleTitleW, CONSOLE_MODE,
    ENABLE_VIRTUAL_TERMINAL_PROCESSING, STD_OUTPUT_HANDLE,
};
use windows::Win32::System::Threading::{
    OpenProcess, QueryFullProcessImageNameW, PROCESS_NAME_WIN32,
    PROCESS_QUERY_LIMITED_INFORMATION,
};
use windows::Win32::UI::WindowsAndMessaging::{
    FindWindowW, GetClassNameW, GetWindowThreadProcessId,
};

use super::{ConsoleApi, ProcessHandle, StdStream, WindowHandle};
use crate::error::{ConsoleError, ImagePathError, Result};

/// `CP_ACP`: the process ANSI codepage.
const CP_ACP: u32 = 0;
const LOCALE_SYSTEM_DEFAULT: u32 = 0x0800;
const LOCALE_IDEFAULTANSICODEPAGE: u32 = 0x1004;
const LOCALE_RETURN_NUMBER: u32 = 0x2000_0000;

/// First console title buffer, in UTF-16 units (from a Microsoft example).
const TITLE_BUFFER: usize = 1024;
/// Titles are cut to fit, so the buffer grows until one is left over.
const MAX_TITLE_BUFFER: usize = 64 * 1024;

/// `WNDCLASS::lpszClassName` is at most 256 characters.
const CLASS_NAME_BUFFER: usize = 256;

#[derive(Debug, Default)]
pub struct Win32Console;

impl Win32Console {
    pub fn new() -> Self {
        Self
    }
}

fn wide(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(std::iter::once(0)).collect()
}

fn wide_path(path: &Path) -> Vec<u16> {
    path.as_os_str().encode_wide().chain(std::iter::once(0)).collect()
}

fn failed(name: &'static str, e: impl std::fmt::Debug) -> ConsoleError {
    debug!("{} failed: {:?}", name, e);
    ConsoleError::PrimitiveCallFailed(name)
}

fn hwnd(window: WindowHandle) -> HWND {
    HWND(window.0 as *mut c_void)
}

fn handle(process: ProcessHandle) -> HANDLE {
    HANDLE(process.0 as *mut c_void)
}

fn stdout_mode() -> Result<(HANDLE, CONSOLE_MODE)> {
    unsafe {
        let output = GetStdHandle(STD_OUTPUT_HANDLE).map_err(|e| failed("GetStdHandle", e))?;
        let mut mode = CONSOLE_MODE(0);
        GetConsoleMode(output, &mut mode).map_err(|e| failed("GetConsoleMode", e))?;
        Ok((output, mode))
    }
}

impl ConsoleApi for Win32Console {
    const WINDOW_MODEL: bool = true;

    fn has_console(&self) -> bool {
        unsafe { !GetConsoleWindow().0.is_null() }
    }

    fn is_a_console(&self, stream: StdStream) -> bool {
        match stream {
            StdStream::Input => io::stdin().is_tty(),
            StdStream::Output => io::stdout().is_tty(),
            StdStream::Error => io::stderr().is_tty(),
        }
    }

    fn console_title(&self) -> Result<String> {
        let mut size = TITLE_BUFFER;
        loop {
            let mut buffer = vec![0u16; size];
            let (len, error) = unsafe {
                // An empty title also returns 0, so the error code decides
                SetLastError(WIN32_ERROR(0));
                let len = GetConsoleTitleW(&mut buffer) as usize;
                (len, GetLastError())
            };
            let cut = error == ERROR_INSUFFICIENT_BUFFER || len + 1 >= size;
            if error.0 != 0 && !(cut && size < MAX_TITLE_BUFFER) {
                return Err(failed("GetConsoleTitle", error));
            }
            if !cut || size >= MAX_TITLE_BUFFER {
                return Ok(String::from_utf16_lossy(&buffer[..len.min(size)]));
            }
            debug!("Console title may be cut at {} units, retrying", size);
            size *= 2;
        }
    }

    fn set_console_title(&self, title: &str) -> Result<()> {
        let title = wide(title);
        unsafe {
            SetConsoleTitleW(PCWSTR(title.as_ptr())).map_err(|e| failed("SetConsoleTitle", e))
        }
    }

    fn find_window_by_title(&self, title: &str) -> Option<WindowHandle> {
        let title = wide(title);
        unsafe {
            FindWindowW(PCWSTR::null(), PCWSTR(title.as_ptr()))
                .ok()
                .filter(|w| !w.0.is_null())
                .map(|w| WindowHandle(w.0 as isize))
        }
    }

    fn sleep(&self, duration: Duration) {
        thread::sleep(duration);
    }

    fn window_class_name(&self, window: WindowHandle) -> Result<String> {
        let mut buffer = [0u16; CLASS_NAME_BUFFER];
        let len = unsafe { GetClassNameW(hwnd(window), &mut buffer) };
        if len <= 0 {
            return Err(failed("GetClassName", unsafe { GetLastError() }));
        }
        Ok(String::from_utf16_lossy(&buffer[..len as usize]))
    }

    fn window_process_id(&self, window: WindowHandle) -> Result<u32> {
        let mut pid = 0u32;
        let thread_id =
            unsafe { GetWindowThreadProcessId(hwnd(window), Some(&mut pid as *mut u32)) };
        if thread_id == 0 {
            return Err(failed("GetWindowThreadProcessId", unsafe { GetLastError() }));
        }
        Ok(pid)
    }

    fn open_process_for_query(&self, pid: u32) -> Result<ProcessHandle> {
        let process = unsafe { OpenProcess(PROCESS_QUERY_LIMITED_INFORMATION, false, pid) }
            .map_err(|e| failed("OpenProcess", e))?;
        Ok(ProcessHandle(process.0 as isize))
    }

    fn close_process(&self, process: ProcessHandle) {
        if let Err(e) = unsafe { CloseHandle(handle(process)) } {
            debug!("CloseHandle failed: {:?}", e);
        }
    }

    fn query_process_image_path(
        &self,
        process: ProcessHandle,
        buffer: &mut [u16],
    ) -> std::result::Result<usize, ImagePathError> {
        let mut size = buffer.len() as u32;
        let result = unsafe {
            QueryFullProcessImageNameW(
                handle(process),
                PROCESS_NAME_WIN32,
                PWSTR(buffer.as_mut_ptr()),
                &mut size,
            )
        };
        match result {
            Ok(()) => Ok(size as usize),
            Err(e) if e.code() == ERROR_INSUFFICIENT_BUFFER.to_hresult() => {
                Err(ImagePathError::BufferTooSmall)
            }
            Err(e) => Err(failed("QueryFullProcessImageName", e).into()),
        }
    }

    fn file_version_info_size(&self, path: &Path) -> u32 {
        let path = wide_path(path);
        unsafe { GetFileVersionInfoSizeW(PCWSTR(path.as_ptr()), None) }
    }

    fn file_version_info(&self, path: &Path, buffer: &mut [u8]) -> Result<()> {
        let path = wide_path(path);
        unsafe {
            GetFileVersionInfoW(
                PCWSTR(path.as_ptr()),
                0,
                buffer.len() as u32,
                buffer.as_mut_ptr() as *mut c_void,
            )
        }
        .map_err(|e| failed("GetFileVersionInfo", e))
    }

    fn console_codepage(&self) -> Result<u32> {
        match unsafe { GetConsoleCP() } {
            0 => Err(failed("GetConsoleCP", unsafe { GetLastError() })),
            cp => Ok(cp),
        }
    }

    fn set_console_codepage(&self, codepage: u32) -> Result<()> {
        unsafe {
            SetConsoleCP(codepage).map_err(|e| failed("SetConsoleCP", e))?;
            SetConsoleOutputCP(codepage).map_err(|e| failed("SetConsoleOutputCP", e))
        }
    }

    fn ansi_escapes_enabled(&self) -> Result<bool> {
        let (_, mode) = stdout_mode()?;
        Ok(mode.0 & ENABLE_VIRTUAL_TERMINAL_PROCESSING.0 != 0)
    }

    fn set_ansi_escapes_enabled(&self, enabled: bool) -> Result<()> {
        let (output, mode) = stdout_mode()?;
        let new_mode = if enabled {
            CONSOLE_MODE(mode.0 | ENABLE_VIRTUAL_TERMINAL_PROCESSING.0)
        } else {
            CONSOLE_MODE(mode.0 & !ENABLE_VIRTUAL_TERMINAL_PROCESSING.0)
        };
        unsafe { SetConsoleMode(output, new_mode) }.map_err(|e| failed("SetConsoleMode", e))
    }

    fn process_ansi_codepage(&self) -> u32 {
        unsafe { GetACP() }
    }

    fn system_ansi_codepage(&self) -> Result<u32> {
        // With LOCALE_RETURN_NUMBER the answer is a DWORD in two UTF-16 units
        let mut data = [0u16; 2];
        let n = unsafe {
            GetLocaleInfoW(
                LOCALE_SYSTEM_DEFAULT,
                LOCALE_IDEFAULTANSICODEPAGE | LOCALE_RETURN_NUMBER,
                Some(&mut data),
            )
        };
        if n == 0 {
            return Err(failed("GetLocaleInfo", unsafe { GetLastError() }));
        }
        Ok(data[0] as u32 | (data[1] as u32) << 16)
    }

    fn codepage_name(&self, codepage: u32) -> Option<String> {
        let mut info = CPINFOEXW::default();
        let ok = unsafe { GetCPInfoExW(codepage, 0, &mut info) }.is_ok();
        if !ok {
            return None;
        }
        let name = &info.CodePageName;
        let len = name.iter().position(|&c| c == 0).unwrap_or(name.len());
        Some(String::from_utf16_lossy(&name[..len]))
    }

    fn decode_narrow(&self, bytes: &[u8]) -> Result<Vec<u16>> {
        if bytes.is_empty() {
            return Ok(Vec::new());
        }
        let flags = MULTI_BYTE_TO_WIDE_CHAR_FLAGS::default();
        let size = unsafe { MultiByteToWideChar(CP_ACP, flags, bytes, None) };
        if size <= 0 {
            return Err(failed("MultiByteToWideChar", unsafe { GetLastError() }));
        }
        let mut result = vec![0u16; size as usize];
        let len = unsafe { MultiByteToWideChar(CP_ACP, flags, bytes, Some(&mut result)) };
        if len <= 0 {
            return Err(failed("MultiByteToWideChar", unsafe { GetLastError() }));
        }
        result.truncate(len as usize);
        Ok(result)
    }
}
