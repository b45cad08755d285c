//! Unix terminals.
//!
//! There is no console window and no codepage: text is UTF-8 and escape
//! sequences are always on. The window primitives report failure so that
//! nothing mistakes a Unix terminal for a Windows host.

use std::fs::File;
use std::io;
use std::path::Path;
use std::thread;
use std::time::Duration;

use crossterm::tty::IsTty;

use super::{ConsoleApi, ProcessHandle, StdStream, WindowHandle, CP_UTF8};
use crate::error::{ConsoleError, ImagePathError, Result};

#[derive(Debug, Default)]
pub struct UnixConsole;

impl UnixConsole {
    pub fn new() -> Self {
        Self
    }
}

impl ConsoleApi for UnixConsole {
    const WINDOW_MODEL: bool = false;

    /// A controlling terminal exists iff `/dev/tty` can be opened.
    fn has_console(&self) -> bool {
        File::open("/dev/tty").is_ok()
    }

    fn is_a_console(&self, stream: StdStream) -> bool {
        match stream {
            StdStream::Input => io::stdin().is_tty(),
            StdStream::Output => io::stdout().is_tty(),
            StdStream::Error => io::stderr().is_tty(),
        }
    }

    fn console_title(&self) -> Result<String> {
        Err(ConsoleError::PrimitiveCallFailed("GetConsoleTitle"))
    }

    fn set_console_title(&self, _title: &str) -> Result<()> {
        Err(ConsoleError::PrimitiveCallFailed("SetConsoleTitle"))
    }

    fn find_window_by_title(&self, _title: &str) -> Option<WindowHandle> {
        None
    }

    fn sleep(&self, duration: Duration) {
        thread::sleep(duration);
    }

    fn window_class_name(&self, _window: WindowHandle) -> Result<String> {
        Err(ConsoleError::PrimitiveCallFailed("GetClassName"))
    }

    fn window_process_id(&self, _window: WindowHandle) -> Result<u32> {
        Err(ConsoleError::PrimitiveCallFailed("GetWindowThreadProcessId"))
    }

    fn open_process_for_query(&self, _pid: u32) -> Result<ProcessHandle> {
        Err(ConsoleError::PrimitiveCallFailed("OpenProcess"))
    }

    fn close_process(&self, _process: ProcessHandle) {}

    fn query_process_image_path(
        &self,
        _process: ProcessHandle,
        _buffer: &mut [u16],
    ) -> std::result::Result<usize, ImagePathError> {
        Err(ConsoleError::PrimitiveCallFailed("QueryFullProcessImageName").into())
    }

    fn file_version_info_size(&self, _path: &Path) -> u32 {
        0
    }

    fn file_version_info(&self, _path: &Path, _buffer: &mut [u8]) -> Result<()> {
        Err(ConsoleError::PrimitiveCallFailed("GetFileVersionInfo"))
    }

    fn console_codepage(&self) -> Result<u32> {
        Ok(CP_UTF8)
    }

    fn set_console_codepage(&self, _codepage: u32) -> Result<()> {
        Ok(())
    }

    fn ansi_escapes_enabled(&self) -> Result<bool> {
        Ok(true)
    }

    fn set_ansi_escapes_enabled(&self, _enabled: bool) -> Result<()> {
        Ok(())
    }

    fn process_ansi_codepage(&self) -> u32 {
        CP_UTF8
    }

    fn system_ansi_codepage(&self) -> Result<u32> {
        Ok(CP_UTF8)
    }

    fn codepage_name(&self, codepage: u32) -> Option<String> {
        (codepage == CP_UTF8).then(|| "UTF-8".to_string())
    }

    fn decode_narrow(&self, bytes: &[u8]) -> Result<Vec<u16>> {
        Ok(String::from_utf8_lossy(bytes).encode_utf16().collect())
    }
}
