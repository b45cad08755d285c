//! OS boundary for console probing.
//!
//! Everything the probes need from the operating system goes through the
//! [`ConsoleApi`] trait. The real implementation is picked at build time:
//!
//! ```text
//! platform/
//! ├── mod.rs    - ConsoleApi trait, handle types, NativeConsole alias
//! ├── win32.rs  - Win32Console (windows crate)
//! ├── unix.rs   - UnixConsole (controlling terminal, always UTF-8)
//! └── fake.rs   - FakeConsole, scripted answers for tests
//! ```
//!
//! No `unsafe` lives here; all FFI is confined to `win32`.

use std::path::Path;
use std::time::Duration;

use crate::error::{ImagePathError, Result};

#[cfg(windows)]
pub mod win32;
#[cfg(not(windows))]
pub mod unix;
#[cfg(test)]
pub mod fake;

#[cfg(windows)]
pub use win32::Win32Console as NativeConsole;
#[cfg(not(windows))]
pub use unix::UnixConsole as NativeConsole;

/// Codepage identifier of UTF-8.
pub const CP_UTF8: u32 = 65001;

/// Opaque top-level window handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowHandle(pub isize);

/// Opaque process handle. Must be given back to [`ConsoleApi::close_process`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProcessHandle(pub isize);

/// Standard stream selector for the console check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StdStream {
    Input,
    Output,
    Error,
}

/// Console and text-encoding primitives.
pub trait ConsoleApi {
    /// Whether consoles live in top-level windows that can be found and
    /// traced back to a host process. Without one, a controlling terminal is
    /// all there is to know.
    const WINDOW_MODEL: bool;

    /// Whether this process has a console attached at all.
    fn has_console(&self) -> bool;

    /// Whether the given standard stream is connected to a console.
    fn is_a_console(&self, stream: StdStream) -> bool;

    fn console_title(&self) -> Result<String>;
    fn set_console_title(&self, title: &str) -> Result<()>;

    /// Top-level window whose title is exactly `title`.
    fn find_window_by_title(&self, title: &str) -> Option<WindowHandle>;

    fn sleep(&self, duration: Duration);

    fn window_class_name(&self, window: WindowHandle) -> Result<String>;

    /// Id of the process that owns `window`.
    fn window_process_id(&self, window: WindowHandle) -> Result<u32>;

    /// Opens `pid` with limited query rights only.
    fn open_process_for_query(&self, pid: u32) -> Result<ProcessHandle>;
    fn close_process(&self, process: ProcessHandle);

    /// Writes the full executable path of `process` into `buffer` as UTF-16
    /// and returns its length in units.
    fn query_process_image_path(
        &self,
        process: ProcessHandle,
        buffer: &mut [u16],
    ) -> std::result::Result<usize, ImagePathError>;

    /// Size in bytes of the file's version-info block, zero when it has none.
    fn file_version_info_size(&self, path: &Path) -> u32;
    fn file_version_info(&self, path: &Path, buffer: &mut [u8]) -> Result<()>;

    fn console_codepage(&self) -> Result<u32>;
    /// Sets both the input and the output console codepage.
    fn set_console_codepage(&self, codepage: u32) -> Result<()>;

    fn ansi_escapes_enabled(&self) -> Result<bool>;
    fn set_ansi_escapes_enabled(&self, enabled: bool) -> Result<()>;

    /// Codepage the narrow-string APIs of this process use.
    fn process_ansi_codepage(&self) -> u32;
    /// Default ANSI codepage of the system locale.
    fn system_ansi_codepage(&self) -> Result<u32>;
    fn codepage_name(&self, codepage: u32) -> Option<String>;

    /// Decodes `bytes` the way the narrow-string APIs would, to UTF-16.
    fn decode_narrow(&self, bytes: &[u8]) -> Result<Vec<u16>>;
}
