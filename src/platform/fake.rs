//! Scripted [`ConsoleApi`] for tests.
//!
//! Every answer is a public field; every call that matters is counted so
//! tests can assert on retry bounds and cleanup.

use std::cell::{Cell, RefCell};
use std::path::Path;
use std::time::Duration;

use super::{ConsoleApi, ProcessHandle, StdStream, WindowHandle, CP_UTF8};
use crate::core::version::{Version, FIXED_INFO_SIGNATURE};
use crate::error::{ConsoleError, ImagePathError, Result};

pub const FAKE_WINDOW: WindowHandle = WindowHandle(0x0042_0042);
pub const FAKE_PROCESS: ProcessHandle = ProcessHandle(0x77);

/// How the fake decodes narrow strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NarrowDecoding {
    Utf8,
    /// Every byte is its own code point, like a Western legacy codepage.
    Latin1,
    /// A broken decoder: two code points, neither matching the legacy reading.
    Garbage,
    /// A double-byte codepage: both bytes become one unrelated character.
    DoubleByte,
}

pub struct FakeConsole {
    pub console: bool,
    pub title: RefCell<String>,
    pub title_readable: bool,
    /// 1-based poll on which the window shows up; `None` for never.
    pub window_on_poll: Option<u32>,
    pub class_name: Option<String>,
    pub process_id: Option<u32>,
    pub open_process_allowed: bool,
    pub image_path: String,
    /// Number of "buffer too small" answers before success; `None` for always.
    pub too_small_answers: Option<u32>,
    pub image_path_fails: bool,
    pub version_block: Option<Vec<u8>>,
    pub codepage: Cell<u32>,
    pub ansi_escapes: Cell<bool>,
    /// `false` models stdout redirected away from the console.
    pub ansi_mode_readable: bool,
    pub ansi_set_fails: bool,
    pub ansi_codepage: u32,
    pub decoding: NarrowDecoding,

    pub polls: Cell<u32>,
    pub sleeps: Cell<u32>,
    pub title_sets: RefCell<Vec<String>>,
    pub opened: Cell<u32>,
    pub closed: Cell<u32>,
    pub path_buffer_sizes: RefCell<Vec<usize>>,
    pub codepage_sets: RefCell<Vec<u32>>,
    pub ansi_mode_sets: Cell<u32>,
}

impl FakeConsole {
    /// A classic console, found on the first poll.
    pub fn new() -> Self {
        Self {
            console: true,
            title: RefCell::new("Command Prompt".to_string()),
            title_readable: true,
            window_on_poll: Some(1),
            class_name: Some("ConsoleWindowClass".to_string()),
            process_id: Some(4242),
            open_process_allowed: true,
            image_path: r"C:\Windows\System32\conhost.exe".to_string(),
            too_small_answers: Some(0),
            image_path_fails: false,
            version_block: None,
            codepage: Cell::new(437),
            ansi_escapes: Cell::new(false),
            ansi_mode_readable: true,
            ansi_set_fails: false,
            ansi_codepage: CP_UTF8,
            decoding: NarrowDecoding::Utf8,
            polls: Cell::new(0),
            sleeps: Cell::new(0),
            title_sets: RefCell::new(Vec::new()),
            opened: Cell::new(0),
            closed: Cell::new(0),
            path_buffer_sizes: RefCell::new(Vec::new()),
            codepage_sets: RefCell::new(Vec::new()),
            ansi_mode_sets: Cell::new(0),
        }
    }

    /// Windows Terminal hosting, with the given product version if any.
    pub fn windows_terminal(version: Option<Version>) -> Self {
        let mut api = Self::new();
        api.class_name = Some("PseudoConsoleWindow".to_string());
        api.image_path =
            r"C:\Program Files\WindowsApps\Microsoft.WindowsTerminal_1.20\WindowsTerminal.exe"
                .to_string();
        api.version_block = version.map(|v| version_block(v, v));
        api
    }
}

impl ConsoleApi for FakeConsole {
    const WINDOW_MODEL: bool = true;

    fn has_console(&self) -> bool {
        self.console
    }

    fn is_a_console(&self, _stream: StdStream) -> bool {
        self.console
    }

    fn console_title(&self) -> Result<String> {
        if !self.title_readable {
            return Err(ConsoleError::PrimitiveCallFailed("GetConsoleTitle"));
        }
        Ok(self.title.borrow().clone())
    }

    fn set_console_title(&self, title: &str) -> Result<()> {
        self.title_sets.borrow_mut().push(title.to_string());
        *self.title.borrow_mut() = title.to_string();
        Ok(())
    }

    fn find_window_by_title(&self, _title: &str) -> Option<WindowHandle> {
        let poll = self.polls.get() + 1;
        self.polls.set(poll);
        match self.window_on_poll {
            Some(n) if poll >= n => Some(FAKE_WINDOW),
            _ => None,
        }
    }

    fn sleep(&self, _duration: Duration) {
        self.sleeps.set(self.sleeps.get() + 1);
    }

    fn window_class_name(&self, _window: WindowHandle) -> Result<String> {
        self.class_name
            .clone()
            .ok_or(ConsoleError::PrimitiveCallFailed("GetClassName"))
    }

    fn window_process_id(&self, _window: WindowHandle) -> Result<u32> {
        self.process_id
            .ok_or(ConsoleError::PrimitiveCallFailed("GetWindowThreadProcessId"))
    }

    fn open_process_for_query(&self, _pid: u32) -> Result<ProcessHandle> {
        if !self.open_process_allowed {
            return Err(ConsoleError::PrimitiveCallFailed("OpenProcess"));
        }
        self.opened.set(self.opened.get() + 1);
        Ok(FAKE_PROCESS)
    }

    fn close_process(&self, _process: ProcessHandle) {
        self.closed.set(self.closed.get() + 1);
    }

    fn query_process_image_path(
        &self,
        _process: ProcessHandle,
        buffer: &mut [u16],
    ) -> std::result::Result<usize, ImagePathError> {
        let mut sizes = self.path_buffer_sizes.borrow_mut();
        sizes.push(buffer.len());
        if self.image_path_fails {
            return Err(ConsoleError::PrimitiveCallFailed("QueryFullProcessImageName").into());
        }
        let answered = sizes.len() as u32 - 1;
        match self.too_small_answers {
            Some(n) if answered >= n => {}
            _ => return Err(ImagePathError::BufferTooSmall),
        }
        let wide: Vec<u16> = self.image_path.encode_utf16().collect();
        if wide.len() > buffer.len() {
            return Err(ImagePathError::BufferTooSmall);
        }
        buffer[..wide.len()].copy_from_slice(&wide);
        Ok(wide.len())
    }

    fn file_version_info_size(&self, _path: &Path) -> u32 {
        self.version_block.as_ref().map_or(0, |b| b.len() as u32)
    }

    fn file_version_info(&self, _path: &Path, buffer: &mut [u8]) -> Result<()> {
        let block = self
            .version_block
            .as_ref()
            .ok_or(ConsoleError::PrimitiveCallFailed("GetFileVersionInfo"))?;
        buffer.copy_from_slice(block);
        Ok(())
    }

    fn console_codepage(&self) -> Result<u32> {
        Ok(self.codepage.get())
    }

    fn set_console_codepage(&self, codepage: u32) -> Result<()> {
        self.codepage_sets.borrow_mut().push(codepage);
        self.codepage.set(codepage);
        Ok(())
    }

    fn ansi_escapes_enabled(&self) -> Result<bool> {
        if !self.ansi_mode_readable {
            return Err(ConsoleError::PrimitiveCallFailed("GetConsoleMode"));
        }
        Ok(self.ansi_escapes.get())
    }

    fn set_ansi_escapes_enabled(&self, enabled: bool) -> Result<()> {
        self.ansi_mode_sets.set(self.ansi_mode_sets.get() + 1);
        if !self.ansi_mode_readable || self.ansi_set_fails {
            return Err(ConsoleError::PrimitiveCallFailed("SetConsoleMode"));
        }
        self.ansi_escapes.set(enabled);
        Ok(())
    }

    fn process_ansi_codepage(&self) -> u32 {
        self.ansi_codepage
    }

    fn system_ansi_codepage(&self) -> Result<u32> {
        Ok(1252)
    }

    fn codepage_name(&self, codepage: u32) -> Option<String> {
        match codepage {
            CP_UTF8 => Some("65001 (UTF-8)".to_string()),
            1252 => Some("1252  (ANSI - Latin I)".to_string()),
            437 => Some("437   (OEM - United States)".to_string()),
            _ => None,
        }
    }

    fn decode_narrow(&self, bytes: &[u8]) -> Result<Vec<u16>> {
        Ok(match self.decoding {
            NarrowDecoding::Utf8 => String::from_utf8_lossy(bytes).encode_utf16().collect(),
            NarrowDecoding::Latin1 => bytes.iter().map(|&b| b as u16).collect(),
            NarrowDecoding::Garbage => vec![0xFFFD, 0xFFFD],
            NarrowDecoding::DoubleByte => vec![0x8292],
        })
    }
}

/// A minimal `VS_VERSIONINFO` block with only the fixed file info.
pub fn version_block(product: Version, file: Version) -> Vec<u8> {
    fn packed(v: Version) -> (u32, u32) {
        ((v.major << 16) | (v.minor & 0xFFFF), (v.revision << 16) | (v.build & 0xFFFF))
    }

    let mut b = Vec::new();
    b.extend_from_slice(&0u16.to_le_bytes()); // wLength, patched below
    b.extend_from_slice(&52u16.to_le_bytes());
    b.extend_from_slice(&0u16.to_le_bytes());
    for unit in "VS_VERSION_INFO\0".encode_utf16() {
        b.extend_from_slice(&unit.to_le_bytes());
    }
    b.extend_from_slice(&[0, 0]); // padding to offset 40

    let (file_ms, file_ls) = packed(file);
    let (product_ms, product_ls) = packed(product);
    for dword in [
        FIXED_INFO_SIGNATURE,
        0x0001_0000,
        file_ms,
        file_ls,
        product_ms,
        product_ls,
        0x3F,
        0,
        0x0004_0004,
        1,
        0,
        0,
        0,
    ] {
        b.extend_from_slice(&dword.to_le_bytes());
    }
    let len = b.len() as u16;
    b[..2].copy_from_slice(&len.to_le_bytes());
    b
}
