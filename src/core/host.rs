//! Console host identification.
//!
//! The window class name identifies the classic console and mintty. Windows
//! Terminal's window class is shared with other XAML hosts, so for anything
//! else the owning executable is checked, and its version decides whether
//! UTF-8 input works.

use std::fmt;

use bitflags::bitflags;
use tracing::info;

use super::ascension::owning_process;
use super::locator::find_console_window;
use super::version::{opt_product_version, Version};
use crate::error::Result;
use crate::platform::ConsoleApi;

/// Window class of conhost windows (cmd, PowerShell, Git Bash in conhost).
pub const CLASSIC_CONSOLE_CLASS: &str = "ConsoleWindowClass";
/// Window class of mintty (MSYS2, Cygwin).
pub const MINTTY_CLASS: &str = "mintty";
/// Executable base name of Windows Terminal.
pub const WINDOWS_TERMINAL_MODULE: &str = "WindowsTerminal";

/// First Windows Terminal release that delivers UTF-8 input (May 2024).
pub const UTF8_INPUT_SINCE: Version = Version::new(1, 20, 0, 0);

/// Kind of program hosting the console.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ConsoleKind {
    None,
    Unknown,
    ClassicConsole,
    Mintty,
    OldWindowsTerminal,
    WindowsTerminal,
    Unix,
}

bitflags! {
    /// What a console host can do with UTF-8 text.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct HostCapabilities: u8 {
        const CONSOLE      = 0b0001;
        /// With the console codepage set to UTF-8.
        const UTF8_OUTPUT  = 0b0010;
        const ANSI_ESCAPES = 0b0100;
        const UTF8_INPUT   = 0b1000;
    }
}

impl ConsoleKind {
    pub fn capabilities(&self) -> HostCapabilities {
        let basic =
            HostCapabilities::CONSOLE | HostCapabilities::UTF8_OUTPUT | HostCapabilities::ANSI_ESCAPES;
        match self {
            Self::None => HostCapabilities::empty(),
            Self::WindowsTerminal | Self::Unix => basic | HostCapabilities::UTF8_INPUT,
            _ => basic,
        }
    }

    pub fn has_console(&self) -> bool {
        *self != Self::None
    }

    pub fn has_utf8_input(&self) -> bool {
        self.capabilities().contains(HostCapabilities::UTF8_INPUT)
    }

    pub fn is_windows_terminal(&self) -> bool {
        matches!(self, Self::WindowsTerminal | Self::OldWindowsTerminal)
    }
}

impl fmt::Display for ConsoleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::None => "no console",
            Self::Unknown => "unknown console host",
            Self::ClassicConsole => "classic console",
            Self::Mintty => "mintty",
            Self::OldWindowsTerminal => "Windows Terminal (before 1.20)",
            Self::WindowsTerminal => "Windows Terminal",
            Self::Unix => "Unix terminal",
        };
        f.write_str(name)
    }
}

/// Name of the console host plus its version when that matters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleHostId {
    /// Window class name, or module basename for Windows Terminal.
    pub name: String,
    pub version: Option<Version>,
}

impl ConsoleHostId {
    pub fn kind(&self) -> ConsoleKind {
        if self.name == CLASSIC_CONSOLE_CLASS {
            ConsoleKind::ClassicConsole
        } else if self.name == MINTTY_CLASS {
            ConsoleKind::Mintty
        } else if self.name.eq_ignore_ascii_case(WINDOWS_TERMINAL_MODULE) {
            match self.version {
                Some(v) if v >= UTF8_INPUT_SINCE => ConsoleKind::WindowsTerminal,
                _ => ConsoleKind::OldWindowsTerminal,
            }
        } else {
            ConsoleKind::Unknown
        }
    }
}

impl fmt::Display for ConsoleHostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.version {
            Some(v) => write!(f, "{} {}", self.name, v),
            None => f.write_str(&self.name),
        }
    }
}

/// Identifies the program showing this process's console window.
pub fn console_host_id<A: ConsoleApi>(api: &A) -> Result<ConsoleHostId> {
    let window = find_console_window(api)?;
    let class_name = api.window_class_name(window)?;
    if class_name == CLASSIC_CONSOLE_CLASS || class_name == MINTTY_CLASS {
        return Ok(ConsoleHostId { name: class_name, version: None });
    }

    // The module name is usually unrelated (e.g. "Cmd") but identifies Windows Terminal
    let owner = owning_process(api, window)?;
    if owner.module_name.eq_ignore_ascii_case(WINDOWS_TERMINAL_MODULE) {
        let version = opt_product_version(api, &owner.exe_path);
        return Ok(ConsoleHostId { name: owner.module_name, version });
    }
    Ok(ConsoleHostId { name: class_name, version: None })
}

/// Detected console host: its kind, plus its id when a window was probed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleHost {
    pub kind: ConsoleKind,
    pub id: Option<ConsoleHostId>,
}

impl ConsoleHost {
    pub fn without_id(kind: ConsoleKind) -> Self {
        Self { kind, id: None }
    }
}

/// Detects the console host. Without a window model this is only the
/// controlling terminal check.
pub fn detect_host<A: ConsoleApi>(api: &A) -> Result<ConsoleHost> {
    if !api.has_console() {
        info!("No console attached");
        return Ok(ConsoleHost::without_id(ConsoleKind::None));
    }
    if !A::WINDOW_MODEL {
        return Ok(ConsoleHost::without_id(ConsoleKind::Unix));
    }
    let id = console_host_id(api)?;
    let kind = id.kind();
    info!("Console host: {} -> {:?}", id, kind);
    Ok(ConsoleHost { kind, id: Some(id) })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConsoleError;
    use crate::platform::fake::{version_block, FakeConsole};

    fn classify(api: &FakeConsole) -> Result<ConsoleKind> {
        Ok(detect_host(api)?.kind)
    }

    #[test]
    fn test_classic_console_ignores_process() {
        let mut api = FakeConsole::new();
        api.process_id = None;
        api.open_process_allowed = false;
        assert_eq!(classify(&api).unwrap(), ConsoleKind::ClassicConsole);
        assert_eq!(api.opened.get(), 0);
    }

    #[test]
    fn test_mintty() {
        let mut api = FakeConsole::new();
        api.class_name = Some("mintty".to_string());
        assert_eq!(classify(&api).unwrap(), ConsoleKind::Mintty);
    }

    #[test]
    fn test_windows_terminal_at_threshold() {
        let api = FakeConsole::windows_terminal(Some(Version::new(1, 20, 0, 0)));
        assert_eq!(classify(&api).unwrap(), ConsoleKind::WindowsTerminal);
        assert_eq!(api.closed.get(), api.opened.get());
    }

    #[test]
    fn test_windows_terminal_above_threshold() {
        let api = FakeConsole::windows_terminal(Some(Version::new(1, 22, 10352, 0)));
        let id = console_host_id(&api).unwrap();
        assert_eq!(id.name, "WindowsTerminal");
        assert_eq!(id.version, Some(Version::new(1, 22, 10352, 0)));
        assert_eq!(id.kind(), ConsoleKind::WindowsTerminal);
    }

    #[test]
    fn test_old_windows_terminal() {
        let api = FakeConsole::windows_terminal(Some(Version::new(1, 19, 0, 0)));
        assert_eq!(classify(&api).unwrap(), ConsoleKind::OldWindowsTerminal);
    }

    #[test]
    fn test_windows_terminal_without_version() {
        let api = FakeConsole::windows_terminal(None);
        assert_eq!(classify(&api).unwrap(), ConsoleKind::OldWindowsTerminal);
    }

    #[test]
    fn test_windows_terminal_with_broken_version() {
        let mut api = FakeConsole::windows_terminal(None);
        let mut block = version_block(Version::new(1, 21, 0, 0), Version::default());
        block[40] = 0;
        api.version_block = Some(block);
        assert_eq!(classify(&api).unwrap(), ConsoleKind::OldWindowsTerminal);
    }

    #[test]
    fn test_unrelated_host_is_unknown() {
        let mut api = FakeConsole::new();
        api.class_name = Some("PseudoConsoleWindow".to_string());
        api.image_path = r"C:\Program Files\Alacritty\alacritty.exe".to_string();
        let id = console_host_id(&api).unwrap();
        assert_eq!(id.name, "PseudoConsoleWindow");
        assert_eq!(id.kind(), ConsoleKind::Unknown);
    }

    #[test]
    fn test_detect_host_keeps_id() {
        let api = FakeConsole::windows_terminal(Some(Version::new(1, 21, 1, 0)));
        let host = detect_host(&api).unwrap();
        assert_eq!(host.kind, ConsoleKind::WindowsTerminal);
        assert_eq!(host.id.unwrap().to_string(), "WindowsTerminal 1.21.1.0");
    }

    #[test]
    fn test_no_console() {
        let mut api = FakeConsole::new();
        api.console = false;
        assert_eq!(classify(&api).unwrap(), ConsoleKind::None);
        assert_eq!(api.polls.get(), 0);
    }

    #[test]
    fn test_locator_failure_propagates() {
        let mut api = FakeConsole::new();
        api.window_on_poll = None;
        assert!(matches!(classify(&api), Err(ConsoleError::WindowNotFound { .. })));
    }

    #[test]
    fn test_capabilities() {
        assert!(ConsoleKind::WindowsTerminal.has_utf8_input());
        assert!(ConsoleKind::Unix.has_utf8_input());
        assert!(!ConsoleKind::OldWindowsTerminal.has_utf8_input());
        assert!(!ConsoleKind::ClassicConsole.has_utf8_input());
        assert!(!ConsoleKind::Mintty.has_utf8_input());
        assert!(!ConsoleKind::None.has_console());
        assert!(ConsoleKind::None.capabilities().is_empty());
        assert!(ConsoleKind::Unknown
            .capabilities()
            .contains(HostCapabilities::CONSOLE | HostCapabilities::ANSI_ESCAPES));
    }
}
