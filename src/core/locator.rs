//! Finding the window that shows this process's console.
//!
//! `GetConsoleWindow` gives a pseudo window under Windows Terminal, so the
//! window is found by its title instead (Microsoft KB 124103):
//!
//! 1. Save the console title.
//! 2. Set a unique title.
//! 3. Wait for the host to show it and look for a top-level window with it.
//! 4. Restore the saved title.

use std::process;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tracing::{debug, warn};

use crate::error::{ConsoleError, Result};
use crate::platform::{ConsoleApi, WindowHandle};

/// Number of window searches before giving up.
pub const MAX_POLLS: u32 = 5;

/// Wait before each search, for the host to update the title.
pub const POLL_INTERVAL: Duration = Duration::from_millis(40);

/// Restores the console title when dropped.
struct TitleRestore<'a, A: ConsoleApi> {
    api: &'a A,
    original: String,
}

impl<A: ConsoleApi> Drop for TitleRestore<'_, A> {
    fn drop(&mut self) {
        if let Err(e) = self.api.set_console_title(&self.original) {
            warn!("Failed to restore console title: {}", e);
        }
    }
}

/// A title no other window is expected to have.
fn probe_title() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    format!("conprobe-{}-{:x}", process::id(), nanos)
}

/// Finds the console window by a title swap.
pub fn find_console_window<A: ConsoleApi>(api: &A) -> Result<WindowHandle> {
    let original = api.console_title()?;
    let probe = probe_title();
    api.set_console_title(&probe)?;
    let _restore = TitleRestore { api, original };

    for attempt in 1..=MAX_POLLS {
        api.sleep(POLL_INTERVAL);
        if let Some(window) = api.find_window_by_title(&probe) {
            debug!("Console window {:?} found on attempt {}", window, attempt);
            return Ok(window);
        }
    }
    Err(ConsoleError::WindowNotFound { attempts: MAX_POLLS })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::fake::{FakeConsole, FAKE_WINDOW};

    #[test]
    fn test_found_on_third_poll() {
        let mut api = FakeConsole::new();
        api.window_on_poll = Some(3);

        assert_eq!(find_console_window(&api).unwrap(), FAKE_WINDOW);
        assert_eq!(api.polls.get(), 3);
        assert_eq!(api.sleeps.get(), 3);

        // Probe title, then the original exactly once
        let sets = api.title_sets.borrow();
        assert_eq!(sets.len(), 2);
        assert!(sets[0].starts_with("conprobe-"));
        assert_eq!(sets[1], "Command Prompt");
        assert_eq!(*api.title.borrow(), "Command Prompt");
    }

    #[test]
    fn test_not_found_after_five_polls() {
        let mut api = FakeConsole::new();
        api.window_on_poll = None;

        let err = find_console_window(&api).unwrap_err();
        assert!(matches!(err, ConsoleError::WindowNotFound { attempts: 5 }));
        assert_eq!(api.polls.get(), MAX_POLLS);
        assert_eq!(api.sleeps.get(), MAX_POLLS);
        assert_eq!(api.title_sets.borrow().len(), 2);
        assert_eq!(*api.title.borrow(), "Command Prompt");
    }

    #[test]
    fn test_unreadable_title_leaves_title_alone() {
        let mut api = FakeConsole::new();
        api.title_readable = false;

        let err = find_console_window(&api).unwrap_err();
        assert!(matches!(err, ConsoleError::PrimitiveCallFailed("GetConsoleTitle")));
        assert!(api.title_sets.borrow().is_empty());
        assert_eq!(api.polls.get(), 0);
    }

    #[test]
    fn test_probe_titles_differ_from_original() {
        let title = probe_title();
        assert!(title.starts_with(&format!("conprobe-{}-", process::id())));
    }
}
