//! Console session guard.
//!
//! Puts the console in UTF-8 mode with ANSI escape processing for as long as
//! the guard lives, then puts it back the way it was.

use tracing::{debug, info, warn};

use crate::error::Result;
use crate::platform::{ConsoleApi, CP_UTF8};

/// Console settings in effect before the guard changed them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsoleSessionState {
    pub original_codepage: u32,
    /// `None` when stdout is not a console (redirected), so the mode is left alone.
    pub original_ansi_escapes_enabled: Option<bool>,
}

/// UTF-8 codepage plus ANSI escapes until dropped.
///
/// Neither `Clone` nor `Copy`: the captured state is restored by exactly
/// one owner.
pub struct ConsoleSession<'a, A: ConsoleApi> {
    api: &'a A,
    saved: Option<ConsoleSessionState>,
}

impl<'a, A: ConsoleApi> ConsoleSession<'a, A> {
    /// Captures the console state and switches to UTF-8 with ANSI escapes.
    /// Does nothing when no console is attached.
    pub fn new(api: &'a A) -> Result<Self> {
        if !api.has_console() {
            debug!("No console, session guard is inactive");
            return Ok(Self { api, saved: None });
        }

        let original_ansi_escapes_enabled = match api.ansi_escapes_enabled() {
            Ok(enabled) => Some(enabled),
            Err(e) => {
                debug!("Leaving the output mode alone: {}", e);
                None
            }
        };
        let saved = ConsoleSessionState {
            original_codepage: api.console_codepage()?,
            original_ansi_escapes_enabled,
        };
        // From here on a failure must still restore what was captured
        let session = Self { api, saved: Some(saved) };
        api.set_console_codepage(CP_UTF8)?;
        if saved.original_ansi_escapes_enabled.is_some() {
            api.set_ansi_escapes_enabled(true)?;
        }
        info!(
            "Console set to UTF-8 (was codepage {}, ANSI escapes {:?})",
            saved.original_codepage, saved.original_ansi_escapes_enabled
        );
        Ok(session)
    }

    pub fn is_active(&self) -> bool {
        self.saved.is_some()
    }
}

impl<A: ConsoleApi> Drop for ConsoleSession<'_, A> {
    fn drop(&mut self) {
        let Some(saved) = self.saved.take() else {
            return;
        };
        if let Err(e) = self.api.set_console_codepage(saved.original_codepage) {
            warn!("Failed to restore console codepage {}: {}", saved.original_codepage, e);
        }
        if let Some(enabled) = saved.original_ansi_escapes_enabled {
            if let Err(e) = self.api.set_ansi_escapes_enabled(enabled) {
                warn!("Failed to restore ANSI escape processing: {}", e);
            }
        }
        debug!("Console state restored");
    }
}
