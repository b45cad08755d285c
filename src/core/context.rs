//! Per-process probe state.
//!
//! The console host and the literal check are computed at most once. A failed
//! host detection is remembered too, so the title swap never runs twice. The
//! context is created in `main` and passed down by reference; `OnceCell`
//! keeps it on one thread.

use std::cell::OnceCell;

use super::encoding::{literals_are_utf8, EncodingAssumption};
use super::host::{detect_host, ConsoleHost, ConsoleKind};
use super::session::ConsoleSession;
use crate::error::{ConsoleError, Result};
use crate::platform::ConsoleApi;

pub struct AppContext<A: ConsoleApi> {
    api: A,
    console_host: OnceCell<Result<ConsoleHost>>,
    encoding: OnceCell<EncodingAssumption>,
    literals_checked: OnceCell<()>,
}

impl<A: ConsoleApi> AppContext<A> {
    pub fn new(api: A) -> Self {
        Self {
            api,
            console_host: OnceCell::new(),
            encoding: OnceCell::new(),
            literals_checked: OnceCell::new(),
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// The console host, detected on first use.
    pub fn console_host(&self) -> Result<&ConsoleHost> {
        self.console_host
            .get_or_init(|| detect_host(&self.api))
            .as_ref()
            .map_err(|e| e.clone())
    }

    pub fn console_kind(&self) -> Result<ConsoleKind> {
        Ok(self.console_host()?.kind)
    }

    pub fn has_console(&self) -> Result<bool> {
        Ok(self.console_kind()?.has_console())
    }

    pub fn console_has_utf8_input(&self) -> Result<bool> {
        Ok(self.console_kind()?.has_utf8_input())
    }

    /// Fails with `ConsoleRequiredButAbsent` when no console is attached.
    pub fn require_console(&self) -> Result<&ConsoleHost> {
        if !self.has_console()? {
            return Err(ConsoleError::ConsoleRequiredButAbsent);
        }
        self.console_host()
    }

    pub fn encoding_assumption(&self) -> EncodingAssumption {
        *self.encoding.get_or_init(|| EncodingAssumption::detect(&self.api))
    }

    /// Fails if string literals are not UTF-8; a no-op once it has passed.
    pub fn assert_utf8_literals(&self) -> Result<()> {
        if self.literals_checked.get().is_some() {
            return Ok(());
        }
        if !literals_are_utf8() {
            return Err(ConsoleError::EncodingAssumptionViolated(
                "string literals are not UTF-8 encoded".to_string(),
            ));
        }
        let _ = self.literals_checked.set(());
        Ok(())
    }

    /// UTF-8 console session for the lifetime of the returned guard.
    pub fn utf8_session(&self) -> Result<ConsoleSession<'_, A>> {
        ConsoleSession::new(&self.api)
    }
}
