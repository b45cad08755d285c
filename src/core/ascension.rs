//! From a window up to the program that owns it.
//!
//! window → process id → process handle → executable path → module basename

use std::path::PathBuf;

use tracing::debug;

use crate::error::{ConsoleError, ImagePathError, Result};
use crate::platform::{ConsoleApi, ProcessHandle, WindowHandle};

/// Initial path buffer, in UTF-16 units (MAX_PATH).
pub const INITIAL_PATH_BUFFER: usize = 260;

/// Largest path buffer tried, in UTF-16 units.
pub const MAX_PATH_BUFFER: usize = 64 * 1024;

/// Closes the process handle when dropped.
pub struct ProcessGuard<'a, A: ConsoleApi> {
    api: &'a A,
    handle: ProcessHandle,
}

impl<'a, A: ConsoleApi> ProcessGuard<'a, A> {
    /// Opens `pid` with limited query rights.
    pub fn open(api: &'a A, pid: u32) -> Result<Self> {
        let handle = api.open_process_for_query(pid)?;
        Ok(Self { api, handle })
    }

    pub fn handle(&self) -> ProcessHandle {
        self.handle
    }
}

impl<A: ConsoleApi> Drop for ProcessGuard<'_, A> {
    fn drop(&mut self) {
        self.api.close_process(self.handle);
    }
}

pub fn process_id_for<A: ConsoleApi>(api: &A, window: WindowHandle) -> Result<u32> {
    api.window_process_id(window)
}

/// Full executable path of `process`, growing the buffer as needed.
pub fn exe_path_for<A: ConsoleApi>(api: &A, process: ProcessHandle) -> Result<String> {
    let mut buffer = vec![0u16; INITIAL_PATH_BUFFER];
    loop {
        match api.query_process_image_path(process, &mut buffer) {
            Ok(len) => {
                return String::from_utf16(&buffer[..len])
                    .map_err(|_| ConsoleError::PrimitiveCallFailed("QueryFullProcessImageName"));
            }
            Err(ImagePathError::BufferTooSmall) => {
                if buffer.len() >= MAX_PATH_BUFFER {
                    return Err(ConsoleError::BufferGrowthExceededMax { max: MAX_PATH_BUFFER });
                }
                let size = (buffer.len() * 2).min(MAX_PATH_BUFFER);
                debug!("Path buffer too small, growing to {} units", size);
                buffer.resize(size, 0);
            }
            Err(ImagePathError::Failed(e)) => return Err(e),
        }
    }
}

/// Module name of an executable path: the file name without extension.
pub fn basename_of(path: &str) -> Result<String> {
    let start = path
        .rfind(['\\', '/'])
        .map(|i| i + 1)
        .ok_or_else(|| ConsoleError::PathWithoutBasename { path: path.to_string() })?;
    let name = &path[start..];
    let name = match name.rfind('.') {
        Some(dot) => &name[..dot],
        None => name,
    };
    Ok(name.to_string())
}

/// The program that owns a window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwningProcess {
    pub pid: u32,
    pub exe_path: PathBuf,
    pub module_name: String,
}

/// Walks from `window` to its owning process.
pub fn owning_process<A: ConsoleApi>(api: &A, window: WindowHandle) -> Result<OwningProcess> {
    let pid = process_id_for(api, window)?;
    let exe_path = {
        let process = ProcessGuard::open(api, pid)?;
        exe_path_for(api, process.handle())?
    };
    let module_name = basename_of(&exe_path)?;
    debug!("Window {:?} belongs to pid {} ({})", window, pid, exe_path);
    Ok(OwningProcess { pid, exe_path: PathBuf::from(exe_path), module_name })
}
