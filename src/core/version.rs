//! Version numbers and the binary version resource of executables.
//!
//! The resource is a `VS_VERSIONINFO` block: a small header, the UTF-16 key
//! `VS_VERSION_INFO`, padding to a 32-bit boundary, then a fixed-size
//! `VS_FIXEDFILEINFO` value that starts with a magic signature.
//!
//! ```text
//! offset  size  field
//!      0     2  wLength
//!      2     2  wValueLength (52 for VS_FIXEDFILEINFO)
//!      4     2  wType
//!      6    32  szKey = "VS_VERSION_INFO\0"
//!     38     2  padding
//!     40    52  VS_FIXEDFILEINFO
//! ```

use std::fmt;
use std::path::Path;

use tracing::debug;

use crate::error::{ConsoleError, Result};
use crate::platform::ConsoleApi;

/// Key of the root block.
const ROOT_KEY: &str = "VS_VERSION_INFO";

/// `VS_FIXEDFILEINFO::dwSignature`.
pub const FIXED_INFO_SIGNATURE: u32 = 0xFEEF_04BD;

/// Size of `VS_FIXEDFILEINFO` in bytes.
const FIXED_INFO_SIZE: usize = 52;

/// Offset of the key in the root block header.
const KEY_OFFSET: usize = 6;

/// Four-part version number, most significant part first.
///
/// Ordering is lexicographic from `major` to `build`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub revision: u32,
    pub build: u32,
}

impl Version {
    pub const fn new(major: u32, minor: u32, revision: u32, build: u32) -> Self {
        Self { major, minor, revision, build }
    }

    /// Builds a version from the two packed 32-bit halves of a version resource.
    pub const fn from_packed(ms: u32, ls: u32) -> Self {
        Self::new(ms >> 16, ms & 0xFFFF, ls >> 16, ls & 0xFFFF)
    }

    /// False for the all-zero version, which stands for "no version".
    pub fn has_value(&self) -> bool {
        self.parts().iter().any(|&p| p != 0)
    }

    pub fn parts(&self) -> [u32; 4] {
        [self.major, self.minor, self.revision, self.build]
    }

    /// `XXXX.XXXX.XXXX.XXXX` form, as the parts are stored in the resource.
    pub fn to_hex_string(&self) -> String {
        format!(
            "{:04X}.{:04X}.{:04X}.{:04X}",
            self.major, self.minor, self.revision, self.build
        )
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}.{}", self.major, self.minor, self.revision, self.build)
    }
}

/// The numeric part of a version resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedFileInfo {
    pub signature: u32,
    pub struct_version: u32,
    pub file_version_ms: u32,
    pub file_version_ls: u32,
    pub product_version_ms: u32,
    pub product_version_ls: u32,
}

impl FixedFileInfo {
    pub fn product_version(&self) -> Version {
        Version::from_packed(self.product_version_ms, self.product_version_ls)
    }

    pub fn file_version(&self) -> Version {
        Version::from_packed(self.file_version_ms, self.file_version_ls)
    }
}

/// Raw version-info block of one file.
pub struct VersionInfo {
    buffer: Vec<u8>,
}

impl VersionInfo {
    /// Loads the version-info block of the file at `path`.
    ///
    /// Fails when the file has no version info; callers that only want the
    /// version if there is one should use [`opt_product_version`].
    pub fn load<A: ConsoleApi>(api: &A, path: &Path) -> Result<Self> {
        let size = api.file_version_info_size(path);
        if size == 0 {
            return Err(ConsoleError::PrimitiveCallFailed("GetFileVersionInfoSize"));
        }
        let mut buffer = vec![0u8; size as usize];
        api.file_version_info(path, &mut buffer)?;
        Ok(Self::from_bytes(buffer))
    }

    pub fn from_bytes(buffer: Vec<u8>) -> Self {
        Self { buffer }
    }

    /// Locates and validates the fixed info of the root block.
    pub fn fixed_info(&self) -> Result<FixedFileInfo> {
        let b = &self.buffer;
        let block_len = read_u16(b, 0)? as usize;
        let value_len = read_u16(b, 2)? as usize;
        if block_len > b.len() {
            return Err(ConsoleError::MalformedVersionResource("block length exceeds buffer"));
        }
        let b = &b[..block_len];

        let mut key = Vec::with_capacity(ROOT_KEY.len());
        let mut offset = KEY_OFFSET;
        loop {
            let unit = read_u16(b, offset)?;
            offset += 2;
            if unit == 0 {
                break;
            }
            key.push(unit);
        }
        if !ROOT_KEY.encode_utf16().eq(key.iter().copied()) {
            return Err(ConsoleError::MalformedVersionResource("root key is not VS_VERSION_INFO"));
        }

        if value_len < FIXED_INFO_SIZE {
            return Err(ConsoleError::MalformedVersionResource("no fixed file info"));
        }
        let value = align4(offset);
        if value + FIXED_INFO_SIZE > b.len() {
            return Err(ConsoleError::MalformedVersionResource("fixed file info is truncated"));
        }

        let signature = read_u32(b, value)?;
        if signature != FIXED_INFO_SIGNATURE {
            return Err(ConsoleError::InvalidVersionSignature { found: signature });
        }
        Ok(FixedFileInfo {
            signature,
            struct_version: read_u32(b, value + 4)?,
            file_version_ms: read_u32(b, value + 8)?,
            file_version_ls: read_u32(b, value + 12)?,
            product_version_ms: read_u32(b, value + 16)?,
            product_version_ls: read_u32(b, value + 20)?,
        })
    }

    pub fn product_version(&self) -> Result<Version> {
        Ok(self.fixed_info()?.product_version())
    }

    pub fn file_version(&self) -> Result<Version> {
        Ok(self.fixed_info()?.file_version())
    }
}

/// Product version of the file at `path`, or `None` when it has no usable
/// version info. Never fails.
pub fn opt_product_version<A: ConsoleApi>(api: &A, path: &Path) -> Option<Version> {
    match VersionInfo::load(api, path).and_then(|info| info.product_version()) {
        Ok(version) if version.has_value() => Some(version),
        Ok(_) => None,
        Err(e) => {
            debug!("No version for {}: {}", path.display(), e);
            None
        }
    }
}

fn align4(offset: usize) -> usize {
    (offset + 3) & !3
}

fn read_u16(b: &[u8], at: usize) -> Result<u16> {
    b.get(at..at + 2)
        .map(|s| u16::from_le_bytes([s[0], s[1]]))
        .ok_or(ConsoleError::MalformedVersionResource("unexpected end of block"))
}

fn read_u32(b: &[u8], at: usize) -> Result<u32> {
    b.get(at..at + 4)
        .map(|s| u32::from_le_bytes([s[0], s[1], s[2], s[3]]))
        .ok_or(ConsoleError::MalformedVersionResource("unexpected end of block"))
}
