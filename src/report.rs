//! Plain-text reports printed by the commands.
//!
//! Reports are built as data first and rendered to a `String`, so the
//! layout can be tested without a console.

use std::path::Path;

use crossterm::style::Stylize;
use unicode_width::UnicodeWidthStr;

use crate::core::{
    check_path_encoding, AppContext, ConsoleHost, PathEncoding, Version, VersionInfo,
};
use crate::error::{ConsoleError, Result};
use crate::platform::{ConsoleApi, StdStream};

/// Width of the label column.
const LABEL_WIDTH: usize = 26;

/// A titled group of label/value rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub title: String,
    pub rows: Vec<(String, String)>,
}

impl Section {
    fn new(title: &str) -> Self {
        Self { title: title.to_string(), rows: Vec::new() }
    }

    fn row(&mut self, label: &str, value: impl Into<String>) {
        self.rows.push((label.to_string(), value.into()));
    }
}

/// Renders sections, padding labels by display width.
pub fn render(sections: &[Section], color: bool) -> String {
    let mut out = String::new();
    for (i, section) in sections.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        if color {
            out.push_str(&format!("{}\n", section.title.as_str().bold()));
        } else {
            out.push_str(&format!("{}\n", section.title));
        }
        for (label, value) in &section.rows {
            let pad = LABEL_WIDTH.saturating_sub(label.width()).max(1);
            out.push_str(&format!("  {}{}{}\n", label, " ".repeat(pad), value));
        }
    }
    out
}

fn yes_no(b: bool) -> &'static str {
    if b { "yes" } else { "no" }
}

fn codepage_text<A: ConsoleApi>(api: &A, codepage: u32) -> String {
    match api.codepage_name(codepage) {
        Some(name) if name.contains(&codepage.to_string()) => name,
        Some(name) => format!("{} ({})", codepage, name),
        None => codepage.to_string(),
    }
}

/// Codepages, encoding assumptions and the path decoding verdict.
pub fn encoding_section<A: ConsoleApi>(ctx: &AppContext<A>) -> Result<Section> {
    let api = ctx.api();
    let mut s = Section::new("Encodings");

    s.row("Process ANSI codepage", codepage_text(api, api.process_ansi_codepage()));
    let system = match api.system_ansi_codepage() {
        Ok(cp) => codepage_text(api, cp),
        Err(e) => format!("unavailable ({})", e),
    };
    s.row("System ANSI codepage", system);
    let console = match api.console_codepage() {
        Ok(cp) => codepage_text(api, cp),
        Err(_) => "n/a".to_string(),
    };
    s.row("Console codepage", console);

    let assumption = ctx.encoding_assumption();
    s.row("Literals are UTF-8", yes_no(assumption.literals_are_utf8));
    s.row("OS narrow APIs are UTF-8", yes_no(assumption.os_api_is_utf8));
    s.row("UTF-8 throughout", yes_no(assumption.holds()));

    let path = check_path_encoding(api)?;
    s.row("Path bytes of \"ø\"", path.to_string());
    if let PathEncoding::Inconsistent { .. } = path {
        s.row("Warning", "path decoding matches neither UTF-8 nor a legacy codepage");
    }
    Ok(s)
}

/// Which standard streams are consoles.
pub fn streams_section<A: ConsoleApi>(api: &A) -> Section {
    let mut s = Section::new("Standard streams");
    s.row("stdin is a console", yes_no(api.is_a_console(StdStream::Input)));
    s.row("stdout is a console", yes_no(api.is_a_console(StdStream::Output)));
    s.row("stderr is a console", yes_no(api.is_a_console(StdStream::Error)));
    s
}

/// Console host id, kind and capabilities.
pub fn host_section(host: &ConsoleHost) -> Section {
    let mut s = Section::new("Console");
    let id = host.id.as_ref().map_or_else(|| "-".to_string(), |id| id.to_string());
    s.row("Host", id);
    s.row("Kind", host.kind.to_string());
    s.row("Windows Terminal", yes_no(host.kind.is_windows_terminal()));
    s.row("UTF-8 input", yes_no(host.kind.has_utf8_input()));
    s
}

/// Host section when detection failed.
pub fn host_unavailable_section(err: &ConsoleError) -> Section {
    let mut s = Section::new("Console");
    s.row("Host", format!("unavailable ({})", err));
    s
}

fn version_rows(s: &mut Section, label: &str, version: Result<Version>) {
    match version {
        Ok(v) => s.row(label, format!("{} ({})", v, v.to_hex_string())),
        Err(e) => s.row(label, format!("unavailable ({})", e)),
    }
}

/// Product and file version of an executable.
pub fn version_section<A: ConsoleApi>(api: &A, path: &Path) -> Section {
    let mut s = Section::new(&path.display().to_string());
    match VersionInfo::load(api, path) {
        Ok(info) => {
            version_rows(&mut s, "Product version", info.product_version());
            version_rows(&mut s, "File version", info.file_version());
        }
        Err(_) => s.row("Version", "No version info."),
    }
    s
}
