//! TrueType font discovery for the table backend.
//!
//! `genpdf` needs a full font family on disk.  No font files ship with the crate.  The Roboto
//! family is looked up in the configured directory, `ASSET_REPORT_FONTS_DIR`, an `assets/fonts`
//! directory next to the executable and an `assets/fonts` directory in the crate sources, all of
//! which are optional.  When none of them has it, the Liberation Sans (Linux) or Arial (Windows)
//! system family is used instead.

use std::env;
use std::io;
use std::path::{Path, PathBuf};

use genpdf::error::{Error, ErrorKind};
use genpdf::fonts::{self, FontData, FontFamily};
use log::{info, warn};

/// Environment variable pointing at a directory with the Roboto font files.
pub const FONTS_DIR_ENV: &str = "ASSET_REPORT_FONTS_DIR";

/// Name of the preferred font family.
pub const DEFAULT_FONT_FAMILY_NAME: &str = "Roboto";

const FONT_FILES: &[&str] = &[
    "Roboto-Regular.ttf",
    "Roboto-Bold.ttf",
    "Roboto-Italic.ttf",
    "Roboto-BoldItalic.ttf",
];

/// A system font family used when Roboto cannot be found.
struct SystemFamily {
    name: &'static str,
    directories: &'static [&'static str],
    regular: &'static str,
    bold: &'static str,
    italic: &'static str,
    bold_italic: &'static str,
}

const SYSTEM_FAMILIES: &[SystemFamily] = &[
    SystemFamily {
        name: "Liberation Sans",
        directories: &[
            "/usr/share/fonts/truetype/liberation",
            "/usr/share/fonts/truetype/liberation2",
            "/usr/share/fonts/liberation-sans",
            "/usr/share/fonts/liberation",
        ],
        regular: "LiberationSans-Regular.ttf",
        bold: "LiberationSans-Bold.ttf",
        italic: "LiberationSans-Italic.ttf",
        bold_italic: "LiberationSans-BoldItalic.ttf",
    },
    SystemFamily {
        name: "Arial",
        directories: &["C:\\Windows\\Fonts"],
        regular: "arial.ttf",
        bold: "arialbd.ttf",
        italic: "ariali.ttf",
        bold_italic: "arialbi.ttf",
    },
];

/// Optional Roboto directory inside the crate sources, for local checkouts that provide one.
pub fn source_fonts_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("assets/fonts")
}

fn font_directory_candidates(configured: Option<&Path>) -> Vec<PathBuf> {
    let mut candidates: Vec<PathBuf> = Vec::new();
    let mut push = |candidate: PathBuf| {
        if !candidates.iter().any(|existing| existing == &candidate) {
            candidates.push(candidate);
        }
    };

    if let Some(path) = configured {
        push(path.to_path_buf());
    }

    if let Some(path) = env::var_os(FONTS_DIR_ENV).filter(|value| !value.is_empty()) {
        push(PathBuf::from(path));
    }

    if let Ok(current_exe) = env::current_exe() {
        if let Some(bin_dir) = current_exe.parent() {
            push(bin_dir.join("assets/fonts"));
        }
    }

    push(source_fonts_dir());
    candidates
}

fn missing_font_files(path: &Path) -> Vec<&'static str> {
    FONT_FILES
        .iter()
        .copied()
        .filter(|name| !path.join(name).is_file())
        .collect()
}

fn resolve_font_directory(configured: Option<&Path>) -> Result<PathBuf, Error> {
    let mut attempts = Vec::new();

    for candidate in font_directory_candidates(configured) {
        if !candidate.is_dir() {
            attempts.push(format!("{} (directory missing)", candidate.display()));
            continue;
        }

        let missing = missing_font_files(&candidate);
        if missing.is_empty() {
            return Ok(candidate);
        }
        attempts.push(format!(
            "{} (missing files [{}])",
            candidate.display(),
            missing.join(", ")
        ));
    }

    Err(Error::new(
        format!(
            "Unable to locate the {} font family. Checked: {}. Set {} or the report fonts_dir option.",
            DEFAULT_FONT_FAMILY_NAME,
            attempts.join(", "),
            FONTS_DIR_ENV
        ),
        io::Error::new(io::ErrorKind::NotFound, "font directory not found"),
    ))
}

fn load_system_font(directory: &Path, file: &str) -> Result<FontData, Error> {
    let path = directory.join(file);
    FontData::load(&path, None).map_err(|err| {
        Error::new(
            format!("Failed to load system font {}: {}", path.display(), err),
            io::Error::new(io::ErrorKind::NotFound, err.to_string()),
        )
    })
}

fn system_font_family() -> Option<(&'static str, FontFamily<FontData>)> {
    for family in SYSTEM_FAMILIES {
        for directory in family.directories.iter().map(Path::new) {
            if !directory.join(family.regular).is_file() {
                continue;
            }

            let loaded = (|| -> Result<FontFamily<FontData>, Error> {
                Ok(FontFamily {
                    regular: load_system_font(directory, family.regular)?,
                    bold: load_system_font(directory, family.bold)?,
                    italic: load_system_font(directory, family.italic)?,
                    bold_italic: load_system_font(directory, family.bold_italic)?,
                })
            })();

            match loaded {
                Ok(fonts) => return Some((family.name, fonts)),
                Err(err) => warn!("Ignoring incomplete {} family: {}", family.name, err),
            }
        }
    }
    None
}

fn fonts_missing(err: &Error) -> bool {
    matches!(
        err.kind(),
        ErrorKind::IoError(io_err)
            if io_err.kind() == io::ErrorKind::NotFound
                || io_err.kind() == io::ErrorKind::PermissionDenied
    )
}

/// Loads the Roboto family, falling back to a system family when it is not installed.
pub fn font_family(configured: Option<&Path>) -> Result<FontFamily<FontData>, Error> {
    let preferred = resolve_font_directory(configured).and_then(|directory| {
        info!("Loading {} fonts from {}", DEFAULT_FONT_FAMILY_NAME, directory.display());
        fonts::from_files(&directory, DEFAULT_FONT_FAMILY_NAME, None)
    });

    match preferred {
        Ok(family) => Ok(family),
        Err(err) if fonts_missing(&err) => match system_font_family() {
            Some((name, family)) => {
                warn!("{}; falling back to the system '{}' family.", err, name);
                Ok(family)
            }
            None => Err(Error::new(
                format!("{}; no system fallback family is installed either", err),
                io::Error::new(io::ErrorKind::NotFound, "report fonts are not available"),
            )),
        },
        Err(err) => Err(err),
    }
}

/// Whether [`font_family`] can find any usable family.
pub fn fonts_available(configured: Option<&Path>) -> bool {
    resolve_font_directory(configured).is_ok()
        || SYSTEM_FAMILIES.iter().any(|family| {
            family
                .directories
                .iter()
                .any(|directory| Path::new(directory).join(family.bold_italic).is_file())
        })
}
