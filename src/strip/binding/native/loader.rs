/*
 *  strip/binding/native/loader.rs
 *
 *  LyLEDs - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Library loader - finds and dlopens the rpi_ws281x shared library
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use std::ffi::{c_int, CStr};
use std::fmt;
use std::path::{Path, PathBuf};

use libloading::Library;
use log::{debug, info};

use super::ffi::{Ws2811FiniFn, Ws2811InitFn, Ws2811RenderFn, Ws2811ReturnStrFn};
use crate::strip::error::BindingError;
use crate::strip::traits::BindingKind;

/// Which build of the library to look for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeSource {
    /// Upstream rpi_ws281x
    Official,

    /// Patched build that knows newer board revisions
    Fallback,
}

impl NativeSource {
    pub fn kind(&self) -> BindingKind {
        match self {
            NativeSource::Official => BindingKind::NativeOfficial,
            NativeSource::Fallback => BindingKind::NativeFallback,
        }
    }

    /// Environment variable naming an extra search directory
    pub fn env_var(&self) -> &'static str {
        match self {
            NativeSource::Official => "LYLEDS_WS2811_PATH",
            NativeSource::Fallback => "LYLEDS_WS2811_FALLBACK_PATH",
        }
    }

    /// Candidate file names, most specific first
    pub fn filenames(&self) -> &'static [&'static str] {
        match self {
            NativeSource::Official => &["libws2811.so", "libws2811.so.1"],
            NativeSource::Fallback => &["libws281x.so", "libws281x.so.1"],
        }
    }
}

impl fmt::Display for NativeSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.filenames()[0])
    }
}

/// A loaded rpi_ws281x library with its entry points resolved
pub struct Ws2811Library {
    pub(super) init: Ws2811InitFn,
    pub(super) render: Ws2811RenderFn,
    pub(super) fini: Ws2811FiniFn,

    /// Optional, older builds lack it
    return_str: Option<Ws2811ReturnStrFn>,

    /// Where it was loaded from
    location: String,

    /// The loaded shared library (must outlive the fn pointers above)
    _library: Library,
}

impl Ws2811Library {
    /// Search directories in priority order
    pub fn search_paths(source: NativeSource) -> Vec<PathBuf> {
        let mut paths = Vec::new();

        if let Ok(path) = std::env::var(source.env_var()) {
            paths.push(PathBuf::from(path));
        }

        paths.push(PathBuf::from("/usr/local/lib"));
        paths.push(PathBuf::from("/usr/lib"));
        paths.push(PathBuf::from(format!("/usr/lib/{}-linux-gnu", std::env::consts::ARCH)));

        paths
    }

    /// Find a library file for the given source
    pub fn find(source: NativeSource) -> Option<PathBuf> {
        for dir in Self::search_paths(source) {
            if !dir.exists() {
                continue;
            }
            for filename in source.filenames() {
                let candidate = dir.join(filename);
                if candidate.exists() {
                    debug!("Found {} at: {}", source, candidate.display());
                    return Some(candidate);
                }
            }
        }
        None
    }

    /// Load the library for `source`: search paths first, then the
    /// dynamic loader's own search order
    pub fn load(source: NativeSource) -> Result<Self, BindingError> {
        if let Some(path) = Self::find(source) {
            return Self::load_from(&path);
        }

        for filename in source.filenames() {
            // SAFETY: loading runs the library's initializers; rpi_ws281x has none
            match unsafe { Library::new(filename) } {
                Ok(library) => return Self::from_library(library, filename.to_string()),
                Err(e) => debug!("dlopen({}) failed: {}", filename, e),
            }
        }

        let searched = Self::search_paths(source)
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(", ");
        Err(BindingError::NotFound {
            library: source.to_string(),
            searched,
        })
    }

    /// Load from an explicit path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, BindingError> {
        let path = path.as_ref();
        let location = path.display().to_string();
        info!("Loading ws281x library from: {}", location);

        // SAFETY: see load()
        let library = unsafe { Library::new(path) }.map_err(|e| BindingError::Load {
            library: location.clone(),
            reason: e.to_string(),
        })?;

        Self::from_library(library, location)
    }

    fn from_library(library: Library, location: String) -> Result<Self, BindingError> {
        let init = symbol::<Ws2811InitFn>(&library, &location, b"ws2811_init\0")?;
        let render = symbol::<Ws2811RenderFn>(&library, &location, b"ws2811_render\0")?;
        let fini = symbol::<Ws2811FiniFn>(&library, &location, b"ws2811_fini\0")?;
        let return_str =
            symbol::<Ws2811ReturnStrFn>(&library, &location, b"ws2811_get_return_t_str\0").ok();

        info!("Loaded ws281x library: {}", location);

        Ok(Self {
            init,
            render,
            fini,
            return_str,
            location,
            _library: library,
        })
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    /// Human-readable text for a `ws2811_return_t`
    pub fn describe(&self, code: c_int) -> String {
        let text = self.return_str.and_then(|f| {
            // SAFETY: the library returns a pointer into a static string table
            let ptr = unsafe { f(code) };
            if ptr.is_null() {
                None
            } else {
                Some(unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned())
            }
        });
        match text {
            Some(text) => format!("{} (code {})", text, code),
            None => format!("ws2811 error code {}", code),
        }
    }
}

/// Copy a function pointer out of the library
fn symbol<T: Copy>(library: &Library, location: &str, name: &[u8]) -> Result<T, BindingError> {
    // SAFETY: T is the documented signature of the named rpi_ws281x symbol
    unsafe { library.get::<T>(name) }
        .map(|sym| *sym)
        .map_err(|e| BindingError::Symbol {
            library: location.to_string(),
            symbol: String::from_utf8_lossy(name.strip_suffix(b"\0").unwrap_or(name)).into_owned(),
            reason: e.to_string(),
        })
}
