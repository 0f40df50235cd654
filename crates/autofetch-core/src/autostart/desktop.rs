//! XDG autostart directory as the startup namespace.
//!
//! Each value is a `<name>.desktop` file in `$XDG_CONFIG_HOME/autostart`; the
//! stored command is its `Exec=` line. Commands have the form
//! `program "argument"`: the span between the first and last double quote is
//! one quoted argument and is escaped as such.

use super::{StartupKey, StartupNamespace};
use anyhow::Result;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

const DESKTOP_SUFFIX: &str = ".desktop";

/// Per-user autostart directory.
#[derive(Debug, Clone)]
pub struct XdgAutostart {
    dir: PathBuf,
}

impl XdgAutostart {
    /// `~/.config/autostart` (honours `XDG_CONFIG_HOME`).
    pub fn default_location() -> Result<Self> {
        let xdg_dirs = xdg::BaseDirectories::new()?;
        Ok(Self::at(xdg_dirs.get_config_home().join("autostart")))
    }

    pub fn at(dir: impl Into<PathBuf>) -> Self {
        XdgAutostart { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Read back the command stored under `name`, if any.
    pub fn read_value(&self, name: &str) -> io::Result<Option<String>> {
        let path = entry_path(&self.dir, name)?;
        let text = match fs::read_to_string(&path) {
            Ok(t) => t,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        };
        Ok(text
            .lines()
            .find_map(|line| line.strip_prefix("Exec="))
            .map(decode_exec))
    }
}

impl StartupNamespace for XdgAutostart {
    type Key = XdgAutostartKey;

    fn open_for_write(&self) -> io::Result<XdgAutostartKey> {
        fs::create_dir_all(&self.dir)?;
        let meta = fs::metadata(&self.dir)?;
        if !meta.is_dir() {
            return Err(io::Error::other(format!(
                "{} is not a directory",
                self.dir.display()
            )));
        }
        if meta.permissions().readonly() {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("{} is read-only", self.dir.display()),
            ));
        }
        tracing::debug!(dir = %self.dir.display(), "opened autostart directory");
        Ok(XdgAutostartKey {
            dir: self.dir.clone(),
        })
    }

    fn describe(&self) -> String {
        self.dir.display().to_string()
    }
}

/// Opened autostart directory.
#[derive(Debug)]
pub struct XdgAutostartKey {
    dir: PathBuf,
}

impl StartupKey for XdgAutostartKey {
    fn set_value(&mut self, name: &str, value: &str) -> io::Result<()> {
        let path = entry_path(&self.dir, name)?;
        let exec = encode_exec(value)?;
        let tmp = crate::storage::temp_path(&path);
        fs::write(&tmp, desktop_entry(name, &exec))?;
        if let Err(e) = fs::rename(&tmp, &path) {
            let _ = fs::remove_file(&tmp);
            return Err(e);
        }
        Ok(())
    }
}

impl Drop for XdgAutostartKey {
    fn drop(&mut self) {
        tracing::trace!(dir = %self.dir.display(), "closed autostart directory");
    }
}

fn entry_path(dir: &Path, name: &str) -> io::Result<PathBuf> {
    if name.is_empty()
        || name.contains(['/', '\\'])
        || name.contains(char::is_control)
        || name.starts_with('.')
    {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("invalid startup entry name {name:?}"),
        ));
    }
    Ok(dir.join(format!("{name}{DESKTOP_SUFFIX}")))
}

fn desktop_entry(name: &str, exec: &str) -> String {
    format!(
        "[Desktop Entry]\n\
         Type=Application\n\
         Name={name}\n\
         Exec={exec}\n\
         X-GNOME-Autostart-enabled=true\n"
    )
}

/// Characters that must be backslash-escaped inside a quoted `Exec` argument.
const QUOTED_RESERVED: [char; 4] = ['"', '`', '$', '\\'];

/// Byte offsets of the first and last `"` when they differ.
fn quoted_span(s: &str) -> Option<(usize, usize)> {
    let open = s.find('"')?;
    let close = s.rfind('"')?;
    (close > open).then_some((open, close))
}

/// Encode a command for the `Exec` key: `%` becomes `%%`, reserved characters in
/// the quoted argument get a backslash, then backslashes are doubled for the
/// key-file string layer. Control characters are rejected.
fn encode_exec(command: &str) -> io::Result<String> {
    if command.contains(char::is_control) {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "startup command contains control characters",
        ));
    }
    let span = quoted_span(command);
    let mut quoted = String::with_capacity(command.len() + 8);
    for (i, c) in command.char_indices() {
        let inside = span.is_some_and(|(open, close)| i > open && i < close);
        if c == '%' {
            quoted.push_str("%%");
        } else if inside && QUOTED_RESERVED.contains(&c) {
            quoted.push('\\');
            quoted.push(c);
        } else {
            quoted.push(c);
        }
    }
    Ok(quoted.replace('\\', "\\\\"))
}

/// Inverse of [`encode_exec`].
fn decode_exec(raw: &str) -> String {
    let mut unescaped = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            unescaped.push(c);
            continue;
        }
        match chars.next() {
            Some('s') => unescaped.push(' '),
            Some('n') => unescaped.push('\n'),
            Some('t') => unescaped.push('\t'),
            Some('r') => unescaped.push('\r'),
            Some('\\') => unescaped.push('\\'),
            Some(other) => {
                unescaped.push('\\');
                unescaped.push(other);
            }
            None => unescaped.push('\\'),
        }
    }

    let span = quoted_span(&unescaped);
    let mut out = String::with_capacity(unescaped.len());
    let mut iter = unescaped.char_indices().peekable();
    while let Some((i, c)) = iter.next() {
        let inside = span.is_some_and(|(open, close)| i > open && i < close);
        match (c, iter.peek()) {
            ('%', Some(&(_, '%'))) => {
                iter.next();
                out.push('%');
            }
            ('\\', Some(&(_, next))) if inside && QUOTED_RESERVED.contains(&next) => {
                iter.next();
                out.push(next);
            }
            _ => out.push(c),
        }
    }
    out
}
