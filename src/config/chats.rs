//! Required chat list and its flat-file store.

use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, info};

use super::{ENTRY_SEPARATOR, FIELD_SEPARATOR, REQUIRED_CHATS_KEY};

/// Errors that can occur while reading or rewriting the chat list.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to write config file {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Chat {field} {value:?} is empty or contains a separator or line break")]
    InvalidField { field: &'static str, value: String },
}

/// A chat the user has to be a member of.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RequiredChat {
    /// Platform identifier: a numeric chat id or an `@handle`.
    pub id: String,

    /// Invite URL shown to users who are missing this chat. May be empty.
    pub link: String,
}

impl RequiredChat {
    /// Creates a new required chat entry.
    #[must_use]
    pub fn new(id: impl Into<String>, link: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            link: link.into(),
        }
    }

    /// Whether there is a link a user could follow to join.
    #[must_use]
    pub fn has_link(&self) -> bool {
        !self.link.is_empty()
    }
}

impl fmt::Display for RequiredChat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{FIELD_SEPARATOR}{}", self.id, self.link)
    }
}

/// Whether [`ChatStore::upsert`] replaced an entry or appended one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Added,
    Updated,
}

/// Parses a stored chat list value.
///
/// Entries without a `|` separator, or with an empty id, are dropped.
/// Anything after a second `|` in an entry is ignored.
#[must_use]
pub fn parse_chat_list(value: &str) -> Vec<RequiredChat> {
    value
        .split(ENTRY_SEPARATOR)
        .filter_map(|item| {
            let (id, rest) = item.split_once(FIELD_SEPARATOR)?;
            let link = rest.split_once(FIELD_SEPARATOR).map_or(rest, |(link, _)| link);
            let id = id.trim();
            if id.is_empty() {
                return None;
            }
            Some(RequiredChat::new(id, link.trim()))
        })
        .collect()
}

/// Serializes chats into the single-line stored form.
#[must_use]
pub fn serialize_chat_list(chats: &[RequiredChat]) -> String {
    chats
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(&ENTRY_SEPARATOR.to_string())
}

/// Reads and rewrites the required chat list inside an env file.
///
/// Nothing is cached: every [`load`](Self::load) reads the file again so
/// edits made by another process show up immediately.
#[derive(Debug, Clone)]
pub struct ChatStore {
    path: PathBuf,
    key: String,
}

impl ChatStore {
    /// Creates a store backed by the given file, using the default key.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            key: REQUIRED_CHATS_KEY.to_owned(),
        }
    }

    /// Uses a different key for the chat list line.
    #[must_use]
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Key of the chat list line.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Loads the configured chats.
    ///
    /// A missing file, a missing key, or an empty value all yield an empty list.
    pub fn load(&self) -> Result<Vec<RequiredChat>, StoreError> {
        let Some(content) = self.read()? else {
            debug!("Config file {} not found", self.path.display());
            return Ok(Vec::new());
        };

        let chats = field_value(&content, &self.key)
            .map(parse_chat_list)
            .unwrap_or_default();

        debug!("Loaded {} required chats", chats.len());
        Ok(chats)
    }

    /// Writes the full chat list back, leaving every other line untouched.
    ///
    /// The file is replaced through a temporary sibling so readers never
    /// observe a half-written file. Permissions of the existing file are kept
    /// and a symlinked file is rewritten at its target.
    pub fn save(&self, chats: &[RequiredChat]) -> Result<(), StoreError> {
        for chat in chats {
            check_storable("id", &chat.id, false)?;
            check_storable("link", &chat.link, true)?;
        }

        let content = self.read()?.unwrap_or_default();
        let updated = replace_field(&content, &self.key, &serialize_chat_list(chats));

        self.replace_file(updated.as_bytes())
            .map_err(|source| StoreError::Write {
                path: self.path.clone(),
                source,
            })?;

        info!(
            "Saved {} required chats to {}",
            chats.len(),
            self.path.display()
        );
        Ok(())
    }

    /// Updates the link of the chat with a matching id, or appends a new entry.
    pub fn upsert(&self, id: &str, link: &str) -> Result<UpsertOutcome, StoreError> {
        let mut chats = self.load()?;

        let outcome = if let Some(existing) = chats.iter_mut().find(|c| c.id == id) {
            link.clone_into(&mut existing.link);
            UpsertOutcome::Updated
        } else {
            chats.push(RequiredChat::new(id, link));
            UpsertOutcome::Added
        };

        self.save(&chats)?;
        Ok(outcome)
    }

    /// Removes every configured chat, keeping the (now empty) key line.
    pub fn clear(&self) -> Result<(), StoreError> {
        self.save(&[])
    }

    fn replace_file(&self, content: &[u8]) -> io::Result<()> {
        let target = match fs::canonicalize(&self.path) {
            Ok(target) => target,
            Err(e) if e.kind() == io::ErrorKind::NotFound => self.path.clone(),
            Err(e) => return Err(e),
        };
        let dir = match target.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };

        // Dropped (and deleted) on any early return.
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(content)?;
        tmp.as_file().sync_all()?;

        match fs::metadata(&target) {
            Ok(meta) => tmp.as_file().set_permissions(meta.permissions())?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }

        tmp.persist(&target).map_err(|e| e.error)?;
        Ok(())
    }

    fn read(&self) -> Result<Option<String>, StoreError> {
        match fs::read_to_string(&self.path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Read {
                path: self.path.clone(),
                source,
            }),
        }
    }
}

/// Rejects values that would not survive a save/load cycle.
fn check_storable(field: &'static str, value: &str, allow_empty: bool) -> Result<(), StoreError> {
    let breaks_format = value.contains([ENTRY_SEPARATOR, FIELD_SEPARATOR, '\n', '\r']);
    let blank = value.trim().is_empty() && !(allow_empty && value.is_empty());
    if breaks_format || blank || value.trim() != value {
        return Err(StoreError::InvalidField {
            field,
            value: value.to_owned(),
        });
    }
    Ok(())
}

/// Returns the value of the first `key=` line, without surrounding quotes.
fn field_value<'a>(content: &'a str, key: &str) -> Option<&'a str> {
    content.lines().find_map(|line| {
        let value = line.strip_prefix(key)?.strip_prefix('=')?.trim();
        Some(unquote(value))
    })
}

fn unquote(value: &str) -> &str {
    ['"', '\'']
        .into_iter()
        .find_map(|q| value.strip_prefix(q)?.strip_suffix(q))
        .unwrap_or(value)
}

/// Rewrites every `key=` line with the new value, or appends one.
fn replace_field(content: &str, key: &str, value: &str) -> String {
    let prefix = format!("{key}=");
    let new_line = format!("{prefix}{value}\n");

    let mut out = String::with_capacity(content.len() + new_line.len());
    let mut found = false;

    for line in content.split_inclusive('\n') {
        if line.starts_with(&prefix) {
            out.push_str(&new_line);
            found = true;
        } else {
            out.push_str(line);
        }
    }

    if !found {
        if !out.is_empty() && !out.ends_with('\n') {
            out.push('\n');
        }
        out.push_str(&new_line);
    }

    out
}
