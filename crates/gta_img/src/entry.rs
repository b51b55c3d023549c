//! In-memory representation of one archive member.

use std::fmt;

use crate::compression::CompressionMethod;
use crate::types::pad_to_sector;

/// Descriptive classification of an entry, derived from its filename
/// extension. Not persisted in the binary format.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum EntryKind {
    /// RenderWare model (`.dff`)
    Model,
    /// RenderWare texture dictionary (`.txd`)
    Texture,
    /// Collision mesh container (`.col`)
    Collision,
    /// Animation package (`.ifp`)
    Animation,
    /// Audio stream (`.wav`)
    Audio,
    /// Compiled mission script (`.scm`)
    Script,
    /// Plain data file (`.dat`)
    Data,
    /// Item placement file (`.ipl`)
    Placement,
    /// Item definition file (`.ide`)
    Definition,
    /// Anything else
    Other,
}

impl EntryKind {
    /// Classify a filename by its extension, case-insensitively.
    pub fn from_name(name: &str) -> EntryKind {
        let ext = name.rsplit_once('.').map(|(_, ext)| ext).unwrap_or("");
        match ext.to_ascii_lowercase().as_str() {
            "dff" => EntryKind::Model,
            "txd" => EntryKind::Texture,
            "col" => EntryKind::Collision,
            "ifp" => EntryKind::Animation,
            "wav" => EntryKind::Audio,
            "scm" => EntryKind::Script,
            "dat" => EntryKind::Data,
            "ipl" => EntryKind::Placement,
            "ide" => EntryKind::Definition,
            _ => EntryKind::Other,
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EntryKind::Model => "model",
            EntryKind::Texture => "texture",
            EntryKind::Collision => "collision",
            EntryKind::Animation => "animation",
            EntryKind::Audio => "audio",
            EntryKind::Script => "script",
            EntryKind::Data => "data",
            EntryKind::Placement => "placement",
            EntryKind::Definition => "definition",
            EntryKind::Other => "other",
        };
        f.pad(label)
    }
}

/// One archive member.
///
/// Entries are created by the reader during directory parse, or by the
/// rebuilder when staging new content. A rebuild never mutates offsets in
/// place; it produces fresh entries with freshly computed offsets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Entry name; at most 24 bytes encoded, unique case-insensitively
    /// within a valid archive
    pub name: Box<str>,

    /// Byte offset of the payload within the data file; always a multiple
    /// of the sector size
    pub offset: u64,

    /// Payload length in bytes
    pub size: u64,

    /// How the payload bytes are stored
    pub compression: CompressionMethod,

    /// Payload length after decompression. Present (and larger than
    /// `size`) when the entry is compressed; `None` for raw entries and
    /// for compressed entries read back from disk, where the directory
    /// carries no such field.
    pub uncompressed_size: Option<u64>,
}

impl Entry {
    /// Space the payload occupies on disk: `size` rounded up to the next
    /// sector boundary.
    pub fn padded_size(&self) -> u64 {
        pad_to_sector(self.size)
    }

    /// Descriptive classification from the filename extension.
    pub fn kind(&self) -> EntryKind {
        EntryKind::from_name(&self.name)
    }

    /// Case-insensitive name comparison, the equality the directory format
    /// uses.
    pub fn matches_name(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}
