//-
// Copyright (c) 2021, Jason Lingle
//
// This file is part of Mimesis.
//
// Mimesis is free software: you can redistribute it and/or modify it under the
// terms of  the GNU General Public  License as published by  the Free Software
// Foundation, either version  3 of the License, or (at  your option) any later
// version.
//
// Mimesis is distributed in the hope  that it will be useful, but WITHOUT ANY
// WARRANTY; without  even the implied  warranty of MERCHANTABILITY  or FITNESS
// FOR  A PARTICULAR  PURPOSE.  See the  GNU General  Public  License for  more
// details.
//
// You should have received a copy of the GNU General Public License along with
// Mimesis. If not, see <http://www.gnu.org/licenses/>.

//! Reconstruction policy configuration.
//!
//! All policy knobs live in one value which is built once and then shared
//! (typically behind an `Arc`) by every reconstruction that should follow
//! the same rules. Nothing in here is global state; two configurations with
//! different tables can run side by side in the same process.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::support::charset::CharsetResolver;
use crate::support::error::Error;

/// Charset alias groups applied when the configuration does not supply its
/// own. The right-hand side of each group is a label `encoding_rs` accepts.
const DEFAULT_CHARSET_ALIASES: &[&str] = &[
    "ansi_x3.4-1968,ansi_x3.4-1986,iso646-us,iso-ir-6,cp367,ibm367:us-ascii",
    "latin1,latin-1,l1,iso_8859-1,iso-ir-100,cp819,ibm819:iso-8859-1",
    "cp1252,x-cp1252,win-1252:windows-1252",
    "iso-8859-8-i,iso-8859-8-e:iso-8859-8",
    "ks_c_5601-1987,ks_c_5601-1989,ksc5601,ksc_5601,korean:euc-kr",
    "x-sjis,ms_kanji,cp932,windows-31j:shift_jis",
    "cp936,ms936,x-gbk:gbk",
    "tis620,tis620.2533,tis-620,cp874:windows-874",
    "utf8,unicode-1-1-utf-8,x-utf8:utf-8",
];

/// Filename extensions recognised as images when the configuration does not
/// supply its own list.
const DEFAULT_IMAGE_EXTENSIONS: &[&str] = &[
    "bmp", "gif", "ico", "jpeg", "jpg", "png", "tif", "tiff", "webp",
];

/// The reconstruction policy shared by all messages that should be treated
/// the same way.
#[derive(Clone, Debug)]
pub struct ReassemblyConfig {
    charsets: CharsetResolver,
    image_extensions: HashSet<String>,
}

impl Default for ReassemblyConfig {
    fn default() -> Self {
        ReassemblyConfig::new(DEFAULT_CHARSET_ALIASES, DEFAULT_IMAGE_EXTENSIONS)
    }
}

impl ReassemblyConfig {
    /// Creates a configuration from explicit tables.
    ///
    /// `charset_aliases` holds grouped entries in the
    /// `"alias1,alias2,...:canonical"` form understood by
    /// [`CharsetResolver`]; `image_extensions` holds bare filename
    /// extensions without the dot.
    pub fn new<A: AsRef<str>, E: AsRef<str>>(
        charset_aliases: &[A],
        image_extensions: &[E],
    ) -> Self {
        ReassemblyConfig {
            charsets: CharsetResolver::from_grouped_entries(
                charset_aliases.iter().map(AsRef::as_ref),
            ),
            image_extensions: image_extensions
                .iter()
                .map(|e| e.as_ref().to_ascii_lowercase())
                .collect(),
        }
    }

    /// Loads a configuration from TOML text.
    ///
    /// Both sections are optional; an omitted or empty section keeps the
    /// built-in table for that concern.
    pub fn from_toml(text: &str) -> Result<Self, Error> {
        let file: ConfigFile = toml::from_str(text)?;

        let mut this = ReassemblyConfig::default();
        if !file.charset.aliases.is_empty() {
            this.charsets =
                CharsetResolver::from_grouped_entries(&file.charset.aliases);
        }
        if !file.attachments.image_extensions.is_empty() {
            this.image_extensions = file
                .attachments
                .image_extensions
                .iter()
                .map(|e| e.to_ascii_lowercase())
                .collect();
        }
        Ok(this)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        ReassemblyConfig::from_toml(&fs::read_to_string(path)?)
    }

    pub fn charsets(&self) -> &CharsetResolver {
        &self.charsets
    }

    /// Whether `filename` carries an extension from the image table.
    ///
    /// Only the text after the last dot is considered, so `archive.tar.png`
    /// counts and `image.png.exe` does not.
    pub fn is_image_filename(&self, filename: &str) -> bool {
        match filename.rsplit_once('.') {
            Some((_, ext)) => {
                self.image_extensions.contains(&ext.to_ascii_lowercase())
            },
            None => false,
        }
    }
}

/// The on-disk form of the configuration.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
struct ConfigFile {
    #[serde(default)]
    charset: CharsetConfig,
    #[serde(default)]
    attachments: AttachmentConfig,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
struct CharsetConfig {
    /// Grouped alias entries, `"alias1,alias2,...:canonical"`.
    #[serde(default)]
    aliases: Vec<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
struct AttachmentConfig {
    /// Filename extensions treated as images, without the dot.
    #[serde(default)]
    image_extensions: Vec<String>,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn default_tables_are_loaded() {
        let config = ReassemblyConfig::default();
        assert_eq!("euc-kr", config.charsets().resolve(Some("KS_C_5601-1987")));
        assert!(config.is_image_filename("photo.JPEG"));
        assert!(!config.is_image_filename("notes.txt"));
    }

    #[test]
    fn extension_matching_uses_final_component() {
        let config = ReassemblyConfig::default();
        assert!(config.is_image_filename("archive.tar.png"));
        assert!(config.is_image_filename(".png"));
        assert!(!config.is_image_filename("image.png.exe"));
        assert!(!config.is_image_filename("png"));
        assert!(!config.is_image_filename(""));
    }

    #[test]
    fn toml_sections_override_defaults() {
        let config = ReassemblyConfig::from_toml(
            r#"
[charset]
aliases = ["weird-vendor-label:koi8-r"]

[attachments]
image_extensions = ["png"]
"#,
        )
        .unwrap();

        assert_eq!(
            "koi8-r",
            config.charsets().resolve(Some("Weird-Vendor-Label"))
        );
        // The built-in alias table was replaced wholesale.
        assert_eq!(
            "ks_c_5601-1987",
            config.charsets().resolve(Some("ks_c_5601-1987"))
        );
        assert!(config.is_image_filename("a.png"));
        assert!(!config.is_image_filename("a.jpg"));
    }

    #[test]
    fn empty_toml_keeps_defaults() {
        let config = ReassemblyConfig::from_toml("").unwrap();
        assert_eq!("euc-kr", config.charsets().resolve(Some("ksc5601")));
        assert!(config.is_image_filename("a.gif"));
    }

    #[test]
    fn malformed_toml_is_an_error() {
        assert!(ReassemblyConfig::from_toml("[charset\nbad").is_err());
    }
}
