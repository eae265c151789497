//! Community link configuration and validation.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{LINK_CALLBACK_PREFIX, MAX_CALLBACK_DATA_BYTES};

/// URL schemes accepted for community links.
const ALLOWED_SCHEMES: [&str; 3] = ["https://", "http://", "tg://"];

/// Errors that can occur while loading or validating links.
#[derive(Debug, Error)]
pub enum LinkError {
    #[error("No links configured")]
    NoLinks,

    #[error("Link at index {index} has an empty label")]
    EmptyLabel { index: usize },

    #[error("Duplicate link label found: {label}")]
    DuplicateLabel { label: String },

    #[error(
        "Link at index {index} ({label}) has a label too long for a button: {length} > {max_length} bytes"
    )]
    LabelTooLong {
        index: usize,
        label: String,
        length: usize,
        max_length: usize,
    },

    #[error("Link at index {index} ({label}) has an invalid URL: {url:?}")]
    InvalidUrl {
        index: usize,
        label: String,
        url: String,
    },

    #[error("Malformed link entry {entry:?} (expected `Label|URL`)")]
    MalformedEntry { entry: String },

    #[error("Failed to read links file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse links file: {0}")]
    ParseError(#[from] serde_json::Error),
}

/// A single community link shown to users.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LinkEntry {
    /// Button text and message title.
    pub label: String,

    /// Target URL.
    pub url: String,
}

impl LinkEntry {
    /// Creates a new link entry.
    #[must_use]
    pub fn new(label: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            url: url.into(),
        }
    }

    /// Returns the callback data carried by this link's button.
    #[must_use]
    pub fn callback_data(&self) -> String {
        format!("{LINK_CALLBACK_PREFIX}{}", self.label)
    }

    fn has_valid_url(&self) -> bool {
        let url = self.url.as_str();
        !url.chars().any(char::is_whitespace)
            && ALLOWED_SCHEMES
                .iter()
                .any(|scheme| url.len() > scheme.len() && url.to_ascii_lowercase().starts_with(scheme))
    }
}

/// The ordered set of links offered by the bot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LinkConfig {
    /// Links in the order their buttons are shown.
    pub links: Vec<LinkEntry>,
}

impl LinkConfig {
    /// Creates a configuration from a list of links.
    #[must_use]
    pub const fn new(links: Vec<LinkEntry>) -> Self {
        Self { links }
    }

    /// Loads links from a JSON file.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, LinkError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Saves links to a JSON file.
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), LinkError> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Parses links from the compact `Label|URL` format.
    ///
    /// Entries are separated by `;` or newlines; blank entries are skipped.
    pub fn parse_compact(raw: &str) -> Result<Self, LinkError> {
        let mut links = Vec::new();

        for entry in raw.split([';', '\n']).map(str::trim).filter(|e| !e.is_empty()) {
            let Some((label, url)) = entry.split_once('|') else {
                return Err(LinkError::MalformedEntry {
                    entry: entry.to_owned(),
                });
            };
            links.push(LinkEntry::new(label.trim(), url.trim()));
        }

        Ok(Self { links })
    }

    /// Loads links from the `BOT_LINKS` environment variable if it is set,
    /// otherwise from the given JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, LinkError> {
        Self::load_with(std::env::var("BOT_LINKS").ok().as_deref(), path)
    }

    /// Loads links from `inline` (compact format) unless it is missing or
    /// blank, in which case the JSON file is read.
    pub fn load_with(inline: Option<&str>, path: impl AsRef<Path>) -> Result<Self, LinkError> {
        match inline {
            Some(raw) if !raw.trim().is_empty() => Self::parse_compact(raw),
            _ => Self::load_from_file(path),
        }
    }

    /// Validates all links.
    ///
    /// Returns the first validation error encountered.
    pub fn validate(&self) -> Result<(), LinkError> {
        if self.links.is_empty() {
            return Err(LinkError::NoLinks);
        }

        let mut seen = HashSet::new();
        for (index, link) in self.links.iter().enumerate() {
            if !seen.insert(link.label.as_str()) {
                return Err(LinkError::DuplicateLabel {
                    label: link.label.clone(),
                });
            }
            validate_entry(index, link)?;
        }

        Ok(())
    }

    /// Returns the validation result of every link, in order.
    #[must_use]
    pub fn validate_all(&self) -> Vec<Result<(), LinkError>> {
        if self.links.is_empty() {
            return vec![Err(LinkError::NoLinks)];
        }

        let mut seen = HashSet::new();
        self.links
            .iter()
            .enumerate()
            .map(|(index, link)| {
                if seen.insert(link.label.as_str()) {
                    validate_entry(index, link)
                } else {
                    Err(LinkError::DuplicateLabel {
                        label: link.label.clone(),
                    })
                }
            })
            .collect()
    }

    /// Finds a link by its label.
    #[must_use]
    pub fn find(&self, label: &str) -> Option<&LinkEntry> {
        self.links.iter().find(|l| l.label == label)
    }

    /// Returns the number of links.
    #[must_use]
    pub fn len(&self) -> usize {
        self.links.len()
    }

    /// Checks if there are no links.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Iterates over the link labels in order.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.links.iter().map(|l| l.label.as_str())
    }

    /// Creates an example configuration for users to reference.
    #[must_use]
    pub fn example() -> Self {
        Self {
            links: vec![
                LinkEntry::new("Community", "https://example.com/chat"),
                LinkEntry::new("Announcements", "https://t.me/example_channel"),
                LinkEntry::new("Support", "https://t.me/+exampleInviteHash"),
            ],
        }
    }
}

fn validate_entry(index: usize, link: &LinkEntry) -> Result<(), LinkError> {
    if link.label.trim().is_empty() {
        return Err(LinkError::EmptyLabel { index });
    }

    let length = link.callback_data().len();
    if length > MAX_CALLBACK_DATA_BYTES {
        return Err(LinkError::LabelTooLong {
            index,
            label: link.label.clone(),
            length,
            max_length: MAX_CALLBACK_DATA_BYTES,
        });
    }

    if !link.has_valid_url() {
        return Err(LinkError::InvalidUrl {
            index,
            label: link.label.clone(),
            url: link.url.clone(),
        });
    }

    Ok(())
}
