use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// What a folder holds. Notes and bookmarks never share a folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FolderKind {
    Notes,
    Urls,
}

/// The payload type of an item. Fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ItemType {
    Note,
    Url,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {field}: {value:?}")]
pub struct ParseEnumError {
    pub field: &'static str,
    pub value: String,
}

impl FolderKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Notes => "NOTES",
            Self::Urls => "URLS",
        }
    }

    /// The only item type that may be filed into a folder of this kind.
    pub fn item_type(self) -> ItemType {
        match self {
            Self::Notes => ItemType::Note,
            Self::Urls => ItemType::Url,
        }
    }
}

impl ItemType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Note => "NOTE",
            Self::Url => "URL",
        }
    }

    pub fn folder_kind(self) -> FolderKind {
        match self {
            Self::Note => FolderKind::Notes,
            Self::Url => FolderKind::Urls,
        }
    }
}

impl FromStr for FolderKind {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NOTES" => Ok(Self::Notes),
            "URLS" => Ok(Self::Urls),
            other => Err(ParseEnumError {
                field: "kind",
                value: other.to_string(),
            }),
        }
    }
}

impl FromStr for ItemType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NOTE" => Ok(Self::Note),
            "URL" => Ok(Self::Url),
            other => Err(ParseEnumError {
                field: "type",
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for FolderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_pair_with_types() {
        assert_eq!(FolderKind::Notes.item_type(), ItemType::Note);
        assert_eq!(FolderKind::Urls.item_type(), ItemType::Url);
        assert_eq!(ItemType::Url.folder_kind(), FolderKind::Urls);
    }

    #[test]
    fn parse_is_case_sensitive() {
        assert_eq!("NOTES".parse::<FolderKind>(), Ok(FolderKind::Notes));
        assert!("notes".parse::<FolderKind>().is_err());
        assert_eq!("URL".parse::<ItemType>(), Ok(ItemType::Url));

        let err = "LINK".parse::<ItemType>().unwrap_err();
        assert_eq!(err.field, "type");
        assert_eq!(err.value, "LINK");
    }

    #[test]
    fn serde_uses_wire_names() {
        assert_eq!(serde_json::to_string(&FolderKind::Urls).unwrap(), "\"URLS\"");
        let t: ItemType = serde_json::from_str("\"NOTE\"").unwrap();
        assert_eq!(t, ItemType::Note);
    }
}
