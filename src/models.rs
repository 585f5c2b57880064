//! Core data models used throughout the gateway.
//!
//! These types are built per request and dropped once the response is sent;
//! nothing here is persisted.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::svg::canonicalize;

/// `model` sentinel for records that did not come from a generative provider.
pub const MODEL_NONE: &str = "none";
/// `model` sentinel for stock placeholder records.
pub const MODEL_STOCK: &str = "stock";

/// Provenance code of a genuine match.
pub const CODE_OK: i32 = 0;
/// Provenance code of a stock fallback record.
pub const CODE_STOCK: i32 = -1;

/// The canonical output unit of every operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IconRecord {
    /// Family tag, keyword-index label (`iconify:<prefix>`), provider name, or `stock`.
    pub source: String,
    pub name: String,
    /// Markup exactly as obtained.
    pub svg: String,
    /// `svg` after [`canonicalize`].
    pub raw_svg: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub style: IconStyle,
    pub model: String,
    pub code: i32,
}

impl IconRecord {
    /// Builds a record, deriving `raw_svg` from `svg`.
    pub fn new(
        source: impl Into<String>,
        name: impl Into<String>,
        svg: impl Into<String>,
        style: IconStyle,
        model: impl Into<String>,
        code: i32,
    ) -> Self {
        let svg = svg.into();
        let raw_svg = canonicalize(&svg);
        Self {
            source: source.into(),
            name: name.into(),
            svg,
            raw_svg,
            description: None,
            style,
            model: model.into(),
            code,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Dedup key of any result list.
    pub fn key(&self) -> (&str, &str) {
        (&self.source, &self.name)
    }
}

/// Requested rendering family. Unknown values map to [`IconStyle::Default`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum IconStyle {
    ElementPlus,
    AntDesign,
    #[default]
    Default,
}

impl Serialize for IconStyle {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for IconStyle {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(IconStyle::parse(&raw))
    }
}

impl IconStyle {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "element-plus" | "element_plus" | "elementplus" => IconStyle::ElementPlus,
            "ant-design" | "ant_design" | "antdesign" | "antd" => IconStyle::AntDesign,
            _ => IconStyle::Default,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            IconStyle::ElementPlus => "element-plus",
            IconStyle::AntDesign => "ant-design",
            IconStyle::Default => "default",
        }
    }

    /// Families this style restricts a library lookup to.
    pub fn families(&self) -> &'static [Family] {
        match self {
            IconStyle::ElementPlus => &[Family::ElementPlus],
            IconStyle::AntDesign => &[Family::AntDesign],
            IconStyle::Default => &[Family::ElementPlus, Family::AntDesign],
        }
    }

    pub fn is_unrestricted(&self) -> bool {
        *self == IconStyle::Default
    }
}

impl fmt::Display for IconStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An icon library family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    ElementPlus,
    AntDesign,
}

impl Family {
    pub const ALL: [Family; 2] = [Family::ElementPlus, Family::AntDesign];

    /// Source tag written into [`IconRecord::source`]; also the local directory name.
    pub fn tag(&self) -> &'static str {
        match self {
            Family::ElementPlus => "element-plus",
            Family::AntDesign => "ant-design",
        }
    }

    pub fn style(&self) -> IconStyle {
        match self {
            Family::ElementPlus => IconStyle::ElementPlus,
            Family::AntDesign => IconStyle::AntDesign,
        }
    }

    /// Sub-formats needing separate listings; empty for single-format families.
    pub fn sub_formats(&self) -> &'static [SubFormat] {
        match self {
            Family::ElementPlus => &[],
            Family::AntDesign => &[SubFormat::Outlined, SubFormat::Filled],
        }
    }
}

/// Visual variant within a family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubFormat {
    Outlined,
    Filled,
}

impl SubFormat {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "outlined" | "outline" => Some(SubFormat::Outlined),
            "filled" | "fill" => Some(SubFormat::Filled),
            _ => None,
        }
    }

    /// Directory name, both on disk and in the remote listing path.
    pub fn dir(&self) -> &'static str {
        match self {
            SubFormat::Outlined => "outlined",
            SubFormat::Filled => "filled",
        }
    }

    /// Suffix appended to display names.
    pub fn suffix(&self) -> &'static str {
        match self {
            SubFormat::Outlined => "Outlined",
            SubFormat::Filled => "Filled",
        }
    }
}

/// A parsed icon search request.
#[derive(Debug, Clone, Default)]
pub struct SearchQuery {
    pub names: Vec<String>,
    /// `None` searches every family.
    pub style: Option<IconStyle>,
    pub format: Option<SubFormat>,
    /// `None` uses `libraries.prefer_local`.
    pub local: Option<bool>,
    pub exact: bool,
    /// Query the keyword index for names no family matched.
    pub fallback: bool,
}

impl SearchQuery {
    /// Split a comma-separated name list, trimming and dropping empty entries.
    pub fn parse_names(raw: &str) -> Vec<String> {
        raw.split([',', '，'])
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn new(names: Vec<String>) -> Self {
        Self {
            names: names
                .into_iter()
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty())
                .collect(),
            ..Default::default()
        }
    }
}

/// A generation request (`generate_icon`).
#[derive(Debug, Clone, Default)]
pub struct GenerationRequest {
    pub description: String,
    pub style: IconStyle,
    /// Explicit provider name; `None` uses the priority order.
    pub model: Option<String>,
    pub name: Option<String>,
}

impl GenerationRequest {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            ..Default::default()
        }
    }

    pub fn style(mut self, style: IconStyle) -> Self {
        self.style = style;
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// A failure that was deliberately not propagated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SuppressedFailure {
    /// Which source or stage gave up (e.g. `element-plus`, `generation`).
    pub source: String,
    /// The listing URL, file, or item that failed.
    pub item: String,
    pub reason: String,
}

impl SuppressedFailure {
    pub fn new(
        source: impl Into<String>,
        item: impl Into<String>,
        reason: impl ToString,
    ) -> Self {
        Self {
            source: source.into(),
            item: item.into(),
            reason: reason.to_string(),
        }
    }
}

/// Records produced by an operation together with every suppressed failure.
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    pub icons: Vec<IconRecord>,
    pub suppressed: Vec<SuppressedFailure>,
}

impl Resolution {
    pub fn is_empty(&self) -> bool {
        self.icons.is_empty()
    }

    /// Append another resolution's records and failures.
    pub fn merge(&mut self, other: Resolution) {
        self.icons.extend(other.icons);
        self.suppressed.extend(other.suppressed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn style_parse_falls_back_to_default() {
        assert_eq!(IconStyle::parse("Element-Plus"), IconStyle::ElementPlus);
        assert_eq!(IconStyle::parse("antd"), IconStyle::AntDesign);
        assert_eq!(IconStyle::parse("material"), IconStyle::Default);
        assert_eq!(IconStyle::parse(""), IconStyle::Default);
    }

    #[test]
    fn style_deserializes_unknown_as_default() {
        let style: IconStyle = serde_json::from_str("\"fluent\"").unwrap();
        assert_eq!(style, IconStyle::Default);
        let style: IconStyle = serde_json::from_str("\"ant-design\"").unwrap();
        assert_eq!(style, IconStyle::AntDesign);
    }

    #[test]
    fn parse_names_trims_and_drops_empty() {
        assert_eq!(
            SearchQuery::parse_names(" home, user ,,settings，menu "),
            vec!["home", "user", "settings", "menu"]
        );
        assert!(SearchQuery::parse_names(" , ,").is_empty());
    }

    #[test]
    fn record_serializes_camel_case() {
        let record = IconRecord::new(
            "element-plus",
            "Delete",
            "<svg viewBox=\"0 0 10 10\"></svg>",
            IconStyle::ElementPlus,
            MODEL_NONE,
            CODE_OK,
        );
        let json = serde_json::to_value(&record).unwrap();
        assert!(json.get("rawSvg").is_some());
        assert_eq!(json["style"], "element-plus");
        assert!(json.get("description").is_none());
    }
}
