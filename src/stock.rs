//! Stock SVG synthesis, the last resolution stage.
//!
//! A handful of common intents get a hand-drawn glyph; anything else gets a
//! rounded badge labelled with the first two letters of the icon name. This
//! stage cannot fail.

use crate::models::{IconRecord, IconStyle, CODE_STOCK, MODEL_STOCK};

/// Source tag of stock records.
pub const STOCK_SOURCE: &str = "stock";

const DELETE_SVG: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 24 24" fill="none" stroke="currentColor" stroke-width="2" stroke-linecap="round" stroke-linejoin="round"><path d="M3 6h18"/><path d="M8 6V4h8v2"/><path d="M19 6l-1 14H6L5 6"/><path d="M10 11v6"/><path d="M14 11v6"/></svg>"##;

const ADD_SVG: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 24 24" fill="none" stroke="currentColor" stroke-width="2" stroke-linecap="round"><path d="M12 5v14"/><path d="M5 12h14"/></svg>"##;

const EDIT_SVG: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 24 24" fill="none" stroke="currentColor" stroke-width="2" stroke-linecap="round" stroke-linejoin="round"><path d="M12 20h9"/><path d="M16.5 3.5a2.1 2.1 0 0 1 3 3L7 19l-4 1 1-4z"/></svg>"##;

/// Intent keys, checked in order against the lowercased description.
const INTENTS: &[(&[&str], &str)] = &[
    (&["删除", "移除", "delete", "remove", "trash"], DELETE_SVG),
    (&["添加", "新增", "增加", "add", "plus", "create"], ADD_SVG),
    (&["编辑", "修改", "edit", "pencil", "modify"], EDIT_SVG),
];

/// The canned glyph for `description`, or a labelled placeholder for `name`.
pub fn stock_svg(description: &str, name: &str) -> String {
    let lowered = description.to_lowercase();
    INTENTS
        .iter()
        .find(|(keys, _)| keys.iter().any(|key| lowered.contains(key)))
        .map(|(_, svg)| svg.to_string())
        .unwrap_or_else(|| placeholder_svg(name))
}

/// Rounded badge with the first two letters of `name`.
pub fn placeholder_svg(name: &str) -> String {
    let label: String = name
        .chars()
        .filter(|c| c.is_alphanumeric())
        .take(2)
        .flat_map(char::to_uppercase)
        .collect();
    let label = if label.is_empty() { "?".to_string() } else { label };

    format!(
        r##"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 24 24"><rect x="1" y="1" width="22" height="22" rx="5" fill="none" stroke="currentColor" stroke-width="2"/><text x="12" y="16" text-anchor="middle" font-size="10" font-family="sans-serif" fill="currentColor">{}</text></svg>"##,
        label
    )
}

/// One stock record. Always carries the fallback provenance code.
pub fn stock_icon(description: &str, name: &str, style: IconStyle) -> IconRecord {
    IconRecord::new(
        STOCK_SOURCE,
        name,
        stock_svg(description, name),
        style,
        MODEL_STOCK,
        CODE_STOCK,
    )
    .with_description(description)
}
