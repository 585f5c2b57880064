//! Keyword extraction for search seeding and category expansion.
//!
//! [`extract_keywords`] maps a description onto canonical English tokens
//! through a static bilingual lexicon, falling back to plain word extraction.
//! [`category_prompt`] and [`parse_keyword_list`] are the generative variant
//! used to enumerate concrete icon names for a category.

use once_cell::sync::Lazy;
use regex::Regex;

/// Canonical token → every key that selects it (Chinese, English, synonyms).
///
/// Iteration order of this table is the output order of [`extract_keywords`].
const LEXICON: &[(&str, &[&str])] = &[
    ("delete", &["删除", "删", "移除", "垃圾桶", "delete", "remove", "trash"]),
    ("add", &["添加", "新增", "增加", "加号", "add", "plus", "create"]),
    ("edit", &["编辑", "修改", "edit", "modify", "pencil"]),
    ("save", &["保存", "save"]),
    ("search", &["搜索", "查找", "查询", "search", "find", "magnif"]),
    ("close", &["关闭", "close"]),
    ("cancel", &["取消", "cancel"]),
    ("confirm", &["确认", "确定", "confirm", "check"]),
    ("upload", &["上传", "upload"]),
    ("download", &["下载", "download"]),
    ("setting", &["设置", "配置", "setting", "config", "gear", "cog"]),
    ("user", &["用户", "人员", "个人", "user", "person", "account", "profile"]),
    ("home", &["首页", "主页", "home"]),
    ("menu", &["菜单", "menu", "hamburger"]),
    ("more", &["更多", "more", "ellipsis"]),
];

/// Words the fallback extraction keeps at most.
const MAX_FALLBACK_WORDS: usize = 3;

/// Map a natural-language description to a small set of search keywords.
///
/// ```rust
/// use icon_gateway::keywords::extract_keywords;
///
/// assert!(extract_keywords("删除图标").contains(&"delete".to_string()));
/// assert_eq!(extract_keywords("shopping cart badge"), vec!["shopping", "cart", "badge"]);
/// ```
pub fn extract_keywords(description: &str) -> Vec<String> {
    let lowered = description.to_lowercase();

    let matched: Vec<String> = LEXICON
        .iter()
        .filter(|(_, keys)| keys.iter().any(|key| lowered.contains(key)))
        .map(|(canonical, _)| canonical.to_string())
        .collect();

    if !matched.is_empty() {
        return matched;
    }

    lowered
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| word.chars().count() > 2)
        .take(MAX_FALLBACK_WORDS)
        .map(str::to_string)
        .collect()
}

/// System instruction for category enumeration.
pub const CATEGORY_SYSTEM_PROMPT: &str = "You name icons. Reply with a single line of \
comma-separated icon names and nothing else: no numbering, no explanation, no code block.";

/// Prompt asking a model for exactly `count` icon names in `category`.
pub fn category_prompt(category: &str, count: usize) -> String {
    format!(
        "List exactly {count} concrete, distinct icon names that belong to the category \"{category}\". \
         Write the names in the same language as the category text, separated by commas. \
         Do not add any explanation."
    )
}

/// A list marker in front of a name: `1.`, `2)`, `-`, `*` or `•`.
static LIST_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:\d+[.)]|[-*•])\s*").unwrap());

/// Parse a model's comma-separated reply into at most `limit` distinct names.
pub fn parse_keyword_list(reply: &str, limit: usize) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for raw in reply.split([',', '，', '、', ';', '；', '\n']) {
        let unmarked = LIST_MARKER.replace(raw.trim(), "");
        let name = unmarked
            .trim_matches(|c: char| c == '"' || c == '\'' || c == '`' || c == '“' || c == '”')
            .trim();
        if name.is_empty() || names.iter().any(|n| n.eq_ignore_ascii_case(name)) {
            continue;
        }
        names.push(name.to_string());
        if names.len() == limit {
            break;
        }
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chinese_description_maps_to_canonical_token() {
        assert!(extract_keywords("删除图标").contains(&"delete".to_string()));
        assert_eq!(extract_keywords("一个红色的上传按钮"), vec!["upload"]);
    }

    #[test]
    fn output_follows_lexicon_order() {
        // "save" is listed before "edit" in the input but after it in the table.
        assert_eq!(extract_keywords("save and edit"), vec!["edit", "save"]);
    }

    #[test]
    fn synonyms_collapse() {
        assert_eq!(extract_keywords("Trash can"), vec!["delete"]);
        assert_eq!(extract_keywords("gear wheel"), vec!["setting"]);
    }

    #[test]
    fn fallback_takes_long_words() {
        assert_eq!(
            extract_keywords("a big red rocket ship launching"),
            vec!["big", "red", "rocket"]
        );
        assert_eq!(extract_keywords("an ox"), Vec::<String>::new());
        assert_eq!(extract_keywords("rocket-ship"), vec!["rocket", "ship"]);
    }

    #[test]
    fn parses_numbered_and_quoted_lists() {
        let reply = "1. Printer, \"Stapler\"，文件夹、 folder\n2) paperclip, printer";
        assert_eq!(
            parse_keyword_list(reply, 10),
            vec!["Printer", "Stapler", "文件夹", "folder", "paperclip"]
        );
    }

    #[test]
    fn leading_digits_in_names_survive() {
        let reply = "3D printer, 404 page, 1. Printer, 2) Folder, - tag, 24h clock";
        assert_eq!(
            parse_keyword_list(reply, 10),
            vec!["3D printer", "404 page", "Printer", "Folder", "tag", "24h clock"]
        );
    }

    #[test]
    fn parse_respects_limit() {
        assert_eq!(parse_keyword_list("a, b, c, d", 2), vec!["a", "b"]);
        assert!(parse_keyword_list("  ,  ", 3).is_empty());
    }

    #[test]
    fn category_prompt_mentions_count_and_category() {
        let prompt = category_prompt("office", 5);
        assert!(prompt.contains("exactly 5"));
        assert!(prompt.contains("\"office\""));
    }
}
