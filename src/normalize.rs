//! Name normalization.
//!
//! Icon-set files are hyphen-named (`arrow-left.svg`) while display and
//! generated names are camel-cased (`ArrowLeftOutlined`). [`normalize`] maps
//! any free-form input onto the file-naming key; [`to_display_name`] goes the
//! other way.

/// Trailing words dropped from a search key, and whether the word must stand
/// on its own (`silicon` keeps its `icon`).
const TRAILING_WORDS: &[(&str, bool)] = &[("outlined", false), ("filled", false), ("icon", true)];

/// Convert free-form search input into a canonical matching key.
///
/// ```rust
/// use icon_gateway::normalize::normalize;
///
/// assert_eq!(normalize("ArrowLeftOutlined"), "arrow-left");
/// assert_eq!(normalize("  Delete  "), "delete");
/// assert_eq!(normalize("delete icon"), "delete");
/// ```
pub fn normalize(raw: &str) -> String {
    let mut hyphenated = String::with_capacity(raw.len() + 4);
    let mut prev: Option<char> = None;
    for c in raw.trim().chars() {
        if c.is_whitespace() || c == '_' || c == '-' {
            if !hyphenated.is_empty() && !hyphenated.ends_with('-') {
                hyphenated.push('-');
            }
        } else {
            if c.is_uppercase()
                && prev.is_some_and(|p| p.is_lowercase() || p.is_ascii_digit())
                && !hyphenated.ends_with('-')
            {
                hyphenated.push('-');
            }
            hyphenated.extend(c.to_lowercase());
        }
        prev = Some(c);
    }

    let mut key = hyphenated.trim_matches('-').to_string();
    loop {
        let before = key.len();
        for (word, whole_word) in TRAILING_WORDS {
            if let Some(stripped) = key.strip_suffix(word) {
                if *whole_word && !stripped.ends_with('-') {
                    continue;
                }
                let stripped = stripped.trim_end_matches('-');
                // A bare suffix word is itself the name.
                if !stripped.is_empty() {
                    key = stripped.to_string();
                }
            }
        }
        if key.len() == before {
            break;
        }
    }
    key
}

/// Hyphenated file base name → PascalCase display name.
///
/// ```rust
/// use icon_gateway::normalize::to_display_name;
///
/// assert_eq!(to_display_name("arrow-left"), "ArrowLeft");
/// ```
pub fn to_display_name(file_base_name: &str) -> String {
    file_base_name
        .split(['-', '_', ' '])
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

/// Compact camel-cased identifier from the first three words of a description.
///
/// Used as the library lookup name and the stock-record name when no override
/// is given. Returns `"icon"` when the description has no alphanumeric words.
pub fn synthesize_name(description: &str) -> String {
    let words: Vec<String> = description
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .take(3)
        .map(str::to_lowercase)
        .collect();

    if words.is_empty() {
        return "icon".to_string();
    }

    let mut name = words[0].clone();
    for word in &words[1..] {
        let mut chars = word.chars();
        if let Some(first) = chars.next() {
            name.extend(first.to_uppercase());
            name.push_str(chars.as_str());
        }
    }
    name
}
