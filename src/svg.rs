//! SVG markup canonicalization.
//!
//! [`canonicalize`] turns whatever a library, index, or model produced into a
//! single-line fragment that renders inline at a fixed size:
//!
//! 1. un-escape `\"` / `\'` sequences
//! 2. strip the `<?xml …?>` prologue
//! 3. strip `<!DOCTYPE …>`
//! 4. drop `width` / `height` from the root `<svg>` tag
//! 5. inject `width="30" height="30"`
//! 6. inject an inline-block style when the root tag has none
//! 7. drop line breaks and residual `\n` / `\r` / `\t` escapes
//! 8. trim
//!
//! Every step maps canonical input to itself, so the transform is idempotent.

use once_cell::sync::Lazy;
use regex::Regex;

/// Fixed edge length, unitless, of every canonical fragment.
pub const CANONICAL_SIZE: &str = "30";

const INLINE_STYLE: &str = "display: inline-block; vertical-align: middle;";

static XML_PROLOGUE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<\?xml.*?\?>").unwrap());
static DOCTYPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<!DOCTYPE(?:[^>\[]|\[[^\]]*\])*>").unwrap());
static ROOT_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<svg\b[^>]*>").unwrap());
static SIZE_ATTR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\s(?:width|height)\s*=\s*(?:"[^"]*"|'[^']*'|[^\s>/]+)"#).unwrap()
});
static SIZE_HINT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s(?:width|height|viewbox)\s*=").unwrap());
static STYLE_ATTR: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\sstyle\s*=").unwrap());
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static CODE_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^[ \t]*```[A-Za-z0-9_-]*[ \t]*$\n?").unwrap());

/// Canonicalize raw SVG markup. Total: empty input yields an empty string.
///
/// ```rust
/// use icon_gateway::svg::canonicalize;
///
/// let out = canonicalize("<?xml version=\"1.0\"?><svg><rect/></svg>");
/// assert_eq!(
///     out,
///     "<svg width=\"30\" height=\"30\" style=\"display: inline-block; vertical-align: middle;\"><rect/></svg>"
/// );
/// ```
pub fn canonicalize(raw: &str) -> String {
    // Dropping line breaks can splice a new escape or prologue together, so the
    // pass repeats until nothing changes. Every pass that changes its input
    // removes bytes outside the root tag, which bounds the loop.
    let mut current = canonicalize_pass(raw);
    loop {
        let next = canonicalize_pass(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn canonicalize_pass(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }

    let unescaped = replace_until_fixed(raw, &[("\\\"", "\""), ("\\'", "'")]);
    let no_prologue = strip_until_fixed(&unescaped, &[&*XML_PROLOGUE, &*DOCTYPE]);
    let sized = rewrite_root_tag(&no_prologue);
    let single_line = replace_until_fixed(
        &sized,
        &[
            ("\r", ""),
            ("\n", ""),
            ("\\r", ""),
            ("\\n", ""),
            ("\\t", " "),
        ],
    );

    single_line.trim().to_string()
}

/// Steps 4–6 on the first `<svg …>` tag; markup without one passes through.
fn rewrite_root_tag(markup: &str) -> String {
    let Some(tag) = ROOT_TAG.find(markup) else {
        return markup.to_string();
    };

    // "<svg" is four bytes of ASCII, matched case-insensitively.
    let attrs = &markup[tag.start() + 4..tag.end() - 1];
    let attrs = SIZE_ATTR.replace_all(attrs, "");
    let attrs = WHITESPACE.replace_all(attrs.trim(), " ");
    let (attrs, self_closing) = match attrs.strip_suffix('/') {
        Some(rest) => (rest.trim_end().to_string(), true),
        None => (attrs.to_string(), false),
    };

    let mut rebuilt = format!(
        "<svg width=\"{size}\" height=\"{size}\"",
        size = CANONICAL_SIZE
    );
    if !STYLE_ATTR.is_match(&format!(" {}", attrs)) {
        rebuilt.push_str(&format!(" style=\"{}\"", INLINE_STYLE));
    }
    if !attrs.is_empty() {
        rebuilt.push(' ');
        rebuilt.push_str(&attrs);
    }
    rebuilt.push_str(if self_closing { "/>" } else { ">" });

    let mut out = String::with_capacity(markup.len() + rebuilt.len());
    out.push_str(&markup[..tag.start()]);
    out.push_str(&rebuilt);
    out.push_str(&markup[tag.end()..]);
    out
}

/// Remove every match of `patterns`, again and again: deleting one prologue
/// can join its neighbours into the next.
fn strip_until_fixed(input: &str, patterns: &[&Regex]) -> String {
    let mut current = input.to_string();
    loop {
        let mut next = current.clone();
        for pattern in patterns {
            next = pattern.replace_all(&next, "").into_owned();
        }
        if next == current {
            return current;
        }
        current = next;
    }
}

fn replace_until_fixed(input: &str, pairs: &[(&str, &str)]) -> String {
    let mut current = input.to_string();
    loop {
        let mut next = current.clone();
        for (from, to) in pairs {
            next = next.replace(from, to);
        }
        if next == current {
            return current;
        }
        current = next;
    }
}

/// Remove Markdown code-fence lines a model may wrap its markup in.
pub fn strip_code_fences(text: &str) -> String {
    CODE_FENCE.replace_all(text, "").replace("```", "").trim().to_string()
}

/// The `<svg …>…</svg>` span of a model response, if any.
pub fn extract_svg(text: &str) -> Option<&str> {
    let lower = text.to_ascii_lowercase();
    let start = lower.find("<svg")?;
    let end = lower.rfind("</svg>")? + "</svg>".len();
    (end > start).then(|| &text[start..end])
}

/// Whether markup looks like a usable icon: an opening and closing root tag,
/// the opening tag carrying a `width`, `height` or `viewBox` attribute.
pub fn is_plausible_svg(markup: &str) -> bool {
    let Some(root) = ROOT_TAG.find(markup) else {
        return false;
    };
    markup.to_ascii_lowercase().contains("</svg>") && SIZE_HINT.is_match(root.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLES: &[&str] = &[
        "<svg><rect/></svg>",
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<!DOCTYPE svg PUBLIC \"-//W3C//DTD SVG 1.1//EN\" \"http://www.w3.org/Graphics/SVG/1.1/DTD/svg11.dtd\">\n<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"1em\" height=\"1em\" viewBox=\"0 0 1024 1024\">\n  <path d=\"M0 0h1024\"/>\n</svg>\n",
        "<svg viewBox=\\\"0 0 24 24\\\" style=\\\"color: red\\\"><path stroke-width=\\\"2\\\" d=\\\"M1 1\\\"/></svg>",
        "<svg\r\n  width='24'\r\n  height=24\r\n  viewBox='0 0 24 24'>\r\n<circle r=\"4\"/></svg>",
        "<svg width=\"12\" height=\"12\"/>",
        "not markup at all\\n",
        "   ",
        "<SVG WIDTH=\"5\" ViewBox=\"0 0 5 5\"></SVG>",
        "<svg viewBox=\"0 0 1 1\"><text>a\\\\n\"b</text></svg>",
        "<?x\nml version=\"1.0\"?><svg viewBox=\"0 0 1 1\"/>",
        NESTED_PROLOGUE,
        NESTED_DOCTYPE,
    ];

    const NESTED_PROLOGUE: &str = "<<<<<<<<<<<<<?xml?>?xml?>?xml?>?xml?>?xml?>?xml?>?xml?>?xml?>?xml?>?xml?>?xml?>?xml?>?xml?><svg viewBox=\"0 0 1 1\"></svg>";
    const NESTED_DOCTYPE: &str = "<!DOC<!DOC<!DOCTYPE a>TYPE b>TYPE c><svg viewBox=\"0 0 1 1\"></svg>";

    #[test]
    fn prologue_is_removed_and_size_injected() {
        let out = canonicalize("<?xml version=\"1.0\"?><svg><rect/></svg>");
        assert!(!out.contains("<?xml"));
        assert!(out.contains("width=\"30\""));
        assert!(out.contains("height=\"30\""));
        assert!(out.contains("style=\"display: inline-block; vertical-align: middle;\""));
        assert!(out.ends_with("<rect/></svg>"));
    }

    #[test]
    fn idempotent() {
        for sample in SAMPLES {
            let once = canonicalize(sample);
            assert_eq!(canonicalize(&once), once, "not idempotent for {:?}", sample);
        }
    }

    #[test]
    fn never_contains_prologue_doctype_or_newline() {
        for sample in SAMPLES {
            let out = canonicalize(sample);
            assert!(!out.contains("<?xml"), "{}", out);
            assert!(!out.to_lowercase().contains("<!doctype"), "{}", out);
            assert!(!out.contains('\n') && !out.contains('\r'), "{}", out);
        }
    }

    #[test]
    fn nested_prologues_are_fully_removed() {
        for sample in [NESTED_PROLOGUE, NESTED_DOCTYPE] {
            let out = canonicalize(sample);
            assert!(!out.contains("<?xml"), "prologue left in {}", out);
            assert!(!out.to_lowercase().contains("<!doctype"), "doctype left in {}", out);
            assert_eq!(canonicalize(&out), out);
            assert!(out.ends_with("viewBox=\"0 0 1 1\"></svg>"), "{}", out);
        }
    }

    #[test]
    fn replaces_existing_size_but_not_stroke_width() {
        let out = canonicalize(SAMPLES[2]);
        assert!(out.starts_with("<svg width=\"30\" height=\"30\" viewBox=\"0 0 24 24\""));
        assert!(out.contains("stroke-width=\"2\""));
        // Existing style is kept and no second one injected.
        assert_eq!(out.matches("style=").count(), 1);
        assert!(out.contains("style=\"color: red\""));
    }

    #[test]
    fn multi_line_root_tag_collapses() {
        let out = canonicalize(SAMPLES[3]);
        assert_eq!(
            out,
            "<svg width=\"30\" height=\"30\" style=\"display: inline-block; vertical-align: middle;\" viewBox='0 0 24 24'><circle r=\"4\"/></svg>"
        );
    }

    #[test]
    fn self_closing_root_survives() {
        let out = canonicalize(SAMPLES[4]);
        assert!(out.ends_with("/>"));
        assert_eq!(out.matches("width=").count(), 1);
    }

    #[test]
    fn empty_and_non_markup() {
        assert_eq!(canonicalize(""), "");
        assert_eq!(canonicalize("   "), "");
        assert_eq!(canonicalize("not markup at all\\n"), "not markup at all");
    }

    #[test]
    fn fences_are_stripped() {
        let text = "```svg\n<svg viewBox=\"0 0 1 1\"></svg>\n```";
        assert_eq!(strip_code_fences(text), "<svg viewBox=\"0 0 1 1\"></svg>");
        assert_eq!(strip_code_fences("<svg></svg>"), "<svg></svg>");
    }

    #[test]
    fn extract_and_validate() {
        let reply = "Here you go: <svg viewBox=\"0 0 24 24\"><path/></svg> enjoy";
        let svg = extract_svg(reply).unwrap();
        assert_eq!(svg, "<svg viewBox=\"0 0 24 24\"><path/></svg>");
        assert!(is_plausible_svg(svg));
        assert!(!is_plausible_svg("<svg><path/></svg>"));
        assert!(!is_plausible_svg("<svg viewBox=\"0 0 1 1\">"));
        // A stroke width on a child is not a sizing hint.
        assert!(!is_plausible_svg("<svg><path stroke-width=\"2\"/></svg>"));
        assert!(is_plausible_svg("<SVG Width='24'><path/></SVG>"));
        assert!(extract_svg("no markup").is_none());
    }
}
