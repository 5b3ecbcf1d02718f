use std::sync::LazyLock;

use regex::Regex;

/// Maximum summary length before the ellipsis is appended.
pub const SUMMARY_MAX_CHARS: usize = 100;

/// A word-boundary cut is only taken when the boundary lies past this position.
const SUMMARY_MIN_WORD_CUT: usize = 50;

const ELLIPSIS: &str = "...";

/// Leading decorative block emitted by review bots: an HTML element closed on
/// its own, followed by a blank line and the substantive text.
static CAPTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?s)\A\s*(?P<caption><(?:div|sub|h[1-6])\b.*?</(?:div|sub|h[1-6])>)[ \t]*\r?\n[ \t]*\r?\n(?P<body>.*)\z",
    )
    .expect("caption pattern is valid")
});

/// Where the substantive text ends: a line that is only a suggested-code
/// heading or label, an HTML table, or a line opening a code fence.
static TRAILER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)^[^\w\n]*suggested code\b[^\w\n]*$|<table\b|^[ \t]*```")
        .expect("trailer pattern is valid")
});

static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("tag pattern is valid"));

static LINE_BREAKS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t]*(?:\r\n|\r|\n)+[ \t]*").expect("line break pattern is valid"));

/// Best-effort split of a comment body into decoration and substance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedContent {
    /// Text a reviewer would read. Equal to the raw body when no caption
    /// block is recognized.
    pub plain: String,
    pub severity: Option<String>,
    pub category: Option<String>,
}

/// Extract the readable text of a comment body.
///
/// Human comments pass through verbatim. Bot comments that open with a
/// caption block lose the caption and anything from the first suggested-code
/// marker, table or code fence onwards. If stripping leaves nothing, the raw
/// body is kept.
pub fn extract(raw: &str) -> ExtractedContent {
    let Some(caps) = CAPTION_RE.captures(raw) else {
        return ExtractedContent {
            plain: raw.to_string(),
            severity: None,
            category: None,
        };
    };

    let caption = caps.name("caption").map_or("", |m| m.as_str());
    let body = caps.name("body").map_or("", |m| m.as_str());
    let end = TRAILER_RE.find(body).map_or(body.len(), |m| m.start());
    let text = body[..end].trim();

    ExtractedContent {
        plain: if text.is_empty() {
            raw.to_string()
        } else {
            text.to_string()
        },
        severity: caption_label(caption, "severity"),
        category: caption_label(caption, "category"),
    }
}

/// Plain text only; see [`extract`].
pub fn plain_content(raw: &str) -> String {
    extract(raw).plain
}

/// Read a `Key: value` label from a caption block.
///
/// Tags are dropped, then the caption is split on the separators bots put
/// between labels (`|`, `·`, `•`, line breaks).
fn caption_label(caption: &str, key: &str) -> Option<String> {
    let text = TAG_RE.replace_all(caption, " ");
    text.split(['|', '·', '•', '\n'])
        .filter_map(|segment| segment.split_once(':'))
        .find(|(k, _)| k.trim().trim_matches('*').trim().eq_ignore_ascii_case(key))
        .map(|(_, v)| v.trim().trim_matches('*').trim().to_string())
        .filter(|v| !v.is_empty())
}

/// One-line summary: line breaks collapsed, at most 100 characters plus an
/// ellipsis, cut on a word boundary when one exists past character 50.
pub fn summarize(text: &str) -> String {
    let flat = LINE_BREAKS_RE.replace_all(text, " ");
    let flat = flat.trim();

    let chars: Vec<char> = flat.chars().collect();
    if chars.len() <= SUMMARY_MAX_CHARS {
        return flat.to_string();
    }

    let head = &chars[..SUMMARY_MAX_CHARS];
    let cut = match head.iter().rposition(|c| *c == ' ') {
        Some(pos) if pos > SUMMARY_MIN_WORD_CUT => pos,
        _ => SUMMARY_MAX_CHARS,
    };

    let mut summary: String = head[..cut].iter().collect();
    summary.truncate(summary.trim_end().len());
    summary.push_str(ELLIPSIS);
    summary
}
