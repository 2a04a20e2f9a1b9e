//! Remote naming rules.
//!
//! Every node created on the remote side carries two names: the display
//! `Name`, which is the local directory name verbatim, and a `UrlName`
//! used in the node's web address. The service only accepts URL names made
//! of ASCII letters, digits and dashes that begin with an uppercase letter,
//! so directory names have to be folded into that shape:
//!
//! - `"summer trip"` → `"Summer-Trip"`
//! - `"2019_Iceland"` → `"Gallery-2019-Iceland"`
//! - `"Café & Bar"` → `"Caf-Bar"`

/// Prefix used when a name does not start with a letter.
const FALLBACK_PREFIX: &str = "Gallery";

/// URL name used when nothing usable survives the folding.
const EMPTY_NAME: &str = "Untitled";

/// Derive the remote `UrlName` for a directory name.
pub fn url_name(name: &str) -> String {
    let words: Vec<String> = name
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(capitalize)
        .collect();

    if words.is_empty() {
        return EMPTY_NAME.to_string();
    }

    let joined = words.join("-");
    if joined.starts_with(|c: char| c.is_ascii_uppercase()) {
        joined
    } else {
        format!("{FALLBACK_PREFIX}-{joined}")
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}
