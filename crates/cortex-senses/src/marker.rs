//! Structural modality markers.
//!
//! Every formatted buffer line starts with a bracketed marker naming its
//! modality – `[voice lang=es] Hola`, `[vision] person=Alice`,
//! `[badge] name=Maria Lopez`.  The prompt composer classifies which
//! modalities are present in a tick by scanning the concatenated text for
//! these markers, and extracts the spoken language and detected person names
//! from them.

use cortex_types::Modality;

/// Render one buffer line for `modality`.
pub fn line(modality: Modality, body: &str) -> String {
    format!("[{modality}] {body}")
}

/// Render one voice line, carrying the language tag when known.
pub fn voice_line(language: Option<&str>, text: &str) -> String {
    match language {
        Some(lang) => format!("[voice lang={lang}] {text}"),
        None => format!("[voice] {text}"),
    }
}

/// Whether `formatted` contains at least one line tagged with `modality`.
pub fn contains(formatted: &str, modality: Modality) -> bool {
    let open = format!("[{modality}");
    formatted.lines().any(|l| {
        let rest = match l.trim_start().strip_prefix(&open) {
            Some(rest) => rest,
            None => return false,
        };
        // "[voice]" or "[voice lang=..]" but not "[voiceprint]".
        rest.starts_with(']') || rest.starts_with(' ')
    })
}

/// Extract the language tag from the first voice marker carrying one.
pub fn parse_language(formatted: &str) -> Option<String> {
    for l in formatted.lines() {
        let Some(rest) = l.trim_start().strip_prefix("[voice lang=") else {
            continue;
        };
        let Some(end) = rest.find(']') else {
            continue;
        };
        let lang = rest[..end].trim();
        if !lang.is_empty() {
            return Some(lang.to_string());
        }
    }
    None
}

/// Collect person names from vision (`person=`) and badge (`name=`) lines,
/// in order of appearance, without duplicates.
pub fn parse_names(formatted: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for l in formatted.lines() {
        let l = l.trim_start();
        let body = if let Some(rest) = l.strip_prefix("[vision]") {
            rest
        } else if let Some(rest) = l.strip_prefix("[badge]") {
            rest
        } else {
            continue;
        };
        for field in body.split(';') {
            let field = field.trim();
            let value = field
                .strip_prefix("person=")
                .or_else(|| field.strip_prefix("name="));
            if let Some(value) = value {
                let value = value.trim();
                if !value.is_empty() && !names.iter().any(|n| n == value) {
                    names.push(value.to_string());
                }
            }
        }
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_carries_modality_tag() {
        assert_eq!(line(Modality::Badge, "name=Maria Lopez"), "[badge] name=Maria Lopez");
        assert_eq!(line(Modality::Vision, "person=Alice"), "[vision] person=Alice");
    }

    #[test]
    fn voice_line_with_and_without_language() {
        assert_eq!(voice_line(Some("es"), "Hola"), "[voice lang=es] Hola");
        assert_eq!(voice_line(None, "Hello"), "[voice] Hello");
    }

    #[test]
    fn contains_matches_exact_modality_only() {
        let text = "[voice lang=en] What are your hours?\n[vision] person=Alice";
        assert!(contains(text, Modality::Voice));
        assert!(contains(text, Modality::Vision));
        assert!(!contains(text, Modality::Badge));
    }

    #[test]
    fn contains_rejects_prefix_collisions() {
        // A hypothetical "[voiceprint]" marker must not read as voice.
        assert!(!contains("[voiceprint] xyz", Modality::Voice));
    }

    #[test]
    fn parse_language_reads_first_tag() {
        let text = "[voice lang=es] Hola\n[voice lang=en] Hello";
        assert_eq!(parse_language(text).as_deref(), Some("es"));
    }

    #[test]
    fn parse_language_none_when_untagged() {
        assert!(parse_language("[voice] Hello").is_none());
        assert!(parse_language("[vision] person=Alice").is_none());
    }

    #[test]
    fn parse_names_from_badge_and_vision() {
        let text = "[badge] name=Maria Lopez\n[vision] person=Alice Smith";
        assert_eq!(parse_names(text), vec!["Maria Lopez", "Alice Smith"]);
    }

    #[test]
    fn parse_names_deduplicates_and_splits_fields() {
        let text = "[vision] person=Alice; person=Bob\n[vision] person=Alice";
        assert_eq!(parse_names(text), vec!["Alice", "Bob"]);
    }

    #[test]
    fn parse_names_ignores_plain_captions() {
        assert!(parse_names("[vision] an empty lobby").is_empty());
    }
}
