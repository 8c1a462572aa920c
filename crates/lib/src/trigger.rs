//! Dropdown triggers embedded in flow replies.
//!
//! The flow switches the reply to card UI by emitting a marker in its text. Checks are plain
//! prefix/substring matches, so a marker quoted inside ordinary prose also triggers.

/// Reply starting with this prefix carries its own comma-separated item list.
pub const LEGACY_DROPDOWN_PREFIX: &str = "DROPDOWN:";

/// Reply containing this marker asks for the configured asset catalog.
pub const ASSET_DROPDOWN_MARKER: &str = "SHOW_ASSET_DROPDOWN";

/// Prompt shown above a legacy dropdown.
pub const LEGACY_DROPDOWN_PROMPT: &str = "Please select from the following options:";

/// How a flow reply should be rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trigger {
    Plain(String),
    LegacyDropdown { prompt: String, items: Vec<String> },
    AssetDropdown { prompt: String, items: Vec<String> },
}

/// Classify `text`. The legacy prefix is checked first, then the asset marker (in the raw
/// text, then with line breaks removed so a marker wrapped across lines still matches).
pub fn detect(text: &str, assets: &[String], default_prompt: &str) -> Trigger {
    if let Some(rest) = text.strip_prefix(LEGACY_DROPDOWN_PREFIX) {
        return Trigger::LegacyDropdown {
            prompt: LEGACY_DROPDOWN_PROMPT.to_string(),
            items: split_items(rest),
        };
    }

    let collapsed: String;
    let before = match text.find(ASSET_DROPDOWN_MARKER) {
        Some(i) => Some(&text[..i]),
        None => {
            collapsed = text.chars().filter(|c| *c != '\n' && *c != '\r').collect();
            collapsed
                .find(ASSET_DROPDOWN_MARKER)
                .map(|i| &collapsed[..i])
        }
    };

    match before {
        Some(before) => {
            let prompt = before.trim();
            let prompt = if prompt.is_empty() {
                default_prompt
            } else {
                prompt
            };
            Trigger::AssetDropdown {
                prompt: prompt.to_string(),
                items: assets.to_vec(),
            }
        }
        None => Trigger::Plain(text.to_string()),
    }
}

/// Split on commas, trim each piece, drop empties.
pub fn split_items(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEFAULT_PROMPT: &str = "Pick assets:";

    fn assets() -> Vec<String> {
        vec!["Jira".to_string(), "VPN Access".to_string()]
    }

    #[test]
    fn legacy_prefix_splits_and_trims() {
        let t = detect("DROPDOWN:A, B ,C", &assets(), DEFAULT_PROMPT);
        assert_eq!(
            t,
            Trigger::LegacyDropdown {
                prompt: LEGACY_DROPDOWN_PROMPT.to_string(),
                items: vec!["A".to_string(), "B".to_string(), "C".to_string()],
            }
        );
    }

    #[test]
    fn legacy_prefix_must_lead() {
        let t = detect(" DROPDOWN:A", &assets(), DEFAULT_PROMPT);
        assert_eq!(t, Trigger::Plain(" DROPDOWN:A".to_string()));
    }

    #[test]
    fn asset_marker_uses_preceding_text_as_prompt() {
        let t = detect("  Which ones do you need?\nSHOW_ASSET_DROPDOWN", &assets(), DEFAULT_PROMPT);
        assert_eq!(
            t,
            Trigger::AssetDropdown {
                prompt: "Which ones do you need?".to_string(),
                items: assets(),
            }
        );
    }

    #[test]
    fn asset_marker_alone_uses_default_prompt() {
        let t = detect("SHOW_ASSET_DROPDOWN", &assets(), DEFAULT_PROMPT);
        assert_eq!(
            t,
            Trigger::AssetDropdown {
                prompt: DEFAULT_PROMPT.to_string(),
                items: assets(),
            }
        );
    }

    #[test]
    fn asset_marker_wrapped_across_lines() {
        let t = detect("Choose:\nSHOW_ASSET_\r\nDROPDOWN", &assets(), DEFAULT_PROMPT);
        assert_eq!(
            t,
            Trigger::AssetDropdown {
                prompt: "Choose:".to_string(),
                items: assets(),
            }
        );
    }

    #[test]
    fn marker_inside_prose_still_triggers() {
        let t = detect("the word SHOW_ASSET_DROPDOWN appears here", &assets(), DEFAULT_PROMPT);
        assert!(matches!(t, Trigger::AssetDropdown { ref prompt, .. } if prompt == "the word"));
    }

    #[test]
    fn no_trigger_is_plain() {
        let t = detect("Your assets: Jira, VPN", &assets(), DEFAULT_PROMPT);
        assert_eq!(t, Trigger::Plain("Your assets: Jira, VPN".to_string()));
    }

    #[test]
    fn split_items_drops_blanks() {
        assert_eq!(split_items("x, y,, "), vec!["x".to_string(), "y".to_string()]);
        assert!(split_items("").is_empty());
    }
}
