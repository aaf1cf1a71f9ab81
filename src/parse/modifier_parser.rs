use std::sync::LazyLock;

use regex::Regex;

use crate::model::config::Markers;
use crate::model::modifier::{Modifier, ModifierKind};

/// `<anything>{<token>}` with the braces as the trailing annotation
static DELAY_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)^(.*)\{([^{}]*)\}$").expect("delay pattern compiles"));

/// Extracts modifiers from display content using the configured markers.
#[derive(Debug, Clone)]
pub struct ModifierParser {
    parallel_suffix: String,
    serial_suffix: String,
}

impl ModifierParser {
    pub fn new(parallel_suffix: &str, serial_suffix: &str) -> Self {
        ModifierParser {
            parallel_suffix: parallel_suffix.to_string(),
            serial_suffix: serial_suffix.to_string(),
        }
    }

    pub fn from_markers(markers: &Markers) -> Self {
        Self::new(&markers.parallel_suffix, &markers.serial_suffix)
    }

    /// Strip markers from the end of `content` until none match.
    ///
    /// The kind is overwritten on each marker, so the leftmost marker of the
    /// trailing chain decides it. The same holds for the delay token.
    pub fn parse(&self, content: &str) -> Modifier {
        let mut modifier = Modifier::default();
        let mut remaining = content;

        loop {
            let trimmed = remaining.trim();

            if let Some(rest) = strip_marker(trimmed, &self.parallel_suffix) {
                modifier.kind = ModifierKind::Parallel;
                remaining = rest;
                continue;
            }
            if let Some(rest) = strip_marker(trimmed, &self.serial_suffix) {
                modifier.kind = ModifierKind::Serial;
                remaining = rest;
                continue;
            }
            if let Some(caps) = DELAY_SUFFIX.captures(trimmed) {
                let token = caps.get(2).map_or("", |m| m.as_str()).trim();
                // `{}` is stripped but carries no date
                if !token.is_empty() {
                    modifier.delay = Some(token.to_string());
                }
                remaining = caps.get(1).map_or("", |m| m.as_str());
                continue;
            }
            break;
        }

        modifier
    }

    /// Kind only; used for project names
    pub fn kind(&self, name: &str) -> ModifierKind {
        self.parse(name).kind
    }
}

impl Default for ModifierParser {
    fn default() -> Self {
        Self::from_markers(&Markers::default())
    }
}

fn strip_marker<'a>(s: &'a str, marker: &str) -> Option<&'a str> {
    if marker.is_empty() {
        return None;
    }
    s.strip_suffix(marker)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(s: &str) -> Modifier {
        ModifierParser::default().parse(s)
    }

    #[test]
    fn plain_content_has_no_modifier() {
        assert_eq!(parse("Buy milk"), Modifier::default());
        assert_eq!(parse(""), Modifier::default());
    }

    #[test]
    fn parallel_and_serial_suffixes() {
        assert_eq!(parse("Trip prep (=)").kind, ModifierKind::Parallel);
        assert_eq!(parse("Trip prep (-)").kind, ModifierKind::Serial);
    }

    #[test]
    fn surrounding_whitespace_is_ignored() {
        assert_eq!(parse("  Trip prep (-)   \n").kind, ModifierKind::Serial);
        assert_eq!(parse("Trip prep (-) ").kind, ModifierKind::Serial);
    }

    #[test]
    fn marker_in_the_middle_does_not_count() {
        assert_eq!(parse("Use (-) as separator").kind, ModifierKind::None);
    }

    #[test]
    fn delay_token() {
        let m = parse("Task{in 3 days}");
        assert_eq!(m.kind, ModifierKind::None);
        assert_eq!(m.delay.as_deref(), Some("in 3 days"));
    }

    #[test]
    fn delay_token_is_trimmed() {
        let m = parse("Task { tomorrow 9am } ");
        assert_eq!(m.delay.as_deref(), Some("tomorrow 9am"));
    }

    #[test]
    fn delay_must_be_trailing() {
        let m = parse("Task {in 3 days} and more");
        assert_eq!(m.delay, None);
    }

    #[test]
    fn empty_delay_is_dropped() {
        let m = parse("Task {} (=)");
        assert_eq!(m.kind, ModifierKind::Parallel);
        assert_eq!(m.delay, None);
    }

    #[test]
    fn delay_combines_with_kind_in_either_order() {
        let a = parse("Plan {next week} (-)");
        let b = parse("Plan (-) {next week}");
        assert_eq!(a, b);
        assert_eq!(a.kind, ModifierKind::Serial);
        assert_eq!(a.delay.as_deref(), Some("next week"));
    }

    #[test]
    fn leftmost_marker_of_the_chain_wins() {
        assert_eq!(parse("Plan (=) (-)").kind, ModifierKind::Parallel);
        assert_eq!(parse("Plan (-)(=)").kind, ModifierKind::Serial);
    }

    #[test]
    fn custom_markers() {
        let parser = ModifierParser::new("||", ">>");
        assert_eq!(parser.parse("Deploy >>").kind, ModifierKind::Serial);
        assert_eq!(parser.parse("Deploy ||").kind, ModifierKind::Parallel);
        assert_eq!(parser.parse("Deploy (-)").kind, ModifierKind::None);
    }

    #[test]
    fn empty_markers_never_match() {
        let parser = ModifierParser::new("", "");
        assert_eq!(parser.parse("anything").kind, ModifierKind::None);
    }
}
