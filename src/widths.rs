//! Responsive width options: `"100,200:2x,300?"`.
//!
//! Each comma-separated entry is a pixel width, an optional pixel-density
//! descriptor after a colon, and an optional trailing `?` that makes the
//! width optional. Widths are mandatory by default.
//!
//! - `"800"` → width 800, mandatory
//! - `"1600:2x"` → width 1600, density `2x`, mandatory
//! - `"400?"` → width 400, optional
//!
//! Whitespace around entries and commas is tolerated. A string with any
//! malformed entry is rejected as a whole.

use crate::error::ContractError;
use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

const OPTION: &str = r"(\d+)(:(\d+(\.\d+)?x))?(\?)?";

static OPTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!("^{OPTION}$")).expect("valid regex"));

static LIST_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"^\s*{OPTION}\s*(,\s*{OPTION}\s*)*$")).expect("valid regex")
});

/// One requested responsive width.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WidthOption {
    pub width: u64,
    /// Pixel-density descriptor such as `2x`.
    pub density: Option<String>,
    pub mandatory: bool,
}

impl WidthOption {
    pub fn new(width: u64, mandatory: bool) -> Self {
        Self {
            width,
            density: None,
            mandatory,
        }
    }

    pub fn with_density(mut self, density: impl Into<String>) -> Self {
        self.density = Some(density.into());
        self
    }
}

impl fmt::Display for WidthOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.width)?;
        if let Some(density) = &self.density {
            write!(f, ":{density}")?;
        }
        if !self.mandatory {
            write!(f, "?")?;
        }
        Ok(())
    }
}

/// Parse a width-option list. `None` when the string is blank or malformed.
pub fn parse_widths(widths: &str) -> Option<Vec<WidthOption>> {
    if !LIST_RE.is_match(widths) {
        return None;
    }
    widths
        .split(',')
        .map(|entry| {
            let caps = OPTION_RE.captures(entry.trim())?;
            let width = caps.get(1)?.as_str().parse::<u64>().ok()?;
            Some(WidthOption {
                width,
                density: caps.get(3).map(|m| m.as_str().to_string()),
                mandatory: caps.get(5).is_none(),
            })
        })
        .collect()
}

/// Like [`parse_widths`], for call sites where a malformed list is a caller bug.
pub fn require_widths(widths: &str) -> Result<Vec<WidthOption>, ContractError> {
    parse_widths(widths).ok_or_else(|| ContractError::InvalidWidths(widths.to_string()))
}

/// True when the list is valid and at least one entry carries a density.
pub fn has_density_descriptor(widths: &str) -> bool {
    LIST_RE.is_match(widths) && widths.contains(':')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_plain_widths() {
        let parsed = parse_widths("100,200,300").unwrap();
        assert_eq!(
            parsed,
            vec![
                WidthOption::new(100, true),
                WidthOption::new(200, true),
                WidthOption::new(300, true),
            ]
        );
    }

    #[test]
    fn parse_optional_and_density() {
        let parsed = parse_widths("100, 200:2x ,300:1.5x?").unwrap();
        assert_eq!(parsed[0], WidthOption::new(100, true));
        assert_eq!(parsed[1], WidthOption::new(200, true).with_density("2x"));
        assert_eq!(parsed[2], WidthOption::new(300, false).with_density("1.5x"));
    }

    #[test]
    fn parse_rejects_malformed() {
        assert!(parse_widths("").is_none());
        assert!(parse_widths("   ").is_none());
        assert!(parse_widths("100,,200").is_none());
        assert!(parse_widths("100,abc").is_none());
        assert!(parse_widths("100:2").is_none());
        assert!(parse_widths("-100").is_none());
    }

    #[test]
    fn require_widths_reports_input() {
        assert_eq!(
            require_widths("x"),
            Err(ContractError::InvalidWidths("x".to_string()))
        );
        assert_eq!(require_widths("10").unwrap().len(), 1);
    }

    #[test]
    fn density_descriptor_detection() {
        assert!(has_density_descriptor("100,200:2x"));
        assert!(!has_density_descriptor("100,200"));
        assert!(!has_density_descriptor("100:abc"));
    }

    #[test]
    fn display_round_trips_shape() {
        let option = WidthOption::new(300, false).with_density("2x");
        assert_eq!(option.to_string(), "300:2x?");
        assert_eq!(WidthOption::new(100, true).to_string(), "100");
    }
}
