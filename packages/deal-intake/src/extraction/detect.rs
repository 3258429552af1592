//! Heuristics for spotting free-text deal announcements.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref STRONG_INDICATORS: Vec<Regex> = [
        // 1000+10%, $1000+10%
        r"(?i)\$?\s*\d+\s*\+\s*\d+%",
        // Price: 1000, CPA: 1200, CPL 15
        r"(?i)(?:Price|CPA|CPL)\s*:?\s*[\d.]+",
        r"(?i)(?:Partner|Company)\s*:",
        r"(?i)(?:GEO|Country)\s*:",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).unwrap())
    .collect();

    static ref SUPPORTING_INDICATORS: Vec<Regex> = [
        r"(?i)Source\s*:",
        r"(?i)Funnels?\s*:",
        r"(?i)Landing Page\s*:",
        r"(?i)model\s*:",
        // "UK eng", "FR native"
        r"(?i)[A-Z]{2}\s*(?:native|eng|fr|es|de)",
        r"(?i)(?:FB|Facebook|Google|SEO|Taboola|Native)\s+Traffic",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).unwrap())
    .collect();
}

// Our own progress messages echoed back must never be re-parsed.
const PROGRESS_MARKERS: [&str; 2] = ["Deal Parsing Progress", "Processing deal"];

/// True when `text` reads like a free-text deal: at least one strong and
/// one supporting indicator.
pub fn looks_like_free_text_deal(text: &str) -> bool {
    if PROGRESS_MARKERS.iter().any(|marker| text.contains(marker)) {
        return false;
    }

    let strong = STRONG_INDICATORS.iter().any(|re| re.is_match(text));
    let supporting = SUPPORTING_INDICATORS.iter().any(|re| re.is_match(text));
    strong && supporting
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detects_free_text_deal() {
        let text = "Partner: FTD Company\nUK eng 1200+10%\nSource: Facebook";
        assert!(looks_like_free_text_deal(text));
    }

    #[test]
    fn test_needs_supporting_indicator() {
        assert!(!looks_like_free_text_deal("CPA: 1200"));
    }

    #[test]
    fn test_delimited_line_is_not_free_text() {
        let line = "TIER1-FTD Company-UK|IE|NL-Native-Facebook|Google-cpa_crg-1200-0.10-&-QuantumAI-&-0.05";
        assert!(!looks_like_free_text_deal(line));
    }

    #[test]
    fn test_ignores_progress_echo() {
        let text = "Processing deal 1 of 3\nCPA: 1200 Source: FB";
        assert!(!looks_like_free_text_deal(text));
    }
}
