//! Oracle prompts for free-text deal extraction.
//!
//! Both prompts ask for a single JSON object; the oracle runs in JSON mode
//! at temperature 0.

/// System prompt for splitting a message into sections and deal blocks.
pub const STRUCTURE_SYSTEM_PROMPT: &str = r#"You split affiliate deal announcements into individual deals.

A message may contain one or more sections. A section is a group of deals that share
fields written once for the whole group (for example a partner name in a header, a
common traffic source, or a shared GEO). Every deal inside a section is a block of text
describing a single offer for a single GEO.

Output JSON only:
{
    "sections": [
        {
            "shared_fields": {
                "partner": "advertiser name if stated once for the section",
                "region": "tier label if stated (TIER1, TIER2, TIER3)",
                "source": "traffic source if shared",
                "language": "language if shared",
                "funnels": ["funnels if shared"]
            },
            "deal_blocks": [
                { "text": "the exact text of one deal, copied verbatim" }
            ]
        }
    ]
}

Rules:
- Copy deal text verbatim. Never invent deals.
- Omit shared fields that are not present.
- If nothing looks like a deal, return {"sections": []}."#;

/// User prompt carrying the raw message for structure analysis.
pub const STRUCTURE_USER_PROMPT: &str = r#"Analyze this message:

{text}"#;

/// System prompt for turning one deal block into a structured record.
pub const PARSE_SYSTEM_PROMPT: &str = r#"You extract one affiliate deal into structured fields.

Output JSON only:
{
    "raw_text": "the deal text you were given",
    "parsed_data": {
        "partner": "advertiser name",
        "region": "TIER1, TIER2 or TIER3",
        "geo": "two-letter country code",
        "language": "comma separated languages, or null",
        "source": "traffic sources separated by |",
        "pricing_model": "CPA/CRG, CPA or CPL",
        "cpa": number or null,
        "crg": number or null,
        "cpl": number or null,
        "funnels": ["funnel names"],
        "cr": number or null,
        "deduction_limit": number or null
    }
}

Rules:
- "1000+10%" means cpa 1000 and crg 10.
- Percentages may be written as 10, 10% or 0.10.
- Use the shared fields whenever the deal text does not override them.
- Use null for anything that is not stated. Never guess prices."#;

/// User prompt carrying one deal block and its section's shared fields.
pub const PARSE_USER_PROMPT: &str = r#"Shared fields for this section:
{shared_fields}

Deal text:
{deal_text}"#;

/// Format the structure-analysis user prompt.
pub fn format_structure_prompt(text: &str) -> String {
    STRUCTURE_USER_PROMPT.replace("{text}", text)
}

/// Format the per-deal user prompt.
pub fn format_parse_prompt(deal_text: &str, shared_fields: &serde_json::Value) -> String {
    let shared = serde_json::to_string_pretty(shared_fields).unwrap_or_else(|_| "{}".to_string());
    PARSE_USER_PROMPT
        .replace("{shared_fields}", &shared)
        .replace("{deal_text}", deal_text)
}
