//! Instruction template for proposal analysis.

pub const SYSTEM_PROMPT: &str = "You are a business analyst who reviews commercial proposals. \
You answer with a single JSON object and nothing else.";

const ANALYSIS_TEMPLATE: &str = r#"Analyze the following business proposal and return a JSON object with exactly this structure:

{
  "executiveSummary": "3-5 sentence summary of the proposal",
  "keyRequirements": ["requirement 1", "requirement 2"],
  "pricingOverview": {
    "totalAmount": "total price as written, including currency (e.g. \"$45,000\")",
    "breakdown": ["line item: amount"],
    "paymentTerms": "payment schedule and terms"
  },
  "recommendedNextSteps": ["step 1", "step 2"]
}

Rules:
- Use only information found in the proposal. Write "Not specified" when a value is missing.
- List next steps in the order they should be carried out.
- Do not wrap the JSON in Markdown and do not add commentary.

Proposal text:
{content}"#;

/// Builds the user message for a proposal, truncating the text to
/// `max_chars` characters on a char boundary.
pub fn analysis_prompt(text: &str, max_chars: usize) -> String {
    ANALYSIS_TEMPLATE.replace("{content}", truncate_chars(text, max_chars))
}

pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
