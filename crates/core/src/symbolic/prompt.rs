use crate::types::{sanitize_context, Archetype, Biomarkers, ProtocolContext};

pub const SYSTEM_PROMPT: &str = "You are a symbolic analyst for emotional text. \
    Output ONLY one JSON object. No markdown, no explanation.";

/// Build the extraction prompt for the text-generation collaborator.
///
/// The prompt asks for:
/// - metaphors found in the text
/// - one archetype from the fixed vocabulary
/// - a primary symbol plus 2-3 alternates, valence, arousal and confidence
pub fn build_extraction_prompt(
    text: &str,
    biomarkers: Option<&Biomarkers>,
    context: Option<&ProtocolContext>,
) -> String {
    let mut prompt = String::with_capacity(1024);

    prompt.push_str("Read the text below and describe its symbolic content.\n\n");
    prompt.push_str("## Steps\n");
    prompt.push_str("1. Identify the metaphors the author uses.\n");
    prompt.push_str("2. Map the overall framing to exactly one archetype.\n");
    prompt.push_str("3. Choose a primary symbol and 2-3 alternative symbols.\n\n");

    prompt.push_str("## Archetypes (use one of these names exactly):\n");
    let names: Vec<&str> = Archetype::ALL.iter().map(|a| a.as_str()).collect();
    prompt.push_str(&names.join(", "));
    prompt.push_str("\n\n");

    if let Some(b) = biomarkers.filter(|b| !b.is_empty()) {
        prompt.push_str("## Biomarkers\n");
        if let Some(v) = b.heart_rate_variability {
            prompt.push_str(&format!("- heart rate variability: {v:.1} ms\n"));
        }
        if let Some(v) = b.galvanic_skin_response {
            prompt.push_str(&format!("- galvanic skin response: {v:.1} uS\n"));
        }
        if let Some(v) = b.voice_tremor {
            prompt.push_str(&format!("- voice tremor: {v:.2}\n"));
        }
        prompt.push('\n');
    }

    if let Some(ctx) = context {
        let clean = sanitize_context(ctx);
        if !clean.is_empty() {
            prompt.push_str("## Context\n");
            for (k, v) in &clean {
                prompt.push_str(&format!("- {k}: {v}\n"));
            }
            prompt.push('\n');
        }
    }

    prompt.push_str("## Output format\n");
    prompt.push_str(
        "{\"primary_symbol\": string, \"archetype\": string, \"alternative_symbols\": [string], \
         \"valence\": number -1..1, \"arousal\": number 0..1, \
         \"metaphors\": [{\"source\": string, \"symbol\": string, \"confidence\": number 0..1}], \
         \"confidence\": number 0..1}\n\n",
    );

    prompt.push_str("## Text\n");
    prompt.push_str(text);
    prompt.push('\n');
    prompt
}
