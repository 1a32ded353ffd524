//! Prompt templates and reply parsing for generative enrichment.

use std::collections::{BTreeMap, BTreeSet};

/// Default term prompt. Placeholders: `{class_name}`, `{class_description}`,
/// `{parent_class}`, `{siblings}`, `{term_count}`.
pub const DEFAULT_TERM_PROMPT: &str = "Generate {term_count} specific keywords for the class \
'{class_name}' described as '{class_description}' which is a subclass of '{parent_class}'.
These keywords should be relevant to '{class_name}' but not to these sibling classes: {siblings}. \
Be specific and relevant.
Respond with only the comma-separated terms, no explanations.";

/// Values substituted into a term prompt.
#[derive(Debug, Clone)]
pub struct TermPromptContext<'a> {
    pub class_name: &'a str,
    pub class_description: &'a str,
    /// `None` for a top-level class
    pub parent_class: Option<&'a str>,
    pub siblings: &'a BTreeSet<String>,
    pub term_count: usize,
}

/// Fill a term prompt template.
pub fn render_term_prompt(template: &str, ctx: &TermPromptContext<'_>) -> String {
    let siblings = if ctx.siblings.is_empty() {
        "none".to_string()
    } else {
        ctx.siblings
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    };

    template
        .replace("{class_name}", ctx.class_name)
        .replace("{class_description}", ctx.class_description)
        .replace("{parent_class}", ctx.parent_class.unwrap_or("root"))
        .replace("{siblings}", &siblings)
        .replace("{term_count}", &ctx.term_count.to_string())
}

/// Prompt asking for at most one class per level from the candidates.
pub fn core_class_prompt(document: &str, candidates: &BTreeMap<usize, BTreeSet<String>>) -> String {
    let levels = candidates
        .iter()
        .map(|(level, classes)| {
            let names: Vec<&str> = classes.iter().map(String::as_str).collect();
            format!("Level {}: {}", level, names.join(", "))
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"Given this document:
"{document}"

And these possible classes by level:
{levels}

Select ONLY the most specific and directly relevant class that best describe the main topics of this document.
Important guidelines:
- Choose the class that is most specific to the document's content at each level
- Exclude broad/general classes unless they are directly discussed
- Only select ONE class maximum per level
- If uncertain about a class, exclude it

Return only the selected class names separated by commas, nothing else."#
    )
}

/// Split a list-style reply into clean, de-duplicated items, in reply order.
///
/// Accepts commas or newlines as separators and strips bullets, numbering
/// and surrounding quotes.
pub fn parse_list_reply(reply: &str) -> Vec<String> {
    let mut seen = BTreeSet::new();
    reply
        .split([',', '\n'])
        .map(clean_item)
        .filter(|item| !item.is_empty())
        .filter(|item| seen.insert(item.to_lowercase()))
        .collect()
}

fn clean_item(raw: &str) -> String {
    let mut item = raw.trim();
    item = item.trim_start_matches(['-', '*', '•']).trim_start();

    // "1." / "2)" style numbering
    let digits = item.chars().take_while(char::is_ascii_digit).count();
    if digits > 0 {
        let rest = &item[digits..];
        if let Some(stripped) = rest.strip_prefix(['.', ')']) {
            item = stripped.trim_start();
        }
    }

    item.trim_matches(['"', '\'', '`', '.'])
        .trim()
        .to_string()
}
