//! The shared rewrite prompt and the uniform references section.

use std::fmt::Write;

use enhancer_shared::{Article, ReferenceDocument, truncate_chars};

/// Characters of the original article included in the prompt.
pub const ORIGINAL_EXCERPT_CHARS: usize = 1500;

/// Characters of each reference included in the prompt.
pub const REFERENCE_EXCERPT_CHARS: usize = 800;

const TASK: &str = "
=== YOUR TASK ===
Rewrite and enhance the ORIGINAL ARTICLE by:
1. Improving the structure and formatting (use clear sections, headings)
2. Making the content more engaging and professional
3. Incorporating relevant insights from the reference articles
4. Keeping the core message of the original article
5. Making it similar in style and quality to the top-ranking reference articles

IMPORTANT:
- Do NOT include any preamble or meta-commentary
- Start directly with the enhanced article content
- Use markdown formatting for headings and structure
- Keep it between 500-1500 words
- Do NOT add a references section (we will add that separately)

Enhanced Article:";

/// Build the prompt sent to every generative provider.
pub fn build_prompt(original: &Article, references: &[ReferenceDocument]) -> String {
    let mut prompt = String::with_capacity(4096);
    prompt.push_str(
        "You are enhancing an article to improve its quality, formatting, and readability.\n\n",
    );
    prompt.push_str("=== ORIGINAL ARTICLE ===\n");
    let _ = writeln!(prompt, "Title: {}", original.title);
    prompt.push_str("Content:\n");
    prompt.push_str(truncate_chars(&original.content, ORIGINAL_EXCERPT_CHARS));
    prompt.push_str("\n\n=== REFERENCE ARTICLES (Top ranking on Google) ===\n");

    for (i, reference) in references.iter().enumerate() {
        let _ = write!(
            prompt,
            "\nReference {}:\nTitle: {}\nURL: {}\nContent excerpt:\n{}\n",
            i + 1,
            reference.title,
            reference.url,
            truncate_chars(&reference.content, REFERENCE_EXCERPT_CHARS),
        );
    }

    prompt.push_str(TASK);
    prompt
}

/// Markdown block listing the references, appended to every enhanced article.
pub fn references_section(references: &[ReferenceDocument]) -> String {
    let mut section = String::from(
        "---\n\n## References\n\nThis article was enhanced using insights from the following sources:\n\n",
    );
    for (i, reference) in references.iter().enumerate() {
        let _ = writeln!(section, "{}. [{}]({})", i + 1, reference.title, reference.url);
    }
    section
}
