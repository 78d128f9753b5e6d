//! Deterministic article composer, used when no generative provider answers.

use enhancer_shared::{Article, ReferenceDocument, slice_chars};

use crate::prompt::references_section;

/// Restructure the original into fixed sections and append the references.
///
/// Never empty: the headings are present even for very short content.
pub fn compose_template(original: &Article, references: &[ReferenceDocument]) -> String {
    let introduction = slice_chars(&original.content, 0, 300);
    let key_points = slice_chars(&original.content, 300, 1000);

    format!(
        "# {title}\n\n\
         ## Introduction\n\n\
         {introduction}...\n\n\
         ## Key Points\n\n\
         This article has been enhanced based on top-ranking content on this topic.\n\n\
         {key_points}...\n\n\
         ## Conclusion\n\n\
         For more information, see the references below.\n\n\
         {references}",
        title = original.title,
        references = references_section(references),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::{article, reference};

    #[test]
    fn splits_content_into_sections() {
        let content = format!("{}{}{}", "a".repeat(300), "b".repeat(700), "c".repeat(50));
        let text = compose_template(
            &article("Support bots", &content),
            &[reference("Ref", "https://ref.example")],
        );

        assert!(text.starts_with("# Support bots\n\n## Introduction\n\n"));
        assert!(text.contains(&format!("{}...\n\n## Key Points", "a".repeat(300))));
        assert!(text.contains(&format!("\n\n{}...\n\n## Conclusion", "b".repeat(700))));
        assert!(!text.contains("cc"));
        assert!(text.ends_with("1. [Ref](https://ref.example)\n"));
    }

    #[test]
    fn short_content_still_has_every_section() {
        let text = compose_template(&article("Tiny", "Hi."), &[]);
        assert!(text.contains("## Introduction\n\nHi....\n\n"));
        assert!(text.contains("## Key Points"));
        assert!(text.contains("## Conclusion"));
        assert!(text.contains("## References"));
    }
}
