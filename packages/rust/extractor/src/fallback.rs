//! Ranked-selector fallback used when readability scoring finds nothing.

use std::sync::LazyLock;

use enhancer_shared::{EnhancerError, Result, SelectorRule};
use scraper::{ElementRef, Html, Selector};

use crate::text::render_text;

static BODY_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("body").expect("valid selector"));

/// A parsed [`SelectorRule`].
#[derive(Debug)]
pub(crate) struct CompiledRule {
    source: String,
    selector: Selector,
    min_chars: usize,
}

/// Selector rules and strip list, parsed once per extractor.
#[derive(Debug)]
pub(crate) struct SelectorFallback {
    rules: Vec<CompiledRule>,
    strip: Vec<Selector>,
}

impl SelectorFallback {
    pub(crate) fn new(rules: &[SelectorRule], strip: &[String]) -> Result<Self> {
        let rules = rules
            .iter()
            .map(|rule| {
                Ok(CompiledRule {
                    source: rule.selector.clone(),
                    selector: parse_selector(&rule.selector)?,
                    min_chars: rule.min_chars,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let strip = strip
            .iter()
            .map(|s| parse_selector(s))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { rules, strip })
    }

    /// Probe the rules in rank order; the first match of each selector is
    /// accepted if its text is longer than the rule minimum. Falls back to the
    /// whole body.
    pub(crate) fn extract(&self, doc: &Html) -> String {
        let skip = |el: &ElementRef| self.strip.iter().any(|s| s.matches(el));
        // A stripped subtree is removed whole, so candidates inside one are out too.
        let stripped = |el: &ElementRef| {
            skip(el) || el.ancestors().filter_map(ElementRef::wrap).any(|a| skip(&a))
        };

        for rule in &self.rules {
            let Some(el) = doc.select(&rule.selector).find(|el| !stripped(el)) else {
                continue;
            };
            let text = render_text(el, &skip);
            let chars = text.chars().count();
            if chars > rule.min_chars {
                tracing::debug!(selector = %rule.source, chars, "fallback rule matched");
                return text;
            }
        }

        doc.select(&BODY_SEL)
            .next()
            .map(|body| render_text(body, &skip))
            .unwrap_or_default()
    }
}

fn parse_selector(raw: &str) -> Result<Selector> {
    Selector::parse(raw)
        .map_err(|e| EnhancerError::config(format!("invalid selector '{raw}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fallback(rules: &[(&str, usize)]) -> SelectorFallback {
        let rules: Vec<SelectorRule> = rules
            .iter()
            .map(|(sel, min)| SelectorRule::new(*sel, *min))
            .collect();
        let strip = vec!["script".to_string(), "nav".to_string(), ".ad".to_string()];
        SelectorFallback::new(&rules, &strip).expect("valid rules")
    }

    #[test]
    fn first_qualifying_rule_wins() {
        let html = r#"<body>
            <article>Too short</article>
            <div class="post-content">Long enough body text here <span class="ad">BUY NOW</span></div>
        </body>"#;
        let doc = Html::parse_document(html);
        let text = fallback(&[("article", 20), (".post-content", 20)]).extract(&doc);
        assert_eq!(text, "Long enough body text here");
    }

    #[test]
    fn only_first_match_per_selector_is_probed() {
        let html = r#"<body>
            <main>short</main>
            <main>this second main is long enough to qualify</main>
        </body>"#;
        let doc = Html::parse_document(html);
        let text = fallback(&[("main", 10)]).extract(&doc);
        assert_eq!(text, "short\nthis second main is long enough to qualify");
    }

    #[test]
    fn falls_back_to_body() {
        let html = "<body><nav>Menu</nav><p>Only a paragraph</p><script>x()</script></body>";
        let doc = Html::parse_document(html);
        let text = fallback(&[("article", 10)]).extract(&doc);
        assert_eq!(text, "Only a paragraph");
    }

    #[test]
    fn matches_inside_stripped_subtrees_are_ignored() {
        let menu = "Menu entry with a lot of navigation text. ".repeat(8);
        let body = "The real article body talks about support automation. ".repeat(6);
        let html = format!(
            "<body><aside><article>{menu}</article></aside><article>{body}</article></body>"
        );
        let doc = Html::parse_document(&html);
        let fallback = SelectorFallback::new(
            &[SelectorRule::new("article", 200)],
            &["aside".to_string()],
        )
        .expect("valid rules");

        let text = fallback.extract(&doc);
        assert!(text.starts_with("The real article body"));
        assert!(!text.contains("Menu entry"));
    }

    #[test]
    fn invalid_selector_is_config_error() {
        let err = SelectorFallback::new(&[SelectorRule::new("[[", 1)], &[]).unwrap_err();
        assert!(matches!(err, EnhancerError::Config { .. }));
    }
}
