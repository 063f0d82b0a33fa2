use crate::docx::document::Document;
use crate::docx::items::Paragraph;
use crate::pipeline::results::FieldResults;
use crate::pipeline::rules::{Rule, RuleTable};

/// Walks paragraphs in document order, assigning each to the field it starts, or to the last
/// recognised field when it starts none.
pub struct Classifier<'r> {
    rules: &'r RuleTable,
    line_separator: String,
}

impl<'r> Classifier<'r> {
    pub fn new(rules: &'r RuleTable, line_separator: impl Into<String>) -> Self {
        Self {
            rules,
            line_separator: line_separator.into(),
        }
    }

    pub fn classify(&self, document: &Document) -> FieldResults {
        let mut results = FieldResults::new();
        let mut active: Option<&'r Rule> = None;

        for (idx, para) in document.paragraphs().enumerate() {
            let pnum = idx + 1;
            let pid = para.id();
            tracing::debug!("----> ({pnum:02}) paragraph {pid}");

            let cleaned = para.cleaned_text();
            let stripped = cleaned.trim();
            if stripped.is_empty() {
                tracing::debug!("paragraph {pid} text is empty, skipping it");
                continue;
            }

            let matched = self.rules.recognize(stripped);
            let Some(work) = matched.or(active) else {
                tracing::warn!("paragraph {pnum} ({pid}) skipped: no field recognised yet");
                continue;
            };

            let mut fragments = para.raw_text();
            let mut payload = fragments.concat();
            self.extract_auxiliary(work, &para, &cleaned, &mut payload, &mut results);

            match matched {
                Some(rule) => {
                    tracing::info!("paragraph recognized as [{}]", rule.id);
                    if !rule.keep_matched_prefix {
                        strip_leading_match(rule, &mut payload, &mut fragments);
                    }
                    results.append(&rule.id, &payload, fragments);
                    active = Some(rule);
                }
                None => {
                    tracing::info!(
                        "paragraph not recognized, adding it to the last recognized [{}]",
                        work.id
                    );
                    let text = format!("{}{payload}", self.line_separator);
                    results.append(&work.id, &text, fragments);
                }
            }
        }

        results
    }

    /// Collects fields declared in `also_contains` of the field the paragraph belongs to. Runs
    /// before the paragraph is committed so that extracted text can be cut out of `payload`.
    fn extract_auxiliary(
        &self,
        work: &Rule,
        para: &Paragraph<'_>,
        cleaned: &str,
        payload: &mut String,
        results: &mut FieldResults,
    ) {
        if work.also_contains.is_empty() {
            return;
        }
        tracing::debug!(
            "found {} extra types: {:?}",
            work.also_contains.len(),
            work.also_contains
        );

        for aux_id in &work.also_contains {
            let Some(aux) = self.rules.get(aux_id) else {
                continue;
            };
            if aux.is_image {
                tracing::debug!("trying to find images within paragraph {}", para.id());
                for drawing in para.images() {
                    match drawing.image_name() {
                        Some(name) => results.add_image(&aux.id, name),
                        None => tracing::warn!(
                            "image in paragraph {} has no resolvable target",
                            para.id()
                        ),
                    }
                }
            } else if aux.has_search_pattern() {
                let haystack = if aux.strip_links {
                    cleaned.to_string()
                } else {
                    payload.clone()
                };
                let Some(found) = aux.search(&haystack) else {
                    continue;
                };
                let found = found.trim();
                tracing::debug!("found [{found}] for {}", aux.id);
                let fragments = found
                    .split(self.line_separator.as_str())
                    .map(str::to_string)
                    .collect();
                results.append(&aux.id, found, fragments);
                if !aux.leave_in_place && !found.is_empty() {
                    *payload = payload.replace(found, "");
                }
            }
        }
    }
}

/// Recognition runs on trimmed text, so leading whitespace goes together with the matched header.
fn strip_leading_match(rule: &Rule, payload: &mut String, fragments: &mut Vec<String>) {
    strip_prefix_in_place(rule, payload);
    if let Some(first) = fragments.first_mut() {
        if strip_prefix_in_place(rule, first) && first.is_empty() {
            tracing::debug!("leading fragment consumed by the start pattern of {}", rule.id);
            fragments.remove(0);
        }
    }
}

fn strip_prefix_in_place(rule: &Rule, text: &mut String) -> bool {
    let offset = text.len() - text.trim_start().len();
    let Some(prefix) = rule.leading_match(&text[offset..]) else {
        return false;
    };
    let end = offset + prefix.len();
    text.replace_range(..end, "");
    true
}
