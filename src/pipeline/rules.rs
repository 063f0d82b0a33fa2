use std::collections::HashMap;

use regex::Regex;
use thiserror::Error;

use crate::pipeline::config::FieldSpec;

#[derive(Debug, Error)]
pub enum RulesError {
    #[error("rule table is empty")]
    Empty,
    #[error("field id must not be empty")]
    EmptyId,
    #[error("duplicate field id: {0}")]
    DuplicateId(String),
    #[error("invalid {kind} for field {field}")]
    InvalidPattern {
        field: String,
        kind: &'static str,
        #[source]
        source: regex::Error,
    },
    #[error("field {field} lists unknown field {aux} in also_contains")]
    UnknownAuxiliary { field: String, aux: String },
    #[error("identity field {0} is not declared")]
    UnknownIdentity(String),
}

#[derive(Clone, Debug)]
pub struct Rule {
    pub id: String,
    pub order_id: u32,
    start: Option<Regex>,
    exclusion: Option<Regex>,
    search: Option<Regex>,
    pub also_contains: Vec<String>,
    pub keep_matched_prefix: bool,
    pub is_image: bool,
    pub is_list: bool,
    pub filter_blank: bool,
    pub strip_links: bool,
    pub leave_in_place: bool,
}

impl Rule {
    fn compile(spec: &FieldSpec) -> Result<Self, RulesError> {
        let anchored = |pat: &Option<String>, kind: &'static str| {
            pat.as_deref()
                .map(|p| compile(&spec.id, kind, &format!("^(?:{p})")))
                .transpose()
        };
        Ok(Self {
            id: spec.id.trim().to_string(),
            order_id: spec.order_id,
            start: anchored(&spec.start_pattern, "start_pattern")?,
            exclusion: anchored(&spec.exclusion_pattern, "exclusion_pattern")?,
            search: spec
                .search_pattern
                .as_deref()
                .map(|p| compile(&spec.id, "search_pattern", p))
                .transpose()?,
            also_contains: spec
                .also_contains
                .iter()
                .map(|s| s.trim().to_string())
                .collect(),
            keep_matched_prefix: spec.keep_matched_prefix,
            is_image: spec.is_image,
            is_list: spec.is_list,
            filter_blank: spec.filter_blank,
            strip_links: spec.strip_links,
            leave_in_place: spec.leave_in_place,
        })
    }

    pub fn has_start_pattern(&self) -> bool {
        self.start.is_some()
    }

    pub fn has_search_pattern(&self) -> bool {
        self.search.is_some()
    }

    /// Start pattern matches at the beginning and the exclusion pattern does not.
    pub fn recognizes(&self, text: &str) -> bool {
        let Some(start) = &self.start else {
            return false;
        };
        if !start.is_match(text) {
            return false;
        }
        match &self.exclusion {
            Some(exclusion) => !exclusion.is_match(text),
            None => true,
        }
    }

    /// Text matched by the start pattern at the beginning of `text`.
    pub fn leading_match<'t>(&self, text: &'t str) -> Option<&'t str> {
        self.start
            .as_ref()
            .and_then(|re| re.find(text))
            .map(|m| m.as_str())
    }

    pub fn search<'t>(&self, text: &'t str) -> Option<&'t str> {
        self.search
            .as_ref()
            .and_then(|re| re.find(text))
            .map(|m| m.as_str())
    }
}

fn compile(field: &str, kind: &'static str, pattern: &str) -> Result<Regex, RulesError> {
    Regex::new(pattern).map_err(|source| RulesError::InvalidPattern {
        field: field.to_string(),
        kind,
        source,
    })
}

/// Immutable rule table. Matching always follows declaration order.
#[derive(Clone, Debug)]
pub struct RuleTable {
    rules: Vec<Rule>,
    index: HashMap<String, usize>,
    identity_field: String,
}

impl RuleTable {
    pub fn from_specs(specs: &[FieldSpec], identity_field: &str) -> Result<Self, RulesError> {
        if specs.is_empty() {
            return Err(RulesError::Empty);
        }
        let mut rules = Vec::with_capacity(specs.len());
        let mut index = HashMap::new();
        for spec in specs {
            let rule = Rule::compile(spec)?;
            if rule.id.is_empty() {
                return Err(RulesError::EmptyId);
            }
            if index.insert(rule.id.clone(), rules.len()).is_some() {
                return Err(RulesError::DuplicateId(rule.id));
            }
            rules.push(rule);
        }
        for rule in &rules {
            if let Some(aux) = rule.also_contains.iter().find(|a| !index.contains_key(*a)) {
                return Err(RulesError::UnknownAuxiliary {
                    field: rule.id.clone(),
                    aux: aux.clone(),
                });
            }
        }
        if !index.contains_key(identity_field) {
            return Err(RulesError::UnknownIdentity(identity_field.to_string()));
        }
        Ok(Self {
            rules,
            index,
            identity_field: identity_field.to_string(),
        })
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn get(&self, id: &str) -> Option<&Rule> {
        self.index.get(id).map(|&i| &self.rules[i])
    }

    pub fn identity_field(&self) -> &str {
        &self.identity_field
    }

    /// Recognisable fields sorted by `order_id`. Informational only: matching does not use it.
    pub fn ordered(&self) -> Vec<&Rule> {
        let mut out: Vec<&Rule> = self.rules.iter().filter(|r| r.has_start_pattern()).collect();
        out.sort_by_key(|r| r.order_id);
        out
    }

    /// First rule, in declaration order, that recognises `text`.
    pub fn recognize(&self, text: &str) -> Option<&Rule> {
        self.rules.iter().find(|r| r.recognizes(text))
    }
}
