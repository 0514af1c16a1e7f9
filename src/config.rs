//! Rule files: a script plus the resources it applies to.
//!
//! ```text
//! [__kubeconfig__]
//! ${HOME}/.kube/config
//! [deployment]
//! */redis
//! [__scripts__]
//! DELETE(status)
//! ```

use indexmap::IndexMap;
use regex::Regex;

use crate::action::Action;
use crate::error::ConfigError;
use crate::matcher::Matcher;
use crate::parser;
use crate::tree::Document;

const KUBECONFIG_SECTION: &str = "__kubeconfig__";
const SCRIPTS_SECTION: &str = "__scripts__";

/// A parsed rule file.
#[derive(Debug, Clone)]
pub struct RuleConfig {
    pub kubeconfig: Option<String>,
    /// Script lines as written
    pub script: String,
    pub actions: Vec<Action>,
    /// Resource type (section name) to selector
    pub resources: IndexMap<String, Matcher>,
}

/// Line validators for one parse.
struct Validators {
    resource_type: Regex,
    path: Regex,
    selector: Regex,
}

impl Validators {
    fn new() -> Result<Self, regex::Error> {
        Ok(Validators {
            resource_type: Regex::new(r"^[a-zA-Z0-9.\-]+$")?,
            path: Regex::new(r"^[a-zA-Z0-9_\-/.${}]+$")?,
            selector: Regex::new(r"^(\*|[a-zA-Z0-9\-]+)/(\*|[a-zA-Z0-9\-]+)$")?,
        })
    }
}

impl RuleConfig {
    pub fn parse(input: &str) -> Result<RuleConfig, ConfigError> {
        let validators = Validators::new()?;
        let mut section: Option<String> = None;
        let mut kubeconfig = None;
        let mut script_lines: Vec<&str> = Vec::new();
        let mut selectors: IndexMap<String, Vec<Matcher>> = IndexMap::new();

        for (i, raw) in input.split('\n').enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if line.starts_with('[') && line.ends_with(']') {
                let name = line[1..line.len() - 1].trim();
                if name != KUBECONFIG_SECTION
                    && name != SCRIPTS_SECTION
                    && !validators.resource_type.is_match(name)
                {
                    return Err(ConfigError::ResourceType(name.to_string()));
                }
                section = Some(name.to_string());
                continue;
            }

            match section.as_deref() {
                None => {
                    return Err(ConfigError::Syntax {
                        line: i + 1,
                        message: format!("`{}` is outside of any section", line),
                    })
                }
                Some(KUBECONFIG_SECTION) => {
                    if !validators.path.is_match(line) {
                        return Err(ConfigError::KubeconfigPath(line.to_string()));
                    }
                    kubeconfig = Some(line.to_string());
                }
                Some(SCRIPTS_SECTION) => script_lines.push(line),
                Some(resource) => {
                    let selector = validators.selector.captures(line).ok_or_else(|| {
                        ConfigError::Selector {
                            section: resource.to_string(),
                            selector: line.to_string(),
                        }
                    })?;
                    selectors
                        .entry(resource.to_string())
                        .or_default()
                        .push(Matcher::All(vec![
                            Matcher::field("metadata.namespace", &selector[1]),
                            Matcher::field("metadata.name", &selector[2]),
                        ]));
                }
            }
        }

        let script = script_lines.join("\n");
        let actions = parser::parse(&script)?;
        let resources = selectors
            .into_iter()
            .map(|(resource, matchers)| (resource, Matcher::Any(matchers)))
            .collect();

        Ok(RuleConfig {
            kubeconfig,
            script,
            actions,
            resources,
        })
    }

    /// A document is selected when a section names its kind
    /// (case-insensitive) and that section's selectors match. Without
    /// resource sections everything is selected.
    pub fn selects(&self, document: &Document) -> bool {
        if self.resources.is_empty() {
            return true;
        }
        let Ok(kind) = document.get_string("kind") else {
            return false;
        };
        self.resources
            .iter()
            .any(|(resource, matcher)| resource.eq_ignore_ascii_case(&kind) && matcher.matches(document))
    }

    pub fn select(&self, documents: Vec<Document>) -> Vec<Document> {
        documents.into_iter().filter(|d| self.selects(d)).collect()
    }
}
