//! Export and require rules.
//!
//! Rules are written as `;`-separated entries:
//!
//! ```text
//! exports:  com.example.api.*; !com.example.api.internal*; com.example.spi to com.example.impl
//! requires: transitive com.example.core; static org.optional.*; !org.unwanted*
//! ```
//!
//! A candidate is tested against the rules in declaration order. The first
//! include rule that matches selects it and fixes its attributes; a later rule
//! never changes those attributes. A matching exclude rule removes the
//! candidate. Candidates no rule mentions are not exported but are required.

use crate::error::{ModulizerError, Result};
use modulizer_api::{ExportDirective, RequireDirective};
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// A whole-name glob where `*` matches any run of characters.
#[derive(Debug, Clone)]
pub struct NamePattern {
    source: String,
    regex: Regex,
}

impl NamePattern {
    pub fn parse(glob: &str) -> Result<Self> {
        if glob.is_empty() {
            return Err(ModulizerError::invalid_pattern(glob, "empty pattern"));
        }
        if let Some(c) = glob
            .chars()
            .find(|c| c.is_whitespace() || matches!(c, ';' | ',' | '!'))
        {
            return Err(ModulizerError::invalid_pattern(
                glob,
                format!("unexpected character '{}'", c),
            ));
        }

        let body = glob
            .split('*')
            .map(regex::escape)
            .collect::<Vec<_>>()
            .join(".*");
        let regex = Regex::new(&format!("^{}$", body))
            .map_err(|e| ModulizerError::invalid_pattern(glob, e.to_string()))?;

        Ok(Self {
            source: glob.to_string(),
            regex,
        })
    }

    pub fn matches(&self, name: &str) -> bool {
        self.regex.is_match(name)
    }
}

impl fmt::Display for NamePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

trait Rule {
    fn pattern(&self) -> &NamePattern;
    fn is_inclusive(&self) -> bool;
}

#[derive(Debug, Clone)]
pub struct ExportRule {
    pub pattern: NamePattern,
    pub inclusive: bool,
    /// Modules the package is exported to; empty for an unqualified export
    pub targets: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct RequireRule {
    pub pattern: NamePattern,
    pub inclusive: bool,
    pub transitive: bool,
    pub is_static: bool,
}

impl Rule for ExportRule {
    fn pattern(&self) -> &NamePattern {
        &self.pattern
    }

    fn is_inclusive(&self) -> bool {
        self.inclusive
    }
}

impl Rule for RequireRule {
    fn pattern(&self) -> &NamePattern {
        &self.pattern
    }

    fn is_inclusive(&self) -> bool {
        self.inclusive
    }
}

enum Decision<'r, R> {
    Selected(&'r R),
    Excluded,
    Unmatched,
}

fn decide<'r, R: Rule>(name: &str, rules: &'r [R]) -> Decision<'r, R> {
    let mut selected = None;
    for rule in rules.iter().filter(|r| r.pattern().matches(name)) {
        if !rule.is_inclusive() {
            return Decision::Excluded;
        }
        selected.get_or_insert(rule);
    }
    match selected {
        Some(rule) => Decision::Selected(rule),
        None => Decision::Unmatched,
    }
}

fn entries(rules: Option<&str>) -> impl Iterator<Item = &str> {
    rules
        .unwrap_or_default()
        .split(';')
        .map(str::trim)
        .filter(|e| !e.is_empty())
}

/// Splits a leading `!` off an entry
fn polarity(entry: &str) -> (bool, &str) {
    match entry.strip_prefix('!') {
        Some(rest) => (false, rest.trim_start()),
        None => (true, entry),
    }
}

pub fn parse_export_rules(rules: Option<&str>) -> Result<Vec<ExportRule>> {
    entries(rules).map(parse_export_rule).collect()
}

fn parse_export_rule(entry: &str) -> Result<ExportRule> {
    let (inclusive, body) = polarity(entry);
    let mut tokens = body.split_whitespace();
    let glob = tokens.next().unwrap_or_default();
    let pattern = NamePattern::parse(glob).map_err(|_| {
        ModulizerError::invalid_pattern(entry, format!("invalid package pattern '{}'", glob))
    })?;

    let targets = match tokens.next() {
        None => Vec::new(),
        Some("to") => {
            let joined: String = tokens.collect();
            let targets: Vec<String> = joined.split(',').map(String::from).collect();
            if targets.iter().any(String::is_empty) {
                return Err(ModulizerError::invalid_pattern(
                    entry,
                    "'to' requires a comma-separated list of module names",
                ));
            }
            targets
        }
        Some(other) => {
            return Err(ModulizerError::invalid_pattern(
                entry,
                format!("expected 'to', found '{}'", other),
            ));
        }
    };

    if !inclusive && !targets.is_empty() {
        return Err(ModulizerError::invalid_pattern(
            entry,
            "an exclusion cannot be qualified",
        ));
    }

    Ok(ExportRule {
        pattern,
        inclusive,
        targets,
    })
}

pub fn parse_require_rules(rules: Option<&str>) -> Result<Vec<RequireRule>> {
    entries(rules).map(parse_require_rule).collect()
}

fn parse_require_rule(entry: &str) -> Result<RequireRule> {
    let (inclusive, body) = polarity(entry);
    let mut tokens: Vec<&str> = body.split_whitespace().collect();
    let glob = tokens.pop().unwrap_or_default();
    if matches!(glob, "transitive" | "static") {
        return Err(ModulizerError::invalid_pattern(
            entry,
            "missing module pattern after modifiers",
        ));
    }
    let pattern = NamePattern::parse(glob).map_err(|_| {
        ModulizerError::invalid_pattern(entry, format!("invalid module pattern '{}'", glob))
    })?;

    let mut rule = RequireRule {
        pattern,
        inclusive,
        transitive: false,
        is_static: false,
    };
    for modifier in tokens {
        match modifier {
            "transitive" => rule.transitive = true,
            "static" => rule.is_static = true,
            other => {
                return Err(ModulizerError::invalid_pattern(
                    entry,
                    format!("unknown modifier '{}'", other),
                ));
            }
        }
    }

    if !inclusive && (rule.transitive || rule.is_static) {
        return Err(ModulizerError::invalid_pattern(
            entry,
            "an exclusion cannot carry modifiers",
        ));
    }

    Ok(rule)
}

/// Packages to export. Nothing is exported unless a rule selects it.
pub fn match_exports(
    candidates: &BTreeSet<String>,
    rules: &[ExportRule],
) -> BTreeSet<ExportDirective> {
    candidates
        .iter()
        .filter_map(|package| match decide(package, rules) {
            Decision::Selected(rule) => Some(ExportDirective::qualified(
                package.clone(),
                rule.targets.iter().cloned(),
            )),
            Decision::Excluded | Decision::Unmatched => None,
        })
        .collect()
}

/// Modules to require, keyed by module name with the dependency's optionality.
/// Every candidate is required unless a rule excludes it; optional
/// dependencies are required `static`.
pub fn match_requires(
    candidates: &BTreeMap<String, bool>,
    rules: &[RequireRule],
) -> BTreeSet<RequireDirective> {
    candidates
        .iter()
        .filter_map(|(module, &optional)| match decide(module, rules) {
            Decision::Selected(rule) => Some(RequireDirective::new(
                module.clone(),
                rule.transitive,
                rule.is_static || optional,
            )),
            Decision::Unmatched => Some(RequireDirective::new(module.clone(), false, optional)),
            Decision::Excluded => None,
        })
        .collect()
}
