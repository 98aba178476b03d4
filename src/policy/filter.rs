//! Rule filters: predicates over a packet's signed name.

use crate::conf::{ConfigSection, SectionError};
use crate::name::Name;
use regex::Regex;
use std::fmt;

/// Relation between a configured name and the name under test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameRelation {
    Equal,
    IsPrefixOf,
    IsStrictPrefixOf,
}

impl NameRelation {
    pub fn from_config(value: &str) -> Option<Self> {
        if value.eq_ignore_ascii_case("equal") {
            Some(NameRelation::Equal)
        } else if value.eq_ignore_ascii_case("is-prefix-of") {
            Some(NameRelation::IsPrefixOf)
        } else if value.eq_ignore_ascii_case("is-strict-prefix-of") {
            Some(NameRelation::IsStrictPrefixOf)
        } else {
            None
        }
    }

    /// Whether `reference` stands in this relation to `target`.
    pub fn check(&self, reference: &Name, target: &Name) -> bool {
        match self {
            NameRelation::Equal => reference == target,
            NameRelation::IsPrefixOf => reference.is_prefix_of(target),
            NameRelation::IsStrictPrefixOf => {
                reference.len() < target.len() && reference.is_prefix_of(target)
            }
        }
    }
}

impl fmt::Display for NameRelation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            NameRelation::Equal => "equal",
            NameRelation::IsPrefixOf => "is-prefix-of",
            NameRelation::IsStrictPrefixOf => "is-strict-prefix-of",
        })
    }
}

/// A rule filter. Filters of one rule are OR-combined.
#[derive(Debug, Clone)]
pub enum Filter {
    /// `name` stands in `relation` to the packet name.
    Relation { name: Name, relation: NameRelation },
    /// Pattern matched against the packet name in URI form.
    Regex(Regex),
}

impl Filter {
    /// Build a filter from a `filter` section. Only `type name` is known.
    pub fn from_config(section: &ConfigSection) -> Result<Self, SectionError> {
        let mut cursor = section.cursor();
        let filter_type = cursor.expect_value("type", "filter.type")?;
        if !filter_type.eq_ignore_ascii_case("name") {
            return Err(SectionError::unsupported("filter.type", filter_type));
        }

        let filter = if cursor.peek_is("name") {
            let name = Name::from_uri(cursor.expect_value("name", "filter.name")?)?;
            let relation_value = cursor.expect_value("relation", "filter.relation")?;
            let relation = NameRelation::from_config(relation_value)
                .ok_or_else(|| SectionError::unsupported("filter.relation", relation_value))?;
            Filter::Relation { name, relation }
        } else if cursor.peek_is("regex") {
            Filter::Regex(compile_regex(cursor.expect_value("regex", "filter.regex")?)?)
        } else {
            return Err(match cursor.peek_key() {
                Some(found) => SectionError::UnexpectedKey {
                    expected: "filter.name or filter.regex".to_string(),
                    found: found.to_string(),
                },
                None => SectionError::MissingKey {
                    key: "filter.name or filter.regex".to_string(),
                },
            });
        };

        cursor.finish("filter")?;
        Ok(filter)
    }

    pub fn matches(&self, name: &Name) -> bool {
        match self {
            Filter::Relation {
                name: reference,
                relation,
            } => relation.check(reference, name),
            Filter::Regex(regex) => regex.is_match(&name.to_uri()),
        }
    }
}

pub(crate) fn compile_regex(pattern: &str) -> Result<Regex, SectionError> {
    Regex::new(pattern).map_err(|source| SectionError::Regex {
        pattern: pattern.to_string(),
        source,
    })
}
