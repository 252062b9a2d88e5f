//! Schema Resolver
//!
//! Turns class and property names as written in a query into dictionary
//! definitions and persisted ids.
//!
//! Class resolution is strict: a name that matches nothing, or matches more
//! than one class case-insensitively, is a hard error. Property resolution is
//! lenient and returns `None`; the lowering layer decides what an unknown
//! property means.

use std::collections::{BTreeSet, HashSet, VecDeque};

use super::errors::DictionaryError;
use super::model::{ClassDefinition, ClassKind, PropertyDefinition};
use super::qname::{NameSpelling, QName};
use super::SchemaContext;

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedClass {
    pub name: QName,
    pub kind: ClassKind,
    /// Directory ids of the class and, unless resolved exactly, of every
    /// sub-class that participates in super-type queries
    pub ids: BTreeSet<i64>,
}

/// Find the single class definition a written name refers to
pub fn find_class<'a>(
    ctx: &SchemaContext<'a>,
    name: &str,
) -> Result<&'a ClassDefinition, DictionaryError> {
    let dictionary = ctx.dictionary;
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(DictionaryError::InvalidName(name.to_string()));
    }
    let spelling = NameSpelling::parse(trimmed)?;
    let namespaces = dictionary.namespaces();

    if let Ok(qname) = namespaces.resolve(trimmed) {
        if let Some(class) = dictionary.class(&qname) {
            return Ok(class);
        }
    }

    let candidates: Vec<&'a ClassDefinition> = dictionary
        .all_classes()
        .into_iter()
        .filter(|class| namespaces.matches_ignore_case(&spelling, &class.name))
        .collect();

    match candidates.as_slice() {
        [] => Err(DictionaryError::UnknownClass(trimmed.to_string())),
        [class] => {
            log::debug!("Class `{}` resolved case-insensitively to {}", trimmed, class.name);
            Ok(*class)
        }
        _ => Err(DictionaryError::AmbiguousClass {
            name: trimmed.to_string(),
            candidates: candidates.iter().map(|c| c.name.to_string()).collect(),
        }),
    }
}

/// Resolve a class name to the set of directory ids a membership test needs.
///
/// With `exact` only the class itself is considered. Otherwise the whole
/// sub-class closure is walked and every class that is either the target or
/// flagged `include_in_super_type_query` contributes. An unflagged class does
/// not hide its descendants. Classes without a directory id are skipped.
pub fn resolve_class(
    ctx: &SchemaContext<'_>,
    name: &str,
    exact: bool,
) -> Result<ResolvedClass, DictionaryError> {
    let target = find_class(ctx, name)?;

    let members: Vec<&QName> = if exact {
        vec![&target.name]
    } else {
        closure(ctx, target)
    };

    let mut ids = BTreeSet::new();
    for qname in members {
        match ctx.directory.id(qname) {
            Some(id) => {
                ids.insert(id);
            }
            None => log::debug!("Class {} has no directory id yet, skipping", qname),
        }
    }

    log::debug!(
        "🔍 Resolved {} {} (exact={}) to ids {:?}",
        if target.is_aspect() { "aspect" } else { "type" },
        target.name,
        exact,
        ids
    );

    Ok(ResolvedClass {
        name: target.name.clone(),
        kind: target.kind,
        ids,
    })
}

fn closure<'a>(ctx: &SchemaContext<'a>, target: &'a ClassDefinition) -> Vec<&'a QName> {
    let dictionary = ctx.dictionary;
    let mut members = Vec::new();
    let mut visited: HashSet<&QName> = HashSet::new();
    let mut queue: VecDeque<&'a QName> = VecDeque::from([&target.name]);

    while let Some(current) = queue.pop_front() {
        if !visited.insert(current) {
            continue;
        }
        let Some(definition) = dictionary.class(current) else {
            continue;
        };
        if definition.name == target.name || definition.include_in_super_type_query {
            members.push(&definition.name);
        }
        queue.extend(dictionary.sub_classes(current));
    }
    members
}

/// Resolve a property name. Unknown, malformed and ambiguous names all give
/// `None`.
pub fn resolve_property<'a>(ctx: &SchemaContext<'a>, name: &str) -> Option<&'a PropertyDefinition> {
    let dictionary = ctx.dictionary;
    let trimmed = name.trim();
    let spelling = NameSpelling::parse(trimmed).ok()?;
    let namespaces = dictionary.namespaces();

    if let Ok(qname) = namespaces.resolve(trimmed) {
        if let Some(property) = dictionary.property(&qname) {
            return Some(property);
        }
    }

    let candidates: Vec<&'a PropertyDefinition> = dictionary
        .all_properties()
        .into_iter()
        .filter(|property| namespaces.matches_ignore_case(&spelling, &property.name))
        .collect();

    match candidates.as_slice() {
        [property] => Some(*property),
        [] => None,
        _ => {
            log::warn!(
                "Property name `{}` is ambiguous ({} candidates), treating as unknown",
                trimmed,
                candidates.len()
            );
            None
        }
    }
}
