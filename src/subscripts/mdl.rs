//! Subscript range definitions read from a Vensim `.mdl` model file.
//!
//! Only the subscript ranges are extracted; every other equation is skipped.
//! Supported forms:
//!
//! ```text
//! region: north, south, east ~~|
//! coast: north, south -> region ~~|
//! all: coast, east ~~|
//! age: (a1-a5) ~~|
//! zone <-> region ~~|
//! ```

use super::SubscriptRegistry;
use crate::error::{E2vError, E2vResult};
use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Marker opening the sketch section, after which there are no equations.
const SKETCH_MARKER: &str = "\\\\\\---///";

fn numeric_range() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\(\s*(?P<p1>[^\d\s]*)(?P<n1>\d+)\s*-\s*(?P<p2>[^\d\s]*)(?P<n2>\d+)\s*\)$")
            .expect("static regex")
    })
}

fn continuation() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\\[ \t]*\r?\n").expect("static regex"))
}

fn whitespace() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("static regex"))
}

fn normalize(name: &str) -> String {
    whitespace().replace_all(name.trim(), " ").into_owned()
}

#[derive(Debug)]
enum Definition {
    Members(Vec<String>),
    CopyOf(String),
}

/// Extract the subscript ranges defined in the text of a `.mdl` file.
///
/// # Errors
/// Fails on subscripts defined with GET ... SUBSCRIPT, on references to
/// unknown ranges in equivalences, and on circular definitions.
pub fn parse_mdl_subscripts(text: &str) -> E2vResult<SubscriptRegistry> {
    let model = text.split(SKETCH_MARKER).next().unwrap_or_default();
    let model = model.trim_start().trim_start_matches("{UTF-8}");
    let model = continuation().replace_all(model, " ");

    let mut order = Vec::new();
    let mut definitions = HashMap::new();

    for element in model.split('|') {
        let equation = element.split('~').next().unwrap_or_default().trim();
        if equation.is_empty() {
            continue;
        }

        let definition = if let Some((name, other)) = equation.split_once("<->") {
            (normalize(name), Definition::CopyOf(normalize(other)))
        } else if let Some((name, members)) = split_subscript_definition(equation) {
            if members.to_uppercase().contains("SUBSCRIPT(") {
                return Err(E2vError::config(format!(
                    "subscript range '{}' is defined with a GET SUBSCRIPT function, which is not supported",
                    name
                )));
            }
            let members = members
                .split(',')
                .map(normalize)
                .filter(|m| !m.is_empty())
                .collect();
            (name, Definition::Members(members))
        } else {
            continue;
        };

        if !definitions.contains_key(&definition.0) {
            order.push(definition.0.clone());
        }
        definitions.insert(definition.0, definition.1);
    }

    let mut resolved: HashMap<String, Vec<String>> = HashMap::new();
    for name in &order {
        resolve(name, &definitions, &mut resolved, &mut Vec::new())?;
    }

    Ok(SubscriptRegistry::from_ranges(
        order.iter().map(|name| (name.clone(), resolved[name].clone())),
    ))
}

/// `name: a, b, c -> mapping` ⇒ `(name, "a, b, c")`. Anything else ⇒ `None`.
fn split_subscript_definition(equation: &str) -> Option<(String, &str)> {
    if equation.contains('=') {
        return None;
    }
    let (name, rest) = equation.split_once(':')?;
    let name = normalize(name);
    if name.is_empty() || name.contains(['[', '(', '"']) {
        return None;
    }
    let members = rest.split("->").next().unwrap_or_default();
    Some((name, members))
}

fn resolve(
    name: &str,
    definitions: &HashMap<String, Definition>,
    resolved: &mut HashMap<String, Vec<String>>,
    stack: &mut Vec<String>,
) -> E2vResult<Vec<String>> {
    if let Some(members) = resolved.get(name) {
        return Ok(members.clone());
    }
    if stack.iter().any(|s| s == name) {
        return Err(E2vError::config(format!(
            "circular subscript range definition: {} -> {}",
            stack.join(" -> "),
            name
        )));
    }

    let definition = definitions.get(name).ok_or_else(|| {
        E2vError::config(format!("subscript range '{}' is not defined in the model", name))
    })?;

    stack.push(name.to_string());
    let members = match definition {
        Definition::CopyOf(other) => resolve(other, definitions, resolved, stack)?,
        Definition::Members(raw) => {
            let mut members = Vec::new();
            for member in raw {
                if let Some(expanded) = expand_numeric_range(member) {
                    members.extend(expanded);
                } else if definitions.contains_key(member) && member != name {
                    members.extend(resolve(member, definitions, resolved, stack)?);
                } else {
                    members.push(member.clone());
                }
            }
            members
        }
    };
    stack.pop();

    resolved.insert(name.to_string(), members.clone());
    Ok(members)
}

/// `(a1-a3)` ⇒ `[a1, a2, a3]`.
fn expand_numeric_range(member: &str) -> Option<Vec<String>> {
    let caps = numeric_range().captures(member)?;
    if caps["p1"] != caps["p2"] {
        return None;
    }
    let start: u64 = caps["n1"].parse().ok()?;
    let end: u64 = caps["n2"].parse().ok()?;
    let prefix = &caps["p1"];
    Some((start..=end).map(|n| format!("{}{}", prefix, n)).collect())
}
