//! Field location heuristics.
//!
//! A [`Query`] names a control by role and label. The locator expands it into
//! XPath candidates, one [`Strategy`] at a time, and returns the first control
//! any candidate matches. Strategies run in a fixed order:
//!
//! 1. `EntryName`: the Google Forms `entry.<id>` name, when known.
//! 2. `AccessibleName`: exact `aria-label`, wrapping or preceding `<label>`,
//!    native `value` for radios and checkboxes.
//! 3. `QuestionContainer`: descendants of the `div[role=listitem]` or
//!    `fieldset` whose text equals the label.
//! 4. `DecoratedLabel`: the label with " (Required)", " *" or "*" appended.
//! 5. `Contains`: substring match on the accessible name.
//!
//! Option queries (a radio or checkbox inside a named question) search the
//! question container before the global name lookup, so that an option such
//! as "Yes" binds to the right question.

use tracing::debug;

use crate::error::Result;
use crate::surface::Surface;

const UPPER: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const LOWER: &str = "abcdefghijklmnopqrstuvwxyz";

/// Input types that take typed text.
const TEXT_INPUT: &str = "input[not(@type) or not(contains(' hidden radio checkbox file submit button image reset ', concat(' ', @type, ' ')))]";

/// What kind of control a query is after.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    TextEntry,
    Radio,
    Checkbox,
    Select,
    FileInput,
    /// Any focusable control; used to open custom widgets next to a label.
    Focusable,
}

impl Role {
    /// XPath node tests for controls playing this role.
    fn node_tests(self) -> &'static [&'static str] {
        match self {
            Role::TextEntry => &[TEXT_INPUT, "textarea"],
            Role::Radio => &["*[@role='radio']", "input[@type='radio']"],
            Role::Checkbox => &["*[@role='checkbox']", "input[@type='checkbox']"],
            Role::Select => &["select", "*[@role='listbox']", "*[@role='combobox']"],
            Role::FileInput => &["input[@type='file']"],
            Role::Focusable => &[
                "*[self::input or self::textarea or self::select or self::button or @role='button' or @role='combobox']",
            ],
        }
    }

    /// Radio and checkbox names are matched without regard to ASCII case.
    fn folds_case(self) -> bool {
        matches!(self, Role::Radio | Role::Checkbox)
    }

    /// Whether a native `value` attribute can act as the control's name.
    fn named_by_value(self) -> bool {
        matches!(self, Role::Radio | Role::Checkbox)
    }
}

/// A request to locate one control.
#[derive(Debug, Clone, Copy)]
pub struct Query<'a> {
    pub role: Role,
    /// Accessible name of the control (question label, or option label).
    pub name: &'a str,
    /// Question label enclosing the control, for option queries.
    pub scope: Option<&'a str>,
    /// Google Forms entry id.
    pub entry_id: Option<&'a str>,
}

impl<'a> Query<'a> {
    pub fn new(role: Role, name: &'a str) -> Self {
        Self {
            role,
            name: name.trim(),
            scope: None,
            entry_id: None,
        }
    }

    /// An option (radio/checkbox) named `option` inside question `question`.
    pub fn option(role: Role, question: &'a str, option: &'a str) -> Self {
        let question = question.trim();
        Self {
            role,
            name: option.trim(),
            scope: (!question.is_empty()).then_some(question),
            entry_id: None,
        }
    }

    pub fn entry_id(mut self, entry_id: Option<&'a str>) -> Self {
        self.entry_id = entry_id.map(str::trim).filter(|id| !id.is_empty());
        self
    }
}

/// The locator's fallback strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    EntryName,
    AccessibleName,
    QuestionContainer,
    DecoratedLabel,
    Contains,
}

type Expand = fn(&Query<'_>) -> Vec<String>;

const FIELD_ORDER: &[(Strategy, Expand)] = &[
    (Strategy::EntryName, entry_name),
    (Strategy::AccessibleName, accessible_name),
    (Strategy::QuestionContainer, question_container),
    (Strategy::DecoratedLabel, decorated_label),
    (Strategy::Contains, contains_name),
];

const OPTION_ORDER: &[(Strategy, Expand)] = &[
    (Strategy::EntryName, entry_name),
    (Strategy::QuestionContainer, question_container),
    (Strategy::AccessibleName, accessible_name),
    (Strategy::Contains, contains_name),
];

fn strategies(query: &Query<'_>) -> &'static [(Strategy, Expand)] {
    if query.scope.is_some() {
        OPTION_ORDER
    } else {
        FIELD_ORDER
    }
}

/// All XPath candidates for a query, in the order they are tried.
pub fn candidates(query: &Query<'_>) -> Vec<(Strategy, String)> {
    let mut out: Vec<(Strategy, String)> = Vec::new();
    for (strategy, expand) in strategies(query) {
        for xpath in expand(query) {
            if !out.iter().any(|(_, seen)| *seen == xpath) {
                out.push((*strategy, xpath));
            }
        }
    }
    out
}

/// A located control together with the strategy that found it.
pub struct Located<C> {
    pub control: C,
    pub strategy: Strategy,
    pub xpath: String,
}

/// Locate a control, trying each candidate in order. `Ok(None)` means every
/// strategy came up empty.
pub async fn locate<S: Surface>(surface: &S, query: &Query<'_>) -> Result<Option<Located<S::Control>>> {
    if query.name.is_empty() && query.entry_id.is_none() {
        return Ok(None);
    }
    for (strategy, xpath) in candidates(query) {
        if let Some(control) = surface.find(&xpath).await? {
            debug!(name = query.name, ?strategy, %xpath, "located control");
            return Ok(Some(Located {
                control,
                strategy,
                xpath,
            }));
        }
    }
    debug!(name = query.name, role = ?query.role, "no control matched");
    Ok(None)
}

/// XPaths of the composite date/time sub-controls of a Google Forms entry,
/// e.g. `entry.123_year`.
pub fn composite_xpath(entry_id: &str, suffix: &str) -> String {
    format!(
        "//*[self::input or self::select][@name={}]",
        xpath_literal(&format!("entry.{}_{}", entry_id.trim(), suffix))
    )
}

/// Label spellings form renderers decorate required questions with.
pub fn label_variants(label: &str) -> Vec<String> {
    let base = label.trim();
    vec![
        base.to_string(),
        format!("{base} (Required)"),
        format!("{base} *"),
        format!("{base}*"),
    ]
}

/// Quote a string as an XPath 1.0 literal. Strings holding both quote kinds
/// are assembled with `concat()`.
pub fn xpath_literal(s: &str) -> String {
    if !s.contains('\'') {
        return format!("'{s}'");
    }
    if !s.contains('"') {
        return format!("\"{s}\"");
    }
    let pieces: Vec<&str> = s.split('\'').collect();
    let mut tokens = Vec::new();
    for (i, piece) in pieces.iter().enumerate() {
        if !piece.is_empty() {
            tokens.push(format!("'{piece}'"));
        }
        if i + 1 != pieces.len() {
            tokens.push("\"'\"".to_string());
        }
    }
    format!("concat({})", tokens.join(", "))
}

/// `expr = value`, case-folded when the role asks for it.
fn equals(role: Role, expr: &str, value: &str) -> String {
    if role.folds_case() {
        format!(
            "translate({expr}, '{UPPER}', '{LOWER}')={}",
            xpath_literal(&value.to_ascii_lowercase())
        )
    } else {
        format!("{expr}={}", xpath_literal(value))
    }
}

fn name_predicate(role: Role, name: &str) -> String {
    let mut pred = equals(role, "@aria-label", name);
    if role.named_by_value() {
        pred = format!("{pred} or {}", equals(role, "@value", name));
    }
    pred
}

/// Lookups for one exact label spelling: aria-label plus `<label>` association.
fn named(role: Role, name: &str) -> Vec<String> {
    let pred = name_predicate(role, name);
    let label = format!("//label[{}]", equals(role, "normalize-space()", name));
    let mut out = Vec::new();
    for test in role.node_tests() {
        out.push(format!("//{test}[{pred}]"));
    }
    for test in role.node_tests() {
        out.push(format!("{label}//{test}"));
        out.push(format!("{label}/following::{test}[1]"));
    }
    out
}

fn entry_name(query: &Query<'_>) -> Vec<String> {
    let Some(id) = query.entry_id else {
        return Vec::new();
    };
    let name = xpath_literal(&format!("entry.{id}"));
    if query.scope.is_some() || query.role.named_by_value() {
        // Options share the entry name; pick the one whose value matches.
        let value = equals(query.role, "@value", query.name);
        // Google Forms keeps the submitted answer in a hidden input of the same name.
        return vec![format!("//input[@name={name}][not(@type='hidden')][{value}]")];
    }
    query
        .role
        .node_tests()
        .iter()
        .map(|test| format!("//{test}[@name={name}]"))
        .collect()
}

fn accessible_name(query: &Query<'_>) -> Vec<String> {
    if query.name.is_empty() {
        return Vec::new();
    }
    named(query.role, query.name)
}

fn question_container(query: &Query<'_>) -> Vec<String> {
    let key = query.scope.unwrap_or(query.name);
    if key.is_empty() {
        return Vec::new();
    }
    let mut out = Vec::new();
    for variant in label_variants(key) {
        let lit = xpath_literal(&variant);
        let containers = [
            format!("//div[@role='listitem' and .//*[normalize-space()={lit}]]"),
            format!("//fieldset[.//legend[normalize-space()={lit}]]"),
        ];
        for container in &containers {
            for test in query.role.node_tests() {
                match query.scope {
                    Some(_) => out.push(format!(
                        "{container}//{test}[{}]",
                        name_predicate(query.role, query.name)
                    )),
                    None => out.push(format!("{container}//{test}")),
                }
            }
        }
    }
    out
}

fn decorated_label(query: &Query<'_>) -> Vec<String> {
    if query.scope.is_some() || query.name.is_empty() {
        return Vec::new();
    }
    label_variants(query.name)
        .iter()
        .skip(1)
        .flat_map(|variant| named(query.role, variant))
        .collect()
}

fn contains_name(query: &Query<'_>) -> Vec<String> {
    if query.name.is_empty() {
        return Vec::new();
    }
    let lit = xpath_literal(query.name);
    let mut out = Vec::new();
    for test in query.role.node_tests() {
        out.push(format!("//{test}[contains(@aria-label, {lit})]"));
    }
    for test in query.role.node_tests() {
        out.push(format!(
            "//label[contains(normalize-space(), {lit})]/following::{test}[1]"
        ));
    }
    out
}
