//! Applying dynamic delegation rules.
//!
//! A NAPTR record carries a substitution expression as defined in
//! [RFC 3402]. For BDXL, only terminal records, i.e., those with the `U`
//! flag, for the `Meta:SMP` service are of interest. Their expression is
//! applied to the queried host name and produces the URI of the metadata
//! service.
//!
//! Records are considered in the order they were received in. The first
//! eligible record whose expression matches wins. Records are not sorted
//! by order and preference.
//!
//! [RFC 3402]: https://tools.ietf.org/html/rfc3402

use core::fmt;
use regex::{Captures, Regex};
use tracing::{debug, warn};

/// The service field of records pointing to a metadata publisher.
pub const SMP_SERVICE: &str = "Meta:SMP";

/// The flag marking a record as terminal with a URI result.
pub const URI_FLAG: &str = "U";

/// The delimiter between the fields of a rule.
const DELIMITER: char = '!';

/// A regex matching anything, for which no regex is compiled.
const MATCH_ALL: &str = ".*";

//------------ DelegationRecord ----------------------------------------------

/// The content of a single NAPTR record.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct DelegationRecord {
    order: u16,
    preference: u16,
    flags: String,
    service: String,
    regexp: String,
}

impl DelegationRecord {
    pub fn new(
        order: u16,
        preference: u16,
        flags: impl Into<String>,
        service: impl Into<String>,
        regexp: impl Into<String>,
    ) -> Self {
        DelegationRecord {
            order,
            preference,
            flags: flags.into(),
            service: service.into(),
            regexp: regexp.into(),
        }
    }

    pub fn order(&self) -> u16 {
        self.order
    }

    pub fn preference(&self) -> u16 {
        self.preference
    }

    pub fn flags(&self) -> &str {
        &self.flags
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn regexp(&self) -> &str {
        &self.regexp
    }

    /// Returns whether the record points to a metadata publisher.
    pub fn is_eligible(&self) -> bool {
        self.flags.eq_ignore_ascii_case(URI_FLAG)
            && self.service == SMP_SERVICE
    }
}

//------------ evaluate ------------------------------------------------------

/// Returns the URI produced by the first matching eligible record.
///
/// Records with a broken rule are skipped.
pub fn evaluate(
    records: &[DelegationRecord],
    hostname: &str,
) -> Option<String> {
    for record in records {
        if !record.is_eligible() {
            continue;
        }
        match apply_rule(record.regexp(), hostname) {
            Ok(Some(uri)) => {
                debug!(
                    %hostname, rule = record.regexp(), %uri, "rule matched"
                );
                return Some(uri);
            }
            Ok(None) => {
                debug!(
                    %hostname, rule = record.regexp(), "rule did not match"
                );
            }
            Err(err) => {
                warn!(
                    %hostname, rule = record.regexp(),
                    "skipping record with broken rule: {err}"
                );
            }
        }
    }
    None
}

/// Applies a complete `!regex!replacement!` rule to `subject`.
pub fn apply_rule(
    rule: &str,
    subject: &str,
) -> Result<Option<String>, RuleError> {
    let mut fields: Vec<&str> = rule.split(DELIMITER).collect();
    while fields.last().map_or(false, |field| field.is_empty()) {
        fields.pop();
    }
    if !(3..=4).contains(&fields.len()) {
        return Err(RuleError::FieldCount(fields.len()));
    }
    substitute(fields[1], fields[2], subject)
}

/// Applies a substitution expression to `subject`.
///
/// Returns `Ok(None)` if `pattern` doesn't match all of `subject`.
pub fn substitute(
    pattern: &str,
    replacement: &str,
    subject: &str,
) -> Result<Option<String>, RuleError> {
    if pattern == MATCH_ALL {
        return Ok(Some(replacement.into()));
    }
    let regex = Regex::new(&format!("^(?:{pattern})$"))
        .map_err(|err| RuleError::InvalidRegex(err.to_string()))?;
    let captures = match regex.captures(subject) {
        Some(captures) => captures,
        None => return Ok(None),
    };
    expand(replacement, &captures).map(Some)
}

/// Expands the backreferences in `replacement`.
///
/// A backreference is a marker followed by a group number. Markers are a
/// doubled backslash, a single backslash, or a dollar sign. Any other
/// character following a single backslash is taken literally.
fn expand(
    replacement: &str,
    captures: &Captures,
) -> Result<String, RuleError> {
    let mut res = String::with_capacity(replacement.len());
    let mut chars = replacement.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' => {
                if chars.peek() == Some(&'\\') {
                    chars.next();
                    push_group(&mut res, &mut chars, captures)?;
                } else if chars.peek().map_or(false, char::is_ascii_digit) {
                    push_group(&mut res, &mut chars, captures)?;
                } else {
                    match chars.next() {
                        Some(ch) => res.push(ch),
                        None => return Err(RuleError::InvalidReplacement),
                    }
                }
            }
            '$' => push_group(&mut res, &mut chars, captures)?,
            ch => res.push(ch),
        }
    }
    Ok(res)
}

/// Reads a group number and appends the group's text.
///
/// As many digits are consumed as still form an existing group number, but
/// at least one.
fn push_group(
    res: &mut String,
    chars: &mut core::iter::Peekable<core::str::Chars>,
    captures: &Captures,
) -> Result<(), RuleError> {
    let groups = captures.len() - 1;
    let mut number = match chars.next().and_then(|ch| ch.to_digit(10)) {
        Some(digit) => digit as usize,
        None => return Err(RuleError::InvalidReplacement),
    };
    if number > groups {
        return Err(RuleError::NoGroup(number));
    }
    while let Some(digit) = chars.peek().and_then(|ch| ch.to_digit(10)) {
        let longer = number * 10 + digit as usize;
        if longer > groups {
            break;
        }
        number = longer;
        chars.next();
    }
    if let Some(group) = captures.get(number) {
        res.push_str(group.as_str());
    }
    Ok(())
}

//------------ RuleError -----------------------------------------------------

/// A delegation rule could not be applied.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum RuleError {
    /// The rule does not have the right number of fields.
    FieldCount(usize),

    /// The regex does not compile.
    InvalidRegex(String),

    /// A backreference marker is not followed by a group number.
    InvalidReplacement,

    /// A backreference refers to a group the regex doesn't have.
    NoGroup(usize),
}

impl fmt::Display for RuleError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RuleError::FieldCount(count) => {
                write!(f, "rule has {count} fields instead of 3")
            }
            RuleError::InvalidRegex(err) => write!(f, "invalid regex: {err}"),
            RuleError::InvalidReplacement => {
                f.write_str("backreference without group number")
            }
            RuleError::NoGroup(number) => write!(f, "no group {number}"),
        }
    }
}

impl std::error::Error for RuleError {}

//============ Test ==========================================================
