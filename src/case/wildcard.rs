//! Filename wildcard expansion.
//!
//! A consecutive run of `*` characters in a filename pattern is replaced by
//! a zero-padded decimal number. A number shorter than the run is
//! zero-padded; one that doesn't fit is a fatal error.

use crate::error::{EResult, EncasError};

/// Locate the first (and only recognised) run of consecutive `*` characters.
/// Returns `None` if the pattern has no asterisk.
fn find_asterisk_run(pattern: &str) -> Option<(usize, usize)> {
    let start = pattern.find('*')?;
    let bytes = pattern.as_bytes();
    let mut end = start;
    while end < bytes.len() && bytes[end] == b'*' {
        end += 1;
    }
    Some((start, end))
}

/// Substitute the asterisk run in `pattern` with `number`, zero-padded to
/// the run's width. If `pattern` has no asterisk run, it is returned as-is
/// (a literal filename with a `ts` reference is valid, per the spec).
pub fn expand(pattern: &str, number: i32) -> EResult<String> {
    let Some((start, end)) = find_asterisk_run(pattern) else {
        return Ok(pattern.to_string());
    };
    let width = end - start;
    let digits = format!("{number}");
    if digits.len() > width {
        return Err(rootcause::Report::new(EncasError::format(format!(
            "number {number} does not fit in {width}-character wildcard of pattern '{pattern}'"
        ))));
    }
    let padded = format!("{number:0width$}", width = width);
    Ok(format!("{}{}{}", &pattern[..start], padded, &pattern[end..]))
}
