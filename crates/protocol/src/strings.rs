//! Identifier case conversion
//!
//! Two conversions are used when event keys become column names:
//!
//! - [`to_snake_case`] inserts `_` at camelCase boundaries and replaces
//!   spaces, lower-casing ASCII capitals. Existing underscores are kept as-is,
//!   so `User_Name` becomes `user_name` rather than `user__name`.
//! - [`to_classic`] lower-cases and replaces every character outside
//!   `[a-z0-9_]` with `_`.
//!
//! Both return the input unchanged (borrowed) when nothing needs converting,
//! which is the common case for keys that already went through a pipeline.

use std::borrow::Cow;

/// Convert an identifier to snake_case.
///
/// An underscore is inserted before an ASCII capital only when the previous
/// character is an ASCII letter. Spaces become underscores. Anything else is
/// copied through.
pub fn to_snake_case(id: &str) -> Cow<'_, str> {
    if !id.bytes().any(|b| b.is_ascii_uppercase() || b == b' ') {
        return Cow::Borrowed(id);
    }

    let mut out = String::with_capacity(id.len() + 4);
    let mut after_letter = false;

    for c in id.chars() {
        if c.is_ascii_uppercase() {
            if after_letter {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        } else if c == ' ' {
            out.push('_');
        } else {
            out.push(c);
        }
        after_letter = c.is_ascii_alphabetic();
    }

    Cow::Owned(out)
}

/// Convert an identifier to the classic column form: `[a-z0-9_]` only.
pub fn to_classic(id: &str) -> Cow<'_, str> {
    let clean = id
        .bytes()
        .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_');
    if clean {
        return Cow::Borrowed(id);
    }

    let out = id
        .chars()
        .map(|c| {
            if c.is_ascii_uppercase() {
                c.to_ascii_lowercase()
            } else if c.is_ascii_lowercase() || c.is_ascii_digit() {
                c
            } else {
                '_'
            }
        })
        .collect();

    Cow::Owned(out)
}
