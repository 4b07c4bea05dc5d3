use opentelemetry::StringValue;
use thiserror::Error;

/// Errors from substituting arguments into a positional format template.
///
/// A template that cannot be rendered is a bug at the call site, so these
/// errors are returned to the caller instead of being swallowed like
/// telemetry-side failures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormatError {
    /// A placeholder referenced an argument index that was not supplied.
    #[error("format placeholder {{{index}}} has no matching argument ({supplied} supplied)")]
    MissingArgument {
        /// Index requested by the placeholder.
        index: usize,
        /// Number of arguments supplied by the caller.
        supplied: usize,
    },
    /// A brace sequence that is neither an escape (`{{` / `}}`) nor a
    /// `{N}` placeholder with a decimal index.
    #[error("malformed format placeholder at byte {position}")]
    Malformed {
        /// Byte offset of the offending brace in the template.
        position: usize,
    },
}

/// Substitutes `args` into `template` positionally.
///
/// Placeholders are `{0}`, `{1}`, … and may repeat; `{{` and `}}` escape
/// literal braces. Alignment and format specifiers are not supported and
/// are rejected as malformed.
pub(crate) fn format_positional(
    template: &str,
    args: &[StringValue],
) -> Result<String, FormatError> {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.char_indices().peekable();

    while let Some((position, ch)) = chars.next() {
        match ch {
            '{' => {
                if matches!(chars.peek(), Some((_, '{'))) {
                    chars.next();
                    out.push('{');
                    continue;
                }
                let mut index = 0usize;
                let mut digits = 0u32;
                loop {
                    match chars.next() {
                        Some((_, c)) if c.is_ascii_digit() => {
                            index = index
                                .saturating_mul(10)
                                .saturating_add((c as u8 - b'0') as usize);
                            digits += 1;
                        }
                        Some((_, '}')) if digits > 0 => break,
                        _ => return Err(FormatError::Malformed { position }),
                    }
                }
                let value = args.get(index).ok_or(FormatError::MissingArgument {
                    index,
                    supplied: args.len(),
                })?;
                out.push_str(value.as_str());
            }
            '}' => {
                if matches!(chars.peek(), Some((_, '}'))) {
                    chars.next();
                    out.push('}');
                } else {
                    return Err(FormatError::Malformed { position });
                }
            }
            _ => out.push(ch),
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&'static str]) -> Vec<StringValue> {
        values.iter().map(|v| StringValue::from(*v)).collect()
    }

    #[test]
    fn substitutes_positionally() {
        let rendered = format_positional("user {0} failed {1} times", &args(&["bob", "3"]));
        assert_eq!(rendered, Ok("user bob failed 3 times".to_string()));
    }

    #[test]
    fn placeholders_may_repeat_and_reorder() {
        let rendered = format_positional("{1}-{0}-{1}", &args(&["a", "b"]));
        assert_eq!(rendered, Ok("b-a-b".to_string()));
    }

    #[test]
    fn escaped_braces_are_literal() {
        let rendered = format_positional("{{{0}}}", &args(&["x"]));
        assert_eq!(rendered, Ok("{x}".to_string()));
    }

    #[test]
    fn missing_argument_is_an_error() {
        let rendered = format_positional("{0} and {2}", &args(&["only"]));
        assert_eq!(
            rendered,
            Err(FormatError::MissingArgument {
                index: 2,
                supplied: 1
            })
        );
    }

    #[test]
    fn unterminated_placeholder_is_malformed() {
        assert_eq!(
            format_positional("oops {0", &args(&["x"])),
            Err(FormatError::Malformed { position: 5 })
        );
    }

    #[test]
    fn non_numeric_placeholder_is_malformed() {
        assert_eq!(
            format_positional("{name}", &args(&["x"])),
            Err(FormatError::Malformed { position: 0 })
        );
        assert_eq!(
            format_positional("{0,8}", &args(&["x"])),
            Err(FormatError::Malformed { position: 0 })
        );
    }

    #[test]
    fn stray_closing_brace_is_malformed() {
        assert_eq!(
            format_positional("oops }", &[]),
            Err(FormatError::Malformed { position: 5 })
        );
    }

    #[test]
    fn plain_text_passes_through() {
        assert_eq!(
            format_positional("no placeholders here", &[]),
            Ok("no placeholders here".to_string())
        );
    }
}
