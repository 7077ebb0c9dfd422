//! Regular expression cells.
//!
//! The engine treats the matcher as an opaque collaborator; here that
//! collaborator is the `regex` crate. JavaScript pattern features it does
//! not share are rejected when the cell is created, with named capture
//! groups called out explicitly since the language subset excludes them.

use core_types::{ErrorKind, JsError};
use regex::Regex;

/// Flags of a JavaScript regular expression literal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegexpFlags {
    pub global: bool,
    pub ignore_case: bool,
    pub multiline: bool,
}

impl RegexpFlags {
    /// Parses a flag string such as `"gi"`.
    pub fn parse(flags: &str) -> Result<RegexpFlags, JsError> {
        let mut out = RegexpFlags::default();
        for c in flags.chars() {
            match c {
                'g' => out.global = true,
                'i' => out.ignore_case = true,
                'm' => out.multiline = true,
                other => {
                    return Err(JsError::new(
                        ErrorKind::SyntaxError,
                        format!("invalid regexp flag '{}'", other),
                    ))
                }
            }
        }
        Ok(out)
    }
}

impl std::fmt::Display for RegexpFlags {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.global {
            write!(f, "g")?;
        }
        if self.ignore_case {
            write!(f, "i")?;
        }
        if self.multiline {
            write!(f, "m")?;
        }
        Ok(())
    }
}

/// One compiled regular expression.
#[derive(Debug)]
pub struct RegexpData {
    /// Pattern text as written, without delimiters.
    pub source: String,
    pub flags: RegexpFlags,
    /// The compiled matcher.
    pub prog: Regex,
    /// Resume position for global matching.
    pub last_index: usize,
}

impl RegexpData {
    /// Compiles a pattern with JavaScript flag semantics.
    pub fn compile(source: &str, flags: &str) -> Result<RegexpData, JsError> {
        if source.contains("(?<") && !source.contains("(?<=") && !source.contains("(?<!") {
            return Err(JsError::new(
                ErrorKind::SyntaxError,
                "named capture groups are not supported",
            ));
        }
        let flags = RegexpFlags::parse(flags)?;
        let mut builder = regex::RegexBuilder::new(source);
        builder.case_insensitive(flags.ignore_case);
        builder.multi_line(flags.multiline);
        let prog = builder.build().map_err(|e| {
            JsError::new(ErrorKind::SyntaxError, format!("invalid regexp: {}", e))
        })?;
        Ok(RegexpData {
            source: source.to_string(),
            flags,
            prog,
            last_index: 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_and_flags() {
        let re = RegexpData::compile("a+b", "gi").unwrap();
        assert!(re.flags.global);
        assert!(re.flags.ignore_case);
        assert!(!re.flags.multiline);
        assert!(re.prog.is_match("xAAB"));
        assert_eq!(re.flags.to_string(), "gi");
    }

    #[test]
    fn test_named_groups_rejected() {
        let err = RegexpData::compile("(?<year>\\d+)", "").unwrap_err();
        assert_eq!(err.kind, ErrorKind::SyntaxError);
    }

    #[test]
    fn test_bad_flag_rejected() {
        assert!(RegexpFlags::parse("gx").is_err());
    }
}
