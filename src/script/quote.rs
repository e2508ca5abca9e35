//! Unconditional single quoting for test identifiers
//!
//! Options and program names go through `shell_words`, which leaves plain
//! words bare. Identifiers are always wrapped so every script line has the
//! same shape.

/// Wrap `s` in single quotes; each embedded `'` becomes `'\''`
pub fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        if c == '\'' {
            out.push_str("'\\''");
        } else {
            out.push(c);
        }
    }
    out.push('\'');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_plain() {
        assert_eq!(quote("tests/test_a.py::test_one"), "'tests/test_a.py::test_one'");
    }

    #[test]
    fn test_quote_embedded_single_quote() {
        assert_eq!(
            quote(r#"tests/test_a.py::test["it's"]"#),
            r#"'tests/test_a.py::test["it'\''s"]'"#
        );
    }

    #[test]
    fn test_quote_empty() {
        assert_eq!(quote(""), "''");
    }

    #[cfg(unix)]
    #[test]
    fn test_shell_round_trip() {
        use std::process::Command;

        let samples = [
            r#"tests/test_a.py::test["it's"]"#,
            "tests/test_a.py::test_p[a b-(c)]",
            "tests/test_a.py::test_$HOME`id`",
            "tests/test_a.py::test_\\n\"quoted\"",
            "'''",
        ];

        for sample in samples {
            let output = Command::new("sh")
                .arg("-c")
                .arg(format!("printf '%s' {}", quote(sample)))
                .output()
                .unwrap();
            assert!(output.status.success());
            assert_eq!(String::from_utf8(output.stdout).unwrap(), sample);
        }
    }
}
