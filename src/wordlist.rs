//! Line-oriented wordlist loader.

use std::path::Path;

use crate::InputError;

/// Read a wordlist into ordered candidates.
///
/// One candidate per line; a trailing `\r` is stripped and blank lines are
/// skipped. Other whitespace is kept since it can be part of a password.
pub async fn load_wordlist(path: impl AsRef<Path>) -> Result<Vec<String>, InputError> {
    let path = path.as_ref();
    let raw = tokio::fs::read(path).await.map_err(|source| InputError::Wordlist {
        path: path.to_path_buf(),
        source,
    })?;
    let text = String::from_utf8_lossy(&raw);

    let words = parse_lines(&text);
    if words.is_empty() {
        return Err(InputError::EmptyWordlist(path.to_path_buf()));
    }
    tracing::debug!(path = %path.display(), entries = words.len(), "wordlist loaded");
    Ok(words)
}

fn parse_lines(text: &str) -> Vec<String> {
    text.split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_lines_strips_cr_and_blanks() {
        let words = parse_lines("admin\r\n\nbackup\n  spaced \n");
        assert_eq!(words, vec!["admin", "backup", "  spaced "]);
    }

    #[tokio::test]
    async fn test_load_wordlist_preserves_order() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "wrong1\nwrong2\r\ncorrect").unwrap();
        let words = load_wordlist(file.path()).await.unwrap();
        assert_eq!(words, vec!["wrong1", "wrong2", "correct"]);
    }

    #[tokio::test]
    async fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_wordlist(dir.path().join("nope.txt")).await.unwrap_err();
        assert!(matches!(err, InputError::Wordlist { .. }));
    }

    #[tokio::test]
    async fn test_empty_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "\n\r\n").unwrap();
        let err = load_wordlist(file.path()).await.unwrap_err();
        assert!(matches!(err, InputError::EmptyWordlist(_)));
    }
}
