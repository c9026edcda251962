//! Redaction of patient identifiers from formatted log output.
//!
//! The scoring path never logs raw feature values; this is the backstop for
//! identifiers that reach a log line through error messages or file paths.

use std::io::Write;
use std::sync::OnceLock;

use regex::Regex;
use tracing_subscriber::fmt::MakeWriter;

/// Lines longer than this are cut before pattern matching.
const MAX_LINE_BYTES: usize = 16 * 1024;

struct Redaction {
    regex: Regex,
    replacement: &'static str,
}

static REDACTIONS: OnceLock<Vec<Redaction>> = OnceLock::new();

fn redactions() -> &'static [Redaction] {
    REDACTIONS.get_or_init(|| {
        [
            (
                r"[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}",
                "[REDACTED-UUID]",
            ),
            (
                r"(?i)\b(?:patient|subject|record)[_\s-]?(?:id|code|no)\b\s*[:=#]?\s*[A-Za-z0-9-]{3,}",
                "[REDACTED-PATIENT]",
            ),
            (
                r"(?i)\b[a-z0-9](?:[a-z0-9._%+-]{0,62}[a-z0-9])?@(?:[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?\.)+[a-z]{2,}\b",
                "[REDACTED-EMAIL]",
            ),
            (
                r"\+?\b(?:880|1)?[-.\s]?\(?\d{3,4}\)?[-.\s]?\d{3}[-.\s]?\d{4}\b",
                "[REDACTED-PHONE]",
            ),
            (
                r"(?i)\b(?:seed|secret|private[_-]?key|signing[_-]?key)\b\s*[:=]\s*[A-Za-z0-9+/]{32,}={0,2}",
                "[REDACTED-SECRET]",
            ),
        ]
        .into_iter()
        .filter_map(|(pattern, replacement)| {
            Regex::new(pattern)
                .ok()
                .map(|regex| Redaction { regex, replacement })
        })
        .collect()
    })
}

fn truncate_to_char_boundary(input: &str, max_bytes: usize) -> (&str, bool) {
    if input.len() <= max_bytes {
        return (input, false);
    }
    let mut end = max_bytes;
    while end > 0 && !input.is_char_boundary(end) {
        end -= 1;
    }
    (&input[..end], true)
}

/// Replace identifying patterns in `input`.
#[must_use]
pub fn sanitize(input: &str) -> String {
    sanitize_with_limit(input, MAX_LINE_BYTES)
}

fn sanitize_with_limit(input: &str, max_bytes: usize) -> String {
    let (prefix, truncated) = truncate_to_char_boundary(input, max_bytes);
    let mut out = prefix.to_string();
    for r in redactions() {
        if r.regex.is_match(&out) {
            out = r.regex.replace_all(&out, r.replacement).into_owned();
        }
    }
    if truncated {
        out.push_str(" [TRUNCATED]");
        if input.ends_with('\n') {
            out.push('\n');
        }
    }
    out
}

/// Whether `input` contains anything [`sanitize`] would redact.
#[must_use]
pub fn contains_identifier(input: &str) -> bool {
    let (prefix, _) = truncate_to_char_boundary(input, MAX_LINE_BYTES);
    redactions().iter().any(|r| r.regex.is_match(prefix))
}

/// `MakeWriter` wrapper that sanitizes each formatted log line.
#[derive(Debug, Clone)]
pub struct SanitizingMakeWriter<M> {
    inner: M,
}

impl<M> SanitizingMakeWriter<M> {
    #[must_use]
    pub fn new(inner: M) -> Self {
        Self { inner }
    }
}

/// Line-buffering writer produced by [`SanitizingMakeWriter`].
pub struct SanitizingWriter<W: Write> {
    inner: W,
    pending: Vec<u8>,
}

impl<W: Write> SanitizingWriter<W> {
    fn new(inner: W) -> Self {
        Self {
            inner,
            pending: Vec::new(),
        }
    }

    fn emit(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        let text = String::from_utf8_lossy(bytes);
        self.inner.write_all(sanitize(&text).as_bytes())
    }

    fn drain_lines(&mut self) -> std::io::Result<()> {
        while let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            self.emit(&line)?;
        }
        Ok(())
    }
}

impl<W: Write> Write for SanitizingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.pending.extend_from_slice(buf);
        if self.pending.len() > 2 * MAX_LINE_BYTES && !self.pending.contains(&b'\n') {
            let line = std::mem::take(&mut self.pending);
            self.emit(&line)?;
            self.inner.write_all(b"\n")?;
            return Ok(buf.len());
        }
        self.drain_lines()?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.drain_lines()?;
        if !self.pending.is_empty() {
            let rest = std::mem::take(&mut self.pending);
            self.emit(&rest)?;
        }
        self.inner.flush()
    }
}

impl<W: Write> Drop for SanitizingWriter<W> {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}

impl<'a, M> MakeWriter<'a> for SanitizingMakeWriter<M>
where
    M: MakeWriter<'a>,
{
    type Writer = SanitizingWriter<M::Writer>;

    fn make_writer(&'a self) -> Self::Writer {
        SanitizingWriter::new(self.inner.make_writer())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redacts_uuid() {
        let out = sanitize("request 550e8400-e29b-41d4-a716-446655440000 scored");
        assert!(out.contains("[REDACTED-UUID]"));
        assert!(!out.contains("550e8400"));
    }

    #[test]
    fn test_redacts_patient_code() {
        let out = sanitize("failed for patient_id=DH-00421 at load");
        assert!(out.contains("[REDACTED-PATIENT]"));
        assert!(!out.contains("DH-00421"));
    }

    #[test]
    fn test_redacts_email_and_phone() {
        let out = sanitize("contact clinic@example.org or +1 555-123-4567");
        assert!(out.contains("[REDACTED-EMAIL]"));
        assert!(out.contains("[REDACTED-PHONE]"));
    }

    #[test]
    fn test_redacts_seed() {
        let out = sanitize("seed=QWxhZGRpbjpvcGVuIHNlc2FtZSB3aXRoIGxvbmcgc2VjcmV0");
        assert!(out.contains("[REDACTED-SECRET]"));
    }

    #[test]
    fn test_plain_text_untouched() {
        let line = "Model store ready explainer=closed_form features=14";
        assert_eq!(sanitize(line), line);
        assert!(!contains_identifier(line));
    }

    #[test]
    fn test_truncates_long_lines() {
        let out = sanitize_with_limit("abcdefghijklmnopqrstuvwxyz", 8);
        assert_eq!(out, "abcdefgh [TRUNCATED]");
    }

    #[test]
    fn test_writer_sanitizes_per_line() {
        let mut sink = Vec::new();
        {
            let mut w = SanitizingWriter::new(&mut sink);
            w.write_all(b"first patient_id=DH-1234\nsecond ")
                .expect("write");
            w.write_all(b"line\n").expect("write");
            w.flush().expect("flush");
        }
        let text = String::from_utf8(sink).expect("utf8");
        assert_eq!(text, "first [REDACTED-PATIENT]\nsecond line\n");
    }
}
