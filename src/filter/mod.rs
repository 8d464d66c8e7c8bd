//! Removes `<thinking>...</thinking>` spans from a live delta stream.
//!
//! Model output arrives as arbitrarily-sized text chunks; a tag can be split
//! across any number of them. [`ThinkingFilter`] accumulates un-emitted text
//! in a buffer and only releases it once it is known to be outside a thinking
//! span, so the decision is made over the logical concatenation of all chunks
//! rather than per chunk. [`ThinkingTagTransform`] applies the state machine
//! to an agent event stream.

use futures::stream::BoxStream;
use futures::StreamExt;

use crate::agent::AgentEvent;
use crate::error::SkiffError;

const OPEN_MARKER: &str = "<thinking";
const CLOSE_MARKER: &str = "</thinking>";

/// Streaming state machine that suppresses thinking spans.
///
/// One instance per streaming session; the buffer and flag live exactly as
/// long as the response they filter. Text is held back only while the buffer
/// tail could still become one of the two markers, so ordinary text that
/// merely starts with `<` flows through.
#[derive(Debug, Default)]
pub struct ThinkingFilter {
    buffer: String,
    thinking: bool,
}

impl ThinkingFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_thinking(&self) -> bool {
        self.thinking
    }

    /// Feed one chunk; returns the text that became safe to emit, if any.
    pub fn push(&mut self, chunk: &str) -> Option<String> {
        self.buffer.push_str(chunk);
        let out = self.drain();
        (!out.is_empty()).then_some(out)
    }

    /// Signal end of stream.
    ///
    /// A partial marker held back while visible never completed, so it was
    /// ordinary text and is released. Anything buffered inside a thinking
    /// span is dropped; an unterminated span suppresses to the end.
    pub fn finish(&mut self) -> Option<String> {
        if self.thinking {
            self.buffer.clear();
            return None;
        }
        let out = std::mem::take(&mut self.buffer);
        (!out.is_empty()).then_some(out)
    }

    fn drain(&mut self) -> String {
        let mut out = String::new();
        loop {
            if self.thinking {
                match self.buffer.find(CLOSE_MARKER) {
                    Some(idx) => {
                        self.buffer.drain(..idx + CLOSE_MARKER.len());
                        self.thinking = false;
                    }
                    None => {
                        // Suppressed text never re-emerges; keep only the tail
                        // that could still start a close marker so the buffer
                        // stays bounded through long thinking spans.
                        let keep = partial_marker_suffix(&self.buffer, CLOSE_MARKER);
                        self.buffer.drain(..self.buffer.len() - keep);
                        return out;
                    }
                }
            } else {
                match self.buffer.find('<') {
                    None => {
                        out.push_str(&self.buffer);
                        self.buffer.clear();
                        return out;
                    }
                    Some(idx) => {
                        out.push_str(&self.buffer[..idx]);
                        self.buffer.drain(..idx);
                        if self.buffer.starts_with(OPEN_MARKER) {
                            self.buffer.drain(..OPEN_MARKER.len());
                            self.thinking = true;
                        } else if self.buffer.starts_with(CLOSE_MARKER) {
                            // Unmatched close: consumed, state stays visible.
                            self.buffer.drain(..CLOSE_MARKER.len());
                        } else if OPEN_MARKER.starts_with(self.buffer.as_str())
                            || CLOSE_MARKER.starts_with(self.buffer.as_str())
                        {
                            // Proper prefix of a marker; wait for more bytes.
                            return out;
                        } else {
                            // A '<' that cannot become a marker is plain text.
                            out.push('<');
                            self.buffer.drain(..1);
                        }
                    }
                }
            }
        }
    }
}

/// Length of the longest suffix of `haystack` that is a proper prefix of
/// `marker`.
fn partial_marker_suffix(haystack: &str, marker: &str) -> usize {
    let max = marker.len().saturating_sub(1).min(haystack.len());
    for len in (1..=max).rev() {
        let start = haystack.len() - len;
        if haystack.is_char_boundary(start) && marker.starts_with(&haystack[start..]) {
            return len;
        }
    }
    0
}

/// Applies [`ThinkingFilter`] to an agent event stream.
///
/// Text deltas are rewritten (zero or more output deltas per input), all
/// other events pass through unchanged. Held-back text is flushed when the
/// terminal event arrives or the upstream ends. An upstream error is
/// forwarded and ends consumption; fragments already emitted stand.
#[derive(Debug, Default)]
pub struct ThinkingTagTransform;

impl ThinkingTagTransform {
    pub fn new() -> Self {
        Self
    }

    pub fn transform(
        &self,
        stream: BoxStream<'static, Result<AgentEvent, SkiffError>>,
    ) -> BoxStream<'static, Result<AgentEvent, SkiffError>> {
        let transformed = async_stream::stream! {
            let mut filter = ThinkingFilter::new();
            let mut inner = std::pin::pin!(stream);
            while let Some(item) = inner.next().await {
                match item {
                    Ok(AgentEvent::Delta { text }) => {
                        if let Some(out) = filter.push(&text) {
                            yield Ok(AgentEvent::Delta { text: out });
                        }
                    }
                    Ok(event @ AgentEvent::Completed { .. }) => {
                        if let Some(out) = filter.finish() {
                            yield Ok(AgentEvent::Delta { text: out });
                        }
                        yield Ok(event);
                    }
                    Ok(event) => yield Ok(event),
                    Err(e) => {
                        yield Err(e);
                        break;
                    }
                }
            }
            if let Some(out) = filter.finish() {
                yield Ok(AgentEvent::Delta { text: out });
            }
        };
        Box::pin(transformed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn run(chunks: &[&str]) -> String {
        let mut filter = ThinkingFilter::new();
        let mut out = String::new();
        for chunk in chunks {
            if let Some(fragment) = filter.push(chunk) {
                assert!(!fragment.is_empty(), "emitted fragments must be non-empty");
                out.push_str(&fragment);
            }
        }
        if let Some(fragment) = filter.finish() {
            out.push_str(&fragment);
        }
        out
    }

    #[test]
    fn passes_plain_text_through_unchanged() {
        assert_eq!(run(&["no tags here"]), "no tags here");
        assert_eq!(run(&["split ", "into ", "pieces"]), "split into pieces");
    }

    #[test]
    fn strips_span_within_one_chunk() {
        assert_eq!(
            run(&["Hello <thinking>ignore me</thinking> world"]),
            "Hello  world"
        );
    }

    #[test]
    fn strips_span_across_chunks() {
        assert_eq!(
            run(&["Hello ", "<thinking>ignore", "me</thinking> world"]),
            "Hello  world"
        );
        assert_eq!(run(&["<thinking>a", "b", "c</thinking>done"]), "done");
    }

    #[test]
    fn strips_span_with_markers_split_mid_tag() {
        assert_eq!(
            run(&["Hel", "lo <thi", "nking>ignore me</thin", "king> world"]),
            "Hello  world"
        );
    }

    #[test]
    fn unterminated_span_suppresses_rest_of_stream() {
        assert_eq!(run(&["<thinking>never closes"]), "");
        assert_eq!(run(&["before<thinking>a", "b", "c"]), "before");
    }

    #[test]
    fn output_is_independent_of_chunk_boundaries() {
        let logical = "Hello <thinking>one</thinking> mid <thinking>two</thinking>end";
        let expected = "Hello  mid end";
        assert_eq!(run(&[logical]), expected);
        // Every split point of the logical stream must give the same result.
        for split in 1..logical.len() {
            if !logical.is_char_boundary(split) {
                continue;
            }
            let (a, b) = logical.split_at(split);
            assert_eq!(run(&[a, b]), expected, "split at byte {split}");
        }
        // One-byte chunks, the worst case.
        let bytes: Vec<String> = logical.chars().map(|c| c.to_string()).collect();
        let refs: Vec<&str> = bytes.iter().map(|s| s.as_str()).collect();
        assert_eq!(run(&refs), expected);
    }

    #[test]
    fn ordinary_angle_brackets_are_not_withheld() {
        assert_eq!(run(&["a < b and a <b> c"]), "a < b and a <b> c");
        assert_eq!(run(&["<div>html</div>"]), "<div>html</div>");
        assert_eq!(run(&["1 <", " 2"]), "1 < 2");
    }

    #[test]
    fn trailing_marker_prefix_is_flushed_at_end_of_stream() {
        assert_eq!(run(&["done <thin"]), "done <thin");
        assert_eq!(run(&["done </thinki"]), "done </thinki");
    }

    #[test]
    fn open_tag_attributes_are_ignored() {
        assert_eq!(
            run(&["a<thinking budget=\"high\">secret</thinking>b"]),
            "ab"
        );
    }

    #[test]
    fn unmatched_close_marker_is_suppressed() {
        assert_eq!(run(&["left</thinking>right"]), "leftright");
        assert_eq!(run(&["left</thin", "king>right"]), "leftright");
    }

    #[test]
    fn consecutive_spans_leave_only_visible_text() {
        assert_eq!(
            run(&["<thinking>a</thinking><thinking>b</thinking>ok"]),
            "ok"
        );
    }

    #[test]
    fn thinking_buffer_stays_bounded() {
        let mut filter = ThinkingFilter::new();
        assert_eq!(filter.push("<thinking>"), None);
        for _ in 0..1_000 {
            assert_eq!(filter.push("some long internal reasoning "), None);
        }
        assert!(filter.is_thinking());
        assert!(filter.buffer.len() < CLOSE_MARKER.len());
        assert_eq!(filter.push("</thinking>visible"), Some("visible".into()));
    }

    #[test]
    fn partial_marker_suffix_finds_longest_tail() {
        assert_eq!(partial_marker_suffix("abc</thin", CLOSE_MARKER), 6);
        assert_eq!(partial_marker_suffix("abc<", CLOSE_MARKER), 1);
        assert_eq!(partial_marker_suffix("abc", CLOSE_MARKER), 0);
        // A full marker is not a partial one.
        assert_eq!(partial_marker_suffix("</thinking>", CLOSE_MARKER), 0);
    }

    #[test]
    fn utf8_text_survives_filtering() {
        assert_eq!(
            run(&["héllo <thinking>ça</thinking> wörld 😀"]),
            "héllo  wörld 😀"
        );
    }
}
