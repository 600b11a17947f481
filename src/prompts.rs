//! Fixed prompt text.

/// Style-mimicry instruction sent as the system turn of every request.
const STYLE_MIMICRY_DIRECTIVE: &str = "
Analyze in detail the conversation to respond to the last message with exactly the same writing style, sentence structure, meaning, and context of the other people (not you). WITHOUT INCLUDING THE NAME AT THE BEGINNING WITH THE COLON ':' IN THE MESSAGE YOU WILL WRITE. You must make fairly short sentences, speak naturally, and don't write too well. MAKE QUITE SHORT SENTENCES.
";

/// The system directive, trimmed.
pub fn system_directive() -> &'static str {
    STYLE_MIMICRY_DIRECTIVE.trim()
}
