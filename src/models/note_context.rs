/// Per-note context consulted when resolving ambiguous flat tags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoteContext<'a> {
    pub note_type: Option<&'a str>,
    pub content: Option<&'a str>,
}

impl<'a> NoteContext<'a> {
    pub fn new(note_type: Option<&'a str>, content: Option<&'a str>) -> Self {
        Self { note_type, content }
    }

    /// True when the note type names an architecture decision record.
    pub fn is_decision_record(&self) -> bool {
        self.note_type
            .is_some_and(|t| t.trim().eq_ignore_ascii_case("adr"))
    }

    /// Case-insensitive substring check against the note content.
    pub fn mentions(&self, needle: &str) -> bool {
        self.content
            .is_some_and(|c| c.to_lowercase().contains(&needle.to_lowercase()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decision_record_type_is_case_insensitive() {
        assert!(NoteContext::new(Some("Adr"), None).is_decision_record());
        assert!(NoteContext::new(Some("ADR"), None).is_decision_record());
        assert!(!NoteContext::new(Some("Page"), None).is_decision_record());
        assert!(!NoteContext::default().is_decision_record());
    }

    #[test]
    fn mentions_requires_content() {
        let ctx = NoteContext::new(None, Some("we made a decision"));
        assert!(ctx.mentions("decision"));
        assert!(!NoteContext::default().mentions("decision"));
    }

    #[test]
    fn mentions_ignores_case() {
        let ctx = NoteContext::new(None, Some("An Integration Pattern"));
        assert!(ctx.mentions("integration pattern"));
        assert!(ctx.mentions("INTEGRATION"));
        assert!(!ctx.mentions("decision"));
    }
}
