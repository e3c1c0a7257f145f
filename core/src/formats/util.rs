use miette::SourceSpan;

/// Stores the entire input to work out where in the file errors occured.
#[derive(Debug, Clone, Copy)]
pub struct InputLocator<'a> {
    pub full_input: &'a str,
}

impl<'a> InputLocator<'a> {
    pub fn new(full_input: &'a str) -> Self {
        Self { full_input }
    }

    /// Creates a span for an item using a substring of self.full_input
    ///
    /// Note that substr must be a literal substring, as in it must be
    /// a pointer into the same string!
    pub fn span_from_substr(&self, substr: &str) -> SourceSpan {
        let base_addr = self.full_input.as_ptr() as usize;
        let substr_addr = substr.as_ptr() as usize;
        assert!(
            substr_addr >= base_addr,
            "tried to get the span of a non-substring!"
        );
        let start = substr_addr - base_addr;
        SourceSpan::from((start, substr.len()))
    }
}
