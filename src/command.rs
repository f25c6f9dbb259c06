use crate::params::ParamSet;

/// Command text plus the parameters bound to it.
///
/// Parameters are attached once; the text can be swapped between executions,
/// which is how a transaction runs several statements against one binding.
#[derive(Debug, Clone)]
pub struct Command<'p> {
    text: String,
    params: &'p ParamSet,
}

impl<'p> Command<'p> {
    #[must_use]
    pub fn new(text: impl Into<String>, params: &'p ParamSet) -> Self {
        Self {
            text: text.into(),
            params,
        }
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn params(&self) -> &'p ParamSet {
        self.params
    }

    /// Replace the command text, keeping the bound parameters.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }
}
