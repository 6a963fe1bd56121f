/// ParserConfig holds the configuration for the parser
#[derive(Debug, Clone)]
pub struct ParserConfig {
    /// Optional source filename or url, used in error messages
    pub source: Option<String>,
    /// Report errors through the sink and recover, instead of aborting
    pub ignore_errors: bool,
    /// Accept C1 control code points inside words instead of rejecting them
    pub allow_high_controls: bool,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            source: None,
            ignore_errors: true,
            allow_high_controls: false,
        }
    }
}
