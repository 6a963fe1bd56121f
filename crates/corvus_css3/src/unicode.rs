#[allow(clippy::module_name_repetitions)]
pub struct UnicodeChar;

impl UnicodeChar {
    pub const NULL: char = '\u{0000}';
    pub const FORM_FEED: char = '\u{000C}';
    pub const DELETE: char = '\u{007F}';
    pub const C1_START: char = '\u{0080}';
    pub const C1_END: char = '\u{009F}';
    pub const FIRST_NON_ASCII: char = '\u{0080}';
    pub const REPLACEMENT: char = '\u{FFFD}';
}
