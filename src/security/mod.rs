pub mod validator;

pub use validator::{InputValidator, ValidationError};

/// Characters allowed in branch names besides ASCII letters and digits
///
/// Anything outside this set is rejected before git is spawned. Widening it
/// requires checking the new character against git's ref-name rules.
pub const BRANCH_NAME_EXTRA_CHARS: &[char] = &['-', '_', '.', '/'];

/// Upper bound on branch name length accepted from callers
pub const MAX_BRANCH_NAME_LEN: usize = 255;
