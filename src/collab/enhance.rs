//! Output-format and secure-coding policy added to every prompt.

use super::{EnhancedPrompt, Enhancer};

pub const DEFAULT_POLICY_VERSION: &str = "secure-codegen-v1";

const POLICY: &str = "\
You are a secure code generator.
Reply with exactly one fenced code block and nothing else.
Put the language name right after the opening fence.
If the solution needs more than one file, start each file with a line