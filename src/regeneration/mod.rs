/*!
 * AI-assisted caption rewrite.
 *
 * Builds one composite prompt from the auto-generated captions, the
 * reference lyrics and the rule text, calls a `TextGenerator` once and
 * canonicalizes the reply.
 */

pub mod orchestrator;
pub mod prompts;

pub use orchestrator::RegenerationOrchestrator;
pub use prompts::{PromptInputs, PromptTemplate};
