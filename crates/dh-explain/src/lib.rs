//! # dh-explain: style-templated explanation generator with a
//! tabular-entailment auditor and rule-first/model-second feedback loop
//! (spec §4.15, §4.16).
//!
//! [`feedback::generate_with_feedback`] is the single entry point: it builds
//! the prompt from a [`dh_contract::KpiContract`] and [`dh_contract::DecisionResult`],
//! calls the configured [`generator::TextGenerator`], audits the result with
//! [`auditor::audit`], and regenerates or falls back to
//! [`template::render_template`] as needed.

pub mod auditor;
pub mod feedback;
pub mod generator;
pub mod prompt;
pub mod style;
pub mod template;

pub use auditor::{audit, AuditStatus, EntailmentModel, Label, SentenceResult, ValidationReport};
pub use feedback::{generate_with_feedback, FeedbackConfig, GenerationOutcome};
pub use generator::{HttpTextGenerator, TextGenerator, UnavailableGenerator};
pub use prompt::build_prompt;
pub use style::Style;
pub use template::render_template;
