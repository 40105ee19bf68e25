//! SQL recompute templates
//!
//! The backfill and aggregation queries live in `.sql` files outside the
//! binary so they can be tuned without a rebuild.

mod store;
mod template;

pub use store::TemplateStore;
pub use template::{SqlTemplate, TemplateArgs, TemplateError, TemplateKind, TemplateParam};
