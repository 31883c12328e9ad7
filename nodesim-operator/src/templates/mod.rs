pub mod fake_node;

pub use fake_node::{NodeTemplate, TemplateError, build_node_template};
