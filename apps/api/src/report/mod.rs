// Report: section composition, document assembly, HTML/JSON rendering and
// artifact persistence. File writes run inside tokio::task::spawn_blocking.

pub mod artifact;
pub mod assembler;
pub mod composer;
pub mod generator;
pub mod handlers;
pub mod render_html;
