pub mod output;
pub mod walker;

pub use output::{create_writer, JsonWriter, MarkdownWriter, OutputFormat, OutputWriter};
pub use walker::{read_contents, FileWalker};
