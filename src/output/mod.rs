/// Writes the report to disk.
pub mod formatter;
/// Builds a Markdown summary of learned queries and rejections.
pub mod report;
