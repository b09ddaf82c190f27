/// A single field value as read from the input table.
/// Examples: `0-7432-7356-7`, `The Da Vinci Code`, `Brown, Dan`
pub type FieldValue = String;
/// Zero-based column position within a record.
/// Examples: `1` (identifier column), `2` (title column)
pub type FieldPosition = usize;
/// Exact identifier text shared by the records of one cluster.
/// Example: `0-7432-7356-7`
pub type Identifier = String;
/// Opaque program text returned by an oracle; equality means "same rule".
/// Example: `Concat(SubStr(v, 3, 7), Const(" "), SubStr(v, 0, 1))`
pub type ProgramId = String;
/// Identifier for a record source, used in logs and errors.
/// Examples: `books.tsv`, `in_memory`
pub type SourceId = String;
/// Human-readable oracle name, used in logs and errors.
/// Examples: `command:prose-learn`, `fn`
pub type OracleName = String;
