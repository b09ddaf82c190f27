/// Constants used by cluster construction and projection.
pub mod cluster {
    /// Identifier column used when none is configured (column 0 is usually a row id).
    pub const DEFAULT_IDENTIFIER_POSITION: usize = 1;
    /// Field columns mined when none are configured (title and author in book catalogs).
    pub const DEFAULT_FIELDS_OF_INTEREST: [usize; 2] = [2, 3];
    /// Display label for the cluster of records too short to carry an identifier.
    pub const MISSING_IDENTIFIER_LABEL: &str = "<missing identifier>";
}

/// Constants used by oracle adapters.
pub mod oracle {
    use std::time::Duration;

    /// Name reported by closure-backed oracles.
    pub const FN_ORACLE_NAME: &str = "fn";
    /// Prefix for command-backed oracle names (`command:<program>`).
    pub const COMMAND_ORACLE_PREFIX: &str = "command:";
    /// Reason recorded when a per-call timeout elapses.
    pub const TIMEOUT_REASON: &str = "oracle call timed out";
    /// Reason recorded when an oracle worker thread stops without answering.
    pub const WORKER_STOPPED_REASON: &str = "oracle worker stopped";
    /// How often a learner process is checked for exit while a deadline runs.
    pub const CHILD_POLL_INTERVAL: Duration = Duration::from_millis(10);
}

/// Constants used by report rendering.
pub mod report {
    /// Separator between the source and target of one example.
    pub const EXAMPLE_ARROW: &str = " -> ";
    /// Display label for examples the oracle could not learn a program for.
    pub const NOT_LEARNED_LABEL: &str = "<not learned>";
    /// Line prefix introducing a program group.
    pub const PROGRAM_PREFIX: &str = "Program: ";
    /// Line prefix introducing one example inside a group.
    pub const TRANSFORMATION_PREFIX: &str = "  Transformation: ";
    /// Heading of the ranked recurring-programs section.
    pub const RECURRING_HEADER: &str = "Recurring programs";
}

/// Constants used by the delimited file loader.
pub mod source {
    /// Default field delimiter (tab separated catalogs).
    pub const DEFAULT_DELIMITER: u8 = b'\t';
}
