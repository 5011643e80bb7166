/// Column-name constants for the RBR returns pipeline.
/// Single source of truth - exported to Python via PyO3.

// ── Company metrics columns ─────────────────────────────────────────────────
pub mod company {
    pub const GVKEY: &str = "Gvkey";

    pub const TOTAL_RETURN: &str = "Port. Total Return";
    pub const CONTRIBUTION_TO_RETURN: &str = "Port. Contribution To Return";
    pub const BEGINNING_WEIGHT: &str = "Port. Beginning Weight";
    pub const ENDING_WEIGHT: &str = "Port. Ending Weight";

    /// Metrics summed by the default aggregation spec, in output order.
    pub const DEFAULT_METRICS: [&str; 4] = [
        TOTAL_RETURN,
        CONTRIBUTION_TO_RETURN,
        BEGINNING_WEIGHT,
        ENDING_WEIGHT,
    ];
}

// ── Taxonomy workbook columns ───────────────────────────────────────────────
pub mod taxonomy {
    pub const GVKEY: &str = "GVKey";
    /// Marker left by spreadsheet exports for columns with an empty header.
    pub const UNNAMED_MARKER: &str = "Unnamed";
    /// Infix between an RBR name and its level number, e.g. "Activity Level 2".
    pub const LEVEL_INFIX: &str = " Level ";
}

// ── Report columns ──────────────────────────────────────────────────────────
pub mod report {
    pub const RBR_NAME: &str = "RBR Name";
    pub const RBR_LEVEL: &str = "RBR Level";
    pub const RBR_CATEGORY: &str = "RBR category";
    pub const NUMBER_OF_GVKEYS: &str = "Number of Gvkeys";

    /// Leading columns of every report, in order.
    pub const LEADING: [&str; 4] = [RBR_NAME, RBR_LEVEL, RBR_CATEGORY, NUMBER_OF_GVKEYS];

    pub const DEFAULT_OUTPUT: &str = "returns.csv";
}
