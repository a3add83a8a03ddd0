//! Central configuration constants for runtime limits and defaults.

/// Name of the metadata subtree inside the data folder and under the
/// remote prefix. Excluded from every scan and classification.
pub const META_DIR: &str = ".convoy";

/// Default name of the local data folder when none is configured.
pub const DEFAULT_DATA_DIR: &str = "Data";

/// Default number of concurrent file transfers within a phase.
pub const DEFAULT_TRANSFERS: usize = 4;

/// Minimum allowed concurrent transfers.
pub const MIN_TRANSFERS: usize = 1;

/// Maximum allowed concurrent transfers.
pub const MAX_TRANSFERS: usize = 8;

/// Editor name recorded when the user never supplied one.
pub const DEFAULT_EDITOR_NAME: &str = "NONAME";

/// Convenience function to clamp a transfer count into allowed range.
pub fn clamp_transfers(v: usize) -> usize {
    v.clamp(MIN_TRANSFERS, MAX_TRANSFERS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_bounds() {
        assert_eq!(clamp_transfers(0), MIN_TRANSFERS);
        assert_eq!(clamp_transfers(100), MAX_TRANSFERS);
        assert_eq!(clamp_transfers(4), 4);
    }
}
