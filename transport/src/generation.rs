use serde::Deserialize;

/// Transport generation, matched to the cluster's SQL plugin line.
///
/// Both generations expose the same client contract. They differ in how a
/// request body reaches the pipeline:
///
/// - `Legacy` attaches the body to the request, so interceptors can read it.
/// - `Current` hands interceptors request metadata only. The body travels in
///   a per-request side channel that the client fills before the pipeline
///   runs and attaches when sending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportGeneration {
    /// Clusters before major version 3.
    Legacy,
    /// Clusters on major version 3 and later.
    #[default]
    Current,
}

impl TransportGeneration {
    /// Pick the generation for a cluster major version.
    pub fn for_major_version(major: u32) -> Self {
        if major < 3 {
            TransportGeneration::Legacy
        } else {
            TransportGeneration::Current
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(1, TransportGeneration::Legacy)]
    #[test_case(2, TransportGeneration::Legacy)]
    #[test_case(3, TransportGeneration::Current)]
    #[test_case(4, TransportGeneration::Current)]
    fn test_for_major_version(major: u32, expected: TransportGeneration) {
        assert_eq!(TransportGeneration::for_major_version(major), expected);
    }
}
