//! Collective communication patterns and their default parameters

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{FabricError, FabricResult};

/// Catalog key that expands to every pattern
pub const ALL_PATTERNS: &str = "all";

/// The collective patterns the planner knows how to lay out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    /// Reduce-scatter followed by allgather
    #[serde(rename = "allreduce")]
    AllReduce,
    /// Every host sends to every other host
    #[serde(rename = "allgather")]
    AllGather,
    /// Root host sends to every other host
    Broadcast,
    /// Every host sends to its successor
    Ring,
    /// Workers exchange with a single parameter server
    ParameterServer,
}

impl PatternKind {
    /// Every pattern, in catalog order
    pub const ALL: [PatternKind; 5] = [
        PatternKind::AllReduce,
        PatternKind::AllGather,
        PatternKind::Broadcast,
        PatternKind::Ring,
        PatternKind::ParameterServer,
    ];

    /// Catalog key (e.g. `"parameter_server"`)
    pub fn key(&self) -> &'static str {
        match self {
            PatternKind::AllReduce => "allreduce",
            PatternKind::AllGather => "allgather",
            PatternKind::Broadcast => "broadcast",
            PatternKind::Ring => "ring",
            PatternKind::ParameterServer => "parameter_server",
        }
    }

    /// Number of sequential phases the pattern executes
    pub fn phase_count(&self) -> usize {
        match self {
            PatternKind::AllReduce => 2,
            _ => 1,
        }
    }

    /// Smallest topology that yields any flows
    pub fn min_hosts(&self) -> usize {
        2
    }
}

impl fmt::Display for PatternKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for PatternKind {
    type Err = FabricError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PatternKind::ALL
            .into_iter()
            .find(|kind| kind.key() == s)
            .ok_or_else(|| FabricError::UnknownPattern(s.to_string()))
    }
}

/// Immutable description of one pattern
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternDescriptor {
    /// Which pattern this describes
    pub kind: PatternKind,

    /// Display name (e.g. "AllReduce")
    pub name: String,

    /// Human description
    pub description: String,

    /// Message size in bytes
    pub message_size: u64,

    /// Flow duration in seconds
    pub duration_secs: u64,

    /// Peers per host; 0 means "all other hosts"
    pub connections_per_host: usize,

    /// Whether traffic flows in both directions
    pub bidirectional: bool,
}

impl PatternDescriptor {
    fn builtin(
        kind: PatternKind,
        name: &str,
        description: &str,
        message_size: u64,
        duration_secs: u64,
        connections_per_host: usize,
        bidirectional: bool,
    ) -> Self {
        Self {
            kind,
            name: name.to_string(),
            description: description.to_string(),
            message_size,
            duration_secs,
            connections_per_host,
            bidirectional,
        }
    }

    /// Number of sequential phases
    pub fn phase_count(&self) -> usize {
        self.kind.phase_count()
    }

    /// Copy of this descriptor with `overrides` applied
    pub fn with_overrides(&self, overrides: &PatternOverrides) -> Self {
        let mut descriptor = self.clone();
        if let Some(duration) = overrides.duration_secs {
            descriptor.duration_secs = duration;
        }
        if let Some(size) = overrides.message_size {
            descriptor.message_size = size;
        }
        descriptor
    }
}

/// Per-run replacements for the overridable descriptor fields
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternOverrides {
    /// Replacement flow duration in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<u64>,

    /// Replacement message size in bytes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_size: Option<u64>,
}

impl PatternOverrides {
    /// Create validated overrides
    pub fn new(duration_secs: Option<u64>, message_size: Option<u64>) -> FabricResult<Self> {
        let overrides = Self {
            duration_secs,
            message_size,
        };
        overrides.validate()?;
        Ok(overrides)
    }

    /// Reject zero durations and sizes
    pub fn validate(&self) -> FabricResult<()> {
        if self.duration_secs == Some(0) {
            return Err(FabricError::config("duration override must be positive"));
        }
        if self.message_size == Some(0) {
            return Err(FabricError::config("message size override must be positive"));
        }
        Ok(())
    }

    /// Whether no field is overridden
    pub fn is_empty(&self) -> bool {
        self.duration_secs.is_none() && self.message_size.is_none()
    }
}

/// Registry of pattern descriptors keyed by pattern
///
/// Holds exactly one descriptor per [`PatternKind`], stored at the kind's
/// position in [`PatternKind::ALL`]. Start from [`PatternCatalog::builtin`]
/// and replace entries with [`PatternCatalog::with_descriptor`].
#[derive(Debug, Clone)]
pub struct PatternCatalog {
    patterns: Vec<PatternDescriptor>,
}

impl PatternCatalog {
    /// Catalog with the built-in defaults
    pub fn builtin() -> Self {
        use PatternKind::*;

        Self {
            patterns: vec![
                PatternDescriptor::builtin(
                    AllReduce,
                    "AllReduce",
                    "All-to-all reduction (gradient aggregation)",
                    100_000_000,
                    30,
                    0,
                    true,
                ),
                PatternDescriptor::builtin(
                    AllGather,
                    "AllGather",
                    "All-to-all gather operation",
                    50_000_000,
                    30,
                    0,
                    true,
                ),
                PatternDescriptor::builtin(
                    Broadcast,
                    "Broadcast",
                    "One-to-all broadcast",
                    1_000_000_000,
                    60,
                    0,
                    false,
                ),
                PatternDescriptor::builtin(
                    Ring,
                    "Ring",
                    "Ring-based collective",
                    100_000_000,
                    30,
                    2,
                    true,
                ),
                PatternDescriptor::builtin(
                    ParameterServer,
                    "ParameterServer",
                    "Parameter server pattern",
                    50_000_000,
                    60,
                    1,
                    true,
                ),
            ],
        }
    }

    /// Replace the descriptor for `descriptor.kind`
    ///
    /// # Errors
    ///
    /// [`FabricError::Config`] if the message size or duration is zero.
    pub fn with_descriptor(mut self, descriptor: PatternDescriptor) -> FabricResult<Self> {
        if descriptor.message_size == 0 || descriptor.duration_secs == 0 {
            return Err(FabricError::config(format!(
                "{} descriptor needs a positive message size and duration",
                descriptor.kind
            )));
        }
        let kind = descriptor.kind;
        self.patterns[kind as usize] = descriptor;
        Ok(self)
    }

    /// Descriptor for `kind`
    pub fn descriptor(&self, kind: PatternKind) -> &PatternDescriptor {
        &self.patterns[kind as usize]
    }

    /// Descriptor for a catalog key
    pub fn get(&self, key: &str) -> FabricResult<&PatternDescriptor> {
        let kind = key.parse::<PatternKind>()?;
        Ok(self.descriptor(kind))
    }

    /// Resolve requested names into pattern kinds, expanding `"all"`
    ///
    /// Fails on the first unknown name. Duplicates are dropped, first occurrence wins.
    pub fn resolve<S: AsRef<str>>(&self, names: &[S]) -> FabricResult<Vec<PatternKind>> {
        let mut kinds = Vec::new();
        for name in names {
            let name = name.as_ref();
            let expanded: Vec<PatternKind> = if name == ALL_PATTERNS {
                self.patterns.iter().map(|p| p.kind).collect()
            } else {
                vec![name.parse()?]
            };
            for kind in expanded {
                if !kinds.contains(&kind) {
                    kinds.push(kind);
                }
            }
        }
        Ok(kinds)
    }

    /// Iterate descriptors in catalog order
    pub fn iter(&self) -> impl Iterator<Item = &PatternDescriptor> {
        self.patterns.iter()
    }
}

impl Default for PatternCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_defaults() {
        let catalog = PatternCatalog::builtin();

        let broadcast = catalog.get("broadcast").unwrap();
        assert_eq!(broadcast.message_size, 1_000_000_000);
        assert_eq!(broadcast.duration_secs, 60);
        assert!(!broadcast.bidirectional);

        let ring = catalog.get("ring").unwrap();
        assert_eq!(ring.connections_per_host, 2);

        assert_eq!(catalog.get("allreduce").unwrap().phase_count(), 2);
        assert_eq!(catalog.get("allgather").unwrap().phase_count(), 1);
        assert_eq!(catalog.iter().count(), PatternKind::ALL.len());
        for kind in PatternKind::ALL {
            assert_eq!(catalog.descriptor(kind).kind, kind);
        }
    }

    #[test]
    fn test_with_descriptor_replaces_by_kind() {
        let catalog = PatternCatalog::builtin();
        let mut ring = catalog.descriptor(PatternKind::Ring).clone();
        ring.duration_secs = 7;
        ring.description = "Short ring".to_string();

        let catalog = catalog.with_descriptor(ring).unwrap();

        assert_eq!(catalog.get("ring").unwrap().duration_secs, 7);
        assert_eq!(catalog.iter().count(), PatternKind::ALL.len());
        assert_eq!(catalog.descriptor(PatternKind::Broadcast).duration_secs, 60);
        for kind in PatternKind::ALL {
            assert_eq!(catalog.descriptor(kind).kind, kind);
        }
    }

    #[test]
    fn test_with_descriptor_rejects_zero_fields() {
        let catalog = PatternCatalog::builtin();
        let mut broadcast = catalog.descriptor(PatternKind::Broadcast).clone();
        broadcast.message_size = 0;

        assert!(matches!(
            catalog.with_descriptor(broadcast),
            Err(FabricError::Config(_))
        ));
    }

    #[test]
    fn test_unknown_pattern() {
        let catalog = PatternCatalog::builtin();
        let err = catalog.get("alltoallv").unwrap_err();
        assert!(matches!(err, FabricError::UnknownPattern(ref name) if name == "alltoallv"));
    }

    #[test]
    fn test_resolve_expands_all_and_dedups() {
        let catalog = PatternCatalog::builtin();

        let kinds = catalog.resolve(&["ring", "all"]).unwrap();
        assert_eq!(kinds.len(), 5);
        assert_eq!(kinds[0], PatternKind::Ring);
        assert_eq!(kinds[1], PatternKind::AllReduce);
    }

    #[test]
    fn test_resolve_reports_invalid_name() {
        let catalog = PatternCatalog::builtin();
        let err = catalog.resolve(&["ring", "bogus", "broadcast"]).unwrap_err();
        assert!(err.to_string().contains("bogus"));
    }

    #[test]
    fn test_overrides_apply_only_given_fields() {
        let catalog = PatternCatalog::builtin();
        let base = catalog.descriptor(PatternKind::AllGather);

        let overrides = PatternOverrides::new(Some(5), None).unwrap();
        let tuned = base.with_overrides(&overrides);

        assert_eq!(tuned.duration_secs, 5);
        assert_eq!(tuned.message_size, base.message_size);
        assert_eq!(tuned.name, base.name);
    }

    #[test]
    fn test_zero_overrides_rejected() {
        assert!(PatternOverrides::new(Some(0), None).is_err());
        assert!(PatternOverrides::new(None, Some(0)).is_err());
        assert!(PatternOverrides::new(None, None).unwrap().is_empty());
    }

    #[test]
    fn test_kind_serde_uses_catalog_keys() {
        let json = serde_json::to_string(&PatternKind::ParameterServer).unwrap();
        assert_eq!(json, "\"parameter_server\"");
        for kind in PatternKind::ALL {
            assert_eq!(kind.key().parse::<PatternKind>().unwrap(), kind);
            assert_eq!(
                serde_json::to_string(&kind).unwrap(),
                format!("\"{}\"", kind.key())
            );
        }
    }
}
