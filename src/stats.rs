//
//  stats.rs
//  apisig
//

use serde::Serialize;

use crate::model::{AliasState, ObjectKind, Package};

/// Entity counts for one package.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Stats {
    pub modules: usize,
    pub classes: usize,
    pub functions: usize,
    pub signatures: usize,
    pub parameters: usize,
    pub attributes: usize,
    pub aliases: AliasCounts,
}

/// Alias edges (imports and class bases) by resolution state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AliasCounts {
    pub unresolved: usize,
    pub resolved: usize,
    pub external: usize,
}

impl AliasCounts {
    pub fn total(&self) -> usize {
        self.unresolved + self.resolved + self.external
    }
}

impl Stats {
    pub fn collect(package: &Package) -> Self {
        let mut stats = Stats::default();
        for entity in package.entities() {
            match &entity.kind {
                ObjectKind::Module(_) => stats.modules += 1,
                ObjectKind::Class(_) => stats.classes += 1,
                ObjectKind::Function(function) => {
                    stats.functions += 1;
                    stats.signatures += function.signatures.len();
                    stats.parameters += function
                        .signatures
                        .iter()
                        .map(|s| s.parameters.len())
                        .sum::<usize>();
                }
                ObjectKind::Attribute(_) => stats.attributes += 1,
                ObjectKind::Alias(_) => {}
            }
        }

        for slot in package.alias_slots() {
            match package.slot_alias(slot).map(|a| &a.resolution) {
                Some(AliasState::Unresolved) => stats.aliases.unresolved += 1,
                Some(AliasState::Resolved { .. }) => stats.aliases.resolved += 1,
                Some(AliasState::External) => stats.aliases.external += 1,
                None => {}
            }
        }
        stats
    }
}
