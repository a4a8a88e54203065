//
//  context.rs
//  apisig
//

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::model::{AliasState, DerivedViews, Entity, EntityId, ObjectKind, Package};

/// Longest alias chain followed before giving up on a lookup.
const MAX_CHAIN: usize = 512;

/// Where a qualified name lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolRef {
    Local(EntityId),
    Dependency(usize, EntityId),
}

/// Result of following a reference to its definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    /// Qualified name of a non-alias entity.
    Found(String),
    /// Not defined in any known package.
    Missing,
    /// The chain came back to a name it had already visited.
    Cycle(Vec<String>),
}

enum Step {
    Terminal(String),
    Follow(String),
    Missing,
}

/// Symbol table for one resolution run: the package being resolved plus the
/// dependency packages it may refer to. Local definitions shadow dependencies.
pub struct ResolutionContext<'a> {
    dependencies: &'a [Package],
    table: HashMap<String, SymbolRef>,
}

impl<'a> ResolutionContext<'a> {
    pub fn new(local: &Package, dependencies: &'a [Package]) -> Self {
        let mut table = HashMap::new();
        for (index, dependency) in dependencies.iter().enumerate() {
            for entity in dependency.entities() {
                table.insert(entity.path.clone(), SymbolRef::Dependency(index, entity.id));
            }
        }
        for entity in local.entities() {
            table.insert(entity.path.clone(), SymbolRef::Local(entity.id));
        }
        Self {
            dependencies,
            table,
        }
    }

    pub fn symbol(&self, path: &str) -> Option<SymbolRef> {
        self.table.get(path).copied()
    }

    /// The entity behind a qualified name, in whichever package defines it.
    pub fn entity<'p>(&'p self, local: &'p Package, path: &str) -> Option<&'p Entity> {
        match self.symbol(path)? {
            SymbolRef::Local(id) => local.get(id),
            SymbolRef::Dependency(index, id) => self.dependencies.get(index)?.get(id),
        }
    }

    /// Members of the entity at `path`, wherever it lives.
    pub fn members<'p>(&'p self, local: &'p Package, path: &str) -> Vec<&'p Entity> {
        match self.symbol(path) {
            Some(SymbolRef::Local(id)) => local.members(id).collect(),
            Some(SymbolRef::Dependency(index, id)) => self
                .dependencies
                .get(index)
                .map(|dep| dep.members(id).collect())
                .unwrap_or_default(),
            None => Vec::new(),
        }
    }

    fn inherited<'p>(
        &'p self,
        views: &'p DerivedViews,
        symbol: SymbolRef,
    ) -> Option<&'p BTreeMap<String, String>> {
        match symbol {
            SymbolRef::Local(id) => views.inherited.get(&id),
            SymbolRef::Dependency(index, id) => self.dependencies.get(index)?.inherited_members(id),
        }
    }

    /// Follow `target` through aliases, re-exports, and inherited members.
    pub fn lookup(&self, local: &Package, views: &DerivedViews, target: &str) -> Lookup {
        let mut visited = HashSet::new();
        let mut chain = Vec::new();
        let mut current = target.to_string();
        loop {
            if !visited.insert(current.clone()) || chain.len() >= MAX_CHAIN {
                chain.push(current);
                return Lookup::Cycle(chain);
            }
            chain.push(current.clone());
            match self.step(local, views, &current) {
                Step::Terminal(path) => return Lookup::Found(path),
                Step::Follow(next) => current = next,
                Step::Missing => return Lookup::Missing,
            }
        }
    }

    fn step(&self, local: &Package, views: &DerivedViews, path: &str) -> Step {
        if let Some(entity) = self.entity(local, path) {
            return match &entity.kind {
                ObjectKind::Alias(alias) => match &alias.resolution {
                    AliasState::Resolved { target } => Step::Terminal(target.clone()),
                    AliasState::External => Step::Missing,
                    AliasState::Unresolved => Step::Follow(alias.target.clone()),
                },
                _ => Step::Terminal(path.to_string()),
            };
        }

        // `a.b.c` with only `a.b` known: continue from what `a.b` stands for.
        let mut split = path.len();
        while let Some(dot) = path[..split].rfind('.') {
            let (prefix, rest) = (&path[..dot], &path[dot + 1..]);
            split = dot;
            let Some(symbol) = self.symbol(prefix) else {
                continue;
            };
            let Some(entity) = self.entity(local, prefix) else {
                return Step::Missing;
            };
            return match &entity.kind {
                ObjectKind::Alias(alias) => match &alias.resolution {
                    AliasState::Resolved { target } => Step::Follow(format!("{target}.{rest}")),
                    AliasState::External => Step::Missing,
                    AliasState::Unresolved => Step::Follow(format!("{}.{rest}", alias.target)),
                },
                ObjectKind::Class(_) => {
                    let (name, tail) = match rest.split_once('.') {
                        Some((name, tail)) => (name, Some(tail)),
                        None => (rest, None),
                    };
                    match self
                        .inherited(views, symbol)
                        .and_then(|members| members.get(name))
                        .filter(|winner| winner.as_str() != path)
                    {
                        Some(winner) => match tail {
                            Some(tail) => Step::Follow(format!("{winner}.{tail}")),
                            None => Step::Follow(winner.clone()),
                        },
                        None => Step::Missing,
                    }
                }
                _ => Step::Missing,
            };
        }
        Step::Missing
    }
}
