//! Snapshot sources and the per-scope index cache.
//!
//! Indexes are built once per scope and shared as `Arc<GraphIndex>`.
//! An entry is rebuilt when any covered tree reports a new generation,
//! or when it has outlived the TTL. Expired entries are dropped whenever a
//! new index is stored, and the number of cached scopes is capped.

use crate::error::{ResolveError, Result};
use crate::graph::GraphIndex;
use kinship_core::{SnapshotError, TreeId, TreeScope, TreeSnapshot};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant, UNIX_EPOCH};
use tracing::{debug, info};

/// Where tree snapshots come from.
pub trait SnapshotSource: Send + Sync {
    /// Current records of a tree.
    fn snapshot(&self, tree: &TreeId) -> Result<TreeSnapshot>;

    /// A stamp that changes whenever the tree's records change.
    fn generation(&self, tree: &TreeId) -> Result<u64>;

    /// Every tree the source knows, ordered by id.
    fn trees(&self) -> Result<Vec<TreeId>>;
}

impl<S: SnapshotSource + ?Sized> SnapshotSource for Box<S> {
    fn snapshot(&self, tree: &TreeId) -> Result<TreeSnapshot> {
        (**self).snapshot(tree)
    }

    fn generation(&self, tree: &TreeId) -> Result<u64> {
        (**self).generation(tree)
    }

    fn trees(&self) -> Result<Vec<TreeId>> {
        (**self).trees()
    }
}

impl<S: SnapshotSource + ?Sized> SnapshotSource for Arc<S> {
    fn snapshot(&self, tree: &TreeId) -> Result<TreeSnapshot> {
        (**self).snapshot(tree)
    }

    fn generation(&self, tree: &TreeId) -> Result<u64> {
        (**self).generation(tree)
    }

    fn trees(&self) -> Result<Vec<TreeId>> {
        (**self).trees()
    }
}

/// In-memory snapshots with an explicit generation counter.
#[derive(Debug, Default)]
pub struct MemorySource {
    trees: RwLock<HashMap<TreeId, (u64, TreeSnapshot)>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a snapshot and bumps the tree's generation.
    pub fn put(&self, tree: impl Into<TreeId>, snapshot: TreeSnapshot) -> u64 {
        let mut trees = self.trees.write().unwrap_or_else(PoisonError::into_inner);
        let entry = trees.entry(tree.into()).or_insert((0, TreeSnapshot::default()));
        entry.0 += 1;
        entry.1 = snapshot;
        entry.0
    }

    pub fn remove(&self, tree: &TreeId) -> Option<TreeSnapshot> {
        self.trees
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(tree)
            .map(|(_, snapshot)| snapshot)
    }
}

impl SnapshotSource for MemorySource {
    fn snapshot(&self, tree: &TreeId) -> Result<TreeSnapshot> {
        self.trees
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(tree)
            .map(|(_, snapshot)| snapshot.clone())
            .ok_or_else(|| ResolveError::UnknownTree(tree.clone()))
    }

    fn generation(&self, tree: &TreeId) -> Result<u64> {
        self.trees
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(tree)
            .map(|(generation, _)| *generation)
            .ok_or_else(|| ResolveError::UnknownTree(tree.clone()))
    }

    fn trees(&self) -> Result<Vec<TreeId>> {
        let mut ids: Vec<TreeId> = self
            .trees
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        ids.sort();
        Ok(ids)
    }
}

/// Reads `<root>/<tree>.json` snapshot documents.
///
/// The generation is the file's modification time in nanoseconds.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_of(&self, tree: &TreeId) -> Result<PathBuf> {
        let id = tree.as_str();
        if id.is_empty() || id.contains('/') || id.contains('\\') || id.contains("..") {
            return Err(ResolveError::UnknownTree(tree.clone()));
        }
        let path = self.root.join(format!("{}.json", id));
        if !path.is_file() {
            return Err(ResolveError::UnknownTree(tree.clone()));
        }
        Ok(path)
    }
}

impl SnapshotSource for DirectorySource {
    fn snapshot(&self, tree: &TreeId) -> Result<TreeSnapshot> {
        Ok(TreeSnapshot::load(self.path_of(tree)?)?)
    }

    fn generation(&self, tree: &TreeId) -> Result<u64> {
        let modified = fs::metadata(self.path_of(tree)?)
            .and_then(|meta| meta.modified())
            .map_err(SnapshotError::from)?;
        Ok(modified
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0))
    }

    fn trees(&self) -> Result<Vec<TreeId>> {
        let entries = fs::read_dir(&self.root).map_err(SnapshotError::from)?;
        let mut ids: Vec<TreeId> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
            .filter_map(|path| {
                path.file_stem()
                    .and_then(|stem| stem.to_str())
                    .map(TreeId::new)
            })
            .collect();
        ids.sort();
        Ok(ids)
    }
}

struct CacheEntry {
    index: Arc<GraphIndex>,
    generations: Vec<u64>,
    built: Instant,
}

/// Default cap on cached scopes.
pub const DEFAULT_MAX_SCOPES: usize = 32;

/// Built indexes keyed by normalized scope.
pub struct IndexCache<S> {
    source: S,
    ttl: Duration,
    max_scopes: usize,
    entries: RwLock<HashMap<TreeScope, CacheEntry>>,
}

impl<S: SnapshotSource> IndexCache<S> {
    pub fn new(source: S, ttl: Duration) -> Self {
        Self {
            source,
            ttl,
            max_scopes: DEFAULT_MAX_SCOPES,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Caps the number of cached scopes; the oldest entry goes first.
    pub fn with_max_scopes(mut self, max_scopes: usize) -> Self {
        self.max_scopes = max_scopes.max(1);
        self
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// The index for a scope, building it if missing or stale.
    pub fn get(&self, scope: &TreeScope) -> Result<Arc<GraphIndex>> {
        let scope = scope.normalized();
        let trees = scope.trees();
        if trees.is_empty() {
            return Err(ResolveError::EmptyScope);
        }

        // Stamps are read before the snapshots so a concurrent write
        // makes the entry look stale rather than fresh.
        let generations = trees
            .iter()
            .map(|tree| self.source.generation(tree))
            .collect::<Result<Vec<u64>>>()?;

        {
            let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(entry) = entries.get(&scope) {
                if entry.generations == generations && entry.built.elapsed() < self.ttl {
                    debug!("Index cache hit for {}", scope);
                    return Ok(Arc::clone(&entry.index));
                }
            }
        }

        let snapshots = trees
            .iter()
            .map(|tree| self.source.snapshot(tree))
            .collect::<Result<Vec<TreeSnapshot>>>()?;
        let index = Arc::new(GraphIndex::build(&TreeSnapshot::merge(snapshots))?);
        info!(
            "Built index for {} ({} persons)",
            scope,
            index.person_count()
        );

        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        self.evict(&mut entries, &scope);
        entries.insert(
            scope,
            CacheEntry {
                index: Arc::clone(&index),
                generations,
                built: Instant::now(),
            },
        );
        Ok(index)
    }

    /// Makes room for `incoming`: drops expired entries, then the oldest
    /// ones while the cache is full.
    fn evict(&self, entries: &mut HashMap<TreeScope, CacheEntry>, incoming: &TreeScope) {
        let before = entries.len();
        entries.retain(|scope, entry| scope == incoming || entry.built.elapsed() < self.ttl);

        while entries.len() >= self.max_scopes && !entries.contains_key(incoming) {
            let oldest = entries
                .iter()
                .min_by_key(|(_, entry)| entry.built)
                .map(|(scope, _)| scope.clone());
            match oldest {
                Some(scope) => {
                    entries.remove(&scope);
                }
                None => break,
            }
        }

        let dropped = before - entries.len();
        if dropped > 0 {
            debug!("Evicted {} cached scope(s)", dropped);
        }
    }

    /// Drops every cached scope covering `tree`. Returns how many went.
    pub fn invalidate(&self, tree: &TreeId) -> usize {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|scope, _| !scope.contains(tree));
        let dropped = before - entries.len();
        if dropped > 0 {
            info!("Invalidated {} cached scope(s) for tree {}", dropped, tree);
        }
        dropped
    }

    /// Scopes with a cached index, in display order.
    pub fn cached_scopes(&self) -> Vec<TreeScope> {
        let mut scopes: Vec<TreeScope> = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        scopes.sort_by_key(|scope| scope.to_string());
        scopes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kinship_core::{ParentChildEdge, Person};
    use tempfile::tempdir;

    fn family(names: &[&str]) -> TreeSnapshot {
        TreeSnapshot {
            persons: names.iter().map(|id| Person::new(*id, *id)).collect(),
            parent_child_edges: names
                .windows(2)
                .map(|pair| ParentChildEdge::biological(pair[0], pair[1]))
                .collect(),
            union_edges: Vec::new(),
        }
    }

    fn tree(id: &str) -> TreeId {
        TreeId::new(id)
    }

    #[test]
    fn test_cache_reuses_index() {
        let source = MemorySource::new();
        source.put("t1", family(&["a", "b"]));
        let cache = IndexCache::new(source, Duration::from_secs(60));

        let first = cache.get(&TreeScope::Tree(tree("t1"))).unwrap();
        let second = cache.get(&TreeScope::Tree(tree("t1"))).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_generation_bump_rebuilds() {
        let source = MemorySource::new();
        source.put("t1", family(&["a", "b"]));
        let cache = IndexCache::new(source, Duration::from_secs(60));

        let before = cache.get(&TreeScope::Tree(tree("t1"))).unwrap();
        cache.source().put("t1", family(&["a", "b", "c"]));
        let after = cache.get(&TreeScope::Tree(tree("t1"))).unwrap();

        assert_eq!(before.person_count(), 2);
        assert_eq!(after.person_count(), 3);
    }

    #[test]
    fn test_zero_ttl_always_rebuilds() {
        let source = MemorySource::new();
        source.put("t1", family(&["a"]));
        let cache = IndexCache::new(source, Duration::ZERO);

        let first = cache.get(&TreeScope::Tree(tree("t1"))).unwrap();
        let second = cache.get(&TreeScope::Tree(tree("t1"))).unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_merged_scope_and_invalidate() {
        let source = MemorySource::new();
        source.put("t1", family(&["a", "b"]));
        source.put("t2", family(&["b", "c"]));
        let cache = IndexCache::new(source, Duration::from_secs(60));

        let scope = TreeScope::merged([tree("t2"), tree("t1")]);
        let merged = cache.get(&scope).unwrap();
        assert_eq!(merged.person_count(), 3);
        cache.get(&TreeScope::Tree(tree("t1"))).unwrap();
        cache.get(&TreeScope::Tree(tree("t2"))).unwrap();
        assert_eq!(cache.cached_scopes().len(), 3);

        assert_eq!(cache.invalidate(&tree("t1")), 2);
        assert_eq!(cache.cached_scopes(), vec![TreeScope::Tree(tree("t2"))]);
    }

    #[test]
    fn test_expired_scopes_are_dropped_on_insert() {
        let source = MemorySource::new();
        source.put("t1", family(&["a"]));
        source.put("t2", family(&["b"]));
        let cache = IndexCache::new(source, Duration::from_millis(20));

        cache.get(&TreeScope::Tree(tree("t1"))).unwrap();
        std::thread::sleep(Duration::from_millis(40));
        cache.get(&TreeScope::Tree(tree("t2"))).unwrap();

        assert_eq!(cache.cached_scopes(), vec![TreeScope::Tree(tree("t2"))]);
    }

    #[test]
    fn test_scope_cap_evicts_oldest() {
        let source = MemorySource::new();
        for id in ["t1", "t2", "t3"] {
            source.put(id, family(&[id]));
        }
        let cache = IndexCache::new(source, Duration::from_secs(60)).with_max_scopes(2);

        cache.get(&TreeScope::Tree(tree("t1"))).unwrap();
        std::thread::sleep(Duration::from_millis(5));
        cache.get(&TreeScope::merged([tree("t1"), tree("t2")])).unwrap();
        std::thread::sleep(Duration::from_millis(5));
        cache.get(&TreeScope::Tree(tree("t3"))).unwrap();

        assert_eq!(
            cache.cached_scopes(),
            vec![
                TreeScope::merged([tree("t1"), tree("t2")]),
                TreeScope::Tree(tree("t3")),
            ]
        );
    }

    #[test]
    fn test_unknown_tree_and_empty_scope() {
        let cache = IndexCache::new(MemorySource::new(), Duration::from_secs(60));
        assert!(matches!(
            cache.get(&TreeScope::Tree(tree("nope"))),
            Err(ResolveError::UnknownTree(_))
        ));
        assert!(matches!(
            cache.get(&TreeScope::Merged(Vec::new())),
            Err(ResolveError::EmptyScope)
        ));
    }

    #[test]
    fn test_directory_source() {
        let dir = tempdir().unwrap();
        let doc = serde_json::to_string(&family(&["x", "y"])).unwrap();
        fs::write(dir.path().join("smiths.json"), doc).unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let source = DirectorySource::new(dir.path());
        assert_eq!(source.trees().unwrap(), vec![tree("smiths")]);
        assert_eq!(source.snapshot(&tree("smiths")).unwrap().persons.len(), 2);
        assert!(source.generation(&tree("smiths")).unwrap() > 0);
        assert!(matches!(
            source.snapshot(&tree("../smiths")),
            Err(ResolveError::UnknownTree(_))
        ));
        assert!(matches!(
            source.snapshot(&tree("jones")),
            Err(ResolveError::UnknownTree(_))
        ));
    }
}
