//! # B+-tree
//!
//! The tree coordinates page-level operations through the pager. It holds
//! only the root [`PageRef`] and a key count; all structure lives in the page
//! arena.
//!
//! ## Shape
//!
//! The root is always an internal page, even when the tree is empty — a
//! fresh tree is an internal root whose first-child slot points at one empty
//! leaf. Keeping the root internal makes promote-on-split uniform: growing
//! the tree is just "allocate a new internal root, point its first child at
//! the old root, retry the insert against the new two-page path".
//!
//! ```text
//!                 [internal root]
//!                 /      |       \
//!          [leaf A] -> [leaf B] -> [leaf C]      (sibling chain)
//! ```
//!
//! ## Write paths
//!
//! Random [`Btree::put`] descends root-to-leaf by binary search, collecting
//! the ref path. A full leaf splits in half and the separator key bubbles up
//! the path, splitting parents as needed.
//!
//! In-order [`Btree::put_next`] walks the rightmost spine instead and, when
//! the rightmost leaf fills, allocates a fresh sibling rather than splitting:
//! nothing is copied, the old leaf stays full, and sorted bulk loads converge
//! on ~100% leaf fill. Keys must arrive strictly increasing; the spine walk
//! asserts this and panics on violation.
//!
//! Values go to the log-structured heap in both paths; replacing or
//! appending to a key writes a new blob and orphans the old one.
//!
//! ## Reads
//!
//! [`Btree::get`] is a descent plus one heap lookup. [`Btree::start`] returns
//! a fused iterator that walks the leaf sibling chain and stops permanently
//! at the first key outside the requested prefix. Yielded slices alias page
//! and heap storage: they are valid until the next mutating call, which the
//! borrow checker enforces.
//!
//! ## Audit
//!
//! [`Btree::check_consistency`] is an offline-style structural audit: it
//! walks the leaf chain checking strict ordering and the key count, then
//! recurses over the page graph checking intra-page ordering, ref validity,
//! separator bounds, and that no page is referenced twice.

use std::io;
use std::iter::FusedIterator;

use eyre::{ensure, Result};
use hashbrown::HashSet;
use smallvec::{smallvec, SmallVec};
use tracing::{debug, trace};

use super::page::{Page, PageIter};
use super::pager::{BtreeStats, Pager, PageRef};
use crate::keys::key_less;
use crate::values::ValueRef;

/// Root-to-leaf ref path. Eight levels deep covers far more keys than fit in
/// memory, so the vector stays on the stack.
type Path = SmallVec<[PageRef; 8]>;

/// In-memory B+-tree over byte-string keys and values.
pub struct Btree {
    pager: Pager,
    root: PageRef,
    size: u64,
}

impl Btree {
    /// Creates the minimum viable tree: an internal root over one empty leaf.
    pub fn new() -> Self {
        let mut pager = Pager::new();
        let (root, _) = pager.new_page(false);
        let (leaf, _) = pager.new_page(true);
        pager.page_mut(root).set_first(leaf as i32);

        Self {
            pager,
            root,
            size: 0,
        }
    }

    /// Walks from the root to the leaf that owns `key`. Returns the visited
    /// ref path (root first, leaf last) and the leaf's value ref when the
    /// key is present.
    fn locate(&self, key: &[u8]) -> (Path, Option<ValueRef>) {
        let mut path: Path = smallvec![self.root];

        loop {
            let page = self.pager.page(*path.last().unwrap());
            let (pos, found) = page.search(key);

            if page.is_leaf() {
                let hit = found.then(|| page.get_key(pos).1);
                return (path, hit);
            }

            // exact separator match descends right (keys >= separator);
            // otherwise the bracketing child is one slot to the left
            let slot = if found { pos } else { pos - 1 };
            let (_, child) = page.get_key(slot);
            debug_assert!(child >= 0, "descent through an unset child ref");
            path.push(child as PageRef);
        }
    }

    /// Point lookup. Returns a slice aliasing the value heap, valid until the
    /// next mutating call. Panics on an empty key.
    pub fn get(&self, key: &[u8]) -> Option<&[u8]> {
        assert!(!key.is_empty(), "empty key");
        let (_, hit) = self.locate(key);
        hit.map(|vref| self.pager.value(vref))
    }

    /// Inserts or replaces `key`. Returns true when an existing value was
    /// replaced (the old blob is orphaned in the heap). Panics on an empty
    /// key or value.
    pub fn put(&mut self, key: &[u8], value: &[u8]) -> bool {
        assert!(!key.is_empty() && !value.is_empty(), "empty key or value");

        let (path, hit) = self.locate(key);
        let leaf_ref = *path.last().unwrap();
        let vref = self.pager.put_value(value);

        if hit.is_some() {
            let ok = self.pager.page_mut(leaf_ref).insert(key, vref);
            debug_assert!(ok, "replacing a present key cannot fail");
            return true;
        }

        if !self.pager.page_mut(leaf_ref).insert(key, vref) {
            self.split_insert(key, vref, &path);
        }
        self.size += 1;
        false
    }

    /// Splits the page at the end of `path` and re-inserts `(key, slot_ref)`
    /// into whichever half it belongs to, propagating the separator upward
    /// and growing a new root when the split reaches it.
    fn split_insert(&mut self, key: &[u8], slot_ref: i32, path: &[PageRef]) {
        let page_ref = path[path.len() - 1];
        let parent_ref = path[path.len() - 2];

        let leaf = self.pager.page(page_ref).is_leaf();
        let (new_ref, _) = self.pager.new_page(leaf);
        let (page, new_page) = self.pager.page_pair_mut(page_ref, new_ref);

        let separator = page.split(new_page);
        new_page.set_next_page(page.next_page());
        page.set_next_page(Some(new_ref));

        debug!(page = page_ref, sibling = new_ref, leaf, "split page");

        // space is guaranteed on both sides after a split
        let target = if key_less(key, &separator) {
            page
        } else {
            new_page
        };
        let ok = target.insert(key, slot_ref);
        debug_assert!(ok, "a freshly split page rejected one key");

        if self
            .pager
            .page_mut(parent_ref)
            .insert(&separator, new_ref as i32)
        {
            return;
        }

        if parent_ref == self.root {
            let old_root = self.grow_root();
            self.split_insert(&separator, new_ref as i32, &[self.root, old_root]);
        } else {
            self.split_insert(&separator, new_ref as i32, &path[..path.len() - 1]);
        }
    }

    /// Installs a new internal root over the current one and returns the old
    /// root's ref.
    fn grow_root(&mut self) -> PageRef {
        let old_root = self.root;
        let (new_root, page) = self.pager.new_page(false);
        page.set_first(old_root as i32);
        self.root = new_root;
        debug!(root = new_root, "grew tree by one level");
        old_root
    }

    /// Bulk in-order insert. `key` must sort strictly after every key already
    /// in the tree; panics otherwise. When the rightmost leaf fills, a fresh
    /// sibling is appended instead of splitting, so sorted input packs leaves
    /// to capacity.
    pub fn put_next(&mut self, key: &[u8], value: &[u8]) {
        assert!(!key.is_empty() && !value.is_empty(), "empty key or value");

        let mut path: Path = smallvec![self.root];
        let mut page = self.pager.page(self.root);
        while !page.is_leaf() {
            let (last, child) = page.get_key(page.size() - 1);
            assert!(
                key_less(last, key),
                "out of order put: {:?} does not sort after {:?}",
                key,
                last
            );
            path.push(child as PageRef);
            page = self.pager.page(child as PageRef);
        }
        if page.size() > 0 {
            let (last, _) = page.get_key(page.size() - 1);
            assert!(
                key_less(last, key),
                "out of order put: {:?} does not sort after {:?}",
                key,
                last
            );
        }

        let leaf_ref = *path.last().unwrap();
        let vref = self.pager.put_value(value);
        if !self.pager.page_mut(leaf_ref).insert(key, vref) {
            self.append_page(key, vref, &path);
        }
        self.size += 1;
    }

    /// Appends a fresh rightmost page at the level of `path`'s last entry and
    /// records `(key, slot_ref)` there, recursing upward when the parent is
    /// full. Cheaper than a split: the full page is left untouched.
    fn append_page(&mut self, key: &[u8], slot_ref: i32, path: &[PageRef]) {
        let page_ref = path[path.len() - 1];
        let parent_ref = path[path.len() - 2];

        let leaf = self.pager.page(page_ref).is_leaf();
        let (new_ref, new_page) = self.pager.new_page(leaf);
        if leaf {
            let ok = new_page.insert(key, slot_ref);
            debug_assert!(ok, "an empty leaf rejected one key");
        } else {
            new_page.set_first(slot_ref);
        }
        self.pager.page_mut(page_ref).set_next_page(Some(new_ref));

        trace!(page = page_ref, sibling = new_ref, leaf, "appended page");

        if self
            .pager
            .page_mut(parent_ref)
            .insert(key, new_ref as i32)
        {
            return;
        }

        if parent_ref == self.root {
            let old_root = self.grow_root();
            self.append_page(key, new_ref as i32, &[self.root, old_root]);
        } else {
            self.append_page(key, new_ref as i32, &path[..path.len() - 1]);
        }
    }

    /// Appends `value` to the key's existing value, or stores it as-is when
    /// the key is absent. The previous blob is orphaned. Panics on an empty
    /// key or value.
    pub fn append(&mut self, key: &[u8], value: &[u8]) {
        assert!(!key.is_empty() && !value.is_empty(), "empty key or value");

        let (path, hit) = self.locate(key);
        match hit {
            Some(vref) => {
                let leaf_ref = *path.last().unwrap();
                let mut combined = self.pager.value(vref).to_vec();
                combined.extend_from_slice(value);
                let new_vref = self.pager.put_value(&combined);
                let ok = self.pager.page_mut(leaf_ref).insert(key, new_vref);
                debug_assert!(ok, "replacing a present key cannot fail");
            }
            None => {
                let replaced = self.put(key, value);
                debug_assert!(!replaced, "put of an absent key cannot replace");
            }
        }
    }

    /// Forward iterator over every `(key, value)` pair whose key starts with
    /// `prefix`, in ascending order. The empty prefix yields the whole tree.
    /// Once exhausted the iterator stays exhausted.
    pub fn start<'a>(&'a self, prefix: &'a [u8]) -> BtreeIter<'a> {
        let (path, _) = self.locate(prefix);
        let page = self.pager.page(*path.last().unwrap());

        BtreeIter {
            tree: self,
            prefix,
            page,
            entries: page.start(prefix),
            done: false,
        }
    }

    /// Number of distinct keys in the tree.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Number of pages on a root-to-leaf walk, root and leaf included. A
    /// fresh tree has height 2.
    pub fn height(&self) -> usize {
        let mut height = 1;
        let mut page = self.pager.page(self.root);
        while !page.is_leaf() {
            let first = page.first();
            debug_assert!(first >= 0, "descent through an unset child ref");
            page = self.pager.page(first as PageRef);
            height += 1;
        }
        height
    }

    pub fn stats(&self) -> BtreeStats {
        self.pager.stats()
    }

    /// Writes a tab-indented dump of the page graph, one line per slot.
    pub fn dump<W: io::Write>(&self, out: &mut W) -> io::Result<()> {
        self.dump_page(out, self.root, 0)
    }

    fn dump_page<W: io::Write>(&self, out: &mut W, page_ref: PageRef, depth: usize) -> io::Result<()> {
        let page = self.pager.page(page_ref);
        let pad = "\t".repeat(depth);
        writeln!(
            out,
            "{}page {}, leaf:{}, {} keys:",
            pad,
            page_ref,
            page.is_leaf(),
            page.size()
        )?;
        for i in 0..page.size() {
            let (key, slot_ref) = page.get_key(i);
            writeln!(out, "{}\t{}: {:?} -> {}", pad, i, key, slot_ref)?;
            if !page.is_leaf() && slot_ref >= 0 {
                self.dump_page(out, slot_ref as PageRef, depth + 1)?;
            }
        }
        Ok(())
    }

    /// Structural audit. Returns the first violation found: an empty key, an
    /// ordering inversion, a negative ref, a separator bound violation, a
    /// ref aliased by two parents, or a key count that disagrees with
    /// [`Btree::size`]. Read-only; never repairs.
    pub fn check_consistency(&self) -> Result<()> {
        let mut count = 0u64;
        let mut prev: Vec<u8> = Vec::new();
        for (key, _) in self.start(&[]) {
            ensure!(!key.is_empty(), "empty key in leaf chain");
            ensure!(
                key_less(&prev, key),
                "leaf chain ordering violation: {:?} >= {:?}",
                prev,
                key
            );
            prev = key.to_vec();
            count += 1;
        }
        ensure!(
            count == self.size,
            "leaf chain holds {} keys but size says {}",
            count,
            self.size
        );

        let mut seen: HashSet<PageRef> = HashSet::new();
        seen.insert(self.root);
        self.check_page(self.root, None, &mut seen)
    }

    fn check_page(
        &self,
        page_ref: PageRef,
        min_key: Option<&[u8]>,
        seen: &mut HashSet<PageRef>,
    ) -> Result<()> {
        let page = self.pager.page(page_ref);

        if page.is_leaf() {
            let mut prev: &[u8] = &[];
            for i in 0..page.size() {
                let (key, vref) = page.get_key(i);
                ensure!(!key.is_empty(), "empty key in leaf page {}", page_ref);
                ensure!(
                    key_less(prev, key),
                    "ordering violation in leaf page {}: {:?} >= {:?}",
                    page_ref,
                    prev,
                    key
                );
                ensure!(vref >= 0, "negative value ref in leaf page {}", page_ref);
                if let Some(min) = min_key {
                    ensure!(
                        !key_less(key, min),
                        "key {:?} in leaf page {} sorts below its parent separator {:?}",
                        key,
                        page_ref,
                        min
                    );
                }
                prev = key;
            }
            return Ok(());
        }

        ensure!(
            page.size() >= 1,
            "internal page {} lost its first-child slot",
            page_ref
        );
        let (sentinel, first) = page.get_key(0);
        ensure!(
            sentinel.is_empty(),
            "internal page {} slot 0 holds a user key",
            page_ref
        );
        ensure!(
            first >= 0 || page.size() == 1,
            "internal page {} has separators but no first child",
            page_ref
        );

        if first >= 0 {
            ensure!(
                seen.insert(first as PageRef),
                "page {} is referenced more than once",
                first
            );
            self.check_page(first as PageRef, min_key, seen)?;
        }

        let mut prev: &[u8] = &[];
        for i in 1..page.size() {
            let (key, child) = page.get_key(i);
            ensure!(
                key_less(prev, key),
                "ordering violation in internal page {}: {:?} >= {:?}",
                page_ref,
                prev,
                key
            );
            ensure!(child >= 0, "negative child ref in internal page {}", page_ref);
            if let Some(min) = min_key {
                ensure!(
                    !key_less(key, min),
                    "separator {:?} in page {} sorts below its parent separator {:?}",
                    key,
                    page_ref,
                    min
                );
            }
            ensure!(
                seen.insert(child as PageRef),
                "page {} is referenced more than once",
                child
            );
            self.check_page(child as PageRef, Some(key), seen)?;
            prev = key;
        }

        Ok(())
    }
}

impl Default for Btree {
    fn default() -> Self {
        Self::new()
    }
}

/// Fused iterator chaining leaf pages along the sibling chain. Created by
/// [`Btree::start`].
pub struct BtreeIter<'a> {
    tree: &'a Btree,
    prefix: &'a [u8],
    page: &'a Page,
    entries: PageIter<'a>,
    done: bool,
}

impl<'a> Iterator for BtreeIter<'a> {
    type Item = (&'a [u8], &'a [u8]);

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        if let Some((key, vref)) = self.entries.next() {
            return Some((key, self.tree.pager.value(vref)));
        }

        // end of page, or its remaining keys left the prefix: the sibling
        // either continues the prefix run or proves it over
        let Some(next_ref) = self.page.next_page() else {
            self.done = true;
            return None;
        };
        self.page = self.tree.pager.page(next_ref);
        self.entries = self.page.start(self.prefix);
        match self.entries.next() {
            Some((key, vref)) => Some((key, self.tree.pager.value(vref))),
            None => {
                self.done = true;
                None
            }
        }
    }
}

impl FusedIterator for BtreeIter<'_> {}
