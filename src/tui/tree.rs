//! Lazily expanded directory tree

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    pub path: PathBuf,
    pub name: String,
    pub depth: usize,
    pub is_dir: bool,
    pub expanded: bool,
}

#[derive(Debug)]
pub struct FileTree {
    root: PathBuf,
    entries: Vec<TreeEntry>,
    selected: usize,
}

/// Immediate children of `dir`: directories first, then case-insensitive by name
fn children(dir: &Path, depth: usize) -> Vec<TreeEntry> {
    let mut entries: Vec<TreeEntry> = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|e| TreeEntry {
            name: e.file_name().to_string_lossy().into_owned(),
            is_dir: e.file_type().is_dir(),
            path: e.into_path(),
            depth,
            expanded: false,
        })
        .collect();
    entries.sort_by(|a, b| {
        b.is_dir
            .cmp(&a.is_dir)
            .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
    });
    entries
}

impl FileTree {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let entries = children(&root, 0);
        Self {
            root,
            entries,
            selected: 0,
        }
    }

    pub fn entries(&self) -> &[TreeEntry] {
        &self.entries
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    /// Re-read the root, keeping expanded directories that still exist
    pub fn reload(&mut self) {
        let expanded: Vec<PathBuf> = self
            .entries
            .iter()
            .filter(|e| e.expanded)
            .map(|e| e.path.clone())
            .collect();
        self.entries = children(&self.root, 0);
        let mut i = 0;
        while i < self.entries.len() {
            if self.entries[i].is_dir && expanded.contains(&self.entries[i].path) {
                self.expand(i);
            }
            i += 1;
        }
        self.selected = self.selected.min(self.entries.len().saturating_sub(1));
    }

    pub fn up(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn down(&mut self) {
        if self.selected + 1 < self.entries.len() {
            self.selected += 1;
        }
    }

    /// Toggle a directory, or return the selected file
    pub fn activate(&mut self) -> Option<PathBuf> {
        let entry = self.entries.get(self.selected)?;
        if !entry.is_dir {
            return Some(entry.path.clone());
        }
        if entry.expanded {
            self.collapse(self.selected);
        } else {
            self.expand(self.selected);
        }
        None
    }

    fn expand(&mut self, index: usize) {
        let entry = &mut self.entries[index];
        entry.expanded = true;
        let kids = children(&entry.path, entry.depth + 1);
        self.entries.splice(index + 1..index + 1, kids);
    }

    fn collapse(&mut self, index: usize) {
        let depth = self.entries[index].depth;
        self.entries[index].expanded = false;
        let end = self.entries[index + 1..]
            .iter()
            .position(|e| e.depth <= depth)
            .map_or(self.entries.len(), |p| index + 1 + p);
        self.entries.drain(index + 1..end);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(tree: &FileTree) -> Vec<String> {
        tree.entries()
            .iter()
            .map(|e| format!("{}{}", "  ".repeat(e.depth), e.name))
            .collect()
    }

    #[test]
    fn directories_first_case_insensitive() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("b.py"), "").unwrap();
        std::fs::write(tmp.path().join("A.txt"), "").unwrap();
        std::fs::create_dir(tmp.path().join("zeta")).unwrap();
        std::fs::create_dir(tmp.path().join("Alpha")).unwrap();

        let tree = FileTree::new(tmp.path());
        assert_eq!(names(&tree), vec!["Alpha", "zeta", "A.txt", "b.py"]);
    }

    #[test]
    fn expand_collapse_and_select() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(tmp.path().join("src/inner")).unwrap();
        std::fs::write(tmp.path().join("src/main.py"), "").unwrap();
        std::fs::write(tmp.path().join("top.py"), "").unwrap();

        let mut tree = FileTree::new(tmp.path());
        assert_eq!(tree.activate(), None);
        assert_eq!(names(&tree), vec!["src", "  inner", "  main.py", "top.py"]);

        tree.down();
        tree.activate();
        assert_eq!(names(&tree).len(), 4);

        tree.down();
        assert_eq!(tree.activate(), Some(tmp.path().join("src/main.py")));

        tree.up();
        tree.up();
        tree.activate();
        assert_eq!(names(&tree), vec!["src", "top.py"]);
    }

    #[test]
    fn reload_keeps_expanded_dirs() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir(tmp.path().join("pkg")).unwrap();
        let mut tree = FileTree::new(tmp.path());
        tree.activate();
        std::fs::write(tmp.path().join("pkg/new.py"), "").unwrap();
        tree.reload();
        assert_eq!(names(&tree), vec!["pkg", "  new.py"]);
    }
}
