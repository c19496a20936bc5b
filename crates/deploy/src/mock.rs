//! In-memory [`FileStore`] for placement and upload tests.
//!
//! Directory hints are honored only when listed in `honored_hints`; any
//! other hint is answered with a 404, and the hintless upload target drops
//! files in the store root, as the real panel does.

use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;

use craftdeploy_file_store::{FileStore, FileStoreError, StoreFuture};
use craftdeploy_protocol::panel::FileAttributes;

pub(crate) const ROOT: &str = "/";

#[derive(Debug, Default)]
pub(crate) struct State {
    /// Directory path (`/`, `/mods`) to its entries.
    pub dirs: BTreeMap<String, Vec<FileAttributes>>,
    pub calls: Vec<String>,
}

pub(crate) struct MockStore {
    pub state: Mutex<State>,
    /// Hint query values (`%2Fmods`, `/mods`, `mods`) the store accepts.
    pub honored_hints: HashSet<String>,
    /// Absolute paths listable by their plain form, besides `/mods`.
    pub listable_paths: HashSet<String>,
    /// Hints that list fine but whose upload target still lands in root.
    pub misrouted_hints: HashSet<String>,
    pub fail_upload: bool,
    pub fail_rename: bool,
    pub fail_root_list: bool,
    pub fail_create_folder: bool,
    /// Upload succeeds but the file never shows up anywhere.
    pub lose_uploads: bool,
    pub fail_delete: HashSet<String>,
}

pub(crate) fn file(name: &str) -> FileAttributes {
    FileAttributes {
        name: name.to_string(),
        is_file: true,
        size: 1,
        modified_at: None,
    }
}

pub(crate) fn folder(name: &str) -> FileAttributes {
    FileAttributes {
        name: name.to_string(),
        is_file: false,
        size: 0,
        modified_at: None,
    }
}

fn api(status: u16) -> FileStoreError {
    FileStoreError::Api {
        status,
        body: String::new(),
    }
}

impl MockStore {
    /// A store honoring every `/mods` hint, with an existing `/mods` folder.
    pub fn cooperative() -> Self {
        let store = Self::hostile();
        store.seed(ROOT, vec![folder("mods")]);
        store.seed("/mods", Vec::new());
        Self {
            honored_hints: ["%2Fmods", "/mods", "mods"].map(String::from).into(),
            ..store
        }
    }

    /// A store rejecting every directory hint.
    pub fn hostile() -> Self {
        Self {
            state: Mutex::new(State::default()),
            honored_hints: HashSet::new(),
            listable_paths: HashSet::new(),
            misrouted_hints: HashSet::new(),
            fail_upload: false,
            fail_rename: false,
            fail_root_list: false,
            fail_create_folder: false,
            lose_uploads: false,
            fail_delete: HashSet::new(),
        }
    }

    pub fn seed(&self, dir: &str, entries: Vec<FileAttributes>) {
        self.state.lock().unwrap().dirs.insert(dir.to_string(), entries);
    }

    pub fn names_in(&self, dir: &str) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .dirs
            .get(dir)
            .map(|entries| entries.iter().map(|e| e.name.clone()).collect())
            .unwrap_or_default()
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    fn record(&self, call: String) {
        self.state.lock().unwrap().calls.push(call);
    }

    fn hint_dir(&self, hint: Option<&str>) -> Result<String, FileStoreError> {
        match hint {
            None => Ok(ROOT.to_string()),
            Some(h) if self.honored_hints.contains(h) => Ok("/mods".to_string()),
            Some(h) if self.listable_paths.contains(h) => Ok(h.to_string()),
            Some(_) => Err(api(404)),
        }
    }
}

fn join(root: &str, rel: &str) -> (String, String) {
    let full = format!("{}/{}", root.trim_end_matches('/'), rel.trim_start_matches('/'));
    let (dir, name) = full.rsplit_once('/').unwrap_or(("", full.as_str()));
    let dir = if dir.is_empty() { ROOT } else { dir };
    (dir.to_string(), name.to_string())
}

impl FileStore for MockStore {
    fn list_directory(&self, directory: Option<&str>) -> StoreFuture<'_, Vec<FileAttributes>> {
        let directory = directory.map(str::to_string);
        Box::pin(async move {
            self.record(format!("list {}", directory.as_deref().unwrap_or("<root>")));
            if directory.is_none() && self.fail_root_list {
                return Err(api(500));
            }
            let dir = self.hint_dir(directory.as_deref())?;
            let state = self.state.lock().unwrap();
            state.dirs.get(&dir).cloned().ok_or_else(|| api(404))
        })
    }

    fn upload_target(&self, directory: Option<&str>) -> StoreFuture<'_, String> {
        let directory = directory.map(str::to_string);
        Box::pin(async move {
            self.record(format!("target {}", directory.as_deref().unwrap_or("<root>")));
            let mut dir = self.hint_dir(directory.as_deref())?;
            if directory.as_deref().is_some_and(|h| self.misrouted_hints.contains(h)) {
                dir = ROOT.to_string();
            }
            Ok(format!("mock://upload{dir}"))
        })
    }

    fn upload(&self, url: &str, file_name: &str, _bytes: &[u8]) -> StoreFuture<'_, ()> {
        let url = url.to_string();
        let file_name = file_name.to_string();
        Box::pin(async move {
            self.record(format!("upload {file_name}"));
            if self.fail_upload {
                return Err(api(413));
            }
            if self.lose_uploads {
                return Ok(());
            }
            let dir = url.trim_start_matches("mock://upload").to_string();
            let mut state = self.state.lock().unwrap();
            let entries = state.dirs.entry(dir).or_default();
            entries.retain(|e| e.name != file_name);
            entries.push(file(&file_name));
            Ok(())
        })
    }

    fn create_folder(&self, name: &str, path: &str) -> StoreFuture<'_, ()> {
        let name = name.to_string();
        let path = path.to_string();
        Box::pin(async move {
            self.record(format!("mkdir {name} in {path}"));
            if self.fail_create_folder {
                return Err(api(500));
            }
            let mut state = self.state.lock().unwrap();
            state.dirs.entry(path.clone()).or_default().push(folder(&name));
            let (dir, leaf) = join(&path, &name);
            state.dirs.entry(format!("{}/{}", dir.trim_end_matches('/'), leaf)).or_default();
            Ok(())
        })
    }

    fn rename(&self, root: &str, from: &str, to: &str) -> StoreFuture<'_, ()> {
        let root = root.to_string();
        let from = from.to_string();
        let to = to.to_string();
        Box::pin(async move {
            self.record(format!("rename {root} {from} -> {to}"));
            if self.fail_rename {
                return Err(api(500));
            }
            let (src_dir, src_name) = join(&root, &from);
            let (dst_dir, dst_name) = join(&root, &to);
            let mut state = self.state.lock().unwrap();
            let src = state.dirs.get_mut(&src_dir).ok_or_else(|| api(404))?;
            let pos = src.iter().position(|e| e.name == src_name).ok_or_else(|| api(404))?;
            let mut entry = src.remove(pos);
            entry.name = dst_name;
            state.dirs.entry(dst_dir).or_default().push(entry);
            Ok(())
        })
    }

    fn delete(&self, root: &str, files: &[String]) -> StoreFuture<'_, ()> {
        let root = root.to_string();
        let files = files.to_vec();
        Box::pin(async move {
            self.record(format!("delete {root} {}", files.join(",")));
            if files.iter().any(|f| self.fail_delete.contains(f)) {
                return Err(api(500));
            }
            let mut state = self.state.lock().unwrap();
            if let Some(entries) = state.dirs.get_mut(&root) {
                entries.retain(|e| !files.contains(&e.name));
            }
            Ok(())
        })
    }

    fn server_id(&self) -> &str {
        "mock"
    }
}
