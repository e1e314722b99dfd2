//! # Landform Manager
//!
//! Loads landform definitions from versioned directories and keeps the
//! user's edits.
//!
//! ## Layering
//!
//! ```text
//!   <content>/Landforms-v1/*.toml        shipped, lowest priority first
//!   <config>/CustomLandforms-v1/*.toml   user edits and custom landforms
//! ```
//!
//! Later layers replace earlier ones by id. A file that fails to parse is
//! logged and skipped; it never aborts the load.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use landforge_core::{LandformError, LandformResult};
use tracing::{debug, info, warn};

use crate::definition::{LandformDefinition, LandformManifest};
use crate::landform::Landform;

/// Version of the definition directory layout.
pub const CURRENT_VERSION: u32 = 1;

/// Id of the landform created when nothing else loads.
pub const FALLBACK_ID: &str = "NewLandform";

/// Directory of shipped landforms under `root`.
#[must_use]
pub fn landforms_dir(root: &Path, version: u32) -> PathBuf {
    root.join(format!("Landforms-v{version}"))
}

/// Directory of user landforms under `config_root`.
#[must_use]
pub fn custom_landforms_dir(config_root: &Path, version: u32) -> PathBuf {
    config_root.join(format!("CustomLandforms-v{version}"))
}

/// Landforms keyed by id.
pub type LandformMap = BTreeMap<String, Landform>;

/// Owns every loaded landform.
#[derive(Debug)]
pub struct LandformManager {
    source_dirs: Vec<PathBuf>,
    custom_dir: PathBuf,
    landforms: LandformMap,
    upgradable: Vec<String>,
}

impl LandformManager {
    /// Creates a manager over `content_roots` (lowest priority first) and a
    /// user config root. Roots without a landform directory are ignored.
    /// Nothing is loaded until [`load_all`](Self::load_all).
    #[must_use]
    pub fn new(content_roots: &[PathBuf], config_root: &Path) -> Self {
        let source_dirs = content_roots
            .iter()
            .map(|root| landforms_dir(root, CURRENT_VERSION))
            .filter(|dir| dir.is_dir())
            .collect();
        Self {
            source_dirs,
            custom_dir: custom_landforms_dir(config_root, CURRENT_VERSION),
            landforms: LandformMap::new(),
            upgradable: Vec::new(),
        }
    }

    /// The shipped landform directories in load order.
    #[must_use]
    pub fn source_dirs(&self) -> &[PathBuf] {
        &self.source_dirs
    }

    /// The user landform directory.
    #[must_use]
    pub fn custom_dir(&self) -> &Path {
        &self.custom_dir
    }

    // =========================================================================
    // Loading
    // =========================================================================

    /// Loads every `*.toml` definition in `dir` whose file stem ends with
    /// `filter`, on top of `fallback`.
    ///
    /// When nothing at all is loaded and a fallback map was given, an empty
    /// custom landform named [`FALLBACK_ID`] is created.
    #[must_use]
    pub fn load_directory(dir: &Path, fallback: Option<LandformMap>, filter: &str) -> LandformMap {
        let has_fallback = fallback.is_some();
        let mut landforms = fallback.unwrap_or_default();

        for path in definition_files(dir) {
            let matches = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .is_some_and(|stem| stem.ends_with(filter));
            if !matches {
                continue;
            }

            match load_file(&path) {
                Ok(landform) if landform.id().is_empty() => {
                    warn!(file = %path.display(), "Skipping landform without an id");
                }
                Ok(landform) => {
                    debug!(file = %path.display(), id = landform.id(), "Loaded landform");
                    landforms.insert(landform.id().to_string(), landform);
                }
                Err(error) => {
                    warn!(file = %path.display(), %error, "Failed to load landform, skipping");
                }
            }
        }

        if landforms.is_empty() && has_fallback {
            let mut manifest = LandformManifest::new(FALLBACK_ID);
            manifest.display_name = Some(FALLBACK_ID.to_string());
            manifest.is_custom = true;
            landforms.insert(FALLBACK_ID.to_string(), Landform::new(manifest));
        }

        landforms
    }

    /// Loads the shipped layers, then the user layer, and makes the result
    /// current.
    pub fn load_all(&mut self) {
        let (landforms, upgradable) = self.load_layers("", true);
        info!(
            sources = ?self.source_dirs,
            landforms = landforms.len(),
            edited = landforms.values().filter(|l| l.manifest.is_edited).count(),
            custom = landforms.values().filter(|l| l.manifest.is_custom).count(),
            upgradable = upgradable.len(),
            "Loaded landforms"
        );
        self.landforms = landforms;
        self.upgradable = upgradable;
    }

    fn load_layers(&self, filter: &str, include_custom: bool) -> (LandformMap, Vec<String>) {
        let mut shipped: Option<LandformMap> = None;
        for dir in &self.source_dirs {
            shipped = Some(Self::load_directory(dir, shipped, filter));
        }
        let mut shipped = shipped.unwrap_or_default();
        for landform in shipped.values_mut() {
            landform.manifest.is_edited = false;
            landform.manifest.is_custom = false;
        }

        if !include_custom {
            return (shipped, Vec::new());
        }

        let revisions: Vec<(String, u32)> = shipped
            .values()
            .map(|l| (l.id().to_string(), l.manifest.revision_version))
            .collect();
        let merged = Self::load_directory(&self.custom_dir, Some(shipped), filter);
        let upgradable = revisions
            .into_iter()
            .filter(|(id, revision)| merged.get(id).is_some_and(|l| l.manifest.revision_version < *revision))
            .map(|(id, _)| id)
            .collect();

        (merged, upgradable)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Every current landform, by id.
    #[must_use]
    pub fn landforms(&self) -> &LandformMap {
        &self.landforms
    }

    /// The landform with `id`.
    #[must_use]
    pub fn find_by_id(&self, id: &str) -> Option<&Landform> {
        self.landforms.get(id)
    }

    /// The landform with `id`, for editing.
    pub fn find_by_id_mut(&mut self, id: &str) -> Option<&mut Landform> {
        self.landforms.get_mut(id)
    }

    /// Edited copies whose shipped revision has since moved on.
    #[must_use]
    pub fn upgradable(&self) -> &[String] {
        &self.upgradable
    }

    // =========================================================================
    // Editing
    // =========================================================================

    /// Copies a landform under a fresh id ending in `Copy`.
    ///
    /// # Errors
    ///
    /// Returns `LandformNotFound` for an unknown id, or `InvalidDefinition` if
    /// the copy cannot be rebuilt.
    pub fn duplicate(&mut self, id: &str) -> LandformResult<&mut Landform> {
        let original = self.find_by_id(id).ok_or_else(|| LandformError::LandformNotFound(id.to_string()))?;
        let mut copy = Landform::from_definition(original.to_definition(), id)?;

        let mut new_id = format!("{id}Copy");
        while self.landforms.contains_key(&new_id) {
            new_id.push_str("Copy");
        }

        copy.manifest.id = new_id.clone();
        copy.manifest.is_custom = true;
        copy.manifest.is_edited = true;
        copy.manifest.time_created = unix_millis();
        Ok(self.landforms.entry(new_id).or_insert(copy))
    }

    /// Moves a landform to `new_id`, prefixing `New` until the id is free.
    /// Returns the id actually used.
    ///
    /// # Errors
    ///
    /// Returns `LandformNotFound` for an unknown id.
    pub fn rename(&mut self, id: &str, new_id: &str) -> LandformResult<String> {
        let mut landform = self
            .landforms
            .remove(id)
            .ok_or_else(|| LandformError::LandformNotFound(id.to_string()))?;

        let mut new_id = new_id.to_string();
        while self.landforms.contains_key(&new_id) {
            new_id.insert_str(0, "New");
        }

        landform.manifest.id = new_id.clone();
        self.landforms.insert(new_id.clone(), landform);
        Ok(new_id)
    }

    /// Forgets a landform. Its file goes away on the next save.
    pub fn delete(&mut self, id: &str) -> Option<Landform> {
        self.landforms.remove(id)
    }

    /// Replaces a landform with its shipped version. A landform with no
    /// shipped version is left as it is.
    ///
    /// # Errors
    ///
    /// Returns `LandformNotFound` for an unknown id.
    pub fn reset(&mut self, id: &str) -> LandformResult<&Landform> {
        if !self.landforms.contains_key(id) {
            return Err(LandformError::LandformNotFound(id.to_string()));
        }

        let (mut shipped, _) = self.load_layers(id, false);
        if !shipped.contains_key(id) {
            shipped = self.load_layers("", false).0;
        }
        if let Some(original) = shipped.remove(id) {
            self.landforms.insert(id.to_string(), original);
        }
        self.upgradable.retain(|u| u != id);

        self.find_by_id(id).ok_or_else(|| LandformError::LandformNotFound(id.to_string()))
    }

    /// Discards every edit and custom landform.
    pub fn reset_all(&mut self) {
        self.landforms = self.load_layers("", false).0;
        self.upgradable.clear();
    }

    // =========================================================================
    // Saving
    // =========================================================================

    /// Writes every edited or custom landform to the user directory as
    /// `Landform{id}.toml` and deletes the files of landforms that no longer
    /// need one. Returns the number of files written.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the directory or a file cannot be written, or
    /// `InvalidDefinition` if a landform cannot be serialised.
    pub fn save_all_edited(&self) -> LandformResult<usize> {
        let dir = &self.custom_dir;
        fs::create_dir_all(dir).map_err(|e| LandformError::io(dir, &e))?;
        let mut stale = definition_files(dir);
        let mut written = 0;

        for (id, landform) in &self.landforms {
            if !(landform.manifest.is_edited || landform.manifest.is_custom) {
                continue;
            }
            let path = dir.join(format!("Landform{id}.toml"));
            let text = landform.to_definition().to_toml_string()?;
            fs::write(&path, text).map_err(|e| LandformError::io(&path, &e))?;
            stale.retain(|p| *p != path);
            written += 1;
        }

        for path in stale {
            debug!(file = %path.display(), "Removing stale landform file");
            fs::remove_file(&path).map_err(|e| LandformError::io(&path, &e))?;
        }

        Ok(written)
    }
}

fn load_file(path: &Path) -> LandformResult<Landform> {
    let text = fs::read_to_string(path).map_err(|e| LandformError::io(path, &e))?;
    let source_name = path.display().to_string();
    let definition = LandformDefinition::from_toml_str(&text, &source_name)?;
    Landform::from_definition(definition, &source_name)
}

/// `*.toml` files in `dir`, sorted by name. A missing directory has none.
fn definition_files(dir: &Path) -> Vec<PathBuf> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(error) => {
            debug!(dir = %dir.display(), %error, "Landform directory not readable");
            return Vec::new();
        }
    };
    let mut files: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "toml"))
        .collect();
    files.sort();
    files
}

fn unix_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_millis() as i64)
}
