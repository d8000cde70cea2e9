use crate::{Result, WorkspaceError};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// One member project of a monorepo, discovered from workspace manifests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspacePackage {
    pub name: String,
    pub root: PathBuf,
}

#[derive(Deserialize)]
struct PackageManifest {
    name: Option<String>,
    #[serde(default)]
    workspaces: Option<WorkspacesField>,
}

/// `workspaces` in package.json: either a glob array or `{ packages: [...] }`.
#[derive(Deserialize)]
#[serde(untagged)]
enum WorkspacesField {
    Globs(Vec<String>),
    Object { packages: Vec<String> },
}

impl WorkspacesField {
    fn globs(&self) -> &[String] {
        match self {
            Self::Globs(globs) | Self::Object { packages: globs } => globs,
        }
    }
}

#[derive(Deserialize)]
struct PnpmWorkspace {
    #[serde(default)]
    packages: Vec<String>,
}

/// Enumerate monorepo member packages from root-level manifests.
///
/// Sources, in order: `package.json` `workspaces`, then
/// `pnpm-workspace.yaml` `packages`. A root with neither yields an empty
/// list (single-project mode), not an error. Results are sorted by name.
#[tracing::instrument]
pub fn discover_packages(root: &Path) -> Result<Vec<WorkspacePackage>> {
    let mut globs: Vec<String> = Vec::new();

    let package_json = root.join("package.json");
    if package_json.is_file() {
        let manifest = read_package_manifest(&package_json)?;
        if let Some(workspaces) = &manifest.workspaces {
            globs.extend(workspaces.globs().iter().cloned());
        }
    }

    let pnpm_yaml = root.join("pnpm-workspace.yaml");
    if pnpm_yaml.is_file() {
        let content = std::fs::read_to_string(&pnpm_yaml).map_err(|source| WorkspaceError::Io {
            path: pnpm_yaml.clone(),
            source,
        })?;
        let manifest: PnpmWorkspace =
            serde_yaml::from_str(&content).map_err(|e| WorkspaceError::ManifestParse {
                path: pnpm_yaml.clone(),
                message: e.to_string(),
            })?;
        globs.extend(manifest.packages);
    }

    let mut packages = Vec::new();
    for pattern in &globs {
        // pnpm-style negations exclude directories matched earlier.
        if let Some(negated) = pattern.strip_prefix('!') {
            if let Ok(glob_pattern) = glob::Pattern::new(negated) {
                packages.retain(|pkg: &WorkspacePackage| {
                    let relative = pkg.root.strip_prefix(root).unwrap_or(&pkg.root);
                    !glob_pattern.matches_path(relative)
                });
            }
            continue;
        }

        let full_pattern = root.join(pattern).display().to_string();
        let Ok(paths) = glob::glob(&full_pattern) else {
            continue;
        };
        for dir in paths.filter_map(std::result::Result::ok).filter(|p| p.is_dir()) {
            let name = package_name(&dir)?;
            if !packages.iter().any(|p: &WorkspacePackage| p.root == dir) {
                packages.push(WorkspacePackage { name, root: dir });
            }
        }
    }

    packages.sort_by(|a, b| a.name.cmp(&b.name));
    tracing::debug!(packages = packages.len(), "workspace packages discovered");
    Ok(packages)
}

/// Resolve one named package, failing with the full package list when the
/// name is unknown.
pub fn find_package(root: &Path, name: &str) -> Result<WorkspacePackage> {
    let packages = discover_packages(root)?;
    packages
        .iter()
        .find(|pkg| pkg.name == name)
        .cloned()
        .ok_or_else(|| WorkspaceError::UnknownPackage {
            name: name.to_string(),
            available: packages.into_iter().map(|pkg| pkg.name).collect(),
        })
}

fn package_name(dir: &Path) -> Result<String> {
    let manifest_path = dir.join("package.json");
    if manifest_path.is_file() {
        let manifest = read_package_manifest(&manifest_path)?;
        if let Some(name) = manifest.name {
            return Ok(name);
        }
    }
    Ok(dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default())
}

fn read_package_manifest(path: &Path) -> Result<PackageManifest> {
    let content = std::fs::read_to_string(path).map_err(|source| WorkspaceError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|e| WorkspaceError::ManifestParse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}
