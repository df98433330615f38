// scf-core/src/keg.rs
use std::fs;
use std::path::{Component, Path, PathBuf};

use scf_common::config::Config;
use scf_common::error::{Result, ScfError};
use scf_common::model::Formula;
use tracing::{debug, warn};

/// A keg being populated by a build. The build writes into a hidden sibling
/// of the final keg; `commit` swaps it into place. An existing install at the
/// final path is untouched until then. Unless committed, the incomplete
/// directory is removed on drop.
#[derive(Debug)]
pub struct KegGuard {
    final_path: PathBuf,
    build_path: PathBuf,
    committed: bool,
}

impl KegGuard {
    pub fn prepare(final_path: PathBuf) -> Result<Self> {
        let build_path = sibling(&final_path, "incomplete")?;
        if build_path.exists() {
            debug!("Removing stale build dir {}", build_path.display());
            fs::remove_dir_all(&build_path)?;
        }
        if let Some(parent) = final_path.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(Self {
            final_path,
            build_path,
            committed: false,
        })
    }

    /// Where the build installs to.
    pub fn path(&self) -> &Path {
        &self.build_path
    }

    pub fn final_path(&self) -> &Path {
        &self.final_path
    }

    /// Moves the finished keg into place, replacing a previous install of the
    /// same version. If the swap fails the previous install is restored.
    pub fn commit(mut self) -> Result<PathBuf> {
        let previous = sibling(&self.final_path, "previous")?;
        if previous.exists() {
            fs::remove_dir_all(&previous)?;
        }
        let had_previous = self.final_path.exists();
        if had_previous {
            fs::rename(&self.final_path, &previous).map_err(|e| {
                ScfError::InstallError(format!(
                    "Failed to move aside existing keg {}: {}",
                    self.final_path.display(),
                    e
                ))
            })?;
        }
        if let Err(e) = fs::rename(&self.build_path, &self.final_path) {
            if had_previous {
                if let Err(restore) = fs::rename(&previous, &self.final_path) {
                    warn!(
                        "Failed to restore previous keg {}: {}",
                        self.final_path.display(),
                        restore
                    );
                }
            }
            return Err(ScfError::InstallError(format!(
                "Failed to move keg into {}: {}",
                self.final_path.display(),
                e
            )));
        }
        self.committed = true;
        if had_previous {
            if let Err(e) = fs::remove_dir_all(&previous) {
                warn!("Failed to remove replaced keg {}: {}", previous.display(), e);
            }
        }
        debug!("Committed keg {}", self.final_path.display());
        Ok(self.final_path.clone())
    }
}

impl Drop for KegGuard {
    fn drop(&mut self) {
        if self.committed || !self.build_path.exists() {
            return;
        }
        debug!("Removing incomplete keg {}", self.build_path.display());
        if let Err(e) = fs::remove_dir_all(&self.build_path) {
            warn!(
                "Failed to remove incomplete keg {}: {}",
                self.build_path.display(),
                e
            );
        }
    }
}

/// `Cellar/name/.0.1.0.<suffix>` next to `Cellar/name/0.1.0`.
fn sibling(keg_path: &Path, suffix: &str) -> Result<PathBuf> {
    let (Some(parent), Some(name)) = (keg_path.parent(), keg_path.file_name()) else {
        return Err(ScfError::InstallError(format!(
            "Invalid keg path {}",
            keg_path.display()
        )));
    };
    Ok(parent.join(format!(".{}.{suffix}", name.to_string_lossy())))
}

/// Path of the installed keg for `formula`, if present.
pub fn installed_keg(config: &Config, formula: &Formula) -> Result<PathBuf> {
    let keg = config.formula_keg_path(formula.name(), &formula.version_str()?);
    if keg.is_dir() {
        Ok(keg)
    } else {
        Err(ScfError::NotFound(format!(
            "{} {} is not installed (expected {})",
            formula.name(),
            formula.version_str()?,
            keg.display()
        )))
    }
}

/// Links every file in `<keg>/bin` into `bin_dir`. Existing links are only
/// replaced when they point into `cellar_dir`; anything else in the way fails
/// the whole operation before a link is touched. On error, links created so
/// far are removed again.
pub fn link_executables(keg_path: &Path, bin_dir: &Path, cellar_dir: &Path) -> Result<Vec<PathBuf>> {
    let keg_bin = keg_path.join("bin");
    if !keg_bin.is_dir() {
        debug!("No bin directory in keg {}, nothing to link", keg_path.display());
        return Ok(Vec::new());
    }
    fs::create_dir_all(bin_dir)?;

    let mut targets: Vec<PathBuf> = fs::read_dir(&keg_bin)?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| p.is_file())
        .collect();
    targets.sort();

    let mut plan = Vec::with_capacity(targets.len());
    for target in targets {
        let Some(file_name) = target.file_name() else {
            continue;
        };
        let link_path = bin_dir.join(file_name);
        check_link_slot(&link_path, cellar_dir)?;
        plan.push((target, link_path));
    }

    let mut created = Vec::new();
    for (target, link_path) in plan {
        if let Err(e) = replace_link(&target, &link_path) {
            for link in &created {
                let _ = fs::remove_file(link);
            }
            return Err(e);
        }
        debug!("Linked {} -> {}", link_path.display(), target.display());
        created.push(link_path);
    }
    Ok(created)
}

/// Ok when `link_path` is free or a symlink into `cellar_dir`.
fn check_link_slot(link_path: &Path, cellar_dir: &Path) -> Result<()> {
    let Ok(meta) = link_path.symlink_metadata() else {
        return Ok(());
    };
    if !meta.file_type().is_symlink() {
        return Err(ScfError::InstallError(format!(
            "Refusing to overwrite {}: not a link managed by scf",
            link_path.display()
        )));
    }
    let target = fs::read_link(link_path)?;
    let resolved = match link_path.parent() {
        Some(dir) if target.is_relative() => normalize(&dir.join(&target)),
        _ => normalize(&target),
    };
    if resolved.starts_with(normalize(cellar_dir)) {
        Ok(())
    } else {
        Err(ScfError::InstallError(format!(
            "Refusing to replace {}: it links to {}, outside {}",
            link_path.display(),
            target.display(),
            cellar_dir.display()
        )))
    }
}

fn replace_link(target: &Path, link_path: &Path) -> Result<()> {
    if link_path.symlink_metadata().is_ok() {
        fs::remove_file(link_path)?;
    }
    #[cfg(unix)]
    std::os::unix::fs::symlink(target, link_path)?;
    #[cfg(not(unix))]
    {
        fs::copy(target, link_path)?;
    }
    Ok(())
}

/// Lexically resolves `.` and `..`.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uncommitted_keg_is_removed() {
        let root = tempfile::tempdir().unwrap();
        let keg_path = root.path().join("Cellar/spacecleaner/0.1.0");
        let build_path;
        {
            let keg = KegGuard::prepare(keg_path.clone()).unwrap();
            build_path = keg.path().to_path_buf();
            fs::create_dir_all(keg.path().join("bin")).unwrap();
            fs::write(keg.path().join("bin/spacecleaner"), b"half-built").unwrap();
        }
        assert!(!build_path.exists());
        assert!(!keg_path.exists());
    }

    #[test]
    fn previous_install_survives_until_commit() {
        let root = tempfile::tempdir().unwrap();
        let keg_path = root.path().join("Cellar/spacecleaner/0.1.0");
        fs::create_dir_all(keg_path.join("bin")).unwrap();
        fs::write(keg_path.join("bin/spacecleaner"), b"old").unwrap();

        {
            let keg = KegGuard::prepare(keg_path.clone()).unwrap();
            assert_ne!(keg.path(), keg_path);
            fs::create_dir_all(keg.path().join("bin")).unwrap();
            fs::write(keg.path().join("bin/spacecleaner"), b"broken").unwrap();
        }
        assert_eq!(fs::read(keg_path.join("bin/spacecleaner")).unwrap(), b"old");

        let keg = KegGuard::prepare(keg_path.clone()).unwrap();
        fs::create_dir_all(keg.path().join("bin")).unwrap();
        fs::write(keg.path().join("bin/spacecleaner"), b"new").unwrap();
        assert_eq!(keg.commit().unwrap(), keg_path);
        assert_eq!(fs::read(keg_path.join("bin/spacecleaner")).unwrap(), b"new");

        let leftovers: Vec<_> = fs::read_dir(keg_path.parent().unwrap())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(leftovers, vec![std::ffi::OsString::from("0.1.0")]);
    }

    #[cfg(unix)]
    #[test]
    fn executables_are_linked_and_relinked() {
        let root = tempfile::tempdir().unwrap();
        let cellar = root.path().join("Cellar");
        let keg = cellar.join("spacecleaner/0.1.0");
        fs::create_dir_all(keg.join("bin")).unwrap();
        fs::write(keg.join("bin/spacecleaner"), b"#!/bin/sh\n").unwrap();
        let bin_dir = root.path().join("bin");

        let links = link_executables(&keg, &bin_dir, &cellar).unwrap();
        assert_eq!(links, vec![bin_dir.join("spacecleaner")]);
        assert_eq!(
            fs::read_link(&links[0]).unwrap(),
            keg.join("bin/spacecleaner")
        );
        assert_eq!(link_executables(&keg, &bin_dir, &cellar).unwrap().len(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn relative_links_into_the_cellar_are_replaced() {
        let root = tempfile::tempdir().unwrap();
        let cellar = root.path().join("Cellar");
        let keg = cellar.join("spacecleaner/0.1.0");
        fs::create_dir_all(keg.join("bin")).unwrap();
        fs::write(keg.join("bin/spacecleaner"), b"new").unwrap();
        let bin_dir = root.path().join("bin");
        fs::create_dir_all(&bin_dir).unwrap();
        std::os::unix::fs::symlink(
            "../Cellar/spacecleaner/0.0.9/bin/spacecleaner",
            bin_dir.join("spacecleaner"),
        )
        .unwrap();

        link_executables(&keg, &bin_dir, &cellar).unwrap();
        assert_eq!(
            fs::read_link(bin_dir.join("spacecleaner")).unwrap(),
            keg.join("bin/spacecleaner")
        );
    }

    #[cfg(unix)]
    #[test]
    fn foreign_files_are_not_overwritten() {
        let root = tempfile::tempdir().unwrap();
        let cellar = root.path().join("Cellar");
        let keg = cellar.join("spacecleaner/0.1.0");
        fs::create_dir_all(keg.join("bin")).unwrap();
        fs::write(keg.join("bin/spacecleaner"), b"new").unwrap();
        let bin_dir = root.path().join("bin");
        fs::create_dir_all(&bin_dir).unwrap();
        fs::write(bin_dir.join("spacecleaner"), b"someone else's").unwrap();

        assert!(matches!(
            link_executables(&keg, &bin_dir, &cellar),
            Err(ScfError::InstallError(_))
        ));
        assert_eq!(
            fs::read(bin_dir.join("spacecleaner")).unwrap(),
            b"someone else's"
        );
    }

    #[cfg(unix)]
    #[test]
    fn foreign_symlinks_are_not_replaced() {
        let root = tempfile::tempdir().unwrap();
        let cellar = root.path().join("Cellar");
        let keg = cellar.join("spacecleaner/0.1.0");
        fs::create_dir_all(keg.join("bin")).unwrap();
        fs::write(keg.join("bin/spacecleaner"), b"new").unwrap();
        fs::write(keg.join("bin/aaa-helper"), b"helper").unwrap();
        let elsewhere = root.path().join("elsewhere/spacecleaner");
        fs::create_dir_all(elsewhere.parent().unwrap()).unwrap();
        fs::write(&elsewhere, b"other tool").unwrap();
        let bin_dir = root.path().join("bin");
        fs::create_dir_all(&bin_dir).unwrap();
        std::os::unix::fs::symlink(&elsewhere, bin_dir.join("spacecleaner")).unwrap();

        let err = link_executables(&keg, &bin_dir, &cellar).unwrap_err();
        assert!(matches!(err, ScfError::InstallError(_)));
        assert_eq!(fs::read_link(bin_dir.join("spacecleaner")).unwrap(), elsewhere);
        // Nothing was linked before the conflict was found.
        assert!(!bin_dir.join("aaa-helper").exists());
    }
}
