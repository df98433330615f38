// scf-core/src/extract.rs
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::{Component, Path, PathBuf};

use bzip2::read::BzDecoder;
use flate2::read::GzDecoder;
use scf_common::error::{Result, ScfError};
use scf_common::model::ArchiveKind;
use tar::Archive;
use tracing::{debug, error};
use xz2::read::XzDecoder;

fn open_decoder(archive_path: &Path, kind: ArchiveKind) -> Result<Box<dyn Read>> {
    let file = File::open(archive_path).map_err(|e| {
        ScfError::ExtractError(format!(
            "Failed to open archive {}: {}",
            archive_path.display(),
            e
        ))
    })?;
    let reader = BufReader::new(file);
    Ok(match kind {
        ArchiveKind::TarGz => Box::new(GzDecoder::new(reader)),
        ArchiveKind::TarBz2 => Box::new(BzDecoder::new(reader)),
        ArchiveKind::TarXz => Box::new(XzDecoder::new(reader)),
        ArchiveKind::Tar => Box::new(reader),
    })
}

/// Unpacks a source archive into `target_dir` and returns the source root.
///
/// Release tarballs usually wrap everything in one `name-version/` directory;
/// when that is the case the wrapper is stripped so the returned root is
/// `target_dir` itself either way.
pub fn unpack_source(archive_path: &Path, kind: ArchiveKind, target_dir: &Path) -> Result<PathBuf> {
    let strip_components = match infer_tar_root(open_decoder(archive_path, kind)?, archive_path)? {
        Some(root) => {
            debug!("Stripping single top-level directory '{}'", root.display());
            1
        }
        None => 0,
    };
    extract_archive(archive_path, kind, target_dir, strip_components)?;
    Ok(target_dir.to_path_buf())
}

fn infer_tar_root<R: Read>(reader: R, archive_path_for_log: &Path) -> Result<Option<PathBuf>> {
    let mut archive = Archive::new(reader);
    let mut unique_roots = HashSet::new();
    let mut has_nested_entries = false;

    for entry_result in archive.entries().map_err(|e| tar_error(archive_path_for_log, e))? {
        let entry = entry_result.map_err(|e| tar_error(archive_path_for_log, e))?;
        let path = entry
            .path()
            .map_err(|e| tar_error(archive_path_for_log, e))?
            .into_owned();

        let mut components = path
            .components()
            .filter(|c| !matches!(c, Component::CurDir));
        let Some(first) = components.next() else {
            continue;
        };
        let Component::Normal(name) = first else {
            debug!(
                "Non-standard top-level component ({:?}) in {}, cannot infer single root.",
                first,
                archive_path_for_log.display()
            );
            return Ok(None);
        };
        // GitHub archives carry a pax_global_header entry at the top level.
        if entry.header().entry_type().is_pax_global_extensions() {
            continue;
        }
        if components.next().is_some() {
            has_nested_entries = true;
        } else if !entry.header().entry_type().is_dir() {
            debug!(
                "Top-level file '{}' in {}, no single root.",
                path.display(),
                archive_path_for_log.display()
            );
            return Ok(None);
        }
        unique_roots.insert(PathBuf::from(name));
        if unique_roots.len() > 1 {
            debug!(
                "Multiple top-level items found in {}, cannot infer single root.",
                archive_path_for_log.display()
            );
            return Ok(None);
        }
    }

    if unique_roots.len() == 1 && has_nested_entries {
        Ok(unique_roots.into_iter().next())
    } else {
        if unique_roots.is_empty() {
            tracing::warn!(
                "Archive {} appears to be empty.",
                archive_path_for_log.display()
            );
        }
        Ok(None)
    }
}

fn tar_error(archive_path: &Path, e: io::Error) -> ScfError {
    ScfError::ExtractError(format!(
        "Error reading TAR entry from {}: {}",
        archive_path.display(),
        e
    ))
}

pub fn extract_archive(
    archive_path: &Path,
    kind: ArchiveKind,
    target_dir: &Path,
    strip_components: usize,
) -> Result<()> {
    debug!(
        "Extracting archive '{}' ({:?}) to '{}' (strip_components={})",
        archive_path.display(),
        kind,
        target_dir.display(),
        strip_components
    );
    fs::create_dir_all(target_dir).map_err(|e| {
        ScfError::ExtractError(format!(
            "Failed to create target directory {}: {}",
            target_dir.display(),
            e
        ))
    })?;

    let mut archive = Archive::new(open_decoder(archive_path, kind)?);
    archive.set_preserve_permissions(true);
    archive.set_overwrite(true);

    let canonical_target = target_dir.canonicalize()?;
    let mut errors: Vec<String> = Vec::new();
    for entry_result in archive.entries().map_err(|e| tar_error(archive_path, e))? {
        let mut entry = entry_result.map_err(|e| tar_error(archive_path, e))?;
        let entry_type = entry.header().entry_type();
        if entry_type.is_pax_global_extensions() {
            continue;
        }
        let original_path: PathBuf = entry
            .path()
            .map_err(|e| tar_error(archive_path, e))?
            .into_owned();

        let destination = match join_stripped(target_dir, &original_path, strip_components) {
            Stripped::Path(destination) => destination,
            Stripped::Unsafe => {
                errors.push(refuse(&original_path, archive_path, "path escapes the target"));
                continue;
            }
            Stripped::Empty => continue,
        };

        let parent = destination.parent().unwrap_or(target_dir);
        // An earlier symlink entry must not redirect later writes.
        if !resolves_inside(parent, &canonical_target)? {
            errors.push(refuse(&original_path, archive_path, "parent resolves outside the target"));
            continue;
        }
        fs::create_dir_all(parent).map_err(|e| {
            ScfError::ExtractError(format!(
                "Failed create parent dir {}: {}",
                parent.display(),
                e
            ))
        })?;

        let link_name = entry
            .link_name()
            .map_err(|e| tar_error(archive_path, e))?
            .map(|l| l.into_owned());

        if entry_type.is_symlink() {
            let Some(link) = link_name else {
                errors.push(refuse(&original_path, archive_path, "symlink without a target"));
                continue;
            };
            let resolved = normalize(&parent.join(&link));
            if link.is_absolute() || !resolved.starts_with(target_dir) {
                errors.push(refuse(&original_path, archive_path, "symlink points outside the target"));
                continue;
            }
        } else if entry_type.is_hard_link() {
            let source = match link_name
                .as_deref()
                .map(|l| join_stripped(target_dir, l, strip_components))
            {
                Some(Stripped::Path(source)) => source,
                _ => {
                    errors.push(refuse(&original_path, archive_path, "hard link escapes the target"));
                    continue;
                }
            };
            if destination.symlink_metadata().is_ok() {
                let _ = fs::remove_file(&destination);
            }
            if let Err(e) = fs::hard_link(&source, &destination) {
                let msg = format!(
                    "Failed to link {} to {}: {}",
                    destination.display(),
                    source.display(),
                    e
                );
                error!("{}", msg);
                errors.push(msg);
            }
            continue;
        }

        if let Err(e) = entry.unpack(&destination) {
            let msg = format!(
                "Failed to unpack entry {} to {}: {}",
                original_path.display(),
                destination.display(),
                e
            );
            error!("{}", msg);
            errors.push(msg);
        }
    }

    if !errors.is_empty() {
        return Err(ScfError::ExtractError(format!(
            "Failed during extraction of {} with {} error(s): {}",
            archive_path.display(),
            errors.len(),
            errors.join("; ")
        )));
    }
    debug!("Finished extraction of {}", archive_path.display());
    Ok(())
}

enum Stripped {
    /// Nothing left after stripping (the wrapper directory itself).
    Empty,
    /// Absolute or `..` components.
    Unsafe,
    Path(PathBuf),
}

/// `target_dir` joined with `path` minus its first `strip` components.
fn join_stripped(target_dir: &Path, path: &Path, strip: usize) -> Stripped {
    let remaining: Vec<Component<'_>> = path
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .skip(strip)
        .collect();
    if remaining.is_empty() {
        return Stripped::Empty;
    }
    let mut joined = target_dir.to_path_buf();
    for comp in remaining {
        match comp {
            Component::Normal(p) => joined.push(p),
            _ => return Stripped::Unsafe,
        }
    }
    Stripped::Path(joined)
}

/// Whether the deepest existing ancestor of `dir` resolves inside
/// `canonical_target`.
fn resolves_inside(dir: &Path, canonical_target: &Path) -> Result<bool> {
    let mut existing = dir;
    while existing.symlink_metadata().is_err() {
        match existing.parent() {
            Some(parent) => existing = parent,
            None => return Ok(false),
        }
    }
    Ok(existing.canonicalize()?.starts_with(canonical_target))
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

fn refuse(entry_path: &Path, archive_path: &Path, reason: &str) -> String {
    let msg = format!(
        "Refusing entry {} in {}: {}",
        entry_path.display(),
        archive_path.display(),
        reason
    );
    error!("{}", msg);
    msg
}
