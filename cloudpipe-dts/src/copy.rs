//! Local file and directory copies
//!
//! Paths may carry a `file://` prefix. Missing parent directories of the
//! destination are created.

use anyhow::{Context, Result, bail};
use std::path::{Path, PathBuf};

/// What a copy moved
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CopyStats {
    pub files: u64,
    pub bytes: u64,
}

pub fn local_path(location: &str) -> PathBuf {
    PathBuf::from(location.strip_prefix("file://").unwrap_or(location))
}

/// Copy a file or a whole directory tree from `source` to `destination`.
///
/// A file copied onto an existing directory lands inside it under its own name.
pub async fn copy_path(source: &Path, destination: &Path) -> Result<CopyStats> {
    let metadata = tokio::fs::metadata(source)
        .await
        .with_context(|| format!("Source {} is not readable", source.display()))?;

    if metadata.is_dir() {
        if destination.starts_with(source) {
            bail!(
                "Cannot copy {} into its own subdirectory {}",
                source.display(),
                destination.display()
            );
        }
        return copy_tree(source, destination).await;
    }

    let target = match tokio::fs::metadata(destination).await {
        Ok(existing) if existing.is_dir() => match source.file_name() {
            Some(name) => destination.join(name),
            None => bail!("Source {} has no file name", source.display()),
        },
        _ => destination.to_path_buf(),
    };

    let bytes = copy_file(source, &target).await?;
    Ok(CopyStats { files: 1, bytes })
}

async fn copy_file(source: &Path, target: &Path) -> Result<u64> {
    if let Some(parent) = target.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    tokio::fs::copy(source, target).await.with_context(|| {
        format!(
            "Failed to copy {} to {}",
            source.display(),
            target.display()
        )
    })
}

async fn copy_tree(source: &Path, destination: &Path) -> Result<CopyStats> {
    let mut stats = CopyStats::default();
    let mut pending = vec![(source.to_path_buf(), destination.to_path_buf())];

    while let Some((from_dir, to_dir)) = pending.pop() {
        tokio::fs::create_dir_all(&to_dir)
            .await
            .with_context(|| format!("Failed to create {}", to_dir.display()))?;

        let mut entries = tokio::fs::read_dir(&from_dir)
            .await
            .with_context(|| format!("Failed to list {}", from_dir.display()))?;

        while let Some(entry) = entries.next_entry().await? {
            let from = entry.path();
            let to = to_dir.join(entry.file_name());

            if entry.file_type().await?.is_dir() {
                pending.push((from, to));
            } else {
                stats.bytes += copy_file(&from, &to).await?;
                stats.files += 1;
            }
        }
    }

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_local_path_strips_scheme() {
        assert_eq!(local_path("file:///data/in.txt"), PathBuf::from("/data/in.txt"));
        assert_eq!(local_path("/data/in.txt"), PathBuf::from("/data/in.txt"));
    }

    #[tokio::test]
    async fn test_copy_file_creates_parents() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("reads.fastq");
        tokio::fs::write(&source, b"@read1\nACGT\n").await.unwrap();

        let destination = dir.path().join("out/sample/reads.fastq");
        let stats = copy_path(&source, &destination).await.unwrap();

        assert_eq!(stats, CopyStats { files: 1, bytes: 12 });
        assert_eq!(tokio::fs::read(&destination).await.unwrap(), b"@read1\nACGT\n");
    }

    #[tokio::test]
    async fn test_copy_file_into_existing_directory() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("report.html");
        tokio::fs::write(&source, b"<html/>").await.unwrap();
        let target_dir = dir.path().join("published");
        tokio::fs::create_dir(&target_dir).await.unwrap();

        copy_path(&source, &target_dir).await.unwrap();
        assert!(target_dir.join("report.html").exists());
    }

    #[tokio::test]
    async fn test_copy_directory_tree() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("results");
        tokio::fs::create_dir_all(source.join("qc")).await.unwrap();
        tokio::fs::write(source.join("counts.tsv"), b"gene\t1\n").await.unwrap();
        tokio::fs::write(source.join("qc/summary.txt"), b"ok").await.unwrap();

        let destination = dir.path().join("archive/results");
        let stats = copy_path(&source, &destination).await.unwrap();

        assert_eq!(stats.files, 2);
        assert_eq!(stats.bytes, 9);
        assert!(destination.join("qc/summary.txt").exists());
    }

    #[tokio::test]
    async fn test_missing_source_fails() {
        let dir = TempDir::new().unwrap();
        let result = copy_path(&dir.path().join("absent"), &dir.path().join("out")).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_directory_into_itself_fails() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("data");
        tokio::fs::create_dir(&source).await.unwrap();

        assert!(copy_path(&source, &source.join("nested")).await.is_err());
    }
}
