//! Folder Service
//!
//! Business logic for the folder hierarchy.

use cloudpipe_core::domain::folder::Folder;
use cloudpipe_core::domain::pipeline::Pipeline;
use cloudpipe_core::dto::folder::{CreateFolder, FolderHierarchy, FolderTree};
use cloudpipe_core::dto::pipeline::PipelineSummary;
use sqlx::PgPool;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

use crate::repository::{folder_repository, pipeline_repository};

/// Service error type
#[derive(Debug)]
pub enum FolderError {
    NotFound(Uuid),
    ParentNotFound(Uuid),
    NotEmpty(Uuid),
    ValidationError(String),
    DatabaseError(sqlx::Error),
}

impl From<sqlx::Error> for FolderError {
    fn from(err: sqlx::Error) -> Self {
        FolderError::DatabaseError(err)
    }
}

pub type Result<T> = std::result::Result<T, FolderError>;

/// Create a new folder
pub async fn create_folder(pool: &PgPool, req: CreateFolder) -> Result<Folder> {
    validate_folder_name(&req.name)?;

    if let Some(parent_id) = req.parent_id {
        folder_repository::find_by_id(pool, parent_id)
            .await?
            .ok_or(FolderError::ParentNotFound(parent_id))?;
    }

    let folder = folder_repository::create(pool, req).await?;

    tracing::info!("Folder created: {} ({})", folder.name, folder.id);

    Ok(folder)
}

/// Get a folder by ID
pub async fn get_folder(pool: &PgPool, id: Uuid) -> Result<Folder> {
    let folder = folder_repository::find_by_id(pool, id)
        .await?
        .ok_or(FolderError::NotFound(id))?;

    Ok(folder)
}

/// Rename a folder
pub async fn rename_folder(pool: &PgPool, id: Uuid, name: &str) -> Result<Folder> {
    validate_folder_name(name)?;

    let renamed = folder_repository::rename(pool, id, name).await?;
    if !renamed {
        return Err(FolderError::NotFound(id));
    }

    get_folder(pool, id).await
}

/// Delete an empty folder
pub async fn delete_folder(pool: &PgPool, id: Uuid) -> Result<()> {
    if folder_repository::count_children(pool, id).await? > 0 {
        return Err(FolderError::NotEmpty(id));
    }

    let deleted = folder_repository::delete(pool, id).await?;
    if !deleted {
        return Err(FolderError::NotFound(id));
    }

    tracing::info!("Folder deleted: {}", id);

    Ok(())
}

/// Load the whole folder tree together with the pipelines it holds
pub async fn folder_tree(pool: &PgPool) -> Result<FolderHierarchy> {
    let folders = folder_repository::list_all(pool).await?;
    let pipelines = pipeline_repository::list_all(pool).await?;

    Ok(build_hierarchy(folders, pipelines))
}

/// Nest a flat folder list.
///
/// Folders whose parent is missing become roots, and so do pipelines
/// pointing at a missing folder.
pub fn build_hierarchy(folders: Vec<Folder>, pipelines: Vec<Pipeline>) -> FolderHierarchy {
    let known: HashSet<Uuid> = folders.iter().map(|f| f.id).collect();

    let mut pipelines_by_folder: HashMap<Option<Uuid>, Vec<PipelineSummary>> = HashMap::new();
    for pipeline in pipelines {
        let key = pipeline.folder_id.filter(|id| known.contains(id));
        pipelines_by_folder
            .entry(key)
            .or_default()
            .push(pipeline.into());
    }

    let mut children_by_parent: HashMap<Option<Uuid>, Vec<Folder>> = HashMap::new();
    for folder in folders {
        let key = folder.parent_id.filter(|id| known.contains(id));
        children_by_parent.entry(key).or_default().push(folder);
    }

    let roots = children_by_parent.remove(&None).unwrap_or_default();
    let mut folders: Vec<FolderTree> = roots
        .into_iter()
        .map(|folder| nest(folder, &mut children_by_parent, &mut pipelines_by_folder))
        .collect();
    folders.sort_by(|a, b| a.folder.name.cmp(&b.folder.name));

    let mut pipelines = pipelines_by_folder.remove(&None).unwrap_or_default();
    pipelines.sort_by(|a, b| a.name.cmp(&b.name));

    FolderHierarchy { folders, pipelines }
}

fn nest(
    folder: Folder,
    children_by_parent: &mut HashMap<Option<Uuid>, Vec<Folder>>,
    pipelines_by_folder: &mut HashMap<Option<Uuid>, Vec<PipelineSummary>>,
) -> FolderTree {
    let mut children: Vec<FolderTree> = children_by_parent
        .remove(&Some(folder.id))
        .unwrap_or_default()
        .into_iter()
        .map(|child| nest(child, children_by_parent, pipelines_by_folder))
        .collect();
    children.sort_by(|a, b| a.folder.name.cmp(&b.folder.name));

    let mut pipelines = pipelines_by_folder
        .remove(&Some(folder.id))
        .unwrap_or_default();
    pipelines.sort_by(|a, b| a.name.cmp(&b.name));

    FolderTree {
        folder,
        children,
        pipelines,
    }
}

// =============================================================================
// Validation
// =============================================================================

fn validate_folder_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(FolderError::ValidationError(
            "Folder name cannot be empty".to_string(),
        ));
    }

    if name.len() > 255 {
        return Err(FolderError::ValidationError(
            "Folder name is too long (max 255 characters)".to_string(),
        ));
    }

    if name.contains('/') {
        return Err(FolderError::ValidationError(
            "Folder name cannot contain '/'".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn folder(name: &str, parent_id: Option<Uuid>) -> Folder {
        Folder {
            id: Uuid::new_v4(),
            name: name.to_string(),
            parent_id,
            created_at: chrono::Utc::now(),
        }
    }

    fn pipeline(name: &str, folder_id: Option<Uuid>) -> Pipeline {
        Pipeline {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: None,
            folder_id,
            repository: None,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
            tags: vec![],
        }
    }

    #[test]
    fn test_validate_folder_name() {
        assert!(validate_folder_name("genomics").is_ok());
        assert!(matches!(
            validate_folder_name("  "),
            Err(FolderError::ValidationError(_))
        ));
        assert!(matches!(
            validate_folder_name("a/b"),
            Err(FolderError::ValidationError(_))
        ));
        assert!(validate_folder_name(&"x".repeat(256)).is_err());
    }

    #[test]
    fn test_build_hierarchy_nests_folders_and_pipelines() {
        let root = folder("root", None);
        let child = folder("child", Some(root.id));
        let grandchild = folder("grandchild", Some(child.id));

        let hierarchy = build_hierarchy(
            vec![grandchild.clone(), child.clone(), root.clone()],
            vec![
                pipeline("in-child", Some(child.id)),
                pipeline("top-level", None),
            ],
        );

        assert_eq!(hierarchy.folders.len(), 1);
        assert_eq!(hierarchy.pipelines.len(), 1);
        assert_eq!(hierarchy.pipelines[0].name, "top-level");

        let root_tree = &hierarchy.folders[0];
        assert_eq!(root_tree.folder.id, root.id);
        assert_eq!(root_tree.children.len(), 1);

        let child_tree = &root_tree.children[0];
        assert_eq!(child_tree.folder.id, child.id);
        assert_eq!(child_tree.pipelines[0].name, "in-child");
        assert_eq!(child_tree.children[0].folder.id, grandchild.id);
    }

    #[test]
    fn test_build_hierarchy_orphans_become_roots() {
        let missing = Uuid::new_v4();
        let orphan = folder("orphan", Some(missing));

        let hierarchy = build_hierarchy(vec![orphan.clone()], vec![pipeline("lost", Some(missing))]);

        assert_eq!(hierarchy.folders.len(), 1);
        assert_eq!(hierarchy.folders[0].folder.id, orphan.id);
        assert_eq!(hierarchy.pipelines[0].name, "lost");
    }

    #[test]
    fn test_build_hierarchy_sorts_siblings_by_name() {
        let b = folder("b", None);
        let a = folder("a", None);
        let parent = folder("parent", None);
        let z = folder("z", Some(parent.id));
        let m = folder("m", Some(parent.id));

        let hierarchy = build_hierarchy(vec![b, a, parent, z, m], vec![]);
        let child_names: Vec<_> = hierarchy
            .folders
            .iter()
            .find(|t| t.folder.name == "parent")
            .map(|t| t.children.iter().map(|c| c.folder.name.clone()).collect())
            .unwrap_or_default();

        assert_eq!(child_names, vec!["m", "z"]);
    }
}
