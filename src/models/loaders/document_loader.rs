use crate::error::{AppError, AppResult, FileError};
use crate::models::document::{mime_for_extension, RawDocument};
use std::path::{Path, PathBuf};
use tokio::fs;

/// 读取单个文档，扩展名不受支持时返回 `None`
pub async fn load_document(path: &Path) -> AppResult<Option<RawDocument>> {
    let Some(mime_type) = path
        .extension()
        .and_then(|s| s.to_str())
        .and_then(mime_for_extension)
    else {
        return Ok(None);
    };

    let bytes = fs::read(path)
        .await
        .map_err(|e| AppError::file_read_failed(path.display().to_string(), e))?;

    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default();

    Ok(Some(RawDocument::new(bytes, mime_type, file_name)))
}

/// 扫描文件夹，按文件名顺序加载所有受支持的文档（最多 `limit` 个）
pub async fn load_documents(folder_path: &str, limit: usize) -> AppResult<Vec<RawDocument>> {
    let folder = PathBuf::from(folder_path);

    if !folder.is_dir() {
        return Err(FileError::DirectoryNotFound {
            path: folder_path.to_string(),
        }
        .into());
    }

    let mut paths = Vec::new();
    let mut entries = fs::read_dir(&folder)
        .await
        .map_err(|e| AppError::file_read_failed(folder_path, e))?;

    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| AppError::file_read_failed(folder_path, e))?
    {
        let path = entry.path();
        if path.is_file() {
            paths.push(path);
        }
    }
    paths.sort();

    let mut documents = Vec::new();
    for path in paths {
        if documents.len() >= limit {
            tracing::warn!("⚠️ 超过单次处理上限 {}，其余文件将被忽略", limit);
            break;
        }

        match load_document(&path).await? {
            Some(document) => {
                tracing::debug!(
                    "已加载: {} ({} 字节, {})",
                    document.file_name(),
                    document.file_size(),
                    document.mime_type()
                );
                documents.push(document);
            }
            None => {
                tracing::warn!("跳过不支持的文件: {}", path.display());
            }
        }
    }

    Ok(documents)
}
