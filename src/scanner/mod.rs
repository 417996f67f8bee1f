//! 画像の取り込み
//!
//! コマンドライン引数（ファイル/フォルダ）から画像ペイロードを作る。
//! 画像以外はここで弾き、セッションには渡さない。

use crate::error::{InvoiceAiError, Result};
use std::fmt;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "gif", "bmp", "tif", "tiff"];

/// 取り込んだ画像1枚分
#[derive(Clone)]
pub struct ImagePayload {
    pub file_name: String,
    /// 元ファイル（レポートからの復元・クラウド保存時の再読み込みに使用）
    pub file_path: Option<PathBuf>,
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl fmt::Debug for ImagePayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImagePayload")
            .field("file_name", &self.file_name)
            .field("file_path", &self.file_path)
            .field("mime_type", &self.mime_type)
            .field("bytes", &self.data.len())
            .finish()
    }
}

impl ImagePayload {
    pub fn new(file_name: impl Into<String>, mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            file_path: None,
            mime_type: mime_type.into(),
            data,
        }
    }

    /// ファイルから読み込む（画像でなければ `NotAnImage`）
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(InvoiceAiError::FileNotFound(path.display().to_string()));
        }

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let data = std::fs::read(path)?;
        let mime_type = detect_mime_type(&data, path)
            .ok_or_else(|| InvoiceAiError::NotAnImage(file_name.clone()))?;

        Ok(Self {
            file_name,
            file_path: Some(path.to_path_buf()),
            mime_type: mime_type.to_string(),
            data,
        })
    }
}

/// MIMEタイプ判定（マジックバイト優先、なければ拡張子）
pub fn detect_mime_type(data: &[u8], path: &Path) -> Option<&'static str> {
    if let Ok(format) = image::guess_format(data) {
        let mime = format.to_mime_type();
        if mime.starts_with("image/") {
            return Some(mime);
        }
    }

    let ext = path.extension()?.to_string_lossy().to_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "webp" => Some("image/webp"),
        "gif" => Some("image/gif"),
        "bmp" => Some("image/bmp"),
        "tif" | "tiff" => Some("image/tiff"),
        _ => None,
    }
}

fn is_image_extension(path: &Path) -> bool {
    path.extension()
        .map(|ext| {
            let ext = ext.to_string_lossy().to_lowercase();
            IMAGE_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

/// フォルダ内の画像ファイルを列挙（ファイル名順）
pub fn scan_folder(folder: &Path, recursive: bool) -> Result<Vec<PathBuf>> {
    if !folder.is_dir() {
        return Err(InvoiceAiError::FileNotFound(folder.display().to_string()));
    }

    let max_depth = if recursive { usize::MAX } else { 1 };
    let mut paths: Vec<PathBuf> = WalkDir::new(folder)
        .max_depth(max_depth)
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|e| e.into_path())
        .filter(|p| p.is_file() && is_image_extension(p))
        .collect();

    paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(paths)
}

/// 引数の順序を保ったまま画像を読み込む
///
/// フォルダ内の画像以外のファイルは無視し、直接指定されたファイルが画像でなければエラー
pub fn collect_images(inputs: &[PathBuf], recursive: bool) -> Result<Vec<ImagePayload>> {
    let mut images = Vec::new();

    for input in inputs {
        if input.is_dir() {
            for path in scan_folder(input, recursive)? {
                images.push(ImagePayload::load(&path)?);
            }
        } else {
            images.push(ImagePayload::load(input)?);
        }
    }

    if images.is_empty() {
        let joined = inputs
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(", ");
        return Err(InvoiceAiError::NoImagesFound(joined));
    }

    Ok(images)
}
