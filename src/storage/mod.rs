/// SPIFFS パーティションのマウント
#[cfg(target_os = "espidf")]
pub mod spiffs;

#[cfg(target_os = "espidf")]
pub use spiffs::mount_spiffs;

use log::debug;
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

/// ステージングストレージのエラー
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("{path} を書き込みモードで開けませんでした: {source}")]
    OpenForWrite {
        path: String,
        source: std::io::Error,
    },

    #[error("{path} を読み込みモードで開けませんでした: {source}")]
    OpenForRead {
        path: String,
        source: std::io::Error,
    },

    #[error("{path} への書き込みに失敗しました: {source}")]
    Write {
        path: String,
        source: std::io::Error,
    },

    #[error("{path} の読み込みに失敗しました: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("ストレージのマウントに失敗しました: {0}")]
    MountFailed(String),
}

/// 撮影画像を 1 枚だけ保持する永続ストア
///
/// 画像は固定の論理名で保存され、新たにステージすると以前の内容は上書きされます。
pub trait StageStore {
    /// ステージ画像の論理名
    fn name(&self) -> &str;

    /// `bytes` を書き込みモードで開いたファイルに書き込み、以前の内容を置き換えます
    fn stage(&mut self, bytes: &[u8]) -> Result<(), StorageError>;

    /// ステージ画像を開き直してサイズを返します
    fn staged_size(&mut self) -> Result<u64, StorageError>;

    /// ステージ画像全体をメモリに読み込みます
    fn read_staged(&mut self) -> Result<Vec<u8>, StorageError>;
}

/// ファイルシステム上の 1 ファイルを使うステージストア
///
/// デバイスでは SPIFFS を VFS にマウントした後のパス（例: `/spiffs/image.jpg`）を使います。
#[derive(Debug, Clone)]
pub struct FileStageStore {
    path: PathBuf,
    display_name: String,
}

impl FileStageStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let display_name = path.display().to_string();
        Self { path, display_name }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StageStore for FileStageStore {
    fn name(&self) -> &str {
        &self.display_name
    }

    fn stage(&mut self, bytes: &[u8]) -> Result<(), StorageError> {
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&self.path)
            .map_err(|source| StorageError::OpenForWrite {
                path: self.display_name.clone(),
                source,
            })?;

        file.write_all(bytes)
            .and_then(|_| file.flush())
            .map_err(|source| StorageError::Write {
                path: self.display_name.clone(),
                source,
            })?;
        debug!("{} バイトを {} に書き込みました", bytes.len(), self.display_name);
        Ok(())
    }

    fn staged_size(&mut self) -> Result<u64, StorageError> {
        let file = File::open(&self.path).map_err(|source| StorageError::OpenForRead {
            path: self.display_name.clone(),
            source,
        })?;
        let metadata = file.metadata().map_err(|source| StorageError::Read {
            path: self.display_name.clone(),
            source,
        })?;
        Ok(metadata.len())
    }

    fn read_staged(&mut self) -> Result<Vec<u8>, StorageError> {
        let mut file = File::open(&self.path).map_err(|source| StorageError::OpenForRead {
            path: self.display_name.clone(),
            source,
        })?;
        let mut buffer = Vec::new();
        file.read_to_end(&mut buffer)
            .map_err(|source| StorageError::Read {
                path: self.display_name.clone(),
                source,
            })?;
        Ok(buffer)
    }
}
