use super::StorageError;
use esp_idf_sys::{esp, esp_vfs_spiffs_conf_t, esp_vfs_spiffs_register, esp_spiffs_info};
use log::info;
use std::ffi::CString;

/// SPIFFS パーティションを VFS にマウントします
///
/// マウント後は `base_path` 以下を `std::fs` で扱えます。
/// `format_if_mount_failed` が true の場合、マウントに失敗したパーティションをフォーマットします。
///
/// # エラー
///
/// VFS への登録に失敗した場合にエラーを返します
pub fn mount_spiffs(
    base_path: &str,
    max_files: usize,
    format_if_mount_failed: bool,
) -> Result<(), StorageError> {
    let base_path_c =
        CString::new(base_path).map_err(|e| StorageError::MountFailed(e.to_string()))?;

    let conf = esp_vfs_spiffs_conf_t {
        base_path: base_path_c.as_ptr(),
        partition_label: std::ptr::null(),
        max_files,
        format_if_mount_failed,
    };

    esp!(unsafe { esp_vfs_spiffs_register(&conf) })
        .map_err(|e| StorageError::MountFailed(format!("{:?}", e)))?;

    let mut total: usize = 0;
    let mut used: usize = 0;
    if esp!(unsafe { esp_spiffs_info(std::ptr::null(), &mut total, &mut used) }).is_ok() {
        info!(
            "SPIFFS を {} にマウントしました (使用 {} / {} バイト)",
            base_path, used, total
        );
    } else {
        info!("SPIFFS を {} にマウントしました", base_path);
    }
    Ok(())
}
