use std::fs;
use std::path::Path;

use crate::compressor::CompressConfig;
use crate::error::AppError;

/// 读取 JSON 配置文件；缺失的字段沿用默认值，读取后校验搜索参数。
pub fn load_config_file(path: &Path) -> Result<CompressConfig, AppError> {
    let content = fs::read_to_string(path)
        .map_err(|e| AppError::Settings(format!("读取配置文件失败 {}: {}", path.display(), e)))?;

    let config = serde_json::from_str::<CompressConfig>(&content)
        .map_err(|e| AppError::Settings(format!("解析配置文件失败: {}", e)))?;
    config.validate_search()?;

    log::info!("⚙️ 已加载配置文件 - {}", path.display());
    Ok(config)
}

/// 以格式化 JSON 写出配置。
pub fn save_config_file(path: &Path, config: &CompressConfig) -> Result<(), AppError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let content = serde_json::to_string_pretty(config)
        .map_err(|e| AppError::Settings(format!("序列化配置失败: {}", e)))?;

    fs::write(path, content)?;
    Ok(())
}
