//! # Config Loader
//!
//! 数据集配置加载：TOML/JSON → `DatasetBlueprint`，解析后立即校验。
//!
//! 命令行可覆盖输出根目录与最大 tick 数，见 [`Overrides`]；覆盖后的蓝图
//! 同样要通过校验。
//!
//! # Example
//!
//! ```no_run
//! use config_loader::{ConfigLoader, Overrides};
//! use std::path::Path;
//!
//! # fn main() -> Result<(), contracts::ContractError> {
//! let mut blueprint = ConfigLoader::load_from_path(Path::new("config.toml"))?;
//! Overrides { output: Some("/data/run1".into()), max_ticks: Some(500) }.apply(&mut blueprint)?;
//! println!("Writing to {}", blueprint.output_dir().display());
//! # Ok(())
//! # }
//! ```

mod parser;
mod validator;

pub use contracts::DatasetBlueprint;
pub use parser::ConfigFormat;
pub use validator::{
    validate, validate_camera, validate_collection, validate_ego, validate_gnss,
    validate_recorder, validate_world,
};

use std::path::{Path, PathBuf};

use contracts::ContractError;

/// 配置加载入口
pub struct ConfigLoader;

impl ConfigLoader {
    /// 按扩展名 (.toml / .json) 读取并校验
    ///
    /// # Errors
    /// 读取失败 (`Io`)、格式无法识别或解析失败 (`ConfigParse`)、
    /// 校验失败 (`ConfigValidation`)
    pub fn load_from_path(path: &Path) -> Result<DatasetBlueprint, ContractError> {
        let format = ConfigFormat::from_path(path)?;
        let content = std::fs::read_to_string(path)?;
        Self::load_from_str(&content, format)
    }

    /// 从字符串解析并校验
    pub fn load_from_str(
        content: &str,
        format: ConfigFormat,
    ) -> Result<DatasetBlueprint, ContractError> {
        let blueprint = parser::parse(content, format)?;
        validator::validate(&blueprint)?;
        Ok(blueprint)
    }

    /// 指定地图的默认配置
    ///
    /// # Errors
    /// 地图名为空
    pub fn defaults_for_map(map: &str) -> Result<DatasetBlueprint, ContractError> {
        let blueprint = DatasetBlueprint::for_map(map);
        validator::validate(&blueprint)?;
        Ok(blueprint)
    }
}

/// 命令行覆盖项
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    /// 替换 `recorder.save_path`
    pub output: Option<PathBuf>,
    /// 替换 `collection.max_ticks`；`Some(0)` 表示不限
    pub max_ticks: Option<u64>,
}

impl Overrides {
    /// 应用到蓝图并重新校验，返回生效的 tick 上限
    ///
    /// 校验失败时蓝图保持原样。
    pub fn apply(&self, blueprint: &mut DatasetBlueprint) -> Result<Option<u64>, ContractError> {
        let mut updated = blueprint.clone();
        if let Some(output) = &self.output {
            updated.recorder.save_path = output.clone();
        }
        match self.max_ticks {
            Some(0) => updated.collection.max_ticks = None,
            Some(n) => updated.collection.max_ticks = Some(n),
            None => {}
        }

        validator::validate(&updated)?;
        *blueprint = updated;
        Ok(blueprint.collection.max_ticks)
    }
}
