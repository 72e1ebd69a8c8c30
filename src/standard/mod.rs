//! 标准化映射表：定义模型、内置映射、编译、加载、全局实例
pub mod model;
pub mod defaults;
pub mod maps;
pub mod compiler;
pub mod loader;
pub mod global;

pub use self::model::{
    AggregationRule, CompoundClass, CompoundEntry, FieldAliases, MapDefinition, SubcategoryDefinition,
};
pub use self::maps::{CompoundResolution, FieldRole, FieldRoles, MapStats, Resolution, StandardizationMaps};
pub use self::compiler::MapCompiler;
pub use self::loader::MapLoader;
pub use self::global::default_maps;
