//! 编译模块：将技术库中的原始模式编译为可执行的正则模式
pub mod pattern;
pub mod compiler;

pub use self::pattern::{
    split_tags, CompiledDatabase, CompiledPattern, CompiledTechnology, PatternMatch, PatternTags,
};
pub use self::compiler::RuleCompiler;
