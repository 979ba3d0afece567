//! 片段管道模块
//!
//! 路径匹配、规则判定、叶子提取、标记编解码与回填

pub mod path;
pub mod matcher;
pub mod rules;
pub mod filters;
pub mod extractor;
pub mod markers;
pub mod reassembler;
pub mod source;

// 重新导出主要类型
pub use path::KeyPath;
pub use matcher::{matches, Disposition, MatchMode, Rule};
pub use rules::{decide, Decision, RuleSet, RuleSetBuilder, RuleSpec};
pub use filters::{LeafFilter, LeafFilterConfig, SkipReason};
pub use extractor::{extract, Fragment, FragmentBundle, FragmentExtractor, Skeleton};
pub use markers::{DecodedDocument, MarkerCodec, TranslatedBundles, TranslatedMap};
pub use reassembler::{rebuild, rebuild_with_report, RebuildReport};
pub use source::{patch_script_source, patch_source};
