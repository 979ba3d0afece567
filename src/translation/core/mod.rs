//! 翻译核心模块
//!
//! - **后端层** (`backend.rs`): 翻译后端约定与 HTTP 实现
//! - **服务层** (`service.rs`): 串联提取、嵌入、调用后端、解码与回填
//!
//! ## 模块依赖关系
//!
//! ```text
//! FragmentService (service.rs)
//!     ├── ScriptLocator (parsers/js.rs)
//!     ├── FragmentExtractor (pipeline/extractor.rs)
//!     ├── MarkerCodec (pipeline/markers.rs)
//!     ├── rebuild_with_report (pipeline/reassembler.rs)
//!     └── TranslationBackend (backend.rs)
//!             └── HttpBackend
//! ```

pub mod backend;
pub mod service;

pub use backend::{BackendRequest, BackendResponse, HttpBackend, TranslationBackend};

/// 片段翻译服务 - 主要的对外接口
pub use service::FragmentService;

/// 服务运行统计信息
pub use service::{ServiceStats, ServiceStatsSnapshot};

/// 管道状态与结果
pub use service::{BundleOutcome, PipelineOutcome, PipelineState};
