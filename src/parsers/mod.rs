//! # 解析器模块
//!
//! - `html` - HTML 文档解析、DOM 查询与序列化
//! - `js` - 页面脚本中命名 JSON 变量的定位与写回

pub mod html;
pub mod js;

// Re-export commonly used items for convenience
pub use html::{html_to_dom, serialize_document};
pub use js::{encode_for_script, escape_for_script, FragmentOverride, ScriptLocator, ScriptMatch};
