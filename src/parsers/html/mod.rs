//! HTML解析和处理模块
//!
//! - `dom`: 基础DOM操作
//! - `serializer`: 序列化功能

pub mod dom;
pub mod serializer;

pub use dom::{
    find_elements_with_attr, find_nodes, get_body_node, get_child_node_by_name, get_node_attr,
    get_node_name, get_text_content, get_text_content_replacing, html_to_dom,
};
pub use serializer::{serialize_document, serialize_node};
