use std::io;

use html5ever::serialize::{serialize, SerializeOpts, TraversalScope};
use markup5ever_rcdom::{Handle, RcDom, SerializableHandle};

/// 序列化整个文档
pub fn serialize_document(dom: &RcDom) -> io::Result<String> {
    serialize_handle(dom.document.clone(), TraversalScope::ChildrenOnly(None))
}

/// 序列化单个节点（包含节点自身）
pub fn serialize_node(node: &Handle) -> io::Result<String> {
    serialize_handle(node.clone(), TraversalScope::IncludeNode)
}

fn serialize_handle(handle: Handle, traversal_scope: TraversalScope) -> io::Result<String> {
    let mut buf: Vec<u8> = Vec::new();
    let serializable: SerializableHandle = handle.into();
    serialize(
        &mut buf,
        &serializable,
        SerializeOpts {
            traversal_scope,
            ..Default::default()
        },
    )?;

    Ok(String::from_utf8_lossy(&buf).into_owned())
}
