use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use markup5ever_rcdom::{Handle, NodeData, RcDom};

/// 将 HTML 文本解析为 DOM
pub fn html_to_dom(html: &str) -> RcDom {
    parse_document(RcDom::default(), Default::default()).one(html)
}

/// 查找指定路径的DOM节点
pub fn find_nodes(node: &Handle, node_names: Vec<&str>) -> Vec<Handle> {
    let mut found_nodes = Vec::new();
    let Some(&node_name) = node_names.first() else {
        return found_nodes;
    };

    if node_names.len() == 1 {
        if let NodeData::Element { ref name, .. } = node.data {
            if &*name.local == node_name {
                found_nodes.push(node.clone());
            }
        }

        for child_node in node.children.borrow().iter() {
            found_nodes.append(&mut find_nodes(child_node, node_names.clone()));
        }
    } else if let NodeData::Element { ref name, .. } = node.data {
        if &*name.local == node_name {
            let mut new_node_names = node_names;
            new_node_names.remove(0);
            found_nodes.append(&mut find_nodes(node, new_node_names));
        } else {
            for child_node in node.children.borrow().iter() {
                found_nodes.append(&mut find_nodes(child_node, node_names.clone()));
            }
        }
    } else {
        for child_node in node.children.borrow().iter() {
            found_nodes.append(&mut find_nodes(child_node, node_names.clone()));
        }
    }

    found_nodes
}

/// 根据名称获取子节点
pub fn get_child_node_by_name(parent: &Handle, node_name: &str) -> Option<Handle> {
    let children = parent.children.borrow();
    let matching_children = children.iter().find(|child| match child.data {
        NodeData::Element { ref name, .. } => &*name.local == node_name,
        _ => false,
    });
    matching_children.cloned()
}

/// 获取文档的 body 节点
pub fn get_body_node(dom: &RcDom) -> Option<Handle> {
    find_nodes(&dom.document, vec!["html", "body"]).into_iter().next()
}

/// 获取节点属性值
pub fn get_node_attr(node: &Handle, attr_name: &str) -> Option<String> {
    match &node.data {
        NodeData::Element { attrs, .. } => {
            for attr in attrs.borrow().iter() {
                if &*attr.name.local == attr_name {
                    return Some(attr.value.to_string());
                }
            }
            None
        }
        _ => None,
    }
}

/// 获取节点名称
pub fn get_node_name(node: &Handle) -> Option<&'_ str> {
    match &node.data {
        NodeData::Element { name, .. } => Some(name.local.as_ref()),
        _ => None,
    }
}

/// 按文档顺序收集带有指定属性的元素
pub fn find_elements_with_attr(node: &Handle, attr_name: &str) -> Vec<Handle> {
    let mut found = Vec::new();
    collect_with_attr(node, attr_name, &mut found);
    found
}

fn collect_with_attr(node: &Handle, attr_name: &str, found: &mut Vec<Handle>) {
    if get_node_attr(node, attr_name).is_some() {
        found.push(node.clone());
    }

    for child in node.children.borrow().iter() {
        collect_with_attr(child, attr_name, found);
    }
}

/// 拼接节点下所有文本节点的内容
pub fn get_text_content(node: &Handle) -> String {
    let mut text = String::new();
    push_text(node, None, &mut text);
    text
}

/// 拼接文本内容，带有 `attr_name` 属性的元素写作 `replacement`
pub fn get_text_content_replacing(node: &Handle, attr_name: &str, replacement: &str) -> String {
    let mut text = String::new();
    push_text(node, Some((attr_name, replacement)), &mut text);
    text
}

fn push_text(node: &Handle, replace: Option<(&str, &str)>, text: &mut String) {
    match node.data {
        NodeData::Text { ref contents } => text.push_str(&contents.borrow()),
        NodeData::Element { .. } => {
            if let Some((attr_name, replacement)) = replace {
                if get_node_attr(node, attr_name).is_some() {
                    text.push_str(replacement);
                    return;
                }
            }
        }
        _ => {}
    }

    for child in node.children.borrow().iter() {
        push_text(child, replace, text);
    }
}
