use encoding_rs::Encoding;
use html5ever::serialize::{serialize, SerializeOpts};
use markup5ever_rcdom::{Handle, RcDom, SerializableHandle};

/// 序列化文档
pub fn serialize_document(dom: &RcDom, document_encoding: &str) -> std::io::Result<Vec<u8>> {
    let mut buf: Vec<u8> = Vec::new();

    let serializable: SerializableHandle = dom.document.clone().into();
    serialize(&mut buf, &serializable, SerializeOpts::default())?;

    if !document_encoding.is_empty() {
        if let Some(encoding) = Encoding::for_label(document_encoding.as_bytes()) {
            let s: &str = &String::from_utf8_lossy(&buf);
            let (data, _, _) = encoding.encode(s);
            buf = data.to_vec();
        }
    }

    Ok(buf)
}

/// 序列化单个节点（包括节点自身），用于日志和测试
pub fn serialize_node(node: &Handle) -> String {
    let mut buf: Vec<u8> = Vec::new();
    let serializable: SerializableHandle = node.clone().into();
    let opts = SerializeOpts {
        traversal_scope: html5ever::serialize::TraversalScope::IncludeNode,
        ..Default::default()
    };

    match serialize(&mut buf, &serializable, opts) {
        Ok(()) => String::from_utf8_lossy(&buf).to_string(),
        Err(_) => String::new(),
    }
}
