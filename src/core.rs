use encoding_rs::Encoding;

const ANSI_COLOR_RED: &str = "\x1b[31m";
const ANSI_COLOR_RESET: &str = "\x1b[0m";
const JSON_MEDIA_TYPES: &[&str] = &["application/json", "text/json", "application/ld+json"];
const HTML_MEDIA_TYPES: &[&str] = &["text/html", "application/xhtml+xml"];

/// 响应体类型，决定走 HTML 管道还是 JSON 管道
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ResponseKind {
    /// 服务端渲染页面，内嵌脚本变量
    #[default]
    Html,
    /// AJAX/API 返回的 JSON
    Json,
    /// 其他内容，原样放行
    Other,
}

impl ResponseKind {
    /// 按 Content-Type 判断，缺失或无法判断时嗅探响应体
    pub fn detect(content_type: Option<&str>, body: &str) -> ResponseKind {
        if let Some(content_type) = content_type {
            let (media_type, _, _) = parse_content_type(content_type);
            if HTML_MEDIA_TYPES.contains(&media_type.as_str()) {
                return ResponseKind::Html;
            }
            if JSON_MEDIA_TYPES.contains(&media_type.as_str()) || media_type.ends_with("+json") {
                return ResponseKind::Json;
            }
            if !media_type.is_empty() && !is_plaintext_media_type(&media_type) {
                return ResponseKind::Other;
            }
        }

        Self::sniff(body)
    }

    fn sniff(body: &str) -> ResponseKind {
        let trimmed = body.trim_start_matches('\u{feff}').trim_start();
        if (trimmed.starts_with('{') || trimmed.starts_with('['))
            && serde_json::from_str::<serde_json::Value>(trimmed).is_ok()
        {
            return ResponseKind::Json;
        }

        if trimmed.starts_with('<') {
            return ResponseKind::Html;
        }

        ResponseKind::Other
    }

    pub fn from_name(name: &str) -> Option<ResponseKind> {
        match name.trim().to_lowercase().as_str() {
            "html" => Some(ResponseKind::Html),
            "json" => Some(ResponseKind::Json),
            "other" | "raw" => Some(ResponseKind::Other),
            _ => None,
        }
    }
}

/// 解析 Content-Type，返回 `(媒体类型, 字符集, 是否 base64)`
pub fn parse_content_type(content_type: &str) -> (String, String, bool) {
    let mut media_type = String::new();
    let mut charset = String::new();
    let mut is_base64 = false;

    let parts: Vec<&str> = content_type.split(';').collect();

    if let Some(first) = parts.first() {
        media_type = first.trim().to_lowercase();
    }

    for part in parts.iter().skip(1) {
        let part = part.trim();
        if let Some(value) = part.strip_prefix("charset=") {
            charset = value.trim_matches('"').to_string();
        } else if part == "base64" {
            is_base64 = true;
        }
    }

    (media_type, charset, is_base64)
}

/// Checks if the given media type represents plaintext content
pub fn is_plaintext_media_type(media_type: &str) -> bool {
    media_type.starts_with("text/")
}

/// 按字符集解码响应体
///
/// BOM 优先；字符集无法识别时按 UTF-8 解码。
pub fn decode_body(data: &[u8], charset: Option<&str>) -> String {
    let encoding = charset
        .filter(|label| !label.trim().is_empty())
        .and_then(|label| Encoding::for_label_no_replacement(label.trim().as_bytes()))
        .unwrap_or(encoding_rs::UTF_8);

    let (text, used, had_errors) = encoding.decode(data);
    if had_errors {
        tracing::warn!("使用 {} 解码时遇到无效字节", used.name());
    }
    text.into_owned()
}

/// 按字符集编码输出
pub fn encode_body(text: &str, charset: Option<&str>) -> Vec<u8> {
    match charset.and_then(|label| Encoding::for_label_no_replacement(label.trim().as_bytes())) {
        Some(encoding) if encoding != encoding_rs::UTF_8 => encoding.encode(text).0.into_owned(),
        _ => text.as_bytes().to_vec(),
    }
}

/// Prints an error message to stderr, red when stderr is a terminal
pub fn print_error_message(msg: &str) {
    if use_color() {
        eprintln!("{ANSI_COLOR_RED}{msg}{ANSI_COLOR_RESET}");
    } else {
        eprintln!("{msg}");
    }
}

/// Prints an info message to stderr
pub fn print_info_message(msg: &str) {
    eprintln!("{msg}");
}

#[cfg(feature = "cli")]
fn use_color() -> bool {
    use crate::env::{core::NoColor, EnvVar};
    !NoColor::get_or_default(false) && atty::is(atty::Stream::Stderr)
}

#[cfg(not(feature = "cli"))]
fn use_color() -> bool {
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_content_type() {
        assert_eq!(
            parse_content_type("text/html; charset=\"ISO-8859-1\""),
            ("text/html".to_string(), "ISO-8859-1".to_string(), false)
        );
        assert_eq!(
            parse_content_type("Application/JSON"),
            ("application/json".to_string(), String::new(), false)
        );
    }

    #[test]
    fn test_detect_by_content_type() {
        assert_eq!(ResponseKind::detect(Some("text/html; charset=utf-8"), "{}"), ResponseKind::Html);
        assert_eq!(ResponseKind::detect(Some("application/json"), "<p>"), ResponseKind::Json);
        assert_eq!(
            ResponseKind::detect(Some("application/vnd.api+json"), ""),
            ResponseKind::Json
        );
        assert_eq!(ResponseKind::detect(Some("image/png"), ""), ResponseKind::Other);
    }

    #[test]
    fn test_detect_by_sniffing() {
        assert_eq!(ResponseKind::detect(None, "  {\"a\": 1}"), ResponseKind::Json);
        assert_eq!(ResponseKind::detect(None, "<!DOCTYPE html><p>x</p>"), ResponseKind::Html);
        assert_eq!(ResponseKind::detect(Some("text/plain"), "[1, 2]"), ResponseKind::Json);
        assert_eq!(ResponseKind::detect(None, "{not json"), ResponseKind::Other);
        assert_eq!(ResponseKind::detect(None, "plain words"), ResponseKind::Other);
    }

    #[test]
    fn test_from_name() {
        assert_eq!(ResponseKind::from_name("JSON"), Some(ResponseKind::Json));
        assert_eq!(ResponseKind::from_name("xml"), None);
    }

    #[test]
    fn test_decode_body() {
        assert_eq!(decode_body(b"caf\xe9", Some("iso-8859-1")), "café");
        assert_eq!(decode_body("café".as_bytes(), None), "café");
        assert_eq!(decode_body("café".as_bytes(), Some("no-such-charset")), "café");
        assert_eq!(encode_body("café", Some("iso-8859-1")), b"caf\xe9".to_vec());
    }
}
