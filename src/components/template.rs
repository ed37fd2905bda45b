//! `${...}` 模板变量解析,供转换节点和日志节点使用
//!
//! 支持的变量:
//! * `${msg.id}` / `${msg.type}` / `${msg.ts}` / `${msg.originator}`
//! * `${data}` 整个负载, `${data.a.b}` 负载中的嵌套字段
//! * `${metadata.key}` 元数据

use crate::types::Msg;
use serde_json::Value;

/// 解析单个模板变量
pub(crate) fn resolve(var_path: &str, msg: &Msg) -> Option<Value> {
    match var_path {
        "msg.id" => Some(Value::String(msg.id.to_string())),
        "msg.type" => Some(Value::String(msg.msg_type.to_string())),
        "msg.ts" => Some(Value::from(msg.ts)),
        "msg.originator" => Some(Value::String(msg.originator.id.to_string())),
        "data" => Some(msg.data.clone()),
        _ => {
            if let Some(path) = var_path.strip_prefix("data.") {
                msg.data_path(path).cloned()
            } else if let Some(key) = var_path.strip_prefix("metadata.") {
                msg.metadata_value(key).map(|v| Value::String(v.to_string()))
            } else {
                None
            }
        }
    }
}

fn to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// 替换字符串中的所有模板变量
///
/// 返回替换结果以及无法解析的变量名,无法解析的变量替换为空串。
pub(crate) fn render(template: &str, msg: &Msg) -> (String, Vec<String>) {
    let mut result = String::with_capacity(template.len());
    let mut missing = Vec::new();
    let mut rest = template;

    // 查找所有 ${...} 模板变量
    while let Some(start) = rest.find("${") {
        let Some(end) = rest[start..].find('}') else {
            break;
        };
        result.push_str(&rest[..start]);
        let var_path = &rest[start + 2..start + end];
        match resolve(var_path, msg) {
            Some(value) => result.push_str(&to_text(&value)),
            None => missing.push(var_path.to_string()),
        }
        rest = &rest[start + end + 1..];
    }
    result.push_str(rest);

    (result, missing)
}

/// 对 JSON 模板中的所有字符串做变量替换
///
/// 整个字符串恰好是一个变量时保留变量的原始 JSON 类型。
pub(crate) fn apply(template: &Value, msg: &Msg, missing: &mut Vec<String>) -> Value {
    match template {
        Value::String(s) => {
            if let Some(var_path) = whole_variable(s) {
                match resolve(var_path, msg) {
                    Some(value) => return value,
                    None => {
                        missing.push(var_path.to_string());
                        return Value::Null;
                    }
                }
            }
            let (rendered, mut unresolved) = render(s, msg);
            missing.append(&mut unresolved);
            Value::String(rendered)
        }
        Value::Array(items) => Value::Array(items.iter().map(|v| apply(v, msg, missing)).collect()),
        Value::Object(obj) => Value::Object(
            obj.iter()
                .map(|(k, v)| (k.clone(), apply(v, msg, missing)))
                .collect(),
        ),
        other => other.clone(),
    }
}

fn whole_variable(s: &str) -> Option<&str> {
    let inner = s.strip_prefix("${")?.strip_suffix('}')?;
    if inner.contains('}') || inner.contains("${") {
        None
    } else {
        Some(inner)
    }
}
