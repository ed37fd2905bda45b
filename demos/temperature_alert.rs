use rule_chain::aop::MessageLoggingInterceptor;
use rule_chain::engine::InMemoryRuleChainStore;
use rule_chain::logging::init_tracing;
use rule_chain::{
    ChainMetadata, EngineConfig, EntityId, Msg, MsgMetadata, MsgType, RuleEngine, RuleEngineTrait,
};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

const RULE_CHAIN: &str = r#"{
    "rule_chain_id": "3f2504e0-4f89-11d3-9a0c-0305e82c3301",
    "name": "温度监控",
    "first_node_index": 0,
    "nodes": [
        {
            "id": "3f2504e0-4f89-11d3-9a0c-0305e82c3302",
            "type": "msg_type_switch",
            "name": "按消息类型分流"
        },
        {
            "id": "3f2504e0-4f89-11d3-9a0c-0305e82c3303",
            "type": "threshold_filter",
            "name": "高温判断",
            "debug_mode": true,
            "configuration": { "key": "temperature", "threshold": 30 }
        },
        {
            "id": "3f2504e0-4f89-11d3-9a0c-0305e82c3304",
            "type": "transform",
            "name": "生成告警",
            "configuration": {
                "template": {
                    "device": "${metadata.deviceName}",
                    "temperature": "${data.temperature}",
                    "message": "温度过高: ${data.temperature}°C"
                },
                "output_type": "ALARM"
            }
        },
        {
            "id": "3f2504e0-4f89-11d3-9a0c-0305e82c3305",
            "type": "log",
            "name": "告警日志",
            "configuration": { "template": "告警 ${msg.type}: ${data.message}" }
        },
        {
            "id": "3f2504e0-4f89-11d3-9a0c-0305e82c3306",
            "type": "log",
            "name": "正常日志",
            "configuration": { "template": "温度正常: ${data.temperature}°C" }
        },
        {
            "id": "3f2504e0-4f89-11d3-9a0c-0305e82c3307",
            "type": "log",
            "name": "无效数据",
            "configuration": { "template": "无法解析的遥测数据: ${data}" }
        },
        {
            "id": "3f2504e0-4f89-11d3-9a0c-0305e82c3308",
            "type": "org.example.Archive",
            "name": "归档"
        }
    ],
    "connections": [
        { "from_index": 0, "to_index": 1, "type": "Post telemetry" },
        { "from_index": 1, "to_index": 2, "type": "True" },
        { "from_index": 1, "to_index": 4, "type": "False" },
        { "from_index": 1, "to_index": 5, "type": "Failure" },
        { "from_index": 2, "to_index": 3, "type": "Success" },
        { "from_index": 2, "to_index": 6, "type": "Success" }
    ]
}"#;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = EngineConfig::from_json(
        r#"{ "node_timeout_ms": 1000, "debug_interceptor": true, "log": { "level": "info" } }"#,
    )?;
    init_tracing(&config.log)?;

    let metadata = ChainMetadata::from_json(RULE_CHAIN)?;
    let chain_id = metadata.rule_chain_id;
    let store = Arc::new(InMemoryRuleChainStore::new());
    store.save(metadata).await;

    let engine = RuleEngine::with_builtins(config).await.with_store(store);
    engine
        .add_msg_interceptor(Arc::new(MessageLoggingInterceptor))
        .await;
    for descriptor in engine.get_registered_components().await {
        info!("已注册组件: {} ({:?})", descriptor.type_name, descriptor.category);
    }

    let device = EntityId::device(Uuid::new_v4());
    let payloads = [
        serde_json::json!({ "temperature": 25 }),
        serde_json::json!({ "temperature": 35.5 }),
        serde_json::json!({ "humidity": 60 }),
    ];

    for data in payloads {
        let mut metadata = MsgMetadata::new();
        metadata.insert("deviceName".to_string(), "boiler-1".to_string());
        let msg = Msg::new(MsgType::PostTelemetryRequest, device, metadata, data);
        info!("提交消息 {}: {}", msg.id, msg.data);
        engine.submit(chain_id, msg).await?;
    }

    info!("已加载规则链: {:?}", engine.loaded_chains().await);
    engine.shutdown().await;
    Ok(())
}
