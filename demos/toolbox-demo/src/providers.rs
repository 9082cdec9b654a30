//! Canned providers standing in for real integrations.

use std::time::Duration;

use serde_json::{Value, json};
use toolbox::kernel::{CategoryRegistrar, ToolProvider};
use toolbox::primitives::{FieldSpec, FieldType, ParameterSchema, Parameters, ToolCategory};
use toolbox::tools::{ToolError, ToolMetadata, ToolResult};

/// Every demo provider, one per category.
pub fn all() -> Vec<Box<dyn ToolProvider>> {
    let mut providers: Vec<Box<dyn ToolProvider>> = vec![Box::new(MarketData)];
    providers.extend(ToolCategory::ALL.into_iter().filter_map(|category| {
        let tools = canned_tools(category);
        (!tools.is_empty())
            .then(|| Box::new(Canned { category, tools }) as Box<dyn ToolProvider>)
    }));
    providers
}

struct MarketData;

impl ToolProvider for MarketData {
    fn category(&self) -> ToolCategory {
        ToolCategory::MarketData
    }

    fn register(&self, registrar: &mut CategoryRegistrar<'_>) -> ToolResult<()> {
        let schema = ParameterSchema::builder()
            .field(
                "symbol",
                FieldSpec::required(FieldType::String).with_description("Pair such as ETH-USDC"),
            )
            .and_then(|builder| builder.optional("delay_ms", FieldType::Integer))
            .map_err(|err| ToolError::InvalidMetadata {
                reason: err.to_string(),
            })?
            .build();

        registrar.register_tool(
            ToolMetadata::new("get_token_price", "Spot price for a trading pair")?
                .with_schema(schema),
            quote,
        )
    }
}

async fn quote(params: Parameters) -> ToolResult<Value> {
    let symbol = params
        .get("symbol")
        .and_then(Value::as_str)
        .ok_or_else(|| ToolError::execution("symbol must be a string"))?;
    if let Some(delay) = params.get("delay_ms").and_then(Value::as_u64) {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }
    match symbol {
        "ETH-USDC" => Ok(json!({ "symbol": symbol, "price": 2510.42 })),
        "BTC-USDC" => Ok(json!({ "symbol": symbol, "price": 64210.0 })),
        _ => Err(ToolError::execution(format!("no market for {symbol}"))),
    }
}

struct Canned {
    category: ToolCategory,
    tools: &'static [(&'static str, &'static str)],
}

impl ToolProvider for Canned {
    fn category(&self) -> ToolCategory {
        self.category
    }

    fn register(&self, registrar: &mut CategoryRegistrar<'_>) -> ToolResult<()> {
        for (name, description) in self.tools {
            let metadata = ToolMetadata::new(*name, *description)?
                .with_schema(ParameterSchema::builder().allow_additional().build());
            let tool = *name;
            registrar.register_tool(metadata, move |params: Parameters| async move {
                Ok(json!({ "tool": tool, "echo": params }))
            })?;
        }
        Ok(())
    }
}

fn canned_tools(category: ToolCategory) -> &'static [(&'static str, &'static str)] {
    match category {
        ToolCategory::MarketData => &[("get_price_history", "Historical candles for a pair")],
        ToolCategory::ChainRead => &[
            ("get_balance", "Native token balance of an address"),
            ("get_address_info", "Nonce and contract status of an address"),
        ],
        ToolCategory::ChainWrite => &[("send_transaction", "Submit a signed transaction")],
        ToolCategory::Social => &[("post_update", "Publish a status update")],
        ToolCategory::Storage => &[("put_object", "Store a document")],
        ToolCategory::Memory => &[("recall", "Look up stored agent memories")],
        ToolCategory::RepositoryAnalytics => &[("list_open_issues", "Open issues of a repository")],
        ToolCategory::Search => &[("web_search", "Search the web")],
    }
}
