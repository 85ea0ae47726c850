use serde_json::{json, Value};

use klinescope_core::{AppSnapshot, ChartView, RequestState, Symbol};

use crate::error::CliError;

pub fn render(value: &Value, pretty: bool) -> Result<(), CliError> {
    let payload = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{payload}");
    Ok(())
}

pub fn symbols_json(symbols: &[Symbol]) -> Value {
    Value::Array(
        symbols
            .iter()
            .map(|symbol| {
                json!({
                    "symbol": symbol.id.as_str(),
                    "name": symbol.label,
                    "display": symbol.display_text(),
                })
            })
            .collect(),
    )
}

pub fn view_json(view: &ChartView) -> Value {
    match view {
        ChartView::Placeholder => json!({ "kind": "placeholder" }),
        ChartView::Loading => json!({ "kind": "loading" }),
        ChartView::Chart {
            stock_count,
            index_name,
        } => json!({
            "kind": "chart",
            "stock_count": stock_count,
            "index_name": index_name,
        }),
    }
}

const fn request_state_str(state: RequestState) -> &'static str {
    match state {
        RequestState::Idle => "idle",
        RequestState::Loading => "loading",
        RequestState::Success => "success",
        RequestState::Failed => "failed",
    }
}

pub fn snapshot_json(snapshot: &AppSnapshot) -> Value {
    let selection = &snapshot.selection;
    json!({
        "phase": format!("{:?}", snapshot.phase).to_lowercase(),
        "status": {
            "text": snapshot.status.text,
            "busy": snapshot.status.busy,
        },
        "notification": snapshot.notification.as_ref().map(|notification| json!({
            "text": notification.text,
            "severity": notification.severity.as_str(),
            "auto_dismiss_ms": notification.auto_dismiss_ms,
        })),
        "selection": {
            "stocks": selection
                .symbols
                .iter()
                .map(|id| json!({
                    "symbol": id.as_str(),
                    "name": snapshot.label_for(id),
                }))
                .collect::<Vec<_>>(),
            "index": selection.index.as_ref().map(|index| index.as_str()),
            "normalize": selection.normalize,
            "start_date": selection.date_range.start().map(|date| date.to_string()),
            "end_date": selection.date_range.end().map(|date| date.to_string()),
        },
        "request_state": request_state_str(snapshot.request_state),
        "can_submit": snapshot.can_submit,
        "chart_info": snapshot.chart_info,
        "view": view_json(&snapshot.view),
        "search": snapshot.search.as_ref().map(|results| json!({
            "query": results.query,
            "results": symbols_json(&results.symbols),
        })),
        "pool": {
            "symbols": snapshot.symbols.len(),
            "indices": snapshot.indices.iter().map(|index| index.as_str()).collect::<Vec<_>>(),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use klinescope_core::{IndexName, SymbolId};

    #[test]
    fn snapshot_json_uses_labels_and_lowercase_states() {
        let id = SymbolId::parse("sh600519").expect("id");
        let mut snapshot = AppSnapshot::default();
        snapshot.symbols.push(Symbol::new(id.clone(), "贵州茅台"));
        snapshot.selection.symbols.push(id);
        snapshot.selection.index = Some(IndexName::new("上证指数").expect("index"));

        let value = snapshot_json(&snapshot);
        assert_eq!(value["phase"], "notstarted");
        assert_eq!(value["request_state"], "idle");
        assert_eq!(value["selection"]["stocks"][0]["name"], "贵州茅台");
        assert_eq!(value["selection"]["index"], "上证指数");
        assert_eq!(value["view"]["kind"], "placeholder");
        assert!(value["notification"].is_null());
    }
}
