use serde_json::{json, Value};

use klinescope_core::{
    ChartRenderer, ChartRequestPipeline, DateRange, FigureFileSink, IndexName, MemorySink,
    RenderSink, Selection, SymbolId,
};

use crate::cli::ChartArgs;
use crate::error::CliError;
use crate::output::view_json;

use super::Context;

pub async fn run(args: &ChartArgs, context: &Context) -> Result<Value, CliError> {
    let selection = selection_from_args(args)?;

    let mut pipeline = ChartRequestPipeline::new(context.config.chart_timeout);
    let success = pipeline
        .submit(context.backend.as_ref(), &selection)
        .await?;

    let sink: Box<dyn RenderSink> = match &args.out {
        Some(path) => Box::new(FigureFileSink::new(path)),
        None => Box::new(MemorySink::new()),
    };
    let mut renderer = ChartRenderer::new(sink, context.config.container.clone());
    renderer.render(&success.payload, success.stock_count, &success.index_name)?;

    Ok(json!({
        "status": format!("图表生成成功 ({}只股票)", success.stock_count),
        "chart_info": format!("{}只股票 + {}", success.stock_count, success.index_name),
        "stock_count": success.stock_count,
        "index_name": success.index_name,
        "stocks": selection.symbols.iter().map(SymbolId::as_str).collect::<Vec<_>>(),
        "view": view_json(renderer.view()),
        "figure_path": args.out.as_ref().map(|path| path.display().to_string()),
    }))
}

fn selection_from_args(args: &ChartArgs) -> Result<Selection, CliError> {
    let mut symbols: Vec<SymbolId> = Vec::new();
    for raw in &args.stocks {
        let id = SymbolId::parse(raw)?;
        if !symbols.contains(&id) {
            symbols.push(id);
        }
    }

    Ok(Selection {
        symbols,
        index: Some(IndexName::new(args.index.as_str())?),
        normalize: args.normalize,
        date_range: DateRange::parse(args.start.as_deref(), args.end.as_deref())?,
    })
}
