//! Prompt text and tool definitions
//!
//! The assistant works in Russian: prompts stay in Russian so the model
//! answers in the language of the sources it searches.

use serde_json::json;

use crate::models::SearchResult;
use crate::types::ToolDefinition;

pub const SEARCH_TOOL: &str = "search";
pub const CHART_TOOL: &str = "render_chart";

pub const SYSTEM_PROMPT: &str = "Ты - эксперт по истории России, который анализирует альтернативные сценарии развития исторических событий.
Твоя задача - давать обоснованные ответы на основе реальных исторических фактов и научных исследований.
Если запрос касается сценария, который не обсуждался в научной литературе, честно признай это.
Всегда указывай источники информации и обосновывай свои выводы.";

const CHART_INSTRUCTIONS: &str = "
Если пользователь просит график, диаграмму или визуализацию, вызови инструмент render_chart.
Передай либо декларативное описание графика (chart_type, title, x_label, y_label, categories, series),
либо короткий скрипт matplotlib в поле script (только списки чисел и вызовы plt.plot, plt.bar, plt.scatter,
plt.title, plt.xlabel, plt.ylabel).";

/// System prompt, with chart guidance when the chart tool is offered
pub fn system_prompt(charts_enabled: bool) -> String {
    if charts_enabled {
        format!("{}\n{}", SYSTEM_PROMPT, CHART_INSTRUCTIONS.trim())
    } else {
        SYSTEM_PROMPT.to_string()
    }
}

pub fn subquestion_prompt(query: &str) -> String {
    format!(
        r#"На основе основного вопроса: "{query}"
Сгенерируй список из 2-3 вспомогательных вопросов, которые помогут найти информацию для ответа.
Вопросы должны быть конкретными и направленными на поиск исторических фактов."#
    )
}

pub fn synthesis_prompt(query: &str, sources: &[SearchResult]) -> String {
    let found = serde_json::to_string_pretty(sources).unwrap_or_default();
    format!(
        r#"На основе следующей информации ответь на вопрос: "{query}"

Найденная информация:
{found}

Сформулируй ответ, который:
1. Будет основан только на реальных исторических фактах
2. Включит ссылки на источники
3. Будет содержать обоснованные рассуждения
4. Если информации недостаточно, честно признай это"#
    )
}

pub fn search_tool() -> ToolDefinition {
    ToolDefinition {
        name: SEARCH_TOOL.to_string(),
        description: "Поиск информации в интернете".to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                "query": {"type": "string", "description": "Поисковый запрос"}
            },
            "required": ["query"]
        }),
    }
}

pub fn chart_tool() -> ToolDefinition {
    let series = json!({
        "type": "object",
        "properties": {
            "name": {"type": "string"},
            "x": {"type": "array", "items": {"type": "number"}},
            "y": {"type": "array", "items": {"type": "number"}}
        },
        "required": ["y"]
    });

    ToolDefinition {
        name: CHART_TOOL.to_string(),
        description: "Построить график по данным. Передай описание графика или скрипт matplotlib в поле script.".to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                "chart_type": {"type": "string", "enum": ["line", "bar", "scatter"]},
                "title": {"type": "string"},
                "x_label": {"type": "string"},
                "y_label": {"type": "string"},
                "categories": {"type": "array", "items": {"type": "string"}},
                "series": {"type": "array", "items": series},
                "script": {"type": "string", "description": "Скрипт matplotlib (plt.plot, plt.bar, plt.scatter)"}
            }
        }),
    }
}
