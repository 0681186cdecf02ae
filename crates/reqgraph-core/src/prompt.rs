//! Request construction for turn and analysis calls

use crate::config::PromptTemplates;
use crate::generation::{GenerationRequest, Message, Purpose};
use crate::history::Exchange;
use reqgraph_model::render::render_document;
use reqgraph_model::Document;
use reqgraph_refine::AnalysisRequest;

/// Primary turn request: instruction and graph, then history, then the user
#[must_use]
pub fn turn_request(
    templates: &PromptTemplates,
    document: &Document,
    history: &[Exchange],
    user_text: &str,
) -> GenerationRequest {
    let graph = render_document(document);
    let graph = if graph.is_empty() {
        "(no items yet)\n".to_string()
    } else {
        graph
    };
    let system = format!("{}\n\n# CURRENT ITEMS\n\n{graph}", templates.turn_instruction.trim_end());

    GenerationRequest::new(Purpose::Turn)
        .with_message(Message::system(system))
        .with_messages(history.iter().flat_map(|exchange| {
            [
                Message::user(exchange.user.clone()),
                Message::assistant(exchange.assistant.clone()),
            ]
        }))
        .with_message(Message::user(user_text))
}

/// One analysis call
#[must_use]
pub fn analysis_request(templates: &PromptTemplates, request: AnalysisRequest) -> GenerationRequest {
    GenerationRequest::new(Purpose::Analysis(request.kind))
        .with_message(Message::system(templates.analysis_instruction(request.kind)))
        .with_message(Message::user(request.body))
}
