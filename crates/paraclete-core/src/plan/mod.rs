//! Financial plan generation.
//!
//! Stateless per request: build the advisory prompt from the submitted
//! profile fields, ask the completion gateway for a narrative, template
//! profile plus narrative into HTML, and hand the HTML to the renderer
//! for PDF conversion. No transcript or other persisted state is touched.

pub mod renderer;

pub use renderer::PlanRenderer;

use paraclete_types::error::PlanError;
use paraclete_types::llm::Message;
use paraclete_types::plan::PlanRequest;
use tracing::info;

use crate::llm::gateway::CompletionGateway;

/// Generates financial plan PDFs from profile fields and a model narrative.
pub struct PlanService<G: CompletionGateway, R: PlanRenderer> {
    gateway: G,
    renderer: R,
    max_tokens: u32,
}

impl<G: CompletionGateway, R: PlanRenderer> PlanService<G, R> {
    pub fn new(gateway: G, renderer: R, max_tokens: u32) -> Self {
        Self {
            gateway,
            renderer,
            max_tokens,
        }
    }

    /// Produce the complete plan document as PDF bytes.
    pub async fn generate_plan(&self, request: &PlanRequest) -> Result<Vec<u8>, PlanError> {
        let prompt = build_prompt(request);
        let narrative = self
            .gateway
            .generate(&[Message::user(prompt)], self.max_tokens)
            .await?;

        let html = render_html(request, &narrative);
        let pdf = self.renderer.render(&html).await?;

        info!(
            session_id = %request.session_id,
            bytes = pdf.len(),
            "financial plan rendered"
        );
        Ok(pdf)
    }
}

/// Advisory prompt assembled from the profile fields.
fn build_prompt(request: &PlanRequest) -> String {
    format!(
        "Create a detailed financial plan for {name}, who is {age} years old, \
         {marital_status}, with an annual income of {income}, preferring \
         {preference} investments, and planning to retire at {retirement_age}. \
         Provide step-by-step savings, investing, and retirement strategies.",
        name = request.name,
        age = request.age,
        marital_status = request.marital_status,
        income = request.income,
        preference = request.investment_preference,
        retirement_age = request.retirement_age,
    )
}

/// Deterministic HTML template combining profile fields and the narrative.
fn render_html(request: &PlanRequest, narrative: &str) -> String {
    format!(
        r#"<h1 style="text-align:center;">Financial Plan for {name}</h1>
<p><strong>Age:</strong> {age}</p>
<p><strong>Marital Status:</strong> {marital_status}</p>
<p><strong>Annual Income:</strong> ${income:.2}</p>
<p><strong>Investment Preference:</strong> {preference}</p>
<p><strong>Retirement Age:</strong> {retirement_age}</p>
<hr>
<h2 style="color:#444;">Recommendations</h2>
<p>{narrative}</p>
<hr>
<p><em>This plan is for informational purposes. For personalized advice, consult a licensed financial advisor.</em></p>
"#,
        name = request.name,
        age = request.age,
        marital_status = request.marital_status,
        income = request.income,
        preference = request.investment_preference,
        retirement_age = request.retirement_age,
    )
}
