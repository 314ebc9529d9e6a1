//! Prompt templates.
//!
//! Three prompts are rendered here: the structured PRD draft, the guided
//! elicitation chat and the brain-dump field extractor. Rendering is pure
//! string assembly; quality of the wording is not a concern of this crate.

use crate::domain::PrdForm;

/// Keywords that switch the PRD prompt into healthcare-compliance mode.
pub const HEALTHCARE_KEYWORDS: &[&str] = &[
    "ABHA",
    "ABDM",
    "HIMS",
    "PHI",
    "Consent",
    "Health records",
    "Patient",
    "EMR",
    "EHR",
    "Clinical",
    "Doctor",
    "Hospital",
    "Pharmacy",
];

/// Sections every generated PRD must contain, in order.
pub const PRD_SECTIONS: &[&str] = &[
    "Introduction / Overview",
    "Goals / Objectives (SMART)",
    "Target Audience / User Personas",
    "User Stories (Table: ID, User Story, Priority)",
    "Functional Requirements",
    "Non-Functional Requirements (Performance, Security, Compliance)",
    "Design Considerations",
    "Success Metrics",
    "Open Questions & Future Considerations",
];

const HEALTHCARE_DIRECTIVE: &str = "HEALTHCARE CONTEXT: Include ABHA/ABDM/PHI compliance details.";

const GUIDED_CHAT_SYSTEM: &str = "ROLE:
You are an expert Product Manager assistant and requirements analyst. Act as a specialized agent focused solely on eliciting product requirements. Respond with the perspective of an expert in product requirements gathering.

GOAL:
Collaborate with the user to create a comprehensive draft PRD through an iterative, question-driven process.

PROCESS & KEY RULES:
1. Analyze the user's input step-by-step. Cross-reference all info to ensure coverage and identify contradictions.
2. Guide by asking specific, targeted questions (1-3 at a time). Use bullet points for clarity. Keep questions concise.
3. Anticipate follow-up questions needed for a comprehensive PRD.
4. If you make assumptions, state them explicitly and ask for validation.
5. Prompt for multiple perspectives (user types, edge cases).
6. Ask for quantification (metrics, numbers) for goals and success.
7. USER-CENTERED CHECK-IN: Regularly verify direction. Before shifting focus, briefly state your intended next step and explicitly ask for confirmation.
8. Do not write the full PRD yet until sufficient information is gathered and the user confirms.

DESIRED PRD STRUCTURE (Towards which we build):
* Introduction / Overview
* Goals / Objectives (SMART)
* Target Audience / User Personas
* User Stories / Use Cases
* Functional Requirements
* Non-Functional Requirements (Security, Performance, etc.)
* Design Considerations
* Success Metrics
* Open Questions

TONE: Professional, inquisitive, and helpful. Neutral guidance.";

/// Case-insensitive check for healthcare vocabulary.
pub fn detect_healthcare_context(text: &str) -> bool {
    let text = text.to_lowercase();
    HEALTHCARE_KEYWORDS
        .iter()
        .any(|keyword| text.contains(&keyword.to_lowercase()))
}

/// Render the structured PRD prompt for a submitted form.
pub fn prd_prompt(form: &PrdForm) -> String {
    let probe = format!(
        "{} {} {}",
        form.feature_name, form.problem_statement, form.business_objective
    );
    let healthcare = if detect_healthcare_context(&probe) {
        HEALTHCARE_DIRECTIVE
    } else {
        ""
    };

    let sections = PRD_SECTIONS
        .iter()
        .enumerate()
        .map(|(i, section)| format!("{}. {section}", i + 1))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Act as an Expert PM Assistant. Generate a professional, highly structured PRD.
NO conversational filler. Use Markdown.

SECTIONS TO INCLUDE:
{sections}

{healthcare}

INPUT CONTEXT:
Feature Name: {feature}
Problem Statement: {problem}
Business Objective: {objective}
Success Metrics: {metrics}
Target Persona: {persona}
Constraints: {constraints}

Generate the draft PRD now. Focus on logical clarity and implementation readiness.",
        feature = form.feature_name,
        problem = form.problem_statement,
        objective = form.business_objective,
        metrics = form.success_metrics,
        persona = form.target_persona,
        constraints = form.constraints,
    )
}

/// Render the guided elicitation prompt with the conversation so far.
pub fn guided_chat_prompt(history: &str) -> String {
    format!("{GUIDED_CHAT_SYSTEM}\n\nCONVERSATION HISTORY:\n{history}\n\nYOUR RESPONSE:")
}

/// Render the prompt that extracts form fields from a free-text brain dump.
pub fn brain_dump_prompt(brain_dump: &str) -> String {
    format!(
        r#"### TASK: EXTRACT JSON DATA FROM BRAIN DUMP ::: STRICTLY NO CONVERSATION ###
Extract the following fields from the raw text provided.
If a field is unknown, use an empty string.

REQUIRED JSON FORMAT:
{{
  "featureName": "string",
  "problemStatement": "string",
  "businessObjective": "string",
  "successMetrics": "string",
  "targetPersona": "string",
  "constraints": "string"
}}

BRAIN DUMP TEXT:
"{brain_dump}"

### RESPONSE (Valid JSON only):"#
    )
}
